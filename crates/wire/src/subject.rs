// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! Bus subjects the event consumer subscribes to (spec §4.7).

use std::fmt;

/// Default subject prefix when none is configured.
pub const DEFAULT_SUBJECT_PREFIX: &str = "directory.events";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Groups,
    Members,
    Users,
}

impl Subject {
    pub const ALL: [Subject; 3] = [Subject::Groups, Subject::Members, Subject::Users];

    fn suffix(self) -> &'static str {
        match self {
            Subject::Groups => "groups",
            Subject::Members => "members",
            Subject::Users => "users",
        }
    }

    /// Full subject string under the given prefix, e.g. `directory.events.groups`.
    pub fn full(self, prefix: &str) -> String {
        format!("{prefix}.{}", self.suffix())
    }

    /// Parse a full subject string back into a `Subject`, given the prefix
    /// it was published under.
    pub fn parse(full: &str, prefix: &str) -> Option<Self> {
        let suffix = full.strip_prefix(prefix)?.strip_prefix('.')?;
        Subject::ALL.into_iter().find(|s| s.suffix() == suffix)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

#[cfg(test)]
#[path = "subject_tests.rs"]
mod tests;
