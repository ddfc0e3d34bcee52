// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! In-process counter registry for the nine named state-transition counters
//! (spec §7), rendered as Prometheus text exposition for a `/metrics`
//! scrape — a home-grown registry in the same spirit as the teacher's own
//! `usage_metrics` collector, sized to nine fixed counters rather than a
//! general metrics framework.

use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! counters {
    ($($field:ident => $name:literal),+ $(,)?) => {
        #[derive(Default)]
        pub struct Counters {
            $(pub $field: AtomicU64,)+
        }

        impl Counters {
            /// Render every counter as Prometheus text exposition format.
            pub fn render(&self) -> String {
                let mut out = String::new();
                $(
                    out.push_str(&format!(
                        "# TYPE {0} counter\n{0} {1}\n",
                        $name,
                        self.$field.load(Ordering::Relaxed),
                    ));
                )+
                out
            }
        }
    };
}

counters! {
    groups_created => "groups_created_total",
    groups_updated => "groups_updated_total",
    groups_deleted => "groups_deleted_total",
    group_membership_created => "group_membership_created_total",
    group_membership_deleted => "group_membership_deleted_total",
    groups_application_assigned => "groups_application_assigned_total",
    groups_application_unassigned => "groups_application_unassigned_total",
    users_deleted => "users_deleted_total",
    users_updated => "users_updated_total",
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
