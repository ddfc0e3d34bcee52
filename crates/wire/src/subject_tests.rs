use super::*;

#[test]
fn full_subject_combines_prefix_and_suffix() {
    assert_eq!(Subject::Groups.full("directory.events"), "directory.events.groups");
    assert_eq!(Subject::Members.full("custom.prefix"), "custom.prefix.members");
}

#[test]
fn parse_recovers_subject_from_full_string() {
    assert_eq!(Subject::parse("directory.events.users", "directory.events"), Some(Subject::Users));
}

#[test]
fn parse_rejects_mismatched_prefix() {
    assert_eq!(Subject::parse("other.events.users", "directory.events"), None);
}

#[test]
fn parse_rejects_unknown_suffix() {
    assert_eq!(Subject::parse("directory.events.orgs", "directory.events"), None);
}

#[test]
fn display_matches_suffix() {
    assert_eq!(Subject::Members.to_string(), "members");
}
