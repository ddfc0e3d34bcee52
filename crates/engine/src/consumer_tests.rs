use std::sync::Arc;

use idp_sync_adapters::{FakeAuditSink, FakeDirectoryAdapter, FakeIdpAdapter, NoopLeaderLock};
use idp_sync_core::test_support::{dir_org, DirGroupBuilder, DirUserBuilder};
use idp_sync_core::{BusAction, FakeClock, IdpApplication, IdpApplicationId, IdpUserId, IdpUserStatus};
use idp_sync_wire::{BusMessage, Subject};

use super::*;
use crate::metrics::Counters;
use crate::reconciler::{Reconciler, ReconcilerPolicy};

fn harness() -> (EventConsumer, FakeDirectoryAdapter, FakeIdpAdapter, FakeAuditSink) {
    let directory = FakeDirectoryAdapter::new();
    let idp = FakeIdpAdapter::new();
    let audit = FakeAuditSink::new();
    let reconciler = Reconciler::new(
        Arc::new(directory.clone()),
        Arc::new(idp.clone()),
        Arc::new(audit.clone()),
        Arc::new(NoopLeaderLock),
        Arc::new(FakeClock::default()),
        Arc::new(Counters::new()),
        ReconcilerPolicy::default(),
    );
    let consumer = EventConsumer::new(Arc::new(reconciler), ConsumerConfig::default());
    (consumer, directory, idp, audit)
}

fn payload(msg: &BusMessage) -> Vec<u8> {
    serde_json::to_vec(msg).unwrap()
}

#[tokio::test]
async fn groups_create_chains_create_assignments_and_membership() {
    let (consumer, directory, idp, audit) = harness();
    let org = dir_org("acme");
    directory.seed_org(org.clone());
    let user = DirUserBuilder::new("u@example.com").external_id(IdpUserId::from("idp-u")).build();
    directory.seed_user(user.clone());
    let group = DirGroupBuilder::new("platform").organization(org.id).member(user.id).build();
    directory.seed_group(group.clone());
    idp.seed_application(IdpApplication { id: IdpApplicationId::from("app-A"), name: "GitHub".into(), external_org_slug: "acme".into() }, &[]);

    let msg = BusMessage { version: 1, action: BusAction::Create, group_id: Some(group.id), user_id: None, audit_id: "a1".into() };
    consumer.dispatch(Subject::Groups, &payload(&msg), "idp-sync").await;

    let created = idp.find_group_by_directory_id(group.id).await.unwrap().unwrap();
    assert!(created.members.contains(&IdpUserId::from("idp-u")));
    assert!(idp.assignments(&IdpApplicationId::from("app-A")).contains(created.id.as_str()));
    // GroupCreate + GroupApplicationAssign + GroupMemberAdd.
    assert_eq!(audit.len(), 3);
}

#[tokio::test]
async fn groups_update_converges_assignments_but_not_membership() {
    let (consumer, directory, idp, _audit) = harness();
    let org = dir_org("acme");
    directory.seed_org(org.clone());
    let user = DirUserBuilder::new("u@example.com").external_id(IdpUserId::from("idp-u")).build();
    directory.seed_user(user.clone());
    let group = DirGroupBuilder::new("platform").organization(org.id).member(user.id).build();
    directory.seed_group(group.clone());
    let mut idp_group = idp_sync_core::test_support::idp_group(group.id);
    idp_group.profile.name = "Stale Name".into();
    idp.seed_group(idp_group.clone());
    idp.seed_application(IdpApplication { id: IdpApplicationId::from("app-A"), name: "GitHub".into(), external_org_slug: "acme".into() }, &[]);

    let msg = BusMessage { version: 1, action: BusAction::Update, group_id: Some(group.id), user_id: None, audit_id: "a2".into() };
    consumer.dispatch(Subject::Groups, &payload(&msg), "idp-sync").await;

    let updated = idp.get_group(&idp_group.id).await.unwrap().unwrap();
    assert_eq!(updated.profile.name, "platform");
    assert!(idp.assignments(&IdpApplicationId::from("app-A")).contains(idp_group.id.as_str()));
    // group_update does not converge membership: the seeded member is never added.
    assert!(updated.members.is_empty());
}

#[tokio::test]
async fn groups_delete_removes_idp_group() {
    let (consumer, directory, idp, _audit) = harness();
    let group = DirGroupBuilder::new("gone").build();
    directory.seed_group(group.clone());
    let idp_group = idp_sync_core::test_support::idp_group(group.id);
    idp.seed_group(idp_group.clone());

    let msg = BusMessage { version: 1, action: BusAction::Delete, group_id: Some(group.id), user_id: None, audit_id: "a3".into() };
    consumer.dispatch(Subject::Groups, &payload(&msg), "idp-sync").await;

    assert!(idp.get_group(&idp_group.id).await.unwrap().is_none());
}

#[tokio::test]
async fn members_create_adds_the_member() {
    let (consumer, directory, idp, _audit) = harness();
    let user = DirUserBuilder::new("u@example.com").external_id(IdpUserId::from("idp-u")).build();
    directory.seed_user(user.clone());
    let group = DirGroupBuilder::new("platform").member(user.id).build();
    directory.seed_group(group.clone());
    let idp_group = idp_sync_core::test_support::idp_group(group.id);
    idp.seed_group(idp_group.clone());

    let msg = BusMessage { version: 1, action: BusAction::Create, group_id: Some(group.id), user_id: Some(user.id), audit_id: "a4".into() };
    consumer.dispatch(Subject::Members, &payload(&msg), "idp-sync").await;

    assert!(idp.get_group(&idp_group.id).await.unwrap().unwrap().members.contains(&IdpUserId::from("idp-u")));
}

#[tokio::test]
async fn members_delete_removes_the_member() {
    let (consumer, directory, idp, _audit) = harness();
    let user = DirUserBuilder::new("u@example.com").external_id(IdpUserId::from("idp-u")).build();
    directory.seed_user(user.clone());
    // Directory no longer lists the user as a member — it's already removed there.
    let group = DirGroupBuilder::new("platform").build();
    directory.seed_group(group.clone());
    let mut idp_group = idp_sync_core::test_support::idp_group(group.id);
    idp_group.members.insert(IdpUserId::from("idp-u"));
    idp.seed_group(idp_group.clone());

    let msg = BusMessage { version: 1, action: BusAction::Delete, group_id: Some(group.id), user_id: Some(user.id), audit_id: "a5".into() };
    consumer.dispatch(Subject::Members, &payload(&msg), "idp-sync").await;

    assert!(!idp.get_group(&idp_group.id).await.unwrap().unwrap().members.contains(&IdpUserId::from("idp-u")));
}

#[tokio::test]
async fn users_delete_deletes_the_idp_user() {
    let (consumer, directory, idp, _audit) = harness();
    let user = DirUserBuilder::new("gone@example.com")
        .deleted_at(chrono::Utc::now() - chrono::Duration::hours(1))
        .build();
    directory.seed_user(user.clone());
    idp.seed_user(idp_sync_core::IdpUser {
        id: IdpUserId::from("idp-gone"),
        email: "gone@example.com".into(),
        status: IdpUserStatus::Active,
        first_name: "G".into(),
        last_name: "One".into(),
    });

    let msg = BusMessage { version: 1, action: BusAction::Delete, group_id: None, user_id: Some(user.id), audit_id: "a6".into() };
    consumer.dispatch(Subject::Users, &payload(&msg), "idp-sync").await;

    assert!(idp.get_user(&IdpUserId::from("idp-gone")).await.unwrap().is_none());
}

#[tokio::test]
async fn users_update_suspends_the_idp_user() {
    let (consumer, directory, idp, _audit) = harness();
    let user = DirUserBuilder::new("s@example.com")
        .external_id(IdpUserId::from("idp-s"))
        .status(idp_sync_core::UserStatus::Suspended)
        .build();
    directory.seed_user(user.clone());
    idp.seed_user(idp_sync_core::IdpUser {
        id: IdpUserId::from("idp-s"),
        email: "s@example.com".into(),
        status: IdpUserStatus::Active,
        first_name: "S".into(),
        last_name: "U".into(),
    });

    let msg = BusMessage { version: 1, action: BusAction::Update, group_id: None, user_id: Some(user.id), audit_id: "a7".into() };
    consumer.dispatch(Subject::Users, &payload(&msg), "idp-sync").await;

    assert_eq!(idp.get_user(&IdpUserId::from("idp-s")).await.unwrap().unwrap().status, IdpUserStatus::Suspended);
}

/// `users` has no CREATE handler in the dispatch table (spec §4.7) — it
/// must be a silent no-op, not an error.
#[tokio::test]
async fn unhandled_subject_action_pair_is_a_noop() {
    let (consumer, directory, _idp, _audit) = harness();
    let user = DirUserBuilder::new("u@example.com").build();
    directory.seed_user(user.clone());

    let msg = BusMessage { version: 1, action: BusAction::Create, group_id: None, user_id: Some(user.id), audit_id: "a8".into() };
    consumer.dispatch(Subject::Users, &payload(&msg), "idp-sync").await;
}

#[tokio::test]
async fn malformed_payload_is_dropped_without_panicking() {
    let (consumer, _directory, _idp, _audit) = harness();
    consumer.dispatch(Subject::Groups, b"not json", "idp-sync").await;
}
