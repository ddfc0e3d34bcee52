use std::sync::Arc;

use idp_sync_adapters::{FakeAuditSink, FakeDirectoryAdapter, FakeIdpAdapter, NoopLeaderLock};
use idp_sync_core::test_support::{dir_org, DirGroupBuilder};
use idp_sync_core::{IdpApplication, IdpApplicationId};

use super::*;
use crate::metrics::Counters;

fn harness() -> (Reconciler, FakeDirectoryAdapter, FakeIdpAdapter, FakeAuditSink) {
    let directory = FakeDirectoryAdapter::new();
    let idp = FakeIdpAdapter::new();
    let audit = FakeAuditSink::new();
    let reconciler = Reconciler::new(
        Arc::new(directory.clone()),
        Arc::new(idp.clone()),
        Arc::new(audit.clone()),
        Arc::new(NoopLeaderLock),
        Arc::new(idp_sync_core::FakeClock::default()),
        Arc::new(Counters::new()),
        ReconcilerPolicy::default(),
    );
    (reconciler, directory, idp, audit)
}

/// S1 — group with one organization gets assigned to that org's application.
#[tokio::test]
async fn group_is_assigned_to_matching_application() {
    let (reconciler, directory, idp, _audit) = harness();
    let org = dir_org("acme");
    directory.seed_org(org.clone());

    let group = DirGroupBuilder::new("platform").organization(org.id).build();
    let idp_group_id = idp_sync_core::IdpGroupId::from("h1");
    idp.seed_application(
        IdpApplication { id: IdpApplicationId::from("app-A"), name: "GitHub".into(), external_org_slug: "acme".into() },
        &[],
    );

    reconciler
        .groups_application_assignments(
            &AuditContext::sweep(),
            &[GroupAssignmentInput { idp_group_id: idp_group_id.clone(), dir_group: group }],
        )
        .await
        .unwrap();

    assert!(idp.assignments(&IdpApplicationId::from("app-A")).contains(idp_group_id.as_str()));
}

/// S4 — group with no organizations gets unassigned, unless skip-delete.
#[tokio::test]
async fn group_with_no_orgs_is_unassigned() {
    let (reconciler, directory, idp, _audit) = harness();
    let org = dir_org("acme");
    directory.seed_org(org);

    let group = DirGroupBuilder::new("orphan").build(); // no organizations
    let idp_group_id = idp_sync_core::IdpGroupId::from("h4");
    idp.seed_application(
        IdpApplication { id: IdpApplicationId::from("app-A"), name: "GitHub".into(), external_org_slug: "acme".into() },
        &[idp_group_id.clone()],
    );

    reconciler
        .groups_application_assignments(
            &AuditContext::sweep(),
            &[GroupAssignmentInput { idp_group_id: idp_group_id.clone(), dir_group: group }],
        )
        .await
        .unwrap();

    assert!(!idp.assignments(&IdpApplicationId::from("app-A")).contains(idp_group_id.as_str()));
}

#[tokio::test]
async fn skip_delete_preserves_orphan_assignment() {
    let directory = FakeDirectoryAdapter::new();
    let idp = FakeIdpAdapter::new();
    let audit = FakeAuditSink::new();
    let reconciler = Reconciler::new(
        Arc::new(directory.clone()),
        Arc::new(idp.clone()),
        Arc::new(audit.clone()),
        Arc::new(NoopLeaderLock),
        Arc::new(idp_sync_core::FakeClock::default()),
        Arc::new(Counters::new()),
        ReconcilerPolicy { skip_delete: true, ..ReconcilerPolicy::default() },
    );
    let org = dir_org("acme");
    directory.seed_org(org);
    let group = DirGroupBuilder::new("orphan").build();
    let idp_group_id = idp_sync_core::IdpGroupId::from("h4");
    idp.seed_application(
        IdpApplication { id: IdpApplicationId::from("app-A"), name: "GitHub".into(), external_org_slug: "acme".into() },
        &[idp_group_id.clone()],
    );

    reconciler
        .groups_application_assignments(
            &AuditContext::sweep(),
            &[GroupAssignmentInput { idp_group_id: idp_group_id.clone(), dir_group: group }],
        )
        .await
        .unwrap();

    assert!(idp.assignments(&IdpApplicationId::from("app-A")).contains(idp_group_id.as_str()));
}

/// Rate-budget law (spec §8): `2N + 2` calls regardless of `M` groups — one
/// `list_applications`, one `list_application_group_assignments` per
/// application (N), plus at most one assign/unassign per actual change. With
/// zero actual changes the budget collapses to N (assignments listing) + 1
/// (list_applications), since `list_organizations` is a Directory call, not
/// counted against the IdP adapter's call log.
#[tokio::test]
async fn no_changes_means_no_mutation_calls() {
    let (reconciler, directory, idp, _audit) = harness();
    let org = dir_org("acme");
    directory.seed_org(org.clone());

    let group = DirGroupBuilder::new("platform").organization(org.id).build();
    let idp_group_id = idp_sync_core::IdpGroupId::from("h1");
    idp.seed_application(
        IdpApplication { id: IdpApplicationId::from("app-A"), name: "GitHub".into(), external_org_slug: "acme".into() },
        &[idp_group_id.clone()], // already assigned — desired state
    );

    reconciler
        .groups_application_assignments(
            &AuditContext::sweep(),
            &[GroupAssignmentInput { idp_group_id, dir_group: group }],
        )
        .await
        .unwrap();

    assert!(
        !idp.calls().iter().any(|c| c == "assign_application_group" || c == "unassign_application_group"),
        "no mutation should have occurred: {:?}",
        idp.calls()
    );
}

/// Dry-run suppresses both assign and unassign calls (spec §8 law
/// "Dry-run"), even though the listing calls that drive the diff still run.
#[tokio::test]
async fn dry_run_makes_no_assign_or_unassign_calls() {
    let directory = FakeDirectoryAdapter::new();
    let idp = FakeIdpAdapter::new();
    let audit = FakeAuditSink::new();
    let reconciler = Reconciler::new(
        Arc::new(directory.clone()),
        Arc::new(idp.clone()),
        Arc::new(audit.clone()),
        Arc::new(NoopLeaderLock),
        Arc::new(idp_sync_core::FakeClock::default()),
        Arc::new(Counters::new()),
        ReconcilerPolicy { dry_run: true, ..ReconcilerPolicy::default() },
    );
    let org = dir_org("acme");
    directory.seed_org(org.clone());

    // One group that should gain an assignment, one that should lose one.
    let assign_me = DirGroupBuilder::new("platform").organization(org.id).build();
    let unassign_me = DirGroupBuilder::new("orphan").build();
    let assign_me_id = idp_sync_core::IdpGroupId::from("h-assign");
    let unassign_me_id = idp_sync_core::IdpGroupId::from("h-unassign");
    idp.seed_application(
        IdpApplication { id: IdpApplicationId::from("app-A"), name: "GitHub".into(), external_org_slug: "acme".into() },
        &[unassign_me_id.clone()],
    );

    reconciler
        .groups_application_assignments(
            &AuditContext::sweep(),
            &[
                GroupAssignmentInput { idp_group_id: assign_me_id.clone(), dir_group: assign_me },
                GroupAssignmentInput { idp_group_id: unassign_me_id.clone(), dir_group: unassign_me },
            ],
        )
        .await
        .unwrap();

    assert!(
        !idp.calls().iter().any(|c| c == "assign_application_group" || c == "unassign_application_group"),
        "dry-run must not mutate: {:?}",
        idp.calls()
    );
    assert!(idp.assignments(&IdpApplicationId::from("app-A")).contains(unassign_me_id.as_str()));
    assert!(!idp.assignments(&IdpApplicationId::from("app-A")).contains(assign_me_id.as_str()));
    assert!(audit.is_empty(), "dry-run must suppress audit records");
}

/// A placeholder id handed back by `group_create` under dry-run never gets
/// assigned against (spec §8 law "Dry-run") — there is no real group yet.
#[tokio::test]
async fn placeholder_idp_group_id_is_never_assigned() {
    let (reconciler, directory, idp, _audit) = harness();
    let org = dir_org("acme");
    directory.seed_org(org.clone());
    let group = DirGroupBuilder::new("platform").organization(org.id).build();
    let placeholder = idp_sync_core::IdpGroupId::from(format!(
        "{}{}",
        crate::reconciler::DRY_RUN_PLACEHOLDER_PREFIX,
        group.id
    ));
    idp.seed_application(
        IdpApplication { id: IdpApplicationId::from("app-A"), name: "GitHub".into(), external_org_slug: "acme".into() },
        &[],
    );

    reconciler
        .groups_application_assignments(
            &AuditContext::sweep(),
            &[GroupAssignmentInput { idp_group_id: placeholder.clone(), dir_group: group }],
        )
        .await
        .unwrap();

    assert!(!idp.assignments(&IdpApplicationId::from("app-A")).contains(placeholder.as_str()));
    assert!(!idp.calls().iter().any(|c| c == "assign_application_group"));
}

/// The "list once per application" discipline: N applications and M groups
/// produce exactly N calls to `list_application_group_assignments`, never
/// N*M (spec §4.4, §5).
#[tokio::test]
async fn lists_assignments_exactly_once_per_application_regardless_of_group_count() {
    let (reconciler, directory, idp, _audit) = harness();
    let org = dir_org("acme");
    directory.seed_org(org.clone());

    idp.seed_application(
        IdpApplication { id: IdpApplicationId::from("app-A"), name: "GitHub".into(), external_org_slug: "acme".into() },
        &[],
    );

    let pairs: Vec<_> = (0..5)
        .map(|i| {
            let group = DirGroupBuilder::new(format!("g{i}")).organization(org.id).build();
            GroupAssignmentInput { idp_group_id: idp_sync_core::IdpGroupId::from(format!("h{i}")), dir_group: group }
        })
        .collect();

    reconciler.groups_application_assignments(&AuditContext::sweep(), &pairs).await.unwrap();

    let list_calls = idp.calls().iter().filter(|c| c.as_str() == "list_application_group_assignments").count();
    assert_eq!(list_calls, 1, "expected exactly one listing call per application");

    let assign_calls = idp.calls().iter().filter(|c| c.as_str() == "assign_application_group").count();
    assert_eq!(assign_calls, 5);
}
