// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! Workspace-level integration specs.
//!
//! `cli` exercises the `idp-sync` binary as a subprocess (help text, exit
//! codes on fatal configuration errors). `engine_sweep` drives a full
//! `Reconciler` built from the test-support fakes across crate boundaries —
//! the same kind of cross-cutting scenario a live Directory/IdP pair would
//! produce, without a network dependency.

mod cli {
    use assert_cmd::Command;

    fn idp_sync() -> Command {
        Command::cargo_bin("idp-sync").expect("idp-sync binary built by this workspace")
    }

    fn stdout_of(assert: &assert_cmd::assert::Assert) -> String {
        String::from_utf8_lossy(&assert.get_output().stdout).into_owned()
    }

    fn stderr_of(assert: &assert_cmd::assert::Assert) -> String {
        String::from_utf8_lossy(&assert.get_output().stderr).into_owned()
    }

    #[test]
    fn help_lists_serve_and_sync() {
        let assert = idp_sync().arg("--help").assert().success();
        let out = stdout_of(&assert);
        assert!(out.contains("serve"), "help output missing `serve`:\n{out}");
        assert!(out.contains("sync"), "help output missing `sync`:\n{out}");
    }

    #[test]
    fn sync_groups_help_shows_dry_run_flag() {
        let assert = idp_sync().args(["sync", "groups", "--help"]).assert().success();
        let out = stdout_of(&assert);
        assert!(out.contains("--dry-run"), "missing --dry-run:\n{out}");
        assert!(out.contains("--selector-prefix"), "missing --selector-prefix:\n{out}");
    }

    #[test]
    fn serve_without_required_config_exits_with_code_one() {
        let assert = idp_sync().env_clear().arg("serve").assert().failure().code(1);
        let err = stderr_of(&assert);
        assert!(err.contains("failed to load configuration"), "unexpected stderr:\n{err}");
    }
}

mod engine_sweep {
    use std::sync::Arc;

    use chrono::Utc;
    use idp_sync_adapters::{FakeAuditSink, FakeDirectoryAdapter, FakeIdpAdapter, NoopLeaderLock};
    use idp_sync_core::test_support::{DirGroupBuilder, DirUserBuilder};
    use idp_sync_core::{FakeClock, IdpUser, IdpUserId, IdpUserStatus};
    use idp_sync_engine::{AuditContext, Counters, Reconciler, ReconcilerPolicy};
    use tokio_util::sync::CancellationToken;

    fn build(policy: ReconcilerPolicy) -> (Reconciler, FakeDirectoryAdapter, FakeIdpAdapter, FakeAuditSink) {
        let directory = FakeDirectoryAdapter::new();
        let idp = FakeIdpAdapter::new();
        let audit = FakeAuditSink::new();
        let clock = FakeClock::new(Utc::now());
        let reconciler = Reconciler::new(
            Arc::new(directory.clone()),
            Arc::new(idp.clone()),
            Arc::new(audit.clone()),
            Arc::new(NoopLeaderLock),
            Arc::new(clock),
            Arc::new(Counters::new()),
            policy,
        );
        (reconciler, directory, idp, audit)
    }

    /// A brand-new Directory group with no IdP counterpart is created, its
    /// membership converged, and exactly one audit record written for the
    /// create — end to end, across the adapters/engine boundary.
    #[tokio::test]
    async fn sweep_creates_new_group_and_converges_membership() {
        let user = DirUserBuilder::new("alice@example.com").external_id(IdpUserId::from("idp_alice")).build();
        let group = DirGroupBuilder::new("engineering").member(user.id).build();

        let (reconciler, directory, idp, audit) = build(ReconcilerPolicy::default());
        directory.seed_user(user.clone());
        directory.seed_group(group.clone());
        idp.seed_user(IdpUser {
            id: IdpUserId::from("idp_alice"),
            email: user.email.clone(),
            status: IdpUserStatus::Active,
            first_name: "Alice".to_string(),
            last_name: "Example".to_string(),
        });

        let report = reconciler.sweep(&CancellationToken::new()).await.expect("sweep succeeds");

        assert_eq!(report.groups_processed, 1);
        assert_eq!(report.failures, 0);

        let idp_group = idp.find_group_by_directory_id(group.id).await.unwrap().expect("group created");
        assert!(idp_group.members.contains(&IdpUserId::from("idp_alice")));

        let records = audit.records();
        assert_eq!(records.len(), 2, "one record for group_create, one for group_membership");
    }

    /// Under `dry_run`, a group that would be deleted (no longer present in
    /// the Directory) produces no mutating calls and no audit records.
    #[tokio::test]
    async fn dry_run_sweep_mutates_nothing() {
        let policy = ReconcilerPolicy { dry_run: true, ..ReconcilerPolicy::default() };
        let (reconciler, directory, idp, audit) = build(policy);

        let group = DirGroupBuilder::new("contractors").build();
        directory.seed_group(group.clone());

        let ctx = AuditContext::sweep();
        let idp_group_id = reconciler.group_create(&ctx, group.id).await.expect("dry-run create returns placeholder");

        assert!(idp.get_group(&idp_group_id).await.unwrap().is_none(), "no group actually created");
        assert!(audit.is_empty(), "dry-run suppresses audit records");
        assert_eq!(idp.call_count(), 0, "no mutating IdP calls under dry-run");
    }
}
