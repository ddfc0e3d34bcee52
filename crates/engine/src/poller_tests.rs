use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use idp_sync_adapters::{FakeDirectoryAdapter, FakeIdpAdapter, IdpAdapter};
use idp_sync_core::{
    DirGroupId, EventLogEntry, EventLogTarget, FakeClock, IdpGroup, IdpGroupId, IdpGroupProfile,
    IdpUser, IdpUserId, IdpUserStatus, Result, UserStatus,
};

use super::*;

fn idp_user(id: &str, email: &str, first: &str, last: &str) -> IdpUser {
    IdpUser { id: IdpUserId::from(id), email: email.into(), status: IdpUserStatus::Active, first_name: first.into(), last_name: last.into() }
}

fn create_event(published: DateTime<Utc>, idp_user_id: &str) -> EventLogEntry {
    EventLogEntry {
        event_type: "user.lifecycle.create".into(),
        published,
        target: vec![EventLogTarget { target_type: "User".into(), id: idp_user_id.into() }],
    }
}

#[tokio::test]
async fn zero_directory_matches_creates_new_user() {
    let idp = FakeIdpAdapter::new();
    let directory = FakeDirectoryAdapter::new();
    let clock = FakeClock::new(Utc::now());
    idp.seed_user(idp_user("idp-1", "new@example.com", "New", "User"));
    idp.seed_event(create_event(clock.now() - chrono::Duration::minutes(1), "idp-1"));

    let poller = EventLogPoller::new(Arc::new(idp), Arc::new(directory.clone()), Arc::new(clock), PollerConfig::default());
    poller.tick().await.unwrap();

    let matches = directory.find_user_by_email("new@example.com").await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].external_id, Some(IdpUserId::from("idp-1")));
    assert_eq!(matches[0].status, UserStatus::Active);
}

/// S5 — event-log create settles an existing pending Directory user.
#[tokio::test]
async fn pending_directory_user_is_settled_not_duplicated() {
    let idp = FakeIdpAdapter::new();
    let directory = FakeDirectoryAdapter::new();
    let clock = FakeClock::new(Utc::now());

    let pending = idp_sync_core::test_support::DirUserBuilder::new("x@y.com").status(UserStatus::Pending).build();
    let pending_id = pending.id;
    directory.seed_user(pending);

    idp.seed_user(idp_user("o99", "x@y.com", "First", "Last"));
    idp.seed_event(create_event(clock.now() - chrono::Duration::minutes(1), "o99"));

    let poller = EventLogPoller::new(Arc::new(idp), Arc::new(directory.clone()), Arc::new(clock), PollerConfig::default());
    poller.tick().await.unwrap();

    let settled = directory.get_user(pending_id).await.unwrap().unwrap();
    assert_eq!(settled.external_id, Some(IdpUserId::from("o99")));
    assert_eq!(settled.status, UserStatus::Active);
    assert_eq!(settled.name, "First Last");
    assert_eq!(directory.find_user_by_email("x@y.com").await.unwrap().len(), 1, "no duplicate created");
}

#[tokio::test]
async fn already_settled_user_is_a_noop() {
    let idp = FakeIdpAdapter::new();
    let directory = FakeDirectoryAdapter::new();
    let clock = FakeClock::new(Utc::now());

    let settled = idp_sync_core::test_support::DirUserBuilder::new("done@example.com")
        .external_id(IdpUserId::from("idp-done"))
        .status(UserStatus::Active)
        .build();
    directory.seed_user(settled.clone());

    idp.seed_user(idp_user("idp-done", "done@example.com", "Done", "User"));
    idp.seed_event(create_event(clock.now() - chrono::Duration::minutes(1), "idp-done"));

    let poller = EventLogPoller::new(Arc::new(idp), Arc::new(directory.clone()), Arc::new(clock), PollerConfig::default());
    poller.tick().await.unwrap();

    let after = directory.get_user(settled.id).await.unwrap().unwrap();
    assert_eq!(after, settled, "already-settled user must be untouched");
}

#[tokio::test]
async fn multiple_directory_matches_are_skipped_with_a_warning() {
    let idp = FakeIdpAdapter::new();
    let directory = FakeDirectoryAdapter::new();
    let clock = FakeClock::new(Utc::now());
    directory.seed_user(idp_sync_core::test_support::DirUserBuilder::new("dup@example.com").build());
    directory.seed_user(idp_sync_core::test_support::DirUserBuilder::new("dup@example.com").build());

    idp.seed_user(idp_user("idp-dup", "dup@example.com", "Dup", "User"));
    idp.seed_event(create_event(clock.now() - chrono::Duration::minutes(1), "idp-dup"));

    let poller = EventLogPoller::new(Arc::new(idp), Arc::new(directory.clone()), Arc::new(clock), PollerConfig::default());
    poller.tick().await.unwrap();

    assert_eq!(directory.find_user_by_email("dup@example.com").await.unwrap().len(), 2, "no mutation on ambiguous match");
}

#[tokio::test]
async fn unknown_event_type_is_ignored() {
    let idp = FakeIdpAdapter::new();
    let directory = FakeDirectoryAdapter::new();
    let clock = FakeClock::new(Utc::now());
    idp.seed_event(EventLogEntry {
        event_type: "user.lifecycle.suspend".into(),
        published: clock.now() - chrono::Duration::minutes(1),
        target: vec![EventLogTarget { target_type: "User".into(), id: "idp-1".into() }],
    });

    let poller = EventLogPoller::new(Arc::new(idp), Arc::new(directory.clone()), Arc::new(clock), PollerConfig::default());
    let dispatched = poller.tick().await.unwrap();

    assert_eq!(dispatched, 1, "event is still counted as dispatched, just ignored by the handler");
    assert!(directory.list_users(true).await.unwrap().is_empty());
}

#[tokio::test]
async fn cursor_advances_only_on_success() {
    let idp = FakeIdpAdapter::new();
    let directory = FakeDirectoryAdapter::new();
    let clock = FakeClock::new(Utc::now());
    let poller = EventLogPoller::new(Arc::new(idp), Arc::new(directory), Arc::new(clock.clone()), PollerConfig::default());

    let before = poller.cursor();
    clock.advance(chrono::Duration::seconds(30));
    poller.tick().await.unwrap();
    assert!(poller.cursor() > before);
}

/// S6 — a transient IdP failure must not advance the cursor; the next tick
/// retries the same (wider) window.
#[tokio::test]
async fn transient_failure_does_not_advance_cursor() {
    let inner = Arc::new(FakeIdpAdapter::new());
    let failing = FailingOnceIdpAdapter { inner: inner.clone(), failed: AtomicUsize::new(0) };
    let directory = FakeDirectoryAdapter::new();
    let clock = FakeClock::new(Utc::now());
    let poller = EventLogPoller::new(Arc::new(failing), Arc::new(directory), Arc::new(clock.clone()), PollerConfig::default());

    let t0 = poller.cursor();
    clock.advance(chrono::Duration::seconds(30));
    let err = poller.tick().await.unwrap_err();
    assert!(matches!(err, idp_sync_core::Error::Upstream(_)));
    assert_eq!(poller.cursor(), t0, "cursor must not advance on a failed tick");

    poller.tick().await.unwrap();
    assert!(poller.cursor() > t0, "the retried tick succeeds and advances the cursor");
}

/// Delegates everything to an inner `FakeIdpAdapter` except the first call
/// to `get_logs_bounded`, which fails once to simulate a transient upstream
/// error (spec §8 scenario S6).
struct FailingOnceIdpAdapter {
    inner: Arc<FakeIdpAdapter>,
    failed: AtomicUsize,
}

#[async_trait]
impl IdpAdapter for FailingOnceIdpAdapter {
    async fn create_group(&self, profile: IdpGroupProfile) -> Result<IdpGroup> {
        self.inner.create_group(profile).await
    }
    async fn get_group(&self, id: &IdpGroupId) -> Result<Option<IdpGroup>> {
        self.inner.get_group(id).await
    }
    async fn find_group_by_directory_id(&self, directory_id: DirGroupId) -> Result<Option<IdpGroup>> {
        self.inner.find_group_by_directory_id(directory_id).await
    }
    async fn update_group_profile(&self, id: &IdpGroupId, profile: IdpGroupProfile) -> Result<()> {
        self.inner.update_group_profile(id, profile).await
    }
    async fn delete_group(&self, id: &IdpGroupId) -> Result<()> {
        self.inner.delete_group(id).await
    }
    async fn add_group_member(&self, group_id: &IdpGroupId, user_id: &IdpUserId) -> Result<()> {
        self.inner.add_group_member(group_id, user_id).await
    }
    async fn remove_group_member(&self, group_id: &IdpGroupId, user_id: &IdpUserId) -> Result<()> {
        self.inner.remove_group_member(group_id, user_id).await
    }
    async fn get_user(&self, id: &IdpUserId) -> Result<Option<IdpUser>> {
        self.inner.get_user(id).await
    }
    async fn find_user_by_email(&self, email: &str) -> Result<Option<IdpUser>> {
        self.inner.find_user_by_email(email).await
    }
    async fn list_users(&self) -> Result<Vec<IdpUser>> {
        self.inner.list_users().await
    }
    async fn deactivate_user(&self, id: &IdpUserId) -> Result<()> {
        self.inner.deactivate_user(id).await
    }
    async fn clear_user_sessions(&self, id: &IdpUserId) -> Result<()> {
        self.inner.clear_user_sessions(id).await
    }
    async fn suspend_user(&self, id: &IdpUserId) -> Result<()> {
        self.inner.suspend_user(id).await
    }
    async fn unsuspend_user(&self, id: &IdpUserId) -> Result<()> {
        self.inner.unsuspend_user(id).await
    }
    async fn delete_user(&self, id: &IdpUserId) -> Result<()> {
        self.inner.delete_user(id).await
    }
    async fn list_applications(&self) -> Result<Vec<IdpApplication>> {
        self.inner.list_applications().await
    }
    async fn list_application_group_assignments(&self, app_id: &IdpApplicationId) -> Result<Vec<IdpGroupId>> {
        self.inner.list_application_group_assignments(app_id).await
    }
    async fn assign_application_group(&self, app_id: &IdpApplicationId, group_id: &IdpGroupId) -> Result<()> {
        self.inner.assign_application_group(app_id, group_id).await
    }
    async fn unassign_application_group(&self, app_id: &IdpApplicationId, group_id: &IdpGroupId) -> Result<()> {
        self.inner.unassign_application_group(app_id, group_id).await
    }
    async fn get_logs_bounded(&self, since: DateTime<Utc>, until: DateTime<Utc>) -> Result<Vec<EventLogEntry>> {
        if self.failed.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(idp_sync_core::Error::Upstream(idp_sync_core::UpstreamError::Transient(
                "logs".into(),
                "simulated transient failure".into(),
            )));
        }
        self.inner.get_logs_bounded(since, until).await
    }
}
