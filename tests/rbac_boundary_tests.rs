//! Failure and boundary behaviour of the access-control engine
//!
//! Covers the paths a handler must never get wrong: missing identity,
//! storage failures, timeouts, audit sink failures and concurrent use.

use anyhow::Result;
use async_trait::async_trait;
use openschool::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// Store whose school lookup always fails, counting calls per relation
#[derive(Default)]
struct FlakyStore {
    calls: AtomicUsize,
}

#[async_trait]
impl MembershipStore for FlakyStore {
    async fn org_memberships(&self, user_id: UserId) -> anyhow::Result<Vec<OrgMembership>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![OrgMembership::new(user_id, Uuid::new_v4(), OrgRole::OrgAdmin)])
    }

    async fn school_memberships(&self, _user_id: UserId) -> anyhow::Result<Vec<SchoolMembership>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("school_memberships: connection refused")
    }

    async fn class_assignments(&self, _user_id: UserId) -> anyhow::Result<Vec<ClassAssignment>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    async fn parent_links(&self, _user_id: UserId) -> anyhow::Result<Vec<ParentStudentLink>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

/// Store that never answers the parent lookup
struct HangingStore;

#[async_trait]
impl MembershipStore for HangingStore {
    async fn org_memberships(&self, _user_id: UserId) -> anyhow::Result<Vec<OrgMembership>> {
        Ok(Vec::new())
    }

    async fn school_memberships(&self, _user_id: UserId) -> anyhow::Result<Vec<SchoolMembership>> {
        Ok(Vec::new())
    }

    async fn class_assignments(&self, _user_id: UserId) -> anyhow::Result<Vec<ClassAssignment>> {
        Ok(Vec::new())
    }

    async fn parent_links(&self, _user_id: UserId) -> anyhow::Result<Vec<ParentStudentLink>> {
        std::future::pending::<()>().await;
        Ok(Vec::new())
    }
}

struct BrokenAuditSink;

#[async_trait]
impl AuditSink for BrokenAuditSink {
    async fn record(&self, _record: AuditRecord) -> anyhow::Result<()> {
        anyhow::bail!("audit_logs insert failed")
    }
}

/// Sink that accepts the record and never finishes writing it
struct StalledAuditSink;

#[async_trait]
impl AuditSink for StalledAuditSink {
    async fn record(&self, _record: AuditRecord) -> anyhow::Result<()> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

#[tokio::test]
async fn test_unauthenticated_request_never_reaches_store() -> Result<()> {
    let store = Arc::new(FlakyStore::default());
    let guard = AccessGuard::builder(store.clone()).build()?;

    let err = guard
        .authorize(
            None,
            &RequestedScope::none(),
            PermissionKey::StudentsRead,
            &ResourceHints::none(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RbacError::Unauthenticated));
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn test_partial_lookup_failure_returns_no_context() -> Result<()> {
    let guard = AccessGuard::builder(Arc::new(FlakyStore::default())).build()?;
    let caller = AuthenticatedUser::new(Uuid::new_v4());

    let err = guard
        .authorize(
            Some(&caller),
            &RequestedScope::none(),
            PermissionKey::TeachersRead,
            &ResourceHints::none(),
        )
        .await
        .unwrap_err();

    // Not downgraded to a denial, and flagged for a whole-request retry
    assert!(matches!(err, RbacError::ResolutionFailure(_)));
    assert!(err.is_retryable());
    assert!(!err.is_forbidden());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_hanging_lookup_times_out() -> Result<()> {
    let mut config = RbacConfig::default();
    config.resolver.lookup_timeout_ms = 250;
    let guard = AccessGuard::builder(Arc::new(HangingStore))
        .with_config(config)
        .build()?;

    let err = guard
        .resolver()
        .resolve(Uuid::new_v4(), &RequestedScope::none())
        .await
        .unwrap_err();
    assert!(matches!(err, RbacError::ResolutionFailure(_)));
    Ok(())
}

#[tokio::test]
async fn test_cancelled_resolution_has_no_side_effects() -> Result<()> {
    let guard = AccessGuard::builder(Arc::new(HangingStore)).build()?;

    let outcome = tokio::time::timeout(
        Duration::from_millis(20),
        guard
            .resolver()
            .resolve(Uuid::new_v4(), &RequestedScope::none()),
    )
    .await;
    assert!(outcome.is_err(), "caller-side cancellation should win");
    Ok(())
}

#[tokio::test]
async fn test_audit_failure_does_not_fail_mutation() -> Result<()> {
    let store = Arc::new(MemoryMembershipStore::new());
    let user = Uuid::new_v4();
    let school = Uuid::new_v4();
    store
        .add_school_membership(SchoolMembership::new(user, school, SchoolRole::Staff))
        .await;

    let guard = AccessGuard::builder(store)
        .with_audit_sink(Arc::new(BrokenAuditSink))
        .build()?;
    let caller = AuthenticatedUser::new(user).with_email("registrar@school.example");
    let ctx = guard
        .authorize(
            Some(&caller),
            &RequestedScope::school(school),
            PermissionKey::StudentsCreate,
            &ResourceHints::none(),
        )
        .await?;
    guard.ensure_school_access(&ctx, school)?;

    let student_id = Uuid::new_v4();
    let created: std::result::Result<Uuid, anyhow::Error> = guard
        .perform(
            &ctx,
            Some("203.0.113.9".to_string()),
            async move { Ok(student_id) },
            |id| {
                AuditEvent::new(AuditAction::Create, "student")
                    .with_resource_id(*id)
                    .with_new_values(json!({"firstName": "Lin", "lastName": "Okafor"}))
            },
        )
        .await;

    assert_eq!(created?, student_id);
    Ok(())
}

#[tokio::test]
async fn test_update_flow_audits_old_and_new_values() -> Result<()> {
    let store = Arc::new(MemoryMembershipStore::new());
    let sink = Arc::new(MemoryAuditSink::new());
    let user = Uuid::new_v4();
    let org = Uuid::new_v4();
    store
        .add_org_membership(OrgMembership::new(user, org, OrgRole::OrgAdmin))
        .await;

    let guard = AccessGuard::builder(store).with_audit_sink(sink.clone()).build()?;
    let caller = AuthenticatedUser::new(user);
    let ctx = guard
        .authenticate(Some(&caller), &RequestedScope::org(org))
        .await?;

    let student_id = Uuid::new_v4();
    let existing = guard
        .authorize_existing(
            &ctx,
            PermissionKey::StudentsUpdate,
            "Student",
            async move { Ok::<_, RbacError>(Some(json!({"id": student_id, "firstName": "Sam"}))) },
            |_| ResourceHints::none(),
        )
        .await?;

    let updated: std::result::Result<serde_json::Value, anyhow::Error> = guard
        .perform(
            &ctx,
            None,
            async { Ok(json!({"id": student_id, "firstName": "Samuel"})) },
            |new| {
                AuditEvent::new(AuditAction::Update, "student")
                    .with_resource_id(student_id)
                    .with_old_values(existing.clone())
                    .with_new_values(new.clone())
            },
        )
        .await;
    updated?;

    let records = sink.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, AuditAction::Update);
    assert_eq!(records[0].org_id, Some(org));
    assert_eq!(records[0].old_values.as_ref().unwrap()["firstName"], "Sam");
    assert_eq!(records[0].new_values.as_ref().unwrap()["firstName"], "Samuel");
    Ok(())
}

#[tokio::test]
async fn test_concurrent_checks_share_one_checker() -> Result<()> {
    let checker = Arc::new(PermissionChecker::standard());
    let class = Uuid::new_v4();
    let mut handles = Vec::new();

    for i in 0..50 {
        let checker = checker.clone();
        handles.push(tokio::spawn(async move {
            let classes = if i % 2 == 0 { vec![class] } else { Vec::new() };
            let ctx = TenantContext::builder(Uuid::new_v4())
                .with_classes(classes)
                .with_role(Role::Teacher)
                .build();
            (
                i,
                checker.has_permission(
                    &ctx,
                    PermissionKey::ReportsClass,
                    &ResourceHints::class(class),
                ),
            )
        }));
    }

    for joined in futures::future::join_all(handles).await {
        let (i, allowed) = joined?;
        assert_eq!(allowed, i % 2 == 0, "request {}", i);
    }
    Ok(())
}

#[tokio::test]
async fn test_config_file_overrides_reach_the_checker() -> Result<()> {
    let file = tempfile::NamedTempFile::new()?;
    std::fs::write(
        file.path(),
        r#"{
            "audit_enabled": false,
            "resolver": { "lookup_timeout_ms": 1500 },
            "permission_overrides": {
                "grades:delete": ["school_admin", "org_admin"]
            }
        }"#,
    )?;
    let config = RbacConfig::from_file(file.path().to_str().unwrap())?;

    let guard = AccessGuard::builder(Arc::new(MemoryMembershipStore::new()))
        .with_config(config)
        .build()?;
    let org_admin = TenantContext::builder(Uuid::new_v4())
        .with_role(Role::OrgAdmin)
        .build();

    assert!(guard.checker().has_permission(
        &org_admin,
        PermissionKey::GradesDelete,
        &ResourceHints::none()
    ));
    // untouched keys keep the standard rules
    assert!(!guard.checker().has_permission(
        &org_admin,
        PermissionKey::GradesCreate,
        &ResourceHints::none()
    ));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stalled_audit_sink_does_not_hold_mutation() -> Result<()> {
    let mut config = RbacConfig::default();
    config.audit_timeout_ms = 300;
    let guard = AccessGuard::builder(Arc::new(MemoryMembershipStore::new()))
        .with_config(config)
        .with_audit_sink(Arc::new(StalledAuditSink))
        .build()?;
    let ctx = TenantContext::builder(Uuid::new_v4())
        .with_role(Role::SchoolAdmin)
        .build();

    let started = tokio::time::Instant::now();
    let outcome = tokio::time::timeout(
        Duration::from_secs(2),
        guard.perform(
            &ctx,
            None,
            async { Ok::<_, anyhow::Error>(42) },
            |_| AuditEvent::new(AuditAction::Create, "grade"),
        ),
    )
    .await;

    let value = outcome.expect("mutation must return while the audit sink is stalled")?;
    assert_eq!(value, 42);
    assert!(started.elapsed() >= Duration::from_millis(300));
    Ok(())
}
