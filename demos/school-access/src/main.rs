//! Walks a small district through the access guard
//!
//! One organization, one school, a teacher, a school admin and a parent.
//! Each check prints whether the guard allowed it.

use openschool_rbac::prelude::*;
use serde_json::json;
use std::sync::Arc;
use tracing::{Level, info};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("Starting school access walkthrough");

    let org = Uuid::new_v4();
    let school = Uuid::new_v4();
    let class_a = Uuid::new_v4();
    let class_b = Uuid::new_v4();
    let child = Uuid::new_v4();
    let other_child = Uuid::new_v4();

    let superintendent = Uuid::new_v4();
    let principal = Uuid::new_v4();
    let teacher = Uuid::new_v4();
    let parent = Uuid::new_v4();

    let store = Arc::new(MemoryMembershipStore::new());
    store
        .add_org_membership(OrgMembership::new(superintendent, org, OrgRole::OrgAdmin))
        .await;
    store
        .add_school_membership(SchoolMembership::new(principal, school, SchoolRole::SchoolAdmin))
        .await;
    store
        .add_school_membership(SchoolMembership::new(teacher, school, SchoolRole::Teacher))
        .await;
    store
        .add_class_assignment(ClassAssignment::new(teacher, class_a, true))
        .await;
    store
        .add_parent_link(ParentStudentLink::new(parent, child, "guardian"))
        .await;

    let audit = Arc::new(MemoryAuditSink::new());
    let guard = AccessGuard::builder(store.clone())
        .with_config(RbacConfig::development())
        .with_audit_logging(true)
        .with_audit_sink(audit.clone())
        .build()?;

    println!("\nPermission checks");
    println!("-----------------");

    let cases = [
        (
            superintendent,
            RequestedScope::org(org),
            PermissionKey::SettingsOrg,
            ResourceHints::none(),
            "Superintendent edits org settings",
        ),
        (
            principal,
            RequestedScope::school(school),
            PermissionKey::SettingsOrg,
            ResourceHints::none(),
            "Principal edits org settings",
        ),
        (
            principal,
            RequestedScope::school(school),
            PermissionKey::SettingsSchool,
            ResourceHints::none(),
            "Principal edits school settings",
        ),
        (
            teacher,
            RequestedScope::school(school),
            PermissionKey::GradesCreate,
            ResourceHints::class(class_a),
            "Teacher grades own class",
        ),
        (
            teacher,
            RequestedScope::school(school),
            PermissionKey::GradesCreate,
            ResourceHints::class(class_b),
            "Teacher grades another class",
        ),
        (
            parent,
            RequestedScope::none(),
            PermissionKey::GradesRead,
            ResourceHints::student(child),
            "Parent reads own child's grades",
        ),
        (
            parent,
            RequestedScope::none(),
            PermissionKey::GradesRead,
            ResourceHints::student(other_child),
            "Parent reads another child's grades",
        ),
    ];

    for (user_id, scope, key, hints, description) in cases {
        let caller = AuthenticatedUser::new(user_id);
        let outcome = guard.authorize(Some(&caller), &scope, key, &hints).await;
        let verdict = match &outcome {
            Ok(ctx) => format!("allowed as {}", ctx.effective_role()),
            Err(err) => format!("denied ({})", err),
        };
        println!("  {:<16} {description}: {verdict}", key.as_str());
    }

    println!("\nAudited mutation");
    println!("----------------");

    let caller = AuthenticatedUser::new(principal).with_email("principal@district.example");
    let ctx = guard
        .authorize(
            Some(&caller),
            &RequestedScope::school(school),
            PermissionKey::ClassesCreate,
            &ResourceHints::none(),
        )
        .await?;
    guard.ensure_school_access(&ctx, school)?;

    let created: anyhow::Result<Uuid> = guard
        .perform(
            &ctx,
            Some("198.51.100.4".to_string()),
            async { Ok(class_b) },
            |id| {
                AuditEvent::new(AuditAction::Create, "class")
                    .with_resource_id(*id)
                    .with_new_values(json!({"name": "Grade 4 Science", "schoolId": school}))
            },
        )
        .await;
    let class_id = created?;

    for record in audit.records().await {
        println!(
            "  {} {} {:?} by {} ({})",
            record.action,
            record.resource,
            record.resource_id,
            record.actor_user_id,
            record.actor_role
        );
    }

    println!("\nRevocation");
    println!("----------");

    store.revoke_user(teacher).await;
    let caller = AuthenticatedUser::new(teacher);
    let after = guard
        .authorize(
            Some(&caller),
            &RequestedScope::school(school),
            PermissionKey::GradesCreate,
            &ResourceHints::class(class_a),
        )
        .await;
    println!("  Teacher grades class after revocation: {}", after.is_ok());

    info!(class_id = %class_id, "Walkthrough complete");
    Ok(())
}
