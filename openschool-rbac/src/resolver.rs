//! Tenant context resolution
//!
//! [`TenantResolver::resolve`] reads the four membership relations for a user,
//! projects them into id sets and selects one effective role for the request:
//!
//! 1. the role of the org membership matching the requested org, else
//! 2. the role of the school membership matching the requested school, else
//! 3. `parent` when the user is linked to at least one student, else
//! 4. `student`.
//!
//! The four reads run concurrently under one timeout. If any of them fails the
//! resolution fails as a whole; a partially populated context is never returned.

use crate::config::ResolverConfig;
use crate::context::{RequestedScope, TenantContext};
use crate::error::RbacError;
use crate::store::MembershipStore;
use openschool_core::{OrgMembership, ParentStudentLink, Role, SchoolMembership, UserId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

type RbacResult<T> = std::result::Result<T, RbacError>;

/// Builds a fresh [`TenantContext`] per request from the membership store
#[derive(Clone)]
pub struct TenantResolver {
    store: Arc<dyn MembershipStore>,
    lookup_timeout: Duration,
}

impl TenantResolver {
    pub fn new(store: Arc<dyn MembershipStore>) -> Self {
        Self::with_config(store, &ResolverConfig::default())
    }

    pub fn with_config(store: Arc<dyn MembershipStore>, config: &ResolverConfig) -> Self {
        Self {
            store,
            lookup_timeout: config.lookup_timeout(),
        }
    }

    pub async fn resolve(
        &self,
        user_id: UserId,
        scope: &RequestedScope,
    ) -> RbacResult<TenantContext> {
        self.resolve_with_email(user_id, None, scope).await
    }

    /// Resolve and attach the authenticated email, which audit records carry
    pub async fn resolve_with_email(
        &self,
        user_id: UserId,
        user_email: Option<String>,
        scope: &RequestedScope,
    ) -> RbacResult<TenantContext> {
        debug!(
            user_id = %user_id,
            org_id = ?scope.org_id,
            school_id = ?scope.school_id,
            "Resolving tenant context"
        );

        let lookups = async {
            tokio::try_join!(
                self.store.org_memberships(user_id),
                self.store.school_memberships(user_id),
                self.store.class_assignments(user_id),
                self.store.parent_links(user_id),
            )
        };

        let (orgs, schools, classes, parents) = tokio::time::timeout(self.lookup_timeout, lookups)
            .await
            .map_err(|_| {
                warn!(
                    user_id = %user_id,
                    timeout = ?self.lookup_timeout,
                    "Membership lookups timed out"
                );
                RbacError::ResolutionFailure(format!(
                    "membership lookups timed out after {:?}",
                    self.lookup_timeout
                ))
            })?
            .map_err(|e| {
                warn!(user_id = %user_id, error = %e, "Membership lookup failed");
                RbacError::ResolutionFailure(e.to_string())
            })?;

        let effective_role = select_effective_role(&orgs, &schools, &parents, scope);

        let context = TenantContext::builder(user_id)
            .with_email(user_email)
            .with_orgs(orgs.iter().map(|m| m.org_id))
            .with_schools(schools.iter().map(|m| m.school_id))
            .with_classes(classes.iter().map(|a| a.class_id))
            .with_students(parents.iter().map(|l| l.student_id))
            .with_scope(scope)
            .with_role(effective_role)
            .build();

        debug!(
            user_id = %user_id,
            role = %effective_role,
            orgs = context.org_ids().len(),
            schools = context.school_ids().len(),
            classes = context.class_ids().len(),
            students = context.student_ids().len(),
            "Tenant context resolved"
        );

        Ok(context)
    }
}

/// First match wins; see the module docs for the precedence.
pub(crate) fn select_effective_role(
    orgs: &[OrgMembership],
    schools: &[SchoolMembership],
    parents: &[ParentStudentLink],
    scope: &RequestedScope,
) -> Role {
    if let Some(org_id) = scope.org_id
        && let Some(membership) = orgs.iter().find(|m| m.org_id == org_id)
    {
        return membership.role.effective_role();
    }

    if let Some(school_id) = scope.school_id
        && let Some(membership) = schools.iter().find(|m| m.school_id == school_id)
    {
        return membership.role.effective_role();
    }

    if !parents.is_empty() {
        return Role::Parent;
    }

    Role::Student
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryMembershipStore, MockMembershipStore};
    use async_trait::async_trait;
    use openschool_core::{ClassAssignment, OrgRole, SchoolRole};
    use uuid::Uuid;

    fn empty_mock() -> MockMembershipStore {
        let mut store = MockMembershipStore::new();
        store.expect_org_memberships().returning(|_| Ok(Vec::new()));
        store.expect_school_memberships().returning(|_| Ok(Vec::new()));
        store.expect_class_assignments().returning(|_| Ok(Vec::new()));
        store.expect_parent_links().returning(|_| Ok(Vec::new()));
        store
    }

    #[tokio::test]
    async fn test_zero_memberships_resolve_to_student() {
        let resolver = TenantResolver::new(Arc::new(empty_mock()));
        let ctx = resolver
            .resolve(Uuid::new_v4(), &RequestedScope::none())
            .await
            .unwrap();

        assert!(ctx.is_empty());
        assert_eq!(ctx.effective_role(), Role::Student);
    }

    #[tokio::test]
    async fn test_requested_org_outranks_parent_default() {
        let user = Uuid::new_v4();
        let org = Uuid::new_v4();
        let mut store = MockMembershipStore::new();
        store
            .expect_org_memberships()
            .with(mockall::predicate::eq(user))
            .returning(move |u| Ok(vec![OrgMembership::new(u, org, OrgRole::OrgAdmin)]));
        store.expect_school_memberships().returning(|_| Ok(Vec::new()));
        store.expect_class_assignments().returning(|_| Ok(Vec::new()));
        store
            .expect_parent_links()
            .returning(|u| Ok(vec![ParentStudentLink::new(u, Uuid::new_v4(), "mother")]));

        let resolver = TenantResolver::new(Arc::new(store));

        let scoped = resolver.resolve(user, &RequestedScope::org(org)).await.unwrap();
        assert_eq!(scoped.effective_role(), Role::OrgAdmin);
        assert_eq!(scoped.active_org_id(), Some(org));

        let unscoped = resolver.resolve(user, &RequestedScope::none()).await.unwrap();
        assert_eq!(unscoped.effective_role(), Role::Parent);
    }

    #[tokio::test]
    async fn test_any_lookup_failure_fails_resolution() {
        let mut store = MockMembershipStore::new();
        store.expect_org_memberships().returning(|_| Ok(Vec::new()));
        store
            .expect_school_memberships()
            .returning(|_| Err(anyhow::anyhow!("connection reset")));
        store.expect_class_assignments().returning(|_| Ok(Vec::new()));
        store.expect_parent_links().returning(|_| Ok(Vec::new()));

        let resolver = TenantResolver::new(Arc::new(store));
        let err = resolver
            .resolve(Uuid::new_v4(), &RequestedScope::none())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RbacError::ResolutionFailure(ref msg) if msg.contains("connection reset")
        ));
        assert!(err.is_retryable());
    }

    struct StalledStore;

    #[async_trait]
    impl MembershipStore for StalledStore {
        async fn org_memberships(&self, _: UserId) -> anyhow::Result<Vec<OrgMembership>> {
            Ok(Vec::new())
        }

        async fn school_memberships(&self, _: UserId) -> anyhow::Result<Vec<SchoolMembership>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Vec::new())
        }

        async fn class_assignments(&self, _: UserId) -> anyhow::Result<Vec<ClassAssignment>> {
            Ok(Vec::new())
        }

        async fn parent_links(&self, _: UserId) -> anyhow::Result<Vec<ParentStudentLink>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_lookup_timeout_is_resolution_failure() {
        let config = ResolverConfig {
            lookup_timeout_ms: 20,
        };
        let resolver = TenantResolver::with_config(Arc::new(StalledStore), &config);

        let err = resolver
            .resolve(Uuid::new_v4(), &RequestedScope::none())
            .await
            .unwrap_err();
        assert!(matches!(err, RbacError::ResolutionFailure(ref msg) if msg.contains("timed out")));
    }

    #[tokio::test]
    async fn test_school_scope_and_class_ids() {
        let store = MemoryMembershipStore::new();
        let user = Uuid::new_v4();
        let school = Uuid::new_v4();
        let class = Uuid::new_v4();
        store
            .add_school_membership(SchoolMembership::new(user, school, SchoolRole::Teacher))
            .await;
        store
            .add_class_assignment(ClassAssignment::new(user, class, true))
            .await;
        // duplicate rows are tolerated
        store
            .add_class_assignment(ClassAssignment::new(user, class, false))
            .await;

        let resolver = TenantResolver::new(Arc::new(store));
        let ctx = resolver
            .resolve_with_email(
                user,
                Some("teacher@example.org".to_string()),
                &RequestedScope::school(school),
            )
            .await
            .unwrap();

        assert_eq!(ctx.effective_role(), Role::Teacher);
        assert_eq!(ctx.class_ids().iter().copied().collect::<Vec<_>>(), vec![class]);
        assert_eq!(ctx.user_email(), Some("teacher@example.org"));
        assert_eq!(ctx.active_school_id(), Some(school));
    }

    #[tokio::test]
    async fn test_fixture_context_matches_resolved_context() {
        let store = MemoryMembershipStore::new();
        let user = Uuid::new_v4();
        let org = Uuid::new_v4();
        let student = Uuid::new_v4();
        store
            .add_org_membership(OrgMembership::new(user, org, OrgRole::OrgAdmin))
            .await;
        store
            .add_parent_link(ParentStudentLink::new(user, student, "father"))
            .await;

        let scope = RequestedScope::org(org);
        let resolved = TenantResolver::new(Arc::new(store))
            .resolve(user, &scope)
            .await
            .unwrap();
        let fixture = TenantContext::builder(user)
            .with_orgs([org])
            .with_students([student])
            .with_scope(&scope)
            .with_role(Role::OrgAdmin)
            .build();

        assert_eq!(resolved, fixture);
    }

    #[test]
    fn test_precedence_rules() {
        let user = Uuid::new_v4();
        let org = Uuid::new_v4();
        let school = Uuid::new_v4();
        let orgs = vec![OrgMembership::new(user, org, OrgRole::OrgViewer)];
        let schools = vec![SchoolMembership::new(user, school, SchoolRole::SchoolAdmin)];
        let parents = vec![ParentStudentLink::new(user, Uuid::new_v4(), "guardian")];

        // org scope wins over school scope, even for a viewer membership
        let both = RequestedScope::org(org).with_school(school);
        assert_eq!(
            select_effective_role(&orgs, &schools, &parents, &both),
            Role::OrgViewer
        );

        // unknown org falls through to the school
        let other_org = RequestedScope::org(Uuid::new_v4()).with_school(school);
        assert_eq!(
            select_effective_role(&orgs, &schools, &parents, &other_org),
            Role::SchoolAdmin
        );

        // unknown school falls through to the parent default
        let other_school = RequestedScope::school(Uuid::new_v4());
        assert_eq!(
            select_effective_role(&orgs, &schools, &parents, &other_school),
            Role::Parent
        );

        // memberships without a matching scope never raise the role
        assert_eq!(
            select_effective_role(&orgs, &schools, &[], &RequestedScope::none()),
            Role::Student
        );
    }
}
