//! Membership storage consumed by the tenant resolver

use async_trait::async_trait;
use openschool_core::{
    ClassAssignment, OrgMembership, ParentStudentLink, SchoolMembership, UserId,
};
use tokio::sync::RwLock;

/// Read access to the four membership relations, keyed by user id
///
/// Infrastructure (a database layer) implements this trait. The resolver
/// issues the four reads concurrently, so implementations must not depend on
/// call order.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn org_memberships(&self, user_id: UserId) -> anyhow::Result<Vec<OrgMembership>>;

    async fn school_memberships(
        &self,
        user_id: UserId,
    ) -> anyhow::Result<Vec<SchoolMembership>>;

    async fn class_assignments(&self, user_id: UserId) -> anyhow::Result<Vec<ClassAssignment>>;

    /// Links where `user_id` is the parent
    async fn parent_links(&self, user_id: UserId) -> anyhow::Result<Vec<ParentStudentLink>>;
}

/// In-memory membership store for tests, demos and development setups
#[derive(Debug, Default)]
pub struct MemoryMembershipStore {
    orgs: RwLock<Vec<OrgMembership>>,
    schools: RwLock<Vec<SchoolMembership>>,
    classes: RwLock<Vec<ClassAssignment>>,
    parents: RwLock<Vec<ParentStudentLink>>,
}

impl MemoryMembershipStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_org_membership(&self, membership: OrgMembership) {
        self.orgs.write().await.push(membership);
    }

    pub async fn add_school_membership(&self, membership: SchoolMembership) {
        self.schools.write().await.push(membership);
    }

    pub async fn add_class_assignment(&self, assignment: ClassAssignment) {
        self.classes.write().await.push(assignment);
    }

    pub async fn add_parent_link(&self, link: ParentStudentLink) {
        self.parents.write().await.push(link);
    }

    /// Drop every membership held by `user_id`
    pub async fn revoke_user(&self, user_id: UserId) {
        self.orgs.write().await.retain(|m| m.user_id != user_id);
        self.schools.write().await.retain(|m| m.user_id != user_id);
        self.classes.write().await.retain(|a| a.user_id != user_id);
        self.parents.write().await.retain(|l| l.parent_id != user_id);
    }
}

#[async_trait]
impl MembershipStore for MemoryMembershipStore {
    async fn org_memberships(&self, user_id: UserId) -> anyhow::Result<Vec<OrgMembership>> {
        let orgs = self.orgs.read().await;
        Ok(orgs.iter().filter(|m| m.user_id == user_id).cloned().collect())
    }

    async fn school_memberships(
        &self,
        user_id: UserId,
    ) -> anyhow::Result<Vec<SchoolMembership>> {
        let schools = self.schools.read().await;
        Ok(schools
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn class_assignments(&self, user_id: UserId) -> anyhow::Result<Vec<ClassAssignment>> {
        let classes = self.classes.read().await;
        Ok(classes
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn parent_links(&self, user_id: UserId) -> anyhow::Result<Vec<ParentStudentLink>> {
        let parents = self.parents.read().await;
        Ok(parents
            .iter()
            .filter(|l| l.parent_id == user_id)
            .cloned()
            .collect())
    }
}
