//! Request-scoped tenant context
//!
//! A [`TenantContext`] is the resolved snapshot of what one user may reach
//! during one request. It is built fresh for every request and never mutated
//! afterwards; its fields are private and only readable through accessors.

use openschool_core::{ClassId, OrgId, Role, SchoolId, StudentId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Organization/school scope a request asks to act in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedScope {
    pub org_id: Option<OrgId>,
    pub school_id: Option<SchoolId>,
}

impl RequestedScope {
    /// No particular scope
    pub fn none() -> Self {
        Self::default()
    }

    pub fn org(org_id: OrgId) -> Self {
        Self {
            org_id: Some(org_id),
            school_id: None,
        }
    }

    pub fn school(school_id: SchoolId) -> Self {
        Self {
            org_id: None,
            school_id: Some(school_id),
        }
    }

    pub fn with_school(mut self, school_id: SchoolId) -> Self {
        self.school_id = Some(school_id);
        self
    }
}

/// Identifiers of the resource being accessed, used by scoped specifiers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHints {
    pub resource_owner_id: Option<UserId>,
    pub resource_class_id: Option<ClassId>,
    pub resource_student_id: Option<StudentId>,
}

impl ResourceHints {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn owner(owner_id: UserId) -> Self {
        Self {
            resource_owner_id: Some(owner_id),
            ..Self::default()
        }
    }

    pub fn class(class_id: ClassId) -> Self {
        Self {
            resource_class_id: Some(class_id),
            ..Self::default()
        }
    }

    pub fn student(student_id: StudentId) -> Self {
        Self {
            resource_student_id: Some(student_id),
            ..Self::default()
        }
    }

    pub fn with_owner(mut self, owner_id: UserId) -> Self {
        self.resource_owner_id = Some(owner_id);
        self
    }

    pub fn with_class(mut self, class_id: ClassId) -> Self {
        self.resource_class_id = Some(class_id);
        self
    }

    pub fn with_student(mut self, student_id: StudentId) -> Self {
        self.resource_student_id = Some(student_id);
        self
    }
}

/// Resolved, immutable snapshot of a user's accessible scope and effective role
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantContext {
    user_id: UserId,
    user_email: Option<String>,
    org_ids: BTreeSet<OrgId>,
    school_ids: BTreeSet<SchoolId>,
    class_ids: BTreeSet<ClassId>,
    student_ids: BTreeSet<StudentId>,
    active_org_id: Option<OrgId>,
    active_school_id: Option<SchoolId>,
    effective_role: Role,
}

impl TenantContext {
    /// Start building a context for `user_id`; the effective role defaults to student
    ///
    /// Fixture constructor for tests, demos and callers that already hold
    /// verified membership data. It trusts every value it is given, including
    /// the effective role. Request handlers must take their context from
    /// [`TenantResolver`](crate::resolver::TenantResolver) or
    /// [`AccessGuard`](crate::guard::AccessGuard), never from this builder.
    ///
    /// ```rust
    /// use openschool_rbac::prelude::*;
    ///
    /// let class = uuid::Uuid::new_v4();
    /// let teacher = TenantContext::builder(uuid::Uuid::new_v4())
    ///     .with_classes([class])
    ///     .with_role(Role::Teacher)
    ///     .build();
    ///
    /// let checker = PermissionChecker::standard();
    /// assert!(checker.has_permission(
    ///     &teacher,
    ///     PermissionKey::GradesCreate,
    ///     &ResourceHints::class(class)
    /// ));
    /// ```
    pub fn builder(user_id: UserId) -> TenantContextBuilder {
        TenantContextBuilder::new(user_id)
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn user_email(&self) -> Option<&str> {
        self.user_email.as_deref()
    }

    pub fn org_ids(&self) -> &BTreeSet<OrgId> {
        &self.org_ids
    }

    pub fn school_ids(&self) -> &BTreeSet<SchoolId> {
        &self.school_ids
    }

    pub fn class_ids(&self) -> &BTreeSet<ClassId> {
        &self.class_ids
    }

    pub fn student_ids(&self) -> &BTreeSet<StudentId> {
        &self.student_ids
    }

    pub fn active_org_id(&self) -> Option<OrgId> {
        self.active_org_id
    }

    pub fn active_school_id(&self) -> Option<SchoolId> {
        self.active_school_id
    }

    pub fn effective_role(&self) -> Role {
        self.effective_role
    }

    pub fn can_access_org(&self, org_id: OrgId) -> bool {
        self.org_ids.contains(&org_id)
    }

    pub fn can_access_school(&self, school_id: SchoolId) -> bool {
        self.school_ids.contains(&school_id)
    }

    pub fn can_access_class(&self, class_id: ClassId) -> bool {
        self.class_ids.contains(&class_id)
    }

    pub fn can_access_student(&self, student_id: StudentId) -> bool {
        self.student_ids.contains(&student_id)
    }

    /// True when the user holds no membership of any kind
    pub fn is_empty(&self) -> bool {
        self.org_ids.is_empty()
            && self.school_ids.is_empty()
            && self.class_ids.is_empty()
            && self.student_ids.is_empty()
    }
}

/// Builder for [`TenantContext`], used by the resolver and by test fixtures
///
/// Id sets deduplicate on insert. See [`TenantContext::builder`] for when
/// handler code may use it.
#[derive(Debug, Clone)]
pub struct TenantContextBuilder {
    context: TenantContext,
}

impl TenantContextBuilder {
    pub fn new(user_id: UserId) -> Self {
        Self {
            context: TenantContext {
                user_id,
                user_email: None,
                org_ids: BTreeSet::new(),
                school_ids: BTreeSet::new(),
                class_ids: BTreeSet::new(),
                student_ids: BTreeSet::new(),
                active_org_id: None,
                active_school_id: None,
                effective_role: Role::Student,
            },
        }
    }

    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.context.user_email = email;
        self
    }

    pub fn with_orgs<I: IntoIterator<Item = OrgId>>(mut self, ids: I) -> Self {
        self.context.org_ids.extend(ids);
        self
    }

    pub fn with_schools<I: IntoIterator<Item = SchoolId>>(mut self, ids: I) -> Self {
        self.context.school_ids.extend(ids);
        self
    }

    pub fn with_classes<I: IntoIterator<Item = ClassId>>(mut self, ids: I) -> Self {
        self.context.class_ids.extend(ids);
        self
    }

    pub fn with_students<I: IntoIterator<Item = StudentId>>(mut self, ids: I) -> Self {
        self.context.student_ids.extend(ids);
        self
    }

    /// Echo the requested scope into the active org/school ids
    pub fn with_scope(mut self, scope: &RequestedScope) -> Self {
        self.context.active_org_id = scope.org_id;
        self.context.active_school_id = scope.school_id;
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.context.effective_role = role;
        self
    }

    pub fn build(self) -> TenantContext {
        self.context
    }
}
