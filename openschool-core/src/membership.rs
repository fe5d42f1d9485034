//! Membership records linking users to tenant entities
//!
//! Four relations exist, each keyed by the user they belong to. A user may
//! hold any mix of them at once.

use crate::roles::{OrgRole, SchoolRole};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of an authenticated user
pub type UserId = Uuid;
/// Identifier of an organization
pub type OrgId = Uuid;
/// Identifier of a school
pub type SchoolId = Uuid;
/// Identifier of a class
pub type ClassId = Uuid;
/// Identifier of a student record
pub type StudentId = Uuid;

/// A user's role within an organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgMembership {
    /// Member
    pub user_id: UserId,
    /// Organization the membership applies to
    pub org_id: OrgId,
    /// Role held within the organization
    pub role: OrgRole,
}

impl OrgMembership {
    /// Create an organization membership
    pub fn new(user_id: UserId, org_id: OrgId, role: OrgRole) -> Self {
        Self {
            user_id,
            org_id,
            role,
        }
    }
}

/// A user's role within a school
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolMembership {
    /// Member
    pub user_id: UserId,
    /// School the membership applies to
    pub school_id: SchoolId,
    /// Role held within the school
    pub role: SchoolRole,
}

impl SchoolMembership {
    /// Create a school membership
    pub fn new(user_id: UserId, school_id: SchoolId, role: SchoolRole) -> Self {
        Self {
            user_id,
            school_id,
            role,
        }
    }
}

/// Assignment of a teacher to a class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassAssignment {
    /// Assigned teacher
    pub user_id: UserId,
    /// Class taught
    pub class_id: ClassId,
    /// Whether this teacher is the class's primary teacher
    pub is_primary: bool,
}

impl ClassAssignment {
    /// Create a class assignment
    pub fn new(user_id: UserId, class_id: ClassId, is_primary: bool) -> Self {
        Self {
            user_id,
            class_id,
            is_primary,
        }
    }
}

/// Link between a parent or guardian and a student
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentStudentLink {
    /// Parent or guardian user
    pub parent_id: UserId,
    /// Linked student
    pub student_id: StudentId,
    /// Free-form relationship label ("mother", "guardian", ...)
    pub relationship: String,
}

impl ParentStudentLink {
    /// Create a parent-student link
    pub fn new(parent_id: UserId, student_id: StudentId, relationship: &str) -> Self {
        Self {
            parent_id,
            student_id,
            relationship: relationship.to_string(),
        }
    }
}
