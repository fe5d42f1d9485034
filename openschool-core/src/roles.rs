//! Role vocabulary and privilege hierarchy
//!
//! The seven system roles are totally ordered:
//! `super_admin > org_admin > school_admin > staff > teacher > parent > student`.
//! The ordering is informational. Permission decisions never compare levels;
//! they look roles up in the permission table.
//!
//! [`Role::OrgViewer`] sits outside the hierarchy. It is what a selected
//! `org_viewer` membership resolves to, and the standard permission table
//! grants it nothing.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// System role used for permission decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform-level access across every organization
    SuperAdmin,
    /// Organization (district-level) administrator
    OrgAdmin,
    /// School administrator
    SchoolAdmin,
    /// Non-teaching school staff
    Staff,
    /// Classroom teacher
    Teacher,
    /// Parent or guardian of one or more students
    Parent,
    /// Student; also the default for users with no scoped role
    Student,
    /// Read-only organization member; not one of the seven system roles
    OrgViewer,
}

impl Role {
    /// The seven system roles, highest privilege first. Excludes [`Role::OrgViewer`].
    pub const ALL: [Role; 7] = [
        Role::SuperAdmin,
        Role::OrgAdmin,
        Role::SchoolAdmin,
        Role::Staff,
        Role::Teacher,
        Role::Parent,
        Role::Student,
    ];

    /// Privilege level; higher numbers mean more privilege. `OrgViewer` is 0.
    pub const fn level(self) -> u8 {
        match self {
            Role::SuperAdmin => 100,
            Role::OrgAdmin => 80,
            Role::SchoolAdmin => 60,
            Role::Staff => 40,
            Role::Teacher => 30,
            Role::Parent => 20,
            Role::Student => 10,
            Role::OrgViewer => 0,
        }
    }

    /// Stable snake_case identifier, as stored and logged
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::OrgAdmin => "org_admin",
            Role::SchoolAdmin => "school_admin",
            Role::Staff => "staff",
            Role::Teacher => "teacher",
            Role::Parent => "parent",
            Role::Student => "student",
            Role::OrgViewer => "org_viewer",
        }
    }

    /// Whether this role sits strictly above `other` in the hierarchy
    pub fn outranks(self, other: Role) -> bool {
        self.level() > other.level()
    }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> Ordering {
        self.level().cmp(&other.level())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .chain([Role::OrgViewer])
            .find(|role| role.as_str() == s)
            .ok_or_else(|| Error::UnknownRole(s.to_string()))
    }
}

/// Role label carried by an organization membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgRole {
    /// Administers the organization
    OrgAdmin,
    /// Read-only organization member
    OrgViewer,
}

impl OrgRole {
    /// Role this membership confers when it is selected for a request
    pub const fn effective_role(self) -> Role {
        match self {
            OrgRole::OrgAdmin => Role::OrgAdmin,
            OrgRole::OrgViewer => Role::OrgViewer,
        }
    }

    /// Stable snake_case identifier
    pub const fn as_str(self) -> &'static str {
        match self {
            OrgRole::OrgAdmin => "org_admin",
            OrgRole::OrgViewer => "org_viewer",
        }
    }
}

impl fmt::Display for OrgRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrgRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "org_admin" => Ok(OrgRole::OrgAdmin),
            "org_viewer" => Ok(OrgRole::OrgViewer),
            _ => Err(Error::UnknownOrgRole(s.to_string())),
        }
    }
}

/// Role label carried by a school membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchoolRole {
    /// Administers the school
    SchoolAdmin,
    /// Non-teaching staff
    Staff,
    /// Teacher at the school
    Teacher,
}

impl SchoolRole {
    /// Role this membership confers when it is selected for a request
    pub const fn effective_role(self) -> Role {
        match self {
            SchoolRole::SchoolAdmin => Role::SchoolAdmin,
            SchoolRole::Staff => Role::Staff,
            SchoolRole::Teacher => Role::Teacher,
        }
    }
}

impl fmt::Display for SchoolRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.effective_role().as_str())
    }
}

impl FromStr for SchoolRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "school_admin" => Ok(SchoolRole::SchoolAdmin),
            "staff" => Ok(SchoolRole::Staff),
            "teacher" => Ok(SchoolRole::Teacher),
            _ => Err(Error::UnknownSchoolRole(s.to_string())),
        }
    }
}
