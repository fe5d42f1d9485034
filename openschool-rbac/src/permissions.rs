//! Permission keys, specifiers and the permission table
//!
//! The table is data: each [`PermissionKey`] maps to an ordered list of
//! [`Specifier`]s. A specifier is either a bare role (any holder of that
//! effective role passes) or a role narrowed by a [`Modifier`] that requires a
//! relationship to the resource being accessed.

use crate::error::RbacError;
use openschool_core::Role;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

type RbacResult<T> = std::result::Result<T, RbacError>;

/// Closed vocabulary of `resource:action` permission keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PermissionKey {
    #[serde(rename = "students:create")]
    StudentsCreate,
    #[serde(rename = "students:read")]
    StudentsRead,
    #[serde(rename = "students:update")]
    StudentsUpdate,
    #[serde(rename = "students:delete")]
    StudentsDelete,

    #[serde(rename = "grades:create")]
    GradesCreate,
    #[serde(rename = "grades:read")]
    GradesRead,
    #[serde(rename = "grades:update")]
    GradesUpdate,
    #[serde(rename = "grades:delete")]
    GradesDelete,

    #[serde(rename = "classes:create")]
    ClassesCreate,
    #[serde(rename = "classes:read")]
    ClassesRead,
    #[serde(rename = "classes:update")]
    ClassesUpdate,
    #[serde(rename = "classes:delete")]
    ClassesDelete,

    #[serde(rename = "teachers:create")]
    TeachersCreate,
    #[serde(rename = "teachers:read")]
    TeachersRead,
    #[serde(rename = "teachers:update")]
    TeachersUpdate,
    #[serde(rename = "teachers:delete")]
    TeachersDelete,

    #[serde(rename = "reports:school")]
    ReportsSchool,
    #[serde(rename = "reports:class")]
    ReportsClass,
    #[serde(rename = "reports:student")]
    ReportsStudent,

    #[serde(rename = "settings:org")]
    SettingsOrg,
    #[serde(rename = "settings:school")]
    SettingsSchool,

    #[serde(rename = "users:invite")]
    UsersInvite,
    #[serde(rename = "users:manage")]
    UsersManage,

    #[serde(rename = "audit:read")]
    AuditRead,
}

impl PermissionKey {
    pub const ALL: [PermissionKey; 24] = [
        PermissionKey::StudentsCreate,
        PermissionKey::StudentsRead,
        PermissionKey::StudentsUpdate,
        PermissionKey::StudentsDelete,
        PermissionKey::GradesCreate,
        PermissionKey::GradesRead,
        PermissionKey::GradesUpdate,
        PermissionKey::GradesDelete,
        PermissionKey::ClassesCreate,
        PermissionKey::ClassesRead,
        PermissionKey::ClassesUpdate,
        PermissionKey::ClassesDelete,
        PermissionKey::TeachersCreate,
        PermissionKey::TeachersRead,
        PermissionKey::TeachersUpdate,
        PermissionKey::TeachersDelete,
        PermissionKey::ReportsSchool,
        PermissionKey::ReportsClass,
        PermissionKey::ReportsStudent,
        PermissionKey::SettingsOrg,
        PermissionKey::SettingsSchool,
        PermissionKey::UsersInvite,
        PermissionKey::UsersManage,
        PermissionKey::AuditRead,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            PermissionKey::StudentsCreate => "students:create",
            PermissionKey::StudentsRead => "students:read",
            PermissionKey::StudentsUpdate => "students:update",
            PermissionKey::StudentsDelete => "students:delete",
            PermissionKey::GradesCreate => "grades:create",
            PermissionKey::GradesRead => "grades:read",
            PermissionKey::GradesUpdate => "grades:update",
            PermissionKey::GradesDelete => "grades:delete",
            PermissionKey::ClassesCreate => "classes:create",
            PermissionKey::ClassesRead => "classes:read",
            PermissionKey::ClassesUpdate => "classes:update",
            PermissionKey::ClassesDelete => "classes:delete",
            PermissionKey::TeachersCreate => "teachers:create",
            PermissionKey::TeachersRead => "teachers:read",
            PermissionKey::TeachersUpdate => "teachers:update",
            PermissionKey::TeachersDelete => "teachers:delete",
            PermissionKey::ReportsSchool => "reports:school",
            PermissionKey::ReportsClass => "reports:class",
            PermissionKey::ReportsStudent => "reports:student",
            PermissionKey::SettingsOrg => "settings:org",
            PermissionKey::SettingsSchool => "settings:school",
            PermissionKey::UsersInvite => "users:invite",
            PermissionKey::UsersManage => "users:manage",
            PermissionKey::AuditRead => "audit:read",
        }
    }

    /// Resource half of the key (`"students"` for `students:create`)
    pub fn resource(self) -> &'static str {
        self.as_str()
            .split_once(':')
            .map(|(resource, _)| resource)
            .unwrap_or_default()
    }

    /// Action half of the key (`"create"` for `students:create`)
    pub fn action(self) -> &'static str {
        self.as_str()
            .split_once(':')
            .map(|(_, action)| action)
            .unwrap_or_default()
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionKey {
    type Err = RbacError;

    fn from_str(s: &str) -> RbacResult<Self> {
        PermissionKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| RbacError::InvalidPermissionKey(s.to_string()))
    }
}

/// Relationship a scoped specifier requires between actor and resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    /// The actor owns the resource (`resource_owner_id`)
    Own,
    /// The resource belongs to a class the actor teaches (`resource_class_id`)
    OwnClass,
    /// The resource concerns a student linked to the actor (`resource_student_id`)
    OwnChild,
    /// A class one of the actor's children is enrolled in. Never grants:
    /// enrollment is not part of the resolved context.
    ChildClass,
}

impl Modifier {
    pub const fn as_str(self) -> &'static str {
        match self {
            Modifier::Own => "own",
            Modifier::OwnClass => "own_class",
            Modifier::OwnChild => "own_child",
            Modifier::ChildClass => "child_class",
        }
    }
}

impl FromStr for Modifier {
    type Err = RbacError;

    fn from_str(s: &str) -> RbacResult<Self> {
        match s {
            "own" => Ok(Modifier::Own),
            "own_class" => Ok(Modifier::OwnClass),
            "own_child" => Ok(Modifier::OwnChild),
            "child_class" => Ok(Modifier::ChildClass),
            _ => Err(RbacError::InvalidSpecifier(format!(
                "unknown modifier '{}'",
                s
            ))),
        }
    }
}

/// One allowed-role entry of a permission rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Specifier {
    /// Any holder of the effective role passes
    Unscoped(Role),
    /// The effective role must match and the modifier's relationship must hold
    Scoped(Role, Modifier),
}

impl Specifier {
    pub const fn role(self) -> Role {
        match self {
            Specifier::Unscoped(role) | Specifier::Scoped(role, _) => role,
        }
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Specifier::Unscoped(role) => write!(f, "{}", role),
            Specifier::Scoped(role, modifier) => write!(f, "{}:{}", role, modifier.as_str()),
        }
    }
}

impl FromStr for Specifier {
    type Err = RbacError;

    /// Parse `role` or `role:modifier`
    fn from_str(s: &str) -> RbacResult<Self> {
        if s.is_empty() {
            return Err(RbacError::InvalidSpecifier(
                "empty specifier".to_string(),
            ));
        }

        let parts: Vec<&str> = s.split(':').collect();
        if parts.iter().any(|part| part.is_empty()) {
            return Err(RbacError::InvalidSpecifier(s.to_string()));
        }

        match parts.as_slice() {
            [role] => Ok(Specifier::Unscoped(role.parse()?)),
            [role, modifier] => Ok(Specifier::Scoped(role.parse()?, modifier.parse()?)),
            _ => Err(RbacError::InvalidSpecifier(s.to_string())),
        }
    }
}

impl TryFrom<String> for Specifier {
    type Error = RbacError;

    fn try_from(value: String) -> RbacResult<Self> {
        value.parse()
    }
}

impl From<Specifier> for String {
    fn from(value: Specifier) -> Self {
        value.to_string()
    }
}

const fn any(role: Role) -> Specifier {
    Specifier::Unscoped(role)
}

const fn scoped(role: Role, modifier: Modifier) -> Specifier {
    Specifier::Scoped(role, modifier)
}

const ORG_ADMIN: Specifier = any(Role::OrgAdmin);
const SCHOOL_ADMIN: Specifier = any(Role::SchoolAdmin);
const STAFF: Specifier = any(Role::Staff);
const ADMINS: &[Specifier] = &[ORG_ADMIN, SCHOOL_ADMIN];

/// Standard rules; list order is evaluation order.
const STANDARD_RULES: &[(PermissionKey, &[Specifier])] = &[
    // Students
    (PermissionKey::StudentsCreate, &[ORG_ADMIN, SCHOOL_ADMIN, STAFF]),
    (
        PermissionKey::StudentsRead,
        &[
            ORG_ADMIN,
            SCHOOL_ADMIN,
            STAFF,
            any(Role::Teacher),
            scoped(Role::Parent, Modifier::Own),
            scoped(Role::Student, Modifier::Own),
        ],
    ),
    (PermissionKey::StudentsUpdate, &[ORG_ADMIN, SCHOOL_ADMIN, STAFF]),
    (PermissionKey::StudentsDelete, ADMINS),
    // Grades
    (
        PermissionKey::GradesCreate,
        &[scoped(Role::Teacher, Modifier::OwnClass)],
    ),
    (
        PermissionKey::GradesRead,
        &[
            ORG_ADMIN,
            SCHOOL_ADMIN,
            STAFF,
            scoped(Role::Teacher, Modifier::OwnClass),
            scoped(Role::Parent, Modifier::OwnChild),
            scoped(Role::Student, Modifier::Own),
        ],
    ),
    (
        PermissionKey::GradesUpdate,
        &[scoped(Role::Teacher, Modifier::OwnClass), SCHOOL_ADMIN],
    ),
    (PermissionKey::GradesDelete, &[SCHOOL_ADMIN]),
    // Classes
    (PermissionKey::ClassesCreate, ADMINS),
    (
        PermissionKey::ClassesRead,
        &[
            ORG_ADMIN,
            SCHOOL_ADMIN,
            STAFF,
            scoped(Role::Teacher, Modifier::Own),
            scoped(Role::Parent, Modifier::ChildClass),
            scoped(Role::Student, Modifier::Own),
        ],
    ),
    (PermissionKey::ClassesUpdate, ADMINS),
    (PermissionKey::ClassesDelete, ADMINS),
    // Teachers
    (PermissionKey::TeachersCreate, ADMINS),
    (
        PermissionKey::TeachersRead,
        &[
            ORG_ADMIN,
            SCHOOL_ADMIN,
            STAFF,
            any(Role::Teacher),
            any(Role::Parent),
            any(Role::Student),
        ],
    ),
    (PermissionKey::TeachersUpdate, ADMINS),
    (PermissionKey::TeachersDelete, ADMINS),
    // Reports
    (PermissionKey::ReportsSchool, ADMINS),
    (
        PermissionKey::ReportsClass,
        &[ORG_ADMIN, SCHOOL_ADMIN, scoped(Role::Teacher, Modifier::OwnClass)],
    ),
    (
        PermissionKey::ReportsStudent,
        &[
            ORG_ADMIN,
            SCHOOL_ADMIN,
            scoped(Role::Teacher, Modifier::OwnClass),
            scoped(Role::Parent, Modifier::OwnChild),
        ],
    ),
    // Settings
    (PermissionKey::SettingsOrg, &[ORG_ADMIN]),
    (PermissionKey::SettingsSchool, ADMINS),
    // Users
    (PermissionKey::UsersInvite, ADMINS),
    (PermissionKey::UsersManage, ADMINS),
    // Audit logs
    (PermissionKey::AuditRead, ADMINS),
];

/// Immutable mapping from permission key to its ordered specifier list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionTable {
    rules: BTreeMap<PermissionKey, Vec<Specifier>>,
}

impl PermissionTable {
    /// The built-in table covering every [`PermissionKey`]
    pub fn standard() -> Self {
        let rules = STANDARD_RULES
            .iter()
            .map(|(key, specifiers)| (*key, specifiers.to_vec()))
            .collect();
        Self { rules }
    }

    /// Replace the specifier lists of the given keys, keeping each list's order
    pub fn with_overrides<I>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (PermissionKey, Vec<Specifier>)>,
    {
        for (key, specifiers) in overrides {
            self.rules.insert(key, specifiers);
        }
        self
    }

    /// Parse textual overrides (`"grades:delete" => ["school_admin", "org_admin"]`)
    pub fn parse_overrides(
        raw: &BTreeMap<String, Vec<Specifier>>,
    ) -> RbacResult<Vec<(PermissionKey, Vec<Specifier>)>> {
        raw.iter()
            .map(|(key, specifiers)| Ok((key.parse()?, specifiers.clone())))
            .collect()
    }

    /// Ordered specifiers for `key`; a key without a rule allows nobody
    pub fn specifiers(&self, key: PermissionKey) -> &[Specifier] {
        self.rules.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    /// All rules, in key order, for auditing
    pub fn rules(&self) -> impl Iterator<Item = (PermissionKey, &[Specifier])> {
        self.rules.iter().map(|(key, specs)| (*key, specs.as_slice()))
    }

    /// Keys of the vocabulary that have no rule
    pub fn missing_keys(&self) -> Vec<PermissionKey> {
        PermissionKey::ALL
            .into_iter()
            .filter(|key| !self.rules.contains_key(key))
            .collect()
    }
}

impl Default for PermissionTable {
    fn default() -> Self {
        Self::standard()
    }
}
