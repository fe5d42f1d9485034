//! # OpenSchool - tenant and access control for school management
//!
//! This crate re-exports the constituent crates:
//! - `openschool-core`: roles and membership records
//! - `openschool-rbac`: tenant-context resolution, the permission table,
//!   permission checks, the access guard and audit records

pub use openschool_core as core;
pub use openschool_rbac as rbac;

/// Re-export commonly used items
pub mod prelude {
    pub use crate::rbac::prelude::*;
}
