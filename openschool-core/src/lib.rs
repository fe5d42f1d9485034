//! # OpenSchool Core
//!
//! Core types shared by the OpenSchool access-control crates.
//!
//! An organization (for example a district) contains schools; schools contain
//! classes, students and staff. Users are tied to those entities through
//! membership records, and every membership carries a role or an implied one.
//! This crate defines the role vocabulary and the membership records; the
//! decision logic lives in `openschool-rbac`.
//!
//! ## API Stability
//!
//! **Current Status: EXPERIMENTAL (v0.x.x)**
//!
//! The role set is closed. Adding a role is a breaking change because every
//! exhaustive `match` over [`Role`] has to be revisited.

#![warn(missing_docs)]

pub mod error;
pub mod membership;
pub mod roles;

pub use error::{Error, Result};
pub use membership::*;
pub use roles::*;

/// Re-export commonly used items
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::membership::*;
    pub use crate::roles::*;
}
