//! Tenant-context resolution and role-based access control for OpenSchool
//!
//! Every request that reads or changes school data goes through two steps:
//!
//! 1. [`TenantResolver`] reads the caller's memberships and builds an immutable
//!    [`TenantContext`]: the organizations, schools, classes and students the
//!    caller is tied to, plus one effective role for this request.
//! 2. [`PermissionChecker`] looks the requested permission up in the
//!    [`PermissionTable`] and decides allow or deny, applying relationship
//!    checks ("teacher of this class", "parent of this student") where the
//!    table asks for them.
//!
//! [`AccessGuard`] wires both together for request handlers and sends an
//! audit record after each successful mutation.
//!
//! # Features
//!
//! - **Closed vocabulary**: roles, permission keys and modifiers are enums
//! - **Table as data**: the permission table is built once and shared
//! - **Concurrent resolution**: the four membership reads run in parallel
//!   under one timeout and fail together
//! - **Best-effort audit**: a failing audit sink never fails the request
//!
//! # Quick Start
//!
//! ```rust
//! use openschool_rbac::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let store = Arc::new(MemoryMembershipStore::new());
//!     let guard = AccessGuard::builder(store)
//!         .with_audit_logging(true)
//!         .build()?;
//!
//!     let caller = AuthenticatedUser::new(uuid::Uuid::new_v4());
//!     let ctx = guard
//!         .authenticate(Some(&caller), &RequestedScope::none())
//!         .await?;
//!     assert_eq!(ctx.effective_role(), Role::Student);
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod checker;
pub mod config;
pub mod context;
pub mod error;
pub mod guard;
pub mod permissions;
pub mod resolver;
pub mod store;

pub mod prelude {
    //! Common imports for OpenSchool RBAC

    pub use crate::audit::*;
    pub use crate::checker::PermissionChecker;
    pub use crate::config::*;
    pub use crate::context::*;
    pub use crate::error::*;
    pub use crate::guard::{AccessGuard, AccessGuardBuilder, AuthenticatedUser};
    pub use crate::permissions::*;
    pub use crate::resolver::TenantResolver;
    pub use crate::store::{MembershipStore, MemoryMembershipStore};

    pub use openschool_core::prelude::*;

    // Common Result type
    pub type Result<T> = std::result::Result<T, RbacError>;
}

pub use checker::PermissionChecker;
pub use context::TenantContext;
pub use error::RbacError;
pub use guard::AccessGuard;
pub use permissions::PermissionTable;
pub use prelude::Result;
pub use resolver::TenantResolver;
