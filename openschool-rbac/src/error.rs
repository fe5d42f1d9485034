//! Error types for OpenSchool RBAC

use crate::permissions::PermissionKey;
use thiserror::Error;

/// Errors that can occur while resolving tenant context or checking access
#[derive(Error, Debug)]
pub enum RbacError {
    /// No resolvable user identity; raised before any membership lookup
    #[error("Authentication required")]
    Unauthenticated,

    /// A membership lookup failed or timed out; the whole resolution is void
    #[error("Tenant context resolution failed: {0}")]
    ResolutionFailure(String),

    #[error("permission denied for `{key}`")]
    Forbidden { key: PermissionKey },

    /// Access outside the caller's tenant boundary (school, org, ...)
    #[error("Access denied to {scope}")]
    TenantAccessDenied { scope: String },

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("Invalid permission key: {0}")]
    InvalidPermissionKey(String),

    #[error("Invalid permission specifier: {0}")]
    InvalidSpecifier(String),

    #[error("Invalid role: {0}")]
    InvalidRole(#[from] openschool_core::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl RbacError {
    /// Infrastructure failures the caller may retry as a whole request
    pub fn is_retryable(&self) -> bool {
        matches!(self, RbacError::ResolutionFailure(_))
    }

    /// Rejections caused by missing rights rather than missing data
    pub fn is_forbidden(&self) -> bool {
        matches!(
            self,
            RbacError::Forbidden { .. } | RbacError::TenantAccessDenied { .. }
        )
    }

    /// Permission key attempted, for denials raised by the checker
    pub fn permission_key(&self) -> Option<PermissionKey> {
        match self {
            RbacError::Forbidden { key } => Some(*key),
            _ => None,
        }
    }
}
