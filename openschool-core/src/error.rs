//! Error types for OpenSchool core.
//!
//! These errors only arise when textual role labels coming from storage or
//! configuration are parsed into the closed role vocabulary.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while parsing core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The string does not name one of the seven system roles.
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// The string is not a valid organization membership role.
    #[error("Unknown organization role: {0}")]
    UnknownOrgRole(String),

    /// The string is not a valid school membership role.
    #[error("Unknown school role: {0}")]
    UnknownSchoolRole(String),
}
