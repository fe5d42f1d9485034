//! Configuration types for OpenSchool RBAC

use crate::error::RbacError;
use crate::permissions::{PermissionTable, Specifier};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

type RbacResult<T> = std::result::Result<T, RbacError>;

/// RBAC configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RbacConfig {
    /// Emit audit records after successful mutations
    pub audit_enabled: bool,
    /// Upper bound for handing one record to the audit sink, in milliseconds
    pub audit_timeout_ms: u64,
    /// Membership lookup settings
    pub resolver: ResolverConfig,
    /// Replacement specifier lists keyed by permission key
    /// (e.g. `"grades:delete": ["school_admin", "org_admin"]`)
    pub permission_overrides: BTreeMap<String, Vec<Specifier>>,
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            audit_enabled: true,
            audit_timeout_ms: 2_000,
            resolver: ResolverConfig::default(),
            permission_overrides: BTreeMap::new(),
        }
    }
}

/// Settings for the tenant resolver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Upper bound for the joined membership lookups, in milliseconds
    pub lookup_timeout_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_ms: 5_000,
        }
    }
}

impl ResolverConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

impl RbacConfig {
    pub fn audit_timeout(&self) -> Duration {
        Duration::from_millis(self.audit_timeout_ms)
    }

    /// Load configuration from file
    pub fn from_file(path: &str) -> RbacResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RbacError::Configuration(format!("Failed to read config file: {}", e))
        })?;

        let config: RbacConfig = serde_json::from_str(&content).map_err(|e| {
            RbacError::Configuration(format!("Failed to parse config: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn to_file(&self, path: &str) -> RbacResult<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            RbacError::Configuration(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, content).map_err(|e| {
            RbacError::Configuration(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    /// Configuration for local development: short timeout, no audit records
    pub fn development() -> Self {
        Self {
            audit_enabled: false,
            audit_timeout_ms: 500,
            resolver: ResolverConfig {
                lookup_timeout_ms: 1_000,
            },
            permission_overrides: BTreeMap::new(),
        }
    }

    /// Build the permission table: the standard rules plus any overrides
    pub fn permission_table(&self) -> RbacResult<PermissionTable> {
        let overrides = PermissionTable::parse_overrides(&self.permission_overrides)?;
        Ok(PermissionTable::standard().with_overrides(overrides))
    }

    /// Validate the configuration
    pub fn validate(&self) -> RbacResult<()> {
        if self.resolver.lookup_timeout_ms == 0 {
            return Err(RbacError::Configuration(
                "resolver.lookup_timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.audit_timeout_ms == 0 {
            return Err(RbacError::Configuration(
                "audit_timeout_ms must be greater than zero".to_string(),
            ));
        }

        for (key, specifiers) in &self.permission_overrides {
            key.parse::<crate::permissions::PermissionKey>()
                .map_err(|e| RbacError::Configuration(e.to_string()))?;

            let mut seen = HashSet::new();
            for specifier in specifiers {
                if !seen.insert(specifier) {
                    return Err(RbacError::Configuration(format!(
                        "Duplicate specifier '{}' for '{}'",
                        specifier, key
                    )));
                }
            }
        }

        Ok(())
    }
}
