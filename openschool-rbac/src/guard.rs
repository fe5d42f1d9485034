//! Request-side access guard
//!
//! [`AccessGuard`] is what request handlers call before they touch data:
//! reject callers without an identity, resolve a fresh tenant context, check
//! the permission, and after a successful mutation hand an audit record to
//! the sink. A rejected request performs no mutation and emits no audit.

use crate::audit::{AuditEvent, AuditRecorder, AuditSink, TracingAuditSink};
use crate::checker::PermissionChecker;
use crate::config::RbacConfig;
use crate::context::{RequestedScope, ResourceHints, TenantContext};
use crate::error::RbacError;
use crate::permissions::{PermissionKey, PermissionTable};
use crate::resolver::TenantResolver;
use crate::store::MembershipStore;
use openschool_core::{OrgId, SchoolId, UserId};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

type RbacResult<T> = std::result::Result<T, RbacError>;

/// Identity established by the authentication layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub email: Option<String>,
}

impl AuthenticatedUser {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            email: None,
        }
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }
}

/// Resolve, check, run, audit
#[derive(Clone)]
pub struct AccessGuard {
    resolver: TenantResolver,
    checker: PermissionChecker,
    audit: AuditRecorder,
}

impl AccessGuard {
    pub fn builder(store: Arc<dyn MembershipStore>) -> AccessGuardBuilder {
        AccessGuardBuilder::new(store)
    }

    pub fn resolver(&self) -> &TenantResolver {
        &self.resolver
    }

    pub fn checker(&self) -> &PermissionChecker {
        &self.checker
    }

    /// Resolve the caller's context without checking any permission
    pub async fn authenticate(
        &self,
        user: Option<&AuthenticatedUser>,
        scope: &RequestedScope,
    ) -> RbacResult<TenantContext> {
        let Some(user) = user else {
            warn!("Rejected request without an authenticated user");
            return Err(RbacError::Unauthenticated);
        };

        self.resolver
            .resolve_with_email(user.user_id, user.email.clone(), scope)
            .await
    }

    /// Resolve the caller's context and require `key`
    pub async fn authorize(
        &self,
        user: Option<&AuthenticatedUser>,
        scope: &RequestedScope,
        key: PermissionKey,
        hints: &ResourceHints,
    ) -> RbacResult<TenantContext> {
        let ctx = self.authenticate(user, scope).await?;
        self.checker.check(&ctx, key, hints)?;
        Ok(ctx)
    }

    /// Require that `school_id` lies inside the caller's tenant boundary
    pub fn ensure_school_access(&self, ctx: &TenantContext, school_id: SchoolId) -> RbacResult<()> {
        if ctx.can_access_school(school_id) {
            return Ok(());
        }
        warn!(user_id = %ctx.user_id(), school_id = %school_id, "Access denied to school");
        Err(RbacError::TenantAccessDenied {
            scope: format!("school {}", school_id),
        })
    }

    pub fn ensure_org_access(&self, ctx: &TenantContext, org_id: OrgId) -> RbacResult<()> {
        if ctx.can_access_org(org_id) {
            return Ok(());
        }
        warn!(user_id = %ctx.user_id(), org_id = %org_id, "Access denied to organization");
        Err(RbacError::TenantAccessDenied {
            scope: format!("organization {}", org_id),
        })
    }

    /// Check access to one existing resource, reporting NotFound before Forbidden
    ///
    /// `lookup` runs first. A missing resource is [`RbacError::NotFound`];
    /// an existing one is checked with the hints derived from it.
    pub async fn authorize_existing<T, Fut, H>(
        &self,
        ctx: &TenantContext,
        key: PermissionKey,
        resource: &str,
        lookup: Fut,
        hints: H,
    ) -> RbacResult<T>
    where
        Fut: Future<Output = RbacResult<Option<T>>>,
        H: FnOnce(&T) -> ResourceHints,
    {
        let Some(found) = lookup.await? else {
            debug!(resource = %resource, key = %key, "Resource not found");
            return Err(RbacError::NotFound {
                resource: resource.to_string(),
            });
        };

        self.checker.check(ctx, key, &hints(&found))?;
        Ok(found)
    }

    /// Run an already-authorized mutation, then emit its audit record
    ///
    /// The record is only built when `operation` succeeds. Audit failures and
    /// sink timeouts (`audit_timeout_ms`) are logged and never change the
    /// returned value.
    pub async fn perform<T, E, Fut, A>(
        &self,
        ctx: &TenantContext,
        ip_address: Option<String>,
        operation: Fut,
        describe: A,
    ) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        A: FnOnce(&T) -> AuditEvent,
    {
        let output = operation.await?;
        self.audit.emit(ctx, describe(&output), ip_address).await;
        Ok(output)
    }
}

/// Builder for [`AccessGuard`]
pub struct AccessGuardBuilder {
    store: Arc<dyn MembershipStore>,
    config: RbacConfig,
    table: Option<PermissionTable>,
    audit_sink: Option<Arc<dyn AuditSink>>,
}

impl AccessGuardBuilder {
    pub fn new(store: Arc<dyn MembershipStore>) -> Self {
        Self {
            store,
            config: RbacConfig::default(),
            table: None,
            audit_sink: None,
        }
    }

    pub fn with_config(mut self, config: RbacConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `table` as-is instead of the configured one
    pub fn with_permission_table(mut self, table: PermissionTable) -> Self {
        self.table = Some(table);
        self
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    pub fn with_audit_logging(mut self, enabled: bool) -> Self {
        self.config.audit_enabled = enabled;
        self
    }

    pub fn build(self) -> RbacResult<AccessGuard> {
        self.config.validate()?;

        let table = match self.table {
            Some(table) => table,
            None => self.config.permission_table()?,
        };

        let missing = table.missing_keys();
        if !missing.is_empty() {
            warn!(?missing, "Permission table has keys without rules; they deny everyone");
        }

        let sink = self
            .audit_sink
            .unwrap_or_else(|| Arc::new(TracingAuditSink));

        Ok(AccessGuard {
            resolver: TenantResolver::with_config(self.store, &self.config.resolver),
            checker: PermissionChecker::new(Arc::new(table)),
            audit: AuditRecorder::new(sink)
                .with_enabled(self.config.audit_enabled)
                .with_timeout(self.config.audit_timeout()),
        })
    }
}
