//! Permission checks against a resolved tenant context

use crate::context::{ResourceHints, TenantContext};
use crate::error::RbacError;
use crate::permissions::{Modifier, PermissionKey, PermissionTable, Specifier};
use std::sync::Arc;
use tracing::{debug, warn};

type RbacResult<T> = std::result::Result<T, RbacError>;

/// Decides whether a context may exercise a permission
///
/// The checker is a pure function of `(context, key, hints)` over an
/// immutable table, so one instance can serve any number of concurrent
/// requests.
#[derive(Debug, Clone)]
pub struct PermissionChecker {
    table: Arc<PermissionTable>,
}

impl PermissionChecker {
    pub fn new(table: Arc<PermissionTable>) -> Self {
        Self { table }
    }

    /// Checker over [`PermissionTable::standard`]
    pub fn standard() -> Self {
        Self::new(Arc::new(PermissionTable::standard()))
    }

    pub fn table(&self) -> &PermissionTable {
        &self.table
    }

    /// Allow, or fail with [`RbacError::Forbidden`] carrying `key`
    pub fn check(
        &self,
        ctx: &TenantContext,
        key: PermissionKey,
        hints: &ResourceHints,
    ) -> RbacResult<()> {
        let granted_by = self
            .table
            .specifiers(key)
            .iter()
            .find(|specifier| grants(specifier, ctx, hints));

        match granted_by {
            Some(specifier) => {
                debug!(
                    user_id = %ctx.user_id(),
                    role = %ctx.effective_role(),
                    key = %key,
                    specifier = %specifier,
                    "Permission granted"
                );
                Ok(())
            }
            None => {
                warn!(
                    user_id = %ctx.user_id(),
                    role = %ctx.effective_role(),
                    key = %key,
                    "Permission denied"
                );
                Err(RbacError::Forbidden { key })
            }
        }
    }

    pub fn has_permission(
        &self,
        ctx: &TenantContext,
        key: PermissionKey,
        hints: &ResourceHints,
    ) -> bool {
        self.check(ctx, key, hints).is_ok()
    }
}

impl Default for PermissionChecker {
    fn default() -> Self {
        Self::standard()
    }
}

fn grants(specifier: &Specifier, ctx: &TenantContext, hints: &ResourceHints) -> bool {
    match *specifier {
        Specifier::Unscoped(role) => ctx.effective_role() == role,
        Specifier::Scoped(role, modifier) => {
            ctx.effective_role() == role && relationship_holds(modifier, ctx, hints)
        }
    }
}

fn relationship_holds(modifier: Modifier, ctx: &TenantContext, hints: &ResourceHints) -> bool {
    match modifier {
        Modifier::Own => hints.resource_owner_id == Some(ctx.user_id()),
        Modifier::OwnClass => hints
            .resource_class_id
            .is_some_and(|class_id| ctx.can_access_class(class_id)),
        Modifier::OwnChild => hints
            .resource_student_id
            .is_some_and(|student_id| ctx.can_access_student(student_id)),
        // Needs enrollment records, which the resolved context does not carry.
        Modifier::ChildClass => false,
    }
}
