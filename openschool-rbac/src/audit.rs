//! Audit records for successful mutations
//!
//! Storage of audit records is external. This module defines the record
//! shape, the [`AuditSink`] contract and the best-effort [`AuditRecorder`]
//! that never lets a sink failure reach the operation that triggered it.

use crate::context::TenantContext;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use openschool_core::{OrgId, Role, SchoolId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Read,
    Update,
    Delete,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuditAction::Create => "create",
            AuditAction::Read => "read",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// What happened, as described by the operation that did it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub resource: String,
    pub resource_id: Option<Uuid>,
    pub old_values: Option<Value>,
    pub new_values: Option<Value>,
    pub metadata: Option<Value>,
}

impl AuditEvent {
    pub fn new(action: AuditAction, resource: &str) -> Self {
        Self {
            action,
            resource: resource.to_string(),
            resource_id: None,
            old_values: None,
            new_values: None,
            metadata: None,
        }
    }

    pub fn with_resource_id(mut self, resource_id: Uuid) -> Self {
        self.resource_id = Some(resource_id);
        self
    }

    pub fn with_old_values(mut self, values: Value) -> Self {
        self.old_values = Some(values);
        self
    }

    pub fn with_new_values(mut self, values: Value) -> Self {
        self.new_values = Some(values);
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Structured record handed to the audit sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub actor_user_id: UserId,
    pub actor_email: Option<String>,
    pub actor_role: Role,
    pub action: AuditAction,
    pub resource: String,
    pub resource_id: Option<Uuid>,
    pub org_id: Option<OrgId>,
    pub school_id: Option<SchoolId>,
    pub old_values: Option<Value>,
    pub new_values: Option<Value>,
    pub metadata: Option<Value>,
    pub ip_address: Option<String>,
}

impl AuditRecord {
    /// Fill actor and scope from the request's context
    pub fn from_context(
        ctx: &TenantContext,
        event: AuditEvent,
        ip_address: Option<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            actor_user_id: ctx.user_id(),
            actor_email: ctx.user_email().map(str::to_string),
            actor_role: ctx.effective_role(),
            action: event.action,
            resource: event.resource,
            resource_id: event.resource_id,
            org_id: ctx.active_org_id(),
            school_id: ctx.active_school_id(),
            old_values: event.old_values,
            new_values: event.new_values,
            metadata: event.metadata,
            ip_address,
        }
    }
}

/// Destination for audit records
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: AuditRecord) -> anyhow::Result<()>;
}

/// Writes each record as a structured `tracing` event
#[derive(Debug, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, record: AuditRecord) -> anyhow::Result<()> {
        info!(
            target: "openschool::audit",
            event_id = %record.event_id,
            actor = %record.actor_user_id,
            role = %record.actor_role,
            action = %record.action,
            resource = %record.resource,
            resource_id = ?record.resource_id,
            org_id = ?record.org_id,
            school_id = ?record.school_id,
            "Audit event"
        );
        Ok(())
    }
}

/// Keeps records in memory
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, record: AuditRecord) -> anyhow::Result<()> {
        self.records.lock().await.push(record);
        Ok(())
    }
}

/// Best-effort front for an [`AuditSink`]
///
/// Each record gets at most `timeout` to reach the sink, so a stalled sink
/// delays the caller by a bounded amount and never fails it.
#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
    enabled: bool,
    timeout: Duration,
}

impl AuditRecorder {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
            enabled: true,
            timeout: Duration::from_secs(2),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Send one record; sink errors and timeouts are logged and dropped
    pub async fn emit(&self, ctx: &TenantContext, event: AuditEvent, ip_address: Option<String>) {
        if !self.enabled {
            return;
        }

        let record = AuditRecord::from_context(ctx, event, ip_address);
        let event_id = record.event_id;
        match tokio::time::timeout(self.timeout, self.sink.record(record)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(event_id = %event_id, error = %e, "Audit log failed");
            }
            Err(_) => {
                error!(event_id = %event_id, timeout = ?self.timeout, "Audit log timed out");
            }
        }
    }
}
