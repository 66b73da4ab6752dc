use chrono::{DateTime, Utc};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    CreateDir,
    CreateFile,
    RemoveDir,
    RemoveFile,
    ModifyFile,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::CreateDir => "createDir",
            AuditAction::CreateFile => "createFile",
            AuditAction::RemoveDir => "removeDir",
            AuditAction::RemoveFile => "removeFile",
            AuditAction::ModifyFile => "modifyFile",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub repository_id: String,
    pub user: String,
    pub remote_addr: Option<String>,
    pub resource: String,
    pub action: AuditAction,
    pub timestamp: DateTime<Utc>,
}

/// Sink for audit records, fed after successful commits. The default
/// implementation writes structured log lines; deployments with a real
/// audit store provide their own.
pub trait AuditLog: Send + Sync {
    fn record(&self, event: &AuditEvent);
}

#[derive(Debug, Default)]
pub struct TracingAuditLog;

impl AuditLog for TracingAuditLog {
    fn record(&self, event: &AuditEvent) {
        info!(
            target: "quarry::audit",
            repository = %event.repository_id,
            user = %event.user,
            remote_addr = event.remote_addr.as_deref().unwrap_or("-"),
            action = event.action.as_str(),
            resource = %event.resource,
            "audit"
        );
    }
}
