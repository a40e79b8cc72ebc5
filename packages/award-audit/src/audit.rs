use serde::{Deserialize, Serialize};
use shared::models::award::UnawardedRecord;
use shared::services::audit_service::{AuditService, BackfillReport};
use shared::services::errors::audit_service_errors::AuditError;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditMode {
    /// Report only; nothing is written.
    #[default]
    Audit,
    /// Award every record the audit finds.
    Backfill,
}

/// EventBridge envelope. Scheduled rules send an empty `detail`; operators
/// trigger a backfill with `{"detail": {"mode": "backfill"}}`.
#[derive(Debug, Deserialize)]
pub struct ScheduledEvent {
    #[serde(default)]
    pub detail: AuditRequest,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditRequest {
    #[serde(default)]
    pub mode: AuditMode,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct AuditResponse {
    pub unawarded: Vec<UnawardedRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backfill: Option<BackfillReport>,
}

pub async fn handle_audit(
    service: &AuditService,
    event: ScheduledEvent,
) -> Result<AuditResponse, AuditError> {
    match event.detail.mode {
        AuditMode::Audit => {
            let unawarded = service.find_unawarded_qualifying_records().await?;
            for record in &unawarded {
                warn!(kind = %record.kind, record_id = %record.id, "Qualifying record has no coin award");
            }
            Ok(AuditResponse {
                unawarded,
                backfill: None,
            })
        }
        AuditMode::Backfill => {
            info!("Starting coin award backfill");
            let report = service.backfill().await?;
            // Whatever is left still needs an operator.
            let unawarded = service.find_unawarded_qualifying_records().await?;
            Ok(AuditResponse {
                unawarded,
                backfill: Some(report),
            })
        }
    }
}
