use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::models::award::{AwardOutcome, AwardableRecord, UnawardedRecord};
use crate::repositories::booking_repository::BookingRepository;
use crate::repositories::offline_booking_repository::OfflineBookingRepository;
use crate::services::coin_award_service::CoinAwardService;
use crate::services::errors::audit_service_errors::AuditError;
use crate::services::errors::award_service_errors::AwardError;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BackfillFailure {
    pub record: UnawardedRecord,
    pub error: String,
    pub transient: bool,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BackfillReport {
    pub examined: usize,
    pub awarded: usize,
    pub coins_awarded: u64,
    /// Records another writer awarded, or that stopped qualifying, while the
    /// backfill ran.
    pub skipped: usize,
    pub failures: Vec<BackfillFailure>,
}

/// Detects confirmed/settled records that were never credited, and replays
/// the award for them.
#[derive(Clone)]
pub struct AuditService {
    bookings: Arc<dyn BookingRepository + Send + Sync>,
    offline_bookings: Arc<dyn OfflineBookingRepository + Send + Sync>,
    award_service: CoinAwardService,
}

impl AuditService {
    pub fn new(
        bookings: Arc<dyn BookingRepository + Send + Sync>,
        offline_bookings: Arc<dyn OfflineBookingRepository + Send + Sync>,
        award_service: CoinAwardService,
    ) -> Self {
        AuditService {
            bookings,
            offline_bookings,
            award_service,
        }
    }

    /// Read-only: lists every qualifying record still missing its award,
    /// online bookings first.
    pub async fn find_unawarded_qualifying_records(
        &self,
    ) -> Result<Vec<UnawardedRecord>, AuditError> {
        let bookings = self.bookings.list_unawarded_confirmed().await?;
        let offline_bookings = self.offline_bookings.list_unawarded_settled().await?;

        let records: Vec<UnawardedRecord> = bookings
            .iter()
            .map(unawarded)
            .chain(offline_bookings.iter().map(unawarded))
            .collect();

        if records.is_empty() {
            info!("Audit found no unawarded records");
        } else {
            warn!(count = records.len(), "Audit found unawarded records");
        }
        Ok(records)
    }

    /// Runs the award for every audit hit. A failing record is reported and
    /// never stops the rest.
    pub async fn backfill(&self) -> Result<BackfillReport, AuditError> {
        let bookings = self.bookings.list_unawarded_confirmed().await?;
        let offline_bookings = self.offline_bookings.list_unawarded_settled().await?;

        let mut report = BackfillReport::default();
        for booking in &bookings {
            let result = self.award_service.reconcile(None, booking).await;
            record_result(&mut report, booking, result);
        }
        for booking in &offline_bookings {
            let result = self.award_service.reconcile(None, booking).await;
            record_result(&mut report, booking, result);
        }

        info!(
            examined = report.examined,
            awarded = report.awarded,
            coins = report.coins_awarded,
            skipped = report.skipped,
            failed = report.failures.len(),
            "Backfill finished"
        );
        Ok(report)
    }
}

fn unawarded<R: AwardableRecord>(record: &R) -> UnawardedRecord {
    UnawardedRecord {
        kind: record.kind(),
        id: record.id().to_string(),
    }
}

fn record_result<R: AwardableRecord>(
    report: &mut BackfillReport,
    record: &R,
    result: Result<AwardOutcome, AwardError>,
) {
    report.examined += 1;
    match result {
        Ok(outcome) if outcome.awarded() => {
            report.awarded += 1;
            report.coins_awarded = report.coins_awarded.saturating_add(outcome.amount());
        }
        Ok(_) => report.skipped += 1,
        Err(e) => {
            error!(kind = %record.kind(), record_id = record.id(), error = %e, "Backfill failed for record");
            report.failures.push(BackfillFailure {
                record: unawarded(record),
                transient: e.is_transient(),
                error: e.to_string(),
            });
        }
    }
}
