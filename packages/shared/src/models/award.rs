use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which source table a reward-bearing record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum RecordKind {
    Booking,
    OfflineBooking,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Booking => write!(f, "booking"),
            RecordKind::OfflineBooking => write!(f, "offline_booking"),
        }
    }
}

/// A record that can earn its customer club coins once it reaches a
/// qualifying state.
pub trait AwardableRecord {
    fn kind(&self) -> RecordKind;
    fn id(&self) -> &str;
    fn game_id(&self) -> &str;
    fn mobile(&self) -> &str;
    fn duration_hours(&self) -> Option<f64>;
    /// Booking confirmed, or offline booking settled.
    fn is_qualifying(&self) -> bool;
    fn coins_awarded(&self) -> bool;
}

/// Result of one reconciliation attempt. Only `Awarded` changed any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwardOutcome {
    Awarded { amount: u64 },
    /// Not confirmed/settled, either in the delivered image or in the store.
    NotQualifying,
    /// The record was already awarded by the time the commit ran, either by
    /// an earlier delivery or by a concurrent attempt that won the race.
    AlreadyAwarded,
}

impl AwardOutcome {
    pub fn awarded(&self) -> bool {
        matches!(self, AwardOutcome::Awarded { .. })
    }

    pub fn amount(&self) -> u64 {
        match self {
            AwardOutcome::Awarded { amount } => *amount,
            _ => 0,
        }
    }
}

/// The two writes that make up an award, committed together or not at all.
#[derive(Debug, Clone, PartialEq)]
pub struct AwardCommit {
    pub kind: RecordKind,
    pub record_id: String,
    pub user_id: String,
    pub amount: u64,
    pub awarded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// The stored record already carries `coinsAwarded = true`.
    AlreadyAwarded,
    /// The stored record was deleted or left its qualifying state after the
    /// delivered image was taken.
    NoLongerQualifying,
    UserMissing,
}

/// A confirmed/settled record that has not been credited yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UnawardedRecord {
    pub kind: RecordKind,
    pub id: String,
}
