use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::award::{AwardableRecord, RecordKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    #[serde(other)]
    Other,
}

/// Online booking made through the booking flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    /// The customer's mobile number, which identifies the user to credit.
    pub mobile: String,
    pub game_id: String,
    pub status: BookingStatus,
    /// Hours; fractional values are allowed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_duration: Option<f64>,
    #[serde(default)]
    pub coins_awarded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coins_awarded_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coins_awarded_amount: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn new(mobile: &str, game_id: &str, session_duration: f64) -> Self {
        Booking {
            id: Uuid::new_v4().to_string(),
            mobile: mobile.to_string(),
            game_id: game_id.to_string(),
            status: BookingStatus::Pending,
            session_duration: Some(session_duration),
            coins_awarded: false,
            coins_awarded_at: None,
            coins_awarded_amount: None,
            created_at: Some(Utc::now()),
        }
    }
}

impl AwardableRecord for Booking {
    fn kind(&self) -> RecordKind {
        RecordKind::Booking
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn game_id(&self) -> &str {
        &self.game_id
    }

    fn mobile(&self) -> &str {
        &self.mobile
    }

    fn duration_hours(&self) -> Option<f64> {
        self.session_duration
    }

    fn is_qualifying(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }

    fn coins_awarded(&self) -> bool {
        self.coins_awarded
    }
}
