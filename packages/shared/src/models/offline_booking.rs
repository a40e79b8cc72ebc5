use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::award::{AwardableRecord, RecordKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Settlement {
    Pending,
    Settled,
    #[serde(other)]
    Other,
}

/// A walk-in booking entered by venue staff.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OfflineBooking {
    pub id: String,
    #[serde(default)]
    pub customer_name: String,
    pub mobile: String,
    pub game_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub settlement: Settlement,
    #[serde(default)]
    pub coins_awarded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coins_awarded_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coins_awarded_amount: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl OfflineBooking {
    pub fn new(customer_name: &str, mobile: &str, game_id: &str, duration: f64) -> Self {
        OfflineBooking {
            id: Uuid::new_v4().to_string(),
            customer_name: customer_name.to_string(),
            mobile: mobile.to_string(),
            game_id: game_id.to_string(),
            duration: Some(duration),
            settlement: Settlement::Pending,
            coins_awarded: false,
            coins_awarded_at: None,
            coins_awarded_amount: None,
            created_at: Some(Utc::now()),
        }
    }
}

impl AwardableRecord for OfflineBooking {
    fn kind(&self) -> RecordKind {
        RecordKind::OfflineBooking
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
        self.duration
    }

    fn is_qualifying(&self) -> bool {
        self.settlement == Settlement::Settled
    }

    fn coins_awarded(&self) -> bool {
        self.coins_awarded
    }
}
