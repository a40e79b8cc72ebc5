use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Club member. Only the coin reconciler ever increments `club_coins`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub mobile: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub club_coins: u64,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(mobile: &str, name: &str) -> Self {
        User {
            id: Uuid::new_v4().to_string(),
            mobile: mobile.to_string(),
            name: name.to_string(),
            club_coins: 0,
            created_at: Utc::now(),
        }
    }
}
