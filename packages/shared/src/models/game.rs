use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bookable game or board, configured by an administrator.
/// `coins` is the reward granted per hour of play; it may be unset.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub coins: Option<f64>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Game {
    pub fn new(name: &str, coins: f64) -> Self {
        Game {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            coins: Some(coins),
            active: true,
        }
    }
}
