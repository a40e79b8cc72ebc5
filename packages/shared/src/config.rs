use aws_sdk_dynamodb::Client;
use thiserror::Error;

pub const DEFAULT_USERS_MOBILE_INDEX: &str = "GSI_UserByMobile";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} environment variable must be set")]
    Missing(&'static str),
}

/// Table names the award functions work against.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub games_table: String,
    pub bookings_table: String,
    pub offline_bookings_table: String,
    pub users_table: String,
    pub users_mobile_index: String,
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source. Empty values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        Ok(StoreConfig {
            games_table: required("GAMES_TABLE")?,
            bookings_table: required("BOOKINGS_TABLE")?,
            offline_bookings_table: required("OFFLINE_BOOKINGS_TABLE")?,
            users_table: required("USERS_TABLE")?,
            users_mobile_index: lookup("USERS_MOBILE_INDEX")
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_USERS_MOBILE_INDEX.to_string()),
        })
    }
}

pub async fn dynamodb_client() -> Client {
    let config = aws_config::load_from_env().await;
    Client::new(&config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_lookup_reads_all_tables() {
        let env = vars(&[
            ("GAMES_TABLE", "games"),
            ("BOOKINGS_TABLE", "bookings"),
            ("OFFLINE_BOOKINGS_TABLE", "offline"),
            ("USERS_TABLE", "users"),
        ]);

        let config = StoreConfig::from_lookup(|name| env.get(name).cloned()).unwrap();

        assert_eq!(config.games_table, "games");
        assert_eq!(config.bookings_table, "bookings");
        assert_eq!(config.offline_bookings_table, "offline");
        assert_eq!(config.users_table, "users");
        assert_eq!(config.users_mobile_index, DEFAULT_USERS_MOBILE_INDEX);
    }

    #[test]
    fn test_missing_table_is_reported_by_name() {
        let env = vars(&[
            ("GAMES_TABLE", "games"),
            ("BOOKINGS_TABLE", ""),
            ("OFFLINE_BOOKINGS_TABLE", "offline"),
            ("USERS_TABLE", "users"),
        ]);

        let err = StoreConfig::from_lookup(|name| env.get(name).cloned()).unwrap_err();

        assert_eq!(err, ConfigError::Missing("BOOKINGS_TABLE"));
        assert_eq!(
            err.to_string(),
            "BOOKINGS_TABLE environment variable must be set"
        );
    }

    #[test]
    fn test_mobile_index_override() {
        let env = vars(&[
            ("GAMES_TABLE", "games"),
            ("BOOKINGS_TABLE", "bookings"),
            ("OFFLINE_BOOKINGS_TABLE", "offline"),
            ("USERS_TABLE", "users"),
            ("USERS_MOBILE_INDEX", "ByPhone"),
        ]);

        let config = StoreConfig::from_lookup(|name| env.get(name).cloned()).unwrap();

        assert_eq!(config.users_mobile_index, "ByPhone");
    }
}
