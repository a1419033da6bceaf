//! Configuration loading and representation.

use core::fmt::Debug;
use core::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const ENV_MAX_CONFLICT_RETRIES: &str = "STOCKROOM_MAX_CONFLICT_RETRIES";
pub const ENV_NOTIFY_ON_ARRIVAL: &str = "STOCKROOM_NOTIFY_ON_ARRIVAL";
pub const ENV_MAX_MEDIA_PER_OPERATION: &str = "STOCKROOM_MAX_MEDIA_PER_OPERATION";

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockroomConfig {
    /// Retries after losing an optimistic-concurrency race.
    pub max_conflict_retries: u32,
    /// Send arrival notifications on receive.
    pub notify_on_arrival: bool,
    /// Upper bound on files per receive/attach call.
    pub max_media_per_operation: usize,
}

impl Default for StockroomConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: 3,
            notify_on_arrival: true,
            max_media_per_operation: 20,
        }
    }
}

impl StockroomConfig {
    /// Load from `STOCKROOM_*` environment variables; unset ones keep their defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            max_conflict_retries: parse_var(
                &lookup,
                ENV_MAX_CONFLICT_RETRIES,
                defaults.max_conflict_retries,
            )?,
            notify_on_arrival: parse_var(&lookup, ENV_NOTIFY_ON_ARRIVAL, defaults.notify_on_arrival)?,
            max_media_per_operation: parse_var(
                &lookup,
                ENV_MAX_MEDIA_PER_OPERATION,
                defaults.max_media_per_operation,
            )?,
        })
    }

    pub fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    pub fn with_notify_on_arrival(mut self, notify: bool) -> Self {
        self.notify_on_arrival = notify;
        self
    }

    pub fn with_max_media_per_operation(mut self, max: usize) -> Self {
        self.max_media_per_operation = max;
        self
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + Debug,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: `{raw}`")),
        None => {
            debug!(var = key, default = ?default, "not set; using default");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn unset_variables_fall_back_to_defaults() {
        let config = StockroomConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, StockroomConfig::default());
    }

    #[test]
    fn variables_override_defaults() {
        let config = StockroomConfig::from_lookup(lookup(&[
            (ENV_MAX_CONFLICT_RETRIES, "7"),
            (ENV_NOTIFY_ON_ARRIVAL, "false"),
        ]))
        .unwrap();
        assert_eq!(config.max_conflict_retries, 7);
        assert!(!config.notify_on_arrival);
        assert_eq!(config.max_media_per_operation, 20);
    }

    #[test]
    fn malformed_value_names_the_variable() {
        let err = StockroomConfig::from_lookup(lookup(&[(ENV_MAX_MEDIA_PER_OPERATION, "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_MAX_MEDIA_PER_OPERATION));
    }
}
