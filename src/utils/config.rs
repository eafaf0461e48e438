use anyhow::Result;
use std::env;
use std::fmt;
use tokio::time::Duration;

pub const API_KEY_VAR: &str = "RUNPOD_API_KEY";
pub const ENDPOINT_ID_VAR: &str = "RUNPOD_ENDPOINT_ID";
pub const DEFAULT_API_BASE: &str = "https://api.runpod.ai";

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_ERROR_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_MAX_WAIT_SECS: u64 = 300;

// Heuristics for outputs that carry no "images" list. Untuned, kept as found.
pub const DEFAULT_MIN_ENCODED_LEN: usize = 100;
pub const DEFAULT_MIN_DECODED_LEN: usize = 1000;

/// Required credentials that were absent or blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingConfiguration {
    pub missing: Vec<&'static str>,
}

impl fmt::Display for MissingConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Missing configuration: set {} in the environment", self.missing.join(" and "))
    }
}

impl std::error::Error for MissingConfiguration {}

/// Credentials and endpoint of the serverless worker.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub endpoint_id: String,
    pub api_base: String,
}

impl Config {
    /// Reads both credentials from the process environment.
    pub fn from_env(api_base: &str) -> Result<Self> {
        Self::from_lookup(api_base, |name| env::var(name).ok())
    }

    pub fn from_lookup<F>(api_base: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let (api_key, endpoint_id) = match (read(API_KEY_VAR), read(ENDPOINT_ID_VAR)) {
            (Some(key), Some(id)) => (key, id),
            (key, id) => {
                let missing = [(API_KEY_VAR, key.is_none()), (ENDPOINT_ID_VAR, id.is_none())]
                    .into_iter()
                    .filter_map(|(name, absent)| absent.then_some(name))
                    .collect();
                return Err(MissingConfiguration { missing }.into());
            }
        };

        Ok(Self {
            api_key,
            endpoint_id,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn run_url(&self) -> String {
        format!("{}/v2/{}/run", self.api_base, self.endpoint_id)
    }

    pub fn status_url(&self, job_id: &str) -> String {
        format!("{}/v2/{}/status/{}", self.api_base, self.endpoint_id, job_id)
    }
}

/// Timing of the status poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay after a status that is neither COMPLETED nor FAILED.
    pub interval: Duration,
    /// Delay after a status call that could not be completed or read.
    pub error_interval: Duration,
    /// Polling stops once the accumulated delay reaches this ceiling.
    pub max_wait: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            error_interval: Duration::from_secs(DEFAULT_ERROR_INTERVAL_SECS),
            max_wait: Duration::from_secs(DEFAULT_MAX_WAIT_SECS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackThresholds {
    /// A string value must be strictly longer than this to be tried as image data.
    pub min_encoded_len: usize,
    /// Decoded bytes must be strictly longer than this to be saved.
    pub min_decoded_len: usize,
}

impl Default for FallbackThresholds {
    fn default() -> Self {
        Self {
            min_encoded_len: DEFAULT_MIN_ENCODED_LEN,
            min_decoded_len: DEFAULT_MIN_DECODED_LEN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn builds_endpoint_urls() {
        let config = Config::from_lookup(
            "https://api.runpod.ai/",
            lookup_from(&[(API_KEY_VAR, "key"), (ENDPOINT_ID_VAR, "abc123")]),
        )
        .unwrap();

        assert_eq!(config.run_url(), "https://api.runpod.ai/v2/abc123/run");
        assert_eq!(config.status_url("job-9"), "https://api.runpod.ai/v2/abc123/status/job-9");
    }

    #[test]
    fn names_every_missing_variable() {
        let err = Config::from_lookup(DEFAULT_API_BASE, lookup_from(&[])).unwrap_err();
        assert_eq!(
            err.downcast_ref::<MissingConfiguration>(),
            Some(&MissingConfiguration { missing: vec![API_KEY_VAR, ENDPOINT_ID_VAR] })
        );
        let message = err.to_string();
        assert!(message.contains(API_KEY_VAR));
        assert!(message.contains(ENDPOINT_ID_VAR));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let err = Config::from_lookup(
            DEFAULT_API_BASE,
            lookup_from(&[(API_KEY_VAR, "  "), (ENDPOINT_ID_VAR, "abc")]),
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains(API_KEY_VAR));
        assert!(!message.contains(ENDPOINT_ID_VAR));
    }

    #[test]
    fn default_poll_settings() {
        let settings = PollSettings::default();
        assert_eq!(settings.interval, Duration::from_secs(5));
        assert_eq!(settings.error_interval, Duration::from_secs(10));
        assert_eq!(settings.max_wait, Duration::from_secs(300));
    }
}
