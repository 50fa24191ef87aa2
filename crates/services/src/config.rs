use std::env;
use std::time::Duration;

pub const DEFAULT_CLASSIFIER_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 3000;
pub const DEFAULT_DB_URL: &str = "sqlite://proctor.sqlite3";

/// Runtime knobs for the proctoring pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProctorConfig {
    pub classifier_base_url: String,
    pub sample_interval: Duration,
    pub request_timeout: Duration,
    pub database_url: String,
}

impl Default for ProctorConfig {
    fn default() -> Self {
        Self {
            classifier_base_url: DEFAULT_CLASSIFIER_URL.into(),
            sample_interval: Duration::from_millis(DEFAULT_SAMPLE_INTERVAL_MS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            database_url: DEFAULT_DB_URL.into(),
        }
    }
}

impl ProctorConfig {
    /// Read `PROCTOR_CLASSIFIER_URL`, `PROCTOR_SAMPLE_INTERVAL_MS`,
    /// `PROCTOR_REQUEST_TIMEOUT_MS` and `PROCTOR_DB_URL`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank or invalid values fall back to
    /// the defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let millis = |key: &str, fallback: Duration| match text(key) {
            None => fallback,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    tracing::warn!(key, value = %raw, "ignoring invalid duration");
                    fallback
                }
            },
        };

        Self {
            classifier_base_url: text("PROCTOR_CLASSIFIER_URL")
                .map_or(defaults.classifier_base_url, |v| v.trim().to_string()),
            sample_interval: millis("PROCTOR_SAMPLE_INTERVAL_MS", defaults.sample_interval),
            request_timeout: millis("PROCTOR_REQUEST_TIMEOUT_MS", defaults.request_timeout),
            database_url: text("PROCTOR_DB_URL")
                .map_or(defaults.database_url, |v| v.trim().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        assert_eq!(ProctorConfig::from_lookup(|_| None), ProctorConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = ProctorConfig::from_lookup(lookup(&[
            ("PROCTOR_CLASSIFIER_URL", "http://classifier:9000/"),
            ("PROCTOR_SAMPLE_INTERVAL_MS", "500"),
            ("PROCTOR_REQUEST_TIMEOUT_MS", "1200"),
            ("PROCTOR_DB_URL", "sqlite::memory:"),
        ]));
        assert_eq!(config.classifier_base_url, "http://classifier:9000/");
        assert_eq!(config.sample_interval, Duration::from_millis(500));
        assert_eq!(config.request_timeout, Duration::from_millis(1200));
        assert_eq!(config.database_url, "sqlite::memory:");
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let config = ProctorConfig::from_lookup(lookup(&[
            ("PROCTOR_SAMPLE_INTERVAL_MS", "soon"),
            ("PROCTOR_REQUEST_TIMEOUT_MS", "0"),
            ("PROCTOR_CLASSIFIER_URL", "  "),
        ]));
        assert_eq!(config, ProctorConfig::default());
    }
}
