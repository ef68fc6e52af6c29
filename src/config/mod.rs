use crate::error::{BootError, Result};
use dashmap::DashMap;
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub const SCAN_KEY: &str = "BOOT_SCAN";
pub const INJECT_TIMEOUT_KEY: &str = "BOOT_INJECT_TIMEOUT_MS";
pub const INJECT_RETRY_STEP_KEY: &str = "BOOT_INJECT_RETRY_STEP_MS";

/// Configuration service
#[derive(Clone, Default, Debug)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    /// Snapshot of the process environment.
    pub fn from_env() -> Self {
        Self::from_pairs(env::vars())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let service = Self::default();
        for (key, value) in pairs {
            service.config.insert(key.into(), value.into());
        }
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }

    /// Parse the value under `key`, `Ok(None)` when the key is absent.
    pub fn parse<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| BootError::Config {
                key: key.to_string(),
                message: format!("'{raw}': {e}"),
            }),
        }
    }
}

/// Knobs of the bootstrap phase.
///
/// `scan` mirrors "modules load concurrently": deferred tasks of different origins run
/// side by side and the injector polls for dependencies that are not registered yet.
/// With `scan` off a missing dependency fails on the first lookup.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(try_from = "BootConfigFile")]
pub struct BootConfig {
    pub scan: bool,
    pub inject_timeout: Duration,
    pub inject_retry_step: Duration,
}

/// Serialized form; every value is checked by [`BootConfig::validate`] on the way in.
#[derive(Deserialize)]
#[serde(default)]
struct BootConfigFile {
    scan: bool,
    #[serde(with = "millis")]
    inject_timeout_ms: Duration,
    #[serde(with = "millis")]
    inject_retry_step_ms: Duration,
}

impl Default for BootConfigFile {
    fn default() -> Self {
        let defaults = BootConfig::default();
        Self {
            scan: defaults.scan,
            inject_timeout_ms: defaults.inject_timeout,
            inject_retry_step_ms: defaults.inject_retry_step,
        }
    }
}

impl TryFrom<BootConfigFile> for BootConfig {
    type Error = BootError;

    fn try_from(file: BootConfigFile) -> Result<Self> {
        let config = Self {
            scan: file.scan,
            inject_timeout: file.inject_timeout_ms,
            inject_retry_step: file.inject_retry_step_ms,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            scan: true,
            inject_timeout: Duration::from_secs(10),
            inject_retry_step: Duration::from_millis(20),
        }
    }
}

impl BootConfig {
    pub fn from_config(config: &ConfigService) -> Result<Self> {
        let defaults = Self::default();
        let scan = config.parse::<bool>(SCAN_KEY)?.unwrap_or(defaults.scan);
        let inject_timeout = config
            .parse::<u64>(INJECT_TIMEOUT_KEY)?
            .map(Duration::from_millis)
            .unwrap_or(defaults.inject_timeout);
        let inject_retry_step = config
            .parse::<u64>(INJECT_RETRY_STEP_KEY)?
            .map(Duration::from_millis)
            .unwrap_or(defaults.inject_retry_step);

        let config = Self {
            scan,
            inject_timeout,
            inject_retry_step,
        };
        config.validate()?;
        Ok(config)
    }

    /// A zero retry step would make the injector spin until the timeout.
    pub fn validate(&self) -> Result<()> {
        if self.inject_retry_step.is_zero() {
            return Err(BootError::Config {
                key: INJECT_RETRY_STEP_KEY.to_string(),
                message: "retry step must be positive".to_string(),
            });
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_keys_missing() {
        let config = ConfigService::from_pairs(Vec::<(String, String)>::new());
        assert_eq!(BootConfig::from_config(&config).unwrap(), BootConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = ConfigService::from_pairs([
            (SCAN_KEY, "false"),
            (INJECT_TIMEOUT_KEY, "250"),
            (INJECT_RETRY_STEP_KEY, "5"),
        ]);
        let boot = BootConfig::from_config(&config).unwrap();
        assert!(!boot.scan);
        assert_eq!(boot.inject_timeout, Duration::from_millis(250));
        assert_eq!(boot.inject_retry_step, Duration::from_millis(5));
    }

    #[test]
    fn rejects_garbage() {
        let config = ConfigService::from_pairs([(INJECT_TIMEOUT_KEY, "soon")]);
        let err = BootConfig::from_config(&config).unwrap_err();
        assert!(matches!(err, BootError::Config { ref key, .. } if key == INJECT_TIMEOUT_KEY));
    }

    #[test]
    fn deserializes_from_json() {
        let boot: BootConfig =
            serde_json::from_str(r#"{"scan": false, "inject_timeout_ms": 100}"#).unwrap();
        assert!(!boot.scan);
        assert_eq!(boot.inject_timeout, Duration::from_millis(100));
        assert_eq!(boot.inject_retry_step, Duration::from_millis(20));
    }

    #[test]
    fn zero_retry_step_is_rejected_everywhere() {
        let err = serde_json::from_str::<BootConfig>(r#"{"inject_retry_step_ms": 0}"#).unwrap_err();
        assert!(err.to_string().contains("retry step must be positive"));

        let config = ConfigService::from_pairs([(INJECT_RETRY_STEP_KEY, "0")]);
        assert!(BootConfig::from_config(&config).is_err());

        let built = BootConfig {
            inject_retry_step: Duration::ZERO,
            ..BootConfig::default()
        };
        assert!(matches!(built.validate(), Err(BootError::Config { .. })));
    }
}
