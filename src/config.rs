use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Invalid latency range: {0}. Expected <min>-<max> in milliseconds")]
    InvalidRange(String),

    #[error("Success rate must be between 0 and 1, got {0}")]
    InvalidSuccessRate(f64),
}

/// Inclusive-exclusive millisecond range `[min_ms, max_ms)` for simulated delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl LatencyRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub const fn zero() -> Self {
        Self::new(0, 0)
    }

    pub fn min(&self) -> Duration {
        Duration::from_millis(self.min_ms)
    }

    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }
}

impl FromStr for LatencyRange {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidRange(s.to_string());

        let (min, max) = match s.split_once('-') {
            Some((min, max)) => (min.trim(), max.trim()),
            None => (s.trim(), s.trim()),
        };
        let min_ms = min.parse::<u64>().map_err(|_| invalid())?;
        let max_ms = max.parse::<u64>().map_err(|_| invalid())?;
        if min_ms > max_ms {
            return Err(invalid());
        }
        Ok(Self { min_ms, max_ms })
    }
}

/// Knobs for the transaction simulator.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub issue_latency: LatencyRange,
    pub charge_latency: LatencyRange,
    pub lookup_latency: LatencyRange,
    /// Delay between a charge being accepted and its outcome.
    pub settlement_delay: LatencyRange,
    /// Probability that a pending charge completes.
    pub success_rate: f64,
    /// Success rate reported before any charge has resolved.
    pub baseline_success_rate: f64,
    /// Reject a charge while another one is still pending on the same card.
    pub exclusive_charges: bool,
}

impl SimulatorConfig {
    /// Rejects settings the simulator cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // NaN fails the range check too
        if !(0.0..=1.0).contains(&self.success_rate) {
            return Err(ConfigError::InvalidSuccessRate(self.success_rate));
        }
        let ranges = [
            self.issue_latency,
            self.charge_latency,
            self.lookup_latency,
            self.settlement_delay,
        ];
        if let Some(range) = ranges.iter().find(|range| range.min_ms > range.max_ms) {
            return Err(ConfigError::InvalidRange(format!("{}-{}", range.min_ms, range.max_ms)));
        }
        Ok(())
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            issue_latency: LatencyRange::new(200, 700),
            charge_latency: LatencyRange::new(300, 900),
            lookup_latency: LatencyRange::new(100, 400),
            settlement_delay: LatencyRange::new(1000, 3000),
            success_rate: 0.8,
            baseline_success_rate: 97.8,
            exclusive_charges: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub log_file: String,
    pub require_api_key: bool,
    pub simulator: SimulatorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            log_file: "ghostpay.log".to_string(),
            require_api_key: true,
            simulator: SimulatorConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup, so callers
    /// other than the process environment can supply values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();
        let sim_defaults = defaults.simulator.clone();

        let simulator = SimulatorConfig {
            issue_latency: range_or(&lookup, "ISSUE_LATENCY_MS", sim_defaults.issue_latency)?,
            charge_latency: range_or(&lookup, "CHARGE_LATENCY_MS", sim_defaults.charge_latency)?,
            lookup_latency: range_or(&lookup, "LOOKUP_LATENCY_MS", sim_defaults.lookup_latency)?,
            settlement_delay: range_or(&lookup, "SETTLEMENT_DELAY_MS", sim_defaults.settlement_delay)?,
            success_rate: parse_or(&lookup, "SUCCESS_RATE", sim_defaults.success_rate)?,
            baseline_success_rate: sim_defaults.baseline_success_rate,
            exclusive_charges: parse_or(&lookup, "EXCLUSIVE_CHARGES", sim_defaults.exclusive_charges)?,
        };
        simulator.validate()?;

        Ok(Self {
            port: parse_or(&lookup, "PORT", defaults.port)?,
            log_file: lookup("LOG_FILE").unwrap_or(defaults.log_file),
            require_api_key: parse_or(&lookup, "REQUIRE_API_KEY", defaults.require_api_key)?,
            simulator,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}

fn range_or<F>(lookup: &F, key: &'static str, default: LatencyRange) -> Result<LatencyRange, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value.parse(),
        None => Ok(default),
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
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_demo_dashboard() {
        let config = AppConfig::from_lookup(|_| None).unwrap();

        assert_eq!(config.port, 3000);
        assert!(config.require_api_key);
        assert_eq!(config.simulator.settlement_delay, LatencyRange::new(1000, 3000));
        assert_eq!(config.simulator.success_rate, 0.8);
        assert!(!config.simulator.exclusive_charges);
    }

    #[test]
    fn reads_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("SETTLEMENT_DELAY_MS", "10-20"),
            ("LOOKUP_LATENCY_MS", "0"),
            ("EXCLUSIVE_CHARGES", "true"),
            ("SUCCESS_RATE", "0.5"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.simulator.settlement_delay, LatencyRange::new(10, 20));
        assert_eq!(config.simulator.lookup_latency, LatencyRange::zero());
        assert!(config.simulator.exclusive_charges);
        assert_eq!(config.simulator.success_rate, 0.5);
    }

    #[test]
    fn rejects_bad_values() {
        let err = AppConfig::from_lookup(lookup_from(&[("PORT", "eighty")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "PORT",
                value: "eighty".to_string()
            }
        );

        let err = AppConfig::from_lookup(lookup_from(&[("SUCCESS_RATE", "1.5")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidSuccessRate(1.5));

        assert!("700-200".parse::<LatencyRange>().is_err());
        assert!("fast".parse::<LatencyRange>().is_err());
    }

    #[test]
    fn validation_covers_configs_built_in_code() {
        assert!(SimulatorConfig::default().validate().is_ok());

        let config = SimulatorConfig {
            success_rate: 1.5,
            ..SimulatorConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidSuccessRate(1.5)));

        let config = SimulatorConfig {
            success_rate: f64::NAN,
            ..SimulatorConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SimulatorConfig {
            settlement_delay: LatencyRange::new(30, 10),
            ..SimulatorConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidRange("30-10".to_string())));
    }
}
