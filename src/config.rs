//! # Simulator Harness Configuration
//!
//! The device itself has no runtime configuration; its profile and policy
//! variant are fixed at build time. This file configures the host harness
//! that runs the firmware against simulated hardware.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [simulator]
//! eeprom = "bench.eep"
//! speed = 600.0
//! iterations = 50
//! transcript = "keys.jsonl"
//! enumeration_polls = 100
//!
//! [policy]
//! variant = "patient"
//! ```
//!
//! Every field is optional. `[policy.custom]` may hold a complete
//! `PolicyConfig` table, which takes precedence over `variant`.

// src/config.rs - Harness configuration file
use crate::policy::PolicyConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main harness configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub policy: PolicySelection,
}

/// Simulated board settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulatorConfig {
    /// EEPROM image file; created on first write.
    #[serde(default = "default_eeprom")]
    pub eeprom: String,
    /// Simulated seconds per real second.
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Stop after this many loop iterations instead of running forever.
    #[serde(default)]
    pub iterations: Option<u64>,
    /// JSON-lines file receiving every key press.
    #[serde(default)]
    pub transcript: Option<String>,
    /// Readiness polls before the host finishes enumeration.
    #[serde(default)]
    pub enumeration_polls: u32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            eeprom: default_eeprom(),
            speed: default_speed(),
            iterations: None,
            transcript: None,
            enumeration_polls: 0,
        }
    }
}

/// Which policy variant the harness runs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicySelection {
    #[serde(default = "default_variant")]
    pub variant: String,
    #[serde(default)]
    pub custom: Option<PolicyConfig>,
}

impl Default for PolicySelection {
    fn default() -> Self {
        Self { variant: default_variant(), custom: None }
    }
}

impl PolicySelection {
    /// The selected policy, validated.
    pub fn resolve(&self) -> Result<PolicyConfig, ConfigError> {
        let policy = match &self.custom {
            Some(custom) => custom.clone(),
            None => PolicyConfig::by_name(&self.variant).ok_or_else(|| {
                ConfigError::Invalid(format!("unknown policy variant '{}'", self.variant))
            })?,
        };
        policy.validate()?;
        Ok(policy)
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "simulator speed must be finite and > 0, got {}",
                self.speed
            )));
        }
        Ok(())
    }
}

// Default value functions
fn default_eeprom() -> String { "hidprank.eep".to_string() }
fn default_speed() -> f64 { 1.0 }
fn default_variant() -> String { PolicyConfig::shipped().name }

/// Load configuration from a TOML file at the given path.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(config) => {
                config.simulator.validate()?;
                Ok(config)
            }
            Err(e) => {
                tracing::error!("Failed to parse config TOML: {}", e);
                Err(ConfigError::Toml(e))
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path, e);
            Err(ConfigError::Io(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.simulator.eeprom, "hidprank.eep");
        assert_eq!(config.simulator.speed, 1.0);
        assert!(config.simulator.iterations.is_none());
        assert_eq!(config.policy.variant, PolicyConfig::shipped().name);
        assert_eq!(config.policy.resolve().unwrap(), PolicyConfig::shipped());
    }

    #[test]
    fn test_load_config_success() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("sim.toml");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "[simulator]\nspeed = 600.0\niterations = 5\n[policy]\nvariant = 'patient'").unwrap();
        file.flush().unwrap();
        let config = load_config(file_path.to_str().unwrap()).unwrap();
        assert_eq!(config.simulator.speed, 600.0);
        assert_eq!(config.simulator.iterations, Some(5));
        // Defaults for missing fields
        assert_eq!(config.simulator.eeprom, "hidprank.eep");
        assert_eq!(config.policy.resolve().unwrap().warning_min_boots, 10);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent_file.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("bad.toml");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "not a valid toml").unwrap();
        file.flush().unwrap();
        let result = load_config(file_path.to_str().unwrap());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_load_config_rejects_zero_speed() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("slow.toml");
        std::fs::write(&file_path, "[simulator]\nspeed = 0.0\n").unwrap();
        let result = load_config(file_path.to_str().unwrap());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        std::fs::write(&file_path, "[simulator]\nspeed = inf\n").unwrap();
        let result = load_config(file_path.to_str().unwrap());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let nan = SimulatorConfig { speed: f64::NAN, ..SimulatorConfig::default() };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_overflowing_chaotic_weights_rejected() {
        let mut custom = PolicyConfig::classic();
        custom.chaotic[0].weight = u32::MAX;
        let selection = PolicySelection { variant: "classic".to_string(), custom: Some(custom) };
        assert!(matches!(selection.resolve(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_variant() {
        let selection = PolicySelection { variant: "furious".to_string(), custom: None };
        assert!(matches!(selection.resolve(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_custom_policy_takes_precedence() {
        let mut custom = PolicyConfig::classic();
        custom.name = "bench".to_string();
        custom.warning_min_boots = 1;
        let selection = PolicySelection { variant: "patient".to_string(), custom: Some(custom) };
        let policy = selection.resolve().unwrap();
        assert_eq!(policy.name, "bench");
        assert_eq!(policy.warning_min_boots, 1);
    }
}
