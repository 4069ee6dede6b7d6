use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use vr64_cpu::DEFAULT_RAM_WORDS;

use crate::input::ControllerConfig;
use crate::peer::DEFAULT_NETPLAY_PORT;

pub const SPEED_MIN: f64 = 0.5;
pub const SPEED_MAX: f64 = 20.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value for environment variable {0}")]
    InvalidEnv(&'static str),

    #[error("RAM size must be a non-zero power of two (got {0} words)")]
    RamWords(usize),

    #[error("speed {0} is outside 0.5..=20.0")]
    SpeedOutOfRange(f64),
}

/// Machine settings. Every field has a default, so a config file may name any subset.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MachineConfig {
    /// Main memory size in 32-bit words.
    pub ram_words: usize,
    /// Throttle multiplier; the worker sleeps `1 / (60 * speed)` seconds per iteration.
    pub speed: f64,
    /// Seed for boot register seeding and cheat rolls.
    pub seed: u64,
    pub use_test_pattern: bool,
    pub netplay_port: u16,
    pub controller: ControllerConfig,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            ram_words: DEFAULT_RAM_WORDS,
            speed: 1.0,
            seed: 0,
            use_test_pattern: true,
            netplay_port: DEFAULT_NETPLAY_PORT,
            controller: ControllerConfig::default(),
        }
    }
}

impl MachineConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Defaults overridden by `VR64_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Applies `VR64_RAM_WORDS`, `VR64_SPEED`, `VR64_SEED`, `VR64_TEST_PATTERN` and
    /// `VR64_NETPLAY_PORT` as read through `lookup`.
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup("VR64_RAM_WORDS") {
            self.ram_words = parse_env("VR64_RAM_WORDS", &raw)?;
        }
        if let Some(raw) = lookup("VR64_SPEED") {
            self.speed = parse_env("VR64_SPEED", &raw)?;
        }
        if let Some(raw) = lookup("VR64_SEED") {
            self.seed = parse_env("VR64_SEED", &raw)?;
        }
        if let Some(raw) = lookup("VR64_TEST_PATTERN") {
            self.use_test_pattern = match raw.trim() {
                "1" | "true" | "on" => true,
                "0" | "false" | "off" => false,
                _ => return Err(ConfigError::InvalidEnv("VR64_TEST_PATTERN")),
            };
        }
        if let Some(raw) = lookup("VR64_NETPLAY_PORT") {
            self.netplay_port = parse_env("VR64_NETPLAY_PORT", &raw)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ram_words == 0 || !self.ram_words.is_power_of_two() {
            return Err(ConfigError::RamWords(self.ram_words));
        }
        check_speed(self.speed)
    }
}

pub fn check_speed(speed: f64) -> Result<(), ConfigError> {
    if (SPEED_MIN..=SPEED_MAX).contains(&speed) {
        Ok(())
    } else {
        Err(ConfigError::SpeedOutOfRange(speed))
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidEnv(key))
}
