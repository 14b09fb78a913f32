//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use serde::Deserialize;

use crate::drive::ChainSpec;
use crate::error::ConfigError;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Default chain used when a request names none.
    #[serde(default)]
    pub chain: ChainConfig,

    /// Tooth count search settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chain.spec()?;

        if self.search.min_teeth == 0 || self.search.max_teeth == 0 {
            return Err(ConfigError::validation(
                "search.min_teeth and search.max_teeth must be at least 1",
            ));
        }

        if self.search.max_candidates == 0 {
            return Err(ConfigError::validation(
                "search.max_candidates must be at least 1",
            ));
        }

        Ok(())
    }
}

/// Default chain configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    /// Chain pitch, in the same unit as center distances.
    /// Default: 0.25 (ANSI #25, inches)
    #[serde(default = "default_pitch")]
    pub pitch: f64,

    /// ANSI chain number. Overrides `pitch` when set.
    #[serde(default)]
    pub ansi_number: Option<String>,
}

impl ChainConfig {
    /// Resolves the configured chain.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the pitch or ANSI number is invalid.
    pub fn spec(&self) -> Result<ChainSpec, ConfigError> {
        let spec = match self.ansi_number {
            Some(ref number) => ChainSpec::from_ansi(number),
            None => ChainSpec::new(self.pitch),
        };
        spec.map_err(|e| ConfigError::validation(format!("chain: {e}")))
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            pitch: default_pitch(),
            ansi_number: None,
        }
    }
}

const fn default_pitch() -> f64 {
    0.25
}

/// Tooth count search configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// Smallest tooth count tried when a request gives no bound.
    #[serde(default = "default_min_teeth")]
    pub min_teeth: u32,

    /// Largest tooth count tried when a request gives no bound.
    #[serde(default = "default_max_teeth")]
    pub max_teeth: u32,

    /// Upper limit on the number of tooth count combinations one request
    /// may evaluate.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_teeth: default_min_teeth(),
            max_teeth: default_max_teeth(),
            max_candidates: default_max_candidates(),
        }
    }
}

const fn default_min_teeth() -> u32 {
    9
}

const fn default_max_teeth() -> u32 {
    60
}

const fn default_max_candidates() -> u64 {
    250_000
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
