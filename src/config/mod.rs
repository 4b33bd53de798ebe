// Configuration module for FlightSure
// Layers defaults, an optional TOML file and FLIGHTSURE_* environment variables

pub mod validation;

pub use validation::{ConfigValidationError, ConfigValidator, ValidationResult};

use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::ledger::Amount;

/// Prefix for environment overrides, e.g. `FLIGHTSURE_PARAMETERS__ORACLE_QUORUM=5`
pub const ENV_PREFIX: &str = "FLIGHTSURE";

/// Payout multiple applied to an insured amount, as an exact fraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRatio {
    pub numerator: u64,
    pub denominator: u64,
}

impl PayoutRatio {
    pub const fn new(numerator: u64, denominator: u64) -> Self {
        PayoutRatio {
            numerator,
            denominator,
        }
    }

    pub fn as_parts(&self) -> (u64, u64) {
        (self.numerator, self.denominator)
    }
}

impl Default for PayoutRatio {
    fn default() -> Self {
        PayoutRatio::new(3, 2)
    }
}

impl fmt::Display for PayoutRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Economic and consensus constants of the surety ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuretyParameters {
    /// Cumulative funding an airline needs before it may vote or register flights
    pub membership_threshold: Amount,
    /// Committee size up to which airlines are admitted without a vote
    pub bootstrap_committee_size: usize,
    /// Maximum cover per passenger per flight
    pub purchase_cap: Amount,
    pub payout_ratio: PayoutRatio,
    /// Agreeing oracle reports needed to finalize a flight status
    pub oracle_quorum: usize,
    pub oracle_registration_fee: Amount,
    pub oracle_index_space: u8,
    pub indexes_per_oracle: usize,
}

impl Default for SuretyParameters {
    fn default() -> Self {
        SuretyParameters {
            membership_threshold: Amount::from_units(10),
            bootstrap_committee_size: 4,
            purchase_cap: Amount::from_units(1),
            payout_ratio: PayoutRatio::default(),
            oracle_quorum: 3,
            oracle_registration_fee: Amount::from_units(1),
            oracle_index_space: 10,
            indexes_per_oracle: 3,
        }
    }
}

/// Top-level configuration for the library and the CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuretyConfig {
    /// Seed for reproducible oracle index draws; hashed chain context is used when absent
    pub index_seed: Option<u64>,
    /// Where the CLI keeps the ledger snapshot between invocations
    pub state_file: PathBuf,
    pub log_level: String,
    pub parameters: SuretyParameters,
}

impl Default for SuretyConfig {
    fn default() -> Self {
        SuretyConfig {
            index_seed: None,
            state_file: PathBuf::from("flightsure-state.json"),
            log_level: "info".to_string(),
            parameters: SuretyParameters::default(),
        }
    }
}

/// Errors while assembling configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration:\n{0}")]
    Invalid(String),

    #[error("Failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

impl SuretyConfig {
    /// Load configuration from serde defaults, then `path` (if given and present), then the
    /// environment. The result is validated before it is returned.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        // Missing keys fall back to the serde defaults above.
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            debug!("Reading configuration from {}", path.display());
            builder = builder.add_source(::config::File::from(path).required(false));
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        );

        let loaded: SuretyConfig = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        info!(
            "Configuration loaded: quorum {}, cap {}, threshold {}",
            loaded.parameters.oracle_quorum,
            loaded.parameters.purchase_cap,
            loaded.parameters.membership_threshold
        );
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let result = ConfigValidator::new().validate(&self.parameters);
        if result.is_valid {
            Ok(())
        } else {
            Err(ConfigError::Invalid(result.get_summary()))
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
