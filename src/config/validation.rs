use std::collections::HashMap;
use log::{debug, error, warn};
use thiserror::Error;

use crate::config::SuretyParameters;

/// Error type for configuration validation issues
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Incompatible settings: {0}")]
    IncompatibleSettings(String),

    #[error("Value out of range: {0}")]
    ValueOutOfRange(String),
}

/// Result of configuration validation
#[derive(Debug)]
pub struct ValidationResult {
    /// Whether the validation passed
    pub is_valid: bool,

    /// List of errors found during validation
    pub errors: Vec<ConfigValidationError>,

    /// List of warnings (valid but not recommended)
    pub warnings: Vec<String>,

    /// Suggested fixes for validation issues
    pub suggested_fixes: HashMap<String, String>,

    /// Rules that failed, with what each one checks
    pub failed_rules: Vec<(String, String)>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            suggested_fixes: HashMap::new(),
            failed_rules: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: ConfigValidationError) {
        self.is_valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn add_suggested_fix(&mut self, setting: &str, suggestion: String) {
        self.suggested_fixes.insert(setting.to_string(), suggestion);
    }

    pub fn add_failed_rule(&mut self, name: &str, description: &str) {
        self.failed_rules.push((name.to_string(), description.to_string()));
    }

    /// Return a summary of validation issues
    pub fn get_summary(&self) -> String {
        if self.is_valid && self.warnings.is_empty() {
            return "Configuration is valid with no warnings.".to_string();
        }

        let mut result = String::new();

        if !self.is_valid {
            result.push_str(&format!("Configuration has {} errors:\n", self.errors.len()));
            for (i, error) in self.errors.iter().enumerate() {
                result.push_str(&format!("  {}. {}\n", i + 1, error));
            }
        } else {
            result.push_str("Configuration is valid but has warnings.\n");
        }

        if !self.failed_rules.is_empty() {
            result.push_str("\nFailed checks:\n");
            for (name, description) in &self.failed_rules {
                result.push_str(&format!("  - {}: {}\n", name, description));
            }
        }

        if !self.warnings.is_empty() {
            result.push_str(&format!("\nWarnings ({}):\n", self.warnings.len()));
            for (i, warning) in self.warnings.iter().enumerate() {
                result.push_str(&format!("  {}. {}\n", i + 1, warning));
            }
        }

        if !self.suggested_fixes.is_empty() {
            let mut fixes: Vec<_> = self.suggested_fixes.iter().collect();
            fixes.sort();
            result.push_str("\nSuggested fixes:\n");
            for (setting, suggestion) in fixes {
                result.push_str(&format!("  - {}: {}\n", setting, suggestion));
            }
        }

        result
    }
}

/// Configuration validation rule
pub trait ValidationRule {
    fn name(&self) -> &str;

    fn validate(&self, params: &SuretyParameters) -> Result<(), ConfigValidationError>;

    fn description(&self) -> &str;

    /// Suggest a fix for validation failures
    fn suggest_fix(&self, params: &SuretyParameters) -> Option<HashMap<String, String>>;
}

/// Applies a set of rules to the ledger parameters
pub struct ConfigValidator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigValidator {
    /// Create a validator with the default rules
    pub fn new() -> Self {
        let mut validator = Self { rules: Vec::new() };

        validator.add_rule(Box::new(BootstrapCommitteeRule));
        validator.add_rule(Box::new(OracleQuorumRule));
        validator.add_rule(Box::new(PayoutRatioRule));
        validator.add_rule(Box::new(IndexSpaceRule));

        validator
    }

    pub fn add_rule(&mut self, rule: Box<dyn ValidationRule>) {
        self.rules.push(rule);
    }

    pub fn validate(&self, params: &SuretyParameters) -> ValidationResult {
        let mut result = ValidationResult::new();

        for rule in &self.rules {
            match rule.validate(params) {
                Ok(()) => {
                    debug!("Validation rule '{}' passed", rule.name());
                }
                Err(err) => {
                    error!("Validation rule '{}' failed: {}", rule.name(), err);
                    result.add_error(err);
                    result.add_failed_rule(rule.name(), rule.description());

                    if let Some(fixes) = rule.suggest_fix(params) {
                        for (setting, suggestion) in fixes {
                            result.add_suggested_fix(&setting, suggestion);
                        }
                    }
                }
            }
        }

        // Valid but likely unintended.
        if params.purchase_cap.is_zero() {
            let msg = "purchase_cap is zero, so no passenger can buy insurance".to_string();
            warn!("{}", msg);
            result.add_warning(msg);
        }

        result
    }
}

struct BootstrapCommitteeRule;

impl ValidationRule for BootstrapCommitteeRule {
    fn name(&self) -> &str {
        "BootstrapCommittee"
    }

    fn validate(&self, params: &SuretyParameters) -> Result<(), ConfigValidationError> {
        if params.bootstrap_committee_size == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "bootstrap_committee_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn description(&self) -> &str {
        "Checks that airlines can join without a vote while the committee is small"
    }

    fn suggest_fix(&self, _params: &SuretyParameters) -> Option<HashMap<String, String>> {
        let mut fixes = HashMap::new();
        fixes.insert(
            "bootstrap_committee_size".to_string(),
            "Use 4 to admit the first four airlines directly".to_string(),
        );
        Some(fixes)
    }
}

struct OracleQuorumRule;

impl ValidationRule for OracleQuorumRule {
    fn name(&self) -> &str {
        "OracleQuorum"
    }

    fn validate(&self, params: &SuretyParameters) -> Result<(), ConfigValidationError> {
        if params.oracle_quorum == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "oracle_quorum must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn description(&self) -> &str {
        "Checks that a flight status needs at least one agreeing report"
    }

    fn suggest_fix(&self, _params: &SuretyParameters) -> Option<HashMap<String, String>> {
        let mut fixes = HashMap::new();
        fixes.insert("oracle_quorum".to_string(), "Use 3 agreeing reports".to_string());
        Some(fixes)
    }
}

struct PayoutRatioRule;

impl ValidationRule for PayoutRatioRule {
    fn name(&self) -> &str {
        "PayoutRatio"
    }

    fn validate(&self, params: &SuretyParameters) -> Result<(), ConfigValidationError> {
        let (numerator, denominator) = params.payout_ratio.as_parts();
        if denominator == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "payout_ratio denominator must not be zero".to_string(),
            ));
        }
        if numerator < denominator {
            return Err(ConfigValidationError::ValueOutOfRange(format!(
                "payout_ratio {} pays back less than the premium",
                params.payout_ratio
            )));
        }
        Ok(())
    }

    fn description(&self) -> &str {
        "Checks that a delayed passenger receives at least what they paid"
    }

    fn suggest_fix(&self, _params: &SuretyParameters) -> Option<HashMap<String, String>> {
        let mut fixes = HashMap::new();
        fixes.insert(
            "payout_ratio".to_string(),
            "Use numerator = 3, denominator = 2".to_string(),
        );
        Some(fixes)
    }
}

struct IndexSpaceRule;

impl ValidationRule for IndexSpaceRule {
    fn name(&self) -> &str {
        "IndexSpace"
    }

    fn validate(&self, params: &SuretyParameters) -> Result<(), ConfigValidationError> {
        if params.oracle_index_space == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "oracle_index_space must be at least 1".to_string(),
            ));
        }
        if params.indexes_per_oracle == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "indexes_per_oracle must be at least 1".to_string(),
            ));
        }
        if params.indexes_per_oracle > params.oracle_index_space as usize {
            return Err(ConfigValidationError::IncompatibleSettings(format!(
                "indexes_per_oracle {} exceeds oracle_index_space {}",
                params.indexes_per_oracle, params.oracle_index_space
            )));
        }
        Ok(())
    }

    fn description(&self) -> &str {
        "Checks that every oracle can hold distinct indexes"
    }

    fn suggest_fix(&self, params: &SuretyParameters) -> Option<HashMap<String, String>> {
        let mut fixes = HashMap::new();
        if params.oracle_index_space == 0 {
            fixes.insert("oracle_index_space".to_string(), "Use 10".to_string());
        } else {
            fixes.insert(
                "indexes_per_oracle".to_string(),
                format!("Use a value between 1 and {}", params.oracle_index_space),
            );
        }
        Some(fixes)
    }
}
