use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::modules::email::SmtpSettings;
use crate::RECOVER_WITHIN;

/// Default pattern a username has to match
pub const USERNAME_PATTERN: &str = r"^[-a-zA-Z0-9_\.@]+$";

/// Named parameter sets for the strength rule
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StrengthPreset {
    Simple,
    Normal,
    Fair,
    Medium,
    Strong,
}

/// Effective parameters of the strength rule after presets and overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrengthRules {
    pub min: usize,
    pub max: Option<usize>,
    pub lower: usize,
    pub upper: usize,
    pub digit: usize,
    pub special: usize,
    pub has_user: bool,
    pub has_email: bool,
}

impl StrengthRules {
    fn base() -> Self {
        Self {
            min: 4,
            max: None,
            lower: 2,
            upper: 2,
            digit: 2,
            special: 2,
            has_user: true,
            has_email: true,
        }
    }

    fn preset(preset: StrengthPreset) -> Self {
        let (min, lower, upper, digit, special) = match preset {
            StrengthPreset::Simple => (6, 1, 0, 1, 0),
            StrengthPreset::Normal => (8, 1, 1, 1, 0),
            StrengthPreset::Fair => (10, 1, 1, 1, 1),
            StrengthPreset::Medium => (10, 1, 1, 2, 1),
            StrengthPreset::Strong => (12, 2, 2, 2, 2),
        };
        Self {
            min,
            max: None,
            lower,
            upper,
            digit,
            special,
            has_user: true,
            has_email: true,
        }
    }
}

/// Strength rule configuration; every explicit field overrides the preset
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct StrengthConfig {
    pub preset: Option<StrengthPreset>,
    pub min: Option<usize>,
    pub max: Option<usize>,
    pub lower: Option<usize>,
    pub upper: Option<usize>,
    pub digit: Option<usize>,
    pub special: Option<usize>,
    pub has_user: Option<bool>,
    pub has_email: Option<bool>,
}

impl StrengthConfig {
    pub fn with_preset(preset: StrengthPreset) -> Self {
        Self {
            preset: Some(preset),
            ..Self::default()
        }
    }

    pub fn rules(&self) -> StrengthRules {
        let mut rules = match self.preset {
            Some(preset) => StrengthRules::preset(preset),
            None => StrengthRules::base(),
        };
        if let Some(min) = self.min {
            rules.min = min;
        }
        if self.max.is_some() {
            rules.max = self.max;
        }
        if let Some(lower) = self.lower {
            rules.lower = lower;
        }
        if let Some(upper) = self.upper {
            rules.upper = upper;
        }
        if let Some(digit) = self.digit {
            rules.digit = digit;
        }
        if let Some(special) = self.special {
            rules.special = special;
        }
        if let Some(has_user) = self.has_user {
            rules.has_user = has_user;
        }
        if let Some(has_email) = self.has_email {
            rules.has_email = has_email;
        }
        rules
    }
}

/// Settings of the user module shared by every form
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ModuleConfig {
    /// Generate a password on registration when none is entered
    pub enable_generating_password: bool,
    /// Use the strength rule instead of the plain 6..=72 length check
    pub enable_strength_validation: bool,
    pub password_strength: StrengthConfig,
    pub require_username: bool,
    pub username_pattern: String,
    /// Seconds a recovery token stays usable
    pub recover_within: u64,
    pub app_name: String,
    /// Base of the link put into recovery mails
    pub recovery_url: String,
    pub language: String,
    /// Relay settings; the password is kept in the system keyring
    pub smtp: Option<SmtpSettings>,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            enable_generating_password: false,
            enable_strength_validation: false,
            password_strength: StrengthConfig::with_preset(StrengthPreset::Normal),
            require_username: true,
            username_pattern: USERNAME_PATTERN.to_string(),
            recover_within: RECOVER_WITHIN,
            app_name: "Account Forms".to_string(),
            recovery_url: "http://localhost/user/recovery/reset".to_string(),
            language: "en".to_string(),
            smtp: None,
        }
    }
}

impl ModuleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file, using defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            log::info!(
                "No configuration at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let data = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read configuration: {}", e))?;
        let config: Self = serde_json::from_str(&data)
            .map_err(|e| format!("Failed to parse configuration: {}", e))?;
        config.check()?;
        Ok(config)
    }

    /// Save configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), String> {
        self.check()?;
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize configuration: {}", e))?;
        fs::write(path, data).map_err(|e| format!("Failed to write configuration: {}", e))
    }

    /// Reject settings the forms cannot work with
    pub fn check(&self) -> Result<(), String> {
        self.username_regex()?;

        let rules = self.password_strength.rules();
        if let Some(max) = rules.max {
            if max < rules.min {
                return Err(format!(
                    "Password strength max ({}) is lower than min ({})",
                    max, rules.min
                ));
            }
        }
        if self.recover_within == 0 {
            return Err("recover_within must be greater than zero".to_string());
        }
        Ok(())
    }

    pub fn username_regex(&self) -> Result<Regex, String> {
        Regex::new(&self.username_pattern)
            .map_err(|e| format!("Invalid username pattern: {}", e))
    }
}
