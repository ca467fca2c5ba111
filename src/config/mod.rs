//! Configuration System for netdiag
//!
//! Engine tunables only: the variables and rules of a diagnosis system are
//! always built in code. Supported sources:
//! - TOML configuration files
//! - Environment variable overrides
//!
//! # Configuration File Locations
//!
//! Configuration files are searched in order (first found wins):
//! 1. `./netdiag.toml` - Project-local configuration
//! 2. `~/.config/netdiag/config.toml` - User configuration (XDG)
//! 3. `~/.netdiag/config.toml` - User configuration (legacy)
//! 4. `/etc/netdiag/config.toml` - System-wide configuration
//!
//! # Environment Variables
//!
//! - `NETDIAG_LOG_LEVEL` - Logging verbosity (quiet, normal, verbose, debug)
//! - `NETDIAG_FORMAT` - Report format (text, json)
//! - `NETDIAG_CLIP_INPUTS` - Clamp inputs to their universe (true/false)
//! - `NETDIAG_OUTPUT_STEP` - Output universe resolution
//! - `NETDIAG_SECONDARY_THRESHOLD` - Score above which secondary findings are listed
//! - `NETDIAG_HIGH_SEVERITY_THRESHOLD` - Score above which findings are high severity
//!
//! # Example Configuration
//!
//! ```toml
//! [general]
//! log_level = "verbose"
//! format = "json"
//!
//! [engine]
//! clip_inputs = true
//! output_step = 0.5
//!
//! [diagnosis]
//! secondary_threshold = 50.0
//! high_severity_threshold = 70.0
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::fuzzy::{DiagnosisSelector, DEFAULT_HIGH_SEVERITY_THRESHOLD, DEFAULT_SECONDARY_THRESHOLD};

/// Finest accepted output sampling step
pub const MIN_OUTPUT_STEP: f64 = 0.001;
/// Coarsest accepted output sampling step
pub const MAX_OUTPUT_STEP: f64 = 50.0;

// ============================================================================
// Configuration Schema
// ============================================================================

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NetdiagConfig {
    pub general: GeneralConfig,
    pub engine: EngineConfig,
    pub diagnosis: DiagnosisConfig,
}

/// General configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: LogLevel,
    /// Report format for the CLI
    pub format: ReportFormat,
}

/// Inference engine tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Clamp inputs to their variable's universe before fuzzification
    pub clip_inputs: bool,
    /// Sample spacing of output universes used for defuzzification
    pub output_step: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            clip_inputs: true,
            output_step: 1.0,
        }
    }
}

/// Diagnosis selection thresholds, on the 0-100 score scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosisConfig {
    pub secondary_threshold: f64,
    pub high_severity_threshold: f64,
}

impl Default for DiagnosisConfig {
    fn default() -> Self {
        Self {
            secondary_threshold: DEFAULT_SECONDARY_THRESHOLD,
            high_severity_threshold: DEFAULT_HIGH_SEVERITY_THRESHOLD,
        }
    }
}

impl DiagnosisConfig {
    pub fn selector(&self) -> DiagnosisSelector {
        DiagnosisSelector::new(self.secondary_threshold, self.high_severity_threshold)
    }
}

// ============================================================================
// Enums
// ============================================================================

/// Log level options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Quiet,
    #[default]
    Normal,
    Verbose,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Verbose => "verbose",
            LogLevel::Debug => "debug",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "quiet" | "q" | "0" => Some(LogLevel::Quiet),
            "normal" | "n" | "1" => Some(LogLevel::Normal),
            "verbose" | "v" | "2" => Some(LogLevel::Verbose),
            "debug" | "d" | "3" => Some(LogLevel::Debug),
            _ => None,
        }
    }

    /// `tracing` filter directive for this level
    pub fn filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Quiet => "error",
            LogLevel::Normal => "warn",
            LogLevel::Verbose => "info",
            LogLevel::Debug => "debug",
        }
    }
}

/// Report format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Text => "text",
            ReportFormat::Json => "json",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "plain" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

// ============================================================================
// Configuration Loading
// ============================================================================

impl NetdiagConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from default locations, then apply environment
    /// variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for path in Self::config_paths() {
            if path.exists() {
                config = Self::load_from_file(&path)?;
                info!(path = %path.display(), "loaded configuration");
                break;
            }
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))
    }

    /// Load configuration from a TOML string
    pub fn load_from_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(PathBuf::from("<string>"), e.to_string()))
    }

    /// Get the list of config file search paths
    pub fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./netdiag.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("netdiag").join("config.toml"));
        }

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".netdiag").join("config.toml"));
        }

        #[cfg(unix)]
        paths.push(PathBuf::from("/etc/netdiag/config.toml"));

        paths
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply `NETDIAG_*` overrides from any key/value source.
    ///
    /// Unparseable values are ignored and leave the current setting intact.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("NETDIAG_LOG_LEVEL").and_then(|v| LogLevel::from_str(&v)) {
            self.general.log_level = level;
        }

        if let Some(format) = lookup("NETDIAG_FORMAT").and_then(|v| ReportFormat::from_str(&v)) {
            self.general.format = format;
        }

        if let Some(val) = lookup("NETDIAG_CLIP_INPUTS") {
            self.engine.clip_inputs = val == "true" || val == "1" || val == "yes";
        }

        if let Some(step) = lookup("NETDIAG_OUTPUT_STEP").and_then(|v| v.parse::<f64>().ok()) {
            self.engine.output_step = step;
        }

        if let Some(t) = lookup("NETDIAG_SECONDARY_THRESHOLD").and_then(|v| v.parse::<f64>().ok()) {
            self.diagnosis.secondary_threshold = t;
        }

        if let Some(t) = lookup("NETDIAG_HIGH_SEVERITY_THRESHOLD").and_then(|v| v.parse::<f64>().ok()) {
            self.diagnosis.high_severity_threshold = t;
        }
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let step = self.engine.output_step;
        if !(MIN_OUTPUT_STEP..=MAX_OUTPUT_STEP).contains(&step) {
            return Err(ConfigError::InvalidValue {
                key: "engine.output_step".to_string(),
                reason: format!("{} is not in [{}, {}]", step, MIN_OUTPUT_STEP, MAX_OUTPUT_STEP),
            });
        }

        for (key, value) in [
            ("diagnosis.secondary_threshold", self.diagnosis.secondary_threshold),
            ("diagnosis.high_severity_threshold", self.diagnosis.high_severity_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: format!("{} is outside [0, 100]", value),
                });
            }
        }

        if self.diagnosis.high_severity_threshold < self.diagnosis.secondary_threshold {
            return Err(ConfigError::InvalidValue {
                key: "diagnosis.high_severity_threshold".to_string(),
                reason: format!(
                    "{} is below diagnosis.secondary_threshold ({})",
                    self.diagnosis.high_severity_threshold, self.diagnosis.secondary_threshold
                ),
            });
        }

        Ok(())
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Generate a default configuration file content
    pub fn default_config_content() -> &'static str {
        r#"# netdiag configuration file

[general]
# Logging level: quiet, normal, verbose, debug
log_level = "normal"
# Report format: text, json
format = "text"

[engine]
# Clamp readings outside a variable's universe to its bounds
clip_inputs = true
# Output universe resolution, 0.001 to 50 (smaller is more precise and slower)
output_step = 1.0

[diagnosis]
# Other faults scoring above this are listed as secondary findings
secondary_threshold = 50.0
# Findings scoring above this are reported as high severity
high_severity_threshold = 70.0
"#
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {1}", path = .0.display())]
    Io(PathBuf, String),
    #[error("Parse error in {path}: {1}", path = .0.display())]
    Parse(PathBuf, String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = NetdiagConfig::new();
        assert!(config.engine.clip_inputs);
        assert_eq!(config.engine.output_step, 1.0);
        assert_eq!(config.diagnosis.secondary_threshold, 50.0);
        assert_eq!(config.diagnosis.high_severity_threshold, 70.0);
        assert_eq!(config.general.format, ReportFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [general]
            format = "json"
            log_level = "verbose"

            [engine]
            output_step = 0.5

            [diagnosis]
            secondary_threshold = 60.0
        "#;

        let config = NetdiagConfig::load_from_str(toml).unwrap();
        assert_eq!(config.general.format, ReportFormat::Json);
        assert_eq!(config.general.log_level, LogLevel::Verbose);
        assert_eq!(config.engine.output_step, 0.5);
        assert!(config.engine.clip_inputs);
        assert_eq!(config.diagnosis.secondary_threshold, 60.0);
        assert_eq!(config.diagnosis.high_severity_threshold, 70.0);
    }

    #[test]
    fn test_default_content_parses_to_defaults() {
        let config = NetdiagConfig::load_from_str(NetdiagConfig::default_config_content()).unwrap();
        assert_eq!(config, NetdiagConfig::default());
    }

    #[test]
    fn test_parse_error() {
        let err = NetdiagConfig::load_from_str("[engine]\noutput_step = \"fine\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(..)));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("NETDIAG_LOG_LEVEL", "debug"),
            ("NETDIAG_FORMAT", "json"),
            ("NETDIAG_CLIP_INPUTS", "false"),
            ("NETDIAG_OUTPUT_STEP", "0.25"),
            ("NETDIAG_SECONDARY_THRESHOLD", "not-a-number"),
            ("NETDIAG_HIGH_SEVERITY_THRESHOLD", "80"),
        ]
        .into_iter()
        .collect();

        let mut config = NetdiagConfig::new();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.general.log_level, LogLevel::Debug);
        assert_eq!(config.general.format, ReportFormat::Json);
        assert!(!config.engine.clip_inputs);
        assert_eq!(config.engine.output_step, 0.25);
        assert_eq!(config.diagnosis.secondary_threshold, 50.0);
        assert_eq!(config.diagnosis.high_severity_threshold, 80.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = NetdiagConfig::new();
        config.engine.output_step = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));

        let mut config = NetdiagConfig::new();
        config.diagnosis.secondary_threshold = 120.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("diagnosis.secondary_threshold"));

        for step in [1e-300, f64::NAN, f64::INFINITY, 50.5] {
            let mut config = NetdiagConfig::new();
            config.engine.output_step = step;
            assert!(config.validate().is_err(), "step {}", step);
        }
        let mut config = NetdiagConfig::new();
        config.engine.output_step = MIN_OUTPUT_STEP;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let mut config = NetdiagConfig::new();
        config.diagnosis.secondary_threshold = 60.0;
        config.diagnosis.high_severity_threshold = 55.0;
        match config.validate() {
            Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, "diagnosis.high_severity_threshold"),
            other => panic!("unexpected {:?}", other),
        }

        config.diagnosis.high_severity_threshold = 60.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_error_display() {
        let io = ConfigError::Io(PathBuf::from("netdiag.toml"), "permission denied".to_string());
        assert_eq!(io.to_string(), "IO error reading netdiag.toml: permission denied");

        let parse = ConfigError::Parse(PathBuf::from("/etc/netdiag.toml"), "expected `=`".to_string());
        assert_eq!(parse.to_string(), "Parse error in /etc/netdiag.toml: expected `=`");
    }

    #[test]
    fn test_serialize_config() {
        let toml = NetdiagConfig::new().to_toml().unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[engine]"));
        assert!(toml.contains("[diagnosis]"));
    }

    #[test]
    fn test_log_level_filters() {
        assert_eq!(LogLevel::from_str("v"), Some(LogLevel::Verbose));
        assert_eq!(LogLevel::Quiet.filter_directive(), "error");
        assert_eq!(LogLevel::Debug.filter_directive(), "debug");
        assert_eq!(ReportFormat::from_str("JSON"), Some(ReportFormat::Json));
        assert_eq!(ReportFormat::from_str("yaml"), None);
    }

    #[test]
    fn test_config_paths() {
        let paths = NetdiagConfig::config_paths();
        assert!(paths[0].ends_with("netdiag.toml"));
    }
}
