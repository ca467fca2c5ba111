//! Structured Error Handling for netdiag
//!
//! Provides a unified error type with:
//! - Error codes for programmatic handling
//! - Structured, JSON-friendly error values
//! - Context preservation (offending names, source location)
//!
//! # Error Categories
//!
//! - Model errors (1xxx) - malformed membership functions, universes,
//!   duplicate or unknown variables and terms. Raised while building a
//!   rule base; fatal to that construction call.
//! - Evaluation errors (2xxx) - incomplete or invalid crisp inputs for a
//!   single diagnosis. Recoverable by retrying with corrected inputs.
//! - Config errors (7xxx) - configuration file and override problems.
//!
//! "No rule fired" is not an error: it is reported as
//! [`OutputScore::Undetermined`](crate::fuzzy::OutputScore) and
//! [`Diagnosis::NoDiagnosis`](crate::fuzzy::Diagnosis).
//!
//! # Example
//!
//! ```rust
//! use netdiag::error::{NetdiagError, ErrorCode};
//!
//! let err = NetdiagError::missing_input("errores_dns")
//!     .with_hint("Supply a DNS error rate reading");
//! assert_eq!(err.code, ErrorCode::MissingInput);
//! assert!(err.code.is_recoverable());
//! ```

use std::collections::HashMap;
use std::fmt;
use serde::{Deserialize, Serialize};

// ============================================================================
// Error Codes
// ============================================================================

/// Unique error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Model construction errors (1xxx)
    /// Membership function control points are not finite and non-decreasing
    InvalidShape = 1001,
    /// Universe of discourse bounds or step are invalid
    InvalidUniverse = 1002,
    /// Term name already registered on the variable
    DuplicateTerm = 1003,
    /// Term name not registered on the variable
    UnknownTerm = 1004,
    /// Variable name already registered on the rule base
    DuplicateVariable = 1005,
    /// Variable name not registered on the rule base
    UnknownVariable = 1006,
    /// Consequent weight outside [0, 1]
    InvalidWeight = 1007,
    /// AND/OR node without operands
    EmptyExpression = 1008,

    // Evaluation errors (2xxx)
    /// A referenced input variable has no crisp value
    MissingInput = 2001,
    /// A crisp value is NaN or infinite
    InvalidInput = 2002,

    // Config errors (7xxx)
    /// Generic config error
    ConfigError = 7000,
    /// Config file not found
    ConfigNotFound = 7001,
    /// Invalid config syntax
    InvalidConfigSyntax = 7002,
    /// Invalid config value
    InvalidConfigValue = 7003,

    // Internal errors (9xxx)
    /// Internal error
    InternalError = 9000,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Get a short description of the error code
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::InvalidShape => "Invalid membership function shape",
            ErrorCode::InvalidUniverse => "Invalid universe of discourse",
            ErrorCode::DuplicateTerm => "Duplicate term",
            ErrorCode::UnknownTerm => "Unknown term",
            ErrorCode::DuplicateVariable => "Duplicate variable",
            ErrorCode::UnknownVariable => "Unknown variable",
            ErrorCode::InvalidWeight => "Invalid consequent weight",
            ErrorCode::EmptyExpression => "Empty antecedent expression",

            ErrorCode::MissingInput => "Missing input",
            ErrorCode::InvalidInput => "Invalid input value",

            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::ConfigNotFound => "Configuration file not found",
            ErrorCode::InvalidConfigSyntax => "Invalid configuration syntax",
            ErrorCode::InvalidConfigValue => "Invalid configuration value",

            ErrorCode::InternalError => "Internal error",
        }
    }

    /// Whether the failing call can succeed if retried with corrected inputs.
    ///
    /// Model errors are raised while building the rule base and are fatal to
    /// that construction call; evaluation errors only concern one diagnosis.
    pub fn is_recoverable(&self) -> bool {
        (2000..3000).contains(&self.code())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

// ============================================================================
// Error Context
// ============================================================================

/// Additional context information for an error
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Key-value pairs of context information
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub fields: HashMap<String, String>,
    /// Source location (file:line)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// Main Error Type
// ============================================================================

/// The main error type for netdiag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetdiagError {
    /// Error code for programmatic handling
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Additional context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,
    /// Hint for resolving the error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl NetdiagError {
    /// Create a new error with a code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            hint: None,
        }
    }

    // ========================================================================
    // Factory methods for common error types
    // ========================================================================

    /// Membership function with malformed control points
    pub fn invalid_shape(shape: &str, params: &[f64]) -> Self {
        Self::new(
            ErrorCode::InvalidShape,
            format!("{} parameters {:?} must be finite and non-decreasing", shape, params),
        )
    }

    /// Universe with invalid bounds or step
    pub fn invalid_universe(min: f64, max: f64, step: f64) -> Self {
        Self::new(
            ErrorCode::InvalidUniverse,
            format!("universe [{}, {}] with step {} is not a valid discretization", min, max, step),
        )
    }

    pub fn duplicate_term(variable: &str, term: &str) -> Self {
        Self::new(
            ErrorCode::DuplicateTerm,
            format!("term '{}' is already defined on variable '{}'", term, variable),
        )
        .with_context("variable", variable)
        .with_context("term", term)
    }

    pub fn unknown_term(variable: &str, term: &str) -> Self {
        Self::new(
            ErrorCode::UnknownTerm,
            format!("variable '{}' has no term '{}'", variable, term),
        )
        .with_context("variable", variable)
        .with_context("term", term)
    }

    pub fn duplicate_variable(name: &str) -> Self {
        Self::new(
            ErrorCode::DuplicateVariable,
            format!("variable '{}' is already registered", name),
        )
        .with_context("variable", name)
    }

    pub fn unknown_variable(name: &str) -> Self {
        Self::new(
            ErrorCode::UnknownVariable,
            format!("variable '{}' is not registered", name),
        )
        .with_context("variable", name)
    }

    pub fn invalid_weight(weight: f64) -> Self {
        Self::new(
            ErrorCode::InvalidWeight,
            format!("consequent weight {} is outside [0, 1]", weight),
        )
    }

    /// A referenced input variable has no crisp value
    pub fn missing_input(name: &str) -> Self {
        Self::new(
            ErrorCode::MissingInput,
            format!("no crisp value supplied for input '{}'", name),
        )
        .with_context("variable", name)
    }

    /// A crisp value is NaN or infinite
    pub fn invalid_input(name: &str, value: f64) -> Self {
        Self::new(
            ErrorCode::InvalidInput,
            format!("input '{}' has non-finite value {}", name, value),
        )
        .with_context("variable", name)
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// Add context to the error
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::new);
        ctx.fields.insert(key.into(), value.into());
        self
    }

    /// Add source location
    pub fn at(mut self, location: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::new);
        ctx.location = Some(location.into());
        self
    }

    /// Add a hint for resolving the error
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Look up a context field
    pub fn context_field(&self, key: &str) -> Option<&str> {
        self.context
            .as_ref()
            .and_then(|ctx| ctx.fields.get(key))
            .map(String::as_str)
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":"INTERNAL_ERROR","message":"{}"}}"#, self.message)
        })
    }
}

impl fmt::Display for NetdiagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)?;

        if let Some(ref ctx) = self.context {
            if let Some(ref loc) = ctx.location {
                write!(f, " at {}", loc)?;
            }
        }

        if let Some(ref hint) = self.hint {
            write!(f, "\nHint: {}", hint)?;
        }

        Ok(())
    }
}

impl std::error::Error for NetdiagError {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<crate::config::ConfigError> for NetdiagError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        let code = match &err {
            ConfigError::Io(..) => ErrorCode::ConfigNotFound,
            ConfigError::Parse(..) => ErrorCode::InvalidConfigSyntax,
            ConfigError::InvalidValue { .. } => ErrorCode::InvalidConfigValue,
            ConfigError::Serialize(_) => ErrorCode::ConfigError,
        };
        NetdiagError::new(code, err.to_string())
    }
}

// ============================================================================
// Result type alias
// ============================================================================

/// A Result type using NetdiagError
pub type NetdiagResult<T> = Result<T, NetdiagError>;

// ============================================================================
// Macros for convenient error creation
// ============================================================================

/// Create a NetdiagError with context from the current location
#[macro_export]
macro_rules! netdiag_error {
    ($code:expr, $msg:expr) => {
        $crate::error::NetdiagError::new($code, $msg)
            .at(format!("{}:{}", file!(), line!()))
    };
    ($code:expr, $fmt:expr, $($arg:tt)*) => {
        $crate::error::NetdiagError::new($code, format!($fmt, $($arg)*))
            .at(format!("{}:{}", file!(), line!()))
    };
}

/// Bail out early with an error
#[macro_export]
macro_rules! netdiag_bail {
    ($code:expr, $msg:expr) => {
        return Err($crate::netdiag_error!($code, $msg))
    };
    ($code:expr, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::netdiag_error!($code, $fmt, $($arg)*))
    };
}

/// Ensure a condition holds, or return an error
#[macro_export]
macro_rules! netdiag_ensure {
    ($cond:expr, $code:expr, $msg:expr) => {
        if !$cond {
            $crate::netdiag_bail!($code, $msg);
        }
    };
    ($cond:expr, $code:expr, $fmt:expr, $($arg:tt)*) => {
        if !$cond {
            $crate::netdiag_bail!($code, $fmt, $($arg)*);
        }
    };
}

// ============================================================================
// Tests
// ============================================================================
