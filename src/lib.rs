//! netdiag - fuzzy network fault diagnosis
//!
//! A Mamdani fuzzy inference engine and the network knowledge base built on
//! top of it.
//!
//! # Architecture
//!
//! - [`fuzzy`] - membership functions, linguistic variables, rules, the
//!   immutable [`RuleBase`], the [`InferenceEngine`] and the
//!   [`DiagnosisSelector`]
//! - [`network`] - the five-symptom, five-fault network rule base, typed
//!   [`NetworkReadings`] and the [`NetworkDiagnostics`] facade
//! - [`config`] - TOML and environment configuration of engine tunables
//! - [`error`] - structured errors with numeric codes
//!
//! # Features
//!
//! - Triangular and trapezoidal membership functions
//! - AND (min) / OR (max) antecedent trees, weighted consequents
//! - Max aggregation and centroid defuzzification over discretized universes
//! - Explicit `Undetermined` scores when no rule fires
//! - Primary and secondary findings with deterministic tie-breaking
//! - Lock-free concurrent evaluation over a shared rule base
//!
//! # Example
//!
//! ```rust
//! use netdiag::{NetworkDiagnostics, NetworkReadings};
//!
//! # fn main() -> netdiag::NetdiagResult<()> {
//! let diagnostics = NetworkDiagnostics::new()?;
//! let report = diagnostics.diagnose(&NetworkReadings::new(5.0, 3.0, 7.0, 75.0, 150.0))?;
//!
//! let primary = report.diagnosis.primary().expect("some rule fired");
//! assert_eq!(primary.output, "problema_dns");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod fuzzy;
pub mod network;

// Re-export error types
pub use error::{ErrorCode, ErrorContext, NetdiagError, NetdiagResult};

// Re-export the inference core
pub use fuzzy::{
    Antecedent, Consequent, Diagnosis, DiagnosisSelector, Finding, InferenceEngine, InferenceOutcome, Inputs,
    LinguisticVariable, MembershipFunction, OutputScore, Rule, RuleBase, RuleBaseBuilder, Severity, Universe,
};

// Re-export configuration
pub use config::{ConfigError, LogLevel, NetdiagConfig, ReportFormat};

// Re-export the network knowledge base
pub use network::{NetworkDiagnostics, NetworkReadings, NetworkReport, Scenario, SCENARIOS};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
