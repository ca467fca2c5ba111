//! Mamdani fuzzy inference
//!
//! This module provides the inference core:
//! - Membership functions (triangular, trapezoidal)
//! - Linguistic variables over discretized universes
//! - Rules with AND/OR antecedent trees and weighted consequents
//! - An immutable, shareable rule base
//! - Min-implication, max-aggregation and centroid defuzzification
//! - Primary/secondary diagnosis selection
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use netdiag::fuzzy::*;
//!
//! # fn main() -> netdiag::error::NetdiagResult<()> {
//! let level = |name: &str| -> netdiag::error::NetdiagResult<LinguisticVariable> {
//!     LinguisticVariable::new(name, Universe::new(0.0, 100.0, 1.0)?)
//!         .with_term("low", MembershipFunction::triangular(0.0, 0.0, 50.0)?)?
//!         .with_term("high", MembershipFunction::triangular(50.0, 100.0, 100.0)?)
//! };
//!
//! let mut builder = RuleBase::builder();
//! builder.input(level("load")?)?.output(level("risk")?)?;
//! builder.rule(Rule::new(Antecedent::is("load", "high"), Consequent::new("risk", "high")))?;
//!
//! let engine = InferenceEngine::new(Arc::new(builder.build()));
//! let outcome = engine.evaluate(&Inputs::new().with("load", 90.0))?;
//! let diagnosis = DiagnosisSelector::default().select(&outcome);
//! assert_eq!(diagnosis.primary().map(|f| f.output.as_str()), Some("risk"));
//! # Ok(())
//! # }
//! ```

mod membership;
mod variable;
mod rule;
mod rule_base;
mod engine;
mod diagnosis;

pub use membership::MembershipFunction;
pub use variable::{LinguisticVariable, Universe, MAX_UNIVERSE_POINTS};
pub use rule::{Antecedent, Consequent, Rule};
pub use rule_base::{RuleBase, RuleBaseBuilder};
pub use engine::{centroid, AggregatedSet, Aggregation, FiredRule, InferenceEngine, InferenceOutcome, Inputs, OutputScore};
pub use diagnosis::{
    Diagnosis, DiagnosisSelector, Finding, Severity, DEFAULT_HIGH_SEVERITY_THRESHOLD, DEFAULT_SECONDARY_THRESHOLD,
};
