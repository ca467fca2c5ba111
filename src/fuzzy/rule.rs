//! Fuzzy rules: antecedent expression trees and weighted consequents
//!
//! Antecedents are built with a small typed builder instead of operator
//! overloading:
//!
//! ```rust
//! use netdiag::fuzzy::{Antecedent, Consequent, Rule};
//!
//! let rule = Rule::new(
//!     Antecedent::is("perdida_paquetes", "alta").and(Antecedent::is("velocidad_carga", "baja")),
//!     Consequent::new("problema_isp", "alto"),
//! );
//! assert_eq!(
//!     rule.to_string(),
//!     "IF perdida_paquetes[alta] AND velocidad_carga[baja] THEN problema_isp[alto]"
//! );
//! ```
//!
//! AND is the Zadeh minimum, OR the maximum.

use std::fmt;

use serde::Serialize;

use crate::error::{ErrorCode, NetdiagError, NetdiagResult};
use crate::netdiag_ensure;

/// Antecedent expression tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Antecedent {
    /// `variable IS term`
    Term { variable: String, term: String },
    /// Fuzzy conjunction (minimum) of the operands
    And(Vec<Antecedent>),
    /// Fuzzy disjunction (maximum) of the operands
    Or(Vec<Antecedent>),
}

impl Antecedent {
    /// Leaf node: `variable IS term`
    pub fn is(variable: impl Into<String>, term: impl Into<String>) -> Self {
        Antecedent::Term {
            variable: variable.into(),
            term: term.into(),
        }
    }

    /// Conjunction of all operands
    pub fn all(operands: impl IntoIterator<Item = Antecedent>) -> Self {
        Antecedent::And(operands.into_iter().collect())
    }

    /// Disjunction of all operands
    pub fn any(operands: impl IntoIterator<Item = Antecedent>) -> Self {
        Antecedent::Or(operands.into_iter().collect())
    }

    /// `self AND other`, flattening nested conjunctions
    pub fn and(self, other: Antecedent) -> Self {
        match self {
            Antecedent::And(mut operands) => {
                operands.push(other);
                Antecedent::And(operands)
            }
            leaf => Antecedent::And(vec![leaf, other]),
        }
    }

    /// `self OR other`, flattening nested disjunctions
    pub fn or(self, other: Antecedent) -> Self {
        match self {
            Antecedent::Or(mut operands) => {
                operands.push(other);
                Antecedent::Or(operands)
            }
            leaf => Antecedent::Or(vec![leaf, other]),
        }
    }

    /// Firing strength given a membership lookup for leaves.
    ///
    /// The lookup receives `(variable, term)` and returns the degree of the
    /// current crisp input in that term.
    pub fn firing_strength<F>(&self, membership: &F) -> NetdiagResult<f64>
    where
        F: Fn(&str, &str) -> NetdiagResult<f64>,
    {
        match self {
            Antecedent::Term { variable, term } => membership(variable.as_str(), term.as_str()),
            Antecedent::And(operands) => {
                let mut strength = 1.0_f64;
                for operand in operands {
                    strength = strength.min(operand.firing_strength(membership)?);
                }
                Ok(strength)
            }
            Antecedent::Or(operands) => {
                let mut strength = 0.0_f64;
                for operand in operands {
                    strength = strength.max(operand.firing_strength(membership)?);
                }
                Ok(strength)
            }
        }
    }

    /// All `(variable, term)` leaves, left to right
    pub fn leaves(&self) -> Vec<(&str, &str)> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<(&'a str, &'a str)>) {
        match self {
            Antecedent::Term { variable, term } => out.push((variable.as_str(), term.as_str())),
            Antecedent::And(operands) | Antecedent::Or(operands) => {
                for operand in operands {
                    operand.collect_leaves(out);
                }
            }
        }
    }

    /// Reject AND/OR nodes without operands anywhere in the tree
    pub fn validate(&self) -> NetdiagResult<()> {
        match self {
            Antecedent::Term { .. } => Ok(()),
            Antecedent::And(operands) | Antecedent::Or(operands) => {
                netdiag_ensure!(
                    !operands.is_empty(),
                    ErrorCode::EmptyExpression,
                    "AND/OR node in antecedent has no operands"
                );
                operands.iter().try_for_each(Antecedent::validate)
            }
        }
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>, nested: bool) -> fmt::Result {
        let (operands, op) = match self {
            Antecedent::Term { variable, term } => return write!(f, "{}[{}]", variable, term),
            Antecedent::And(operands) => (operands, " AND "),
            Antecedent::Or(operands) => (operands, " OR "),
        };
        if nested {
            write!(f, "(")?;
        }
        for (i, operand) in operands.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", op)?;
            }
            operand.fmt_nested(f, true)?;
        }
        if nested {
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl fmt::Display for Antecedent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_nested(f, false)
    }
}

/// A rule consequent: `variable IS term`, scaled by a weight in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Consequent {
    pub variable: String,
    pub term: String,
    pub weight: f64,
}

impl Consequent {
    pub fn new(variable: impl Into<String>, term: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            term: term.into(),
            weight: 1.0,
        }
    }

    pub fn weighted(variable: impl Into<String>, term: impl Into<String>, weight: f64) -> NetdiagResult<Self> {
        let consequent = Self {
            weight,
            ..Self::new(variable, term)
        };
        consequent.validate()?;
        Ok(consequent)
    }

    pub fn validate(&self) -> NetdiagResult<()> {
        if (0.0..=1.0).contains(&self.weight) {
            Ok(())
        } else {
            Err(NetdiagError::invalid_weight(self.weight)
                .with_context("variable", self.variable.as_str())
                .with_context("term", self.term.as_str()))
        }
    }
}

impl fmt::Display for Consequent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.variable, self.term)?;
        if self.weight != 1.0 {
            write!(f, " WITH {}", self.weight)?;
        }
        Ok(())
    }
}

/// A fuzzy rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    /// Rule name/label
    pub name: Option<String>,
    pub antecedent: Antecedent,
    /// Never empty
    consequents: Vec<Consequent>,
}

impl Rule {
    pub fn new(antecedent: Antecedent, consequent: Consequent) -> Self {
        Self {
            name: None,
            antecedent,
            consequents: vec![consequent],
        }
    }

    /// Add a further consequent driven by the same antecedent
    pub fn also(mut self, consequent: Consequent) -> Self {
        self.consequents.push(consequent);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn consequents(&self) -> &[Consequent] {
        &self.consequents
    }

    /// The name if set, otherwise the rendered rule
    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.to_string())
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IF {} THEN ", self.antecedent)?;
        for (i, consequent) in self.consequents.iter().enumerate() {
            if i > 0 {
                write!(f, " AND ")?;
            }
            write!(f, "{}", consequent)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(degrees: &[(&str, &str, f64)]) -> impl Fn(&str, &str) -> NetdiagResult<f64> {
        let table: HashMap<(String, String), f64> = degrees
            .iter()
            .map(|(v, t, d)| ((v.to_string(), t.to_string()), *d))
            .collect();
        move |v: &str, t: &str| {
            table
                .get(&(v.to_string(), t.to_string()))
                .copied()
                .ok_or_else(|| NetdiagError::unknown_term(v, t))
        }
    }

    #[test]
    fn test_single_clause_strength() {
        let f = lookup(&[("a", "x", 0.42)]);
        assert_eq!(Antecedent::is("a", "x").firing_strength(&f).unwrap(), 0.42);
    }

    #[test]
    fn test_and_is_exact_min() {
        let f = lookup(&[("a", "x", 0.7), ("b", "y", 0.3), ("c", "z", 0.9)]);
        let two = Antecedent::is("a", "x").and(Antecedent::is("b", "y"));
        assert_eq!(two.firing_strength(&f).unwrap(), 0.3);

        let three = two.and(Antecedent::is("c", "z"));
        assert!(matches!(&three, Antecedent::And(ops) if ops.len() == 3));
        assert_eq!(three.firing_strength(&f).unwrap(), 0.3);
    }

    #[test]
    fn test_or_is_exact_max() {
        let f = lookup(&[("a", "x", 0.7), ("b", "y", 0.3)]);
        let either = Antecedent::is("a", "x").or(Antecedent::is("b", "y"));
        assert_eq!(either.firing_strength(&f).unwrap(), 0.7);
    }

    #[test]
    fn test_mixed_tree() {
        let f = lookup(&[("a", "x", 0.7), ("b", "y", 0.3), ("c", "z", 0.5)]);
        // a AND (b OR c) = min(0.7, max(0.3, 0.5))
        let tree = Antecedent::is("a", "x").and(Antecedent::is("b", "y").or(Antecedent::is("c", "z")));
        assert_eq!(tree.firing_strength(&f).unwrap(), 0.5);
        assert_eq!(tree.to_string(), "a[x] AND (b[y] OR c[z])");
    }

    #[test]
    fn test_lookup_errors_propagate() {
        let f = lookup(&[("a", "x", 0.7)]);
        let tree = Antecedent::all([Antecedent::is("a", "x"), Antecedent::is("a", "missing")]);
        let err = tree.firing_strength(&f).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownTerm);
    }

    #[test]
    fn test_leaves_in_order() {
        let tree = Antecedent::any([
            Antecedent::is("a", "x"),
            Antecedent::all([Antecedent::is("b", "y"), Antecedent::is("c", "z")]),
        ]);
        assert_eq!(tree.leaves(), vec![("a", "x"), ("b", "y"), ("c", "z")]);
    }

    #[test]
    fn test_empty_expression_rejected() {
        let err = Antecedent::is("a", "x").and(Antecedent::all([])).validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::EmptyExpression);
    }

    #[test]
    fn test_weight_bounds() {
        assert!(Consequent::weighted("out", "high", 0.5).is_ok());
        let err = Consequent::weighted("out", "high", 1.5).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidWeight);
        assert!(Consequent::weighted("out", "high", f64::NAN).is_err());
    }

    #[test]
    fn test_rule_display_and_label() {
        let rule = Rule::new(Antecedent::is("senal_wifi", "debil"), Consequent::new("problema_wifi", "alto"))
            .also(Consequent::weighted("problema_isp", "bajo", 0.5).unwrap());
        assert_eq!(
            rule.label(),
            "IF senal_wifi[debil] THEN problema_wifi[alto] AND problema_isp[bajo] WITH 0.5"
        );
        assert_eq!(rule.consequents().len(), 2);

        let named = rule.with_name("weak wifi");
        assert_eq!(named.label(), "weak wifi");
    }
}
