//! Rule base: the immutable knowledge shared by every diagnosis
//!
//! A [`RuleBase`] owns the input and output variables and the ordered rules
//! that reference them. It is assembled once with [`RuleBaseBuilder`], which
//! validates every reference at registration time, and is read-only
//! afterwards so it can be shared across threads behind an `Arc`.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{NetdiagError, NetdiagResult};
use super::rule::Rule;
use super::variable::LinguisticVariable;

/// Immutable collection of variables and rules
#[derive(Debug, Clone, Serialize)]
pub struct RuleBase {
    inputs: IndexMap<String, LinguisticVariable>,
    outputs: IndexMap<String, LinguisticVariable>,
    rules: Vec<Rule>,
    /// Inputs some antecedent reads, fixed at build time
    #[serde(skip)]
    required_inputs: Vec<String>,
}

impl RuleBase {
    pub fn builder() -> RuleBaseBuilder {
        RuleBaseBuilder::default()
    }

    /// Input variables in registration order
    pub fn inputs(&self) -> impl Iterator<Item = &LinguisticVariable> {
        self.inputs.values()
    }

    /// Output variables in registration order
    pub fn outputs(&self) -> impl Iterator<Item = &LinguisticVariable> {
        self.outputs.values()
    }

    pub fn input(&self, name: &str) -> Option<&LinguisticVariable> {
        self.inputs.get(name)
    }

    pub fn output(&self, name: &str) -> Option<&LinguisticVariable> {
        self.outputs.get(name)
    }

    /// Registration index of an output variable
    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs.get_index_of(name)
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Rules in registration order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Inputs referenced by at least one rule antecedent, in registration order
    pub fn required_inputs(&self) -> &[String] {
        &self.required_inputs
    }
}

/// Validating builder for [`RuleBase`]
#[derive(Debug, Default)]
pub struct RuleBaseBuilder {
    inputs: IndexMap<String, LinguisticVariable>,
    outputs: IndexMap<String, LinguisticVariable>,
    rules: Vec<Rule>,
}

impl RuleBaseBuilder {
    /// Register an input (antecedent) variable
    pub fn input(&mut self, variable: LinguisticVariable) -> NetdiagResult<&mut Self> {
        self.check_unique(variable.name())?;
        self.inputs.insert(variable.name().to_string(), variable);
        Ok(self)
    }

    /// Register an output (consequent) variable
    pub fn output(&mut self, variable: LinguisticVariable) -> NetdiagResult<&mut Self> {
        self.check_unique(variable.name())?;
        self.outputs.insert(variable.name().to_string(), variable);
        Ok(self)
    }

    /// Register a rule; every variable and term it names must already exist
    pub fn rule(&mut self, rule: Rule) -> NetdiagResult<&mut Self> {
        let index = self.rules.len();
        let annotate = |e: NetdiagError| e.with_context("rule", index.to_string());

        rule.antecedent.validate().map_err(annotate)?;
        for (variable, term) in rule.antecedent.leaves() {
            let var = self.inputs.get(variable).ok_or_else(|| {
                annotate(NetdiagError::unknown_variable(variable))
                    .with_hint("antecedents may only reference registered input variables")
            })?;
            if !var.has_term(term) {
                return Err(annotate(NetdiagError::unknown_term(variable, term)));
            }
        }

        for consequent in rule.consequents() {
            consequent.validate().map_err(annotate)?;
            let var = self.outputs.get(&consequent.variable).ok_or_else(|| {
                annotate(NetdiagError::unknown_variable(&consequent.variable))
                    .with_hint("consequents may only reference registered output variables")
            })?;
            if !var.has_term(&consequent.term) {
                return Err(annotate(NetdiagError::unknown_term(&consequent.variable, &consequent.term)));
            }
        }

        self.rules.push(rule);
        Ok(self)
    }

    /// Register several rules in order
    pub fn rules(&mut self, rules: impl IntoIterator<Item = Rule>) -> NetdiagResult<&mut Self> {
        for rule in rules {
            self.rule(rule)?;
        }
        Ok(self)
    }

    pub fn build(&mut self) -> RuleBase {
        let inputs = std::mem::take(&mut self.inputs);
        let rules = std::mem::take(&mut self.rules);

        let referenced: HashSet<&str> = rules
            .iter()
            .flat_map(|rule| rule.antecedent.leaves())
            .map(|(variable, _)| variable)
            .collect();
        let required_inputs = inputs
            .keys()
            .filter(|name| referenced.contains(name.as_str()))
            .cloned()
            .collect();

        RuleBase {
            inputs,
            outputs: std::mem::take(&mut self.outputs),
            rules,
            required_inputs,
        }
    }

    fn check_unique(&self, name: &str) -> NetdiagResult<()> {
        if self.inputs.contains_key(name) || self.outputs.contains_key(name) {
            Err(NetdiagError::duplicate_variable(name))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::fuzzy::{Antecedent, Consequent, MembershipFunction, Universe};

    fn level(name: &str) -> LinguisticVariable {
        LinguisticVariable::new(name, Universe::new(0.0, 10.0, 1.0).unwrap())
            .with_term("low", MembershipFunction::triangular(0.0, 0.0, 5.0).unwrap())
            .unwrap()
            .with_term("high", MembershipFunction::triangular(5.0, 10.0, 10.0).unwrap())
            .unwrap()
    }

    fn builder() -> RuleBaseBuilder {
        let mut b = RuleBase::builder();
        b.input(level("a")).unwrap().input(level("b")).unwrap().input(level("unused")).unwrap();
        b.output(level("out")).unwrap();
        b
    }

    #[test]
    fn test_build_and_required_inputs() {
        let mut b = builder();
        b.rule(Rule::new(
            Antecedent::is("b", "high").and(Antecedent::is("a", "low")),
            Consequent::new("out", "high"),
        ))
        .unwrap();
        let rb = b.build();

        assert_eq!(rb.rules().len(), 1);
        assert_eq!(rb.required_inputs(), vec!["a", "b"]);
        assert_eq!(rb.output_index("out"), Some(0));
        assert_eq!(rb.inputs().count(), 3);
    }

    #[test]
    fn test_required_inputs_fixed_at_build() {
        let mut b = builder();
        b.rules([
            Rule::new(Antecedent::is("b", "low"), Consequent::new("out", "low")),
            Rule::new(Antecedent::is("b", "high").or(Antecedent::is("a", "high")), Consequent::new("out", "high")),
        ])
        .unwrap();
        let rb = b.build();

        // registration order, no duplicates, unused inputs excluded
        assert_eq!(rb.required_inputs(), vec!["a", "b"]);
        assert!(std::ptr::eq(rb.required_inputs(), rb.required_inputs()));
        assert_eq!(rb.clone().required_inputs(), rb.required_inputs());

        let json = serde_json::to_value(&rb).unwrap();
        assert!(json.get("required_inputs").is_none());

        let empty = builder().build();
        assert!(empty.required_inputs().is_empty());
    }

    #[test]
    fn test_duplicate_variable_rejected() {
        let mut b = builder();
        let err = b.input(level("a")).unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateVariable);

        let err = b.output(level("b")).unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateVariable);
    }

    #[test]
    fn test_unknown_references_rejected() {
        let mut b = builder();

        let err = b
            .rule(Rule::new(Antecedent::is("zzz", "low"), Consequent::new("out", "high")))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownVariable);
        assert_eq!(err.context_field("rule"), Some("0"));

        let err = b
            .rule(Rule::new(Antecedent::is("a", "medium"), Consequent::new("out", "high")))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownTerm);

        // outputs cannot appear in antecedents, inputs cannot be consequents
        let err = b
            .rule(Rule::new(Antecedent::is("out", "low"), Consequent::new("out", "high")))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownVariable);
        let err = b
            .rule(Rule::new(Antecedent::is("a", "low"), Consequent::new("b", "high")))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownVariable);

        let err = b
            .rule(Rule::new(Antecedent::is("a", "low"), Consequent::new("out", "extreme")))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownTerm);

        assert!(b.build().rules().is_empty());
    }

    #[test]
    fn test_invalid_weight_rejected_at_registration() {
        let mut b = builder();
        let mut consequent = Consequent::new("out", "high");
        consequent.weight = 2.0;
        let err = b.rule(Rule::new(Antecedent::is("a", "low"), consequent)).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidWeight);
    }

    #[test]
    fn test_duplicate_rules_allowed() {
        let mut b = builder();
        let rule = Rule::new(Antecedent::is("a", "low"), Consequent::new("out", "low"));
        b.rules([rule.clone(), rule]).unwrap();
        assert_eq!(b.build().rules().len(), 2);
    }
}
