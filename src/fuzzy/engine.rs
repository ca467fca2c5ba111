//! Mamdani inference: fuzzification, rule firing, max aggregation and
//! centroid defuzzification
//!
//! ```text
//! crisp inputs ─► fuzzify ─► firing strengths ─► clip consequents ─► max-aggregate ─► centroid
//! ```
//!
//! The engine holds only an `Arc<RuleBase>` and a couple of flags, so one
//! engine can serve any number of concurrent calls. Every call owns its
//! [`Inputs`] and its aggregation buffers.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{ErrorCode, NetdiagError, NetdiagResult};
use crate::netdiag_error;
use super::rule_base::RuleBase;
use super::variable::Universe;

/// Crisp input values for one diagnosis
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inputs(HashMap<String, f64>);

impl Inputs {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn set(&mut self, variable: impl Into<String>, value: f64) {
        self.0.insert(variable.into(), value);
    }

    /// Builder form of [`set`](Self::set)
    pub fn with(mut self, variable: impl Into<String>, value: f64) -> Self {
        self.set(variable, value);
        self
    }

    pub fn get(&self, variable: &str) -> Option<f64> {
        self.0.get(variable).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Inputs {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Crisp result for one output variable
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputScore {
    /// Centroid of the aggregated set
    Score(f64),
    /// No rule produced evidence for this output
    Undetermined,
}

impl OutputScore {
    pub fn value(&self) -> Option<f64> {
        match self {
            OutputScore::Score(v) => Some(*v),
            OutputScore::Undetermined => None,
        }
    }

    pub fn is_undetermined(&self) -> bool {
        matches!(self, OutputScore::Undetermined)
    }
}

/// A rule with positive firing strength
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiredRule {
    /// Registration index in the rule base
    pub index: usize,
    pub label: String,
    pub strength: f64,
}

/// Aggregated fuzzy set of one output over its discretized universe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedSet {
    pub points: Vec<f64>,
    pub membership: Vec<f64>,
}

impl AggregatedSet {
    fn empty(universe: &Universe) -> Self {
        Self {
            points: universe.points().to_vec(),
            membership: vec![0.0; universe.len()],
        }
    }

    /// Max-accumulate `min(level, term(x))` over every sample point
    fn accumulate(&mut self, level: f64, term: impl Fn(f64) -> f64) {
        for (x, mu) in self.points.iter().zip(self.membership.iter_mut()) {
            let implied = level.min(term(*x));
            if implied > *mu {
                *mu = implied;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.membership.iter().all(|mu| *mu <= 0.0)
    }

    /// Centroid of the set, or `None` when the set is identically zero
    pub fn centroid(&self) -> Option<f64> {
        centroid(&self.points, &self.membership)
    }
}

/// Centroid `Σ x·μ(x) / Σ μ(x)`; `None` when `Σ μ(x)` is zero
pub fn centroid(points: &[f64], membership: &[f64]) -> Option<f64> {
    let (numerator, denominator) = points
        .iter()
        .zip(membership)
        .fold((0.0, 0.0), |(num, den), (x, mu)| (num + x * mu, den + mu));

    if denominator > 0.0 {
        Some(numerator / denominator)
    } else {
        None
    }
}

/// Per-call working state after rule firing and aggregation
#[derive(Debug, Clone, Serialize)]
pub struct Aggregation {
    /// Aggregated set per output, in output registration order
    pub sets: IndexMap<String, AggregatedSet>,
    /// Rules with positive strength, in registration order
    pub fired: Vec<FiredRule>,
}

impl Aggregation {
    /// Defuzzify every output by centroid
    pub fn defuzzify(self) -> InferenceOutcome {
        let scores = self
            .sets
            .iter()
            .map(|(name, set)| {
                let score = match set.centroid() {
                    Some(value) => OutputScore::Score(value),
                    None => OutputScore::Undetermined,
                };
                debug!(output = %name, ?score, "defuzzified");
                (name.clone(), score)
            })
            .collect();

        InferenceOutcome {
            scores,
            fired: self.fired,
        }
    }
}

/// Result of one inference call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceOutcome {
    /// Score per output, in output registration order
    pub scores: IndexMap<String, OutputScore>,
    /// Rules with positive strength, in registration order
    pub fired: Vec<FiredRule>,
}

impl InferenceOutcome {
    pub fn score(&self, output: &str) -> Option<OutputScore> {
        self.scores.get(output).copied()
    }

    /// True when no output received any evidence
    pub fn all_undetermined(&self) -> bool {
        self.scores.values().all(OutputScore::is_undetermined)
    }
}

/// Mamdani inference engine over a shared rule base
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    rule_base: Arc<RuleBase>,
    clip_inputs: bool,
}

impl InferenceEngine {
    pub fn new(rule_base: Arc<RuleBase>) -> Self {
        Self {
            rule_base,
            clip_inputs: true,
        }
    }

    /// Clamp out-of-universe inputs to the universe bounds (default on).
    ///
    /// When off, out-of-range values are evaluated as given, so they usually
    /// fall outside every term's support.
    pub fn with_clip_inputs(mut self, clip: bool) -> Self {
        self.clip_inputs = clip;
        self
    }

    pub fn rule_base(&self) -> &RuleBase {
        &self.rule_base
    }

    /// Fuzzify, fire and aggregate, keeping the aggregated sets
    pub fn aggregate(&self, inputs: &Inputs) -> NetdiagResult<Aggregation> {
        let crisp = self.resolve_inputs(inputs)?;
        let rb = &*self.rule_base;

        let mut sets: IndexMap<String, AggregatedSet> = rb
            .outputs()
            .map(|var| (var.name().to_string(), AggregatedSet::empty(var.universe())))
            .collect();
        let mut fired = Vec::new();

        let membership = |variable: &str, term: &str| -> NetdiagResult<f64> {
            let var = rb
                .input(variable)
                .ok_or_else(|| NetdiagError::unknown_variable(variable))?;
            let x = crisp
                .get(variable)
                .copied()
                .ok_or_else(|| NetdiagError::missing_input(variable))?;
            let degree = var.membership(term, x)?;
            trace!(variable, term, x, degree, "fuzzified");
            Ok(degree)
        };

        for (index, rule) in rb.rules().iter().enumerate() {
            let strength = rule.antecedent.firing_strength(&membership)?;
            if strength <= 0.0 {
                continue;
            }

            let label = rule.label();
            debug!(rule = index, strength, label = %label, "rule fired");
            fired.push(FiredRule { index, label, strength });

            for consequent in rule.consequents() {
                let level = strength * consequent.weight;
                if level <= 0.0 {
                    continue;
                }
                let term = rb
                    .output(&consequent.variable)
                    .and_then(|var| var.term(&consequent.term))
                    .ok_or_else(|| NetdiagError::unknown_term(&consequent.variable, &consequent.term))?;
                let set = sets.get_mut(&consequent.variable).ok_or_else(|| {
                    netdiag_error!(ErrorCode::InternalError, "no aggregation buffer for '{}'", consequent.variable)
                })?;
                set.accumulate(level, |x| term.degree(x));
            }
        }

        Ok(Aggregation { sets, fired })
    }

    /// Full inference: aggregate, then defuzzify every output
    pub fn evaluate(&self, inputs: &Inputs) -> NetdiagResult<InferenceOutcome> {
        Ok(self.aggregate(inputs)?.defuzzify())
    }

    /// Evaluate independent input sets on scoped worker threads.
    ///
    /// Results are returned in input order, one per input set; each call
    /// fails or succeeds on its own.
    pub fn evaluate_batch(&self, batch: &[Inputs]) -> Vec<NetdiagResult<InferenceOutcome>> {
        let workers = thread::available_parallelism().map_or(1, |n| n.get()).min(batch.len().max(1));
        let chunk_size = batch.len().div_ceil(workers).max(1);

        thread::scope(|scope| {
            let handles: Vec<_> = batch
                .chunks(chunk_size)
                .map(|chunk| {
                    let handle =
                        scope.spawn(move || chunk.iter().map(|inputs| self.evaluate(inputs)).collect::<Vec<_>>());
                    (chunk.len(), handle)
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|(len, handle)| chunk_results(handle.join(), len))
                .collect()
        })
    }

    /// Check completeness, then finiteness and clamping in input
    /// registration order, then reject unknown names
    fn resolve_inputs(&self, inputs: &Inputs) -> NetdiagResult<HashMap<String, f64>> {
        let rb = &*self.rule_base;

        let missing: Vec<&str> = rb
            .required_inputs()
            .iter()
            .map(String::as_str)
            .filter(|name| inputs.get(name).is_none())
            .collect();
        if let Some(first) = missing.first() {
            return Err(NetdiagError::missing_input(first)
                .with_context("missing", missing.join(","))
                .with_hint("supply a crisp value for every input referenced by a rule"));
        }

        let mut crisp = HashMap::with_capacity(inputs.len());
        for var in rb.inputs() {
            let name = var.name();
            let Some(value) = inputs.get(name) else {
                continue;
            };
            if !value.is_finite() {
                return Err(NetdiagError::invalid_input(name, value));
            }

            let universe = var.universe();
            let value = if self.clip_inputs && !universe.contains(value) {
                let clamped = universe.clamp(value);
                debug!(variable = %name, value, clamped, "input outside universe, clamped");
                clamped
            } else {
                value
            };
            crisp.insert(name.to_string(), value);
        }

        if crisp.len() < inputs.len() {
            let mut unknown: Vec<&str> = inputs
                .0
                .keys()
                .map(String::as_str)
                .filter(|name| !crisp.contains_key(*name))
                .collect();
            unknown.sort_unstable();
            if let Some(first) = unknown.first() {
                return Err(NetdiagError::unknown_variable(first)
                    .with_context("unknown", unknown.join(","))
                    .with_hint("not a declared input variable"));
            }
        }

        Ok(crisp)
    }
}

/// Results of one batch chunk; a panicked worker fails every input it held
fn chunk_results(
    joined: thread::Result<Vec<NetdiagResult<InferenceOutcome>>>,
    len: usize,
) -> Vec<NetdiagResult<InferenceOutcome>> {
    joined.unwrap_or_else(|_| {
        (0..len)
            .map(|_| Err(NetdiagError::internal("inference worker panicked")))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuzzy::{Antecedent, Consequent, LinguisticVariable, MembershipFunction, Rule};

    fn level(name: &str, step: f64) -> LinguisticVariable {
        LinguisticVariable::new(name, Universe::new(0.0, 100.0, step).unwrap())
            .with_term("low", MembershipFunction::triangular(0.0, 0.0, 50.0).unwrap())
            .unwrap()
            .with_term("mid", MembershipFunction::triangular(0.0, 50.0, 100.0).unwrap())
            .unwrap()
            .with_term("high", MembershipFunction::triangular(50.0, 100.0, 100.0).unwrap())
            .unwrap()
    }

    fn engine_with(rules: Vec<Rule>, step: f64) -> InferenceEngine {
        let mut b = RuleBase::builder();
        b.input(level("a", 1.0)).unwrap().input(level("b", 1.0)).unwrap();
        b.output(level("out", step)).unwrap().output(level("other", step)).unwrap();
        b.rules(rules).unwrap();
        InferenceEngine::new(Arc::new(b.build()))
    }

    #[test]
    fn test_aggregate_is_pointwise_max_of_clipped_sets() {
        let engine = engine_with(
            vec![
                Rule::new(Antecedent::is("a", "high"), Consequent::new("out", "high")),
                Rule::new(Antecedent::is("b", "high"), Consequent::new("out", "mid")),
            ],
            1.0,
        );
        // a = 80 -> high 0.6 ; b = 70 -> high 0.4
        let agg = engine.aggregate(&Inputs::new().with("a", 80.0).with("b", 70.0)).unwrap();
        let set = &agg.sets["out"];

        let high = MembershipFunction::Triangular(50.0, 100.0, 100.0);
        let mid = MembershipFunction::Triangular(0.0, 50.0, 100.0);
        for (x, mu) in set.points.iter().zip(&set.membership) {
            let expected = (0.6_f64).min(high.degree(*x)).max((0.4_f64).min(mid.degree(*x)));
            assert!((mu - expected).abs() < 1e-9, "x = {}: {} != {}", x, mu, expected);
        }

        assert_eq!(agg.fired.len(), 2);
        assert!(agg.sets["other"].is_empty());
    }

    #[test]
    fn test_weight_scales_clip_level() {
        let engine = engine_with(
            vec![Rule::new(Antecedent::is("a", "high"), Consequent::weighted("out", "mid", 0.5).unwrap())],
            1.0,
        );
        let agg = engine.aggregate(&Inputs::new().with("a", 100.0).with("b", 0.0)).unwrap();
        let peak = agg.sets["out"].membership.iter().cloned().fold(0.0, f64::max);
        assert!((peak - 0.5).abs() < 1e-12);
        // reported strength is the antecedent strength, before weighting
        assert_eq!(agg.fired[0].strength, 1.0);
    }

    #[test]
    fn test_zero_strength_is_undetermined() {
        let engine = engine_with(
            vec![
                Rule::new(Antecedent::is("a", "high"), Consequent::new("out", "high")),
                Rule::new(Antecedent::is("b", "low"), Consequent::new("other", "low")),
            ],
            1.0,
        );
        let outcome = engine.evaluate(&Inputs::new().with("a", 10.0).with("b", 0.0)).unwrap();

        assert_eq!(outcome.score("out"), Some(OutputScore::Undetermined));
        assert!(outcome.score("other").unwrap().value().is_some());
        assert_eq!(outcome.fired.len(), 1);
        assert_eq!(outcome.fired[0].index, 1);
    }

    #[test]
    fn test_zero_weight_contributes_nothing() {
        let engine = engine_with(
            vec![Rule::new(Antecedent::is("a", "high"), Consequent::weighted("out", "high", 0.0).unwrap())],
            1.0,
        );
        let outcome = engine.evaluate(&Inputs::new().with("a", 100.0).with("b", 0.0)).unwrap();
        assert_eq!(outcome.fired.len(), 1);
        assert!(outcome.all_undetermined());
    }

    #[test]
    fn test_full_strength_centroid() {
        let engine = engine_with(
            vec![Rule::new(Antecedent::is("a", "high"), Consequent::new("out", "high"))],
            1.0,
        );
        let outcome = engine.evaluate(&Inputs::new().with("a", 100.0).with("b", 0.0)).unwrap();
        // Σ (50+k)k / Σ k for k = 0..=50
        let expected = (50.0 * 1275.0 + 42925.0) / 1275.0;
        assert!((outcome.score("out").unwrap().value().unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_centroid_stable_under_refinement() {
        let rules = || {
            vec![
                Rule::new(Antecedent::is("a", "high"), Consequent::new("out", "high")),
                Rule::new(Antecedent::is("b", "mid"), Consequent::new("out", "low")),
            ]
        };
        let inputs = Inputs::new().with("a", 80.0).with("b", 40.0);

        let coarse = engine_with(rules(), 1.0).evaluate(&inputs).unwrap();
        let fine = engine_with(rules(), 0.1).evaluate(&inputs).unwrap();
        let c = coarse.score("out").unwrap().value().unwrap();
        let f = fine.score("out").unwrap().value().unwrap();
        assert!((c - f).abs() < 0.5, "coarse {} vs fine {}", c, f);
    }

    #[test]
    fn test_missing_input_reported() {
        let engine = engine_with(
            vec![Rule::new(Antecedent::is("a", "high").and(Antecedent::is("b", "low")), Consequent::new("out", "high"))],
            1.0,
        );
        let err = engine.evaluate(&Inputs::new().with("a", 10.0)).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingInput);
        assert_eq!(err.context_field("missing"), Some("b"));

        let err = engine.evaluate(&Inputs::new()).unwrap_err();
        assert_eq!(err.context_field("missing"), Some("a,b"));
    }

    #[test]
    fn test_invalid_and_unknown_inputs() {
        let engine = engine_with(vec![Rule::new(Antecedent::is("a", "high"), Consequent::new("out", "high"))], 1.0);

        let err = engine.evaluate(&Inputs::new().with("a", f64::NAN)).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);

        let err = engine.evaluate(&Inputs::new().with("a", 1.0).with("c", 1.0)).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownVariable);
    }

    #[test]
    fn test_input_errors_are_deterministic() {
        let engine = engine_with(vec![Rule::new(Antecedent::is("a", "high"), Consequent::new("out", "high"))], 1.0);

        // declared inputs are checked in registration order
        for _ in 0..16 {
            let inputs = Inputs::new().with("zz", 1.0).with("b", f64::INFINITY).with("a", f64::NAN);
            let err = engine.evaluate(&inputs).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidInput);
            assert_eq!(err.context_field("variable"), Some("a"));
        }

        // unknown names come after, smallest name first
        for _ in 0..16 {
            let inputs = Inputs::new().with("a", 1.0).with("zz", 1.0).with("aa", 1.0).with("mm", 1.0);
            let err = engine.evaluate(&inputs).unwrap_err();
            assert_eq!(err.code, ErrorCode::UnknownVariable);
            assert_eq!(err.context_field("variable"), Some("aa"));
            assert_eq!(err.context_field("unknown"), Some("aa,mm,zz"));
        }
    }

    #[test]
    fn test_input_clipping() {
        let rules = vec![Rule::new(Antecedent::is("a", "high"), Consequent::new("out", "high"))];
        let inputs = Inputs::new().with("a", 140.0);

        let clipped = engine_with(rules.clone(), 1.0).evaluate(&inputs).unwrap();
        assert_eq!(clipped.fired[0].strength, 1.0);

        let raw = engine_with(rules, 1.0).with_clip_inputs(false).evaluate(&inputs).unwrap();
        assert!(raw.fired.is_empty());
        assert!(raw.all_undetermined());
    }

    #[test]
    fn test_centroid_helper() {
        assert_eq!(centroid(&[0.0, 1.0, 2.0], &[0.0, 0.0, 0.0]), None);
        assert_eq!(centroid(&[0.0, 1.0, 2.0], &[1.0, 1.0, 1.0]), Some(1.0));
        assert_eq!(centroid(&[], &[]), None);
    }

    #[test]
    fn test_batch_preserves_order() {
        let engine = engine_with(vec![Rule::new(Antecedent::is("a", "high"), Consequent::new("out", "high"))], 1.0);
        let batch: Vec<Inputs> = vec![
            Inputs::new().with("a", 100.0),
            Inputs::new(),
            Inputs::new().with("a", 0.0),
        ];
        let results = engine.evaluate_batch(&batch);

        assert_eq!(results.len(), 3);
        assert!(results[0].as_ref().unwrap().score("out").unwrap().value().is_some());
        assert_eq!(results[1].as_ref().unwrap_err().code, ErrorCode::MissingInput);
        assert!(results[2].as_ref().unwrap().all_undetermined());
        assert!(engine.evaluate_batch(&[]).is_empty());
    }

    #[test]
    fn test_panicked_chunk_fails_each_input() {
        let panic: Box<dyn std::any::Any + Send> = Box::new("worker died");
        let results = chunk_results(Err(panic), 3);
        assert_eq!(results.len(), 3);
        for result in &results {
            assert_eq!(result.as_ref().unwrap_err().code, ErrorCode::InternalError);
        }

        let joined: thread::Result<Vec<NetdiagResult<InferenceOutcome>>> = Ok(vec![]);
        assert!(chunk_results(joined, 0).is_empty());
    }

    #[test]
    fn test_batch_result_per_input() {
        let engine = engine_with(vec![Rule::new(Antecedent::is("a", "high"), Consequent::new("out", "high"))], 1.0);
        let batch: Vec<Inputs> = (0..37).map(|i| Inputs::new().with("a", i as f64 * 3.0)).collect();
        let results = engine.evaluate_batch(&batch);

        assert_eq!(results.len(), batch.len());
        for (inputs, result) in batch.iter().zip(&results) {
            assert_eq!(result.as_ref().unwrap(), &engine.evaluate(inputs).unwrap());
        }
    }
}
