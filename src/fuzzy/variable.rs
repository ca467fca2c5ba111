//! Linguistic variables and their universes of discourse

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{ErrorCode, NetdiagError, NetdiagResult};
use crate::netdiag_ensure;
use super::membership::MembershipFunction;

/// A discretized universe of discourse: `min, min + step, ..., max`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Universe {
    min: f64,
    max: f64,
    step: f64,
    #[serde(skip)]
    points: Vec<f64>,
}

/// Upper bound on the number of sample points in one universe
pub const MAX_UNIVERSE_POINTS: usize = 1_000_000;

/// Relative slack when counting intervals, so that float drift such as
/// (10.0 - 0.0) / 0.1 = 99.99999999999999 neither adds nor drops a point
const INTERVAL_DRIFT: f64 = 1e-9;

impl Universe {
    /// Sample `[min, max]` every `step`; the last point is always `max`,
    /// even when `step` does not divide the range.
    pub fn new(min: f64, max: f64, step: f64) -> NetdiagResult<Self> {
        let valid = min.is_finite() && max.is_finite() && step.is_finite() && min < max && step > 0.0;
        if !valid {
            return Err(NetdiagError::invalid_universe(min, max, step));
        }

        let span = (max - min) / step;
        netdiag_ensure!(
            span >= 1.0 - INTERVAL_DRIFT,
            ErrorCode::InvalidUniverse,
            "step {} is wider than the universe [{}, {}]",
            step,
            min,
            max
        );

        let intervals = (span * (1.0 - INTERVAL_DRIFT)).ceil().max(1.0);
        if intervals >= MAX_UNIVERSE_POINTS as f64 {
            return Err(NetdiagError::invalid_universe(min, max, step)
                .with_context("points", format!("{}", intervals + 1.0))
                .with_hint(format!("a universe holds at most {} sample points", MAX_UNIVERSE_POINTS)));
        }
        let intervals = intervals as usize;

        let mut points: Vec<f64> = (0..intervals).map(|i| (min + i as f64 * step).min(max)).collect();
        points.push(max);

        Ok(Self { min, max, step, points })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Sample points in ascending order
    pub fn points(&self) -> &[f64] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn contains(&self, x: f64) -> bool {
        x >= self.min && x <= self.max
    }

    /// Clamp a crisp value into `[min, max]`
    pub fn clamp(&self, x: f64) -> f64 {
        x.clamp(self.min, self.max)
    }
}

/// A linguistic variable with associated fuzzy terms
#[derive(Debug, Clone, Serialize)]
pub struct LinguisticVariable {
    name: String,
    universe: Universe,
    terms: IndexMap<String, MembershipFunction>,
}

impl LinguisticVariable {
    pub fn new(name: impl Into<String>, universe: Universe) -> Self {
        Self {
            name: name.into(),
            universe,
            terms: IndexMap::new(),
        }
    }

    /// Add a term; names must be unique per variable
    pub fn add_term(&mut self, name: impl Into<String>, membership: MembershipFunction) -> NetdiagResult<()> {
        let name = name.into();
        if self.terms.contains_key(&name) {
            return Err(NetdiagError::duplicate_term(&self.name, &name));
        }
        membership
            .validate()
            .map_err(|e| e.with_context("variable", self.name.as_str()).with_context("term", name.as_str()))?;
        self.terms.insert(name, membership);
        Ok(())
    }

    /// Builder form of [`add_term`](Self::add_term)
    pub fn with_term(mut self, name: impl Into<String>, membership: MembershipFunction) -> NetdiagResult<Self> {
        self.add_term(name, membership)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn term(&self, name: &str) -> Option<&MembershipFunction> {
        self.terms.get(name)
    }

    pub fn has_term(&self, name: &str) -> bool {
        self.terms.contains_key(name)
    }

    /// Term names in registration order
    pub fn term_names(&self) -> impl Iterator<Item = &str> {
        self.terms.keys().map(String::as_str)
    }

    /// Degree of membership of `x` in the named term
    pub fn membership(&self, term: &str, x: f64) -> NetdiagResult<f64> {
        self.terms
            .get(term)
            .map(|mf| mf.degree(x))
            .ok_or_else(|| NetdiagError::unknown_term(&self.name, term))
    }

    /// Fuzzify a crisp value - membership for all terms, in term order
    pub fn fuzzify(&self, x: f64) -> IndexMap<String, f64> {
        self.terms
            .iter()
            .map(|(name, mf)| (name.clone(), mf.degree(x)))
            .collect()
    }

    /// Get the term with highest membership for a value.
    ///
    /// Ties go to the first registered term; `None` when no term has
    /// positive membership.
    pub fn dominant_term(&self, x: f64) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for (name, mf) in &self.terms {
            let degree = mf.degree(x);
            if degree > best.map_or(0.0, |(_, d)| d) {
                best = Some((name.as_str(), degree));
            }
        }
        best
    }
}
