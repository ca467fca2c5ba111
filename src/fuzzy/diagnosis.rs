//! Primary/secondary diagnosis selection over defuzzified scores

use serde::Serialize;

use super::engine::InferenceOutcome;

/// Default score above which a non-primary output is reported as secondary
pub const DEFAULT_SECONDARY_THRESHOLD: f64 = 50.0;
/// Default score above which a finding is considered high severity
pub const DEFAULT_HIGH_SEVERITY_THRESHOLD: f64 = 70.0;

/// Coarse severity band of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Moderate,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Moderate => "moderate",
            Severity::High => "high",
        }
    }
}

/// One output variable singled out by the selector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub output: String,
    pub score: f64,
    pub severity: Severity,
}

/// Outcome of diagnosis selection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Diagnosis {
    Found {
        primary: Finding,
        /// Other outputs above the secondary threshold, in registration order
        secondary: Vec<Finding>,
    },
    /// Every output was undetermined
    NoDiagnosis,
}

impl Diagnosis {
    pub fn primary(&self) -> Option<&Finding> {
        match self {
            Diagnosis::Found { primary, .. } => Some(primary),
            Diagnosis::NoDiagnosis => None,
        }
    }

    pub fn secondary(&self) -> &[Finding] {
        match self {
            Diagnosis::Found { secondary, .. } => secondary,
            Diagnosis::NoDiagnosis => &[],
        }
    }
}

/// Picks the maximum defined score as the primary diagnosis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiagnosisSelector {
    secondary_threshold: f64,
    high_severity_threshold: f64,
}

impl Default for DiagnosisSelector {
    fn default() -> Self {
        Self {
            secondary_threshold: DEFAULT_SECONDARY_THRESHOLD,
            high_severity_threshold: DEFAULT_HIGH_SEVERITY_THRESHOLD,
        }
    }
}

impl DiagnosisSelector {
    pub fn new(secondary_threshold: f64, high_severity_threshold: f64) -> Self {
        Self {
            secondary_threshold,
            high_severity_threshold,
        }
    }

    pub fn secondary_threshold(&self) -> f64 {
        self.secondary_threshold
    }

    pub fn severity(&self, score: f64) -> Severity {
        if score > self.high_severity_threshold {
            Severity::High
        } else if score > self.secondary_threshold {
            Severity::Moderate
        } else {
            Severity::Low
        }
    }

    /// Select primary and secondary findings.
    ///
    /// Scores are visited in output registration order and only a strictly
    /// greater score replaces the current best, so ties go to the output
    /// registered first.
    pub fn select(&self, outcome: &InferenceOutcome) -> Diagnosis {
        let mut best: Option<(&str, f64)> = None;
        for (name, score) in &outcome.scores {
            if let Some(value) = score.value() {
                if best.map_or(true, |(_, top)| value > top) {
                    best = Some((name.as_str(), value));
                }
            }
        }

        let Some((primary, top)) = best else {
            return Diagnosis::NoDiagnosis;
        };

        let secondary = outcome
            .scores
            .iter()
            .filter(|(name, _)| name.as_str() != primary)
            .filter_map(|(name, score)| score.value().map(|v| (name, v)))
            .filter(|(_, value)| *value > self.secondary_threshold)
            .map(|(name, value)| self.finding(name, value))
            .collect();

        Diagnosis::Found {
            primary: self.finding(primary, top),
            secondary,
        }
    }

    fn finding(&self, output: &str, score: f64) -> Finding {
        Finding {
            output: output.to_string(),
            score,
            severity: self.severity(score),
        }
    }
}
