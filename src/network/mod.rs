//! Network fault knowledge base
//!
//! Five measured symptoms feed five fault scores on a 0-100 scale:
//!
//! | input | unit | terms |
//! |---|---|---|
//! | `velocidad_carga` | Mbps | baja, media, alta |
//! | `perdida_paquetes` | % | ninguna, moderada, alta |
//! | `errores_dns` | errors/hour | inexistente, ocasional, frecuente |
//! | `senal_wifi` | % | debil, moderada, fuerte |
//! | `tiempo_respuesta` | ms | rapido, normal, lento |
//!
//! Outputs, in tie-breaking order: `problema_isp`, `problema_hardware`,
//! `problema_dns`, `problema_wifi`, `congestion_red`, each with the terms
//! `bajo`, `medio` and `alto`.

mod scenarios;

pub use scenarios::{find as find_scenario, Scenario, SCENARIOS};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::NetdiagConfig;
use crate::error::NetdiagResult;
use crate::fuzzy::{
    Antecedent, Consequent, Diagnosis, DiagnosisSelector, InferenceEngine, InferenceOutcome, Inputs,
    LinguisticVariable, MembershipFunction, Rule, RuleBase, Universe,
};

pub const UPLOAD_SPEED: &str = "velocidad_carga";
pub const PACKET_LOSS: &str = "perdida_paquetes";
pub const DNS_ERRORS: &str = "errores_dns";
pub const WIFI_SIGNAL: &str = "senal_wifi";
pub const RESPONSE_TIME: &str = "tiempo_respuesta";

pub const ISP_FAULT: &str = "problema_isp";
pub const HARDWARE_FAULT: &str = "problema_hardware";
pub const DNS_FAULT: &str = "problema_dns";
pub const WIFI_FAULT: &str = "problema_wifi";
pub const CONGESTION: &str = "congestion_red";

/// Input variable names paired with their measurement unit
pub const INPUT_UNITS: [(&str, &str); 5] = [
    (UPLOAD_SPEED, "Mbps"),
    (PACKET_LOSS, "%"),
    (DNS_ERRORS, "errors/hour"),
    (WIFI_SIGNAL, "%"),
    (RESPONSE_TIME, "ms"),
];

/// Output variable names in registration order
pub const OUTPUTS: [&str; 5] = [ISP_FAULT, HARDWARE_FAULT, DNS_FAULT, WIFI_FAULT, CONGESTION];

// ============================================================================
// Knowledge Base
// ============================================================================

fn tri(a: f64, b: f64, c: f64) -> NetdiagResult<MembershipFunction> {
    MembershipFunction::triangular(a, b, c)
}

fn trap(a: f64, b: f64, c: f64, d: f64) -> NetdiagResult<MembershipFunction> {
    MembershipFunction::trapezoidal(a, b, c, d)
}

fn input_variables() -> NetdiagResult<Vec<LinguisticVariable>> {
    Ok(vec![
        LinguisticVariable::new(UPLOAD_SPEED, Universe::new(0.0, 10.0, 0.1)?)
            .with_term("baja", trap(0.0, 0.0, 2.0, 3.0)?)?
            .with_term("media", tri(2.0, 4.5, 7.0)?)?
            .with_term("alta", trap(6.0, 7.0, 10.0, 10.0)?)?,
        LinguisticVariable::new(PACKET_LOSS, Universe::new(0.0, 30.0, 0.1)?)
            .with_term("ninguna", tri(0.0, 0.0, 1.0)?)?
            .with_term("moderada", tri(1.0, 8.0, 15.0)?)?
            .with_term("alta", trap(15.0, 20.0, 30.0, 30.0)?)?,
        LinguisticVariable::new(DNS_ERRORS, Universe::new(0.0, 10.0, 0.1)?)
            .with_term("inexistente", tri(0.0, 0.0, 0.5)?)?
            .with_term("ocasional", tri(0.5, 2.0, 3.0)?)?
            .with_term("frecuente", trap(3.0, 5.0, 10.0, 10.0)?)?,
        LinguisticVariable::new(WIFI_SIGNAL, Universe::new(0.0, 100.0, 1.0)?)
            .with_term("debil", trap(0.0, 0.0, 30.0, 50.0)?)?
            .with_term("moderada", tri(30.0, 60.0, 80.0)?)?
            .with_term("fuerte", trap(70.0, 90.0, 100.0, 100.0)?)?,
        LinguisticVariable::new(RESPONSE_TIME, Universe::new(0.0, 500.0, 1.0)?)
            .with_term("rapido", trap(0.0, 0.0, 50.0, 100.0)?)?
            .with_term("normal", tri(50.0, 150.0, 250.0)?)?
            .with_term("lento", trap(200.0, 300.0, 500.0, 500.0)?)?,
    ])
}

fn fault_score(name: &str, output_step: f64) -> NetdiagResult<LinguisticVariable> {
    LinguisticVariable::new(name, Universe::new(0.0, 100.0, output_step)?)
        .with_term("bajo", tri(0.0, 0.0, 50.0)?)?
        .with_term("medio", tri(0.0, 50.0, 100.0)?)?
        .with_term("alto", tri(50.0, 100.0, 100.0)?)
}

fn rules() -> Vec<Rule> {
    let when = Antecedent::is;
    let then = Consequent::new;

    vec![
        // ISP
        Rule::new(when(PACKET_LOSS, "alta").and(when(UPLOAD_SPEED, "baja")), then(ISP_FAULT, "alto")),
        Rule::new(
            Antecedent::all([when(PACKET_LOSS, "moderada"), when(UPLOAD_SPEED, "baja"), when(RESPONSE_TIME, "lento")]),
            then(ISP_FAULT, "alto"),
        ),
        Rule::new(when(PACKET_LOSS, "moderada").and(when(UPLOAD_SPEED, "media")), then(ISP_FAULT, "medio")),
        Rule::new(when(PACKET_LOSS, "ninguna").and(when(UPLOAD_SPEED, "alta")), then(ISP_FAULT, "bajo")),
        // hardware
        Rule::new(
            Antecedent::all([when(PACKET_LOSS, "moderada"), when(UPLOAD_SPEED, "baja"), when(WIFI_SIGNAL, "fuerte")]),
            then(HARDWARE_FAULT, "alto"),
        ),
        Rule::new(
            Antecedent::all([when(PACKET_LOSS, "alta"), when(RESPONSE_TIME, "lento"), when(DNS_ERRORS, "inexistente")]),
            then(HARDWARE_FAULT, "alto"),
        ),
        Rule::new(when(PACKET_LOSS, "ninguna").and(when(UPLOAD_SPEED, "alta")), then(HARDWARE_FAULT, "bajo")),
        // DNS
        Rule::new(when(DNS_ERRORS, "frecuente"), then(DNS_FAULT, "alto")),
        Rule::new(when(DNS_ERRORS, "ocasional").and(when(UPLOAD_SPEED, "media")), then(DNS_FAULT, "medio")),
        Rule::new(when(DNS_ERRORS, "inexistente"), then(DNS_FAULT, "bajo")),
        // WiFi
        Rule::new(when(WIFI_SIGNAL, "debil"), then(WIFI_FAULT, "alto")),
        Rule::new(when(WIFI_SIGNAL, "moderada").and(when(UPLOAD_SPEED, "baja")), then(WIFI_FAULT, "medio")),
        Rule::new(when(WIFI_SIGNAL, "fuerte").and(when(UPLOAD_SPEED, "baja")), then(WIFI_FAULT, "bajo")),
        // congestion
        Rule::new(
            Antecedent::all([when(RESPONSE_TIME, "lento"), when(UPLOAD_SPEED, "baja"), when(PACKET_LOSS, "moderada")]),
            then(CONGESTION, "alto"),
        ),
        Rule::new(when(RESPONSE_TIME, "normal").and(when(UPLOAD_SPEED, "media")), then(CONGESTION, "medio")),
        Rule::new(when(RESPONSE_TIME, "rapido").and(when(UPLOAD_SPEED, "alta")), then(CONGESTION, "bajo")),
    ]
}

/// Build the network rule base with output universes sampled every `output_step`
pub fn rule_base(output_step: f64) -> NetdiagResult<RuleBase> {
    let mut builder = RuleBase::builder();
    for variable in input_variables()? {
        builder.input(variable)?;
    }
    for name in OUTPUTS {
        builder.output(fault_score(name, output_step)?)?;
    }
    builder.rules(rules())?;
    Ok(builder.build())
}

// ============================================================================
// Readings
// ============================================================================

/// One set of network measurements.
///
/// Absent readings are left out of the engine inputs, so a diagnosis over
/// incomplete readings fails with `MissingInput` naming every gap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkReadings {
    /// Upload throughput in Mbps
    pub upload_mbps: Option<f64>,
    /// Packet loss percentage
    pub packet_loss_pct: Option<f64>,
    pub dns_errors_per_hour: Option<f64>,
    /// WiFi signal strength percentage
    pub wifi_signal_pct: Option<f64>,
    /// Response time in milliseconds
    pub latency_ms: Option<f64>,
}

impl NetworkReadings {
    /// All five readings present
    pub const fn new(
        upload_mbps: f64,
        packet_loss_pct: f64,
        dns_errors_per_hour: f64,
        wifi_signal_pct: f64,
        latency_ms: f64,
    ) -> Self {
        Self {
            upload_mbps: Some(upload_mbps),
            packet_loss_pct: Some(packet_loss_pct),
            dns_errors_per_hour: Some(dns_errors_per_hour),
            wifi_signal_pct: Some(wifi_signal_pct),
            latency_ms: Some(latency_ms),
        }
    }

    /// Readings keyed by input variable name, in input order
    pub fn entries(&self) -> [(&'static str, Option<f64>); 5] {
        [
            (UPLOAD_SPEED, self.upload_mbps),
            (PACKET_LOSS, self.packet_loss_pct),
            (DNS_ERRORS, self.dns_errors_per_hour),
            (WIFI_SIGNAL, self.wifi_signal_pct),
            (RESPONSE_TIME, self.latency_ms),
        ]
    }

    pub fn to_inputs(&self) -> Inputs {
        self.entries()
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name.to_string(), v)))
            .collect()
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Fault scores and the diagnosis drawn from them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkReport {
    pub readings: NetworkReadings,
    pub outcome: InferenceOutcome,
    pub diagnosis: Diagnosis,
}

/// Network diagnosis facade over a shared engine
#[derive(Debug, Clone)]
pub struct NetworkDiagnostics {
    engine: InferenceEngine,
    selector: DiagnosisSelector,
}

impl NetworkDiagnostics {
    /// Default settings: inputs clipped, unit output resolution, thresholds 50/70
    pub fn new() -> NetdiagResult<Self> {
        Self::from_config(&NetdiagConfig::default())
    }

    /// Build from configuration, rejecting invalid settings first
    pub fn from_config(config: &NetdiagConfig) -> NetdiagResult<Self> {
        config.validate()?;
        let rule_base = rule_base(config.engine.output_step)?;
        info!(
            rules = rule_base.rules().len(),
            output_step = config.engine.output_step,
            clip_inputs = config.engine.clip_inputs,
            "network rule base ready"
        );
        let engine = InferenceEngine::new(Arc::new(rule_base)).with_clip_inputs(config.engine.clip_inputs);
        Ok(Self {
            engine,
            selector: config.diagnosis.selector(),
        })
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    pub fn selector(&self) -> &DiagnosisSelector {
        &self.selector
    }

    pub fn diagnose(&self, readings: &NetworkReadings) -> NetdiagResult<NetworkReport> {
        let outcome = self.engine.evaluate(&readings.to_inputs())?;
        Ok(self.report(*readings, outcome))
    }

    /// Diagnose many independent reading sets concurrently, in input order
    pub fn diagnose_batch(&self, readings: &[NetworkReadings]) -> Vec<NetdiagResult<NetworkReport>> {
        let inputs: Vec<Inputs> = readings.iter().map(NetworkReadings::to_inputs).collect();
        self.engine
            .evaluate_batch(&inputs)
            .into_iter()
            .zip(readings)
            .map(|(result, readings)| result.map(|outcome| self.report(*readings, outcome)))
            .collect()
    }

    fn report(&self, readings: NetworkReadings, outcome: InferenceOutcome) -> NetworkReport {
        let diagnosis = self.selector.select(&outcome);
        NetworkReport {
            readings,
            outcome,
            diagnosis,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
