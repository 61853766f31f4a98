//! RiskModel v1: additive, clamped risk accumulation.
//!
//! ## Float Normalization for Deterministic Hashing
//!
//! Floats are quantized to integers before hashing (multiply by 1e6 and round
//! to i64), so a trajectory's `model.paramsHash` identifies the configuration
//! regardless of float formatting.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::audit::stats::{ANOMALY_DETECTED, BOOKING_CANCELLED, BOOKING_CREATED};
use crate::canonical::fingerprint_hex;
use crate::types::{RiskConfidence, RiskDimension, RiskTrend};
use crate::DEFAULT_RISK_MODEL_VERSION;

/// Quantization factor for float normalization.
const FLOAT_QUANTIZATION_FACTOR: f64 = 1_000_000.0;

fn quantize_float(value: f64) -> i64 {
    (value * FLOAT_QUANTIZATION_FACTOR).round() as i64
}

fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Value per risk dimension.
///
/// Used both for absolute risk levels and for signed adjustments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskVector {
    /// Fraud likelihood.
    #[serde(default)]
    pub fraud_likelihood: f64,
    /// No-show hazard.
    #[serde(default)]
    pub no_show_hazard: f64,
    /// Provider reliability.
    #[serde(default)]
    pub provider_reliability: f64,
    /// Abuse risk.
    #[serde(default)]
    pub abuse_risk: f64,
}

impl RiskVector {
    /// Create a vector.
    pub fn new(fraud_likelihood: f64, no_show_hazard: f64, provider_reliability: f64, abuse_risk: f64) -> Self {
        Self {
            fraud_likelihood,
            no_show_hazard,
            provider_reliability,
            abuse_risk,
        }
    }

    /// Value for a dimension.
    pub fn get(&self, dimension: RiskDimension) -> f64 {
        match dimension {
            RiskDimension::FraudLikelihood => self.fraud_likelihood,
            RiskDimension::NoShowHazard => self.no_show_hazard,
            RiskDimension::ProviderReliability => self.provider_reliability,
            RiskDimension::AbuseRisk => self.abuse_risk,
        }
    }

    /// Add `delta` and clamp every dimension to `[0, 1]`.
    pub fn adjusted(&self, delta: &RiskVector) -> Self {
        Self {
            fraud_likelihood: clamp_unit(self.fraud_likelihood + delta.fraud_likelihood),
            no_show_hazard: clamp_unit(self.no_show_hazard + delta.no_show_hazard),
            provider_reliability: clamp_unit(self.provider_reliability + delta.provider_reliability),
            abuse_risk: clamp_unit(self.abuse_risk + delta.abuse_risk),
        }
    }

    fn to_quantized(self) -> [i64; 4] {
        [
            quantize_float(self.fraud_likelihood),
            quantize_float(self.no_show_hazard),
            quantize_float(self.provider_reliability),
            quantize_float(self.abuse_risk),
        ]
    }
}

/// Fraud increase of an `anomaly.detected` event, keyed by severity.
///
/// Severity labels are compared lowercase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityWeights {
    /// Label → fraud increase.
    pub labels: BTreeMap<String, f64>,
    /// Increase for an unrecognized label.
    pub other: f64,
    /// Increase when no severity is given.
    pub unspecified: f64,
}

impl SeverityWeights {
    /// Fraud increase for an optional severity label.
    pub fn weight(&self, severity: Option<&str>) -> f64 {
        match severity {
            Some(label) => self
                .labels
                .get(&label.to_lowercase())
                .copied()
                .unwrap_or(self.other),
            None => self.unspecified,
        }
    }
}

impl Default for SeverityWeights {
    fn default() -> Self {
        let labels = [
            ("critical", 0.35),
            ("high", 0.25),
            ("sev0", 0.25),
            ("sev1", 0.25),
            ("medium", 0.18),
            ("sev2", 0.18),
        ]
        .into_iter()
        .map(|(label, weight)| (label.to_string(), weight))
        .collect();

        Self {
            labels,
            other: 0.10,
            unspecified: 0.12,
        }
    }
}

/// Adjustments driven by the envelope's latency sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyAdjustments {
    /// Samples above this are severe.
    pub severe_above_ms: f64,
    /// Adjustment for a severe sample.
    pub severe: RiskVector,
    /// Samples above this (and not severe) are elevated.
    pub elevated_above_ms: f64,
    /// Adjustment for an elevated sample.
    pub elevated: RiskVector,
}

impl LatencyAdjustments {
    /// Adjustment for a latency sample, if any applies.
    pub fn for_sample(&self, latency_ms: f64) -> Option<&RiskVector> {
        if latency_ms > self.severe_above_ms {
            Some(&self.severe)
        } else if latency_ms > self.elevated_above_ms {
            Some(&self.elevated)
        } else {
            None
        }
    }
}

impl Default for LatencyAdjustments {
    fn default() -> Self {
        Self {
            severe_above_ms: 800.0,
            severe: RiskVector {
                provider_reliability: -0.12,
                no_show_hazard: 0.08,
                ..RiskVector::default()
            },
            elevated_above_ms: 400.0,
            elevated: RiskVector {
                provider_reliability: -0.06,
                ..RiskVector::default()
            },
        }
    }
}

/// Adjustment applied once per trust-safety signal containing any keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalRule {
    /// Lowercase substrings that trigger the rule.
    pub keywords: Vec<String>,
    /// Adjustment applied on a match.
    pub adjustment: RiskVector,
}

impl SignalRule {
    /// Create a rule.
    pub fn new(keywords: &[&str], adjustment: RiskVector) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            adjustment,
        }
    }

    /// Whether an already-normalized signal triggers the rule.
    pub fn matches(&self, normalized: &str) -> bool {
        self.keywords.iter().any(|k| normalized.contains(k.as_str()))
    }
}

/// Minimum signal counts for each confidence level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceCutoffs {
    /// Signals needed for high confidence (medium if synthetic).
    pub high: usize,
    /// Signals needed for medium confidence.
    pub medium: usize,
}

impl Default for ConfidenceCutoffs {
    fn default() -> Self {
        Self { high: 4, medium: 2 }
    }
}

/// Quantized model parameters for deterministic hashing.
#[derive(Debug, Clone, Serialize)]
struct QuantizedModelParams {
    version: String,
    seed: [i64; 4],
    events: BTreeMap<String, [i64; 4]>,
    anomaly_event: String,
    anomaly_abuse: i64,
    severity_labels: BTreeMap<String, i64>,
    severity_other: i64,
    severity_unspecified: i64,
    latency_severe_above_ms: i64,
    latency_severe: [i64; 4],
    latency_elevated_above_ms: i64,
    latency_elevated: [i64; 4],
    signals: Vec<(Vec<String>, [i64; 4])>,
    trend_epsilon: i64,
    confidence: (usize, usize),
}

/// Risk model version 1.
///
/// ## Parameters
///
/// - `seed`: starting level of every dimension
/// - `events`: fixed adjustment per lowercase event type
/// - `anomaly_event` / `anomaly_abuse` / `severity`: anomaly handling, where
///   fraud grows by the severity weight
/// - `latency`: reliability decay on slow requests
/// - `signals`: keyword rules applied per trust-safety signal
/// - `trend_epsilon`: movement below this is `flat`
/// - `confidence`: signal-count cut-offs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskModelV1 {
    /// Model version identifier.
    pub version: String,
    /// Starting risk levels.
    pub seed: RiskVector,
    /// Adjustment per lowercase event type.
    pub events: BTreeMap<String, RiskVector>,
    /// Event type of an anomaly.
    pub anomaly_event: String,
    /// Abuse increase per anomaly.
    pub anomaly_abuse: f64,
    /// Fraud increase per anomaly severity.
    pub severity: SeverityWeights,
    /// Latency-driven adjustments.
    pub latency: LatencyAdjustments,
    /// Keyword rules over trust-safety signals, applied in order.
    pub signals: Vec<SignalRule>,
    /// Minimum movement for an up/down trend.
    pub trend_epsilon: f64,
    /// Confidence cut-offs.
    pub confidence: ConfidenceCutoffs,
}

impl Default for RiskModelV1 {
    fn default() -> Self {
        let events = [
            (BOOKING_CREATED, RiskVector::new(0.0, -0.05, 0.02, 0.0)),
            (BOOKING_CANCELLED, RiskVector::new(0.0, 0.25, -0.10, 0.0)),
            ("booking.updated", RiskVector::new(0.0, 0.0, -0.02, 0.0)),
            ("ops.incident.created", RiskVector::new(0.0, 0.08, -0.20, 0.0)),
        ]
        .into_iter()
        .map(|(event_type, adjustment)| (event_type.to_string(), adjustment))
        .collect();

        Self {
            version: DEFAULT_RISK_MODEL_VERSION.to_string(),
            seed: RiskVector::new(0.08, 0.05, 0.92, 0.05),
            events,
            anomaly_event: ANOMALY_DETECTED.to_string(),
            anomaly_abuse: 0.05,
            severity: SeverityWeights::default(),
            latency: LatencyAdjustments::default(),
            signals: vec![
                SignalRule::new(&["fraud", "chargeback"], RiskVector::new(0.12, 0.0, 0.0, 0.0)),
                SignalRule::new(&["abuse", "spam"], RiskVector::new(0.0, 0.0, 0.0, 0.10)),
                SignalRule::new(&["cancel", "no_show"], RiskVector::new(0.0, 0.10, 0.0, 0.0)),
                SignalRule::new(&["reliable", "positive"], RiskVector::new(0.0, 0.0, 0.04, 0.0)),
            ],
            trend_epsilon: 0.01,
            confidence: ConfidenceCutoffs::default(),
        }
    }
}

impl RiskModelV1 {
    /// Get the model ID.
    pub fn model_id(&self) -> &str {
        &self.version
    }

    /// Apply the adjustments of one event.
    pub fn apply_event(
        &self,
        state: &RiskVector,
        event_type: &str,
        severity: Option<&str>,
        latency_ms: Option<f64>,
    ) -> RiskVector {
        let event_type = event_type.to_lowercase();
        let mut next = *state;

        if let Some(adjustment) = self.events.get(&event_type) {
            next = next.adjusted(adjustment);
        }
        if event_type == self.anomaly_event {
            next = next.adjusted(&RiskVector {
                fraud_likelihood: self.severity.weight(severity),
                abuse_risk: self.anomaly_abuse,
                ..RiskVector::default()
            });
        }
        if let Some(adjustment) = latency_ms
            .filter(|ms| *ms > 0.0)
            .and_then(|ms| self.latency.for_sample(ms))
        {
            next = next.adjusted(adjustment);
        }

        next
    }

    /// Apply keyword rules for each trust-safety signal.
    pub fn apply_signals(&self, state: &RiskVector, signals: &[String]) -> RiskVector {
        let mut next = *state;
        for signal in signals {
            let normalized = signal.trim().to_lowercase();
            for rule in self.signals.iter().filter(|r| r.matches(&normalized)) {
                next = next.adjusted(&rule.adjustment);
            }
        }
        next
    }

    /// Direction of movement from `previous` to `current`.
    pub fn trend(&self, current: f64, previous: f64) -> RiskTrend {
        if current > previous + self.trend_epsilon {
            RiskTrend::Up
        } else if current < previous - self.trend_epsilon {
            RiskTrend::Down
        } else {
            RiskTrend::Flat
        }
    }

    /// Confidence for a snapshot with `signal_count` signals.
    pub fn confidence(&self, signal_count: usize, synthetic: bool) -> RiskConfidence {
        if signal_count >= self.confidence.high {
            if synthetic {
                RiskConfidence::Medium
            } else {
                RiskConfidence::High
            }
        } else if signal_count >= self.confidence.medium {
            RiskConfidence::Medium
        } else {
            RiskConfidence::Low
        }
    }

    /// Compute a hash of the model parameters.
    ///
    /// Uses quantized float representation so the hash is stable across
    /// float serialization settings.
    pub fn params_hash(&self) -> String {
        fingerprint_hex(&self.to_quantized())
    }

    fn to_quantized(&self) -> QuantizedModelParams {
        QuantizedModelParams {
            version: self.version.clone(),
            seed: self.seed.to_quantized(),
            events: self
                .events
                .iter()
                .map(|(k, v)| (k.clone(), v.to_quantized()))
                .collect(),
            anomaly_event: self.anomaly_event.clone(),
            anomaly_abuse: quantize_float(self.anomaly_abuse),
            severity_labels: self
                .severity
                .labels
                .iter()
                .map(|(k, v)| (k.clone(), quantize_float(*v)))
                .collect(),
            severity_other: quantize_float(self.severity.other),
            severity_unspecified: quantize_float(self.severity.unspecified),
            latency_severe_above_ms: quantize_float(self.latency.severe_above_ms),
            latency_severe: self.latency.severe.to_quantized(),
            latency_elevated_above_ms: quantize_float(self.latency.elevated_above_ms),
            latency_elevated: self.latency.elevated.to_quantized(),
            signals: self
                .signals
                .iter()
                .map(|r| (r.keywords.clone(), r.adjustment.to_quantized()))
                .collect(),
            trend_epsilon: quantize_float(self.trend_epsilon),
            confidence: (self.confidence.high, self.confidence.medium),
        }
    }
}
