//! Versioned ingestion adapter for upstream envelope JSON.
//!
//! Upstream producers put synthetic markers, latency samples, severities and
//! trust-safety signals under several conventional keys. This adapter resolves
//! all of them once and emits the canonical [`AnalyticsEnvelope`].
//!
//! ## Lookup Order
//!
//! | Field | Keys checked, in order |
//! |-------|------------------------|
//! | latency | `latencyP95Ms`, `p95Latency`, `latencyP95`, `latency.p95` |
//! | severity | `severity`, `anomalySeverity`, `simcity.severity` |
//! | trust-safety | `trustSafety.signals`, `simcity.trustSafety.signals` |
//! | synthetic | `synthetic`, `simcity.synthetic` (plus `source == "simcity"` at build time) |

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{
    AnalyticsEnvelope, EnvelopeEvent, EnvelopeMetadata, EvolutionFlags, SimcityMetadata, Timebase,
};

/// Adapter version identifier.
pub const ENVELOPE_ADAPTER_VERSION: &str = "envelope_adapter_v1";

/// Error when normalizing an upstream envelope.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IngestError {
    /// Required field absent.
    #[error("Envelope {envelope} is missing required field `{field}`")]
    MissingField {
        /// Envelope ID, or `<unknown>`.
        envelope: String,
        /// Field path.
        field: &'static str,
    },
    /// Field present with the wrong shape.
    #[error("Envelope {envelope} has invalid `{field}`: {reason}")]
    InvalidField {
        /// Envelope ID, or `<unknown>`.
        envelope: String,
        /// Field path.
        field: &'static str,
        /// What was wrong.
        reason: String,
    },
}

/// Envelope adapter, version 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeAdapterV1 {
    /// Latency keys in priority order. Dotted keys address nested objects.
    pub latency_keys: Vec<String>,
    /// Severity keys in priority order. Dotted keys address nested objects.
    pub severity_keys: Vec<String>,
}

impl Default for EnvelopeAdapterV1 {
    fn default() -> Self {
        Self {
            latency_keys: ["latencyP95Ms", "p95Latency", "latencyP95", "latency.p95"]
                .into_iter()
                .map(String::from)
                .collect(),
            severity_keys: ["severity", "anomalySeverity", "simcity.severity"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl EnvelopeAdapterV1 {
    /// Adapter version.
    pub fn version(&self) -> &'static str {
        ENVELOPE_ADAPTER_VERSION
    }

    /// Normalize one raw envelope.
    pub fn normalize(&self, raw: &Value) -> Result<AnalyticsEnvelope, IngestError> {
        let id = match raw.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(other) => {
                return Err(IngestError::InvalidField {
                    envelope: "<unknown>".to_string(),
                    field: "id",
                    reason: format!("expected string, got {}", json_kind(other)),
                })
            }
            None => {
                return Err(IngestError::MissingField {
                    envelope: "<unknown>".to_string(),
                    field: "id",
                })
            }
        };

        let result = self.normalize_with_id(id.clone(), raw);
        if let Err(err) = &result {
            tracing::debug!(envelope_id = %id, error = %err, "rejected upstream envelope");
        }
        result
    }

    /// Normalize a batch, stopping at the first rejected envelope.
    pub fn normalize_batch(&self, raws: &[Value]) -> Result<Vec<AnalyticsEnvelope>, IngestError> {
        raws.iter().map(|raw| self.normalize(raw)).collect()
    }

    fn normalize_with_id(&self, id: String, raw: &Value) -> Result<AnalyticsEnvelope, IngestError> {
        let timestamp = match raw.get("timestamp") {
            Some(value) => as_millis(value).ok_or_else(|| IngestError::InvalidField {
                envelope: id.clone(),
                field: "timestamp",
                reason: "expected integer milliseconds".to_string(),
            })?,
            None => {
                return Err(IngestError::MissingField {
                    envelope: id,
                    field: "timestamp",
                })
            }
        };

        let timebase = raw.get("timebase").ok_or_else(|| IngestError::MissingField {
            envelope: id.clone(),
            field: "timebase.logical",
        })?;
        let logical = match timebase.get("logical") {
            Some(value) => value.as_u64().ok_or_else(|| IngestError::InvalidField {
                envelope: id.clone(),
                field: "timebase.logical",
                reason: "expected non-negative integer".to_string(),
            })?,
            None => {
                return Err(IngestError::MissingField {
                    envelope: id,
                    field: "timebase.logical",
                })
            }
        };
        let sim_time = timebase.get("simTime").and_then(Value::as_f64);

        let event = raw.get("event").ok_or_else(|| IngestError::MissingField {
            envelope: id.clone(),
            field: "event.type",
        })?;
        let event_type = match event.get("type") {
            Some(Value::String(t)) => t.clone(),
            Some(other) => {
                return Err(IngestError::InvalidField {
                    envelope: id,
                    field: "event.type",
                    reason: format!("expected string, got {}", json_kind(other)),
                })
            }
            None => {
                return Err(IngestError::MissingField {
                    envelope: id,
                    field: "event.type",
                })
            }
        };

        let empty = Map::new();
        let metadata = raw
            .get("metadata")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        Ok(AnalyticsEnvelope {
            version: string_at(raw, "version").unwrap_or_else(|| "v1".to_string()),
            timestamp,
            timebase: Timebase { logical, sim_time },
            source: string_at(raw, "source").unwrap_or_else(|| "unknown".to_string()),
            event: EnvelopeEvent {
                event_type,
                payload: event.get("payload").cloned().unwrap_or(Value::Null),
            },
            metadata: self.normalize_metadata(metadata),
            id,
        })
    }

    fn normalize_metadata(&self, metadata: &Map<String, Value>) -> EnvelopeMetadata {
        let simcity = metadata
            .get("simcity")
            .and_then(Value::as_object)
            .map(normalize_simcity);

        EnvelopeMetadata {
            synthetic: metadata.get("synthetic").and_then(Value::as_bool).unwrap_or(false),
            simcity,
            trust_safety_signals: metadata
                .get("trustSafety")
                .map(|ts| string_list(ts.get("signals")))
                .unwrap_or_default(),
            signals: string_list(metadata.get("signals")),
            evolution: metadata.get("evolution").and_then(parse_evolution),
            latency_p95_ms: self
                .latency_keys
                .iter()
                .find_map(|key| lookup_path(metadata, key).and_then(Value::as_f64)),
            severity: self
                .severity_keys
                .iter()
                .find_map(|key| lookup_path(metadata, key).and_then(Value::as_str))
                .map(str::to_string),
        }
    }
}

fn normalize_simcity(simcity: &Map<String, Value>) -> SimcityMetadata {
    let trust_safety = simcity.get("trustSafety");
    SimcityMetadata {
        synthetic: simcity.get("synthetic").and_then(Value::as_bool).unwrap_or(false),
        run_id: simcity.get("runId").and_then(Value::as_str).map(str::to_string),
        scenario_id: simcity.get("scenarioId").and_then(Value::as_str).map(str::to_string),
        fork_of: simcity.get("forkOf").and_then(Value::as_str).map(str::to_string),
        baseline: simcity.get("baseline").and_then(Value::as_bool),
        sim_time: simcity.get("simTime").and_then(Value::as_f64),
        logical_time: simcity.get("logicalTime").and_then(Value::as_u64),
        simulated: trust_safety
            .and_then(|ts| ts.get("simulated"))
            .and_then(Value::as_bool)
            .unwrap_or(false),
        trust_safety_signals: string_list(trust_safety.and_then(|ts| ts.get("signals"))),
        severity: simcity.get("severity").and_then(Value::as_str).map(str::to_string),
    }
}

/// Evolution flags are best-effort: a malformed block is ignored.
fn parse_evolution(value: &Value) -> Option<EvolutionFlags> {
    serde_json::from_value(value.clone()).ok()
}

fn lookup_path<'a>(root: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    segments.try_fold(root.get(first)?, |node, segment| node.get(segment))
}

fn string_at(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Whole-number milliseconds; floats outside the `i64` range are rejected.
fn as_millis(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
