//! Fingerprints for timelines, registries and risk models.
//!
//! A fingerprint is the xxh64 of a value's compact JSON encoding, rendered as
//! 16 lowercase hex digits. Default timeline ids, `RegistryRef::fingerprint`
//! and `RiskModelRef::params_hash` are all fingerprints, so replaying the same
//! envelopes against the same registry and model reproduces every identifier.
//!
//! ## What Callers Guarantee
//!
//! - Maps inside fingerprinted data are `BTreeMap`, never `HashMap`
//! - Sequences are already in their canonical order (envelope order, entry order)
//! - Floats are quantized first (`RiskModelV1::params_hash` scales by 1e6)

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Seed shared by every fingerprint in this crate.
pub const FINGERPRINT_SEED: u64 = 0;

/// Compact JSON encoding that fingerprints are computed over.
///
/// Fingerprinted values are derived data structs, strings, integers and
/// `BTreeMap`s, none of which serde_json can fail to encode.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("fingerprinted values always encode as JSON")
}

/// Numeric fingerprint of a value.
pub fn fingerprint<T: Serialize + ?Sized>(value: &T) -> u64 {
    xxh64(&canonical_json(value), FINGERPRINT_SEED)
}

/// Fingerprint as 16 zero-padded hex digits.
pub fn fingerprint_hex<T: Serialize + ?Sized>(value: &T) -> String {
    format!("{:016x}", fingerprint(value))
}
