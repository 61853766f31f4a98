//! Domain governance registry contract.
//!
//! The registry content is owned elsewhere; the kernel only consumes its
//! shape through [`GovernanceLookup`]. Lookups are fail-closed: a domain
//! without an entry is never allowed into an audit timeline.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::canonical::fingerprint_hex;

/// How a domain's event contract is evolving. Propagated, never interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionFlags {
    /// Whether breaking changes are allowed.
    #[serde(default)]
    pub allow_breaking_changes: bool,
    /// Whether a migration plan is required.
    #[serde(default)]
    pub require_migration_plan: bool,
    /// Contract version consumers must upgrade to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_upgrade_required: Option<String>,
}

/// Versioned event contract for a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainContract {
    /// Domain name.
    pub domain: String,
    /// Current contract version.
    pub version: String,
    /// Stability label (stable, beta, deprecated, ...).
    #[serde(default)]
    pub stability: String,
    /// Mutations allowed without a version bump.
    #[serde(default)]
    pub allowed_mutations: Vec<String>,
    /// Mutations that are never allowed.
    #[serde(default)]
    pub forbidden_mutations: Vec<String>,
}

impl DomainContract {
    /// Create a stable contract with no mutation rules.
    pub fn new(domain: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            version: version.into(),
            stability: "stable".to_string(),
            allowed_mutations: Vec::new(),
            forbidden_mutations: Vec::new(),
        }
    }
}

/// Deprecation schedule for a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeprecationPolicy {
    /// Domain name.
    pub domain: String,
    /// Whether the domain is marked for deprecation.
    pub will_deprecate: bool,
    /// Date after which the domain may no longer be replayed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunset_date: Option<String>,
}

/// Parsed sunset cutoff of a deprecation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SunsetCutoff {
    /// No sunset date declared.
    Unscheduled,
    /// Cutoff in milliseconds since the Unix epoch.
    At(i64),
    /// A sunset date is declared but cannot be parsed.
    Unparsable,
}

impl DeprecationPolicy {
    /// Parse the sunset date.
    ///
    /// Accepts `YYYY-MM-DD` (midnight UTC) and RFC 3339 timestamps.
    pub fn sunset_cutoff(&self) -> SunsetCutoff {
        let Some(raw) = self.sunset_date.as_deref() else {
            return SunsetCutoff::Unscheduled;
        };

        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return SunsetCutoff::At(ts.timestamp_millis());
        }

        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| SunsetCutoff::At(Utc.from_utc_datetime(&naive).timestamp_millis()))
            .unwrap_or(SunsetCutoff::Unparsable)
    }
}

/// Registry entry for one governed domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainRegistryEntry {
    /// Domain name.
    pub domain: String,
    /// Current contract.
    pub contract: DomainContract,
    /// Declared evolution flags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evolution: Option<EvolutionFlags>,
    /// Deprecation schedule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation: Option<DeprecationPolicy>,
}

impl DomainRegistryEntry {
    /// Create an entry with a stable contract at `version`.
    pub fn new(domain: impl Into<String>, version: impl Into<String>) -> Self {
        let domain = domain.into();
        Self {
            contract: DomainContract::new(domain.clone(), version),
            domain,
            evolution: None,
            deprecation: None,
        }
    }

    /// Set declared evolution flags.
    pub fn with_evolution(mut self, evolution: EvolutionFlags) -> Self {
        self.evolution = Some(evolution);
        self
    }

    /// Mark the domain for deprecation.
    pub fn deprecated(mut self, sunset_date: Option<&str>) -> Self {
        self.contract.stability = "deprecated".to_string();
        self.deprecation = Some(DeprecationPolicy {
            domain: self.domain.clone(),
            will_deprecate: true,
            sunset_date: sunset_date.map(str::to_string),
        });
        self
    }

    /// Whether the domain is marked for deprecation.
    pub fn is_marked_for_deprecation(&self) -> bool {
        self.deprecation.as_ref().map(|d| d.will_deprecate).unwrap_or(false)
    }

    /// `domain@version` reference for the current contract.
    pub fn contract_ref(&self) -> String {
        format!("{}@{}", self.domain, self.contract.version)
    }
}

/// Read-only lookup over a governance registry.
///
/// The kernel never writes through this trait.
pub trait GovernanceLookup {
    /// Fetch the entry for a domain.
    fn entry(&self, domain: &str) -> Option<&DomainRegistryEntry>;

    /// Stable fingerprint of the registry content.
    fn fingerprint(&self) -> String;

    /// All governed domains, sorted.
    fn domains(&self) -> Vec<String>;
}

/// In-memory domain registry.
///
/// Uses a BTreeMap for deterministic iteration order. When the same domain is
/// listed twice, the first entry wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RegistryDocument", into = "RegistryDocument")]
pub struct DomainRegistry {
    entries: BTreeMap<String, DomainRegistryEntry>,
}

/// Wire shape of a registry: `{ "entries": [...] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryDocument {
    /// Registry entries in declaration order.
    #[serde(default)]
    pub entries: Vec<DomainRegistryEntry>,
}

impl From<RegistryDocument> for DomainRegistry {
    fn from(doc: RegistryDocument) -> Self {
        Self::from_entries(doc.entries)
    }
}

impl From<DomainRegistry> for RegistryDocument {
    fn from(registry: DomainRegistry) -> Self {
        Self {
            entries: registry.entries.into_values().collect(),
        }
    }
}

impl DomainRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of entries.
    pub fn from_entries(entries: impl IntoIterator<Item = DomainRegistryEntry>) -> Self {
        let mut registry = Self::new();
        for entry in entries {
            registry.register(entry);
        }
        registry
    }

    /// Register an entry. Returns false if the domain was already governed.
    pub fn register(&mut self, entry: DomainRegistryEntry) -> bool {
        if self.entries.contains_key(&entry.domain) {
            return false;
        }
        self.entries.insert(entry.domain.clone(), entry);
        true
    }

    /// Number of governed domains.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl GovernanceLookup for DomainRegistry {
    fn entry(&self, domain: &str) -> Option<&DomainRegistryEntry> {
        self.entries.get(domain)
    }

    fn fingerprint(&self) -> String {
        fingerprint_hex(&self.entries)
    }

    fn domains(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// Governance facts attached to a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernanceSnapshot {
    /// Governance domain.
    pub domain: String,
    /// Whether the domain is permitted for this frame.
    pub permitted: bool,
    /// Human-readable explanation when not plainly permitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Registry-declared evolution flags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evolution: Option<EvolutionFlags>,
    /// Deprecation schedule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation: Option<DeprecationPolicy>,
    /// Registry entry backing this snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<DomainRegistryEntry>,
}

impl GovernanceSnapshot {
    /// Permissive stub for domains with no frame to borrow governance from.
    pub fn default_for(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            permitted: true,
            reason: Some("No frame for domain; default governance applied".to_string()),
            evolution: None,
            deprecation: None,
            entry: None,
        }
    }
}
