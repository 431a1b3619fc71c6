use std::collections::HashMap;

use crate::config::UNKNOWN_CONSTRUCTOR;
use crate::types::{EntrantIdentity, StandingsSnapshot};

/// Read-only id → identity lookup built once per aggregation call from a
/// season standings snapshot. Nothing mutates it after construction, so it
/// can be shared freely between concurrently running consumers.
#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    by_id: HashMap<String, EntrantIdentity>,
}

/// Identity fields attached to each lap timing.
#[derive(Debug, Clone, PartialEq)]
pub struct LapIdentity {
    pub constructor_id: String,
    pub family_name: String,
    pub driver_code: Option<String>,
}

impl IdentityMap {
    pub fn from_snapshot(snapshot: &StandingsSnapshot) -> Self {
        let by_id = snapshot
            .entries
            .iter()
            .map(|e| (e.identity.id.clone(), e.identity.clone()))
            .collect();
        Self { by_id }
    }

    pub fn resolve(&self, id: &str) -> Option<&EntrantIdentity> {
        self.by_id.get(id)
    }

    /// Snapshot identity for `fallback.id` if known, otherwise `fallback`
    /// itself (typically the identity carried on a per-round row).
    pub fn resolve_or(&self, fallback: &EntrantIdentity) -> EntrantIdentity {
        self.resolve(&fallback.id).cloned().unwrap_or_else(|| fallback.clone())
    }

    /// Unresolved drivers fall back to the raw id as name and an unknown constructor.
    pub fn lap_identity(&self, driver_id: &str) -> LapIdentity {
        match self.resolve(driver_id) {
            Some(identity) => LapIdentity {
                constructor_id: identity
                    .constructor_id
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_CONSTRUCTOR.to_string()),
                family_name: identity
                    .family_name
                    .clone()
                    .unwrap_or_else(|| identity.display_name.clone()),
                driver_code: identity.short_code.clone(),
            },
            None => LapIdentity {
                constructor_id: UNKNOWN_CONSTRUCTOR.to_string(),
                family_name: driver_id.to_string(),
                driver_code: None,
            },
        }
    }
}
