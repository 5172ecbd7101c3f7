//! The registry of per-link accident state for one simulation run.

use std::collections::BTreeMap;

use accidents_costing_models::AccidentLinkInfo;
use accidents_network_models::LinkId;

/// Per-link [`AccidentLinkInfo`], keyed by link id.
///
/// Filled once at startup; afterwards only the time-bin costs of existing
/// entries change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccidentContext {
    links: BTreeMap<LinkId, AccidentLinkInfo>,
}

impl AccidentContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `info` under its own link id, replacing any previous entry.
    pub fn insert(&mut self, info: AccidentLinkInfo) -> Option<AccidentLinkInfo> {
        self.links.insert(info.link_id.clone(), info)
    }

    #[must_use]
    pub fn get(&self, link_id: &LinkId) -> Option<&AccidentLinkInfo> {
        self.links.get(link_id)
    }

    pub fn get_mut(&mut self, link_id: &LinkId) -> Option<&mut AccidentLinkInfo> {
        self.links.get_mut(link_id)
    }

    /// Entries in link id order.
    pub fn values(&self) -> impl Iterator<Item = &AccidentLinkInfo> {
        self.links.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Sum of all stored time-bin costs across all links.
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.links.values().map(AccidentLinkInfo::total_cost).sum()
    }
}
