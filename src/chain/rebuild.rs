//! Full-cycle rebuild of the link graph from observed bios.
//!
//! Every `Confirmed` edge is first marked `Stale`; each link that still
//! resolves this cycle is set back to `Confirmed`. Links that were not
//! reconfirmed stay `Stale` until a purge.

use super::link_graph::{EdgeState, LinkGraph, ParticipantId};
use super::selector::Selection;
use crate::store::ParticipantStore;
use std::collections::HashMap;
use tracing::debug;

/// Lower-cased handle -> participant id, rebuilt every cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationTable {
    handles: HashMap<String, ParticipantId>,
}

impl TranslationTable {
    /// Build from the handles of non-disabled participants.
    pub fn build(store: &ParticipantStore) -> Self {
        let handles = store
            .active()
            .filter_map(|p| p.handle().map(|h| (h.to_lowercase(), p.id.clone())))
            .collect();
        Self { handles }
    }

    /// Resolve a raw handle (case-insensitive, optional leading `@`).
    pub fn resolve(&self, raw: &str) -> Option<&ParticipantId> {
        let handle = raw.strip_prefix('@').unwrap_or(raw);
        self.handles.get(&handle.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Re-derive every edge from the participants' current bios.
///
/// Returns the translation table used, for callers that need to resolve
/// the same handles later in the cycle.
pub fn rebuild_links(graph: &mut LinkGraph, store: &ParticipantStore) -> TranslationTable {
    let staled = graph.replace_all(EdgeState::Confirmed, EdgeState::Stale);
    let table = TranslationTable::build(store);

    let mut confirmed = 0;
    for participant in store.active() {
        for raw in &participant.links {
            if let Some(target) = table.resolve(raw) {
                graph.set_edge(&participant.id, target, EdgeState::Confirmed);
                confirmed += 1;
            }
        }
    }

    debug!(staled, confirmed, handles = table.len(), "rebuilt links from bios");
    table
}

/// Drop every `Stale` edge, but only while the canonical chain is fully confirmed.
///
/// Returns the number of edges purged; 0 when refused.
pub fn purge_stale(graph: &mut LinkGraph, selection: &Selection) -> usize {
    if !selection.valid {
        return 0;
    }
    graph.replace_all(EdgeState::Stale, EdgeState::Absent)
}
