//! Directed link graph over participants.
//!
//! Each participant's bio names the participant it follows. An edge
//! `linker -> linked` carries a three-valued state:
//! - `Confirmed`: observed in the most recent rebuild
//! - `Stale`: observed before, not reconfirmed this cycle
//! - `Absent`: never linked, or purged
//!
//! The graph keeps a forward index (linker -> linked) and a reverse index
//! (linked -> linker). Both are written only through `set_edge`, so they
//! always agree.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Stable participant identifier (the messaging platform's user id)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// State of a single directed link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EdgeState {
    /// No link here
    #[default]
    Absent,
    /// The link existed in the past but was not seen in the latest rebuild
    Stale,
    /// The link exists right now
    Confirmed,
}

impl EdgeState {
    /// True for any state other than `Absent`
    pub fn is_present(self) -> bool {
        !matches!(self, EdgeState::Absent)
    }
}

type Adjacency = BTreeMap<ParticipantId, BTreeMap<ParticipantId, EdgeState>>;

/// Link graph with forward and reverse views of the same edges
#[derive(Debug, Clone, Default)]
pub struct LinkGraph {
    /// linker -> (linked -> state)
    links_to: Adjacency,
    /// linked -> (linker -> state)
    links_from: Adjacency,
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the edge `src -> dst`, updating both views.
    pub fn set_edge(&mut self, src: &ParticipantId, dst: &ParticipantId, state: EdgeState) {
        self.links_to
            .entry(src.clone())
            .or_default()
            .insert(dst.clone(), state);
        self.links_from
            .entry(dst.clone())
            .or_default()
            .insert(src.clone(), state);
    }

    /// State of `src -> dst` as seen from the linker side. Unset pairs are `Absent`.
    pub fn edge(&self, src: &ParticipantId, dst: &ParticipantId) -> EdgeState {
        self.links_to
            .get(src)
            .and_then(|targets| targets.get(dst))
            .copied()
            .unwrap_or_default()
    }

    /// State of `src -> dst` as seen from the linked side.
    pub fn edge_from(&self, dst: &ParticipantId, src: &ParticipantId) -> EdgeState {
        self.links_from
            .get(dst)
            .and_then(|sources| sources.get(src))
            .copied()
            .unwrap_or_default()
    }

    /// Participants that `src` links to, filtered by edge state.
    pub fn neighbors_from<P>(&self, src: &ParticipantId, predicate: P) -> BTreeSet<ParticipantId>
    where
        P: Fn(EdgeState) -> bool,
    {
        Self::select(self.links_to.get(src), predicate)
    }

    /// Participants that link to `dst`, filtered by edge state.
    pub fn neighbors_into<P>(&self, dst: &ParticipantId, predicate: P) -> BTreeSet<ParticipantId>
    where
        P: Fn(EdgeState) -> bool,
    {
        Self::select(self.links_from.get(dst), predicate)
    }

    fn select<P>(
        row: Option<&BTreeMap<ParticipantId, EdgeState>>,
        predicate: P,
    ) -> BTreeSet<ParticipantId>
    where
        P: Fn(EdgeState) -> bool,
    {
        row.map(|row| {
            row.iter()
                .filter(|(_, state)| predicate(**state))
                .map(|(id, _)| id.clone())
                .collect()
        })
        .unwrap_or_default()
    }

    /// Transition every stored edge in state `from` to state `to`.
    ///
    /// Returns the number of edges changed.
    pub fn replace_all(&mut self, from: EdgeState, to: EdgeState) -> usize {
        if from == to {
            return 0;
        }

        let matching: Vec<(ParticipantId, ParticipantId)> = self
            .links_to
            .iter()
            .flat_map(|(src, targets)| {
                targets
                    .iter()
                    .filter(|(_, state)| **state == from)
                    .map(move |(dst, _)| (src.clone(), dst.clone()))
            })
            .collect();

        for (src, dst) in &matching {
            self.set_edge(src, dst, to);
        }

        matching.len()
    }

    /// True if `node` has at least one outgoing edge in `state`.
    pub fn has_edge_matching(&self, node: &ParticipantId, state: EdgeState) -> bool {
        self.links_to
            .get(node)
            .map(|targets| targets.values().any(|&s| s == state))
            .unwrap_or(false)
    }

    /// All non-`Absent` edges, in linker order.
    pub fn present_edges(
        &self,
    ) -> impl Iterator<Item = (&ParticipantId, &ParticipantId, EdgeState)> {
        self.links_to.iter().flat_map(|(src, targets)| {
            targets
                .iter()
                .filter(|(_, state)| state.is_present())
                .map(move |(dst, &state)| (src, dst, state))
        })
    }

    /// Count edges currently in `state`.
    pub fn count(&self, state: EdgeState) -> usize {
        self.links_to
            .values()
            .flat_map(|targets| targets.values())
            .filter(|&&s| s == state)
            .count()
    }

    /// Check that the forward and reverse views hold identical facts.
    pub fn views_agree(&self) -> bool {
        let forward_count: usize = self.links_to.values().map(BTreeMap::len).sum();
        let reverse_count: usize = self.links_from.values().map(BTreeMap::len).sum();

        forward_count == reverse_count
            && self.links_to.iter().all(|(src, targets)| {
                targets
                    .iter()
                    .all(|(dst, state)| self.edge_from(dst, src) == *state)
            })
    }
}

/// Graphs are equal when they hold the same non-`Absent` edges. An edge
/// explicitly set to `Absent` is indistinguishable from one never set.
impl PartialEq for LinkGraph {
    fn eq(&self, other: &Self) -> bool {
        self.present_edges().eq(other.present_edges())
    }
}

impl Eq for LinkGraph {}
