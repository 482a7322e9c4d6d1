//! Change records produced by a participant refresh.

use crate::chain::{EdgeState, LinkGraph, ParticipantId};
use std::collections::BTreeSet;
use std::fmt;

/// Something observable that changed about a participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// The participant's handle changed (case-insensitively)
    Handle {
        participant: ParticipantId,
        old: String,
        new: String,
    },
    /// The set of handles named in the participant's bio changed
    Links {
        participant: ParticipantId,
        old: Vec<String>,
        new: Vec<String>,
    },
}

impl Change {
    pub fn participant(&self) -> &ParticipantId {
        match self {
            Change::Handle { participant, .. } | Change::Links { participant, .. } => participant,
        }
    }

    /// Participants whose data may be wrong because of this change.
    ///
    /// A new handle breaks links pointing *to* the participant, so everyone
    /// linking to them is rechecked. A new bio changes whom the participant
    /// points at, so everyone they link to is rechecked.
    pub fn dependents(&self, graph: &LinkGraph) -> BTreeSet<ParticipantId> {
        match self {
            Change::Handle { participant, .. } => {
                graph.neighbors_into(participant, EdgeState::is_present)
            }
            Change::Links { participant, .. } => {
                graph.neighbors_from(participant, EdgeState::is_present)
            }
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::Handle {
                participant,
                old,
                new,
            } => write!(f, "handle {}: {:?} -> {:?}", participant, old, new),
            Change::Links {
                participant,
                old,
                new,
            } => write!(f, "links {}: {:?} -> {:?}", participant, old, new),
        }
    }
}
