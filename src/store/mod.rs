//! Participant store.
//!
//! Participants are created on first sighting and never removed, only
//! disabled. Iteration is ordered by id so every cycle sees the same order.

pub mod participant;
pub mod snapshot;

pub use participant::{caseless_set_eq, Participant};
pub use snapshot::{Snapshot, SnapshotError, STALE_MARKER};

use crate::chain::ParticipantId;
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantStore {
    participants: BTreeMap<ParticipantId, Participant>,
}

impl ParticipantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a participant, or re-enable a disabled one.
    ///
    /// Returns false if the participant already exists and is active.
    pub fn add_participant(&mut self, id: &ParticipantId, handle: &str) -> bool {
        match self.participants.get_mut(id) {
            Some(existing) if existing.disabled => {
                existing.disabled = false;
                existing.lookup_failed = false;
                info!(
                    participant = %existing.label(),
                    "re-enabled previously disabled participant"
                );
                true
            }
            Some(_) => false,
            None => {
                let participant = Participant::new(id.clone(), handle);
                info!(participant = %participant.label(), "added participant");
                self.participants.insert(id.clone(), participant);
                true
            }
        }
    }

    /// Create the participant with an unknown handle if it doesn't exist yet.
    pub fn ensure(&mut self, id: &ParticipantId) -> &mut Participant {
        self.participants
            .entry(id.clone())
            .or_insert_with(|| Participant::new(id.clone(), ""))
    }

    pub fn insert(&mut self, participant: Participant) {
        self.participants.insert(participant.id.clone(), participant);
    }

    /// Disable an active participant. Returns false if unknown or already disabled.
    pub fn disable_participant(&mut self, id: &ParticipantId) -> bool {
        match self.participants.get_mut(id) {
            Some(participant) if !participant.disabled => {
                participant.disabled = true;
                info!(participant = %participant.label(), "disabled participant");
                true
            }
            _ => false,
        }
    }

    /// Flag a participant whose membership ended so the next cycle rechecks them.
    pub fn mark_departed(&mut self, id: &ParticipantId) -> bool {
        match self.participants.get_mut(id) {
            Some(participant) => {
                participant.lookup_failed = true;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn get_mut(&mut self, id: &ParticipantId) -> Option<&mut Participant> {
        self.participants.get_mut(id)
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.participants.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    /// Participants that are not disabled
    pub fn active(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values().filter(|p| !p.disabled)
    }

    pub fn joined(&self, id: &ParticipantId) -> Option<u64> {
        self.participants.get(id).and_then(|p| p.joined)
    }

    pub fn set_joined(&mut self, id: &ParticipantId, joined: u64) {
        if let Some(participant) = self.participants.get_mut(id) {
            participant.joined = Some(joined);
        }
    }

    /// Give a participant a `joined` timestamp unless it already has one.
    pub fn assign_joined(&mut self, id: &ParticipantId, now: u64) {
        if let Some(participant) = self.participants.get_mut(id) {
            participant.joined.get_or_insert(now);
        }
    }
}
