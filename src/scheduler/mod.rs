//! Expiry-driven refresh scheduling.
//!
//! Each participant carries a `next_refresh_at` deadline. Once the deadline
//! passes the participant is due; after a refresh it gets a fresh deadline one
//! interval ahead. A refresh that reports changes forces the affected graph
//! neighbours to be due immediately.

pub mod changes;

pub use changes::Change;

use crate::chain::{LinkGraph, ParticipantId};
use crate::store::ParticipantStore;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Deadline that is always in the past
pub const FORCED_DEADLINE: u64 = 0;

/// Default refresh interval, in seconds
pub const DEFAULT_REFRESH_INTERVAL: u64 = 60;

/// Default due-count at which a backlog warning is logged
pub const DEFAULT_BACKLOG_WARNING: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryScheduler {
    refresh_interval: u64,
    backlog_warning: usize,
}

impl Default for ExpiryScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_INTERVAL, DEFAULT_BACKLOG_WARNING)
    }
}

impl ExpiryScheduler {
    pub fn new(refresh_interval: u64, backlog_warning: usize) -> Self {
        Self {
            refresh_interval,
            backlog_warning,
        }
    }

    pub fn refresh_interval(&self) -> u64 {
        self.refresh_interval
    }

    /// Number of non-disabled participants currently due
    pub fn due_count(&self, store: &ParticipantStore, now: u64) -> usize {
        store.active().filter(|p| p.is_due(now)).count()
    }

    /// The most overdue non-disabled participant, if any is due.
    ///
    /// Ties between equal deadlines resolve in store order; callers must not
    /// rely on which one comes first.
    pub fn pick_next_due(&self, store: &ParticipantStore, now: u64) -> Option<ParticipantId> {
        let mut due = 0;
        let mut next: Option<(&ParticipantId, u64)> = None;

        for participant in store.active().filter(|p| p.is_due(now)) {
            due += 1;
            match next {
                Some((_, deadline)) if deadline <= participant.next_refresh_at => {}
                _ => next = Some((&participant.id, participant.next_refresh_at)),
            }
        }

        if self.backlog_warning > 0 && due >= self.backlog_warning {
            warn!(due, "participants waiting for a refresh");
        }

        next.map(|(id, _)| id.clone())
    }

    /// Give a participant its next deadline after a refresh.
    pub fn reset(&self, store: &mut ParticipantStore, id: &ParticipantId, now: u64) {
        if let Some(participant) = store.get_mut(id) {
            participant.next_refresh_at = now.saturating_add(self.refresh_interval);
        }
    }

    /// Force every dependent of `changes` to be due on the next scan.
    ///
    /// Returns the participants that were forced.
    pub fn on_refresh_result(
        &self,
        store: &mut ParticipantStore,
        graph: &LinkGraph,
        changes: &[Change],
    ) -> BTreeSet<ParticipantId> {
        let mut forced = BTreeSet::new();

        for change in changes {
            for dependent in change.dependents(graph) {
                if let Some(participant) = store.get_mut(&dependent) {
                    participant.next_refresh_at = FORCED_DEADLINE;
                    debug!(participant = %participant.label(), "marked for refresh");
                    forced.insert(dependent);
                }
            }
        }

        forced
    }
}
