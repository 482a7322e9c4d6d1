//! Participant refresh.
//!
//! Fetches a participant's current handle and bio links through a
//! `ProfileSource`, applies them to the store and reports what changed.
//! Lookup failures flag the participant and leave its data untouched.

pub mod file_source;
pub mod mock;
pub mod traits;

pub use file_source::FileProfileSource;
pub use mock::MockProfileSource;
pub use traits::{ProfileObservation, ProfileSource, RefreshError, RefreshResult};

use crate::chain::ParticipantId;
use crate::scheduler::Change;
use crate::store::{caseless_set_eq, Participant, ParticipantStore};
use std::collections::HashSet;
use tracing::{info, warn};

/// Refresh one participant and return the resulting change records.
///
/// Unknown ids produce no changes.
pub async fn refresh_participant<S>(
    store: &mut ParticipantStore,
    source: &S,
    id: &ParticipantId,
) -> Vec<Change>
where
    S: ProfileSource + ?Sized,
{
    let Some(current_handle) = store.get(id).map(|p| p.handle.clone()) else {
        return Vec::new();
    };

    let result = source.fetch(id, &current_handle).await;

    let Some(participant) = store.get_mut(id) else {
        return Vec::new();
    };

    match result {
        Ok(observation) => {
            participant.lookup_failed = false;
            apply_observation(participant, observation)
        }
        Err(e) => {
            participant.lookup_failed = true;
            warn!(participant = %participant.label(), error = %e, "profile lookup failed");
            Vec::new()
        }
    }
}

/// Apply an observation to a participant, returning the changes it made.
pub fn apply_observation(
    participant: &mut Participant,
    observation: ProfileObservation,
) -> Vec<Change> {
    let mut changes = Vec::new();

    if let Some(new_handle) = observation.handle {
        if new_handle != participant.handle {
            if new_handle.to_lowercase() != participant.handle.to_lowercase() {
                info!(
                    participant = %participant.id,
                    old = %participant.handle,
                    new = %new_handle,
                    "handle changed"
                );
                changes.push(Change::Handle {
                    participant: participant.id.clone(),
                    old: participant.handle.clone(),
                    new: new_handle.clone(),
                });
            }
            participant.handle = new_handle;
        }
    }

    let links = normalize_links(&observation.links, &participant.handle);
    if !caseless_set_eq(&links, &participant.links) {
        info!(
            participant = %participant.id,
            old = ?participant.links,
            new = ?links,
            "bio links changed"
        );
        changes.push(Change::Links {
            participant: participant.id.clone(),
            old: std::mem::replace(&mut participant.links, links.clone()),
            new: links,
        });
    }

    changes
}

/// De-duplicate handles case-insensitively (first spelling wins), strip `@`,
/// and drop references to the participant's own handle.
pub fn normalize_links(raw: &[String], own_handle: &str) -> Vec<String> {
    let own = own_handle.to_lowercase();
    let mut seen = HashSet::new();

    raw.iter()
        .map(|link| link.strip_prefix('@').unwrap_or(link))
        .filter(|link| !link.is_empty())
        .filter(|link| link.to_lowercase() != own)
        .filter(|link| seen.insert(link.to_lowercase()))
        .map(str::to_string)
        .collect()
}
