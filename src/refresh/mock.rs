//! Mock profile source for testing

use super::traits::*;
use crate::chain::ParticipantId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory profile source with scripted answers
#[derive(Clone, Default)]
pub struct MockProfileSource {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    profiles: HashMap<ParticipantId, ProfileObservation>,
    failures: HashMap<ParticipantId, RefreshError>,
    lookups: Vec<ParticipantId>,
}

impl MockProfileSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the profile returned for `id`
    pub fn set_profile(&self, id: &ParticipantId, handle: &str, links: &[&str]) {
        let mut state = self.state.lock().unwrap();
        state.failures.remove(id);
        state
            .profiles
            .insert(id.clone(), ProfileObservation::new(handle, links));
    }

    /// Make every lookup of `id` fail with `error`
    pub fn set_failure(&self, id: &ParticipantId, error: RefreshError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(id.clone(), error);
    }

    /// Ids looked up so far, in order
    pub fn lookups(&self) -> Vec<ParticipantId> {
        self.state.lock().unwrap().lookups.clone()
    }
}

#[async_trait]
impl ProfileSource for MockProfileSource {
    async fn fetch(&self, id: &ParticipantId, _handle: &str) -> RefreshResult<ProfileObservation> {
        let mut state = self.state.lock().unwrap();
        state.lookups.push(id.clone());

        if let Some(error) = state.failures.get(id) {
            return Err(error.clone());
        }

        state
            .profiles
            .get(id)
            .cloned()
            .ok_or_else(|| RefreshError::NotFound(id.to_string()))
    }
}
