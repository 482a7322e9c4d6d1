//! Profile lookup abstraction.
//!
//! The tracker never talks to the messaging platform directly. A
//! `ProfileSource` answers "what is this participant's handle and whom does
//! their bio name right now"; `MockProfileSource` replaces it in tests.

use crate::chain::ParticipantId;
use async_trait::async_trait;

/// What a lookup observed about one participant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileObservation {
    /// Current handle. `None` keeps the stored one; `Some("")` means the
    /// participant removed theirs.
    pub handle: Option<String>,
    /// Raw handles named in the bio, in the order they appear
    pub links: Vec<String>,
}

impl ProfileObservation {
    pub fn new(handle: impl Into<String>, links: &[&str]) -> Self {
        Self {
            handle: Some(handle.into()),
            links: links.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Result type for profile lookups
pub type RefreshResult<T> = Result<T, RefreshError>;

/// Profile lookup errors. None of them abort a cycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("Lookup timed out")]
    Timeout,

    #[error("Participant not found: {0}")]
    NotFound(String),

    #[error("Participant left the group: {0}")]
    Departed(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed profile: {0}")]
    Malformed(String),
}

/// Source of fresh profile data
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Look up `id`. `handle` is the currently stored handle (possibly empty),
    /// for sources that address profiles by handle.
    async fn fetch(&self, id: &ParticipantId, handle: &str) -> RefreshResult<ProfileObservation>;
}
