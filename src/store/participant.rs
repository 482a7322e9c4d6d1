//! A single chain-game participant.

use crate::chain::ParticipantId;
use std::fmt;

/// Participant as tracked by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    /// Display handle without the leading `@`. Empty when unknown.
    pub handle: String,
    /// Raw handles currently named in the participant's bio, unresolved
    pub links: Vec<String>,
    /// First time the participant appeared on the canonical chain
    pub joined: Option<u64>,
    /// Deadline after which the participant is due for a refresh
    pub next_refresh_at: u64,
    pub disabled: bool,
    /// Set when the last profile lookup failed. Never persisted.
    pub lookup_failed: bool,
}

impl Participant {
    pub fn new(id: ParticipantId, handle: impl Into<String>) -> Self {
        Self {
            id,
            handle: handle.into(),
            links: Vec::new(),
            joined: None,
            next_refresh_at: 0,
            disabled: false,
            lookup_failed: false,
        }
    }

    /// Known handle, if any
    pub fn handle(&self) -> Option<&str> {
        if self.handle.is_empty() {
            None
        } else {
            Some(&self.handle)
        }
    }

    pub fn is_due(&self, now: u64) -> bool {
        now >= self.next_refresh_at
    }

    /// Handle with the id appended, for log lines
    pub fn label(&self) -> String {
        match self.handle() {
            Some(handle) => format!("@{} [{}]", handle, self.id),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.handle() {
            Some(handle) => write!(f, "@{}", handle),
            None => write!(f, "id:{}", self.id),
        }
    }
}

/// Case-insensitive set equality over handle lists.
pub fn caseless_set_eq(a: &[String], b: &[String]) -> bool {
    use std::collections::HashSet;

    let left: HashSet<String> = a.iter().map(|s| s.to_lowercase()).collect();
    let right: HashSet<String> = b.iter().map(|s| s.to_lowercase()).collect();
    left == right
}
