//! Profile source backed by a JSON file.
//!
//! An external fetcher keeps the file current; every lookup re-reads it:
//!
//! ```json
//! { "16507419": { "handle": "bagel", "links": [] },
//!   "2": { "handle": "alice", "links": ["bagel"] } }
//! ```

use super::traits::*;
use crate::chain::ParticipantId;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct ProfileRecord {
    #[serde(default)]
    handle: Option<String>,
    #[serde(default)]
    links: Vec<String>,
}

/// Reads observations from a JSON file on every fetch
#[derive(Debug, Clone)]
pub struct FileProfileSource {
    path: PathBuf,
}

impl FileProfileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_all(&self) -> RefreshResult<HashMap<ParticipantId, ProfileRecord>> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            RefreshError::Transport(format!("{}: {}", self.path.display(), e))
        })?;

        serde_json::from_str(&contents)
            .map_err(|e| RefreshError::Malformed(format!("{}: {}", self.path.display(), e)))
    }
}

#[async_trait]
impl ProfileSource for FileProfileSource {
    async fn fetch(&self, id: &ParticipantId, _handle: &str) -> RefreshResult<ProfileObservation> {
        let mut records = self.read_all().await?;
        let record = records
            .remove(id)
            .ok_or_else(|| RefreshError::NotFound(id.to_string()))?;

        Ok(ProfileObservation {
            handle: record.handle,
            links: record.links,
        })
    }
}
