//! Flat-file snapshot of participants and their outbound links.
//!
//! JSON object keyed by participant id. Each participant lists its
//! non-`Absent` outbound edges under `links_to`; a `Stale` target carries a
//! leading `!`. Default-valued fields are omitted, so a snapshot written by
//! an older version loads unchanged.

use super::{Participant, ParticipantStore};
use crate::chain::{EdgeState, LinkGraph, ParticipantId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Prefix marking a `Stale` edge target
pub const STALE_MARKER: char = '!';

/// Snapshot errors. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Failed to read snapshot '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write snapshot '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid snapshot JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Malformed snapshot: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ParticipantRecord {
    username: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    bio: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    joined: Option<u64>,

    #[serde(default, skip_serializing_if = "is_zero")]
    expires: u64,

    #[serde(default, skip_serializing_if = "is_false")]
    disabled: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    links_to: Vec<String>,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Serializable view of the whole game state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    participants: BTreeMap<ParticipantId, ParticipantRecord>,
}

impl Snapshot {
    /// Capture the store and the graph's `Confirmed`/`Stale` edges.
    pub fn capture(store: &ParticipantStore, graph: &LinkGraph) -> Self {
        let mut participants: BTreeMap<ParticipantId, ParticipantRecord> = store
            .iter()
            .map(|p| {
                (
                    p.id.clone(),
                    ParticipantRecord {
                        username: p.handle.clone(),
                        bio: p.links.clone(),
                        joined: p.joined,
                        expires: p.next_refresh_at,
                        disabled: p.disabled,
                        links_to: Vec::new(),
                    },
                )
            })
            .collect();

        for (src, dst, state) in graph.present_edges() {
            let target = match state {
                EdgeState::Stale => format!("{}{}", STALE_MARKER, dst),
                _ => dst.to_string(),
            };
            // Edges from ids missing in the store get a placeholder record so
            // no edge is lost on save.
            participants
                .entry(src.clone())
                .or_insert_with(|| ParticipantRecord {
                    username: String::new(),
                    bio: Vec::new(),
                    joined: None,
                    expires: 0,
                    disabled: false,
                    links_to: Vec::new(),
                })
                .links_to
                .push(target);
        }

        Self { participants }
    }

    /// Rebuild the store and graph this snapshot describes.
    pub fn restore(&self) -> Result<(ParticipantStore, LinkGraph), SnapshotError> {
        let mut store = ParticipantStore::new();
        let mut graph = LinkGraph::new();

        for (id, record) in &self.participants {
            if id.as_str().is_empty() {
                return Err(SnapshotError::Malformed("empty participant id".to_string()));
            }
            if id.as_str().starts_with(STALE_MARKER) {
                return Err(SnapshotError::Malformed(format!(
                    "participant id {} starts with {:?}",
                    id, STALE_MARKER
                )));
            }

            let mut participant = Participant::new(id.clone(), record.username.clone());
            participant.links = record.bio.clone();
            participant.joined = record.joined;
            participant.next_refresh_at = record.expires;
            participant.disabled = record.disabled;
            store.insert(participant);

            for raw in &record.links_to {
                let (target, state) = match raw.strip_prefix(STALE_MARKER) {
                    Some(target) => (target, EdgeState::Stale),
                    None => (raw.as_str(), EdgeState::Confirmed),
                };
                if target.is_empty() {
                    return Err(SnapshotError::Malformed(format!(
                        "empty link target on participant {}",
                        id
                    )));
                }
                if target.starts_with(STALE_MARKER) {
                    return Err(SnapshotError::Malformed(format!(
                        "link target {:?} on participant {} starts with {:?}",
                        raw, id, STALE_MARKER
                    )));
                }
                graph.set_edge(id, &ParticipantId::from(target), state);
            }
        }

        Ok((store, graph))
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Load a snapshot file. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let contents = fs::read_to_string(path).map_err(|source| SnapshotError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Write the snapshot next to `path` and rename it into place.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let write_err = |source| SnapshotError::Write {
            path: path.to_path_buf(),
            source,
        };

        let json = self.to_json()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }

        let mut tmp_name = path.as_os_str().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let mut file = fs::File::create(&tmp_path).map_err(write_err)?;
        file.write_all(json.as_bytes()).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        drop(file);

        fs::rename(&tmp_path, path).map_err(write_err)?;
        Ok(())
    }
}
