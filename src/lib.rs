//! Biochain - Bio Chain-Game Tracker
//!
//! Tracks a chain game played in a messaging group: every participant's bio
//! names the participant before them, and the chain ends at a fixed root.
//!
//! Key principles:
//! - Links are tri-state (confirmed / stale / absent) so a lapse in one
//!   refresh never tears the chain apart on its own
//! - The canonical chain is chosen deterministically from all candidates
//! - The graph is rebuilt only after every due participant has been refreshed

pub mod chain;
pub mod refresh;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod tracker;

pub use chain::{EdgeState, LinkGraph, ParticipantId, Selection};
pub use tracker::{ChainTracker, CycleMode, CycleReport, StepOutcome, TrackerConfig, TrackerError};
