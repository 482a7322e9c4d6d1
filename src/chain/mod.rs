//! Link graph and canonical chain computation.
//!
//! - `link_graph`: tri-state directed edges with forward/reverse views
//! - `finder`: every maximal simple chain ending at the root
//! - `divergence`: where two chains last agree
//! - `selector`: ranking candidates and picking the canonical chain
//! - `rebuild`: stale/confirm cycle and purge

pub mod divergence;
pub mod finder;
pub mod link_graph;
pub mod rebuild;
pub mod selector;

#[cfg(test)]
mod proptests;

pub use divergence::merge_point;
pub use finder::{find_chains_ending_at, is_well_formed, Chain};
pub use link_graph::{EdgeState, LinkGraph, ParticipantId};
pub use rebuild::{purge_stale, rebuild_links, TranslationTable};
pub use selector::{select_canonical, BranchReport, Selection, Tally};
