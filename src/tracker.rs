//! Chain tracker: participants, link graph and the canonical chain.
//!
//! One cycle refreshes due participants one at a time until none are due,
//! then rebuilds the graph from the collected bios and recomputes the
//! canonical chain. The two phases are explicit modes so the service loop
//! can stop cleanly between steps.

use crate::chain::{
    find_chains_ending_at, purge_stale, rebuild_links, select_canonical, BranchReport, LinkGraph,
    ParticipantId, Selection,
};
use crate::refresh::{refresh_participant, ProfileSource};
use crate::scheduler::{
    Change, ExpiryScheduler, DEFAULT_BACKLOG_WARNING, DEFAULT_REFRESH_INTERVAL,
};
use crate::store::{ParticipantStore, Snapshot, SnapshotError};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Tracker errors
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Game parameters passed in by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Participant every canonical chain ends at
    pub root: ParticipantId,
    /// Seconds between refreshes of the same participant
    pub refresh_interval: u64,
    /// Due-count at which a backlog warning is logged (0 disables it)
    pub backlog_warning: usize,
}

impl TrackerConfig {
    pub fn new(root: ParticipantId) -> Self {
        Self {
            root,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            backlog_warning: DEFAULT_BACKLOG_WARNING,
        }
    }
}

/// Which half of the cycle the tracker is in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleMode {
    /// Refreshing due participants
    Draining,
    /// Nothing is due; the next step rebuilds and reselects
    Recomputing,
}

/// Summary of one rebuild + selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Change records collected since the previous recompute
    pub changes: Vec<Change>,
    pub previous_head: Option<ParticipantId>,
    pub head: Option<ParticipantId>,
    pub chain_len: usize,
    pub unbroken_len: usize,
    pub branches: usize,
    pub valid: bool,
    /// Branch members that should relink, computed before the purge
    pub branch_reports: Vec<BranchReport>,
    /// Participants disabled because their lookup failed off-chain
    pub disabled: Vec<ParticipantId>,
    /// Stale edges dropped
    pub purged: usize,
}

impl CycleReport {
    pub fn head_changed(&self) -> bool {
        self.previous_head != self.head
    }
}

/// What a single step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// One participant was refreshed
    Refreshed {
        participant: ParticipantId,
        changes: Vec<Change>,
        forced: BTreeSet<ParticipantId>,
    },
    /// Nothing is due any more; the next step recomputes
    Drained,
    /// The graph was rebuilt and the canonical chain recomputed
    Recomputed(CycleReport),
    /// Nothing to do until a deadline passes
    Idle,
}

pub struct ChainTracker {
    config: TrackerConfig,
    store: ParticipantStore,
    graph: LinkGraph,
    scheduler: ExpiryScheduler,
    selection: Selection,
    mode: CycleMode,
    pending: Vec<Change>,
    computed: bool,
    dirty: bool,
}

impl ChainTracker {
    /// Start with an empty game holding only the root.
    pub fn new(config: TrackerConfig) -> Self {
        Self::with_state(config, ParticipantStore::new(), LinkGraph::new())
    }

    /// Start from a persisted snapshot.
    pub fn from_snapshot(config: TrackerConfig, snapshot: &Snapshot) -> Result<Self, TrackerError> {
        let (store, graph) = snapshot.restore()?;
        Ok(Self::with_state(config, store, graph))
    }

    /// Load a snapshot file. Missing or malformed files are errors.
    pub fn load(config: TrackerConfig, path: &Path) -> Result<Self, TrackerError> {
        let snapshot = Snapshot::load(path)?;
        let tracker = Self::from_snapshot(config, &snapshot)?;
        info!(
            path = %path.display(),
            participants = tracker.store.len(),
            "loaded snapshot"
        );
        Ok(tracker)
    }

    fn with_state(config: TrackerConfig, mut store: ParticipantStore, graph: LinkGraph) -> Self {
        let dirty = !store.contains(&config.root);
        store.ensure(&config.root);

        let scheduler = ExpiryScheduler::new(config.refresh_interval, config.backlog_warning);
        Self {
            config,
            store,
            graph,
            scheduler,
            selection: Selection::default(),
            mode: CycleMode::Draining,
            pending: Vec::new(),
            computed: false,
            dirty,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn store(&self) -> &ParticipantStore {
        &self.store
    }

    pub fn graph(&self) -> &LinkGraph {
        &self.graph
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn mode(&self) -> CycleMode {
        self.mode
    }

    /// Change records not yet folded into a recompute
    pub fn pending_changes(&self) -> &[Change] {
        &self.pending
    }

    pub fn head(&self) -> Option<&ParticipantId> {
        self.selection.head(&self.store)
    }

    pub fn branch_reports(&self) -> Vec<BranchReport> {
        self.selection.branch_reports(&self.graph, &self.store)
    }

    /// True if state changed since the last save
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.store, &self.graph)
    }

    pub fn save(&mut self, path: &Path) -> Result<(), TrackerError> {
        self.snapshot().save(path)?;
        self.dirty = false;
        debug!(path = %path.display(), "saved snapshot");
        Ok(())
    }

    /// A participant joined (or spoke in) the group.
    pub fn add_participant(&mut self, id: &ParticipantId, handle: &str) -> bool {
        let added = self.store.add_participant(id, handle);
        self.dirty |= added;
        added
    }

    /// A participant left the group; they are rechecked next recompute.
    pub fn mark_departed(&mut self, id: &ParticipantId) -> bool {
        self.store.mark_departed(id)
    }

    fn needs_recompute(&self) -> bool {
        !self.computed || !self.pending.is_empty()
    }

    /// Advance the cycle by one step.
    pub async fn step<S>(&mut self, source: &S, now: u64) -> StepOutcome
    where
        S: ProfileSource + ?Sized,
    {
        if let Some(id) = self.scheduler.pick_next_due(&self.store, now) {
            // Anything due goes first, even if a recompute was queued
            self.mode = CycleMode::Draining;
            return self.refresh(source, id, now).await;
        }

        match self.mode {
            CycleMode::Draining if self.needs_recompute() => {
                self.mode = CycleMode::Recomputing;
                StepOutcome::Drained
            }
            CycleMode::Draining => StepOutcome::Idle,
            CycleMode::Recomputing => {
                self.mode = CycleMode::Draining;
                StepOutcome::Recomputed(self.recompute(now))
            }
        }
    }

    async fn refresh<S>(&mut self, source: &S, id: ParticipantId, now: u64) -> StepOutcome
    where
        S: ProfileSource + ?Sized,
    {
        if let Some(participant) = self.store.get(&id) {
            info!(participant = %participant.label(), "refreshing");
        }

        let changes = refresh_participant(&mut self.store, source, &id).await;
        for change in &changes {
            info!(change = %change, "participant changed");
        }
        self.scheduler.reset(&mut self.store, &id, now);
        let forced = self
            .scheduler
            .on_refresh_result(&mut self.store, &self.graph, &changes);

        if !changes.is_empty() {
            self.dirty = true;
            self.pending.extend(changes.iter().cloned());
        }

        StepOutcome::Refreshed {
            participant: id,
            changes,
            forced,
        }
    }

    /// Rebuild links and reselect the canonical chain without tidying up.
    ///
    /// Used at startup and for offline inspection: nobody is disabled, no
    /// stale edge is purged and pending changes stay queued for the next
    /// recompute.
    pub fn select(&mut self, now: u64) -> CycleReport {
        self.reselect(now, false)
    }

    /// Rebuild links, reselect the canonical chain and tidy up.
    ///
    /// Callers normally reach this through `step` once every due
    /// participant has been refreshed.
    pub fn recompute(&mut self, now: u64) -> CycleReport {
        self.reselect(now, true)
    }

    fn reselect(&mut self, now: u64, tidy: bool) -> CycleReport {
        let previous_head = if self.computed {
            self.head().cloned()
        } else {
            None
        };

        rebuild_links(&mut self.graph, &self.store);
        let chains = find_chains_ending_at(&self.graph, &self.config.root);
        self.selection = select_canonical(&self.graph, &mut self.store, chains, now);
        let branch_reports = self.branch_reports();

        let (changes, disabled, purged) = if tidy {
            let disabled = self.disable_failed_off_chain();
            let purged = purge_stale(&mut self.graph, &self.selection);
            (std::mem::take(&mut self.pending), disabled, purged)
        } else {
            (Vec::new(), Vec::new(), 0)
        };

        self.computed = true;
        self.dirty = true;

        let report = CycleReport {
            changes,
            previous_head,
            head: self.head().cloned(),
            chain_len: self.selection.canonical.len(),
            unbroken_len: self.selection.unbroken_len(&self.graph),
            branches: self.selection.branches.len(),
            valid: self.selection.valid,
            branch_reports,
            disabled,
            purged,
        };

        info!(
            chain_len = report.chain_len,
            unbroken = report.unbroken_len,
            branches = report.branches,
            valid = report.valid,
            purged = report.purged,
            tidy,
            "recomputed canonical chain"
        );

        report
    }

    /// Disable participants whose lookup failed and who are off the chain
    fn disable_failed_off_chain(&mut self) -> Vec<ParticipantId> {
        let disabled: Vec<ParticipantId> = self
            .store
            .active()
            .filter(|p| p.lookup_failed)
            .filter(|p| p.id != self.config.root && !self.selection.contains(&p.id))
            .map(|p| p.id.clone())
            .collect();
        for id in &disabled {
            self.store.disable_participant(id);
        }
        disabled
    }
}
