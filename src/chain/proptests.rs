//! Property-based tests for the chain engine
//!
//! Tests for:
//! - Link graph: forward and reverse views stay in sync
//! - Finder: every chain is simple, ends at the root and cannot be extended
//! - Selector: the canonical chain has the most confirmed links
//! - Rebuild: idempotent for unchanged bios, purge gated on validity
//! - Snapshot: capture then restore reproduces store and graph

use super::*;
use crate::store::{ParticipantStore, Snapshot};
use proptest::prelude::*;

const NODES: u8 = 6;

fn pid(n: u8) -> ParticipantId {
    ParticipantId::new(format!("p{}", n))
}

fn root() -> ParticipantId {
    pid(0)
}

fn state_of(n: u8) -> EdgeState {
    match n % 3 {
        0 => EdgeState::Absent,
        1 => EdgeState::Stale,
        _ => EdgeState::Confirmed,
    }
}

fn edges() -> impl Strategy<Value = Vec<(u8, u8, u8)>> {
    prop::collection::vec((0..NODES, 0..NODES, 0..3u8), 0..20)
}

fn graph_from(edges: &[(u8, u8, u8)]) -> LinkGraph {
    let mut graph = LinkGraph::new();
    for &(src, dst, state) in edges {
        if src != dst {
            graph.set_edge(&pid(src), &pid(dst), state_of(state));
        }
    }
    graph
}

/// Every node gets handle `h<n>` and bio links to the given targets
fn store_from(bios: &[Vec<u8>]) -> ParticipantStore {
    let mut store = ParticipantStore::new();
    for n in 0..NODES {
        store.add_participant(&pid(n), &format!("h{}", n));
    }
    for (n, targets) in bios.iter().enumerate().take(NODES as usize) {
        if let Some(participant) = store.get_mut(&pid(n as u8)) {
            participant.links = targets
                .iter()
                .filter(|&&t| t as usize != n)
                .map(|t| format!("H{}", t))
                .collect();
        }
    }
    store
}

fn valid_selection() -> Selection {
    Selection {
        valid: true,
        ..Selection::default()
    }
}

fn bios() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(0..NODES, 0..3), NODES as usize)
}

// ============================================================================
// GRAPH AND FINDER
// ============================================================================

proptest! {
    /// Property: both adjacency views describe the same edges
    #[test]
    fn views_agree_after_any_edits(edges in edges()) {
        let graph = graph_from(&edges);
        prop_assert!(graph.views_agree());
        for (src, dst, state) in graph.present_edges() {
            prop_assert_eq!(graph.edge_from(dst, src), state);
        }
    }

    /// Property: chains are simple, end at the root, and are maximal
    #[test]
    fn chains_are_well_formed_and_maximal(edges in edges()) {
        let graph = graph_from(&edges);
        let chains = find_chains_ending_at(&graph, &root());

        for chain in &chains {
            prop_assert!(chain.len() > 1);
            prop_assert!(is_well_formed(&graph, chain, &root()));

            let start = &chain[0];
            let extendable = graph
                .neighbors_into(start, EdgeState::is_present)
                .iter()
                .any(|p| !chain.contains(p));
            prop_assert!(!extendable, "chain {:?} could grow further", chain);
        }

        let has_predecessor = !graph.neighbors_into(&root(), EdgeState::is_present).is_empty();
        prop_assert_eq!(chains.is_empty(), !has_predecessor);
    }

    /// Property: no branch has more confirmed links than the canonical chain
    #[test]
    fn canonical_chain_has_most_confirmed_links(edges in edges()) {
        let graph = graph_from(&edges);
        let mut store = store_from(&[]);
        let chains = find_chains_ending_at(&graph, &root());
        let count = chains.len();

        let selection = select_canonical(&graph, &mut store, chains, 100);
        prop_assert_eq!(selection.branches.len(), count.saturating_sub(1));

        let best = Tally::of(&graph, &selection.canonical);
        for branch in &selection.branches {
            prop_assert!(Tally::of(&graph, branch).confirmed <= best.confirmed);
        }
        for id in &selection.canonical {
            prop_assert!(store.joined(id).is_some());
        }
    }

    /// Property: the index pair sits just before the shared tail
    #[test]
    fn merge_point_finds_shared_tail(
        a_len in 1usize..4,
        b_len in 1usize..4,
        shared in 1usize..4,
    ) {
        let tail: Vec<ParticipantId> = (0..shared)
            .map(|k| ParticipantId::new(format!("s{}", k)))
            .collect();
        let a: Vec<ParticipantId> = (0..a_len)
            .map(|k| ParticipantId::new(format!("a{}", k)))
            .chain(tail.iter().cloned())
            .collect();
        let b: Vec<ParticipantId> = (0..b_len)
            .map(|k| ParticipantId::new(format!("b{}", k)))
            .chain(tail.iter().cloned())
            .collect();

        let (i, j) = merge_point(&a, &b);
        prop_assert_eq!((i, j), (a_len - 1, b_len - 1));
        prop_assert_eq!(&a[i + 1..], &b[j + 1..]);
    }
}

// ============================================================================
// REBUILD AND PERSISTENCE
// ============================================================================

proptest! {
    /// Property: rebuilding twice from the same bios changes nothing
    #[test]
    fn rebuild_is_idempotent(edges in edges(), bios in bios()) {
        let store = store_from(&bios);
        let mut graph = graph_from(&edges);

        rebuild_links(&mut graph, &store);
        let once = graph.clone();
        rebuild_links(&mut graph, &store);

        prop_assert_eq!(&graph, &once);
        prop_assert!(graph.views_agree());
    }

    /// Property: every confirmed edge after a rebuild is backed by a bio link
    #[test]
    fn confirmed_edges_come_from_bios(edges in edges(), bios in bios()) {
        let store = store_from(&bios);
        let mut graph = graph_from(&edges);
        let table = rebuild_links(&mut graph, &store);

        for (src, dst, state) in graph.present_edges() {
            if state == EdgeState::Confirmed {
                let backed = store
                    .get(src)
                    .map(|p| p.links.iter().any(|link| table.resolve(link) == Some(dst)))
                    .unwrap_or(false);
                prop_assert!(backed, "{} -> {} has no bio link", src, dst);
            }
        }
    }

    /// Property: purging is refused while the selection is invalid
    #[test]
    fn purge_refused_when_invalid(edges in edges()) {
        let mut graph = graph_from(&edges);
        let before = graph.clone();
        let selection = Selection {
            canonical: vec![pid(1), root()],
            branches: Vec::new(),
            valid: false,
        };

        prop_assert_eq!(purge_stale(&mut graph, &selection), 0);
        prop_assert_eq!(&graph, &before);
    }

    /// Property: a valid purge leaves no stale edges behind
    #[test]
    fn purge_removes_all_stale_when_valid(edges in edges()) {
        let mut graph = graph_from(&edges);
        let stale = graph.count(EdgeState::Stale);
        let confirmed = graph.count(EdgeState::Confirmed);

        prop_assert_eq!(purge_stale(&mut graph, &valid_selection()), stale);
        prop_assert_eq!(graph.count(EdgeState::Stale), 0);
        prop_assert_eq!(graph.count(EdgeState::Confirmed), confirmed);
    }

    /// Property: capture then restore reproduces store and graph
    #[test]
    fn snapshot_roundtrip(
        edges in edges(),
        bios in bios(),
        joined in prop::collection::vec(any::<Option<u32>>(), NODES as usize),
    ) {
        let mut store = store_from(&bios);
        for (n, joined) in joined.iter().enumerate() {
            if let Some(at) = joined {
                store.set_joined(&pid(n as u8), u64::from(*at));
            }
        }
        let graph = graph_from(&edges);

        let json = Snapshot::capture(&store, &graph).to_json().unwrap();
        let (restored_store, restored_graph) =
            Snapshot::from_json(&json).unwrap().restore().unwrap();

        prop_assert_eq!(restored_store, store);
        prop_assert_eq!(restored_graph, graph);
    }
}
