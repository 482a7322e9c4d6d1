//! Canonical chain selection.
//!
//! Candidates are ranked by the states of the edges along them:
//! 1. more `Confirmed` edges wins
//! 2. then fewer `Stale` edges wins
//! 3. then the chain whose participant just before the divergence point
//!    joined earlier wins (unset `joined` counts as 0)
//!
//! Everyone on the winning chain without a `joined` timestamp gets one.

use super::divergence::merge_point;
use super::finder::Chain;
use super::link_graph::{EdgeState, LinkGraph, ParticipantId};
use crate::store::ParticipantStore;

/// Edge-state counts along a chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub confirmed: usize,
    pub stale: usize,
}

impl Tally {
    pub fn of(graph: &LinkGraph, chain: &[ParticipantId]) -> Self {
        let mut tally = Tally::default();
        for pair in chain.windows(2) {
            match graph.edge(&pair[0], &pair[1]) {
                EdgeState::Confirmed => tally.confirmed += 1,
                EdgeState::Stale => tally.stale += 1,
                EdgeState::Absent => {}
            }
        }
        tally
    }
}

/// Result of one selection pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// The chain treated as authoritative (empty if none was found)
    pub canonical: Chain,
    /// Every other discovered chain
    pub branches: Vec<Chain>,
    /// True iff every edge on `canonical` is `Confirmed`
    pub valid: bool,
}

/// A branch member that should relink to the current head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchReport {
    /// Participant just before the point where the branch rejoins
    pub member: ParticipantId,
    /// Whom they should link to
    pub should_link_to: ParticipantId,
    /// Whom they currently link to
    pub instead_of: ParticipantId,
}

/// Pick the canonical chain among `chains`.
///
/// An empty candidate list yields an empty, valid selection.
pub fn select_canonical(
    graph: &LinkGraph,
    store: &mut ParticipantStore,
    mut chains: Vec<Chain>,
    now: u64,
) -> Selection {
    if chains.is_empty() {
        return Selection {
            canonical: Vec::new(),
            branches: Vec::new(),
            valid: true,
        };
    }

    let mut best_index = 0;
    let mut best_tally = Tally::of(graph, &chains[0]);

    for (index, contender) in chains.iter().enumerate().skip(1) {
        let tally = Tally::of(graph, contender);

        let wins = if tally.confirmed != best_tally.confirmed {
            tally.confirmed > best_tally.confirmed
        } else if tally.stale != best_tally.stale {
            tally.stale < best_tally.stale
        } else {
            let best = &chains[best_index];
            let (best_at, contender_at) = merge_point(best, contender);
            let best_joined = store.joined(&best[best_at]).unwrap_or(0);
            let contender_joined = store.joined(&contender[contender_at]).unwrap_or(0);
            contender_joined < best_joined
        };

        if wins {
            best_index = index;
            best_tally = tally;
        }
    }

    let canonical = chains.remove(best_index);

    for id in &canonical {
        store.assign_joined(id, now);
    }

    let valid = best_tally.stale == 0 && best_tally.confirmed + 1 == canonical.len();

    Selection {
        canonical,
        branches: chains,
        valid,
    }
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.canonical.contains(id)
    }

    /// First participant on the canonical chain with a known handle.
    pub fn head<'a>(&'a self, store: &ParticipantStore) -> Option<&'a ParticipantId> {
        self.canonical
            .iter()
            .find(|id| store.get(id).and_then(|p| p.handle()).is_some())
    }

    /// Length of the trailing run of the canonical chain joined by `Confirmed` edges.
    ///
    /// Counts participants, so a lone confirmed hop into the root is 2.
    pub fn unbroken_len(&self, graph: &LinkGraph) -> usize {
        if self.canonical.is_empty() {
            return 0;
        }

        1 + self
            .canonical
            .windows(2)
            .rev()
            .take_while(|pair| graph.edge(&pair[0], &pair[1]) == EdgeState::Confirmed)
            .count()
    }

    /// Branch members that should link to the head instead of where they point now.
    ///
    /// Members already on the canonical chain and members whose outgoing
    /// edge is `Stale` are skipped. After each report, the branch's first
    /// participant becomes the head suggested to the next one.
    pub fn branch_reports(&self, graph: &LinkGraph, store: &ParticipantStore) -> Vec<BranchReport> {
        let Some(mut head) = self.head(store).cloned() else {
            return Vec::new();
        };

        let mut reports = Vec::new();
        for branch in &self.branches {
            let (_, merger) = merge_point(&self.canonical, branch);
            let (Some(member), Some(target)) = (branch.get(merger), branch.get(merger + 1)) else {
                continue;
            };

            if self.contains(member) {
                continue;
            }
            if graph.edge(member, target) == EdgeState::Stale {
                continue;
            }

            reports.push(BranchReport {
                member: member.clone(),
                should_link_to: head.clone(),
                instead_of: target.clone(),
            });

            head = branch[0].clone();
        }

        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::finder::find_chains_ending_at;

    fn id(s: &str) -> ParticipantId {
        ParticipantId::from(s)
    }

    fn chain(ids: &[&str]) -> Chain {
        ids.iter().map(|s| id(s)).collect()
    }

    fn store_with(ids: &[&str]) -> ParticipantStore {
        let mut store = ParticipantStore::new();
        for name in ids {
            store.add_participant(&id(name), name);
        }
        store
    }

    fn link(graph: &mut LinkGraph, src: &str, dst: &str, state: EdgeState) {
        graph.set_edge(&id(src), &id(dst), state);
    }

    #[test]
    fn test_tally_counts_states() {
        let mut graph = LinkGraph::new();
        link(&mut graph, "a", "b", EdgeState::Confirmed);
        link(&mut graph, "b", "c", EdgeState::Stale);
        link(&mut graph, "c", "root", EdgeState::Confirmed);

        let tally = Tally::of(&graph, &chain(&["a", "b", "c", "root"]));
        assert_eq!(
            tally,
            Tally {
                confirmed: 2,
                stale: 1
            }
        );
    }

    #[test]
    fn test_empty_candidates_are_valid() {
        let graph = LinkGraph::new();
        let mut store = ParticipantStore::new();

        let selection = select_canonical(&graph, &mut store, Vec::new(), 10);
        assert!(selection.is_empty());
        assert!(selection.valid);
        assert!(selection.branches.is_empty());
    }

    #[test]
    fn test_more_confirmed_wins() {
        let mut graph = LinkGraph::new();
        link(&mut graph, "a", "b", EdgeState::Confirmed);
        link(&mut graph, "b", "c", EdgeState::Confirmed);
        link(&mut graph, "c", "root", EdgeState::Confirmed);
        link(&mut graph, "d", "c", EdgeState::Confirmed);
        let mut store = store_with(&["a", "b", "c", "d", "root"]);

        let chains = vec![chain(&["d", "c", "root"]), chain(&["a", "b", "c", "root"])];
        let selection = select_canonical(&graph, &mut store, chains, 100);

        assert_eq!(selection.canonical, chain(&["a", "b", "c", "root"]));
        assert_eq!(selection.branches, vec![chain(&["d", "c", "root"])]);
        assert!(selection.valid);
    }

    #[test]
    fn test_fewer_stale_wins_on_equal_confirmed() {
        let mut graph = LinkGraph::new();
        link(&mut graph, "a", "b", EdgeState::Stale);
        link(&mut graph, "b", "root", EdgeState::Confirmed);
        link(&mut graph, "c", "root", EdgeState::Confirmed);
        let mut store = store_with(&["a", "b", "c", "root"]);

        let chains = vec![chain(&["a", "b", "root"]), chain(&["c", "root"])];
        let selection = select_canonical(&graph, &mut store, chains, 100);

        assert_eq!(selection.canonical, chain(&["c", "root"]));
        assert!(selection.valid);
    }

    #[test]
    fn test_seniority_breaks_full_tie() {
        let mut graph = LinkGraph::new();
        link(&mut graph, "p", "x", EdgeState::Confirmed);
        link(&mut graph, "q", "x", EdgeState::Confirmed);
        link(&mut graph, "x", "root", EdgeState::Confirmed);
        let mut store = store_with(&["p", "q", "x", "root"]);
        store.set_joined(&id("p"), 100);
        store.set_joined(&id("q"), 50);

        let chains = vec![chain(&["p", "x", "root"]), chain(&["q", "x", "root"])];
        let selection = select_canonical(&graph, &mut store, chains, 500);

        assert_eq!(selection.canonical, chain(&["q", "x", "root"]));
        assert_eq!(selection.branches, vec![chain(&["p", "x", "root"])]);
    }

    #[test]
    fn test_unset_joined_counts_as_most_senior() {
        let mut graph = LinkGraph::new();
        link(&mut graph, "p", "root", EdgeState::Confirmed);
        link(&mut graph, "q", "root", EdgeState::Confirmed);
        let mut store = store_with(&["p", "q", "root"]);
        store.set_joined(&id("p"), 100);

        let chains = vec![chain(&["p", "root"]), chain(&["q", "root"])];
        let selection = select_canonical(&graph, &mut store, chains, 500);

        assert_eq!(selection.canonical, chain(&["q", "root"]));
        // q had no timestamp and now joins at selection time
        assert_eq!(store.joined(&id("q")), Some(500));
        assert_eq!(store.joined(&id("p")), Some(100));
    }

    #[test]
    fn test_equal_seniority_keeps_first() {
        let mut graph = LinkGraph::new();
        link(&mut graph, "p", "root", EdgeState::Confirmed);
        link(&mut graph, "q", "root", EdgeState::Confirmed);
        let mut store = store_with(&["p", "q", "root"]);

        let chains = vec![chain(&["p", "root"]), chain(&["q", "root"])];
        let selection = select_canonical(&graph, &mut store, chains, 500);

        assert_eq!(selection.canonical, chain(&["p", "root"]));
    }

    #[test]
    fn test_joined_is_permanent() {
        let mut graph = LinkGraph::new();
        link(&mut graph, "a", "root", EdgeState::Confirmed);
        let mut store = store_with(&["a", "root"]);

        select_canonical(&graph, &mut store, vec![chain(&["a", "root"])], 10);
        select_canonical(&graph, &mut store, vec![chain(&["a", "root"])], 99);

        assert_eq!(store.joined(&id("a")), Some(10));
        assert_eq!(store.joined(&id("root")), Some(10));
    }

    #[test]
    fn test_stale_edge_invalidates_selection() {
        let mut graph = LinkGraph::new();
        link(&mut graph, "a", "b", EdgeState::Confirmed);
        link(&mut graph, "b", "root", EdgeState::Stale);
        let mut store = store_with(&["a", "b", "root"]);

        let selection = select_canonical(&graph, &mut store, vec![chain(&["a", "b", "root"])], 1);
        assert!(!selection.valid);
        assert_eq!(selection.unbroken_len(&graph), 1);
    }

    #[test]
    fn test_unbroken_len_counts_trailing_confirmed() {
        let mut graph = LinkGraph::new();
        link(&mut graph, "a", "b", EdgeState::Confirmed);
        link(&mut graph, "b", "c", EdgeState::Stale);
        link(&mut graph, "c", "d", EdgeState::Confirmed);
        link(&mut graph, "d", "root", EdgeState::Confirmed);

        let selection = Selection {
            canonical: chain(&["a", "b", "c", "d", "root"]),
            branches: Vec::new(),
            valid: false,
        };
        assert_eq!(selection.unbroken_len(&graph), 3);
    }

    #[test]
    fn test_head_skips_participants_without_handle() {
        let mut store = store_with(&["b", "root"]);
        store.add_participant(&id("a"), "");

        let selection = Selection {
            canonical: chain(&["a", "b", "root"]),
            branches: Vec::new(),
            valid: true,
        };
        assert_eq!(selection.head(&store), Some(&id("b")));
    }

    #[test]
    fn test_branch_reports() {
        // a -> b -> c -> root is canonical, d -> c is a branch off c
        let mut graph = LinkGraph::new();
        link(&mut graph, "a", "b", EdgeState::Confirmed);
        link(&mut graph, "b", "c", EdgeState::Confirmed);
        link(&mut graph, "c", "root", EdgeState::Confirmed);
        link(&mut graph, "d", "c", EdgeState::Confirmed);
        let mut store = store_with(&["a", "b", "c", "d", "root"]);

        let chains = find_chains_ending_at(&graph, &id("root"));
        assert_eq!(chains.len(), 2);
        let selection = select_canonical(&graph, &mut store, chains, 1);

        assert_eq!(selection.canonical, chain(&["a", "b", "c", "root"]));
        let branch = &selection.branches[0];
        let (i, j) = merge_point(&selection.canonical, branch);
        assert_eq!(selection.canonical[i + 1], id("c"));
        assert_eq!(branch[j + 1], id("c"));

        let reports = selection.branch_reports(&graph, &store);
        assert_eq!(
            reports,
            vec![BranchReport {
                member: id("d"),
                should_link_to: id("a"),
                instead_of: id("c"),
            }]
        );
    }

    #[test]
    fn test_later_branch_reports_point_at_previous_branch() {
        let mut graph = LinkGraph::new();
        link(&mut graph, "a", "b", EdgeState::Confirmed);
        link(&mut graph, "b", "c", EdgeState::Confirmed);
        link(&mut graph, "c", "root", EdgeState::Confirmed);
        link(&mut graph, "d", "c", EdgeState::Confirmed);
        link(&mut graph, "e", "b", EdgeState::Confirmed);
        let store = store_with(&["a", "b", "c", "d", "e", "root"]);

        let selection = Selection {
            canonical: chain(&["a", "b", "c", "root"]),
            branches: vec![chain(&["d", "c", "root"]), chain(&["e", "b", "c", "root"])],
            valid: true,
        };

        let reports = selection.branch_reports(&graph, &store);
        assert_eq!(
            reports,
            vec![
                BranchReport {
                    member: id("d"),
                    should_link_to: id("a"),
                    instead_of: id("c"),
                },
                BranchReport {
                    member: id("e"),
                    should_link_to: id("d"),
                    instead_of: id("b"),
                },
            ]
        );
    }

    #[test]
    fn test_branch_reports_skip_stale_links() {
        let mut graph = LinkGraph::new();
        link(&mut graph, "a", "b", EdgeState::Confirmed);
        link(&mut graph, "b", "root", EdgeState::Confirmed);
        link(&mut graph, "d", "b", EdgeState::Stale);
        let store = store_with(&["a", "b", "d", "root"]);

        let selection = Selection {
            canonical: chain(&["a", "b", "root"]),
            branches: vec![chain(&["d", "b", "root"])],
            valid: true,
        };
        assert!(selection.branch_reports(&graph, &store).is_empty());
    }
}
