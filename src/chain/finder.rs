//! Chain discovery.
//!
//! Walks the link graph backward from the root with an explicit stack of
//! partial paths. A partial path grows by one predecessor at a time and is
//! emitted once it cannot grow any further, so every dead end of the reversed
//! reachability tree yields exactly one chain.

use super::link_graph::{EdgeState, LinkGraph, ParticipantId};

/// Ordered participants, each linking to the next, ending at the root
pub type Chain = Vec<ParticipantId>;

/// Find every maximal simple chain that ends at `root`.
///
/// Returned chains run start-to-root. A root with no non-`Absent`
/// predecessors yields no chains at all.
pub fn find_chains_ending_at(graph: &LinkGraph, root: &ParticipantId) -> Vec<Chain> {
    let mut found = Vec::new();
    let mut pending: Vec<Chain> = vec![vec![root.clone()]];

    while let Some(partial) = pending.pop() {
        let Some(last) = partial.last() else {
            continue;
        };

        let mut is_end = true;
        for predecessor in graph.neighbors_into(last, EdgeState::is_present) {
            // Revisit guard: cycles end the path instead of looping
            if partial.contains(&predecessor) {
                continue;
            }

            is_end = false;
            let mut extended = partial.clone();
            extended.push(predecessor);
            pending.push(extended);
        }

        if is_end && partial.len() > 1 {
            let mut chain = partial;
            chain.reverse();
            found.push(chain);
        }
    }

    found
}

/// Tail-consistency check for a chain: simple, ends at `root`, no `Absent` hops.
pub fn is_well_formed(graph: &LinkGraph, chain: &[ParticipantId], root: &ParticipantId) -> bool {
    if chain.last() != Some(root) {
        return false;
    }

    let mut seen = std::collections::HashSet::new();
    if !chain.iter().all(|id| seen.insert(id)) {
        return false;
    }

    chain
        .windows(2)
        .all(|pair| graph.edge(&pair[0], &pair[1]).is_present())
}
