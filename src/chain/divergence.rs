//! Divergence point between two chains that share the same root.

use super::link_graph::ParticipantId;

/// Walk both chains back from their tails while they agree.
///
/// Returns one index per chain: the position just before the shared tail
/// (or the start of the chain when one is a suffix of the other). Identical
/// chains return `(0, 0)`, as do empty inputs.
pub fn merge_point(a: &[ParticipantId], b: &[ParticipantId]) -> (usize, usize) {
    if a.is_empty() || b.is_empty() {
        return (0, 0);
    }

    let mut i = a.len() - 1;
    let mut j = b.len() - 1;

    while a[i] == b[j] && (i > 0 || j > 0) {
        i = i.saturating_sub(1);
        j = j.saturating_sub(1);
    }

    (i, j)
}
