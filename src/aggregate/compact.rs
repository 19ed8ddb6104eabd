//! The deletion-remap primitive.
//!
//! Vertex deletion is driven by a *representative array*: slot `i` survives
//! iff `representative_of[i] == i`; otherwise the slot is merged into the
//! (strictly lower) representative index, or removed outright when the value
//! is [`NO_ID`]. This single primitive turns that convention into a
//! compacted new-index array, so no caller has to re-derive the
//! tombstone-plus-relocation bookkeeping.

use crate::NO_ID;

/// Compute the compaction of a representative array.
///
/// Returns the survivor count and `new_index_of`, where:
/// - a surviving slot maps to its compacted index (survivor order is
///   preserved),
/// - a merged slot maps to the compacted index of its representative,
///   following chains (`representative_of[i]` may itself be merged),
/// - an outright-removed slot (`NO_ID`) maps to `NO_ID`.
///
/// Precondition: `representative_of[i] <= i` for every merged slot; this is
/// what makes single-pass chain resolution sound and is guaranteed by the
/// lowest-index-wins colocation tie break.
pub fn compute_compaction(representative_of: &[usize]) -> (usize, Vec<usize>) {
    let mut new_index_of = vec![NO_ID; representative_of.len()];

    let mut nb_survivors = 0;
    for (i, &rep) in representative_of.iter().enumerate() {
        if rep == i {
            new_index_of[i] = nb_survivors;
            nb_survivors += 1;
        }
    }

    for (i, &rep) in representative_of.iter().enumerate() {
        if rep != i && rep != NO_ID {
            debug_assert!(rep < i, "representative {} of {} is not lower", rep, i);
            // rep < i, so rep's own slot is already resolved.
            new_index_of[i] = new_index_of[rep];
        }
    }

    (nb_survivors, new_index_of)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let (nb, map) = compute_compaction(&[0, 1, 2]);
        assert_eq!(nb, 3);
        assert_eq!(map, vec![0, 1, 2]);
    }

    #[test]
    fn test_full_deletion() {
        let (nb, map) = compute_compaction(&[NO_ID, NO_ID]);
        assert_eq!(nb, 0);
        assert_eq!(map, vec![NO_ID, NO_ID]);
    }

    #[test]
    fn test_merge_compacts_survivors() {
        // 0 and 2 survive; 1 and 3 merge into 0; 4 merges into 2.
        let (nb, map) = compute_compaction(&[0, 0, 2, 0, 2]);
        assert_eq!(nb, 2);
        assert_eq!(map, vec![0, 0, 1, 0, 1]);
    }

    #[test]
    fn test_chained_representatives() {
        // 2 merges into 1, which itself merges into 0.
        let (nb, map) = compute_compaction(&[0, 0, 1, 3]);
        assert_eq!(nb, 2);
        assert_eq!(map, vec![0, 0, 0, 1]);
    }

    #[test]
    fn test_mixed_removal_and_merge() {
        let (nb, map) = compute_compaction(&[0, NO_ID, 0, 3]);
        assert_eq!(nb, 2);
        assert_eq!(map, vec![0, NO_ID, 0, 1]);
    }

    #[test]
    fn test_empty() {
        let (nb, map) = compute_compaction(&[]);
        assert_eq!(nb, 0);
        assert!(map.is_empty());
    }
}
