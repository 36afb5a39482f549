//! Resolution of the frames a run exports

use log::warn;
use std::collections::BTreeSet;

use crate::model::SequenceSet;

/// Union of all sequences' frames, ascending, filtered to `range`
///
/// The range is inclusive. An empty result is not an error.
pub fn resolve_frames(sequences: &SequenceSet, range: Option<(u32, u32)>) -> Vec<u32> {
    let all: BTreeSet<u32> = sequences.iter().flat_map(|s| s.frames().iter().copied()).collect();

    let Some((start, end)) = range else {
        return all.into_iter().collect();
    };

    let filtered: Vec<u32> = all.iter().copied().filter(|f| (start..=end).contains(f)).collect();
    if filtered.is_empty() && !all.is_empty() {
        warn!("Frame range {}-{} excludes all {} available frames", start, end, all.len());
    }
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SequencePattern, SequenceSpec};

    fn sequences(frames: &[&[u32]]) -> SequenceSet {
        frames
            .iter()
            .enumerate()
            .map(|(i, f)| {
                let id = format!("seq{}", i);
                SequenceSpec::new(&id, &id, SequencePattern::new("s.%04d.tif"), "/plates", f.iter().copied())
            })
            .collect()
    }

    #[test]
    fn test_union_is_sorted_and_unique() {
        let set = sequences(&[&[3, 1, 2], &[2, 3, 4]]);
        assert_eq!(resolve_frames(&set, None), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_range_filter_is_inclusive() {
        let set = sequences(&[&[1, 2, 3], &[2, 3, 4]]);
        assert_eq!(resolve_frames(&set, Some((2, 3))), vec![2, 3]);
        assert_eq!(resolve_frames(&set, Some((4, 4))), vec![4]);
    }

    #[test]
    fn test_empty_results() {
        assert!(resolve_frames(&SequenceSet::new(), None).is_empty());
        let set = sequences(&[&[1, 2, 3]]);
        assert!(resolve_frames(&set, Some((10, 20))).is_empty());
    }
}
