//! Majority vote over per-chunk predictions
//!
//! The most frequent class wins; among classes tied on count the smallest
//! index wins. The result does not depend on input order.

use std::collections::BTreeMap;

use crate::classifier::ClassIndex;

use super::error::PipelineError;

/// Winning class and how many chunks voted for it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vote {
    pub class: ClassIndex,
    pub count: usize,
}

/// Majority vote with lowest-index tie-break
pub fn aggregate(predictions: &[ClassIndex]) -> Result<ClassIndex, PipelineError> {
    tally(predictions).map(|vote| vote.class)
}

/// Like [`aggregate`], also reporting the winning vote count
pub fn tally(predictions: &[ClassIndex]) -> Result<Vote, PipelineError> {
    let mut counts: BTreeMap<ClassIndex, usize> = BTreeMap::new();
    for &class in predictions {
        *counts.entry(class).or_insert(0) += 1;
    }

    // BTreeMap iterates in ascending index order; only a strictly greater
    // count replaces the current winner.
    let mut winner: Option<Vote> = None;
    for (class, count) in counts {
        if winner.map_or(true, |w| count > w.count) {
            winner = Some(Vote { class, count });
        }
    }

    winner.ok_or(PipelineError::EmptyInput)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(indices: &[usize]) -> Vec<ClassIndex> {
        indices.iter().copied().map(ClassIndex).collect()
    }

    #[test]
    fn test_tie_resolves_to_lowest_index() {
        // counts {2: 3, 0: 3, 1: 1}
        let predictions = classes(&[2, 0, 2, 1, 0, 2, 0]);
        assert_eq!(aggregate(&predictions).unwrap(), ClassIndex(0));
    }

    #[test]
    fn test_single_prediction() {
        assert_eq!(aggregate(&classes(&[3])).unwrap(), ClassIndex(3));
    }

    #[test]
    fn test_clear_majority() {
        let vote = tally(&classes(&[1, 3, 3, 0, 3])).unwrap();
        assert_eq!(vote, Vote { class: ClassIndex(3), count: 3 });
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(matches!(aggregate(&[]), Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn test_order_independent() {
        let base = classes(&[2, 0, 2, 1, 0, 3, 3, 0, 2]);
        let expected = aggregate(&base).unwrap();

        // Every rotation and the reversal
        for shift in 0..base.len() {
            let mut rotated = base.clone();
            rotated.rotate_left(shift);
            assert_eq!(aggregate(&rotated).unwrap(), expected);
        }
        let mut reversed = base.clone();
        reversed.reverse();
        assert_eq!(aggregate(&reversed).unwrap(), expected);
    }

    #[test]
    fn test_all_distinct_picks_lowest() {
        assert_eq!(aggregate(&classes(&[3, 1, 2])).unwrap(), ClassIndex(1));
    }
}
