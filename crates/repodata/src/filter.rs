//! Predicate filtering over large package lists.
//!
//! Small inputs are filtered in place. Large inputs are split into fixed-size
//! chunks evaluated on the rayon pool; each chunk yields the set of global
//! indices it kept, and the sets are unioned back into ascending order. The
//! result is identical to sequential filtering regardless of input size.

use rayon::prelude::*;
use std::collections::BTreeSet;

/// Inputs smaller than this are filtered sequentially.
pub const MIN_SPLIT_FILTER: usize = 3000;
/// Number of items handed to each parallel task.
pub const SPLIT_SIZE: usize = 2000;

/// Returns the ascending indices of every item matching `predicate`.
pub fn filter_indices<T, F>(items: &[T], predicate: F) -> Vec<usize>
where
    T: Sync,
    F: Fn(&T) -> bool + Sync,
{
    if items.len() < MIN_SPLIT_FILTER {
        return items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| predicate(item).then_some(index))
            .collect();
    }
    items
        .par_chunks(SPLIT_SIZE)
        .enumerate()
        .map(|(chunk, slice)| {
            let base = chunk * SPLIT_SIZE;
            slice
                .iter()
                .enumerate()
                .filter_map(|(offset, item)| predicate(item).then_some(base + offset))
                .collect::<BTreeSet<usize>>()
        })
        .reduce(BTreeSet::new, |mut left, mut right| {
            left.append(&mut right);
            left
        })
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sequential(items: &[usize], predicate: impl Fn(&usize) -> bool) -> Vec<usize> {
        items.iter().enumerate().filter(|(_, item)| predicate(item)).map(|(i, _)| i).collect()
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(2999)]
    #[case(3000)]
    #[case(3001)]
    #[case(10_007)]
    fn test_filter_matches_sequential(#[case] size: usize) {
        let items: Vec<usize> = (0..size).collect();
        assert_eq!(filter_indices(&items, |_| false), Vec::<usize>::new());
        assert_eq!(filter_indices(&items, |_| true), items);
        let odd = |n: &usize| n % 7 == 3;
        assert_eq!(filter_indices(&items, odd), sequential(&items, odd));
    }

    #[test]
    fn test_filter_chunk_boundaries() {
        let items: Vec<usize> = (0..6500).collect();
        let edges = |n: &usize| n % SPLIT_SIZE == 0 || n % SPLIT_SIZE == SPLIT_SIZE - 1;
        assert_eq!(filter_indices(&items, edges), vec![0, 1999, 2000, 3999, 4000, 5999, 6000]);
    }
}
