//! Sorting of the partitions between the map and the reduce phase.

use scoped_threadpool::Pool;

use crate::record_types::Record;

/// Sorts one partition by key and, for equal keys, by value. Afterwards equal keys are adjacent
/// and the order is fully determined by the partition's contents.
#[inline]
pub fn sort_partition(pairs: &mut [Record]) {
    pairs.sort_unstable();
}

/// Checks the order established by `sort_partition`.
pub fn is_sorted(pairs: &[Record]) -> bool {
    pairs.windows(2).all(|w| w[0] <= w[1])
}

/// Sorts every partition. Partitions are independent and are sorted in parallel on `pool`.
pub fn sort_all(pool: &mut Pool, partitions: &mut [Vec<Record>]) {
    pool.scoped(|scope| {
        for (i, part) in partitions.iter_mut().enumerate() {
            if part.len() < 2 {
                continue;
            }
            scope.execute(move || {
                sort_partition(part);
                log::debug!("sorted partition {} ({} pairs)", i, part.len());
            });
        }
    });
}
