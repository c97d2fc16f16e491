//! Implements the Reduce phase.
//!

use std::sync::Mutex;

use crate::error::{CallbackKind, Result};
use crate::input_queue::WorkQueue;
use crate::mapreducer::Reducer;
use crate::record_types::{MultiRecord, REmitter, Record};
use crate::util::{guard_callback, FirstFailure};

/// Splits a sorted slice of records into runs of identical keys.
/// The slice must be sorted (or at least in an order where identical keys are adjacent).
/// Nothing is copied; every item borrows from the input.
pub struct KeyGroups<'a> {
    pairs: &'a [Record],
}

impl<'a> KeyGroups<'a> {
    pub fn new(pairs: &'a [Record]) -> KeyGroups<'a> {
        KeyGroups { pairs: pairs }
    }
}

impl<'a> Iterator for KeyGroups<'a> {
    type Item = &'a [Record];
    fn next(&mut self) -> Option<Self::Item> {
        let first = self.pairs.first()?;
        let end = self.pairs
            .iter()
            .position(|r| r.key != first.key)
            .unwrap_or(self.pairs.len());
        let (group, rest) = self.pairs.split_at(end);
        self.pairs = rest;
        Some(group)
    }
}

/// The result of reducing one partition.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PartitionOutput {
    pub partition: usize,
    /// Records emitted by the reducer, in the order they were emitted.
    pub records: Vec<Record>,
    /// Number of distinct keys, i.e. reduce calls.
    pub keys: u64,
}

/// Calls the reducer once for every distinct key of a sorted partition.
pub fn reduce_partition<R: Reducer + ?Sized>(reducer: &R, partition: usize, pairs: &[Record]) -> Result<PartitionOutput> {
    let mut em = REmitter::new();
    let mut keys = 0;
    for group in KeyGroups::new(pairs) {
        let mut values = MultiRecord::new(partition, group);
        guard_callback(CallbackKind::Reduce, None, || reducer.reduce(&mut em, &mut values))?;
        keys += 1;
    }
    Ok(PartitionOutput {
        partition: partition,
        records: em.into_records(),
        keys: keys,
    })
}

/// Body of a reduce worker thread: claims partitions until there are none left or the run has
/// failed.
pub(crate) fn reduce_worker<R: Reducer + ?Sized>(worker: usize,
                                                 reducer: &R,
                                                 queue: &WorkQueue<usize>,
                                                 partitions: &[Vec<Record>],
                                                 failure: &FirstFailure,
                                                 outputs: &Mutex<Vec<PartitionOutput>>) {
    loop {
        if failure.is_tripped() {
            log::debug!("reducer {} stopping after failure elsewhere", worker);
            break;
        }
        let partition = match queue.claim() {
            None => break,
            Some((_, p)) => *p,
        };
        log::debug!("reducer {} claimed partition {} ({} pairs)", worker, partition, partitions[partition].len());
        match reduce_partition(reducer, partition, &partitions[partition]) {
            Ok(out) => outputs.lock().unwrap_or_else(|p| p.into_inner()).push(out),
            Err(e) => {
                failure.record(e);
                break;
            }
        }
    }
}
