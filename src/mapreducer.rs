//! The Mapper, Reducer, Combiner and Partitioner traits.
//!
//! All of them take `&self` and are shared by reference between the worker threads of a run, so
//! they must be `Sync`. Errors are reported as `anyhow::Error`; the engine turns them into a
//! fatal `MRError` for the whole run.

use std::path::Path;

use crate::record_types::{MEmitter, MultiRecord, REmitter};

/// Default partitioning function: the djb2 string hash of `key`, modulo `n`.
/// The empty key hashes to 5381. `n` must not be 0.
pub fn default_partition(key: &str, n: usize) -> usize {
    let mut h: u64 = 5381;
    for b in key.bytes() {
        h = (h << 5).wrapping_add(h).wrapping_add(b as u64);
    }
    (h % n as u64) as usize
}

pub trait Mapper: Sync {
    /// Processes one input file, emitting zero or more (key,value) pairs through `em`.
    /// The mapper does its own I/O on `path`.
    fn map(&self, em: &mut MEmitter<'_>, path: &Path) -> anyhow::Result<()>;
}

pub trait Reducer: Sync {
    /// Called exactly once per distinct key of a partition. `values` yields all values emitted
    /// for that key, in ascending order; the key and the partition index are available on it.
    /// Output records go to `em`.
    fn reduce(&self, em: &mut REmitter, values: &mut MultiRecord<'_>) -> anyhow::Result<()>;
}

pub trait Combiner: Sync {
    /// Collapses the values one mapper invocation emitted for a single key into one value.
    /// The result is emitted in place of the original values.
    fn combine(&self, values: &mut MultiRecord<'_>) -> anyhow::Result<String>;
}

pub trait Partitioner: Sync {
    /// Determines which partition (and therefore which reduce call) a key belongs to.
    /// Must return a number in [0; n) and must be deterministic for the duration of a run.
    /// The default implementation is `default_partition`.
    fn partition(&self, key: &str, n: usize) -> usize {
        default_partition(key, n)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultPartitioner;

impl Partitioner for DefaultPartitioner {}
