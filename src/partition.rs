//! The shared partitions the map phase emits into.
//!
//! Every partition is a growable buffer of records behind its own mutex, so mappers emitting
//! into different partitions never wait for each other.

use std::sync::Mutex;

use crate::error::{EmitError, MRError, Result};
use crate::mapreducer::Partitioner;
use crate::record_types::Record;

/// One partition's pairs. The capacity is doubled whenever the buffer is full.
#[derive(Debug)]
pub struct PartitionBuffer {
    pairs: Vec<Record>,
}

impl PartitionBuffer {
    fn with_capacity(partition: usize, capacity: usize) -> std::result::Result<PartitionBuffer, EmitError> {
        let mut pairs = Vec::new();
        pairs.try_reserve_exact(capacity)
            .map_err(|e| EmitError::Allocation {
                partition: partition,
                capacity: 0,
                source: e,
            })?;
        Ok(PartitionBuffer { pairs: pairs })
    }

    fn push(&mut self, partition: usize, record: Record) -> std::result::Result<(), EmitError> {
        if self.pairs.len() == self.pairs.capacity() {
            let grow_by = self.pairs.capacity().max(1);
            self.pairs
                .try_reserve_exact(grow_by)
                .map_err(|e| EmitError::Allocation {
                    partition: partition,
                    capacity: self.pairs.capacity(),
                    source: e,
                })?;
        }
        self.pairs.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.pairs.capacity()
    }
}

pub struct PartitionStore<'p> {
    partitioner: &'p dyn Partitioner,
    partitions: Vec<Mutex<PartitionBuffer>>,
}

impl<'p> PartitionStore<'p> {
    /// Allocates `n` partitions with room for `prealloc` pairs each.
    pub fn new(partitioner: &'p dyn Partitioner, n: usize, prealloc: usize) -> Result<PartitionStore<'p>> {
        if n == 0 {
            return Err(MRError::InvalidArgument(String::from("at least one partition is required")));
        }
        let mut partitions = Vec::with_capacity(n);
        for i in 0..n {
            partitions.push(Mutex::new(PartitionBuffer::with_capacity(i, prealloc)?));
        }
        Ok(PartitionStore {
            partitioner: partitioner,
            partitions: partitions,
        })
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// Returns the partition `key` belongs to.
    pub fn route(&self, key: &str) -> std::result::Result<usize, EmitError> {
        let n = self.partitions.len();
        let index = self.partitioner.partition(key, n);
        if index >= n {
            return Err(EmitError::PartitionOutOfRange {
                index: index,
                partitions: n,
            });
        }
        Ok(index)
    }

    /// Routes `record` to its partition and appends it there. Returns the partition index.
    pub fn insert(&self, record: Record) -> std::result::Result<usize, EmitError> {
        let index = self.route(&record.key)?;
        self.insert_at(index, record)?;
        Ok(index)
    }

    /// Appends `record` to partition `index`, which must come from `route()`.
    pub(crate) fn insert_at(&self, index: usize, record: Record) -> std::result::Result<(), EmitError> {
        let mut buffer = self.partitions[index]
            .lock()
            .map_err(|_| EmitError::Poisoned { partition: index })?;
        buffer.push(index, record)
    }

    /// Current (len, capacity) of every partition.
    pub fn sizes(&self) -> Vec<(usize, usize)> {
        self.partitions
            .iter()
            .map(|p| match p.lock() {
                Ok(b) => (b.len(), b.capacity()),
                Err(poisoned) => {
                    let b = poisoned.into_inner();
                    (b.len(), b.capacity())
                }
            })
            .collect()
    }

    /// Consumes the store and hands out the partitions' pairs, in partition order.
    /// Taking the store by value means no emitter can still hold one of the locks.
    pub fn into_partitions(self) -> Result<Vec<Vec<Record>>> {
        let mut out = Vec::with_capacity(self.partitions.len());
        for (i, p) in self.partitions.into_iter().enumerate() {
            let buffer = p.into_inner().map_err(|_| EmitError::Poisoned { partition: i })?;
            out.push(buffer.pairs);
        }
        Ok(out)
    }
}
