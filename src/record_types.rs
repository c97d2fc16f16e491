use std::cmp::Ordering;
use std::iter::FusedIterator;
use std::slice;

use crate::error::{CallbackKind, EmitError, MRError, Result};
use crate::mapreducer::Combiner;
use crate::partition::PartitionStore;
use crate::reduce::KeyGroups;
use crate::util::guard_callback;

/// A (key,value) pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Record {
    pub key: String,
    pub value: String,
}

impl Record {
    pub fn new<K: Into<String>, V: Into<String>>(key: K, value: V) -> Record {
        Record {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Records are ordered by key; records with equal keys are ordered by value.
impl Ord for Record {
    fn cmp(&self, other: &Record) -> Ordering {
        match self.key.cmp(&other.key) {
            Ordering::Equal => self.value.cmp(&other.value),
            o => o,
        }
    }
}

impl PartialOrd for Record {
    fn partial_cmp(&self, other: &Record) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A key and all of its values; the input to a reduce (or combine) call.
///
/// The values are not copied out of the partition: a MultiRecord borrows the run of records
/// sharing its key and hands out one value at a time, in ascending order. It is single-pass.
/// Use `get_next()` for the strict protocol (polling after the end is an error), or iterate it
/// like any other iterator (which keeps returning `None` after the end).
pub struct MultiRecord<'a> {
    key: &'a str,
    partition: usize,
    values: slice::Iter<'a, Record>,
    ended: bool,
}

impl<'a> MultiRecord<'a> {
    /// Creates the value iterator of `group`, which should be a run of records with identical
    /// keys. The key is taken from the first record.
    pub fn new(partition: usize, group: &'a [Record]) -> MultiRecord<'a> {
        debug_assert!(group.windows(2).all(|w| w[0].key == w[1].key));
        MultiRecord {
            key: group.first().map(|r| r.key.as_str()).unwrap_or(""),
            partition: partition,
            values: group.iter(),
            ended: false,
        }
    }

    /// Retrieves the key of the record.
    pub fn key(&self) -> &'a str {
        self.key
    }

    /// The partition this key was routed to.
    pub fn partition(&self) -> usize {
        self.partition
    }

    /// Returns the next value, `Ok(None)` once all values have been returned, and
    /// `MRError::IteratorExhausted` on every call after that.
    pub fn get_next(&mut self) -> Result<Option<&'a str>> {
        if self.ended {
            return Err(MRError::IteratorExhausted { key: self.key.to_string() });
        }
        match self.values.next() {
            Some(r) => Ok(Some(&r.value)),
            None => {
                self.ended = true;
                Ok(None)
            }
        }
    }
}

impl<'a> Iterator for MultiRecord<'a> {
    type Item = &'a str;
    fn next(&mut self) -> Option<&'a str> {
        self.get_next().unwrap_or(None)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = if self.ended { 0 } else { self.values.len() };
        (n, Some(n))
    }
}

impl<'a> FusedIterator for MultiRecord<'a> {}

/// What one mapper invocation contributed to the partitions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EmitSummary {
    /// Pairs emitted by the mapper.
    pub emitted: u64,
    /// Pairs that ended up in the partitions (fewer than `emitted` if a combiner ran).
    pub stored: u64,
    pub combiner_calls: u64,
}

/// Emitter type used in the map phase; used to emit (key,value) pairs.
///
/// Without a combiner, every emit goes straight to its partition. With a combiner, the pairs of
/// one mapper invocation are collected locally and combined per key once the mapper returns.
pub struct MEmitter<'a> {
    store: &'a PartitionStore<'a>,
    batch: Option<Vec<Record>>,
    emitted: u64,
    failure: Option<EmitError>,
}

impl<'a> MEmitter<'a> {
    pub(crate) fn new(store: &'a PartitionStore<'a>, local_batch: bool) -> MEmitter<'a> {
        MEmitter {
            store: store,
            batch: if local_batch { Some(Vec::new()) } else { None },
            emitted: 0,
            failure: None,
        }
    }

    /// Emits one pair. Safe to call from any number of mapper threads at once; only the lock of
    /// the target partition is taken.
    ///
    /// Once an emit has failed, the emitter refuses all further pairs with the same error, and
    /// the failure is reported for the whole run even if the mapper ignores it.
    pub fn emit<K: Into<String>, V: Into<String>>(&mut self, key: K, val: V) -> std::result::Result<(), EmitError> {
        if let Some(ref e) = self.failure {
            return Err(e.clone());
        }
        let record = Record {
            key: key.into(),
            value: val.into(),
        };
        let result = match self.batch {
            Some(ref mut batch) => {
                batch.push(record);
                Ok(())
            }
            None => self.store.insert(record).map(|_| ()),
        };
        match result {
            Ok(()) => {
                self.emitted += 1;
                Ok(())
            }
            Err(e) => {
                self.failure = Some(e.clone());
                Err(e)
            }
        }
    }

    /// How many pairs have been emitted so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Number of partitions of the current run.
    pub fn partitions(&self) -> usize {
        self.store.num_partitions()
    }

    pub(crate) fn take_failure(&mut self) -> Option<EmitError> {
        self.failure.take()
    }

    /// Surfaces a latched emit failure, then runs the combiner over the local batch (if any)
    /// and moves the combined pairs into the partitions.
    pub(crate) fn finish(self, combiner: Option<&dyn Combiner>) -> Result<EmitSummary> {
        if let Some(e) = self.failure {
            return Err(e.into());
        }
        let mut summary = EmitSummary {
            emitted: self.emitted,
            stored: 0,
            combiner_calls: 0,
        };
        let mut batch = match self.batch {
            None => {
                summary.stored = self.emitted;
                return Ok(summary);
            }
            Some(batch) => batch,
        };

        let combiner = match combiner {
            Some(c) => c,
            None => {
                for r in batch {
                    self.store.insert(r)?;
                    summary.stored += 1;
                }
                return Ok(summary);
            }
        };

        batch.sort_unstable();
        for group in KeyGroups::new(&batch) {
            let key = &group[0].key;
            // The partitioner is user code too; it runs under the same guard as the combiner.
            let (partition, combined) = guard_callback(CallbackKind::Combine, None, || {
                let partition = self.store.route(key)?;
                let mut values = MultiRecord::new(partition, group);
                Ok((partition, combiner.combine(&mut values)?))
            })?;
            summary.combiner_calls += 1;
            self.store.insert_at(partition, Record::new(key.as_str(), combined))?;
            summary.stored += 1;
        }
        Ok(summary)
    }
}

/// Emitter used in the reduce phase; collects the output records of one partition.
#[derive(Debug, Default)]
pub struct REmitter {
    r: Vec<Record>,
}

impl REmitter {
    pub fn new() -> REmitter {
        REmitter { r: Vec::new() }
    }
    pub fn emit<K: Into<String>, V: Into<String>>(&mut self, key: K, val: V) {
        self.r.push(Record::new(key, val))
    }
    pub fn len(&self) -> usize {
        self.r.len()
    }
    pub fn is_empty(&self) -> bool {
        self.r.is_empty()
    }
    pub(crate) fn into_records(self) -> Vec<Record> {
        self.r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closure_mr::{FnCombiner, FnPartitioner};
    use crate::mapreducer::DefaultPartitioner;

    fn group(key: &str, values: &[&str]) -> Vec<Record> {
        values.iter().map(|v| Record::new(key, *v)).collect()
    }

    #[test]
    fn test_record_order() {
        let mut records = vec![Record::new("b", "1"), Record::new("a", "2"), Record::new("a", "10"), Record::new("", "z")];
        records.sort();
        assert_eq!(records,
                   vec![Record::new("", "z"), Record::new("a", "10"), Record::new("a", "2"), Record::new("b", "1")]);
    }

    #[test]
    fn test_multirecord_protocol() {
        let g = group("k", &["1", "2", "3"]);
        let mut mr = MultiRecord::new(3, &g);
        assert_eq!(mr.key(), "k");
        assert_eq!(MultiRecord::partition(&mr), 3);
        assert_eq!(mr.size_hint(), (3, Some(3)));
        assert_eq!(mr.get_next().unwrap(), Some("1"));
        assert_eq!(mr.get_next().unwrap(), Some("2"));
        assert_eq!(mr.get_next().unwrap(), Some("3"));
        assert_eq!(mr.get_next().unwrap(), None);
        match mr.get_next() {
            Err(MRError::IteratorExhausted { key }) => assert_eq!(key, "k"),
            other => panic!("expected exhaustion error, got {:?}", other),
        }
    }

    #[test]
    fn test_multirecord_iterator_is_fused() {
        let g = group("k", &["a", "b"]);
        let mut mr = MultiRecord::new(0, &g);
        assert_eq!(mr.by_ref().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(mr.next(), None);
        assert_eq!(mr.next(), None);
        assert_eq!(mr.size_hint(), (0, Some(0)));
    }

    #[test]
    fn test_emit_direct() {
        let store = PartitionStore::new(&DefaultPartitioner, 3, 2).unwrap();
        let mut em = MEmitter::new(&store, false);
        em.emit("a", "1").unwrap();
        em.emit(String::from("b"), "1").unwrap();
        assert_eq!(em.emitted(), 2);
        assert_eq!(em.partitions(), 3);
        let summary = em.finish(None).unwrap();
        assert_eq!(summary, EmitSummary { emitted: 2, stored: 2, combiner_calls: 0 });
        let total: usize = store.into_partitions().unwrap().iter().map(|p| p.len()).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_emit_failure_is_latched() {
        let p = FnPartitioner::new(|key: &str, n| if key == "bad" { n } else { 0 });
        let store = PartitionStore::new(&p, 2, 2).unwrap();
        let mut em = MEmitter::new(&store, false);
        em.emit("good", "1").unwrap();
        assert!(em.emit("bad", "1").is_err());
        // Even well-routed keys are refused now.
        assert!(em.emit("good", "2").is_err());
        match em.finish(None) {
            Err(MRError::Emit(EmitError::PartitionOutOfRange { index: 2, partitions: 2 })) => (),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_emit_with_combiner() {
        let sum = FnCombiner::new(|values: &mut MultiRecord<'_>| {
            let mut total = 0u64;
            for v in values {
                total += v.parse::<u64>()?;
            }
            Ok(total.to_string())
        });
        let store = PartitionStore::new(&DefaultPartitioner, 2, 2).unwrap();
        let mut em = MEmitter::new(&store, true);
        for _ in 0..5 {
            em.emit("x", "1").unwrap();
        }
        em.emit("y", "2").unwrap();
        let summary = em.finish(Some(&sum)).unwrap();
        assert_eq!(summary, EmitSummary { emitted: 6, stored: 2, combiner_calls: 2 });

        let mut all: Vec<Record> = store.into_partitions().unwrap().into_iter().flatten().collect();
        all.sort();
        assert_eq!(all, vec![Record::new("x", "5"), Record::new("y", "2")]);
    }

    #[test]
    fn test_combiner_failure() {
        let broken = FnCombiner::new(|values: &mut MultiRecord<'_>| Err(anyhow::anyhow!("cannot combine {}", values.key())));
        let store = PartitionStore::new(&DefaultPartitioner, 1, 1).unwrap();
        let mut em = MEmitter::new(&store, true);
        em.emit("x", "1").unwrap();
        match em.finish(Some(&broken)) {
            Err(MRError::Callback { kind: CallbackKind::Combine, source }) => {
                assert_eq!(source.to_string(), "cannot combine x")
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_partitioner_panic_while_combining() {
        let exploding = FnPartitioner::new(|key: &str, _n| if key == "boom" { panic!("no partition for {}", key) } else { 0 });
        let first = FnCombiner::new(|values: &mut MultiRecord<'_>| Ok(values.next().unwrap_or("").to_string()));
        let store = PartitionStore::new(&exploding, 1, 1).unwrap();
        let mut em = MEmitter::new(&store, true);
        em.emit("boom", "1").unwrap();
        match em.finish(Some(&first)) {
            Err(MRError::Callback { kind: CallbackKind::Combine, source }) => {
                assert_eq!(source.to_string(), "panicked: no partition for boom")
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_bad_partition_while_combining() {
        let p = FnPartitioner::new(|_: &str, n| n);
        let first = FnCombiner::new(|values: &mut MultiRecord<'_>| Ok(values.next().unwrap_or("").to_string()));
        let store = PartitionStore::new(&p, 2, 1).unwrap();
        let mut em = MEmitter::new(&store, true);
        em.emit("k", "v").unwrap();
        match em.finish(Some(&first)) {
            Err(MRError::Emit(EmitError::PartitionOutOfRange { index: 2, partitions: 2 })) => (),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_remitter() {
        let mut em = REmitter::new();
        assert!(em.is_empty());
        em.emit("a", "3");
        assert_eq!(em.len(), 1);
        assert_eq!(em.into_records(), vec![Record::new("a", "3")]);
    }
}
