//! Controls the execution of a mapreduce instance.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use scoped_threadpool::Pool;
use time::{Duration, OffsetDateTime};

use crate::error::{MRError, Result};
use crate::input_queue::{FileQueue, WorkQueue};
use crate::map;
use crate::mapreducer::{Combiner, DefaultPartitioner, Mapper, Partitioner, Reducer};
use crate::parameters::MRParameters;
use crate::partition::PartitionStore;
use crate::record_types::Record;
use crate::reduce::{self, PartitionOutput};
use crate::sort;
use crate::stats::RunStats;
use crate::util::FirstFailure;

/// The phases of a run. A run goes through all of them in this order, without skipping any;
/// a failed run stops in the phase it failed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Init,
    Mapping,
    /// All mapper threads have been joined; the partitions are taken out of their locks.
    Barrier,
    Sorting,
    Reducing,
    Done,
}

impl Phase {
    pub fn successor(self) -> Option<Phase> {
        match self {
            Phase::Init => Some(Phase::Mapping),
            Phase::Mapping => Some(Phase::Barrier),
            Phase::Barrier => Some(Phase::Sorting),
            Phase::Sorting => Some(Phase::Reducing),
            Phase::Reducing => Some(Phase::Done),
            Phase::Done => None,
        }
    }
}

/// Moves a run from one phase to the next and times each phase.
struct PhaseTracker {
    current: Phase,
    entered: OffsetDateTime,
}

impl PhaseTracker {
    fn new(now: OffsetDateTime) -> PhaseTracker {
        PhaseTracker {
            current: Phase::Init,
            entered: now,
        }
    }

    fn advance(&mut self, stats: &mut RunStats) -> Phase {
        let next = match self.current.successor() {
            Some(p) => p,
            None => return self.current,
        };
        let now = OffsetDateTime::now_utc();
        stats.phase_times.push((self.current, now - self.entered));
        log::debug!("phase {:?} -> {:?}", self.current, next);
        self.current = next;
        self.entered = now;
        if next == Phase::Done {
            stats.phase_times.push((Phase::Done, Duration::ZERO));
        }
        next
    }
}

/// The result of a successful run.
#[derive(Debug)]
pub struct MROutput {
    /// Reducer output of every partition, in partition order.
    pub partitions: Vec<PartitionOutput>,
    pub stats: RunStats,
}

impl MROutput {
    /// All output records, partition by partition.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.partitions.iter().flat_map(|p| p.records.iter())
    }

    pub fn into_records(self) -> Vec<Record> {
        self.partitions.into_iter().flat_map(|p| p.records).collect()
    }
}

pub struct MRController<'a, M: Mapper, R: Reducer> {
    params: MRParameters,
    mapper: M,
    reducer: R,
    combiner: Option<Box<dyn Combiner + 'a>>,
    partitioner: Box<dyn Partitioner + 'a>,
}

impl<'a, M: Mapper, R: Reducer> MRController<'a, M, R> {
    /// Set up a mapreduce instance using the default partitioner and no combiner.
    pub fn new(mapper: M, reducer: R, params: MRParameters) -> MRController<'a, M, R> {
        MRController {
            params: params,
            mapper: mapper,
            reducer: reducer,
            combiner: None,
            partitioner: Box::new(DefaultPartitioner),
        }
    }

    /// Pre-aggregate the output of every mapper invocation with `combiner`.
    pub fn set_combiner<C: Combiner + 'a>(mut self, combiner: C) -> MRController<'a, M, R> {
        self.combiner = Some(Box::new(combiner));
        self
    }

    pub fn set_partitioner<P: Partitioner + 'a>(mut self, partitioner: P) -> MRController<'a, M, R> {
        self.partitioner = Box::new(partitioner);
        self
    }

    /// Executes the mapreduce over `inputs`: maps every file, sorts the partitions, reduces
    /// every key. All intermediate state lives only for the duration of this call.
    ///
    /// The first failure of any callback or of the engine aborts the run and is returned once
    /// the phase it happened in has been joined.
    pub fn run<P: AsRef<Path>>(&self, inputs: &[P]) -> Result<MROutput> {
        let started = OffsetDateTime::now_utc();
        let mut stats = RunStats::new(started);
        let mut phase = PhaseTracker::new(started);

        self.params.validate()?;
        if inputs.is_empty() {
            return Err(MRError::InvalidArgument(String::from("no input files given")));
        }

        let queue = FileQueue::from_paths(inputs);
        let mappers = self.params.mappers.min(queue.len());
        let partitions = self.params.num_partitions();
        let reducers = self.params.effective_reducers();
        stats.files = queue.len();
        stats.mappers = mappers;
        stats.reducers = reducers;
        stats.partitions = partitions;

        let store = PartitionStore::new(&*self.partitioner, partitions, self.params.partition_prealloc)?;
        let failure = FirstFailure::new();
        let mut pool = Pool::new(mappers as u32);

        phase.advance(&mut stats);
        log::info!("mapping {} files on {} threads into {} partitions", queue.len(), mappers, partitions);
        let map_stats = Mutex::new(Vec::with_capacity(mappers));
        {
            let mapper = &self.mapper;
            let combiner = self.combiner.as_deref();
            let (queue, store, failure, map_stats) = (&queue, &store, &failure, &map_stats);
            pool.scoped(|scope| {
                for worker in 0..mappers {
                    scope.execute(move || map::map_worker(worker, mapper, combiner, queue, store, failure, map_stats));
                }
            });
        }
        failure.check()?;
        stats.record_map(map_stats.into_inner().unwrap_or_else(PoisonError::into_inner));

        phase.advance(&mut stats);
        let mut parts = store.into_partitions()?;
        stats.pairs_per_partition = parts.iter().map(Vec::len).collect();
        log::info!("map phase done: {} pairs emitted, {} stored", stats.pairs_emitted, stats.pairs_stored());

        phase.advance(&mut stats);
        sort::sort_all(&mut pool, &mut parts);

        phase.advance(&mut stats);
        log::info!("reducing {} partitions on {} threads", partitions, reducers);
        let work = WorkQueue::new((0..partitions).collect::<Vec<usize>>());
        let outputs = Mutex::new(Vec::with_capacity(partitions));
        let mut reduce_pool = Pool::new(reducers as u32);
        {
            let reducer = &self.reducer;
            let (work, parts, failure, outputs) = (&work, &parts[..], &failure, &outputs);
            reduce_pool.scoped(|scope| {
                for worker in 0..reducers {
                    scope.execute(move || reduce::reduce_worker(worker, reducer, work, parts, failure, outputs));
                }
            });
        }
        failure.check()?;
        let mut outputs = outputs.into_inner().unwrap_or_else(PoisonError::into_inner);
        outputs.sort_by_key(|o| o.partition);
        stats.keys_reduced = outputs.iter().map(|o| o.keys).sum();

        phase.advance(&mut stats);
        log::info!("run finished: {}", stats);
        Ok(MROutput {
            partitions: outputs,
            stats: stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order() {
        let mut p = Phase::Init;
        let mut seen = vec![p];
        while let Some(next) = p.successor() {
            seen.push(next);
            p = next;
        }
        assert_eq!(seen,
                   vec![Phase::Init, Phase::Mapping, Phase::Barrier, Phase::Sorting, Phase::Reducing, Phase::Done]);
    }

    #[test]
    fn test_tracker_never_skips() {
        let now = OffsetDateTime::now_utc();
        let mut stats = RunStats::new(now);
        let mut t = PhaseTracker::new(now);
        assert_eq!(t.advance(&mut stats), Phase::Mapping);
        assert_eq!(t.advance(&mut stats), Phase::Barrier);
        for _ in 0..5 {
            t.advance(&mut stats);
        }
        assert_eq!(t.current, Phase::Done);
        assert_eq!(stats.phases(),
                   vec![Phase::Init, Phase::Mapping, Phase::Barrier, Phase::Sorting, Phase::Reducing, Phase::Done]);
    }
}
