use std::fmt;

use time::{Duration, OffsetDateTime};

use crate::controller::Phase;
use crate::map::MapWorkerStats;

/// Counters and timings of one run.
#[derive(Clone, Debug)]
pub struct RunStats {
    pub started_at: OffsetDateTime,
    pub files: usize,
    /// Mapper threads actually started.
    pub mappers: usize,
    /// Reducer threads actually started.
    pub reducers: usize,
    pub partitions: usize,
    /// Pairs emitted by mappers.
    pub pairs_emitted: u64,
    /// Pairs in each partition after the map phase (after combining).
    pub pairs_per_partition: Vec<usize>,
    pub combiner_calls: u64,
    /// Reduce calls, i.e. distinct keys over all partitions.
    pub keys_reduced: u64,
    pub map_workers: Vec<MapWorkerStats>,
    /// Time spent in each phase, in the order the phases ran.
    pub phase_times: Vec<(Phase, Duration)>,
}

impl RunStats {
    pub(crate) fn new(started_at: OffsetDateTime) -> RunStats {
        RunStats {
            started_at: started_at,
            files: 0,
            mappers: 0,
            reducers: 0,
            partitions: 0,
            pairs_emitted: 0,
            pairs_per_partition: Vec::new(),
            combiner_calls: 0,
            keys_reduced: 0,
            map_workers: Vec::new(),
            phase_times: Vec::new(),
        }
    }

    pub(crate) fn record_map(&mut self, mut workers: Vec<MapWorkerStats>) {
        workers.sort_by_key(|w| w.worker);
        self.pairs_emitted = workers.iter().map(|w| w.emitted).sum();
        self.combiner_calls = workers.iter().map(|w| w.combiner_calls).sum();
        self.map_workers = workers;
    }

    pub fn pairs_stored(&self) -> usize {
        self.pairs_per_partition.iter().sum()
    }

    /// The phases the run went through, in order.
    pub fn phases(&self) -> Vec<Phase> {
        self.phase_times.iter().map(|&(p, _)| p).collect()
    }

    pub fn total_time(&self) -> Duration {
        self.phase_times.iter().fold(Duration::ZERO, |acc, &(_, d)| acc + d)
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f,
               "{} files on {} mappers, {} pairs emitted, {} stored in {} partitions, {} keys reduced on {} reducers",
               self.files,
               self.mappers,
               self.pairs_emitted,
               self.pairs_stored(),
               self.partitions,
               self.keys_reduced,
               self.reducers)?;
        for &(phase, d) in &self.phase_times {
            write!(f, "; {:?} {}ms", phase, d.whole_milliseconds())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_map_sums_workers() {
        let mut s = RunStats::new(OffsetDateTime::now_utc());
        s.record_map(vec![MapWorkerStats {
                              worker: 1,
                              files: 2,
                              emitted: 10,
                              stored: 4,
                              combiner_calls: 4,
                          },
                          MapWorkerStats {
                              worker: 0,
                              files: 1,
                              emitted: 5,
                              stored: 5,
                              combiner_calls: 0,
                          }]);
        assert_eq!(s.pairs_emitted, 15);
        assert_eq!(s.combiner_calls, 4);
        assert_eq!(s.map_workers[0].worker, 0);
    }

    #[test]
    fn test_phase_times() {
        let mut s = RunStats::new(OffsetDateTime::now_utc());
        s.phase_times.push((Phase::Mapping, Duration::milliseconds(5)));
        s.phase_times.push((Phase::Sorting, Duration::milliseconds(7)));
        assert_eq!(s.phases(), vec![Phase::Mapping, Phase::Sorting]);
        assert_eq!(s.total_time(), Duration::milliseconds(12));
        assert!(s.to_string().contains("Sorting 7ms"));
    }
}
