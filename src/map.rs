//! Implements the Map phase.
//!
//! Every mapper thread runs `map_worker`, which keeps claiming the next (smallest remaining)
//! input file until the queue runs dry. Pairs go straight into the shared partitions, or through
//! a per-file combiner batch if a combiner is configured.

use std::sync::Mutex;

use crate::error::{CallbackKind, MRError, Result};
use crate::input_queue::{FileEntry, FileQueue};
use crate::mapreducer::{Combiner, Mapper};
use crate::partition::PartitionStore;
use crate::record_types::{EmitSummary, MEmitter};
use crate::util::{guard_callback, FirstFailure};

/// What one mapper thread did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MapWorkerStats {
    pub worker: usize,
    pub files: usize,
    pub emitted: u64,
    pub stored: u64,
    pub combiner_calls: u64,
}

impl MapWorkerStats {
    fn add(&mut self, s: &EmitSummary) {
        self.files += 1;
        self.emitted += s.emitted;
        self.stored += s.stored;
        self.combiner_calls += s.combiner_calls;
    }
}

/// Runs the mapper on a single file.
pub(crate) fn map_file<M: Mapper + ?Sized>(mapper: &M,
                                           combiner: Option<&dyn Combiner>,
                                           store: &PartitionStore<'_>,
                                           entry: &FileEntry)
                                           -> Result<EmitSummary> {
    let mut em = MEmitter::new(store, combiner.is_some());
    let mapped = guard_callback(CallbackKind::Map, Some(entry.path.as_path()), || mapper.map(&mut em, &entry.path));
    match mapped {
        Ok(()) => em.finish(combiner),
        // An emit failure is the root cause even if the mapper went on to fail because of it.
        Err(e) => Err(em.take_failure().map(MRError::from).unwrap_or(e)),
    }
}

pub(crate) fn map_worker<M: Mapper + ?Sized>(worker: usize,
                                             mapper: &M,
                                             combiner: Option<&dyn Combiner>,
                                             queue: &FileQueue,
                                             store: &PartitionStore<'_>,
                                             failure: &FirstFailure,
                                             stats: &Mutex<Vec<MapWorkerStats>>) {
    let mut mine = MapWorkerStats {
        worker: worker,
        ..MapWorkerStats::default()
    };

    loop {
        if failure.is_tripped() {
            log::debug!("mapper {} stopping after failure elsewhere", worker);
            break;
        }
        let entry = match queue.next_file() {
            None => break,
            Some(e) => e,
        };
        log::debug!("mapper {} claimed {} ({} bytes)", worker, entry.path.display(), entry.size);
        match map_file(mapper, combiner, store, entry) {
            Ok(summary) => mine.add(&summary),
            Err(e) => {
                failure.record(e);
                break;
            }
        }
    }

    log::debug!("mapper {} done: {} files, {} pairs", worker, mine.files, mine.emitted);
    stats.lock().unwrap_or_else(|p| p.into_inner()).push(mine);
}
