//! Implements a mapreduce process bounded to one machine and one address space.
//!
//! Mapper threads pull input files from a shared queue (smallest first) and emit pairs into a
//! fixed number of partitions, each guarded by its own lock. Once all mappers are done, every
//! partition is sorted by key and value, and reducer threads call the reducer once per
//! distinct key of each partition.
//!

pub mod closure_mr;
pub mod controller;
pub mod error;
pub mod formats;
pub mod input_queue;
pub mod map;
pub mod mapreducer;
pub mod parameters;
pub mod partition;
pub mod record_types;
pub mod reduce;
pub mod sort;
pub mod stats;
mod util;

pub use closure_mr::{FnCombiner, FnMapper, FnPartitioner, FnReducer};
pub use controller::{MROutput, MRController, Phase};
pub use error::{CallbackKind, EmitError, MRError, Result};
pub use mapreducer::{default_partition, Combiner, DefaultPartitioner, Mapper, Partitioner, Reducer};
pub use parameters::MRParameters;
pub use record_types::{MEmitter, MultiRecord, REmitter, Record};
pub use stats::RunStats;
