//! Parameters for a mapreduce process.
//!

use std::env;
use std::str::FromStr;

use crate::error::{MRError, Result};

/// Environment variables read by `MRParameters::with_env_overrides()`.
pub const ENV_MAPPERS: &str = "SHAREDMR_MAPPERS";
pub const ENV_REDUCERS: &str = "SHAREDMR_REDUCERS";
pub const ENV_PARTITIONS: &str = "SHAREDMR_PARTITIONS";
pub const ENV_PARTITION_PREALLOC: &str = "SHAREDMR_PARTITION_PREALLOC";

/// Initial capacity of each partition, in pairs.
pub const DEFAULT_PARTITION_PREALLOC: usize = 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MRParameters {
    pub mappers: usize,
    pub reducers: usize,

    /// Number of partitions; the number of reducers if unset.
    pub partitions: Option<usize>,

    pub partition_prealloc: usize,
}

impl Default for MRParameters {
    fn default() -> MRParameters {
        MRParameters::new()
    }
}

impl MRParameters {
    pub fn new() -> MRParameters {
        MRParameters {
            mappers: 4,
            reducers: 4,
            partitions: None,
            partition_prealloc: DEFAULT_PARTITION_PREALLOC,
        }
    }

    /// Determines how many threads run in each phase. Mappers and reducers never run at the
    /// same time (as the reducers need to wait for the map output). Unless set explicitly, the
    /// number of reducers also determines the number of partitions.
    ///
    /// There will never be more mapper threads than input files, nor more reducer threads than
    /// partitions.
    ///
    /// Default 4/4
    pub fn set_concurrency(mut self, mappers: usize, reducers: usize) -> MRParameters {
        self.mappers = mappers;
        self.reducers = reducers;
        self
    }

    /// Sets the number of partitions independently of the reducer count. With more partitions
    /// than reducers, reducer threads pick up a new partition as soon as they're done with one.
    pub fn set_partitions(mut self, partitions: usize) -> MRParameters {
        self.partitions = Some(partitions);
        self
    }

    /// How many pairs each partition has room for before its first reallocation. Partitions
    /// double their capacity when they fill up.
    ///
    /// Default 1024
    pub fn set_partition_prealloc(mut self, pairs: usize) -> MRParameters {
        self.partition_prealloc = pairs;
        self
    }

    /// Overrides parameters from the SHAREDMR_* environment variables. Values that don't parse
    /// are ignored.
    pub fn with_env_overrides(mut self) -> MRParameters {
        if let Some(n) = env_number(ENV_MAPPERS) {
            self.mappers = n;
        }
        if let Some(n) = env_number(ENV_REDUCERS) {
            self.reducers = n;
        }
        if let Some(n) = env_number(ENV_PARTITIONS) {
            self.partitions = Some(n);
        }
        if let Some(n) = env_number(ENV_PARTITION_PREALLOC) {
            self.partition_prealloc = n;
        }
        self
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.unwrap_or(self.reducers)
    }

    /// Number of reducer threads actually started.
    pub fn effective_reducers(&self) -> usize {
        self.reducers.min(self.num_partitions())
    }

    pub fn validate(&self) -> Result<()> {
        if self.mappers == 0 {
            return Err(MRError::InvalidArgument(String::from("number of mappers must be positive")));
        }
        if self.reducers == 0 {
            return Err(MRError::InvalidArgument(String::from("number of reducers must be positive")));
        }
        if self.num_partitions() == 0 {
            return Err(MRError::InvalidArgument(String::from("number of partitions must be positive")));
        }
        Ok(())
    }
}

fn env_number<T: FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("ignoring {}={:?}: not a number", name, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = MRParameters::new();
        assert_eq!(p.mappers, 4);
        assert_eq!(p.num_partitions(), 4);
        assert_eq!(p.partition_prealloc, 1024);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_partitions_follow_reducers() {
        let p = MRParameters::new().set_concurrency(2, 3);
        assert_eq!(p.num_partitions(), 3);
        assert_eq!(p.effective_reducers(), 3);

        let p = p.set_partitions(8);
        assert_eq!(p.num_partitions(), 8);
        assert_eq!(p.effective_reducers(), 3);

        let p = MRParameters::new().set_concurrency(2, 6).set_partitions(2);
        assert_eq!(p.effective_reducers(), 2);
    }

    #[test]
    fn test_validate() {
        assert!(MRParameters::new().set_concurrency(0, 1).validate().is_err());
        assert!(MRParameters::new().set_concurrency(1, 0).validate().is_err());
        assert!(MRParameters::new().set_partitions(0).validate().is_err());
        assert!(MRParameters::new().set_partition_prealloc(0).validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        // The only test touching these variables.
        env::set_var(ENV_MAPPERS, "7");
        env::set_var(ENV_PARTITIONS, "not a number");
        let p = MRParameters::new().with_env_overrides();
        env::remove_var(ENV_MAPPERS);
        env::remove_var(ENV_PARTITIONS);
        assert_eq!(p.mappers, 7);
        assert_eq!(p.partitions, None);
    }
}
