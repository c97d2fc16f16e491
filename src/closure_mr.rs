//! Adapters that turn closures into Mappers, Reducers, Combiners and Partitioners.
//!
//! Closures can be handed to a run directly through these wrappers; if you need more
//! flexibility (e.g. state shared between calls), implement the traits on your own type.

use std::path::Path;

use crate::mapreducer::{Combiner, Mapper, Partitioner, Reducer};
use crate::record_types::{MEmitter, MultiRecord, REmitter};

pub struct FnMapper<F> {
    f: F,
}

impl<F> FnMapper<F> {
    pub fn new(f: F) -> FnMapper<F>
        where F: Fn(&mut MEmitter<'_>, &Path) -> anyhow::Result<()> + Sync
    {
        FnMapper { f: f }
    }
}

impl<F> Mapper for FnMapper<F>
    where F: Fn(&mut MEmitter<'_>, &Path) -> anyhow::Result<()> + Sync
{
    fn map(&self, em: &mut MEmitter<'_>, path: &Path) -> anyhow::Result<()> {
        (self.f)(em, path)
    }
}

pub struct FnReducer<F> {
    f: F,
}

impl<F> FnReducer<F> {
    pub fn new(f: F) -> FnReducer<F>
        where F: Fn(&mut REmitter, &mut MultiRecord<'_>) -> anyhow::Result<()> + Sync
    {
        FnReducer { f: f }
    }
}

impl<F> Reducer for FnReducer<F>
    where F: Fn(&mut REmitter, &mut MultiRecord<'_>) -> anyhow::Result<()> + Sync
{
    fn reduce(&self, em: &mut REmitter, values: &mut MultiRecord<'_>) -> anyhow::Result<()> {
        (self.f)(em, values)
    }
}

pub struct FnCombiner<F> {
    f: F,
}

impl<F> FnCombiner<F> {
    pub fn new(f: F) -> FnCombiner<F>
        where F: Fn(&mut MultiRecord<'_>) -> anyhow::Result<String> + Sync
    {
        FnCombiner { f: f }
    }
}

impl<F> Combiner for FnCombiner<F>
    where F: Fn(&mut MultiRecord<'_>) -> anyhow::Result<String> + Sync
{
    fn combine(&self, values: &mut MultiRecord<'_>) -> anyhow::Result<String> {
        (self.f)(values)
    }
}

pub struct FnPartitioner<F> {
    f: F,
}

impl<F> FnPartitioner<F> {
    pub fn new(f: F) -> FnPartitioner<F>
        where F: Fn(&str, usize) -> usize + Sync
    {
        FnPartitioner { f: f }
    }
}

impl<F> Partitioner for FnPartitioner<F>
    where F: Fn(&str, usize) -> usize + Sync
{
    fn partition(&self, key: &str, n: usize) -> usize {
        (self.f)(key, n)
    }
}
