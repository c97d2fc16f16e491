use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use sharedmr::formats::lines::{self, LinesWriter};
use sharedmr::{Combiner, MEmitter, MRController, MRParameters, Mapper, MultiRecord, REmitter, Reducer};
use tracing_subscriber::EnvFilter;

/// Counts the words of the given files.
#[derive(Parser, Debug)]
struct Args {
    /// Input files
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Number of mapper threads
    #[arg(long, default_value_t = 4)]
    mappers: usize,
    /// Number of reducer threads (and partitions)
    #[arg(long, default_value_t = 4)]
    reducers: usize,
    /// Combine the counts of each file before they are shuffled
    #[arg(long)]
    combine: bool,
    /// Write partition N to <PREFIX>N instead of printing to stdout
    #[arg(long)]
    output_prefix: Option<String>,
}

struct WordcountMapper;

impl Mapper for WordcountMapper {
    fn map(&self, em: &mut MEmitter<'_>, path: &Path) -> Result<()> {
        for line in lines::new_from_file(path)? {
            for word in line?.split_whitespace() {
                em.emit(word, "1")?;
            }
        }
        Ok(())
    }
}

fn sum(values: &mut MultiRecord<'_>) -> Result<u64> {
    let mut total = 0;
    for v in values {
        total += v.parse::<u64>().with_context(|| format!("bad count {:?}", v))?;
    }
    Ok(total)
}

struct SumCombiner;

impl Combiner for SumCombiner {
    fn combine(&self, values: &mut MultiRecord<'_>) -> Result<String> {
        Ok(sum(values)?.to_string())
    }
}

struct SumReducer;

impl Reducer for SumReducer {
    fn reduce(&self, em: &mut REmitter, values: &mut MultiRecord<'_>) -> Result<()> {
        let key = values.key();
        em.emit(key, sum(values)?.to_string());
        Ok(())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let params = MRParameters::new()
        .set_concurrency(args.mappers, args.reducers)
        .with_env_overrides();
    let mut controller = MRController::new(WordcountMapper, SumReducer, params);
    if args.combine {
        controller = controller.set_combiner(SumCombiner);
    }
    let output = controller.run(&args.files)?;

    match args.output_prefix {
        Some(prefix) => {
            for part in &output.partitions {
                let name = format!("{}{}", prefix, part.partition);
                let mut w = LinesWriter::new_to_file(&name).with_context(|| format!("creating {}", name))?;
                for r in &part.records {
                    w.write_record(r)?;
                }
                w.finish()?;
            }
        }
        None => {
            let mut w = LinesWriter::new_to_write(std::io::stdout().lock());
            for r in output.records() {
                w.write_record(r)?;
            }
            w.finish()?;
        }
    }
    Ok(())
}
