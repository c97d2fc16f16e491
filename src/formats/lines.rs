//! Line-oriented text files. `LinesReader` is meant to be used inside a mapper to read its input
//! file; `LinesWriter` writes records as `key<TAB>value` lines, e.g. one output file per
//! partition.

use std::fs;
use std::io;
use std::io::{BufRead, Read, Write};
use std::path::Path;

use crate::record_types::Record;

type LinesIterator<Src> = io::Lines<io::BufReader<Src>>;

pub struct LinesReader<Src: Read> {
    src: LinesIterator<Src>,
}

/// Returns a LinesReader reading from the given file.
pub fn new_from_file<P: AsRef<Path>>(path: P) -> io::Result<LinesReader<fs::File>> {
    fs::OpenOptions::new()
        .read(true)
        .open(path)
        .map(move |f| LinesReader { src: io::BufReader::new(f).lines() })
}

impl<Src: Read> LinesReader<Src> {
    pub fn new(src: Src) -> LinesReader<Src> {
        LinesReader { src: io::BufReader::new(src).lines() }
    }
}

/// Iterate over the lines from a LinesReader. Read errors (including invalid UTF-8) are passed
/// on; a mapper should usually fail on them.
impl<Src: Read> Iterator for LinesReader<Src> {
    type Item = io::Result<String>;
    fn next(&mut self) -> Option<Self::Item> {
        self.src.next()
    }
}

/// Writer that separates the records written by '\n' characters.
pub struct LinesWriter<W: Write> {
    file: io::BufWriter<W>,
    lines: u64,
}

impl LinesWriter<fs::File> {
    pub fn new_to_file<P: AsRef<Path>>(path: P) -> io::Result<LinesWriter<fs::File>> {
        let f = fs::OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
        Ok(LinesWriter::new_to_write(f))
    }
}

impl<W: Write> LinesWriter<W> {
    pub fn new_to_write(w: W) -> LinesWriter<W> {
        LinesWriter {
            file: io::BufWriter::new(w),
            lines: 0,
        }
    }

    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }

    pub fn write_record(&mut self, r: &Record) -> io::Result<()> {
        self.write_line(&format!("{}\t{}", r.key, r.value))
    }

    pub fn lines_written(&self) -> u64 {
        self.lines
    }

    /// Flushes and returns the underlying writer.
    pub fn finish(self) -> io::Result<W> {
        self.file.into_inner().map_err(|e| e.into_error())
    }
}
