//! Hands out work items (input files, partitions) to worker threads, one at a time.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// A fixed list of items and a shared cursor into it. Claiming is the only operation that takes
/// the lock, and it only reads and advances the cursor.
pub struct WorkQueue<T> {
    items: Vec<T>,
    cursor: Mutex<usize>,
}

impl<T> WorkQueue<T> {
    pub fn new(items: Vec<T>) -> WorkQueue<T> {
        WorkQueue {
            items: items,
            cursor: Mutex::new(0),
        }
    }

    /// Returns the next unclaimed item together with its position, or None once every item
    /// has been claimed. Never returns an item twice.
    pub fn claim(&self) -> Option<(usize, &T)> {
        let idx = {
            let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
            if *cursor >= self.items.len() {
                return None;
            }
            let idx = *cursor;
            *cursor += 1;
            idx
        };
        Some((idx, &self.items[idx]))
    }

    pub fn claimed(&self) -> usize {
        *self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_exhausted(&self) -> bool {
        self.claimed() >= self.items.len()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }
}

/// An input file and its size at the time the queue was built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub size: u64,
}

/// Size assigned to files that cannot be stat'ed; they are handed out last.
pub const UNKNOWN_FILE_SIZE: u64 = u64::MAX;

pub type FileQueue = WorkQueue<FileEntry>;

impl WorkQueue<FileEntry> {
    /// Builds the queue from a list of paths, smallest file first. Each file is stat'ed exactly
    /// once; files of equal size keep their original order.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> FileQueue {
        let mut entries: Vec<FileEntry> = paths.iter()
            .map(|p| {
                let path = p.as_ref().to_path_buf();
                let size = match fs::metadata(&path) {
                    Ok(md) => md.len(),
                    Err(e) => {
                        log::warn!("could not stat {}: {}; scheduling it last", path.display(), e);
                        UNKNOWN_FILE_SIZE
                    }
                };
                FileEntry {
                    path: path,
                    size: size,
                }
            })
            .collect();
        entries.sort_by_key(|e| e.size);
        WorkQueue::new(entries)
    }

    pub fn next_file(&self) -> Option<&FileEntry> {
        self.claim().map(|(_, e)| e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io::Write;
    use std::sync::Mutex;
    use std::thread;

    fn write_file(dir: &Path, name: &str, len: usize) -> PathBuf {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(&vec![b'x'; len]).unwrap();
        path
    }

    #[test]
    fn test_claims_every_item_once() {
        let q = WorkQueue::new(vec!["a", "b", "c"]);
        assert_eq!(q.claim(), Some((0, &"a")));
        assert_eq!(q.claim(), Some((1, &"b")));
        assert_eq!(q.claim(), Some((2, &"c")));
        assert!(q.is_exhausted());
        for _ in 0..3 {
            assert_eq!(q.claim(), None);
        }
        assert_eq!(q.claimed(), 3);
    }

    #[test]
    fn test_empty_queue() {
        let q: WorkQueue<u32> = WorkQueue::new(vec![]);
        assert!(q.is_empty());
        assert!(q.is_exhausted());
        assert_eq!(q.claim(), None);
    }

    #[test]
    fn test_files_sorted_by_size() {
        let dir = tempfile::tempdir().unwrap();
        let big = write_file(dir.path(), "big", 300);
        let small = write_file(dir.path(), "small", 10);
        let medium = write_file(dir.path(), "medium", 100);
        let missing = dir.path().join("missing");
        let also_small = write_file(dir.path(), "also_small", 10);

        let q = FileQueue::from_paths(&[missing.clone(), big.clone(), small.clone(), medium.clone(), also_small.clone()]);
        let order: Vec<PathBuf> = q.items().iter().map(|e| e.path.clone()).collect();
        assert_eq!(order, vec![small, also_small, medium, big, missing]);
        assert_eq!(q.items()[4].size, UNKNOWN_FILE_SIZE);

        let mut n = 0;
        while let Some(_) = q.next_file() {
            n += 1;
        }
        assert_eq!(n, 5);
        assert!(q.next_file().is_none());
    }

    #[test]
    fn test_concurrent_claims_are_unique_and_ordered() {
        let q = WorkQueue::new((0..1000u64).collect::<Vec<_>>());
        let claims = Mutex::new(Vec::new());
        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let mut local = Vec::new();
                    while let Some((_, v)) = q.claim() {
                        local.push(*v);
                    }
                    // Every thread sees the items in strictly ascending order.
                    assert!(local.windows(2).all(|w| w[0] < w[1]));
                    claims.lock().unwrap().extend(local);
                });
            }
        });
        let claims = claims.into_inner().unwrap();
        assert_eq!(claims.len(), 1000);
        let unique: HashSet<u64> = claims.iter().cloned().collect();
        assert_eq!(unique.len(), 1000);
    }

    #[test]
    fn test_claims_follow_queue_order() {
        // Items deliberately differ from their positions.
        let q = WorkQueue::new(vec![30u64, 10, 20]);
        let claims = Mutex::new(Vec::new());
        thread::scope(|s| {
            for _ in 0..3 {
                s.spawn(|| {
                    while let Some((idx, v)) = q.claim() {
                        claims.lock().unwrap().push((idx, *v));
                    }
                });
            }
        });
        let mut claims = claims.into_inner().unwrap();
        claims.sort();
        assert_eq!(claims, vec![(0, 30), (1, 10), (2, 20)]);
    }
}
