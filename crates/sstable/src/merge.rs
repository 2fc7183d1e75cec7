//! K-way merge over the data files of several runs.
//!
//! Produces records in ascending key order. When the same key appears in
//! more than one input, only the record with the greatest timestamp is
//! emitted (ties go to the higher input index, i.e. the newer run).
//! Tombstones are ordinary records here — compaction preserves them.
//!
//! This is the core primitive for compaction: walk N data files in sorted
//! order, resolve conflicts, and stream the result into the next level's
//! [`crate::RunBuilder`].

use crate::TableError;
use record::Record;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

/// One pending record from one input, ordered for the merge heap.
struct HeapEntry {
    rec: Record,
    /// Index into the readers array; higher = newer run.
    source: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; the entry that should pop first must
        // compare greatest. Smallest key wins; among equal keys the
        // greatest timestamp wins; among equal timestamps the newer run
        // (higher source index) wins.
        other
            .rec
            .key
            .cmp(&self.rec.key)
            .then_with(|| self.rec.timestamp.cmp(&other.rec.timestamp))
            .then_with(|| self.source.cmp(&other.source))
    }
}

/// Streaming merge of multiple sorted data files.
pub struct MergeIterator {
    readers: Vec<BufReader<File>>,
    heap: BinaryHeap<HeapEntry>,
}

impl MergeIterator {
    /// Opens every data file and primes the heap with each file's first
    /// record. Inputs that are already at EOF simply never contribute.
    pub fn open(paths: &[PathBuf]) -> Result<Self, TableError> {
        let mut readers = Vec::with_capacity(paths.len());
        let mut heap = BinaryHeap::new();

        for (source, path) in paths.iter().enumerate() {
            let mut reader = BufReader::new(File::open(path)?);
            if let Some(rec) = Record::read_from(&mut reader)? {
                heap.push(HeapEntry { rec, source });
            }
            readers.push(reader);
        }

        Ok(Self { readers, heap })
    }

    /// Returns the next merged record, or `None` when every input is
    /// exhausted. Duplicate keys across inputs collapse to the single
    /// winning record.
    pub fn next_record(&mut self) -> Result<Option<Record>, TableError> {
        let winner = match self.heap.pop() {
            Some(entry) => entry,
            None => return Ok(None),
        };
        self.advance(winner.source)?;

        // Conflict resolution: the winner popped first, so every other
        // entry with the same key is an older version to discard.
        while let Some(peek) = self.heap.peek() {
            if peek.rec.key != winner.rec.key {
                break;
            }
            let loser = self.heap.pop().expect("peeked entry exists");
            self.advance(loser.source)?;
        }

        Ok(Some(winner.rec))
    }

    /// Collects every remaining record. Test convenience.
    pub fn collect_all(&mut self) -> Result<Vec<Record>, TableError> {
        let mut out = Vec::new();
        while let Some(rec) = self.next_record()? {
            out.push(rec);
        }
        Ok(out)
    }

    /// Reads the next record from input `source`; EOF removes the input
    /// from the merge.
    fn advance(&mut self, source: usize) -> Result<(), TableError> {
        if let Some(rec) = Record::read_from(&mut self.readers[source])? {
            self.heap.push(HeapEntry { rec, source });
        }
        Ok(())
    }
}
