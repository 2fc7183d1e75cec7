//! Writes the five files of one SSTable run.
//!
//! The data file is streamed record by record; key contexts and merkle
//! leaves accumulate on the side so the index, summary, filter, and
//! metadata can be produced afterwards without re-reading the data file.

use crate::format::{IndexEntry, SummaryEntry, SummaryHeader};
use crate::TableError;
use bloom::BloomFilter;
use layout::TableKind;
use merkle::{MerkleTree, DIGEST_BYTES};
use record::{KeyContext, Record};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Target false-positive rate for every run's bloom filter.
pub const FILTER_FP_RATE: f64 = 0.01;

/// Incremental writer for one run. [`RunBuilder::add`] must be called in
/// strictly ascending key order — both producers (memtable iteration and
/// the k-way merge) already yield that order.
pub struct RunBuilder {
    dir: PathBuf,
    db: String,
    summary_page_size: usize,
    level: u32,
    run: u32,

    data: BufWriter<File>,
    contexts: Vec<KeyContext>,
    leaves: Vec<[u8; DIGEST_BYTES]>,
}

impl RunBuilder {
    /// Opens the run's data file for writing and prepares the accumulators.
    pub fn create(
        dir: &Path,
        db: &str,
        summary_page_size: usize,
        level: u32,
        run: u32,
    ) -> Result<Self, TableError> {
        let data_path = layout::table_path(dir, db, level, run, TableKind::Data);
        let data = BufWriter::new(File::create(data_path)?);
        Ok(Self {
            dir: dir.to_path_buf(),
            db: db.to_string(),
            summary_page_size,
            level,
            run,
            data,
            contexts: Vec::new(),
            leaves: Vec::new(),
        })
    }

    /// Appends one record to the data file and accumulates its key context
    /// and merkle leaf.
    pub fn add(&mut self, rec: &Record) -> Result<(), TableError> {
        rec.write_to(&mut self.data)?;
        self.contexts.push(rec.key_context());
        self.leaves.push(merkle::leaf_digest(&rec.value));
        Ok(())
    }

    /// Finalizes the data file and writes the four secondary files. The run
    /// is complete (and therefore readable) only after this returns.
    pub fn finish(mut self) -> Result<(), TableError> {
        if self.contexts.is_empty() {
            return Err(TableError::Empty);
        }

        self.data.flush()?;
        let file = self.data.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;

        build_secondaries(
            &self.dir,
            &self.db,
            self.summary_page_size,
            self.level,
            self.run,
            &self.contexts,
            self.leaves,
        )
    }
}

/// Convenience wrapper: builds a complete run from an ordered record
/// sequence (the memtable flush path).
pub fn build<'a, I>(
    dir: &Path,
    db: &str,
    summary_page_size: usize,
    level: u32,
    run: u32,
    records: I,
) -> Result<(), TableError>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut builder = RunBuilder::create(dir, db, summary_page_size, level, run)?;
    for rec in records {
        builder.add(rec)?;
    }
    builder.finish()
}

/// Writes index, summary, filter, and metadata for an already-written data
/// file, from the accumulated key contexts and merkle leaves.
fn build_secondaries(
    dir: &Path,
    db: &str,
    summary_page_size: usize,
    level: u32,
    run: u32,
    contexts: &[KeyContext],
    leaves: Vec<[u8; DIGEST_BYTES]>,
) -> Result<(), TableError> {
    write_index_and_summary(dir, db, summary_page_size, level, run, contexts)?;
    write_filter(dir, db, level, run, contexts)?;
    write_metadata(dir, db, level, run, leaves)?;
    Ok(())
}

fn write_index_and_summary(
    dir: &Path,
    db: &str,
    summary_page_size: usize,
    level: u32,
    run: u32,
    contexts: &[KeyContext],
) -> Result<(), TableError> {
    let index_path = layout::table_path(dir, db, level, run, TableKind::Index);
    let mut index = BufWriter::new(File::create(index_path)?);

    // The summary header depends on the entries, so the (small) entry array
    // is buffered and written after the header in one pass.
    let mut summary_entries: Vec<SummaryEntry> = Vec::new();
    let mut payload = 0u64;

    let last = contexts.len() - 1;
    let mut data_offset = 0i64;
    let mut index_offset = 0i64;

    for (i, kc) in contexts.iter().enumerate() {
        let entry = IndexEntry {
            offset: data_offset,
            key: kc.key.clone(),
        };
        entry.write_to(&mut index)?;
        data_offset += kc.rec_size as i64;

        // Sparse summary: first record, every page boundary, last record.
        if i == 0 || i % summary_page_size == 0 || i == last {
            let ste = SummaryEntry {
                offset: index_offset,
                key: kc.key.clone(),
            };
            payload += ste.encoded_len();
            summary_entries.push(ste);
        }
        index_offset += entry.encoded_len() as i64;
    }

    index.flush()?;

    let summary_path = layout::table_path(dir, db, level, run, TableKind::Summary);
    let mut summary = BufWriter::new(File::create(summary_path)?);
    let header = SummaryHeader {
        min_key: contexts[0].key.clone(),
        max_key: contexts[last].key.clone(),
        payload,
    };
    header.write_to(&mut summary)?;
    for ste in &summary_entries {
        ste.write_to(&mut summary)?;
    }
    summary.flush()?;

    Ok(())
}

fn write_filter(
    dir: &Path,
    db: &str,
    level: u32,
    run: u32,
    contexts: &[KeyContext],
) -> Result<(), TableError> {
    let mut bf = BloomFilter::new(contexts.len(), FILTER_FP_RATE);
    for kc in contexts {
        bf.insert(&kc.key);
    }

    let path = layout::table_path(dir, db, level, run, TableKind::Filter);
    let mut w = BufWriter::new(File::create(path)?);
    bf.write_to(&mut w)?;
    w.flush()?;
    Ok(())
}

fn write_metadata(
    dir: &Path,
    db: &str,
    level: u32,
    run: u32,
    leaves: Vec<[u8; DIGEST_BYTES]>,
) -> Result<(), TableError> {
    let tree = MerkleTree::from_leaf_digests(leaves)?;

    let path = layout::table_path(dir, db, level, run, TableKind::Metadata);
    let mut w = BufWriter::new(File::create(path)?);
    tree.write_to(&mut w)?;
    w.flush()?;
    Ok(())
}
