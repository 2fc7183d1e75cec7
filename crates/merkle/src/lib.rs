//! # Merkle tree — per-SSTable integrity summary
//!
//! Each SSTable run stores a metadata file: a binary Merkle tree whose
//! leaves are SHA-1 digests of the run's record values, bottom level padded
//! with *empty* nodes so every level pairs up evenly. The root digest is the
//! run's integrity fingerprint — recomputing it from the stored leaves and
//! comparing against the stored root detects tampering.
//!
//! ## Wire format
//!
//! Nodes are serialized in breadth-first order, root first. Each node is a
//! one-byte flags field (bit 0 set = empty padding node) followed by the
//! 20-byte SHA-1 digest when non-empty. Empty nodes carry no digest and do
//! not contribute bytes to their parent's hash.

use sha1::{Digest, Sha1};
use std::io::{self, Read, Write};
use thiserror::Error;

/// Bit 0 of the per-node flags byte: the node is right-padding.
const NODE_EMPTY: u8 = 1 << 0;

/// SHA-1 digest width.
pub const DIGEST_BYTES: usize = 20;

/// Errors from building or decoding a Merkle tree.
#[derive(Debug, Error)]
pub enum MerkleError {
    #[error("cannot build a merkle tree from zero leaves")]
    Empty,

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed merkle file: {0}")]
    Malformed(&'static str),
}

/// SHA-1 of a record value; the leaf content for [`MerkleTree`].
#[must_use]
pub fn leaf_digest(value: &[u8]) -> [u8; DIGEST_BYTES] {
    let digest = Sha1::digest(value);
    digest.into()
}

/// A Merkle tree stored as levels, root level first. `None` entries are the
/// empty padding nodes that square off odd-sized levels.
pub struct MerkleTree {
    levels: Vec<Vec<Option<[u8; DIGEST_BYTES]>>>,
}

impl MerkleTree {
    /// Builds the tree from precomputed leaf digests (see [`leaf_digest`]).
    pub fn from_leaf_digests(leaves: Vec<[u8; DIGEST_BYTES]>) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::Empty);
        }

        let mut levels: Vec<Vec<Option<[u8; DIGEST_BYTES]>>> = Vec::new();
        levels.push(leaves.into_iter().map(Some).collect());

        while levels.last().expect("at least one level").len() > 1 {
            let mut current = levels.pop().expect("at least one level");
            if current.len() % 2 != 0 {
                current.push(None);
            }

            let mut parents = Vec::with_capacity(current.len() / 2);
            for pair in current.chunks(2) {
                parents.push(Some(combine(&pair[0], &pair[1])));
            }

            levels.push(current);
            levels.push(parents);
        }

        levels.reverse();
        Ok(Self { levels })
    }

    /// Builds the tree directly from record values.
    pub fn from_values<'a, I>(values: I) -> Result<Self, MerkleError>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        Self::from_leaf_digests(values.into_iter().map(leaf_digest).collect())
    }

    /// The root digest — the integrity fingerprint of the whole run.
    #[must_use]
    pub fn root(&self) -> &[u8; DIGEST_BYTES] {
        self.levels[0][0].as_ref().expect("root is never empty")
    }

    /// Number of non-padding leaves.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.levels
            .last()
            .expect("at least one level")
            .iter()
            .filter(|n| n.is_some())
            .count()
    }

    /// Recomputes every internal hash from the stored leaves and compares
    /// the result with the stored root. `false` implies the file was
    /// tampered with or damaged.
    #[must_use]
    pub fn validate(&self) -> bool {
        let leaves: Vec<[u8; DIGEST_BYTES]> = self
            .levels
            .last()
            .expect("at least one level")
            .iter()
            .flatten()
            .copied()
            .collect();
        match Self::from_leaf_digests(leaves) {
            Ok(fresh) => fresh.root() == self.root(),
            Err(_) => false,
        }
    }

    /// Serializes the tree breadth-first, root node first.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for level in &self.levels {
            for node in level {
                match node {
                    Some(digest) => {
                        w.write_all(&[0u8])?;
                        w.write_all(digest)?;
                    }
                    None => w.write_all(&[NODE_EMPTY])?,
                }
            }
        }
        Ok(())
    }

    /// Reads a tree written by [`MerkleTree::write_to`].
    ///
    /// Levels are recovered from the breadth-first stream: the root level
    /// has one node, and each following level holds two children for every
    /// non-empty node above it.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, MerkleError> {
        let mut flat: Vec<Option<[u8; DIGEST_BYTES]>> = Vec::new();
        loop {
            let mut flags = [0u8; 1];
            match r.read_exact(&mut flags) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(MerkleError::Io(e)),
            }
            if flags[0] & NODE_EMPTY != 0 {
                flat.push(None);
            } else {
                let mut digest = [0u8; DIGEST_BYTES];
                r.read_exact(&mut digest)
                    .map_err(|_| MerkleError::Malformed("truncated node digest"))?;
                flat.push(Some(digest));
            }
        }

        if flat.is_empty() {
            return Err(MerkleError::Empty);
        }
        if flat[0].is_none() {
            return Err(MerkleError::Malformed("empty root node"));
        }

        let mut levels = Vec::new();
        let mut consumed = 0usize;
        let mut width = 1usize;
        while consumed < flat.len() {
            if consumed + width > flat.len() {
                return Err(MerkleError::Malformed("level sizes do not add up"));
            }
            let level: Vec<_> = flat[consumed..consumed + width].to_vec();
            consumed += width;
            width = 2 * level.iter().filter(|n| n.is_some()).count();
            levels.push(level);
            if width == 0 {
                break;
            }
        }
        if consumed != flat.len() {
            return Err(MerkleError::Malformed("trailing nodes after last level"));
        }

        Ok(Self { levels })
    }
}

/// Parent hash: SHA-1 over the concatenated child digests; empty children
/// contribute nothing.
fn combine(
    left: &Option<[u8; DIGEST_BYTES]>,
    right: &Option<[u8; DIGEST_BYTES]>,
) -> [u8; DIGEST_BYTES] {
    let mut hasher = Sha1::new();
    if let Some(l) = left {
        hasher.update(l);
    }
    if let Some(r) = right {
        hasher.update(r);
    }
    hasher.finalize().into()
}
