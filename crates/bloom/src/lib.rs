//! # Bloom Filter
//!
//! A space-efficient probabilistic data structure for set membership testing.
//!
//! A bloom filter can tell you with certainty that a key is **not** in the set
//! (no false negatives), but may occasionally report that a key **is** in the
//! set when it isn't (false positives). The false positive rate depends on the
//! number of bits and hash functions used.
//!
//! Every SSTable run stores one filter file built from its keys. During point
//! lookups the engine checks the filter first — if it says "not present", the
//! run is skipped entirely, avoiding summary/index/data I/O.
//!
//! ## Wire format (all little-endian)
//!
//! ```text
//! [m: u32][k: u32][seeds: u32 * k][bits: ceil(m/8) bytes]
//! ```
//!
//! The hash family is MurmurHash3 32-bit, one seed per hash function. The
//! seeds are drawn from the clock at construction and persisted with the
//! bits, so a reader reconstructs exactly the hash functions the writer
//! used — the seed list is part of the wire contract.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

/// A bloom filter backed by a bit vector with `k` seeded Murmur3 hashes.
pub struct BloomFilter {
    /// Number of bits in the filter.
    m: u32,
    /// Number of hash functions.
    k: u32,
    /// One Murmur3 seed per hash function, persisted alongside the bits.
    seeds: Vec<u32>,
    /// The bit vector storing the filter state.
    bits: Vec<u8>,
}

impl BloomFilter {
    /// Creates a bloom filter sized for `expected_items` with the given
    /// target `false_positive_rate`, with seeds drawn from the clock.
    ///
    /// # Panics
    ///
    /// Panics if `expected_items` is 0 or `false_positive_rate` is not in `(0, 1)`.
    pub fn new(expected_items: usize, false_positive_rate: f64) -> Self {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        Self::with_base_seed(expected_items, false_positive_rate, ts)
    }

    /// Like [`BloomFilter::new`] but with a caller-chosen base seed, for
    /// deterministic construction in tests.
    pub fn with_base_seed(expected_items: usize, false_positive_rate: f64, base: u32) -> Self {
        assert!(expected_items > 0, "expected_items must be > 0");
        assert!(
            false_positive_rate > 0.0 && false_positive_rate < 1.0,
            "false_positive_rate must be in (0, 1)"
        );

        // Optimal number of bits: m = n * |ln p| / (ln 2)^2
        let n = expected_items as f64;
        let m = (n * false_positive_rate.ln().abs() / std::f64::consts::LN_2.powi(2)).ceil() as u32;
        let m = m.max(8);

        // Optimal number of hashes: k = (m/n) * ln 2
        let k = ((f64::from(m) / n) * std::f64::consts::LN_2).ceil() as u32;
        let k = k.max(1);

        // Distinct seed per hash function.
        let seeds: Vec<u32> = (0..k)
            .map(|i| base.wrapping_add(i.wrapping_mul(0x9e37_79b9)))
            .collect();

        let byte_len = ((m + 7) / 8) as usize;

        Self {
            m,
            k,
            seeds,
            bits: vec![0u8; byte_len],
        }
    }

    /// Inserts a key into the bloom filter.
    pub fn insert(&mut self, key: &[u8]) {
        for i in 0..self.k as usize {
            let idx = murmur3_32(key, self.seeds[i]) % self.m;
            self.set_bit(idx);
        }
    }

    /// Returns `true` if the key **might** be in the set, `false` if it is
    /// **definitely not** in the set.
    #[must_use]
    pub fn may_contain(&self, key: &[u8]) -> bool {
        for i in 0..self.k as usize {
            let idx = murmur3_32(key, self.seeds[i]) % self.m;
            if !self.get_bit(idx) {
                return false;
            }
        }
        true
    }

    /// Returns the number of bits in the filter.
    #[must_use]
    pub fn num_bits(&self) -> u32 {
        self.m
    }

    /// Returns the number of hash functions.
    #[must_use]
    pub fn num_hashes(&self) -> u32 {
        self.k
    }

    /// Serializes the filter: `[m: u32][k: u32][seeds][bits]`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.m)?;
        w.write_u32::<LittleEndian>(self.k)?;
        for &seed in &self.seeds {
            w.write_u32::<LittleEndian>(seed)?;
        }
        w.write_all(&self.bits)?;
        Ok(())
    }

    /// Deserializes a filter written by [`BloomFilter::write_to`].
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let m = r.read_u32::<LittleEndian>()?;
        let k = r.read_u32::<LittleEndian>()?;

        if m == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "bloom filter with zero bits",
            ));
        }
        // Safety cap: a filter should never come close to 128 MiB.
        const MAX_BLOOM_BYTES: u32 = 128 * 1024 * 1024;
        if m / 8 > MAX_BLOOM_BYTES || k > 64 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("implausible bloom filter dimensions (m={}, k={})", m, k),
            ));
        }

        let mut seeds = Vec::with_capacity(k as usize);
        for _ in 0..k {
            seeds.push(r.read_u32::<LittleEndian>()?);
        }

        let mut bits = vec![0u8; ((m + 7) / 8) as usize];
        r.read_exact(&mut bits)?;

        Ok(Self { m, k, seeds, bits })
    }

    // ---- Internal helpers ----

    fn set_bit(&mut self, idx: u32) {
        let byte_idx = (idx / 8) as usize;
        let bit_offset = (idx % 8) as u8;
        self.bits[byte_idx] |= 1 << bit_offset;
    }

    fn get_bit(&self, idx: u32) -> bool {
        let byte_idx = (idx / 8) as usize;
        let bit_offset = (idx % 8) as u8;
        (self.bits[byte_idx] >> bit_offset) & 1 == 1
    }
}

impl std::fmt::Debug for BloomFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BloomFilter")
            .field("m", &self.m)
            .field("k", &self.k)
            .field("bytes", &self.bits.len())
            .finish()
    }
}

/// MurmurHash3, 32-bit variant, with a caller-supplied seed.
fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    const C1: u32 = 0xcc9e_2d51;
    const C2: u32 = 0x1b87_3593;

    let mut h = seed;
    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(C1);
        k = k.rotate_left(15);
        k = k.wrapping_mul(C2);
        h ^= k;
        h = h.rotate_left(13);
        h = h.wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut k = 0u32;
        for (i, &b) in tail.iter().enumerate() {
            k |= u32::from(b) << (8 * i);
        }
        k = k.wrapping_mul(C1);
        k = k.rotate_left(15);
        k = k.wrapping_mul(C2);
        h ^= k;
    }

    h ^= data.len() as u32;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}
