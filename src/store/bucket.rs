//! Bucket iteration: group shard records into logical buckets of
//! `NB = 2^ceil(log2(n/B))` by the top `log2(NB)` bits of `signature[0]`,
//! sorting and duplicate-checking each underlying shard once.

use crate::error::{Error, Result};
use crate::store::shard::{Payload, ShardSet, NUM_SHARDS};

/// One logical bucket: its ordinal position in the global bucket order,
/// and its sorted signatures (as raw word vectors) with optional values.
#[derive(Debug, Clone)]
pub struct Bucket {
    pub index: u32,
    pub signatures: Vec<Vec<u64>>,
    pub values: Vec<u64>,
}

impl Bucket {
    pub fn size(&self) -> usize {
        self.signatures.len()
    }
}

/// Iterates buckets in strictly increasing `index` order. Loads and
/// sorts one underlying shard (or a merged run of shards, when `NB <
/// 256`) at a time into a reused buffer.
pub struct BucketIterator<'a> {
    shards: &'a ShardSet,
    num_buckets: u32,
    bucket_bits: u32,
    checked: bool,
    next_bucket: u32,
    /// Buffer of (signature words, value) for the shard(s) feeding the
    /// current run of buckets, sorted, reused across buckets within the
    /// same shard group.
    buffer: Vec<(Vec<u64>, u64)>,
    buffer_pos: usize,
    /// First bucket index covered by `buffer`.
    buffer_base: u32,
    buffer_shard_group_end: u32,
    buffer_loaded: bool,
}

impl<'a> BucketIterator<'a> {
    pub fn new(shards: &'a ShardSet, n: u64, bucket_size: usize, checked: bool) -> Self {
        let target = (n as f64 / bucket_size.max(1) as f64).max(1.0);
        let bucket_bits = target.log2().ceil().max(0.0) as u32;
        let num_buckets = 1u32 << bucket_bits;
        Self {
            shards,
            num_buckets,
            bucket_bits,
            checked,
            next_bucket: 0,
            buffer: Vec::new(),
            buffer_pos: 0,
            buffer_base: 0,
            buffer_shard_group_end: 0,
            buffer_loaded: false,
        }
    }

    pub fn num_buckets(&self) -> u32 {
        self.num_buckets
    }

    /// Load and sort the shard group that covers `bucket_index`.
    fn load_group_for(&mut self, bucket_index: u32) -> Result<()> {
        self.buffer.clear();
        self.buffer_pos = 0;

        if self.num_buckets >= NUM_SHARDS as u32 {
            // Each shard maps to num_buckets/256 consecutive buckets.
            let buckets_per_shard = self.num_buckets / NUM_SHARDS as u32;
            let shard = (bucket_index / buckets_per_shard) as usize;
            self.buffer = self.shards.read_shard(shard)?;
            self.buffer.sort_by(|a, b| a.0.cmp(&b.0));
            self.buffer_base = shard as u32 * buckets_per_shard;
            self.buffer_shard_group_end = self.buffer_base + buckets_per_shard;
        } else {
            // Multiple shards merge into a single bucket.
            let shards_per_bucket = NUM_SHARDS as u32 / self.num_buckets;
            let first_shard = bucket_index * shards_per_bucket;
            for s in first_shard..first_shard + shards_per_bucket {
                self.buffer.extend(self.shards.read_shard(s as usize)?);
            }
            self.buffer.sort_by(|a, b| a.0.cmp(&b.0));
            self.buffer_base = bucket_index;
            self.buffer_shard_group_end = bucket_index + 1;
        }

        self.buffer_loaded = true;
        if self.checked {
            for w in self.buffer.windows(2) {
                if w[0].0 == w[1].0 {
                    return Err(Error::DuplicateSignature { bucket: bucket_index });
                }
            }
        }
        Ok(())
    }

    /// Pull the next bucket, or `None` once all `num_buckets` have been
    /// emitted.
    pub fn next_bucket(&mut self) -> Result<Option<Bucket>> {
        if self.next_bucket >= self.num_buckets {
            return Ok(None);
        }
        let idx = self.next_bucket;
        if !self.buffer_loaded || idx < self.buffer_base || idx >= self.buffer_shard_group_end {
            self.load_group_for(idx)?;
        }

        let shift = if self.bucket_bits == 0 { 64 } else { 64 - self.bucket_bits };
        let mut signatures = Vec::new();
        let mut values = Vec::new();
        while self.buffer_pos < self.buffer.len() {
            let (sig, val) = &self.buffer[self.buffer_pos];
            let top = if self.bucket_bits == 0 { 0 } else { sig[0] >> shift };
            if top as u32 != idx {
                break;
            }
            signatures.push(sig.clone());
            values.push(*val);
            self.buffer_pos += 1;
        }

        self.next_bucket += 1;
        Ok(Some(Bucket { index: idx, signatures, values }))
    }
}

/// Materialize every record's ordinal payload from a key stream, for
/// callers that want to pass plain ordinals rather than user values.
pub fn ordinal_payload(i: usize) -> Payload {
    Payload::Ordinal(i as u32)
}
