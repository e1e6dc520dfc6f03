//! BucketedHashStore: digest keys into signatures, shard them to disk
//! under the top 8 bits of `signature[0]`, and later regroup into
//! balanced buckets on iteration. An external-memory staging area that
//! the solver/CHD engines and the parallel assembler read buckets from
//! one at a time.

pub mod bucket;
pub mod shard;

use std::path::PathBuf;

use hashbrown::HashSet;
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::hash::{hash_sig2, hash_sig3, mix_seed, Sig2, Sig3, Signature};
use crate::store::shard::{Payload, ShardSet};

pub use bucket::{Bucket, BucketIterator};

/// Which signature width this store's records use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SigWidth {
    Two,
    Three,
}

/// A pending key, buffered so the store can replay it across reseed
/// attempts.
struct PendingKey {
    bytes: Vec<u8>,
    value: Option<u64>,
}

pub struct BucketedHashStore {
    cfg: StoreConfig,
    width: SigWidth,
    shards: ShardSet,
    seed: u64,
    reseed_attempts: u32,
    n: u64,
    value_width: u8,
    pending: Vec<PendingKey>,
}

impl BucketedHashStore {
    /// `open(transform, temp_dir, signature_bits)`: the `transform` from
    /// key to bytes is left to the caller as an external, pure function;
    /// this store only ever sees byte slices.
    pub fn open(temp_dir: impl Into<PathBuf>, signature_bits: u32, value_width: u8) -> Result<Self> {
        let width = if signature_bits > 128 { SigWidth::Three } else { SigWidth::Two };
        let cfg = StoreConfig { temp_dir: temp_dir.into(), signature_words: if width == SigWidth::Three { 3 } else { 2 }, checked: true };
        let shards = ShardSet::create(&cfg.temp_dir, cfg.signature_words, value_width)?;
        Ok(Self {
            cfg,
            width,
            shards,
            seed: 0,
            reseed_attempts: 0,
            n: 0,
            value_width,
            pending: Vec::new(),
        })
    }

    /// Discards any buffered signatures and sets the current seed.
    pub fn reset(&mut self, seed: u64) -> Result<()> {
        self.shards.truncate_all()?;
        self.seed = seed;
        self.n = 0;
        Ok(())
    }

    fn shard_for<S: Signature>(&self, sig: &S) -> usize {
        sig.top_bits(8) as usize
    }

    pub fn add(&mut self, key: &[u8]) -> Result<()> {
        self.add_impl(key, None)
    }

    pub fn add_with_value(&mut self, key: &[u8], value: u64) -> Result<()> {
        if self.value_width < 64 {
            let max = (1u64 << self.value_width) - 1;
            if value > max {
                return Err(Error::InvalidValueWidth { value, width: self.value_width });
            }
        }
        self.add_impl(key, Some(value))
    }

    fn add_impl(&mut self, key: &[u8], value: Option<u64>) -> Result<()> {
        self.pending.push(PendingKey { bytes: key.to_vec(), value });
        self.write_one(key, value, self.n as u32)?;
        self.n += 1;
        Ok(())
    }

    fn write_one(&mut self, key: &[u8], value: Option<u64>, ordinal: u32) -> Result<()> {
        let payload = match value {
            Some(v) => Payload::Value(v),
            None => Payload::Ordinal(ordinal),
        };
        match self.width {
            SigWidth::Two => {
                let sig = hash_sig2(key, self.seed);
                self.shards.write(self.shard_for(&sig), &sig, payload)
            }
            SigWidth::Three => {
                let sig = hash_sig3(key, self.seed);
                self.shards.write(self.shard_for(&sig), &sig, payload)
            }
        }
    }

    pub fn len(&self) -> u64 {
        self.n
    }

    pub fn set_bucket_size(&mut self, _bucket_size: usize) {
        // bucket_size is consumed by `iter`'s caller; stored on the
        // builder config, not here, so the store stays a pure staging
        // area. The computation it feeds — `NB = 2^ceil(log2(n/B))` —
        // only needs `n`, which `iter` already has.
    }

    /// Number of logical buckets iteration will yield for `bucket_size`,
    /// purely a function of `n` (no shard I/O) — lets a caller pre-size
    /// per-bucket tables before pulling the first record.
    pub fn bucket_count(&self, bucket_size: usize) -> u32 {
        let target = (self.n as f64 / bucket_size.max(1) as f64).max(1.0);
        1u32 << (target.log2().ceil().max(0.0) as u32)
    }

    /// Flushes pending writes and returns a lazy iterator over buckets in
    /// strictly increasing `index` order, pulling one shard group at a
    /// time rather than materializing every bucket up front. A bucket
    /// whose shard group contains a duplicate signature surfaces
    /// `Error::DuplicateSignature` from `next_bucket()` mid-stream; the
    /// caller (already partway through consuming buckets, e.g. into a
    /// parallel solve pipeline) is responsible for discarding that partial
    /// pass and calling `reseed_after_duplicate` before starting over with
    /// a fresh `stream_buckets` call.
    pub fn stream_buckets(&mut self, bucket_size: usize) -> Result<BucketIterator<'_>> {
        self.shards.finish()?;
        Ok(BucketIterator::new(&self.shards, self.n, bucket_size, self.cfg.checked))
    }

    /// Reseeds and replays every buffered key after a duplicate signature
    /// was detected mid-stream. Bounded by `max_reseeds`; surfaces
    /// `DuplicateKey` once the budget is spent (a real duplicate key
    /// never stops colliding no matter how many times the store reseeds).
    pub fn reseed_after_duplicate(&mut self, max_reseeds: u32, bucket: u32) -> Result<()> {
        if self.reseed_attempts >= max_reseeds {
            warn!(attempts = self.reseed_attempts, "duplicate signature persisted past reseed budget");
            return Err(Error::DuplicateKey);
        }
        self.reseed_attempts += 1;
        let new_seed = mix_seed(self.seed, self.reseed_attempts as u64);
        debug!(bucket, attempt = self.reseed_attempts, new_seed, "reseeding store after duplicate signature");
        self.reset(new_seed)?;
        self.replay_pending()?;
        self.shards.finish()?;
        Ok(())
    }

    fn replay_pending(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        // A genuine duplicate key (same bytes twice) can never stop
        // colliding by reseeding; detect it directly so the caller gets
        // `DuplicateKey` without burning the whole reseed budget first.
        let mut seen: HashSet<&[u8]> = HashSet::with_capacity(pending.len());
        for p in &pending {
            if !seen.insert(p.bytes.as_slice()) {
                self.pending = pending;
                return Err(Error::DuplicateKey);
            }
        }
        for (i, p) in pending.iter().enumerate() {
            self.write_one(&p.bytes, p.value, i as u32)?;
        }
        self.n = pending.len() as u64;
        self.pending = pending;
        Ok(())
    }

    /// Removes temporary files. Consumes `self`, so calling `iter()`
    /// after `close()` is a compile-time error rather than a runtime one.
    pub fn close(self) -> Result<()> {
        self.shards.close()
    }
}
