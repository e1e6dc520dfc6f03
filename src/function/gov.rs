//! General static functions and MPHFs over the peeling engine: bucket
//! the keys, solve each bucket's hypergraph, pack the results into an
//! [`Artifact`], then answer `get()` with the same bucket/variable
//! arithmetic run in reverse.

use crate::assembler::{assemble, unpack_offset};
use crate::bits::BitVector;
use crate::config::{BuildConfig, Engine};
use crate::error::{Error, Result};
use crate::hash::{bucket_for, hash_sig2, Sig2};
use crate::store::BucketedHashStore;
use crate::succinct::RankSelect;

use super::Artifact;

/// Splits `data` (one `width`-bit cell per variable in `[0, total_vars)`)
/// into a sparse marker plus a packed stream of only the nonzero cells.
fn compact(data: &BitVector, total_vars: u64, width: u8) -> (RankSelect, BitVector) {
    let mut marker_bits = BitVector::with_zeroed_bits(total_vars);
    let mut packed = BitVector::new();
    for v in 0..total_vars {
        let cell = data.get_range(v * width as u64, width);
        if cell != 0 {
            marker_bits.set_bit(v);
            packed.append_bits(cell, width);
        }
    }
    (RankSelect::new(marker_bits), packed)
}

/// A general function over a fixed key set: `get()` returns a stored
/// `value_width`-bit value for any key presented at build time, and an
/// unspecified value in `[0, 2^value_width)` for anything else.
pub struct GovFunction {
    artifact: Artifact,
    default_return_value: u64,
}

impl GovFunction {
    /// Builds a function over `keys`. `values`, if given, must have the
    /// same length as `keys`; when absent each key's value is its
    /// position in `keys` (`[0, n)`), which is what makes this the same
    /// machinery an MPHF is built on. `default_return_value` is only
    /// ever observed when `cfg.signature_check_bits > 0` and a queried
    /// key's signature doesn't match what was stored for the slot its
    /// linear form lands on.
    pub fn build<K: AsRef<[u8]>>(
        keys: &[K],
        values: Option<&[u64]>,
        cfg: &BuildConfig,
        default_return_value: u64,
    ) -> Result<Self> {
        if let Some(v) = values {
            if v.len() != keys.len() {
                return Err(Error::ValueCountMismatch { keys: keys.len(), values: v.len() });
            }
        }
        let degree = match cfg.engine {
            Engine::Peeling { degree } => degree,
            Engine::Chd => crate::config::Degree::Three,
        };

        let temp_dir = tempfile::Builder::new().prefix("hyperphf-gov-").tempdir().map_err(Error::TempIo)?;
        let mut store = BucketedHashStore::open(temp_dir.path(), 128, cfg.value_width)?;
        store.reset(cfg.global_seed)?;
        for (i, k) in keys.iter().enumerate() {
            match values {
                Some(v) => store.add_with_value(k.as_ref(), v[i])?,
                None => store.add(k.as_ref())?,
            }
        }
        let n = store.len();

        let assembled = assemble(&mut store, cfg, |words| Sig2([words[0], words[1]]))?;
        store.close()?;
        let signatures = assembled.signatures;
        let num_buckets = assembled.offset_and_seed.len() as u64 - 1;
        let multiplier = num_buckets * 2;

        let (marker, data) = if cfg.compacted {
            let total_vars = unpack_offset(*assembled.offset_and_seed.last().unwrap());
            let (marker, packed) = compact(&assembled.data, total_vars, cfg.value_width);
            (Some(marker), packed)
        } else {
            (None, assembled.data)
        };

        let artifact = Artifact {
            n,
            global_seed: cfg.global_seed,
            width: cfg.value_width,
            multiplier,
            degree,
            offset_and_seed: assembled.offset_and_seed,
            data,
            marker,
            signature_check_bits: cfg.signature_check_bits,
            signatures,
        };
        Ok(Self { artifact, default_return_value })
    }

    pub fn get(&self, key: &[u8]) -> u64 {
        let sig = hash_sig2(key, self.artifact.global_seed);
        let bucket = bucket_for(sig.0[0], self.artifact.multiplier);
        let result = self.artifact.eval(&sig, bucket);
        if self.artifact.check(&sig, result) {
            result
        } else {
            self.default_return_value
        }
    }

    pub fn len(&self) -> u64 {
        self.artifact.n
    }

    pub fn is_empty(&self) -> bool {
        self.artifact.n == 0
    }

    /// The underlying packed tables, e.g. for serialization or
    /// introspecting bucket layout.
    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }
}

/// An MPHF: `get()` returns a bijection onto `[0, n)` for keys in the
/// build set. Values default to each key's position in the input
/// sequence, so there is nothing left to pass in beyond the keys
/// themselves.
pub struct GovMinimalPerfectHashFunction {
    inner: GovFunction,
}

impl GovMinimalPerfectHashFunction {
    pub fn build<K: AsRef<[u8]>>(keys: &[K], cfg: &BuildConfig) -> Result<Self> {
        let inner = GovFunction::build(keys, None, cfg, u64::MAX)?;
        Ok(Self { inner })
    }

    /// `None` only ever surfaces when `cfg.signature_check_bits > 0` and
    /// the key wasn't in the build set; without a check word enabled,
    /// every key (member or not) maps to some index in `[0, n)`.
    pub fn get(&self, key: &[u8]) -> Option<u64> {
        match self.inner.get(key) {
            u64::MAX => None,
            v => Some(v),
        }
    }

    pub fn len(&self) -> u64 {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn artifact(&self) -> &Artifact {
        self.inner.artifact()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Degree;

    fn cfg() -> BuildConfig {
        BuildConfig {
            engine: Engine::Peeling { degree: Degree::Three },
            bucket_size: 64,
            value_width: 32,
            ..Default::default()
        }
    }

    #[test]
    fn mphf_is_bijective_on_build_keys() {
        let keys: Vec<String> = (0..500).map(|i| format!("user-{i}@example.com")).collect();
        let mphf = GovMinimalPerfectHashFunction::build(&keys, &cfg()).unwrap();
        let mut seen = vec![false; keys.len()];
        for k in &keys {
            let v = mphf.get(k.as_bytes()).expect("build key must resolve");
            assert!((v as usize) < keys.len());
            assert!(!seen[v as usize], "index {v} produced twice");
            seen[v as usize] = true;
        }
        assert!(seen.into_iter().all(|s| s));
    }

    #[test]
    fn general_function_returns_explicit_values() {
        let keys: Vec<String> = (0..300).map(|i| format!("k{i}")).collect();
        let values: Vec<u64> = (0..300).map(|i| (i as u64) * 7 + 1).collect();
        let f = GovFunction::build(&keys, Some(&values), &cfg(), 0).unwrap();
        for (i, k) in keys.iter().enumerate() {
            assert_eq!(f.get(k.as_bytes()), values[i]);
        }
    }

    #[test]
    fn compacted_layout_matches_uncompacted_values() {
        let keys: Vec<String> = (0..400).map(|i| format!("c{i}")).collect();
        let values: Vec<u64> = (0..400).map(|i| i as u64).collect();

        let mut c = cfg();
        c.compacted = true;
        let compacted = GovFunction::build(&keys, Some(&values), &c, 0).unwrap();

        let plain = GovFunction::build(&keys, Some(&values), &cfg(), 0).unwrap();

        for (i, k) in keys.iter().enumerate() {
            assert_eq!(compacted.get(k.as_bytes()), values[i]);
            assert_eq!(compacted.get(k.as_bytes()), plain.get(k.as_bytes()));
        }
    }

    #[test]
    fn signature_check_rejects_non_member_keys() {
        let mut c = cfg();
        c.signature_check_bits = 16;
        let keys: Vec<String> = (0..200).map(|i| format!("member-{i}")).collect();
        let f = GovFunction::build(&keys, None, &c, u64::MAX).unwrap();
        for k in &keys {
            assert_ne!(f.get(k.as_bytes()), u64::MAX);
        }
        let mut misses = 0;
        for i in 0..200 {
            if f.get(format!("not-a-member-{i}").as_bytes()) == u64::MAX {
                misses += 1;
            }
        }
        assert!(misses > 150, "expected most non-members to be rejected, got {misses}/200");
    }
}
