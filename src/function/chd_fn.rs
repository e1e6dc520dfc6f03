//! MPHF over the CHD engine: keys are routed to chunks by the top bits
//! of a global signature, each chunk solves its own displacement
//! coefficients independently, and a key's final index is its chunk's
//! base offset plus the rank of its slot among that chunk's occupied
//! positions.

use crate::bits::BitVector;
use crate::chd::coeff::{query_position, CoefficientTable};
use crate::chd::{solve_chunk, ChunkInput};
use crate::config::BuildConfig;
use crate::error::{Error, Result};
use crate::hash::{hash_sig3, mix_seed, spread, Signature};
use crate::succinct::RankSelect;

const DEFAULT_CHUNK_SIZE: u64 = 1 << 16;
const LOAD_FACTOR: f64 = 0.99;
const MAX_ATTEMPTS_PER_BUCKET: u64 = 200_000;

/// One chunk's solved placement: `p` slots, `coeff` resolving each small
/// bucket's displacement, and `occupied` turning a raw slot into a
/// compact rank within the chunk.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct ChdChunk {
    p: u64,
    local_seed: u64,
    base: u64,
    num_small_buckets: usize,
    occupied: RankSelect,
    coeff: CoefficientTable,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChdArtifact {
    n: u64,
    global_seed: u64,
    chunk_bits: u32,
    chunks: Vec<ChdChunk>,
}

pub struct ChdMinimalPerfectHashFunction {
    artifact: ChdArtifact,
}

impl ChdMinimalPerfectHashFunction {
    pub fn build<K: AsRef<[u8]>>(keys: &[K], cfg: &BuildConfig) -> Result<Self> {
        let n = keys.len() as u64;
        let chunk_bits = if n <= DEFAULT_CHUNK_SIZE {
            0
        } else {
            let chunks_needed = (n as f64 / DEFAULT_CHUNK_SIZE as f64).ceil();
            chunks_needed.log2().ceil() as u32
        };
        let num_chunks = 1usize << chunk_bits;

        let mut grouped: Vec<Vec<&[u8]>> = vec![Vec::new(); num_chunks];
        for k in keys {
            let bytes = k.as_ref();
            let sig = hash_sig3(bytes, cfg.global_seed);
            let cid = sig.top_bits(chunk_bits) as usize;
            grouped[cid].push(bytes);
        }

        let mut chunks = Vec::with_capacity(num_chunks);
        let mut base = 0u64;
        for (chunk_idx, members) in grouped.iter().enumerate() {
            if members.is_empty() {
                chunks.push(ChdChunk {
                    p: 0,
                    local_seed: 0,
                    base,
                    num_small_buckets: 0,
                    occupied: RankSelect::new(BitVector::new()),
                    coeff: CoefficientTable::build(1, &[]),
                });
                continue;
            }

            let mut attempt = 0u32;
            loop {
                let chunk_seed = mix_seed(cfg.global_seed, chunk_idx as u64).wrapping_add(attempt as u64);
                let input = ChunkInput::build(members, chunk_seed, LOAD_FACTOR);
                match solve_chunk(&input, MAX_ATTEMPTS_PER_BUCKET) {
                    Some(solution) => {
                        let mut occ = BitVector::with_zeroed_bits(solution.p);
                        for (bi, member_indices) in input.small_buckets.iter().enumerate() {
                            let (c0, c1) = solution.coefficients[bi];
                            for &i in member_indices {
                                let sig = input.signatures[i];
                                let h1 = sig.0[0] % solution.p;
                                let h2 = 1 + (sig.0[1] % (solution.p - 1));
                                let pos = query_position(h1, h2, c0, c1, solution.p);
                                occ.set_bit(pos);
                            }
                        }
                        chunks.push(ChdChunk {
                            p: solution.p,
                            local_seed: chunk_seed,
                            base,
                            num_small_buckets: input.small_buckets.len(),
                            occupied: RankSelect::new(occ),
                            coeff: CoefficientTable::build(solution.p, &solution.coefficients),
                        });
                        base += members.len() as u64;
                        break;
                    }
                    None => {
                        attempt += 1;
                        if attempt > cfg.max_solver_retries {
                            return Err(Error::SeedExhausted { bucket: chunk_idx as u32 });
                        }
                    }
                }
            }
        }

        Ok(Self { artifact: ChdArtifact { n, global_seed: cfg.global_seed, chunk_bits, chunks } })
    }

    /// Returns an index in `[0, n)` for any key in the build set;
    /// unspecified (but in-range for its chunk) for anything else.
    pub fn get(&self, key: &[u8]) -> u64 {
        let sig = hash_sig3(key, self.artifact.global_seed);
        let chunk_idx = sig.top_bits(self.artifact.chunk_bits) as usize;
        let chunk = &self.artifact.chunks[chunk_idx];
        if chunk.p == 0 {
            return chunk.base;
        }
        let inner = hash_sig3(key, chunk.local_seed);
        let bucket_id = spread(inner.0[2], chunk.num_small_buckets as u64) as usize;
        let (c0, c1) = chunk.coeff.get(bucket_id);
        let h1 = inner.0[0] % chunk.p;
        let h2 = 1 + (inner.0[1] % (chunk.p - 1));
        let pos = query_position(h1, h2, c0, c1, chunk.p);
        chunk.base + chunk.occupied.rank(pos)
    }

    pub fn len(&self) -> u64 {
        self.artifact.n
    }

    pub fn is_empty(&self) -> bool {
        self.artifact.n == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> BuildConfig {
        BuildConfig::default()
    }

    #[test]
    fn mphf_is_bijective_on_build_keys() {
        let keys: Vec<String> = (0..5000).map(|i| format!("chd-key-{i}")).collect();
        let f = ChdMinimalPerfectHashFunction::build(&keys, &cfg()).unwrap();
        assert_eq!(f.len(), keys.len() as u64);
        let mut seen = vec![false; keys.len()];
        for k in &keys {
            let v = f.get(k.as_bytes());
            assert!((v as usize) < keys.len(), "index {v} out of range");
            assert!(!seen[v as usize], "index {v} produced twice");
            seen[v as usize] = true;
        }
        assert!(seen.into_iter().all(|s| s));
    }

    #[test]
    fn small_key_set_uses_a_single_chunk() {
        let keys: Vec<String> = (0..20).map(|i| format!("k{i}")).collect();
        let f = ChdMinimalPerfectHashFunction::build(&keys, &cfg()).unwrap();
        assert_eq!(f.artifact.chunk_bits, 0);
    }
}
