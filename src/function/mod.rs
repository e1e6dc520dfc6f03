//! Query artifacts: the compact tables a build pipeline hands back, and
//! the arithmetic that turns a key into a value by reading them. Two
//! shapes exist side by side — [`gov`]'s offset/data table for the
//! peeling engine, and [`chd_fn`]'s per-chunk coefficient tables for CHD
//! — because the two engines store fundamentally different things,
//! even though both answer the same `get(key) -> u64` question.

pub mod gov;
pub mod chd_fn;

pub use gov::{GovFunction, GovMinimalPerfectHashFunction};
pub use chd_fn::ChdMinimalPerfectHashFunction;

use crate::assembler::{unpack_offset, unpack_seed};
use crate::config::Degree;
use crate::hash::Signature;
use crate::solve::{seed_for_attempt, variable_indices};
use crate::succinct::RankSelect;

/// Peeling-engine query artifact: the packed tables `assembler::assemble`
/// produces, plus the metadata needed to replay bucket/variable
/// selection at query time. `degree` has no counterpart in the raw
/// assembled tables — it's carried here because the query path can't
/// otherwise tell whether a bucket's hypergraph was 3- or 4-uniform; see
/// DESIGN.md.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Artifact {
    pub n: u64,
    pub global_seed: u64,
    pub width: u8,
    pub multiplier: u64,
    pub degree: Degree,
    pub offset_and_seed: Vec<u64>,
    pub data: crate::bits::BitVector,
    /// `Some` under `BuildConfig::compacted`: a bit per variable across
    /// every bucket, set where that variable's solved cell is nonzero.
    /// `data` then holds only the nonzero cells, packed in variable
    /// order, and a cell read goes through `marker.rank` instead of a
    /// direct offset.
    pub marker: Option<RankSelect>,
    /// `0` if no per-key check word was stored.
    pub signature_check_bits: u8,
    /// Present only when `signature_check_bits > 0`: one check word per
    /// final value, indexed by that value.
    pub signatures: Option<Vec<u64>>,
}

impl Artifact {
    pub fn num_buckets(&self) -> usize {
        self.offset_and_seed.len() - 1
    }

    /// Evaluates the linear form for `sig` in bucket `bucket`, without
    /// any signature-check fallback. Shared by both `GovFunction` and
    /// `GovMinimalPerfectHashFunction`, since the check/default-value
    /// wrapping differs between the two but the core arithmetic doesn't.
    pub(crate) fn eval<S: Signature>(&self, sig: &S, bucket: u64) -> u64 {
        let word = self.offset_and_seed[bucket as usize];
        let next = self.offset_and_seed[bucket as usize + 1];
        let offset = unpack_offset(word);
        let num_vars = (unpack_offset(next) - offset) as usize;
        let attempt = unpack_seed(word);

        let base_local_seed = crate::hash::mix_seed(self.global_seed, bucket);
        let local_seed = seed_for_attempt(base_local_seed, attempt);
        let h = sig.rehash(local_seed);
        let idx = variable_indices(h, num_vars, self.degree.arity());

        idx.iter().fold(0u64, |acc, &v| acc ^ self.read_cell(offset + v as u64))
    }

    #[inline]
    fn read_cell(&self, global_var: u64) -> u64 {
        match &self.marker {
            Some(marker) => {
                if marker.test_bit(global_var) {
                    self.data.get_range(marker.rank(global_var) * self.width as u64, self.width)
                } else {
                    0
                }
            }
            None => self.data.get_range(global_var * self.width as u64, self.width),
        }
    }

    /// `true` if `result`'s stored check word matches `sig`'s. Always
    /// `true` when the check is disabled.
    pub(crate) fn check<S: Signature>(&self, sig: &S, result: u64) -> bool {
        if self.signature_check_bits == 0 {
            return true;
        }
        let Some(table) = &self.signatures else { return true };
        let Some(&expected) = table.get(result as usize) else { return false };
        let mask = if self.signature_check_bits >= 64 { u64::MAX } else { (1u64 << self.signature_check_bits) - 1 };
        let actual = sig.words().get(1).copied().unwrap_or(0) & mask;
        expected == actual
    }
}
