//! Storage and query-path decoding for a chunk's `(c0, c1)` coefficient
//! list, monotonically coded via `c0 + c1*p` and packed into an
//! `EliasFanoMonotoneList`.

use crate::succinct::elias_fano::EliasFanoMonotoneList;

/// `(c0, c1)` per bucket, monotonically coded (`c0 + c1*p`) and packed
/// into an Elias-Fano list. The list itself must be non-decreasing, but
/// buckets solve in largest-first order rather than code order, so an
/// `order` permutation maps each bucket id back to its position in the
/// sorted list.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CoefficientTable {
    p: u64,
    codes: EliasFanoMonotoneList,
    order: Vec<u32>,
}

impl CoefficientTable {
    pub fn build(p: u64, coefficients: &[(u64, u64)]) -> Self {
        let mut by_code: Vec<(u64, usize)> =
            coefficients.iter().enumerate().map(|(i, &(c0, c1))| (c0 + c1 * p, i)).collect();
        by_code.sort_unstable_by_key(|&(code, _)| code);

        let mut order = vec![0u32; coefficients.len()];
        let sorted_codes: Vec<u64> = by_code.iter().map(|&(code, _)| code).collect();
        for (pos, &(_, bucket)) in by_code.iter().enumerate() {
            order[bucket] = pos as u32;
        }

        Self { p, codes: EliasFanoMonotoneList::build(&sorted_codes), order }
    }

    pub fn get(&self, bucket: usize) -> (u64, u64) {
        let code = self.codes.get(self.order[bucket] as usize);
        (code % self.p, code / self.p)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }
}

/// Query-path arithmetic: given a key's `(h1, h2)` pair and a bucket's
/// `(c0, c1)` displacement coefficients, compute the raw position in
/// `[0, p)`. The caller subtracts the rank of holes below that position
/// to get the final compact value in `[0, n)`.
#[inline]
pub fn query_position(h1: u64, h2: u64, c0: u64, c1: u64, p: u64) -> u64 {
    (h1 + c0.wrapping_mul(h2) + c1) % p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let p = 101u64;
        let pairs = vec![(3u64, 5u64), (10, 2), (0, 0), (100, 100), (57, 13)];
        let table = CoefficientTable::build(p, &pairs);
        assert_eq!(table.len(), pairs.len());
        for (bucket, &expected) in pairs.iter().enumerate() {
            assert_eq!(table.get(bucket), expected);
        }
    }
}
