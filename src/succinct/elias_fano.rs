//! Quasi-succinct encoding of a monotonically non-decreasing sequence
//! with O(1) random access: the classic low/high split, low bits stored
//! packed and high bits stored unary in a rank/select structure.

use crate::bits::BitVector;
use crate::succinct::rank_select::RankSelect;

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EliasFanoMonotoneList {
    low_bits: u8,
    low: BitVector,
    high: RankSelect,
    len: usize,
}

impl EliasFanoMonotoneList {
    /// Build from a monotone non-decreasing sequence.
    pub fn build(values: &[u64]) -> Self {
        let len = values.len();
        if len == 0 {
            return Self { low_bits: 0, low: BitVector::new(), high: RankSelect::new(BitVector::new()), len: 0 };
        }
        let max = *values.last().unwrap();
        let low_bits = if max == 0 || len == 0 {
            0
        } else {
            let ratio = (max as f64 / len as f64).max(1.0);
            ratio.log2().floor().max(0.0) as u8
        };

        let mut low = BitVector::new();
        let universe_high = if low_bits >= 64 { 0 } else { (max >> low_bits) + 1 };
        let mut high_bits = BitVector::with_zeroed_bits(universe_high + len as u64);
        let mut cursor = 0u64;
        for (i, &v) in values.iter().enumerate() {
            let lo = if low_bits == 0 { 0 } else { v & ((1u64 << low_bits) - 1) };
            low.append_bits(lo, low_bits);
            let hi = if low_bits >= 64 { 0 } else { v >> low_bits };
            // unary-code hi as `hi` zeros followed by a one, placed at
            // position `hi + i` in the shared high bitvector.
            let pos = hi + i as u64;
            if pos >= cursor {
                high_bits.set_bit(pos);
            }
            cursor = cursor.max(pos + 1);
        }
        Self { low_bits, low, high: RankSelect::new(high_bits), len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// O(1) random access to element `i`.
    pub fn get(&self, i: usize) -> u64 {
        assert!(i < self.len, "index {i} out of range for EliasFanoMonotoneList of len {}", self.len);
        let select_pos = self.high.select(i as u64);
        let hi = select_pos - i as u64;
        let lo = if self.low_bits == 0 { 0 } else { self.low.get_range(i as u64 * self.low_bits as u64, self.low_bits) };
        (hi << self.low_bits) | lo
    }

    pub fn to_vec(&self) -> Vec<u64> {
        (0..self.len).map(|i| self.get(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotone_roundtrip() {
        let values: Vec<u64> = vec![0, 0, 3, 3, 3, 10, 11, 1000, 1000, 1_000_000];
        let ef = EliasFanoMonotoneList::build(&values);
        assert_eq!(ef.len(), values.len());
        assert_eq!(ef.to_vec(), values);
    }

    #[test]
    fn single_element() {
        let ef = EliasFanoMonotoneList::build(&[42]);
        assert_eq!(ef.get(0), 42);
    }

    #[test]
    fn empty() {
        let ef = EliasFanoMonotoneList::build(&[]);
        assert!(ef.is_empty());
    }
}
