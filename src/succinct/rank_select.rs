//! Constant-time `rank`/`select` over a sparse (density <= 50%) bit set.
//!
//! Classic two-level index: one running popcount per 512-bit superblock
//! plus one per 64-bit word within it, so `rank(i)` is a superblock
//! lookup, a word lookup, and one masked `popcount`. `select(k)` scans
//! superblocks then words linearly — acceptable because callers only use
//! it on the sparse "marker" bitvector of the compacted layout, whose
//! total popcount is a small fraction of its length.

use crate::bits::BitVector;

const WORDS_PER_SUPERBLOCK: usize = 8; // 8 * 64 = 512 bits per superblock

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankSelect {
    bits: BitVector,
    /// Cumulative popcount of all words strictly before superblock `i`.
    superblock_rank: Vec<u64>,
    total_ones: u64,
}

impl RankSelect {
    pub fn new(bits: BitVector) -> Self {
        let words = bits.as_words();
        let num_superblocks = (words.len() + WORDS_PER_SUPERBLOCK - 1) / WORDS_PER_SUPERBLOCK + 1;
        let mut superblock_rank = Vec::with_capacity(num_superblocks);
        let mut acc = 0u64;
        superblock_rank.push(0);
        for chunk in words.chunks(WORDS_PER_SUPERBLOCK) {
            acc += chunk.iter().map(|w| w.count_ones() as u64).sum::<u64>();
            superblock_rank.push(acc);
        }
        Self { bits, superblock_rank, total_ones: acc }
    }

    /// Number of set bits in `[0, i)`.
    pub fn rank(&self, i: u64) -> u64 {
        if i == 0 {
            return 0;
        }
        let word_idx = (i / 64) as usize;
        let superblock = word_idx / WORDS_PER_SUPERBLOCK;
        let mut rank = self.superblock_rank[superblock];
        let words = self.bits.as_words();
        let sb_start = superblock * WORDS_PER_SUPERBLOCK;
        for w in sb_start..word_idx {
            rank += words.get(w).copied().unwrap_or(0).count_ones() as u64;
        }
        let bit_in_word = i % 64;
        if bit_in_word > 0 {
            let word = words.get(word_idx).copied().unwrap_or(0);
            let mask = if bit_in_word == 64 { u64::MAX } else { (1u64 << bit_in_word) - 1 };
            rank += (word & mask).count_ones() as u64;
        }
        rank
    }

    /// Position of the `k`-th set bit (0-based). Panics if `k >=
    /// popcount`.
    pub fn select(&self, k: u64) -> u64 {
        assert!(k < self.total_ones, "select({k}) out of range ({} ones)", self.total_ones);
        // Binary search over superblocks for the one containing the k-th one.
        let mut lo = 0usize;
        let mut hi = self.superblock_rank.len() - 1;
        while lo + 1 < hi {
            let mid = (lo + hi) / 2;
            if self.superblock_rank[mid] <= k {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        let mut remaining = k - self.superblock_rank[lo];
        let words = self.bits.as_words();
        let mut word_idx = lo * WORDS_PER_SUPERBLOCK;
        loop {
            let word = words.get(word_idx).copied().unwrap_or(0);
            let pc = word.count_ones() as u64;
            if remaining < pc {
                break;
            }
            remaining -= pc;
            word_idx += 1;
        }
        let word = words[word_idx];
        let bit = select_in_word(word, remaining as u32);
        word_idx as u64 * 64 + bit as u64
    }

    pub fn len(&self) -> u64 {
        self.bits.len()
    }

    pub fn count_ones(&self) -> u64 {
        self.total_ones
    }

    pub fn test_bit(&self, i: u64) -> bool {
        self.bits.test_bit(i)
    }
}

/// Position of the `k`-th set bit within a single word (0-based).
#[inline]
fn select_in_word(mut word: u64, mut k: u32) -> u32 {
    for bit in 0..64u32 {
        if word & 1 == 1 {
            if k == 0 {
                return bit;
            }
            k -= 1;
        }
        word >>= 1;
    }
    unreachable!("select_in_word called with k >= popcount")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_select_roundtrip() {
        let mut bv = BitVector::with_zeroed_bits(1000);
        let ones = [0u64, 1, 63, 64, 65, 127, 511, 512, 513, 999];
        for &i in &ones {
            bv.set_bit(i);
        }
        let rs = RankSelect::new(bv);
        assert_eq!(rs.count_ones(), ones.len() as u64);
        for (k, &pos) in ones.iter().enumerate() {
            assert_eq!(rs.select(k as u64), pos);
            assert_eq!(rs.rank(pos + 1) as usize, k + 1);
        }
        assert_eq!(rs.rank(0), 0);
    }
}
