//! Succinct black-box capabilities consumed by the core: rank/select
//! over a sparse bit set and a monotone Elias-Fano list. Both are thin
//! wrappers over [`crate::bits::BitVector`].

pub mod rank_select;
pub mod elias_fano;

pub use rank_select::RankSelect;
pub use elias_fano::EliasFanoMonotoneList;
