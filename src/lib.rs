//! hyperphf — succinct static functions and minimal perfect hash
//! functions over arbitrary byte-string key sets.
//!
//! - Build once on a set of **unique** keys.
//! - O(1) lookups: key -> value, or key -> unique index in `[0, n)` for
//!   the MPHF variants.
//! - Two interchangeable bucket engines: hypergraph peeling (lower
//!   build cost) and CHD (lower bits/key), chosen via [`config::Engine`].
//! - Robust: duplicate signatures trigger a store-wide reseed, an
//!   unsolvable bucket retries with a fresh local seed, both bounded and
//!   surfaced as typed errors rather than silently looping.

pub mod assembler;
pub mod bits;
pub mod chd;
pub mod config;
pub mod error;
pub mod function;
pub mod hash;
pub mod solve;
pub mod store;
pub mod succinct;

pub use config::{BuildConfig, Degree, Engine, StoreConfig};
pub use error::{Error, Result};
pub use function::{ChdMinimalPerfectHashFunction, GovFunction, GovMinimalPerfectHashFunction};
