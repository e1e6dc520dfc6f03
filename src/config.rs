//! Build-time configuration shared by the solver, CHD engine, store and assembler.

/// Which per-bucket engine produces a bucket's solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    /// 3- or 4-uniform hypergraph peeling + lazy Gaussian elimination.
    Peeling { degree: Degree },
    /// Hash-displace-compress.
    Chd,
}

/// Hypergraph edge arity for the peeling engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Degree {
    Three,
    Four,
}

impl Degree {
    /// Default `C` (`num_vars = ceil(C * size)`): ~1.10 for degree 3,
    /// ~1.03 for degree 4.
    pub fn default_c(self) -> f64 {
        match self {
            Degree::Three => 1.10,
            Degree::Four => 1.03,
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Degree::Three => 3,
            Degree::Four => 4,
        }
    }
}

/// Top-level build parameters.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub engine: Engine,
    /// `C` multiplier for `num_vars = ceil(C * size)`; `None` uses
    /// `engine`'s default.
    pub c_override: Option<f64>,
    /// Target bucket size `B`: 1500 for peeling, 1000 for the
    /// compacted/signed variant, 2^16 for CHD chunks.
    pub bucket_size: usize,
    /// Width in bits of each stored value (ordinal width for MPHFs).
    pub value_width: u8,
    /// Maximum in-store reseed attempts on `DuplicateSignature` before
    /// `DuplicateKey` is surfaced.
    pub max_store_reseeds: u32,
    /// Maximum local-seed retries per bucket on `Unsolvable` before
    /// `SeedExhausted`.
    pub max_solver_retries: u32,
    /// Store only nonzero solution cells behind a ranked marker bitvector.
    pub compacted: bool,
    /// Base seed for the whole build.
    pub global_seed: u64,
    /// Worker thread count for the parallel assembler; `None` picks
    /// `min(4, available_parallelism())`.
    pub threads: Option<usize>,
    /// Width in bits of a per-key signature check word stored alongside
    /// the result table; `0` disables the check entirely. When enabled,
    /// a query whose recomputed signature doesn't match the stored one
    /// returns the function's default return value instead of whatever
    /// the linear form happened to compute.
    pub signature_check_bits: u8,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            engine: Engine::Peeling { degree: Degree::Three },
            c_override: None,
            bucket_size: 1500,
            value_width: 32,
            max_store_reseeds: 3,
            max_solver_retries: 1000,
            compacted: false,
            global_seed: 0xC0FF_EE00_D15E_A5E,
            threads: None,
            signature_check_bits: 0,
        }
    }
}

impl BuildConfig {
    pub fn c(&self) -> f64 {
        self.c_override.unwrap_or(match self.engine {
            Engine::Peeling { degree } => degree.default_c(),
            Engine::Chd => 1.0,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.threads
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()))
            .min(4)
            .max(1)
    }
}

/// Configuration for `BucketedHashStore::open`.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory for the 256 on-disk shard files.
    pub temp_dir: std::path::PathBuf,
    /// Signature width: 2 words (128 bits) or 3 words (192 bits).
    pub signature_words: u8,
    /// Whether `iter()` checks for duplicate signatures.
    pub checked: bool,
}

impl StoreConfig {
    pub fn new(temp_dir: impl Into<std::path::PathBuf>) -> Self {
        Self { temp_dir: temp_dir.into(), signature_words: 2, checked: true }
    }
}
