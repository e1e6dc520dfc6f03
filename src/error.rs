use thiserror::Error;

/// Error taxonomy for the build pipeline.
///
/// `DuplicateSignature` and `SolverUnsolvable` are recovered internally
/// (reseed / seed-step retry); they only escape `build()` once the
/// relevant retry budget is exhausted, at which point they have already
/// been converted to `DuplicateKey` / `SeedExhausted` by the caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("reading keys or values failed: {0}")]
    InputIo(#[from] std::io::Error),

    #[error("shard temp-file I/O failed: {0}")]
    TempIo(std::io::Error),

    #[error("duplicate signature detected in bucket {bucket} under the current seed")]
    DuplicateSignature { bucket: u32 },

    #[error("input contains a genuine duplicate key (signature collided across every reseed attempt)")]
    DuplicateKey,

    #[error("lazy Gaussian elimination failed to solve bucket {bucket} with local seed {seed}")]
    SolverUnsolvable { bucket: u32, seed: u64 },

    #[error("local seed space exhausted for bucket {bucket}; check gamma/degree configuration")]
    SeedExhausted { bucket: u32 },

    #[error("value {value} does not fit in the declared width of {width} bits")]
    InvalidValueWidth { value: u64, width: u8 },

    #[error("{keys} keys but {values} explicit values were supplied")]
    ValueCountMismatch { keys: usize, values: usize },

    #[cfg(feature = "serde")]
    #[error("serialization error: {0}")]
    Serde(#[from] Box<bincode::ErrorKind>),
}

pub type Result<T> = std::result::Result<T, Error>;
