//! Error taxonomy for the codec.
//!
//! Everything here is fatal to the call that raised it. Recoverable
//! conditions (cast failures, translation disagreements, missing metadata)
//! are logged and worked around instead.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Fatal codec errors.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Two variable names differ only by case; writing would merge their
    /// metadata in a case-insensitive store.
    #[error("variable names '{first}' and '{second}' collide case-insensitively")]
    CaseCollision { first: String, second: String },

    /// A 2-D variable whose dimensions do not include the epoch dimension.
    #[error("epoch dimension '{epoch}' not found among dimensions of '{variable}'")]
    EpochNotFound { epoch: String, variable: String },

    /// Variables with three or more dimensions are not supported.
    #[error("variable '{name}' has {ndims} dimensions; only 1-D and 2-D are supported")]
    UnsupportedDimensionality { name: String, ndims: usize },

    /// Strict multi-file read found differing metadata dictionaries.
    #[error("metadata in '{path}' differs from previously loaded files")]
    MetadataMismatch { path: PathBuf },

    /// A variable that must exist at this point does not.
    #[error("missing required variable: {0}")]
    MissingVariable(String),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the underlying netCDF library
    #[error("netCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),
}
