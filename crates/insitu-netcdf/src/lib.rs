//! Metadata-aware netCDF codec for in-situ instrument time series.
//!
//! The codec writes a [`VariableSet`](insitu_core::VariableSet) and its
//! [`MetaStore`](insitu_core::MetaStore) to netCDF and reads them back,
//! taking care of everything archives expect along the way: SPDF-style
//! standard labels, fill-value label fan-out, NaN and boolean attribute
//! hygiene, and the flattening of per-timestep tables into 2-D variables.
//!
//! The write and read entry points are [`write_netcdf`] and [`read_netcdf`];
//! the stages they orchestrate (filtering, standards overlay, translation,
//! array expansion, nested flattening) are public for callers that need to
//! run them separately.

pub mod convert;
pub mod error;
pub mod expand;
pub mod filter;
pub mod nested;
pub mod read;
pub mod standards;
pub mod translation;
pub mod write;

use std::collections::BTreeMap;

use insitu_core::LabelMap;

/// Per-variable attribute maps as staged to, or extracted from, a file.
pub type MetaMap = BTreeMap<String, LabelMap>;

/// Caller hook over the assembled metadata map.
pub type MetaProcessor = fn(&mut MetaMap);

pub use error::{CodecError, Result};
pub use read::{read_netcdf, ReadOptions};
pub use translation::TranslationTable;
pub use write::{write_netcdf, WriteMode, WriteOptions};
