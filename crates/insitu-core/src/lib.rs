//! Shared data model for in-situ instrument time series.
//!
//! This crate holds everything the storage codecs and data producers agree
//! on: the closed metadata value type, per-variable metadata records, the
//! in-memory variable payloads (including one level of nested, per-timestep
//! tables), epoch conversion helpers, and the file-registry interface used
//! by data discovery.
//!
//! The types here deliberately carry no file-format knowledge; the netCDF
//! codec lives in `insitu-netcdf`.

pub mod meta;
pub mod registry;
pub mod time;
pub mod value;
pub mod variable;

// Re-export commonly used types at crate root
pub use meta::{LabelMap, MetaLabels, MetaRecord, MetaStore};
pub use registry::{FileRegistry, StaticRegistry};
pub use time::{EpochOrigin, EpochUnit};
pub use value::{Value, ValueKind};
pub use variable::{Cell, CellKind, CellShape, DType, InnerIndex, VarData, VariableSet};
