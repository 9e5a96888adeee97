//! Codec write path: one call turns a variable set, its metadata store and a
//! shared time index into a netCDF file.

use std::path::Path;

use chrono::{DateTime, Utc};
use insitu_core::{
    time, CellShape, DType, LabelMap, MetaStore, ValueKind, VarData, Value, VariableSet,
};
use tracing::{debug, warn};

use crate::convert::value_to_attr;
use crate::error::{CodecError, Result};
use crate::nested::{self, FlatIndexData};
use crate::translation::TranslationTable;
use crate::{filter, standards, MetaMap, MetaProcessor};

/// File-level conventions attribute written by the codec.
pub const CONVENTIONS: &str = "SPDF ISTP/IACG Modified for NetCDF";

const STAMP_FORMAT: &str = "%a, %d %b %Y, %Y-%m-%dT%H:%M:%S%.3f UTC";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Create the file, overwriting any existing one.
    Create,
    /// Open an existing file and add to it.
    Append,
}

/// Options for [`write_netcdf`].
#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub mode: WriteMode,
    /// Enable zlib compression on numeric variables.
    pub zlib: bool,
    /// Deflate level used when `zlib` is set.
    pub complevel: i32,
    /// Byte-shuffle filter used when `zlib` is set.
    pub shuffle: bool,
    /// Make the time dimension unlimited instead of sized to the index.
    pub unlimited_time: bool,
    /// Keep variable-name case on file instead of lowercasing.
    pub preserve_case: bool,
    /// Name of the time dimension and variable.
    pub epoch_name: String,
    /// Labels whose NaN values are written instead of dropped. Defaults to
    /// none.
    pub export_nan: Option<Vec<String>>,
    /// Extra labels type-checked against the variable's element type. The
    /// store's fill, minimum and maximum labels are always checked.
    pub check_labels: Option<Vec<String>>,
    /// Label translation into file vocabulary. Defaults to the fill fan-out
    /// table.
    pub translation: Option<TranslationTable>,
    /// Final hook over the assembled per-variable attribute maps, applied
    /// just before the file is opened.
    pub meta_processor: Option<MetaProcessor>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            mode: WriteMode::Create,
            zlib: false,
            complevel: 4,
            shuffle: true,
            unlimited_time: true,
            preserve_case: false,
            epoch_name: "Epoch".to_string(),
            export_nan: None,
            check_labels: None,
            translation: None,
            meta_processor: None,
        }
    }
}

/// Write a variable set and its metadata to a netCDF file.
///
/// Fails before touching the file when two variable names collide
/// case-insensitively. An empty variable set or time index logs a warning
/// and writes nothing.
pub fn write_netcdf(
    path: &Path,
    vars: &VariableSet,
    meta: &MetaStore,
    global_attrs: &LabelMap,
    time_index: &[DateTime<Utc>],
    opts: &WriteOptions,
) -> Result<()> {
    if let Some((first, second)) = vars.case_collision() {
        return Err(CodecError::CaseCollision {
            first: first.to_string(),
            second: second.to_string(),
        });
    }
    if vars.is_empty() || time_index.is_empty() {
        warn!(path = %path.display(), "nothing to write, skipping file");
        return Ok(());
    }

    let preserve = opts.preserve_case;
    let case = move |n: &str| {
        if preserve {
            n.to_string()
        } else {
            n.to_lowercase()
        }
    };

    let mdict = assemble_metadata(vars, meta, time_index, opts, &case);

    let mut file = match opts.mode {
        WriteMode::Create => netcdf::create(path)?,
        WriteMode::Append => netcdf::append(path)?,
    };

    write_global_attrs(&mut file, path, global_attrs, time_index)?;

    let n_time = time_index.len();
    let epoch = opts.epoch_name.as_str();
    if file.dimension(epoch).is_none() {
        if opts.unlimited_time {
            file.add_unlimited_dimension(epoch)?;
        } else {
            file.add_dimension(epoch, n_time)?;
        }
    }

    let millis = time::to_millis(time_index);
    {
        let mut var = typed_var::<i64>(&mut file, epoch, &[epoch])?;
        if opts.zlib {
            var.set_compression(opts.complevel, opts.shuffle)?;
        }
        put_attrs(&mut var, epoch, mdict.get(epoch))?;
        var.put_values(&millis, [0..n_time])?;
    }

    for (name, data) in vars.iter() {
        let key = case(name);
        match data {
            VarData::Float(values) => {
                let mut var = typed_var::<f64>(&mut file, &key, &[epoch])?;
                if opts.zlib {
                    var.set_compression(opts.complevel, opts.shuffle)?;
                }
                put_attrs(&mut var, &key, mdict.get(&key))?;
                var.put_values(values, [0..n_time])?;
            }
            VarData::Int(values) => {
                let mut var = typed_var::<i64>(&mut file, &key, &[epoch])?;
                if opts.zlib {
                    var.set_compression(opts.complevel, opts.shuffle)?;
                }
                put_attrs(&mut var, &key, mdict.get(&key))?;
                var.put_values(values, [0..n_time])?;
            }
            VarData::Time(values) => {
                let mut var = typed_var::<i64>(&mut file, &key, &[epoch])?;
                if opts.zlib {
                    var.set_compression(opts.complevel, opts.shuffle)?;
                }
                put_attrs(&mut var, &key, mdict.get(&key))?;
                var.put_values(&time::to_millis(values), [0..n_time])?;
            }
            VarData::Text(values) => {
                let mut var = string_var(&mut file, &key, &[epoch])?;
                put_attrs(&mut var, &key, mdict.get(&key))?;
                for (i, s) in values.iter().enumerate() {
                    var.put_string(s, [i])?;
                }
            }
            VarData::Nested(cells) => {
                let Some(flat) = nested::flatten(name, cells, &case) else {
                    warn!(variable = %name, "higher-order variable has no data, skipping");
                    continue;
                };
                if file.dimension(&flat.dim_name).is_none() {
                    file.add_dimension(&flat.dim_name, flat.inner_len)?;
                }
                for column in &flat.columns {
                    let mut var =
                        typed_var::<f64>(&mut file, &column.name, &[epoch, &flat.dim_name])?;
                    if opts.zlib {
                        var.set_compression(opts.complevel, opts.shuffle)?;
                    }
                    put_attrs(&mut var, &column.name, mdict.get(&column.name))?;
                    var.put_values(&column.values, [0..n_time, 0..flat.inner_len])?;
                }
                match &flat.index {
                    FlatIndexData::Time(values) => {
                        let mut var =
                            typed_var::<i64>(&mut file, &flat.dim_name, &[epoch, &flat.dim_name])?;
                        put_attrs(&mut var, &flat.dim_name, mdict.get(&flat.dim_name))?;
                        var.put_values(values, [0..n_time, 0..flat.inner_len])?;
                    }
                    FlatIndexData::Num(values) => {
                        let mut var =
                            typed_var::<f64>(&mut file, &flat.dim_name, &[epoch, &flat.dim_name])?;
                        put_attrs(&mut var, &flat.dim_name, mdict.get(&flat.dim_name))?;
                        var.put_values(values, [0..n_time, 0..flat.inner_len])?;
                    }
                    FlatIndexData::Text(values) => {
                        let mut var =
                            string_var(&mut file, &flat.dim_name, &[epoch, &flat.dim_name])?;
                        put_attrs(&mut var, &flat.dim_name, mdict.get(&flat.dim_name))?;
                        for t in 0..n_time {
                            for i in 0..flat.inner_len {
                                var.put_string(&values[t * flat.inner_len + i], [t, i])?;
                            }
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

/// Assemble, decorate, filter and translate the per-variable attribute maps.
fn assemble_metadata(
    vars: &VariableSet,
    meta: &MetaStore,
    time_index: &[DateTime<Utc>],
    opts: &WriteOptions,
    case: &dyn Fn(&str) -> String,
) -> MetaMap {
    let mut mdict = MetaMap::new();

    if let Some(record) = meta.get_ci(&opts.epoch_name) {
        mdict.insert(opts.epoch_name.clone(), record.labels.clone());
    }

    for (name, data) in vars.iter() {
        let Some(record) = meta.get_ci(name) else {
            warn!(variable = %name, "no metadata for variable, writing it bare");
            continue;
        };
        mdict.insert(case(name), record.labels.clone());

        if let VarData::Nested(cells) = data {
            let Some(first) = cells.iter().find(|c| !c.is_empty()) else {
                continue;
            };
            let flats: Vec<(String, String)> = match first.shape() {
                CellShape::Series => first
                    .column_names()
                    .first()
                    .map(|col| vec![(case(&format!("{name}_data")), col.clone())])
                    .unwrap_or_default(),
                CellShape::Table => first
                    .column_names()
                    .iter()
                    .map(|col| (case(&format!("{name}_{col}")), col.clone()))
                    .collect(),
            };
            for (flat, source) in flats {
                if let Some(child) = record.children.get(&source) {
                    mdict.insert(flat, child.clone());
                }
            }
        }
    }

    standards::add(
        &mut mdict,
        vars,
        time_index,
        &opts.epoch_name,
        &meta.labels,
        case,
    );

    let export_nan = opts.export_nan.clone().unwrap_or_else(|| {
        debug!("export_nan not provided, NaN metadata values will be dropped");
        Vec::new()
    });
    // The store's fill/min/max labels are always type-checked; a caller
    // override adds to them rather than replacing them.
    let mut check_labels = opts.check_labels.clone().unwrap_or_default();
    for label in [
        &meta.labels.fill_val,
        &meta.labels.min_val,
        &meta.labels.max_val,
    ] {
        if !check_labels.iter().any(|l| l == label) {
            check_labels.push(label.clone());
        }
    }

    let checks = value_checks(vars, opts, case);
    for (key, labels) in mdict.iter_mut() {
        let (kind, remove) = checks
            .get(key)
            .copied()
            .unwrap_or((ValueKind::Float, false));
        *labels = filter::filter_labels(labels, kind, remove, &check_labels, &export_nan, key);
    }

    let table = opts
        .translation
        .clone()
        .unwrap_or_else(|| TranslationTable::default_for(&meta.labels));
    for labels in mdict.values_mut() {
        *labels = table.apply_to_file(labels);
    }

    if let Some(processor) = opts.meta_processor {
        processor(&mut mdict);
    }

    mdict
}

/// The declared value kind (and whether mismatches are removed rather than
/// cast) for every on-file attribute map.
fn value_checks(
    vars: &VariableSet,
    opts: &WriteOptions,
    case: &dyn Fn(&str) -> String,
) -> std::collections::BTreeMap<String, (ValueKind, bool)> {
    let mut checks = std::collections::BTreeMap::new();
    checks.insert(opts.epoch_name.clone(), (ValueKind::Int, false));
    for (name, data) in vars.iter() {
        let key = case(name);
        match data {
            VarData::Nested(cells) => {
                let first = cells.iter().find(|c| !c.is_empty());
                let index_check = match first.map(|c| &c.index) {
                    Some(insitu_core::InnerIndex::Time(_)) => (ValueKind::Int, false),
                    Some(insitu_core::InnerIndex::Text(_)) => (ValueKind::Str, true),
                    _ => (ValueKind::Float, false),
                };
                checks.insert(key.clone(), index_check);
                if let Some(first) = first {
                    let flats: Vec<String> = match first.shape() {
                        CellShape::Series => vec![case(&format!("{name}_data"))],
                        CellShape::Table => first
                            .column_names()
                            .iter()
                            .map(|col| case(&format!("{name}_{col}")))
                            .collect(),
                    };
                    for flat in flats {
                        checks.insert(flat, (ValueKind::Float, false));
                    }
                }
            }
            _ => {
                let check = match data.dtype().unwrap_or(DType::Float64) {
                    DType::Float64 => (ValueKind::Float, false),
                    DType::Int64 | DType::Time => (ValueKind::Int, false),
                    DType::Text => (ValueKind::Str, true),
                };
                checks.insert(key, check);
            }
        }
    }
    checks
}

fn write_global_attrs(
    file: &mut netcdf::FileMut,
    path: &Path,
    global_attrs: &LabelMap,
    time_index: &[DateTime<Utc>],
) -> Result<()> {
    for (key, value) in global_attrs {
        let value = match value {
            Value::Bool(b) => Value::Int(i64::from(*b)),
            other => other.clone(),
        };
        match value_to_attr(&value) {
            Some(attr) => {
                file.add_attribute(key, attr)?;
            }
            None => warn!(label = %key, "global attribute has no representation, skipping"),
        }
    }

    // Codec-owned provenance attributes, written last so callers cannot
    // override them.
    let start = time_index[0].format(STAMP_FORMAT).to_string();
    let end = time_index[time_index.len() - 1].format(STAMP_FORMAT).to_string();
    let generated = Utc::now().format("%Y%m%d").to_string();
    let file_id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    file.add_attribute("Date_Start", start)?;
    file.add_attribute("Date_End", end)?;
    file.add_attribute("Generation_Date", generated)?;
    file.add_attribute("Logical_File_ID", file_id)?;
    file.add_attribute("Conventions", CONVENTIONS)?;
    Ok(())
}

fn typed_var<'f, T: netcdf::NcPutGet>(
    file: &'f mut netcdf::FileMut,
    name: &str,
    dims: &[&str],
) -> Result<netcdf::VariableMut<'f>> {
    if file.variable(name).is_some() {
        return file
            .variable_mut(name)
            .ok_or_else(|| CodecError::MissingVariable(name.to_string()));
    }
    Ok(file.add_variable::<T>(name, dims)?)
}

fn string_var<'f>(
    file: &'f mut netcdf::FileMut,
    name: &str,
    dims: &[&str],
) -> Result<netcdf::VariableMut<'f>> {
    if file.variable(name).is_some() {
        return file
            .variable_mut(name)
            .ok_or_else(|| CodecError::MissingVariable(name.to_string()));
    }
    Ok(file.add_string_variable(name, dims)?)
}

fn put_attrs(
    var: &mut netcdf::VariableMut,
    name: &str,
    labels: Option<&LabelMap>,
) -> Result<()> {
    let Some(labels) = labels else {
        return Ok(());
    };
    for (key, value) in labels {
        match value_to_attr(value) {
            Some(attr) => {
                var.put_attribute(key, attr)?;
            }
            None => warn!(
                variable = %name,
                label = %key,
                "metadata value has no attribute representation, skipping"
            ),
        }
    }
    Ok(())
}
