//! Flattening of higher-order variables to 2-D file variables and back.
//!
//! A nested variable `profiles` whose cells are tables with columns
//! `density` and `temp` becomes, on file, a dimension `profiles`, data
//! variables `profiles_density` and `profiles_temp` over (epoch, profiles),
//! and an index variable `profiles` holding the per-row inner labels. A
//! series-shaped variable produces a single `profiles_data` column instead.

use insitu_core::{time, Cell, CellKind, CellShape, EpochOrigin, EpochUnit, InnerIndex, VarData};
use tracing::debug;

use crate::error::{CodecError, Result};

/// One flattened data column, row-major over (epoch, inner).
#[derive(Debug, Clone)]
pub struct FlatColumn {
    /// On-file variable name.
    pub name: String,
    /// Column name inside the cells, for metadata lookup.
    pub source: String,
    pub values: Vec<f64>,
}

/// The flattened inner index, row-major over (epoch, inner).
#[derive(Debug, Clone)]
pub enum FlatIndexData {
    /// Datetime labels as milliseconds since the Unix epoch.
    Time(Vec<i64>),
    Num(Vec<f64>),
    Text(Vec<String>),
}

/// Write-side plan for one higher-order variable.
#[derive(Debug, Clone)]
pub struct Flattened {
    /// Synthetic inner dimension, named after the outer variable.
    pub dim_name: String,
    pub inner_len: usize,
    pub columns: Vec<FlatColumn>,
    /// Index variable payload; the variable itself is named `dim_name`.
    pub index: FlatIndexData,
    /// Whether the inner index is a time axis.
    pub index_is_time: bool,
}

/// Flatten a higher-order variable for writing.
///
/// The inner length and cell shape come from the first non-empty cell and
/// are not re-validated: shorter rows are padded, longer rows truncated.
/// Returns `None` when every cell is empty.
pub fn flatten(outer: &str, cells: &[Cell], case: &dyn Fn(&str) -> String) -> Option<Flattened> {
    let first = cells.iter().find(|c| !c.is_empty())?;
    let inner_len = first.len();
    let dim_name = case(outer);
    let n = cells.len();

    let columns = match first.shape() {
        CellShape::Series => {
            let source = match &first.kind {
                CellKind::Series { name, .. } => name.clone(),
                CellKind::Table { .. } => unreachable!(),
            };
            vec![FlatColumn {
                name: case(&format!("{outer}_data")),
                source: source.clone(),
                values: gather_column(cells, &source, inner_len),
            }]
        }
        CellShape::Table => first
            .column_names()
            .into_iter()
            .map(|col| FlatColumn {
                name: case(&format!("{outer}_{col}")),
                source: col.clone(),
                values: gather_column(cells, &col, inner_len),
            })
            .collect(),
    };

    let (index, index_is_time) = match &first.index {
        InnerIndex::Time(_) => {
            let mut out = vec![0_i64; n * inner_len];
            for (t, cell) in cells.iter().enumerate() {
                if let InnerIndex::Time(values) = &cell.index {
                    for (i, dt) in values.iter().take(inner_len).enumerate() {
                        out[t * inner_len + i] = dt.timestamp_millis();
                    }
                }
            }
            (FlatIndexData::Time(out), true)
        }
        InnerIndex::Num(_) => {
            let mut out = vec![f64::NAN; n * inner_len];
            for (t, cell) in cells.iter().enumerate() {
                if let InnerIndex::Num(values) = &cell.index {
                    for (i, v) in values.iter().take(inner_len).enumerate() {
                        out[t * inner_len + i] = *v;
                    }
                }
            }
            (FlatIndexData::Num(out), false)
        }
        InnerIndex::Text(_) => {
            let mut out = vec![String::new(); n * inner_len];
            for (t, cell) in cells.iter().enumerate() {
                if let InnerIndex::Text(values) = &cell.index {
                    for (i, s) in values.iter().take(inner_len).enumerate() {
                        out[t * inner_len + i] = s.clone();
                    }
                }
            }
            (FlatIndexData::Text(out), false)
        }
    };

    Some(Flattened {
        dim_name,
        inner_len,
        columns,
        index,
        index_is_time,
    })
}

fn gather_column(cells: &[Cell], col: &str, inner_len: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; cells.len() * inner_len];
    for (t, cell) in cells.iter().enumerate() {
        if let Some(values) = cell.column(col) {
            for (i, v) in values.iter().take(inner_len).enumerate() {
                out[t * inner_len + i] = *v;
            }
        }
    }
    out
}

/// Reconstruct one higher-order variable from a group of 2-D file variables
/// sharing a dimension pair.
///
/// Exactly one of the two dimensions must be the epoch dimension; the other
/// names the variable. A group member named like the variable itself is its
/// inner index; it carries datetimes when tagged with the epoch name under
/// `name_label`, text when stored as strings, and plain numbers otherwise.
/// Without an index member the rows get an integer index.
pub fn reconstruct(
    file: &netcdf::File,
    names: &[String],
    epoch_name: &str,
    name_label: &str,
    unit: EpochUnit,
    origin: EpochOrigin,
) -> Result<(String, VarData)> {
    let first = file
        .variable(&names[0])
        .ok_or_else(|| CodecError::MissingVariable(names[0].clone()))?;
    let dims = first.dimensions();
    let (d0, d1) = (dims[0].name(), dims[1].name());

    let (time_axis, obj_key) = if d0 == epoch_name {
        (0, d1.to_string())
    } else if d1 == epoch_name {
        (1, d0.to_string())
    } else {
        return Err(CodecError::EpochNotFound {
            epoch: epoch_name.to_string(),
            variable: names[0].clone(),
        });
    };
    let (n_time, inner_len) = if time_axis == 0 {
        (dims[0].len(), dims[1].len())
    } else {
        (dims[1].len(), dims[0].len())
    };
    let at = |t: usize, i: usize| {
        if time_axis == 0 {
            t * inner_len + i
        } else {
            i * n_time + t
        }
    };

    let index = read_index(file, names, &obj_key, epoch_name, name_label, unit, origin)?;
    let index_name = if index.is_some() {
        Some(obj_key.clone())
    } else {
        None
    };

    let prefix = format!("{obj_key}_");
    let mut columns: Vec<(String, String, Vec<f64>)> = Vec::new();
    for name in names {
        if *name == obj_key {
            continue;
        }
        let var = file
            .variable(name)
            .ok_or_else(|| CodecError::MissingVariable(name.clone()))?;
        let values: Vec<f64> = var.get_values(..)?;
        let clean = name
            .strip_prefix(&prefix)
            .unwrap_or(name.as_str())
            .to_string();
        columns.push((name.clone(), clean, values));
    }

    // A lone `<outer>_data` column reads back as a series named after the
    // flat file variable; the original series name is not stored.
    let as_series = columns.len() == 1 && columns[0].1 == "data";

    let mut cells = Vec::with_capacity(n_time);
    for t in 0..n_time {
        let cell_index = match &index {
            Some(FlatIndexData::Time(millis)) => {
                let raw: Vec<i64> = (0..inner_len).map(|i| millis[at(t, i)]).collect();
                InnerIndex::Time(time::to_datetimes(&raw, unit, origin))
            }
            Some(FlatIndexData::Num(values)) => {
                InnerIndex::Num((0..inner_len).map(|i| values[at(t, i)]).collect())
            }
            Some(FlatIndexData::Text(values)) => {
                InnerIndex::Text((0..inner_len).map(|i| values[at(t, i)].clone()).collect())
            }
            None => InnerIndex::Num((0..inner_len).map(|i| i as f64).collect()),
        };

        let kind = if as_series {
            let (flat_name, _, values) = &columns[0];
            CellKind::Series {
                name: flat_name.clone(),
                values: (0..inner_len).map(|i| values[at(t, i)]).collect(),
            }
        } else {
            CellKind::Table {
                columns: columns
                    .iter()
                    .map(|(_, clean, values)| {
                        (
                            clean.clone(),
                            (0..inner_len).map(|i| values[at(t, i)]).collect(),
                        )
                    })
                    .collect(),
            }
        };

        cells.push(Cell {
            index: cell_index,
            index_name: index_name.clone(),
            kind,
        });
    }

    Ok((obj_key, VarData::Nested(cells)))
}

fn read_index(
    file: &netcdf::File,
    names: &[String],
    obj_key: &str,
    epoch_name: &str,
    name_label: &str,
    _unit: EpochUnit,
    _origin: EpochOrigin,
) -> Result<Option<FlatIndexData>> {
    if !names.iter().any(|n| n == obj_key) {
        debug!(variable = %obj_key, "no inner index variable, using row numbers");
        return Ok(None);
    }
    let var = file
        .variable(obj_key)
        .ok_or_else(|| CodecError::MissingVariable(obj_key.to_string()))?;

    if matches!(var.vartype(), netcdf::types::VariableType::String) {
        let total: usize = var.dimensions().iter().map(|d| d.len()).product();
        let mut out = Vec::with_capacity(total);
        let inner = var.dimensions()[1].len();
        for t in 0..var.dimensions()[0].len() {
            for i in 0..inner {
                out.push(var.get_string([t, i])?);
            }
        }
        return Ok(Some(FlatIndexData::Text(out)));
    }

    let tagged_time = var
        .attribute_value(name_label)
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            netcdf::AttributeValue::Str(s) => Some(s),
            _ => None,
        })
        .map(|s| s == epoch_name)
        .unwrap_or(false);

    if tagged_time {
        let raw: Vec<i64> = var.get_values(..)?;
        Ok(Some(FlatIndexData::Time(raw)))
    } else {
        let values: Vec<f64> = var.get_values(..)?;
        Ok(Some(FlatIndexData::Num(values)))
    }
}
