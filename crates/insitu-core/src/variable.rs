//! In-memory variable payloads.
//!
//! Every variable is either a 1-D array aligned to the shared time index, or
//! a "higher-order" variable whose element at each timestep is itself a
//! small table or series ([`Cell`]). One level of nesting is the supported
//! maximum.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// Element type of a variable, as declared to the file layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    Int64,
    Float64,
    Text,
    Time,
}

/// The per-row index of a nested cell.
#[derive(Debug, Clone, PartialEq)]
pub enum InnerIndex {
    /// Datetime-valued row labels, stored on disk as scaled milliseconds.
    Time(Vec<DateTime<Utc>>),
    /// Numeric row labels.
    Num(Vec<f64>),
    /// Text row labels.
    Text(Vec<String>),
}

impl InnerIndex {
    pub fn len(&self) -> usize {
        match self {
            InnerIndex::Time(v) => v.len(),
            InnerIndex::Num(v) => v.len(),
            InnerIndex::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Whether a nested cell is a single column or several.
///
/// Determined once per variable from the first non-empty cell, never
/// re-inferred per call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellShape {
    Series,
    Table,
}

/// Column payload of one nested cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellKind {
    /// Single named column.
    Series { name: String, values: Vec<f64> },
    /// Multiple named columns, in declaration order.
    Table { columns: Vec<(String, Vec<f64>)> },
}

/// One timestep of a higher-order variable: a row index plus one or more
/// equally long columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub index: InnerIndex,
    /// Name of the row index, when it has one.
    pub index_name: Option<String>,
    pub kind: CellKind,
}

impl Cell {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shape(&self) -> CellShape {
        match self.kind {
            CellKind::Series { .. } => CellShape::Series,
            CellKind::Table { .. } => CellShape::Table,
        }
    }

    /// Sub-variable names, in column order.
    pub fn column_names(&self) -> Vec<String> {
        match &self.kind {
            CellKind::Series { name, .. } => vec![name.clone()],
            CellKind::Table { columns } => columns.iter().map(|(n, _)| n.clone()).collect(),
        }
    }

    /// Values of a named column, when present.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        match &self.kind {
            CellKind::Series { name: n, values } if n == name => Some(values),
            CellKind::Series { .. } => None,
            CellKind::Table { columns } => columns
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_slice()),
        }
    }
}

/// The data payload of one variable.
#[derive(Debug, Clone, PartialEq)]
pub enum VarData {
    Float(Vec<f64>),
    Int(Vec<i64>),
    Text(Vec<String>),
    Time(Vec<DateTime<Utc>>),
    /// Higher-order: one cell per timestep.
    Nested(Vec<Cell>),
}

impl VarData {
    /// Number of timesteps covered.
    pub fn len(&self) -> usize {
        match self {
            VarData::Float(v) => v.len(),
            VarData::Int(v) => v.len(),
            VarData::Text(v) => v.len(),
            VarData::Time(v) => v.len(),
            VarData::Nested(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Declared element type; `None` for nested variables, which have no
    /// single element type.
    pub fn dtype(&self) -> Option<DType> {
        match self {
            VarData::Float(_) => Some(DType::Float64),
            VarData::Int(_) => Some(DType::Int64),
            VarData::Text(_) => Some(DType::Text),
            VarData::Time(_) => Some(DType::Time),
            VarData::Nested(_) => None,
        }
    }

    /// Append another payload of the same variant (multi-file accumulation).
    /// Returns false when the variants differ, leaving `self` unchanged.
    pub fn extend(&mut self, other: VarData) -> bool {
        match (self, other) {
            (VarData::Float(a), VarData::Float(b)) => a.extend(b),
            (VarData::Int(a), VarData::Int(b)) => a.extend(b),
            (VarData::Text(a), VarData::Text(b)) => a.extend(b),
            (VarData::Time(a), VarData::Time(b)) => a.extend(b),
            (VarData::Nested(a), VarData::Nested(b)) => a.extend(b),
            _ => return false,
        }
        true
    }
}

/// The full variable set handed to (or returned by) a codec call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableSet {
    vars: BTreeMap<String, VarData>,
}

impl VariableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, data: VarData) {
        self.vars.insert(name.into(), data);
    }

    pub fn get(&self, name: &str) -> Option<&VarData> {
        self.vars.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut VarData> {
        self.vars.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<VarData> {
        self.vars.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.vars.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &VarData)> {
        self.vars.iter()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// First pair of names that collide case-insensitively, if any.
    /// Such a set cannot be written without losing metadata.
    pub fn case_collision(&self) -> Option<(&str, &str)> {
        let names: Vec<&String> = self.vars.keys().collect();
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                if a.eq_ignore_ascii_case(b) {
                    return Some((a.as_str(), b.as_str()));
                }
            }
        }
        None
    }
}

impl FromIterator<(String, VarData)> for VariableSet {
    fn from_iter<I: IntoIterator<Item = (String, VarData)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}
