//! Codec read path: one or more netCDF files back into a variable set and a
//! metadata store.

use std::collections::BTreeMap;
use std::path::PathBuf;

use insitu_core::{
    time, EpochOrigin, EpochUnit, LabelMap, MetaLabels, MetaRecord, MetaStore, VarData,
    VariableSet,
};
use tracing::{debug, warn};

use crate::convert::attr_to_value;
use crate::error::{CodecError, Result};
use crate::translation::TranslationTable;
use crate::{expand, nested, standards, MetaMap, MetaProcessor};

/// Options for [`read_netcdf`].
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Name of the time dimension and variable.
    pub epoch_name: String,
    /// Unit of the stored epoch counts.
    pub epoch_unit: EpochUnit,
    /// Origin of the stored epoch counts.
    pub epoch_origin: EpochOrigin,
    /// Labels removed from every variable right after extraction.
    pub drop_meta_labels: Vec<String>,
    /// Label translation from file vocabulary. Defaults to the fill fan-out
    /// table inverted.
    pub translation: Option<TranslationTable>,
    /// Fail when metadata differs across files instead of keeping the first.
    pub strict: bool,
    /// Internal vocabulary of the returned metadata store.
    pub labels: MetaLabels,
    /// Final hook over the extracted per-variable attribute maps, applied
    /// before translation back to internal labels.
    pub meta_processor: Option<MetaProcessor>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            epoch_name: "Epoch".to_string(),
            epoch_unit: EpochUnit::default(),
            epoch_origin: EpochOrigin::default(),
            drop_meta_labels: Vec::new(),
            translation: None,
            strict: false,
            labels: MetaLabels::default(),
            meta_processor: None,
        }
    }
}

/// Read one or more netCDF files, in order, into a variable set and a
/// metadata store.
///
/// Later files are concatenated onto earlier ones variable by variable.
/// Metadata comes from the first file; in strict mode any difference in a
/// later file is fatal.
pub fn read_netcdf(paths: &[PathBuf], opts: &ReadOptions) -> Result<(VariableSet, MetaStore)> {
    let mut vars = VariableSet::new();
    let mut header = LabelMap::new();
    let mut full_mdict: Option<MetaMap> = None;

    for path in paths {
        let file = netcdf::open(path)?;

        for attr in file.attributes() {
            header.insert(attr.name().to_string(), attr_to_value(&attr.value()?));
        }

        let mut file_mdict = MetaMap::new();
        let mut file_vars: Vec<(String, VarData)> = Vec::new();
        let mut groups: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();

        for var in file.variables() {
            let name = var.name();
            let mut labels = LabelMap::new();
            for attr in var.attributes() {
                labels.insert(attr.name().to_string(), attr_to_value(&attr.value()?));
            }
            file_mdict.insert(name.clone(), labels);

            match var.dimensions().len() {
                0 => {
                    debug!(variable = %name, "skipping dimensionless variable");
                }
                1 => {
                    file_vars.push((name.clone(), read_1d(&var, &name, opts)?));
                }
                2 => {
                    let dims = var.dimensions();
                    let key = (dims[0].name(), dims[1].name());
                    groups.entry(key).or_default().push(name.clone());
                }
                ndims => {
                    return Err(CodecError::UnsupportedDimensionality { name, ndims });
                }
            }
        }

        for names in groups.values() {
            let (outer, data) = nested::reconstruct(
                &file,
                names,
                &opts.epoch_name,
                &opts.labels.name,
                opts.epoch_unit,
                opts.epoch_origin,
            )?;
            // The 1-D pass read the index variable as flat data; the
            // reconstructed nested variable replaces it.
            file_vars.retain(|(name, _)| *name != outer);
            file_vars.push((outer, data));
        }

        match &full_mdict {
            Some(first) => {
                if opts.strict && *first != file_mdict {
                    return Err(CodecError::MetadataMismatch { path: path.clone() });
                }
            }
            None => full_mdict = Some(file_mdict),
        }

        for (name, data) in file_vars {
            match vars.get_mut(&name) {
                Some(existing) => {
                    if !existing.extend(data) {
                        warn!(
                            variable = %name,
                            path = %path.display(),
                            "variable type differs from earlier files, keeping earlier data"
                        );
                    }
                }
                None => vars.insert(name, data),
            }
        }
    }

    let mdict = full_mdict.unwrap_or_default();
    let store = process_metadata(mdict, &vars, header, opts);
    Ok((vars, store))
}

/// Read one 1-D variable. The epoch variable, and any variable tagged with
/// the epoch name under the naming label, converts to datetimes.
fn read_1d(var: &netcdf::Variable, name: &str, opts: &ReadOptions) -> Result<VarData> {
    use netcdf::types::{BasicType, VariableType};

    let tagged_time = var
        .attribute_value(&opts.labels.name)
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            netcdf::AttributeValue::Str(s) => Some(s),
            _ => None,
        })
        .map(|s| s == opts.epoch_name)
        .unwrap_or(false);

    if name == opts.epoch_name || tagged_time {
        let raw: Vec<i64> = var.get_values(..)?;
        return Ok(VarData::Time(time::to_datetimes(
            &raw,
            opts.epoch_unit,
            opts.epoch_origin,
        )));
    }

    match var.vartype() {
        VariableType::String => {
            let len = var.dimensions()[0].len();
            let mut values = Vec::with_capacity(len);
            for i in 0..len {
                values.push(var.get_string([i])?);
            }
            Ok(VarData::Text(values))
        }
        VariableType::Basic(BasicType::Float) | VariableType::Basic(BasicType::Double) => {
            Ok(VarData::Float(var.get_values(..)?))
        }
        _ => Ok(VarData::Int(var.get_values(..)?)),
    }
}

/// Strip, translate and expand the extracted metadata, then assemble the
/// store, folding flat `<outer>_<sub>` entries back into child records of
/// their higher-order variable.
fn process_metadata(
    mut mdict: MetaMap,
    vars: &VariableSet,
    header: LabelMap,
    opts: &ReadOptions,
) -> MetaStore {
    for labels in mdict.values_mut() {
        labels.retain(|key, _| !opts.drop_meta_labels.iter().any(|drop| drop == key));
    }

    standards::remove(&mut mdict);

    let table = opts
        .translation
        .clone()
        .unwrap_or_else(|| TranslationTable::default_for(&opts.labels));
    let translated: MetaMap = mdict
        .into_iter()
        .map(|(name, labels)| {
            let out = table.apply_from_file(&labels, &name);
            (name, out)
        })
        .collect();
    let mut mdict = translated;

    if let Some(processor) = opts.meta_processor {
        processor(&mut mdict);
    }

    for labels in mdict.values_mut() {
        *labels = expand::expand_labels(labels);
    }

    let mut store = MetaStore::new(opts.labels.clone());
    store.header = header;

    let mut consumed: Vec<String> = Vec::new();
    for (name, data) in vars.iter() {
        let mut record = MetaRecord::new();
        if let Some(labels) = mdict.get(name) {
            record.labels = labels.clone();
            consumed.push(name.clone());
        }
        if let VarData::Nested(cells) = data {
            if let Some(first) = cells.iter().find(|c| !c.is_empty()) {
                for col in first.column_names() {
                    let flat = format!("{name}_{col}");
                    let key = if mdict.contains_key(&flat) { flat } else { col.clone() };
                    if let Some(labels) = mdict.get(&key) {
                        record.children.insert(col, labels.clone());
                        consumed.push(key);
                    }
                }
            }
        }
        store.insert(name.clone(), record);
    }

    // Entries for variables the data pass never produced (dropped scalars,
    // index-only variables) are kept as plain records.
    for (name, labels) in mdict {
        if consumed.iter().any(|c| *c == name) || store.contains(&name) {
            continue;
        }
        let mut record = MetaRecord::new();
        record.labels = labels;
        store.insert(name, record);
    }

    store
}
