//! Integration tests: write real netCDF files and read them back.
//!
//! Each test builds a small variable set with known values, writes it
//! through the full codec pipeline, then verifies the file contents or the
//! reloaded data against the original.

use std::path::PathBuf;

use chrono::{DateTime, TimeZone, Utc};
use insitu_core::{
    Cell, CellKind, InnerIndex, MetaRecord, MetaStore, LabelMap, Value, VarData, VariableSet,
};
use insitu_netcdf::{
    read_netcdf, write_netcdf, CodecError, ReadOptions, TranslationTable, WriteOptions,
};

fn times(n: usize) -> Vec<DateTime<Utc>> {
    (0..n)
        .map(|i| {
            Utc.with_ymd_and_hms(2014, 5, 1, 0, 0, 0).unwrap()
                + chrono::Duration::seconds(i as i64)
        })
        .collect()
}

fn write_and_read(
    vars: &VariableSet,
    meta: &MetaStore,
    time_index: &[DateTime<Utc>],
    write_opts: &WriteOptions,
    read_opts: &ReadOptions,
) -> (VariableSet, MetaStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("test.nc");
    write_netcdf(&path, vars, meta, &LabelMap::new(), time_index, write_opts)
        .expect("write failed");
    read_netcdf(&[path], read_opts).expect("read failed")
}

#[test]
fn roundtrip_numeric_and_string_variables() {
    let mut vars = VariableSet::new();
    vars.insert("mlt", VarData::Float(vec![1.5, 2.5, 3.5]));
    vars.insert("counts", VarData::Int(vec![10, 20, 30]));
    vars.insert(
        "mode",
        VarData::Text(vec![
            "science".to_string(),
            "cal".to_string(),
            "science".to_string(),
        ]),
    );

    let mut meta = MetaStore::default();
    meta.insert("mlt", MetaRecord::from_pairs([("units", Value::from("hours"))]));
    meta.insert("counts", MetaRecord::from_pairs([("units", Value::from("1"))]));
    meta.insert("mode", MetaRecord::from_pairs([("desc", Value::from("instrument mode"))]));

    let (loaded, store) = write_and_read(
        &vars,
        &meta,
        &times(3),
        &WriteOptions::default(),
        &ReadOptions::default(),
    );

    assert_eq!(loaded.get("mlt"), Some(&VarData::Float(vec![1.5, 2.5, 3.5])));
    assert_eq!(loaded.get("counts"), Some(&VarData::Int(vec![10, 20, 30])));
    assert_eq!(
        loaded.get("mode"),
        Some(&VarData::Text(vec![
            "science".to_string(),
            "cal".to_string(),
            "science".to_string(),
        ]))
    );
    assert_eq!(loaded.get("Epoch"), Some(&VarData::Time(times(3))));

    let record = store.get("mlt").expect("mlt metadata");
    assert_eq!(record.labels["units"], Value::from("hours"));
    // Standard labels were stripped on the way back in
    assert!(!record.labels.contains_key("Depend_0"));
    assert!(!record.labels.contains_key("Format"));
}

#[test]
fn roundtrip_datetime_variable() {
    let stamps = vec![
        Utc.with_ymd_and_hms(2013, 12, 31, 23, 59, 59).unwrap(),
        Utc.with_ymd_and_hms(2014, 5, 1, 12, 0, 0).unwrap(),
    ];
    let mut vars = VariableSet::new();
    vars.insert("event_time", VarData::Time(stamps.clone()));

    let mut meta = MetaStore::default();
    meta.insert("event_time", MetaRecord::new());

    let (loaded, _) = write_and_read(
        &vars,
        &meta,
        &times(2),
        &WriteOptions::default(),
        &ReadOptions::default(),
    );
    assert_eq!(loaded.get("event_time"), Some(&VarData::Time(stamps)));
}

#[test]
fn nan_fill_dropped_by_default_and_kept_with_export_nan() {
    let mut vars = VariableSet::new();
    vars.insert("mlt", VarData::Float(vec![1.0, 2.0]));

    let mut meta = MetaStore::default();
    let mut record = MetaRecord::from_pairs([("units", Value::from("hours"))]);
    record.set("fill", Value::Float(f64::NAN));
    meta.insert("mlt", record);

    // Default: the NaN fill label never reaches the file
    let (_, store) = write_and_read(
        &vars,
        &meta,
        &times(2),
        &WriteOptions::default(),
        &ReadOptions::default(),
    );
    let reloaded = store.get("mlt").expect("mlt metadata");
    assert!(!reloaded.labels.contains_key("fill"));
    assert_eq!(reloaded.labels["units"], Value::from("hours"));

    // With the fill label on the export list it survives as NaN
    let opts = WriteOptions {
        export_nan: Some(vec!["fill".to_string()]),
        ..WriteOptions::default()
    };
    let (_, store) = write_and_read(&vars, &meta, &times(2), &opts, &ReadOptions::default());
    let reloaded = store.get("mlt").expect("mlt metadata");
    assert!(reloaded.labels["fill"].is_nan());
}

#[test]
fn fill_label_fans_out_on_file() {
    let mut vars = VariableSet::new();
    vars.insert("mlt", VarData::Float(vec![1.0]));

    let mut meta = MetaStore::default();
    meta.insert("mlt", MetaRecord::from_pairs([("fill", Value::Float(-999.0))]));

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("fanout.nc");
    write_netcdf(
        &path,
        &vars,
        &meta,
        &LabelMap::new(),
        &times(1),
        &WriteOptions::default(),
    )
    .expect("write failed");

    let file = netcdf::open(&path).expect("open");
    let var = file.variable("mlt").expect("mlt on file");
    for label in ["_FillValue", "FillVal", "fill"] {
        let value = var
            .attribute_value(label)
            .unwrap_or_else(|| panic!("{label} missing"))
            .expect("attribute read");
        match value {
            netcdf::AttributeValue::Double(d) => assert_eq!(d, -999.0),
            other => panic!("{label} has unexpected type: {other:?}"),
        }
    }
    drop(file);

    // Any one of the three maps back to the fill label
    let (_, store) = read_netcdf(&[path], &ReadOptions::default()).expect("read failed");
    let record = store.get("mlt").expect("mlt metadata");
    assert_eq!(record.labels["fill"], Value::Float(-999.0));
    assert!(!record.labels.contains_key("_FillValue"));
    assert!(!record.labels.contains_key("FillVal"));
}

#[test]
fn roundtrip_nested_table_variable() {
    let altitudes = vec![100.0, 200.0, 300.0, 400.0];
    let cells: Vec<Cell> = (0..3)
        .map(|t| Cell {
            index: InnerIndex::Num(altitudes.clone()),
            index_name: Some("altitude".to_string()),
            kind: CellKind::Table {
                columns: vec![
                    (
                        "density".to_string(),
                        (0..4).map(|i| (t * 10 + i) as f64).collect(),
                    ),
                    ("temp".to_string(), vec![0.5; 4]),
                ],
            },
        })
        .collect();

    let mut vars = VariableSet::new();
    vars.insert("profiles", VarData::Nested(cells));

    let mut meta = MetaStore::default();
    let mut record = MetaRecord::from_pairs([("desc", Value::from("plasma profiles"))]);
    record.children.insert("density".to_string(), {
        let mut child = LabelMap::new();
        child.insert("units".to_string(), Value::from("cm^-3"));
        child
    });
    meta.insert("profiles", record);

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested.nc");
    write_netcdf(
        &path,
        &vars,
        &meta,
        &LabelMap::new(),
        &times(3),
        &WriteOptions::default(),
    )
    .expect("write failed");

    // On file: two flat (epoch, profiles) data variables plus the index
    {
        let file = netcdf::open(&path).expect("open");
        for name in ["profiles_density", "profiles_temp", "profiles"] {
            let var = file.variable(name).unwrap_or_else(|| panic!("{name} missing"));
            assert_eq!(var.dimensions().len(), 2, "{name} should be 2-D");
            assert_eq!(var.dimensions()[1].len(), 4);
        }
    }

    let (loaded, store) = read_netcdf(&[path], &ReadOptions::default()).expect("read failed");
    let Some(VarData::Nested(cells)) = loaded.get("profiles") else {
        panic!("profiles did not come back nested");
    };
    assert_eq!(cells.len(), 3);
    for (t, cell) in cells.iter().enumerate() {
        assert_eq!(cell.len(), 4);
        assert_eq!(cell.column_names(), vec!["density".to_string(), "temp".to_string()]);
        let density = cell.column("density").expect("density column");
        assert_eq!(density[0], (t * 10) as f64);
        match &cell.index {
            InnerIndex::Num(values) => assert_eq!(values, &altitudes),
            other => panic!("unexpected index: {other:?}"),
        }
    }

    let record = store.get("profiles").expect("profiles metadata");
    assert_eq!(record.labels["desc"], Value::from("plasma profiles"));
    let child = record.children.get("density").expect("density child");
    assert_eq!(child["units"], Value::from("cm^-3"));
}

fn sample_data(kind: &str) -> VarData {
    match kind {
        "float" => VarData::Float(vec![1.0]),
        "int" => VarData::Int(vec![1]),
        "text" => VarData::Text(vec!["a".to_string()]),
        "time" => VarData::Time(times(1)),
        _ => VarData::Nested(vec![Cell {
            index: InnerIndex::Num(vec![0.0, 1.0]),
            index_name: None,
            kind: CellKind::Series {
                name: "s".to_string(),
                values: vec![1.0, 2.0],
            },
        }]),
    }
}

#[test]
fn case_collision_is_fatal_before_any_write() {
    let kinds = ["float", "int", "text", "time", "nested"];
    let dir = tempfile::tempdir().expect("tempdir");

    for first in kinds {
        for second in kinds {
            let mut vars = VariableSet::new();
            vars.insert("Foo", sample_data(first));
            vars.insert("foo", sample_data(second));

            let path = dir.path().join(format!("collision_{first}_{second}.nc"));
            let err = write_netcdf(
                &path,
                &vars,
                &MetaStore::default(),
                &LabelMap::new(),
                &times(1),
                &WriteOptions::default(),
            )
            .unwrap_err();

            assert!(
                matches!(err, CodecError::CaseCollision { .. }),
                "{first}/{second} collision not fatal"
            );
            assert!(!path.exists(), "{first}/{second}: no file should be created");
        }
    }
}

#[test]
fn custom_translation_table_roundtrips() {
    let mut table = TranslationTable::new();
    table.map("units", ["UNITS"]);
    table.map("fill", ["_FillValue", "FillVal", "fill"]);

    let mut vars = VariableSet::new();
    vars.insert("mlt", VarData::Float(vec![1.0]));

    let mut meta = MetaStore::default();
    meta.insert(
        "mlt",
        MetaRecord::from_pairs([
            ("units", Value::from("hours")),
            ("fill", Value::Float(-1.0)),
        ]),
    );

    let write_opts = WriteOptions {
        translation: Some(table.clone()),
        ..WriteOptions::default()
    };
    let read_opts = ReadOptions {
        translation: Some(table),
        ..ReadOptions::default()
    };
    let (_, store) = write_and_read(&vars, &meta, &times(1), &write_opts, &read_opts);

    let record = store.get("mlt").expect("mlt metadata");
    assert_eq!(record.labels["units"], Value::from("hours"));
    assert_eq!(record.labels["fill"], Value::Float(-1.0));
    assert!(!record.labels.contains_key("UNITS"));
}

#[test]
fn multi_file_read_concatenates_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut paths: Vec<PathBuf> = Vec::new();

    for day in 1..=2u32 {
        let index: Vec<DateTime<Utc>> = (0..2)
            .map(|i| Utc.with_ymd_and_hms(2014, 5, day, 0, 0, i).unwrap())
            .collect();
        let mut vars = VariableSet::new();
        vars.insert(
            "mlt",
            VarData::Float(vec![day as f64, day as f64 + 0.5]),
        );
        let mut meta = MetaStore::default();
        meta.insert("mlt", MetaRecord::from_pairs([("units", Value::from("hours"))]));

        let path = dir.path().join(format!("day{day}.nc"));
        write_netcdf(
            &path,
            &vars,
            &meta,
            &LabelMap::new(),
            &index,
            &WriteOptions::default(),
        )
        .expect("write failed");
        paths.push(path);
    }

    let opts = ReadOptions {
        strict: true,
        ..ReadOptions::default()
    };
    let (loaded, _) = read_netcdf(&paths, &opts).expect("read failed");
    assert_eq!(
        loaded.get("mlt"),
        Some(&VarData::Float(vec![1.0, 1.5, 2.0, 2.5]))
    );
    let Some(VarData::Time(epoch)) = loaded.get("Epoch") else {
        panic!("epoch missing");
    };
    assert_eq!(epoch.len(), 4);
    assert!(epoch.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn strict_mode_rejects_differing_metadata() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut paths: Vec<PathBuf> = Vec::new();

    for (i, units) in ["hours", "minutes"].iter().enumerate() {
        let mut vars = VariableSet::new();
        vars.insert("mlt", VarData::Float(vec![1.0]));
        let mut meta = MetaStore::default();
        meta.insert("mlt", MetaRecord::from_pairs([("units", Value::from(*units))]));

        let path = dir.path().join(format!("file{i}.nc"));
        write_netcdf(
            &path,
            &vars,
            &meta,
            &LabelMap::new(),
            &times(1),
            &WriteOptions::default(),
        )
        .expect("write failed");
        paths.push(path);
    }

    let strict = ReadOptions {
        strict: true,
        ..ReadOptions::default()
    };
    let err = read_netcdf(&paths, &strict).unwrap_err();
    assert!(matches!(err, CodecError::MetadataMismatch { .. }));

    // Non-strict keeps the first file's metadata
    let (_, store) = read_netcdf(&paths, &ReadOptions::default()).expect("read failed");
    assert_eq!(
        store.get("mlt").expect("mlt metadata").labels["units"],
        Value::from("hours")
    );
}

#[test]
fn global_attributes_include_provenance() {
    let mut vars = VariableSet::new();
    vars.insert("mlt", VarData::Float(vec![1.0]));
    let mut meta = MetaStore::default();
    meta.insert("mlt", MetaRecord::new());

    let mut globals = LabelMap::new();
    globals.insert("mission".to_string(), Value::from("demo"));
    globals.insert("active".to_string(), Value::Bool(true));

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("globals.nc");
    write_netcdf(&path, &vars, &meta, &globals, &times(1), &WriteOptions::default())
        .expect("write failed");

    let (_, store) = read_netcdf(&[path], &ReadOptions::default()).expect("read failed");
    assert_eq!(store.header["mission"], Value::from("demo"));
    // Booleans are coerced to integers on file
    assert_eq!(store.header["active"], Value::Int(1));
    assert_eq!(
        store.header["Logical_File_ID"],
        Value::from("globals")
    );
    // Stamps carry millisecond precision
    let stamp = Value::from("Thu, 01 May 2014, 2014-05-01T00:00:00.000 UTC");
    assert_eq!(store.header["Date_Start"], stamp);
    assert_eq!(store.header["Date_End"], stamp);
    for key in ["Generation_Date", "Conventions"] {
        assert!(store.header.contains_key(key), "{key} missing");
    }
}

#[test]
fn zlib_compression_roundtrips() {
    let mut vars = VariableSet::new();
    vars.insert("mlt", VarData::Float((0..100).map(f64::from).collect()));
    let mut meta = MetaStore::default();
    meta.insert("mlt", MetaRecord::new());

    let opts = WriteOptions {
        zlib: true,
        complevel: 6,
        shuffle: true,
        ..WriteOptions::default()
    };
    let (loaded, _) = write_and_read(&vars, &meta, &times(100), &opts, &ReadOptions::default());
    let Some(VarData::Float(values)) = loaded.get("mlt") else {
        panic!("mlt missing");
    };
    assert_eq!(values.len(), 100);
    assert_eq!(values[42], 42.0);
}
