use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use tabpipe::format::TableFormat;
use tabpipe::io::{read_table, write_table, Compression, LoadOptions, SaveOptions};
use tabpipe::types::{DataType, Field, Schema, Table, Value};

fn tmp_file(ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("tabpipe-parquet-{nanos}.{ext}"))
}

fn people_table() -> Table {
    let schema = Schema::new(vec![
        Field::new("id", DataType::Int64),
        Field::new("name", DataType::Utf8),
        Field::new("score", DataType::Float64),
        Field::new("active", DataType::Bool),
    ]);
    Table::new(
        schema,
        vec![
            vec![
                Value::Int64(1),
                Value::Utf8("Ada".to_string()),
                Value::Float64(98.5),
                Value::Bool(true),
            ],
            vec![
                Value::Int64(2),
                Value::Utf8("Grace".to_string()),
                Value::Float64(87.25),
                Value::Bool(false),
            ],
            vec![Value::Int64(3), Value::Null, Value::Null, Value::Null],
        ],
    )
}

#[test]
fn round_trip_preserves_schema_rows_and_nulls() {
    let table = people_table();
    let path = tmp_file("parquet");

    write_table(&table, &path, &SaveOptions::default()).unwrap();
    let back = read_table(&path, &LoadOptions::default()).unwrap();

    assert_eq!(back.schema, table.schema);
    assert_eq!(back.rows, table.rows);

    std::fs::remove_file(&path).ok();
}

#[test]
fn round_trip_with_each_compression_codec() {
    for codec in [
        Compression::None,
        Compression::Snappy,
        Compression::Gzip,
        Compression::Zstd,
    ] {
        let table = people_table();
        let path = tmp_file("parquet");

        let opts = SaveOptions {
            compression: Some(codec),
            ..Default::default()
        };
        write_table(&table, &path, &opts).unwrap();
        let back = read_table(&path, &LoadOptions::default()).unwrap();
        assert_eq!(back.rows, table.rows, "codec {codec:?}");

        std::fs::remove_file(&path).ok();
    }
}

#[test]
fn explicit_format_overrides_extension_inference() {
    let table = people_table();
    // No recognizable extension; rely on the explicit format on both sides.
    let path = tmp_file("bin");

    let save = SaveOptions {
        format: Some(TableFormat::Parquet),
        ..Default::default()
    };
    write_table(&table, &path, &save).unwrap();

    let load = LoadOptions {
        format: Some(TableFormat::Parquet),
        ..Default::default()
    };
    let back = read_table(&path, &load).unwrap();
    assert_eq!(back.row_count(), table.row_count());

    std::fs::remove_file(&path).ok();
}

#[test]
fn pq_alias_resolves_to_parquet() {
    let table = people_table();
    let path = tmp_file("pq");

    write_table(&table, &path, &SaveOptions::default()).unwrap();
    let back = read_table(&path, &LoadOptions::default()).unwrap();
    assert_eq!(back.schema, table.schema);

    std::fs::remove_file(&path).ok();
}
