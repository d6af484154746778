use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use tabpipe::io::{read_table, write_table, LoadOptions, SaveOptions};
use tabpipe::types::{DataType, Field, Schema, Table, Value};

fn tmp_file(ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("tabpipe-json-{nanos}.{ext}"))
}

#[test]
fn read_jsonl_fixture_by_extension() {
    let t = read_table("tests/fixtures/people.jsonl", &LoadOptions::default()).unwrap();

    assert_eq!(t.row_count(), 2);
    let name_idx = t.schema.index_of("name").unwrap();
    assert_eq!(t.rows[1][name_idx], Value::Utf8("Grace".to_string()));
    let score_idx = t.schema.index_of("score").unwrap();
    assert_eq!(t.schema.fields[score_idx].data_type, DataType::Float64);
}

#[test]
fn round_trip_preserves_column_set_and_row_count() {
    let schema = Schema::new(vec![
        Field::new("id", DataType::Int64),
        Field::new("name", DataType::Utf8),
        Field::new("score", DataType::Float64),
    ]);
    let table = Table::new(
        schema,
        vec![
            vec![Value::Int64(1), Value::Utf8("Ada".to_string()), Value::Float64(98.5)],
            vec![Value::Int64(2), Value::Null, Value::Null],
        ],
    );
    let path = tmp_file("json");

    write_table(&table, &path, &SaveOptions::default()).unwrap();
    let back = read_table(&path, &LoadOptions::default()).unwrap();

    // JSON objects do not preserve column order, so compare by name.
    assert_eq!(back.row_count(), table.row_count());
    assert_eq!(back.column_count(), table.column_count());
    for field in &table.schema.fields {
        let src_idx = table.schema.index_of(&field.name).unwrap();
        let dst_idx = back.schema.index_of(&field.name).unwrap();
        for (src_row, dst_row) in table.rows.iter().zip(back.rows.iter()) {
            assert_eq!(src_row[src_idx], dst_row[dst_idx], "column {}", field.name);
        }
    }

    std::fs::remove_file(&path).ok();
}

#[test]
fn output_is_an_array_of_objects() {
    let schema = Schema::new(vec![Field::new("id", DataType::Int64)]);
    let table = Table::new(schema, vec![vec![Value::Int64(7)]]);
    let path = tmp_file("json");

    write_table(&table, &path, &SaveOptions::default()).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, serde_json::json!([{"id": 7}]));

    std::fs::remove_file(&path).ok();
}
