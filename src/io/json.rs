//! JSON record reading and writing.
//!
//! Supported inputs:
//! - A JSON array of objects: `[{"a":1}, {"a":2}]`
//! - A single JSON object (one row)
//! - Newline-delimited JSON (NDJSON / `.jsonl`): `{"a":1}\n{"a":2}\n`
//!
//! Columns are the union of the objects' keys; keys missing from a row map to
//! [`Value::Null`]. Output is a pretty-printed array of objects.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde_json::Value as JsonValue;

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataType, Field, Schema, Table, Value};

/// Read JSON records from a file into an in-memory [`Table`], inferring column types.
pub fn read_json_from_path(path: impl AsRef<Path>) -> PipelineResult<Table> {
    let text = fs::read_to_string(path)?;
    read_json_from_str(&text)
}

/// Read JSON records from an in-memory string into a [`Table`].
pub fn read_json_from_str(input: &str) -> PipelineResult<Table> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::Schema {
            message: "json input is empty".to_string(),
        });
    }

    // First try parsing as a single JSON value (array or object).
    let values: Vec<JsonValue> = if let Ok(v) = serde_json::from_str::<JsonValue>(trimmed) {
        match v {
            JsonValue::Array(items) => items,
            JsonValue::Object(_) => vec![v],
            _ => {
                return Err(PipelineError::Schema {
                    message: "json must be an object, an array of objects, or NDJSON".to_string(),
                })
            }
        }
    } else {
        // Fall back to NDJSON.
        let mut values = Vec::new();
        for (i, line) in trimmed.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let v = serde_json::from_str::<JsonValue>(line).map_err(|e| PipelineError::Schema {
                message: format!("invalid ndjson at line {}: {}", i + 1, e),
            })?;
            values.push(v);
        }
        values
    };

    table_from_json_values(&values)
}

fn table_from_json_values(values: &[JsonValue]) -> PipelineResult<Table> {
    let mut columns: Vec<String> = Vec::new();
    for (idx0, v) in values.iter().enumerate() {
        let obj = v.as_object().ok_or_else(|| PipelineError::Schema {
            message: format!("row {} is not a json object", idx0 + 1),
        })?;
        for key in obj.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }

    let mut fields = Vec::with_capacity(columns.len());
    for name in &columns {
        let cells = values.iter().filter_map(|v| v.as_object().and_then(|o| o.get(name)));
        fields.push(Field::new(name, infer_column_type(cells)));
    }
    let schema = Schema::new(fields);

    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(values.len());
    for (idx0, v) in values.iter().enumerate() {
        let row_num = idx0 + 1;
        // Checked above.
        let obj = v.as_object().ok_or_else(|| PipelineError::Schema {
            message: format!("row {row_num} is not a json object"),
        })?;

        let mut row: Vec<Value> = Vec::with_capacity(schema.fields.len());
        for field in &schema.fields {
            row.push(convert_json_value(
                row_num,
                &field.name,
                &field.data_type,
                obj.get(&field.name),
            )?);
        }
        rows.push(row);
    }

    Ok(Table::new(schema, rows))
}

fn infer_column_type<'a>(cells: impl Iterator<Item = &'a JsonValue>) -> DataType {
    let mut saw_value = false;
    let mut all_int = true;
    let mut all_number = true;
    let mut all_bool = true;

    for v in cells {
        if v.is_null() {
            continue;
        }
        saw_value = true;
        if all_int && !(v.is_i64() || v.is_u64()) {
            all_int = false;
        }
        if all_number && !v.is_number() {
            all_number = false;
        }
        if all_bool && !v.is_boolean() {
            all_bool = false;
        }
    }

    if !saw_value {
        return DataType::Utf8;
    }
    if all_int {
        DataType::Int64
    } else if all_number {
        DataType::Float64
    } else if all_bool {
        DataType::Bool
    } else {
        DataType::Utf8
    }
}

fn convert_json_value(
    row: usize,
    column: &str,
    data_type: &DataType,
    v: Option<&JsonValue>,
) -> PipelineResult<Value> {
    let Some(v) = v else { return Ok(Value::Null) };
    if v.is_null() {
        return Ok(Value::Null);
    }

    match data_type {
        DataType::Utf8 => Ok(match v {
            JsonValue::String(s) => Value::Utf8(s.clone()),
            other => Value::Utf8(other.to_string()),
        }),
        DataType::Bool => v.as_bool().map(Value::Bool).ok_or_else(|| PipelineError::Parse {
            row,
            column: column.to_string(),
            raw: v.to_string(),
            message: "expected bool".to_string(),
        }),
        DataType::Int64 => {
            if let Some(n) = v.as_i64() {
                Ok(Value::Int64(n))
            } else if let Some(n) = v.as_u64() {
                i64::try_from(n).map(Value::Int64).map_err(|_| PipelineError::Parse {
                    row,
                    column: column.to_string(),
                    raw: v.to_string(),
                    message: "u64 out of range for i64".to_string(),
                })
            } else {
                Err(PipelineError::Parse {
                    row,
                    column: column.to_string(),
                    raw: v.to_string(),
                    message: "expected integer number".to_string(),
                })
            }
        }
        DataType::Float64 => v.as_f64().map(Value::Float64).ok_or_else(|| PipelineError::Parse {
            row,
            column: column.to_string(),
            raw: v.to_string(),
            message: "expected number".to_string(),
        }),
    }
}

/// Write a [`Table`] as a pretty-printed JSON array of record objects.
///
/// Non-finite floats cannot be represented in JSON and serialize as `null`.
pub fn write_json_to_path(table: &Table, path: impl AsRef<Path>) -> PipelineResult<()> {
    let mut records: Vec<JsonValue> = Vec::with_capacity(table.row_count());
    for row in &table.rows {
        let mut obj = serde_json::Map::with_capacity(table.column_count());
        for (field, value) in table.schema.fields.iter().zip(row) {
            obj.insert(field.name.clone(), value_to_json(value));
        }
        records.push(JsonValue::Object(obj));
    }

    let file = fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &records)?;
    writer.flush()?;
    Ok(())
}

fn value_to_json(v: &Value) -> JsonValue {
    match v {
        Value::Null => JsonValue::Null,
        Value::Int64(n) => JsonValue::from(*n),
        Value::Float64(n) => serde_json::Number::from_f64(*n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::Bool(b) => JsonValue::from(*b),
        Value::Utf8(s) => JsonValue::from(s.clone()),
    }
}
