//! Feather (Arrow IPC file) reading and writing.
//!
//! Integer widths normalize to [`DataType::Int64`] and floats to [`DataType::Float64`] on read;
//! any other Arrow type is cast to UTF-8. Written files carry all columns as nullable.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanArray, BooleanBuilder, Float64Array, Float64Builder, Int64Array,
    Int64Builder, StringArray, StringBuilder,
};
use arrow::compute::cast;
use arrow::datatypes::{
    DataType as ArrowDataType, Field as ArrowField, Schema as ArrowSchema,
};
use arrow::ipc::reader::FileReader;
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataType, Field, Schema, Table, Value};

/// Read a Feather file into an in-memory [`Table`], inferring column types from the Arrow schema.
pub fn read_feather_from_path(path: impl AsRef<Path>) -> PipelineResult<Table> {
    let file = File::open(path)?;
    let reader = FileReader::try_new(file, None)?;
    let arrow_schema = reader.schema();

    let mut fields = Vec::with_capacity(arrow_schema.fields().len());
    for f in arrow_schema.fields() {
        fields.push(Field::new(f.name(), map_arrow_type(f.data_type())));
    }
    let schema = Schema::new(fields);

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for batch in reader {
        let batch = batch?;
        let mut columns: Vec<Vec<Value>> = Vec::with_capacity(schema.fields.len());
        for (idx, field) in schema.fields.iter().enumerate() {
            columns.push(column_to_values(batch.column(idx), &field.data_type, &field.name)?);
        }
        for row_idx in 0..batch.num_rows() {
            let mut row = Vec::with_capacity(columns.len());
            for col in &mut columns {
                row.push(std::mem::replace(&mut col[row_idx], Value::Null));
            }
            rows.push(row);
        }
    }

    Ok(Table::new(schema, rows))
}

fn map_arrow_type(t: &ArrowDataType) -> DataType {
    match t {
        ArrowDataType::Boolean => DataType::Bool,
        ArrowDataType::Int8
        | ArrowDataType::Int16
        | ArrowDataType::Int32
        | ArrowDataType::Int64
        | ArrowDataType::UInt8
        | ArrowDataType::UInt16
        | ArrowDataType::UInt32
        | ArrowDataType::UInt64 => DataType::Int64,
        ArrowDataType::Float16 | ArrowDataType::Float32 | ArrowDataType::Float64 => {
            DataType::Float64
        }
        _ => DataType::Utf8,
    }
}

fn column_to_values(
    array: &ArrayRef,
    data_type: &DataType,
    column: &str,
) -> PipelineResult<Vec<Value>> {
    let target = match data_type {
        DataType::Bool => ArrowDataType::Boolean,
        DataType::Int64 => ArrowDataType::Int64,
        DataType::Float64 => ArrowDataType::Float64,
        DataType::Utf8 => ArrowDataType::Utf8,
    };
    let casted = cast(array, &target)?;

    let mut out = Vec::with_capacity(casted.len());
    match data_type {
        DataType::Bool => {
            let arr = downcast::<BooleanArray>(&casted, column)?;
            for i in 0..arr.len() {
                out.push(if arr.is_null(i) { Value::Null } else { Value::Bool(arr.value(i)) });
            }
        }
        DataType::Int64 => {
            let arr = downcast::<Int64Array>(&casted, column)?;
            for i in 0..arr.len() {
                out.push(if arr.is_null(i) { Value::Null } else { Value::Int64(arr.value(i)) });
            }
        }
        DataType::Float64 => {
            let arr = downcast::<Float64Array>(&casted, column)?;
            for i in 0..arr.len() {
                out.push(if arr.is_null(i) {
                    Value::Null
                } else {
                    Value::Float64(arr.value(i))
                });
            }
        }
        DataType::Utf8 => {
            let arr = downcast::<StringArray>(&casted, column)?;
            for i in 0..arr.len() {
                out.push(if arr.is_null(i) {
                    Value::Null
                } else {
                    Value::Utf8(arr.value(i).to_string())
                });
            }
        }
    }
    Ok(out)
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, column: &str) -> PipelineResult<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| PipelineError::Schema {
            message: format!("unexpected array type in column '{column}'"),
        })
}

/// Write a [`Table`] as a Feather (Arrow IPC) file.
pub fn write_feather_to_path(table: &Table, path: impl AsRef<Path>) -> PipelineResult<()> {
    let arrow_fields: Vec<ArrowField> = table
        .schema
        .fields
        .iter()
        .map(|f| {
            let t = match f.data_type {
                DataType::Bool => ArrowDataType::Boolean,
                DataType::Int64 => ArrowDataType::Int64,
                DataType::Float64 => ArrowDataType::Float64,
                DataType::Utf8 => ArrowDataType::Utf8,
            };
            ArrowField::new(&f.name, t, true)
        })
        .collect();
    let arrow_schema = ArrowSchema::new(arrow_fields);

    let file = File::create(path)?;
    let mut writer = FileWriter::try_new(file, &arrow_schema)?;

    if table.column_count() > 0 {
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.column_count());
        for (idx, field) in table.schema.fields.iter().enumerate() {
            arrays.push(build_array(table, idx, &field.data_type));
        }
        let batch = RecordBatch::try_new(Arc::new(arrow_schema.clone()), arrays)?;
        writer.write(&batch)?;
    }

    writer.finish()?;
    Ok(())
}

fn build_array(table: &Table, col_idx: usize, data_type: &DataType) -> ArrayRef {
    match data_type {
        DataType::Bool => {
            let mut b = BooleanBuilder::with_capacity(table.row_count());
            for row in &table.rows {
                match &row[col_idx] {
                    Value::Bool(v) => b.append_value(*v),
                    _ => b.append_null(),
                }
            }
            Arc::new(b.finish())
        }
        DataType::Int64 => {
            let mut b = Int64Builder::with_capacity(table.row_count());
            for row in &table.rows {
                match &row[col_idx] {
                    Value::Int64(v) => b.append_value(*v),
                    _ => b.append_null(),
                }
            }
            Arc::new(b.finish())
        }
        DataType::Float64 => {
            let mut b = Float64Builder::with_capacity(table.row_count());
            for row in &table.rows {
                match &row[col_idx] {
                    Value::Float64(v) => b.append_value(*v),
                    Value::Int64(v) => b.append_value(*v as f64),
                    _ => b.append_null(),
                }
            }
            Arc::new(b.finish())
        }
        DataType::Utf8 => {
            let mut b = StringBuilder::new();
            for row in &table.rows {
                match &row[col_idx] {
                    Value::Null => b.append_null(),
                    Value::Utf8(s) => b.append_value(s),
                    other => b.append_value(other.to_string()),
                }
            }
            Arc::new(b.finish())
        }
    }
}
