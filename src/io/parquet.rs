//! Parquet reading and writing.
//!
//! Reading walks the file's leaf columns to derive the [`Schema`], then uses the Parquet record
//! API (`RowIter`). Writing builds an all-`OPTIONAL` schema and emits a single row group with
//! definition levels encoding nulls.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use parquet::basic::{
    Compression as ParquetCompression, ConvertedType, Repetition, Type as PhysicalType,
};
use parquet::column::writer::ColumnWriter;
use parquet::data_type::ByteArray;
use parquet::file::properties::WriterProperties;
use parquet::file::reader::FileReader;
use parquet::file::serialized_reader::SerializedFileReader;
use parquet::file::writer::SerializedFileWriter;
use parquet::record::Field as ParquetField;
use parquet::schema::types::Type as ParquetType;

use crate::error::{PipelineError, PipelineResult};
use crate::io::Compression;
use crate::types::{DataType, Field, Schema, Table, Value};

/// Read a Parquet file into an in-memory [`Table`], inferring column types from the file schema.
pub fn read_parquet_from_path(path: impl AsRef<Path>) -> PipelineResult<Table> {
    let reader = SerializedFileReader::try_from(path.as_ref())?;

    let mut fields = Vec::new();
    for col in reader.metadata().file_metadata().schema_descr().columns() {
        let data_type = match col.physical_type() {
            PhysicalType::BOOLEAN => DataType::Bool,
            PhysicalType::INT32 | PhysicalType::INT64 => DataType::Int64,
            PhysicalType::FLOAT | PhysicalType::DOUBLE => DataType::Float64,
            _ => DataType::Utf8,
        };
        fields.push(Field::new(col.path().string(), data_type));
    }
    let schema = Schema::new(fields);

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (idx0, row_res) in reader.into_iter().enumerate() {
        let row_num = idx0 + 1;
        let row = row_res?;

        // Build a name -> field map for lookup.
        let mut map: HashMap<&str, &ParquetField> = HashMap::new();
        for (name, field) in row.get_column_iter() {
            map.insert(name.as_str(), field);
        }

        let mut out_row: Vec<Value> = Vec::with_capacity(schema.fields.len());
        for f in &schema.fields {
            let v = map.get(f.name.as_str()).ok_or_else(|| PipelineError::Schema {
                message: format!("row {row_num} missing column '{}'", f.name),
            })?;
            out_row.push(convert_parquet_field(row_num, &f.name, &f.data_type, v)?);
        }
        rows.push(out_row);
    }

    Ok(Table::new(schema, rows))
}

fn convert_parquet_field(
    row: usize,
    column: &str,
    data_type: &DataType,
    f: &ParquetField,
) -> PipelineResult<Value> {
    if matches!(f, ParquetField::Null) {
        return Ok(Value::Null);
    }

    match data_type {
        DataType::Utf8 => match f {
            ParquetField::Str(s) => Ok(Value::Utf8(s.clone())),
            other => Ok(Value::Utf8(other.to_string())),
        },
        DataType::Bool => match f {
            ParquetField::Bool(b) => Ok(Value::Bool(*b)),
            _ => Err(parse_err(row, column, f, "expected bool")),
        },
        DataType::Int64 => match f {
            ParquetField::Byte(v) => Ok(Value::Int64(i64::from(*v))),
            ParquetField::Short(v) => Ok(Value::Int64(i64::from(*v))),
            ParquetField::Int(v) => Ok(Value::Int64(i64::from(*v))),
            ParquetField::Long(v) => Ok(Value::Int64(*v)),
            ParquetField::UByte(v) => Ok(Value::Int64(i64::from(*v))),
            ParquetField::UShort(v) => Ok(Value::Int64(i64::from(*v))),
            ParquetField::UInt(v) => Ok(Value::Int64(i64::from(*v))),
            ParquetField::ULong(v) => i64::try_from(*v)
                .map(Value::Int64)
                .map_err(|_| parse_err(row, column, f, "u64 out of range for i64")),
            _ => Err(parse_err(row, column, f, "expected integer")),
        },
        DataType::Float64 => match f {
            ParquetField::Float(v) => Ok(Value::Float64(f64::from(*v))),
            ParquetField::Double(v) => Ok(Value::Float64(*v)),
            _ => Err(parse_err(row, column, f, "expected number")),
        },
    }
}

fn parse_err(row: usize, column: &str, f: &ParquetField, message: &str) -> PipelineError {
    PipelineError::Parse {
        row,
        column: column.to_string(),
        raw: f.to_string(),
        message: message.to_string(),
    }
}

/// Write a [`Table`] as Parquet, optionally compressed.
pub fn write_parquet_to_path(
    table: &Table,
    path: impl AsRef<Path>,
    compression: Option<Compression>,
) -> PipelineResult<()> {
    let schema = Arc::new(build_parquet_schema(&table.schema)?);
    let props = Arc::new(
        WriterProperties::builder()
            .set_compression(map_compression(compression))
            .build(),
    );

    let file = File::create(path)?;
    let mut writer = SerializedFileWriter::new(file, schema, props)?;

    let mut rg = writer.next_row_group()?;
    let mut col_idx: usize = 0;
    while let Some(mut col) = rg.next_column()? {
        let field = table.schema.fields.get(col_idx).ok_or_else(|| PipelineError::Schema {
            message: format!("parquet writer produced more columns than schema has ({col_idx})"),
        })?;
        let cells = table.rows.iter().map(|row| &row[col_idx]);

        match col.untyped() {
            ColumnWriter::BoolColumnWriter(w) => {
                let (values, defs) = collect_column(cells, |v| match v {
                    Value::Bool(b) => Some(*b),
                    _ => None,
                });
                w.write_batch(&values, Some(&defs), None)?;
            }
            ColumnWriter::Int64ColumnWriter(w) => {
                let (values, defs) = collect_column(cells, |v| match v {
                    Value::Int64(n) => Some(*n),
                    _ => None,
                });
                w.write_batch(&values, Some(&defs), None)?;
            }
            ColumnWriter::DoubleColumnWriter(w) => {
                let (values, defs) = collect_column(cells, |v| match v {
                    Value::Float64(n) => Some(*n),
                    Value::Int64(n) => Some(*n as f64),
                    _ => None,
                });
                w.write_batch(&values, Some(&defs), None)?;
            }
            ColumnWriter::ByteArrayColumnWriter(w) => {
                let (values, defs) = collect_column(cells, |v| match v {
                    Value::Null => None,
                    Value::Utf8(s) => Some(ByteArray::from(s.as_str())),
                    other => Some(ByteArray::from(other.to_string().as_str())),
                });
                w.write_batch(&values, Some(&defs), None)?;
            }
            _ => {
                return Err(PipelineError::Schema {
                    message: format!("unexpected parquet column writer for '{}'", field.name),
                })
            }
        }
        col.close()?;
        col_idx += 1;
    }
    rg.close()?;
    writer.close()?;
    Ok(())
}

/// Split a column into the dense value vector plus definition levels (1 = present, 0 = null).
fn collect_column<'a, T>(
    cells: impl Iterator<Item = &'a Value>,
    extract: impl Fn(&Value) -> Option<T>,
) -> (Vec<T>, Vec<i16>) {
    let mut values = Vec::new();
    let mut defs = Vec::new();
    for cell in cells {
        match extract(cell) {
            Some(v) => {
                values.push(v);
                defs.push(1);
            }
            None => defs.push(0),
        }
    }
    (values, defs)
}

fn build_parquet_schema(schema: &Schema) -> PipelineResult<ParquetType> {
    let mut fields = Vec::with_capacity(schema.fields.len());
    for f in &schema.fields {
        let builder = match f.data_type {
            DataType::Bool => ParquetType::primitive_type_builder(&f.name, PhysicalType::BOOLEAN),
            DataType::Int64 => ParquetType::primitive_type_builder(&f.name, PhysicalType::INT64),
            DataType::Float64 => ParquetType::primitive_type_builder(&f.name, PhysicalType::DOUBLE),
            DataType::Utf8 => {
                ParquetType::primitive_type_builder(&f.name, PhysicalType::BYTE_ARRAY)
                    .with_converted_type(ConvertedType::UTF8)
            }
        };
        fields.push(Arc::new(builder.with_repetition(Repetition::OPTIONAL).build()?));
    }

    Ok(ParquetType::group_type_builder("table").with_fields(fields).build()?)
}

fn map_compression(compression: Option<Compression>) -> ParquetCompression {
    match compression {
        None | Some(Compression::None) => ParquetCompression::UNCOMPRESSED,
        Some(Compression::Snappy) => ParquetCompression::SNAPPY,
        Some(Compression::Gzip) => ParquetCompression::GZIP(Default::default()),
        Some(Compression::Brotli) => ParquetCompression::BROTLI(Default::default()),
        Some(Compression::Zstd) => ParquetCompression::ZSTD(Default::default()),
    }
}
