#![cfg(feature = "hdf")]

//! HDF5 reading and writing.
//!
//! Layout: one 1-D dataset per column under a `table` group, with a `column_index` attribute
//! preserving column order. HDF5 has no null representation, so nulls coerce on write:
//! Float64 nulls become NaN and Utf8 nulls become empty strings; integer or boolean columns
//! containing nulls are an error.

use std::path::Path;
use std::str::FromStr;

use hdf5::types::{TypeDescriptor, VarLenAscii, VarLenUnicode};

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataType, Field, Schema, Table, Value};

const GROUP: &str = "table";
const INDEX_ATTR: &str = "column_index";

/// Read an HDF5 file written by [`write_hdf_to_path`] into an in-memory [`Table`].
pub fn read_hdf_from_path(path: impl AsRef<Path>) -> PipelineResult<Table> {
    let file = hdf5::File::open(path.as_ref())?;
    let group = file.group(GROUP)?;

    // Column order comes from the index attribute; datasets without one sort last by name.
    let mut names: Vec<(u32, String)> = Vec::new();
    for name in group.member_names()? {
        let ds = group.dataset(&name)?;
        let idx = ds
            .attr(INDEX_ATTR)
            .and_then(|a| a.read_scalar::<u32>())
            .unwrap_or(u32::MAX);
        names.push((idx, name));
    }
    names.sort();

    let mut fields: Vec<Field> = Vec::with_capacity(names.len());
    let mut columns: Vec<Vec<Value>> = Vec::with_capacity(names.len());
    for (_, name) in &names {
        let ds = group.dataset(name)?;
        let (data_type, values) = read_column(&ds, name)?;
        fields.push(Field::new(name, data_type));
        columns.push(values);
    }

    let row_count = columns.first().map_or(0, Vec::len);
    if columns.iter().any(|c| c.len() != row_count) {
        return Err(PipelineError::Schema {
            message: "hdf5 column datasets have differing lengths".to_string(),
        });
    }

    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(row_count);
    for row_idx in 0..row_count {
        let mut row = Vec::with_capacity(columns.len());
        for col in &mut columns {
            row.push(std::mem::replace(&mut col[row_idx], Value::Null));
        }
        rows.push(row);
    }

    Ok(Table::new(Schema::new(fields), rows))
}

fn read_column(ds: &hdf5::Dataset, name: &str) -> PipelineResult<(DataType, Vec<Value>)> {
    let descriptor = ds.dtype()?.to_descriptor()?;
    match descriptor {
        TypeDescriptor::Integer(_) => {
            let data = ds.read_1d::<i64>()?;
            Ok((DataType::Int64, data.iter().map(|v| Value::Int64(*v)).collect()))
        }
        TypeDescriptor::Unsigned(_) => {
            let data = ds.read_1d::<u64>()?;
            let mut out = Vec::with_capacity(data.len());
            for v in data.iter() {
                let v = i64::try_from(*v).map_err(|_| PipelineError::Schema {
                    message: format!("hdf5 column '{name}' holds u64 out of range for i64"),
                })?;
                out.push(Value::Int64(v));
            }
            Ok((DataType::Int64, out))
        }
        TypeDescriptor::Float(_) => {
            let data = ds.read_1d::<f64>()?;
            let out = data
                .iter()
                .map(|v| if v.is_nan() { Value::Null } else { Value::Float64(*v) })
                .collect();
            Ok((DataType::Float64, out))
        }
        TypeDescriptor::Boolean => {
            let data = ds.read_1d::<bool>()?;
            Ok((DataType::Bool, data.iter().map(|v| Value::Bool(*v)).collect()))
        }
        TypeDescriptor::VarLenUnicode => {
            let data = ds.read_1d::<VarLenUnicode>()?;
            Ok((
                DataType::Utf8,
                data.iter().map(|v| Value::Utf8(v.as_str().to_string())).collect(),
            ))
        }
        TypeDescriptor::VarLenAscii => {
            let data = ds.read_1d::<VarLenAscii>()?;
            Ok((
                DataType::Utf8,
                data.iter().map(|v| Value::Utf8(v.as_str().to_string())).collect(),
            ))
        }
        other => Err(PipelineError::Schema {
            message: format!("unsupported hdf5 column type {other:?} in '{name}'"),
        }),
    }
}

/// Write a [`Table`] as HDF5.
pub fn write_hdf_to_path(table: &Table, path: impl AsRef<Path>) -> PipelineResult<()> {
    let file = hdf5::File::create(path.as_ref())?;
    let group = file.create_group(GROUP)?;

    for (idx, field) in table.schema.fields.iter().enumerate() {
        let cells = table.rows.iter().map(|row| &row[idx]);
        let ds = match field.data_type {
            DataType::Int64 => {
                let mut values: Vec<i64> = Vec::with_capacity(table.row_count());
                for cell in cells {
                    match cell {
                        Value::Int64(v) => values.push(*v),
                        _ => return Err(null_in_column(&field.name, "integer")),
                    }
                }
                group.new_dataset_builder().with_data(&values).create(field.name.as_str())?
            }
            DataType::Bool => {
                let mut values: Vec<bool> = Vec::with_capacity(table.row_count());
                for cell in cells {
                    match cell {
                        Value::Bool(v) => values.push(*v),
                        _ => return Err(null_in_column(&field.name, "boolean")),
                    }
                }
                group.new_dataset_builder().with_data(&values).create(field.name.as_str())?
            }
            DataType::Float64 => {
                let values: Vec<f64> = cells
                    .map(|cell| match cell {
                        Value::Float64(v) => *v,
                        Value::Int64(v) => *v as f64,
                        _ => f64::NAN,
                    })
                    .collect();
                group.new_dataset_builder().with_data(&values).create(field.name.as_str())?
            }
            DataType::Utf8 => {
                let mut values: Vec<VarLenUnicode> = Vec::with_capacity(table.row_count());
                for cell in cells {
                    let s = match cell {
                        Value::Null => String::new(),
                        Value::Utf8(s) => s.clone(),
                        other => other.to_string(),
                    };
                    let v = VarLenUnicode::from_str(&s).map_err(|e| PipelineError::Schema {
                        message: format!("column '{}' not encodable as hdf5 string: {e}", field.name),
                    })?;
                    values.push(v);
                }
                group.new_dataset_builder().with_data(&values).create(field.name.as_str())?
            }
        };

        ds.new_attr::<u32>().create(INDEX_ATTR)?.write_scalar(&(idx as u32))?;
    }

    Ok(())
}

fn null_in_column(column: &str, kind: &str) -> PipelineError {
    PipelineError::UnsupportedOption {
        message: format!("hdf output cannot encode nulls in {kind} column '{column}'"),
    }
}
