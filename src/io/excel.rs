#![cfg(feature = "excel")]

//! Spreadsheet reading (calamine) and writing (rust_xlsxwriter).

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::Workbook;

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataType, Field, Schema, Table, Value};

/// Read a spreadsheet (`.xlsx`, `.xls`) into an in-memory [`Table`].
///
/// Behavior:
/// - Picks `sheet_name` if provided; otherwise uses the first sheet in the workbook
/// - Detects the first non-empty row as the header row
/// - Infers column types from the cells below the header
pub fn read_excel_from_path(
    path: impl AsRef<Path>,
    sheet_name: Option<&str>,
) -> PipelineResult<Table> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet = match sheet_name {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| PipelineError::Schema {
                message: "workbook has no sheets".to_string(),
            })?,
    };

    let range = workbook.worksheet_range(&sheet)?;
    read_sheet_range(&range)
}

fn read_sheet_range(range: &calamine::Range<Data>) -> PipelineResult<Table> {
    let mut header_row_idx: Option<usize> = None;
    let mut headers: Vec<String> = Vec::new();

    for (idx0, row) in range.rows().enumerate() {
        if row.iter().any(|c| !matches!(c, Data::Empty)) {
            header_row_idx = Some(idx0);
            headers = row.iter().map(cell_to_header_string).collect();
            break;
        }
    }

    let header_row_idx = header_row_idx.ok_or_else(|| PipelineError::Schema {
        message: "sheet has no non-empty rows (no header row found)".to_string(),
    })?;

    let body: Vec<&[Data]> = range.rows().skip(header_row_idx + 1).collect();

    let mut fields = Vec::with_capacity(headers.len());
    for (col_idx, name) in headers.iter().enumerate() {
        let cells = body.iter().map(|row| row.get(col_idx).unwrap_or(&Data::Empty));
        fields.push(Field::new(name.trim(), infer_column_type(cells)));
    }
    let schema = Schema::new(fields);

    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(body.len());
    for (idx0, row) in body.iter().enumerate() {
        // Report 1-based row number (Excel-like), counting from the sheet top.
        let user_row = header_row_idx + idx0 + 2;

        let mut out_row: Vec<Value> = Vec::with_capacity(schema.fields.len());
        for (col_idx, field) in schema.fields.iter().enumerate() {
            let cell = row.get(col_idx).unwrap_or(&Data::Empty);
            out_row.push(convert_cell(user_row, &field.name, &field.data_type, cell)?);
        }
        rows.push(out_row);
    }

    Ok(Table::new(schema, rows))
}

fn infer_column_type<'a>(cells: impl Iterator<Item = &'a Data>) -> DataType {
    let mut saw_value = false;
    let mut all_int = true;
    let mut all_number = true;
    let mut all_bool = true;

    for cell in cells {
        if matches!(cell, Data::Empty) {
            continue;
        }
        saw_value = true;
        if all_int && !matches!(cell, Data::Int(_)) {
            all_int = false;
        }
        if all_number && !matches!(cell, Data::Int(_) | Data::Float(_)) {
            all_number = false;
        }
        if all_bool && !matches!(cell, Data::Bool(_)) {
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

fn cell_to_header_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(f) => f.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
        Data::Empty => String::new(),
    }
}

fn convert_cell(row: usize, column: &str, data_type: &DataType, c: &Data) -> PipelineResult<Value> {
    if matches!(c, Data::Empty) {
        return Ok(Value::Null);
    }

    match data_type {
        DataType::Utf8 => Ok(Value::Utf8(cell_to_string(c))),
        DataType::Bool => match c {
            Data::Bool(b) => Ok(Value::Bool(*b)),
            _ => Err(parse_err(row, column, c, "expected bool")),
        },
        DataType::Int64 => match c {
            Data::Int(i) => Ok(Value::Int64(*i)),
            _ => Err(parse_err(row, column, c, "expected integer")),
        },
        DataType::Float64 => match c {
            Data::Float(f) => Ok(Value::Float64(*f)),
            Data::Int(i) => Ok(Value::Float64(*i as f64)),
            _ => Err(parse_err(row, column, c, "expected number")),
        },
    }
}

fn cell_to_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        _ => c.to_string(),
    }
}

fn parse_err(row: usize, column: &str, c: &Data, message: &str) -> PipelineError {
    PipelineError::Parse {
        row,
        column: column.to_string(),
        raw: c.to_string(),
        message: message.to_string(),
    }
}

/// Write a [`Table`] as an `.xlsx` workbook with a single sheet.
///
/// Integer values pass through Excel's native f64 cell type; nulls become empty cells.
pub fn write_excel_to_path(table: &Table, path: impl AsRef<Path>) -> PipelineResult<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col_idx, name) in table.schema.field_names().enumerate() {
        worksheet.write_string(0, col_idx as u16, name)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let out_row = (row_idx + 1) as u32;
        for (col_idx, value) in row.iter().enumerate() {
            let col = col_idx as u16;
            match value {
                Value::Null => {}
                Value::Int64(v) => {
                    worksheet.write_number(out_row, col, *v as f64)?;
                }
                Value::Float64(v) => {
                    worksheet.write_number(out_row, col, *v)?;
                }
                Value::Bool(v) => {
                    worksheet.write_boolean(out_row, col, *v)?;
                }
                Value::Utf8(s) => {
                    worksheet.write_string(out_row, col, s.as_str())?;
                }
            }
        }
    }

    workbook.save(path.as_ref())?;
    Ok(())
}
