// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Block cursors: moving rows into column-wise bound buffers.

use std::mem::size_of;

use odbc_bulk_core::error::DiagnosticRecord;
use odbc_bulk_core::ffi::constants::*;
use odbc_bulk_core::ffi::{SQLLEN, SQLRETURN, SQLUSMALLINT, SQLWCHAR};

use crate::handle::{BoundColumn, Statement};
use crate::storage::{diag, Faults, Value};

fn to_integer(value: &Value) -> Result<i64, DiagnosticRecord> {
    match value {
        Value::Integer(i) => Ok(*i),
        Value::Double(f) => Ok(f.trunc() as i64),
        Value::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| diag("22018", -420, format!("'{s}' is not an integer"))),
        Value::Null => Ok(0),
    }
}

fn to_double(value: &Value) -> Result<f64, DiagnosticRecord> {
    match value {
        Value::Integer(i) => Ok(*i as f64),
        Value::Double(f) => Ok(*f),
        Value::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| diag("22018", -420, format!("'{s}' is not a number"))),
        Value::Null => Ok(0.0),
    }
}

fn out_of_range() -> DiagnosticRecord {
    diag("22003", -406, "value out of range for the bound C type")
}

/// Write `value` into row `row` of a column-wise bound buffer.
///
/// Returns whether the value was truncated.
///
/// # Safety
///
/// The buffers of `column` must hold at least `row + 1` elements.
pub unsafe fn write_cell(
    column: &BoundColumn,
    row: usize,
    value: &Value,
) -> Result<bool, DiagnosticRecord> {
    let indicator = if column.indicators.is_null() {
        None
    } else {
        Some(column.indicators.add(row))
    };

    if value.is_null() {
        return match indicator {
            Some(ptr) => {
                *ptr = SQL_NULL_DATA;
                Ok(false)
            }
            None => Err(diag("22002", -305, "NULL value without an indicator")),
        };
    }

    let (length, truncated) = match column.c_type {
        SQL_C_WCHAR => {
            let units = column.buffer_length.max(0) as usize / size_of::<SQLWCHAR>();
            let text: Vec<SQLWCHAR> = value.render().unwrap_or_default().encode_utf16().collect();
            if units > 0 {
                let cell = (column.buffer as *mut SQLWCHAR).add(row * units);
                let copied = text.len().min(units - 1);
                std::ptr::copy_nonoverlapping(text.as_ptr(), cell, copied);
                *cell.add(copied) = 0;
            }
            (
                (text.len() * size_of::<SQLWCHAR>()) as SQLLEN,
                text.len() + 1 > units,
            )
        }
        SQL_C_LONG => {
            let v = i32::try_from(to_integer(value)?).map_err(|_| out_of_range())?;
            *(column.buffer as *mut i32).add(row) = v;
            (size_of::<i32>() as SQLLEN, false)
        }
        SQL_C_SHORT => {
            let v = i16::try_from(to_integer(value)?).map_err(|_| out_of_range())?;
            *(column.buffer as *mut i16).add(row) = v;
            (size_of::<i16>() as SQLLEN, false)
        }
        SQL_C_SBIGINT => {
            *(column.buffer as *mut i64).add(row) = to_integer(value)?;
            (size_of::<i64>() as SQLLEN, false)
        }
        SQL_C_DOUBLE => {
            *(column.buffer as *mut f64).add(row) = to_double(value)?;
            (size_of::<f64>() as SQLLEN, false)
        }
        other => {
            return Err(diag(
                "HY003",
                0,
                format!("unsupported target C type {other}"),
            ))
        }
    };
    if let Some(ptr) = indicator {
        *ptr = length;
    }
    Ok(truncated)
}

/// `SQLFetchScroll(SQL_FETCH_NEXT)` over the open cursor of `statement`.
///
/// # Safety
///
/// Every buffer bound to `statement` must hold `row_array_size` elements.
pub unsafe fn fetch(statement: &mut Statement, faults: &Faults) -> SQLRETURN {
    let Some(result) = statement.result.as_mut() else {
        statement
            .diagnostics
            .push(diag("24000", -501, "no open cursor"));
        return SQL_ERROR;
    };

    let capacity = statement.row_array_size.max(1);
    let available = result.rows.len() - result.position;
    let fetched = capacity.min(available);
    if !statement.rows_fetched.is_null() {
        *statement.rows_fetched = fetched;
    }
    if fetched == 0 {
        return SQL_NO_DATA;
    }

    let mut ret = SQL_SUCCESS;
    for offset in 0..capacity {
        let mut status = SQL_ROW_NOROW;
        if offset < fetched {
            status = SQL_ROW_SUCCESS;
            let index = result.position + offset;
            let row = &result.rows[index];
            if faults.row_error_at == Some(index) {
                status = SQL_ROW_ERROR;
                statement
                    .diagnostics
                    .push(diag("22012", -802, format!("error evaluating row {index}")));
            } else {
                for (&number, column) in &statement.columns {
                    let Some(value) = row.get(number as usize - 1) else {
                        continue;
                    };
                    match write_cell(column, offset, value) {
                        Ok(false) => {}
                        Ok(true) => {
                            status = SQL_ROW_SUCCESS_WITH_INFO;
                            statement.diagnostics.push(diag(
                                "01004",
                                0,
                                "string data, right truncated",
                            ));
                        }
                        Err(record) => {
                            status = SQL_ROW_ERROR;
                            statement.diagnostics.push(record);
                        }
                    }
                }
            }
        }
        if status != SQL_ROW_SUCCESS && status != SQL_ROW_NOROW {
            ret = SQL_SUCCESS_WITH_INFO;
        }
        if !statement.row_status.is_null() {
            *statement.row_status.add(offset) = status as SQLUSMALLINT;
        }
    }

    result.position += fetched;
    ret
}
