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

//! Chunked reads of query results into columns.
//!
//! A query is executed once, every result column is bound to a column-wise
//! buffer with room for one chunk of rows, and chunks are fetched until the
//! driver reports no more data. Each chunk is appended to one growing
//! [ReadResult].

use std::ffi::c_void;

use tracing::{debug, info, warn};

use odbc_bulk_core::columnar::{Column, ReadResult};
use odbc_bulk_core::error::{Error, Result, Status};
use odbc_bulk_core::ffi::constants::{
    SQL_ATTR_ROWS_FETCHED_PTR, SQL_ATTR_ROW_ARRAY_SIZE, SQL_ATTR_ROW_BIND_TYPE,
    SQL_ATTR_ROW_STATUS_PTR, SQL_BIND_BY_COLUMN, SQL_FETCH_NEXT, SQL_NO_DATA, SQL_NULL_DATA,
    SQL_ROW_SUCCESS, SQL_ROW_SUCCESS_WITH_INFO,
};
use odbc_bulk_core::ffi::{
    sql_succeeded, OdbcApi, SQLHDBC, SQLLEN, SQLPOINTER, SQLULEN, SQLUSMALLINT, SQLWCHAR,
};
use odbc_bulk_core::interrupt::{self, Interrupt};
use odbc_bulk_core::schemas::{ColumnDescriptor, ReadBinding};
use odbc_bulk_core::text::decode_cell;

use crate::introspect::describe_result;
use crate::statement::Statement;

/// Receiving memory of one result column, `chunk_size` rows long.
enum ReadBuffer {
    Text { data: Vec<SQLWCHAR>, width: usize },
    Integer(Vec<i32>),
    SmallInt(Vec<i16>),
    BigInt(Vec<i64>),
    Double(Vec<f64>),
}

impl ReadBuffer {
    fn allocate(binding: ReadBinding, rows: usize) -> Result<Self> {
        let buffer = match binding {
            ReadBinding::Text { width } => {
                let len = width.checked_mul(rows).ok_or_else(|| {
                    Error::with_message_and_status(
                        format!("a chunk of {rows} rows of width {width} is too large"),
                        Status::InvalidArguments,
                    )
                })?;
                Self::Text {
                    data: vec![0; len],
                    width,
                }
            }
            ReadBinding::Integer => Self::Integer(vec![0; rows]),
            ReadBinding::SmallInt => Self::SmallInt(vec![0; rows]),
            ReadBinding::BigInt => Self::BigInt(vec![0; rows]),
            ReadBinding::Double => Self::Double(vec![0.0; rows]),
        };
        Ok(buffer)
    }

    fn as_mut_ptr(&mut self) -> SQLPOINTER {
        match self {
            Self::Text { data, .. } => data.as_mut_ptr() as *mut c_void,
            Self::Integer(v) => v.as_mut_ptr() as *mut c_void,
            Self::SmallInt(v) => v.as_mut_ptr() as *mut c_void,
            Self::BigInt(v) => v.as_mut_ptr() as *mut c_void,
            Self::Double(v) => v.as_mut_ptr() as *mut c_void,
        }
    }
}

struct BoundColumn {
    name: String,
    binding: ReadBinding,
    buffer: ReadBuffer,
    indicators: Vec<SQLLEN>,
}

impl BoundColumn {
    fn new(descriptor: &ColumnDescriptor, rows: usize) -> Result<Self> {
        let binding = ReadBinding::for_column(descriptor)?;
        debug!(
            column = %descriptor.name,
            type_name = %descriptor.type_name,
            concise_type = descriptor.concise_type,
            ?binding,
            "binding result column"
        );
        Ok(Self {
            name: descriptor.name.clone(),
            binding,
            buffer: ReadBuffer::allocate(binding, rows)?,
            indicators: vec![0; rows],
        })
    }

    fn bind(&mut self, statement: &Statement<'_>, position: SQLUSMALLINT) -> Result<()> {
        let ret = unsafe {
            (statement.api().SQLBindCol)(
                statement.handle(),
                position,
                self.binding.c_type(),
                self.buffer.as_mut_ptr(),
                self.binding.element_size() as SQLLEN,
                self.indicators.as_mut_ptr(),
            )
        };
        statement.check(ret, Status::Bind, "SQLBindCol")
    }

    /// Append the first `rows` fetched cells to `column`.
    fn append_to(&self, column: &mut Column, rows: usize, first_row: usize) -> Result<()> {
        for row in 0..rows {
            let indicator = self.indicators[row];
            if indicator == SQL_NULL_DATA {
                column.push_null();
                continue;
            }
            match &self.buffer {
                ReadBuffer::Text { data, width } => {
                    let cell = &data[row * width..(row + 1) * width];
                    let decoded = decode_cell(cell, indicator)?;
                    if decoded.truncated {
                        warn!(
                            column = %self.name,
                            row = first_row + row,
                            width,
                            "text value truncated to the column width"
                        );
                    }
                    column.push_string(decoded.value)?;
                }
                ReadBuffer::Integer(v) => column.push_integer(i64::from(v[row]))?,
                ReadBuffer::SmallInt(v) => column.push_integer(i64::from(v[row]))?,
                ReadBuffer::BigInt(v) => column.push_numeric(v[row] as f64)?,
                ReadBuffer::Double(v) => column.push_numeric(v[row])?,
            }
        }
        Ok(())
    }
}

/// Execute `sql` and read its whole result, `chunk_size` rows per fetch.
///
/// `interrupt` is polled after every fetched chunk.
pub(crate) fn read_query(
    api: &OdbcApi,
    dbc: SQLHDBC,
    sql: &str,
    chunk_size: usize,
    interrupt: &dyn Interrupt,
) -> Result<ReadResult> {
    if chunk_size == 0 {
        return Err(Error::with_message_and_status(
            "chunk size must be at least 1",
            Status::InvalidArguments,
        ));
    }

    let statement = Statement::allocate(api, dbc)?;
    statement.set_ulen_attr(
        SQL_ATTR_ROW_ARRAY_SIZE,
        chunk_size as SQLULEN,
        Status::Exec,
        "SQLSetStmtAttrW(SQL_ATTR_ROW_ARRAY_SIZE)",
    )?;
    statement.exec_direct(sql)?;

    let descriptors = describe_result(&statement)?;
    if descriptors.is_empty() {
        debug!("statement produced no result columns");
        return ReadResult::new(descriptors);
    }

    let mut bound = descriptors
        .iter()
        .map(|descriptor| BoundColumn::new(descriptor, chunk_size))
        .collect::<Result<Vec<_>>>()?;
    for (index, column) in bound.iter_mut().enumerate() {
        column.bind(&statement, (index + 1) as SQLUSMALLINT)?;
    }

    let mut rows_fetched: Box<SQLULEN> = Box::new(0);
    let mut row_status: Vec<SQLUSMALLINT> = vec![0; chunk_size];
    statement.set_ulen_attr(
        SQL_ATTR_ROW_BIND_TYPE,
        SQL_BIND_BY_COLUMN as SQLULEN,
        Status::Bind,
        "SQLSetStmtAttrW(SQL_ATTR_ROW_BIND_TYPE)",
    )?;
    statement.set_pointer_attr(
        SQL_ATTR_ROWS_FETCHED_PTR,
        (&mut *rows_fetched as *mut SQLULEN).cast(),
        Status::Bind,
        "SQLSetStmtAttrW(SQL_ATTR_ROWS_FETCHED_PTR)",
    )?;
    statement.set_pointer_attr(
        SQL_ATTR_ROW_STATUS_PTR,
        row_status.as_mut_ptr().cast(),
        Status::Bind,
        "SQLSetStmtAttrW(SQL_ATTR_ROW_STATUS_PTR)",
    )?;

    let mut result = ReadResult::new(descriptors)?;
    let mut total = 0usize;
    let mut chunks = 0usize;
    loop {
        let ret = unsafe { (api.SQLFetchScroll)(statement.handle(), SQL_FETCH_NEXT, 0) };
        if ret == SQL_NO_DATA {
            break;
        }
        if !sql_succeeded(ret) {
            return Err(statement.error(ret, Status::Fetch, "SQLFetchScroll"));
        }

        let fetched = (*rows_fetched).min(chunk_size);
        if fetched == 0 {
            break;
        }
        chunks += 1;
        debug!(chunk = chunks, rows = fetched, "fetched chunk");

        interrupt::poll(interrupt)?;

        if let Some(row) = row_status[..fetched]
            .iter()
            .position(|&s| s != SQL_ROW_SUCCESS && s != SQL_ROW_SUCCESS_WITH_INFO)
        {
            return Err(Error::with_message_and_status(
                format!(
                    "row {} has fetch status {}",
                    total + row,
                    row_status[row]
                ),
                Status::Fetch,
            ));
        }

        for (column, target) in bound.iter().zip(result.columns_mut()) {
            column.append_to(target, fetched, total)?;
        }
        total += fetched;
    }

    info!(rows = total, columns = result.num_columns(), chunks, "read complete");
    Ok(result)
}
