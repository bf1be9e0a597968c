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

//! Batched inserts of columns.
//!
//! All rows of a write are copied into column-wise parameter arrays, bound
//! once and inserted with a single execution inside one transaction. A
//! failed execution is rolled back, and the autocommit mode the connection
//! had before the write is always restored.

use std::ffi::c_void;
use std::mem::size_of;

use arrow_array::RecordBatch;
use tracing::{debug, info, warn};

use odbc_bulk_core::columnar::{Column, ColumnValues};
use odbc_bulk_core::error::{Error, Result, Status};
use odbc_bulk_core::ffi::constants::{
    SQL_ATTR_PARAMSET_SIZE, SQL_ATTR_PARAM_BIND_TYPE, SQL_C_DOUBLE, SQL_C_SBIGINT, SQL_C_WCHAR,
    SQL_COMMIT, SQL_NTS, SQL_NULL_DATA, SQL_PARAM_BIND_BY_COLUMN, SQL_PARAM_INPUT, SQL_ROLLBACK,
};
use odbc_bulk_core::ffi::{
    OdbcApi, SQLHDBC, SQLLEN, SQLPOINTER, SQLSMALLINT, SQLULEN, SQLUSMALLINT, SQLWCHAR,
};
use odbc_bulk_core::interrupt::{self, Interrupt};
use odbc_bulk_core::schemas::{ColumnDescriptor, LogicalType};
use odbc_bulk_core::text::{encode_into, utf16_len};

use crate::connection::{autocommit, end_transaction, set_autocommit};
use crate::introspect::describe_table;
use crate::statement::Statement;

/// The columns of one write and how they map onto the target table.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteInput {
    /// Target column names, in the order of `columns`.
    pub column_names: Vec<String>,
    /// Logical type tag per column: `character`, `integer` or `numeric`.
    pub type_tags: Vec<String>,
    /// Maximum length in UTF-16 code units of the values of each string
    /// column. Ignored for other columns.
    pub varchar_lengths: Vec<usize>,
    pub row_count: usize,
    pub columns: Vec<Column>,
}

impl WriteInput {
    /// Describe `columns` by name, deriving type tags from the columns and
    /// varchar lengths from the longest value of each string column.
    pub fn from_columns(column_names: Vec<String>, columns: Vec<Column>) -> Self {
        let type_tags = columns
            .iter()
            .map(|c| c.logical_type().tag().to_string())
            .collect();
        let varchar_lengths = columns.iter().map(longest_value).collect();
        let row_count = columns.first().map(Column::len).unwrap_or(0);
        Self {
            column_names,
            type_tags,
            varchar_lengths,
            row_count,
            columns,
        }
    }

    /// Convert a record batch, one column per field.
    pub fn from_record_batch(batch: &RecordBatch) -> Result<Self> {
        let schema = batch.schema();
        let names = schema.fields().iter().map(|f| f.name().clone()).collect();
        let columns = batch
            .columns()
            .iter()
            .map(|array| Column::try_from_array(array.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let mut input = Self::from_columns(names, columns);
        input.row_count = batch.num_rows();
        Ok(input)
    }
}

fn longest_value(column: &Column) -> usize {
    match column.values() {
        ColumnValues::String(values) => values
            .iter()
            .zip(column.nulls())
            .filter(|(_, &null)| !null)
            .map(|(v, _)| utf16_len(v))
            .max()
            .unwrap_or(0)
            .max(1),
        _ => 0,
    }
}

fn arity(message: String) -> Error {
    Error::with_message_and_status(message, Status::Arity)
}

/// Check the shape of `input` and resolve its type tags.
fn validate(input: &WriteInput) -> Result<Vec<LogicalType>> {
    let count = input.column_names.len();
    if count == 0 {
        return Err(arity("no columns to write".to_string()));
    }
    if input.type_tags.len() != count {
        return Err(arity(format!(
            "{} type tags supplied for {count} columns",
            input.type_tags.len()
        )));
    }
    if input.varchar_lengths.len() != count {
        return Err(arity(format!(
            "{} varchar lengths supplied for {count} columns",
            input.varchar_lengths.len()
        )));
    }
    if input.columns.len() != count {
        return Err(arity(format!(
            "{} column vectors supplied for {count} columns",
            input.columns.len()
        )));
    }
    for (name, column) in input.column_names.iter().zip(&input.columns) {
        if column.len() != input.row_count {
            return Err(arity(format!(
                "column {name} has {} rows, expected {}",
                column.len(),
                input.row_count
            )));
        }
    }

    let mut types = Vec::with_capacity(count);
    for ((name, tag), column) in input
        .column_names
        .iter()
        .zip(&input.type_tags)
        .zip(&input.columns)
    {
        let logical: LogicalType = tag.parse()?;
        if logical != column.logical_type() {
            return Err(Error::with_message_and_status(
                format!(
                    "column {name} is tagged {logical} but holds {} values",
                    column.logical_type()
                ),
                Status::InvalidArguments,
            ));
        }
        types.push(logical);
    }
    Ok(types)
}

/// `INSERT INTO table(a, b) VALUES (?, ?)`.
fn insert_statement(table: &str, column_names: &[String]) -> String {
    let markers = vec!["?"; column_names.len()].join(", ");
    format!(
        "INSERT INTO {table}({}) VALUES ({markers})",
        column_names.join(", ")
    )
}

/// Column-wise parameter array of one column.
enum ParameterBuffer {
    /// NUL terminated UTF-16 cells of `stride` code units.
    Text { data: Vec<SQLWCHAR>, stride: usize },
    Integer(Vec<i64>),
    Numeric(Vec<f64>),
}

impl ParameterBuffer {
    fn allocate(logical: LogicalType, varchar_length: usize, rows: usize) -> Result<Self> {
        let buffer = match logical {
            LogicalType::String => {
                let stride = varchar_length + 1;
                let len = stride.checked_mul(rows).ok_or_else(|| {
                    Error::with_message_and_status(
                        format!("{rows} rows of length {varchar_length} are too large to bind"),
                        Status::InvalidArguments,
                    )
                })?;
                Self::Text {
                    data: vec![0; len],
                    stride,
                }
            }
            LogicalType::Integer => Self::Integer(vec![0; rows]),
            LogicalType::Numeric => Self::Numeric(vec![0.0; rows]),
        };
        Ok(buffer)
    }

    /// Copy `column` in, marking NULL cells in `indicators`.
    fn fill(&mut self, name: &str, column: &Column, indicators: &mut [SQLLEN]) -> Result<()> {
        let nulls = column.nulls();
        match (self, column.values()) {
            (Self::Text { data, stride }, ColumnValues::String(values)) => {
                for (row, value) in values.iter().enumerate() {
                    let cell = &mut data[row * *stride..(row + 1) * *stride];
                    if nulls[row] {
                        cell[0] = 0;
                        indicators[row] = SQL_NULL_DATA;
                        continue;
                    }
                    encode_into(value, cell).map_err(|error| {
                        Error::with_message_and_status(
                            format!("column {name}, row {row}: {}", error.message),
                            Status::InvalidArguments,
                        )
                    })?;
                    indicators[row] = SQL_NTS;
                }
            }
            (Self::Integer(data), ColumnValues::Integer(values)) => {
                data.copy_from_slice(values);
                for (indicator, &null) in indicators.iter_mut().zip(nulls) {
                    *indicator = if null { SQL_NULL_DATA } else { 0 };
                }
            }
            (Self::Numeric(data), ColumnValues::Numeric(values)) => {
                data.copy_from_slice(values);
                for (indicator, &null) in indicators.iter_mut().zip(nulls) {
                    *indicator = if null { SQL_NULL_DATA } else { 0 };
                }
            }
            _ => {
                return Err(Error::with_message_and_status(
                    format!("column {name} does not match its parameter buffer"),
                    Status::Internal,
                ))
            }
        }
        Ok(())
    }

    fn c_type(&self) -> SQLSMALLINT {
        match self {
            Self::Text { .. } => SQL_C_WCHAR,
            Self::Integer(_) => SQL_C_SBIGINT,
            Self::Numeric(_) => SQL_C_DOUBLE,
        }
    }

    /// Size in bytes of one element.
    fn element_size(&self) -> usize {
        match self {
            Self::Text { stride, .. } => stride * size_of::<SQLWCHAR>(),
            Self::Integer(_) => size_of::<i64>(),
            Self::Numeric(_) => size_of::<f64>(),
        }
    }

    fn as_mut_ptr(&mut self) -> SQLPOINTER {
        match self {
            Self::Text { data, .. } => data.as_mut_ptr() as *mut c_void,
            Self::Integer(v) => v.as_mut_ptr() as *mut c_void,
            Self::Numeric(v) => v.as_mut_ptr() as *mut c_void,
        }
    }
}

struct Parameter {
    buffer: ParameterBuffer,
    indicators: Vec<SQLLEN>,
    varchar_length: usize,
}

impl Parameter {
    /// `SQLBindParameter` column size: the target precision when the table
    /// has one, the declared length of text, zero otherwise.
    fn column_size(&self, target: &ColumnDescriptor) -> SQLULEN {
        if target.precision > 0 {
            target.precision as SQLULEN
        } else if let ParameterBuffer::Text { .. } = self.buffer {
            self.varchar_length.max(1) as SQLULEN
        } else {
            0
        }
    }
}

/// Insert every row of `input` into `table` with one batched execution.
///
/// Returns the number of rows inserted. Once the commit succeeds the write
/// is reported as successful, even if autocommit cannot be switched back
/// on afterwards.
pub(crate) fn write_table(
    api: &OdbcApi,
    dbc: SQLHDBC,
    table: &str,
    input: &WriteInput,
    interrupt: &dyn Interrupt,
) -> Result<usize> {
    let types = validate(input)?;
    let sql = insert_statement(table, &input.column_names);
    let rows = input.row_count;
    if rows == 0 {
        debug!(table, "nothing to write");
        return Ok(0);
    }

    let mut parameters = Vec::with_capacity(types.len());
    for (&logical, &varchar_length) in types.iter().zip(&input.varchar_lengths) {
        parameters.push(Parameter {
            indicators: vec![0; rows],
            buffer: ParameterBuffer::allocate(logical, varchar_length, rows)?,
            varchar_length,
        });
    }

    for ((parameter, column), name) in parameters
        .iter_mut()
        .zip(&input.columns)
        .zip(&input.column_names)
    {
        parameter
            .buffer
            .fill(name, column, &mut parameter.indicators)?;
        interrupt::poll(interrupt)?;
    }

    let targets = describe_table(api, dbc, table, input.column_names.len())?;

    let original = autocommit(api, dbc)?;
    set_autocommit(api, dbc, false)?;

    let outcome = match insert_batch(api, dbc, &sql, &mut parameters, &targets, rows) {
        Ok(()) => end_transaction(api, dbc, SQL_COMMIT),
        Err(error) => {
            warn!(table, error = %error.message, "insert failed, rolling back");
            match end_transaction(api, dbc, SQL_ROLLBACK) {
                Ok(()) => Err(error),
                Err(rollback) => Err(Error::rollback_failure(error, rollback)),
            }
        }
    };

    let restored = set_autocommit(api, dbc, original);
    match (outcome, restored) {
        (Ok(()), Ok(())) => {
            info!(table, rows, columns = parameters.len(), "write complete");
            Ok(rows)
        }
        (Ok(()), Err(error)) => {
            warn!(
                table,
                rows,
                error = %error.message,
                "committed, but failed to restore autocommit"
            );
            Ok(rows)
        }
        (Err(error), Ok(())) => Err(error),
        (Err(error), Err(restore)) => {
            warn!(error = %restore.message, "failed to restore autocommit");
            Err(error)
        }
    }
}

fn insert_batch(
    api: &OdbcApi,
    dbc: SQLHDBC,
    sql: &str,
    parameters: &mut [Parameter],
    targets: &[ColumnDescriptor],
    rows: usize,
) -> Result<()> {
    let statement = Statement::allocate(api, dbc)?;
    statement.prepare(sql)?;
    statement.set_ulen_attr(
        SQL_ATTR_PARAM_BIND_TYPE,
        SQL_PARAM_BIND_BY_COLUMN as SQLULEN,
        Status::Bind,
        "SQLSetStmtAttrW(SQL_ATTR_PARAM_BIND_TYPE)",
    )?;
    statement.set_ulen_attr(
        SQL_ATTR_PARAMSET_SIZE,
        rows as SQLULEN,
        Status::Bind,
        "SQLSetStmtAttrW(SQL_ATTR_PARAMSET_SIZE)",
    )?;

    for (index, (parameter, target)) in parameters.iter_mut().zip(targets).enumerate() {
        let column_size = parameter.column_size(target);
        debug!(
            column = %target.name,
            type_name = %target.type_name,
            column_size,
            scale = target.scale,
            "binding parameter"
        );
        let ret = unsafe {
            (api.SQLBindParameter)(
                statement.handle(),
                (index + 1) as SQLUSMALLINT,
                SQL_PARAM_INPUT,
                parameter.buffer.c_type(),
                target.concise_type,
                column_size,
                target.scale,
                parameter.buffer.as_mut_ptr(),
                parameter.buffer.element_size() as SQLLEN,
                parameter.indicators.as_mut_ptr(),
            )
        };
        statement.check(ret, Status::Bind, "SQLBindParameter")?;
    }

    statement.execute()?;
    Ok(())
}
