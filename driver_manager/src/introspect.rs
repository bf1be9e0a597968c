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

//! Column metadata of executed statements and of live tables.

use std::mem::size_of;
use std::ptr::null_mut;

use tracing::debug;

use odbc_bulk_core::error::{Error, Result, Status};
use odbc_bulk_core::ffi::constants::{
    SQL_DECFLOAT, SQL_DECIMAL, SQL_DESC_CONCISE_TYPE, SQL_DESC_DISPLAY_SIZE, SQL_DESC_NAME,
    SQL_DESC_PRECISION, SQL_DESC_SCALE, SQL_DESC_TYPE_NAME, SQL_NUMERIC, SQL_SUCCESS_WITH_INFO,
};
use odbc_bulk_core::ffi::{OdbcApi, SQLHDBC, SQLLEN, SQLSMALLINT, SQLUSMALLINT, SQLWCHAR};
use odbc_bulk_core::schemas::ColumnDescriptor;
use odbc_bulk_core::text::from_utf16_nul;

use crate::statement::Statement;

const NAME_CAPACITY: usize = 256;

fn string_attribute(
    statement: &Statement<'_>,
    column: SQLUSMALLINT,
    field: SQLUSMALLINT,
    context: &str,
) -> Result<String> {
    let mut capacity = NAME_CAPACITY;
    loop {
        let mut buffer: Vec<SQLWCHAR> = vec![0; capacity];
        let mut length: SQLSMALLINT = 0;
        let buffer_bytes = (capacity * size_of::<SQLWCHAR>()).min(SQLSMALLINT::MAX as usize);
        let ret = unsafe {
            (statement.api().SQLColAttributeW)(
                statement.handle(),
                column,
                field,
                buffer.as_mut_ptr().cast(),
                buffer_bytes as SQLSMALLINT,
                &mut length,
                null_mut(),
            )
        };
        statement.check(ret, Status::Schema, context)?;

        // `length` is in bytes and excludes the terminator.
        let needed = length.max(0) as usize / size_of::<SQLWCHAR>() + 1;
        if ret == SQL_SUCCESS_WITH_INFO
            && needed > capacity
            && capacity * size_of::<SQLWCHAR>() < SQLSMALLINT::MAX as usize
        {
            capacity = needed;
            continue;
        }
        return from_utf16_nul(&buffer).map_err(|error| {
            Error::with_message_and_status(format!("{context}: {}", error.message), Status::Schema)
        });
    }
}

fn numeric_attribute(
    statement: &Statement<'_>,
    column: SQLUSMALLINT,
    field: SQLUSMALLINT,
    context: &str,
) -> Result<SQLLEN> {
    let mut value: SQLLEN = 0;
    let ret = unsafe {
        (statement.api().SQLColAttributeW)(
            statement.handle(),
            column,
            field,
            null_mut(),
            0,
            null_mut(),
            &mut value,
        )
    };
    statement.check(ret, Status::Schema, context)?;
    Ok(value)
}

fn is_decimal(concise_type: SQLSMALLINT) -> bool {
    matches!(concise_type, SQL_DECIMAL | SQL_NUMERIC | SQL_DECFLOAT)
}

fn describe_column(statement: &Statement<'_>, index: usize) -> Result<ColumnDescriptor> {
    let column = SQLUSMALLINT::try_from(index + 1).map_err(|_| {
        Error::with_message_and_status(
            format!("result column {} is out of range", index + 1),
            Status::Schema,
        )
    })?;

    let name = string_attribute(statement, column, SQL_DESC_NAME, "SQLColAttributeW(NAME)")?;
    let type_name = string_attribute(
        statement,
        column,
        SQL_DESC_TYPE_NAME,
        "SQLColAttributeW(TYPE_NAME)",
    )?;
    let concise_type = numeric_attribute(
        statement,
        column,
        SQL_DESC_CONCISE_TYPE,
        "SQLColAttributeW(CONCISE_TYPE)",
    )? as SQLSMALLINT;
    let display_size = numeric_attribute(
        statement,
        column,
        SQL_DESC_DISPLAY_SIZE,
        "SQLColAttributeW(DISPLAY_SIZE)",
    )?;
    let precision = numeric_attribute(
        statement,
        column,
        SQL_DESC_PRECISION,
        "SQLColAttributeW(PRECISION)",
    )?;
    let scale = numeric_attribute(statement, column, SQL_DESC_SCALE, "SQLColAttributeW(SCALE)")?;

    Ok(ColumnDescriptor {
        name,
        type_name,
        concise_type,
        display_size: display_size.max(0) as usize,
        precision: precision.max(0) as usize,
        scale: scale as SQLSMALLINT,
    })
}

/// Describe every column of the result of an executed statement.
///
/// Either all descriptors are returned or the first failing metadata call
/// is reported as a [Status::Schema] error.
pub(crate) fn describe_result(statement: &Statement<'_>) -> Result<Vec<ColumnDescriptor>> {
    let count = statement.num_result_cols()?;
    (0..count)
        .map(|index| describe_column(statement, index))
        .collect()
}

/// Describe the live columns of `table` with a one-row probe.
///
/// Only the name, the types, and the precision and scale of decimal columns
/// are read. Fails with [Status::Schema] if the table does not have exactly
/// `expected` columns.
pub(crate) fn describe_table(
    api: &OdbcApi,
    dbc: SQLHDBC,
    table: &str,
    expected: usize,
) -> Result<Vec<ColumnDescriptor>> {
    let statement =
        Statement::allocate(api, dbc).map_err(|error| error.with_status(Status::Schema))?;
    let sql = format!("SELECT * FROM {table} FETCH FIRST 1 ROWS ONLY");
    statement
        .exec_direct(&sql)
        .map_err(|error| error.with_status(Status::Schema))?;

    let count = statement.num_result_cols()?;
    if count != expected {
        return Err(Error::with_message_and_status(
            format!("table {table} has {count} columns, but {expected} were supplied"),
            Status::Schema,
        ));
    }

    let mut columns = Vec::with_capacity(count);
    for index in 0..count {
        let column = (index + 1) as SQLUSMALLINT;
        let name = string_attribute(&statement, column, SQL_DESC_NAME, "SQLColAttributeW(NAME)")?;
        let type_name = string_attribute(
            &statement,
            column,
            SQL_DESC_TYPE_NAME,
            "SQLColAttributeW(TYPE_NAME)",
        )?;
        let concise_type = numeric_attribute(
            &statement,
            column,
            SQL_DESC_CONCISE_TYPE,
            "SQLColAttributeW(CONCISE_TYPE)",
        )? as SQLSMALLINT;
        let (precision, scale) = if is_decimal(concise_type) {
            (
                numeric_attribute(
                    &statement,
                    column,
                    SQL_DESC_PRECISION,
                    "SQLColAttributeW(PRECISION)",
                )?,
                numeric_attribute(&statement, column, SQL_DESC_SCALE, "SQLColAttributeW(SCALE)")?,
            )
        } else {
            (0, 0)
        };
        columns.push(ColumnDescriptor {
            name,
            type_name,
            concise_type,
            display_size: 0,
            precision: precision.max(0) as usize,
            scale: scale as SQLSMALLINT,
        });
    }

    debug!(table, columns = columns.len(), "described table");
    Ok(columns)
}

