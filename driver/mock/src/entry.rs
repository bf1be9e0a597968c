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

//! The `extern "system"` functions handed out through [crate::api].
//!
//! Handles are boxed environments, connections and statements. Every call
//! except `SQLGetDiagRecW` first clears the diagnostics of the handle it
//! acts on.

use std::mem::size_of;
use std::ptr::copy_nonoverlapping;
use std::slice;

use tracing::debug;

use odbc_bulk_core::error::DiagnosticRecord;
use odbc_bulk_core::ffi::constants::*;
use odbc_bulk_core::ffi::{
    SQLHANDLE, SQLHDBC, SQLHENV, SQLHSTMT, SQLHWND, SQLINTEGER, SQLLEN, SQLPOINTER, SQLRETURN,
    SQLSMALLINT, SQLULEN, SQLUSMALLINT, SQLWCHAR,
};

use crate::execute::execute_statement;
use crate::fetch::fetch;
use crate::handle::{BoundColumn, BoundParameter, Connection, Environment, Statement};
use crate::sql::parse;
use crate::storage::{databases, diag};

fn fail(diagnostics: &mut Vec<DiagnosticRecord>, record: DiagnosticRecord) -> SQLRETURN {
    diagnostics.push(record);
    SQL_ERROR
}

unsafe fn env_mut<'a>(handle: SQLHANDLE) -> Option<&'a mut Environment> {
    (handle as *mut Environment).as_mut()
}

unsafe fn dbc_mut<'a>(handle: SQLHANDLE) -> Option<&'a mut Connection> {
    (handle as *mut Connection).as_mut()
}

unsafe fn stmt_mut<'a>(handle: SQLHANDLE) -> Option<&'a mut Statement> {
    (handle as *mut Statement).as_mut()
}

macro_rules! handle_or_invalid {
    ($lookup:ident, $handle:expr) => {
        match $lookup($handle) {
            Some(handle) => {
                handle.diagnostics.clear();
                handle
            }
            None => return SQL_INVALID_HANDLE,
        }
    };
}

/// Decode a wide string argument given with a length in characters or
/// `SQL_NTS`.
unsafe fn wide_argument(text: *const SQLWCHAR, length: SQLLEN) -> Result<String, DiagnosticRecord> {
    if text.is_null() {
        return Err(diag("HY009", 0, "invalid use of null pointer"));
    }
    let length = if length == SQL_NTS {
        let mut n = 0;
        while *text.add(n) != 0 {
            n += 1;
        }
        n
    } else if length < 0 {
        return Err(diag("HY090", 0, "invalid string or buffer length"));
    } else {
        length as usize
    };
    String::from_utf16(slice::from_raw_parts(text, length))
        .map_err(|_| diag("22021", -330, "argument is not valid UTF-16"))
}

/// Copy `text` into a wide buffer of `capacity` characters, NUL
/// terminated. Returns the full length in characters and whether it was
/// truncated.
unsafe fn write_wide(text: &str, buffer: *mut SQLWCHAR, capacity: usize) -> (usize, bool) {
    let units: Vec<SQLWCHAR> = text.encode_utf16().collect();
    if !buffer.is_null() && capacity > 0 {
        let copied = units.len().min(capacity - 1);
        copy_nonoverlapping(units.as_ptr(), buffer, copied);
        *buffer.add(copied) = 0;
    }
    (units.len(), units.len() + 1 > capacity)
}

/// Put the tables of `database` back the way `snapshot` recorded them.
fn restore(connection: &mut Connection) {
    if let (Some(name), Some(tables)) = (connection.database.as_deref(), connection.snapshot.take()) {
        databases().get(name).tables = tables;
    }
}

pub unsafe extern "system" fn alloc_handle(
    handle_type: SQLSMALLINT,
    input: SQLHANDLE,
    output: *mut SQLHANDLE,
) -> SQLRETURN {
    if output.is_null() {
        return SQL_ERROR;
    }
    match handle_type {
        SQL_HANDLE_ENV => {
            let env = Box::new(Environment {
                odbc_version: 0,
                diagnostics: Vec::new(),
            });
            *output = Box::into_raw(env).cast();
            SQL_SUCCESS
        }
        SQL_HANDLE_DBC => {
            let env = handle_or_invalid!(env_mut, input);
            if env.odbc_version == 0 {
                return fail(
                    &mut env.diagnostics,
                    diag("HY010", 0, "SQL_ATTR_ODBC_VERSION is not set"),
                );
            }
            let dbc = Box::new(Connection::default());
            *output = Box::into_raw(dbc).cast();
            SQL_SUCCESS
        }
        SQL_HANDLE_STMT => {
            let dbc = handle_or_invalid!(dbc_mut, input);
            let Some(name) = dbc.database.clone() else {
                return fail(&mut dbc.diagnostics, diag("08003", 0, "connection not open"));
            };
            if databases().get(&name).faults.fail_statement_alloc {
                return fail(
                    &mut dbc.diagnostics,
                    diag("HY014", -1225, "limit on the number of handles exceeded"),
                );
            }
            databases().get(&name).open_statements += 1;
            let statement = Box::new(Statement::new(dbc, name));
            *output = Box::into_raw(statement).cast();
            SQL_SUCCESS
        }
        _ => SQL_ERROR,
    }
}

pub unsafe extern "system" fn free_handle(handle_type: SQLSMALLINT, handle: SQLHANDLE) -> SQLRETURN {
    if handle.is_null() {
        return SQL_INVALID_HANDLE;
    }
    match handle_type {
        SQL_HANDLE_ENV => drop(Box::from_raw(handle as *mut Environment)),
        SQL_HANDLE_DBC => {
            let mut dbc = Box::from_raw(handle as *mut Connection);
            restore(&mut dbc);
        }
        SQL_HANDLE_STMT => {
            let statement = Box::from_raw(handle as *mut Statement);
            let mut registry = databases();
            let database = registry.get(&statement.database);
            database.open_statements = database.open_statements.saturating_sub(1);
        }
        _ => return SQL_ERROR,
    }
    SQL_SUCCESS
}

pub unsafe extern "system" fn set_env_attr(
    env: SQLHENV,
    attribute: SQLINTEGER,
    value: SQLPOINTER,
    _length: SQLINTEGER,
) -> SQLRETURN {
    let env = handle_or_invalid!(env_mut, env);
    match attribute {
        SQL_ATTR_ODBC_VERSION => {
            env.odbc_version = value as usize as u32;
            SQL_SUCCESS
        }
        other => fail(
            &mut env.diagnostics,
            diag("HY092", 0, format!("unsupported environment attribute {other}")),
        ),
    }
}

pub unsafe extern "system" fn set_connect_attr(
    dbc: SQLHDBC,
    attribute: SQLINTEGER,
    value: SQLPOINTER,
    _length: SQLINTEGER,
) -> SQLRETURN {
    let dbc = handle_or_invalid!(dbc_mut, dbc);
    let value = value as usize as u32;
    match attribute {
        SQL_ATTR_AUTOCOMMIT => {
            let enable = value != SQL_AUTOCOMMIT_OFF;
            let refused = enable
                && dbc
                    .database
                    .as_deref()
                    .is_some_and(|name| databases().get(name).faults.fail_autocommit_on);
            if refused {
                return fail(
                    &mut dbc.diagnostics,
                    diag("08S01", -30081, "communication link failure"),
                );
            }
            // Switching autocommit back on commits the open transaction.
            if enable {
                dbc.snapshot = None;
            }
            dbc.autocommit = enable;
        }
        SQL_ATTR_LOGIN_TIMEOUT => dbc.login_timeout = value,
        SQL_ATTR_CONNECTION_TIMEOUT => dbc.connection_timeout = value,
        other => {
            return fail(
                &mut dbc.diagnostics,
                diag("HY092", 0, format!("unsupported connection attribute {other}")),
            )
        }
    }
    SQL_SUCCESS
}

pub unsafe extern "system" fn get_connect_attr(
    dbc: SQLHDBC,
    attribute: SQLINTEGER,
    value: SQLPOINTER,
    _buffer_length: SQLINTEGER,
    _string_length: *mut SQLINTEGER,
) -> SQLRETURN {
    let dbc = handle_or_invalid!(dbc_mut, dbc);
    if value.is_null() {
        return fail(&mut dbc.diagnostics, diag("HY009", 0, "invalid use of null pointer"));
    }
    match attribute {
        SQL_ATTR_AUTOCOMMIT => {
            *(value as *mut u32) = if dbc.autocommit {
                SQL_AUTOCOMMIT_ON
            } else {
                SQL_AUTOCOMMIT_OFF
            };
            SQL_SUCCESS
        }
        other => fail(
            &mut dbc.diagnostics,
            diag("HY092", 0, format!("unsupported connection attribute {other}")),
        ),
    }
}

/// The value of `key` in a `KEY=VALUE;...` connection string.
fn connection_attribute(connection_string: &str, key: &str) -> Option<String> {
    connection_string
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case(key))
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[allow(clippy::too_many_arguments)]
pub unsafe extern "system" fn driver_connect(
    dbc: SQLHDBC,
    _window: SQLHWND,
    in_string: *const SQLWCHAR,
    in_length: SQLSMALLINT,
    out_string: *mut SQLWCHAR,
    out_capacity: SQLSMALLINT,
    out_length: *mut SQLSMALLINT,
    _completion: SQLUSMALLINT,
) -> SQLRETURN {
    let dbc = handle_or_invalid!(dbc_mut, dbc);
    if dbc.database.is_some() {
        return fail(&mut dbc.diagnostics, diag("08002", 0, "connection name in use"));
    }
    let connection_string = match wide_argument(in_string, in_length as SQLLEN) {
        Ok(text) => text,
        Err(record) => return fail(&mut dbc.diagnostics, record),
    };
    let Some(name) = connection_attribute(&connection_string, "DATABASE") else {
        return fail(
            &mut dbc.diagnostics,
            diag(
                "08001",
                -30081,
                "client unable to establish connection: no DATABASE in the connection string",
            ),
        );
    };

    databases().get(&name);
    debug!(
        database = %name,
        login_timeout = dbc.login_timeout,
        connection_timeout = dbc.connection_timeout,
        "connected"
    );
    dbc.database = Some(name);

    let (length, truncated) = write_wide(
        &connection_string,
        out_string,
        out_capacity.max(0) as usize,
    );
    if !out_length.is_null() {
        *out_length = length.min(SQLSMALLINT::MAX as usize) as SQLSMALLINT;
    }
    if truncated && !out_string.is_null() {
        dbc.diagnostics
            .push(diag("01004", 0, "string data, right truncated"));
        return SQL_SUCCESS_WITH_INFO;
    }
    SQL_SUCCESS
}

pub unsafe extern "system" fn disconnect(dbc: SQLHDBC) -> SQLRETURN {
    let dbc = handle_or_invalid!(dbc_mut, dbc);
    let Some(name) = dbc.database.clone() else {
        return fail(&mut dbc.diagnostics, diag("08003", 0, "connection not open"));
    };
    if databases().get(&name).faults.fail_disconnect {
        return fail(
            &mut dbc.diagnostics,
            diag("08S01", -30081, "communication link failure during disconnect"),
        );
    }
    restore(dbc);
    dbc.database = None;
    debug!(database = %name, "disconnected");
    SQL_SUCCESS
}

pub unsafe extern "system" fn exec_direct(
    statement: SQLHSTMT,
    text: *const SQLWCHAR,
    length: SQLINTEGER,
) -> SQLRETURN {
    let statement = handle_or_invalid!(stmt_mut, statement);
    let command = match wide_argument(text, length as SQLLEN).and_then(|sql| parse(&sql)) {
        Ok(command) => command,
        Err(record) => return fail(&mut statement.diagnostics, record),
    };
    statement.prepared = None;
    execute_statement(statement, &command)
}

pub unsafe extern "system" fn prepare(
    statement: SQLHSTMT,
    text: *const SQLWCHAR,
    length: SQLINTEGER,
) -> SQLRETURN {
    let statement = handle_or_invalid!(stmt_mut, statement);
    match wide_argument(text, length as SQLLEN).and_then(|sql| parse(&sql)) {
        Ok(command) => {
            statement.prepared = Some(command);
            statement.result = None;
            SQL_SUCCESS
        }
        Err(record) => fail(&mut statement.diagnostics, record),
    }
}

pub unsafe extern "system" fn execute(statement: SQLHSTMT) -> SQLRETURN {
    let statement = handle_or_invalid!(stmt_mut, statement);
    let Some(command) = statement.prepared.clone() else {
        return fail(
            &mut statement.diagnostics,
            diag("HY010", 0, "function sequence error: no prepared statement"),
        );
    };
    execute_statement(statement, &command)
}

pub unsafe extern "system" fn num_result_cols(
    statement: SQLHSTMT,
    count: *mut SQLSMALLINT,
) -> SQLRETURN {
    let statement = handle_or_invalid!(stmt_mut, statement);
    if count.is_null() {
        return fail(&mut statement.diagnostics, diag("HY009", 0, "invalid use of null pointer"));
    }
    *count = statement
        .result
        .as_ref()
        .map_or(0, |result| result.columns.len() as SQLSMALLINT);
    SQL_SUCCESS
}

pub unsafe extern "system" fn row_count(statement: SQLHSTMT, count: *mut SQLLEN) -> SQLRETURN {
    let statement = handle_or_invalid!(stmt_mut, statement);
    if count.is_null() {
        return fail(&mut statement.diagnostics, diag("HY009", 0, "invalid use of null pointer"));
    }
    *count = statement.row_count;
    SQL_SUCCESS
}

pub unsafe extern "system" fn col_attribute(
    statement: SQLHSTMT,
    column: SQLUSMALLINT,
    field: SQLUSMALLINT,
    character: SQLPOINTER,
    buffer_length: SQLSMALLINT,
    string_length: *mut SQLSMALLINT,
    numeric: *mut SQLLEN,
) -> SQLRETURN {
    let statement = handle_or_invalid!(stmt_mut, statement);
    let Some(result) = statement.result.as_ref() else {
        return fail(
            &mut statement.diagnostics,
            diag("07005", -518, "statement is not a cursor specification"),
        );
    };
    let Some(def) = (column as usize)
        .checked_sub(1)
        .and_then(|index| result.columns.get(index))
    else {
        return fail(
            &mut statement.diagnostics,
            diag("07009", 0, format!("invalid descriptor index {column}")),
        );
    };

    let text = match field {
        SQL_DESC_NAME => Some(def.name.clone()),
        SQL_DESC_TYPE_NAME => Some(def.sql_type.type_name().to_string()),
        _ => None,
    };
    if let Some(text) = text {
        let capacity = buffer_length.max(0) as usize / size_of::<SQLWCHAR>();
        let (length, truncated) = write_wide(&text, character.cast(), capacity);
        if !string_length.is_null() {
            *string_length = (length * size_of::<SQLWCHAR>()).min(SQLSMALLINT::MAX as usize)
                as SQLSMALLINT;
        }
        if truncated && !character.is_null() {
            statement
                .diagnostics
                .push(diag("01004", 0, "string data, right truncated"));
            return SQL_SUCCESS_WITH_INFO;
        }
        return SQL_SUCCESS;
    }

    let value = match field {
        SQL_DESC_CONCISE_TYPE => def.sql_type.concise_type() as SQLLEN,
        SQL_DESC_DISPLAY_SIZE => def.sql_type.display_size() as SQLLEN,
        SQL_DESC_PRECISION => def.sql_type.precision() as SQLLEN,
        SQL_DESC_SCALE => def.sql_type.scale() as SQLLEN,
        other => {
            return fail(
                &mut statement.diagnostics,
                diag("HY091", 0, format!("invalid descriptor field identifier {other}")),
            )
        }
    };
    if !numeric.is_null() {
        *numeric = value;
    }
    SQL_SUCCESS
}

pub unsafe extern "system" fn set_stmt_attr(
    statement: SQLHSTMT,
    attribute: SQLINTEGER,
    value: SQLPOINTER,
    _length: SQLINTEGER,
) -> SQLRETURN {
    let statement = handle_or_invalid!(stmt_mut, statement);
    let number = value as usize as SQLULEN;
    match attribute {
        SQL_ATTR_ROW_ARRAY_SIZE | SQL_ATTR_PARAMSET_SIZE if number == 0 => {
            return fail(
                &mut statement.diagnostics,
                diag("HY024", 0, "invalid attribute value 0"),
            )
        }
        SQL_ATTR_ROW_ARRAY_SIZE => statement.row_array_size = number,
        SQL_ATTR_PARAMSET_SIZE => statement.paramset_size = number,
        SQL_ATTR_ROWS_FETCHED_PTR => statement.rows_fetched = value.cast(),
        SQL_ATTR_ROW_STATUS_PTR => statement.row_status = value.cast(),
        SQL_ATTR_PARAM_BIND_TYPE => statement.param_bind_type = number,
        SQL_ATTR_ROW_BIND_TYPE => {
            if number != SQL_BIND_BY_COLUMN as SQLULEN {
                return fail(
                    &mut statement.diagnostics,
                    diag("HYC00", 0, "only column-wise binding is supported"),
                );
            }
        }
        other => {
            return fail(
                &mut statement.diagnostics,
                diag("HY092", 0, format!("unsupported statement attribute {other}")),
            )
        }
    }
    SQL_SUCCESS
}

pub unsafe extern "system" fn bind_col(
    statement: SQLHSTMT,
    column: SQLUSMALLINT,
    c_type: SQLSMALLINT,
    buffer: SQLPOINTER,
    buffer_length: SQLLEN,
    indicators: *mut SQLLEN,
) -> SQLRETURN {
    let statement = handle_or_invalid!(stmt_mut, statement);
    if column == 0 {
        return fail(
            &mut statement.diagnostics,
            diag("07009", 0, "bookmark columns are not supported"),
        );
    }
    if buffer.is_null() {
        statement.columns.remove(&column);
        return SQL_SUCCESS;
    }
    statement.columns.insert(
        column,
        BoundColumn {
            c_type,
            buffer,
            buffer_length,
            indicators,
        },
    );
    SQL_SUCCESS
}

pub unsafe extern "system" fn fetch_scroll(
    statement: SQLHSTMT,
    orientation: SQLSMALLINT,
    _offset: SQLLEN,
) -> SQLRETURN {
    let statement = handle_or_invalid!(stmt_mut, statement);
    if orientation != SQL_FETCH_NEXT {
        return fail(
            &mut statement.diagnostics,
            diag("HY106", 0, "only SQL_FETCH_NEXT is supported"),
        );
    }
    let faults = {
        let mut registry = databases();
        let database = registry.get(&statement.database);
        database.fetch_calls += 1;
        database.faults.clone()
    };
    fetch(statement, &faults)
}

#[allow(clippy::too_many_arguments)]
pub unsafe extern "system" fn bind_parameter(
    statement: SQLHSTMT,
    number: SQLUSMALLINT,
    io_type: SQLSMALLINT,
    c_type: SQLSMALLINT,
    _sql_type: SQLSMALLINT,
    _column_size: SQLULEN,
    _decimal_digits: SQLSMALLINT,
    buffer: SQLPOINTER,
    buffer_length: SQLLEN,
    indicators: *mut SQLLEN,
) -> SQLRETURN {
    let statement = handle_or_invalid!(stmt_mut, statement);
    if io_type != SQL_PARAM_INPUT {
        return fail(
            &mut statement.diagnostics,
            diag("HY105", 0, "only input parameters are supported"),
        );
    }
    if number == 0 {
        return fail(
            &mut statement.diagnostics,
            diag("07009", 0, "invalid parameter number 0"),
        );
    }
    statement.parameters.insert(
        number,
        BoundParameter {
            c_type,
            buffer,
            buffer_length,
            indicators,
        },
    );
    SQL_SUCCESS
}

pub unsafe extern "system" fn end_tran(
    handle_type: SQLSMALLINT,
    handle: SQLHANDLE,
    completion: SQLSMALLINT,
) -> SQLRETURN {
    if handle_type != SQL_HANDLE_DBC {
        return SQL_ERROR;
    }
    let dbc = handle_or_invalid!(dbc_mut, handle);
    let Some(name) = dbc.database.clone() else {
        return fail(&mut dbc.diagnostics, diag("08003", 0, "connection not open"));
    };
    match completion {
        SQL_COMMIT => {
            dbc.snapshot = None;
            debug!(database = %name, "committed");
        }
        SQL_ROLLBACK => {
            if databases().get(&name).faults.fail_rollback {
                return fail(
                    &mut dbc.diagnostics,
                    diag("08S01", -30081, "communication link failure during rollback"),
                );
            }
            restore(dbc);
            debug!(database = %name, "rolled back");
        }
        other => {
            return fail(
                &mut dbc.diagnostics,
                diag("HY012", 0, format!("invalid transaction operation code {other}")),
            )
        }
    }
    SQL_SUCCESS
}

#[allow(clippy::too_many_arguments)]
pub unsafe extern "system" fn get_diag_rec(
    handle_type: SQLSMALLINT,
    handle: SQLHANDLE,
    record: SQLSMALLINT,
    state: *mut SQLWCHAR,
    native_error: *mut SQLINTEGER,
    message: *mut SQLWCHAR,
    buffer_length: SQLSMALLINT,
    text_length: *mut SQLSMALLINT,
) -> SQLRETURN {
    let diagnostics = match handle_type {
        SQL_HANDLE_ENV => env_mut(handle).map(|h| &h.diagnostics),
        SQL_HANDLE_DBC => dbc_mut(handle).map(|h| &h.diagnostics),
        SQL_HANDLE_STMT => stmt_mut(handle).map(|h| &h.diagnostics),
        _ => None,
    };
    let Some(diagnostics) = diagnostics else {
        return SQL_INVALID_HANDLE;
    };
    if record < 1 || buffer_length < 0 {
        return SQL_ERROR;
    }
    let Some(entry) = diagnostics.get(record as usize - 1) else {
        return SQL_NO_DATA;
    };

    write_wide(&entry.state, state, 6);
    if !native_error.is_null() {
        *native_error = entry.native_error;
    }
    let (length, truncated) = write_wide(&entry.message, message, buffer_length as usize);
    if !text_length.is_null() {
        *text_length = length.min(SQLSMALLINT::MAX as usize) as SQLSMALLINT;
    }
    if truncated && !message.is_null() {
        SQL_SUCCESS_WITH_INFO
    } else {
        SQL_SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use std::ptr::null_mut;

    use odbc_bulk_core::text::{from_utf16_nul, to_utf16_nul};

    use super::*;

    #[test]
    fn test_connection_attribute() {
        let text = "Driver=mock; database = Sales ;UID=me";
        assert_eq!(connection_attribute(text, "DATABASE").as_deref(), Some("Sales"));
        assert_eq!(connection_attribute(text, "uid").as_deref(), Some("me"));
        assert_eq!(connection_attribute(text, "PWD"), None);
        assert_eq!(connection_attribute("DATABASE=;", "DATABASE"), None);
    }

    #[test]
    fn test_handles_and_diagnostics() {
        unsafe {
            let mut env: SQLHANDLE = null_mut();
            assert_eq!(alloc_handle(SQL_HANDLE_ENV, null_mut(), &mut env), SQL_SUCCESS);

            let mut dbc: SQLHANDLE = null_mut();
            assert_eq!(alloc_handle(SQL_HANDLE_DBC, env, &mut dbc), SQL_ERROR);
            set_env_attr(env, SQL_ATTR_ODBC_VERSION, SQL_OV_ODBC3 as usize as SQLPOINTER, 0);
            assert_eq!(alloc_handle(SQL_HANDLE_DBC, env, &mut dbc), SQL_SUCCESS);

            let mut stmt: SQLHANDLE = null_mut();
            assert_eq!(alloc_handle(SQL_HANDLE_STMT, dbc, &mut stmt), SQL_ERROR);

            let mut state = [0 as SQLWCHAR; 6];
            let mut native = 0;
            let mut message = [0 as SQLWCHAR; 8];
            let mut length = 0;
            let ret = get_diag_rec(
                SQL_HANDLE_DBC,
                dbc,
                1,
                state.as_mut_ptr(),
                &mut native,
                message.as_mut_ptr(),
                message.len() as SQLSMALLINT,
                &mut length,
            );
            assert_eq!(ret, SQL_SUCCESS_WITH_INFO);
            assert_eq!(from_utf16_nul(&state).unwrap(), "08003");
            assert_eq!(from_utf16_nul(&message).unwrap(), "connect");
            assert_eq!(length, "connection not open".len() as SQLSMALLINT);
            let ret = get_diag_rec(
                SQL_HANDLE_DBC,
                dbc,
                2,
                state.as_mut_ptr(),
                &mut native,
                message.as_mut_ptr(),
                message.len() as SQLSMALLINT,
                &mut length,
            );
            assert_eq!(ret, SQL_NO_DATA);

            let connection_string = to_utf16_nul("DATABASE=entry_tests");
            let ret = driver_connect(
                dbc,
                null_mut(),
                connection_string.as_ptr(),
                SQL_NTS_SMALLINT,
                null_mut(),
                0,
                null_mut(),
                SQL_DRIVER_NOPROMPT,
            );
            assert_eq!(ret, SQL_SUCCESS);
            assert_eq!(alloc_handle(SQL_HANDLE_STMT, dbc, &mut stmt), SQL_SUCCESS);
            assert_eq!(crate::open_statements("entry_tests"), 1);

            assert_eq!(free_handle(SQL_HANDLE_STMT, stmt), SQL_SUCCESS);
            assert_eq!(crate::open_statements("entry_tests"), 0);
            assert_eq!(disconnect(dbc), SQL_SUCCESS);
            assert_eq!(disconnect(dbc), SQL_ERROR);
            assert_eq!(free_handle(SQL_HANDLE_DBC, dbc), SQL_SUCCESS);
            assert_eq!(free_handle(SQL_HANDLE_ENV, env), SQL_SUCCESS);
            assert_eq!(free_handle(SQL_HANDLE_ENV, null_mut()), SQL_INVALID_HANDLE);
        }
    }
}
