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

//! Turning failed driver calls into [Error]s.

use odbc_bulk_core::error::{DiagnosticRecord, Error, Result, Status};
use odbc_bulk_core::ffi::constants::{SQL_INVALID_HANDLE, SQL_SUCCESS_WITH_INFO};
use odbc_bulk_core::ffi::{
    sql_succeeded, OdbcApi, SQLHANDLE, SQLINTEGER, SQLRETURN, SQLSMALLINT, SQLWCHAR,
};
use odbc_bulk_core::text::from_utf16_nul;

const MESSAGE_CAPACITY: usize = 1024;

/// Read every diagnostic record attached to `handle`.
pub(crate) fn diagnostics(
    api: &OdbcApi,
    handle_type: SQLSMALLINT,
    handle: SQLHANDLE,
) -> Vec<DiagnosticRecord> {
    let mut records = Vec::new();
    if handle.is_null() {
        return records;
    }

    let mut rec_number: SQLSMALLINT = 1;
    loop {
        match diagnostic_record(api, handle_type, handle, rec_number, MESSAGE_CAPACITY) {
            Some(record) => records.push(record),
            None => break,
        }
        if rec_number == SQLSMALLINT::MAX {
            break;
        }
        rec_number += 1;
    }
    records
}

fn diagnostic_record(
    api: &OdbcApi,
    handle_type: SQLSMALLINT,
    handle: SQLHANDLE,
    rec_number: SQLSMALLINT,
    capacity: usize,
) -> Option<DiagnosticRecord> {
    let mut state: [SQLWCHAR; 6] = [0; 6];
    let mut native_error: SQLINTEGER = 0;
    let mut message: Vec<SQLWCHAR> = vec![0; capacity];
    let mut text_length: SQLSMALLINT = 0;

    let ret = unsafe {
        (api.SQLGetDiagRecW)(
            handle_type,
            handle,
            rec_number,
            state.as_mut_ptr(),
            &mut native_error,
            message.as_mut_ptr(),
            capacity.min(SQLSMALLINT::MAX as usize) as SQLSMALLINT,
            &mut text_length,
        )
    };
    if !sql_succeeded(ret) {
        return None;
    }

    // The message did not fit: ask again with room for all of it.
    let needed = text_length.max(0) as usize + 1;
    if ret == SQL_SUCCESS_WITH_INFO && needed > capacity && capacity < SQLSMALLINT::MAX as usize {
        return diagnostic_record(api, handle_type, handle, rec_number, needed);
    }

    Some(DiagnosticRecord {
        state: String::from_utf16_lossy(&state[..5]),
        native_error,
        message: from_utf16_nul(&message)
            .unwrap_or_else(|_| String::from_utf16_lossy(&message[..capacity.min(needed)])),
    })
}

/// Succeed if `ret` is a success code, else build an error with `status`
/// from the diagnostics of `handle`.
pub(crate) fn check(
    ret: SQLRETURN,
    api: &OdbcApi,
    handle_type: SQLSMALLINT,
    handle: SQLHANDLE,
    status: Status,
    context: &str,
) -> Result<()> {
    if sql_succeeded(ret) {
        return Ok(());
    }
    Err(failure(ret, api, handle_type, handle, status, context))
}

/// Build the error for a failed call.
pub(crate) fn failure(
    ret: SQLRETURN,
    api: &OdbcApi,
    handle_type: SQLSMALLINT,
    handle: SQLHANDLE,
    status: Status,
    context: &str,
) -> Error {
    if ret == SQL_INVALID_HANDLE {
        return Error::with_message_and_status(
            format!("{context} failed: invalid handle"),
            status,
        );
    }
    Error::from_diagnostics(
        format!("{context} failed (return code {ret})"),
        status,
        diagnostics(api, handle_type, handle),
    )
}
