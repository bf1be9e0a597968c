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

use std::ptr::null_mut;

use tracing::{debug, warn};

use odbc_bulk_core::error::{Error, Result, Status};
use odbc_bulk_core::ffi::constants::{
    SQL_HANDLE_DBC, SQL_HANDLE_STMT, SQL_IS_POINTER, SQL_IS_UINTEGER, SQL_NO_DATA,
};
use odbc_bulk_core::ffi::{
    sql_succeeded, OdbcApi, SQLHDBC, SQLHSTMT, SQLINTEGER, SQLLEN, SQLPOINTER, SQLRETURN,
    SQLSMALLINT, SQLULEN,
};
use odbc_bulk_core::text::to_utf16;

use crate::error::{check, failure};

/// A statement handle, freed when dropped.
///
/// Every exit path of a read or write releases its statement through this
/// guard, including errors and cancellation.
pub(crate) struct Statement<'a> {
    api: &'a OdbcApi,
    handle: SQLHSTMT,
}

impl<'a> Statement<'a> {
    pub(crate) fn allocate(api: &'a OdbcApi, dbc: SQLHDBC) -> Result<Self> {
        let mut handle: SQLHSTMT = null_mut();
        let ret = unsafe { (api.SQLAllocHandle)(SQL_HANDLE_STMT, dbc, &mut handle) };
        check(
            ret,
            api,
            SQL_HANDLE_DBC,
            dbc,
            Status::Exec,
            "SQLAllocHandle(SQL_HANDLE_STMT)",
        )?;
        Ok(Self { api, handle })
    }

    pub(crate) fn api(&self) -> &'a OdbcApi {
        self.api
    }

    pub(crate) fn handle(&self) -> SQLHSTMT {
        self.handle
    }

    /// Fail with `status` unless `ret` is a success code, reading the
    /// diagnostics of this statement.
    pub(crate) fn check(&self, ret: SQLRETURN, status: Status, context: &str) -> Result<()> {
        check(ret, self.api, SQL_HANDLE_STMT, self.handle, status, context)
    }

    pub(crate) fn error(&self, ret: SQLRETURN, status: Status, context: &str) -> Error {
        failure(ret, self.api, SQL_HANDLE_STMT, self.handle, status, context)
    }

    /// Execute `sql` directly. `SQL_NO_DATA` is returned to the caller
    /// rather than treated as a failure.
    pub(crate) fn exec_direct(&self, sql: &str) -> Result<SQLRETURN> {
        debug!(sql, "executing statement");
        let text = to_utf16(sql);
        let ret = unsafe {
            (self.api.SQLExecDirectW)(self.handle, text.as_ptr(), text.len() as SQLINTEGER)
        };
        if ret == SQL_NO_DATA {
            return Ok(ret);
        }
        self.check(ret, Status::Exec, "SQLExecDirectW")?;
        Ok(ret)
    }

    pub(crate) fn prepare(&self, sql: &str) -> Result<()> {
        debug!(sql, "preparing statement");
        let text = to_utf16(sql);
        let ret =
            unsafe { (self.api.SQLPrepareW)(self.handle, text.as_ptr(), text.len() as SQLINTEGER) };
        self.check(ret, Status::Exec, "SQLPrepareW")
    }

    pub(crate) fn execute(&self) -> Result<SQLRETURN> {
        let ret = unsafe { (self.api.SQLExecute)(self.handle) };
        if ret == SQL_NO_DATA {
            return Ok(ret);
        }
        self.check(ret, Status::Exec, "SQLExecute")?;
        Ok(ret)
    }

    pub(crate) fn num_result_cols(&self) -> Result<usize> {
        let mut count: SQLSMALLINT = 0;
        let ret = unsafe { (self.api.SQLNumResultCols)(self.handle, &mut count) };
        self.check(ret, Status::Schema, "SQLNumResultCols")?;
        Ok(count.max(0) as usize)
    }

    /// Rows affected by the last execution, `None` if the driver does not
    /// know.
    pub(crate) fn row_count(&self) -> Option<i64> {
        let mut count: SQLLEN = 0;
        let ret = unsafe { (self.api.SQLRowCount)(self.handle, &mut count) };
        if sql_succeeded(ret) && count >= 0 {
            Some(count as i64)
        } else {
            None
        }
    }

    /// Set an integer valued statement attribute.
    pub(crate) fn set_ulen_attr(
        &self,
        attribute: SQLINTEGER,
        value: SQLULEN,
        status: Status,
        context: &str,
    ) -> Result<()> {
        let ret = unsafe {
            (self.api.SQLSetStmtAttrW)(
                self.handle,
                attribute,
                value as SQLPOINTER,
                SQL_IS_UINTEGER,
            )
        };
        self.check(ret, status, context)
    }

    /// Set a pointer valued statement attribute. The pointee must outlive
    /// every call that writes through it.
    pub(crate) fn set_pointer_attr(
        &self,
        attribute: SQLINTEGER,
        value: SQLPOINTER,
        status: Status,
        context: &str,
    ) -> Result<()> {
        let ret =
            unsafe { (self.api.SQLSetStmtAttrW)(self.handle, attribute, value, SQL_IS_POINTER) };
        self.check(ret, status, context)
    }
}

impl Drop for Statement<'_> {
    fn drop(&mut self) {
        let ret = unsafe { (self.api.SQLFreeHandle)(SQL_HANDLE_STMT, self.handle) };
        if !sql_succeeded(ret) {
            warn!(ret, "SQLFreeHandle for a statement failed");
        }
    }
}
