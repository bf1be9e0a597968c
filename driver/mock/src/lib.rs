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

//! An in-memory ODBC driver.
//!
//! The driver answers the part of the ODBC 3.x call-level interface that
//! bulk transfer uses: handle management, connection and statement
//! attributes, direct and prepared execution, column metadata, block
//! cursors over column-wise bound buffers and column-wise parameter
//! arrays. Its SQL dialect covers `CREATE TABLE`, `DROP TABLE`, `INSERT`,
//! `SELECT` (with `FETCH FIRST n ROWS ONLY`) and `DELETE`.
//!
//! Databases are named by the `DATABASE` key of the connection string and
//! live for the whole process, so two connections with the same name see
//! the same tables. Uncommitted changes of a connection with autocommit
//! turned off are visible to everyone until the transaction ends.

use odbc_bulk_core::ffi::OdbcApi;

mod entry;
mod execute;
mod fetch;
mod handle;
mod sql;
mod storage;

pub use storage::Faults;

use storage::databases;

/// The function table of the driver, ready for
/// `EnvironmentRegistry::load_static`.
pub fn api() -> OdbcApi {
    OdbcApi {
        SQLAllocHandle: entry::alloc_handle,
        SQLFreeHandle: entry::free_handle,
        SQLSetEnvAttr: entry::set_env_attr,
        SQLSetConnectAttrW: entry::set_connect_attr,
        SQLGetConnectAttrW: entry::get_connect_attr,
        SQLDriverConnectW: entry::driver_connect,
        SQLDisconnect: entry::disconnect,
        SQLExecDirectW: entry::exec_direct,
        SQLPrepareW: entry::prepare,
        SQLExecute: entry::execute,
        SQLNumResultCols: entry::num_result_cols,
        SQLRowCount: entry::row_count,
        SQLColAttributeW: entry::col_attribute,
        SQLSetStmtAttrW: entry::set_stmt_attr,
        SQLBindCol: entry::bind_col,
        SQLFetchScroll: entry::fetch_scroll,
        SQLBindParameter: entry::bind_parameter,
        SQLEndTran: entry::end_tran,
        SQLGetDiagRecW: entry::get_diag_rec,
    }
}

/// Inject failures into `database`.
pub fn set_faults(database: &str, faults: Faults) {
    databases().get(database).faults = faults;
}

/// How many times `SQLFetchScroll` ran against `database`.
pub fn fetch_calls(database: &str) -> usize {
    databases().get(database).fetch_calls
}

/// Statements allocated on `database` and not yet freed.
pub fn open_statements(database: &str) -> usize {
    databases().get(database).open_statements
}

/// Rows stored in `table`, or `None` if it does not exist.
pub fn table_rows(database: &str, table: &str) -> Option<usize> {
    databases()
        .get(database)
        .tables
        .get(&table.to_ascii_uppercase())
        .map(|table| table.rows.len())
}

/// Forget `database` and everything in it.
pub fn drop_database(database: &str) {
    databases().remove(database);
}
