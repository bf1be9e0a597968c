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

use std::collections::{BTreeMap, HashMap};
use std::ptr::null_mut;

use odbc_bulk_core::error::DiagnosticRecord;
use odbc_bulk_core::ffi::{SQLLEN, SQLPOINTER, SQLSMALLINT, SQLULEN, SQLUSMALLINT};

use crate::sql::Command;
use crate::storage::{ColumnDef, Table, Value};

pub struct Environment {
    pub odbc_version: u32,
    pub diagnostics: Vec<DiagnosticRecord>,
}

pub struct Connection {
    pub database: Option<String>,
    pub autocommit: bool,
    pub login_timeout: u32,
    pub connection_timeout: u32,
    /// Tables as they were when the current transaction started.
    pub snapshot: Option<HashMap<String, Table>>,
    pub diagnostics: Vec<DiagnosticRecord>,
}

impl Default for Connection {
    fn default() -> Self {
        Self {
            database: None,
            autocommit: true,
            login_timeout: 0,
            connection_timeout: 0,
            snapshot: None,
            diagnostics: Vec::new(),
        }
    }
}

/// A `SQLBindCol` binding.
pub struct BoundColumn {
    pub c_type: SQLSMALLINT,
    pub buffer: SQLPOINTER,
    pub buffer_length: SQLLEN,
    pub indicators: *mut SQLLEN,
}

/// A `SQLBindParameter` binding.
pub struct BoundParameter {
    pub c_type: SQLSMALLINT,
    pub buffer: SQLPOINTER,
    pub buffer_length: SQLLEN,
    pub indicators: *mut SQLLEN,
}

/// The open cursor of an executed query.
pub struct ResultSet {
    pub columns: Vec<ColumnDef>,
    pub rows: Vec<Vec<Value>>,
    pub position: usize,
}

pub struct Statement {
    pub dbc: *mut Connection,
    pub database: String,
    pub prepared: Option<Command>,
    pub result: Option<ResultSet>,
    pub row_count: SQLLEN,
    pub columns: BTreeMap<SQLUSMALLINT, BoundColumn>,
    pub parameters: BTreeMap<SQLUSMALLINT, BoundParameter>,
    pub row_array_size: SQLULEN,
    pub rows_fetched: *mut SQLULEN,
    pub row_status: *mut SQLUSMALLINT,
    pub paramset_size: SQLULEN,
    pub param_bind_type: SQLULEN,
    pub diagnostics: Vec<DiagnosticRecord>,
}

impl Statement {
    pub fn new(dbc: *mut Connection, database: String) -> Self {
        Self {
            dbc,
            database,
            prepared: None,
            result: None,
            row_count: -1,
            columns: BTreeMap::new(),
            parameters: BTreeMap::new(),
            row_array_size: 1,
            rows_fetched: null_mut(),
            row_status: null_mut(),
            paramset_size: 1,
            param_bind_type: 0,
            diagnostics: Vec::new(),
        }
    }
}
