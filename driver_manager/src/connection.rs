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

use arrow_array::RecordBatch;
use tracing::{debug, info, warn};

use odbc_bulk_core::columnar::ReadResult;
use odbc_bulk_core::error::{Error, Result, Status};
use odbc_bulk_core::ffi::constants::{
    SQL_ATTR_AUTOCOMMIT, SQL_ATTR_CONNECTION_TIMEOUT, SQL_ATTR_LOGIN_TIMEOUT, SQL_AUTOCOMMIT_OFF,
    SQL_AUTOCOMMIT_ON, SQL_DRIVER_NOPROMPT, SQL_HANDLE_DBC, SQL_HANDLE_ENV, SQL_IS_UINTEGER,
    SQL_NO_DATA, SQL_NTS_SMALLINT,
};
use odbc_bulk_core::ffi::{
    sql_succeeded, OdbcApi, SQLHDBC, SQLINTEGER, SQLPOINTER, SQLSMALLINT, SQLUINTEGER,
};
use odbc_bulk_core::interrupt::{Interrupt, NoInterrupt};
use odbc_bulk_core::options;
use odbc_bulk_core::schemas::ColumnDescriptor;
use odbc_bulk_core::text::to_utf16_nul;

use crate::environment::EnvironmentRegistry;
use crate::error::{check, failure};
use crate::statement::Statement;
use crate::writer::{self, WriteInput};
use crate::{introspect, reader};

fn set_uinteger_attr(
    api: &OdbcApi,
    dbc: SQLHDBC,
    attribute: SQLINTEGER,
    value: SQLUINTEGER,
    status: Status,
    context: &str,
) -> Result<()> {
    let ret = unsafe {
        (api.SQLSetConnectAttrW)(dbc, attribute, value as usize as SQLPOINTER, SQL_IS_UINTEGER)
    };
    check(ret, api, SQL_HANDLE_DBC, dbc, status, context)
}

/// Whether autocommit is on for `dbc`.
pub(crate) fn autocommit(api: &OdbcApi, dbc: SQLHDBC) -> Result<bool> {
    let mut value: SQLUINTEGER = SQL_AUTOCOMMIT_ON;
    let ret = unsafe {
        (api.SQLGetConnectAttrW)(
            dbc,
            SQL_ATTR_AUTOCOMMIT,
            (&mut value as *mut SQLUINTEGER).cast(),
            SQL_IS_UINTEGER,
            null_mut(),
        )
    };
    check(
        ret,
        api,
        SQL_HANDLE_DBC,
        dbc,
        Status::Transaction,
        "SQLGetConnectAttrW(SQL_ATTR_AUTOCOMMIT)",
    )?;
    Ok(value != SQL_AUTOCOMMIT_OFF)
}

pub(crate) fn set_autocommit(api: &OdbcApi, dbc: SQLHDBC, enabled: bool) -> Result<()> {
    let value = if enabled {
        SQL_AUTOCOMMIT_ON
    } else {
        SQL_AUTOCOMMIT_OFF
    };
    set_uinteger_attr(
        api,
        dbc,
        SQL_ATTR_AUTOCOMMIT,
        value,
        Status::Transaction,
        "SQLSetConnectAttrW(SQL_ATTR_AUTOCOMMIT)",
    )
}

/// Commit or roll back the current transaction of `dbc`.
pub(crate) fn end_transaction(api: &OdbcApi, dbc: SQLHDBC, completion: SQLSMALLINT) -> Result<()> {
    let ret = unsafe { (api.SQLEndTran)(SQL_HANDLE_DBC, dbc, completion) };
    check(
        ret,
        api,
        SQL_HANDLE_DBC,
        dbc,
        Status::Transaction,
        "SQLEndTran",
    )
}

/// An open connection to a database.
///
/// A connection belongs to the [EnvironmentRegistry] it was opened through
/// and keeps that registry's environment alive until it is closed. Closing
/// is idempotent; any other operation on a closed connection fails with
/// [Status::Connection]. Dropping an open connection disconnects it.
#[derive(Debug)]
pub struct Connection {
    registry: EnvironmentRegistry,
    dbc: Option<SQLHDBC>,
}

// A connection handle may be moved across threads, but is used by one
// thread at a time.
unsafe impl Send for Connection {}

impl Connection {
    /// Connect through the global registry with the current login and
    /// connection timeouts.
    pub fn connect(connection_string: &str) -> Result<Self> {
        let registry = EnvironmentRegistry::global()?;
        let settings = options::snapshot();
        Self::connect_with(
            &registry,
            connection_string,
            settings.login_timeout,
            settings.connection_timeout,
        )
    }

    /// Connect through `registry`, applying both timeouts (in seconds)
    /// before the handshake.
    pub fn connect_with(
        registry: &EnvironmentRegistry,
        connection_string: &str,
        login_timeout: u32,
        connection_timeout: u32,
    ) -> Result<Self> {
        if login_timeout == 0 || connection_timeout == 0 {
            return Err(Error::with_message_and_status(
                "timeouts must be at least one second",
                Status::InvalidArguments,
            ));
        }

        let api = registry.api();
        let dbc = registry.open(|env| {
            let mut dbc: SQLHDBC = null_mut();
            let ret = unsafe { (api.SQLAllocHandle)(SQL_HANDLE_DBC, env, &mut dbc) };
            if !sql_succeeded(ret) {
                return Err(failure(
                    ret,
                    api,
                    SQL_HANDLE_ENV,
                    env,
                    Status::Connection,
                    "SQLAllocHandle(SQL_HANDLE_DBC)",
                ));
            }
            match handshake(api, dbc, connection_string, login_timeout, connection_timeout) {
                Ok(()) => Ok(dbc),
                Err(error) => {
                    unsafe { (api.SQLFreeHandle)(SQL_HANDLE_DBC, dbc) };
                    Err(error)
                }
            }
        })?;

        debug!(login_timeout, connection_timeout, "connected");
        Ok(Self {
            registry: registry.clone(),
            dbc: Some(dbc),
        })
    }

    pub fn registry(&self) -> &EnvironmentRegistry {
        &self.registry
    }

    pub fn is_closed(&self) -> bool {
        self.dbc.is_none()
    }

    /// Disconnect and release the connection. Closing a closed connection
    /// does nothing.
    pub fn close(&mut self) -> Result<()> {
        self.close_with(true)
    }

    /// Release the connection, disconnecting first if `disconnect` is set.
    ///
    /// The handle is freed and the environment released even when the
    /// disconnect fails; the failure is then returned.
    pub fn close_with(&mut self, disconnect: bool) -> Result<()> {
        let Some(dbc) = self.dbc.take() else {
            return Ok(());
        };
        let api = self.registry.api();

        let mut outcome = Ok(());
        if disconnect {
            let ret = unsafe { (api.SQLDisconnect)(dbc) };
            outcome = check(
                ret,
                api,
                SQL_HANDLE_DBC,
                dbc,
                Status::Connection,
                "SQLDisconnect",
            );
        }

        let ret = unsafe { (api.SQLFreeHandle)(SQL_HANDLE_DBC, dbc) };
        if !sql_succeeded(ret) && outcome.is_ok() {
            outcome = Err(Error::with_message_and_status(
                format!("SQLFreeHandle(SQL_HANDLE_DBC) failed (return code {ret})"),
                Status::Connection,
            ));
        }
        self.registry.release();
        debug!(disconnect, "connection closed");
        outcome
    }

    fn handle(&self) -> Result<SQLHDBC> {
        self.dbc.ok_or_else(|| {
            Error::with_message_and_status("connection is closed", Status::Connection)
        })
    }

    /// Execute a statement that returns no rows, with autocommit on.
    ///
    /// A searched update or delete that touches no rows succeeds.
    pub fn execute_update(&self, sql: &str) -> Result<()> {
        let dbc = self.handle()?;
        let api = self.registry.api();
        set_autocommit(api, dbc, true)?;

        let statement = Statement::allocate(api, dbc)?;
        let ret = statement.exec_direct(sql)?;
        if ret == SQL_NO_DATA {
            debug!("statement affected no rows");
        } else if let Some(rows) = statement.row_count() {
            debug!(rows, "statement executed");
        }
        Ok(())
    }

    /// Execute a query and read its whole result, fetching `chunk_size` rows
    /// at a time.
    pub fn execute_query(&self, sql: &str, chunk_size: usize) -> Result<ReadResult> {
        self.execute_query_with(sql, chunk_size, &NoInterrupt)
    }

    /// Like [Self::execute_query], polling `interrupt` after every chunk.
    pub fn execute_query_with(
        &self,
        sql: &str,
        chunk_size: usize,
        interrupt: &dyn Interrupt,
    ) -> Result<ReadResult> {
        let dbc = self.handle()?;
        reader::read_query(self.registry.api(), dbc, sql, chunk_size, interrupt)
    }

    /// Read a whole table with the current default read chunk size.
    pub fn read_table(&self, table: &str) -> Result<ReadResult> {
        self.execute_query(&format!("SELECT * FROM {table}"), options::read_chunk_size())
    }

    /// Names, types, precision and scale of the columns of `table`, which
    /// must have exactly `expected` columns.
    pub fn describe_table(&self, table: &str, expected: usize) -> Result<Vec<ColumnDescriptor>> {
        let dbc = self.handle()?;
        introspect::describe_table(self.registry.api(), dbc, table, expected)
    }

    /// Insert all rows of `input` into `table` in one transaction.
    ///
    /// Returns the number of rows inserted. On failure the transaction is
    /// rolled back and the table is left unchanged.
    pub fn write_table(&self, table: &str, input: &WriteInput) -> Result<usize> {
        self.write_table_with(table, input, &NoInterrupt)
    }

    /// Like [Self::write_table], polling `interrupt` after every copied
    /// column.
    pub fn write_table_with(
        &self,
        table: &str,
        input: &WriteInput,
        interrupt: &dyn Interrupt,
    ) -> Result<usize> {
        let dbc = self.handle()?;
        writer::write_table(self.registry.api(), dbc, table, input, interrupt)
    }

    /// Insert a record batch into `table` in one transaction, like
    /// [Self::write_table].
    pub fn write_record_batch(&self, table: &str, batch: &RecordBatch) -> Result<usize> {
        let written = self.write_table(table, &WriteInput::from_record_batch(batch)?)?;
        info!(table, rows = written, "record batch written");
        Ok(written)
    }
}

fn handshake(
    api: &OdbcApi,
    dbc: SQLHDBC,
    connection_string: &str,
    login_timeout: u32,
    connection_timeout: u32,
) -> Result<()> {
    set_uinteger_attr(
        api,
        dbc,
        SQL_ATTR_LOGIN_TIMEOUT,
        login_timeout,
        Status::Connection,
        "SQLSetConnectAttrW(SQL_ATTR_LOGIN_TIMEOUT)",
    )?;
    set_uinteger_attr(
        api,
        dbc,
        SQL_ATTR_CONNECTION_TIMEOUT,
        connection_timeout,
        Status::Connection,
        "SQLSetConnectAttrW(SQL_ATTR_CONNECTION_TIMEOUT)",
    )?;

    let text = to_utf16_nul(connection_string);
    let mut out_length: SQLSMALLINT = 0;
    let ret = unsafe {
        (api.SQLDriverConnectW)(
            dbc,
            null_mut(),
            text.as_ptr(),
            SQL_NTS_SMALLINT,
            null_mut(),
            0,
            &mut out_length,
            SQL_DRIVER_NOPROMPT,
        )
    };
    check(
        ret,
        api,
        SQL_HANDLE_DBC,
        dbc,
        Status::Connection,
        "SQLDriverConnectW",
    )
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            warn!(error = %error, "failed to close connection");
        }
    }
}
