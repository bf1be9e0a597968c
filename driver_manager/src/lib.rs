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

//! Bulk reads and writes through an ODBC driver manager.
//!
//! The driver manager is a C library (unixODBC, iODBC or `odbc32`) whose
//! entry points are resolved into an [OdbcApi] function table. There are two
//! ways to obtain one:
//! 1. By loading the driver manager at run-time (with `dlopen/LoadLibrary`)
//!    using [EnvironmentRegistry::load_default],
//!    [EnvironmentRegistry::load_dynamic_from_name] or
//!    [EnvironmentRegistry::load_dynamic_from_filename]. The
//!    `ODBC_BULK_DRIVER_MANAGER` environment variable overrides the library
//!    searched for by default.
//! 2. By supplying a function table linked into the program, e.g. an
//!    in-process driver, with [EnvironmentRegistry::load_static].
//!
//! A registry owns the single ODBC environment shared by all of its
//! connections. The environment is allocated when the first [Connection]
//! opens and freed when the last one closes.
//!
//! Reads execute a query once and fetch its rows in chunks into typed
//! columns. Writes insert all rows of a table with one batched execution
//! inside a transaction that is rolled back if the insert fails.
//!
//! ## Using across threads
//!
//! A [Connection] can be sent to another thread but is used by one thread at
//! a time. [EnvironmentRegistry] is cheaply clonable and its bookkeeping is
//! serialized under a lock.
//!
//! ## Example
//!
//! ```rust
//! # use odbc_bulk_core::Column;
//! # use odbc_bulk_driver_manager::{Connection, EnvironmentRegistry, WriteInput};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = EnvironmentRegistry::load_static(odbc_bulk_mock_driver::api());
//! let connection = Connection::connect_with(&registry, "DATABASE=example", 30, 30)?;
//! connection.execute_update("CREATE TABLE CITIES (NAME VARCHAR(20), PEOPLE INTEGER)")?;
//!
//! let input = WriteInput::from_columns(
//!     vec!["NAME".into(), "PEOPLE".into()],
//!     vec![
//!         Column::from_strings([Some("Zürich"), Some("Genève")]),
//!         Column::from_integers([Some(421_878), None]),
//!     ],
//! );
//! connection.write_table("CITIES", &input)?;
//!
//! let output = connection.execute_query("SELECT * FROM CITIES", 100)?;
//! assert_eq!(output.num_rows(), 2);
//! assert_eq!(output.columns()[0].string(1), Some("Genève"));
//! assert!(output.columns()[1].is_null(1));
//! # Ok(())
//! # }
//! ```

mod connection;
mod environment;
pub(crate) mod error;
mod introspect;
mod reader;
mod search;
mod statement;
mod writer;

pub use connection::Connection;
pub use environment::EnvironmentRegistry;
pub use odbc_bulk_core::ffi::OdbcApi;
pub use writer::WriteInput;
