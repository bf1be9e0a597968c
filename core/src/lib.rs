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

//! odbc_bulk: bulk columnar transfer over ODBC
//!
//! odbc_bulk moves whole tables between typed column vectors and a
//! relational database reached through an ODBC driver manager. Reads fetch
//! result sets in chunks of rows into string, integer and numeric columns
//! with null masks. Writes bind column vectors as parameter arrays and
//! insert every row with one batched execute inside a transaction.
//!
//! The `core` library provides the types shared by the driver manager and
//! by in-process drivers:
//! - [error]: the [Error][error::Error] type and its [Status][error::Status] taxonomy;
//! - [ffi]: the C types, constants and function table of the call-level interface;
//! - [schemas]: column metadata and buffer layouts per SQL type;
//! - [columnar]: column vectors, read results and their Arrow conversions;
//! - [options]: process-wide timeouts and chunk sizes;
//! - [interrupt]: cooperative cancellation;
//! - [text]: the UTF-8 and UTF-16 conversions at the driver boundary.

pub mod columnar;
pub mod constants;
pub mod error;
pub mod ffi;
pub mod interrupt;
pub mod options;
pub mod schemas;
pub mod text;

pub use columnar::{Column, ColumnValues, ReadResult};
pub use interrupt::{CancellationToken, Interrupt, NoInterrupt};
pub use schemas::{ColumnDescriptor, LogicalType};
