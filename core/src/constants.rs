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

/// Minimum bind width, in UTF-16 units, of a DATE, TIME or TIMESTAMP column.
pub const DATE_FIELD_MIN_LENGTH: usize = 32;
/// Bind width of a DECFLOAT column: sign, 34 digits, decimal point and
/// terminator.
pub const DECFLOAT_FIELD_WIDTH: usize = 37;
/// Extra width of a DECIMAL or NUMERIC column over its precision: sign,
/// decimal point and terminator.
pub const DECIMAL_FIELD_EXTRA: usize = 3;

/// Placeholder stored in an integer column for a NULL cell.
pub const NULL_INTEGER: i64 = 0;
/// Placeholder stored in a numeric column for a NULL cell.
pub const NULL_NUMERIC: f64 = 0.0;
/// Placeholder stored in a string column for a NULL cell.
pub const NULL_STRING: &str = "";

pub const DEFAULT_LOGIN_TIMEOUT: u32 = 120;
pub const DEFAULT_CONNECTION_TIMEOUT: u32 = 120;
pub const DEFAULT_READ_CHUNK_SIZE: usize = 1;
pub const DEFAULT_WRITE_CHUNK_SIZE: usize = 1_000_000;

pub const ENV_LOGIN_TIMEOUT: &str = "ODBC_BULK_LOGIN_TIMEOUT";
pub const ENV_CONNECTION_TIMEOUT: &str = "ODBC_BULK_CONNECTION_TIMEOUT";
pub const ENV_READ_CHUNK_SIZE: &str = "ODBC_BULK_READ_CHUNK_SIZE";
pub const ENV_WRITE_CHUNK_SIZE: &str = "ODBC_BULK_WRITE_CHUNK_SIZE";
pub const ENV_DRIVER_MANAGER: &str = "ODBC_BULK_DRIVER_MANAGER";

/// Arrow field metadata key carrying the native type name of a column.
pub const METADATA_TYPE_NAME: &str = "odbc_bulk.type_name";
