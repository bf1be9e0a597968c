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

//! Values from `sql.h`, `sqlext.h` and the DB2 CLI headers.

use super::types::{SQLINTEGER, SQLLEN, SQLRETURN, SQLSMALLINT, SQLUINTEGER, SQLUSMALLINT};

pub const SQL_SUCCESS: SQLRETURN = 0;
pub const SQL_SUCCESS_WITH_INFO: SQLRETURN = 1;
pub const SQL_NO_DATA: SQLRETURN = 100;
pub const SQL_ERROR: SQLRETURN = -1;
pub const SQL_INVALID_HANDLE: SQLRETURN = -2;

pub const SQL_HANDLE_ENV: SQLSMALLINT = 1;
pub const SQL_HANDLE_DBC: SQLSMALLINT = 2;
pub const SQL_HANDLE_STMT: SQLSMALLINT = 3;

pub const SQL_NULL_DATA: SQLLEN = -1;
pub const SQL_NTS: SQLLEN = -3;
pub const SQL_NO_TOTAL: SQLLEN = -4;
pub const SQL_NTS_INTEGER: SQLINTEGER = -3;
pub const SQL_NTS_SMALLINT: SQLSMALLINT = -3;
pub const SQL_IS_UINTEGER: SQLINTEGER = -5;
pub const SQL_IS_INTEGER: SQLINTEGER = -6;
pub const SQL_IS_POINTER: SQLINTEGER = -4;

// Environment attributes.
pub const SQL_ATTR_ODBC_VERSION: SQLINTEGER = 200;
pub const SQL_OV_ODBC3: SQLUINTEGER = 3;

// Connection attributes.
pub const SQL_ATTR_AUTOCOMMIT: SQLINTEGER = 102;
pub const SQL_ATTR_LOGIN_TIMEOUT: SQLINTEGER = 103;
pub const SQL_ATTR_CONNECTION_TIMEOUT: SQLINTEGER = 113;
pub const SQL_AUTOCOMMIT_OFF: SQLUINTEGER = 0;
pub const SQL_AUTOCOMMIT_ON: SQLUINTEGER = 1;

pub const SQL_DRIVER_NOPROMPT: SQLUSMALLINT = 0;

// Statement attributes.
pub const SQL_ATTR_PARAM_BIND_TYPE: SQLINTEGER = 18;
pub const SQL_ATTR_PARAMSET_SIZE: SQLINTEGER = 22;
pub const SQL_ATTR_ROW_BIND_TYPE: SQLINTEGER = 5;
pub const SQL_ATTR_ROW_STATUS_PTR: SQLINTEGER = 25;
pub const SQL_ATTR_ROWS_FETCHED_PTR: SQLINTEGER = 26;
pub const SQL_ATTR_ROW_ARRAY_SIZE: SQLINTEGER = 27;
pub const SQL_PARAM_BIND_BY_COLUMN: SQLUINTEGER = 0;
pub const SQL_BIND_BY_COLUMN: SQLUINTEGER = 0;

pub const SQL_FETCH_NEXT: SQLSMALLINT = 1;

pub const SQL_ROW_SUCCESS: SQLUSMALLINT = 0;
pub const SQL_ROW_DELETED: SQLUSMALLINT = 1;
pub const SQL_ROW_UPDATED: SQLUSMALLINT = 2;
pub const SQL_ROW_NOROW: SQLUSMALLINT = 3;
pub const SQL_ROW_ADDED: SQLUSMALLINT = 4;
pub const SQL_ROW_ERROR: SQLUSMALLINT = 5;
pub const SQL_ROW_SUCCESS_WITH_INFO: SQLUSMALLINT = 6;

pub const SQL_PARAM_INPUT: SQLSMALLINT = 1;

pub const SQL_COMMIT: SQLSMALLINT = 0;
pub const SQL_ROLLBACK: SQLSMALLINT = 1;

// Column attribute identifiers.
pub const SQL_DESC_CONCISE_TYPE: SQLUSMALLINT = 2;
pub const SQL_DESC_DISPLAY_SIZE: SQLUSMALLINT = 6;
pub const SQL_DESC_TYPE_NAME: SQLUSMALLINT = 14;
pub const SQL_DESC_NAME: SQLUSMALLINT = 1011;
pub const SQL_DESC_PRECISION: SQLUSMALLINT = 1005;
pub const SQL_DESC_SCALE: SQLUSMALLINT = 1006;

// SQL data types.
pub const SQL_UNKNOWN_TYPE: SQLSMALLINT = 0;
pub const SQL_CHAR: SQLSMALLINT = 1;
pub const SQL_NUMERIC: SQLSMALLINT = 2;
pub const SQL_DECIMAL: SQLSMALLINT = 3;
pub const SQL_INTEGER: SQLSMALLINT = 4;
pub const SQL_SMALLINT: SQLSMALLINT = 5;
pub const SQL_FLOAT: SQLSMALLINT = 6;
pub const SQL_REAL: SQLSMALLINT = 7;
pub const SQL_DOUBLE: SQLSMALLINT = 8;
pub const SQL_VARCHAR: SQLSMALLINT = 12;
pub const SQL_TYPE_DATE: SQLSMALLINT = 91;
pub const SQL_TYPE_TIME: SQLSMALLINT = 92;
pub const SQL_TYPE_TIMESTAMP: SQLSMALLINT = 93;
pub const SQL_LONGVARCHAR: SQLSMALLINT = -1;
pub const SQL_BINARY: SQLSMALLINT = -2;
pub const SQL_VARBINARY: SQLSMALLINT = -3;
pub const SQL_LONGVARBINARY: SQLSMALLINT = -4;
pub const SQL_BIGINT: SQLSMALLINT = -5;
pub const SQL_WCHAR: SQLSMALLINT = -8;
pub const SQL_WVARCHAR: SQLSMALLINT = -9;
/// DB2 `DECFLOAT`.
pub const SQL_DECFLOAT: SQLSMALLINT = -360;

// C data types.
pub const SQL_C_WCHAR: SQLSMALLINT = SQL_WCHAR;
pub const SQL_C_LONG: SQLSMALLINT = SQL_INTEGER;
pub const SQL_C_SHORT: SQLSMALLINT = SQL_SMALLINT;
pub const SQL_C_DOUBLE: SQLSMALLINT = SQL_DOUBLE;
pub const SQL_C_SBIGINT: SQLSMALLINT = SQL_BIGINT - 20;
