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

#![allow(non_camel_case_types, non_snake_case)]

use std::fmt;

use super::types::*;

macro_rules! odbc_api {
    ($( $func_name:ident ; $type_name:ident ; $( $arg:ty ),* );* $(;)?) => {
        $(
            pub type $type_name = unsafe extern "system" fn($( $arg ),*) -> SQLRETURN;
        )*

        /// The call-level interface functions the engine calls, resolved
        /// either from a loaded driver manager library or supplied by an
        /// in-process driver.
        #[derive(Clone, Copy)]
        pub struct OdbcApi {
            $( pub $func_name: $type_name, )*
        }

        impl OdbcApi {
            /// Resolve every function from `library`.
            ///
            /// # Safety
            ///
            /// The library must export the ODBC 3.x functions with their
            /// standard signatures and must outlive the returned table.
            #[cfg(feature = "driver_manager")]
            pub unsafe fn load(library: &libloading::Library) -> crate::error::Result<Self> {
                Ok(Self {
                    $(
                        $func_name: *library
                            .get::<$type_name>(concat!(stringify!($func_name), "\0").as_bytes())?,
                    )*
                })
            }
        }
    };
}

odbc_api!(
    SQLAllocHandle ; FuncAllocHandle ; SQLSMALLINT, SQLHANDLE, *mut SQLHANDLE;
    SQLFreeHandle ; FuncFreeHandle ; SQLSMALLINT, SQLHANDLE;
    SQLSetEnvAttr ; FuncSetEnvAttr ; SQLHENV, SQLINTEGER, SQLPOINTER, SQLINTEGER;
    SQLSetConnectAttrW ; FuncSetConnectAttr ; SQLHDBC, SQLINTEGER, SQLPOINTER, SQLINTEGER;
    SQLGetConnectAttrW ; FuncGetConnectAttr ; SQLHDBC, SQLINTEGER, SQLPOINTER, SQLINTEGER, *mut SQLINTEGER;
    SQLDriverConnectW ; FuncDriverConnect ; SQLHDBC, SQLHWND, *const SQLWCHAR, SQLSMALLINT, *mut SQLWCHAR, SQLSMALLINT, *mut SQLSMALLINT, SQLUSMALLINT;
    SQLDisconnect ; FuncDisconnect ; SQLHDBC;
    SQLExecDirectW ; FuncExecDirect ; SQLHSTMT, *const SQLWCHAR, SQLINTEGER;
    SQLPrepareW ; FuncPrepare ; SQLHSTMT, *const SQLWCHAR, SQLINTEGER;
    SQLExecute ; FuncExecute ; SQLHSTMT;
    SQLNumResultCols ; FuncNumResultCols ; SQLHSTMT, *mut SQLSMALLINT;
    SQLRowCount ; FuncRowCount ; SQLHSTMT, *mut SQLLEN;
    SQLColAttributeW ; FuncColAttribute ; SQLHSTMT, SQLUSMALLINT, SQLUSMALLINT, SQLPOINTER, SQLSMALLINT, *mut SQLSMALLINT, *mut SQLLEN;
    SQLSetStmtAttrW ; FuncSetStmtAttr ; SQLHSTMT, SQLINTEGER, SQLPOINTER, SQLINTEGER;
    SQLBindCol ; FuncBindCol ; SQLHSTMT, SQLUSMALLINT, SQLSMALLINT, SQLPOINTER, SQLLEN, *mut SQLLEN;
    SQLFetchScroll ; FuncFetchScroll ; SQLHSTMT, SQLSMALLINT, SQLLEN;
    SQLBindParameter ; FuncBindParameter ; SQLHSTMT, SQLUSMALLINT, SQLSMALLINT, SQLSMALLINT, SQLSMALLINT, SQLULEN, SQLSMALLINT, SQLPOINTER, SQLLEN, *mut SQLLEN;
    SQLEndTran ; FuncEndTran ; SQLSMALLINT, SQLHANDLE, SQLSMALLINT;
    SQLGetDiagRecW ; FuncGetDiagRec ; SQLSMALLINT, SQLHANDLE, SQLSMALLINT, *mut SQLWCHAR, *mut SQLINTEGER, *mut SQLWCHAR, SQLSMALLINT, *mut SQLSMALLINT;
);

impl fmt::Debug for OdbcApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OdbcApi").finish_non_exhaustive()
    }
}
