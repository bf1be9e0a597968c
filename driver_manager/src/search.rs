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

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use odbc_bulk_core::constants::ENV_DRIVER_MANAGER;

/// Library names of the common driver managers on this platform, in the
/// order they are tried.
pub(crate) fn default_library_names() -> Vec<OsString> {
    #[cfg(target_os = "windows")]
    {
        vec!["odbc32.dll".into()]
    }

    #[cfg(target_os = "macos")]
    {
        vec![
            "libodbc.2.dylib".into(),
            "libodbc.dylib".into(),
            "libiodbc.2.dylib".into(),
            "libiodbc.dylib".into(),
            "/opt/homebrew/lib/libodbc.2.dylib".into(),
            "/usr/local/lib/libodbc.2.dylib".into(),
        ]
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        vec![
            "libodbc.so.2".into(),
            "libodbc.so".into(),
            "libiodbc.so.2".into(),
            "libiodbc.so".into(),
        ]
    }
}

/// Candidates for the driver manager library: the path named by
/// `ODBC_BULK_DRIVER_MANAGER` if it is set, otherwise the platform defaults.
pub(crate) fn library_candidates() -> Vec<OsString> {
    match env::var_os(ENV_DRIVER_MANAGER) {
        Some(path) if !path.is_empty() => vec![path],
        _ => default_library_names(),
    }
}

/// Whether `name` is an explicit path rather than a bare library name.
pub(crate) fn is_path(name: &OsString) -> bool {
    PathBuf::from(name).components().count() > 1
}
