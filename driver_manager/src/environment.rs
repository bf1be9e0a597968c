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

use std::ffi::OsStr;
use std::ptr::null_mut;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use odbc_bulk_core::error::{Error, Result, Status};
use odbc_bulk_core::ffi::constants::{
    SQL_ATTR_ODBC_VERSION, SQL_HANDLE_ENV, SQL_IS_UINTEGER, SQL_OV_ODBC3,
};
use odbc_bulk_core::ffi::{sql_succeeded, OdbcApi, SQLHENV, SQLPOINTER};

use crate::error::failure;
use crate::search;

struct EnvHandle(SQLHENV);

// The environment handle is only used while the registry lock is held.
unsafe impl Send for EnvHandle {}

struct EnvironmentState {
    env: Option<EnvHandle>,
    conn_count: usize,
}

struct RegistryInner {
    api: OdbcApi,
    state: Mutex<EnvironmentState>,
    // The dynamic library must stay loaded while any function of `api` can
    // be called, and must be dropped after everything else in this struct.
    _library: Option<libloading::Library>,
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(env) = state.env.take() {
            unsafe { (self.api.SQLFreeHandle)(SQL_HANDLE_ENV, env.0) };
        }
    }
}

/// The process-wide driver-manager environment, shared by every
/// connection opened through it.
///
/// The environment handle is allocated when the first connection opens and
/// freed when the last one closes, so it exists exactly while at least one
/// connection is open. A registry is cheap to clone; clones share the same
/// environment.
#[derive(Clone)]
pub struct EnvironmentRegistry {
    inner: Arc<RegistryInner>,
}

impl std::fmt::Debug for EnvironmentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentRegistry")
            .field("connection_count", &self.connection_count())
            .field("dynamic", &self.inner._library.is_some())
            .finish()
    }
}

static GLOBAL: Mutex<Option<EnvironmentRegistry>> = Mutex::new(None);

impl EnvironmentRegistry {
    fn new(api: OdbcApi, library: Option<libloading::Library>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                api,
                state: Mutex::new(EnvironmentState {
                    env: None,
                    conn_count: 0,
                }),
                _library: library,
            }),
        }
    }

    /// Use a function table supplied in-process, e.g. by a statically
    /// linked driver.
    pub fn load_static(api: OdbcApi) -> Self {
        Self::new(api, None)
    }

    /// Load a driver manager from a dynamic library filename.
    ///
    /// The `filename` argument may be either:
    /// - A library filename;
    /// - The absolute path to the library;
    /// - A relative (to the current working directory) path to the library.
    pub fn load_dynamic_from_filename(filename: impl AsRef<OsStr>) -> Result<Self> {
        let library = unsafe { libloading::Library::new(filename.as_ref())? };
        let api = unsafe { OdbcApi::load(&library)? };
        debug!(library = ?filename.as_ref(), "driver manager loaded");
        Ok(Self::new(api, Some(library)))
    }

    /// Load a driver manager from a dynamic library name.
    ///
    /// The `name` should not include any platform-specific prefixes or
    /// suffixes. For example, use `odbc` rather than `libodbc.so`.
    pub fn load_dynamic_from_name(name: impl AsRef<str>) -> Result<Self> {
        let filename = libloading::library_filename(name.as_ref());
        Self::load_dynamic_from_filename(filename)
    }

    /// Load the first driver manager found: the library named by
    /// `ODBC_BULK_DRIVER_MANAGER`, or else one of the well-known names.
    pub fn load_default() -> Result<Self> {
        let mut failures = Vec::new();
        for candidate in search::library_candidates() {
            match Self::load_dynamic_from_filename(&candidate) {
                Ok(registry) => return Ok(registry),
                Err(error) if search::is_path(&candidate) => return Err(error),
                Err(error) => {
                    failures.push(format!("{}: {}", candidate.to_string_lossy(), error.message))
                }
            }
        }
        Err(Error::with_message_and_status(
            format!(
                "no ODBC driver manager could be loaded\n{}",
                failures.join("\n")
            ),
            Status::Connection,
        ))
    }

    /// The registry used by [crate::Connection::connect], loaded with
    /// [Self::load_default] on first use.
    pub fn global() -> Result<Self> {
        let mut guard = GLOBAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(registry) = guard.as_ref() {
            return Ok(registry.clone());
        }
        let registry = Self::load_default()?;
        *guard = Some(registry.clone());
        Ok(registry)
    }

    /// Make `registry` the one returned by [Self::global].
    ///
    /// Fails if a global registry is already in use by an open connection.
    pub fn install_global(registry: EnvironmentRegistry) -> Result<()> {
        let mut guard = GLOBAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(current) = guard.as_ref() {
            if current.connection_count() > 0 {
                return Err(Error::with_message_and_status(
                    "the global environment has open connections",
                    Status::InvalidArguments,
                ));
            }
        }
        *guard = Some(registry);
        Ok(())
    }

    pub fn api(&self) -> &OdbcApi {
        &self.inner.api
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.lock().conn_count
    }

    /// Whether the environment handle is currently allocated.
    pub fn has_environment(&self) -> bool {
        self.lock().env.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, EnvironmentState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `open` with the environment handle, creating the environment if
    /// needed, and count a connection if it succeeds.
    ///
    /// The registry stays locked for the whole call so that no concurrent
    /// close can free the environment underneath it.
    pub(crate) fn open<T>(&self, open: impl FnOnce(SQLHENV) -> Result<T>) -> Result<T> {
        let mut state = self.lock();
        let env = match &state.env {
            Some(env) => env.0,
            None => {
                let env = self.allocate_environment()?;
                state.env = Some(EnvHandle(env));
                env
            }
        };

        match open(env) {
            Ok(value) => {
                state.conn_count += 1;
                debug!(connections = state.conn_count, "connection registered");
                Ok(value)
            }
            Err(error) => {
                if state.conn_count == 0 {
                    self.free_environment(&mut state);
                }
                Err(error)
            }
        }
    }

    /// Count a connection as closed, freeing the environment after the
    /// last one.
    pub(crate) fn release(&self) {
        let mut state = self.lock();
        state.conn_count = state.conn_count.saturating_sub(1);
        debug!(connections = state.conn_count, "connection released");
        if state.conn_count == 0 {
            self.free_environment(&mut state);
        }
    }

    fn allocate_environment(&self) -> Result<SQLHENV> {
        let api = &self.inner.api;
        let mut env: SQLHENV = null_mut();
        let ret = unsafe { (api.SQLAllocHandle)(SQL_HANDLE_ENV, null_mut(), &mut env) };
        if !sql_succeeded(ret) || env.is_null() {
            return Err(Error::with_message_and_status(
                format!("SQLAllocHandle for the environment failed (return code {ret})"),
                Status::Connection,
            ));
        }

        let ret = unsafe {
            (api.SQLSetEnvAttr)(
                env,
                SQL_ATTR_ODBC_VERSION,
                SQL_OV_ODBC3 as usize as SQLPOINTER,
                SQL_IS_UINTEGER,
            )
        };
        if !sql_succeeded(ret) {
            let error = failure(
                ret,
                api,
                SQL_HANDLE_ENV,
                env,
                Status::Connection,
                "SQLSetEnvAttr(SQL_ATTR_ODBC_VERSION)",
            );
            unsafe { (api.SQLFreeHandle)(SQL_HANDLE_ENV, env) };
            return Err(error);
        }

        debug!("environment allocated");
        Ok(env)
    }

    fn free_environment(&self, state: &mut EnvironmentState) {
        if let Some(env) = state.env.take() {
            let ret = unsafe { (self.inner.api.SQLFreeHandle)(SQL_HANDLE_ENV, env.0) };
            if sql_succeeded(ret) {
                debug!("environment freed");
            } else {
                warn!(ret, "SQLFreeHandle for the environment failed");
            }
        }
    }
}
