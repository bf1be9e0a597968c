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

//! Process-wide settings: timeouts and default chunk sizes.
//!
//! Settings start at their defaults and change only through the setters of
//! this module or by loading a profile. Operations take a [snapshot] when
//! they start, so a concurrent change never affects a running call.
//!
//! A profile is a TOML file:
//!
//! ```toml
//! version = 1
//!
//! [settings]
//! login_timeout = 30
//! read_chunk_size = 5000
//! ```

use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::RwLock;

use toml::de::{DeTable, DeValue};
use tracing::debug;

use crate::constants::{
    DEFAULT_CONNECTION_TIMEOUT, DEFAULT_LOGIN_TIMEOUT, DEFAULT_READ_CHUNK_SIZE,
    DEFAULT_WRITE_CHUNK_SIZE, ENV_CONNECTION_TIMEOUT, ENV_LOGIN_TIMEOUT, ENV_READ_CHUNK_SIZE,
    ENV_WRITE_CHUNK_SIZE,
};
use crate::error::{Error, Result, Status};

/// Setting key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    /// Seconds to wait for a login to complete.
    LoginTimeout,
    /// Seconds to wait for any request on a connection.
    ConnectionTimeout,
    /// Rows fetched per round trip when reading.
    ReadChunkSize,
    /// Rows sent per batched insert when writing Arrow data.
    WriteChunkSize,
}

impl SettingKey {
    pub const ALL: [SettingKey; 4] = [
        SettingKey::LoginTimeout,
        SettingKey::ConnectionTimeout,
        SettingKey::ReadChunkSize,
        SettingKey::WriteChunkSize,
    ];

    /// Environment variable overriding this setting.
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::LoginTimeout => ENV_LOGIN_TIMEOUT,
            Self::ConnectionTimeout => ENV_CONNECTION_TIMEOUT,
            Self::ReadChunkSize => ENV_READ_CHUNK_SIZE,
            Self::WriteChunkSize => ENV_WRITE_CHUNK_SIZE,
        }
    }
}

impl AsRef<str> for SettingKey {
    fn as_ref(&self) -> &str {
        match self {
            Self::LoginTimeout => "login_timeout",
            Self::ConnectionTimeout => "connection_timeout",
            Self::ReadChunkSize => "read_chunk_size",
            Self::WriteChunkSize => "write_chunk_size",
        }
    }
}

impl FromStr for SettingKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_ref() == s)
            .ok_or_else(|| {
                Error::with_message_and_status(
                    format!("Unknown setting: {s}"),
                    Status::InvalidArguments,
                )
            })
    }
}

/// Timeouts and default chunk sizes. Every value is at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub login_timeout: u32,
    pub connection_timeout: u32,
    pub read_chunk_size: usize,
    pub write_chunk_size: usize,
}

const DEFAULT_SETTINGS: Settings = Settings {
    login_timeout: DEFAULT_LOGIN_TIMEOUT,
    connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
    read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
    write_chunk_size: DEFAULT_WRITE_CHUNK_SIZE,
};

impl Default for Settings {
    fn default() -> Self {
        DEFAULT_SETTINGS
    }
}

impl Settings {
    /// Set `key` to `value`, rejecting zero and values out of range.
    pub fn set(&mut self, key: SettingKey, value: u64) -> Result<()> {
        if value == 0 {
            return Err(Error::with_message_and_status(
                format!("{} must be greater than zero", key.as_ref()),
                Status::InvalidArguments,
            ));
        }
        let out_of_range = |_| {
            Error::with_message_and_status(
                format!("{} value {value} is out of range", key.as_ref()),
                Status::InvalidArguments,
            )
        };
        match key {
            SettingKey::LoginTimeout => self.login_timeout = value.try_into().map_err(out_of_range)?,
            SettingKey::ConnectionTimeout => {
                self.connection_timeout = value.try_into().map_err(out_of_range)?
            }
            SettingKey::ReadChunkSize => {
                self.read_chunk_size = value.try_into().map_err(out_of_range)?
            }
            SettingKey::WriteChunkSize => {
                self.write_chunk_size = value.try_into().map_err(out_of_range)?
            }
        }
        Ok(())
    }

    pub fn get(&self, key: SettingKey) -> u64 {
        match key {
            SettingKey::LoginTimeout => self.login_timeout.into(),
            SettingKey::ConnectionTimeout => self.connection_timeout.into(),
            SettingKey::ReadChunkSize => self.read_chunk_size as u64,
            SettingKey::WriteChunkSize => self.write_chunk_size as u64,
        }
    }

    /// Apply the `[settings]` table of a TOML profile.
    pub fn apply_toml(&mut self, contents: &str) -> Result<()> {
        let profile = DeTable::parse(contents)
            .map_err(|e| Error::with_message_and_status(e.to_string(), Status::InvalidArguments))?;

        let version = profile
            .get_ref()
            .get("version")
            .and_then(|v| v.get_ref().as_integer())
            .map(|v| v.as_str())
            .unwrap_or("1");

        if version != "1" {
            return Err(Error::with_message_and_status(
                format!("unsupported settings profile version '{version}', expected '1'"),
                Status::InvalidArguments,
            ));
        }

        let Some(table) = profile.get_ref().get("settings") else {
            return Ok(());
        };
        let table = table.get_ref().as_table().ok_or_else(|| {
            Error::with_message_and_status(
                "'settings' must be a table".to_string(),
                Status::InvalidArguments,
            )
        })?;

        for (key, value) in table.iter() {
            let name: &str = key.get_ref();
            let setting: SettingKey = name.parse()?;
            let value = match value.get_ref() {
                DeValue::Integer(i) => i.as_str().parse::<u64>().map_err(|e| {
                    Error::with_message_and_status(
                        format!("invalid value for setting '{name}': {e}"),
                        Status::InvalidArguments,
                    )
                })?,
                other => {
                    return Err(Error::with_message_and_status(
                        format!(
                            "setting '{name}' must be a positive integer, found {}",
                            other.type_str()
                        ),
                        Status::InvalidArguments,
                    ))
                }
            };
            self.set(setting, value)?;
        }
        Ok(())
    }

    /// Apply a TOML profile read from `path`.
    pub fn apply_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::with_message_and_status(
                format!("could not read settings profile '{}': {e}", path.display()),
                Status::InvalidArguments,
            )
        })?;
        self.apply_toml(&contents)
    }

    /// Apply the `ODBC_BULK_*` environment variables that are set.
    pub fn apply_env(&mut self) -> Result<()> {
        for key in SettingKey::ALL {
            let Some(raw) = env::var_os(key.env_var()) else {
                continue;
            };
            let raw = raw.to_string_lossy();
            let value = raw.trim().parse::<u64>().map_err(|e| {
                Error::with_message_and_status(
                    format!("invalid value '{raw}' for {}: {e}", key.env_var()),
                    Status::InvalidArguments,
                )
            })?;
            self.set(key, value)?;
        }
        Ok(())
    }
}

static CURRENT: RwLock<Settings> = RwLock::new(DEFAULT_SETTINGS);

/// The settings in effect right now.
pub fn snapshot() -> Settings {
    *CURRENT.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn update(key: SettingKey, value: u64) -> Result<()> {
    let mut guard = CURRENT
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.set(key, value)?;
    debug!(setting = key.as_ref(), value, "setting changed");
    Ok(())
}

/// Replace every setting at once, returning the previous settings.
pub fn install(settings: Settings) -> Result<Settings> {
    let mut checked = Settings::default();
    for key in SettingKey::ALL {
        checked.set(key, settings.get(key))?;
    }
    let mut guard = CURRENT
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    Ok(std::mem::replace(&mut *guard, checked))
}

/// Load defaults, then the profile at `path` if given, then environment
/// overrides, and install the result.
pub fn load(path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    if let Some(path) = path {
        settings.apply_file(path)?;
    }
    settings.apply_env()?;
    install(settings)?;
    debug!(?settings, "settings loaded");
    Ok(settings)
}

pub fn set_login_timeout(seconds: u32) -> Result<()> {
    update(SettingKey::LoginTimeout, seconds.into())
}

pub fn login_timeout() -> u32 {
    snapshot().login_timeout
}

pub fn set_connection_timeout(seconds: u32) -> Result<()> {
    update(SettingKey::ConnectionTimeout, seconds.into())
}

pub fn connection_timeout() -> u32 {
    snapshot().connection_timeout
}

pub fn set_read_chunk_size(rows: usize) -> Result<()> {
    update(SettingKey::ReadChunkSize, rows as u64)
}

pub fn read_chunk_size() -> usize {
    snapshot().read_chunk_size
}

pub fn set_write_chunk_size(rows: usize) -> Result<()> {
    update(SettingKey::WriteChunkSize, rows as u64)
}

pub fn write_chunk_size() -> usize {
    snapshot().write_chunk_size
}
