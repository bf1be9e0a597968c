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

//! Error, status and result types.

use std::fmt::{self, Display};
use std::string::FromUtf16Error;

use arrow_schema::ArrowError;

/// Kind of failure of an operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    /// Connecting failed, or a closed connection was used.
    Connection,
    /// Result or table metadata could not be read, or the table does not
    /// have the expected shape.
    Schema,
    /// A result column has a type the reader cannot bind.
    UnsupportedType,
    /// Fetching rows failed, or a row came back with an error status.
    Fetch,
    /// Binding a column or parameter buffer was rejected by the driver.
    Bind,
    /// Executing a statement failed.
    Exec,
    /// Commit failed, or rollback failed after an execution error.
    Transaction,
    /// The column arrays of a write do not agree in length.
    Arity,
    /// A write column carries a type tag that is not recognized.
    UnknownColumnType,
    /// The operation was cancelled through an interrupt hook.
    Cancelled,
    /// The arguments are invalid, likely a programming error.
    InvalidArguments,
    /// An error internal to this library or the driver manager occurred.
    Internal,
}

/// One record of the driver's diagnostic area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    /// Five character SQLSTATE.
    pub state: String,
    /// Driver specific error code.
    pub native_error: i32,
    pub message: String,
}

impl Display for DiagnosticRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.state, self.native_error, self.message)
    }
}

/// An odbc_bulk error.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Error {
    /// The error message.
    pub message: String,
    /// The status of the operation.
    pub status: Status,
    /// Native error code of the first diagnostic record, if any.
    pub vendor_code: i32,
    /// SQLSTATE of the first diagnostic record.
    /// If not set, it is `\0\0\0\0\0`.
    pub sqlstate: [u8; 5],
    /// Every diagnostic record the driver reported for the failing call.
    pub diagnostics: Vec<DiagnosticRecord>,
    rollback_failed: bool,
}

/// Result type wrapping [Error].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn with_message_and_status(message: impl Into<String>, status: Status) -> Self {
        Self {
            message: message.into(),
            status,
            vendor_code: 0,
            sqlstate: [0; 5],
            diagnostics: Vec::new(),
            rollback_failed: false,
        }
    }

    /// Build an error from the diagnostic records of a failed driver call.
    ///
    /// The message is `context` followed by each record rendered as
    /// `state:native:text`, one per line.
    pub fn from_diagnostics(
        context: impl Into<String>,
        status: Status,
        diagnostics: Vec<DiagnosticRecord>,
    ) -> Self {
        let mut message = context.into();
        for record in &diagnostics {
            message.push('\n');
            message.push_str(&record.to_string());
        }

        let mut sqlstate = [0; 5];
        let mut vendor_code = 0;
        if let Some(first) = diagnostics.first() {
            for (dst, src) in sqlstate.iter_mut().zip(first.state.bytes()) {
                *dst = src;
            }
            vendor_code = first.native_error;
        }

        Self {
            message,
            status,
            vendor_code,
            sqlstate,
            diagnostics,
            rollback_failed: false,
        }
    }

    /// Reclassify the error, keeping its message and diagnostics.
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Compound an execution error with the failure of the rollback that
    /// followed it.
    pub fn rollback_failure(exec: Error, rollback: Error) -> Self {
        let mut diagnostics = exec.diagnostics;
        diagnostics.extend(rollback.diagnostics);
        Self {
            message: format!(
                "{}\nrollback after the failed insert also failed: {}",
                exec.message, rollback.message
            ),
            status: Status::Transaction,
            vendor_code: exec.vendor_code,
            sqlstate: exec.sqlstate,
            diagnostics,
            rollback_failed: true,
        }
    }

    /// Whether a rollback was attempted and failed, leaving the
    /// transaction state of the connection unknown.
    pub fn rollback_failed(&self) -> bool {
        self.rollback_failed
    }

    /// The SQLSTATE as text, if one was reported.
    pub fn sqlstate_str(&self) -> Option<&str> {
        if self.sqlstate == [0; 5] {
            return None;
        }
        std::str::from_utf8(&self.sqlstate).ok()
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?}: {} (sqlstate: {}, vendor_code: {})",
            self.status,
            self.message,
            self.sqlstate_str().unwrap_or("none"),
            self.vendor_code
        )
    }
}

impl std::error::Error for Error {}

impl From<ArrowError> for Error {
    fn from(value: ArrowError) -> Self {
        Self::with_message_and_status(value.to_string(), Status::Internal)
    }
}

impl From<FromUtf16Error> for Error {
    fn from(value: FromUtf16Error) -> Self {
        Self::with_message_and_status(
            format!("Error while decoding UTF-16: {value}"),
            Status::Internal,
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::with_message_and_status(value.to_string(), Status::Internal)
    }
}

#[cfg(feature = "driver_manager")]
impl From<libloading::Error> for Error {
    fn from(value: libloading::Error) -> Self {
        Self::with_message_and_status(
            format!("Error with dynamic library: {value}"),
            Status::Internal,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(state: &str, native_error: i32, message: &str) -> DiagnosticRecord {
        DiagnosticRecord {
            state: state.to_string(),
            native_error,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_from_diagnostics() {
        let error = Error::from_diagnostics(
            "SQLExecute failed",
            Status::Exec,
            vec![
                record("23505", -803, "duplicate key"),
                record("01000", 0, "statement rolled back"),
            ],
        );
        assert_eq!(error.status, Status::Exec);
        assert_eq!(error.vendor_code, -803);
        assert_eq!(&error.sqlstate, b"23505");
        assert_eq!(error.sqlstate_str(), Some("23505"));
        assert_eq!(
            error.message,
            "SQLExecute failed\n23505:-803:duplicate key\n01000:0:statement rolled back"
        );
        assert!(!error.rollback_failed());
    }

    #[test]
    fn test_without_diagnostics() {
        let error = Error::from_diagnostics("SQLFetchScroll failed", Status::Fetch, vec![]);
        assert_eq!(error.message, "SQLFetchScroll failed");
        assert_eq!(error.sqlstate_str(), None);
        assert_eq!(error.vendor_code, 0);
    }

    #[test]
    fn test_rollback_failure() {
        let exec = Error::from_diagnostics(
            "SQLExecute failed",
            Status::Exec,
            vec![record("23505", -803, "duplicate key")],
        );
        let rollback = Error::from_diagnostics(
            "SQLEndTran failed",
            Status::Transaction,
            vec![record("08S01", -30081, "communication link failure")],
        );
        let error = Error::rollback_failure(exec, rollback);
        assert_eq!(error.status, Status::Transaction);
        assert!(error.rollback_failed());
        assert_eq!(error.sqlstate_str(), Some("23505"));
        assert_eq!(error.diagnostics.len(), 2);
        assert!(error.message.contains("communication link failure"));
    }

    #[test]
    fn test_display() {
        let error = Error::with_message_and_status("boom", Status::Internal);
        assert_eq!(
            error.to_string(),
            "Internal: boom (sqlstate: none, vendor_code: 0)"
        );
    }
}
