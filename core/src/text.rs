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

//! Conversion between the UTF-8 text of the public API and the UTF-16 text
//! exchanged with the driver.

use crate::error::{Error, Result, Status};
use crate::ffi::constants::{SQL_NO_TOTAL, SQL_NTS};
use crate::ffi::{SQLLEN, SQLWCHAR};

/// Encode `text` as UTF-16 without a terminator.
pub fn to_utf16(text: &str) -> Vec<SQLWCHAR> {
    text.encode_utf16().collect()
}

/// Encode `text` as UTF-16 followed by a NUL terminator.
pub fn to_utf16_nul(text: &str) -> Vec<SQLWCHAR> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Number of UTF-16 code units needed to encode `text`.
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Decode UTF-16 text up to the first NUL, or the whole slice if there is
/// none.
pub fn from_utf16_nul(buffer: &[SQLWCHAR]) -> Result<String> {
    let end = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
    Ok(String::from_utf16(&buffer[..end])?)
}

/// Write `text` into the fixed-width cell `dst`, NUL terminated.
///
/// Returns the number of code units written, without the terminator.
pub fn encode_into(text: &str, dst: &mut [SQLWCHAR]) -> Result<usize> {
    let mut written = 0;
    for unit in text.encode_utf16() {
        // One slot is reserved for the terminator.
        if written + 1 >= dst.len() {
            return Err(Error::with_message_and_status(
                format!(
                    "value of {} UTF-16 units does not fit a column of width {}",
                    utf16_len(text),
                    dst.len().saturating_sub(1)
                ),
                Status::InvalidArguments,
            ));
        }
        dst[written] = unit;
        written += 1;
    }
    if let Some(terminator) = dst.get_mut(written) {
        *terminator = 0;
    }
    Ok(written)
}

/// A text cell decoded from a bound receiving buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCell {
    pub value: String,
    /// The driver had more data than fit the cell.
    pub truncated: bool,
}

/// Decode one cell of a column-wise bound `SQL_C_WCHAR` buffer.
///
/// `indicator` is the length in bytes the driver reported for the value.
/// It is clamped to the cell, which always keeps one unit for the
/// terminator.
pub fn decode_cell(cell: &[SQLWCHAR], indicator: SQLLEN) -> Result<DecodedCell> {
    let capacity = cell.len().saturating_sub(1);
    let reported = match indicator {
        SQL_NTS | SQL_NO_TOTAL => None,
        n if n < 0 => {
            return Err(Error::with_message_and_status(
                format!("unexpected length indicator {n} for a text cell"),
                Status::Fetch,
            ))
        }
        n => Some(n as usize / std::mem::size_of::<SQLWCHAR>()),
    };

    let (units, truncated) = match reported {
        Some(len) if len <= capacity => (&cell[..len], false),
        Some(_) => (nul_terminated(&cell[..capacity]), true),
        None => (nul_terminated(&cell[..capacity]), indicator == SQL_NO_TOTAL),
    };

    let value = if truncated {
        // A cut may fall inside a surrogate pair.
        String::from_utf16_lossy(units)
    } else {
        String::from_utf16(units)?
    };
    Ok(DecodedCell { value, truncated })
}

fn nul_terminated(units: &[SQLWCHAR]) -> &[SQLWCHAR] {
    let end = units.iter().position(|&c| c == 0).unwrap_or(units.len());
    &units[..end]
}
