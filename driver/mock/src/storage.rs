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

//! In-memory databases, tables and typed values.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use odbc_bulk_core::error::DiagnosticRecord;
use odbc_bulk_core::ffi::constants::*;
use odbc_bulk_core::ffi::SQLSMALLINT;

/// Column types understood by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Char(usize),
    Varchar(usize),
    NVarchar(usize),
    Integer,
    SmallInt,
    BigInt,
    Real,
    Double,
    Float,
    Decimal { precision: usize, scale: usize },
    DecFloat,
    Date,
    Time,
    Timestamp,
    Blob(usize),
}

impl SqlType {
    pub fn concise_type(&self) -> SQLSMALLINT {
        match self {
            Self::Char(_) => SQL_CHAR,
            Self::Varchar(_) => SQL_VARCHAR,
            Self::NVarchar(_) => SQL_WVARCHAR,
            Self::Integer => SQL_INTEGER,
            Self::SmallInt => SQL_SMALLINT,
            Self::BigInt => SQL_BIGINT,
            Self::Real => SQL_REAL,
            Self::Double => SQL_DOUBLE,
            Self::Float => SQL_FLOAT,
            Self::Decimal { .. } => SQL_DECIMAL,
            Self::DecFloat => SQL_DECFLOAT,
            Self::Date => SQL_TYPE_DATE,
            Self::Time => SQL_TYPE_TIME,
            Self::Timestamp => SQL_TYPE_TIMESTAMP,
            Self::Blob(_) => SQL_LONGVARBINARY,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Char(_) => "CHAR",
            Self::Varchar(_) => "VARCHAR",
            Self::NVarchar(_) => "NVARCHAR",
            Self::Integer => "INTEGER",
            Self::SmallInt => "SMALLINT",
            Self::BigInt => "BIGINT",
            Self::Real => "REAL",
            Self::Double => "DOUBLE",
            Self::Float => "FLOAT",
            Self::Decimal { .. } => "DECIMAL",
            Self::DecFloat => "DECFLOAT",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Timestamp => "TIMESTAMP",
            Self::Blob(_) => "BLOB",
        }
    }

    pub fn display_size(&self) -> usize {
        match self {
            Self::Char(n) | Self::Varchar(n) | Self::NVarchar(n) => *n,
            Self::Integer => 11,
            Self::SmallInt => 6,
            Self::BigInt => 20,
            Self::Real => 14,
            Self::Double | Self::Float => 24,
            Self::Decimal { precision, .. } => precision + 2,
            Self::DecFloat => 42,
            Self::Date => 10,
            Self::Time => 8,
            Self::Timestamp => 26,
            Self::Blob(n) => n * 2,
        }
    }

    pub fn precision(&self) -> usize {
        match self {
            Self::Integer => 10,
            Self::SmallInt => 5,
            Self::BigInt => 19,
            Self::Real => 24,
            Self::Double | Self::Float => 53,
            Self::Decimal { precision, .. } => *precision,
            Self::DecFloat => 34,
            _ => 0,
        }
    }

    pub fn scale(&self) -> usize {
        match self {
            Self::Decimal { scale, .. } => *scale,
            _ => 0,
        }
    }

    fn max_chars(&self) -> Option<usize> {
        match self {
            Self::Char(n) | Self::Varchar(n) | Self::NVarchar(n) => Some(*n),
            _ => None,
        }
    }
}

/// A stored cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Double(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The value as text, the way it is presented to a character buffer.
    pub fn render(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Integer(i) => Some(i.to_string()),
            Self::Double(f) => Some(f.to_string()),
            Self::Text(s) => Some(s.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: SqlType,
    pub not_null: bool,
    pub unique: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<ColumnDef>,
    pub rows: Vec<Vec<Value>>,
}

/// Failures a test can inject into a database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Faults {
    /// `SQLEndTran(SQL_ROLLBACK)` fails and leaves the data untouched.
    pub fail_rollback: bool,
    /// `SQLDisconnect` fails.
    pub fail_disconnect: bool,
    /// Switching autocommit on with `SQLSetConnectAttrW` fails.
    pub fail_autocommit_on: bool,
    /// `SQLAllocHandle(SQL_HANDLE_STMT)` fails.
    pub fail_statement_alloc: bool,
    /// Zero-based index of a result row that comes back with
    /// `SQL_ROW_ERROR`.
    pub row_error_at: Option<usize>,
}

#[derive(Debug, Default)]
pub struct Database {
    pub tables: HashMap<String, Table>,
    pub faults: Faults,
    pub fetch_calls: usize,
    pub open_statements: usize,
}

static DATABASES: Mutex<Option<HashMap<String, Database>>> = Mutex::new(None);

pub struct Databases(MutexGuard<'static, Option<HashMap<String, Database>>>);

impl Databases {
    /// The database called `name`, created empty on first use.
    pub fn get(&mut self, name: &str) -> &mut Database {
        self.0
            .get_or_insert_with(HashMap::new)
            .entry(name.to_string())
            .or_default()
    }

    pub fn remove(&mut self, name: &str) {
        if let Some(map) = self.0.as_mut() {
            map.remove(name);
        }
    }
}

pub fn databases() -> Databases {
    Databases(
        DATABASES
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()),
    )
}

pub(crate) fn diag(state: &str, native_error: i32, message: impl Into<String>) -> DiagnosticRecord {
    DiagnosticRecord {
        state: state.to_string(),
        native_error,
        message: message.into(),
    }
}

/// Convert `value` for storage in `column`, checking range and length.
pub fn coerce(column: &ColumnDef, value: Value) -> Result<Value, DiagnosticRecord> {
    let overflow = || {
        diag(
            "22003",
            -406,
            format!("value out of range for column {}", column.name),
        )
    };
    let invalid = |text: &str| {
        diag(
            "22018",
            -420,
            format!("invalid value '{text}' for column {}", column.name),
        )
    };

    if value.is_null() {
        if column.not_null {
            return Err(diag(
                "23502",
                -407,
                format!("NULL assigned to NOT NULL column {}", column.name),
            ));
        }
        return Ok(Value::Null);
    }

    let coerced = match column.sql_type {
        SqlType::Integer | SqlType::SmallInt | SqlType::BigInt => {
            let int = match value {
                Value::Integer(i) => i,
                Value::Double(f) if f.fract() == 0.0 && f.abs() < 9.3e18 => f as i64,
                Value::Double(_) => return Err(overflow()),
                Value::Text(s) => s.trim().parse::<i64>().map_err(|_| invalid(&s))?,
                Value::Null => return Ok(Value::Null),
            };
            let in_range = match column.sql_type {
                SqlType::Integer => i32::try_from(int).is_ok(),
                SqlType::SmallInt => i16::try_from(int).is_ok(),
                _ => true,
            };
            if !in_range {
                return Err(overflow());
            }
            Value::Integer(int)
        }
        SqlType::Real | SqlType::Double | SqlType::Float => match value {
            Value::Integer(i) => Value::Double(i as f64),
            Value::Double(f) => Value::Double(f),
            Value::Text(s) => Value::Double(s.trim().parse::<f64>().map_err(|_| invalid(&s))?),
            Value::Null => Value::Null,
        },
        SqlType::Decimal { precision, scale } => {
            let text = value.render().unwrap_or_default();
            let (int_digits, frac_digits) = decimal_digits(&text).ok_or_else(|| invalid(&text))?;
            if int_digits > precision - scale.min(precision) || frac_digits > scale {
                return Err(overflow());
            }
            Value::Text(text)
        }
        SqlType::DecFloat => {
            let text = value.render().unwrap_or_default();
            let (int_digits, frac_digits) = decimal_digits(&text).ok_or_else(|| invalid(&text))?;
            if int_digits + frac_digits > 34 {
                return Err(overflow());
            }
            Value::Text(text)
        }
        _ => {
            let text = value.render().unwrap_or_default();
            if let Some(max) = column.sql_type.max_chars() {
                if text.chars().count() > max {
                    return Err(diag(
                        "22001",
                        -302,
                        format!("value too long for column {}", column.name),
                    ));
                }
            }
            Value::Text(text)
        }
    };
    Ok(coerced)
}

/// Integer and fraction digit counts of a decimal literal.
fn decimal_digits(text: &str) -> Option<(usize, usize)> {
    let digits = text.trim().trim_start_matches(['-', '+']);
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, f),
        None => (digits, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((int_part.trim_start_matches('0').len(), frac_part.len()))
}

impl Table {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Append a row given in table column order, enforcing constraints.
    pub fn insert(&mut self, row: Vec<Value>) -> Result<(), DiagnosticRecord> {
        for (index, column) in self.columns.iter().enumerate() {
            if !column.unique || row[index].is_null() {
                continue;
            }
            if self.rows.iter().any(|existing| existing[index] == row[index]) {
                return Err(diag(
                    "23505",
                    -803,
                    format!("duplicate value in unique column {}", column.name),
                ));
            }
        }
        self.rows.push(row);
        Ok(())
    }
}
