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

//! Column metadata and the mapping from native SQL types to logical column
//! types and receiving buffers.

use std::collections::HashMap;
use std::fmt;
use std::mem::size_of;
use std::str::FromStr;

use arrow_schema::{DataType, Field};

use crate::constants::{
    DATE_FIELD_MIN_LENGTH, DECFLOAT_FIELD_WIDTH, DECIMAL_FIELD_EXTRA, METADATA_TYPE_NAME,
};
use crate::error::{Error, Result, Status};
use crate::ffi::constants::*;
use crate::ffi::{SQLBIGINT, SQLDOUBLE, SQLINTEGER, SQLSMALLINT, SQLWCHAR};

/// Type of a column as seen by callers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LogicalType {
    String,
    Integer,
    Numeric,
}

impl LogicalType {
    /// The canonical type tag of this type.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::String => "character",
            Self::Integer => "integer",
            Self::Numeric => "numeric",
        }
    }

    /// The Arrow type a column of this type converts to.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::String => DataType::Utf8,
            Self::Integer => DataType::Int64,
            Self::Numeric => DataType::Float64,
        }
    }

    /// Logical type of a native SQL type, if the type is supported.
    pub fn of_sql_type(concise_type: SQLSMALLINT) -> Option<Self> {
        match concise_type {
            SQL_CHAR | SQL_VARCHAR | SQL_WCHAR | SQL_WVARCHAR | SQL_DECIMAL | SQL_NUMERIC
            | SQL_DECFLOAT | SQL_TYPE_DATE | SQL_TYPE_TIME | SQL_TYPE_TIMESTAMP => {
                Some(Self::String)
            }
            SQL_SMALLINT | SQL_INTEGER => Some(Self::Integer),
            SQL_BIGINT | SQL_REAL | SQL_DOUBLE | SQL_FLOAT => Some(Self::Numeric),
            _ => None,
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for LogicalType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "character" | "string" => Ok(Self::String),
            "integer" => Ok(Self::Integer),
            "numeric" | "double" => Ok(Self::Numeric),
            _ => Err(Error::with_message_and_status(
                format!("Unknown column type: {s}"),
                Status::UnknownColumnType,
            )),
        }
    }
}

/// Metadata of one result or table column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Type name as reported by the database, e.g. `VARCHAR`.
    pub type_name: String,
    /// `SQL_DESC_CONCISE_TYPE`.
    pub concise_type: SQLSMALLINT,
    /// Maximum number of characters needed to display a value.
    pub display_size: usize,
    pub precision: usize,
    pub scale: SQLSMALLINT,
}

impl ColumnDescriptor {
    /// Arrow field for this column, carrying the native type name as
    /// metadata.
    pub fn to_field(&self) -> Result<Field> {
        let logical = self.logical_type()?;
        let metadata = HashMap::from([(METADATA_TYPE_NAME.to_string(), self.type_name.clone())]);
        Ok(Field::new(&self.name, logical.data_type(), true).with_metadata(metadata))
    }

    pub fn logical_type(&self) -> Result<LogicalType> {
        LogicalType::of_sql_type(self.concise_type).ok_or_else(|| self.unsupported())
    }

    fn unsupported(&self) -> Error {
        Error::with_message_and_status(
            format!(
                "column '{}' has unsupported type {} ({})",
                self.name, self.type_name, self.concise_type
            ),
            Status::UnsupportedType,
        )
    }
}

/// How the values of a result column are received from the driver.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReadBinding {
    /// NUL terminated UTF-16 cells of `width` code units.
    Text { width: usize },
    /// `SQL_C_LONG`.
    Integer,
    /// `SQL_C_SHORT`.
    SmallInt,
    /// `SQL_C_SBIGINT`, surfaced as a numeric column.
    BigInt,
    /// `SQL_C_DOUBLE`.
    Double,
}

impl ReadBinding {
    /// Choose the receiving buffer layout of a result column.
    pub fn for_column(column: &ColumnDescriptor) -> Result<Self> {
        let binding = match column.concise_type {
            SQL_CHAR | SQL_VARCHAR | SQL_WCHAR | SQL_WVARCHAR => Self::Text {
                width: column.display_size + 1,
            },
            SQL_DECIMAL | SQL_NUMERIC => Self::Text {
                width: column.precision + DECIMAL_FIELD_EXTRA,
            },
            SQL_DECFLOAT => Self::Text {
                width: DECFLOAT_FIELD_WIDTH,
            },
            SQL_TYPE_DATE | SQL_TYPE_TIME | SQL_TYPE_TIMESTAMP => Self::Text {
                width: column.display_size.max(DATE_FIELD_MIN_LENGTH),
            },
            SQL_INTEGER => Self::Integer,
            SQL_SMALLINT => Self::SmallInt,
            SQL_BIGINT => Self::BigInt,
            SQL_REAL | SQL_DOUBLE | SQL_FLOAT => Self::Double,
            _ => return Err(column.unsupported()),
        };
        Ok(binding)
    }

    /// The C type the column is bound as.
    pub fn c_type(&self) -> SQLSMALLINT {
        match self {
            Self::Text { .. } => SQL_C_WCHAR,
            Self::Integer => SQL_C_LONG,
            Self::SmallInt => SQL_C_SHORT,
            Self::BigInt => SQL_C_SBIGINT,
            Self::Double => SQL_C_DOUBLE,
        }
    }

    /// Size in bytes of one row of the receiving buffer.
    pub fn element_size(&self) -> usize {
        match self {
            Self::Text { width } => width * size_of::<SQLWCHAR>(),
            Self::Integer => size_of::<SQLINTEGER>(),
            Self::SmallInt => size_of::<SQLSMALLINT>(),
            Self::BigInt => size_of::<SQLBIGINT>(),
            Self::Double => size_of::<SQLDOUBLE>(),
        }
    }

    pub fn logical_type(&self) -> LogicalType {
        match self {
            Self::Text { .. } => LogicalType::String,
            Self::Integer | Self::SmallInt => LogicalType::Integer,
            Self::BigInt | Self::Double => LogicalType::Numeric,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(concise_type: SQLSMALLINT, display_size: usize, precision: usize) -> ColumnDescriptor {
        ColumnDescriptor {
            name: "C".into(),
            type_name: "T".into(),
            concise_type,
            display_size,
            precision,
            scale: 0,
        }
    }

    #[test]
    fn test_text_widths() {
        let cases = [
            (column(SQL_VARCHAR, 20, 20), 21),
            (column(SQL_CHAR, 1, 1), 2),
            (column(SQL_WVARCHAR, 8, 8), 9),
            (column(SQL_DECIMAL, 12, 10), 13),
            (column(SQL_NUMERIC, 33, 31), 34),
            (column(SQL_DECFLOAT, 42, 34), 37),
            (column(SQL_TYPE_DATE, 10, 0), 32),
            (column(SQL_TYPE_TIMESTAMP, 32, 0), 32),
            (column(SQL_TYPE_TIMESTAMP, 40, 0), 40),
        ];
        for (col, width) in cases {
            assert_eq!(
                ReadBinding::for_column(&col).unwrap(),
                ReadBinding::Text { width },
                "{col:?}"
            );
        }
    }

    #[test]
    fn test_native_bindings() {
        let binding = ReadBinding::for_column(&column(SQL_INTEGER, 11, 10)).unwrap();
        assert_eq!(binding, ReadBinding::Integer);
        assert_eq!(binding.c_type(), SQL_C_LONG);
        assert_eq!(binding.element_size(), 4);
        assert_eq!(binding.logical_type(), LogicalType::Integer);

        let binding = ReadBinding::for_column(&column(SQL_SMALLINT, 6, 5)).unwrap();
        assert_eq!(binding.c_type(), SQL_C_SHORT);
        assert_eq!(binding.element_size(), 2);

        let binding = ReadBinding::for_column(&column(SQL_BIGINT, 20, 19)).unwrap();
        assert_eq!(binding.c_type(), SQL_C_SBIGINT);
        assert_eq!(binding.logical_type(), LogicalType::Numeric);

        for ty in [SQL_REAL, SQL_DOUBLE, SQL_FLOAT] {
            let binding = ReadBinding::for_column(&column(ty, 24, 53)).unwrap();
            assert_eq!(binding, ReadBinding::Double);
            assert_eq!(binding.element_size(), 8);
        }
    }

    #[test]
    fn test_unsupported_type() {
        let mut col = column(SQL_LONGVARBINARY, 0, 0);
        col.type_name = "BLOB".into();
        let error = ReadBinding::for_column(&col).unwrap_err();
        assert_eq!(error.status, Status::UnsupportedType);
        assert!(error.message.contains("BLOB"));
        assert_eq!(col.logical_type().unwrap_err().status, Status::UnsupportedType);
    }

    #[test]
    fn test_logical_type_tags() {
        assert_eq!("character".parse::<LogicalType>().unwrap(), LogicalType::String);
        assert_eq!("String".parse::<LogicalType>().unwrap(), LogicalType::String);
        assert_eq!("integer".parse::<LogicalType>().unwrap(), LogicalType::Integer);
        assert_eq!("numeric".parse::<LogicalType>().unwrap(), LogicalType::Numeric);
        assert_eq!("double".parse::<LogicalType>().unwrap(), LogicalType::Numeric);

        let error = "logical".parse::<LogicalType>().unwrap_err();
        assert_eq!(error.status, Status::UnknownColumnType);

        for ty in [LogicalType::String, LogicalType::Integer, LogicalType::Numeric] {
            assert_eq!(ty.tag().parse::<LogicalType>().unwrap(), ty);
        }
    }

    #[test]
    fn test_field_metadata() {
        let mut col = column(SQL_DECIMAL, 12, 10);
        col.type_name = "DECIMAL".into();
        let field = col.to_field().unwrap();
        assert_eq!(field.data_type(), &DataType::Utf8);
        assert!(field.is_nullable());
        assert_eq!(
            field.metadata().get(METADATA_TYPE_NAME).map(String::as_str),
            Some("DECIMAL")
        );
    }
}
