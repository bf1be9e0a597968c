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

//! Typed column vectors with parallel null masks, as produced by reads and
//! consumed by writes, and their conversion to and from Arrow.

use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::types::{
    ArrowPrimitiveType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type,
    UInt16Type, UInt32Type, UInt8Type,
};
use arrow_array::{
    Array, ArrayRef, Float64Array, Int64Array, RecordBatch, RecordBatchOptions, StringArray,
};
use arrow_schema::{DataType, Schema};

use crate::constants::{NULL_INTEGER, NULL_NUMERIC, NULL_STRING};
use crate::error::{Error, Result, Status};
use crate::schemas::{ColumnDescriptor, LogicalType};

/// The values of a column, one vector per logical type.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    String(Vec<String>),
    Integer(Vec<i64>),
    Numeric(Vec<f64>),
}

impl ColumnValues {
    pub fn with_capacity(logical_type: LogicalType, capacity: usize) -> Self {
        match logical_type {
            LogicalType::String => Self::String(Vec::with_capacity(capacity)),
            LogicalType::Integer => Self::Integer(Vec::with_capacity(capacity)),
            LogicalType::Numeric => Self::Numeric(Vec::with_capacity(capacity)),
        }
    }

    pub fn logical_type(&self) -> LogicalType {
        match self {
            Self::String(_) => LogicalType::String,
            Self::Integer(_) => LogicalType::Integer,
            Self::Numeric(_) => LogicalType::Numeric,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::String(v) => v.len(),
            Self::Integer(v) => v.len(),
            Self::Numeric(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A column of values and a same-length mask that is `true` for NULL cells.
///
/// A NULL cell holds a placeholder in the value vector: an empty string,
/// zero or zero point zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    values: ColumnValues,
    nulls: Vec<bool>,
}

impl Column {
    /// Build a column, checking that the mask covers every value.
    pub fn new(values: ColumnValues, nulls: Vec<bool>) -> Result<Self> {
        if values.len() != nulls.len() {
            return Err(Error::with_message_and_status(
                format!(
                    "column has {} values but {} null flags",
                    values.len(),
                    nulls.len()
                ),
                Status::Arity,
            ));
        }
        Ok(Self { values, nulls })
    }

    pub fn with_capacity(logical_type: LogicalType, capacity: usize) -> Self {
        Self {
            values: ColumnValues::with_capacity(logical_type, capacity),
            nulls: Vec::with_capacity(capacity),
        }
    }

    pub fn from_strings<S: Into<String>>(values: impl IntoIterator<Item = Option<S>>) -> Self {
        let (values, nulls) = split(values, NULL_STRING.to_string(), Into::into);
        Self {
            values: ColumnValues::String(values),
            nulls,
        }
    }

    pub fn from_integers(values: impl IntoIterator<Item = Option<i64>>) -> Self {
        let (values, nulls) = split(values, NULL_INTEGER, |v| v);
        Self {
            values: ColumnValues::Integer(values),
            nulls,
        }
    }

    pub fn from_numerics(values: impl IntoIterator<Item = Option<f64>>) -> Self {
        let (values, nulls) = split(values, NULL_NUMERIC, |v| v);
        Self {
            values: ColumnValues::Numeric(values),
            nulls,
        }
    }

    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    pub fn nulls(&self) -> &[bool] {
        &self.nulls
    }

    pub fn logical_type(&self) -> LogicalType {
        self.values.logical_type()
    }

    pub fn len(&self) -> usize {
        self.nulls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nulls.is_empty()
    }

    pub fn is_null(&self, row: usize) -> bool {
        self.nulls.get(row).copied().unwrap_or(false)
    }

    pub fn null_count(&self) -> usize {
        self.nulls.iter().filter(|&&n| n).count()
    }

    pub fn push_null(&mut self) {
        match &mut self.values {
            ColumnValues::String(v) => v.push(NULL_STRING.to_string()),
            ColumnValues::Integer(v) => v.push(NULL_INTEGER),
            ColumnValues::Numeric(v) => v.push(NULL_NUMERIC),
        }
        self.nulls.push(true);
    }

    pub fn push_string(&mut self, value: String) -> Result<()> {
        match &mut self.values {
            ColumnValues::String(v) => v.push(value),
            _ => return Err(self.mismatch(LogicalType::String)),
        }
        self.nulls.push(false);
        Ok(())
    }

    pub fn push_integer(&mut self, value: i64) -> Result<()> {
        match &mut self.values {
            ColumnValues::Integer(v) => v.push(value),
            _ => return Err(self.mismatch(LogicalType::Integer)),
        }
        self.nulls.push(false);
        Ok(())
    }

    pub fn push_numeric(&mut self, value: f64) -> Result<()> {
        match &mut self.values {
            ColumnValues::Numeric(v) => v.push(value),
            _ => return Err(self.mismatch(LogicalType::Numeric)),
        }
        self.nulls.push(false);
        Ok(())
    }

    fn mismatch(&self, pushed: LogicalType) -> Error {
        Error::with_message_and_status(
            format!(
                "cannot append a {pushed} value to a {} column",
                self.logical_type()
            ),
            Status::Internal,
        )
    }

    /// String value at `row`, `None` for NULL or a non-string column.
    pub fn string(&self, row: usize) -> Option<&str> {
        match &self.values {
            ColumnValues::String(v) if !self.is_null(row) => v.get(row).map(String::as_str),
            _ => None,
        }
    }

    /// Integer value at `row`, `None` for NULL or a non-integer column.
    pub fn integer(&self, row: usize) -> Option<i64> {
        match &self.values {
            ColumnValues::Integer(v) if !self.is_null(row) => v.get(row).copied(),
            _ => None,
        }
    }

    /// Numeric value at `row`, `None` for NULL or a non-numeric column.
    pub fn numeric(&self, row: usize) -> Option<f64> {
        match &self.values {
            ColumnValues::Numeric(v) if !self.is_null(row) => v.get(row).copied(),
            _ => None,
        }
    }

    /// Convert to an Arrow array of the column's logical type.
    pub fn to_array(&self) -> ArrayRef {
        let valid = |row: usize| !self.nulls[row];
        match &self.values {
            ColumnValues::String(v) => Arc::new(StringArray::from_iter(
                v.iter()
                    .enumerate()
                    .map(|(row, s)| valid(row).then_some(s.as_str())),
            )),
            ColumnValues::Integer(v) => Arc::new(Int64Array::from_iter(
                v.iter().enumerate().map(|(row, &i)| valid(row).then_some(i)),
            )),
            ColumnValues::Numeric(v) => Arc::new(Float64Array::from_iter(
                v.iter().enumerate().map(|(row, &f)| valid(row).then_some(f)),
            )),
        }
    }

    /// Convert an Arrow array into a column.
    ///
    /// Text arrays become string columns, signed integers and unsigned
    /// integers up to 32 bits become integer columns, and floating point
    /// arrays become numeric columns.
    pub fn try_from_array(array: &dyn Array) -> Result<Self> {
        let column = match array.data_type() {
            DataType::Utf8 => Self::from_strings(array.as_string::<i32>().iter()),
            DataType::LargeUtf8 => Self::from_strings(array.as_string::<i64>().iter()),
            DataType::Int8 => integers::<Int8Type>(array),
            DataType::Int16 => integers::<Int16Type>(array),
            DataType::Int32 => integers::<Int32Type>(array),
            DataType::Int64 => integers::<Int64Type>(array),
            DataType::UInt8 => integers::<UInt8Type>(array),
            DataType::UInt16 => integers::<UInt16Type>(array),
            DataType::UInt32 => integers::<UInt32Type>(array),
            DataType::Float32 => numerics::<Float32Type>(array),
            DataType::Float64 => numerics::<Float64Type>(array),
            other => {
                return Err(Error::with_message_and_status(
                    format!("Arrow type {other} cannot be written"),
                    Status::InvalidArguments,
                ))
            }
        };
        Ok(column)
    }
}

fn split<T, U>(
    values: impl IntoIterator<Item = Option<T>>,
    placeholder: U,
    convert: impl Fn(T) -> U,
) -> (Vec<U>, Vec<bool>)
where
    U: Clone,
{
    let values = values.into_iter();
    let (lower, _) = values.size_hint();
    let mut out = Vec::with_capacity(lower);
    let mut nulls = Vec::with_capacity(lower);
    for value in values {
        match value {
            Some(v) => {
                out.push(convert(v));
                nulls.push(false);
            }
            None => {
                out.push(placeholder.clone());
                nulls.push(true);
            }
        }
    }
    (out, nulls)
}

fn integers<T>(array: &dyn Array) -> Column
where
    T: ArrowPrimitiveType,
    T::Native: Into<i64>,
{
    Column::from_integers(array.as_primitive::<T>().iter().map(|v| v.map(Into::into)))
}

fn numerics<T>(array: &dyn Array) -> Column
where
    T: ArrowPrimitiveType,
    T::Native: Into<f64>,
{
    Column::from_numerics(array.as_primitive::<T>().iter().map(|v| v.map(Into::into)))
}

/// Outcome of a query: one column per result column, all of the same
/// length, and the metadata they were read with.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadResult {
    columns: Vec<Column>,
    descriptors: Vec<ColumnDescriptor>,
}

impl ReadResult {
    /// An empty result with one column per descriptor.
    pub fn new(descriptors: Vec<ColumnDescriptor>) -> Result<Self> {
        let columns = descriptors
            .iter()
            .map(|d| Ok(Column::with_capacity(d.logical_type()?, 0)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            columns,
            descriptors,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn descriptors(&self) -> &[ColumnDescriptor] {
        &self.descriptors
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Position of the column called `name`, compared case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.descriptors
            .iter()
            .position(|d| d.name.eq_ignore_ascii_case(name))
    }

    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.column_index(name).and_then(|i| self.columns.get(i))
    }

    pub fn into_parts(self) -> (Vec<Column>, Vec<ColumnDescriptor>) {
        (self.columns, self.descriptors)
    }

    /// Convert to a record batch: strings to `Utf8`, integers to `Int64`,
    /// numerics to `Float64`.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let fields = self
            .descriptors
            .iter()
            .map(ColumnDescriptor::to_field)
            .collect::<Result<Vec<_>>>()?;
        let arrays = self.columns.iter().map(Column::to_array).collect();
        let options = RecordBatchOptions::new().with_row_count(Some(self.num_rows()));
        Ok(RecordBatch::try_new_with_options(
            Arc::new(Schema::new(fields)),
            arrays,
            &options,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use arrow_array::{Float32Array, Int32Array, LargeStringArray, UInt8Array};

    use super::*;
    use crate::ffi::constants::{SQL_BIGINT, SQL_INTEGER, SQL_VARCHAR};

    fn descriptor(name: &str, concise_type: i16) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.into(),
            type_name: "T".into(),
            concise_type,
            display_size: 10,
            precision: 10,
            scale: 0,
        }
    }

    #[test]
    fn test_new_checks_lengths() {
        let error = Column::new(ColumnValues::Integer(vec![1, 2]), vec![false]).unwrap_err();
        assert_eq!(error.status, Status::Arity);
        assert!(Column::new(ColumnValues::Integer(vec![1]), vec![true]).is_ok());
    }

    #[test]
    fn test_placeholders() {
        let column = Column::from_strings([Some("a"), None]);
        assert_eq!(
            column.values(),
            &ColumnValues::String(vec!["a".into(), "".into()])
        );
        assert_eq!(column.nulls(), &[false, true]);
        assert_eq!(column.string(0), Some("a"));
        assert_eq!(column.string(1), None);

        let mut column = Column::with_capacity(LogicalType::Numeric, 2);
        column.push_null();
        column.push_numeric(1.5).unwrap();
        assert_eq!(column.values(), &ColumnValues::Numeric(vec![0.0, 1.5]));
        assert_eq!(column.null_count(), 1);
        assert_eq!(
            column.push_integer(1).unwrap_err().status,
            Status::Internal
        );
    }

    #[test]
    fn test_read_result_record_batch() {
        let mut result = ReadResult::new(vec![
            descriptor("ID", SQL_INTEGER),
            descriptor("NAME", SQL_VARCHAR),
            descriptor("BIG", SQL_BIGINT),
        ])
        .unwrap();
        assert_eq!(result.num_rows(), 0);

        let columns = result.columns_mut();
        columns[0].push_integer(1).unwrap();
        columns[0].push_integer(2).unwrap();
        columns[1].push_string("x".into()).unwrap();
        columns[1].push_null();
        columns[2].push_null();
        columns[2].push_numeric(3e10).unwrap();

        assert_eq!(result.num_rows(), 2);
        assert_eq!(result.column_index("name"), Some(1));
        assert!(result.column_by_name("missing").is_none());

        let batch = result.to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().field(0).data_type(), &DataType::Int64);
        assert_eq!(batch.schema().field(2).data_type(), &DataType::Float64);
        let names = batch.column(1).as_string::<i32>();
        assert_eq!(names.value(0), "x");
        assert!(names.is_null(1));
    }

    #[test]
    fn test_empty_result_record_batch() {
        let result = ReadResult::new(vec![descriptor("ID", SQL_INTEGER)]).unwrap();
        let batch = result.to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 1);
    }

    #[test]
    fn test_try_from_array() {
        let column = Column::try_from_array(&Int32Array::from(vec![Some(1), None])).unwrap();
        assert_eq!(column.logical_type(), LogicalType::Integer);
        assert_eq!(column.integer(0), Some(1));
        assert!(column.is_null(1));

        let column = Column::try_from_array(&UInt8Array::from(vec![255])).unwrap();
        assert_eq!(column.integer(0), Some(255));

        let column = Column::try_from_array(&Float32Array::from(vec![0.5])).unwrap();
        assert_eq!(column.numeric(0), Some(0.5));

        let column =
            Column::try_from_array(&LargeStringArray::from(vec![Some("é"), None])).unwrap();
        assert_eq!(column.string(0), Some("é"));
        assert!(column.is_null(1));

        let error =
            Column::try_from_array(&arrow_array::BooleanArray::from(vec![true])).unwrap_err();
        assert_eq!(error.status, Status::InvalidArguments);
    }

    #[test]
    fn test_array_round_trip() {
        let column = Column::from_numerics([Some(1.0), None, Some(-2.5)]);
        let array = column.to_array();
        assert_eq!(array.null_count(), 1);
        assert_eq!(Column::try_from_array(array.as_ref()).unwrap(), column);
    }
}
