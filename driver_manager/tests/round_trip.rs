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

use std::sync::Arc;

use arrow_array::{Array, Float64Array, Int64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use arrow_select::concat::concat_batches;

use odbc_bulk_core::ffi::constants::{SQL_DOUBLE, SQL_INTEGER, SQL_VARCHAR};
use odbc_bulk_core::{Column, LogicalType};
use odbc_bulk_driver_manager::WriteInput;

mod common;

#[test]
fn test_round_trip_chunk_sizes() {
    let (_registry, connection, _) = common::fresh("round_trip");
    connection.execute_update(common::SAMPLE_TABLE).unwrap();

    let rows = 25;
    let input = common::sample_input(rows);
    assert_eq!(connection.write_table("SAMPLE", &input).unwrap(), rows);

    for chunk_size in [1, rows / 2, rows, rows * 2] {
        let output = connection
            .execute_query("SELECT * FROM SAMPLE", chunk_size)
            .unwrap();
        assert_eq!(output.num_rows(), rows, "chunk size {chunk_size}");
        assert_eq!(output.columns(), &input.columns[..], "chunk size {chunk_size}");

        let types: Vec<_> = output
            .descriptors()
            .iter()
            .map(|d| (d.name.as_str(), d.concise_type))
            .collect();
        assert_eq!(
            types,
            vec![("LABEL", SQL_VARCHAR), ("AMOUNT", SQL_INTEGER), ("RATIO", SQL_DOUBLE)]
        );
    }
}

#[test]
fn test_chunk_size_does_not_change_the_result() {
    let (_registry, connection, _) = common::fresh("chunks");
    connection.execute_update(common::SAMPLE_TABLE).unwrap();
    connection
        .write_table("SAMPLE", &common::sample_input(100))
        .unwrap();

    let reference = connection.execute_query("SELECT * FROM SAMPLE", 10000).unwrap();
    for chunk_size in [1, 7] {
        let output = connection
            .execute_query("SELECT * FROM SAMPLE", chunk_size)
            .unwrap();
        assert_eq!(output, reference);
    }
}

#[test]
fn test_null_fidelity() {
    let (_registry, connection, _) = common::fresh("nulls");
    connection
        .execute_update(
            "CREATE TABLE EVERYTHING (C CHAR(3), V VARCHAR(10), S SMALLINT, I INTEGER, \
             B BIGINT, R REAL, D DOUBLE, N DECIMAL(10, 2), F DECFLOAT, DT DATE, \
             TM TIME, TS TIMESTAMP)",
        )
        .unwrap();
    connection
        .execute_update(
            "INSERT INTO EVERYTHING VALUES \
             ('abc', 'value', 7, -8, 9, 1.5, -2.25, '12.50', '3.14', '2024-02-29', \
              '23:59:58', '2024-02-29-23.59.58.000000'), \
             (NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL)",
        )
        .unwrap();

    let output = connection.execute_query("SELECT * FROM EVERYTHING", 5).unwrap();
    assert_eq!(output.num_rows(), 2);
    for (column, descriptor) in output.columns().iter().zip(output.descriptors()) {
        assert!(!column.is_null(0), "{} row 0", descriptor.name);
        assert!(column.is_null(1), "{} row 1", descriptor.name);
    }

    let column = |name: &str| output.column_by_name(name).unwrap();
    assert_eq!(column("C").string(0), Some("abc"));
    assert_eq!(column("V").string(0), Some("value"));
    assert_eq!(column("S").integer(0), Some(7));
    assert_eq!(column("I").integer(0), Some(-8));
    assert_eq!(column("B").numeric(0), Some(9.0));
    assert_eq!(column("R").numeric(0), Some(1.5));
    assert_eq!(column("D").numeric(0), Some(-2.25));
    assert_eq!(column("N").string(0), Some("12.50"));
    assert_eq!(column("F").string(0), Some("3.14"));
    assert_eq!(column("DT").string(0), Some("2024-02-29"));
    assert_eq!(column("TM").string(0), Some("23:59:58"));
    assert_eq!(column("TS").string(0), Some("2024-02-29-23.59.58.000000"));

    let logical: Vec<_> = output
        .columns()
        .iter()
        .map(Column::logical_type)
        .collect();
    let (text, integer, numeric) = (LogicalType::String, LogicalType::Integer, LogicalType::Numeric);
    assert_eq!(
        logical,
        vec![
            text, text, integer, integer, numeric, numeric, numeric, text, text, text, text, text
        ]
    );
}

#[test]
fn test_all_null_columns() {
    let (_registry, connection, database) = common::fresh("all_nulls");
    connection
        .execute_update("CREATE TABLE EMPTY_CELLS (V VARCHAR(8), I INTEGER, D DOUBLE)")
        .unwrap();

    let input = WriteInput::from_columns(
        common::names(&["V", "I", "D"]),
        vec![
            Column::from_strings::<&str>([None, None, None]),
            Column::from_integers([None, None, None]),
            Column::from_numerics([None, None, None]),
        ],
    );
    assert_eq!(input.varchar_lengths, vec![1, 0, 0]);
    assert_eq!(connection.write_table("EMPTY_CELLS", &input).unwrap(), 3);
    assert_eq!(odbc_bulk_mock_driver::table_rows(&database, "EMPTY_CELLS"), Some(3));

    let output = connection
        .execute_query("SELECT * FROM EMPTY_CELLS", 2)
        .unwrap();
    assert_eq!(output.num_rows(), 3);
    let expected = [LogicalType::String, LogicalType::Integer, LogicalType::Numeric];
    for (column, logical) in output.columns().iter().zip(expected) {
        assert_eq!(column.logical_type(), logical);
        assert_eq!(column.nulls(), &[true, true, true]);
        assert_eq!(column.null_count(), 3);
        for row in 0..3 {
            assert_eq!(column.string(row), None);
            assert_eq!(column.integer(row), None);
            assert_eq!(column.numeric(row), None);
        }
    }
}

#[test]
fn test_unicode_text() {
    let (_registry, connection, _) = common::fresh("unicode");
    connection
        .execute_update("CREATE TABLE WORDS (WORD VARCHAR(40))")
        .unwrap();

    let words = ["naïve", "日本語", "emoji 😀🎉", "", "ʕ•ᴥ•ʔ"];
    let input = WriteInput::from_columns(
        common::names(&["WORD"]),
        vec![Column::from_strings(words.iter().map(|w| Some(*w)))],
    );
    // Supplementary characters take two UTF-16 units each.
    assert_eq!(input.varchar_lengths, vec![10]);
    connection.write_table("WORDS", &input).unwrap();

    let output = connection.execute_query("SELECT WORD FROM WORDS", 2).unwrap();
    let read: Vec<_> = (0..output.num_rows())
        .map(|row| output.columns()[0].string(row).unwrap().to_string())
        .collect();
    assert_eq!(read, words);
}

#[test]
fn test_wide_integers_and_decimals() {
    let (_registry, connection, _) = common::fresh("wide");
    connection
        .execute_update("CREATE TABLE WIDE (B BIGINT, N NUMERIC(31, 4), F DECFLOAT)")
        .unwrap();
    connection
        .execute_update(
            "INSERT INTO WIDE VALUES (5000000000, '123456789012345678901234567.1234', \
             '1234567890123456789012345678901234'), (-5000000000, '-0.0001', '-7.5')",
        )
        .unwrap();

    let output = connection.execute_query("SELECT * FROM WIDE", 10).unwrap();
    let [b, n, f] = output.columns() else {
        panic!("expected three columns");
    };
    assert_eq!(b.numeric(0), Some(5_000_000_000.0));
    assert_eq!(b.numeric(1), Some(-5_000_000_000.0));
    assert_eq!(n.string(0), Some("123456789012345678901234567.1234"));
    assert_eq!(n.string(1), Some("-0.0001"));
    assert_eq!(f.string(0), Some("1234567890123456789012345678901234"));
    assert_eq!(f.string(1), Some("-7.5"));
}

#[test]
fn test_write_into_typed_columns() {
    let (_registry, connection, _) = common::fresh("typed");
    connection
        .execute_update("CREATE TABLE TYPED (S SMALLINT, B BIGINT, N DECIMAL(8, 3), D DATE)")
        .unwrap();

    let input = WriteInput::from_columns(
        common::names(&["S", "B", "N", "D"]),
        vec![
            Column::from_integers([Some(-32768), None, Some(32767)]),
            Column::from_numerics([Some(1e15), Some(-3.0), None]),
            Column::from_strings([Some("12345.678"), None, Some("-0.5")]),
            Column::from_strings([None, Some("1999-12-31"), Some("2000-01-01")]),
        ],
    );
    assert_eq!(connection.write_table("TYPED", &input).unwrap(), 3);

    let output = connection.execute_query("SELECT * FROM TYPED", 2).unwrap();
    assert_eq!(output.columns()[0], input.columns[0]);
    assert_eq!(output.columns()[1], input.columns[1]);
    assert_eq!(output.columns()[2], input.columns[2]);
    assert_eq!(output.columns()[3], input.columns[3]);
}

#[test]
fn test_zero_rows() {
    let (_registry, connection, database) = common::fresh("empty");
    connection.execute_update(common::SAMPLE_TABLE).unwrap();

    let input = common::sample_input(0);
    assert_eq!(connection.write_table("SAMPLE", &input).unwrap(), 0);

    let output = connection.execute_query("SELECT * FROM SAMPLE", 3).unwrap();
    assert_eq!(output.num_rows(), 0);
    assert_eq!(output.num_columns(), 3);
    assert_eq!(odbc_bulk_mock_driver::fetch_calls(&database), 1);

    let batch = output.to_record_batch().unwrap();
    assert_eq!(batch.num_rows(), 0);
    assert_eq!(batch.schema().field(1).data_type(), &DataType::Int64);
}

#[test]
fn test_statement_without_result_columns() {
    let (_registry, connection, _) = common::fresh("no_columns");
    let output = connection
        .execute_query("CREATE TABLE LATER (A INTEGER)", 10)
        .unwrap();
    assert_eq!(output.num_columns(), 0);
    assert_eq!(output.num_rows(), 0);
    connection.execute_query("SELECT * FROM LATER", 10).unwrap();
}

#[test]
fn test_delete_without_matches() {
    let (_registry, connection, database) = common::fresh("delete");
    connection.execute_update(common::SAMPLE_TABLE).unwrap();
    connection
        .execute_update("DELETE FROM SAMPLE WHERE AMOUNT = 1")
        .unwrap();

    connection
        .write_table("SAMPLE", &common::sample_input(3))
        .unwrap();
    connection
        .execute_update("DELETE FROM SAMPLE WHERE LABEL = 'row-1'")
        .unwrap();
    assert_eq!(
        odbc_bulk_mock_driver::table_rows(&database, "SAMPLE"),
        Some(2)
    );
}

#[test]
fn test_record_batches() {
    let (_registry, connection, _) = common::fresh("arrow");
    connection.execute_update(common::SAMPLE_TABLE).unwrap();

    let schema = Arc::new(Schema::new(vec![
        Field::new("LABEL", DataType::Utf8, true),
        Field::new("AMOUNT", DataType::Int64, true),
        Field::new("RATIO", DataType::Float64, true),
    ]));
    let first = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(vec![Some("a"), None])),
            Arc::new(Int64Array::from(vec![Some(1), Some(2)])),
            Arc::new(Float64Array::from(vec![None, Some(0.5)])),
        ],
    )
    .unwrap();
    let second = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(vec![Some("c")])),
            Arc::new(Int64Array::from(vec![None])),
            Arc::new(Float64Array::from(vec![Some(1.5)])),
        ],
    )
    .unwrap();
    let expected = concat_batches(&schema, [&first, &second]).unwrap();

    assert_eq!(connection.write_record_batch("SAMPLE", &first).unwrap(), 2);
    assert_eq!(connection.write_record_batch("SAMPLE", &second).unwrap(), 1);

    let batch = connection
        .execute_query("SELECT * FROM SAMPLE", 2)
        .unwrap()
        .to_record_batch()
        .unwrap();
    assert_eq!(batch.num_rows(), 3);
    assert_eq!(
        batch.schema().field(0).metadata().get("odbc_bulk.type_name"),
        Some(&"VARCHAR".to_string())
    );
    // AMOUNT is INTEGER in the table and comes back as Int64.
    for index in 0..3 {
        assert_eq!(
            batch.column(index).to_data(),
            expected.column(index).to_data(),
            "column {index}"
        );
    }
}
