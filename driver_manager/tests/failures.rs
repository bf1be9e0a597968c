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

use arrow_array::{Int64Array, RecordBatch};
use arrow_schema::{DataType, Field, Schema};

use odbc_bulk_core::error::Status;
use odbc_bulk_core::interrupt::{self, CancellationToken};
use odbc_bulk_core::{options, Column};
use odbc_bulk_driver_manager::WriteInput;
use odbc_bulk_mock_driver::{fetch_calls, open_statements, set_faults, table_rows, Faults};

mod common;

fn ids(values: &[Option<i64>]) -> WriteInput {
    WriteInput::from_columns(
        common::names(&["ID"]),
        vec![Column::from_integers(values.iter().copied())],
    )
}

#[test]
fn test_schema_mismatch() {
    let (_registry, connection, database) = common::fresh("mismatch");
    connection
        .execute_update("CREATE TABLE THREE (A INTEGER, B INTEGER, C INTEGER)")
        .unwrap();

    let input = WriteInput::from_columns(
        common::names(&["A", "B"]),
        vec![
            Column::from_integers([Some(1)]),
            Column::from_integers([Some(2)]),
        ],
    );
    let error = connection.write_table("THREE", &input).unwrap_err();
    assert_eq!(error.status, Status::Schema);
    assert!(
        error.message.contains("has 3 columns, but 2 were supplied"),
        "{}",
        error.message
    );
    assert_eq!(table_rows(&database, "THREE"), Some(0));

    let error = connection.write_table("MISSING", &input).unwrap_err();
    assert_eq!(error.status, Status::Schema);
    assert_eq!(error.sqlstate_str(), Some("42704"));
}

#[test]
fn test_constraint_violation_rolls_back() {
    let (_registry, connection, database) = common::fresh("unique");
    connection
        .execute_update("CREATE TABLE KEYS (ID INTEGER PRIMARY KEY)")
        .unwrap();
    connection.execute_update("INSERT INTO KEYS VALUES (1)").unwrap();

    let error = connection
        .write_table("KEYS", &ids(&[Some(5), Some(6), Some(1), Some(7)]))
        .unwrap_err();
    assert_eq!(error.status, Status::Exec);
    assert_eq!(error.sqlstate_str(), Some("23505"));
    assert_eq!(error.vendor_code, -803);
    assert!(!error.rollback_failed());
    assert_eq!(table_rows(&database, "KEYS"), Some(1));

    // NULL into a primary key column.
    let error = connection
        .write_table("KEYS", &ids(&[Some(8), None]))
        .unwrap_err();
    assert_eq!(error.status, Status::Exec);
    assert_eq!(error.sqlstate_str(), Some("23502"));
    assert_eq!(table_rows(&database, "KEYS"), Some(1));

    // Autocommit is back on and the connection still works.
    connection.write_table("KEYS", &ids(&[Some(2), Some(3)])).unwrap();
    connection.execute_update("INSERT INTO KEYS VALUES (4)").unwrap();
    assert_eq!(table_rows(&database, "KEYS"), Some(4));
}

#[test]
fn test_value_out_of_range() {
    let (_registry, connection, database) = common::fresh("range");
    connection
        .execute_update("CREATE TABLE SMALL (S SMALLINT, V VARCHAR(3))")
        .unwrap();

    let input = WriteInput::from_columns(
        common::names(&["S", "V"]),
        vec![
            Column::from_integers([Some(1), Some(40_000)]),
            Column::from_strings([Some("ab"), Some("cd")]),
        ],
    );
    let error = connection.write_table("SMALL", &input).unwrap_err();
    assert_eq!(error.sqlstate_str(), Some("22003"));

    let input = WriteInput::from_columns(
        common::names(&["S", "V"]),
        vec![
            Column::from_integers([Some(1)]),
            Column::from_strings([Some("abcd")]),
        ],
    );
    let error = connection.write_table("SMALL", &input).unwrap_err();
    assert_eq!(error.sqlstate_str(), Some("22001"));
    assert_eq!(table_rows(&database, "SMALL"), Some(0));
}

#[test]
fn test_rollback_failure() {
    let (_registry, connection, database) = common::fresh("rollback");
    connection
        .execute_update("CREATE TABLE KEYS (ID INTEGER UNIQUE)")
        .unwrap();
    connection.execute_update("INSERT INTO KEYS VALUES (1)").unwrap();
    set_faults(
        &database,
        Faults {
            fail_rollback: true,
            ..Default::default()
        },
    );

    let error = connection
        .write_table("KEYS", &ids(&[Some(2), Some(1)]))
        .unwrap_err();
    assert_eq!(error.status, Status::Transaction);
    assert!(error.rollback_failed());
    assert_eq!(error.sqlstate_str(), Some("23505"));
    let states: Vec<_> = error.diagnostics.iter().map(|d| d.state.as_str()).collect();
    assert_eq!(states, vec!["23505", "08S01"]);
}

#[test]
fn test_record_batch_is_one_transaction() {
    let (_registry, connection, database) = common::fresh("batch_rollback");
    connection
        .execute_update("CREATE TABLE KEYS (ID BIGINT PRIMARY KEY)")
        .unwrap();
    // Smaller than the batch, so a sliced write would commit early rows.
    options::set_write_chunk_size(2).unwrap();

    let batch = RecordBatch::try_new(
        Arc::new(Schema::new(vec![Field::new("ID", DataType::Int64, true)])),
        vec![Arc::new(Int64Array::from(vec![1, 2, 3, 1]))],
    )
    .unwrap();
    let error = connection.write_record_batch("KEYS", &batch).unwrap_err();
    assert_eq!(error.status, Status::Exec);
    assert_eq!(error.sqlstate_str(), Some("23505"));
    assert_eq!(table_rows(&database, "KEYS"), Some(0));

    let batch = batch.slice(0, 3);
    assert_eq!(connection.write_record_batch("KEYS", &batch).unwrap(), 3);
    assert_eq!(table_rows(&database, "KEYS"), Some(3));
}

#[test]
fn test_autocommit_restore_failure_keeps_commit() {
    let (_registry, connection, database) = common::fresh("restore");
    connection
        .execute_update("CREATE TABLE KEYS (ID INTEGER)")
        .unwrap();
    set_faults(
        &database,
        Faults {
            fail_autocommit_on: true,
            ..Default::default()
        },
    );

    let written = connection
        .write_table("KEYS", &ids(&[Some(1), Some(2)]))
        .unwrap();
    assert_eq!(written, 2);
    assert_eq!(table_rows(&database, "KEYS"), Some(2));

    set_faults(&database, Faults::default());
    connection.execute_update("INSERT INTO KEYS VALUES (3)").unwrap();
    assert_eq!(table_rows(&database, "KEYS"), Some(3));
}

#[test]
fn test_describe_table_allocation_failure() {
    let (_registry, connection, database) = common::fresh("alloc");
    connection
        .execute_update("CREATE TABLE KEYS (ID INTEGER)")
        .unwrap();
    set_faults(
        &database,
        Faults {
            fail_statement_alloc: true,
            ..Default::default()
        },
    );

    let error = connection.describe_table("KEYS", 1).unwrap_err();
    assert_eq!(error.status, Status::Schema);
    assert_eq!(error.sqlstate_str(), Some("HY014"));

    let error = connection.write_table("KEYS", &ids(&[Some(1)])).unwrap_err();
    assert_eq!(error.status, Status::Schema);
    assert_eq!(table_rows(&database, "KEYS"), Some(0));

    set_faults(&database, Faults::default());
    assert_eq!(connection.describe_table("KEYS", 1).unwrap().len(), 1);
}

#[test]
fn test_arity_and_type_tags() {
    let (_registry, connection, _) = common::fresh("arity");
    connection
        .execute_update("CREATE TABLE PAIR (A INTEGER, B VARCHAR(5))")
        .unwrap();

    let mut input = WriteInput::from_columns(
        common::names(&["A", "B"]),
        vec![
            Column::from_integers([Some(1), Some(2)]),
            Column::from_strings([Some("x")]),
        ],
    );
    let error = connection.write_table("PAIR", &input).unwrap_err();
    assert_eq!(error.status, Status::Arity);

    input.columns[1] = Column::from_strings([Some("x"), Some("y")]);
    input.type_tags[1] = "blob".into();
    let error = connection.write_table("PAIR", &input).unwrap_err();
    assert_eq!(error.status, Status::UnknownColumnType);

    input.type_tags[1] = "integer".into();
    let error = connection.write_table("PAIR", &input).unwrap_err();
    assert_eq!(error.status, Status::InvalidArguments);

    input.type_tags[1] = "character".into();
    assert_eq!(connection.write_table("PAIR", &input).unwrap(), 2);
}

#[test]
fn test_unsupported_result_type() {
    let (_registry, connection, database) = common::fresh("blob");
    connection
        .execute_update("CREATE TABLE FILES (NAME VARCHAR(10), CONTENT BLOB(1024))")
        .unwrap();
    connection
        .execute_update("INSERT INTO FILES VALUES ('a', NULL)")
        .unwrap();

    let error = connection
        .execute_query("SELECT * FROM FILES", 10)
        .unwrap_err();
    assert_eq!(error.status, Status::UnsupportedType);
    assert!(error.message.contains("CONTENT"), "{}", error.message);
    assert_eq!(open_statements(&database), 0);

    let output = connection
        .execute_query("SELECT NAME FROM FILES", 10)
        .unwrap();
    assert_eq!(output.num_rows(), 1);
}

#[test]
fn test_row_error() {
    let (_registry, connection, database) = common::fresh("row_error");
    connection.execute_update(common::SAMPLE_TABLE).unwrap();
    connection
        .write_table("SAMPLE", &common::sample_input(6))
        .unwrap();
    set_faults(
        &database,
        Faults {
            row_error_at: Some(3),
            ..Default::default()
        },
    );

    let error = connection
        .execute_query("SELECT * FROM SAMPLE", 2)
        .unwrap_err();
    assert_eq!(error.status, Status::Fetch);
    assert!(error.message.contains("row 3"), "{}", error.message);
    assert_eq!(fetch_calls(&database), 2);
    assert_eq!(open_statements(&database), 0);
}

#[test]
fn test_statement_errors() {
    let (_registry, connection, _) = common::fresh("statement");

    let error = connection.execute_update("SELEKT 1").unwrap_err();
    assert_eq!(error.status, Status::Exec);
    assert_eq!(error.sqlstate_str(), Some("42601"));
    assert_eq!(error.diagnostics.len(), 1);

    let error = connection
        .execute_query("SELECT * FROM NOWHERE", 10)
        .unwrap_err();
    assert_eq!(error.status, Status::Exec);
    assert_eq!(error.sqlstate_str(), Some("42704"));

    let error = connection.execute_query("SELECT * FROM NOWHERE", 0).unwrap_err();
    assert_eq!(error.status, Status::InvalidArguments);
}

#[test]
fn test_cancel_read_after_first_chunk() {
    let (_registry, connection, database) = common::fresh("cancel_read");
    connection.execute_update(common::SAMPLE_TABLE).unwrap();
    connection
        .write_table("SAMPLE", &common::sample_input(10))
        .unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let error = connection
        .execute_query_with("SELECT * FROM SAMPLE", 3, &token)
        .unwrap_err();
    assert_eq!(error.status, Status::Cancelled);
    assert_eq!(fetch_calls(&database), 1);
    assert_eq!(open_statements(&database), 0);

    token.reset();
    let output = connection
        .execute_query_with("SELECT * FROM SAMPLE", 3, &token)
        .unwrap();
    assert_eq!(output.num_rows(), 10);
}

#[test]
fn test_cancel_write() {
    let (_registry, connection, database) = common::fresh("cancel_write");
    connection.execute_update(common::SAMPLE_TABLE).unwrap();

    let copied = std::cell::Cell::new(0);
    let stop_after_two = || {
        copied.set(copied.get() + 1);
        if copied.get() == 2 {
            Err(interrupt::cancelled())
        } else {
            Ok(())
        }
    };
    let error = connection
        .write_table_with("SAMPLE", &common::sample_input(5), &stop_after_two)
        .unwrap_err();
    assert_eq!(error.status, Status::Cancelled);
    assert_eq!(copied.get(), 2);
    assert_eq!(table_rows(&database, "SAMPLE"), Some(0));
    assert_eq!(open_statements(&database), 0);
}
