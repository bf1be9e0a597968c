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

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use odbc_bulk_core::error::Status;
use odbc_bulk_core::interrupt;
use odbc_bulk_mock_driver::{fetch_calls, open_statements, table_rows};

mod common;

#[test]
fn test_global_interrupt_handler() {
    let (_registry, connection, database) = common::fresh("handler");
    connection.execute_update(common::SAMPLE_TABLE).unwrap();
    connection
        .write_table("SAMPLE", &common::sample_input(9))
        .unwrap();

    let polls = Arc::new(AtomicUsize::new(0));
    let counter = polls.clone();
    interrupt::set_interrupt_handler(move || {
        if counter.fetch_add(1, Ordering::SeqCst) == 1 {
            Err(interrupt::cancelled())
        } else {
            Ok(())
        }
    });
    assert!(interrupt::has_interrupt_handler());

    let error = connection
        .execute_query("SELECT * FROM SAMPLE", 4)
        .unwrap_err();
    assert_eq!(error.status, Status::Cancelled);
    assert_eq!(polls.load(Ordering::SeqCst), 2);
    assert_eq!(fetch_calls(&database), 2);
    assert_eq!(open_statements(&database), 0);

    // Writes poll after each column; the third column is never reached.
    polls.store(0, Ordering::SeqCst);
    let error = connection
        .write_table("SAMPLE", &common::sample_input(3))
        .unwrap_err();
    assert_eq!(error.status, Status::Cancelled);
    assert_eq!(polls.load(Ordering::SeqCst), 2);
    assert_eq!(table_rows(&database, "SAMPLE"), Some(9));

    interrupt::clear_interrupt_handler();
    assert!(!interrupt::has_interrupt_handler());
    let output = connection.execute_query("SELECT * FROM SAMPLE", 4).unwrap();
    assert_eq!(output.num_rows(), 9);
}
