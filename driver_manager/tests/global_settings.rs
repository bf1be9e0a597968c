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

//! Process-wide state: the global registry and the settings. Kept in its
//! own test binary so nothing else observes the changes.

use std::io::Write;
use std::sync::Arc;

use arrow_array::{Int64Array, RecordBatch};
use arrow_schema::{DataType, Field, Schema};

use odbc_bulk_core::constants::ENV_READ_CHUNK_SIZE;
use odbc_bulk_core::error::Status;
use odbc_bulk_core::options;
use odbc_bulk_driver_manager::{Connection, EnvironmentRegistry};
use odbc_bulk_mock_driver::{fetch_calls, table_rows};

mod common;

#[test]
fn test_global_registry_and_settings() {
    EnvironmentRegistry::install_global(common::registry()).unwrap();
    let database = common::unique_database("global");

    let mut profile = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        profile,
        "version = 1\n\n[settings]\nread_chunk_size = 3\nwrite_chunk_size = 2\nlogin_timeout = 5"
    )
    .unwrap();
    let settings = options::load(Some(profile.path())).unwrap();
    assert_eq!(settings.read_chunk_size, 3);
    assert_eq!(options::login_timeout(), 5);

    let connection = Connection::connect(&format!("DATABASE={database}")).unwrap();
    let error = EnvironmentRegistry::install_global(common::registry()).unwrap_err();
    assert_eq!(error.status, Status::InvalidArguments);

    connection
        .execute_update("CREATE TABLE NUMBERS (N BIGINT)")
        .unwrap();
    let batch = RecordBatch::try_new(
        Arc::new(Schema::new(vec![Field::new("N", DataType::Int64, true)])),
        vec![Arc::new(Int64Array::from(vec![1, 2, 3, 4, 5]))],
    )
    .unwrap();
    assert_eq!(connection.write_record_batch("NUMBERS", &batch).unwrap(), 5);
    assert_eq!(table_rows(&database, "NUMBERS"), Some(5));

    let output = connection.read_table("NUMBERS").unwrap();
    assert_eq!(output.num_rows(), 5);
    // One full chunk, one partial, then the end of the cursor.
    assert_eq!(fetch_calls(&database), 3);

    temp_env::with_var(ENV_READ_CHUNK_SIZE, Some("10"), || {
        options::load(None).unwrap();
    });
    assert_eq!(options::read_chunk_size(), 10);
    connection.read_table("NUMBERS").unwrap();
    assert_eq!(fetch_calls(&database), 5);

    options::set_read_chunk_size(0).unwrap_err();
    options::install(options::Settings::default()).unwrap();

    drop(connection);
    assert_eq!(EnvironmentRegistry::global().unwrap().connection_count(), 0);
    EnvironmentRegistry::install_global(common::registry()).unwrap();
}
