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

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;

use tracing_subscriber::EnvFilter;

use odbc_bulk_core::Column;
use odbc_bulk_driver_manager::{Connection, EnvironmentRegistry, WriteInput};

static NEXT_DATABASE: AtomicUsize = AtomicUsize::new(0);
static TRACING: Once = Once::new();

/// Route `tracing` output to the test harness; `RUST_LOG` picks the level.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// A database name no other test uses, so tests can run concurrently.
pub fn unique_database(prefix: &str) -> String {
    let n = NEXT_DATABASE.fetch_add(1, Ordering::SeqCst);
    format!("{prefix}_{}_{n}", std::process::id())
}

pub fn registry() -> EnvironmentRegistry {
    init_tracing();
    EnvironmentRegistry::load_static(odbc_bulk_mock_driver::api())
}

pub fn connect(registry: &EnvironmentRegistry, database: &str) -> Connection {
    Connection::connect_with(registry, &format!("DATABASE={database};"), 30, 30).unwrap()
}

/// A registry and a connection to a fresh database.
pub fn fresh(prefix: &str) -> (EnvironmentRegistry, Connection, String) {
    let registry = registry();
    let database = unique_database(prefix);
    let connection = connect(&registry, &database);
    (registry, connection, database)
}

pub fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// Rows `0..rows` of a table with a text, an integer and a double column,
/// every seventh cell NULL.
pub fn sample_input(rows: usize) -> WriteInput {
    let text = Column::from_strings(
        (0..rows).map(|i| (i % 7 != 3).then(|| format!("row-{i}"))),
    );
    let integer = Column::from_integers((0..rows).map(|i| (i % 7 != 4).then_some(i as i64 - 50)));
    let double = Column::from_numerics((0..rows).map(|i| (i % 7 != 5).then_some(i as f64 * 0.25)));
    WriteInput::from_columns(names(&["LABEL", "AMOUNT", "RATIO"]), vec![text, integer, double])
}

pub const SAMPLE_TABLE: &str =
    "CREATE TABLE SAMPLE (LABEL VARCHAR(16), AMOUNT INTEGER, RATIO DOUBLE)";
