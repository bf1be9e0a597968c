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

//! Statement execution against an in-memory database.

use std::slice;

use tracing::debug;

use odbc_bulk_core::error::DiagnosticRecord;
use odbc_bulk_core::ffi::constants::*;
use odbc_bulk_core::ffi::{SQLLEN, SQLRETURN, SQLWCHAR};

use crate::handle::{BoundParameter, Connection, ResultSet, Statement};
use crate::sql::{Command, Expr};
use crate::storage::{coerce, databases, diag, Database, Table, Value};

/// Read row `row` of a column-wise bound parameter array.
///
/// # Safety
///
/// The parameter buffers must hold at least `row + 1` elements.
pub unsafe fn read_parameter(
    parameter: &BoundParameter,
    row: usize,
) -> Result<Value, DiagnosticRecord> {
    let indicator: SQLLEN = if parameter.indicators.is_null() {
        0
    } else {
        *parameter.indicators.add(row)
    };
    if indicator == SQL_NULL_DATA {
        return Ok(Value::Null);
    }
    if parameter.buffer.is_null() {
        return Err(diag("HY009", 0, "null parameter buffer"));
    }

    let value = match parameter.c_type {
        SQL_C_WCHAR => {
            let units = parameter.buffer_length.max(0) as usize / std::mem::size_of::<SQLWCHAR>();
            let cell = slice::from_raw_parts(
                (parameter.buffer as *const SQLWCHAR).add(row * units),
                units,
            );
            let len = if indicator == SQL_NTS {
                cell.iter().position(|&c| c == 0).unwrap_or(units)
            } else {
                (indicator.max(0) as usize / std::mem::size_of::<SQLWCHAR>()).min(units)
            };
            let text = String::from_utf16(&cell[..len])
                .map_err(|_| diag("22021", -330, "parameter is not valid UTF-16"))?;
            Value::Text(text)
        }
        SQL_C_SBIGINT => Value::Integer(*(parameter.buffer as *const i64).add(row)),
        SQL_C_LONG => Value::Integer(i64::from(*(parameter.buffer as *const i32).add(row))),
        SQL_C_SHORT => Value::Integer(i64::from(*(parameter.buffer as *const i16).add(row))),
        SQL_C_DOUBLE => Value::Double(*(parameter.buffer as *const f64).add(row)),
        other => {
            return Err(diag(
                "HY003",
                0,
                format!("unsupported parameter C type {other}"),
            ))
        }
    };
    Ok(value)
}

fn undefined_table(table: &str) -> DiagnosticRecord {
    diag("42704", -204, format!("{table} is an undefined name"))
}

fn undefined_column(column: &str) -> DiagnosticRecord {
    diag("42703", -206, format!("{column} is not valid in the context where it is used"))
}

fn table_mut<'a>(database: &'a mut Database, table: &str) -> Result<&'a mut Table, DiagnosticRecord> {
    database
        .tables
        .get_mut(table)
        .ok_or_else(|| undefined_table(table))
}

/// What an execution produced.
pub enum Outcome {
    /// A cursor over rows.
    Rows(ResultSet),
    /// The number of rows changed.
    Count(usize),
}

fn modifies(command: &Command) -> bool {
    !matches!(command, Command::Select { .. })
}

/// Run `command` with `parameters`, one inner vector per parameter set.
///
/// With autocommit on, a failing statement leaves no trace. With
/// autocommit off, the first change opens a transaction and a failure
/// keeps the rows changed before it until the transaction ends.
pub fn execute(
    dbc: &mut Connection,
    database_name: &str,
    command: &Command,
    parameters: &[Vec<Value>],
) -> Result<Outcome, DiagnosticRecord> {
    let mut registry = databases();
    let database = registry.get(database_name);

    let before = if modifies(command) {
        if dbc.autocommit {
            Some(database.tables.clone())
        } else {
            if dbc.snapshot.is_none() {
                dbc.snapshot = Some(database.tables.clone());
            }
            None
        }
    } else {
        None
    };

    let outcome = run(database, command, parameters);
    if outcome.is_err() {
        if let Some(tables) = before {
            database.tables = tables;
        }
    }
    outcome
}

fn run(
    database: &mut Database,
    command: &Command,
    parameters: &[Vec<Value>],
) -> Result<Outcome, DiagnosticRecord> {
    match command {
        Command::CreateTable { table, columns } => {
            if database.tables.contains_key(table) {
                return Err(diag("42710", -601, format!("{table} already exists")));
            }
            database.tables.insert(
                table.clone(),
                Table {
                    columns: columns.clone(),
                    rows: Vec::new(),
                },
            );
            Ok(Outcome::Count(0))
        }
        Command::DropTable { table } => {
            database
                .tables
                .remove(table)
                .ok_or_else(|| undefined_table(table))?;
            Ok(Outcome::Count(0))
        }
        Command::Insert {
            table,
            columns,
            rows,
        } => {
            let target = table_mut(database, table)?;
            let positions = match columns {
                Some(names) => names
                    .iter()
                    .map(|name| target.column_index(name).ok_or_else(|| undefined_column(name)))
                    .collect::<Result<Vec<_>, _>>()?,
                None => (0..target.columns.len()).collect(),
            };

            let no_parameters = [Vec::new()];
            let sets = if command.parameter_count() == 0 {
                &no_parameters[..]
            } else {
                parameters
            };

            let mut inserted = 0;
            for set in sets {
                for exprs in rows {
                    if exprs.len() != positions.len() {
                        return Err(diag(
                            "42802",
                            -117,
                            "the number of values does not match the number of columns",
                        ));
                    }
                    let mut row = vec![Value::Null; target.columns.len()];
                    for (expr, &position) in exprs.iter().zip(&positions) {
                        let value = match expr {
                            Expr::Literal(value) => value.clone(),
                            Expr::Parameter(index) => set.get(*index).cloned().ok_or_else(|| {
                                diag("07002", 0, "not every parameter marker is bound")
                            })?,
                        };
                        row[position] = value;
                    }
                    let row = row
                        .into_iter()
                        .zip(&target.columns)
                        .map(|(value, column)| coerce(column, value))
                        .collect::<Result<Vec<_>, _>>()?;
                    target.insert(row)?;
                    inserted += 1;
                }
            }
            debug!(table, rows = inserted, "inserted");
            Ok(Outcome::Count(inserted))
        }
        Command::Select {
            table,
            columns,
            limit,
        } => {
            let source = table_mut(database, table)?;
            let positions = match columns {
                Some(names) => names
                    .iter()
                    .map(|name| source.column_index(name).ok_or_else(|| undefined_column(name)))
                    .collect::<Result<Vec<_>, _>>()?,
                None => (0..source.columns.len()).collect(),
            };
            let take = limit.unwrap_or(usize::MAX);
            let rows = source
                .rows
                .iter()
                .take(take)
                .map(|row| positions.iter().map(|&p| row[p].clone()).collect())
                .collect();
            Ok(Outcome::Rows(ResultSet {
                columns: positions.iter().map(|&p| source.columns[p].clone()).collect(),
                rows,
                position: 0,
            }))
        }
        Command::Delete { table, filter } => {
            let target = table_mut(database, table)?;
            let before = target.rows.len();
            match filter {
                Some((column, value)) => {
                    let position = target
                        .column_index(column)
                        .ok_or_else(|| undefined_column(column))?;
                    let value = coerce(&target.columns[position], value.clone())?;
                    target.rows.retain(|row| row[position] != value);
                }
                None => target.rows.clear(),
            }
            Ok(Outcome::Count(before - target.rows.len()))
        }
    }
}

/// Execute the prepared or given command of `statement` and record its
/// outcome on the statement.
///
/// # Safety
///
/// `statement.dbc` and every bound parameter buffer must be valid.
pub unsafe fn execute_statement(statement: &mut Statement, command: &Command) -> SQLRETURN {
    let count = command.parameter_count();
    let mut sets = Vec::new();
    if count > 0 {
        if statement.param_bind_type != SQL_PARAM_BIND_BY_COLUMN as usize {
            statement
                .diagnostics
                .push(diag("HYC00", 0, "only column-wise parameter binding is supported"));
            return SQL_ERROR;
        }
        for row in 0..statement.paramset_size {
            let mut set = Vec::with_capacity(count);
            for number in 1..=count {
                let Some(parameter) = statement.parameters.get(&(number as u16)) else {
                    statement
                        .diagnostics
                        .push(diag("07002", 0, format!("parameter {number} is not bound")));
                    return SQL_ERROR;
                };
                match read_parameter(parameter, row) {
                    Ok(value) => set.push(value),
                    Err(record) => {
                        statement.diagnostics.push(record);
                        return SQL_ERROR;
                    }
                }
            }
            sets.push(set);
        }
    }

    let dbc = &mut *statement.dbc;
    statement.result = None;
    match execute(dbc, &statement.database, command, &sets) {
        Ok(Outcome::Rows(result)) => {
            statement.row_count = -1;
            statement.result = Some(result);
            SQL_SUCCESS
        }
        Ok(Outcome::Count(rows)) => {
            statement.row_count = rows as SQLLEN;
            let searched = matches!(command, Command::Delete { .. });
            if searched && rows == 0 {
                SQL_NO_DATA
            } else {
                SQL_SUCCESS
            }
        }
        Err(record) => {
            statement.row_count = -1;
            statement.diagnostics.push(record);
            SQL_ERROR
        }
    }
}
