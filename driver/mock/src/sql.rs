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

//! The small SQL dialect the driver accepts.
//!
//! ```text
//! CREATE TABLE t (c TYPE [NOT NULL] [PRIMARY KEY | UNIQUE], ...)
//! DROP TABLE t
//! INSERT INTO t [(c, ...)] VALUES (expr, ...) [, (expr, ...)]
//! SELECT * | c, ... FROM t [FETCH FIRST n ROWS ONLY]
//! DELETE FROM t [WHERE c = literal]
//! ```
//!
//! Unquoted identifiers are folded to upper case.

use odbc_bulk_core::error::DiagnosticRecord;

use crate::storage::{diag, ColumnDef, SqlType, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Parameter(usize),
    Literal(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateTable {
        table: String,
        columns: Vec<ColumnDef>,
    },
    DropTable {
        table: String,
    },
    Insert {
        table: String,
        columns: Option<Vec<String>>,
        rows: Vec<Vec<Expr>>,
    },
    Select {
        table: String,
        columns: Option<Vec<String>>,
        limit: Option<usize>,
    },
    Delete {
        table: String,
        filter: Option<(String, Value)>,
    },
}

impl Command {
    /// Number of `?` markers.
    pub fn parameter_count(&self) -> usize {
        match self {
            Self::Insert { rows, .. } => rows
                .iter()
                .flatten()
                .filter(|e| matches!(e, Expr::Parameter(_)))
                .count(),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(String),
    Text(String),
    Symbol(char),
}

fn syntax(message: impl Into<String>) -> DiagnosticRecord {
    diag("42601", -104, message)
}

fn tokenize(sql: &str) -> Result<Vec<Token>, DiagnosticRecord> {
    let mut tokens = Vec::new();
    let mut chars = sql.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_alphabetic() || c == '_' {
            let mut ident = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_alphanumeric() || c == '_' || c == '.' {
                    ident.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Ident(ident.to_uppercase()));
        } else if c == '"' {
            chars.next();
            let mut ident = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some(c) => ident.push(c),
                    None => return Err(syntax("unterminated quoted identifier")),
                }
            }
            tokens.push(Token::Ident(ident));
        } else if c.is_ascii_digit() || c == '-' || c == '.' {
            let mut number = String::new();
            number.push(c);
            chars.next();
            while let Some(&c) = chars.peek() {
                if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' {
                    number.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Number(number));
        } else if c == '\'' {
            chars.next();
            let mut text = String::new();
            loop {
                match chars.next() {
                    Some('\'') if chars.peek() == Some(&'\'') => {
                        chars.next();
                        text.push('\'');
                    }
                    Some('\'') => break,
                    Some(c) => text.push(c),
                    None => return Err(syntax("unterminated string literal")),
                }
            }
            tokens.push(Token::Text(text));
        } else if "(),*?=;".contains(c) {
            tokens.push(Token::Symbol(c));
            chars.next();
        } else {
            return Err(syntax(format!("unexpected character '{c}'")));
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    parameters: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(i)) if i == keyword)
    }

    fn at_symbol(&self, symbol: char) -> bool {
        self.peek() == Some(&Token::Symbol(symbol))
    }

    fn keyword(&mut self, keyword: &str) -> Result<(), DiagnosticRecord> {
        if self.at_keyword(keyword) {
            self.position += 1;
            Ok(())
        } else {
            Err(syntax(format!("expected {keyword}, found {:?}", self.peek())))
        }
    }

    fn symbol(&mut self, symbol: char) -> Result<(), DiagnosticRecord> {
        if self.at_symbol(symbol) {
            self.position += 1;
            Ok(())
        } else {
            Err(syntax(format!("expected '{symbol}', found {:?}", self.peek())))
        }
    }

    fn ident(&mut self) -> Result<String, DiagnosticRecord> {
        match self.next() {
            Some(Token::Ident(i)) => Ok(i),
            other => Err(syntax(format!("expected an identifier, found {other:?}"))),
        }
    }

    fn number(&mut self) -> Result<usize, DiagnosticRecord> {
        match self.next() {
            Some(Token::Number(n)) => n
                .parse()
                .map_err(|_| syntax(format!("expected a count, found {n}"))),
            other => Err(syntax(format!("expected a number, found {other:?}"))),
        }
    }

    fn ident_list(&mut self) -> Result<Vec<String>, DiagnosticRecord> {
        let mut idents = vec![self.ident()?];
        while self.at_symbol(',') {
            self.position += 1;
            idents.push(self.ident()?);
        }
        Ok(idents)
    }

    fn literal(&mut self) -> Result<Value, DiagnosticRecord> {
        match self.next() {
            Some(Token::Ident(i)) if i == "NULL" => Ok(Value::Null),
            Some(Token::Text(t)) => Ok(Value::Text(t)),
            Some(Token::Number(n)) => Ok(match n.parse::<i64>() {
                Ok(i) => Value::Integer(i),
                Err(_) => Value::Text(n),
            }),
            other => Err(syntax(format!("expected a literal, found {other:?}"))),
        }
    }

    fn expr(&mut self) -> Result<Expr, DiagnosticRecord> {
        if self.at_symbol('?') {
            self.position += 1;
            let index = self.parameters;
            self.parameters += 1;
            return Ok(Expr::Parameter(index));
        }
        Ok(Expr::Literal(self.literal()?))
    }

    fn finish(&mut self) -> Result<(), DiagnosticRecord> {
        if self.at_symbol(';') {
            self.position += 1;
        }
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(syntax(format!("unexpected {token:?}"))),
        }
    }

    fn sql_type(&mut self) -> Result<SqlType, DiagnosticRecord> {
        let name = self.ident()?;
        let mut args = Vec::new();
        if self.at_symbol('(') {
            self.position += 1;
            args.push(self.number()?);
            while self.at_symbol(',') {
                self.position += 1;
                args.push(self.number()?);
            }
            self.symbol(')')?;
        }
        let arg = |i: usize, default: usize| args.get(i).copied().unwrap_or(default);
        let sql_type = match name.as_str() {
            "CHAR" | "CHARACTER" => SqlType::Char(arg(0, 1)),
            "VARCHAR" => SqlType::Varchar(arg(0, 1)),
            "NVARCHAR" | "VARGRAPHIC" => SqlType::NVarchar(arg(0, 1)),
            "INTEGER" | "INT" => SqlType::Integer,
            "SMALLINT" => SqlType::SmallInt,
            "BIGINT" => SqlType::BigInt,
            "REAL" => SqlType::Real,
            "DOUBLE" => SqlType::Double,
            "FLOAT" => SqlType::Float,
            "DECIMAL" | "NUMERIC" | "DEC" => SqlType::Decimal {
                precision: arg(0, 5),
                scale: arg(1, 0),
            },
            "DECFLOAT" => SqlType::DecFloat,
            "DATE" => SqlType::Date,
            "TIME" => SqlType::Time,
            "TIMESTAMP" => SqlType::Timestamp,
            "BLOB" => SqlType::Blob(arg(0, 1024)),
            other => return Err(syntax(format!("unknown type {other}"))),
        };
        Ok(sql_type)
    }

    fn column_def(&mut self) -> Result<ColumnDef, DiagnosticRecord> {
        let name = self.ident()?;
        let sql_type = self.sql_type()?;
        let mut column = ColumnDef {
            name,
            sql_type,
            not_null: false,
            unique: false,
        };
        loop {
            if self.at_keyword("NOT") {
                self.position += 1;
                self.keyword("NULL")?;
                column.not_null = true;
            } else if self.at_keyword("PRIMARY") {
                self.position += 1;
                self.keyword("KEY")?;
                column.not_null = true;
                column.unique = true;
            } else if self.at_keyword("UNIQUE") {
                self.position += 1;
                column.unique = true;
            } else {
                return Ok(column);
            }
        }
    }

    fn command(&mut self) -> Result<Command, DiagnosticRecord> {
        let verb = self.ident()?;
        let command = match verb.as_str() {
            "CREATE" => {
                self.keyword("TABLE")?;
                let table = self.ident()?;
                self.symbol('(')?;
                let mut columns = vec![self.column_def()?];
                while self.at_symbol(',') {
                    self.position += 1;
                    columns.push(self.column_def()?);
                }
                self.symbol(')')?;
                Command::CreateTable { table, columns }
            }
            "DROP" => {
                self.keyword("TABLE")?;
                Command::DropTable {
                    table: self.ident()?,
                }
            }
            "INSERT" => {
                self.keyword("INTO")?;
                let table = self.ident()?;
                let columns = if self.at_symbol('(') {
                    self.position += 1;
                    let columns = self.ident_list()?;
                    self.symbol(')')?;
                    Some(columns)
                } else {
                    None
                };
                self.keyword("VALUES")?;
                let mut rows = Vec::new();
                loop {
                    self.symbol('(')?;
                    let mut row = vec![self.expr()?];
                    while self.at_symbol(',') {
                        self.position += 1;
                        row.push(self.expr()?);
                    }
                    self.symbol(')')?;
                    rows.push(row);
                    if !self.at_symbol(',') {
                        break;
                    }
                    self.position += 1;
                }
                Command::Insert {
                    table,
                    columns,
                    rows,
                }
            }
            "SELECT" => {
                let columns = if self.at_symbol('*') {
                    self.position += 1;
                    None
                } else {
                    Some(self.ident_list()?)
                };
                self.keyword("FROM")?;
                let table = self.ident()?;
                let limit = if self.at_keyword("FETCH") {
                    self.position += 1;
                    self.keyword("FIRST")?;
                    let n = self.number()?;
                    if self.at_keyword("ROWS") {
                        self.position += 1;
                    } else {
                        self.keyword("ROW")?;
                    }
                    self.keyword("ONLY")?;
                    Some(n)
                } else {
                    None
                };
                Command::Select {
                    table,
                    columns,
                    limit,
                }
            }
            "DELETE" => {
                self.keyword("FROM")?;
                let table = self.ident()?;
                let filter = if self.at_keyword("WHERE") {
                    self.position += 1;
                    let column = self.ident()?;
                    self.symbol('=')?;
                    Some((column, self.literal()?))
                } else {
                    None
                };
                Command::Delete { table, filter }
            }
            other => return Err(syntax(format!("unsupported statement {other}"))),
        };
        self.finish()?;
        Ok(command)
    }
}

/// Parse one statement.
pub fn parse(sql: &str) -> Result<Command, DiagnosticRecord> {
    let mut parser = Parser {
        tokens: tokenize(sql)?,
        position: 0,
        parameters: 0,
    };
    parser.command()
}
