//! Seam between planned statements and whatever executes them.

use diesel::pg::Pg;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::sql_query;
use diesel::sql_types::{Binary, Int8, Text};
use thiserror::Error;

/// Something that can turn SQL text with `?` placeholders into a statement.
pub trait StatementConnection {
    type Statement: PreparedStatement<Error = Self::Error>;
    type Error;

    fn prepare(&mut self, sql: &str) -> Result<Self::Statement, Self::Error>;
}

/// Positional binds are 1-based, matching placeholder order in the SQL text.
pub trait PreparedStatement {
    type Error;

    fn bind_bytes(&mut self, position: usize, value: &[u8]) -> Result<(), Self::Error>;
    fn bind_text(&mut self, position: usize, value: &str) -> Result<(), Self::Error>;
    fn bind_i64(&mut self, position: usize, value: i64) -> Result<(), Self::Error>;
    fn set_fetch_size(&mut self, rows: i32) -> Result<(), Self::Error>;

    /// Releases the statement; called when preparation fails part way.
    fn close(self);
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PgBindError {
    #[error("bind position {got} out of order, expected {expected}")]
    OutOfOrder { expected: usize, got: usize },
    #[error("statement expects {expected} binds but {bound} were supplied")]
    ArityMismatch { expected: usize, bound: usize },
}

/// Prepares planned SQL as diesel boxed `sql_query` values for Postgres.
#[derive(Debug, Default, Clone, Copy)]
pub struct PgStatementConnection;

pub struct PgStatement {
    query: BoxedSqlQuery<'static, Pg, SqlQuery>,
    sql: String,
    expected: usize,
    bound: usize,
    fetch_size: Option<i32>,
}

impl StatementConnection for PgStatementConnection {
    type Statement = PgStatement;
    type Error = PgBindError;

    fn prepare(&mut self, sql: &str) -> Result<PgStatement, PgBindError> {
        let (sql, expected) = number_placeholders(sql);
        Ok(PgStatement {
            query: sql_query(sql.clone()).into_boxed::<Pg>(),
            expected,
            sql,
            bound: 0,
            fetch_size: None,
        })
    }
}

impl PgStatement {
    /// SQL text with `$n` placeholders.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn bound(&self) -> usize {
        self.bound
    }

    pub fn fetch_size(&self) -> Option<i32> {
        self.fetch_size
    }

    /// Hands back the bound query once every placeholder has a value.
    pub fn into_query(self) -> Result<BoxedSqlQuery<'static, Pg, SqlQuery>, PgBindError> {
        if self.bound != self.expected {
            return Err(PgBindError::ArityMismatch {
                expected: self.expected,
                bound: self.bound,
            });
        }
        Ok(self.query)
    }

    fn next_position(&mut self, position: usize) -> Result<(), PgBindError> {
        let expected = self.bound + 1;
        if position != expected {
            return Err(PgBindError::OutOfOrder {
                expected,
                got: position,
            });
        }
        if position > self.expected {
            return Err(PgBindError::ArityMismatch {
                expected: self.expected,
                bound: position,
            });
        }
        self.bound = position;
        Ok(())
    }
}

impl PreparedStatement for PgStatement {
    type Error = PgBindError;

    fn bind_bytes(&mut self, position: usize, value: &[u8]) -> Result<(), PgBindError> {
        self.next_position(position)?;
        let query = std::mem::replace(&mut self.query, sql_query("").into_boxed::<Pg>());
        self.query = query.bind::<Binary, _>(value.to_vec());
        Ok(())
    }

    fn bind_text(&mut self, position: usize, value: &str) -> Result<(), PgBindError> {
        self.next_position(position)?;
        let query = std::mem::replace(&mut self.query, sql_query("").into_boxed::<Pg>());
        self.query = query.bind::<Text, _>(value.to_string());
        Ok(())
    }

    fn bind_i64(&mut self, position: usize, value: i64) -> Result<(), PgBindError> {
        self.next_position(position)?;
        let query = std::mem::replace(&mut self.query, sql_query("").into_boxed::<Pg>());
        self.query = query.bind::<Int8, _>(value);
        Ok(())
    }

    fn set_fetch_size(&mut self, rows: i32) -> Result<(), PgBindError> {
        self.fetch_size = Some(rows);
        Ok(())
    }

    fn close(self) {}
}

/// Numbers `?` placeholders as Postgres `$n` and returns how many were seen.
fn number_placeholders(sql: &str) -> (String, usize) {
    let mut numbered = String::with_capacity(sql.len() + 8);
    let mut count = 0;
    for ch in sql.chars() {
        if ch == '?' {
            count += 1;
            numbered.push('$');
            numbered.push_str(&count.to_string());
        } else {
            numbered.push(ch);
        }
    }
    (numbered, count)
}
