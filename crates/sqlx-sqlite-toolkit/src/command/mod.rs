//! The SQL command builder.
//!
//! A [`CommandBuilder`] accumulates text fragments for one logical statement
//! and then either executes it (discarding rows) or fetches its rows. Every
//! operation that starts a new statement (`create_table`, `insert_row`,
//! `select`, `start_transaction`, ...) clears whatever was accumulated before.
//!
//! Operations are grouped by concern in submodules, all implemented on the
//! same builder type:
//!
//! - `schema`: create/drop tables and indexes, add columns
//! - `rows`: insert, upsert, update and delete rows
//! - `read`: select, from, where, order by, limit, offset, count
//! - `transaction`: begin, savepoint, commit, rollback, isolation level
//! - `status`: last inserted row id
//!
//! Invalid input does not panic or fail immediately. The first problem is
//! recorded and reported by [`sql`](CommandBuilder::sql),
//! [`execute`](CommandBuilder::execute) or [`fetch`](CommandBuilder::fetch).

mod read;
mod rows;
mod schema;
mod status;
mod transaction;

use std::future::{Future, IntoFuture};
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use sqlx_sqlite_worker_pool::{Method, Recordset, Response};

pub use read::Limit;
pub use schema::IndexSpec;

use crate::database::Database;
use crate::recordset::{Row, parse_recordset};
use crate::{Error, Result};

/// Result returned from write operations (e.g. INSERT, UPDATE, DELETE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteQueryResult {
   /// The number of rows affected by the write operation.
   pub rows_affected: u64,
   /// The last inserted row ID (SQLite ROWID).
   ///
   /// This is the connection's most recent insert, so statements that insert
   /// nothing report whatever was inserted before them.
   pub last_insert_id: i64,
}

/// Assembles one SQL statement and runs it against a [`Database`].
///
/// # Examples
///
/// ```
/// use sqlx_sqlite_toolkit::CommandBuilder;
///
/// let sql = CommandBuilder::detached()
///    .drop_table("foo")
///    .sql()
///    .unwrap();
/// assert_eq!(sql, "DROP TABLE IF EXISTS `foo`;");
/// ```
pub struct CommandBuilder {
   parts: Vec<String>,
   database: Option<Database>,
   error: Option<String>,
}

impl CommandBuilder {
   pub fn new(database: Database) -> Self {
      Self {
         parts: Vec::new(),
         database: Some(database),
         error: None,
      }
   }

   /// A builder with no database, useful only for rendering SQL.
   pub fn detached() -> Self {
      Self {
         parts: Vec::new(),
         database: None,
         error: None,
      }
   }

   pub fn database(&self) -> Option<&Database> {
      self.database.as_ref()
   }

   /// Drop every fragment accumulated so far, along with any recorded error.
   pub fn reset(mut self) -> Self {
      self.parts.clear();
      self.error = None;
      self
   }

   /// Append a raw fragment.
   pub fn append(mut self, part: impl Into<String>) -> Self {
      self.parts.push(part.into());
      self
   }

   /// Record an input problem; only the first one is kept.
   pub(crate) fn fail(mut self, message: impl Into<String>) -> Self {
      if self.error.is_none() {
         self.error = Some(message.into());
      }
      self
   }

   /// The assembled statement, terminated by `;`.
   pub fn sql(&self) -> Result<String> {
      if let Some(message) = &self.error {
         return Err(Error::InvalidArgument(message.clone()));
      }

      let mut sql = self.parts.concat();
      if !sql.ends_with(';') {
         sql.push(';');
      }
      Ok(sql)
   }

   /// Run the statement for its side effects.
   pub async fn execute(&self) -> Result<WriteQueryResult> {
      let sql = self.sql()?;
      let response = self.bound_database()?.exec_command(Method::ExecDml(sql)).await?;
      let (rows_affected, last_insert_id): (u64, i64) = check(response)?.data()?;

      Ok(WriteQueryResult {
         rows_affected,
         last_insert_id,
      })
   }

   /// Run the statement and return its rows.
   pub async fn fetch(&self) -> Result<Vec<Row>> {
      let sql = self.sql()?;
      let response = self
         .bound_database()?
         .exec_command(Method::GetRecordSet(sql))
         .await?;
      let recordset: Recordset = check(response)?.data()?;

      Ok(parse_recordset(&recordset))
   }

   fn bound_database(&self) -> Result<&Database> {
      self
         .database
         .as_ref()
         .ok_or_else(|| Error::NotFound("command builder is not bound to a database".into()))
   }
}

impl IntoFuture for CommandBuilder {
   type Output = Result<WriteQueryResult>;
   type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

   fn into_future(self) -> Self::IntoFuture {
      Box::pin(async move { self.execute().await })
   }
}

/// Turn a non-success reply into [`Error::Backend`].
pub(crate) fn check(response: Response) -> Result<Response> {
   match response.error_code {
      Some(code) => Err(Error::Backend {
         code,
         message: response.error_msg,
      }),
      None => Ok(response),
   }
}
