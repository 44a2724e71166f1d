//! A single open SQLite database owned by a worker

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{Column, ConnectOptions, Connection, Executor, Row};
use tracing::debug;

use crate::Result;
use crate::config::WorkerPoolConfig;
use crate::decode::to_json;

/// Rows returned by a read, flattened row-major
///
/// `values` holds `count * field_names.len()` entries: the first row's cells
/// in column order, then the second row's, and so on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recordset {
   pub field_names: Vec<String>,
   pub values: Vec<JsonValue>,
   pub count: usize,
}

impl Recordset {
   /// Iterate the flattened values one row at a time
   pub fn rows(&self) -> impl Iterator<Item = &[JsonValue]> {
      let width = self.field_names.len().max(1);
      self.values.chunks(width).take(self.count)
   }
}

/// Outcome of a write statement batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmlOutcome {
   pub rows_changed: u64,
   pub last_row_id: i64,
}

/// One connection to one database file
pub(crate) struct SqliteBackend {
   conn: SqliteConnection,
}

impl SqliteBackend {
   /// Open `path`, creating the file when it does not exist yet.
   ///
   /// `:memory:` opens a private in-memory database.
   pub(crate) async fn open(path: &str, config: &WorkerPoolConfig) -> Result<Self> {
      let options = if is_memory_path(path) {
         SqliteConnectOptions::from_str("sqlite::memory:")?
      } else {
         SqliteConnectOptions::new().filename(path).create_if_missing(true)
      };

      let conn = options
         .busy_timeout(Duration::from_secs(config.busy_timeout_secs))
         .connect()
         .await?;

      debug!("opened sqlite database {}", path);
      Ok(Self { conn })
   }

   pub(crate) async fn close(self) -> Result<()> {
      self.conn.close().await?;
      Ok(())
   }

   /// Run one or more write statements as a single batch
   ///
   /// SQLite steps through every `;`-separated statement in `sql`.
   pub(crate) async fn exec_dml(&mut self, sql: &str) -> Result<DmlOutcome> {
      let result = Executor::execute(&mut self.conn, sql).await?;
      Ok(DmlOutcome {
         rows_changed: result.rows_affected(),
         last_row_id: result.last_insert_rowid(),
      })
   }

   pub(crate) async fn get_recordset(&mut self, sql: &str) -> Result<Recordset> {
      let rows = Executor::fetch_all(&mut self.conn, sql).await?;

      let mut recordset = Recordset::default();
      if let Some(first) = rows.first() {
         recordset.field_names = first
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();
      }

      for row in &rows {
         for index in 0..row.columns().len() {
            recordset.values.push(to_json(row.try_get_raw(index)?)?);
         }
      }
      recordset.count = rows.len();

      Ok(recordset)
   }

   pub(crate) async fn last_row_id(&mut self) -> Result<i64> {
      let id: i64 = sqlx::query_scalar("SELECT last_insert_rowid()")
         .fetch_one(&mut self.conn)
         .await?;
      Ok(id)
   }
}

fn is_memory_path(path: &str) -> bool {
   path == ":memory:"
}
