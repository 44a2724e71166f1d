//! SQLite data-access layer.
//!
//! Builds on `sqlx-sqlite-toolkit` (command builder, criteria, transactions)
//! and `sqlx-sqlite-worker-pool` (databases packed onto a bounded set of
//! worker tasks) to provide:
//!
//! - [`Databases`]: a registry that opens each named database once, under a
//!   base directory, on a shared worker pool
//! - [`ColumnType`]: the closed set of column types with DDL text,
//!   validation and storage conversion
//! - [`TableSchema`] and [`Table`]: table definitions, creation and
//!   insert/find/update/delete/count helpers
//! - [`Record`]: a keyed value container that exports to and imports from rows
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use sqlx_sqlite_dal::{ColumnDef, ColumnType, DalConfig, Databases, Table, TableSchema};
//!
//! # async fn example() -> sqlx_sqlite_dal::Result<()> {
//! let databases = Databases::new(DalConfig::default());
//! let db = databases.get_database("app.db").await?;
//!
//! let schema = TableSchema::new("notes")
//!    .column("id", ColumnDef::new(ColumnType::Integer).primary_key())
//!    .column("body", ColumnDef::new(ColumnType::Text))
//!    .column("pinned", ColumnDef::new(ColumnType::Boolean).not_null().default_value("0"));
//! let notes = Table::sync(schema, &db).await?;
//!
//! let mut note = notes.new_record();
//! note.set_value("body", json!("hello")).set_value("pinned", json!(true));
//! notes.insert_record(&mut note).await?;
//!
//! let pinned = notes.find_all_where("pinned = 1", None, false).await?;
//! assert_eq!(pinned[0]["pinned"], json!(true));
//!
//! databases.close_all().await?;
//! # Ok(())
//! # }
//! ```

mod config;
pub mod data_types;
mod error;
pub mod record;
mod registry;
pub mod table;

pub use config::DalConfig;
pub use data_types::ColumnType;
pub use error::{Error, Result};
pub use record::Record;
pub use registry::Databases;
pub use table::{ColumnDef, IndexDef, Table, TableSchema, drop_table};

// Re-export the toolkit surface used alongside tables
pub use sqlx_sqlite_toolkit::{
   CommandBuilder, Criteria, Database, IsolationLevel, Params, Row, Transaction,
   TransactionOptions, TransactionType, WriteQueryResult,
};
pub use sqlx_sqlite_worker_pool::WorkerPoolConfig;
