//! SQL command building, query criteria and transactions over a worker pool.
//!
//! This crate sits between the worker pool (`sqlx-sqlite-worker-pool`) and
//! application-level code (tables, records). It provides:
//!
//! - [`Database`]: an open database whose commands run on a pool worker
//! - [`CommandBuilder`]: assembles one statement from DDL, row, read and
//!   transaction operations, then executes or fetches it
//! - [`Criteria`]: a reusable select/delete shape rendered onto a builder
//! - [`Transaction`]: root transactions and nested savepoints
//! - [`substitute_named_params`]: `:name` placeholder substitution with list expansion
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use sqlx_sqlite_toolkit::{Criteria, Database, Params, Row};
//! use sqlx_sqlite_worker_pool::WorkerPool;
//!
//! # async fn example() -> Result<(), sqlx_sqlite_toolkit::Error> {
//! let pool = WorkerPool::new(Default::default());
//! let db = Database::connect(&pool, "/tmp/mydb.db").await?;
//!
//! // Write
//! let mut row = Row::new();
//! row.insert("name".into(), json!("Alice"));
//! db.command().insert_row("users", &[row]).execute().await?;
//!
//! // Read
//! let mut params = Params::new();
//! params.insert("names".into(), json!(["Alice", "Bob"]));
//! let mut criteria = Criteria::new();
//! criteria
//!    .set_where_condition("name IN (:names)")
//!    .set_where_condition_params(params);
//! let rows = criteria.apply_to_select_command(db.command(), "users").fetch().await?;
//!
//! // Transaction
//! db.run_in_transaction(Default::default(), |tx| async move {
//!    tx.database().command().delete_row("users", None, None).execute().await?;
//!    Ok(())
//! })
//! .await?;
//!
//! db.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod criteria;
pub mod database;
pub mod error;
pub mod params;
pub mod recordset;
pub mod safe_sql;
pub mod transaction;

pub use command::{CommandBuilder, IndexSpec, Limit, WriteQueryResult};
pub use criteria::Criteria;
pub use database::Database;
pub use error::{Error, Result};
pub use params::{Params, substitute_named_params};
pub use recordset::{Row, parse_recordset};
pub use transaction::{
   IsolationLevel, Transaction, TransactionOptions, TransactionState, TransactionType,
};

// Re-export commonly used types from the pool
pub use sqlx_sqlite_worker_pool::{ErrorCode, Method, WorkerPool, WorkerPoolConfig};
