//! # sqlx-sqlite-worker-pool
//!
//! Packs many SQLite databases onto a small number of worker tasks.
//!
//! ## Core Types
//!
//! - **[`WorkerPool`]**: Binds database identities to workers and evicts idle workers
//! - **[`ExecutionHandle`]**: Sends commands to whichever worker holds a database
//! - **[`WorkerContext`]**: One task owning the connections of several databases
//! - **[`Method`]**: The commands a worker understands
//! - **[`Response`]**: Reply envelope with error code, message and typed payload
//! - **[`Recordset`]**: Row-major result of a read
//! - **[`Error`]**: Error type for pool operations
//!
//! ## Architecture
//!
//! - **Packing**: A worker serves up to `databases_per_worker` databases (5 by default).
//!   New databases fill the oldest worker with room before a new worker is spawned.
//! - **Ordering**: Each worker drains a single command queue, so commands for one
//!   database run in the order they were sent.
//! - **Eviction**: Workers holding no database are torn down after every acquire
//!   and release.
//!
//! ## Usage
//!
//! ```no_run
//! use sqlx_sqlite_worker_pool::{Method, Recordset, WorkerPool, WorkerPoolConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = WorkerPool::new(WorkerPoolConfig::default());
//!     let handle = pool.acquire("example.db").await?;
//!
//!     handle
//!         .invoke(Method::ExecDml("CREATE TABLE IF NOT EXISTS users (name TEXT);".into()))
//!         .await?;
//!
//!     let reply = handle
//!         .invoke(Method::GetRecordSet("SELECT name FROM users;".into()))
//!         .await?;
//!     let recordset: Recordset = reply.data()?;
//!     println!("{} rows", recordset.count);
//!
//!     pool.release("example.db").await?;
//!     Ok(())
//! }
//! ```
//!
mod backend;
mod config;
mod decode;
mod error;
mod pool;
mod response;
mod worker;

// Re-export public types
pub use backend::{DmlOutcome, Recordset};
pub use config::WorkerPoolConfig;
pub use error::Error;
pub use pool::{ExecutionHandle, PoolSpaceState, WorkerPool};
pub use response::{DataType, ErrorCode, Response};
pub use worker::{Method, WorkerContext, WorkerKey};

/// A type alias for Results with our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
