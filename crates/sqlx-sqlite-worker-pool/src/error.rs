//! Error types for sqlx-sqlite-worker-pool

use thiserror::Error;

/// Errors that may occur when working with sqlx-sqlite-worker-pool
#[derive(Error, Debug)]
pub enum Error {
   /// Error from the sqlx library. Standard sqlx errors are converted to this variant
   #[error("Sqlx error: {0}")]
   Sqlx(#[from] sqlx::Error),

   /// A worker reported that the database could not be opened
   #[error("connecting to database {0} failed")]
   Connection(String),

   /// No worker could be selected or spawned for the database
   #[error("no worker is available for database: {0}")]
   NoWorkerAvailable(String),

   /// The worker's command queue is gone (the worker was torn down)
   #[error("worker {0} has shut down")]
   WorkerClosed(String),

   /// The database identity is not bound to any worker
   #[error("database {0} is not bound to a worker")]
   NotBound(String),

   /// SQLite type that cannot be mapped to JSON
   #[error("unsupported datatype: {0}")]
   UnsupportedDatatype(String),

   /// An empty database identity was supplied
   #[error("Database path cannot be empty")]
   EmptyPath,
}
