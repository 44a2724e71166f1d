//! Configuration for the worker pool

use serde::{Deserialize, Serialize};

/// Configuration for a [`WorkerPool`](crate::WorkerPool)
///
/// # Examples
///
/// ```
/// use sqlx_sqlite_worker_pool::WorkerPoolConfig;
///
/// // Use defaults
/// let config = WorkerPoolConfig::default();
/// assert_eq!(config.databases_per_worker, 5);
///
/// // Override just one field
/// let config = WorkerPoolConfig {
///     databases_per_worker: 2,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
   /// Number of databases a single worker serves before it counts as full
   ///
   /// A new worker is only spawned once every existing worker holds this many
   /// databases. Values below 1 are treated as 1.
   ///
   /// Default: 5
   pub databases_per_worker: usize,

   /// How long a statement waits on a locked database file (in seconds)
   ///
   /// Default: 5
   pub busy_timeout_secs: u64,
}

impl WorkerPoolConfig {
   pub(crate) fn capacity(&self) -> usize {
      self.databases_per_worker.max(1)
   }
}

impl Default for WorkerPoolConfig {
   fn default() -> Self {
      Self {
         databases_per_worker: 5,
         busy_timeout_secs: 5,
      }
   }
}
