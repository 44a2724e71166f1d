use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sqlx_sqlite_worker_pool::WorkerPoolConfig;

/// Configuration for a [`Databases`](crate::Databases) registry
///
/// # Examples
///
/// ```
/// use sqlx_sqlite_dal::DalConfig;
///
/// let config: DalConfig = serde_json::from_str(r#"{"baseDir": "/var/lib/app"}"#).unwrap();
/// assert_eq!(config.base_dir.to_str(), Some("/var/lib/app"));
/// assert_eq!(config.pool.databases_per_worker, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DalConfig {
   /// Directory database names are resolved against
   ///
   /// Default: `data/base`
   pub base_dir: PathBuf,

   /// Worker pool settings
   pub pool: WorkerPoolConfig,
}

impl Default for DalConfig {
   fn default() -> Self {
      Self {
         base_dir: PathBuf::from("data/base"),
         pool: WorkerPoolConfig::default(),
      }
   }
}
