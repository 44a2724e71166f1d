use std::collections::HashMap;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sqlx_sqlite_toolkit::Database;
use sqlx_sqlite_worker_pool::WorkerPool;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::DalConfig;
use crate::{Error, Result};

const MEMORY_DATABASE: &str = ":memory:";

struct DatabasesInner {
   base_dir: PathBuf,
   pool: WorkerPool,
   instances: RwLock<HashMap<String, Database>>,
}

/// Open databases by name, one instance per name.
///
/// Names are resolved against the configured base directory. Every database
/// shares the registry's worker pool. Cloning yields another handle to the
/// same registry.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> sqlx_sqlite_dal::Result<()> {
/// use sqlx_sqlite_dal::{DalConfig, Databases};
///
/// let databases = Databases::new(DalConfig {
///    base_dir: "/var/lib/app".into(),
///    ..Default::default()
/// });
///
/// let db = databases.get_database("users/main.db").await?;
/// let same = databases.get_database("users/main.db").await?;
/// assert_eq!(db.name(), same.name());
///
/// databases.close_all().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Databases {
   inner: Arc<DatabasesInner>,
}

impl Databases {
   pub fn new(config: DalConfig) -> Self {
      Self {
         inner: Arc::new(DatabasesInner {
            base_dir: config.base_dir,
            pool: WorkerPool::new(config.pool),
            instances: RwLock::new(HashMap::new()),
         }),
      }
   }

   pub fn base_dir(&self) -> &Path {
      &self.inner.base_dir
   }

   pub fn pool(&self) -> &WorkerPool {
      &self.inner.pool
   }

   /// The open database registered under `name`, connecting it first if needed.
   ///
   /// A cached instance that has been closed is replaced by a fresh
   /// connection. The database file's parent directory is created when
   /// missing.
   pub async fn get_database(&self, name: &str) -> Result<Database> {
      let instances = self.inner.instances.read().await;

      // Return cached if db is still open
      if let Some(db) = instances.get(name).filter(|db| !db.is_closed()) {
         return Ok(db.clone());
      }

      drop(instances); // Release read lock before acquiring write lock

      let mut instances = self.inner.instances.write().await;

      // Double-check in case another task connected it while we waited for the write lock
      if let Some(db) = instances.get(name).filter(|db| !db.is_closed()) {
         return Ok(db.clone());
      }

      if let Some(stale) = instances.remove(name) {
         debug!("reconnecting closed database {}", name);
         stale.close().await?;
      }

      let path = self.resolve_database_path(name)?;
      let db = Database::connect(&self.inner.pool, &path).await?;
      instances.insert(name.to_string(), db.clone());

      Ok(db)
   }

   /// Close the database registered under `name`.
   ///
   /// Returns `false` if it was not open.
   pub async fn close(&self, name: &str) -> Result<bool> {
      let mut instances = self.inner.instances.write().await;

      match instances.remove(name) {
         Some(db) => {
            db.close().await?;
            Ok(true)
         }
         None => Ok(false),
      }
   }

   /// Close every database and shut the worker pool down.
   ///
   /// Every database is closed even if some fail; the first failure is
   /// returned.
   pub async fn close_all(&self) -> Result<()> {
      let mut instances = self.inner.instances.write().await;

      // Collect all databases to close
      let databases: Vec<Database> = instances.drain().map(|(_, db)| db).collect();

      let mut first_error = None;
      for db in databases {
         if let Err(err) = db.close().await {
            warn!("failed to close {}: {}", db.name(), err);
            first_error.get_or_insert(err);
         }
      }

      self.inner.pool.shutdown();

      match first_error {
         Some(err) => Err(err.into()),
         None => Ok(()),
      }
   }

   /// Resolve a database name to a file path under the base directory.
   ///
   /// The parent directory of the resulting path is created if it does not
   /// exist. `:memory:` is passed through unchanged.
   pub fn resolve_database_path(&self, name: &str) -> Result<PathBuf> {
      if name.trim().is_empty() {
         return Err(Error::InvalidPath("database name is empty".to_string()));
      }
      if name == MEMORY_DATABASE {
         return Ok(PathBuf::from(name));
      }

      let path = self.inner.base_dir.join(name);
      if let Some(parent) = path.parent() {
         create_dir_all(parent)?;
      }

      Ok(path)
   }
}

impl std::fmt::Debug for Databases {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.debug_struct("Databases")
         .field("base_dir", &self.inner.base_dir)
         .finish()
   }
}
