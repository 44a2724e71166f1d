//! Packing databases onto worker contexts

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::Result;
use crate::config::WorkerPoolConfig;
use crate::error::Error;
use crate::response::Response;
use crate::worker::{Method, WorkerContext, WorkerKey};

/// Snapshot of how full each worker is
///
/// Every live worker appears in exactly one list, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolSpaceState {
   /// Workers holding as many databases as they may
   pub full: Vec<WorkerKey>,
   /// Workers holding at least one database but with room left
   pub unfilled: Vec<WorkerKey>,
   /// Workers holding nothing
   pub empty: Vec<WorkerKey>,
}

#[derive(Default)]
struct Registry {
   next_worker_id: u64,
   workers: BTreeMap<WorkerKey, Arc<WorkerContext>>,
   bindings: HashMap<String, WorkerKey>,
   /// Opens in flight per worker; they count towards occupancy so a worker
   /// picked for an open is neither evicted nor overfilled meanwhile
   reservations: HashMap<WorkerKey, usize>,
}

impl Registry {
   fn occupancy(&self) -> BTreeMap<WorkerKey, usize> {
      let mut counts: BTreeMap<WorkerKey, usize> =
         self.workers.keys().map(|key| (*key, 0)).collect();
      for key in self.bindings.values() {
         if let Some(count) = counts.get_mut(key) {
            *count += 1;
         }
      }
      for (key, reserved) in &self.reservations {
         if let Some(count) = counts.get_mut(key) {
            *count += reserved;
         }
      }
      counts
   }

   fn space_state(&self, capacity: usize) -> PoolSpaceState {
      let mut state = PoolSpaceState::default();
      for (key, count) in self.occupancy() {
         match count {
            0 => state.empty.push(key),
            n if n >= capacity => state.full.push(key),
            _ => state.unfilled.push(key),
         }
      }
      state
   }

   /// Pick a worker for one more database and reserve a slot on it
   fn allocate(&mut self, database_id: &str, config: &WorkerPoolConfig) -> Result<Arc<WorkerContext>> {
      let state = self.space_state(config.capacity());

      let key = match state.unfilled.first().or(state.empty.first()) {
         Some(key) => *key,
         None => {
            let key = WorkerKey::new(self.next_worker_id);
            self.next_worker_id += 1;
            let worker = WorkerContext::spawn(key, config.clone())?;
            self.workers.insert(key, Arc::new(worker));
            key
         }
      };

      *self.reservations.entry(key).or_default() += 1;
      self.sweep();

      self
         .workers
         .get(&key)
         .cloned()
         .ok_or_else(|| Error::NoWorkerAvailable(database_id.to_string()))
   }

   fn unreserve(&mut self, key: WorkerKey) {
      if let Some(count) = self.reservations.get_mut(&key) {
         *count = count.saturating_sub(1);
         if *count == 0 {
            self.reservations.remove(&key);
         }
      }
   }

   /// Tear down every worker that holds nothing
   fn sweep(&mut self) {
      let idle: Vec<WorkerKey> = self
         .occupancy()
         .into_iter()
         .filter(|(_, count)| *count == 0)
         .map(|(key, _)| key)
         .collect();

      for key in idle {
         if let Some(worker) = self.workers.remove(&key) {
            debug!("evicting idle {}", key);
            if let Err(err) = worker.uninitialize() {
               error!("failed to tear down {}: {}", key, err);
            }
         }
      }
   }
}

struct PoolShared {
   config: WorkerPoolConfig,
   registry: Mutex<Registry>,
}

/// Binds database identities to worker contexts
///
/// Each worker serves up to [`WorkerPoolConfig::databases_per_worker`]
/// databases. A new database goes to the oldest worker with room left, and a
/// new worker is only spawned when every existing one is full. Workers left
/// holding nothing are torn down after every acquire and release.
///
/// Cloning is cheap; clones share the same workers and bindings.
///
/// # Examples
///
/// ```no_run
/// use sqlx_sqlite_worker_pool::{Method, WorkerPool};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = WorkerPool::new(Default::default());
/// let handle = pool.acquire("app.db").await?;
///
/// let response = handle
///    .invoke(Method::ExecDml("CREATE TABLE t (id INTEGER);".into()))
///    .await?;
/// assert!(response.is_success());
///
/// pool.release("app.db").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct WorkerPool {
   shared: Arc<PoolShared>,
}

impl WorkerPool {
   pub fn new(config: WorkerPoolConfig) -> Self {
      Self {
         shared: Arc::new(PoolShared {
            config,
            registry: Mutex::new(Registry::default()),
         }),
      }
   }

   pub fn config(&self) -> &WorkerPoolConfig {
      &self.shared.config
   }

   /// Bind `database_id` to a worker, opening it there if needed
   ///
   /// Acquiring an identity that is already bound returns a handle to the
   /// existing binding without touching any worker.
   pub async fn acquire(&self, database_id: &str) -> Result<ExecutionHandle> {
      if database_id.is_empty() {
         return Err(Error::EmptyPath);
      }

      let worker = {
         let mut registry = self.shared.registry.lock();
         if registry.bindings.contains_key(database_id) {
            return Ok(self.handle(database_id));
         }
         registry.allocate(database_id, &self.shared.config)?
      };
      let key = worker.key();

      let response = worker.invoke(database_id, Method::OpenDatabase).await;

      let opened = matches!(&response, Ok(reply) if reply.is_success());
      let duplicate = {
         let mut registry = self.shared.registry.lock();
         registry.unreserve(key);

         let duplicate = match (opened, registry.bindings.get(database_id)) {
            // Someone else bound it elsewhere while we were opening
            (true, Some(existing)) => *existing != key,
            (true, None) => {
               registry.bindings.insert(database_id.to_string(), key);
               false
            }
            (false, _) => false,
         };
         if !duplicate {
            registry.sweep();
         }
         duplicate
      };

      if duplicate {
         debug!("{} was bound concurrently; dropping the copy on {}", database_id, key);
         if let Err(err) = worker.invoke(database_id, Method::CloseDatabase).await {
            warn!("closing duplicate {} on {}: {}", database_id, key, err);
         }
         self.shared.registry.lock().sweep();
         return Ok(self.handle(database_id));
      }

      match response {
         Ok(reply) if reply.is_success() => {
            debug!("bound {} to {}", database_id, key);
            Ok(self.handle(database_id))
         }
         Ok(reply) => {
            error!("opening {} failed: {}", database_id, reply.error_msg);
            Err(Error::Connection(format!("{database_id}: {}", reply.error_msg)))
         }
         Err(err) => Err(err),
      }
   }

   /// Close `database_id` on its worker and forget the binding
   ///
   /// Releasing an identity that is not bound does nothing.
   pub async fn release(&self, database_id: &str) -> Result<()> {
      let worker = {
         let registry = self.shared.registry.lock();
         registry
            .bindings
            .get(database_id)
            .and_then(|key| registry.workers.get(key))
            .cloned()
      };
      let Some(worker) = worker else {
         return Ok(());
      };

      let closed = worker.invoke(database_id, Method::CloseDatabase).await;
      if let Ok(reply) = &closed
         && !reply.is_success()
      {
         warn!("closing {} reported: {}", database_id, reply.error_msg);
      }

      {
         let mut registry = self.shared.registry.lock();
         if registry.bindings.get(database_id) == Some(&worker.key()) {
            registry.bindings.remove(database_id);
         }
         registry.sweep();
      }
      debug!("released {} from {}", database_id, worker.key());

      closed.map(|_| ())
   }

   /// Classify every live worker as full, unfilled or empty
   pub fn space_state(&self) -> PoolSpaceState {
      self
         .shared
         .registry
         .lock()
         .space_state(self.shared.config.capacity())
   }

   /// The worker currently serving `database_id`
   pub fn bound_worker(&self, database_id: &str) -> Option<WorkerKey> {
      self.shared.registry.lock().bindings.get(database_id).copied()
   }

   pub fn is_bound(&self, database_id: &str) -> bool {
      self.bound_worker(database_id).is_some()
   }

   pub fn worker_count(&self) -> usize {
      self.shared.registry.lock().workers.len()
   }

   /// Drop every binding and stop every worker
   ///
   /// Workers close the databases they still hold before exiting.
   pub fn shutdown(&self) {
      let workers = {
         let mut registry = self.shared.registry.lock();
         registry.bindings.clear();
         registry.reservations.clear();
         std::mem::take(&mut registry.workers)
      };

      for (key, worker) in workers {
         if let Err(err) = worker.uninitialize() {
            error!("failed to tear down {}: {}", key, err);
         }
      }
   }

   fn worker_for(&self, database_id: &str) -> Option<Arc<WorkerContext>> {
      let registry = self.shared.registry.lock();
      let key = registry.bindings.get(database_id)?;
      registry.workers.get(key).cloned()
   }

   fn handle(&self, database_id: &str) -> ExecutionHandle {
      ExecutionHandle {
         database_id: Arc::from(database_id),
         pool: self.clone(),
      }
   }
}

/// Runs commands against one bound database
///
/// The worker is looked up on every call, so a handle stops working as
/// soon as its database is released.
#[derive(Clone)]
pub struct ExecutionHandle {
   database_id: Arc<str>,
   pool: WorkerPool,
}

impl ExecutionHandle {
   pub fn database_id(&self) -> &str {
      &self.database_id
   }

   pub async fn invoke(&self, method: Method) -> Result<Response> {
      let worker = self
         .pool
         .worker_for(&self.database_id)
         .ok_or_else(|| Error::NotBound(self.database_id.to_string()))?;
      worker.invoke(&self.database_id, method).await
   }

   /// Invoke a method by its wire name
   ///
   /// Unknown names produce a `METHOD_NOT_FOUND` reply rather than an error.
   pub async fn invoke_named(&self, name: &str, sql: Option<String>) -> Result<Response> {
      match Method::from_name(name, sql) {
         Some(method) => self.invoke(method).await,
         None => Ok(Response::failure(
            crate::ErrorCode::MethodNotFound,
            format!("can not find method: {name}"),
         )),
      }
   }
}

impl std::fmt::Debug for ExecutionHandle {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.debug_struct("ExecutionHandle")
         .field("database_id", &self.database_id)
         .finish()
   }
}
