//! Worker contexts: one task serving the connections of several databases

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::backend::SqliteBackend;
use crate::config::WorkerPoolConfig;
use crate::error::Error;
use crate::response::{ErrorCode, Response};
use crate::Result;

/// Identity of a worker, displayed as `sqlite-worker-N`
///
/// Keys are handed out in creation order, so ordering keys orders workers
/// from oldest to newest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerKey(u64);

impl WorkerKey {
   pub(crate) fn new(index: u64) -> Self {
      Self(index)
   }

   pub fn index(&self) -> u64 {
      self.0
   }
}

impl fmt::Display for WorkerKey {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "sqlite-worker-{}", self.0)
   }
}

/// A command a worker can run against one of its databases
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
   OpenDatabase,
   CloseDatabase,
   ExecDml(String),
   GetRecordSet(String),
   LastInsertRowId,
}

impl Method {
   /// Resolve a method by its wire name, attaching `sql` where the method takes one
   pub fn from_name(name: &str, sql: Option<String>) -> Option<Self> {
      let kind = MethodKind::from_str(name).ok()?;
      Some(match kind {
         MethodKind::OpenDatabase => Method::OpenDatabase,
         MethodKind::CloseDatabase => Method::CloseDatabase,
         MethodKind::ExecDml => Method::ExecDml(sql.unwrap_or_default()),
         MethodKind::GetRecordSet => Method::GetRecordSet(sql.unwrap_or_default()),
         MethodKind::LastInsertRowId => Method::LastInsertRowId,
      })
   }

   pub fn name(&self) -> &'static str {
      match self {
         Method::OpenDatabase => "openDatabase",
         Method::CloseDatabase => "closeDatabase",
         Method::ExecDml(_) => "execDML",
         Method::GetRecordSet(_) => "getRecordSet",
         Method::LastInsertRowId => "lastInsertRowId",
      }
   }
}

enum MethodKind {
   OpenDatabase,
   CloseDatabase,
   ExecDml,
   GetRecordSet,
   LastInsertRowId,
}

impl FromStr for MethodKind {
   type Err = ();

   fn from_str(name: &str) -> std::result::Result<Self, ()> {
      match name {
         "openDatabase" => Ok(MethodKind::OpenDatabase),
         "closeDatabase" => Ok(MethodKind::CloseDatabase),
         "execDML" => Ok(MethodKind::ExecDml),
         "getRecordSet" => Ok(MethodKind::GetRecordSet),
         "lastInsertRowId" => Ok(MethodKind::LastInsertRowId),
         _ => Err(()),
      }
   }
}

enum Command {
   Exec {
      path: String,
      method: Method,
      respond_to: oneshot::Sender<Response>,
   },
   Shutdown,
}

/// Handle to a running worker task
///
/// Commands are queued and run strictly in arrival order. Dropping the
/// context (or calling [`uninitialize`](Self::uninitialize)) stops the task
/// once the queue ahead of the stop request has drained, closing every
/// database it still holds.
pub struct WorkerContext {
   key: WorkerKey,
   sender: mpsc::UnboundedSender<Command>,
}

impl WorkerContext {
   pub(crate) fn spawn(key: WorkerKey, config: WorkerPoolConfig) -> Result<Self> {
      let handle = Handle::try_current()
         .map_err(|err| Error::NoWorkerAvailable(format!("{key}: no async runtime: {err}")))?;

      let (sender, receiver) = mpsc::unbounded_channel();
      handle.spawn(run_worker(key, receiver, config));
      debug!("spawned {}", key);

      Ok(Self { key, sender })
   }

   pub fn key(&self) -> WorkerKey {
      self.key
   }

   /// Run `method` against the database at `path` and wait for the reply
   pub async fn invoke(&self, path: &str, method: Method) -> Result<Response> {
      let (respond_to, reply) = oneshot::channel();
      self
         .sender
         .send(Command::Exec {
            path: path.to_string(),
            method,
            respond_to,
         })
         .map_err(|_| Error::WorkerClosed(self.key.to_string()))?;

      reply
         .await
         .map_err(|_| Error::WorkerClosed(self.key.to_string()))
   }

   /// Ask the worker to stop after finishing queued commands
   pub(crate) fn uninitialize(&self) -> Result<()> {
      self
         .sender
         .send(Command::Shutdown)
         .map_err(|_| Error::WorkerClosed(self.key.to_string()))
   }
}

impl Drop for WorkerContext {
   fn drop(&mut self) {
      // Already gone if uninitialize() ran first
      let _ = self.sender.send(Command::Shutdown);
   }
}

async fn run_worker(
   key: WorkerKey,
   mut receiver: mpsc::UnboundedReceiver<Command>,
   config: WorkerPoolConfig,
) {
   let mut databases: HashMap<String, SqliteBackend> = HashMap::new();

   while let Some(command) = receiver.recv().await {
      match command {
         Command::Exec {
            path,
            method,
            respond_to,
         } => {
            let response = exec(&mut databases, &path, method, &config).await;
            if respond_to.send(response).is_err() {
               debug!("{}: caller went away before reply for {}", key, path);
            }
         }
         Command::Shutdown => break,
      }
   }

   let open: Vec<(String, SqliteBackend)> = databases.drain().collect();
   for (path, backend) in open {
      if let Err(err) = backend.close().await {
         error!("{}: failed to close {} on shutdown: {}", key, path, err);
      }
   }
   debug!("{} stopped", key);
}

async fn exec(
   databases: &mut HashMap<String, SqliteBackend>,
   path: &str,
   method: Method,
   config: &WorkerPoolConfig,
) -> Response {
   match method {
      Method::OpenDatabase => open_database(databases, path, config).await,
      Method::CloseDatabase => {
         let Some(backend) = databases.remove(path) else {
            return not_existed();
         };
         if let Err(err) = backend.close().await {
            warn!("closing {} reported: {}", path, err);
         }
         Response::success(&true)
      }
      Method::ExecDml(sql) => {
         let Some(backend) = databases.get_mut(path) else {
            return not_existed();
         };
         match backend.exec_dml(&sql).await {
            Ok(outcome) => Response::success(&(outcome.rows_changed, outcome.last_row_id)),
            Err(err) => {
               error!("execDML failed on {}: {}", path, err);
               Response::failure(
                  ErrorCode::SqliteError,
                  format!("failed to execDML with sql: {sql}: {err}"),
               )
            }
         }
      }
      Method::GetRecordSet(sql) => {
         let Some(backend) = databases.get_mut(path) else {
            return not_existed();
         };
         match backend.get_recordset(&sql).await {
            Ok(recordset) => Response::success(&recordset),
            Err(err) => {
               error!("getRecordSet failed on {}: {}", path, err);
               Response::failure(
                  ErrorCode::SqliteError,
                  format!("failed to getRecordSet with sql: {sql}: {err}"),
               )
            }
         }
      }
      Method::LastInsertRowId => {
         let Some(backend) = databases.get_mut(path) else {
            return not_existed();
         };
         match backend.last_row_id().await {
            Ok(id) => Response::success(&id),
            Err(err) => Response::failure(ErrorCode::SqliteError, err.to_string()),
         }
      }
   }
}

fn not_existed() -> Response {
   Response::failure(ErrorCode::DbNotExisted, "sqlite db not existed")
}

async fn open_database(
   databases: &mut HashMap<String, SqliteBackend>,
   path: &str,
   config: &WorkerPoolConfig,
) -> Response {
   // Reopening replaces the existing connection
   if let Some(existing) = databases.remove(path)
      && let Err(err) = existing.close().await
   {
      warn!("closing previous connection to {} reported: {}", path, err);
   }

   match SqliteBackend::open(path, config).await {
      Ok(backend) => {
         databases.insert(path.to_string(), backend);
         Response::success(&true)
      }
      Err(err) => {
         error!("db open failed for {}: {}", path, err);
         Response::failure(ErrorCode::SqliteError, format!("db open failed: {err}"))
      }
   }
}
