use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sqlx_sqlite_worker_pool::{ExecutionHandle, Method, Response, WorkerPool};
use tracing::debug;

use crate::command::CommandBuilder;
use crate::transaction::{Transaction, TransactionOptions};
use crate::{Error, Result};

struct DatabaseInner {
   name: String,
   pool: WorkerPool,
   handle: ExecutionHandle,
   closed: AtomicBool,
}

/// An open database whose commands run on a pool worker.
///
/// Cloning is cheap and clones share the open/closed state. Once
/// [`close`](Self::close) has been called every clone refuses further
/// commands with [`Error::NotFound`].
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> Result<(), sqlx_sqlite_toolkit::Error> {
/// use sqlx_sqlite_toolkit::{Criteria, Database};
/// use sqlx_sqlite_worker_pool::WorkerPool;
///
/// let pool = WorkerPool::new(Default::default());
/// let db = Database::connect(&pool, "/tmp/app.db").await?;
///
/// db.command()
///    .create_table("users", [("id", Some("INTEGER PRIMARY KEY")), ("name", None)])
///    .execute()
///    .await?;
///
/// let mut criteria = Criteria::new();
/// criteria.set_where_condition("name IS NOT NULL");
/// let rows = criteria
///    .apply_to_select_command(db.command(), "users")
///    .fetch()
///    .await?;
///
/// db.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Database {
   inner: Arc<DatabaseInner>,
}

impl Database {
   /// Bind the database file at `path` to a pool worker and open it.
   pub async fn connect(pool: &WorkerPool, path: impl AsRef<Path>) -> Result<Self> {
      let name = path
         .as_ref()
         .to_str()
         .ok_or_else(|| Error::InvalidArgument(format!("non UTF-8 path: {:?}", path.as_ref())))?
         .to_string();

      let handle = pool.acquire(&name).await.map_err(|err| match err {
         sqlx_sqlite_worker_pool::Error::EmptyPath => Error::InvalidArgument(err.to_string()),
         other => Error::Connection(other.to_string()),
      })?;
      debug!("connected {}", name);

      Ok(Self {
         inner: Arc::new(DatabaseInner {
            name,
            pool: pool.clone(),
            handle,
            closed: AtomicBool::new(false),
         }),
      })
   }

   /// The identity this database is bound under (its path).
   pub fn name(&self) -> &str {
      &self.inner.name
   }

   pub fn is_closed(&self) -> bool {
      self.inner.closed.load(Ordering::SeqCst)
   }

   /// Release the database from its worker. Calling this twice is harmless.
   pub async fn close(&self) -> Result<()> {
      if self.inner.closed.swap(true, Ordering::SeqCst) {
         return Ok(());
      }
      self.inner.pool.release(&self.inner.name).await?;
      debug!("closed {}", self.inner.name);
      Ok(())
   }

   /// Send one method to the worker holding this database.
   pub async fn exec_command(&self, method: Method) -> Result<Response> {
      if self.is_closed() {
         return Err(Error::NotFound(format!(
            "{} had closed. Failed to exec command",
            self.inner.name
         )));
      }
      Ok(self.inner.handle.invoke(method).await?)
   }

   /// A fresh command builder bound to this database.
   pub fn command(&self) -> CommandBuilder {
      CommandBuilder::new(self.clone())
   }

   /// Begin a root transaction.
   ///
   /// The returned transaction is already active: `BEGIN` has run and the
   /// isolation level has been applied.
   pub async fn transaction(&self, options: TransactionOptions) -> Result<Transaction> {
      let transaction = Transaction::new(self.clone(), options);
      transaction.prepare_environment().await?;
      Ok(transaction)
   }

   /// Open a savepoint nested inside `parent`.
   pub async fn savepoint(&self, parent: &Transaction) -> Result<Transaction> {
      if !parent.database().same_as(self) {
         return Err(Error::TransactionState(format!(
            "transaction {} does not belong to database {}",
            parent.id(),
            self.inner.name
         )));
      }
      parent.savepoint().await
   }

   /// Run `work` inside a root transaction.
   ///
   /// Commits when `work` succeeds. When it fails the transaction is rolled
   /// back and the original error is returned; a failing rollback is logged
   /// and otherwise ignored.
   ///
   /// # Examples
   ///
   /// ```no_run
   /// # async fn example(db: sqlx_sqlite_toolkit::Database) -> Result<(), sqlx_sqlite_toolkit::Error> {
   /// use serde_json::json;
   ///
   /// db.run_in_transaction(Default::default(), |tx| async move {
   ///    let row = [("name".to_string(), json!("Alice"))].into_iter().collect();
   ///    tx.database().command().insert_row("users", &[row]).execute().await?;
   ///    Ok(())
   /// })
   /// .await?;
   /// # Ok(())
   /// # }
   /// ```
   pub async fn run_in_transaction<F, Fut, T>(
      &self,
      options: TransactionOptions,
      work: F,
   ) -> Result<T>
   where
      F: FnOnce(Transaction) -> Fut,
      Fut: Future<Output = Result<T>>,
   {
      Transaction::new(self.clone(), options).run(work).await
   }

   pub(crate) fn same_as(&self, other: &Database) -> bool {
      Arc::ptr_eq(&self.inner, &other.inner) || self.inner.name == other.inner.name
   }
}

impl std::fmt::Debug for Database {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.debug_struct("Database")
         .field("name", &self.inner.name)
         .field("closed", &self.is_closed())
         .finish()
   }
}
