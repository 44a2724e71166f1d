//! Root transactions and nested savepoints.
//!
//! A [`Transaction`] is either a root (`BEGIN ... TRANSACTION`) or a savepoint
//! nested inside another transaction. Each one moves through
//! `Created -> Active -> Committed | RolledBack` and may finish only once.
//! Committing a savepoint emits no SQL but still finishes it; rolling it back
//! undoes only the work done since the savepoint was opened.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::database::Database;
use crate::{Error, Result};

/// How a root transaction acquires its locks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
   #[default]
   Deferred,
   Immediate,
   Exclusive,
}

impl TransactionType {
   pub fn as_sql(&self) -> &'static str {
      match self {
         TransactionType::Deferred => "DEFERRED",
         TransactionType::Immediate => "IMMEDIATE",
         TransactionType::Exclusive => "EXCLUSIVE",
      }
   }
}

/// Read isolation for a root transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IsolationLevel {
   ReadUncommitted,
   ReadCommitted,
}

impl IsolationLevel {
   pub(crate) fn pragma(&self) -> &'static str {
      match self {
         IsolationLevel::ReadUncommitted => "PRAGMA read_uncommitted = ON;",
         IsolationLevel::ReadCommitted => "PRAGMA read_uncommitted = OFF;",
      }
   }
}

/// Options for a root transaction
///
/// # Examples
///
/// ```
/// use sqlx_sqlite_toolkit::{IsolationLevel, TransactionOptions, TransactionType};
///
/// let options: TransactionOptions =
///    serde_json::from_str(r#"{"type": "IMMEDIATE", "isolationLevel": "READ_UNCOMMITTED"}"#).unwrap();
/// assert_eq!(options.transaction_type, TransactionType::Immediate);
/// assert_eq!(options.isolation_level, Some(IsolationLevel::ReadUncommitted));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransactionOptions {
   #[serde(rename = "type")]
   pub transaction_type: TransactionType,
   pub isolation_level: Option<IsolationLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
   Created,
   Active,
   Committed,
   RolledBack,
}

impl TransactionState {
   pub fn is_finished(&self) -> bool {
      matches!(self, TransactionState::Committed | TransactionState::RolledBack)
   }
}

impl fmt::Display for TransactionState {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(match self {
         TransactionState::Created => "created",
         TransactionState::Active => "active",
         TransactionState::Committed => "commit",
         TransactionState::RolledBack => "rollback",
      })
   }
}

struct TransactionInner {
   id: String,
   name: String,
   database: Database,
   options: TransactionOptions,
   parent: Option<Transaction>,
   savepoints: Mutex<Vec<Weak<TransactionInner>>>,
   /// Shared by a root and all of its descendants
   savepoint_counter: Arc<AtomicUsize>,
   state: Mutex<TransactionState>,
}

/// A root transaction or a savepoint.
///
/// Cloning yields another handle to the same transaction. A transaction is
/// meant to be driven by one caller at a time.
#[derive(Clone)]
pub struct Transaction {
   inner: Arc<TransactionInner>,
}

impl Transaction {
   /// A new, not yet started, root transaction.
   pub fn new(database: Database, options: TransactionOptions) -> Self {
      let id = uuid::Uuid::new_v4().to_string();
      Self {
         inner: Arc::new(TransactionInner {
            name: id.clone(),
            id,
            database,
            options,
            parent: None,
            savepoints: Mutex::new(Vec::new()),
            savepoint_counter: Arc::new(AtomicUsize::new(0)),
            state: Mutex::new(TransactionState::Created),
         }),
      }
   }

   /// A new, not yet started, savepoint under `parent`.
   ///
   /// It shares the root's id and is named `{id}-savepoint-{n}`.
   pub fn new_savepoint(parent: &Transaction) -> Self {
      let ordinal = parent.inner.savepoint_counter.fetch_add(1, Ordering::SeqCst) + 1;
      let child = Self {
         inner: Arc::new(TransactionInner {
            id: parent.inner.id.clone(),
            name: format!("{}-savepoint-{}", parent.inner.id, ordinal),
            database: parent.inner.database.clone(),
            options: parent.inner.options,
            parent: Some(parent.clone()),
            savepoints: Mutex::new(Vec::new()),
            savepoint_counter: Arc::clone(&parent.inner.savepoint_counter),
            state: Mutex::new(TransactionState::Created),
         }),
      };
      parent.inner.savepoints.lock().push(Arc::downgrade(&child.inner));
      child
   }

   pub fn id(&self) -> &str {
      &self.inner.id
   }

   pub fn name(&self) -> &str {
      &self.inner.name
   }

   pub fn database(&self) -> &Database {
      &self.inner.database
   }

   pub fn options(&self) -> &TransactionOptions {
      &self.inner.options
   }

   pub fn parent(&self) -> Option<&Transaction> {
      self.inner.parent.as_ref()
   }

   pub fn is_root(&self) -> bool {
      self.inner.parent.is_none()
   }

   pub fn state(&self) -> TransactionState {
      *self.inner.state.lock()
   }

   pub fn is_finished(&self) -> bool {
      self.state().is_finished()
   }

   /// Savepoints opened directly under this transaction that are still alive,
   /// oldest first.
   pub fn savepoints(&self) -> Vec<Transaction> {
      self
         .inner
         .savepoints
         .lock()
         .iter()
         .filter_map(Weak::upgrade)
         .map(|inner| Transaction { inner })
         .collect()
   }

   /// Begin the transaction and apply its isolation level.
   ///
   /// If either step fails the transaction ends up rolled back and the
   /// original error is returned. A `ROLLBACK` is only sent when `BEGIN` (or
   /// `SAVEPOINT`) succeeded.
   pub async fn prepare_environment(&self) -> Result<()> {
      let state = self.state();
      if state != TransactionState::Created {
         return Err(Error::TransactionState(format!(
            "Transaction {} cannot be started because it is already {}",
            self.inner.name, state
         )));
      }

      let prepared = async {
         self.begin().await?;
         self.set_isolation_level().await
      }
      .await;

      if let Err(err) = prepared {
         if self.state() == TransactionState::Active {
            if let Err(rollback_err) = self.rollback().await {
               warn!("rollback of {} after failed start also failed: {}", self.inner.name, rollback_err);
            }
         } else {
            // BEGIN/SAVEPOINT never ran, so there is nothing to roll back
            *self.inner.state.lock() = TransactionState::RolledBack;
         }
         return Err(err);
      }
      Ok(())
   }

   async fn begin(&self) -> Result<()> {
      self.database().command().start_transaction(self).execute().await?;
      *self.inner.state.lock() = TransactionState::Active;
      debug!("began {}", self.inner.name);
      Ok(())
   }

   async fn set_isolation_level(&self) -> Result<()> {
      self
         .database()
         .command()
         .set_isolation_level(self, self.inner.options.isolation_level)
         .execute()
         .await?;
      Ok(())
   }

   /// Commit the transaction.
   ///
   /// A `COMMIT` the backend refuses (a deferred constraint, a busy
   /// database) leaves the connection inside the transaction, so it is
   /// rolled back before the commit error is returned and the transaction
   /// ends up rolled back.
   pub async fn commit(&self) -> Result<()> {
      self.finish(TransactionState::Committed, "committed")?;

      if let Err(err) = self.database().command().commit_transaction(self).execute().await {
         *self.inner.state.lock() = TransactionState::RolledBack;
         if let Err(rollback_err) = self
            .database()
            .command()
            .rollback_transaction(self)
            .execute()
            .await
         {
            warn!("rollback of {} after failed commit also failed: {}", self.inner.name, rollback_err);
         }
         return Err(err);
      }

      debug!("committed {}", self.inner.name);
      Ok(())
   }

   pub async fn rollback(&self) -> Result<()> {
      self.finish(TransactionState::RolledBack, "rolled back")?;
      self.database().command().rollback_transaction(self).execute().await?;
      debug!("rolled back {}", self.inner.name);
      Ok(())
   }

   /// Open and start a savepoint under this transaction.
   pub async fn savepoint(&self) -> Result<Transaction> {
      let child = Transaction::new_savepoint(self);
      child.prepare_environment().await?;
      Ok(child)
   }

   /// Start this transaction, run `work`, then commit or roll back.
   ///
   /// A rollback that itself fails is logged; the error from `work` is the
   /// one returned.
   pub async fn run<F, Fut, T>(self, work: F) -> Result<T>
   where
      F: FnOnce(Transaction) -> Fut,
      Fut: Future<Output = Result<T>>,
   {
      self.prepare_environment().await?;

      let result = match work(self.clone()).await {
         Ok(value) => self.commit().await.map(|_| value),
         Err(err) => Err(err),
      };

      if let Err(err) = result {
         if !self.is_finished()
            && let Err(rollback_err) = self.rollback().await
         {
            warn!("rollback of {} failed: {}", self.inner.name, rollback_err);
         }
         return Err(err);
      }
      result
   }

   /// Mark the transaction finished, failing if it already was.
   fn finish(&self, next: TransactionState, verb: &str) -> Result<()> {
      let mut state = self.inner.state.lock();
      if state.is_finished() {
         return Err(Error::TransactionState(format!(
            "Transaction cannot be {verb} because it has been finished with state: {}",
            *state
         )));
      }
      *state = next;
      Ok(())
   }
}

impl fmt::Debug for Transaction {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("Transaction")
         .field("name", &self.inner.name)
         .field("root", &self.is_root())
         .field("state", &self.state())
         .finish()
   }
}
