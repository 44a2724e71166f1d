use super::CommandBuilder;
use crate::safe_sql::safe_meta_string;
use crate::transaction::{IsolationLevel, Transaction};

/// Rendered for operations that mean nothing for a savepoint
const NO_OP: &str = "--";

impl CommandBuilder {
   /// `BEGIN <type> TRANSACTION` for a root, `SAVEPOINT` for a savepoint.
   pub fn start_transaction(self, transaction: &Transaction) -> Self {
      let builder = self.reset().check_owner(transaction);

      if transaction.is_root() {
         builder.append(format!(
            "BEGIN {} TRANSACTION;",
            transaction.options().transaction_type.as_sql()
         ))
      } else {
         builder.append(format!("SAVEPOINT `{}`;", safe_meta_string(transaction.name())))
      }
   }

   pub fn rollback_transaction(self, transaction: &Transaction) -> Self {
      let builder = self.reset().check_owner(transaction);

      if transaction.is_root() {
         builder.append("ROLLBACK TRANSACTION;")
      } else {
         builder.append(format!("ROLLBACK TO `{}`;", safe_meta_string(transaction.name())))
      }
   }

   /// `COMMIT TRANSACTION` for a root; savepoints cannot be committed on
   /// their own and render a no-op.
   pub fn commit_transaction(self, transaction: &Transaction) -> Self {
      let builder = self.reset().check_owner(transaction);

      if transaction.is_root() {
         builder.append("COMMIT TRANSACTION;")
      } else {
         builder.append(NO_OP)
      }
   }

   /// Apply `level` through `PRAGMA read_uncommitted`.
   ///
   /// Savepoints, and roots without a level, render a no-op.
   pub fn set_isolation_level(self, transaction: &Transaction, level: Option<IsolationLevel>) -> Self {
      let builder = self.reset().check_owner(transaction);

      match level {
         Some(level) if transaction.is_root() => builder.append(level.pragma()),
         _ => builder.append(NO_OP),
      }
   }

   fn check_owner(self, transaction: &Transaction) -> Self {
      match &self.database {
         Some(database) if !database.same_as(transaction.database()) => {
            let message = format!(
               "transaction {} belongs to {}, not {}",
               transaction.name(),
               transaction.database().name(),
               database.name()
            );
            self.fail(message)
         }
         _ => self,
      }
   }
}
