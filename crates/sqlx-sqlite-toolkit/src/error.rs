use sqlx_sqlite_worker_pool::ErrorCode;

/// Result type alias for toolkit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for command building, execution and transactions.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Error from the worker pool.
   #[error(transparent)]
   Pool(#[from] sqlx_sqlite_worker_pool::Error),

   /// The database could not be opened or closed.
   #[error("connection error: {0}")]
   Connection(String),

   /// The worker answered with a non-success reply.
   #[error("{message}")]
   Backend { code: ErrorCode, message: String },

   /// Commit or rollback on a finished transaction, or a transaction used
   /// against the wrong database.
   #[error("{0}")]
   TransactionState(String),

   /// Malformed table, column or predicate input.
   #[error("invalid argument: {0}")]
   InvalidArgument(String),

   /// The database was closed or is not bound to any worker.
   #[error("{0}")]
   NotFound(String),

   /// A reply payload could not be decoded.
   #[error(transparent)]
   Json(#[from] serde_json::Error),

   /// Generic error for operations that don't fit other categories.
   #[error("{0}")]
   Other(String),
}

impl Error {
   /// Extract a structured error code from the error type.
   ///
   /// This provides machine-readable error codes for error handling.
   pub fn error_code(&self) -> String {
      use sqlx_sqlite_worker_pool::Error as PoolError;

      match self {
         Error::Pool(PoolError::NotBound(_) | PoolError::WorkerClosed(_)) => "NOT_FOUND".to_string(),
         Error::Pool(PoolError::Sqlx(e)) => {
            if let Some(code) = e.as_database_error().and_then(|db_err| db_err.code()) {
               return format!("SQLITE_{}", code);
            }
            "CONNECTION_ERROR".to_string()
         }
         Error::Pool(_) | Error::Connection(_) => "CONNECTION_ERROR".to_string(),
         Error::Backend { .. } => "BACKEND_ERROR".to_string(),
         Error::TransactionState(_) => "TRANSACTION_STATE_ERROR".to_string(),
         Error::InvalidArgument(_) => "INVALID_ARGUMENT".to_string(),
         Error::NotFound(_) => "NOT_FOUND".to_string(),
         Error::Json(_) => "JSON_ERROR".to_string(),
         Error::Other(_) => "ERROR".to_string(),
      }
   }

   /// Backend reply code, if this error came from a worker reply.
   pub fn backend_code(&self) -> Option<ErrorCode> {
      match self {
         Error::Backend { code, .. } => Some(*code),
         _ => None,
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_error_code_backend() {
      let err = Error::Backend {
         code: ErrorCode::SqliteError,
         message: "failed to execDML with sql: NOPE".into(),
      };
      assert_eq!(err.error_code(), "BACKEND_ERROR");
      assert_eq!(err.backend_code(), Some(ErrorCode::SqliteError));
      assert_eq!(err.to_string(), "failed to execDML with sql: NOPE");
   }

   #[test]
   fn test_error_code_unbound_is_not_found() {
      let err = Error::from(sqlx_sqlite_worker_pool::Error::NotBound("a.db".into()));
      assert_eq!(err.error_code(), "NOT_FOUND");
      assert!(err.to_string().contains("a.db"));
   }

   #[test]
   fn test_error_code_open_failure_is_connection() {
      let err = Error::from(sqlx_sqlite_worker_pool::Error::Connection("x.db".into()));
      assert_eq!(err.error_code(), "CONNECTION_ERROR");
   }

   #[test]
   fn test_error_code_transaction_state() {
      let err = Error::TransactionState("already committed".into());
      assert_eq!(err.error_code(), "TRANSACTION_STATE_ERROR");
      assert_eq!(err.backend_code(), None);
   }

   #[test]
   fn test_error_code_invalid_argument() {
      let err = Error::InvalidArgument("empty table name".into());
      assert_eq!(err.error_code(), "INVALID_ARGUMENT");
      assert!(err.to_string().contains("empty table name"));
   }

   #[test]
   fn test_error_code_other() {
      let err = Error::Other("something went wrong".into());
      assert_eq!(err.error_code(), "ERROR");
      assert_eq!(err.to_string(), "something went wrong");
   }
}
