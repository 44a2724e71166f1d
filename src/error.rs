use serde::{Serialize, Serializer};

/// Result type alias for data-access operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Structured error response for callers that serialize errors.
#[derive(Serialize)]
struct ErrorResponse {
   code: String,
   message: String,
}

/// Error types for the data-access layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Error from the toolkit (commands, transactions, pool).
   #[error(transparent)]
   Toolkit(#[from] sqlx_sqlite_toolkit::Error),

   /// Invalid database name or path.
   #[error("invalid database path: {0}")]
   InvalidPath(String),

   /// A value that does not fit its column type.
   #[error("{0}")]
   InvalidColumnValue(String),

   /// Table definition or helper call that cannot be turned into SQL.
   #[error("invalid schema: {0}")]
   InvalidSchema(String),

   /// I/O error when preparing database directories.
   #[error("io error: {0}")]
   Io(#[from] std::io::Error),
}

impl Error {
   /// Extract a structured error code from the error type.
   ///
   /// Toolkit errors keep their own codes.
   pub fn error_code(&self) -> String {
      match self {
         Error::Toolkit(e) => e.error_code(),
         Error::InvalidPath(_) => "INVALID_PATH".to_string(),
         Error::InvalidColumnValue(_) => "INVALID_COLUMN_VALUE".to_string(),
         Error::InvalidSchema(_) => "INVALID_SCHEMA".to_string(),
         Error::Io(_) => "IO_ERROR".to_string(),
      }
   }
}

impl Serialize for Error {
   fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
   where
      S: Serializer,
   {
      let response = ErrorResponse {
         code: self.error_code(),
         message: self.to_string(),
      };
      response.serialize(serializer)
   }
}
