//! Reply envelope sent back by a worker for every command

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// Failure classes a worker can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
   /// The database path has not been opened on this worker
   DbNotExisted,
   /// The method name is not one the worker understands
   MethodNotFound,
   /// SQLite rejected the open or the statement
   SqliteError,
}

impl ErrorCode {
   /// Numeric code used on the wire
   pub fn code(&self) -> i32 {
      match self {
         ErrorCode::DbNotExisted => 0,
         ErrorCode::MethodNotFound => 1,
         ErrorCode::SqliteError => 3,
      }
   }

   pub fn from_code(code: i64) -> Option<Self> {
      match code {
         0 => Some(ErrorCode::DbNotExisted),
         1 => Some(ErrorCode::MethodNotFound),
         3 => Some(ErrorCode::SqliteError),
         _ => None,
      }
   }
}

/// No-error sentinel on the wire
const NO_ERROR: i64 = -1;

/// Read `errorCode` by name or by number.
///
/// `-1` (as a number or a string), `null`, `false` and `""` all mean success.
fn deserialize_error_code<'de, D>(deserializer: D) -> Result<Option<ErrorCode>, D::Error>
where
   D: Deserializer<'de>,
{
   let value = JsonValue::deserialize(deserializer)?;
   let numeric = match &value {
      JsonValue::Null | JsonValue::Bool(false) => return Ok(None),
      JsonValue::Number(number) => number.as_i64(),
      JsonValue::String(text) if text.is_empty() => return Ok(None),
      JsonValue::String(text) => match text.parse::<i64>() {
         Ok(number) => Some(number),
         Err(_) => {
            return ErrorCode::deserialize(JsonValue::String(text.clone()))
               .map(Some)
               .map_err(de::Error::custom);
         }
      },
      _ => None,
   };

   match numeric {
      Some(NO_ERROR) => Ok(None),
      Some(code) => ErrorCode::from_code(code)
         .map(Some)
         .ok_or_else(|| de::Error::custom(format!("unknown error code: {code}"))),
      None => Err(de::Error::custom(format!("invalid error code: {value}"))),
   }
}

/// How `data` is encoded inside a [`Response`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
   /// Scalars stored as-is
   #[default]
   Primitive,
   /// Arrays and objects, stored as their JSON text
   ObjectLike,
}

/// Reply to a single worker command
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
   #[serde(
      default,
      skip_serializing_if = "Option::is_none",
      deserialize_with = "deserialize_error_code"
   )]
   pub error_code: Option<ErrorCode>,
   #[serde(default)]
   pub error_msg: String,
   #[serde(default)]
   pub data_type: DataType,
   #[serde(default)]
   pub data: JsonValue,
}

impl Response {
   /// A successful reply carrying `value`
   pub fn success<T: Serialize>(value: &T) -> Self {
      let mut response = Self::default();
      if let Err(err) = response.set_data(value) {
         return Self::failure(ErrorCode::SqliteError, format!("unserializable reply: {err}"));
      }
      response
   }

   pub fn failure(code: ErrorCode, message: impl Into<String>) -> Self {
      Self {
         error_code: Some(code),
         error_msg: message.into(),
         ..Default::default()
      }
   }

   pub fn is_success(&self) -> bool {
      self.error_code.is_none()
   }

   /// Store `value`, encoding arrays and objects as JSON text
   pub fn set_data<T: Serialize>(&mut self, value: &T) -> serde_json::Result<()> {
      let value = serde_json::to_value(value)?;
      if value.is_array() || value.is_object() {
         self.data_type = DataType::ObjectLike;
         self.data = JsonValue::String(serde_json::to_string(&value)?);
      } else {
         self.data_type = DataType::Primitive;
         self.data = value;
      }
      Ok(())
   }

   /// Decode the payload according to its data type
   pub fn data<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
      match (&self.data_type, &self.data) {
         (DataType::ObjectLike, JsonValue::String(text)) => serde_json::from_str(text),
         _ => serde_json::from_value(self.data.clone()),
      }
   }
}
