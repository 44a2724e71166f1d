//! Column value decoding for recordsets

use base64::Engine;
use serde_json::Value as JsonValue;
use sqlx::sqlite::SqliteValueRef;
use sqlx::{TypeInfo, Value, ValueRef};
use time::PrimitiveDateTime;

use crate::Error;

/// Convert one SQLite cell into the JSON value carried by a [`Recordset`](crate::Recordset).
///
/// Storage classes map directly: INTEGER to a JSON integer, REAL to a float,
/// TEXT to a string and NULL to null. BLOBs become base64 strings. Declared
/// date/time columns come back as their textual form.
pub(crate) fn to_json(value: SqliteValueRef) -> Result<JsonValue, Error> {
   if value.is_null() {
      return Ok(JsonValue::Null);
   }

   let owned = value.to_owned();
   let type_name = value.type_info().name().to_string();

   let decoded = match type_name.as_str() {
      "INTEGER" | "NUMERIC" => owned.try_decode::<i64>().ok().map(JsonValue::from),
      "REAL" => owned.try_decode::<f64>().ok().map(JsonValue::from),
      "BOOLEAN" => owned.try_decode::<bool>().ok().map(JsonValue::Bool),
      "TEXT" | "DATE" | "TIME" => owned.try_decode::<String>().ok().map(JsonValue::String),
      "DATETIME" => owned
         .try_decode::<PrimitiveDateTime>()
         .map(|dt| dt.to_string())
         .or_else(|_| owned.try_decode::<String>())
         .ok()
         .map(JsonValue::String),
      "BLOB" => owned
         .try_decode::<Vec<u8>>()
         .ok()
         .map(|bytes| JsonValue::String(encode_blob(&bytes))),
      "NULL" => Some(JsonValue::Null),
      other => match owned.try_decode::<String>() {
         Ok(text) => Some(JsonValue::String(text)),
         Err(_) => {
            return Err(Error::UnsupportedDatatype(format!(
               "Unknown SQLite type: {other}"
            )));
         }
      },
   };

   Ok(decoded.unwrap_or(JsonValue::Null))
}

fn encode_blob(bytes: &[u8]) -> String {
   base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_encode_blob() {
      assert_eq!(encode_blob(b"hello"), "aGVsbG8=");
      assert_eq!(encode_blob(&[0, 0, 0]), "AAAA");
      assert_eq!(encode_blob(&[]), "");
   }
}
