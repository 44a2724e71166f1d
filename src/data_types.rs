//! Column types for table definitions.
//!
//! A [`ColumnType`] knows its DDL text, checks whether a value fits, turns a
//! value into the form stored in SQLite ([`stringify`](ColumnType::stringify))
//! and turns stored text back into a JSON value ([`parse`](ColumnType::parse)).

use std::fmt;

use serde_json::{Number, Value as JsonValue};
use sqlx_sqlite_toolkit::safe_sql::value_text;
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use crate::{Error, Result};

/// How datetimes are written: millisecond precision with an explicit offset.
const DATETIME_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
   "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3] [offset_hour sign:mandatory]:[offset_minute]"
);
const NAIVE_DATETIME_FORMAT: &[BorrowedFormatItem<'static>] =
   format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

const DEFAULT_STRING_LENGTH: u32 = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
   /// Date and time, stored as `YYYY-MM-DD HH:MM:SS.mmm +HH:MM`
   Date,
   /// Calendar date, stored as `YYYY-MM-DD`
   DateOnly,
   String { length: Option<u32>, binary: bool },
   Char { length: Option<u32>, binary: bool },
   Text,
   Blob,
   Integer,
   BigInt,
   Float,
   Real,
   Double,
   /// Stored as `0`/`1`
   Boolean,
   /// One of a fixed set of strings
   Enum(Vec<String>),
   /// Any JSON value, stored as its text
   Json,
}

impl ColumnType {
   /// `VARCHAR(255)`
   pub fn string() -> Self {
      ColumnType::String {
         length: None,
         binary: false,
      }
   }

   /// `CHAR(255)`
   pub fn char() -> Self {
      ColumnType::Char {
         length: None,
         binary: false,
      }
   }

   pub fn enumeration<I, S>(values: I) -> Self
   where
      I: IntoIterator<Item = S>,
      S: Into<String>,
   {
      ColumnType::Enum(values.into_iter().map(Into::into).collect())
   }

   /// Type text used in `CREATE TABLE`.
   pub fn to_sql(&self) -> String {
      match self {
         ColumnType::Date => "DATETIME".to_string(),
         ColumnType::DateOnly => "DATE".to_string(),
         ColumnType::String { length, binary } => sized("VARCHAR", *length, *binary),
         ColumnType::Char { length, binary } => sized("CHAR", *length, *binary),
         ColumnType::Text | ColumnType::Enum(_) => "TEXT".to_string(),
         ColumnType::Blob => "BLOB".to_string(),
         ColumnType::Integer => "INTEGER".to_string(),
         ColumnType::BigInt => "BIGINT".to_string(),
         ColumnType::Float => "FLOAT".to_string(),
         ColumnType::Real => "REAL".to_string(),
         ColumnType::Double => "DOUBLE PRECISION".to_string(),
         ColumnType::Boolean => "TINYINT(1)".to_string(),
         ColumnType::Json => "JSON".to_string(),
      }
   }

   /// Check that `value` fits this type. `null` always fits.
   pub fn validate(&self, value: &JsonValue) -> Result<()> {
      if value.is_null() {
         return Ok(());
      }

      let valid = match self {
         ColumnType::Date | ColumnType::DateOnly => to_datetime(value).is_some(),
         ColumnType::String { .. } | ColumnType::Char { .. } => value.is_string() || value.is_number(),
         ColumnType::Text | ColumnType::Blob => value.is_string(),
         ColumnType::Integer => match value {
            JsonValue::Number(n) => n.is_i64() || n.is_u64(),
            JsonValue::String(s) => s.trim().parse::<i64>().is_ok(),
            _ => false,
         },
         ColumnType::BigInt | ColumnType::Float | ColumnType::Real | ColumnType::Double => {
            match value {
               JsonValue::Number(_) => true,
               JsonValue::String(s) => s.trim().parse::<f64>().is_ok(),
               _ => false,
            }
         }
         ColumnType::Boolean => to_bool(value).is_some(),
         ColumnType::Enum(values) => value.as_str().is_some_and(|s| values.iter().any(|v| v == s)),
         ColumnType::Json => true,
      };

      if valid {
         Ok(())
      } else {
         Err(Error::InvalidColumnValue(format!(
            "{} is not a valid {}",
            value_text(value),
            self.label()
         )))
      }
   }

   /// Convert a value into the form written to the database.
   ///
   /// Numbers given for date columns are Unix timestamps in milliseconds.
   /// Datetimes without an offset are taken as UTC.
   pub fn stringify(&self, value: &JsonValue) -> Result<JsonValue> {
      if value.is_null() {
         return Ok(JsonValue::Null);
      }

      match self {
         ColumnType::Date => {
            let datetime = self.datetime_of(value)?;
            let text = datetime
               .format(DATETIME_FORMAT)
               .map_err(|err| Error::InvalidColumnValue(err.to_string()))?;
            Ok(JsonValue::String(text))
         }
         ColumnType::DateOnly => {
            let datetime = self.datetime_of(value)?;
            let text = datetime
               .date()
               .format(DATE_FORMAT)
               .map_err(|err| Error::InvalidColumnValue(err.to_string()))?;
            Ok(JsonValue::String(text))
         }
         ColumnType::Boolean => match to_bool(value) {
            Some(flag) => Ok(JsonValue::from(u8::from(flag))),
            None => Err(Error::InvalidColumnValue(format!(
               "{} is not a valid boolean",
               value_text(value)
            ))),
         },
         ColumnType::Json => Ok(match value {
            JsonValue::String(_) => value.clone(),
            other => JsonValue::String(other.to_string()),
         }),
         ColumnType::Blob => Ok(JsonValue::String(value_text(value))),
         _ => Ok(value.clone()),
      }
   }

   /// Convert stored data back into a JSON value.
   ///
   /// Values that cannot be interpreted are returned unchanged.
   pub fn parse(&self, value: &JsonValue) -> JsonValue {
      if value.is_null() {
         return JsonValue::Null;
      }

      match self {
         ColumnType::Date | ColumnType::DateOnly => to_datetime(value)
            .and_then(|datetime| datetime.format(&Rfc3339).ok())
            .map(JsonValue::String)
            .unwrap_or_else(|| value.clone()),
         ColumnType::Boolean => match value {
            JsonValue::Bool(_) => value.clone(),
            JsonValue::Number(n) => JsonValue::Bool(n.as_f64().is_some_and(|n| n != 0.0)),
            JsonValue::String(s) => {
               let s = s.to_lowercase();
               JsonValue::Bool(s != "false" && s != "0" && s != "null")
            }
            _ => value.clone(),
         },
         ColumnType::Float | ColumnType::Real | ColumnType::Double => match value {
            // NaN and the infinities have no JSON number form and stay text
            JsonValue::String(s) => s
               .trim()
               .parse::<f64>()
               .ok()
               .and_then(Number::from_f64)
               .map(JsonValue::Number)
               .unwrap_or_else(|| value.clone()),
            _ => value.clone(),
         },
         ColumnType::Json => match value {
            JsonValue::String(s) if s.is_empty() => JsonValue::Object(Default::default()),
            JsonValue::String(s) => serde_json::from_str(s).unwrap_or_else(|_| value.clone()),
            _ => value.clone(),
         },
         _ => value.clone(),
      }
   }

   fn datetime_of(&self, value: &JsonValue) -> Result<OffsetDateTime> {
      to_datetime(value).ok_or_else(|| {
         Error::InvalidColumnValue(format!("{} is not a valid date", value_text(value)))
      })
   }

   fn label(&self) -> &'static str {
      match self {
         ColumnType::Date | ColumnType::DateOnly => "date",
         ColumnType::String { .. } | ColumnType::Char { .. } | ColumnType::Text => "string",
         ColumnType::Blob => "blob",
         ColumnType::Integer => "integer",
         ColumnType::Float => "float",
         ColumnType::BigInt | ColumnType::Real | ColumnType::Double => "number",
         ColumnType::Boolean => "boolean",
         ColumnType::Enum(_) => "choice",
         ColumnType::Json => "json",
      }
   }
}

impl fmt::Display for ColumnType {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(&self.to_sql())
   }
}

fn sized(base: &str, length: Option<u32>, binary: bool) -> String {
   let length = length.unwrap_or(DEFAULT_STRING_LENGTH);
   if binary {
      format!("{base} BINARY({length})")
   } else {
      format!("{base}({length})")
   }
}

fn to_bool(value: &JsonValue) -> Option<bool> {
   match value {
      JsonValue::Bool(b) => Some(*b),
      JsonValue::Number(n) => match n.as_i64() {
         Some(0) => Some(false),
         Some(1) => Some(true),
         _ => None,
      },
      JsonValue::String(s) => match s.trim().to_lowercase().as_str() {
         "true" | "1" => Some(true),
         "false" | "0" => Some(false),
         _ => None,
      },
      _ => None,
   }
}

fn to_datetime(value: &JsonValue) -> Option<OffsetDateTime> {
   match value {
      JsonValue::Number(n) => {
         let millis = n.as_i64()?;
         OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
      }
      JsonValue::String(s) => parse_datetime(s.trim()),
      _ => None,
   }
}

fn parse_datetime(text: &str) -> Option<OffsetDateTime> {
   OffsetDateTime::parse(text, &Rfc3339)
      .ok()
      .or_else(|| OffsetDateTime::parse(text, DATETIME_FORMAT).ok())
      .or_else(|| {
         PrimitiveDateTime::parse(text, NAIVE_DATETIME_FORMAT)
            .ok()
            .map(PrimitiveDateTime::assume_utc)
      })
      .or_else(|| {
         Date::parse(text, DATE_FORMAT)
            .ok()
            .map(|date| date.midnight().assume_utc())
      })
}
