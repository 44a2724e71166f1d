//! A keyed value container that maps onto table rows.

use indexmap::{IndexMap, IndexSet};
use serde_json::Value as JsonValue;
use sqlx_sqlite_toolkit::Row;

use crate::Result;
use crate::table::TableSchema;

/// Values for a fixed set of defined keys.
///
/// Any key may be set, but only defined keys can be read back or exported.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use sqlx_sqlite_dal::Record;
///
/// let mut record = Record::new(["id", "name"]);
/// record.set_value("name", json!("Alice")).set_value("extra", json!(1));
///
/// assert_eq!(record.value("name"), Some(&json!("Alice")));
/// assert_eq!(record.value("extra"), None);
/// assert_eq!(record.export_entry()["id"], json!(null));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
   definitions: IndexSet<String>,
   entries: IndexMap<String, JsonValue>,
}

impl Record {
   pub fn new<I, S>(keys: I) -> Self
   where
      I: IntoIterator<Item = S>,
      S: Into<String>,
   {
      let mut record = Self::default();
      for key in keys {
         record.define(key);
      }
      record
   }

   /// A record defined by every column of `schema`.
   pub fn for_table(schema: &TableSchema) -> Self {
      Self::new(schema.column_names())
   }

   /// A record defined by `keys` and filled from `row`.
   pub fn from_row<I, S>(keys: I, row: &Row) -> Self
   where
      I: IntoIterator<Item = S>,
      S: Into<String>,
   {
      let mut record = Self::new(keys);
      record.import_entry(row);
      record
   }

   pub fn define(&mut self, key: impl Into<String>) -> &mut Self {
      let key = key.into();
      if !key.is_empty() {
         self.definitions.insert(key);
      }
      self
   }

   pub fn is_defined(&self, key: &str) -> bool {
      self.definitions.contains(key)
   }

   pub fn keys(&self) -> impl Iterator<Item = &str> {
      self.definitions.iter().map(String::as_str)
   }

   /// Set a value. Empty keys are ignored.
   pub fn set_value(&mut self, key: impl Into<String>, value: JsonValue) -> &mut Self {
      let key = key.into();
      if !key.is_empty() {
         self.entries.insert(key, value);
      }
      self
   }

   /// The value of a defined key, if one was set.
   pub fn value(&self, key: &str) -> Option<&JsonValue> {
      if !self.is_defined(key) {
         return None;
      }
      self.entries.get(key)
   }

   /// Set every key of `entry`.
   pub fn import_entry(&mut self, entry: &Row) -> &mut Self {
      for (key, value) in entry {
         self.set_value(key.clone(), value.clone());
      }
      self
   }

   /// Every defined key with its value, `null` when unset.
   pub fn export_entry(&self) -> Row {
      self
         .definitions
         .iter()
         .map(|key| {
            let value = self.entries.get(key).cloned().unwrap_or(JsonValue::Null);
            (key.clone(), value)
         })
         .collect()
   }

   /// The values to write into `schema`'s table.
   ///
   /// Only defined keys that are columns of the table and hold a non-null
   /// value are exported, each validated and converted by its column type.
   pub fn export_for_table(&self, schema: &TableSchema) -> Result<Row> {
      let mut row = Row::new();
      for (name, column) in schema.columns() {
         if !self.is_defined(name) {
            continue;
         }
         let Some(value) = self.entries.get(name).filter(|v| !v.is_null()) else {
            continue;
         };

         column.column_type.validate(value)?;
         row.insert(name.clone(), column.column_type.stringify(value)?);
      }
      Ok(row)
   }

   /// Copy defined keys from `other`.
   ///
   /// With `override_existing`, every defined key takes `other`'s value (or
   /// `null`); otherwise only keys never set here are filled.
   pub fn merge_record(&mut self, other: &Record, override_existing: bool) -> &mut Self {
      let from = other.export_entry();
      self.merge_entry(&from, override_existing)
   }

   /// Like [`merge_record`](Self::merge_record) with a plain row as source.
   pub fn merge_entry(&mut self, from: &Row, override_existing: bool) -> &mut Self {
      for key in &self.definitions {
         if override_existing || !self.entries.contains_key(key) {
            let value = from.get(key).cloned().unwrap_or(JsonValue::Null);
            self.entries.insert(key.clone(), value);
         }
      }
      self
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::data_types::ColumnType;
   use crate::table::ColumnDef;
   use serde_json::json;

   fn schema() -> TableSchema {
      TableSchema::new("people")
         .column("id", ColumnDef::new(ColumnType::Integer).primary_key())
         .column("name", ColumnDef::new(ColumnType::Text))
         .column("active", ColumnDef::new(ColumnType::Boolean))
   }

   #[test]
   fn test_export_for_table_filters_and_converts() {
      let mut record = Record::new(["id", "name", "active", "nickname"]);
      record
         .set_value("name", json!("Ann"))
         .set_value("active", json!(true))
         .set_value("nickname", json!("A"))
         .set_value("id", JsonValue::Null);

      let row = record.export_for_table(&schema()).unwrap();
      assert_eq!(row.len(), 2);
      assert_eq!(row["name"], json!("Ann"));
      assert_eq!(row["active"], json!(1));
   }

   #[test]
   fn test_export_for_table_rejects_bad_values() {
      let mut record = Record::for_table(&schema());
      record.set_value("active", json!("maybe"));
      assert!(record.export_for_table(&schema()).is_err());
   }

   #[test]
   fn test_undefined_keys_are_not_exported() {
      let mut record = Record::new(["name"]);
      record.set_value("active", json!(false));
      assert!(record.export_for_table(&schema()).unwrap().is_empty());
      assert_eq!(record.export_entry().len(), 1);
   }

   #[test]
   fn test_merge_record() {
      let mut target = Record::new(["a", "b", "c"]);
      target.set_value("a", json!(1));

      let mut source = Record::new(["a", "b"]);
      source.set_value("a", json!(10)).set_value("b", json!(20));

      target.merge_record(&source, false);
      assert_eq!(target.value("a"), Some(&json!(1)));
      assert_eq!(target.value("b"), Some(&json!(20)));
      assert_eq!(target.value("c"), Some(&JsonValue::Null));

      target.merge_record(&source, true);
      assert_eq!(target.value("a"), Some(&json!(10)));
      assert_eq!(target.value("c"), Some(&JsonValue::Null));
   }

   #[test]
   fn test_from_row() {
      let row: Row = [("id".to_string(), json!(3)), ("name".to_string(), json!("x"))]
         .into_iter()
         .collect();
      let record = Record::from_row(["id"], &row);
      assert_eq!(record.value("id"), Some(&json!(3)));
      assert_eq!(record.value("name"), None);
   }
}
