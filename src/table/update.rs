use serde_json::Value as JsonValue;
use sqlx_sqlite_toolkit::{Params, Row, WriteQueryResult};

use super::{Table, single_param};
use crate::Result;
use crate::record::Record;

impl Table {
   /// Write a record's exported values to the row with its primary key.
   ///
   /// Returns `None` without touching the database when the record has no
   /// primary key value.
   pub async fn update_record(&self, record: &Record) -> Result<Option<WriteQueryResult>> {
      let key = self.require_primary_key()?;
      let Some(value) = record.value(key).filter(|v| !v.is_null()).cloned() else {
         return Ok(None);
      };

      let values = record.export_for_table(self.schema())?;
      self.update_values_by_primary_key(&values, value).await.map(Some)
   }

   /// Update each record in turn; returns the total number of rows changed.
   pub async fn update_records(&self, records: &[Record]) -> Result<u64> {
      let mut changed = 0;
      for record in records {
         if let Some(result) = self.update_record(record).await? {
            changed += result.rows_affected;
         }
      }
      Ok(changed)
   }

   pub async fn update_values_where(
      &self,
      values: &Row,
      condition: &str,
      params: Option<&Params>,
   ) -> Result<WriteQueryResult> {
      let result = self
         .database()
         .command()
         .update_row(self.name(), values, Some(condition), params)
         .execute()
         .await?;
      Ok(result)
   }

   /// Set one column on rows matching `condition`.
   pub async fn update_value_where(
      &self,
      key: &str,
      value: JsonValue,
      condition: &str,
      params: Option<&Params>,
   ) -> Result<WriteQueryResult> {
      let mut values = Row::new();
      values.insert(key.to_string(), value);
      self.update_values_where(&values, condition, params).await
   }

   pub async fn update_values_by_primary_key(
      &self,
      values: &Row,
      primary_key_value: JsonValue,
   ) -> Result<WriteQueryResult> {
      let key = self.require_primary_key()?;
      let condition = format!("{} = :primaryKeyValue", Self::quoted(key));
      let params = single_param("primaryKeyValue", primary_key_value);
      self.update_values_where(values, &condition, Some(&params)).await
   }

   /// Returns `None` when `primary_key_values` is empty.
   pub async fn update_values_by_primary_keys(
      &self,
      values: &Row,
      primary_key_values: Vec<JsonValue>,
   ) -> Result<Option<WriteQueryResult>> {
      let key = self.require_primary_key()?;
      self.update_values_where_key_in(values, key, primary_key_values).await
   }

   /// Update rows whose `key` column is one of `key_values`.
   ///
   /// Returns `None` when `key_values` is empty.
   pub async fn update_values_where_key_in(
      &self,
      values: &Row,
      key: &str,
      key_values: Vec<JsonValue>,
   ) -> Result<Option<WriteQueryResult>> {
      if key_values.is_empty() {
         return Ok(None);
      }

      let condition = format!("{} IN (:keyValueList)", Self::quoted(key));
      let params = single_param("keyValueList", JsonValue::Array(key_values));
      self
         .update_values_where(values, &condition, Some(&params))
         .await
         .map(Some)
   }
}
