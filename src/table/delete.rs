use serde_json::Value as JsonValue;
use sqlx_sqlite_toolkit::{Criteria, Params, WriteQueryResult};

use super::{Table, single_param};
use crate::Result;
use crate::record::Record;

impl Table {
   /// Delete the row with the record's primary key; `None` when the record
   /// has none.
   pub async fn delete_record(&self, record: &Record) -> Result<Option<WriteQueryResult>> {
      let key = self.require_primary_key()?;
      match record.value(key).filter(|v| !v.is_null()) {
         Some(value) => self.delete_by_primary_key(value.clone()).await.map(Some),
         None => Ok(None),
      }
   }

   /// Delete the rows of every record that has a primary key value.
   pub async fn delete_records(&self, records: &[Record]) -> Result<Option<WriteQueryResult>> {
      let key = self.require_primary_key()?;
      let values: Vec<JsonValue> = records
         .iter()
         .filter_map(|record| record.value(key))
         .filter(|value| !value.is_null())
         .cloned()
         .collect();
      self.delete_by_primary_keys(values).await
   }

   pub async fn delete_where(&self, condition: &str, params: Option<Params>) -> Result<WriteQueryResult> {
      let mut criteria = Criteria::new();
      criteria.set_where_condition(condition);
      if let Some(params) = params {
         criteria.set_where_condition_params(params);
      }
      self.delete_with_criteria(&criteria).await
   }

   /// Only the condition of `criteria` is used.
   pub async fn delete_with_criteria(&self, criteria: &Criteria) -> Result<WriteQueryResult> {
      let result = criteria
         .apply_to_delete_command(self.database().command(), self.name())
         .execute()
         .await?;
      Ok(result)
   }

   pub async fn delete_by_primary_key(&self, value: JsonValue) -> Result<WriteQueryResult> {
      let key = self.require_primary_key()?;
      let condition = format!("{} = :primaryKeyValue", Self::quoted(key));
      self
         .delete_where(&condition, Some(single_param("primaryKeyValue", value)))
         .await
   }

   /// Returns `None` without touching the database when `values` is empty.
   pub async fn delete_by_primary_keys(&self, values: Vec<JsonValue>) -> Result<Option<WriteQueryResult>> {
      if values.is_empty() {
         return Ok(None);
      }
      let key = self.require_primary_key()?;
      let condition = format!("{} IN (:primaryKeyValueList)", Self::quoted(key));
      let params = single_param("primaryKeyValueList", JsonValue::Array(values));
      self.delete_where(&condition, Some(params)).await.map(Some)
   }
}
