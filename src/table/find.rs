use serde_json::Value as JsonValue;
use sqlx_sqlite_toolkit::{Criteria, Limit, Params, Row, substitute_named_params};

use super::{Table, single_param};
use crate::Result;
use crate::record::Record;

impl Table {
   pub async fn find_all_with_criteria(&self, criteria: &Criteria) -> Result<Vec<Row>> {
      let rows = criteria
         .apply_to_select_command(self.database().command(), self.name())
         .fetch()
         .await?;
      Ok(self.parse_rows(rows))
   }

   /// First row matching `criteria`; the limit is forced to 1.
   pub async fn find_first_with_criteria(&self, criteria: &Criteria) -> Result<Option<Row>> {
      let mut criteria = criteria.clone();
      criteria.set_limit(1);
      Ok(self.find_all_with_criteria(&criteria).await?.into_iter().next())
   }

   pub async fn find_all(&self) -> Result<Vec<Row>> {
      self.find_all_with_criteria(&Criteria::new()).await
   }

   pub async fn find_first(&self) -> Result<Option<Row>> {
      self.find_first_with_criteria(&Criteria::new()).await
   }

   pub async fn find_all_where(
      &self,
      condition: &str,
      params: Option<Params>,
      distinct: bool,
   ) -> Result<Vec<Row>> {
      let mut criteria = where_criteria(condition, params);
      criteria.set_distinct(distinct);
      self.find_all_with_criteria(&criteria).await
   }

   pub async fn find_first_where(&self, condition: &str, params: Option<Params>) -> Result<Option<Row>> {
      self
         .find_first_with_criteria(&where_criteria(condition, params))
         .await
   }

   /// Rows whose `key` column equals `value`.
   pub async fn find_all_by_key_value(&self, key: &str, value: JsonValue) -> Result<Vec<Row>> {
      let condition = format!("{} = :value", Self::quoted(key));
      self
         .find_all_with_criteria(&where_criteria(&condition, Some(single_param("value", value))))
         .await
   }

   pub async fn find_by_primary_key(&self, value: JsonValue) -> Result<Option<Row>> {
      let key = self.require_primary_key()?;
      let condition = format!("{} = :primaryKeyValue", Self::quoted(key));
      self
         .find_first_where(&condition, Some(single_param("primaryKeyValue", value)))
         .await
   }

   pub async fn find_by_primary_keys(&self, values: Vec<JsonValue>) -> Result<Vec<Row>> {
      if values.is_empty() {
         return Ok(Vec::new());
      }
      let key = self.require_primary_key()?;
      let condition = format!("{} IN (:primaryKeyValueList)", Self::quoted(key));
      let params = single_param("primaryKeyValueList", JsonValue::Array(values));
      self.find_all_with_criteria(&where_criteria(&condition, Some(params))).await
   }

   /// The row with the highest `column`, the primary key by default.
   pub async fn find_latest(&self, column: Option<&str>) -> Result<Option<Row>> {
      self.find_latest_where("", None, column).await
   }

   pub async fn find_latest_where(
      &self,
      condition: &str,
      params: Option<Params>,
      column: Option<&str>,
   ) -> Result<Option<Row>> {
      let column = match column {
         Some(column) => column,
         None => self.require_primary_key()?,
      };

      let mut criteria = where_criteria(condition, params);
      criteria.set_distinct(false).set_order_by(column).set_desc(true);
      self.find_first_with_criteria(&criteria).await
   }

   /// Run a raw query after `:name` substitution.
   pub async fn find_all_with_sql(&self, sql: &str, params: Option<&Params>) -> Result<Vec<Row>> {
      let sql = substitute_named_params(sql, params);
      let rows = self.database().command().append(sql).fetch().await?;
      Ok(self.parse_rows(rows))
   }

   /// Like [`find_all_with_sql`](Self::find_all_with_sql) with `LIMIT 1` appended.
   pub async fn find_first_with_sql(&self, sql: &str, params: Option<&Params>) -> Result<Option<Row>> {
      let sql = substitute_named_params(sql, params);
      let sql = sql.trim_end().trim_end_matches(';');
      let rows = self
         .database()
         .command()
         .append(format!("{sql} "))
         .limit(Limit::Rows(1))
         .fetch()
         .await?;
      Ok(self.parse_rows(rows).into_iter().next())
   }

   /// Every row as a record defined by this table's columns.
   pub async fn find_all_records(&self) -> Result<Vec<Record>> {
      let rows = self.find_all().await?;
      Ok(rows
         .iter()
         .map(|row| Record::from_row(self.schema().column_names(), row))
         .collect())
   }

   pub async fn count_all(&self) -> Result<i64> {
      self.count_where("", None).await
   }

   pub async fn count_where(&self, condition: &str, params: Option<&Params>) -> Result<i64> {
      let mut sql = format!("SELECT COUNT(*) AS count FROM {}", Self::quoted(self.name()));
      if !condition.is_empty() {
         sql.push_str(" WHERE ");
         sql.push_str(&substitute_named_params(condition, params));
      }

      let rows = self.database().command().append(sql).fetch().await?;
      Ok(rows
         .first()
         .and_then(|row| row.get("count"))
         .and_then(JsonValue::as_i64)
         .unwrap_or(0))
   }
}

fn where_criteria(condition: &str, params: Option<Params>) -> Criteria {
   let mut criteria = Criteria::new();
   criteria.set_where_condition(condition);
   if let Some(params) = params {
      criteria.set_where_condition_params(params);
   }
   criteria
}
