use serde_json::Value as JsonValue;
use tracing::debug;

use super::CommandBuilder;
use crate::params::Params;
use crate::recordset::Row;
use crate::safe_sql::{literal, safe_meta_string};

impl CommandBuilder {
   /// One `INSERT` per row, concatenated into a single command.
   ///
   /// Only the keys present in a row are inserted; `null` values become `NULL`.
   ///
   /// # Examples
   ///
   /// ```
   /// use serde_json::json;
   /// use sqlx_sqlite_toolkit::{CommandBuilder, Row};
   ///
   /// let mut row = Row::new();
   /// row.insert("userName".into(), json!("foo"));
   /// row.insert("age".into(), json!(2));
   /// row.insert("gender".into(), json!(null));
   ///
   /// let sql = CommandBuilder::detached().insert_row("foo", &[row]).sql().unwrap();
   /// assert_eq!(sql, "INSERT INTO `foo` (userName,age,gender) VALUES ('foo','2',NULL);");
   /// ```
   pub fn insert_row(self, table: &str, rows: &[Row]) -> Self {
      let builder = self.reset();
      let table = safe_meta_string(table);
      if table.is_empty() {
         return builder.fail("table name is empty");
      }
      if rows.is_empty() || rows.iter().any(|row| row.is_empty()) {
         return builder.fail(format!("nothing to insert into {table}"));
      }

      let statements: String = rows
         .iter()
         .map(|row| {
            let names: Vec<String> = row.keys().map(|name| safe_meta_string(name)).collect();
            let values: Vec<String> = row.values().map(literal).collect();
            format!(
               "INSERT INTO `{table}` ({}) VALUES ({});",
               names.join(","),
               values.join(",")
            )
         })
         .collect();

      builder.append(statements)
   }

   /// `UPDATE ... SET` the given columns on rows matching `condition`.
   pub fn update_row(
      self,
      table: &str,
      values: &Row,
      condition: Option<&str>,
      params: Option<&Params>,
   ) -> Self {
      let builder = self.reset();
      let table = safe_meta_string(table);
      if table.is_empty() {
         return builder.fail("table name is empty");
      }
      if values.is_empty() {
         return builder.fail(format!("nothing to update in {table}"));
      }

      let assignments: Vec<String> = values
         .iter()
         .map(|(name, value)| format!("`{}`={}", safe_meta_string(name), literal(value)))
         .collect();

      builder
         .append(format!("UPDATE `{table}` SET {} ", assignments.join(",")))
         .where_condition(condition, params)
   }

   /// Insert-or-replace that keeps existing values for columns the row omits.
   ///
   /// Every name in `columns` is written. Columns present in `row` (including
   /// explicit `null`) take the row's value; absent ones fall back to the
   /// current value of the existing row with the same primary key. Without an
   /// explicit `primary_key` the first column is used.
   ///
   /// # Examples
   ///
   /// ```
   /// use serde_json::json;
   /// use sqlx_sqlite_toolkit::{CommandBuilder, Row};
   ///
   /// let mut row = Row::new();
   /// row.insert("id".into(), json!(1));
   /// row.insert("name".into(), json!("x"));
   ///
   /// let sql = CommandBuilder::detached()
   ///    .upsert_row("t", &row, &["id", "name", "age"], Some("id"))
   ///    .sql()
   ///    .unwrap();
   /// assert_eq!(
   ///    sql,
   ///    "INSERT OR REPLACE INTO `t` (id,name,age) SELECT '1','x',`age` FROM ( SELECT NULL ) \
   ///     LEFT JOIN ( SELECT * FROM t WHERE `id` = '1' );"
   /// );
   /// ```
   pub fn upsert_row<S: AsRef<str>>(
      self,
      table: &str,
      row: &Row,
      columns: &[S],
      primary_key: Option<&str>,
   ) -> Self {
      let builder = self.reset();
      let table = safe_meta_string(table);
      if table.is_empty() {
         return builder.fail("table name is empty");
      }

      let columns: Vec<String> = columns.iter().map(|c| safe_meta_string(c.as_ref())).collect();
      let primary_key = match primary_key {
         Some(key) => safe_meta_string(key),
         None => match columns.first() {
            Some(first) => {
               debug!("upsert into {} without a primary key; using {}", table, first);
               first.clone()
            }
            None => return builder.fail(format!("no columns to upsert into {table}")),
         },
      };

      let primary_value = row
         .get(&primary_key)
         .map(literal)
         .unwrap_or_else(|| literal(&JsonValue::Null));

      let values: Vec<String> = columns
         .iter()
         .map(|name| match row.get(name) {
            Some(value) => literal(value),
            None => format!("`{name}`"),
         })
         .collect();

      builder.append(format!(
         "INSERT OR REPLACE INTO `{table}` ({}) SELECT {} FROM ( SELECT NULL ) LEFT JOIN ( SELECT * FROM {table} WHERE `{primary_key}` = {primary_value} )",
         columns.join(","),
         values.join(","),
      ))
   }

   /// `DELETE FROM` rows matching `condition`, or every row without one.
   pub fn delete_row(self, table: &str, condition: Option<&str>, params: Option<&Params>) -> Self {
      let builder = self.reset();
      let table = safe_meta_string(table);
      if table.is_empty() {
         return builder.fail("table name is empty");
      }

      builder
         .append(format!("DELETE FROM `{table}` "))
         .where_condition(condition, params)
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::Error;
   use serde_json::json;

   fn row(pairs: &[(&str, JsonValue)]) -> Row {
      pairs
         .iter()
         .map(|(k, v)| (k.to_string(), v.clone()))
         .collect()
   }

   #[test]
   fn test_insert_multiple_rows() {
      let rows = vec![
         row(&[("userName", json!("foo")), ("age", json!("2"))]),
         row(&[("userName", json!("it's")), ("gender", json!(true))]),
      ];
      let sql = CommandBuilder::detached().insert_row("foo", &rows).sql().unwrap();
      assert_eq!(
         sql,
         "INSERT INTO `foo` (userName,age) VALUES ('foo','2');\
          INSERT INTO `foo` (userName,gender) VALUES ('it''s','1');"
      );
   }

   #[test]
   fn test_insert_nothing_is_invalid() {
      let result = CommandBuilder::detached().insert_row("foo", &[]).sql();
      assert!(matches!(result, Err(Error::InvalidArgument(_))));

      let result = CommandBuilder::detached().insert_row("foo", &[Row::new()]).sql();
      assert!(matches!(result, Err(Error::InvalidArgument(_))));
   }

   #[test]
   fn test_update_row() {
      let mut params = Params::new();
      params.insert("name".into(), json!("foo"));

      let sql = CommandBuilder::detached()
         .update_row(
            "foo",
            &row(&[("gender", json!(0)), ("age", json!(100))]),
            Some("userName = :name"),
            Some(&params),
         )
         .sql()
         .unwrap();
      assert_eq!(sql, "UPDATE `foo` SET `gender`='0',`age`='100' WHERE userName = 'foo' ;");
   }

   #[test]
   fn test_update_to_null() {
      let sql = CommandBuilder::detached()
         .update_row("foo", &row(&[("gender", json!(null))]), None, None)
         .sql()
         .unwrap();
      assert_eq!(sql, "UPDATE `foo` SET `gender`=NULL ;");
   }

   #[test]
   fn test_upsert_row() {
      let sql = CommandBuilder::detached()
         .upsert_row(
            "foo",
            &row(&[("userName", json!("foo")), ("age", json!(2)), ("gender", json!(null))]),
            &["id", "userName", "age", "gender"],
            None,
         )
         .sql()
         .unwrap();
      assert_eq!(
         sql,
         "INSERT OR REPLACE INTO `foo` (id,userName,age,gender) SELECT `id`,'foo','2',NULL \
          FROM ( SELECT NULL ) LEFT JOIN ( SELECT * FROM foo WHERE `id` = NULL );"
      );
   }

   #[test]
   fn test_upsert_with_explicit_key() {
      let sql = CommandBuilder::detached()
         .upsert_row(
            "t",
            &row(&[("id", json!(1)), ("name", json!("x"))]),
            &["id", "name"],
            Some("id"),
         )
         .sql()
         .unwrap();
      assert!(sql.contains("SELECT '1','x' FROM"));
      assert!(sql.ends_with("WHERE `id` = '1' );"));
   }

   #[test]
   fn test_delete_row() {
      let mut params = Params::new();
      params.insert("name".into(), json!("foo"));

      let sql = CommandBuilder::detached()
         .delete_row("foo", Some("userName = :name"), Some(&params))
         .sql()
         .unwrap();
      assert_eq!(sql, "DELETE FROM `foo` WHERE userName = 'foo' ;");

      let sql = CommandBuilder::detached().delete_row("foo", None, None).sql().unwrap();
      assert_eq!(sql, "DELETE FROM `foo` ;");
   }
}
