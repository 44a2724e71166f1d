use super::CommandBuilder;
use crate::params::Params;
use crate::safe_sql::{encode, safe_meta_string};

/// Description of an index for [`CommandBuilder::create_index`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexSpec {
   pub index_name: String,
   pub table_name: String,
   pub columns: Vec<String>,
   /// Makes a partial index
   pub condition: Option<String>,
   pub condition_params: Option<Params>,
   pub unique: bool,
}

impl CommandBuilder {
   /// `CREATE TABLE IF NOT EXISTS` with one `(name, definition)` pair per column.
   ///
   /// A column without a definition is declared by name only.
   ///
   /// # Examples
   ///
   /// ```
   /// use sqlx_sqlite_toolkit::CommandBuilder;
   ///
   /// let sql = CommandBuilder::detached()
   ///    .create_table(
   ///       "foo",
   ///       [
   ///          ("userId", Some("INTEGER PRIMARY KEY")),
   ///          ("userName", None),
   ///          ("age", Some("unique not null default 1")),
   ///       ],
   ///    )
   ///    .sql()
   ///    .unwrap();
   /// assert_eq!(
   ///    sql,
   ///    "CREATE TABLE IF NOT EXISTS `foo` (`userId` INTEGER PRIMARY KEY,`userName`,`age` unique not null default 1);"
   /// );
   /// ```
   pub fn create_table<I, K, D>(self, table: &str, columns: I) -> Self
   where
      I: IntoIterator<Item = (K, Option<D>)>,
      K: AsRef<str>,
      D: AsRef<str>,
   {
      let builder = self.reset();
      let table = safe_meta_string(table);
      if table.is_empty() {
         return builder.fail("table name is empty");
      }

      let columns: Vec<String> = columns
         .into_iter()
         .map(|(name, definition)| {
            let name = safe_meta_string(name.as_ref());
            match definition.as_ref().map(|d| d.as_ref()).filter(|d| !d.is_empty()) {
               Some(definition) => format!("`{name}` {definition}"),
               None => format!("`{name}`"),
            }
         })
         .collect();
      if columns.is_empty() {
         return builder.fail(format!("table {table} has no columns"));
      }

      builder.append(format!(
         "CREATE TABLE IF NOT EXISTS `{table}` ({});",
         columns.join(",")
      ))
   }

   pub fn drop_table(self, table: &str) -> Self {
      let builder = self.reset();
      let table = safe_meta_string(table);
      if table.is_empty() {
         return builder.fail("table name is empty");
      }
      builder.append(format!("DROP TABLE IF EXISTS `{table}`;"))
   }

   /// `ALTER TABLE ... ADD COLUMN` with a raw column definition.
   pub fn add_column(self, table: &str, column: &str, definition: &str) -> Self {
      let builder = self.reset();
      let table = safe_meta_string(table);
      let column = safe_meta_string(column);
      let definition = encode(definition);

      if table.is_empty() || column.is_empty() || definition.is_empty() {
         return builder.fail("add_column needs a table, a column and a definition");
      }
      builder.append(format!(
         "ALTER TABLE `{table}` ADD COLUMN `{column}` {definition};"
      ))
   }

   pub fn create_index(self, spec: &IndexSpec) -> Self {
      let builder = self.reset();
      let index = safe_meta_string(&spec.index_name);
      let table = safe_meta_string(&spec.table_name);

      if index.is_empty() || table.is_empty() || spec.columns.is_empty() {
         return builder.fail("create_index needs an index name, a table and at least one column");
      }

      let columns: Vec<String> = spec.columns.iter().map(|c| safe_meta_string(c)).collect();
      let head = if spec.unique {
         "CREATE UNIQUE INDEX IF NOT EXISTS "
      } else {
         "CREATE INDEX IF NOT EXISTS "
      };

      builder
         .append(head)
         .append(format!("`{index}` ON `{table}` ({}) ", columns.join(",")))
         .where_condition(spec.condition.as_deref(), spec.condition_params.as_ref())
   }

   pub fn drop_index(self, index: &str) -> Self {
      let builder = self.reset();
      let index = safe_meta_string(index);
      if index.is_empty() {
         return builder.fail("index name is empty");
      }
      builder.append(format!("DROP INDEX IF EXISTS `{index}`;"))
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::Error;

   #[test]
   fn test_add_column() {
      let sql = CommandBuilder::detached()
         .add_column("foo", "gender", "BOOLEAN NOT NULL DEFAULT 1")
         .sql()
         .unwrap();
      assert_eq!(sql, "ALTER TABLE `foo` ADD COLUMN `gender` BOOLEAN NOT NULL DEFAULT 1;");
   }

   #[test]
   fn test_drop_table_strips_quotes() {
      let sql = CommandBuilder::detached().drop_table("`fo'o`").sql().unwrap();
      assert_eq!(sql, "DROP TABLE IF EXISTS `foo`;");
   }

   #[test]
   fn test_create_index() {
      let spec = IndexSpec {
         index_name: "foo_age_name".into(),
         table_name: "foo".into(),
         columns: vec!["age".into(), "name".into()],
         unique: true,
         ..Default::default()
      };
      let sql = CommandBuilder::detached().create_index(&spec).sql().unwrap();
      assert_eq!(
         sql,
         "CREATE UNIQUE INDEX IF NOT EXISTS `foo_age_name` ON `foo` (age,name) ;"
      );
   }

   #[test]
   fn test_partial_index_substitutes_params() {
      let mut params = Params::new();
      params.insert("min".into(), serde_json::json!(18));
      let spec = IndexSpec {
         index_name: "adults".into(),
         table_name: "people".into(),
         columns: vec!["age".into()],
         condition: Some("age >= :min".into()),
         condition_params: Some(params),
         unique: false,
      };
      let sql = CommandBuilder::detached().create_index(&spec).sql().unwrap();
      assert_eq!(
         sql,
         "CREATE INDEX IF NOT EXISTS `adults` ON `people` (age) WHERE age >= 18 ;"
      );
   }

   #[test]
   fn test_drop_index() {
      let sql = CommandBuilder::detached().drop_index("idx").sql().unwrap();
      assert_eq!(sql, "DROP INDEX IF EXISTS `idx`;");
   }

   #[test]
   fn test_empty_table_name_is_invalid() {
      let result = CommandBuilder::detached()
         .create_table("``", [("a", None::<&str>)])
         .sql();
      assert!(matches!(result, Err(Error::InvalidArgument(_))));
   }
}
