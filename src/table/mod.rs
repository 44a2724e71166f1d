//! Table definitions and the record helpers that run against them.
//!
//! A [`TableSchema`] describes columns and indexes. [`Table::sync`] creates
//! the table (and its indexes) when missing and returns a [`Table`] bound to
//! a database, which carries the insert, find, update, delete and count
//! helpers. Rows read through a table are converted back by each column's
//! [`ColumnType::parse`].

mod delete;
mod find;
mod insert;
mod update;

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use sqlx_sqlite_toolkit::safe_sql::safe_meta_string;
use sqlx_sqlite_toolkit::{Database, IndexSpec, Params, Row};
use tracing::{debug, warn};

use crate::data_types::ColumnType;
use crate::{Error, Result};

/// One column: its type and constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
   pub column_type: ColumnType,
   pub primary_key: bool,
   pub auto_increment: bool,
   pub unique: bool,
   pub not_null: bool,
   /// Raw SQL default; an empty string renders as `''`
   pub default_value: Option<String>,
}

impl ColumnDef {
   pub fn new(column_type: ColumnType) -> Self {
      Self {
         column_type,
         primary_key: false,
         auto_increment: false,
         unique: false,
         not_null: false,
         default_value: None,
      }
   }

   pub fn primary_key(mut self) -> Self {
      self.primary_key = true;
      self
   }

   pub fn auto_increment(mut self) -> Self {
      self.auto_increment = true;
      self
   }

   pub fn unique(mut self) -> Self {
      self.unique = true;
      self
   }

   /// Requires a default value as well.
   pub fn not_null(mut self) -> Self {
      self.not_null = true;
      self
   }

   pub fn default_value(mut self, value: impl Into<String>) -> Self {
      self.default_value = Some(value.into());
      self
   }

   /// DDL fragment after the column name:
   /// `TYPE [PRIMARY KEY] [AUTOINCREMENT] [UNIQUE] [DEFAULT v] [NOT NULL]`.
   fn to_sql(&self, table: &str, name: &str) -> Result<String> {
      let mut parts = vec![self.column_type.to_sql()];

      if self.primary_key {
         parts.push("PRIMARY KEY".to_string());
      }
      if self.auto_increment {
         parts.push("AUTOINCREMENT".to_string());
      }
      if self.unique {
         parts.push("UNIQUE".to_string());
      }
      if let Some(default) = &self.default_value {
         parts.push("DEFAULT".to_string());
         parts.push(if default.is_empty() {
            "''".to_string()
         } else {
            default.clone()
         });
      }
      if self.not_null {
         if self.default_value.is_none() {
            return Err(Error::InvalidSchema(format!(
               "column {table}.{name}: not null constraint must be used with a default value"
            )));
         }
         parts.push("NOT NULL".to_string());
      }

      Ok(parts.join(" "))
   }
}

/// An index over one or more columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexDef {
   /// Defaults to `{table}_{column}_{column}...`
   pub name: Option<String>,
   pub columns: Vec<String>,
   pub unique: bool,
   /// Makes a partial index
   pub condition: Option<String>,
   pub condition_params: Option<Params>,
}

impl IndexDef {
   pub fn new<I, S>(columns: I) -> Self
   where
      I: IntoIterator<Item = S>,
      S: Into<String>,
   {
      Self {
         columns: columns.into_iter().map(Into::into).collect(),
         ..Default::default()
      }
   }

   pub fn named(mut self, name: impl Into<String>) -> Self {
      self.name = Some(name.into());
      self
   }

   pub fn unique(mut self) -> Self {
      self.unique = true;
      self
   }

   pub fn condition(mut self, condition: impl Into<String>, params: Option<Params>) -> Self {
      self.condition = Some(condition.into());
      self.condition_params = params;
      self
   }
}

/// Columns, primary key and indexes of one table.
///
/// # Examples
///
/// ```
/// use sqlx_sqlite_dal::{ColumnDef, ColumnType, IndexDef, TableSchema};
///
/// let schema = TableSchema::new("users")
///    .column("id", ColumnDef::new(ColumnType::Integer).primary_key().auto_increment())
///    .column("email", ColumnDef::new(ColumnType::string()).unique())
///    .column("age", ColumnDef::new(ColumnType::Integer).not_null().default_value("0"))
///    .index(IndexDef::new(["email", "age"]));
///
/// assert_eq!(schema.primary_key(), Some("id"));
/// assert_eq!(schema.indexes()[0].index_name, "users_email_age");
///
/// let infos = schema.export_column_infos().unwrap();
/// assert_eq!(infos["id"], "INTEGER PRIMARY KEY AUTOINCREMENT");
/// assert_eq!(infos["age"], "INTEGER DEFAULT 0 NOT NULL");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
   name: String,
   columns: IndexMap<String, ColumnDef>,
   indexes: Vec<IndexSpec>,
   primary_key: Option<String>,
}

impl TableSchema {
   pub fn new(name: impl Into<String>) -> Self {
      Self {
         name: name.into(),
         columns: IndexMap::new(),
         indexes: Vec::new(),
         primary_key: None,
      }
   }

   /// Add a column.
   ///
   /// Only one primary key is supported; a second one is dropped with a
   /// warning and the column is added without it.
   pub fn column(mut self, name: impl Into<String>, mut def: ColumnDef) -> Self {
      let name = name.into();

      if def.primary_key {
         match &self.primary_key {
            Some(existing) => {
               warn!(
                  "table {} already has primary key {}; ignoring primary key on {}",
                  self.name, existing, name
               );
               def.primary_key = false;
            }
            None => self.primary_key = Some(name.clone()),
         }
      }

      self.columns.insert(name, def);
      self
   }

   pub fn index(mut self, index: IndexDef) -> Self {
      let index_name = index.name.unwrap_or_else(|| {
         std::iter::once(self.name.as_str())
            .chain(index.columns.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("_")
      });

      self.indexes.push(IndexSpec {
         index_name,
         table_name: self.name.clone(),
         columns: index.columns,
         condition: index.condition,
         condition_params: index.condition_params,
         unique: index.unique,
      });
      self
   }

   pub fn name(&self) -> &str {
      &self.name
   }

   pub fn primary_key(&self) -> Option<&str> {
      self.primary_key.as_deref()
   }

   pub fn columns(&self) -> impl Iterator<Item = (&String, &ColumnDef)> {
      self.columns.iter()
   }

   pub fn column_names(&self) -> impl Iterator<Item = &str> {
      self.columns.keys().map(String::as_str)
   }

   pub fn column_type(&self, name: &str) -> Option<&ColumnType> {
      self.columns.get(name).map(|def| &def.column_type)
   }

   pub fn indexes(&self) -> &[IndexSpec] {
      &self.indexes
   }

   /// Column name to DDL fragment, in definition order.
   pub fn export_column_infos(&self) -> Result<IndexMap<String, String>> {
      self
         .columns
         .iter()
         .map(|(name, def)| Ok((name.clone(), def.to_sql(&self.name, name)?)))
         .collect()
   }

   /// Convert stored values back through each column's type.
   ///
   /// Columns the schema does not know are left as they are.
   pub fn parse_row(&self, mut row: Row) -> Row {
      for (name, value) in row.iter_mut() {
         if let Some(column_type) = self.column_type(name) {
            *value = column_type.parse(value);
         }
      }
      row
   }
}

/// A synced table bound to a database.
#[derive(Debug, Clone)]
pub struct Table {
   schema: Arc<TableSchema>,
   database: Database,
}

impl Table {
   /// Create the table and its indexes when missing.
   ///
   /// # Examples
   ///
   /// ```no_run
   /// # async fn example(db: sqlx_sqlite_toolkit::Database) -> sqlx_sqlite_dal::Result<()> {
   /// use serde_json::json;
   /// use sqlx_sqlite_dal::{ColumnDef, ColumnType, Record, Table, TableSchema};
   ///
   /// let schema = TableSchema::new("users")
   ///    .column("id", ColumnDef::new(ColumnType::Integer).primary_key())
   ///    .column("name", ColumnDef::new(ColumnType::Text));
   /// let users = Table::sync(schema, &db).await?;
   ///
   /// let mut record = Record::for_table(users.schema());
   /// record.set_value("name", json!("Alice"));
   /// users.insert_record(&mut record).await?;
   /// assert!(record.value("id").is_some());
   /// # Ok(())
   /// # }
   /// ```
   pub async fn sync(schema: TableSchema, database: &Database) -> Result<Table> {
      let infos = schema.export_column_infos()?;

      database
         .command()
         .create_table(
            schema.name(),
            infos.iter().map(|(name, sql)| (name.as_str(), Some(sql.as_str()))),
         )
         .execute()
         .await?;

      for index in schema.indexes() {
         database.command().create_index(index).execute().await?;
      }
      debug!("synced table {} on {}", schema.name(), database.name());

      Ok(Table {
         schema: Arc::new(schema),
         database: database.clone(),
      })
   }

   pub fn name(&self) -> &str {
      self.schema.name()
   }

   pub fn schema(&self) -> &TableSchema {
      &self.schema
   }

   pub fn database(&self) -> &Database {
      &self.database
   }

   /// A record defined by this table's columns.
   pub fn new_record(&self) -> crate::Record {
      crate::Record::for_table(&self.schema)
   }

   fn require_primary_key(&self) -> Result<&str> {
      self.schema.primary_key().ok_or_else(|| {
         Error::InvalidSchema(format!("table {} has no primary key", self.schema.name()))
      })
   }

   /// `` `column` `` for use in generated predicates.
   fn quoted(column: &str) -> String {
      format!("`{}`", safe_meta_string(column))
   }

   fn parse_rows(&self, rows: Vec<Row>) -> Vec<Row> {
      rows.into_iter().map(|row| self.schema.parse_row(row)).collect()
   }
}

/// `DROP TABLE IF EXISTS`.
pub async fn drop_table(database: &Database, name: &str) -> Result<()> {
   database.command().drop_table(name).execute().await?;
   debug!("dropped table {} on {}", name, database.name());
   Ok(())
}

fn single_param(name: &str, value: JsonValue) -> Params {
   let mut params = Params::new();
   params.insert(name.to_string(), value);
   params
}
