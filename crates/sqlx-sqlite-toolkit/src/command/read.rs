use super::CommandBuilder;
use crate::params::{Params, substitute_named_params};
use crate::safe_sql::{encode, safe_meta_string};

/// Row limit for a read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Limit {
   /// No `LIMIT` clause at all
   #[default]
   Unset,
   Rows(i64),
   /// `LIMIT -1`, which SQLite reads as "no limit"
   Unbounded,
}

impl From<i64> for Limit {
   fn from(rows: i64) -> Self {
      if rows == -1 { Limit::Unset } else { Limit::Rows(rows) }
   }
}

impl CommandBuilder {
   /// Start a `SELECT`.
   ///
   /// The projection is rendered as a single quoted string, or `*` when
   /// absent or empty.
   pub fn select(self, projection: Option<&str>, distinct: bool) -> Self {
      let builder = self.reset();
      let head = if distinct { "SELECT DISTINCT" } else { "SELECT" };

      match projection.filter(|p| !p.is_empty()) {
         Some(projection) => builder.append(format!("{head} '{projection}' ")),
         None => builder.append(format!("{head} * ")),
      }
   }

   pub fn from(self, table: &str) -> Self {
      self.append(format!("FROM '{}' ", encode(table)))
   }

   /// Append `WHERE <condition>` after substituting `:name` placeholders.
   ///
   /// Nothing is appended when the condition is absent or empty.
   pub fn where_condition(self, condition: Option<&str>, params: Option<&Params>) -> Self {
      match condition.filter(|c| !c.is_empty()) {
         Some(condition) => {
            let condition = substitute_named_params(condition, params);
            self.append(format!("WHERE {condition} "))
         }
         None => self,
      }
   }

   pub fn order_by(self, column: Option<&str>, desc: bool) -> Self {
      let Some(column) = column else {
         return self;
      };
      self
         .append(format!("ORDER BY {} ", safe_meta_string(column)))
         .append(if desc { "DESC " } else { "ASC " })
   }

   pub fn limit(self, limit: Limit) -> Self {
      match limit {
         Limit::Unset => self,
         Limit::Rows(rows) => self.append(format!("LIMIT {rows} ")),
         Limit::Unbounded => self.append("LIMIT -1 "),
      }
   }

   pub fn offset(self, offset: Option<i64>) -> Self {
      match offset {
         Some(offset) if offset != -1 => self.append(format!("OFFSET {offset} ")),
         _ => self,
      }
   }

   /// Start a `SELECT COUNT(*)`; follow with [`from`](Self::from).
   pub fn count_all(self) -> Self {
      self.reset().append("SELECT COUNT(*) ")
   }
}
