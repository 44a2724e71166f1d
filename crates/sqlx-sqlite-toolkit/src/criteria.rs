//! Reusable query shape for selects and deletes.

use crate::command::{CommandBuilder, Limit};
use crate::params::Params;

/// Projection, filter, ordering and paging for a read or delete.
///
/// Every field has a getter and a `set_*` mutator; mutators return
/// `&mut Self` so calls chain. Nothing is rendered until the criteria are
/// applied to a [`CommandBuilder`].
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use sqlx_sqlite_toolkit::{CommandBuilder, Criteria, Params};
///
/// let mut params = Params::new();
/// params.insert("v".into(), json!("p"));
///
/// let mut criteria = Criteria::new();
/// criteria
///    .set_select("a,b")
///    .set_where_condition("x=:v")
///    .set_where_condition_params(params)
///    .set_order_by("c")
///    .set_desc(true)
///    .set_limit(10)
///    .set_offset(5)
///    .set_distinct(true);
///
/// let sql = criteria
///    .apply_to_select_command(CommandBuilder::detached(), "t")
///    .sql()
///    .unwrap();
/// assert_eq!(sql, "SELECT DISTINCT 'a,b' FROM 't' WHERE x='p' ORDER BY c DESC OFFSET 5 LIMIT 10 ;");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
   select: Option<String>,
   where_condition: Option<String>,
   where_condition_params: Option<Params>,
   order_by: Option<String>,
   desc: Option<bool>,
   limit: Limit,
   offset: Option<i64>,
   distinct: Option<bool>,
}

impl Criteria {
   pub fn new() -> Self {
      Self::default()
   }

   pub fn select(&self) -> Option<&str> {
      self.select.as_deref()
   }

   /// Set the projection. An empty string leaves the current one in place.
   pub fn set_select(&mut self, select: impl Into<String>) -> &mut Self {
      let select = select.into();
      if !select.is_empty() {
         self.select = Some(select);
      }
      self
   }

   pub fn where_condition(&self) -> Option<&str> {
      self.where_condition.as_deref()
   }

   pub fn set_where_condition(&mut self, condition: impl Into<String>) -> &mut Self {
      self.where_condition = Some(condition.into());
      self
   }

   pub fn where_condition_params(&self) -> Option<&Params> {
      self.where_condition_params.as_ref()
   }

   pub fn set_where_condition_params(&mut self, params: Params) -> &mut Self {
      self.where_condition_params = Some(params);
      self
   }

   pub fn order_by(&self) -> Option<&str> {
      self.order_by.as_deref()
   }

   pub fn set_order_by(&mut self, column: impl Into<String>) -> &mut Self {
      self.order_by = Some(column.into());
      self
   }

   /// Sort direction; `None` until set, which orders descending.
   pub fn desc(&self) -> Option<bool> {
      self.desc
   }

   pub fn set_desc(&mut self, desc: bool) -> &mut Self {
      self.desc = Some(desc);
      self
   }

   pub fn limit(&self) -> Limit {
      self.limit
   }

   /// Set the row limit; `-1` clears it.
   pub fn set_limit(&mut self, limit: i64) -> &mut Self {
      self.limit = Limit::from(limit);
      self
   }

   /// Parse a limit from text. Text without a leading integer means
   /// "no limit" and renders `LIMIT -1`.
   pub fn set_limit_str(&mut self, limit: &str) -> &mut Self {
      self.limit = match parse_int_prefix(limit) {
         Some(rows) => Limit::from(rows),
         None => Limit::Unbounded,
      };
      self
   }

   pub fn offset(&self) -> Option<i64> {
      self.offset
   }

   /// Set the offset; `-1` clears it.
   pub fn set_offset(&mut self, offset: i64) -> &mut Self {
      self.offset = (offset != -1).then_some(offset);
      self
   }

   /// Parse an offset from text. Text without a leading integer means 0.
   pub fn set_offset_str(&mut self, offset: &str) -> &mut Self {
      self.set_offset(parse_int_prefix(offset).unwrap_or(0))
   }

   pub fn distinct(&self) -> Option<bool> {
      self.distinct
   }

   pub fn set_distinct(&mut self, distinct: bool) -> &mut Self {
      self.distinct = Some(distinct);
      self
   }

   /// Render `SELECT ... FROM ... WHERE ... ORDER BY ... OFFSET ... LIMIT`
   /// onto `command`.
   pub fn apply_to_select_command(&self, command: CommandBuilder, table: &str) -> CommandBuilder {
      command
         .select(self.select(), self.distinct.unwrap_or(false))
         .from(table)
         .where_condition(self.where_condition(), self.where_condition_params())
         .order_by(self.order_by(), self.desc.unwrap_or(true))
         .offset(self.offset)
         .limit(self.limit)
   }

   /// Render a `DELETE` of the rows matching the condition onto `command`.
   pub fn apply_to_delete_command(&self, command: CommandBuilder, table: &str) -> CommandBuilder {
      command.delete_row(table, self.where_condition(), self.where_condition_params())
   }
}

/// Leading integer of `text`, ignoring leading whitespace and trailing junk.
fn parse_int_prefix(text: &str) -> Option<i64> {
   let text = text.trim_start();
   let (sign, digits) = match text.strip_prefix('-') {
      Some(rest) => (-1, rest),
      None => (1, text.strip_prefix('+').unwrap_or(text)),
   };
   let end = digits
      .find(|c: char| !c.is_ascii_digit())
      .unwrap_or(digits.len());
   digits[..end].parse::<i64>().ok().map(|n| sign * n)
}
