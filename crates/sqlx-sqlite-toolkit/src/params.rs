//! `:name` placeholder substitution.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::{Captures, Regex};
use serde_json::Value as JsonValue;

use crate::safe_sql::{encode, value_text};

/// Values bound to `:name` placeholders, keyed by name.
pub type Params = IndexMap<String, JsonValue>;

static PLACEHOLDER: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r":(\w+)").ok());

/// Replace every `:name` in `condition` with its value from `params`.
///
/// Numbers and booleans are inlined bare, `null` becomes `NULL` and
/// everything else is single-quoted with embedded quotes doubled. An array
/// expands to its elements joined by `,`, which makes `IN (:ids)` work.
/// Placeholders with no matching key are left untouched.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use sqlx_sqlite_toolkit::{Params, substitute_named_params};
///
/// let mut params = Params::new();
/// params.insert("ids".into(), json!([1, 2, 3]));
/// assert_eq!(
///    substitute_named_params("id IN (:ids)", Some(&params)),
///    "id IN (1,2,3)"
/// );
/// ```
pub fn substitute_named_params(condition: &str, params: Option<&Params>) -> String {
   let (Some(params), Some(placeholder)) = (params, PLACEHOLDER.as_ref()) else {
      return condition.to_string();
   };

   placeholder
      .replace_all(condition, |caps: &Captures| match params.get(&caps[1]) {
         Some(JsonValue::Array(items)) => items.iter().map(scalar).collect::<Vec<_>>().join(","),
         Some(value) => scalar(value),
         None => caps[0].to_string(),
      })
      .into_owned()
}

fn scalar(value: &JsonValue) -> String {
   match value {
      JsonValue::Null | JsonValue::Bool(_) | JsonValue::Number(_) => value_text(value),
      other => format!("'{}'", encode(&value_text(other))),
   }
}
