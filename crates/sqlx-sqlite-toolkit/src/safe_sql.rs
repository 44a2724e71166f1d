//! Identifier and literal sanitizing for generated SQL.

use serde_json::Value as JsonValue;

/// Strip backticks and single quotes from an identifier.
///
/// Identifiers are not escaped; the quote characters are removed outright so
/// a name can never break out of the backtick quoting around it.
///
/// # Examples
///
/// ```
/// use sqlx_sqlite_toolkit::safe_sql::safe_meta_string;
///
/// assert_eq!(safe_meta_string("us`er's"), "users");
/// ```
pub fn safe_meta_string(identifier: &str) -> String {
   identifier.chars().filter(|c| *c != '`' && *c != '\'').collect()
}

/// Double every single quote so the text can sit inside a `'...'` literal.
pub fn encode(text: &str) -> String {
   text.replace('\'', "''")
}

/// Text form of a value before quoting.
///
/// Booleans become `1`/`0`; arrays and objects become their JSON text.
pub fn value_text(value: &JsonValue) -> String {
   match value {
      JsonValue::Null => "NULL".to_string(),
      JsonValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
      JsonValue::Number(n) => n.to_string(),
      JsonValue::String(s) => s.clone(),
      JsonValue::Array(_) | JsonValue::Object(_) => value.to_string(),
   }
}

/// Render a row value as a SQL literal: `NULL` bare, everything else quoted.
pub fn literal(value: &JsonValue) -> String {
   match value {
      JsonValue::Null => "NULL".to_string(),
      other => format!("'{}'", encode(&value_text(other))),
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use serde_json::json;

   #[test]
   fn test_safe_meta_string_strips_quotes() {
      assert_eq!(safe_meta_string("`foo`"), "foo");
      assert_eq!(safe_meta_string("a'b`c"), "abc");
      assert_eq!(safe_meta_string("plain_name"), "plain_name");
   }

   #[test]
   fn test_encode_doubles_single_quotes() {
      assert_eq!(encode("it's"), "it''s");
      assert_eq!(encode("''"), "''''");
      assert_eq!(encode("none"), "none");
   }

   #[test]
   fn test_literal() {
      assert_eq!(literal(&json!(null)), "NULL");
      assert_eq!(literal(&json!(1)), "'1'");
      assert_eq!(literal(&json!("O'Brien")), "'O''Brien'");
      assert_eq!(literal(&json!(true)), "'1'");
      assert_eq!(literal(&json!({"a": 1})), r#"'{"a":1}'"#);
   }
}
