use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use sqlx_sqlite_worker_pool::Recordset;

/// One row, column name to value, in select order.
pub type Row = IndexMap<String, JsonValue>;

/// Split a flattened recordset back into rows.
pub fn parse_recordset(recordset: &Recordset) -> Vec<Row> {
   recordset
      .rows()
      .map(|cells| {
         recordset
            .field_names
            .iter()
            .cloned()
            .zip(cells.iter().cloned())
            .collect()
      })
      .collect()
}
