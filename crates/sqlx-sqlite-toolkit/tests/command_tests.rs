//! Command builder and criteria executed against real database files.

use serde_json::{Value as JsonValue, json};
use sqlx_sqlite_toolkit::{
   Criteria, Database, Error, ErrorCode, IndexSpec, Params, Row, WorkerPool,
};
use tempfile::TempDir;

async fn create_test_db() -> (Database, WorkerPool, TempDir) {
   let temp_dir = TempDir::new().expect("Failed to create temp directory");
   let pool = WorkerPool::new(Default::default());
   let db = Database::connect(&pool, temp_dir.path().join("commands.db"))
      .await
      .expect("Failed to connect to test database");

   db.command()
      .create_table(
         "users",
         [
            ("id", Some("INTEGER PRIMARY KEY")),
            ("name", Some("TEXT NOT NULL")),
            ("age", Some("INTEGER")),
            ("city", Some("TEXT")),
         ],
      )
      .execute()
      .await
      .unwrap();

   (db, pool, temp_dir)
}

fn row(pairs: &[(&str, JsonValue)]) -> Row {
   pairs
      .iter()
      .map(|(k, v)| (k.to_string(), v.clone()))
      .collect()
}

async fn seed(db: &Database) {
   let rows = vec![
      row(&[("name", json!("Alice")), ("age", json!(30)), ("city", json!("Oslo"))]),
      row(&[("name", json!("Bob")), ("age", json!(25)), ("city", json!("Rome"))]),
      row(&[("name", json!("Carol")), ("age", json!(41)), ("city", json!(null))]),
   ];
   db.command().insert_row("users", &rows).execute().await.unwrap();
}

// ============================================================================
// Writes
// ============================================================================

#[tokio::test]
async fn test_insert_and_fetch() {
   let (db, _pool, _temp) = create_test_db().await;
   seed(&db).await;

   let rows = db
      .command()
      .select(None, false)
      .from("users")
      .order_by(Some("id"), false)
      .fetch()
      .await
      .unwrap();

   assert_eq!(rows.len(), 3);
   assert_eq!(rows[0]["name"], json!("Alice"));
   assert_eq!(rows[0]["age"], json!(30));
   assert_eq!(rows[2]["city"], JsonValue::Null);
   assert_eq!(
      rows[0].keys().collect::<Vec<_>>(),
      vec!["id", "name", "age", "city"]
   );
}

#[tokio::test]
async fn test_last_insert_row_id() {
   let (db, _pool, _temp) = create_test_db().await;
   seed(&db).await;

   let id = db.command().last_insert_row_id().await.unwrap();
   assert_eq!(id, 3);

   let result = db
      .command()
      .insert_row("users", &[row(&[("name", json!("Dan"))])])
      .execute()
      .await
      .unwrap();
   assert_eq!(result.rows_affected, 1);
   assert_eq!(result.last_insert_id, 4);
}

#[tokio::test]
async fn test_update_with_named_params() {
   let (db, _pool, _temp) = create_test_db().await;
   seed(&db).await;

   let mut params = Params::new();
   params.insert("name".into(), json!("Bob"));

   let result = db
      .command()
      .update_row(
         "users",
         &row(&[("age", json!(26)), ("city", json!(null))]),
         Some("name = :name"),
         Some(&params),
      )
      .execute()
      .await
      .unwrap();
   assert_eq!(result.rows_affected, 1);

   let mut criteria = Criteria::new();
   criteria
      .set_where_condition("name = :name")
      .set_where_condition_params(params);
   let rows = criteria
      .apply_to_select_command(db.command(), "users")
      .fetch()
      .await
      .unwrap();

   assert_eq!(rows.len(), 1);
   assert_eq!(rows[0]["age"], json!(26));
   assert_eq!(rows[0]["city"], JsonValue::Null);
}

#[tokio::test]
async fn test_upsert_keeps_omitted_columns() {
   let (db, _pool, _temp) = create_test_db().await;
   seed(&db).await;

   let columns = ["id", "name", "age", "city"];

   // Existing row: only age changes
   db.command()
      .upsert_row("users", &row(&[("id", json!(1)), ("age", json!(31))]), &columns, Some("id"))
      .execute()
      .await
      .unwrap();

   // Missing row: inserted with what was given
   db.command()
      .upsert_row(
         "users",
         &row(&[("id", json!(9)), ("name", json!("Zed"))]),
         &columns,
         Some("id"),
      )
      .execute()
      .await
      .unwrap();

   let rows = db
      .command()
      .select(None, false)
      .from("users")
      .order_by(Some("id"), false)
      .fetch()
      .await
      .unwrap();

   assert_eq!(rows.len(), 4);
   assert_eq!(rows[0]["name"], json!("Alice"));
   assert_eq!(rows[0]["age"], json!(31));
   assert_eq!(rows[0]["city"], json!("Oslo"));
   assert_eq!(rows[3]["id"], json!(9));
   assert_eq!(rows[3]["name"], json!("Zed"));
   assert_eq!(rows[3]["age"], JsonValue::Null);
}

#[tokio::test]
async fn test_delete_with_list_param() {
   let (db, _pool, _temp) = create_test_db().await;
   seed(&db).await;

   let mut params = Params::new();
   params.insert("names".into(), json!(["Alice", "Carol"]));

   let mut criteria = Criteria::new();
   criteria
      .set_where_condition("name IN (:names)")
      .set_where_condition_params(params);

   let result = criteria
      .apply_to_delete_command(db.command(), "users")
      .execute()
      .await
      .unwrap();
   assert_eq!(result.rows_affected, 2);

   let rows = db.command().select(None, false).from("users").fetch().await.unwrap();
   assert_eq!(rows.len(), 1);
   assert_eq!(rows[0]["name"], json!("Bob"));
}

#[tokio::test]
async fn test_builder_awaits_directly() {
   let (db, _pool, _temp) = create_test_db().await;

   let result = db
      .command()
      .insert_row("users", &[row(&[("name", json!("Eve"))])])
      .await
      .unwrap();
   assert_eq!(result.rows_affected, 1);
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn test_criteria_limit_and_order() {
   let (db, _pool, _temp) = create_test_db().await;
   seed(&db).await;

   let mut criteria = Criteria::new();
   criteria.set_select("").set_order_by("age").set_limit(2);

   // Descending by default: 41, 30, 25
   let rows = criteria
      .apply_to_select_command(db.command(), "users")
      .fetch()
      .await
      .unwrap();
   let names: Vec<_> = rows.iter().map(|r| r["name"].clone()).collect();
   assert_eq!(names, vec![json!("Carol"), json!("Alice")]);

   criteria.set_desc(false).set_limit_str("all");
   let rows = criteria
      .apply_to_select_command(db.command(), "users")
      .fetch()
      .await
      .unwrap();
   let names: Vec<_> = rows.iter().map(|r| r["name"].clone()).collect();
   assert_eq!(names, vec![json!("Bob"), json!("Alice"), json!("Carol")]);
}

#[tokio::test]
async fn test_criteria_offset_renders_before_limit() {
   let (db, _pool, _temp) = create_test_db().await;

   let mut criteria = Criteria::new();
   criteria.set_limit(2).set_offset(1);

   let sql = criteria.apply_to_select_command(db.command(), "users").sql().unwrap();
   assert_eq!(sql, "SELECT * FROM 'users' OFFSET 1 LIMIT 2 ;");

   // SQLite only accepts OFFSET after LIMIT
   let err = criteria
      .apply_to_select_command(db.command(), "users")
      .fetch()
      .await
      .unwrap_err();
   assert_eq!(err.backend_code(), Some(ErrorCode::SqliteError));
}

#[tokio::test]
async fn test_count_all() {
   let (db, _pool, _temp) = create_test_db().await;
   seed(&db).await;

   let rows = db
      .command()
      .count_all()
      .from("users")
      .where_condition(Some("age > 26"), None)
      .fetch()
      .await
      .unwrap();
   assert_eq!(rows[0]["COUNT(*)"], json!(2));
}

#[tokio::test]
async fn test_empty_result_has_no_rows() {
   let (db, _pool, _temp) = create_test_db().await;

   let rows = db.command().select(None, false).from("users").fetch().await.unwrap();
   assert!(rows.is_empty());
}

// ============================================================================
// Schema
// ============================================================================

#[tokio::test]
async fn test_add_column_and_index() {
   let (db, _pool, _temp) = create_test_db().await;
   seed(&db).await;

   db.command()
      .add_column("users", "active", "BOOLEAN NOT NULL DEFAULT 1")
      .execute()
      .await
      .unwrap();

   db.command()
      .create_index(&IndexSpec {
         index_name: "users_name".into(),
         table_name: "users".into(),
         columns: vec!["name".into()],
         unique: true,
         ..Default::default()
      })
      .execute()
      .await
      .unwrap();

   let rows = db.command().select(None, false).from("users").fetch().await.unwrap();
   assert!(rows.iter().all(|r| r["active"] == json!(1)));

   // The unique index rejects a duplicate name
   let err = db
      .command()
      .insert_row("users", &[row(&[("name", json!("Alice"))])])
      .execute()
      .await
      .unwrap_err();
   assert_eq!(err.backend_code(), Some(ErrorCode::SqliteError));

   db.command().drop_index("users_name").execute().await.unwrap();
   db.command()
      .insert_row("users", &[row(&[("name", json!("Alice"))])])
      .execute()
      .await
      .unwrap();
}

#[tokio::test]
async fn test_drop_table() {
   let (db, _pool, _temp) = create_test_db().await;

   db.command().drop_table("users").execute().await.unwrap();
   // IF EXISTS makes a second drop harmless
   db.command().drop_table("users").execute().await.unwrap();

   let err = db.command().select(None, false).from("users").fetch().await.unwrap_err();
   assert!(matches!(err, Error::Backend { .. }));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_invalid_sql_is_backend_error() {
   let (db, _pool, _temp) = create_test_db().await;

   let err = db.command().append("SELEC nonsense").execute().await.unwrap_err();
   assert_eq!(err.backend_code(), Some(ErrorCode::SqliteError));
   assert!(err.to_string().contains("SELEC nonsense"));
}

#[tokio::test]
async fn test_invalid_input_never_reaches_database() {
   let (db, _pool, _temp) = create_test_db().await;

   let err = db.command().drop_table("").execute().await.unwrap_err();
   assert!(matches!(err, Error::InvalidArgument(_)));
}

#[tokio::test]
async fn test_closed_database_refuses_commands() {
   let (db, _pool, _temp) = create_test_db().await;
   let clone = db.clone();

   db.close().await.unwrap();
   // A second close is harmless
   db.close().await.unwrap();

   let err = clone.command().select(None, false).from("users").fetch().await.unwrap_err();
   assert!(matches!(err, Error::NotFound(_)));
   assert!(err.to_string().contains("had closed"));
}

#[tokio::test]
async fn test_reconnect_after_close_sees_data() {
   let (db, pool, temp) = create_test_db().await;
   seed(&db).await;
   db.close().await.unwrap();

   let db = Database::connect(&pool, temp.path().join("commands.db")).await.unwrap();
   let rows = db.command().select(None, false).from("users").fetch().await.unwrap();
   assert_eq!(rows.len(), 3);
}
