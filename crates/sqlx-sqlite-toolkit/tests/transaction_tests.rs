//! Transaction and savepoint behavior against real database files.

use serde_json::json;
use sqlx_sqlite_toolkit::{
   CommandBuilder, Database, Error, IsolationLevel, Row, Transaction, TransactionOptions,
   TransactionState, TransactionType, WorkerPool,
};
use tempfile::TempDir;

async fn create_test_db(name: &str) -> (Database, WorkerPool, TempDir) {
   let temp_dir = TempDir::new().expect("Failed to create temp directory");
   let pool = WorkerPool::new(Default::default());
   let db = Database::connect(&pool, temp_dir.path().join(name))
      .await
      .expect("Failed to connect to test database");

   db.command()
      .create_table("items", [("id", Some("INTEGER PRIMARY KEY")), ("label", Some("TEXT"))])
      .execute()
      .await
      .unwrap();

   (db, pool, temp_dir)
}

fn item(label: &str) -> Row {
   [("label".to_string(), json!(label))].into_iter().collect()
}

async fn labels(db: &Database) -> Vec<String> {
   db.command()
      .select(None, false)
      .from("items")
      .order_by(Some("id"), false)
      .fetch()
      .await
      .unwrap()
      .into_iter()
      .filter_map(|row| row["label"].as_str().map(String::from))
      .collect()
}

async fn insert(db: &Database, label: &str) -> sqlx_sqlite_toolkit::Result<()> {
   db.command().insert_row("items", &[item(label)]).execute().await?;
   Ok(())
}

// ============================================================================
// Root transactions
// ============================================================================

#[tokio::test]
async fn test_failed_body_leaves_no_rows() {
   let (db, _pool, _temp) = create_test_db("rollback.db").await;

   let result: sqlx_sqlite_toolkit::Result<()> = db
      .run_in_transaction(TransactionOptions::default(), |tx| async move {
         insert(tx.database(), "a").await?;
         insert(tx.database(), "b").await?;
         Err(Error::Other("boom".into()))
      })
      .await;

   assert_eq!(result.unwrap_err().to_string(), "boom");
   assert!(labels(&db).await.is_empty());
}

#[tokio::test]
async fn test_backend_failure_in_body_rolls_back() {
   let (db, _pool, _temp) = create_test_db("backend.db").await;

   let result = db
      .run_in_transaction(TransactionOptions::default(), |tx| async move {
         insert(tx.database(), "a").await?;
         tx.database().command().append("INSERT INTO nowhere VALUES (1)").execute().await
      })
      .await;

   let err = result.unwrap_err();
   assert_eq!(err.error_code(), "BACKEND_ERROR");
   assert!(labels(&db).await.is_empty());
}

#[tokio::test]
async fn test_successful_body_commits() {
   let (db, _pool, _temp) = create_test_db("commit.db").await;

   let options = TransactionOptions {
      transaction_type: TransactionType::Immediate,
      isolation_level: Some(IsolationLevel::ReadUncommitted),
   };
   let count = db
      .run_in_transaction(options, |tx| async move {
         insert(tx.database(), "a").await?;
         insert(tx.database(), "b").await?;
         Ok::<_, Error>(2)
      })
      .await
      .unwrap();

   assert_eq!(count, 2);
   assert_eq!(labels(&db).await, vec!["a", "b"]);
}

async fn create_deferred_fk_tables(db: &Database) {
   db.command()
      .append(
         "PRAGMA foreign_keys = ON; \
          CREATE TABLE parent (id INTEGER PRIMARY KEY); \
          CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER \
             REFERENCES parent(id) DEFERRABLE INITIALLY DEFERRED)",
      )
      .execute()
      .await
      .unwrap();
}

async fn insert_orphan(db: &Database) -> sqlx_sqlite_toolkit::Result<()> {
   db.command()
      .append("INSERT INTO child (parent_id) VALUES (42)")
      .execute()
      .await?;
   Ok(())
}

#[tokio::test]
async fn test_refused_commit_rolls_back() {
   let (db, _pool, _temp) = create_test_db("refused_commit.db").await;
   create_deferred_fk_tables(&db).await;

   let tx = db.transaction(TransactionOptions::default()).await.unwrap();
   insert(&db, "lost").await.unwrap();
   insert_orphan(&db).await.unwrap();

   let err = tx.commit().await.unwrap_err();
   assert_eq!(err.error_code(), "BACKEND_ERROR");
   assert!(err.to_string().contains("COMMIT TRANSACTION;"));
   assert_eq!(tx.state(), TransactionState::RolledBack);
   assert!(labels(&db).await.is_empty());

   // The connection is no longer inside the failed transaction
   let next = db.transaction(TransactionOptions::default()).await.unwrap();
   insert(&db, "kept").await.unwrap();
   next.commit().await.unwrap();
   assert_eq!(labels(&db).await, vec!["kept"]);
}

#[tokio::test]
async fn test_run_in_transaction_recovers_from_refused_commit() {
   let (db, _pool, _temp) = create_test_db("refused_run.db").await;
   create_deferred_fk_tables(&db).await;

   let result = db
      .run_in_transaction(TransactionOptions::default(), |tx| async move {
         insert(tx.database(), "lost").await?;
         insert_orphan(tx.database()).await
      })
      .await;
   let err = result.unwrap_err();
   assert!(err.to_string().contains("FOREIGN KEY constraint failed"));

   db.run_in_transaction(TransactionOptions::default(), |tx| async move {
      insert(tx.database(), "after").await
   })
   .await
   .unwrap();

   assert_eq!(labels(&db).await, vec!["after"]);
   let children = db
      .command()
      .append("SELECT COUNT(*) AS n FROM child")
      .fetch()
      .await
      .unwrap();
   assert_eq!(children[0]["n"], json!(0));
}

#[tokio::test]
async fn test_double_commit_fails() {
   let (db, _pool, _temp) = create_test_db("double.db").await;

   let tx = db.transaction(TransactionOptions::default()).await.unwrap();
   assert_eq!(tx.state(), TransactionState::Active);
   tx.commit().await.unwrap();
   assert_eq!(tx.state(), TransactionState::Committed);

   let err = tx.commit().await.unwrap_err();
   assert_eq!(err.error_code(), "TRANSACTION_STATE_ERROR");
   assert!(err.to_string().contains("finished with state: commit"));

   let err = tx.rollback().await.unwrap_err();
   assert!(matches!(err, Error::TransactionState(_)));
}

#[tokio::test]
async fn test_double_rollback_fails() {
   let (db, _pool, _temp) = create_test_db("double_rb.db").await;

   let tx = db.transaction(TransactionOptions::default()).await.unwrap();
   insert(&db, "gone").await.unwrap();
   tx.rollback().await.unwrap();

   let err = tx.rollback().await.unwrap_err();
   assert!(err.to_string().contains("finished with state: rollback"));
   assert!(labels(&db).await.is_empty());
}

#[tokio::test]
async fn test_nested_begin_fails_without_touching_outer() {
   let (db, _pool, _temp) = create_test_db("nested_begin.db").await;

   let outer = db.transaction(TransactionOptions::default()).await.unwrap();
   insert(&db, "kept").await.unwrap();

   // A second root on the same connection cannot BEGIN
   let err = db.transaction(TransactionOptions::default()).await.unwrap_err();
   assert!(matches!(err, Error::Backend { .. }));

   outer.commit().await.unwrap();
   assert_eq!(labels(&db).await, vec!["kept"]);
}

// ============================================================================
// Savepoints
// ============================================================================

#[tokio::test]
async fn test_savepoint_rollback_keeps_earlier_rows() {
   let (db, _pool, _temp) = create_test_db("savepoint.db").await;

   let root = db.transaction(TransactionOptions::default()).await.unwrap();
   insert(&db, "before").await.unwrap();

   let savepoint = db.savepoint(&root).await.unwrap();
   insert(&db, "after").await.unwrap();
   savepoint.rollback().await.unwrap();

   root.commit().await.unwrap();
   assert_eq!(labels(&db).await, vec!["before"]);
}

#[tokio::test]
async fn test_savepoint_commit_is_noop_but_finishes() {
   let (db, _pool, _temp) = create_test_db("sp_commit.db").await;

   let root = db.transaction(TransactionOptions::default()).await.unwrap();
   let savepoint = root.savepoint().await.unwrap();
   insert(&db, "inside").await.unwrap();

   savepoint.commit().await.unwrap();
   assert!(savepoint.is_finished());
   assert!(matches!(savepoint.commit().await, Err(Error::TransactionState(_))));

   // The root is still open and owns the row
   root.rollback().await.unwrap();
   assert!(labels(&db).await.is_empty());
}

#[tokio::test]
async fn test_savepoint_rollback_leaves_sibling_intact() {
   let (db, _pool, _temp) = create_test_db("siblings.db").await;

   let root = db.transaction(TransactionOptions::default()).await.unwrap();
   let first = root.savepoint().await.unwrap();
   insert(&db, "first").await.unwrap();
   first.commit().await.unwrap();

   let second = root.savepoint().await.unwrap();
   insert(&db, "second").await.unwrap();
   second.rollback().await.unwrap();

   root.commit().await.unwrap();
   assert_eq!(labels(&db).await, vec!["first"]);
}

#[tokio::test]
async fn test_savepoint_naming_and_family() {
   let (db, _pool, _temp) = create_test_db("names.db").await;

   let root = db.transaction(TransactionOptions::default()).await.unwrap();
   let child = root.savepoint().await.unwrap();
   let grandchild = child.savepoint().await.unwrap();
   let second_child = root.savepoint().await.unwrap();

   assert!(root.is_root());
   assert_eq!(root.name(), root.id());
   assert_eq!(child.id(), root.id());
   assert_eq!(grandchild.id(), root.id());
   assert_eq!(child.name(), format!("{}-savepoint-1", root.id()));
   assert_eq!(grandchild.name(), format!("{}-savepoint-2", root.id()));
   assert_eq!(second_child.name(), format!("{}-savepoint-3", root.id()));

   let children: Vec<String> = root.savepoints().iter().map(|t| t.name().to_string()).collect();
   assert_eq!(children, vec![child.name().to_string(), second_child.name().to_string()]);
   assert_eq!(grandchild.parent().map(|p| p.name()), Some(child.name()));

   root.rollback().await.unwrap();
}

// ============================================================================
// Rendered transaction control
// ============================================================================

#[tokio::test]
async fn test_transaction_control_sql() {
   let (db, _pool, _temp) = create_test_db("render.db").await;

   let root = Transaction::new(
      db.clone(),
      TransactionOptions {
         transaction_type: TransactionType::Immediate,
         isolation_level: None,
      },
   );
   let child = Transaction::new_savepoint(&root);

   let render = |builder: CommandBuilder| builder.sql().unwrap();

   assert_eq!(render(db.command().start_transaction(&root)), "BEGIN IMMEDIATE TRANSACTION;");
   assert_eq!(render(db.command().rollback_transaction(&root)), "ROLLBACK TRANSACTION;");
   assert_eq!(render(db.command().commit_transaction(&root)), "COMMIT TRANSACTION;");
   assert_eq!(
      render(db.command().set_isolation_level(&root, Some(IsolationLevel::ReadUncommitted))),
      "PRAGMA read_uncommitted = ON;"
   );
   assert_eq!(
      render(db.command().set_isolation_level(&root, Some(IsolationLevel::ReadCommitted))),
      "PRAGMA read_uncommitted = OFF;"
   );
   assert_eq!(render(db.command().set_isolation_level(&root, None)), "--;");

   assert_eq!(
      render(db.command().start_transaction(&child)),
      format!("SAVEPOINT `{}`;", child.name())
   );
   assert_eq!(
      render(db.command().rollback_transaction(&child)),
      format!("ROLLBACK TO `{}`;", child.name())
   );
   assert_eq!(render(db.command().commit_transaction(&child)), "--;");
   assert_eq!(
      render(db.command().set_isolation_level(&child, Some(IsolationLevel::ReadCommitted))),
      "--;"
   );
}

#[tokio::test]
async fn test_transaction_from_other_database_is_rejected() {
   let (db, pool, temp) = create_test_db("one.db").await;
   let other = Database::connect(&pool, temp.path().join("two.db")).await.unwrap();

   let foreign = Transaction::new(other.clone(), TransactionOptions::default());
   let result = db.command().start_transaction(&foreign).sql();
   assert!(matches!(result, Err(Error::InvalidArgument(_))));

   let result = db.savepoint(&foreign).await;
   assert!(matches!(result, Err(Error::TransactionState(_))));
}
