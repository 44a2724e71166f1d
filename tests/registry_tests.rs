//! Database registry behavior.

use sqlx_sqlite_dal::{DalConfig, Databases, WorkerPoolConfig};
use tempfile::TempDir;

fn registry(temp: &TempDir, databases_per_worker: usize) -> Databases {
   Databases::new(DalConfig {
      base_dir: temp.path().join("data"),
      pool: WorkerPoolConfig {
         databases_per_worker,
         ..Default::default()
      },
   })
}

#[tokio::test]
async fn test_same_name_returns_same_instance() {
   let temp = TempDir::new().unwrap();
   let databases = registry(&temp, 5);

   let first = databases.get_database("a.db").await.unwrap();
   let second = databases.get_database("a.db").await.unwrap();

   assert_eq!(first.name(), second.name());
   assert_eq!(databases.pool().worker_count(), 1);
   assert!(temp.path().join("data/a.db").exists());
}

#[tokio::test]
async fn test_nested_name_creates_directories() {
   let temp = TempDir::new().unwrap();
   let databases = registry(&temp, 5);

   let db = databases.get_database("accounts/42/main.db").await.unwrap();
   db.command().append("CREATE TABLE t (x)").execute().await.unwrap();

   assert!(temp.path().join("data/accounts/42/main.db").is_file());
}

#[tokio::test]
async fn test_closed_instance_is_reconnected() {
   let temp = TempDir::new().unwrap();
   let databases = registry(&temp, 5);

   let db = databases.get_database("a.db").await.unwrap();
   db.command().append("CREATE TABLE t (x)").execute().await.unwrap();
   db.close().await.unwrap();
   assert!(db.is_closed());

   let reopened = databases.get_database("a.db").await.unwrap();
   assert!(!reopened.is_closed());
   reopened
      .command()
      .append("INSERT INTO t VALUES (1)")
      .execute()
      .await
      .unwrap();
}

#[tokio::test]
async fn test_databases_are_packed_onto_workers() {
   let temp = TempDir::new().unwrap();
   let databases = registry(&temp, 2);

   for name in ["a.db", "b.db", "c.db"] {
      databases.get_database(name).await.unwrap();
   }
   assert_eq!(databases.pool().worker_count(), 2);

   let state = databases.pool().space_state();
   assert_eq!(state.full.len(), 1);
   assert_eq!(state.unfilled.len(), 1);
}

#[tokio::test]
async fn test_close_by_name() {
   let temp = TempDir::new().unwrap();
   let databases = registry(&temp, 5);

   let db = databases.get_database("a.db").await.unwrap();
   assert!(databases.close("a.db").await.unwrap());
   assert!(db.is_closed());
   assert!(!databases.close("a.db").await.unwrap());
}

#[tokio::test]
async fn test_close_all_closes_everything() {
   let temp = TempDir::new().unwrap();
   let databases = registry(&temp, 5);

   let a = databases.get_database("a.db").await.unwrap();
   let b = databases.get_database("b.db").await.unwrap();

   databases.close_all().await.unwrap();

   assert!(a.is_closed());
   assert!(b.is_closed());
   assert_eq!(databases.pool().worker_count(), 0);
}

#[tokio::test]
async fn test_empty_name_is_invalid() {
   let temp = TempDir::new().unwrap();
   let databases = registry(&temp, 5);

   let err = databases.get_database("").await.unwrap_err();
   assert_eq!(err.error_code(), "INVALID_PATH");
}
