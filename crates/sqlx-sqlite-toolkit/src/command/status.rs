use sqlx_sqlite_worker_pool::Method;

use super::{CommandBuilder, check};
use crate::Result;

impl CommandBuilder {
   /// Row id of the most recent successful insert on this database.
   pub async fn last_insert_row_id(&self) -> Result<i64> {
      let response = self
         .bound_database()?
         .exec_command(Method::LastInsertRowId)
         .await?;
      Ok(check(response)?.data()?)
   }
}
