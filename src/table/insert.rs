use serde_json::Value as JsonValue;
use sqlx_sqlite_toolkit::{TransactionOptions, WriteQueryResult};
use tracing::{debug, warn};

use super::Table;
use crate::Result;
use crate::record::Record;

impl Table {
   /// Insert one record.
   ///
   /// When the record has no primary key value yet, it receives the new
   /// row id.
   pub async fn insert_record(&self, record: &mut Record) -> Result<WriteQueryResult> {
      let values = record.export_for_table(self.schema())?;
      let result = self
         .database()
         .command()
         .insert_row(self.name(), &[values])
         .execute()
         .await?;

      if result.rows_affected > 0 {
         self.assign_primary_key(record, result.last_insert_id);
      }
      Ok(result)
   }

   /// Insert every record in one statement inside a transaction.
   ///
   /// When no record carries a primary key value, the records are given
   /// sequential ids ending at the last inserted row id. If any record
   /// brings its own key the generated ids cannot be told apart, so none
   /// are assigned. Nothing is inserted if any row fails.
   pub async fn insert_records(&self, records: &mut [Record]) -> Result<()> {
      if records.is_empty() {
         return Ok(());
      }

      let keyless = records.iter().all(|record| !self.has_primary_key_value(record));
      let rows = records
         .iter()
         .map(|record| record.export_for_table(self.schema()))
         .collect::<Result<Vec<_>>>()?;

      let (rows, table) = (&rows, self.name());
      let result = self
         .database()
         .run_in_transaction(TransactionOptions::default(), |tx| async move {
            tx.database().command().insert_row(table, rows).execute().await
         })
         .await
         .inspect_err(|err| warn!("insert of {} records into {} failed: {}", rows.len(), table, err))?;

      if !keyless {
         debug!("{}: some records carry their own keys, leaving generated ids unassigned", table);
         return Ok(());
      }

      let count = records.len() as i64;
      for (i, record) in records.iter_mut().enumerate() {
         self.assign_primary_key(record, result.last_insert_id - count + i as i64 + 1);
      }
      Ok(())
   }

   /// Insert or replace one record, keeping stored values for the columns
   /// the record leaves unset.
   pub async fn upsert_record(&self, record: &mut Record) -> Result<WriteQueryResult> {
      let values = record.export_for_table(self.schema())?;
      let columns: Vec<&str> = self.schema().column_names().collect();

      let result = self
         .database()
         .command()
         .upsert_row(self.name(), &values, &columns, self.schema().primary_key())
         .execute()
         .await?;

      if result.rows_affected > 0 {
         self.assign_primary_key(record, result.last_insert_id);
      }
      Ok(result)
   }

   /// Upsert every record inside one transaction.
   ///
   /// Primary keys are assigned only after the transaction commits.
   pub async fn upsert_records(&self, records: &mut [Record]) -> Result<()> {
      if records.is_empty() {
         return Ok(());
      }

      let primary_key = self.schema().primary_key();
      let prepared = records
         .iter()
         .map(|record| {
            let existing = primary_key
               .and_then(|key| record.value(key))
               .filter(|value| !value.is_null())
               .cloned();
            Ok((record.export_for_table(self.schema())?, existing))
         })
         .collect::<Result<Vec<_>>>()?;
      let columns: Vec<&str> = self.schema().column_names().collect();

      let (prepared, columns, table) = (&prepared, &columns, self.name());
      let keys = self
         .database()
         .run_in_transaction(TransactionOptions::default(), |tx| async move {
            let mut keys = Vec::with_capacity(prepared.len());
            for (values, existing) in prepared {
               let result = tx
                  .database()
                  .command()
                  .upsert_row(table, values, columns, primary_key)
                  .execute()
                  .await?;
               keys.push(
                  existing
                     .clone()
                     .unwrap_or_else(|| JsonValue::from(result.last_insert_id)),
               );
            }
            Ok::<_, sqlx_sqlite_toolkit::Error>(keys)
         })
         .await
         .inspect_err(|err| warn!("upsert of {} records into {} failed: {}", prepared.len(), table, err))?;

      if let Some(key) = primary_key {
         for (record, value) in records.iter_mut().zip(keys) {
            record.set_value(key, value);
         }
      }
      Ok(())
   }

   fn has_primary_key_value(&self, record: &Record) -> bool {
      self
         .schema()
         .primary_key()
         .and_then(|key| record.value(key))
         .is_some_and(|value| !value.is_null())
   }

   fn assign_primary_key(&self, record: &mut Record, row_id: i64) {
      let Some(key) = self.schema().primary_key() else {
         return;
      };
      if self.has_primary_key_value(record) {
         return;
      }
      record.set_value(key, JsonValue::from(row_id));
   }
}
