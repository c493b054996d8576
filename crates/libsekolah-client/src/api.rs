//! Generic data access layer over the relational store boundary.
//!
//! Every operation returns a `Result` the caller must inspect; store
//! failures are logged and surfaced, never panicked on. Mutations
//! publish a success or failure notice for the UI.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, error};

use libsekolah_core::store::{row_id, ChangeEvent, Filter, Query, RelationalStore, Row};
use libsekolah_core::{RecordId, SekolahError, Table};

use crate::notice::NoticeBus;

#[derive(Clone)]
pub struct Api {
    store: Arc<dyn RelationalStore>,
    notices: NoticeBus,
}

impl Api {
    pub fn new(store: Arc<dyn RelationalStore>, notices: NoticeBus) -> Self {
        Self { store, notices }
    }

    pub fn notices(&self) -> &NoticeBus {
        &self.notices
    }

    /// Fetch all rows of a table. Genuine absence is an empty vec, not
    /// an error.
    pub async fn fetch_all(&self, table: Table, query: &Query) -> Result<Vec<Row>, SekolahError> {
        match self.store.select(table, query).await {
            Ok(rows) => {
                debug!(table = %table, rows = rows.len(), "fetched");
                Ok(rows)
            }
            Err(e) => {
                error!(table = %table, error = %e, "fetch failed");
                Err(e)
            }
        }
    }

    /// Fetch a single row by id
    pub async fn fetch_by_id(&self, table: Table, id: RecordId) -> Result<Row, SekolahError> {
        let query = Query::new().filter(Filter::by_id(id));
        let rows = match self.store.select(table, &query).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(table = %table, id = %id, error = %e, "fetch by id failed");
                return Err(e);
            }
        };
        rows.into_iter()
            .next()
            .ok_or_else(|| SekolahError::NotFound(format!("{} row {}", table, id)))
    }

    /// Insert a row, returning it with server-assigned fields
    pub async fn create(&self, table: Table, row: Row) -> Result<Row, SekolahError> {
        match self.store.insert(table, row).await {
            Ok(created) => {
                self.notices.success("record added");
                Ok(created)
            }
            Err(e) => {
                error!(table = %table, error = %e, "create failed");
                self.notices.error(format!("failed to add record: {}", e));
                Err(e)
            }
        }
    }

    /// Patch a row by id, returning the updated row
    pub async fn update(
        &self,
        table: Table,
        id: RecordId,
        patch: Row,
    ) -> Result<Row, SekolahError> {
        match self.store.update(table, id, patch).await {
            Ok(updated) => {
                self.notices.success("record updated");
                Ok(updated)
            }
            Err(e) => {
                error!(table = %table, id = %id, error = %e, "update failed");
                self.notices.error(format!("failed to update record: {}", e));
                Err(e)
            }
        }
    }

    /// Delete a row by id. Deleting an absent row surfaces the store's
    /// not-found error; it is not swallowed.
    pub async fn delete(&self, table: Table, id: RecordId) -> Result<(), SekolahError> {
        match self.store.delete(table, id).await {
            Ok(()) => {
                self.notices.success("record deleted");
                Ok(())
            }
            Err(e) => {
                error!(table = %table, id = %id, error = %e, "delete failed");
                self.notices.error(format!("failed to delete record: {}", e));
                Err(e)
            }
        }
    }

    /// Insert-or-update by primary key. Used by the autosave path, which
    /// publishes its own notices, so this stays quiet on the bus.
    pub async fn upsert(&self, table: Table, row: Row) -> Result<Row, SekolahError> {
        match row_id(&row) {
            Some(id) => match self.store.update(table, id, row.clone()).await {
                Ok(updated) => Ok(updated),
                Err(e) if e.is_not_found() => self.store.insert(table, row).await,
                Err(e) => {
                    error!(table = %table, id = %id, error = %e, "upsert failed");
                    Err(e)
                }
            },
            None => self.store.insert(table, row).await,
        }
    }

    /// Subscribe to row-level change events for one table
    pub fn subscribe(&self, table: Table) -> broadcast::Receiver<ChangeEvent> {
        self.store.subscribe(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::NoticeLevel;
    use libsekolah_core::MemoryBackend;
    use serde_json::{json, Value};

    fn obj(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn api() -> Api {
        Api::new(Arc::new(MemoryBackend::new()), NoticeBus::new())
    }

    #[tokio::test]
    async fn test_create_then_fetch_by_id_preserves_fields() {
        let api = api();
        let created = api
            .create(
                Table::Students,
                obj(json!({"student_number": "2024-001", "name": "Budi", "gender": "male"})),
            )
            .await
            .unwrap();
        let id = row_id(&created).unwrap();

        let fetched = api.fetch_by_id(Table::Students, id).await.unwrap();
        assert_eq!(fetched["student_number"], json!("2024-001"));
        assert_eq!(fetched["name"], json!("Budi"));
        assert_eq!(fetched["gender"], json!("male"));
    }

    #[tokio::test]
    async fn test_double_fetch_returns_same_rows() {
        let api = api();
        api.create(Table::Teachers, obj(json!({"staff_number": "T-01", "name": "Ibu Sari"})))
            .await
            .unwrap();

        let query = Query::new().order_by("name", true);
        let first = api.fetch_all(Table::Teachers, &query).await.unwrap();
        let second = api.fetch_all(Table::Teachers, &query).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_fetch_all_empty_table_is_ok() {
        let api = api();
        let rows = api.fetch_all(Table::Grades, &Query::new()).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_delete_then_fetch_is_not_found() {
        let api = api();
        let created = api
            .create(Table::Announcements, obj(json!({"title": "Exam week"})))
            .await
            .unwrap();
        let id = row_id(&created).unwrap();

        api.delete(Table::Announcements, id).await.unwrap();
        let err = api.fetch_by_id(Table::Announcements, id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_mutations_publish_notices() {
        let api = api();
        let mut rx = api.notices().subscribe();

        api.create(Table::Classes, obj(json!({"name": "7A"})))
            .await
            .unwrap();
        let notice = rx.recv().await.unwrap();
        assert_eq!(notice.level, NoticeLevel::Success);

        let missing = RecordId::generate();
        let _ = api.delete(Table::Classes, missing).await.unwrap_err();
        let notice = rx.recv().await.unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_updates() {
        let api = api();
        let first = api
            .upsert(Table::Grades, obj(json!({"subject": "English", "score": 70})))
            .await
            .unwrap();
        let id = row_id(&first).unwrap();

        let mut patch = first.clone();
        patch.insert("score".to_string(), json!(85));
        let second = api.upsert(Table::Grades, patch).await.unwrap();
        assert_eq!(row_id(&second), Some(id));
        assert_eq!(second["score"], json!(85));

        let rows = api.fetch_all(Table::Grades, &Query::new()).await.unwrap();
        assert_eq!(rows.len(), 1);
    }
}
