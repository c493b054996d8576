//! Sled-backed backend for single-host deployments: one tree per table,
//! rows keyed by id, values JSON. Same contract as the memory backend
//! but persistent across restarts.

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::SekolahError;
use crate::types::{RecordId, Table};

use super::{
    apply_query, compare_values, now_timestamp, row_id, ChangeEvent, ChangeKind, Query,
    RelationalStore, Row, CHANGE_CHANNEL_CAPACITY,
};

/// Embedded persistent backend
pub struct SledBackend {
    db: sled::Db,
    trees: [sled::Tree; 8],
    channels: [broadcast::Sender<ChangeEvent>; 8],
}

impl SledBackend {
    /// Open or create a backend at the given path
    pub fn open(path: &Path) -> Result<Self, SekolahError> {
        let db = sled::open(path)?;
        let mut trees = Vec::with_capacity(Table::ALL.len());
        for table in Table::ALL {
            trees.push(db.open_tree(table.as_str())?);
        }
        let trees: [sled::Tree; 8] = trees
            .try_into()
            .map_err(|_| SekolahError::Internal("table tree count mismatch".to_string()))?;
        let channels = std::array::from_fn(|_| broadcast::channel(CHANGE_CHANNEL_CAPACITY).0);
        Ok(Self {
            db,
            trees,
            channels,
        })
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<(), SekolahError> {
        self.db.flush()?;
        Ok(())
    }

    fn tree(&self, table: Table) -> &sled::Tree {
        &self.trees[table.index()]
    }

    fn emit(&self, kind: ChangeKind, table: Table, row: Row) {
        let _ = self.channels[table.index()].send(ChangeEvent { kind, table, row });
    }

    fn read_all(&self, table: Table) -> Result<Vec<Row>, SekolahError> {
        let mut rows = Vec::new();
        for entry in self.tree(table).iter() {
            let (_, value) = entry?;
            let row: Row = serde_json::from_slice(&value)?;
            rows.push(row);
        }
        Ok(rows)
    }

    fn check_unique(
        &self,
        table: Table,
        candidate: &Row,
        skip_id: Option<RecordId>,
    ) -> Result<(), SekolahError> {
        let columns = table.unique_columns();
        if columns.is_empty() {
            return Ok(());
        }
        let rows = self.read_all(table)?;
        for column in columns {
            let Some(value) = candidate.get(*column) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let taken = rows.iter().any(|existing| {
                if skip_id.is_some() && row_id(existing) == skip_id {
                    return false;
                }
                let existing_value = existing.get(*column).unwrap_or(&Value::Null);
                compare_values(existing_value, value) == std::cmp::Ordering::Equal
            });
            if taken {
                return Err(SekolahError::Conflict(format!(
                    "{}.{} already taken: {}",
                    table, column, value
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RelationalStore for SledBackend {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>, SekolahError> {
        let rows = self.read_all(table)?;
        Ok(apply_query(rows, query))
    }

    async fn insert(&self, table: Table, mut row: Row) -> Result<Row, SekolahError> {
        let id = match row_id(&row) {
            Some(id) => {
                if self.tree(table).contains_key(id.to_string().as_bytes())? {
                    return Err(SekolahError::Conflict(format!(
                        "{} row {} already exists",
                        table, id
                    )));
                }
                id
            }
            None => {
                let id = RecordId::generate();
                row.insert("id".to_string(), Value::String(id.to_string()));
                id
            }
        };
        if !row.contains_key("created_at") {
            row.insert("created_at".to_string(), Value::String(now_timestamp()));
        }

        self.check_unique(table, &row, None)?;

        let bytes = serde_json::to_vec(&row)?;
        self.tree(table).insert(id.to_string().as_bytes(), bytes)?;

        debug!(table = %table, id = %id, "row inserted");
        self.emit(ChangeKind::Insert, table, row.clone());
        Ok(row)
    }

    async fn update(&self, table: Table, id: RecordId, patch: Row) -> Result<Row, SekolahError> {
        let key = id.to_string();
        let existing = self
            .tree(table)
            .get(key.as_bytes())?
            .ok_or_else(|| SekolahError::NotFound(format!("{} row {}", table, id)))?;
        let mut row: Row = serde_json::from_slice(&existing)?;

        self.check_unique(table, &patch, Some(id))?;

        for (column, value) in patch {
            if column == "id" {
                continue;
            }
            row.insert(column, value);
        }

        let bytes = serde_json::to_vec(&row)?;
        self.tree(table).insert(key.as_bytes(), bytes)?;

        debug!(table = %table, id = %id, "row updated");
        self.emit(ChangeKind::Update, table, row.clone());
        Ok(row)
    }

    async fn delete(&self, table: Table, id: RecordId) -> Result<(), SekolahError> {
        let removed = self
            .tree(table)
            .remove(id.to_string().as_bytes())?
            .ok_or_else(|| SekolahError::NotFound(format!("{} row {}", table, id)))?;
        let row: Row = serde_json::from_slice(&removed)?;

        debug!(table = %table, id = %id, "row deleted");
        self.emit(ChangeKind::Delete, table, row);
        Ok(())
    }

    fn subscribe(&self, table: Table) -> broadcast::Receiver<ChangeEvent> {
        self.channels[table.index()].subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn obj(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_rows_survive_reopen() {
        let dir = tempdir().unwrap();
        let id;
        {
            let backend = SledBackend::open(dir.path()).unwrap();
            let row = backend
                .insert(
                    Table::Students,
                    obj(json!({"student_number": "2024-001", "name": "Budi"})),
                )
                .await
                .unwrap();
            id = row_id(&row).unwrap();
            backend.flush().unwrap();
        }

        let backend = SledBackend::open(dir.path()).unwrap();
        let rows = backend
            .select(Table::Students, &Query::new())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(row_id(&rows[0]), Some(id));
    }

    #[tokio::test]
    async fn test_unique_constraint_spans_restarts() {
        let dir = tempdir().unwrap();
        {
            let backend = SledBackend::open(dir.path()).unwrap();
            backend
                .insert(
                    Table::Teachers,
                    obj(json!({"staff_number": "T-01", "name": "Ibu Sari"})),
                )
                .await
                .unwrap();
            backend.flush().unwrap();
        }

        let backend = SledBackend::open(dir.path()).unwrap();
        let err = backend
            .insert(
                Table::Teachers,
                obj(json!({"staff_number": "T-01", "name": "Pak Agus"})),
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "conflict");
    }

    #[tokio::test]
    async fn test_update_and_delete_roundtrip() {
        let dir = tempdir().unwrap();
        let backend = SledBackend::open(dir.path()).unwrap();

        let row = backend
            .insert(Table::Classes, obj(json!({"name": "7A", "capacity": 30})))
            .await
            .unwrap();
        let id = row_id(&row).unwrap();

        let updated = backend
            .update(Table::Classes, id, obj(json!({"capacity": 32})))
            .await
            .unwrap();
        assert_eq!(updated["capacity"], json!(32));
        assert_eq!(updated["name"], json!("7A"));

        backend.delete(Table::Classes, id).await.unwrap();
        let err = backend.delete(Table::Classes, id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_change_events_emitted() {
        let dir = tempdir().unwrap();
        let backend = SledBackend::open(dir.path()).unwrap();
        let mut rx = backend.subscribe(Table::Grades);

        backend
            .insert(
                Table::Grades,
                obj(json!({"subject": "Mathematics", "score": 90})),
            )
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Insert);
        assert_eq!(event.table, Table::Grades);
    }
}
