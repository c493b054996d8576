//! In-memory backend. Plays the relational store for tests and for
//! fully local single-process deployments.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::error::SekolahError;
use crate::types::{RecordId, Table};

use super::{
    apply_query, compare_values, now_timestamp, row_id, ChangeEvent, ChangeKind, Query,
    RelationalStore, Row, CHANGE_CHANNEL_CAPACITY,
};

/// HashMap tables behind an async lock, with per-table change fan-out.
///
/// Carries two pieces of test instrumentation mirroring the failure
/// modes of a remote store: `set_offline` (every call fails as
/// unavailable) and `set_latency` (every call sleeps first, so an
/// in-flight request can straddle a teardown).
pub struct MemoryBackend {
    tables: RwLock<HashMap<Table, Vec<Row>>>,
    channels: [broadcast::Sender<ChangeEvent>; 8],
    offline: AtomicBool,
    latency_ms: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        let mut tables = HashMap::new();
        for table in Table::ALL {
            tables.insert(table, Vec::new());
        }
        let channels = std::array::from_fn(|_| broadcast::channel(CHANGE_CHANNEL_CAPACITY).0);
        Self {
            tables: RwLock::new(tables),
            channels,
            offline: AtomicBool::new(false),
            latency_ms: AtomicU64::new(0),
        }
    }

    /// Make every subsequent call fail as unavailable
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    /// Delay every subsequent call by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, AtomicOrdering::SeqCst);
    }

    /// Remove a table entirely; later calls against it fail with the
    /// undefined-table error (the schema-not-provisioned case)
    pub async fn drop_table(&self, table: Table) {
        self.tables.write().await.remove(&table);
    }

    async fn guard(&self) -> Result<(), SekolahError> {
        let latency = self.latency_ms.load(AtomicOrdering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.offline.load(AtomicOrdering::SeqCst) {
            return Err(SekolahError::Unavailable(
                "memory backend is offline".to_string(),
            ));
        }
        Ok(())
    }

    fn emit(&self, kind: ChangeKind, table: Table, row: Row) {
        // No receivers is fine
        let _ = self.channels[table.index()].send(ChangeEvent { kind, table, row });
    }

    fn check_unique(
        table: Table,
        rows: &[Row],
        candidate: &Row,
        skip_id: Option<RecordId>,
    ) -> Result<(), SekolahError> {
        for column in table.unique_columns() {
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

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RelationalStore for MemoryBackend {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>, SekolahError> {
        self.guard().await?;
        let tables = self.tables.read().await;
        let rows = tables
            .get(&table)
            .ok_or_else(|| SekolahError::UndefinedTable(table.to_string()))?;
        Ok(apply_query(rows.clone(), query))
    }

    async fn insert(&self, table: Table, mut row: Row) -> Result<Row, SekolahError> {
        self.guard().await?;
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(&table)
            .ok_or_else(|| SekolahError::UndefinedTable(table.to_string()))?;

        // Keep a caller-supplied id (profile rows reuse the identity id)
        match row_id(&row) {
            Some(id) => {
                if rows.iter().any(|r| row_id(r) == Some(id)) {
                    return Err(SekolahError::Conflict(format!(
                        "{} row {} already exists",
                        table, id
                    )));
                }
            }
            None => {
                row.insert(
                    "id".to_string(),
                    Value::String(RecordId::generate().to_string()),
                );
            }
        }
        if !row.contains_key("created_at") {
            row.insert("created_at".to_string(), Value::String(now_timestamp()));
        }

        Self::check_unique(table, rows, &row, None)?;

        rows.push(row.clone());
        drop(tables);

        debug!(table = %table, "row inserted");
        self.emit(ChangeKind::Insert, table, row.clone());
        Ok(row)
    }

    async fn update(&self, table: Table, id: RecordId, patch: Row) -> Result<Row, SekolahError> {
        self.guard().await?;
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(&table)
            .ok_or_else(|| SekolahError::UndefinedTable(table.to_string()))?;

        let position = rows
            .iter()
            .position(|r| row_id(r) == Some(id))
            .ok_or_else(|| SekolahError::NotFound(format!("{} row {}", table, id)))?;

        Self::check_unique(table, rows, &patch, Some(id))?;

        let row = &mut rows[position];
        for (key, value) in patch {
            if key == "id" {
                continue;
            }
            row.insert(key, value);
        }
        let updated = row.clone();
        drop(tables);

        debug!(table = %table, id = %id, "row updated");
        self.emit(ChangeKind::Update, table, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, table: Table, id: RecordId) -> Result<(), SekolahError> {
        self.guard().await?;
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(&table)
            .ok_or_else(|| SekolahError::UndefinedTable(table.to_string()))?;

        let position = rows
            .iter()
            .position(|r| row_id(r) == Some(id))
            .ok_or_else(|| SekolahError::NotFound(format!("{} row {}", table, id)))?;
        let removed = rows.remove(position);
        drop(tables);

        debug!(table = %table, id = %id, "row deleted");
        self.emit(ChangeKind::Delete, table, removed);
        Ok(())
    }

    fn subscribe(&self, table: Table) -> broadcast::Receiver<ChangeEvent> {
        self.channels[table.index()].subscribe()
    }
}
