//! In-memory snapshots of domain tables, fed by table watchers.
//!
//! Never persisted: a stale cache on disk would masquerade as fresh
//! data after restart. Consumers watch a per-table version counter and
//! re-read the snapshot when it bumps.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use tokio::sync::watch;

use libsekolah_core::store::{from_row, Row};
use libsekolah_core::{SekolahError, Table};

struct Inner {
    snapshots: RwLock<HashMap<Table, Vec<Row>>>,
    versions: [watch::Sender<u64>; Table::ALL.len()],
    loading: AtomicBool,
}

#[derive(Clone)]
pub struct DataStore {
    inner: Arc<Inner>,
}

impl DataStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                snapshots: RwLock::new(HashMap::new()),
                versions: std::array::from_fn(|_| watch::channel(0).0),
                loading: AtomicBool::new(false),
            }),
        }
    }

    /// Replace a table snapshot and bump its version
    pub fn set(&self, table: Table, rows: Vec<Row>) {
        self.inner
            .snapshots
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(table, rows);
        self.inner.versions[table.index()].send_modify(|v| *v += 1);
    }

    /// Current snapshot of a table; empty until the first set
    pub fn get(&self, table: Table) -> Vec<Row> {
        self.inner
            .snapshots
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn get_typed<T: DeserializeOwned>(&self, table: Table) -> Result<Vec<T>, SekolahError> {
        self.get(table).into_iter().map(from_row).collect()
    }

    /// Version stream for one table; changes whenever the snapshot does
    pub fn watch(&self, table: Table) -> watch::Receiver<u64> {
        self.inner.versions[table.index()].subscribe()
    }

    pub fn set_loading(&self, loading: bool) {
        self.inner.loading.store(loading, Ordering::SeqCst);
    }

    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::SeqCst)
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsekolah_core::Student;
    use serde_json::{json, Value};

    fn obj(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_set_bumps_version_for_that_table_only() {
        let store = DataStore::new();
        let students = store.watch(Table::Students);
        let grades = store.watch(Table::Grades);

        store.set(Table::Students, vec![obj(json!({"name": "Budi"}))]);
        assert_eq!(*store.watch(Table::Students).borrow(), 1);
        assert_eq!(*students.borrow(), 1);
        assert_eq!(*grades.borrow(), 0);
        assert_eq!(store.get(Table::Students).len(), 1);
        assert!(store.get(Table::Grades).is_empty());
    }

    #[test]
    fn test_get_typed_deserializes_rows() {
        let store = DataStore::new();
        store.set(
            Table::Students,
            vec![obj(json!({
                "id": "8d6fdfd6-9db0-4f04-bb08-2a0de5e1a8e5",
                "student_number": "2024-001",
                "name": "Budi",
                "created_at": "2026-08-01T07:00:00Z",
            }))],
        );

        let students: Vec<Student> = store.get_typed(Table::Students).unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].name, "Budi");
    }

    #[tokio::test]
    async fn test_watch_wakes_on_set() {
        let store = DataStore::new();
        let mut rx = store.watch(Table::Announcements);

        let writer = store.clone();
        tokio::spawn(async move {
            writer.set(Table::Announcements, Vec::new());
        });

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 1);
    }
}
