//! Keeps a table snapshot current by refetching whenever the store
//! reports a row change.
//!
//! The watcher subscribes before the initial fetch so changes that land
//! during the fetch are not missed; the worst case is one redundant
//! refetch. Any change to the table triggers a full ordered refetch, so
//! the snapshot never needs row-level patching.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use libsekolah_core::store::{Query, Row};
use libsekolah_core::Table;

use crate::api::Api;
use crate::stores::DataStore;

pub type SnapshotCallback = Box<dyn Fn(Vec<Row>) + Send + Sync>;

/// Handle to a running table watcher. Stopping (or dropping) the handle
/// guarantees the callback is never invoked again.
pub struct TableWatcher {
    table: Table,
    alive: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl TableWatcher {
    pub fn table(&self) -> Table {
        self.table
    }

    pub fn stop(&self) {
        self.alive.store(false, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
    }
}

impl Drop for TableWatcher {
    fn drop(&mut self) {
        self.stop();
        self.task.abort();
    }
}

/// Watch a table: deliver one initial snapshot, then a fresh snapshot
/// after every change event. Snapshots arrive newest first.
pub fn watch_table(api: Api, table: Table, callback: SnapshotCallback) -> TableWatcher {
    let alive = Arc::new(AtomicBool::new(true));
    let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);

    let task_alive = alive.clone();
    let task = tokio::spawn(async move {
        // Subscribe before the initial fetch so no change falls in the gap
        let mut changes = api.subscribe(table);
        refetch(&api, table, &task_alive, &callback).await;

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    debug!(table = %table, "watcher stopped");
                    break;
                }
                event = changes.recv() => match event {
                    Ok(event) => {
                        debug!(table = %table, kind = ?event.kind, "change observed");
                        refetch(&api, table, &task_alive, &callback).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(table = %table, skipped, "change stream lagged");
                        refetch(&api, table, &task_alive, &callback).await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        warn!(table = %table, "change stream closed");
                        break;
                    }
                },
            }
        }
    });

    TableWatcher {
        table,
        alive,
        shutdown_tx,
        task,
    }
}

/// Watch a table and mirror its snapshots into a [`DataStore`]. The
/// store's loading flag is set until the first snapshot lands.
pub fn bind(api: Api, table: Table, data: DataStore) -> TableWatcher {
    data.set_loading(true);
    watch_table(
        api,
        table,
        Box::new(move |rows| {
            data.set(table, rows);
            data.set_loading(false);
        }),
    )
}

async fn refetch(api: &Api, table: Table, alive: &AtomicBool, callback: &SnapshotCallback) {
    let query = Query::new().order_by("created_at", false);
    let rows = match api.fetch_all(table, &query).await {
        Ok(rows) => rows,
        Err(e) => {
            error!(table = %table, error = %e, "refetch failed");
            Vec::new()
        }
    };
    if alive.load(Ordering::SeqCst) {
        callback(rows);
    }
}
