//! Debounced autosave for edit forms.
//!
//! Every `update` replaces the pending draft and restarts the debounce
//! window; the draft is flushed as an upsert once the window elapses
//! with no further edits. A failed flush keeps the draft dirty so the
//! next edit or manual save retries it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::{debug, error};

use libsekolah_core::store::Row;
use libsekolah_core::{SekolahError, Table};

use crate::api::Api;

enum SaveCommand {
    Update(Row),
    SaveNow(oneshot::Sender<Result<(), SekolahError>>),
}

/// Debounced writer for a single table. Dropping the handle discards
/// any unflushed draft.
pub struct Autosave {
    tx: mpsc::UnboundedSender<SaveCommand>,
    dirty: Arc<AtomicBool>,
    saving: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl Autosave {
    pub fn new(api: Api, table: Table, debounce: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let dirty = Arc::new(AtomicBool::new(false));
        let saving = Arc::new(AtomicBool::new(false));

        let worker = Worker {
            api,
            table,
            debounce,
            dirty: dirty.clone(),
            saving: saving.clone(),
        };
        let task = tokio::spawn(worker.run(rx));

        Self {
            tx,
            dirty,
            saving,
            task,
        }
    }

    /// Replace the pending draft and restart the debounce window
    pub fn update(&self, row: Row) {
        self.dirty.store(true, Ordering::SeqCst);
        let _ = self.tx.send(SaveCommand::Update(row));
    }

    /// Flush the pending draft immediately, skipping the debounce.
    /// A no-op when nothing is dirty.
    pub async fn save_now(&self) -> Result<(), SekolahError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(SaveCommand::SaveNow(done_tx))
            .map_err(|_| SekolahError::Internal("autosave worker gone".to_string()))?;
        done_rx
            .await
            .map_err(|_| SekolahError::Internal("autosave worker gone".to_string()))?
    }

    /// True while an edit is awaiting a successful flush
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// True while a flush is in flight
    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::SeqCst)
    }
}

impl Drop for Autosave {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Worker {
    api: Api,
    table: Table,
    debounce: Duration,
    dirty: Arc<AtomicBool>,
    saving: Arc<AtomicBool>,
}

impl Worker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<SaveCommand>) {
        let mut draft: Option<Row> = None;
        // Disarmed after a failed flush so the worker does not retry in
        // a tight loop; the next edit or manual save re-arms it.
        let mut armed = false;
        let mut deadline = Instant::now();

        loop {
            let command = if armed && draft.is_some() {
                tokio::select! {
                    cmd = rx.recv() => match cmd {
                        Some(cmd) => cmd,
                        None => break,
                    },
                    _ = sleep_until(deadline) => {
                        let _ = self.flush(&mut draft).await;
                        armed = false;
                        continue;
                    }
                }
            } else {
                match rx.recv().await {
                    Some(cmd) => cmd,
                    None => break,
                }
            };

            match command {
                SaveCommand::Update(row) => {
                    draft = Some(row);
                    armed = true;
                    deadline = Instant::now() + self.debounce;
                }
                SaveCommand::SaveNow(done) => {
                    let result = self.flush(&mut draft).await;
                    armed = false;
                    let _ = done.send(result);
                }
            }
        }
    }

    async fn flush(&self, draft: &mut Option<Row>) -> Result<(), SekolahError> {
        let row = match draft.take() {
            Some(row) => row,
            None => return Ok(()),
        };

        self.saving.store(true, Ordering::SeqCst);
        let result = self.api.upsert(self.table, row.clone()).await;
        self.saving.store(false, Ordering::SeqCst);

        match result {
            Ok(_) => {
                debug!(table = %self.table, "draft saved");
                self.dirty.store(false, Ordering::SeqCst);
                self.api.notices().success("draft saved");
                Ok(())
            }
            Err(e) => {
                error!(table = %self.table, error = %e, "autosave failed");
                // Keep the draft so a later edit or manual save retries it
                *draft = Some(row);
                self.api.notices().error(format!("failed to save draft: {}", e));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::NoticeBus;
    use libsekolah_core::store::Query;
    use libsekolah_core::MemoryBackend;
    use serde_json::{json, Value};
    use tokio::time::sleep;

    fn obj(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn setup() -> (Api, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        (Api::new(backend.clone(), NoticeBus::new()), backend)
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_edits_collapse_to_one_write() {
        let (api, _) = setup();
        let autosave = Autosave::new(api.clone(), Table::Grades, Duration::from_millis(1000));

        for score in [70, 75, 80] {
            autosave.update(obj(json!({"subject": "English", "score": score})));
            sleep(Duration::from_millis(300)).await;
        }
        assert!(autosave.is_dirty());

        sleep(Duration::from_millis(1100)).await;

        let rows = api.fetch_all(Table::Grades, &Query::new()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["score"], json!(80));
        assert!(!autosave.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_now_skips_debounce() {
        let (api, _) = setup();
        let autosave = Autosave::new(api.clone(), Table::Grades, Duration::from_millis(1000));

        autosave.update(obj(json!({"subject": "Mathematics", "score": 95})));
        autosave.save_now().await.unwrap();

        let rows = api.fetch_all(Table::Grades, &Query::new()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(!autosave.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_now_without_draft_is_noop() {
        let (api, _) = setup();
        let autosave = Autosave::new(api.clone(), Table::Grades, Duration::from_millis(1000));
        autosave.save_now().await.unwrap();

        let rows = api.fetch_all(Table::Grades, &Query::new()).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_flush_keeps_dirty_and_retries() {
        let (api, backend) = setup();
        let autosave = Autosave::new(api.clone(), Table::Grades, Duration::from_millis(1000));

        backend.set_offline(true);
        autosave.update(obj(json!({"subject": "English", "score": 60})));
        let err = autosave.save_now().await.unwrap_err();
        assert_eq!(err.error_code(), "unavailable");
        assert!(autosave.is_dirty());

        backend.set_offline(false);
        autosave.save_now().await.unwrap();
        assert!(!autosave.is_dirty());
        let rows = api.fetch_all(Table::Grades, &Query::new()).await.unwrap();
        assert_eq!(rows.len(), 1);
    }
}
