use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

use super::{SessionSlot, SessionSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    /// A snapshot is waiting for the quiet period to elapse.
    Pending,
    Saved,
    Failed(String),
}

enum SaverCommand {
    Update(SessionSnapshot),
    Flush(oneshot::Sender<()>),
}

/// Debounced background writer for session snapshots.
///
/// Each [`notify`](Self::notify) restarts the quiet period; only the last
/// snapshot is written once the period elapses without further changes.
pub struct AutoSaver {
    tx: mpsc::UnboundedSender<SaverCommand>,
    status: watch::Receiver<SaveStatus>,
    handle: JoinHandle<()>,
}

impl AutoSaver {
    /// Spawn the writer task on the current tokio runtime.
    pub fn spawn(slot: Arc<dyn SessionSlot>, debounce: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(SaveStatus::Idle);
        let handle = tokio::spawn(run_saver(slot, debounce, rx, status_tx));
        Self { tx, status, handle }
    }

    pub fn notify(&self, snapshot: SessionSnapshot) {
        if self.tx.send(SaverCommand::Update(snapshot)).is_err() {
            warn!("Autosave task has stopped; session change not saved");
        }
    }

    pub fn status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    /// Write any pending snapshot now instead of waiting for the quiet period.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(SaverCommand::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Flush the pending snapshot and stop the writer task.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Autosave task ended abnormally");
        }
    }
}

async fn run_saver(
    slot: Arc<dyn SessionSlot>,
    debounce: Duration,
    mut rx: mpsc::UnboundedReceiver<SaverCommand>,
    status: watch::Sender<SaveStatus>,
) {
    let mut pending: Option<SessionSnapshot> = None;
    let mut last_saved: Option<SessionSnapshot> = None;
    let mut deadline = Instant::now() + debounce;

    loop {
        tokio::select! {
            command = rx.recv() => match command {
                Some(SaverCommand::Update(snapshot)) => {
                    if pending.is_none() && last_saved.as_ref() == Some(&snapshot) {
                        continue;
                    }
                    pending = Some(snapshot);
                    deadline = Instant::now() + debounce;
                    status.send_replace(SaveStatus::Pending);
                }
                Some(SaverCommand::Flush(done)) => {
                    write_pending(slot.as_ref(), &mut pending, &mut last_saved, &status).await;
                    let _ = done.send(());
                }
                None => {
                    write_pending(slot.as_ref(), &mut pending, &mut last_saved, &status).await;
                    break;
                }
            },
            _ = sleep_until(deadline), if pending.is_some() => {
                write_pending(slot.as_ref(), &mut pending, &mut last_saved, &status).await;
            }
        }
    }
}

async fn write_pending(
    slot: &dyn SessionSlot,
    pending: &mut Option<SessionSnapshot>,
    last_saved: &mut Option<SessionSnapshot>,
    status: &watch::Sender<SaveStatus>,
) {
    let Some(snapshot) = pending.take() else {
        return;
    };

    let result = match snapshot.to_json() {
        Ok(json) => slot.store(&json).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => {
            debug!(clips = snapshot.timeline_clip_ids.len(), "Session saved");
            *last_saved = Some(snapshot);
            status.send_replace(SaveStatus::Saved);
        }
        Err(e) => {
            // keep nothing pending; the next change retries with fresh state
            warn!(error = %e, "Failed to save session");
            *last_saved = None;
            status.send_replace(SaveStatus::Failed(e.to_string()));
        }
    }
}
