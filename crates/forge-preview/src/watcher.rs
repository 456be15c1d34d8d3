//! Polls the VFS and rebuilds the preview on each new commit (§4.9
//! "Watcher").

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use forge_protocol::preview::ReloadEvent;
use tokio::sync::{broadcast, Mutex};

use crate::manager::PreviewManager;

/// One running watcher task for a single project's preview.
pub struct Watcher {
    project_id: String,
    preview_id: String,
    manager: Arc<PreviewManager>,
    poll_interval: Duration,
    reload_tx: broadcast::Sender<ReloadEvent>,
    last_seen_commit: Mutex<Option<String>>,
}

impl Watcher {
    /// `initial_commit` is the commit already reflected in the preview's
    /// working directory at creation time, so the first poll doesn't
    /// re-announce a reload for a build that already happened.
    pub fn new(
        project_id: impl Into<String>,
        preview_id: impl Into<String>,
        manager: Arc<PreviewManager>,
        poll_interval: Duration,
        initial_commit: Option<String>,
    ) -> (Arc<Self>, broadcast::Receiver<ReloadEvent>) {
        let (reload_tx, reload_rx) = broadcast::channel(32);
        let watcher = Arc::new(Self {
            project_id: project_id.into(),
            preview_id: preview_id.into(),
            manager,
            poll_interval,
            reload_tx,
            last_seen_commit: Mutex::new(initial_commit),
        });
        (watcher, reload_rx)
    }

    /// Runs until the preview is stopped or the containing task is
    /// aborted. Intended to be spawned with `tokio::spawn`.
    pub async fn run(self: Arc<Self>, mut poll_commit: impl FnMut() -> Option<String> + Send + 'static) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            ticker.tick().await;
            let Some(commit_id) = poll_commit() else {
                continue;
            };

            let mut last_seen = self.last_seen_commit.lock().await;
            if last_seen.as_deref() == Some(commit_id.as_str()) {
                continue;
            }
            *last_seen = Some(commit_id.clone());
            drop(last_seen);

            if self.manager.get_status(&self.preview_id).await.is_none() {
                // Preview was stopped out from under this watcher.
                return;
            }

            let event = ReloadEvent {
                project_id: self.project_id.clone(),
                preview_id: self.preview_id.clone(),
                commit_id,
                at: chrono::Utc::now(),
            };
            // A lagging or absent subscriber is not a watcher failure
            // (§4.9 "Watcher failures are logged; the preview remains on
            // the last working image").
            let _ = self.reload_tx.send(event);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.reload_tx.subscribe()
    }
}

/// Rewrites a preview's working directory from `files` and restarts its
/// container against the new content. Errors are logged, not propagated —
/// a failed rebuild reports `Error` status on the preview but never kills
/// the watcher itself (§4.9 "Watcher failures are logged; the preview
/// remains on the last working image").
pub async fn rebuild(manager: &PreviewManager, preview_id: &str, files: &BTreeMap<String, String>) {
    if let Err(error) = manager.rebuild_preview(preview_id, files).await {
        tracing::warn!(%preview_id, %error, "rebuild failed");
    }
}
