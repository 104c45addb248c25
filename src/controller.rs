//! The export controller: owns the composition, the debounce timer, and the
//! last rendered bitmap.
//!
//! A dedicated worker task owns all mutable state and executes commands
//! sent from async callers, so the pipeline has one logical thread of
//! control: model edits, the debounce deadline, capture starts and capture
//! completions are all serialized through one loop. At most one capture is
//! ever in flight; an in-flight capture is allowed to finish, and if the
//! model changed while it ran a fresh capture is triggered immediately so
//! a completed result is never discarded needlessly.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::color::Color;
use crate::error::{Error, Result};
use crate::model::{BlockEdit, Composition, TextBlock};
use crate::rendering::RenderedBitmap;
use crate::snapshot::{CaptureRoot, SnapshotRenderer};

/// Quiet period after the last edit before a render runs.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// One model mutation, addressed the way the editing surface addresses
/// blocks: by index.
#[derive(Debug, Clone)]
pub enum Mutation {
    AddBlock(TextBlock),
    EditBlock { index: usize, edit: BlockEdit },
    DeleteBlock(usize),
    SetBackground(Color),
}

enum Command {
    Mutate(Mutation, oneshot::Sender<Result<()>>),
    Composition(oneshot::Sender<Composition>),
    Bitmap(oneshot::Sender<Option<RenderedBitmap>>),
    Save(PathBuf, oneshot::Sender<Result<PathBuf>>),
    Close(oneshot::Sender<()>),
}

/// Cloneable handle to the pipeline worker.
///
/// Dropping every handle shuts the worker down; [`ExportController::close`]
/// does so explicitly and waits for the worker to acknowledge.
#[derive(Clone)]
pub struct ExportController {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl ExportController {
    /// Spawn the worker task. Must be called within a tokio runtime.
    pub fn spawn(
        composition: Composition,
        renderer: SnapshotRenderer,
        debounce: Duration,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let root = CaptureRoot::new(&composition);
        let worker = Worker {
            composition,
            root: Some(root),
            renderer: Arc::new(renderer),
            debounce,
            deadline: None,
            inflight: None,
            last: None,
        };
        tokio::spawn(worker.run(cmd_rx));
        Self { cmd_tx }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .map_err(|_| Error::ControllerClosed)?;
        rx.await.map_err(|_| Error::ControllerClosed)
    }

    pub async fn add_block(&self, block: TextBlock) -> Result<()> {
        self.request(|tx| Command::Mutate(Mutation::AddBlock(block), tx))
            .await?
    }

    pub async fn edit_block(&self, index: usize, edit: BlockEdit) -> Result<()> {
        self.request(|tx| Command::Mutate(Mutation::EditBlock { index, edit }, tx))
            .await?
    }

    /// Apply an edit addressed by field name, the form the editing surface
    /// delivers.
    pub async fn edit_field(
        &self,
        index: usize,
        field: &str,
        value: serde_json::Value,
    ) -> Result<()> {
        let edit = BlockEdit::from_field(field, value)?;
        self.edit_block(index, edit).await
    }

    pub async fn delete_block(&self, index: usize) -> Result<()> {
        self.request(|tx| Command::Mutate(Mutation::DeleteBlock(index), tx))
            .await?
    }

    pub async fn set_background(&self, color: Color) -> Result<()> {
        self.request(|tx| Command::Mutate(Mutation::SetBackground(color), tx))
            .await?
    }

    /// The current model value.
    pub async fn composition(&self) -> Result<Composition> {
        self.request(Command::Composition).await
    }

    /// The latest completed render, if any.
    pub async fn bitmap(&self) -> Result<Option<RenderedBitmap>> {
        self.request(Command::Bitmap).await
    }

    /// Write the latest completed render into `dir` under the timestamped
    /// export name. Fails with [`Error::BitmapUnavailable`] before the
    /// first render completes.
    pub async fn save_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        self.request(|tx| Command::Save(dir.as_ref().to_path_buf(), tx))
            .await?
    }

    /// Shut the worker down: the pending debounce is cancelled and any
    /// in-flight capture's result is ignored.
    pub async fn close(self) -> Result<()> {
        self.request(Command::Close).await
    }
}

struct Worker {
    composition: Composition,
    root: Option<Arc<CaptureRoot>>,
    renderer: Arc<SnapshotRenderer>,
    debounce: Duration,
    deadline: Option<Instant>,
    /// Version the capture was issued against, plus its task handle
    inflight: Option<(u64, JoinHandle<Result<RenderedBitmap>>)>,
    last: Option<RenderedBitmap>,
}

impl Worker {
    async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<Command>) {
        loop {
            let deadline = self.deadline;
            let capturing = self.inflight.is_some();

            tokio::select! {
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(Command::Close(resp)) => {
                            let _ = resp.send(());
                            break;
                        }
                        Some(cmd) => self.handle(cmd),
                        None => break,
                    }
                }
                _ = sleep_until_deadline(deadline), if deadline.is_some() && !capturing => {
                    self.deadline = None;
                    self.start_capture();
                }
                result = join_inflight(&mut self.inflight), if capturing => {
                    let (issued_version, _) = self.inflight.take().expect("in-flight capture");
                    match result {
                        Ok(Ok(bitmap)) => {
                            if commit_bitmap(&mut self.last, bitmap) {
                                log::debug!("committed render for version {issued_version}");
                            } else {
                                log::debug!("discarded stale render for version {issued_version}");
                            }
                        }
                        Ok(Err(e)) => {
                            // Previous bitmap stays visible; the next edit retries implicitly
                            log::warn!("render for version {issued_version} failed: {e}");
                        }
                        Err(e) => {
                            log::warn!("render task for version {issued_version} aborted: {e}");
                        }
                    }
                    // Edits that arrived mid-capture re-trigger right away
                    if self.composition.version != issued_version {
                        self.deadline = Some(Instant::now());
                    }
                }
            }
        }

        // Teardown: drop the pending debounce and ignore any in-flight result
        if let Some((_, handle)) = self.inflight.take() {
            handle.abort();
        }
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Mutate(mutation, resp) => {
                let result = self.apply(mutation);
                if result.is_ok() {
                    if let Some(root) = &self.root {
                        root.restage(&self.composition);
                    }
                    // Every mutation restarts the quiet period
                    self.deadline = Some(Instant::now() + self.debounce);
                }
                let _ = resp.send(result);
            }
            Command::Composition(resp) => {
                let _ = resp.send(self.composition.clone());
            }
            Command::Bitmap(resp) => {
                let _ = resp.send(self.last.clone());
            }
            Command::Save(dir, resp) => {
                let _ = resp.send(self.save(&dir));
            }
            Command::Close(_) => unreachable!("handled in run"),
        }
    }

    fn apply(&mut self, mutation: Mutation) -> Result<()> {
        match mutation {
            Mutation::AddBlock(block) => {
                self.composition.add_block(block);
                Ok(())
            }
            Mutation::EditBlock { index, edit } => self.composition.update_block(index, edit),
            Mutation::DeleteBlock(index) => self.composition.delete_block(index),
            Mutation::SetBackground(color) => {
                self.composition.set_background(color);
                Ok(())
            }
        }
    }

    fn start_capture(&mut self) {
        let renderer = Arc::clone(&self.renderer);
        let root = self.root.clone();
        let version = self.composition.version;
        log::debug!("starting capture for version {version}");
        let handle = tokio::spawn(async move { renderer.render(root.as_ref()).await });
        self.inflight = Some((version, handle));
    }

    fn save(&self, dir: &Path) -> Result<PathBuf> {
        let bitmap = self.last.as_ref().ok_or(Error::BitmapUnavailable)?;
        let path = dir.join(export_filename(Utc::now()));
        std::fs::write(&path, &bitmap.png_data)?;
        log::info!("saved {} bytes to {}", bitmap.png_data.len(), path.display());
        Ok(path)
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn join_inflight(
    inflight: &mut Option<(u64, JoinHandle<Result<RenderedBitmap>>)>,
) -> std::result::Result<Result<RenderedBitmap>, tokio::task::JoinError> {
    match inflight {
        Some((_, handle)) => handle.await,
        None => std::future::pending().await,
    }
}

/// Commit a completed render unless a newer one already landed. Returns
/// whether the bitmap was accepted.
pub(crate) fn commit_bitmap(slot: &mut Option<RenderedBitmap>, bitmap: RenderedBitmap) -> bool {
    if let Some(existing) = slot {
        if bitmap.version < existing.version {
            return false;
        }
    }
    *slot = Some(bitmap);
    true
}

/// Export filename: `yap_` plus the ISO-8601 UTC timestamp with separators
/// replaced by underscores.
pub fn export_filename(now: DateTime<Utc>) -> String {
    let stamp: String = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .chars()
        .map(|c| if matches!(c, ':' | '.' | '-') { '_' } else { c })
        .collect();
    format!("yap_{stamp}.png")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bitmap(version: u64) -> RenderedBitmap {
        RenderedBitmap {
            width: 1,
            height: 1,
            png_data: vec![version as u8],
            version,
        }
    }

    #[test]
    fn stale_bitmap_never_overwrites_newer_result() {
        let mut slot = None;
        assert!(commit_bitmap(&mut slot, bitmap(2)));
        assert!(!commit_bitmap(&mut slot, bitmap(1)));
        assert_eq!(slot.as_ref().unwrap().version, 2);
    }

    #[test]
    fn newer_bitmap_supersedes_wholesale() {
        let mut slot = Some(bitmap(1));
        assert!(commit_bitmap(&mut slot, bitmap(3)));
        assert_eq!(slot.as_ref().unwrap().version, 3);
        assert_eq!(slot.as_ref().unwrap().png_data, vec![3]);
    }

    #[test]
    fn filename_replaces_timestamp_separators() {
        let at = Utc.with_ymd_and_hms(2024, 11, 5, 13, 37, 42).unwrap();
        let name = export_filename(at);
        assert_eq!(name, "yap_2024_11_05T13_37_42_000Z.png");
        let stem = name.strip_suffix(".png").unwrap();
        assert!(!stem.contains(':') && !stem.contains('.') && !stem.contains('-'));
    }
}
