//! Autosave sessions
//!
//! One background task per open draft. Edits are pushed over a channel;
//! the task saves the latest copy on a fixed interval and shortly after a
//! significant edit, but only when something changed since the last save.
//! Closing or dropping the session flushes pending edits.

use std::time::Duration;

use domain::{Draft, LocalId};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::SyncCoordinator;
use crate::error::ApplicationError;

/// Autosave timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutosaveConfig {
    /// Seconds between periodic saves
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Quiet period after a significant edit before saving, in milliseconds
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,
}

const fn default_interval() -> u64 {
    60
}

const fn default_debounce() -> u64 {
    1500
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            debounce_ms: default_debounce(),
        }
    }
}

/// How much an edit matters for autosave timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// Picked up by the next periodic save
    Minor,
    /// Saved once editing pauses for the debounce period
    Significant,
}

enum Command {
    Edit(Box<Draft>, EditKind),
    Flush(oneshot::Sender<Option<Draft>>),
}

/// Handle to a running autosave task
#[derive(Debug)]
pub struct AutosaveSession {
    local_id: LocalId,
    commands: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl AutosaveSession {
    pub(crate) fn spawn(coordinator: SyncCoordinator, draft: Draft, config: AutosaveConfig) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let local_id = draft.local_id;
        let task = tokio::spawn(run(coordinator, draft, config, rx, cancel.clone()));
        Self {
            local_id,
            commands,
            cancel,
            task: Some(task),
        }
    }

    pub const fn local_id(&self) -> LocalId {
        self.local_id
    }

    /// Record the latest editor state
    pub fn record_edit(&self, draft: Draft, kind: EditKind) -> Result<(), ApplicationError> {
        if draft.local_id != self.local_id {
            return Err(ApplicationError::InvalidOperation(format!(
                "autosave session for {} got draft {}",
                self.local_id, draft.local_id
            )));
        }
        self.commands
            .send(Command::Edit(Box::new(draft), kind))
            .map_err(|_| closed())
    }

    /// Save pending edits now; `None` if nothing needed saving or the save
    /// was skipped
    pub async fn flush(&self) -> Result<Option<Draft>, ApplicationError> {
        let (tx, rx) = oneshot::channel();
        self.commands.send(Command::Flush(tx)).map_err(|_| closed())?;
        rx.await.map_err(|_| closed())
    }

    /// Stop the task after saving pending edits
    pub async fn close(mut self) -> Result<(), ApplicationError> {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| ApplicationError::Internal(format!("autosave task failed: {e}")))?;
        }
        Ok(())
    }
}

impl Drop for AutosaveSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn closed() -> ApplicationError {
    ApplicationError::InvalidOperation("autosave session is closed".into())
}

struct Pending {
    latest: Draft,
    dirty: bool,
}

impl Pending {
    async fn save(&mut self, coordinator: &SyncCoordinator) -> Option<Draft> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        coordinator.autosave(self.latest.clone()).await
    }
}

#[instrument(skip_all, fields(local_id = %draft.local_id))]
async fn run(
    coordinator: SyncCoordinator,
    draft: Draft,
    config: AutosaveConfig,
    mut commands: mpsc::UnboundedReceiver<Command>,
    cancel: CancellationToken,
) {
    let period = Duration::from_secs(config.interval_secs.max(1));
    let debounce = Duration::from_millis(config.debounce_ms);
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let settle = tokio::time::sleep(debounce);
    tokio::pin!(settle);
    let mut settle_armed = false;

    let mut pending = Pending {
        latest: draft,
        dirty: false,
    };

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                while let Ok(command) = commands.try_recv() {
                    match command {
                        Command::Edit(draft, _) => {
                            pending.latest = *draft;
                            pending.dirty = true;
                        },
                        Command::Flush(reply) => {
                            let _ = reply.send(None);
                        },
                    }
                }
                pending.save(&coordinator).await;
                break;
            }
            command = commands.recv() => match command {
                Some(Command::Edit(draft, kind)) => {
                    pending.latest = *draft;
                    pending.dirty = true;
                    if kind == EditKind::Significant {
                        settle.as_mut().reset(Instant::now() + debounce);
                        settle_armed = true;
                    }
                },
                Some(Command::Flush(reply)) => {
                    let saved = pending.save(&coordinator).await;
                    let _ = reply.send(saved);
                },
                None => {
                    pending.save(&coordinator).await;
                    break;
                },
            },
            () = &mut settle, if settle_armed => {
                settle_armed = false;
                if pending.save(&coordinator).await.is_some() {
                    debug!("Saved after significant edit");
                }
            }
            _ = interval.tick() => {
                pending.save(&coordinator).await;
            }
        }
    }
    debug!("Autosave session ended");
}
