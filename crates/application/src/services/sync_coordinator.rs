//! Sync coordinator
//!
//! Orchestrates saving and finalizing drafts. Saves only touch the local
//! tier. Finalizing validates the draft, writes it to the local tier as
//! `pending`, then allocates a number and submits the letter through the
//! remote tier, retrying transient failures with the draft's local id as
//! idempotency key throughout.
//!
//! At most one finalize runs per draft; callers racing on the same draft
//! wait for the first one and then observe its result. Unrelated drafts
//! proceed concurrently.

use std::{collections::HashMap, future::Future, sync::Arc};

use domain::{
    DomainError, Draft, LetterContent, LocalId, NewLetter, Notification, NumberingScope,
    RemoteId, SequenceNumber, SyncState,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::{sync::broadcast, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::{
    AutosaveConfig, AutosaveSession, Connectivity, ConnectivityMonitor, LocalDraftTier, Notifier,
    RemoteLetterTier,
};
use crate::{
    author_context::AuthorContext,
    error::ApplicationError,
    ports::BranchDirectoryPort,
    retry::{RetryConfig, with_retry_until_cancelled},
};

/// Coordinator behavior
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Keep synced drafts in the local cache tagged `synced`
    /// instead of deleting them
    #[serde(default)]
    pub retain_synced: bool,

    #[serde(default)]
    pub autosave: AutosaveConfig,
}

/// Result of a finalize call that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// Stored in the letter repository
    Synced(Draft),
    /// Kept locally; will be submitted when the repository is reachable
    Queued(Draft),
}

impl FinalizeOutcome {
    pub const fn draft(&self) -> &Draft {
        match self {
            Self::Synced(draft) | Self::Queued(draft) => draft,
        }
    }

    pub const fn is_synced(&self) -> bool {
        matches!(self, Self::Synced(_))
    }
}

/// What a resync pass did with each pending draft
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResyncReport {
    pub synced: Vec<LocalId>,
    pub queued: Vec<LocalId>,
    pub failed: Vec<(LocalId, String)>,
}

impl ResyncReport {
    pub fn is_empty(&self) -> bool {
        self.synced.is_empty() && self.queued.is_empty() && self.failed.is_empty()
    }
}

/// A draft that is being, or has been, pushed to the repository
struct Track {
    state: SyncState,
    flight: Arc<tokio::sync::Mutex<()>>,
    cancel: CancellationToken,
}

impl Track {
    fn new(shutdown: &CancellationToken) -> Self {
        Self {
            state: SyncState::LocalOnly,
            flight: Arc::new(tokio::sync::Mutex::new(())),
            cancel: shutdown.child_token(),
        }
    }
}

/// What is remembered of a draft that reached a terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settled {
    Synced {
        sequence_number: SequenceNumber,
        remote_id: RemoteId,
    },
    Abandoned,
}

impl Settled {
    fn from_synced(draft: &Draft) -> Option<Self> {
        Some(Self::Synced {
            sequence_number: draft.sequence_number?,
            remote_id: draft.remote_id?,
        })
    }

    const fn state(self) -> SyncState {
        match self {
            Self::Synced { .. } => SyncState::Synced,
            Self::Abandoned => SyncState::Abandoned,
        }
    }
}

/// Per-draft bookkeeping
///
/// Live tracks are dropped once the draft settles; only the small
/// `Settled` record stays behind.
#[derive(Default)]
struct Ledger {
    live: HashMap<LocalId, Track>,
    settled: HashMap<LocalId, Settled>,
}

impl Ledger {
    fn state_of(&self, local_id: LocalId) -> Option<SyncState> {
        self.inner.ledger.lock().state_of(local_id)
    }

    fn is_abandoned(&self, local_id: LocalId) -> bool {
        self.state_of(local_id) == Some(SyncState::Abandoned)
    }

    fn settled(&self, local_id: LocalId) -> Option<Settled> {
        self.inner.ledger.lock().settled.get(&local_id).copied()
    }

    /// Single-flight lock and cancellation token of a live draft
    fn flight(
        &self,
        local_id: LocalId,
    ) -> Result<(Arc<tokio::sync::Mutex<()>>, CancellationToken), Settled> {
        let mut ledger = self.inner.ledger.lock();
        if let Some(settled) = ledger.settled.get(&local_id) {
            return Err(*settled);
        }
        let track = ledger
            .live
            .entry(local_id)
            .or_insert_with(|| Track::new(&self.inner.shutdown));
        Ok((Arc::clone(&track.flight), track.cancel.clone()))
    }

    fn set_state(&self, local_id: LocalId, next: SyncState) -> Result<(), ApplicationError> {
        let mut ledger = self.inner.ledger.lock();
        if let Some(settled) = ledger.settled.get(&local_id) {
            if settled.state() != next {
                settled.state().transition(next)?;
            }
            return Ok(());
        }
        let track = ledger
            .live
            .entry(local_id)
            .or_insert_with(|| Track::new(&self.inner.shutdown));
        if track.state != next {
            let previous = track.state;
            track.state = previous.transition(next)?;
            debug!(%local_id, from = %previous, to = %next, "Sync state changed");
        }
        Ok(())
    }

    /// Move a draft to its terminal state and drop its live track
    fn settle(&self, local_id: LocalId, settled: Settled) -> Result<(), ApplicationError> {
        let mut ledger = self.inner.ledger.lock();
        let current = ledger.state_of(local_id).unwrap_or(SyncState::LocalOnly);
        current.transition(settled.state())?;
        if let Some(track) = ledger.live.remove(&local_id) {
            track.cancel.cancel();
        }
        ledger.settled.insert(local_id, settled);
        debug!(%local_id, from = %current, to = %settled.state(), "Draft settled");
        Ok(())
    }

    /// Adopt a draft the cache already knows to be synced
    fn restore_synced(&self, draft: &Draft) {
        if let Some(settled) = Settled::from_synced(draft) {
            let mut ledger = self.inner.ledger.lock();
            ledger.live.remove(&draft.local_id);
            ledger.settled.insert(draft.local_id, settled);
        }
    }

    /// Result of finalizing a draft that already settled
    fn settled_outcome(
        mut draft: Draft,
        settled: Settled,
    ) -> Result<FinalizeOutcome, ApplicationError> {
        match settled {
            Settled::Abandoned => Err(ApplicationError::Abandoned(draft.local_id.to_string())),
            Settled::Synced {
                sequence_number,
                remote_id,
            } => {
                debug!(local_id = %draft.local_id, "Draft already synced, returning stored result");
                draft.assign_sequence(sequence_number)?;
                draft.mark_synced(remote_id)?;
                Ok(FinalizeOutcome::Synced(draft))
            },
        }
    }

    // ------------------------------------------------------------------
    // Saving
    // ------------------------------------------------------------------

    /// Start a new draft in the author's branch and year
    #[instrument(
        skip(self, ctx, content),
        fields(branch = %ctx.branch_id(), year = ctx.year(), request_id = %ctx.request_id())
    )]
    pub async fn create_draft(
        &self,
        ctx: &AuthorContext,
        content: LetterContent,
    ) -> Result<Draft, ApplicationError> {
        let code = self.inner.directory.lookup(ctx.branch_id()).await?;
        let scope = NumberingScope::new(code, ctx.year())?;
        let stored = self.inner.local.put(Draft::new(scope, content)).await?;
        info!(local_id = %stored.local_id, "Draft created");
        Ok(stored)
    }

    async fn save(&self, mut draft: Draft) -> Result<Draft, ApplicationError> {
        let local_id = draft.local_id;
        match self.state_of(local_id) {
            Some(SyncState::Abandoned) => {
                return Err(ApplicationError::Abandoned(local_id.to_string()));
            },
            Some(SyncState::Synced) => {
                return Err(ApplicationError::InvalidOperation(format!(
                    "draft {local_id} is already finalized"
                )));
            },
            Some(state) if state.is_in_flight() => {
                return Err(ApplicationError::InvalidOperation(format!(
                    "draft {local_id} is being submitted"
                )));
            },
            _ => {},
        }

        if let Some(existing) = self.inner.local.get(local_id).await? {
            if existing.is_synced() {
                return Err(ApplicationError::InvalidOperation(format!(
                    "draft {local_id} is already finalized"
                )));
            }
            if draft.sequence_number.is_none() {
                draft.sequence_number = existing.sequence_number;
            }
            // An editor copy must not turn a queued letter back into a draft
            if existing.awaits_sync() && !draft.is_completed() {
                debug!(%local_id, "Draft is queued for submission, keeping it completed");
                draft = draft.completed();
            }
        }
        let stored = self.inner.local.put(draft).await?;
        if self.is_abandoned(local_id) {
            return Err(self.discard(local_id).await);
        }
        Ok(stored)
    }

    /// Write the draft to the local cache now
    #[instrument(skip(self, draft), fields(local_id = %draft.local_id))]
    pub async fn manual_save(&self, draft: Draft) -> Result<Draft, ApplicationError> {
        self.save(draft).await
    }

    /// Best-effort background save; failures are logged, never surfaced
    pub async fn autosave(&self, draft: Draft) -> Option<Draft> {
        let local_id = draft.local_id;
        match self.save(draft).await {
            Ok(stored) => {
                debug!(%local_id, "Autosaved draft");
                Some(stored)
            },
            Err(e) => {
                warn!(%local_id, error = %e, "Autosave skipped");
                None
            },
        }
    }

    /// Autosave `draft` on a timer and after significant edits
    pub fn start_autosave(&self, draft: Draft) -> AutosaveSession {
        AutosaveSession::spawn(self.clone(), draft, self.inner.config.autosave.clone())
    }

    // ------------------------------------------------------------------
    // Finalizing
    // ------------------------------------------------------------------

    /// Finalize a completed draft
    ///
    /// Validation happens before any I/O: an incomplete draft is rejected
    /// with [`ApplicationError::Validation`] and the cache is left alone.
    /// While offline the draft is queued and `Queued` is returned.
    ///
    /// # Errors
    ///
    /// - [`ApplicationError::Validation`] for incomplete drafts
    /// - [`ApplicationError::RetriesExhausted`] when transient failures
    ///   outlast the retry budget; the draft stays pending locally
    /// - [`ApplicationError::Abandoned`] if the draft was abandoned
    #[instrument(skip(self, draft), fields(local_id = %draft.local_id))]
    pub async fn finalize(&self, mut draft: Draft) -> Result<FinalizeOutcome, ApplicationError> {
        draft.validate_for_finalize().map_err(validation_error)?;
        let local_id = draft.local_id;

        let (flight, cancel) = match self.flight(local_id) {
            Ok(flight) => flight,
            Err(settled) => return Self::settled_outcome(draft, settled),
        };

        let _guard = flight.lock().await;
        if let Some(settled) = self.settled(local_id) {
            return Self::settled_outcome(draft, settled);
        }

        if let Some(existing) = self.inner.local.get(local_id).await? {
            if existing.is_synced() {
                self.restore_synced(&existing);
                return Ok(FinalizeOutcome::Synced(existing));
            }
            if draft.sequence_number.is_none() {
                draft.sequence_number = existing.sequence_number;
            }
        }

        let stored = self.inner.local.put(draft).await?;
        // Abandoned while the cache was busy: undo the write
        if self.is_abandoned(local_id) {
            return Err(self.discard(local_id).await);
        }
        self.push(stored, &cancel).await
    }

    /// Retry a pending draft from the cache
    #[instrument(skip(self))]
    pub async fn retry(&self, local_id: LocalId) -> Result<FinalizeOutcome, ApplicationError> {
        let draft = self
            .inner
            .local
            .get(local_id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("draft {local_id}")))?;
        if draft.is_synced() {
            self.restore_synced(&draft);
            return Ok(FinalizeOutcome::Synced(draft));
        }
        self.finalize(draft).await
    }

    async fn push(
        &self,
        mut draft: Draft,
        cancel: &CancellationToken,
    ) -> Result<FinalizeOutcome, ApplicationError> {
        let local_id = draft.local_id;
        let submitted = self.submit(&mut draft, cancel).await;
        if submitted.is_err() && self.is_abandoned(local_id) {
            return Err(self.discard(local_id).await);
        }
        match submitted {
            Ok(()) => self.complete(draft).await,
            Err(Interrupt::Offline) => self.queue(draft).await,
            Err(Interrupt::Cancelled) => {
                debug!(%local_id, "Submission stopped by shutdown");
                if self.set_state(local_id, SyncState::LocalOnly).is_err() {
                    return Err(self.discard(local_id).await);
                }
                Ok(FinalizeOutcome::Queued(draft))
            },
            Err(Interrupt::Failed { attempts, error }) => self.fail(local_id, attempts, error),
        }
    }

    async fn retrying<T, F, Fut>(&self, cancel: &CancellationToken, op: F) -> Result<T, Interrupt>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApplicationError>>,
    {
        let Some(attempt) = with_retry_until_cancelled(&self.inner.retry, cancel, op).await else {
            return Err(Interrupt::Cancelled);
        };
        let attempts = attempt.attempts;
        attempt.result.map_err(|error| match error {
            ApplicationError::Offline(_) => Interrupt::Offline,
            error => Interrupt::Failed { attempts, error },
        })
    }

    async fn submit(&self, draft: &mut Draft, cancel: &CancellationToken) -> Result<(), Interrupt> {
        let local_id = draft.local_id;
        let remote = &self.inner.remote;
        if remote.is_offline() {
            return Err(Interrupt::Offline);
        }

        self.set_state(local_id, SyncState::Allocating)?;
        if draft.sequence_number.is_none() {
            let scope = draft.scope.clone();
            let number = self
                .retrying(cancel, || remote.allocate(&scope, local_id))
                .await?;
            if cancel.is_cancelled() {
                return Err(Interrupt::Cancelled);
            }
            draft.assign_sequence(number)?;
            // Persist the number so a crash before submission reuses it
            *draft = self.inner.local.put(draft.clone()).await?;
        }
        let Some(sequence_number) = draft.sequence_number else {
            return Err(ApplicationError::Internal("sequence number missing after allocation".into()).into());
        };

        self.set_state(local_id, SyncState::Submitting)?;
        let letter = NewLetter {
            scope: draft.scope.clone(),
            sequence_number,
            content: draft.content.clone(),
        };
        let outcome = self
            .retrying(cancel, || remote.submit(&letter, local_id))
            .await?;
        if !outcome.was_created() {
            info!(%local_id, remote_id = %outcome.remote_id(), "Letter was already stored");
        }
        draft.mark_synced(outcome.remote_id())?;
        Ok(())
    }

    async fn complete(&self, draft: Draft) -> Result<FinalizeOutcome, ApplicationError> {
        let local_id = draft.local_id;
        let reference = draft
            .reference()
            .map_or_else(|| local_id.to_string(), |r| r.to_string());

        let settled = Settled::from_synced(&draft).ok_or_else(|| {
            ApplicationError::Internal(format!("draft {local_id} completed without a remote id"))
        })?;
        if let Err(e) = self.settle(local_id, settled) {
            warn!(%local_id, %reference, error = %e, "Letter stored after the draft was abandoned");
            self.discard(local_id).await;
            return Err(ApplicationError::Abandoned(format!(
                "{local_id} (already stored as {reference})"
            )));
        }

        // The letter is stored; a stale cache entry only causes an
        // idempotent resubmission later
        let cleanup = if self.inner.config.retain_synced {
            self.inner.local.put(draft.clone()).await.map(|_| ())
        } else {
            self.inner.local.delete(local_id).await.map(|_| ())
        };
        if let Err(e) = cleanup {
            warn!(%local_id, error = %e, "Could not update cache after sync");
        }

        info!(%local_id, %reference, "Letter synced");
        self.inner.notifier.publish(
            Notification::success(format!("Letter {reference} saved")).for_draft(local_id),
        );
        Ok(FinalizeOutcome::Synced(draft))
    }

    /// Drop whatever a cancelled submission left in the cache
    async fn discard(&self, local_id: LocalId) -> ApplicationError {
        if let Err(e) = self.inner.local.delete(local_id).await {
            warn!(%local_id, error = %e, "Could not remove abandoned draft");
        }
        ApplicationError::Abandoned(local_id.to_string())
    }

    async fn queue(&self, draft: Draft) -> Result<FinalizeOutcome, ApplicationError> {
        let local_id = draft.local_id;
        if self.set_state(local_id, SyncState::LocalOnly).is_err() {
            return Err(self.discard(local_id).await);
        }
        info!(%local_id, "Repository offline, letter queued");
        self.inner.notifier.publish(
            Notification::warning(
                "You are offline. The letter is saved on this device and will be submitted \
                 when the connection returns.",
            )
            .for_draft(local_id),
        );
        Ok(FinalizeOutcome::Queued(draft))
    }

    fn fail(
        &self,
        local_id: LocalId,
        attempts: u32,
        error: ApplicationError,
    ) -> Result<FinalizeOutcome, ApplicationError> {
        if let Err(e) = self.set_state(local_id, SyncState::Failed) {
            warn!(%local_id, error = %e, "Could not record failed state");
        }
        let (message, error) = if error.is_retryable() {
            (
                format!(
                    "The letter could not be submitted after {attempts} attempts. \
                     It is kept on this device; retry when ready."
                ),
                ApplicationError::RetriesExhausted {
                    attempts,
                    last_error: error.to_string(),
                },
            )
        } else {
            (format!("The letter could not be submitted: {error}"), error)
        };
        self.inner
            .notifier
            .publish(Notification::error(message).for_draft(local_id).actionable());
        Err(error)
    }

    // ------------------------------------------------------------------
    // Queries, abandon, resync
    // ------------------------------------------------------------------

    /// Current state of a draft
    pub async fn sync_status(&self, local_id: LocalId) -> Result<SyncState, ApplicationError> {
        if let Some(state) = self.state_of(local_id) {
            return Ok(state);
        }
        match self.inner.local.get(local_id).await? {
            Some(draft) if draft.is_synced() => Ok(SyncState::Synced),
            Some(_) => Ok(SyncState::LocalOnly),
            None => Err(ApplicationError::NotFound(format!("draft {local_id}"))),
        }
    }

    /// Discard a draft, cancelling any pending retries
    ///
    /// Abandoning a draft whose number was already reserved leaves a gap in
    /// the sequence.
    #[instrument(skip(self))]
    pub async fn abandon(&self, local_id: LocalId) -> Result<(), ApplicationError> {
        let cached = self.inner.local.get(local_id).await?;
        if cached.as_ref().is_some_and(Draft::is_synced) {
            return Err(ApplicationError::InvalidOperation(format!(
                "draft {local_id} is already finalized"
            )));
        }
        if cached.is_none() && self.state_of(local_id).is_none() {
            return Err(ApplicationError::NotFound(format!("draft {local_id}")));
        }

        match self.settled(local_id) {
            Some(Settled::Abandoned) => return Ok(()),
            Some(Settled::Synced { .. }) => {
                return Err(ApplicationError::InvalidOperation(format!(
                    "draft {local_id} is already finalized"
                )));
            },
            // Cancels the track's token, stopping any retries in flight
            None => self.settle(local_id, Settled::Abandoned)?,
        }

        self.inner.local.delete(local_id).await?;
        info!(%local_id, "Draft abandoned");
        Ok(())
    }

    /// Submit every completed, pending draft, oldest first
    ///
    /// Run at startup to recover from crashes and whenever the repository
    /// becomes reachable again.
    #[instrument(skip(self))]
    pub async fn resync_pending(&self) -> Result<ResyncReport, ApplicationError> {
        let mut report = ResyncReport::default();
        let candidates: Vec<Draft> = self
            .inner
            .local
            .list()
            .await?
            .into_iter()
            .filter(Draft::awaits_sync)
            .collect();

        for draft in candidates {
            let local_id = draft.local_id;
            if matches!(self.state_of(local_id), Some(s) if s.is_terminal() || s.is_in_flight()) {
                continue;
            }
            if self.is_offline() {
                report.queued.push(local_id);
                continue;
            }
            match self.finalize(draft).await {
                Ok(FinalizeOutcome::Synced(_)) => report.synced.push(local_id),
                Ok(FinalizeOutcome::Queued(_)) => report.queued.push(local_id),
                Err(e) => report.failed.push((local_id, e.to_string())),
            }
        }

        if !report.is_empty() {
            info!(
                synced = report.synced.len(),
                queued = report.queued.len(),
                failed = report.failed.len(),
                "Resync pass finished"
            );
        }
        Ok(report)
    }

    /// React to connectivity transitions until `cancel` fires
    ///
    /// Going offline raises a warning; coming back online runs
    /// [`resync_pending`](Self::resync_pending).
    pub fn spawn_reconnect_watcher(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let coordinator = self.clone();
        let mut signal = self.monitor().subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    changed = signal.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let now = *signal.borrow_and_update();
                        coordinator.on_connectivity(now).await;
                    }
                }
            }
            debug!("Reconnect watcher stopped");
        })
    }

    async fn on_connectivity(&self, now: Connectivity) {
        match now {
            Connectivity::Offline => {
                self.inner.notifier.publish(Notification::warning(
                    "Connection to the letter repository lost. Finalized letters will be \
                     submitted when it returns.",
                ));
            },
            Connectivity::Online => {
                if let Err(e) = self.resync_pending().await {
                    warn!(error = %e, "Resync after reconnect failed");
                }
            },
        }
    }
}
