//! In-memory letter repository with fault injection for service tests

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use domain::{
    FinalizedLetter, LetterContent, LocalId, NewLetter, NumberingScope, RemoteId, Reservation,
    SequenceNumber,
};
use parking_lot::Mutex;

use crate::{
    error::ApplicationError,
    ports::{InsertOutcome, LetterRepositoryPort, ReservationOutcome},
};

#[derive(Debug, Default)]
struct FakeState {
    reservations: Vec<Reservation>,
    letters: Vec<FinalizedLetter>,
    offline: bool,
    failing_inserts: u32,
    dropped_insert_acks: u32,
}

#[derive(Debug, Default)]
pub struct FakeLetterRepository {
    state: Mutex<FakeState>,
    calls: AtomicUsize,
}

impl FakeLetterRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a letter numbered `n` under a fresh key
    pub fn seed(&self, scope: &NumberingScope, n: u32) {
        let key = LocalId::new();
        let sequence_number = SequenceNumber::new(n).unwrap();
        let mut state = self.state.lock();
        state.reservations.push(Reservation {
            scope: scope.clone(),
            sequence_number,
            idempotency_key: key,
            reserved_at: Utc::now(),
        });
        state.letters.push(FinalizedLetter {
            remote_id: RemoteId::new(),
            scope: scope.clone(),
            sequence_number,
            content: LetterContent::new("seed", "seed", "seed"),
            idempotency_key: key,
            created_at: Utc::now(),
        });
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// The next `n` inserts fail before reaching storage
    pub fn fail_next_inserts(&self, n: u32) {
        self.state.lock().failing_inserts = n;
    }

    /// The next `n` inserts are stored but the caller sees a transport error
    pub fn drop_next_insert_acks(&self, n: u32) {
        self.state.lock().dropped_insert_acks = n;
    }

    pub fn letters(&self) -> Vec<FinalizedLetter> {
        self.state.lock().letters.clone()
    }

    pub fn letters_for(&self, key: LocalId) -> usize {
        self.state
            .lock()
            .letters
            .iter()
            .filter(|l| l.idempotency_key == key)
            .count()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> Result<(), ApplicationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.state.lock().offline {
            return Err(ApplicationError::Connectivity("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LetterRepositoryPort for FakeLetterRepository {
    async fn query_max(
        &self,
        scope: &NumberingScope,
    ) -> Result<Option<SequenceNumber>, ApplicationError> {
        self.enter().await?;
        let state = self.state.lock();
        let reserved = state
            .reservations
            .iter()
            .filter(|r| &r.scope == scope)
            .map(|r| r.sequence_number);
        let stored = state
            .letters
            .iter()
            .filter(|l| &l.scope == scope)
            .map(|l| l.sequence_number);
        Ok(reserved.chain(stored).max())
    }

    async fn reserve(
        &self,
        scope: &NumberingScope,
        number: SequenceNumber,
        key: LocalId,
    ) -> Result<ReservationOutcome, ApplicationError> {
        self.enter().await?;
        let mut state = self.state.lock();
        if let Some(held) = state.reservations.iter().find(|r| r.idempotency_key == key) {
            return Ok(ReservationOutcome::Held {
                sequence_number: held.sequence_number,
            });
        }
        let taken = state
            .reservations
            .iter()
            .any(|r| &r.scope == scope && r.sequence_number == number);
        if taken {
            return Ok(ReservationOutcome::Taken);
        }
        state.reservations.push(Reservation {
            scope: scope.clone(),
            sequence_number: number,
            idempotency_key: key,
            reserved_at: Utc::now(),
        });
        Ok(ReservationOutcome::Reserved)
    }

    async fn find_reservation(
        &self,
        key: LocalId,
    ) -> Result<Option<Reservation>, ApplicationError> {
        self.enter().await?;
        Ok(self
            .state
            .lock()
            .reservations
            .iter()
            .find(|r| r.idempotency_key == key)
            .cloned())
    }

    async fn insert(
        &self,
        letter: &NewLetter,
        key: LocalId,
    ) -> Result<InsertOutcome, ApplicationError> {
        self.enter().await?;
        let mut state = self.state.lock();
        if state.failing_inserts > 0 {
            state.failing_inserts -= 1;
            return Err(ApplicationError::Connectivity("connection reset".into()));
        }
        if let Some(existing) = state.letters.iter().find(|l| l.idempotency_key == key) {
            return Ok(InsertOutcome::AlreadyApplied(existing.remote_id));
        }
        let holds = state.reservations.iter().any(|r| {
            r.idempotency_key == key
                && r.scope == letter.scope
                && r.sequence_number == letter.sequence_number
        });
        if !holds {
            return Err(ApplicationError::InvalidOperation(format!(
                "{} is not reserved for {key}",
                letter.reference()
            )));
        }
        let remote_id = RemoteId::new();
        state.letters.push(FinalizedLetter::from_new(
            letter.clone(),
            remote_id,
            key,
            Utc::now(),
        ));
        if state.dropped_insert_acks > 0 {
            state.dropped_insert_acks -= 1;
            return Err(ApplicationError::Connectivity("response lost".into()));
        }
        Ok(InsertOutcome::Created(remote_id))
    }

    async fn find_letter(&self, key: LocalId) -> Result<Option<FinalizedLetter>, ApplicationError> {
        self.enter().await?;
        Ok(self
            .state
            .lock()
            .letters
            .iter()
            .find(|l| l.idempotency_key == key)
            .cloned())
    }

    async fn ping(&self) -> Result<(), ApplicationError> {
        self.enter().await
    }
}
