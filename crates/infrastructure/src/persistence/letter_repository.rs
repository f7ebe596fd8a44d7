//! SQLite letter repository
//!
//! The authoritative store for a single site, and the backing store of the
//! HTTP server. Numbers are claimed with `INSERT ... ON CONFLICT DO
//! NOTHING` against the reservations primary key, so two writers racing
//! for the same number cannot both win, even across processes sharing the
//! database file.

use application::{
    error::ApplicationError,
    ports::{InsertOutcome, LetterRepositoryPort, ReservationOutcome},
};
use async_trait::async_trait;
use chrono::Utc;
use domain::{
    FinalizedLetter, LocalId, NewLetter, NumberingScope, RemoteId, Reservation, SequenceNumber,
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, instrument, warn};

use super::{
    columns::{
        decode_content, decode_local_id, decode_remote_id, decode_scope, decode_sequence,
        decode_timestamp, encode_content, encode_timestamp,
    },
    error::map_repository_error,
};

#[derive(Debug, Clone)]
pub struct SqliteLetterRepository {
    pool: SqlitePool,
}

impl SqliteLetterRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Every stored letter in a scope, by number
    pub async fn letters_in(
        &self,
        scope: &NumberingScope,
    ) -> Result<Vec<FinalizedLetter>, ApplicationError> {
        let rows: Vec<LetterRow> = sqlx::query_as(&format!(
            "{SELECT_LETTER} WHERE branch_code = $1 AND year = $2 ORDER BY sequence_number"
        ))
        .bind(scope.branch_code().as_str())
        .bind(i64::from(scope.year()))
        .fetch_all(&self.pool)
        .await
        .map_err(map_repository_error)?;

        rows.into_iter().map(LetterRow::into_letter).collect()
    }
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    branch_code: String,
    year: i64,
    sequence_number: i64,
    idempotency_key: String,
    reserved_at: String,
}

impl ReservationRow {
    fn into_reservation(self) -> Result<Reservation, ApplicationError> {
        Ok(Reservation {
            scope: decode_scope(&self.branch_code, self.year)?,
            sequence_number: decode_sequence(self.sequence_number)?,
            idempotency_key: decode_local_id(&self.idempotency_key)?,
            reserved_at: decode_timestamp(&self.reserved_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LetterRow {
    remote_id: String,
    branch_code: String,
    year: i64,
    sequence_number: i64,
    content: String,
    idempotency_key: String,
    created_at: String,
}

impl LetterRow {
    fn into_letter(self) -> Result<FinalizedLetter, ApplicationError> {
        Ok(FinalizedLetter {
            remote_id: decode_remote_id(&self.remote_id)?,
            scope: decode_scope(&self.branch_code, self.year)?,
            sequence_number: decode_sequence(self.sequence_number)?,
            content: decode_content(&self.content)?,
            idempotency_key: decode_local_id(&self.idempotency_key)?,
            created_at: decode_timestamp(&self.created_at)?,
        })
    }
}

const SELECT_RESERVATION: &str = r"
    SELECT branch_code, year, sequence_number, idempotency_key, reserved_at
    FROM reservations
";

const SELECT_LETTER: &str = r"
    SELECT remote_id, branch_code, year, sequence_number, content, idempotency_key, created_at
    FROM letters
";

async fn reservation_for(
    conn: &mut SqliteConnection,
    key: LocalId,
) -> Result<Option<Reservation>, ApplicationError> {
    let row: Option<ReservationRow> =
        sqlx::query_as(&format!("{SELECT_RESERVATION} WHERE idempotency_key = $1"))
            .bind(key.to_string())
            .fetch_optional(conn)
            .await
            .map_err(map_repository_error)?;
    row.map(ReservationRow::into_reservation).transpose()
}

async fn remote_id_for(
    conn: &mut SqliteConnection,
    key: LocalId,
) -> Result<Option<RemoteId>, ApplicationError> {
    let raw: Option<String> =
        sqlx::query_scalar("SELECT remote_id FROM letters WHERE idempotency_key = $1")
            .bind(key.to_string())
            .fetch_optional(conn)
            .await
            .map_err(map_repository_error)?;
    raw.as_deref().map(decode_remote_id).transpose()
}

#[async_trait]
impl LetterRepositoryPort for SqliteLetterRepository {
    #[instrument(skip(self), fields(scope = %scope))]
    async fn query_max(
        &self,
        scope: &NumberingScope,
    ) -> Result<Option<SequenceNumber>, ApplicationError> {
        let max: Option<i64> = sqlx::query_scalar(
            r"
            SELECT MAX(n) FROM (
                SELECT sequence_number AS n FROM reservations WHERE branch_code = $1 AND year = $2
                UNION ALL
                SELECT sequence_number AS n FROM letters WHERE branch_code = $1 AND year = $2
            )
            ",
        )
        .bind(scope.branch_code().as_str())
        .bind(i64::from(scope.year()))
        .fetch_one(&self.pool)
        .await
        .map_err(map_repository_error)?;

        max.map(decode_sequence).transpose()
    }

    #[instrument(skip(self), fields(scope = %scope, number = %number, key = %key))]
    async fn reserve(
        &self,
        scope: &NumberingScope,
        number: SequenceNumber,
        key: LocalId,
    ) -> Result<ReservationOutcome, ApplicationError> {
        let mut conn = self.pool.acquire().await.map_err(map_repository_error)?;

        if let Some(held) = reservation_for(&mut conn, key).await? {
            debug!(held = %held.sequence_number, "Key already holds a reservation");
            return Ok(ReservationOutcome::Held {
                sequence_number: held.sequence_number,
            });
        }

        let inserted = sqlx::query(
            r"
            INSERT INTO reservations (branch_code, year, sequence_number, idempotency_key, reserved_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(scope.branch_code().as_str())
        .bind(i64::from(scope.year()))
        .bind(i64::from(number))
        .bind(key.to_string())
        .bind(encode_timestamp(Utc::now()))
        .execute(&mut *conn)
        .await
        .map_err(map_repository_error)?
        .rows_affected();

        if inserted == 1 {
            return Ok(ReservationOutcome::Reserved);
        }

        // Either the number is taken or the same key won a concurrent race
        match reservation_for(&mut conn, key).await? {
            Some(held) => Ok(ReservationOutcome::Held {
                sequence_number: held.sequence_number,
            }),
            None => Ok(ReservationOutcome::Taken),
        }
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn find_reservation(
        &self,
        key: LocalId,
    ) -> Result<Option<Reservation>, ApplicationError> {
        let mut conn = self.pool.acquire().await.map_err(map_repository_error)?;
        reservation_for(&mut conn, key).await
    }

    #[instrument(skip(self, letter), fields(reference = %letter.reference(), key = %key))]
    async fn insert(
        &self,
        letter: &NewLetter,
        key: LocalId,
    ) -> Result<InsertOutcome, ApplicationError> {
        let mut tx = self.pool.begin().await.map_err(map_repository_error)?;

        if let Some(existing) = remote_id_for(&mut tx, key).await? {
            debug!(remote_id = %existing, "Letter already stored for key");
            return Ok(InsertOutcome::AlreadyApplied(existing));
        }

        let Some(reservation) = reservation_for(&mut tx, key).await? else {
            return Err(ApplicationError::InvalidOperation(format!(
                "no reservation held by {key}"
            )));
        };
        if reservation.scope != letter.scope || reservation.sequence_number != letter.sequence_number
        {
            return Err(ApplicationError::InvalidOperation(format!(
                "{key} holds {}, not {}",
                reservation.reference(),
                letter.reference()
            )));
        }

        let remote_id = RemoteId::new();
        let result = sqlx::query(
            r"
            INSERT INTO letters (remote_id, branch_code, year, sequence_number, subject,
                                 recipient, content, idempotency_key, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(remote_id.to_string())
        .bind(letter.scope.branch_code().as_str())
        .bind(i64::from(letter.scope.year()))
        .bind(i64::from(letter.sequence_number))
        .bind(&letter.content.subject)
        .bind(&letter.content.recipient)
        .bind(encode_content(&letter.content)?)
        .bind(key.to_string())
        .bind(encode_timestamp(Utc::now()))
        .execute(&mut *tx)
        .await;

        match result {
            Ok(_) => {
                tx.commit().await.map_err(map_repository_error)?;
                info!(%remote_id, "Letter stored");
                Ok(InsertOutcome::Created(remote_id))
            },
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                // A concurrent insert with the same key committed first
                drop(tx);
                warn!(error = %db_err, "Insert raced with another writer");
                let mut conn = self.pool.acquire().await.map_err(map_repository_error)?;
                remote_id_for(&mut conn, key)
                    .await?
                    .map(InsertOutcome::AlreadyApplied)
                    .ok_or_else(|| {
                        ApplicationError::Internal(format!(
                            "{} is stored under another key",
                            letter.reference()
                        ))
                    })
            },
            Err(e) => Err(map_repository_error(e)),
        }
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn find_letter(&self, key: LocalId) -> Result<Option<FinalizedLetter>, ApplicationError> {
        let row: Option<LetterRow> =
            sqlx::query_as(&format!("{SELECT_LETTER} WHERE idempotency_key = $1"))
                .bind(key.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_repository_error)?;
        row.map(LetterRow::into_letter).transpose()
    }

    async fn ping(&self) -> Result<(), ApplicationError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_repository_error)?;
        Ok(())
    }
}
