//! SQLite draft cache
//!
//! Implements the `DraftCachePort` on the client-local database. Each `put`
//! is a single upsert statement, so a crash leaves either the previous or
//! the new version of a draft, never a mix.

use application::{error::ApplicationError, ports::DraftCachePort};
use async_trait::async_trait;
use chrono::Utc;
use domain::{Draft, DraftStatus, LocalId, SyncStatus};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::{
    columns::{
        decode_content, decode_local_id, decode_remote_id, decode_scope, decode_sequence,
        decode_timestamp, encode_content, encode_timestamp,
    },
    error::{corrupt_row, map_sqlx_error},
};

/// Durable draft cache backed by SQLite
#[derive(Debug, Clone)]
pub struct SqliteDraftCache {
    pool: SqlitePool,
}

impl SqliteDraftCache {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct DraftRow {
    local_id: String,
    remote_id: Option<String>,
    branch_code: String,
    year: i64,
    sequence_number: Option<i64>,
    content: String,
    status: String,
    sync_status: String,
    last_saved: String,
}

impl DraftRow {
    fn into_draft(self) -> Result<Draft, ApplicationError> {
        Ok(Draft {
            local_id: decode_local_id(&self.local_id)?,
            remote_id: self.remote_id.as_deref().map(decode_remote_id).transpose()?,
            scope: decode_scope(&self.branch_code, self.year)?,
            sequence_number: self.sequence_number.map(decode_sequence).transpose()?,
            content: decode_content(&self.content)?,
            status: self
                .status
                .parse::<DraftStatus>()
                .map_err(|e| corrupt_row("draft", e))?,
            sync_status: self
                .sync_status
                .parse::<SyncStatus>()
                .map_err(|e| corrupt_row("draft", e))?,
            last_saved: decode_timestamp(&self.last_saved)?,
        })
    }
}

const SELECT_DRAFT: &str = r"
    SELECT local_id, remote_id, branch_code, year, sequence_number, content,
           status, sync_status, last_saved
    FROM drafts
";

#[async_trait]
impl DraftCachePort for SqliteDraftCache {
    #[instrument(skip(self, draft), fields(local_id = %draft.local_id))]
    async fn put(&self, draft: Draft) -> Result<Draft, ApplicationError> {
        let stored = draft.prepared_for_cache(Utc::now())?;

        sqlx::query(
            r"
            INSERT INTO drafts (local_id, remote_id, branch_code, year, sequence_number,
                                content, status, sync_status, last_saved)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT(local_id) DO UPDATE SET
                remote_id = excluded.remote_id,
                branch_code = excluded.branch_code,
                year = excluded.year,
                sequence_number = excluded.sequence_number,
                content = excluded.content,
                status = excluded.status,
                sync_status = excluded.sync_status,
                last_saved = excluded.last_saved
            ",
        )
        .bind(stored.local_id.to_string())
        .bind(stored.remote_id.map(|id| id.to_string()))
        .bind(stored.scope.branch_code().as_str())
        .bind(i64::from(stored.scope.year()))
        .bind(stored.sequence_number.map(i64::from))
        .bind(encode_content(&stored.content)?)
        .bind(stored.status.as_str())
        .bind(stored.sync_status.as_str())
        .bind(encode_timestamp(stored.last_saved))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        debug!(sync_status = %stored.sync_status, "Draft cached");
        Ok(stored)
    }

    #[instrument(skip(self))]
    async fn get(&self, local_id: LocalId) -> Result<Option<Draft>, ApplicationError> {
        let row: Option<DraftRow> = sqlx::query_as(&format!("{SELECT_DRAFT} WHERE local_id = $1"))
            .bind(local_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(DraftRow::into_draft).transpose()
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Draft>, ApplicationError> {
        let rows: Vec<DraftRow> =
            sqlx::query_as(&format!("{SELECT_DRAFT} ORDER BY last_saved ASC, local_id ASC"))
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        debug!(count = rows.len(), "Listed cached drafts");
        rows.into_iter().map(DraftRow::into_draft).collect()
    }

    #[instrument(skip(self))]
    async fn delete(&self, local_id: LocalId) -> Result<bool, ApplicationError> {
        let result = sqlx::query("DELETE FROM drafts WHERE local_id = $1")
            .bind(local_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let deleted = result.rows_affected() > 0;
        debug!(deleted, "Deleted cached draft");
        Ok(deleted)
    }
}
