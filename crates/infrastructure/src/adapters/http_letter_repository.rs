//! HTTP letter repository adapter - Implements LetterRepositoryPort against
//! a remote `letterdesk-server`

use std::time::Duration;

use application::{
    error::ApplicationError,
    ports::{InsertOutcome, LetterRepositoryPort, ReservationOutcome},
};
use async_trait::async_trait;
use domain::{
    FinalizedLetter, LocalId, NewLetter, NumberingScope, Reservation, SequenceNumber,
};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::wire::{
    ErrorBody, IDEMPOTENCY_KEY_HEADER, InsertResponse, MaxResponse, ReserveRequest,
};

/// Configuration for the HTTP letter repository
#[derive(Debug, Clone)]
pub struct HttpLetterRepositoryConfig {
    /// Base URL of the letter server
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for HttpLetterRepositoryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Letter repository reached over HTTP
///
/// Transport failures, timeouts and 5xx answers are reported as
/// [`ApplicationError::Connectivity`] so the sync coordinator retries or
/// queues them.
#[derive(Debug, Clone)]
pub struct HttpLetterRepository {
    client: Client,
    base_url: String,
}

impl HttpLetterRepository {
    /// Create with custom configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to initialize.
    pub fn new(config: HttpLetterRepositoryConfig) -> Result<Self, ApplicationError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApplicationError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn map_transport_error(e: &reqwest::Error) -> ApplicationError {
    if e.is_timeout() {
        ApplicationError::Connectivity(format!("Letter server timed out: {e}"))
    } else if e.is_connect() || e.is_request() {
        ApplicationError::Connectivity(format!("Letter server unreachable: {e}"))
    } else if e.is_decode() {
        ApplicationError::Internal(format!("Unexpected letter server response: {e}"))
    } else {
        ApplicationError::Connectivity(format!("Letter server request failed: {e}"))
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApplicationError> {
    response.json::<T>().await.map_err(|e| map_transport_error(&e))
}

/// Map a status the caller did not expect
async fn unexpected(response: Response) -> ApplicationError {
    let status = response.status();
    let detail = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.to_string(),
    };

    match status {
        s if s.is_server_error() => {
            ApplicationError::Connectivity(format!("Letter server error ({s}): {detail}"))
        },
        StatusCode::BAD_REQUEST => ApplicationError::Validation(detail),
        StatusCode::NOT_FOUND => ApplicationError::NotFound(detail),
        StatusCode::UNPROCESSABLE_ENTITY => ApplicationError::InvalidOperation(detail),
        s => ApplicationError::Internal(format!("Unexpected letter server status {s}: {detail}")),
    }
}

#[async_trait]
impl LetterRepositoryPort for HttpLetterRepository {
    #[instrument(skip(self), fields(scope = %scope))]
    async fn query_max(
        &self,
        scope: &NumberingScope,
    ) -> Result<Option<SequenceNumber>, ApplicationError> {
        let response = self
            .client
            .get(self.url(&format!(
                "/v1/scopes/{}/{}/max",
                scope.branch_code(),
                scope.year()
            )))
            .send()
            .await
            .map_err(|e| map_transport_error(&e))?;

        if response.status() != StatusCode::OK {
            return Err(unexpected(response).await);
        }
        let body: MaxResponse = decode(response).await?;
        Ok(body.max)
    }

    #[instrument(skip(self), fields(scope = %scope, number = %number, key = %key))]
    async fn reserve(
        &self,
        scope: &NumberingScope,
        number: SequenceNumber,
        key: LocalId,
    ) -> Result<ReservationOutcome, ApplicationError> {
        let response = self
            .client
            .post(self.url("/v1/reservations"))
            .json(&ReserveRequest::new(scope, number, key))
            .send()
            .await
            .map_err(|e| map_transport_error(&e))?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::CONFLICT => {
                let outcome: ReservationOutcome = decode(response).await?;
                debug!(?outcome, "Reservation answered");
                Ok(outcome)
            },
            _ => Err(unexpected(response).await),
        }
    }

    #[instrument(skip(self))]
    async fn find_reservation(
        &self,
        key: LocalId,
    ) -> Result<Option<Reservation>, ApplicationError> {
        let response = self
            .client
            .get(self.url(&format!("/v1/reservations/{key}")))
            .send()
            .await
            .map_err(|e| map_transport_error(&e))?;

        match response.status() {
            StatusCode::OK => decode(response).await.map(Some),
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(unexpected(response).await),
        }
    }

    #[instrument(skip(self, letter), fields(reference = %letter.reference(), key = %key))]
    async fn insert(
        &self,
        letter: &NewLetter,
        key: LocalId,
    ) -> Result<InsertOutcome, ApplicationError> {
        let response = self
            .client
            .post(self.url("/v1/letters"))
            .header(IDEMPOTENCY_KEY_HEADER, key.to_string())
            .json(letter)
            .send()
            .await
            .map_err(|e| map_transport_error(&e))?;

        match response.status() {
            StatusCode::CREATED => {
                let body: InsertResponse = decode(response).await?;
                Ok(InsertOutcome::Created(body.remote_id))
            },
            StatusCode::CONFLICT => {
                let body: InsertResponse = decode(response).await?;
                if !body.is_already_applied() {
                    warn!(code = ?body.code, "Conflict without already_applied code");
                }
                Ok(InsertOutcome::AlreadyApplied(body.remote_id))
            },
            _ => Err(unexpected(response).await),
        }
    }

    #[instrument(skip(self))]
    async fn find_letter(
        &self,
        key: LocalId,
    ) -> Result<Option<FinalizedLetter>, ApplicationError> {
        let response = self
            .client
            .get(self.url(&format!("/v1/letters/{key}")))
            .send()
            .await
            .map_err(|e| map_transport_error(&e))?;

        match response.status() {
            StatusCode::OK => decode(response).await.map(Some),
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(unexpected(response).await),
        }
    }

    #[instrument(skip(self))]
    async fn ping(&self) -> Result<(), ApplicationError> {
        let response = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(|e| map_transport_error(&e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ApplicationError::Connectivity(format!(
                "Letter server unhealthy: {}",
                response.status()
            )))
        }
    }
}
