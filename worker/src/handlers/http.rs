//! HTTP handler posting mutations to a remote store.

use super::{HandlerError, MutationHandler, Outcome};
use async_trait::async_trait;
use outbox_engine::Mutation;
use reqwest::StatusCode;
use std::time::Duration;

/// Header carrying the mutation id so the remote can deduplicate replays.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Map a remote response status to a replay outcome.
///
/// Only an explicit success counts as applied. Conflict-type statuses mean
/// the remote state moved on; everything else is worth retrying.
pub fn classify_status(status: StatusCode) -> Outcome {
    if status.is_success() {
        return Outcome::Applied;
    }
    match status {
        StatusCode::CONFLICT | StatusCode::GONE | StatusCode::PRECONDITION_FAILED => {
            Outcome::Conflict
        }
        _ => Outcome::TransientFailure,
    }
}

/// Posts every mutation as JSON to `{base_url}/mutations`.
#[derive(Debug, Clone)]
pub struct HttpHandler {
    client: reqwest::Client,
    endpoint: String,
    timeout: Option<Duration>,
}

impl HttpHandler {
    /// Build a handler whose requests time out after `timeout`; `None` never times out.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, HandlerError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            endpoint: format!("{}/mutations", base_url.trim_end_matches('/')),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[async_trait]
impl MutationHandler for HttpHandler {
    async fn apply(&self, mutation: &Mutation) -> Result<Outcome, HandlerError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(IDEMPOTENCY_HEADER, &mutation.id)
            .json(mutation)
            .send()
            .await?;

        let status = response.status();
        let outcome = classify_status(status);
        if outcome != Outcome::Applied {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(
                mutation_id = %mutation.id,
                status = status.as_u16(),
                outcome = ?outcome,
                "Remote store declined mutation: {}",
                body.trim()
            );
        }

        Ok(outcome)
    }
}
