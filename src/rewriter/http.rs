//! Shared HTTP plumbing for remote rewriters.

use std::time::Duration;

use reqwest::{header, Client, Response, StatusCode};
use serde::Serialize;

use crate::error::{ServiceError, ServiceResult};

/// Seconds to wait when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Build a client with the per-call timeout applied.
pub(crate) fn client(timeout: Duration) -> ServiceResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ServiceError::NotConfigured(format!("failed to build HTTP client: {}", e)))
}

/// POST `body` as JSON and return the raw success body.
pub(crate) async fn post_json<B: Serialize + ?Sized>(
    client: &Client,
    url: &str,
    bearer: Option<&str>,
    body: &B,
    backend: &str,
    timeout: Duration,
) -> ServiceResult<String> {
    let mut request = client
        .post(url)
        .header(header::CONTENT_TYPE, "application/json")
        .json(body);
    if let Some(token) = bearer {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let response = request
        .send()
        .await
        .map_err(|e| transport_error(e, timeout))?;
    read_body(response, backend, timeout).await
}

/// GET `url` and return the raw success body.
pub(crate) async fn get(
    client: &Client,
    url: &str,
    backend: &str,
    timeout: Duration,
) -> ServiceResult<String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| transport_error(e, timeout))?;
    read_body(response, backend, timeout).await
}

async fn read_body(response: Response, backend: &str, timeout: Duration) -> ServiceResult<String> {
    let status = response.status();
    if status.is_success() {
        return response.text().await.map_err(|e| transport_error(e, timeout));
    }

    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let message = response.text().await.unwrap_or_default();
    tracing::warn!(backend = %backend, status = %status, error = %message, "Rewrite service error");
    Err(status_error(status, message, retry_after, backend))
}

/// Map a non-success status to the service error taxonomy.
pub(crate) fn status_error(
    status: StatusCode,
    message: String,
    retry_after: Option<u64>,
    backend: &str,
) -> ServiceError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ServiceError::Authentication {
            backend: backend.to_string(),
            reason: if message.is_empty() {
                status.to_string()
            } else {
                message
            },
        },
        StatusCode::TOO_MANY_REQUESTS => ServiceError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        _ => ServiceError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

fn transport_error(e: reqwest::Error, timeout: Duration) -> ServiceError {
    if e.is_timeout() {
        ServiceError::Timeout(timeout.as_millis() as u64)
    } else if e.is_decode() {
        ServiceError::MalformedResponse(e.to_string())
    } else {
        ServiceError::Network(e.to_string())
    }
}
