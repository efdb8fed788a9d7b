//! HTTP plumbing shared by the Jikan and MAL clients.

use super::error::ApiError;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use yamal_shared::config::HttpConfig;

/// Build a `reqwest` client with finite timeouts
pub fn build_client(config: &HttpConfig) -> Result<Client, ApiError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .user_agent(config.user_agent.as_str())
        .build()?;
    Ok(client)
}

/// Send a request and parse a JSON body from a successful response
pub async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
    let response = send(request).await?;
    let body = response.text().await.map_err(map_transport)?;
    let data = serde_json::from_str(&body)?;
    Ok(data)
}

/// Send a request whose successful response carries no body of interest
pub async fn send_empty(request: RequestBuilder) -> Result<(), ApiError> {
    send(request).await?;
    Ok(())
}

async fn send(request: RequestBuilder) -> Result<Response, ApiError> {
    let response = request.send().await.map_err(map_transport)?;
    let status = response.status();
    let url = response.url().clone();

    if status.is_success() {
        debug!(url = %url, status = %status, "Request successful");
        return Ok(response);
    }

    let retry_after_seconds = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_retry_after);

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    warn!(
        url = %url,
        status = %status,
        error = %body,
        "Request failed"
    );

    Err(ApiError::Status {
        status: status.as_u16(),
        retry_after_seconds,
        body,
    })
}

fn map_transport(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else if e.is_decode() {
        ApiError::Decode {
            message: e.to_string(),
        }
    } else {
        ApiError::Transport(e)
    }
}

/// Retry-After in delta-seconds form; HTTP dates are ignored
fn parse_retry_after(value: &str) -> Option<u64> {
    value.trim().parse().ok()
}
