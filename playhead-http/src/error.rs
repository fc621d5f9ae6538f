use playhead_contracts::error::RemoteError;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Reasons an HTTP adapter could not be constructed.
#[derive(Debug, Error)]
pub enum ClientBuildError {
    #[error("no base URL configured")]
    MissingBaseUrl,

    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("header '{name}' has an unusable value")]
    InvalidHeader { name: &'static str },

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

pub(crate) fn transport_error(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Timeout
    } else if err.is_decode() {
        RemoteError::Decode(err.to_string())
    } else {
        RemoteError::Unreachable(err.to_string())
    }
}

/// Map a non-success response to the shared remote error taxonomy.
pub(crate) async fn status_error(response: Response) -> RemoteError {
    let status = response.status();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            RemoteError::Unauthenticated
        }
        StatusCode::NOT_FOUND => {
            RemoteError::NotFound(response.url().path().to_string())
        }
        _ => {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            RemoteError::Status {
                status: status.as_u16(),
                message,
            }
        }
    }
}

pub(crate) async fn expect_success(response: Response) -> Result<(), RemoteError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(status_error(response).await)
    }
}

pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
) -> Result<T, RemoteError> {
    if !response.status().is_success() {
        return Err(status_error(response).await);
    }
    response
        .json::<T>()
        .await
        .map_err(|err| RemoteError::Decode(err.to_string()))
}

/// Trim whitespace and a trailing slash, defaulting to `http://` when the
/// scheme is missing.
pub(crate) fn normalize_base_url(raw: &str) -> Result<String, ClientBuildError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ClientBuildError::MissingBaseUrl);
    }
    let with_scheme =
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("http://{trimmed}")
        };
    if with_scheme != raw {
        tracing::debug!(from = raw, to = %with_scheme, "normalized base URL");
    }
    url::Url::parse(&with_scheme)
        .map_err(|_| ClientBuildError::InvalidBaseUrl(raw.to_string()))?;
    Ok(with_scheme)
}
