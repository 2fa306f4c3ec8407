//! Client error type and HTTP status mapping

use reqwest::{Response, StatusCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Flare(#[from] flare::FlareError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid API key")]
    Authentication,

    #[error("Bad query: {0}")]
    BadQuery(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Something went wrong (status {0})")]
    Server(u16),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Response is missing the `{0}` header")]
    MissingHeader(&'static str),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Pass successful responses through; map everything else to an error.
pub(crate) async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if !status.is_client_error() && !status.is_server_error() {
        return Ok(resp);
    }

    let path = resp.url().path().to_string();
    log::warn!("{} {}", status.as_u16(), path);

    match status {
        StatusCode::UNAUTHORIZED => Err(ClientError::Authentication),
        StatusCode::BAD_REQUEST => Err(ClientError::BadQuery(message(resp).await)),
        StatusCode::NOT_FOUND => Err(ClientError::NotFound(path)),
        s if s.is_server_error() => Err(ClientError::Server(s.as_u16())),
        s => Err(ClientError::Api {
            status: s.as_u16(),
            message: message(resp).await,
        }),
    }
}

/// Error text from a failed response: the body's `message` field when it is
/// JSON, the raw body otherwise.
pub(crate) async fn message(resp: Response) -> String {
    let text = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(body) => match body.get("message").and_then(|m| m.as_str()) {
            Some(m) => m.to_string(),
            None => text,
        },
        Err(_) => text,
    }
}
