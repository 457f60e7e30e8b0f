use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// HTTP adapter bound to the API base origin.
///
/// Requests carry no authentication and rely on reqwest's default timeouts;
/// failures are returned to the caller without retrying.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
}

impl ApiClient {
    /// Creates a client for `base_url`.
    ///
    /// The base path is treated as a directory, so `http://host/api` and
    /// `http://host/api/` both resolve `departamentos` to `/api/departamentos`.
    pub fn new(mut base_url: Url, http: Client) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Issues a request without a body and decodes the JSON response.
    pub async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        let request = self.request(Method::GET, path)?;
        read_json(request.send().await?).await
    }

    /// Issues a request with a JSON body and decodes the JSON response.
    pub async fn send_json<B>(&self, method: Method, path: &str, body: &B) -> Result<Value, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let request = self.request(method, path)?.json(body);
        read_json(request.send().await?).await
    }

    /// Issues a DELETE and discards the response body.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, path)?;
        ensure_success(request.send().await?).await?;
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.base_url.join(path)?;
        debug!(stage = "api", method = %method, %url, "sending request");
        Ok(self.http.request(method, url))
    }
}

/// Errors produced by the API adapter.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to build url: {0}")]
    Url(#[from] url::ParseError),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("unexpected response shape: {0}")]
    Shape(String),
}

impl ApiError {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Url(_) => "url",
            Self::Transport(_) => "transport",
            Self::Status { .. } => "status",
            Self::Shape(_) => "shape",
        }
    }
}

async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<unavailable>"));
        warn!(stage = "api", status = status.as_u16(), "request rejected");
        return Err(ApiError::Status { status, body });
    }
    Ok(response)
}

async fn read_json(response: Response) -> Result<Value, ApiError> {
    let response = ensure_success(response).await?;
    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|err| ApiError::Shape(format!("body is not json: {err}")))
}
