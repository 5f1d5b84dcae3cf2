mod client;
mod basic;
pub mod auth;

pub use client::HttpClient;
pub use basic::BasicClient;

use crate::error::SourceError;
use reqwest::{Method, Request, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Builds a request for `url`, mapping a malformed URL into a [`SourceError`].
pub fn request(method: Method, url: &str) -> Result<Request, SourceError> {
    let url = Url::parse(url).map_err(|e| SourceError::InvalidUrl(format!("{url}: {e}")))?;
    Ok(Request::new(method, url))
}

/// Sends `req` and turns any non-success status into [`SourceError::Status`],
/// carrying the response body as the detail.
pub async fn send_checked<C: HttpClient>(
    client: &C,
    req: Request,
) -> Result<Response, SourceError> {
    let method = req.method().clone();
    let url = req.url().clone();

    let resp = client.execute(req).await?;
    let status = resp.status();
    debug!(%method, %url, %status, "HTTP response");

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(SourceError::Status { status, body });
    }
    Ok(resp)
}

/// Sends `req` and decodes a successful body as JSON.
pub async fn fetch_json<C: HttpClient, T: DeserializeOwned>(
    client: &C,
    req: Request,
) -> Result<T, SourceError> {
    let resp = send_checked(client, req).await?;
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
