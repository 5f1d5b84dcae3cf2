use crate::fetch::client::HttpClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that injects an API key as an HTTP header.
///
/// The header is validated once at construction, so sending never fails on
/// a malformed key.
#[derive(Clone)]
pub struct ApiKey<C> {
    inner: C,
    header_name: HeaderName,
    value: HeaderValue,
}

impl<C> ApiKey<C> {
    pub fn new(inner: C, header_name: &str, key: &str) -> Result<Self> {
        let header_name = HeaderName::from_bytes(header_name.as_bytes())
            .with_context(|| format!("invalid header name '{header_name}'"))?;
        let mut value = HeaderValue::from_str(key).context("API key is not a valid header value")?;
        value.set_sensitive(true);
        Ok(Self {
            inner,
            header_name,
            value,
        })
    }

    /// GitHub's personal access token form: `Authorization: token <key>`.
    pub fn github_token(inner: C, token: &str) -> Result<Self> {
        Self::new(inner, AUTHORIZATION.as_str(), &format!("token {token}"))
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut()
            .insert(self.header_name.clone(), self.value.clone());
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;

    #[test]
    fn test_rejects_invalid_header_name() {
        let client = BasicClient::new().unwrap();
        assert!(ApiKey::new(client, "bad header", "k").is_err());
    }

    #[test]
    fn test_rejects_key_with_newline() {
        let client = BasicClient::new().unwrap();
        assert!(ApiKey::github_token(client, "abc\ndef").is_err());
    }

    #[tokio::test]
    async fn test_github_token_header_is_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ping")
            .match_header("authorization", "token s3cret")
            .with_status(200)
            .create_async()
            .await;

        let client = ApiKey::github_token(BasicClient::new().unwrap(), "s3cret").unwrap();
        let req = reqwest::Request::new(
            reqwest::Method::GET,
            format!("{}/ping", server.url()).parse().unwrap(),
        );
        let resp = client.execute(req).await.unwrap();

        assert!(resp.status().is_success());
        mock.assert_async().await;
    }
}
