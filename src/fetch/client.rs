use async_trait::async_trait;
use reqwest::{Request, Response};

/// The seam every outbound call goes through, so auth can be layered on.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
