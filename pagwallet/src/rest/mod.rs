pub mod endpoints;

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, WalletError};
use crate::types::ErrorResponse;

/// HTTP client wrapper for the wallet's authentication backend.
#[derive(Debug, Clone)]
pub struct BackendHttpClient {
    client: Client,
    base_url: String,
}

impl BackendHttpClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build a client whose requests give up after `timeout`.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// GET a JSON resource, optionally token-authenticated.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, "GET");
        let request = authorize(self.client.get(&url), token);
        Self::read_json(request).await
    }

    /// POST a JSON body, optionally token-authenticated.
    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, "POST");
        let request = authorize(self.client.post(&url).json(body), token);
        Self::read_json(request).await
    }

    async fn read_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
        let resp = request.send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(WalletError::Http { status, message });
        }

        resp.json::<T>().await.map_err(WalletError::Request)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn authorize(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.header("Authorization", format!("Token {token}")),
        None => request,
    }
}
