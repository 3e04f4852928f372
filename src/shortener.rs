use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::BitlyConfig;

/// Why a long URL could not be shortened. Only ever logged, never shown to users.
#[derive(Debug, thiserror::Error)]
pub enum ShortenError {
    #[error("shortening service returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("request to shortening service failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("failed to decode shortening response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// `Ok` holds the short URL.
pub type ShortenResult = Result<String, ShortenError>;

/// Turns an already validated long URL into a short one.
#[async_trait]
pub trait Shortener: Send + Sync {
    async fn shorten(&self, long_url: &str) -> ShortenResult;
}

#[derive(Debug, Serialize)]
struct ShortenRequest<'a> {
    long_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    domain: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_guid: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ShortenResponse {
    link: String,
}

/// Client for the Bitly v4 `shorten` endpoint.
pub struct BitlyClient {
    client: reqwest::Client,
    config: BitlyConfig,
}

impl BitlyClient {
    pub fn new(config: BitlyConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/shorten", self.config.api_base_url.trim_end_matches('/'))
    }

    async fn request(&self, long_url: &str) -> ShortenResult {
        let request = ShortenRequest {
            long_url,
            domain: self.config.domain.as_deref(),
            group_guid: self.config.group_guid.as_deref(),
        };

        let url = self.endpoint();
        debug!("Sending shorten request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_token))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(ShortenError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ShortenError::Status { status, body });
        }

        let shortened: ShortenResponse = response.json().await.map_err(ShortenError::Decode)?;
        Ok(shortened.link)
    }
}

#[async_trait]
impl Shortener for BitlyClient {
    async fn shorten(&self, long_url: &str) -> ShortenResult {
        let result = self.request(long_url).await;
        match &result {
            Ok(link) => debug!("Shortened {} to {}", long_url, link),
            Err(e @ ShortenError::Status { .. }) => {
                error!("HTTP error occurred while shortening {}: {}", long_url, e)
            }
            Err(e) => error!("Other error occurred while shortening {}: {:#}", long_url, e),
        }
        result
    }
}
