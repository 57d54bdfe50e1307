//! Upstream station list retrieval
//!
//! `StationSource` is the seam the collector polls; `HttpFetcher` is the production
//! implementation against the JCDecaux API. One request per call, no retry.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::{ConfigError, FetchError};

const USER_AGENT: &str = concat!("velov-beat/", env!("CARGO_PKG_VERSION"));

/// Anything that can produce a raw station-list body.
#[async_trait]
pub trait StationSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
    url: Url,
    /// Same URL with the API key masked, for logs and errors.
    display_url: String,
}

impl HttpFetcher {
    pub fn new(api: &ApiConfig) -> Result<Self, ConfigError> {
        let key = api.key.as_deref().filter(|k| !k.trim().is_empty()).ok_or(ConfigError::MissingApiKey)?;

        let mut url = api.endpoint()?;
        let mut display = url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("apiKey", key);
            if let Some(contract) = &api.contract {
                query.append_pair("contract", contract);
            }
        }
        {
            let mut query = display.query_pairs_mut();
            query.append_pair("apiKey", "***");
            if let Some(contract) = &api.contract {
                query.append_pair("contract", contract);
            }
        }

        let client = Client::builder()
            .timeout(api.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(Self { client, url, display_url: display.to_string() })
    }

    /// Full request URL, credential included.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn display_url(&self) -> &str {
        &self.display_url
    }
}

#[async_trait]
impl StationSource for HttpFetcher {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        debug!(url = %self.display_url, "requesting station data");

        // The response is dropped on every return path, releasing the connection.
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Transport { url: self.display_url.clone(), source: source.without_url() })?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!(url = %self.display_url, status = status.as_u16(), "unexpected status");
            return Err(FetchError::Status { url: self.display_url.clone(), status: status.as_u16() });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::Transport { url: self.display_url.clone(), source: source.without_url() })?;

        Ok(body.to_vec())
    }
}
