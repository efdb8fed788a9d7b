//! Jikan API v4 client.

use super::types::*;
use super::{DiscoveryApi, DiscoveryListing};
use crate::api::error::ApiError;
use crate::api::http::{build_client, send_json};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};
use yamal_shared::config::HttpConfig;
use yamal_shared::Config;

/// Jikan API v4 client
///
/// Unauthenticated; callers are expected to gate every call through the
/// shared [`RateLimiter`](crate::api::RateLimiter).
#[derive(Debug, Clone)]
pub struct JikanClient {
    /// HTTP client
    client: Client,
    /// Base URL for Jikan API
    base_url: String,
}

impl JikanClient {
    /// Create a new Jikan client
    pub fn new(base_url: impl Into<String>, http: &HttpConfig) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_client(http)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from the `[jikan]` and `[http]` config sections
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(config.jikan.base_url.clone(), &config.http)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl DiscoveryListing {
    /// Endpoint path and listing-specific query parameters
    pub fn endpoint(&self) -> (String, Vec<(&'static str, String)>) {
        match self {
            DiscoveryListing::Search { query } => {
                ("/anime".to_string(), vec![("q", query.clone())])
            }
            DiscoveryListing::Top { filter, media_type } => {
                let mut params = Vec::new();
                if let Some(filter) = filter {
                    params.push(("filter", filter.as_str().to_string()));
                }
                if let Some(media_type) = media_type {
                    params.push(("type", media_type.as_str().to_string()));
                }
                ("/top/anime".to_string(), params)
            }
            DiscoveryListing::Season { year, season } => {
                (format!("/seasons/{}/{}", year, season.as_str()), Vec::new())
            }
            DiscoveryListing::SeasonNow => ("/seasons/now".to_string(), Vec::new()),
            DiscoveryListing::SeasonUpcoming => ("/seasons/upcoming".to_string(), Vec::new()),
        }
    }
}

#[async_trait]
impl DiscoveryApi for JikanClient {
    async fn list_anime(
        &self,
        listing: &DiscoveryListing,
        page: u32,
        limit: u32,
    ) -> Result<PaginatedResponse<JikanAnime>, ApiError> {
        let (path, mut params) = listing.endpoint();
        params.push(("page", page.to_string()));
        params.push(("limit", limit.to_string()));

        info!(endpoint = %path, page = page, limit = limit, "Fetching anime listing");
        send_json(self.client.get(self.url(&path)).query(&params)).await
    }

    async fn anime_full(&self, id: u64) -> Result<JikanAnime, ApiError> {
        debug!(mal_id = id, "Fetching anime details");
        let response: DataResponse<JikanAnime> =
            send_json(self.client.get(self.url(&format!("/anime/{}/full", id)))).await?;
        Ok(response.data)
    }

    async fn anime_characters(&self, id: u64) -> Result<Vec<CharacterRole>, ApiError> {
        debug!(mal_id = id, "Fetching anime characters");
        let response: DataResponse<Vec<CharacterRole>> =
            send_json(self.client.get(self.url(&format!("/anime/{}/characters", id)))).await?;
        Ok(response.data)
    }
}
