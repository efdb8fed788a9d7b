//! Jikan API v4 (discovery API) client implementation.

pub mod client;
pub mod types;

pub use client::JikanClient;
pub use types::*;

use crate::api::error::ApiError;
use crate::models::{MediaType, Season, TopFilter};
use async_trait::async_trait;

/// Paginated listings offered by the discovery API
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryListing {
    Search { query: String },
    Top {
        filter: Option<TopFilter>,
        media_type: Option<MediaType>,
    },
    Season { year: i32, season: Season },
    SeasonNow,
    SeasonUpcoming,
}

/// Unauthenticated metadata source
#[async_trait]
pub trait DiscoveryApi: Send + Sync {
    /// Fetch one 1-based page of a listing
    async fn list_anime(
        &self,
        listing: &DiscoveryListing,
        page: u32,
        limit: u32,
    ) -> Result<PaginatedResponse<JikanAnime>, ApiError>;

    /// Fetch full details (including relations) for one anime
    async fn anime_full(&self, id: u64) -> Result<JikanAnime, ApiError>;

    /// Fetch the character list for one anime
    async fn anime_characters(&self, id: u64) -> Result<Vec<CharacterRole>, ApiError>;
}
