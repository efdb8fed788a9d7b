//! MyAnimeList API v2 (primary API) client implementation.
//!
//! Every call here needs a bearer token obtained through the OAuth2 PKCE
//! flow; list mutations and suggestions only exist on this API.

pub mod client;
pub mod types;

pub use client::MalClient;
pub use types::*;

use crate::api::error::ApiError;
use crate::models::{ListStatus, ListStatusUpdate, MyListStatus};
use async_trait::async_trait;

/// Authenticated list and suggestion operations
#[async_trait]
pub trait MalApi: Send + Sync {
    /// One page of the user's list, optionally filtered by status
    async fn user_anime_list(
        &self,
        token: &str,
        status: Option<ListStatus>,
        limit: u32,
        offset: u32,
    ) -> Result<MalPage<MalListEntry>, ApiError>;

    /// The user's entry for one anime, `None` when it is not on their list
    async fn anime_list_status(&self, token: &str, id: u64)
        -> Result<Option<MyListStatus>, ApiError>;

    async fn update_list_status(
        &self,
        token: &str,
        id: u64,
        update: &ListStatusUpdate,
    ) -> Result<MyListStatus, ApiError>;

    async fn delete_list_status(&self, token: &str, id: u64) -> Result<(), ApiError>;

    /// Personalized suggestions
    async fn suggestions(
        &self,
        token: &str,
        limit: u32,
        offset: u32,
    ) -> Result<MalPage<MalListEntry>, ApiError>;
}

/// OAuth2 endpoints of the primary API
#[async_trait]
pub trait OAuthApi: Send + Sync {
    /// Authorization URL the user opens in a browser
    fn authorize_url(&self, code_challenge: &str, state: &str) -> String;

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, ApiError>;

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, ApiError>;
}
