//! MyAnimeList API v2 client.

use super::types::*;
use super::{MalApi, OAuthApi};
use crate::api::error::ApiError;
use crate::api::http::{build_client, send_empty, send_json};
use crate::models::{ListStatus, ListStatusUpdate, MyListStatus};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use tracing::{debug, info};
use yamal_shared::config::HttpConfig;
use yamal_shared::Config;

/// Node fields requested for every list-shaped response
const NODE_FIELDS: &str =
    "id,title,main_picture,rank,num_list_users,mean,media_type,start_date,end_date,num_episodes";

/// MyAnimeList API v2 client
#[derive(Debug, Clone)]
pub struct MalClient {
    /// HTTP client
    client: Client,
    /// Base URL for the v2 API
    base_url: String,
    /// Base URL for the OAuth2 endpoints
    oauth_base_url: String,
    /// Registered client id, sent as `X-MAL-CLIENT-ID`
    client_id: String,
}

impl MalClient {
    /// Create a new MAL client
    pub fn new(
        base_url: impl Into<String>,
        oauth_base_url: impl Into<String>,
        client_id: impl Into<String>,
        http: &HttpConfig,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_client(http)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            oauth_base_url: oauth_base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
        })
    }

    /// Create a client from the `[mal]` and `[http]` config sections
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(
            config.mal.base_url.clone(),
            config.mal.oauth_base_url.clone(),
            config.mal.client_id.clone(),
            &config.http,
        )
    }

    fn list_status_url(&self, id: u64) -> String {
        format!("{}/anime/{}/my_list_status", self.base_url, id)
    }

    fn authed(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        request
            .header("X-MAL-CLIENT-ID", &self.client_id)
            .bearer_auth(token)
    }
}

#[async_trait]
impl MalApi for MalClient {
    async fn user_anime_list(
        &self,
        token: &str,
        status: Option<ListStatus>,
        limit: u32,
        offset: u32,
    ) -> Result<MalPage<MalListEntry>, ApiError> {
        info!(
            status = status.map(|s| s.as_str()).unwrap_or("all"),
            limit = limit,
            offset = offset,
            "Fetching user anime list"
        );

        let mut params = vec![
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
            ("fields", format!("list_status,{}", NODE_FIELDS)),
        ];
        if let Some(status) = status {
            params.push(("status", status.as_str().to_string()));
        }

        let url = format!("{}/users/@me/animelist", self.base_url);
        send_json(self.authed(self.client.get(url), token).query(&params)).await
    }

    async fn anime_list_status(
        &self,
        token: &str,
        id: u64,
    ) -> Result<Option<MyListStatus>, ApiError> {
        debug!(mal_id = id, "Fetching list status");
        let url = format!("{}/anime/{}", self.base_url, id);
        let node: MalAnimeNode = send_json(
            self.authed(self.client.get(url), token)
                .query(&[("fields", "my_list_status")]),
        )
        .await?;
        Ok(node.my_list_status)
    }

    async fn update_list_status(
        &self,
        token: &str,
        id: u64,
        update: &ListStatusUpdate,
    ) -> Result<MyListStatus, ApiError> {
        info!(mal_id = id, ?update, "Updating list status");
        send_json(
            self.authed(self.client.patch(self.list_status_url(id)), token)
                .form(update),
        )
        .await
    }

    async fn delete_list_status(&self, token: &str, id: u64) -> Result<(), ApiError> {
        info!(mal_id = id, "Deleting list status");
        send_empty(self.authed(self.client.delete(self.list_status_url(id)), token)).await
    }

    async fn suggestions(
        &self,
        token: &str,
        limit: u32,
        offset: u32,
    ) -> Result<MalPage<MalListEntry>, ApiError> {
        info!(limit = limit, offset = offset, "Fetching suggestions");
        let url = format!("{}/anime/suggestions", self.base_url);
        send_json(self.authed(self.client.get(url), token).query(&[
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
            ("fields", NODE_FIELDS.to_string()),
        ]))
        .await
    }
}

#[async_trait]
impl OAuthApi for MalClient {
    fn authorize_url(&self, code_challenge: &str, state: &str) -> String {
        // MAL only supports the `plain` challenge method
        format!(
            "{}/authorize?response_type=code&client_id={}&code_challenge={}&code_challenge_method=plain&state={}",
            self.oauth_base_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(code_challenge),
            urlencoding::encode(state)
        )
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, ApiError> {
        info!("Exchanging authorization code");
        let url = format!("{}/token", self.oauth_base_url);
        send_json(self.client.post(url).form(&[
            ("client_id", self.client_id.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("code_verifier", code_verifier),
        ]))
        .await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, ApiError> {
        info!("Refreshing access token");
        let url = format!("{}/token", self.oauth_base_url);
        send_json(self.client.post(url).form(&[
            ("client_id", self.client_id.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ]))
        .await
    }
}
