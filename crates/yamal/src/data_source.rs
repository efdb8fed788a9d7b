//! Anime data source.
//!
//! Answers every anime query by combining the authenticated MAL API with the
//! rate-limited Jikan API. Listings come back as lazy [`Pager`]s; everything
//! else as plain `Result`s carrying a [`DataSourceError`].

use crate::api::jikan::{CharacterRole, JikanAnime};
use crate::api::mal::MalListEntry;
use crate::api::{
    ApiError, DiscoveryApi, DiscoveryListing, JikanClient, MalApi, MalClient, RateLimitPolicy,
    RateLimiter,
};
use crate::auth::{AccessToken, TokenStorage};
use crate::error::{DataSourceError, Result};
use crate::models::{
    AnimeDetails, CharacterEntry, GenericAnime, ListStatus, ListStatusUpdate, MediaType,
    MyListStatus, Season, TopFilter,
};
use crate::paging::{PageRequest, Pager, PagingAdapter, RemotePage};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use yamal_shared::Config;

/// MAL caps `limit` at 100 for list endpoints
const MAL_MAX_PAGE_SIZE: u32 = 100;

/// Jikan caps `limit` at 25
const JIKAN_MAX_PAGE_SIZE: u32 = 25;

pub type AnimePager = Pager<GenericAnime, DataSourceError>;

/// Paging and enrichment settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceSettings {
    pub discovery_page_size: u32,
    pub user_list_page_size: u32,
    pub enrich_user_list: bool,
}

impl Default for DataSourceSettings {
    fn default() -> Self {
        Self {
            discovery_page_size: JIKAN_MAX_PAGE_SIZE,
            user_list_page_size: 25,
            enrich_user_list: true,
        }
    }
}

impl From<&Config> for DataSourceSettings {
    fn from(config: &Config) -> Self {
        Self {
            discovery_page_size: config.jikan.page_size.clamp(1, JIKAN_MAX_PAGE_SIZE),
            user_list_page_size: config.mal.page_size.clamp(1, MAL_MAX_PAGE_SIZE),
            enrich_user_list: config.mal.enrich_user_list,
        }
    }
}

/// The discovery client together with the limiter that gates it
#[derive(Clone)]
struct Discovery {
    client: Arc<dyn DiscoveryApi>,
    limiter: Arc<RateLimiter>,
}

impl Discovery {
    async fn list(
        &self,
        listing: &DiscoveryListing,
        request: PageRequest,
    ) -> Result<RemotePage<JikanAnime>> {
        self.limiter.acquire().await;
        let response = self
            .client
            .list_anime(listing, request.page_number(), request.page_size)
            .await;

        match response {
            Ok(response) => Ok(RemotePage {
                items: response.data,
                has_previous: response.pagination.current_page > 1,
                has_next: response.pagination.has_next_page,
            }),
            Err(e) => Err(self.map_error(e, None).await),
        }
    }

    async fn anime(&self, id: u64) -> Result<JikanAnime> {
        self.limiter.acquire().await;
        match self.client.anime_full(id).await {
            Ok(anime) => Ok(anime),
            Err(e) => Err(self.map_error(e, Some(id)).await),
        }
    }

    async fn characters(&self, id: u64) -> Result<Vec<CharacterRole>> {
        self.limiter.acquire().await;
        match self.client.anime_characters(id).await {
            Ok(characters) => Ok(characters),
            Err(e) => Err(self.map_error(e, Some(id)).await),
        }
    }

    /// A 429 also puts the limiter into cool-down
    async fn map_error(&self, err: ApiError, id: Option<u64>) -> DataSourceError {
        if err.is_rate_limited() {
            self.limiter
                .report_rate_limited(err.retry_after_seconds())
                .await;
        }
        DataSourceError::from_api(err, id)
    }

    /// Best effort: entries that fail to enrich keep their list fields
    async fn enrich(&self, items: &mut [GenericAnime]) {
        for item in items.iter_mut().filter(|item| needs_enrichment(item)) {
            match self.anime(item.id).await {
                Ok(anime) => item.fill_missing_from(&anime.into_generic()),
                Err(e) => {
                    warn!(mal_id = item.id, error = %e, "Enrichment failed, keeping list fields");
                }
            }
        }
    }
}

fn needs_enrichment(anime: &GenericAnime) -> bool {
    anime.main_picture.is_empty()
        || anime.media_type == MediaType::Unknown
        || anime.rank.is_none()
        || anime.mean.is_none()
        || anime.num_list_users.is_none()
        || anime.num_episodes.is_none()
}

async fn current_token(tokens: &dyn TokenStorage) -> Option<AccessToken> {
    tokens
        .get_access_token()
        .await
        .filter(|token| !token.is_expired(Utc::now()))
}

/// Unified anime queries over the primary and discovery APIs
#[derive(Clone)]
pub struct AnimeDataSource {
    primary: Arc<dyn MalApi>,
    discovery: Discovery,
    tokens: Arc<dyn TokenStorage>,
    settings: DataSourceSettings,
}

impl AnimeDataSource {
    /// Create a data source
    ///
    /// The limiter gates every discovery call; the primary API is not rate
    /// limited.
    pub fn new(
        primary: Arc<dyn MalApi>,
        discovery: Arc<dyn DiscoveryApi>,
        limiter: Arc<RateLimiter>,
        tokens: Arc<dyn TokenStorage>,
        settings: DataSourceSettings,
    ) -> Self {
        Self {
            primary,
            discovery: Discovery {
                client: discovery,
                limiter,
            },
            tokens,
            settings,
        }
    }

    /// Build both HTTP clients and the limiter from configuration
    pub fn from_config(
        config: &Config,
        tokens: Arc<dyn TokenStorage>,
    ) -> std::result::Result<Self, ApiError> {
        let primary = MalClient::from_config(config)?;
        let discovery = JikanClient::from_config(config)?;
        let limiter = RateLimiter::new(RateLimitPolicy::from(&config.jikan.rate_limit));

        Ok(Self::new(
            Arc::new(primary),
            Arc::new(discovery),
            Arc::new(limiter),
            tokens,
            DataSourceSettings::from(config),
        ))
    }

    /// Whether a usable (present, unexpired) token is stored
    pub async fn is_authenticated(&self) -> bool {
        current_token(self.tokens.as_ref()).await.is_some()
    }

    async fn require_token(&self) -> Result<AccessToken> {
        current_token(self.tokens.as_ref())
            .await
            .ok_or(DataSourceError::Unauthorized)
    }

    // ========== Discovery listings ==========

    fn discovery_adapter(
        &self,
        listing: DiscoveryListing,
    ) -> PagingAdapter<JikanAnime, GenericAnime, DataSourceError> {
        let discovery = self.discovery.clone();
        let listing = Arc::new(listing);

        PagingAdapter::new(
            move |request| {
                let discovery = discovery.clone();
                let listing = Arc::clone(&listing);
                async move { discovery.list(&listing, request).await }
            },
            JikanAnime::into_generic,
        )
    }

    fn discovery_pager(&self, listing: DiscoveryListing) -> AnimePager {
        debug!(?listing, "Creating discovery pager");
        self.discovery_adapter(listing)
            .pager(self.settings.discovery_page_size)
    }

    /// Collect at most `limit` items from a discovery listing
    async fn discovery_bounded(
        &self,
        listing: DiscoveryListing,
        limit: usize,
    ) -> Result<Vec<GenericAnime>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let page_size = (limit as u32).min(self.settings.discovery_page_size);
        let items = self
            .discovery_adapter(listing)
            .pager(page_size)
            .take_items(limit)
            .await?;

        debug!(count = items.len(), limit = limit, "Bounded listing collected");
        Ok(items)
    }

    pub fn search_anime(&self, query: &str) -> AnimePager {
        info!(query = %query, "Searching anime");
        self.discovery_pager(DiscoveryListing::Search {
            query: query.trim().to_string(),
        })
    }

    pub fn get_top_anime(
        &self,
        filter: Option<TopFilter>,
        media_type: Option<MediaType>,
    ) -> AnimePager {
        self.discovery_pager(DiscoveryListing::Top { filter, media_type })
    }

    pub fn get_seasonal_anime(&self, year: i32, season: Season) -> AnimePager {
        self.discovery_pager(DiscoveryListing::Season { year, season })
    }

    pub fn get_current_season_anime(&self) -> AnimePager {
        self.discovery_pager(DiscoveryListing::SeasonNow)
    }

    pub fn get_upcoming_anime(&self) -> AnimePager {
        self.discovery_pager(DiscoveryListing::SeasonUpcoming)
    }

    /// Top airing anime
    pub async fn get_trending_anime(&self, limit: usize) -> Result<Vec<GenericAnime>> {
        self.discovery_bounded(
            DiscoveryListing::Top {
                filter: Some(TopFilter::Airing),
                media_type: None,
            },
            limit,
        )
        .await
    }

    pub async fn get_top_anime_list(&self, limit: usize) -> Result<Vec<GenericAnime>> {
        self.discovery_bounded(
            DiscoveryListing::Top {
                filter: None,
                media_type: None,
            },
            limit,
        )
        .await
    }

    pub async fn get_upcoming_anime_list(&self, limit: usize) -> Result<Vec<GenericAnime>> {
        self.discovery_bounded(
            DiscoveryListing::Top {
                filter: Some(TopFilter::Upcoming),
                media_type: None,
            },
            limit,
        )
        .await
    }

    // ========== Details ==========

    /// Discovery details, plus the user's list entry when logged in.
    ///
    /// A discovery failure fails the call; a primary failure only leaves
    /// `my_list_status` empty.
    pub async fn get_anime_details(&self, id: u64) -> Result<AnimeDetails> {
        info!(mal_id = id, "Fetching anime details");
        let mut details = self.discovery.anime(id).await?.into_details();

        let Some(token) = current_token(self.tokens.as_ref()).await else {
            return Ok(details);
        };

        match self.primary.anime_list_status(&token.access_token, id).await {
            Ok(status) => {
                details.anime.my_score = status.as_ref().map(|s| s.score).filter(|&s| s > 0);
                details.anime.my_list_status = status.clone();
                details.my_list_status = status;
            }
            Err(e) => {
                warn!(mal_id = id, error = %e, "Failed to fetch list status, returning details without it");
            }
        }

        Ok(details)
    }

    pub async fn get_anime_characters(&self, id: u64) -> Result<Vec<CharacterEntry>> {
        let characters = self.discovery.characters(id).await?;
        Ok(characters.into_iter().map(CharacterEntry::from).collect())
    }

    // ========== User list ==========

    /// The user's list, optionally filtered by status.
    ///
    /// Pages fail with `Unauthorized` while no token is stored.
    pub fn get_user_anime_list(&self, status: Option<ListStatus>) -> AnimePager {
        let primary = Arc::clone(&self.primary);
        let tokens = Arc::clone(&self.tokens);
        let enrichment = self
            .settings
            .enrich_user_list
            .then(|| self.discovery.clone());

        let adapter = PagingAdapter::new(
            move |request: PageRequest| {
                let primary = Arc::clone(&primary);
                let tokens = Arc::clone(&tokens);
                let enrichment = enrichment.clone();

                async move {
                    let token = current_token(tokens.as_ref())
                        .await
                        .ok_or(DataSourceError::Unauthorized)?;

                    let page = primary
                        .user_anime_list(
                            &token.access_token,
                            status,
                            request.page_size,
                            request.offset,
                        )
                        .await?;

                    let mut items: Vec<GenericAnime> = page
                        .data
                        .into_iter()
                        .map(MalListEntry::into_generic)
                        .collect();
                    if let Some(discovery) = &enrichment {
                        discovery.enrich(&mut items).await;
                    }

                    Ok::<_, DataSourceError>(RemotePage {
                        items,
                        has_previous: page.paging.previous.is_some(),
                        has_next: page.paging.next.is_some(),
                    })
                }
            },
            |anime: GenericAnime| anime,
        );

        adapter.pager(self.settings.user_list_page_size)
    }

    pub async fn update_anime_list_status(
        &self,
        id: u64,
        update: &ListStatusUpdate,
    ) -> Result<MyListStatus> {
        let token = self.require_token().await?;
        self.primary
            .update_list_status(&token.access_token, id, update)
            .await
            .map_err(|e| DataSourceError::from_api(e, Some(id)))
    }

    pub async fn delete_anime_list_status(&self, id: u64) -> Result<()> {
        let token = self.require_token().await?;
        self.primary
            .delete_list_status(&token.access_token, id)
            .await
            .map_err(|e| DataSourceError::from_api(e, Some(id)))
    }

    /// Personalized suggestions, at most `limit` of them
    pub async fn get_anime_suggestions(&self, limit: usize) -> Result<Vec<GenericAnime>> {
        let token = self.require_token().await?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let primary = Arc::clone(&self.primary);
        let access_token = Arc::new(token.access_token);
        let adapter = PagingAdapter::new(
            move |request: PageRequest| {
                let primary = Arc::clone(&primary);
                let access_token = Arc::clone(&access_token);
                async move {
                    let page = primary
                        .suggestions(&access_token, request.page_size, request.offset)
                        .await?;
                    Ok::<_, DataSourceError>(RemotePage {
                        has_previous: page.paging.previous.is_some(),
                        has_next: page.paging.next.is_some(),
                        items: page.data,
                    })
                }
            },
            MalListEntry::into_generic,
        );

        let page_size = (limit as u32).min(MAL_MAX_PAGE_SIZE);
        adapter.pager(page_size).take_items(limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::jikan::{Pagination, PaginatedResponse};
    use crate::api::mal::{MalAnimeNode, MalPage, Paging};
    use crate::auth::InMemoryTokenStorage;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    const TOKEN: &str = "access";

    fn status_error(status: u16) -> ApiError {
        ApiError::Status {
            status,
            retry_after_seconds: None,
            body: String::new(),
        }
    }

    fn jikan_anime(id: u64, title: &str) -> JikanAnime {
        JikanAnime {
            mal_id: id,
            title: title.to_string(),
            anime_type: Some("TV".to_string()),
            rank: Some(id as u32),
            score: Some(8.0),
            members: Some(1000),
            episodes: Some(12),
            ..JikanAnime::default()
        }
    }

    fn jikan_page(items: Vec<JikanAnime>, current_page: u32, has_next_page: bool) -> PaginatedResponse<JikanAnime> {
        PaginatedResponse {
            data: items,
            pagination: Pagination {
                current_page,
                has_next_page,
                last_visible_page: if has_next_page { current_page + 1 } else { current_page },
                items: None,
            },
        }
    }

    #[derive(Default)]
    struct FakeDiscovery {
        /// Served by 1-based page number
        pages: Vec<PaginatedResponse<JikanAnime>>,
        details: HashMap<u64, JikanAnime>,
        list_error: Option<ApiError>,
        list_calls: Mutex<Vec<(DiscoveryListing, u32, u32)>>,
        detail_calls: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl DiscoveryApi for FakeDiscovery {
        async fn list_anime(
            &self,
            listing: &DiscoveryListing,
            page: u32,
            limit: u32,
        ) -> std::result::Result<PaginatedResponse<JikanAnime>, ApiError> {
            self.list_calls
                .lock()
                .unwrap()
                .push((listing.clone(), page, limit));

            if let Some(ApiError::Status {
                status,
                retry_after_seconds,
                ..
            }) = &self.list_error
            {
                return Err(ApiError::Status {
                    status: *status,
                    retry_after_seconds: *retry_after_seconds,
                    body: String::new(),
                });
            }

            self.pages
                .get(page as usize - 1)
                .cloned()
                .ok_or_else(|| status_error(404))
        }

        async fn anime_full(&self, id: u64) -> std::result::Result<JikanAnime, ApiError> {
            self.detail_calls.lock().unwrap().push(id);
            self.details.get(&id).cloned().ok_or_else(|| status_error(404))
        }

        async fn anime_characters(
            &self,
            id: u64,
        ) -> std::result::Result<Vec<CharacterRole>, ApiError> {
            if !self.details.contains_key(&id) {
                return Err(status_error(404));
            }
            Ok(serde_json::from_str(
                r#"[{ "character": { "mal_id": 17, "name": "Uzumaki, Naruto", "images": { "jpg": { "image_url": "n.jpg" } } }, "role": "Main", "favorites": 80000 }]"#,
            )
            .unwrap())
        }
    }

    #[derive(Default)]
    struct FakeMal {
        /// Served by `offset / limit`
        list_pages: Vec<MalPage<MalListEntry>>,
        statuses: HashMap<u64, MyListStatus>,
        suggestions: Vec<MalListEntry>,
        fail_status_lookup: bool,
        calls: Mutex<Vec<&'static str>>,
    }

    impl FakeMal {
        fn check(&self, token: &str, call: &'static str) -> std::result::Result<(), ApiError> {
            self.calls.lock().unwrap().push(call);
            if token == TOKEN {
                Ok(())
            } else {
                Err(status_error(401))
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MalApi for FakeMal {
        async fn user_anime_list(
            &self,
            token: &str,
            _status: Option<ListStatus>,
            limit: u32,
            offset: u32,
        ) -> std::result::Result<MalPage<MalListEntry>, ApiError> {
            self.check(token, "user_anime_list")?;
            self.list_pages
                .get((offset / limit) as usize)
                .cloned()
                .ok_or_else(|| status_error(400))
        }

        async fn anime_list_status(
            &self,
            token: &str,
            id: u64,
        ) -> std::result::Result<Option<MyListStatus>, ApiError> {
            self.check(token, "anime_list_status")?;
            if self.fail_status_lookup {
                return Err(status_error(500));
            }
            Ok(self.statuses.get(&id).cloned())
        }

        async fn update_list_status(
            &self,
            token: &str,
            _id: u64,
            update: &ListStatusUpdate,
        ) -> std::result::Result<MyListStatus, ApiError> {
            self.check(token, "update_list_status")?;
            Ok(MyListStatus {
                status: update.status,
                score: update.score.unwrap_or(0),
                num_episodes_watched: update.num_watched_episodes.unwrap_or(0),
                ..MyListStatus::default()
            })
        }

        async fn delete_list_status(
            &self,
            token: &str,
            id: u64,
        ) -> std::result::Result<(), ApiError> {
            self.check(token, "delete_list_status")?;
            if self.statuses.contains_key(&id) {
                Ok(())
            } else {
                Err(status_error(404))
            }
        }

        async fn suggestions(
            &self,
            token: &str,
            limit: u32,
            offset: u32,
        ) -> std::result::Result<MalPage<MalListEntry>, ApiError> {
            self.check(token, "suggestions")?;
            let start = (offset as usize).min(self.suggestions.len());
            let end = (start + limit as usize).min(self.suggestions.len());
            Ok(MalPage {
                data: self.suggestions[start..end].to_vec(),
                paging: Paging {
                    previous: None,
                    next: (end < self.suggestions.len()).then(|| "next".to_string()),
                },
            })
        }
    }

    fn mal_entry(id: u64, title: &str, score: u8) -> MalListEntry {
        MalListEntry {
            node: MalAnimeNode {
                id,
                title: title.to_string(),
                ..MalAnimeNode::default()
            },
            list_status: Some(MyListStatus {
                status: Some(ListStatus::Watching),
                score,
                ..MyListStatus::default()
            }),
        }
    }

    fn access_token(expired: bool) -> AccessToken {
        let offset = chrono::Duration::hours(1);
        AccessToken {
            access_token: TOKEN.to_string(),
            refresh_token: None,
            token_type: "Bearer".to_string(),
            expires_at: Some(if expired {
                Utc::now() - offset
            } else {
                Utc::now() + offset
            }),
        }
    }

    struct Fixture {
        source: AnimeDataSource,
        primary: Arc<FakeMal>,
        discovery: Arc<FakeDiscovery>,
        limiter: Arc<RateLimiter>,
    }

    fn fixture(primary: FakeMal, discovery: FakeDiscovery, token: Option<AccessToken>) -> Fixture {
        let primary = Arc::new(primary);
        let discovery = Arc::new(discovery);
        let limiter = Arc::new(RateLimiter::default());
        let tokens = Arc::new(match token {
            Some(token) => InMemoryTokenStorage::with_token(token),
            None => InMemoryTokenStorage::new(),
        });

        let source = AnimeDataSource::new(
            primary.clone(),
            discovery.clone(),
            limiter.clone(),
            tokens,
            DataSourceSettings::default(),
        );

        Fixture {
            source,
            primary,
            discovery,
            limiter,
        }
    }

    #[tokio::test]
    async fn test_search_walks_two_pages() {
        let discovery = FakeDiscovery {
            pages: vec![
                jikan_page(
                    vec![jikan_anime(20, "Naruto"), jikan_anime(1735, "Naruto: Shippuuden")],
                    1,
                    true,
                ),
                jikan_page(vec![jikan_anime(442, "Naruto Movie 1")], 2, false),
            ],
            ..FakeDiscovery::default()
        };
        let fx = fixture(FakeMal::default(), discovery, None);

        let mut pager = fx.source.search_anime("naruto");
        let mut titles = Vec::new();
        while let Some(page) = pager.next_page().await {
            titles.extend(page.unwrap().items.into_iter().map(|a| a.title));
        }

        assert_eq!(
            titles,
            vec!["Naruto", "Naruto: Shippuuden", "Naruto Movie 1"]
        );

        let calls = fx.discovery.list_calls.lock().unwrap().clone();
        let query = DiscoveryListing::Search {
            query: "naruto".to_string(),
        };
        assert_eq!(calls, vec![(query.clone(), 1, 25), (query, 2, 25)]);
        assert_eq!(fx.limiter.total_admitted().await, 2);
    }

    #[tokio::test]
    async fn test_listing_error_is_a_page_error() {
        let discovery = FakeDiscovery {
            list_error: Some(status_error(500)),
            ..FakeDiscovery::default()
        };
        let fx = fixture(FakeMal::default(), discovery, None);

        let mut pager = fx.source.get_current_season_anime();
        let page = pager.next_page().await.unwrap();

        assert!(matches!(page, Err(DataSourceError::Unknown { .. })));
        assert!(!pager.is_exhausted());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_listing_starts_cooldown() {
        let discovery = FakeDiscovery {
            list_error: Some(ApiError::Status {
                status: 429,
                retry_after_seconds: Some(2),
                body: String::new(),
            }),
            ..FakeDiscovery::default()
        };
        let fx = fixture(FakeMal::default(), discovery, None);

        let page = fx.source.get_top_anime(None, None).next_page().await.unwrap();

        assert!(matches!(
            page,
            Err(DataSourceError::RateLimited {
                retry_after_seconds: Some(2)
            })
        ));
        assert_eq!(fx.limiter.cooldown_remaining().await, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_details_without_login() {
        let discovery = FakeDiscovery {
            details: HashMap::from([(20, jikan_anime(20, "Naruto"))]),
            ..FakeDiscovery::default()
        };
        let fx = fixture(FakeMal::default(), discovery, None);

        let details = fx.source.get_anime_details(20).await.unwrap();

        assert_eq!(details.anime.title, "Naruto");
        assert!(details.my_list_status.is_none());
        assert!(fx.primary.calls().is_empty());
    }

    #[tokio::test]
    async fn test_details_merge_list_status() {
        let status = MyListStatus {
            status: Some(ListStatus::Completed),
            score: 9,
            num_episodes_watched: 12,
            ..MyListStatus::default()
        };
        let primary = FakeMal {
            statuses: HashMap::from([(20, status.clone())]),
            ..FakeMal::default()
        };
        let discovery = FakeDiscovery {
            details: HashMap::from([(20, jikan_anime(20, "Naruto"))]),
            ..FakeDiscovery::default()
        };
        let fx = fixture(primary, discovery, Some(access_token(false)));

        let details = fx.source.get_anime_details(20).await.unwrap();

        assert_eq!(details.my_list_status, Some(status));
        assert_eq!(details.anime.my_score, Some(9));
    }

    #[tokio::test]
    async fn test_details_survive_primary_failure() {
        let primary = FakeMal {
            fail_status_lookup: true,
            ..FakeMal::default()
        };
        let discovery = FakeDiscovery {
            details: HashMap::from([(20, jikan_anime(20, "Naruto"))]),
            ..FakeDiscovery::default()
        };
        let fx = fixture(primary, discovery, Some(access_token(false)));

        let details = fx.source.get_anime_details(20).await.unwrap();

        assert!(details.my_list_status.is_none());
        assert_eq!(fx.primary.calls(), vec!["anime_list_status"]);
    }

    #[tokio::test]
    async fn test_details_not_found() {
        let fx = fixture(FakeMal::default(), FakeDiscovery::default(), Some(access_token(false)));

        let result = fx.source.get_anime_details(99).await;

        assert!(matches!(result, Err(DataSourceError::NotFound { id: 99 })));
        assert!(fx.primary.calls().is_empty());
    }

    #[tokio::test]
    async fn test_characters() {
        let discovery = FakeDiscovery {
            details: HashMap::from([(20, jikan_anime(20, "Naruto"))]),
            ..FakeDiscovery::default()
        };
        let fx = fixture(FakeMal::default(), discovery, None);

        let characters = fx.source.get_anime_characters(20).await.unwrap();
        assert_eq!(characters.len(), 1);
        assert_eq!(characters[0].name, "Uzumaki, Naruto");
        assert_eq!(characters[0].image_url.as_deref(), Some("n.jpg"));

        assert!(matches!(
            fx.source.get_anime_characters(1).await,
            Err(DataSourceError::NotFound { id: 1 })
        ));
    }

    #[tokio::test]
    async fn test_user_list_enrichment_degrades_per_item() {
        let primary = FakeMal {
            list_pages: vec![MalPage {
                data: vec![mal_entry(20, "Naruto", 8), mal_entry(404, "Missing", 0)],
                paging: Paging::default(),
            }],
            ..FakeMal::default()
        };
        let discovery = FakeDiscovery {
            details: HashMap::from([(20, jikan_anime(20, "Naruto"))]),
            ..FakeDiscovery::default()
        };
        let fx = fixture(primary, discovery, Some(access_token(false)));

        let page = fx
            .source
            .get_user_anime_list(Some(ListStatus::Watching))
            .next_page()
            .await
            .unwrap()
            .unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.next_key, None);

        let naruto = &page.items[0];
        assert_eq!(naruto.my_score, Some(8));
        assert_eq!(naruto.rank, Some(20));
        assert_eq!(naruto.media_type, MediaType::Tv);

        let missing = &page.items[1];
        assert_eq!(missing.title, "Missing");
        assert_eq!(missing.rank, None);
        assert_eq!(missing.my_score, None);

        assert_eq!(*fx.discovery.detail_calls.lock().unwrap(), vec![20, 404]);
    }

    #[tokio::test]
    async fn test_user_list_pages_by_offset() {
        let primary = FakeMal {
            list_pages: vec![
                MalPage {
                    data: vec![mal_entry(1, "One", 0)],
                    paging: Paging {
                        previous: None,
                        next: Some("next".to_string()),
                    },
                },
                MalPage {
                    data: vec![mal_entry(2, "Two", 0)],
                    paging: Paging {
                        previous: Some("prev".to_string()),
                        next: None,
                    },
                },
            ],
            ..FakeMal::default()
        };
        let fx = fixture(primary, FakeDiscovery::default(), Some(access_token(false)));
        let source = AnimeDataSource {
            settings: DataSourceSettings {
                user_list_page_size: 1,
                enrich_user_list: false,
                ..DataSourceSettings::default()
            },
            ..fx.source.clone()
        };

        let items = source.get_user_anime_list(None).take_items(10).await.unwrap();

        assert_eq!(items.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1, 2]);
        assert!(fx.discovery.detail_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_user_list_requires_login() {
        let fx = fixture(FakeMal::default(), FakeDiscovery::default(), None);

        let page = fx.source.get_user_anime_list(None).next_page().await.unwrap();

        assert!(matches!(page, Err(DataSourceError::Unauthorized)));
        assert!(fx.primary.calls().is_empty());
    }

    #[tokio::test]
    async fn test_expired_token_is_not_a_login() {
        let fx = fixture(FakeMal::default(), FakeDiscovery::default(), Some(access_token(true)));

        assert!(!fx.source.is_authenticated().await);
        assert!(matches!(
            fx.source.delete_anime_list_status(20).await,
            Err(DataSourceError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_list_mutations() {
        let primary = FakeMal {
            statuses: HashMap::from([(20, MyListStatus::default())]),
            ..FakeMal::default()
        };
        let fx = fixture(primary, FakeDiscovery::default(), Some(access_token(false)));

        let update = ListStatusUpdate {
            status: Some(ListStatus::Completed),
            score: Some(10),
            ..ListStatusUpdate::default()
        };
        let updated = fx.source.update_anime_list_status(20, &update).await.unwrap();
        assert_eq!(updated.status, Some(ListStatus::Completed));
        assert_eq!(updated.score, 10);

        assert!(fx.source.delete_anime_list_status(20).await.is_ok());
        assert!(matches!(
            fx.source.delete_anime_list_status(21).await,
            Err(DataSourceError::NotFound { id: 21 })
        ));
    }

    #[tokio::test]
    async fn test_mutations_require_login() {
        let fx = fixture(FakeMal::default(), FakeDiscovery::default(), None);

        let result = fx
            .source
            .update_anime_list_status(20, &ListStatusUpdate::default())
            .await;

        assert!(matches!(result, Err(DataSourceError::Unauthorized)));
        assert!(matches!(
            fx.source.get_anime_suggestions(5).await,
            Err(DataSourceError::Unauthorized)
        ));
        assert!(fx.primary.calls().is_empty());
    }

    #[tokio::test]
    async fn test_suggestions_capped() {
        let primary = FakeMal {
            suggestions: (1..=8).map(|id| mal_entry(id, "Suggested", 0)).collect(),
            ..FakeMal::default()
        };
        let fx = fixture(primary, FakeDiscovery::default(), Some(access_token(false)));

        let items = fx.source.get_anime_suggestions(5).await.unwrap();

        assert_eq!(items.len(), 5);
        assert_eq!(fx.primary.calls(), vec!["suggestions"]);
    }

    #[tokio::test]
    async fn test_bounded_list_spans_pages() {
        let page = |n: u64| -> Vec<JikanAnime> {
            (0..25).map(|i| jikan_anime(n * 100 + i, "Top")).collect()
        };
        let discovery = FakeDiscovery {
            pages: vec![jikan_page(page(1), 1, true), jikan_page(page(2), 2, true)],
            ..FakeDiscovery::default()
        };
        let fx = fixture(FakeMal::default(), discovery, None);

        let items = fx.source.get_top_anime_list(30).await.unwrap();

        assert_eq!(items.len(), 30);
        assert_eq!(items[25].id, 200);
        assert_eq!(fx.discovery.list_calls.lock().unwrap().len(), 2);
        assert_eq!(fx.limiter.total_admitted().await, 2);
    }

    #[tokio::test]
    async fn test_bounded_list_small_limit() {
        let discovery = FakeDiscovery {
            pages: vec![jikan_page(
                vec![jikan_anime(1, "A"), jikan_anime(2, "B"), jikan_anime(3, "C")],
                1,
                true,
            )],
            ..FakeDiscovery::default()
        };
        let fx = fixture(FakeMal::default(), discovery, None);

        let items = fx.source.get_trending_anime(3).await.unwrap();
        assert_eq!(items.len(), 3);

        let calls = fx.discovery.list_calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![(
                DiscoveryListing::Top {
                    filter: Some(TopFilter::Airing),
                    media_type: None
                },
                1,
                3
            )]
        );

        assert!(fx.source.get_upcoming_anime_list(0).await.unwrap().is_empty());
    }
}
