//! Yamal data core.
//!
//! This library answers anime queries by combining two upstream APIs:
//! the authenticated MyAnimeList API (user lists, list edits, suggestions)
//! and the public, rate-limited Jikan API (search, rankings, seasons,
//! details). Listings are exposed as lazily loaded pages.

pub mod api;
pub mod auth;
pub mod data_source;
pub mod error;
pub mod models;
pub mod paging;

pub use api::{ApiError, JikanClient, MalClient, RateLimitPolicy, RateLimiter};
pub use auth::{
    AccessToken, AuthService, BrowserLauncher, FileTokenStorage, InMemoryTokenStorage,
    PendingLogin, StdoutLauncher, TokenStorage,
};
pub use data_source::{AnimeDataSource, AnimePager, DataSourceSettings};
pub use error::DataSourceError;
pub use models::{
    AnimeDetails, CharacterEntry, GenericAnime, ListStatus, ListStatusUpdate, MediaType,
    MyListStatus, Season, TopFilter,
};
pub use paging::{PageRequest, PageResult, Pager, PagingAdapter, RemotePage};
