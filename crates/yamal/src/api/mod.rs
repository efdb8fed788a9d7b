//! Upstream API clients.
//!
//! This module provides the Jikan (discovery) and MyAnimeList (primary)
//! clients, the shared HTTP plumbing, and the rate limiter that gates the
//! Jikan API.

pub mod error;
pub mod http;
pub mod jikan;
pub mod mal;
pub mod rate_limiter;

pub use error::ApiError;
pub use jikan::{DiscoveryApi, DiscoveryListing, JikanClient};
pub use mal::{MalApi, MalClient, OAuthApi};
pub use rate_limiter::{RateLimitPolicy, RateLimiter};
