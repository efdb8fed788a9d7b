//! MyAnimeList API v2 response types.

use crate::models::{parse_date, GenericAnime, MediaType, MyListStatus, Picture};
use serde::{Deserialize, Serialize};

/// Offset-paginated wrapper: `{ data: [...], paging: { previous, next } }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MalPage<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub paging: Paging,
}

/// Links to the neighbouring pages, absent at either end
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Paging {
    pub previous: Option<String>,
    pub next: Option<String>,
}

/// List element: the anime node plus the user's entry when requested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MalListEntry {
    pub node: MalAnimeNode,
    #[serde(default)]
    pub list_status: Option<MyListStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MalAnimeNode {
    pub id: u64,
    pub title: String,
    pub main_picture: Option<MalPicture>,
    pub rank: Option<u32>,
    pub num_list_users: Option<u32>,
    pub mean: Option<f64>,
    pub media_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub num_episodes: Option<u32>,
    pub my_list_status: Option<MyListStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MalPicture {
    pub medium: Option<String>,
    pub large: Option<String>,
}

/// OAuth2 token endpoint response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub token_type: String,
}

impl MalAnimeNode {
    pub fn into_generic(self) -> GenericAnime {
        let my_score = self
            .my_list_status
            .as_ref()
            .map(|s| s.score)
            .filter(|&score| score > 0);

        GenericAnime {
            id: self.id,
            main_picture: self
                .main_picture
                .map(|p| Picture {
                    medium: p.medium,
                    large: p.large,
                })
                .unwrap_or_default(),
            rank: self.rank,
            num_list_users: self.num_list_users,
            mean: self.mean,
            media_type: self
                .media_type
                .as_deref()
                .map(MediaType::parse)
                .unwrap_or_default(),
            my_score,
            start_date: self.start_date.as_deref().and_then(parse_date),
            end_date: self.end_date.as_deref().and_then(parse_date),
            num_episodes: self.num_episodes.filter(|&n| n > 0),
            my_list_status: self.my_list_status,
            title: self.title,
        }
    }
}

impl MalListEntry {
    /// Project into the unified model, carrying the list entry along
    pub fn into_generic(self) -> GenericAnime {
        let mut anime = self.node.into_generic();
        if let Some(status) = self.list_status {
            anime.my_score = Some(status.score).filter(|&score| score > 0);
            anime.my_list_status = Some(status);
        }
        anime
    }
}
