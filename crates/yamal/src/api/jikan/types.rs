//! Jikan API v4 response types.
//!
//! These types represent the JSON responses from the Jikan API.

use crate::models::{
    parse_date, AnimeDetails, CharacterEntry, GenericAnime, MediaType, Picture, RelatedEntry,
    Season,
};
use serde::{Deserialize, Serialize};

/// Generic pagination wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// Simple data wrapper (without pagination)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub last_visible_page: u32,
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default = "first_page")]
    pub current_page: u32,
    #[serde(default)]
    pub items: Option<PaginationItems>,
}

fn first_page() -> u32 {
    1
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            last_visible_page: 1,
            has_next_page: false,
            current_page: 1,
            items: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationItems {
    pub count: u32,
    pub total: u32,
    pub per_page: u32,
}

/// Anime entry as returned by list endpoints and `/anime/{id}/full`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JikanAnime {
    pub mal_id: u64,
    pub url: Option<String>,
    pub images: AnimeImages,

    // Titles
    pub title: String,
    pub title_english: Option<String>,
    pub title_japanese: Option<String>,
    pub title_synonyms: Vec<String>,

    // Type and status
    #[serde(rename = "type")]
    pub anime_type: Option<String>,
    pub source: Option<String>,
    pub episodes: Option<u32>,
    pub status: Option<String>,
    pub airing: bool,

    // Dates
    pub aired: Aired,
    pub duration: Option<String>,
    pub rating: Option<String>,

    // Scores and rankings
    pub score: Option<f64>,
    pub scored_by: Option<u32>,
    pub rank: Option<u32>,
    pub popularity: Option<u32>,
    pub members: Option<u32>,
    pub favorites: Option<u32>,

    // Synopsis
    pub synopsis: Option<String>,
    pub background: Option<String>,

    // Season
    pub season: Option<String>,
    pub year: Option<i32>,

    pub studios: Vec<MalEntity>,
    pub genres: Vec<MalEntity>,
    pub themes: Vec<MalEntity>,

    /// Only present on the `/full` endpoint
    pub relations: Vec<Relation>,
}

/// Anime images
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimeImages {
    pub jpg: ImageSet,
    pub webp: Option<ImageSet>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSet {
    pub image_url: Option<String>,
    pub small_image_url: Option<String>,
    pub large_image_url: Option<String>,
}

/// Aired dates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Aired {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// MAL entity (genre, studio, producer, etc.)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MalEntity {
    pub mal_id: u64,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Relation group on the `/full` endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub relation: String,
    pub entry: Vec<MalEntity>,
}

/// Entry of `/anime/{id}/characters`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterRole {
    pub character: CharacterInfo,
    pub role: String,
    #[serde(default)]
    pub favorites: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterInfo {
    pub mal_id: u64,
    pub name: String,
    #[serde(default)]
    pub images: AnimeImages,
}

impl JikanAnime {
    pub fn picture(&self) -> Picture {
        Picture {
            medium: self.images.jpg.image_url.clone(),
            large: self.images.jpg.large_image_url.clone(),
        }
    }

    pub fn into_generic(self) -> GenericAnime {
        GenericAnime {
            id: self.mal_id,
            main_picture: self.picture(),
            rank: self.rank,
            num_list_users: self.members,
            mean: self.score,
            media_type: self
                .anime_type
                .as_deref()
                .map(MediaType::parse)
                .unwrap_or_default(),
            my_score: None,
            start_date: self.aired.from.as_deref().and_then(parse_date),
            end_date: self.aired.to.as_deref().and_then(parse_date),
            num_episodes: self.episodes,
            my_list_status: None,
            title: self.title,
        }
    }

    pub fn into_details(self) -> AnimeDetails {
        let season = self.season.as_deref().and_then(|s| s.parse::<Season>().ok());
        let genres = self
            .genres
            .iter()
            .chain(self.themes.iter())
            .map(|g| g.name.clone())
            .collect();
        let studios = self.studios.iter().map(|s| s.name.clone()).collect();
        let related = self
            .relations
            .iter()
            .flat_map(|group| {
                group.entry.iter().map(|entry| RelatedEntry {
                    relation: group.relation.clone(),
                    id: entry.mal_id,
                    kind: entry.entity_type.clone(),
                    title: entry.name.clone(),
                })
            })
            .collect();

        AnimeDetails {
            title_english: self.title_english.clone(),
            title_japanese: self.title_japanese.clone(),
            title_synonyms: self.title_synonyms.clone(),
            synopsis: self.synopsis.clone(),
            background: self.background.clone(),
            status: self.status.clone(),
            source: self.source.clone(),
            rating: self.rating.clone(),
            duration: self.duration.clone(),
            season,
            year: self.year,
            popularity: self.popularity,
            genres,
            studios,
            related,
            my_list_status: None,
            anime: self.into_generic(),
        }
    }
}

impl From<CharacterRole> for CharacterEntry {
    fn from(role: CharacterRole) -> Self {
        CharacterEntry {
            id: role.character.mal_id,
            name: role.character.name,
            role: role.role,
            image_url: role.character.images.jpg.image_url,
            favorites: role.favorites,
        }
    }
}
