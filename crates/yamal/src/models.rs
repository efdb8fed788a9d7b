//! Unified anime models.
//!
//! Both upstream schemas (MAL's node shape and Jikan's flat shape) are
//! projected into these types before they reach callers.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Media type of an anime entry
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Tv,
    Ova,
    Movie,
    Special,
    Ona,
    Music,
    TvSpecial,
    Cm,
    Pv,
    #[default]
    Unknown,
}

impl MediaType {
    /// Parse either MAL (`tv_special`) or Jikan (`TV Special`) spellings.
    ///
    /// Anything unrecognized maps to [`MediaType::Unknown`].
    pub fn parse(value: &str) -> Self {
        let normalized = value.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "tv" => MediaType::Tv,
            "ova" => MediaType::Ova,
            "movie" => MediaType::Movie,
            "special" => MediaType::Special,
            "ona" => MediaType::Ona,
            "music" => MediaType::Music,
            "tv_special" => MediaType::TvSpecial,
            "cm" => MediaType::Cm,
            "pv" => MediaType::Pv,
            _ => MediaType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Tv => "tv",
            MediaType::Ova => "ova",
            MediaType::Movie => "movie",
            MediaType::Special => "special",
            MediaType::Ona => "ona",
            MediaType::Music => "music",
            MediaType::TvSpecial => "tv_special",
            MediaType::Cm => "cm",
            MediaType::Pv => "pv",
            MediaType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of an entry on the user's list
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ListStatus {
    Watching,
    Completed,
    OnHold,
    Dropped,
    PlanToWatch,
}

impl ListStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListStatus::Watching => "watching",
            ListStatus::Completed => "completed",
            ListStatus::OnHold => "on_hold",
            ListStatus::Dropped => "dropped",
            ListStatus::PlanToWatch => "plan_to_watch",
        }
    }
}

impl fmt::Display for ListStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "watching" => Ok(ListStatus::Watching),
            "completed" => Ok(ListStatus::Completed),
            "on_hold" => Ok(ListStatus::OnHold),
            "dropped" => Ok(ListStatus::Dropped),
            "plan_to_watch" => Ok(ListStatus::PlanToWatch),
            _ => Err(format!("Invalid list status: {}", s)),
        }
    }
}

/// Broadcast season
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    /// Season containing the given calendar month (1-12)
    pub fn of_month(month: u32) -> Self {
        match month {
            1..=3 => Season::Winter,
            4..=6 => Season::Spring,
            7..=9 => Season::Summer,
            _ => Season::Fall,
        }
    }

    /// Year and season containing the given date
    pub fn of_date(date: NaiveDate) -> (i32, Self) {
        (date.year(), Self::of_month(date.month()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "winter",
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "winter" => Ok(Season::Winter),
            "spring" => Ok(Season::Spring),
            "summer" => Ok(Season::Summer),
            "fall" | "autumn" => Ok(Season::Fall),
            _ => Err(format!("Invalid season: {}", s)),
        }
    }
}

/// Ranking filter for top lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopFilter {
    Airing,
    Upcoming,
    ByPopularity,
    Favorite,
}

impl TopFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopFilter::Airing => "airing",
            TopFilter::Upcoming => "upcoming",
            TopFilter::ByPopularity => "bypopularity",
            TopFilter::Favorite => "favorite",
        }
    }
}

impl FromStr for TopFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "airing" => Ok(TopFilter::Airing),
            "upcoming" => Ok(TopFilter::Upcoming),
            "bypopularity" | "popularity" => Ok(TopFilter::ByPopularity),
            "favorite" | "favorites" => Ok(TopFilter::Favorite),
            _ => Err(format!("Invalid top filter: {}", s)),
        }
    }
}

/// Cover picture URLs
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Picture {
    pub medium: Option<String>,
    pub large: Option<String>,
}

impl Picture {
    pub fn is_empty(&self) -> bool {
        self.medium.is_none() && self.large.is_none()
    }
}

/// The user's personal list entry for an anime
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MyListStatus {
    pub status: Option<ListStatus>,
    #[serde(default)]
    pub score: u8,
    #[serde(default)]
    pub num_episodes_watched: u32,
    #[serde(default)]
    pub is_rewatching: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Partial update of a list entry; unset fields are left untouched upstream
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ListStatusUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ListStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_watched_episodes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_rewatching: Option<bool>,
}

impl ListStatusUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Normalized anime list item
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenericAnime {
    pub id: u64,
    pub title: String,
    pub main_picture: Picture,
    pub rank: Option<u32>,
    pub num_list_users: Option<u32>,
    pub mean: Option<f64>,
    pub media_type: MediaType,
    /// The user's own score (1-10), when known
    pub my_score: Option<u8>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub num_episodes: Option<u32>,
    pub my_list_status: Option<MyListStatus>,
}

impl GenericAnime {
    /// Fill fields this entry lacks from another projection of the same anime
    pub fn fill_missing_from(&mut self, other: &GenericAnime) {
        if self.main_picture.is_empty() {
            self.main_picture = other.main_picture.clone();
        }
        if self.media_type == MediaType::Unknown {
            self.media_type = other.media_type;
        }
        self.rank = self.rank.or(other.rank);
        self.num_list_users = self.num_list_users.or(other.num_list_users);
        self.mean = self.mean.or(other.mean);
        self.start_date = self.start_date.or(other.start_date);
        self.end_date = self.end_date.or(other.end_date);
        self.num_episodes = self.num_episodes.or(other.num_episodes);
    }
}

/// An entry related to an anime (sequel, adaptation, ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelatedEntry {
    pub relation: String,
    pub id: u64,
    /// `anime` or `manga`
    pub kind: String,
    pub title: String,
}

/// Full details for a single anime
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnimeDetails {
    pub anime: GenericAnime,
    pub title_english: Option<String>,
    pub title_japanese: Option<String>,
    pub title_synonyms: Vec<String>,
    pub synopsis: Option<String>,
    pub background: Option<String>,
    pub status: Option<String>,
    pub source: Option<String>,
    pub rating: Option<String>,
    pub duration: Option<String>,
    pub season: Option<Season>,
    pub year: Option<i32>,
    pub popularity: Option<u32>,
    pub genres: Vec<String>,
    pub studios: Vec<String>,
    pub related: Vec<RelatedEntry>,
    pub my_list_status: Option<MyListStatus>,
}

/// A character appearing in an anime
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CharacterEntry {
    pub id: u64,
    pub name: String,
    pub role: String,
    pub image_url: Option<String>,
    pub favorites: Option<u32>,
}

/// Lenient date parsing for upstream values.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM` (first of month), `YYYY` (January 1st) and
/// RFC 3339 datetimes (date part only).
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(year) = value.parse::<i32>() {
        return NaiveDate::from_ymd_opt(year, 1, 1);
    }

    None
}
