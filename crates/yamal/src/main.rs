//! Yamal CLI application.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use yamal::{
    AnimeDataSource, AnimeDetails, AnimePager, AuthService, CharacterEntry, DataSourceError,
    FileTokenStorage, GenericAnime, ListStatus, MalClient, MediaType, Season, StdoutLauncher,
    TokenStorage, TopFilter,
};
use yamal_shared::{Config, LogConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search anime by title
    Search {
        query: String,
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },

    /// Top ranked anime
    Top {
        /// airing, upcoming, bypopularity or favorite
        #[arg(long)]
        filter: Option<TopFilter>,
        /// tv, movie, ova, ...
        #[arg(long = "type")]
        media_type: Option<String>,
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },

    /// Anime of one season (the current one when omitted)
    Season {
        year: Option<i32>,
        season: Option<Season>,
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },

    /// Upcoming anime by popularity
    Upcoming {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Full details for one anime
    Details {
        id: u64,
        /// Also list characters
        #[arg(long)]
        characters: bool,
    },

    /// Log in to MyAnimeList
    Login,

    /// Forget the stored token
    Logout,

    /// Your anime list
    List {
        /// watching, completed, on_hold, dropped or plan_to_watch
        #[arg(long)]
        status: Option<ListStatus>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Initialize logging
    let mut log_config = LogConfig::from_settings(&config.logging, &config.log_dir(), "yamal-cli");
    if args.verbose {
        log_config.default_level = tracing::Level::DEBUG;
    }
    yamal_shared::logging::init(log_config)?;

    info!(config_file = %args.config.display(), "Loaded configuration");

    let tokens: Arc<dyn TokenStorage> = Arc::new(FileTokenStorage::new(config.token_path()));
    let auth = AuthService::new(
        Arc::new(MalClient::from_config(&config).context("Failed to create MAL client")?),
        Arc::clone(&tokens),
        Arc::new(StdoutLauncher),
    );

    // Refresh an expired token before the data source looks at it
    auth.valid_token().await;

    let source = AnimeDataSource::from_config(&config, tokens)
        .context("Failed to create data source")?;

    match args.command {
        Command::Search { query, pages } => {
            print_pages(source.search_anime(&query), pages).await?;
        }
        Command::Top {
            filter,
            media_type,
            pages,
        } => {
            let media_type = media_type.as_deref().map(MediaType::parse);
            print_pages(source.get_top_anime(filter, media_type), pages).await?;
        }
        Command::Season {
            year,
            season,
            pages,
        } => {
            let pager = match (year, season) {
                (Some(year), Some(season)) => source.get_seasonal_anime(year, season),
                (Some(year), None) => {
                    let (_, season) = Season::of_date(Utc::now().date_naive());
                    source.get_seasonal_anime(year, season)
                }
                (None, _) => source.get_current_season_anime(),
            };
            print_pages(pager, pages).await?;
        }
        Command::Upcoming { limit } => {
            let items = source
                .get_upcoming_anime_list(limit)
                .await
                .map_err(user_error)?;
            items.iter().for_each(print_anime);
        }
        Command::Details { id, characters } => {
            let details = source.get_anime_details(id).await.map_err(user_error)?;
            print_details(&details);

            if characters {
                let characters = source.get_anime_characters(id).await.map_err(user_error)?;
                print_characters(&characters);
            }
        }
        Command::Login => login(&auth, &config).await?,
        Command::Logout => auth.logout().await?,
        Command::List { status } => {
            if !source.is_authenticated().await {
                bail!("Not logged in. Run `yamal login` first.");
            }
            print_pages(source.get_user_anime_list(status), usize::MAX).await?;
        }
    }

    Ok(())
}

async fn login(auth: &AuthService, config: &Config) -> Result<()> {
    if config.mal.client_id.is_empty() {
        bail!("mal.client_id is not set in the configuration file");
    }

    let pending = auth.begin_login()?;
    println!("Paste the redirect URL (or just the authorization code):");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let input = lines
        .next_line()
        .await
        .context("Failed to read authorization code")?
        .unwrap_or_default();

    let (code, state) = parse_redirect(input.trim());
    if code.is_empty() {
        bail!("No authorization code given");
    }

    auth.complete_login(&pending, &code, state.as_deref())
        .await
        .map_err(user_error)?;
    println!("Logged in.");
    Ok(())
}

/// Pull `code` and `state` out of a pasted redirect URL; anything else is
/// taken as the bare code
fn parse_redirect(input: &str) -> (String, Option<String>) {
    let Some((_, query)) = input.split_once('?') else {
        return (input.to_string(), None);
    };

    let mut code = String::new();
    let mut state = None;
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| value.to_string());
        match key {
            "code" => code = value,
            "state" => state = Some(value),
            _ => {}
        }
    }
    (code, state)
}

fn user_error(err: DataSourceError) -> anyhow::Error {
    let message = err.user_message();
    anyhow::Error::new(err).context(message)
}

async fn print_pages(mut pager: AnimePager, max_pages: usize) -> Result<()> {
    let mut loaded = 0;
    while loaded < max_pages {
        let Some(page) = pager.next_page().await else {
            break;
        };
        let page = page.map_err(user_error)?;
        page.items.iter().for_each(print_anime);
        loaded += 1;
    }
    info!(pages = loaded, "Listing finished");
    Ok(())
}

fn print_anime(anime: &GenericAnime) {
    let rank = anime
        .rank
        .map(|r| format!("#{}", r))
        .unwrap_or_else(|| "-".to_string());
    let mean = anime
        .mean
        .map(|m| format!("{:.2}", m))
        .unwrap_or_else(|| "-".to_string());
    let mine = anime
        .my_score
        .map(|s| format!("  (mine: {})", s))
        .unwrap_or_default();

    println!(
        "{:>7}  {:<6} {:>5}  {} [{}]{}",
        anime.id, rank, mean, anime.title, anime.media_type, mine
    );
}

fn print_details(details: &AnimeDetails) {
    let anime = &details.anime;
    println!("{} (#{})", anime.title, anime.id);
    if let Some(english) = &details.title_english {
        println!("  English:   {}", english);
    }
    println!("  Type:      {}", anime.media_type);
    if let Some(episodes) = anime.num_episodes {
        println!("  Episodes:  {}", episodes);
    }
    if let (Some(season), Some(year)) = (details.season, details.year) {
        println!("  Season:    {} {}", season, year);
    }
    if let Some(mean) = anime.mean {
        println!("  Score:     {:.2}", mean);
    }
    if !details.genres.is_empty() {
        println!("  Genres:    {}", details.genres.join(", "));
    }
    if !details.studios.is_empty() {
        println!("  Studios:   {}", details.studios.join(", "));
    }
    if let Some(status) = &details.my_list_status {
        let list = status.status.map(|s| s.as_str()).unwrap_or("-");
        println!(
            "  Your list: {} ({} eps, score {})",
            list, status.num_episodes_watched, status.score
        );
    }
    if let Some(synopsis) = &details.synopsis {
        println!("\n{}", synopsis);
    }
    for related in &details.related {
        println!("  {:<14} {} (#{})", related.relation, related.title, related.id);
    }
}

fn print_characters(characters: &[CharacterEntry]) {
    println!("\nCharacters:");
    for character in characters {
        println!("  {:<30} {}", character.name, character.role);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_redirect() {
        assert_eq!(parse_redirect("abc123"), ("abc123".to_string(), None));
        assert_eq!(
            parse_redirect("http://localhost/callback?code=abc%2F1&state=xyz"),
            ("abc/1".to_string(), Some("xyz".to_string()))
        );
        assert_eq!(
            parse_redirect("http://localhost/callback?state=xyz"),
            (String::new(), Some("xyz".to_string()))
        );
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from(["yamal", "top", "--filter", "airing", "--type", "movie"]);
        match args.command {
            Command::Top {
                filter, media_type, ..
            } => {
                assert_eq!(filter, Some(TopFilter::Airing));
                assert_eq!(media_type.as_deref(), Some("movie"));
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let args = Args::parse_from(["yamal", "season", "2024", "fall"]);
        assert!(matches!(
            args.command,
            Command::Season {
                year: Some(2024),
                season: Some(Season::Fall),
                ..
            }
        ));
    }
}
