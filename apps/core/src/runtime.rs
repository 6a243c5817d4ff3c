use std::path::PathBuf;
use std::time::Duration;

use crate::config::{self, ConfigError};
use crate::core_service::{CatalogOrigin, CoreService, ServiceError};
use crate::logging;
use crate::refresh_scheduler::{SchedulerState, TickOutcome};
use crate::settings::refresh_interval_label;

#[derive(Debug)]
pub enum RuntimeError {
    Config(ConfigError),
    Service(ServiceError),
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(error) => write!(f, "config error: {error}"),
            Self::Service(error) => write!(f, "{}", error.status_message()),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<ConfigError> for RuntimeError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<ServiceError> for RuntimeError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Count(String),
    Suggest { text: String, page: usize },
    Favorite(String),
    Favorites,
    History,
    SetRefresh(u64),
    Watch { interval_secs: Option<u64> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOptions {
    pub config_path: Option<PathBuf>,
    pub command: Command,
}

pub const USAGE: &str = "usage: steamcount-core [--config PATH] <command>
commands:
  count <game name>             current players for a game
  suggest <text> [--page N]     typeahead suggestions (min. 3 characters)
  favorite <game name>          add or remove a favorite
  favorites                     refresh and list favorites
  history                       recent searches, newest first
  refresh <seconds>             auto refresh interval, 0 disables
  watch [--interval SECS]       keep refreshing favorites";

pub fn parse_cli_args(args: &[String]) -> Result<CliOptions, String> {
    let mut config_path = None;
    let mut rest: Vec<&str> = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let value = iter
                .next()
                .ok_or_else(|| "--config requires a path".to_string())?;
            config_path = Some(PathBuf::from(value));
        } else {
            rest.push(arg.as_str());
        }
    }

    let Some((name, params)) = rest.split_first() else {
        return Err(USAGE.to_string());
    };

    let command = match *name {
        "count" => Command::Count(joined_text(params, "count")?),
        "suggest" => {
            let (text_parts, page) = take_number_flag(params, "--page")?;
            Command::Suggest {
                text: text_parts.join(" "),
                page: page.unwrap_or(0) as usize,
            }
        }
        "favorite" => Command::Favorite(joined_text(params, "favorite")?),
        "favorites" => Command::Favorites,
        "history" => Command::History,
        "refresh" => {
            let raw = params
                .first()
                .ok_or_else(|| "refresh requires a number of seconds".to_string())?;
            Command::SetRefresh(parse_seconds(raw)?)
        }
        "watch" => {
            let (_, interval_secs) = take_number_flag(params, "--interval")?;
            Command::Watch { interval_secs }
        }
        other => return Err(format!("unknown command '{other}'\n{USAGE}")),
    };

    Ok(CliOptions {
        config_path,
        command,
    })
}

fn joined_text(params: &[&str], command: &str) -> Result<String, String> {
    let text = params.join(" ");
    if text.trim().is_empty() {
        return Err(format!("{command} requires a game name"));
    }
    Ok(text)
}

fn take_number_flag<'a>(params: &[&'a str], flag: &str) -> Result<(Vec<&'a str>, Option<u64>), String> {
    let mut text = Vec::new();
    let mut value = None;
    let mut iter = params.iter();
    while let Some(param) = iter.next() {
        if *param == flag {
            let raw = iter
                .next()
                .ok_or_else(|| format!("{flag} requires a number"))?;
            value = Some(parse_seconds(raw)?);
        } else {
            text.push(*param);
        }
    }
    Ok((text, value))
}

fn parse_seconds(raw: &str) -> Result<u64, String> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| format!("'{raw}' is not a non-negative number"))
}

pub fn run_with_options(options: CliOptions) -> Result<(), RuntimeError> {
    let config = config::load(options.config_path.as_deref())?;
    if let Err(error) = logging::init() {
        eprintln!("[steamcount-core] logging disabled: {error}");
    }
    logging::info(&format!(
        "startup command={:?} config_path={}",
        options.command,
        config.config_path.display()
    ));

    let service = CoreService::new(config)?;
    service.load_session()?;

    match options.command {
        Command::Count(name) => {
            load_catalog(&service)?;
            let outcome = service.submit(&name);
            service.save_session()?;
            let outcome = outcome?;
            let count = match outcome.result.count {
                Some(count) => format!("{count} players online"),
                None => "player count not available".to_string(),
            };
            let star = if outcome.is_favorite { "★" } else { "☆" };
            println!("{star} {} (appid {}): {count}", outcome.entry.name, outcome.entry.id);
        }
        Command::Suggest { text, page } => {
            load_catalog(&service)?;
            let suggestions = service.suggestion_page(&text, page);
            if !suggestions.searched {
                println!("Type at least 3 characters for suggestions.");
            } else if suggestions.entries.is_empty() {
                println!("No suggested games");
            } else {
                for entry in &suggestions.entries {
                    println!("{:>8}  {}", entry.id, entry.name);
                }
                if suggestions.has_next_page {
                    println!("(more: --page {})", page + 1);
                }
            }
        }
        Command::Favorite(name) => {
            let now_favorite = service.toggle_favorite(&name)?;
            service.save_session()?;
            if now_favorite {
                println!("★ added '{}' to favorites", name.trim());
            } else {
                println!("☆ removed '{}' from favorites", name.trim());
            }
        }
        Command::Favorites => {
            let favorites = service.session().favorites_sorted();
            if favorites.is_empty() {
                println!("No favorites yet");
                return Ok(());
            }
            load_catalog(&service)?;
            service.refresh_favorites_now();
            print_favorites(&service);
        }
        Command::History => {
            let recent = service.session().recent_history();
            if recent.is_empty() {
                println!("No recent searches");
            }
            for name in recent {
                println!("• {name}");
            }
        }
        Command::SetRefresh(seconds) => {
            service.configure_refresh(seconds)?;
            service.save_session()?;
            println!("auto refresh: {}", refresh_interval_label(seconds));
        }
        Command::Watch { interval_secs } => {
            let interval =
                interval_secs.unwrap_or(service.session().refresh_config().interval_secs);
            if interval == 0 {
                println!("auto refresh is off; pass --interval SECS or run 'refresh <seconds>'");
                return Ok(());
            }
            load_catalog(&service)?;
            if let SchedulerState::Running(secs) = service.configure_refresh(interval)? {
                println!("[steamcount-core] refreshing favorites every {secs}s (Ctrl+C to stop)");
            }
            if let TickOutcome::NoFavorites = service.refresh_favorites_now() {
                println!("No favorites yet");
                return Ok(());
            }
            loop {
                print_favorites(&service);
                std::thread::sleep(Duration::from_secs(interval));
            }
        }
    }

    Ok(())
}

fn load_catalog(service: &CoreService) -> Result<(), RuntimeError> {
    println!("[steamcount-core] loading game list...");
    let load = service.load_catalog_with_fallback()?;
    match load.origin {
        CatalogOrigin::Network => {
            println!("[steamcount-core] loaded {} games", load.entries);
        }
        CatalogOrigin::Cache => {
            println!(
                "[steamcount-core] offline: using cached game list ({} games)",
                load.entries
            );
        }
    }
    Ok(())
}

fn print_favorites(service: &CoreService) {
    let counts = service.session().favorite_counts();
    for name in service.session().favorites_sorted() {
        match counts.get(&name).and_then(|result| result.count) {
            Some(count) => println!("★ {name}: {count}"),
            None => println!("★ {name}: -"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_cli_args, Command};
    use std::path::PathBuf;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_multi_word_game_names() {
        let options = parse_cli_args(&args(&["count", "Hollow", "Knight"])).unwrap();
        assert_eq!(options.command, Command::Count("Hollow Knight".to_string()));
        assert!(options.config_path.is_none());
    }

    #[test]
    fn parses_config_flag_anywhere() {
        let options =
            parse_cli_args(&args(&["suggest", "witch", "--config", "/tmp/c.toml", "--page", "2"]))
                .unwrap();
        assert_eq!(options.config_path, Some(PathBuf::from("/tmp/c.toml")));
        assert_eq!(
            options.command,
            Command::Suggest {
                text: "witch".to_string(),
                page: 2
            }
        );
    }

    #[test]
    fn rejects_missing_and_unknown_commands() {
        assert!(parse_cli_args(&[]).is_err());
        assert!(parse_cli_args(&args(&["launch"])).is_err());
        assert!(parse_cli_args(&args(&["count", "  "])).is_err());
        assert!(parse_cli_args(&args(&["refresh", "-5"])).is_err());
    }

    #[test]
    fn parses_watch_interval() {
        let options = parse_cli_args(&args(&["watch", "--interval", "30"])).unwrap();
        assert_eq!(
            options.command,
            Command::Watch {
                interval_secs: Some(30)
            }
        );
    }
}
