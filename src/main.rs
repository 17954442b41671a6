use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

use event_scrape::config::{AppConfig, RendererKind};
use event_scrape::db::EventFilter;
use event_scrape::models::Category;
use event_scrape::pipeline::RunSummary;

/// Pulls event listings from every registered source into one local store.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Path to config.json (defaults to the platform data directory)
    #[arg(short, long, env = "EVENT_SCRAPE_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database path, overrides the config file
    #[arg(long, env = "EVENT_SCRAPE_DB")]
    database: Option<PathBuf>,

    /// Chromium executable, overrides the config file
    #[arg(long, env = "EVENT_SCRAPE_CHROMIUM")]
    chromium: Option<PathBuf>,

    /// How pages are fetched
    #[arg(long, value_enum)]
    renderer: Option<RendererArg>,

    /// Log at debug unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every adapter, persist, then sweep expired listings
    Run {
        #[arg(long)]
        json: bool,
    },
    /// Run one adapter without the retention sweep
    RunSource {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// List registered sources
    Sources,
    /// Show active upcoming listings
    List {
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Deactivate listings dated before the retention cutoff
    Sweep,
    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write the default config to disk
    Init {
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RendererArg {
    Chromium,
    Http,
}

impl From<RendererArg> for RendererKind {
    fn from(arg: RendererArg) -> Self {
        match arg {
            RendererArg::Chromium => RendererKind::Chromium,
            RendererArg::Http => RendererKind::Http,
        }
    }
}

impl Cli {
    fn load_config(&self) -> Result<AppConfig> {
        let mut config = AppConfig::load(self.config.as_deref()).context("loading config")?;
        if let Some(path) = &self.database {
            config.database_path = Some(path.clone());
        }
        if let Some(path) = &self.chromium {
            config.chromium_path = Some(path.clone());
        }
        if let Some(renderer) = self.renderer {
            config.renderer = renderer.into();
        }
        Ok(config)
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();
}

fn print_summary(summary: &RunSummary) {
    println!(
        "{} records from {}/{} sources in {:.1}s ({} swept)",
        summary.total_records,
        summary.successful_adapters,
        summary.total_adapters,
        summary.duration_seconds,
        summary.swept
    );
    for report in &summary.adapters {
        println!(
            "  {:<12} {:?}: {} scraped, {} created, {} updated, {} dropped, {} failed",
            report.id,
            report.status,
            report.scraped,
            report.created,
            report.updated,
            report.dropped,
            report.failed
        );
    }
}

async fn dispatch(cli: Cli) -> Result<bool> {
    let default = Command::Run { json: false };
    let command = cli.command.as_ref().unwrap_or(&default);

    if let Command::Config {
        action: ConfigAction::Init { force },
    } = command
    {
        let path = cli
            .config
            .clone()
            .unwrap_or_else(event_scrape::utils::config_path);
        if path.exists() && !force {
            warn!(path = %path.display(), "config already exists, pass --force to overwrite");
            return Ok(false);
        }
        let written = AppConfig::default()
            .save(Some(&path))
            .context("writing config")?;
        info!(path = %written.display(), "wrote default config");
        return Ok(true);
    }

    let config = cli.load_config()?;
    debug!(?config, "resolved config");

    match command {
        Command::Run { json } => {
            let summary = event_scrape::scrape_all(&config).await?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
            Ok(summary.success)
        }
        Command::RunSource { id, json } => {
            let report = event_scrape::scrape_source(&config, id).await?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{}: {} scraped, {} persisted ({} new)",
                    report.id, report.scraped, report.persisted, report.created
                );
            }
            Ok(report.persisted > 0)
        }
        Command::Sources => {
            for source in event_scrape::list_sources(&config)? {
                println!("{:<12} {:<24} {}", source.id, source.name, source.url);
            }
            Ok(true)
        }
        Command::List {
            category,
            search,
            limit,
        } => {
            let filter = EventFilter {
                category: *category,
                search: search.clone(),
                limit: Some(*limit),
                ..EventFilter::default()
            };
            for stored in event_scrape::list_events(&config, filter)? {
                let event = &stored.event;
                println!(
                    "{} {:>8}  {:<10} {}  @ {}  {}",
                    event.date,
                    event.time,
                    event.category.as_str(),
                    event.title,
                    event.venue.name,
                    event.original_url
                );
            }
            Ok(true)
        }
        Command::Sweep => {
            let swept = event_scrape::sweep_expired(&config)?;
            println!("{swept} listings deactivated");
            Ok(true)
        }
        Command::Config { .. } => Ok(true),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match dispatch(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!(error = %format!("{err:#}"), "event-scrape failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_is_the_default_command() {
        let cli = Cli::parse_from(["event-scrape"]);
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = dir.path().join("events.sqlite");
        let cli = Cli::parse_from([
            "event-scrape",
            "--config",
            dir.path().join("missing.json").to_str().expect("utf8"),
            "--database",
            db.to_str().expect("utf8"),
            "--renderer",
            "http",
            "list",
            "--category",
            "Music",
        ]);
        let config = cli.load_config().expect("config");
        assert_eq!(config.database_path.as_deref(), Some(db.as_path()));
        assert_eq!(config.renderer, RendererKind::Http);
        assert!(matches!(
            cli.command,
            Some(Command::List {
                category: Some(Category::Music),
                limit: 50,
                ..
            })
        ));
    }

    #[test]
    fn run_source_takes_an_id() {
        let cli = Cli::parse_from(["event-scrape", "run-source", "meetup", "--json"]);
        match cli.command {
            Some(Command::RunSource { id, json }) => {
                assert_eq!(id, "meetup");
                assert!(json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
