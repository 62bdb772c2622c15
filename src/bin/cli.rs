//! Hoops aggregator CLI
//!
//! Local entry point for rendering pages and querying configured sources.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use hoops_aggregator::{
    error::{AppError, Result},
    identity::IdentityResolver,
    models::{Config, EntityKind, RenderRequest, SearchFilters, SourceId},
    pipeline::Aggregator,
    render::RenderService,
};
use serde::Serialize;

/// hoops - basketball stats aggregator
#[derive(Parser, Debug)]
#[command(
    name = "hoops",
    version,
    about = "Fetch and merge basketball statistics across sources"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "hoops.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the configuration file
    Validate,

    /// List configured sources in priority order
    Sources,

    /// Render a single page and print it
    Fetch {
        url: String,

        /// Selector to wait for before extracting
        #[arg(long)]
        wait: Option<String>,

        /// Wait for network idle first
        #[arg(long)]
        idle: bool,
    },

    /// Print the canonical UID for a player
    Uid {
        name: String,
        affiliation: String,

        /// Graduating class
        #[arg(long)]
        year: Option<u16>,
    },

    /// Search players (or teams) across sources
    Search {
        /// Restrict to these sources (repeatable)
        #[arg(long = "source")]
        sources: Vec<String>,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        affiliation: Option<String>,

        #[arg(long)]
        class_year: Option<u16>,

        /// Search teams instead of players
        #[arg(long)]
        teams: bool,

        /// Rows taken from each source
        #[arg(long)]
        per_source: Option<usize>,

        /// Rows returned after merging
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Merged leaderboard for one stat
    Leaderboard {
        stat: String,

        #[arg(long = "source")]
        sources: Vec<String>,

        #[arg(long)]
        per_source: Option<usize>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Stats for one entity from one source
    Stats {
        source: SourceId,
        id: String,
        period: String,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn subset(sources: &[String]) -> Option<&[String]> {
    (!sources.is_empty()).then_some(sources)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load_or_default(&cli.config);
    config.validate()?;
    log::debug!("Loaded configuration from {}", cli.config.display());

    let render = Arc::new(RenderService::http(config.render.clone()));
    let aggregator = Aggregator::from_config(&config, &render);
    let limits = &config.aggregator;

    let outcome = match cli.command {
        Command::Validate => {
            log::info!(
                "Config OK: {} sources, pool of {} contexts",
                config.sources.len(),
                config.render.max_contexts
            );
            Ok(())
        }

        Command::Sources => {
            let slugs: Vec<String> = aggregator
                .registry()
                .sources()
                .iter()
                .map(SourceId::to_string)
                .collect();
            print_json(&slugs)
        }

        Command::Fetch { url, wait, idle } => {
            let mut request = RenderRequest::new(url)
                .wait_timeout_ms(config.render.wait_timeout_ms)
                .wait_for_idle(idle);
            if let Some(selector) = wait {
                request = request.wait_for(selector);
            }
            render
                .fetch(&request)
                .await
                .and_then(|result| print_json(&result))
        }

        Command::Uid {
            name,
            affiliation,
            year,
        } => {
            let resolver = IdentityResolver::new(&config.identity);
            println!("{}", resolver.resolve_uid(&name, &affiliation, year));
            Ok(())
        }

        Command::Search {
            sources,
            name,
            affiliation,
            class_year,
            teams,
            per_source,
            limit,
        } => {
            let filters = SearchFilters {
                kind: if teams {
                    EntityKind::Team
                } else {
                    EntityKind::Player
                },
                name,
                affiliation,
                class_year,
                season: None,
            };
            let result = aggregator
                .search_across_sources(
                    &filters,
                    subset(&sources),
                    per_source.unwrap_or(limits.per_source_limit),
                    limit.unwrap_or(limits.total_limit),
                )
                .await;
            match result {
                Ok(merged) => {
                    log::info!(
                        "{} entities, {} failed sources",
                        merged.items.len(),
                        merged.failures.len()
                    );
                    print_json(&merged)
                }
                Err(e) => Err(e),
            }
        }

        Command::Leaderboard {
            stat,
            sources,
            per_source,
            limit,
        } => {
            let result = aggregator
                .leaderboard_across_sources(
                    &stat,
                    subset(&sources),
                    per_source.unwrap_or(limits.per_source_limit),
                    limit.unwrap_or(limits.total_limit),
                )
                .await;
            result.and_then(|ranked| print_json(&ranked))
        }

        Command::Stats { source, id, period } => {
            let result = aggregator
                .stats_across_sources(&[(source, id)], &period)
                .await;
            match result {
                Ok(stats) if stats.items.is_empty() && !stats.is_partial() => {
                    Err(AppError::validation(format!("{source} has no stats for {period}")))
                }
                Ok(stats) => print_json(&stats),
                Err(e) => Err(e),
            }
        }
    };

    if let Err(e) = render.shutdown().await {
        log::warn!("Shutdown failed: {}", e);
    }
    outcome
}
