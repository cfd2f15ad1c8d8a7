//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod bbox;
mod query;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings, LoadOptions, Settings};
use crate::credentials::Credentials;
use crate::fusion::{Fuser, SearchQuery};
use crate::geo::GeoPoint;

#[derive(Parser)]
#[command(name = "geofuse")]
#[command(about = "Fuse Yelp business search with OpenStreetMap features by bounding box")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

/// Center and size of a bounding box, shared by several commands.
#[derive(clap::Args, Debug, Clone, Copy)]
struct BoxArgs {
    /// Latitude of the box center in degrees
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,
    /// Longitude of the box center in degrees
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,
    /// Side length of the box in degrees
    #[arg(long)]
    size: f64,
}

impl BoxArgs {
    /// Validate with the same rules as the HTTP endpoint.
    fn to_query(self) -> anyhow::Result<SearchQuery> {
        Ok(SearchQuery::try_new(
            GeoPoint::new(self.lat, self.lon),
            self.size,
        )?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the fusion web server
    Serve {
        /// Address to bind to: PORT, HOST, or HOST:PORT (default: 127.0.0.1:5000)
        bind: Option<String>,

        /// Credential file for the business search provider
        #[arg(long)]
        credentials: Option<PathBuf>,
    },

    /// Run a single fused query and print the JSON document
    Query {
        #[command(flatten)]
        area: BoxArgs,

        /// Credential file for the business search provider
        #[arg(long)]
        credentials: Option<PathBuf>,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the bounding box computed for a query (no network access)
    Bbox {
        #[command(flatten)]
        area: BoxArgs,
    },
}

/// Load credentials and build the orchestrator; any failure is fatal.
fn build_fuser(settings: &Settings) -> anyhow::Result<Fuser> {
    let credentials = Credentials::load(&settings.credentials_path)?;
    Ok(Fuser::from_settings(settings, credentials)?)
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
    };
    let mut settings = load_settings(&options).await?;

    match cli.command {
        Commands::Serve { bind, credentials } => {
            if let Some(bind) = bind {
                settings.bind = bind;
            }
            if let Some(path) = credentials {
                settings.credentials_path = path;
            }
            serve::cmd_serve(&settings).await
        }
        Commands::Query {
            area,
            credentials,
            pretty,
        } => {
            if let Some(path) = credentials {
                settings.credentials_path = path;
            }
            query::cmd_query(&settings, area.to_query()?, pretty).await
        }
        Commands::Bbox { area } => bbox::cmd_bbox(area.to_query()?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_negative_coordinates_parse() {
        let cli = Cli::try_parse_from([
            "geofuse", "bbox", "--lat", "-33.8688", "--lon", "-70.6693", "--size", "0.01",
        ])
        .unwrap();

        match cli.command {
            Commands::Bbox { area } => {
                let query = area.to_query().unwrap();
                assert_eq!(query.center, GeoPoint::new(-33.8688, -70.6693));
                assert_eq!(query.size, 0.01);
            }
            _ => panic!("expected bbox command"),
        }
    }

    #[test]
    fn test_box_args_validated_like_http() {
        let area = BoxArgs {
            lat: 100.0,
            lon: 0.0,
            size: 1.0,
        };
        assert!(area.to_query().is_err());

        let area = BoxArgs {
            lat: 0.0,
            lon: 0.0,
            size: -1.0,
        };
        assert!(area.to_query().is_err());
    }
}
