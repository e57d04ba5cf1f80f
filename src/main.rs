use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use popsim::{
    project,
    web::{self, CatalogSource, WebServerConfig},
    Catalog, ProjectionOptions, ScenarioLoader,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Age-cohort population projections")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a projection and print it as JSON
    Project {
        /// Scenario or country catalog file (YAML or JSON); built-in baseline when omitted
        #[arg(long)]
        scenario: Option<PathBuf>,

        /// Country slug from the catalog; the catalog default when omitted
        #[arg(long)]
        country: Option<String>,

        /// Zero every migration stream
        #[arg(long)]
        no_migration: bool,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Serve projections over HTTP
    Serve {
        /// Scenario or country catalog file (YAML or JSON), re-read on every request
        #[arg(long)]
        scenario: Option<PathBuf>,

        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value_t = 3002)]
        port: u16,
    },
}

fn load_catalog(path: Option<&PathBuf>) -> Result<Catalog> {
    let catalog = match path {
        Some(path) => ScenarioLoader::new(".").load_catalog(path)?,
        None => Catalog::builtin(),
    };
    catalog.validate()?;
    Ok(catalog)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Project {
            scenario,
            country,
            no_migration,
            pretty,
        } => {
            let catalog = load_catalog(scenario.as_ref())?;
            let country = catalog
                .select(country.as_deref())
                .with_context(|| format!("unknown country {country:?}"))?;
            let options = ProjectionOptions {
                migration: !no_migration,
            };
            let report = project(&country.scenario, options)?.report();
            let json = if pretty {
                serde_json::to_string_pretty(&report)?
            } else {
                serde_json::to_string(&report)?
            };
            println!("{json}");
        }
        Command::Serve {
            scenario,
            host,
            port,
        } => {
            let source = match scenario {
                Some(path) => {
                    // Fail at startup rather than on the first request.
                    load_catalog(Some(&path))?;
                    CatalogSource::File {
                        loader: ScenarioLoader::new("."),
                        path,
                    }
                }
                None => CatalogSource::Fixed(Catalog::builtin()),
            };
            web::run(WebServerConfig { source, host, port }).await?;
        }
    }
    Ok(())
}
