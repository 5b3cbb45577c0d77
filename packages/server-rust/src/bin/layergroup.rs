//! Layergroup command line.
//!
//! ```bash
//! # Print a config's layergroup token
//! layergroup id mapconfig.json
//!
//! # Print a widget's SQL, optionally with a filter document applied
//! layergroup widget-sql mapconfig.json 0 pop_max --filters filters.json
//!
//! # Fetch one tile through the configured datasource
//! layergroup tile --datasources datasources.json mapconfig.json 2 1 1 -o tile.mvt
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use layergroup_core::MapConfig;
use layergroup_server::{DatasourceFactory, ServerConfig, TileCoord, VectorTileSource};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "layergroup", version, about = "Layergroup map config and tile tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log output format.
    #[arg(long, global = true, env = "LAYERGROUP_LOG_FORMAT", default_value = "text", value_enum)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a map config and print its layergroup token
    Id {
        /// Map config JSON file
        config: PathBuf,
    },

    /// Print the SQL a widget runs
    WidgetSql {
        /// Map config JSON file
        config: PathBuf,
        /// Layer index
        layer: usize,
        /// Widget name
        widget: String,
        /// Filter document JSON file
        #[arg(long)]
        filters: Option<PathBuf>,
    },

    /// Fetch one tile through the layergroup's datasource
    Tile {
        /// Datasource descriptor table JSON file
        #[arg(long, env = "LAYERGROUP_DATASOURCES")]
        datasources: PathBuf,
        /// Map config JSON file
        config: PathBuf,
        z: u8,
        x: u32,
        y: u32,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// HTTP fetch timeout in seconds
        #[arg(long, env = "LAYERGROUP_FETCH_TIMEOUT", default_value_t = 30)]
        timeout: u64,
    },
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn read_json(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))
}

async fn read_map_config(path: &Path) -> anyhow::Result<MapConfig> {
    let text = read_json(path).await?;
    Ok(MapConfig::from_json(&text)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Id { config } => {
            let map_config = read_map_config(&config).await?;
            println!("{}", map_config.id());
        }
        Command::WidgetSql {
            config,
            layer,
            widget,
            filters,
        } => {
            let mut map_config = read_map_config(&config).await?;
            if let Some(path) = filters {
                let document: serde_json::Value = serde_json::from_str(&read_json(&path).await?)
                    .with_context(|| format!("parsing {}", path.display()))?;
                map_config = map_config.apply_filters(&document)?;
            }
            println!("{}", map_config.widget(layer, &widget)?.sql());
        }
        Command::Tile {
            datasources,
            config,
            z,
            x,
            y,
            output,
            timeout,
        } => {
            let server_config = ServerConfig {
                datasources_path: Some(datasources),
                fetch_timeout: Duration::from_secs(timeout),
                ..ServerConfig::default()
            };
            let table = Arc::new(server_config.load_datasources()?);
            let factory = DatasourceFactory::new(table, &server_config)?;
            let map_config = read_map_config(&config).await?;
            let source = factory.handler().open_for(&map_config)?;
            let tile = source.get_tile(TileCoord::new(z, x, y)?).await?;
            match output {
                Some(path) => tokio::fs::write(&path, &tile)
                    .await
                    .with_context(|| format!("writing {}", path.display()))?,
                None => std::io::stdout().write_all(&tile)?,
            }
        }
    }
    Ok(())
}
