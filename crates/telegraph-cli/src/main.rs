//! telegraph-cli - import a published article from the command line

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use telegraph::{Config, Converter, Source};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "telegraph-cli")]
#[command(about = "Import published articles into sanitized markup", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert one article and print the result
    Convert {
        /// Article URL
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        url: Option<String>,

        /// Read the page from a local file instead of fetching it
        #[arg(long)]
        file: Option<PathBuf>,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Route embeds through the proxy engine
        #[arg(long)]
        proxy_embeds: bool,

        /// Directory downloaded media is written to
        #[arg(long)]
        upload_dir: Option<PathBuf>,

        /// Print content, title, author and image as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(
    path: Option<&PathBuf>,
    proxy_embeds: bool,
    upload_dir: Option<PathBuf>,
) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    if proxy_embeds {
        config = config.with_proxy_embeds();
    }
    if let Some(dir) = upload_dir {
        config.media.upload_dir = dir;
    }
    Ok(config)
}

fn source_of(url: Option<String>, file: Option<PathBuf>) -> Result<Source> {
    match (url, file) {
        (_, Some(path)) => {
            let markup = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            Ok(Source::Markup(markup))
        }
        (Some(url), None) => Ok(Source::Url(url)),
        (None, None) => anyhow::bail!("either a URL or --file is required"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Convert {
            url,
            file,
            config,
            proxy_embeds,
            upload_dir,
            json,
        } => {
            let config = build_config(config.as_ref(), proxy_embeds, upload_dir)?;
            debug!(?config, "configuration");

            let source = source_of(url, file)?;
            let converter = Converter::new(&config)?;
            let converted = converter.convert(&source).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&converted)?);
            } else {
                println!("{}", converted.content);
            }
        }
    }

    Ok(())
}
