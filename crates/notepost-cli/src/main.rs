mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use notepost_types::CONFIG_FILENAME;

/// notepost -- fill a web note form from a draft file.
#[derive(Parser, Debug)]
#[command(name = "notepost", version, about)]
struct Cli {
    /// Path to the configuration file (defaults apply when it does not exist)
    #[arg(long, global = true, default_value = CONFIG_FILENAME)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve media, validate the draft, and fill the open publish form
    Compose {
        /// Draft file (.json or .toml)
        #[arg(long)]
        draft: PathBuf,

        /// Chrome DevTools HTTP endpoint
        #[arg(long, default_value = "http://127.0.0.1:9222")]
        endpoint: String,

        /// Prefer the page target whose URL contains this text
        #[arg(long)]
        page: Option<String>,

        /// Navigate the target to this URL before composing
        #[arg(long)]
        navigate: Option<String>,
    },

    /// Resolve a media input and print the local paths
    Resolve {
        /// Which resolver variant to use
        #[arg(long, value_enum, default_value = "image")]
        kind: MediaArg,

        /// Media input: a path, URL, comma list, or JSON array
        input: String,
    },

    /// Resolve media and validate a draft without touching a browser
    Check {
        /// Draft file (.json or .toml)
        #[arg(long)]
        draft: PathBuf,
    },

    /// Delete old downloads from the scratch directory
    Sweep {
        /// Override the configured maximum age, in hours
        #[arg(long)]
        max_age_hours: Option<u64>,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Print built-in defaults instead of the loaded file
        #[arg(long)]
        default: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum MediaArg {
    Image,
    Video,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize tracing with env filter (e.g., RUST_LOG=debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let ok = match cli.command {
        Commands::Compose {
            draft,
            endpoint,
            page,
            navigate,
        } => {
            commands::compose::run(&cli.config, &draft, &endpoint, page.as_deref(), navigate.as_deref())
                .await?
        }
        Commands::Resolve { kind, input } => {
            commands::media::resolve(&cli.config, kind == MediaArg::Video, &input).await?
        }
        Commands::Check { draft } => commands::media::check(&cli.config, &draft).await?,
        Commands::Sweep { max_age_hours } => commands::sweep::run(&cli.config, max_age_hours)?,
        Commands::Config { default } => commands::config::show(&cli.config, default)?,
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
