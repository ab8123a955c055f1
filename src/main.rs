use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lingowizz::config::ConfigLoader;

#[derive(Parser)]
#[command(name = "lingowizz")]
#[command(version, about = "Photo-based vocabulary learning backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file (default: lingowizz.toml)
    #[arg(long, short)]
    config: Option<PathBuf>,

    #[arg(long)]
    verbose: bool,

    #[arg(long, short)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Override the configured listen port
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Write a default config file
    Init {
        #[arg(long, short, help = "Overwrite an existing config file")]
        force: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration (merged from all sources)
    Show {
        #[arg(long, help = "Output as JSON instead of TOML")]
        json: bool,
    },
}

fn main() -> ExitCode {
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> lingowizz::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Serve { port } => {
            let mut config = ConfigLoader::load(cli.config.as_deref())?;
            if let Some(port) = port {
                config.server.port = port;
            }
            let rt = Runtime::new()?;
            rt.block_on(lingowizz::server::serve(config))?;
        }
        Commands::Init { force } => {
            let path = cli
                .config
                .unwrap_or_else(|| PathBuf::from("lingowizz.toml"));
            ConfigLoader::init_file(&path, force)?;
            println!("Wrote {}", path.display());
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { json } => {
                ConfigLoader::show_config(cli.config.as_deref(), json)?;
            }
        },
    }

    Ok(())
}
