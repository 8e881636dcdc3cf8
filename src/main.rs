use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use webterm_core::config::AppConfig;

#[derive(Parser)]
#[command(
    name = "webterm",
    about = "A browser-accessible terminal served over WebSocket",
    version,
    author
)]
struct Cli {
    /// Path to config file (default: ~/.config/webterm/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP/WebSocket server (default)
    Serve {
        /// Bind host
        #[arg(long)]
        host: Option<String>,
        /// Bind port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show or manage configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Initialize default configuration file
    Init,
    /// Print config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up tracing.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "webterm=info,webterm_server=info,webterm_pty=info,warn".into()),
        )
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load config; environment overrides the file, CLI flags override both.
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    config.apply_env();

    match cli.command {
        Some(Commands::Serve { host, port }) => {
            if let Some(h) = host {
                config.server.host = h;
            }
            if let Some(p) = port {
                config.server.port = p;
            }
            webterm_server::serve(config).await?;
        }
        Some(Commands::Config { action }) => {
            handle_config_command(action, &config)?;
        }
        None => {
            webterm_server::serve(config).await?;
        }
    }

    Ok(())
}

fn handle_config_command(action: Option<ConfigAction>, config: &AppConfig) -> Result<()> {
    match action {
        Some(ConfigAction::Show) | None => {
            let toml_str = toml::to_string_pretty(config)?;
            println!("{}", toml_str);
        }
        Some(ConfigAction::Init) => {
            let path = AppConfig::default_path();
            if path.exists() {
                println!("Config already exists at: {}", path.display());
            } else {
                config.save()?;
                println!("Created default config at: {}", path.display());
            }
        }
        Some(ConfigAction::Path) => {
            println!("{}", AppConfig::default_path().display());
        }
    }
    Ok(())
}
