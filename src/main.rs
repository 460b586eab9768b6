mod bot;
mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "following-watch",
    about = "Notify one recipient when followed Telegram accounts post in groups"
)]
struct Cli {
    /// Path to the TOML config (defaults to ./config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start both sessions and watch until interrupted (default)
    Run,
    /// Validate the config and print a summary
    Check,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let config = match config::Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("Failed to create tokio runtime: {e}");
                    std::process::exit(1);
                }
            };
            if let Err(e) = rt.block_on(bot::run_bot(config)) {
                eprintln!("Bot error: {e}");
                std::process::exit(1);
            }
        }
        Commands::Check => {
            println!("Config OK");
            println!("  mode:            {:?}", config.mode);
            println!("  following:       {} account(s)", config.following.len());
            println!("  window:          {}s", config.window_seconds);
            println!("  refresh on edit: {}", config.refresh_on_edit);
            println!("  separate watcher session: {}", config.has_separate_watcher());
            println!("  recipient:       {}", config.recipient().0);
        }
    }
}
