use std::sync::Arc;

use clap::Parser;

use ragchat::cli::{
    Cli, Commands, ConfigSubcommands, ask, build_client, print_reindex, print_status,
    resolve_config,
};
use ragchat::config::AppConfig;
use ragchat::core::{ChatSession, ReadinessMonitor, Result};
use ragchat::{logging, tui};

fn run_config_command(command: &ConfigSubcommands, config: &AppConfig) {
    match command {
        ConfigSubcommands::Init => match AppConfig::init_default() {
            Ok(path) => {
                println!("✓ Created config file at {}", path.display());
            }
            Err(e) => {
                eprintln!("✗ Failed to create config: {e}");
            }
        },
        ConfigSubcommands::Where => match AppConfig::get_config_path() {
            Some(path) => println!("{}", path.display()),
            None => eprintln!("✗ Could not determine config path"),
        },
        ConfigSubcommands::Show => match config.to_toml() {
            Ok(text) => print!("{text}"),
            Err(e) => eprintln!("✗ Failed to render config: {e}"),
        },
    }
}

async fn run_command(command: &Commands, config: &AppConfig) -> Result<()> {
    let client = build_client(config)?;
    let mut out = std::io::stdout();

    match command {
        Commands::Ask { query } => ask(client, query, &mut out).await,
        Commands::Status => print_status(&client, &mut out).await,
        Commands::Reindex => print_reindex(&client, &mut out).await,
        Commands::Config { .. } => Ok(()),
    }
}

async fn run_interactive(config: &AppConfig, verbose: bool) -> Result<()> {
    let _log_guard = logging::init_file(&config.log_file_path(), verbose);

    let client = build_client(config)?;
    tracing::info!(base_url = %client.base_url(), "Starting interactive session");

    let monitor = ReadinessMonitor::new(client.clone())
        .with_interval(config.poll_interval())
        .start();
    let session = ChatSession::new(client.clone(), monitor.subscribe());

    let result = tui::run_tui(session, Arc::clone(&client)).await;
    monitor.stop().await;

    if verbose && let Some(path) = logging::log_file_path() {
        eprintln!("Logs written to {}", path.display());
    }
    result
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli, AppConfig::load());

    match &cli.command {
        Some(Commands::Config { command }) => {
            run_config_command(command, &config);
            Ok(())
        }
        Some(command) => {
            logging::init_stderr(cli.verbose);
            if let Err(e) = run_command(command, &config).await {
                eprintln!("✗ {e}");
                std::process::exit(1);
            }
            Ok(())
        }
        None => run_interactive(&config, cli.verbose).await,
    }
}
