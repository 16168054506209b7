use clap::Parser;
use deposit_listener::api::{Cli, CliHandler};
use deposit_listener::config::AppConfig;
use deposit_listener::database::Database;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Quieter than the listener itself
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let mut config = AppConfig::load().unwrap_or_default();
    if let Some(path) = &cli.database {
        config.database.path = path.clone();
    }

    let database = match Database::open(&config.database) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            eprintln!("Failed to open ledger database at '{}': {}", config.database.path, e);
            std::process::exit(1);
        }
    };

    let cli_handler = CliHandler::new(database, config);

    match cli_handler.execute_command(&cli.command).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
