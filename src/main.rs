use std::path::PathBuf;

use clap::Parser;
use taskgrid::cli::commands::{Cli, Commands};
use taskgrid::cli::handlers;
use taskgrid::model::load_config;
use taskgrid::remote::SchemaProvider;

fn main() {
    let cli = Cli::parse();

    match cli.command {
        None => {
            // No subcommand → launch the console
            if let Err(e) = launch_tui(&cli) {
                eprintln!("error: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Schema) => {
            if let Err(e) = handlers::cmd_schema(&cli) {
                eprintln!("error: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Check) => {
            if let Err(e) = handlers::cmd_check(&cli) {
                eprintln!("error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn launch_tui(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let store = handlers::load_store(cli.data.as_deref())?;
    let schema = store.schema("tasks")?;
    let lookups = store.lookups().to_vec();
    let roots = store.roots();

    let config_path = match cli.config.as_deref() {
        Some(p) => Some(PathBuf::from(p)),
        None => {
            let default = PathBuf::from("taskgrid.toml");
            default.exists().then_some(default)
        }
    };
    let config = load_config(config_path.as_deref())?;
    let state_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    taskgrid::tui::run(Box::new(store), schema, lookups, roots, config, state_dir)
}
