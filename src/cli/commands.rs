use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tg", about = concat!("[#] taskgrid v", env!("CARGO_PKG_VERSION"), " - a console for hierarchical work"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Load tasks from a JSON file instead of the built-in sample set
    #[arg(short = 'd', long = "data", global = true)]
    pub data: Option<String>,

    /// Config file path (defaults to ./taskgrid.toml when present)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the active field schema
    Schema,
    /// Validate the schema and the task data
    Check,
}
