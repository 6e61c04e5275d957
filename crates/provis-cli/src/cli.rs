use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "provis",
    about = "provis: typed provisioning objects with inheritance",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Item directory; overrides the configuration file
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// List the registered item types
    Types,
    /// Show the fields of an item type
    Schema(SchemaArgs),
    /// List the names of stored items of a type
    List(ListArgs),
    /// Show a stored item
    Show(ShowArgs),
    /// Validate every stored item
    Validate(ValidateArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args)]
pub struct SchemaArgs {
    pub item_type: String,
    /// Include hidden identity fields
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct ListArgs {
    pub item_type: String,
}

#[derive(Args)]
pub struct ShowArgs {
    pub item_type: String,
    pub name: String,
    /// Resolve inherited values
    #[arg(short, long)]
    pub rendered: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Only validate items of this type
    #[arg(long = "type")]
    pub item_type: Option<String>,
}
