use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vidbox")]
#[command(about = "Queued video download service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server with its scheduler and reaper
    Server(ServerArgs),
    /// Print the effective configuration as TOML
    Config(ConfigArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind the HTTP server to (overrides `server.bind_addr`)
    #[arg(long)]
    pub address: Option<SocketAddr>,

    /// Path to the configuration file
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ConfigArgs {
    /// Path to the configuration file
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}
