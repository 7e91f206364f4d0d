mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use vidbox::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    vidbox::observability::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server(args) => {
            let config = Config::load(args.config)?;
            vidbox::api::run(config, args.address).await?
        }
        Commands::Config(args) => {
            let config = Config::load(args.config)?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
