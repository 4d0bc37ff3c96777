use anyhow::Result;
use clap::Parser;

use continuation_fetch::config::ContinuationFetchConfig;
use continuation_fetch::telemetry::init_telemetry;

mod cli;

use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    ContinuationFetchConfig::load_env_file()?;
    let config = ContinuationFetchConfig::load()?;
    init_telemetry(&config.observability)?;

    tokio::runtime::Runtime::new()?
        .block_on(async { cli::commands::run(cli.command, &config).await })
}
