mod commands;

use assetq::config::Config;
use assetq::logging;
use clap::Parser;
use commands::Command;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "assetq",
    about = "Filter, validate, import and export IT asset inventory records"
)]
struct Cli {
    #[arg(long, global = true, env = "ASSETQ_CONFIG", help = "Config file (YAML)")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Backend base URL, overrides config and environment")]
    api_url: Option<String>,

    #[arg(short, long, global = true, help = "Debug logging on stderr")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match Config::load_default(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };
    if let Some(url) = cli.api_url {
        config.api_url = Some(url);
    }

    logging::init(cli.verbose, config.is_production());

    match commands::run(cli.command, &config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
