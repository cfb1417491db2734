// Copyright 2026 Carteira Teorica Contributors
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use carteira_runtime::cli;
use carteira_runtime::cli::run_cmd::RunArgs;

#[derive(Parser)]
#[command(
    name = "carteira",
    about = "Carteira: daily B3 index composition to Parquet on S3",
    version,
    after_help = "Run 'carteira <command> --help' for details on each command.\nRun 'carteira' with no command to perform a default run."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log record format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Download today's report, convert it and upload it
    Run(RunArgs),
    /// Check environment and diagnose issues
    Doctor {
        /// Download directory to check
        #[arg(long)]
        download_dir: Option<std::path::PathBuf>,
    },
}

fn init_tracing(cli: &Cli) {
    let level = if cli.verbose { "debug" } else { cli.log_level.as_str() };
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::new(level)
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match cli.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    tracing::info!("carteira v{}", env!("CARGO_PKG_VERSION"));

    let result = match &cli.command {
        None => cli::run_cmd::run_cmd(&RunArgs::default(), cli.json).await,
        Some(Commands::Run(args)) => cli::run_cmd::run_cmd(args, cli.json).await,
        Some(Commands::Doctor { download_dir }) => {
            cli::doctor::run(download_dir.clone(), cli.json).await
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if cli.json {
            println!(
                "{}",
                serde_json::json!({
                    "error": true,
                    "message": format!("{e:#}"),
                })
            );
        } else {
            eprintln!("  Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}
