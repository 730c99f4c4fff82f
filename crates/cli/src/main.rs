mod backend;
mod run;
mod serve;
mod telemetry;

use std::process;

use clap::{Parser, Subcommand};
use ownership_core::Dispatcher;

use crate::backend::BackendArgs;
use crate::telemetry::LogFormat;

/// Port used when neither `--port` nor `PORT` is given.
const DEFAULT_PORT: u16 = 8080;

/// Keyword ownership query service.
#[derive(Parser)]
#[command(
    name = "ownership",
    version,
    about = "Keyword ownership query service over BigQuery"
)]
struct Cli {
    /// Log format (compact or json); defaults to $OWNERSHIP_LOG_FORMAT
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP function server
    Serve {
        /// Port to listen on (defaults to $PORT, then 8080)
        #[arg(long)]
        port: Option<u16>,
        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Run one mode and print the response envelope as JSON
    Run {
        /// Mode to run: latest, trend, generate_actions, actions_summary, metrics
        #[arg(long)]
        mode: Option<String>,
        #[command(flatten)]
        backend: BackendArgs,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_format = cli.log_format.unwrap_or_else(LogFormat::from_env);
    if let Err(e) = telemetry::initialise(log_format) {
        eprintln!("error: {}", e);
        process::exit(1);
    }

    match cli.command {
        Commands::Serve { port, backend } => {
            let port = port.unwrap_or_else(port_from_env);
            let dispatcher = build_dispatcher(&backend);
            let rt = runtime();
            if let Err(e) = rt.block_on(serve::start_server(port, dispatcher)) {
                eprintln!("Server error: {}", e);
                process::exit(1);
            }
        }
        Commands::Run { mode, backend } => {
            let dispatcher = build_dispatcher(&backend);
            let rt = runtime();
            let code = rt.block_on(run::cmd_run(&dispatcher, mode.as_deref()));
            process::exit(code);
        }
    }
}

fn port_from_env() -> u16 {
    match std::env::var("PORT") {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(port = %raw, "ignoring invalid PORT, using {}", DEFAULT_PORT);
            DEFAULT_PORT
        }),
        Err(_) => DEFAULT_PORT,
    }
}

fn build_dispatcher(args: &BackendArgs) -> Dispatcher {
    match args.dispatcher() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

fn runtime() -> tokio::runtime::Runtime {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {}", e);
            process::exit(1);
        }
    }
}
