//! dwauth-server: the auth server binary.
//!
//! Usage: `dwauth-server [config.toml]` (default `dwauth.toml`). Logging is
//! controlled with `RUST_LOG`; a `.env` file is honored.

mod config;
mod console;

use std::process::ExitCode;
use std::sync::Arc;

use dwauth::prelude::*;
use tracing_subscriber::EnvFilter;

use config::FileConfig;

const DEFAULT_CONFIG: &str = "dwauth.toml";

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let file = match FileConfig::load_or_default(&path) {
        Ok(file) => file,
        Err(e) => {
            tracing::error!(error = %e, "cannot load config");
            return ExitCode::FAILURE;
        }
    };

    let directory = Arc::new(file.directory());
    let server = match AuthServer::start(file.server, directory).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "cannot start auth server");
            return ExitCode::FAILURE;
        }
    };

    tokio::select! {
        () = console::run(&server) => {}
        r = tokio::signal::ctrl_c() => {
            if let Err(e) = r {
                tracing::error!(error = %e, "cannot listen for ctrl-c");
            }
        }
    }

    server.stop().await;
    ExitCode::SUCCESS
}
