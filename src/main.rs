//! # d3ad - Entry Point
//! src/main.rs
//!
//! Lee la configuración, inicia el logging, carga el estado desde disco y
//! atiende conexiones hasta que el proceso muere.

use d3ad::config::Config;
use d3ad::error::ServerError;
use d3ad::logging::init_tracing;
use d3ad::server::{AppState, Server};
use std::sync::Arc;
use tracing::error;

fn main() {
    let config = Config::new();

    if let Err(e) = init_tracing(config.log_format) {
        eprintln!("{}", ServerError::from(e));
        std::process::exit(1);
    }

    if let Err(e) = start(config) {
        error!(error = %e, "error fatal");
        std::process::exit(1);
    }
}

fn start(config: Config) -> Result<(), ServerError> {
    config.validate()?;
    config.print_summary();

    let state = Arc::new(AppState::new(config)?);
    let server = Server::bind(state)?;
    server.run();
    Ok(())
}
