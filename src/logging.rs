//! # Logging
//! src/logging.rs
//!
//! Inicialización de `tracing`. El filtro se toma de `RUST_LOG` y, si no
//! existe, se usa `d3ad=info`. Los strings que vienen del cliente se
//! registran siempre con formato `?` para que los saltos de línea y otros
//! caracteres de control queden escapados.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Formato de salida de los logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Legible para desarrollo
    Human,
    /// JSON para agregadores de logs
    Json,
}

/// Instala el subscriber global
///
/// Retorna error si ya había un subscriber instalado.
pub fn init_tracing(format: LogFormat) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("d3ad=info"));

    match format {
        LogFormat::Human => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_level(true),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_thread_ids(true).with_current_span(false))
            .try_init(),
    }
}
