//! # Errores del Servidor
//! src/error.rs
//!
//! Errores fatales de arranque. Cada módulo define además su propio enum
//! (`StoreError`, `AuthError`, `ContentError`, `ParseError`, `ConfigError`);
//! aquí solo se agregan los que terminan el proceso.

use crate::config::ConfigError;
use crate::store::StoreError;
use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no se pudo crear el directorio {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no se pudieron cargar los usuarios: {0}")]
    Users(#[from] StoreError),

    #[error("dirección inválida {0}")]
    Address(String),

    #[error("no se pudo abrir el socket en {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("no se pudieron iniciar los workers: {0}")]
    Workers(#[source] io::Error),

    #[error("no se pudo iniciar el logging: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),
}
