//! # d3ad
//! src/lib.rs
//!
//! Servidor social (micro-blog) concurrente con un subconjunto de HTTP
//! hecho a mano, almacenamiento en archivos planos y una cache acotada.
//!
//! ## Arquitectura
//!
//! - `store`: acceso a archivos con un lock de lectura/escritura por path
//! - `auth`: usuarios, contraseñas y sesiones
//! - `content`: posts, cache acotada y línea de tiempo
//! - `tags`: índice de posts por tag en archivos de solo-agregar
//! - `http`: parsing de requests y serialización de responses
//! - `router` y `handlers`: páginas del sitio
//! - `server`: pool de workers, pipeline por conexión y accept loop
//! - `metrics`: contadores que se muestran en la página `about`
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use d3ad::config::Config;
//! use d3ad::server::{AppState, Server};
//! use std::sync::Arc;
//!
//! let state = Arc::new(AppState::new(Config::default()).unwrap());
//! let server = Server::bind(state).unwrap();
//! server.run();
//! ```

pub mod auth;
pub mod config;
pub mod content;
pub mod error;
pub mod handlers;
pub mod http;
pub mod id;
pub mod logging;
pub mod metrics;
pub mod router;
pub mod server;
pub mod store;
pub mod tags;
