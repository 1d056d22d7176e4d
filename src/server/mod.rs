//! # Módulo del Servidor
//! src/server/mod.rs
//!
//! - `state`: todo lo compartido entre workers (`AppState`)
//! - `pool`: pool fijo de threads con cola FIFO
//! - `pipeline`: lo que le pasa a cada conexión
//! - `dispatcher`: socket de escucha y loop de accept

pub mod dispatcher;
pub mod pipeline;
pub mod pool;
pub mod state;

pub use dispatcher::Server;
pub use pipeline::Pipeline;
pub use state::AppState;
