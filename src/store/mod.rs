//! # Almacenamiento en Archivos
//! src/store/mod.rs
//!
//! Capa de I/O con bloqueo por ruta sobre la que se apoya toda la
//! persistencia. Ningún componente superior accede a disco sin pasar por aquí.

pub mod resource;

pub use resource::{ResourceStore, StoreError};
