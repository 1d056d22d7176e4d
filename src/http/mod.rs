//! # Módulo HTTP
//! src/http/mod.rs
//!
//! Subconjunto de HTTP/1.1 implementado a mano:
//!
//! - Una request por conexión, sin keep-alive ni chunked encoding
//! - Formularios `application/x-www-form-urlencoded` en el body
//! - La única línea de estado que se emite es `HTTP/1.1 200 OK`
//!
//! ### Formato de Request
//!
//! ```text
//! METHOD /path PROTOCOL\r\n
//! Header-Name: Header-Value\r\n
//! \r\n
//! key=value&key=value
//! ```

pub mod request;
pub mod response;

pub use request::{Method, ParseError, Request};
pub use response::Response;
