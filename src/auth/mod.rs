//! # Identidad y Sesiones
//! src/auth/mod.rs
//!
//! Registro autoritativo de usuarios (por id, por nombre y por token activo),
//! respaldado por un archivo por usuario en el Resource Store.
//!
//! ## Flujo
//!
//! ```text
//! register ─┐
//!           ├─> token nuevo (único entre tokens activos) ─> cookie
//! login ────┘
//! cookie ───> resolve_token ─> usuario (si el token sigue vigente)
//! ```

pub mod manager;
pub mod user;

pub use manager::{AuthError, IdentityManager};
pub use user::{User, UserRecord};
