//! # Contenido
//! src/content/mod.rs
//!
//! Posts y su cache en memoria. Cada post apunta por id al anterior de su
//! autor; la historia de un usuario se reconstruye leyendo post por post.

pub mod cache;
pub mod post;

pub use cache::{ContentCache, ContentError, Timeline, TimelineItem};
pub use post::{Post, PostRecord, Visibility};
