//! # Índice de Tags
//! src/tags.rs
//!
//! Un archivo por tag con una línea de ancho fijo por post (`<id hex>\n`),
//! solo se agrega al final. Las búsquedas leen la ventana más nueva desde el
//! final del archivo sin cargarlo completo.

use crate::id::{I512, HEX_LEN};
use crate::store::{ResourceStore, StoreError};
use regex::Regex;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Ancho de cada línea del índice
pub const ENTRY_LEN: usize = HEX_LEN + 1;

pub const TAG_MIN: usize = 2;
pub const TAG_MAX: usize = 64;

/// Normaliza un tag: 2 a 64 letras ASCII, en minúsculas
pub fn sanitize(tag: &str) -> Option<String> {
    if !(TAG_MIN..=TAG_MAX).contains(&tag.len()) || !tag.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    Some(tag.to_ascii_lowercase())
}

/// Extrae hasta `max` tags distintos (`#tag`) de un mensaje, en orden de aparición
pub fn extract(message: &str, max: usize) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?:^|\s)#([A-Za-z]+)").expect("Invalid regex"));

    let mut tags: Vec<String> = Vec::new();
    for caps in re.captures_iter(message) {
        if tags.len() >= max {
            break;
        }
        if let Some(tag) = caps.get(1).and_then(|m| sanitize(m.as_str())) {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    tags
}

pub struct TagIndex {
    store: Arc<ResourceStore>,
    tag_dir: PathBuf,
}

impl TagIndex {
    pub fn new(store: Arc<ResourceStore>, tag_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            tag_dir: tag_dir.into(),
        }
    }

    /// Registra un post bajo un tag ya normalizado
    pub fn append(&self, tag: &str, id: &I512) -> Result<(), StoreError> {
        let line = format!("{}\n", id.to_hex());
        self.store.append(&self.tag_dir.join(tag), line.as_bytes())?;
        debug!(tag = ?tag, id = ?id, "post agregado al tag");
        Ok(())
    }

    /// Ids de un tag, del más nuevo al más viejo
    ///
    /// `offset` cuenta entradas desde el final. Un tag inválido o sin archivo
    /// da una lista vacía; líneas que no son ids se descartan.
    pub fn read_tag(&self, tag: &str, offset: usize, count: usize) -> Result<Vec<I512>, StoreError> {
        let Some(tag) = sanitize(tag) else {
            return Ok(Vec::new());
        };

        let lines = self
            .store
            .read_tail_lines(&self.tag_dir.join(tag), ENTRY_LEN, offset, count)?;
        Ok(lines.iter().filter_map(|line| line.parse().ok()).collect())
    }
}
