//! # Resource Store
//! src/store/resource.rs
//!
//! Cada ruta tiene un `RwLock` propio, creado la primera vez que se usa y
//! conservado durante toda la vida del proceso. Varios lectores de la misma
//! ruta pueden avanzar en paralelo; un escritor excluye a lectores y a otros
//! escritores de esa ruta. Operaciones sobre rutas distintas no se bloquean
//! entre sí (salvo el instante de buscar el lock en la tabla).

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, warn};

/// Errores del almacenamiento
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("recurso no encontrado: {0}")]
    NotFound(PathBuf),

    #[error("error de I/O en {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == ErrorKind::NotFound {
            StoreError::NotFound(path.to_path_buf())
        } else {
            StoreError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Store de archivos planos con un lock lector/escritor por ruta
#[derive(Default)]
pub struct ResourceStore {
    /// Tabla ruta -> lock. Nunca se remueven entradas.
    locks: Mutex<HashMap<PathBuf, Arc<RwLock<()>>>>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Obtiene (o crea exactamente una vez) el lock de una ruta
    fn lock_for(&self, path: &Path) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(
            locks
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(RwLock::new(()))),
        )
    }

    /// Número de locks creados hasta ahora
    pub fn lock_count(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Lee el archivo completo
    pub fn read(&self, path: &Path) -> Result<Vec<u8>, StoreError> {
        let lock = self.lock_for(path);
        let _guard = lock.read().unwrap_or_else(|e| e.into_inner());

        fs::read(path).map_err(|e| StoreError::from_io(path, e))
    }

    /// Sobrescribe el archivo completo
    pub fn write(&self, path: &Path, data: &[u8]) -> Result<(), StoreError> {
        let lock = self.lock_for(path);
        let _guard = lock.write().unwrap_or_else(|e| e.into_inner());

        let mut file = File::create(path).map_err(|e| StoreError::from_io(path, e))?;
        file.write_all(data)
            .and_then(|_| file.sync_data())
            .map_err(|e| StoreError::from_io(path, e))?;

        debug!(path = %path.display(), bytes = data.len(), "archivo escrito");
        Ok(())
    }

    /// Crea el archivo solo si no existe
    ///
    /// Retorna `Ok(false)` si la ruta ya existía. La comprobación y la
    /// creación son una sola operación del sistema de archivos.
    pub fn create(&self, path: &Path, data: &[u8]) -> Result<bool, StoreError> {
        let lock = self.lock_for(path);
        let _guard = lock.write().unwrap_or_else(|e| e.into_inner());

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(StoreError::from_io(path, e)),
        };

        if let Err(e) = file.write_all(data).and_then(|_| file.sync_data()) {
            // No dejar un archivo a medias que bloquee el id para siempre
            drop(file);
            if let Err(remove_err) = fs::remove_file(path) {
                warn!(path = %path.display(), error = %remove_err, "no se pudo limpiar archivo parcial");
            }
            return Err(StoreError::from_io(path, e));
        }

        Ok(true)
    }

    /// Agrega datos al final del archivo (lo crea si no existe)
    pub fn append(&self, path: &Path, data: &[u8]) -> Result<(), StoreError> {
        let lock = self.lock_for(path);
        let _guard = lock.write().unwrap_or_else(|e| e.into_inner());

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| StoreError::from_io(path, e))?;
        file.write_all(data).map_err(|e| StoreError::from_io(path, e))
    }

    /// Verifica si la ruta existe
    pub fn exists(&self, path: &Path) -> bool {
        let lock = self.lock_for(path);
        let _guard = lock.read().unwrap_or_else(|e| e.into_inner());
        path.exists()
    }

    /// Lee `count` líneas de ancho fijo terminando `offset` líneas antes del
    /// final del archivo, sin cargar el archivo completo.
    ///
    /// Las líneas se retornan de la más nueva a la más vieja, sin el salto de
    /// línea. Si la ventana sobrepasa el inicio del archivo se recorta; si
    /// queda completamente antes del inicio el resultado es vacío. Un archivo
    /// inexistente también produce un resultado vacío.
    pub fn read_tail_lines(
        &self,
        path: &Path,
        line_len: usize,
        offset: usize,
        count: usize,
    ) -> Result<Vec<String>, StoreError> {
        if line_len == 0 || count == 0 {
            return Ok(Vec::new());
        }

        let lock = self.lock_for(path);
        let _guard = lock.read().unwrap_or_else(|e| e.into_inner());

        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::from_io(path, e)),
        };
        let len = file
            .metadata()
            .map_err(|e| StoreError::from_io(path, e))?
            .len() as usize;

        // Ventana [first, end) en número de líneas completas
        let total = len / line_len;
        let end = match total.checked_sub(offset) {
            Some(end) if end > 0 => end,
            _ => return Ok(Vec::new()),
        };
        let first = end.saturating_sub(count);

        let mut raw = vec![0u8; (end - first) * line_len];
        file.seek(SeekFrom::Start((first * line_len) as u64))
            .and_then(|_| file.read_exact(&mut raw))
            .map_err(|e| StoreError::from_io(path, e))?;

        let lines = raw
            .chunks(line_len)
            .rev()
            .map(|chunk| String::from_utf8_lossy(chunk).trim_end().to_string())
            .collect();

        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    fn write_lines(store: &ResourceStore, path: &Path, n: usize) {
        for i in 0..n {
            store.append(path, format!("{:03}\n", i).as_bytes()).unwrap();
        }
    }

    #[test]
    fn test_read_write_roundtrip() {
        let dir = tempdir().unwrap();
        let store = ResourceStore::new();
        let path = dir.path().join("a");

        store.write(&path, b"hello").unwrap();
        assert_eq!(store.read(&path).unwrap(), b"hello");

        // Sobrescritura completa
        store.write(&path, b"hi").unwrap();
        assert_eq!(store.read(&path).unwrap(), b"hi");
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let store = ResourceStore::new();

        let result = store.read(&dir.path().join("missing"));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_create_is_exclusive() {
        let dir = tempdir().unwrap();
        let store = ResourceStore::new();
        let path = dir.path().join("once");

        assert!(store.create(&path, b"first").unwrap());
        assert!(!store.create(&path, b"second").unwrap());
        assert_eq!(store.read(&path).unwrap(), b"first");
        assert!(store.exists(&path));
    }

    #[test]
    fn test_lock_created_once_per_path() {
        let dir = tempdir().unwrap();
        let store = ResourceStore::new();
        let path = dir.path().join("x");

        store.write(&path, b"1").unwrap();
        store.read(&path).unwrap();
        store.exists(&path);
        assert_eq!(store.lock_count(), 1);

        store.exists(&dir.path().join("y"));
        assert_eq!(store.lock_count(), 2);
    }

    #[test]
    fn test_tail_read_window() {
        let dir = tempdir().unwrap();
        let store = ResourceStore::new();
        let path = dir.path().join("tag");
        write_lines(&store, &path, 10);

        let lines = store.read_tail_lines(&path, 4, 0, 3).unwrap();
        assert_eq!(lines, vec!["009", "008", "007"]);

        let lines = store.read_tail_lines(&path, 4, 2, 3).unwrap();
        assert_eq!(lines, vec!["007", "006", "005"]);
    }

    #[test]
    fn test_tail_read_clamps_to_file() {
        let dir = tempdir().unwrap();
        let store = ResourceStore::new();
        let path = dir.path().join("short");
        write_lines(&store, &path, 3);

        // Ventana mas grande que el archivo: solo las lineas que existen
        let lines = store.read_tail_lines(&path, 4, 0, 16).unwrap();
        assert_eq!(lines, vec!["002", "001", "000"]);

        // Ventana parcialmente antes del inicio
        let lines = store.read_tail_lines(&path, 4, 2, 16).unwrap();
        assert_eq!(lines, vec!["000"]);

        // Ventana completamente antes del inicio
        assert!(store.read_tail_lines(&path, 4, 3, 16).unwrap().is_empty());
        assert!(store.read_tail_lines(&path, 4, 50, 16).unwrap().is_empty());
    }

    #[test]
    fn test_tail_read_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = ResourceStore::new();

        let lines = store.read_tail_lines(&dir.path().join("none"), 4, 0, 16).unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn test_concurrent_writers_never_interleave() {
        let dir = tempdir().unwrap();
        let store = Arc::new(ResourceStore::new());
        let path = dir.path().join("shared");
        store.write(&path, &[b'a'; 8192]).unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::new();

        for byte in [b'a', b'b', b'c', b'd'] {
            let store = Arc::clone(&store);
            let path = path.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    store.write(&path, &[byte; 8192]).unwrap();
                }
            }));
        }

        // Un lector nunca observa una escritura parcial
        let reader = {
            let store = Arc::clone(&store);
            let path = path.clone();
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    let data = store.read(&path).unwrap();
                    assert_eq!(data.len(), 8192);
                    assert!(data.iter().all(|b| *b == data[0]));
                }
            })
        };

        for handle in handles {
            handle.join().unwrap();
        }
        stop.store(true, Ordering::Relaxed);
        reader.join().unwrap();
    }

    #[test]
    fn test_different_paths_do_not_block() {
        let dir = tempdir().unwrap();
        let store = Arc::new(ResourceStore::new());
        let held = dir.path().join("held");
        let other = dir.path().join("other");
        store.write(&held, b"x").unwrap();

        // Mantener el lock de escritura de `held` mientras otro thread usa `other`
        let lock = store.lock_for(&held);
        let _guard = lock.write().unwrap();

        let start = Instant::now();
        let handle = {
            let store = Arc::clone(&store);
            thread::spawn(move || store.write(&other, b"y").unwrap())
        };
        handle.join().unwrap();
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
