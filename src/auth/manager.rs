//! # Identity Manager
//! src/auth/manager.rs
//!
//! Mantiene tres vistas del mismo conjunto de usuarios:
//!
//! - `by_id` y `by_name` bajo un único `RwLock`, de modo que reservar un
//!   nombre y un id nuevo es una sola sección crítica
//! - `tokens` (token -> id de usuario) bajo su propio `Mutex`
//!
//! Orden de locks cuando se toman juntos: `tokens` antes que la sesión del
//! usuario. El registro nunca se toma con `tokens` adentro.

use super::user::{hash_password, User, UserRecord};
use crate::id::I512;
use crate::store::{ResourceStore, StoreError};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 64;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 256;

/// Errores de identidad
///
/// Los mensajes se muestran tal cual en la página de registro.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Nombre fuera de `USERNAME_MIN..=USERNAME_MAX` o con caracteres que no
    /// son letras o dígitos ASCII. El mínimo es 3 y no 6: nombres cortos
    /// como `bob` son válidos.
    #[error("Username must be {USERNAME_MIN} to {USERNAME_MAX} letters or digits")]
    InvalidUsername,

    #[error("Password must be {PASSWORD_MIN} to {PASSWORD_MAX} characters")]
    InvalidPassword,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Username is already taken")]
    DuplicateUsername,

    #[error("Wrong username or password")]
    BadCredentials,

    #[error("Storage failure")]
    Storage(#[from] StoreError),

    #[error("Storage failure")]
    Encode(#[from] serde_json::Error),
}

#[derive(Default)]
struct Registry {
    by_id: HashMap<I512, Arc<User>>,
    by_name: HashMap<String, Arc<User>>,
}

pub struct IdentityManager {
    store: Arc<ResourceStore>,
    user_dir: PathBuf,
    site_salt: String,
    token_ttl: Duration,
    registry: RwLock<Registry>,
    tokens: Mutex<HashMap<I512, I512>>,
}

/// Milisegundos desde epoch
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn valid_username(username: &str) -> bool {
    (USERNAME_MIN..=USERNAME_MAX).contains(&username.len())
        && username.bytes().all(|b| b.is_ascii_alphanumeric())
}

fn valid_password(password: &str) -> bool {
    (PASSWORD_MIN..=PASSWORD_MAX).contains(&password.chars().count())
}

impl IdentityManager {
    /// Crea un manager vacío (sin leer disco)
    pub fn new(store: Arc<ResourceStore>, user_dir: impl Into<PathBuf>, site_salt: &str, token_ttl: Duration) -> Self {
        Self {
            store,
            user_dir: user_dir.into(),
            site_salt: site_salt.to_string(),
            token_ttl,
            registry: RwLock::new(Registry::default()),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Crea el manager y carga todos los usuarios del directorio
    ///
    /// Registros mal formados, con nombre inválido o duplicados se saltan con
    /// un warning. Un directorio inexistente equivale a cero usuarios.
    pub fn load(
        store: Arc<ResourceStore>,
        user_dir: impl Into<PathBuf>,
        site_salt: &str,
        token_ttl: Duration,
    ) -> Result<Self, StoreError> {
        let manager = Self::new(store, user_dir, site_salt, token_ttl);

        let entries = match fs::read_dir(&manager.user_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(manager),
            Err(e) => {
                return Err(StoreError::Io {
                    path: manager.user_dir.clone(),
                    source: e,
                })
            }
        };

        let mut loaded = 0usize;
        {
            let mut registry = manager.write_registry();
            for entry in entries.flatten() {
                let path = entry.path();
                match manager.load_record(&path) {
                    Some(record) => {
                        if registry.by_id.contains_key(&record.id) || registry.by_name.contains_key(&record.username) {
                            warn!(path = %path.display(), "usuario duplicado, se ignora");
                            continue;
                        }
                        let user = Arc::new(User::from_record(record));
                        registry.by_name.insert(user.username.clone(), Arc::clone(&user));
                        registry.by_id.insert(user.id, user);
                        loaded += 1;
                    }
                    None => warn!(path = %path.display(), "registro de usuario inválido, se ignora"),
                }
            }
        }

        info!(users = loaded, dir = %manager.user_dir.display(), "usuarios cargados");
        Ok(manager)
    }

    fn load_record(&self, path: &Path) -> Option<UserRecord> {
        let bytes = self.store.read(path).ok()?;
        let record: UserRecord = serde_json::from_slice(&bytes).ok()?;

        // El nombre del archivo debe ser el id del registro
        let name = path.file_name()?.to_str()?;
        if name != record.id.to_hex() || !valid_username(&record.username) {
            return None;
        }
        Some(record)
    }

    fn read_registry(&self) -> std::sync::RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_registry(&self) -> std::sync::RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_tokens(&self) -> std::sync::MutexGuard<'_, HashMap<I512, I512>> {
        self.tokens.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registra un usuario nuevo y le abre una sesión
    pub fn register(&self, username: &str, password: &str, confirm: &str) -> Result<Arc<User>, AuthError> {
        if !valid_username(username) {
            return Err(AuthError::InvalidUsername);
        }
        if !valid_password(password) {
            return Err(AuthError::InvalidPassword);
        }
        if password != confirm {
            return Err(AuthError::PasswordMismatch);
        }

        let salt = I512::random();
        let digest = hash_password(&self.site_salt, &salt, password);

        // Reserva de nombre e id en la misma sección crítica
        let user = {
            let mut registry = self.write_registry();
            if registry.by_name.contains_key(username) {
                return Err(AuthError::DuplicateUsername);
            }

            let user = loop {
                if let Entry::Vacant(slot) = registry.by_id.entry(I512::random()) {
                    let user = Arc::new(User::new(*slot.key(), salt, username, digest));
                    slot.insert(Arc::clone(&user));
                    break user;
                }
            };
            registry.by_name.insert(username.to_string(), Arc::clone(&user));
            user
        };

        if let Err(e) = self.save_user(&user) {
            warn!(username = ?username, error = %e, "no se pudo persistir el usuario, se revierte la reserva");
            let mut registry = self.write_registry();
            registry.by_id.remove(&user.id);
            registry.by_name.remove(username);
            return Err(e);
        }

        info!(username = ?username, id = ?user.id, "usuario registrado");
        self.start_session(&user);
        Ok(user)
    }

    /// Verifica credenciales y emite un token nuevo
    pub fn login(&self, username: &str, password: &str) -> Result<Arc<User>, AuthError> {
        let user = self.resolve_by_name(username).ok_or(AuthError::BadCredentials)?;

        if hash_password(&self.site_salt, &user.salt, password) != user.digest {
            debug!(username = ?username, "contraseña incorrecta");
            return Err(AuthError::BadCredentials);
        }

        self.start_session(&user);
        debug!(username = ?username, "login");
        Ok(user)
    }

    /// Reemplaza el token del usuario por uno nuevo y único
    fn start_session(&self, user: &User) -> I512 {
        let mut tokens = self.lock_tokens();
        let mut session = user.lock_session();

        if let Some(old) = session.token.take() {
            tokens.remove(&old);
        }

        let token = loop {
            if let Entry::Vacant(slot) = tokens.entry(I512::random()) {
                let token = *slot.key();
                slot.insert(user.id);
                break token;
            }
        };

        let ttl = i64::try_from(self.token_ttl.as_millis()).unwrap_or(i64::MAX);
        session.token = Some(token);
        session.expiry = now_ms().saturating_add(ttl);
        token
    }

    /// Resuelve el valor de la cookie `token` a su usuario
    ///
    /// Retorna `None` si el texto no es un id, si nadie tiene ese token, si
    /// el token fue reemplazado por un login posterior o si expiró.
    pub fn resolve_token(&self, text: &str) -> Option<Arc<User>> {
        let token: I512 = text.trim().parse().ok()?;
        let owner = *self.lock_tokens().get(&token)?;
        let user = self.resolve_by_id(&owner)?;

        let session = user.lock_session();
        if session.token != Some(token) || now_ms() > session.expiry {
            return None;
        }
        drop(session);
        Some(user)
    }

    pub fn resolve_by_id(&self, id: &I512) -> Option<Arc<User>> {
        self.read_registry().by_id.get(id).cloned()
    }

    pub fn resolve_by_name(&self, name: &str) -> Option<Arc<User>> {
        self.read_registry().by_name.get(name).cloned()
    }

    /// Persiste el registro del usuario (sin token ni expiración)
    pub fn save_user(&self, user: &User) -> Result<(), AuthError> {
        self.save_record(&user.to_record())
    }

    /// Persiste un registro ya armado
    ///
    /// Lo usa quien tiene tomado el lock de la cadena del usuario y no puede
    /// volver a leer `latest`.
    pub fn save_record(&self, record: &UserRecord) -> Result<(), AuthError> {
        let bytes = serde_json::to_vec_pretty(record)?;
        self.store.write(&self.user_dir.join(record.id.to_hex()), &bytes)?;
        Ok(())
    }

    pub fn user_count(&self) -> usize {
        self.read_registry().by_id.len()
    }

    /// Sesiones con token vigente
    pub fn active_sessions(&self) -> usize {
        let owners: Vec<I512> = self.lock_tokens().values().copied().collect();
        let now = now_ms();
        owners
            .iter()
            .filter_map(|id| self.resolve_by_id(id))
            .filter(|user| user.expiry() >= now)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;
    use tempfile::{tempdir, TempDir};

    fn manager(ttl: Duration) -> (TempDir, IdentityManager) {
        let dir = tempdir().unwrap();
        let manager = IdentityManager::new(Arc::new(ResourceStore::new()), dir.path(), "salt", ttl);
        (dir, manager)
    }

    fn day() -> Duration {
        Duration::from_secs(86_400)
    }

    #[test]
    fn test_register_and_login() {
        let (_dir, ids) = manager(day());

        let user = ids.register("alice01", "password1", "password1").unwrap();
        assert!(user.token().is_some());

        let again = ids.login("alice01", "password1").unwrap();
        assert!(Arc::ptr_eq(&user, &again));
        assert!(ids.login("alice01", "wrongpass").is_err());
        assert!(ids.login("nobody00", "password1").is_err());
    }

    #[test]
    fn test_register_rejections() {
        let (_dir, ids) = manager(day());

        assert!(matches!(ids.register("ab", "password1", "password1"), Err(AuthError::InvalidUsername)));
        assert!(ids.register("bob", "password1", "password1").is_ok());
        assert!(matches!(
            ids.register(&"a".repeat(USERNAME_MAX + 1), "password1", "password1"),
            Err(AuthError::InvalidUsername)
        ));
        assert!(matches!(ids.register("alice-01", "password1", "password1"), Err(AuthError::InvalidUsername)));
        assert!(matches!(ids.register("alice01", "short", "short"), Err(AuthError::InvalidPassword)));
        assert!(matches!(ids.register("alice01", "password1", "password2"), Err(AuthError::PasswordMismatch)));

        ids.register("alice01", "password1", "password1").unwrap();
        assert!(matches!(ids.register("alice01", "password9", "password9"), Err(AuthError::DuplicateUsername)));
        assert_eq!(ids.user_count(), 2);
    }

    #[test]
    fn test_login_replaces_token() {
        let (_dir, ids) = manager(day());
        let user = ids.register("alice01", "password1", "password1").unwrap();
        let first = user.token().unwrap();

        ids.login("alice01", "password1").unwrap();
        let second = user.token().unwrap();

        assert_ne!(first, second);
        assert!(ids.resolve_token(&first.to_hex()).is_none());
        assert!(ids.resolve_token(&second.to_hex()).is_some());
        assert_eq!(ids.active_sessions(), 1);
    }

    #[test]
    fn test_token_expiry() {
        let (_dir, ids) = manager(Duration::ZERO);
        let user = ids.register("alice01", "password1", "password1").unwrap();
        let token = user.token().unwrap().to_hex();

        thread::sleep(Duration::from_millis(5));
        assert!(ids.resolve_token(&token).is_none());
        assert_eq!(ids.active_sessions(), 0);
    }

    #[test]
    fn test_resolve_garbage_token() {
        let (_dir, ids) = manager(day());
        assert!(ids.resolve_token("").is_none());
        assert!(ids.resolve_token("not-a-token").is_none());
        assert!(ids.resolve_token(&I512::random().to_hex()).is_none());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempdir().unwrap();
        let store = Arc::new(ResourceStore::new());
        let id = {
            let ids = IdentityManager::new(Arc::clone(&store), dir.path(), "salt", day());
            let user = ids.register("alice01", "password1", "password1").unwrap();
            *user.lock_latest() = Some(I512::random());
            ids.save_user(&user).unwrap();
            user.id
        };

        // Basura en el directorio no impide la carga
        fs::write(dir.path().join("garbage"), b"{not json").unwrap();

        let ids = IdentityManager::load(store, dir.path(), "salt", day()).unwrap();
        assert_eq!(ids.user_count(), 1);

        let user = ids.resolve_by_name("alice01").unwrap();
        assert_eq!(user.id, id);
        assert!(user.latest().is_some());
        // Los tokens no sobreviven al reinicio
        assert!(user.token().is_none());
        assert!(ids.login("alice01", "password1").is_ok());
    }

    #[test]
    fn test_load_missing_dir_is_empty() {
        let dir = tempdir().unwrap();
        let ids = IdentityManager::load(Arc::new(ResourceStore::new()), dir.path().join("none"), "", day()).unwrap();
        assert_eq!(ids.user_count(), 0);
    }

    #[test]
    fn test_failed_persist_rolls_back() {
        let dir = tempdir().unwrap();
        let ids = IdentityManager::new(Arc::new(ResourceStore::new()), dir.path().join("missing"), "", day());

        assert!(matches!(ids.register("alice01", "password1", "password1"), Err(AuthError::Storage(_))));
        assert_eq!(ids.user_count(), 0);
        assert!(ids.resolve_by_name("alice01").is_none());
    }

    #[test]
    fn test_concurrent_registration_same_name() {
        let (dir, ids) = manager(day());
        let ids = Arc::new(ids);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ids = Arc::clone(&ids);
                thread::spawn(move || ids.register("bobbyb", "password1", "password1").is_ok())
            })
            .collect();
        let winners = handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count();

        assert_eq!(winners, 1);
        assert_eq!(ids.user_count(), 1);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_concurrent_sessions_are_unique() {
        let (_dir, ids) = manager(day());
        let ids = Arc::new(ids);

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let ids = Arc::clone(&ids);
                thread::spawn(move || {
                    let name = format!("user{:04}", i);
                    let user = ids.register(&name, "password1", "password1").unwrap();
                    (user.id, user.token().unwrap())
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let ids_seen: HashSet<_> = results.iter().map(|(id, _)| *id).collect();
        let tokens_seen: HashSet<_> = results.iter().map(|(_, token)| *token).collect();
        assert_eq!(ids_seen.len(), 16);
        assert_eq!(tokens_seen.len(), 16);
        assert_eq!(ids.active_sessions(), 16);
    }
}
