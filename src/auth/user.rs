//! # Usuario
//! src/auth/user.rs
//!
//! Un usuario vivo en memoria. Los campos de identidad son inmutables; la
//! sesión (token y expiración) y el puntero al último post cambian y por eso
//! van detrás de su propio mutex.

use crate::id::I512;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::sync::{Mutex, MutexGuard};

/// Registro persistido de un usuario
///
/// El token y su expiración nunca se escriben a disco.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: I512,
    pub salt: I512,
    pub username: String,
    pub digest: I512,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<I512>,
}

/// Estado de la sesión activa
#[derive(Debug, Default)]
pub(crate) struct Session {
    pub(crate) token: Option<I512>,
    /// Milisegundos desde epoch
    pub(crate) expiry: i64,
}

#[derive(Debug)]
pub struct User {
    pub id: I512,
    pub salt: I512,
    pub username: String,
    pub digest: I512,
    pub(crate) session: Mutex<Session>,
    /// Cabeza de la cadena de posts propios
    latest: Mutex<Option<I512>>,
}

impl User {
    pub fn new(id: I512, salt: I512, username: &str, digest: I512) -> Self {
        Self {
            id,
            salt,
            username: username.to_string(),
            digest,
            session: Mutex::new(Session::default()),
            latest: Mutex::new(None),
        }
    }

    pub fn from_record(record: UserRecord) -> Self {
        let user = Self::new(record.id, record.salt, &record.username, record.digest);
        *user.lock_latest() = record.latest;
        user
    }

    pub fn to_record(&self) -> UserRecord {
        self.record_with(self.latest())
    }

    /// Registro con un `latest` explícito
    pub fn record_with(&self, latest: Option<I512>) -> UserRecord {
        UserRecord {
            id: self.id,
            salt: self.salt,
            username: self.username.clone(),
            digest: self.digest,
            latest,
        }
    }

    /// Último post del usuario
    pub fn latest(&self) -> Option<I512> {
        *self.lock_latest()
    }

    /// Toma el lock de la cadena de posts
    ///
    /// Quien publica lo mantiene desde que lee `latest` hasta que persiste el
    /// nuevo valor, así dos posts del mismo usuario nunca apuntan al mismo
    /// `previous`.
    pub fn lock_latest(&self) -> MutexGuard<'_, Option<I512>> {
        self.latest.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Token de sesión actual, si hay uno
    pub fn token(&self) -> Option<I512> {
        self.lock_session().token
    }

    pub fn expiry(&self) -> i64 {
        self.lock_session().expiry
    }

    pub(crate) fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Digest de una contraseña: SHA-512(salt del sitio ‖ salt del usuario ‖ contraseña)
pub fn hash_password(site_salt: &str, salt: &I512, password: &str) -> I512 {
    let mut hasher = Sha512::new();
    hasher.update(site_salt.as_bytes());
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());

    let mut out = [0u8; crate::id::BYTES];
    out.copy_from_slice(&hasher.finalize());
    I512::from_bytes(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_depends_on_every_input() {
        let salt = I512::random();
        let other_salt = I512::random();
        let base = hash_password("site", &salt, "swordfish1");

        assert_eq!(base, hash_password("site", &salt, "swordfish1"));
        assert_ne!(base, hash_password("other", &salt, "swordfish1"));
        assert_ne!(base, hash_password("site", &other_salt, "swordfish1"));
        assert_ne!(base, hash_password("site", &salt, "swordfish2"));
    }

    #[test]
    fn test_record_never_contains_token() {
        let user = User::new(I512::random(), I512::random(), "alice01", I512::random());
        user.lock_session().token = Some(I512::random());

        let json = serde_json::to_string(&user.to_record()).unwrap();
        assert!(!json.contains("token"));
        assert!(!json.contains("expiry"));
        assert!(!json.contains("latest"));
    }

    #[test]
    fn test_record_roundtrip_with_latest() {
        let user = User::new(I512::random(), I512::random(), "alice01", I512::random());
        *user.lock_latest() = Some(I512::random());

        let record = user.to_record();
        let json = serde_json::to_vec(&record).unwrap();
        let back: UserRecord = serde_json::from_slice(&json).unwrap();
        assert_eq!(back, record);

        let restored = User::from_record(back);
        assert_eq!(restored.latest(), user.latest());
        assert!(restored.token().is_none());
    }
}
