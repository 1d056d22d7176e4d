//! # Identificadores de 512 bits
//! src/id.rs
//!
//! Los usuarios, posts, salts, digests y tokens de sesión se representan con
//! un entero sin signo de 512 bits. Su forma textual canónica es hexadecimal
//! en minúsculas de ancho fijo (128 caracteres), lo que permite usarla como
//! nombre de archivo y como línea de ancho fijo en los índices de tags.

use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Número de bytes de un identificador
pub const BYTES: usize = 64;

/// Longitud de la codificación textual canónica
pub const HEX_LEN: usize = BYTES * 2;

/// Entero sin signo de 512 bits (big-endian)
///
/// El orden derivado sobre el arreglo big-endian coincide con el orden numérico.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct I512([u8; BYTES]);

/// Error al interpretar un identificador textual
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("longitud inválida: se esperaban {HEX_LEN} caracteres, llegaron {0}")]
    InvalidLength(usize),

    #[error("caracter no hexadecimal")]
    InvalidHex,
}

impl I512 {
    /// Construye un identificador desde bytes big-endian
    pub fn from_bytes(bytes: [u8; BYTES]) -> Self {
        Self(bytes)
    }

    /// Genera un identificador aleatorio con el RNG criptográfico del thread
    pub fn random() -> Self {
        let mut bytes = [0u8; BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; BYTES] {
        &self.0
    }

    /// Codificación textual canónica (hex en minúsculas, 128 caracteres)
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for I512 {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != HEX_LEN {
            return Err(IdError::InvalidLength(s.len()));
        }
        let mut bytes = [0u8; BYTES];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| IdError::InvalidHex)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for I512 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for I512 {
    /// Solo los primeros 16 caracteres, suficiente para logs
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I512({}..)", &self.to_hex()[..16])
    }
}

impl Serialize for I512 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for I512 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_is_fixed_width() {
        let zero = I512::from_bytes([0u8; BYTES]);
        assert_eq!(zero.to_hex().len(), HEX_LEN);
        assert!(zero.to_hex().chars().all(|c| c == '0'));
    }

    #[test]
    fn test_parse_display() {
        let id = I512::random();
        let parsed: I512 = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!("abc".parse::<I512>(), Err(IdError::InvalidLength(3)));

        let bad = "z".repeat(HEX_LEN);
        assert_eq!(bad.parse::<I512>(), Err(IdError::InvalidHex));
    }

    #[test]
    fn test_ordering_is_numeric() {
        let mut low = [0u8; BYTES];
        low[BYTES - 1] = 0xFF;
        let mut high = [0u8; BYTES];
        high[0] = 0x01;

        assert!(I512::from_bytes(low) < I512::from_bytes(high));
    }

    #[test]
    fn test_serde_as_string() {
        let id = I512::random();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.to_hex()));

        let back: I512 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
