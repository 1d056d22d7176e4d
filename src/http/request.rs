//! # Parsing de Requests
//! src/http/request.rs
//!
//! Parser tolerante para el subconjunto de HTTP/1.1 que usa el sitio.
//!
//! ## Formato
//!
//! ```text
//! POST /user/<id> HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! Cookie: token=<128 hex>\r\n
//! \r\n
//! post=hello+%23world&quote=<id>
//! ```
//!
//! ## Componentes
//!
//! 1. **Request Line**: exactamente tres tokens separados por espacio. Si no,
//!    el request queda sin `location` y termina en la respuesta de error.
//! 2. **Headers**: `Name: Value` hasta la primera línea vacía. Las líneas sin
//!    `:` se registran y se ignoran.
//! 3. **Form**: el resto de las líneas, pares `key=value` unidos por `&`.
//!
//! Ningún error de formato aborta el parsing: un campo faltante simplemente
//! no aparece en las búsquedas posteriores.

use std::collections::HashMap;
use tracing::debug;

/// Métodos HTTP
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    GET,
    HEAD,
    POST,
    /// Cualquier otro token; se atiende igual que GET
    Other(String),
}

impl Method {
    fn parse(s: &str) -> Self {
        match s {
            "GET" => Method::GET,
            "HEAD" => Method::HEAD,
            "POST" => Method::POST,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::Other(s) => s,
        }
    }
}

/// Errores que impiden construir un request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("request vacío")]
    EmptyRequest,

    #[error("request no es UTF-8 válido")]
    InvalidUtf8,
}

/// Request parseado
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// Request line válida: (método, protocolo)
    line: Option<(Method, String)>,

    /// Path sin query string
    location: Option<String>,

    /// Headers con el nombre en minúsculas
    headers: HashMap<String, String>,

    /// Campos de formulario ya decodificados (query string + body)
    form: HashMap<String, String>,
}

impl Request {
    /// Parsea un request desde los bytes leídos del socket
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use d3ad::http::Request;
    ///
    /// let raw = b"POST /login HTTP/1.1\r\n\r\nusername=alice&password=swordfish1";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.location(), Some("/login"));
    /// assert_eq!(request.form("username"), Some("alice"));
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(buffer).map_err(|_| ParseError::InvalidUtf8)?;
        let text = text.trim_end_matches('\0');
        if text.trim().is_empty() {
            return Err(ParseError::EmptyRequest);
        }

        let mut request = Request::default();
        let mut lines = text.lines();

        // 1. Request line
        if let Some(first) = lines.next() {
            request.parse_request_line(first);
        }

        // 2. Headers hasta la línea vacía
        for line in lines.by_ref() {
            if line.is_empty() || line.starts_with('\0') {
                break;
            }
            match line.split_once(':') {
                Some((name, value)) => {
                    request
                        .headers
                        .insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
                }
                None => debug!(line = ?line, "línea de header inválida"),
            }
        }

        // 3. Formulario
        for line in lines {
            if line.is_empty() || line.starts_with('\0') {
                break;
            }
            request.parse_form_line(line);
        }

        Ok(request)
    }

    fn parse_request_line(&mut self, line: &str) {
        let parts: Vec<&str> = line.split(' ').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            debug!(line = ?line, "request line inválida");
            return;
        }

        let (path, query) = match parts[1].split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (parts[1], None),
        };
        if let Some(query) = query {
            self.parse_form_line(query);
        }

        self.line = Some((Method::parse(parts[0]), parts[2].to_string()));
        self.location = Some(path.to_string());
    }

    /// Parsea `key=value&key=value`, decodificando cada valor
    fn parse_form_line(&mut self, line: &str) {
        for pair in line.split('&') {
            if pair.is_empty() {
                continue;
            }
            let Some((key, value)) = pair.split_once('=') else {
                debug!(field = ?pair, "campo de formulario sin '='");
                continue;
            };
            match form_decode(value.trim()) {
                Some(value) => {
                    self.form.insert(key.trim().to_string(), value);
                }
                None => debug!(field = ?key, "campo de formulario mal codificado"),
            }
        }
    }

    // === Accesores ===

    pub fn method(&self) -> Option<&Method> {
        self.line.as_ref().map(|(method, _)| method)
    }

    pub fn protocol(&self) -> Option<&str> {
        self.line.as_ref().map(|(_, protocol)| protocol.as_str())
    }

    /// Path pedido; `None` si la request line era inválida
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Busca un header sin distinguir mayúsculas
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|s| s.as_str())
    }

    pub fn form(&self, key: &str) -> Option<&str> {
        self.form.get(key).map(|s| s.as_str())
    }

    pub fn has_form(&self, key: &str) -> bool {
        self.form.contains_key(key)
    }

    /// Valor de la cookie `token`, si viene
    pub fn cookie_token(&self) -> Option<&str> {
        self.header("cookie")?
            .split(';')
            .find_map(|part| part.trim().strip_prefix("token="))
    }
}

/// Decodifica un valor `application/x-www-form-urlencoded`
fn form_decode(value: &str) -> Option<String> {
    let spaced = value.replace('+', " ");
    urlencoding::decode(&spaced).ok().map(|v| v.into_owned())
}
