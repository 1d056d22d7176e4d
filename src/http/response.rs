//! # Construcción de Respuestas
//! src/http/response.rs
//!
//! El sitio siempre responde `200 OK`; los errores van dentro del body.
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: text/html; charset=utf-8\r\n
//! Set-Cookie: token=<128 hex>\r\n
//! \r\n
//! <html>...
//! ```

use crate::id::I512;

pub const STATUS_LINE: &str = "HTTP/1.1 200 OK";
pub const HTML_TYPE: &str = "text/html; charset=utf-8";
pub const XML_TYPE: &str = "application/xml";

/// Body de la respuesta genérica de error
pub const ERROR_BODY: &str = "<b>Error</b>";

/// Respuesta lista para serializar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    content_type: &'static str,
    /// Token de sesión a enviar como cookie
    cookie: Option<I512>,
    body: Vec<u8>,
}

impl Response {
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            content_type: HTML_TYPE,
            cookie: None,
            body: body.into().into_bytes(),
        }
    }

    pub fn xml(body: impl Into<String>) -> Self {
        Self {
            content_type: XML_TYPE,
            cookie: None,
            body: body.into().into_bytes(),
        }
    }

    /// Respuesta genérica de error
    pub fn error() -> Self {
        Self::html(ERROR_BODY)
    }

    /// Agrega (o quita) la cookie de sesión
    pub fn with_cookie(mut self, token: Option<I512>) -> Self {
        self.cookie = token;
        self
    }

    pub fn content_type(&self) -> &str {
        self.content_type
    }

    pub fn cookie(&self) -> Option<I512> {
        self.cookie
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Convierte la respuesta a bytes listos para el socket
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!("{}\r\nContent-Type: {}\r\n", STATUS_LINE, self.content_type);
        if let Some(token) = &self.cookie {
            head.push_str(&format!("Set-Cookie: token={}\r\n", token));
        }
        head.push_str("\r\n");

        let mut result = Vec::with_capacity(head.len() + self.body.len());
        result.extend_from_slice(head.as_bytes());
        result.extend_from_slice(&self.body);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_bytes() {
        let bytes = Response::html("<p>hi</p>").to_bytes();
        let text = String::from_utf8(bytes).unwrap();

        assert_eq!(
            text,
            "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\n\r\n<p>hi</p>"
        );
    }

    #[test]
    fn test_cookie_header() {
        let token = I512::random();
        let text = String::from_utf8(Response::xml("<rss/>").with_cookie(Some(token)).to_bytes()).unwrap();

        assert!(text.starts_with("HTTP/1.1 200 OK\r\nContent-Type: application/xml\r\n"));
        assert!(text.contains(&format!("Set-Cookie: token={}\r\n\r\n", token.to_hex())));
        assert!(text.ends_with("\r\n\r\n<rss/>"));
    }

    #[test]
    fn test_error_is_still_ok() {
        let response = Response::error();
        assert_eq!(response.body(), ERROR_BODY.as_bytes());
        assert_eq!(response.content_type(), HTML_TYPE);
        assert!(String::from_utf8(response.to_bytes()).unwrap().starts_with(STATUS_LINE));
    }
}
