//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Mapea el primer segmento del path (después de `sub_dir`) a un handler.
//!
//! ```text
//! /<sub_dir>/user/<id>/<post>
//!            ^^^^ ^^^^^^^^^^^
//!            handler   args
//! ```
//!
//! Un segmento desconocido produce la respuesta genérica de error. Los
//! argumentos que faltan no son error: cada handler usa sus defaults.

use crate::auth::User;
use crate::http::{Request, Response};
use crate::server::AppState;
use std::sync::Arc;

/// Todo lo que un handler necesita para generar su página
pub struct RequestContext<'a> {
    pub state: &'a AppState,
    pub request: &'a Request,
    /// Usuario autenticado, si hay
    pub viewer: Option<Arc<User>>,
    /// Motivo de rechazo de un registro, para mostrarlo en el formulario
    pub notice: Option<String>,
    /// Segmentos del path después del nombre del handler
    pub args: Vec<String>,
}

impl RequestContext<'_> {
    /// Argumento del path en la posición `index`, si existe y no está vacío
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(|s| s.as_str()).filter(|s| !s.is_empty())
    }
}

/// Tipo de función handler
pub type Handler = fn(&RequestContext<'_>) -> Response;

/// Nombre con el que se registra un request sin ruta válida
pub const UNROUTED: &str = "error";

/// Router que mapea nombres de handler a funciones
pub struct Router {
    routes: Vec<(String, Handler)>,
}

/// Separa un path en (handler, args) después de quitar `sub_dir`
///
/// Si el path no está bajo `sub_dir` se trata como la raíz.
pub fn split_location(location: &str, sub_dir: &str) -> (String, Vec<String>) {
    let rest = location.strip_prefix(sub_dir).unwrap_or("");
    let mut segments = rest.split('/');
    let handler = segments.next().unwrap_or("").to_string();
    let args = segments.map(|s| s.to_string()).collect();
    (handler, args)
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Registra un handler para un primer segmento
    pub fn register(&mut self, name: &str, handler: Handler) {
        self.routes.push((name.to_string(), handler));
    }

    pub fn lookup(&self, name: &str) -> Option<Handler> {
        self.routes
            .iter()
            .find(|(route, _)| route == name)
            .map(|(_, handler)| *handler)
    }

    /// Ejecuta el handler registrado para `name`
    ///
    /// `name` es el primer segmento ya separado con [`split_location`].
    /// Retorna el nombre con el que se registró el request y la respuesta.
    pub fn route<'n>(&self, name: &'n str, ctx: &RequestContext<'_>) -> (&'n str, Response) {
        match self.lookup(name) {
            Some(handler) => (name, handler(ctx)),
            None => (UNROUTED, Response::error()),
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
