//! # Pipeline de un Request
//! src/server/pipeline.rs
//!
//! Todo lo que le pasa a una conexión aceptada, en orden:
//!
//! ```text
//! leer → parsear → autenticar → aplicar post → rutear → responder → cerrar
//! ```
//!
//! Cada conexión lleva exactamente un request. Un request ilegible no recibe
//! respuesta; cualquier otro recibe `200 OK` con la página o con el cuerpo
//! genérico de error.

use crate::auth::User;
use crate::content::ContentError;
use crate::handlers;
use crate::http::response::ERROR_BODY;
use crate::http::{Request, Response};
use crate::id::I512;
use crate::metrics::Event;
use crate::router::{split_location, RequestContext, Router, UNROUTED};
use crate::server::AppState;
use crate::tags;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Resultado de la etapa de autenticación
#[derive(Default)]
pub struct Identity {
    pub viewer: Option<Arc<User>>,
    /// Motivo por el que se rechazó un registro
    pub notice: Option<String>,
}

pub struct Pipeline {
    state: Arc<AppState>,
    router: Router,
}

impl Pipeline {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            router: handlers::site_router(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Atiende una conexión completa; los errores de socket solo se registran
    pub fn handle(&self, mut stream: TcpStream) {
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        let metrics = &self.state.metrics;
        metrics.increment_active_workers();
        if let Err(e) = self.serve(&mut stream) {
            match e.kind() {
                ErrorKind::WouldBlock | ErrorKind::TimedOut => debug!(peer = %peer, "timeout del socket"),
                _ => warn!(peer = %peer, error = %e, "error atendiendo la conexión"),
            }
        }
        let _ = stream.shutdown(Shutdown::Both);
        metrics.decrement_active_workers();
    }

    fn serve(&self, stream: &mut TcpStream) -> io::Result<()> {
        let start = Instant::now();
        let timeout = Some(self.state.config.socket_timeout());
        stream.set_read_timeout(timeout)?;
        stream.set_write_timeout(timeout)?;

        let buffer = read_request(stream, self.state.config.request_buffer_size)?;
        if buffer.is_empty() {
            debug!("conexión cerrada sin datos");
            return Ok(());
        }

        let request = match Request::parse(&buffer) {
            Ok(request) => request,
            Err(e) => {
                debug!(error = %e, "request ilegible, sin respuesta");
                return Ok(());
            }
        };

        let (handler, response) = self.process(&request);
        stream.write_all(&response.to_bytes())?;
        stream.flush()?;

        let latency = start.elapsed();
        let is_error = response.body() == ERROR_BODY.as_bytes();
        self.state.metrics.record_request(&handler, is_error, latency);
        info!(
            method = ?request.method().map(|m| m.as_str()),
            location = ?request.location(),
            handler = %handler,
            latency_ms = latency.as_secs_f64() * 1000.0,
            "request atendido"
        );
        Ok(())
    }

    /// Autentica, aplica la mutación y rutea un request ya parseado
    ///
    /// Retorna el nombre del handler elegido y la respuesta final.
    pub fn process(&self, request: &Request) -> (String, Response) {
        let Identity { viewer, notice } = self.authenticate(request);

        let mut failed = false;
        if let (Some(author), Some(message)) = (&viewer, request.form("post")) {
            if let Err(e) = self.apply_post(author, message, request.form("quote")) {
                debug!(user = ?author.username, error = %e, "post rechazado");
                failed = true;
            }
        }

        let routed = match request.location() {
            Some(location) if !failed => {
                let (name, args) = split_location(location, &self.state.config.sub_dir);
                let ctx = RequestContext {
                    state: &self.state,
                    request,
                    viewer: viewer.clone(),
                    notice,
                    args,
                };
                let (name, response) = self.router.route(&name, &ctx);
                (name.to_string(), response)
            }
            _ => (UNROUTED.to_string(), Response::error()),
        };

        let token = viewer.and_then(|user| user.token());
        (routed.0, routed.1.with_cookie(token))
    }

    /// Login, registro o cookie, en ese orden
    pub fn authenticate(&self, request: &Request) -> Identity {
        let identity = &self.state.identity;
        let metrics = &self.state.metrics;

        if let (Some(username), Some(password)) = (request.form("username"), request.form("password")) {
            thread::sleep(self.state.config.auth_delay());
            return match identity.login(username, password) {
                Ok(user) => {
                    metrics.record_event(Event::Login);
                    Identity {
                        viewer: Some(user),
                        notice: None,
                    }
                }
                Err(e) => {
                    debug!(username = ?username, error = %e, "login rechazado");
                    Identity::default()
                }
            };
        }

        if let (Some(username), Some(password), Some(confirm)) = (
            request.form("username"),
            request.form("passworda"),
            request.form("passwordb"),
        ) {
            thread::sleep(self.state.config.auth_delay());
            return match identity.register(username, password, confirm) {
                Ok(user) => {
                    metrics.record_event(Event::Registration);
                    Identity {
                        viewer: Some(user),
                        notice: None,
                    }
                }
                Err(e) => {
                    debug!(username = ?username, error = %e, "registro rechazado");
                    Identity {
                        viewer: None,
                        notice: Some(e.to_string()),
                    }
                }
            };
        }

        Identity {
            viewer: request.cookie_token().and_then(|token| identity.resolve_token(token)),
            notice: None,
        }
    }

    /// Crea el post y lo agrega a los índices de sus tags
    fn apply_post(&self, author: &Arc<User>, message: &str, quote: Option<&str>) -> Result<(), ContentError> {
        let quote = match quote.map(str::trim).filter(|text| !text.is_empty()) {
            Some(text) => Some(text.parse::<I512>().map_err(|_| ContentError::UnknownQuote)?),
            None => None,
        };

        let post = self.state.content.create_content(author, message, quote)?;
        self.state.metrics.record_event(Event::PostCreated);

        // El post y el `latest` del autor ya están en disco: un fallo acá
        // deja el post publicado sin su línea en el índice del tag.
        for tag in tags::extract(message, self.state.config.max_tags) {
            if let Err(e) = self.state.tags.append(&tag, &post.id) {
                warn!(id = ?post.id, tag = ?tag, error = %e, "post publicado pero sin indexar en el tag");
                return Err(e.into());
            }
        }
        Ok(())
    }
}

/// Lee hasta `max` bytes o hasta tener el request completo
///
/// Un request está completo cuando llegó la línea vacía y, si hay
/// `Content-Length`, todo el cuerpo.
fn read_request(stream: &mut impl Read, max: usize) -> io::Result<Vec<u8>> {
    let mut buffer = vec![0u8; max];
    let mut filled = 0;

    while filled < max {
        let n = stream.read(&mut buffer[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
        if is_complete(&buffer[..filled]) {
            break;
        }
    }

    buffer.truncate(filled);
    Ok(buffer)
}

fn is_complete(data: &[u8]) -> bool {
    let Some(end) = data.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };

    let head = String::from_utf8_lossy(&data[..end]);
    let body_len = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    data.len() >= end + 4 + body_len
}
