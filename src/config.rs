//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración completa del servidor con soporte para argumentos CLI y
//! variables de entorno. Todos los componentes reciben sus valores desde aquí.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./d3ad --port 8080 \
//!   --workers 8 \
//!   --cache-max 4096 \
//!   --auth-delay-ms 250
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! D3AD_PORT=8080 D3AD_HOST=0.0.0.0 ./d3ad
//! ```

use crate::logging::LogFormat;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Error de validación de la configuración
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("configuración inválida: {0}")]
pub struct ConfigError(pub String);

/// Configuración del servidor social
#[derive(Debug, Clone, Parser)]
#[command(name = "d3ad")]
#[command(about = "Servidor social concurrente con HTTP hecho a mano")]
#[command(version)]
pub struct Config {
    // === Red ===

    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "D3AD_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "D3AD_HOST")]
    pub host: String,

    /// Número de workers que atienden conexiones
    #[arg(short, long, default_value = "8", env = "D3AD_WORKERS")]
    pub workers: usize,

    /// Tamaño del buffer de recepción del socket de escucha
    #[arg(long = "rec-buff-size", default_value = "2048", env = "D3AD_REC_BUFF_SIZE")]
    pub rec_buff_size: usize,

    /// Reutilizar la dirección (SO_REUSEADDR)
    #[arg(long = "reuse-addr", default_value = "false", env = "D3AD_REUSE_ADDR", action = ArgAction::Set)]
    pub reuse_addr: bool,

    /// Timeout del accept en milisegundos
    #[arg(long = "accept-timeout-ms", default_value = "10000", env = "D3AD_ACCEPT_TIMEOUT_MS")]
    pub accept_timeout_ms: u64,

    /// Timeout de lectura/escritura por conexión en milisegundos
    #[arg(long = "socket-timeout-ms", default_value = "10000", env = "D3AD_SOCKET_TIMEOUT_MS")]
    pub socket_timeout_ms: u64,

    // === Requests ===

    /// Prefijo de ruta bajo el que se sirve el sitio
    #[arg(long = "sub-dir", default_value = "/", env = "D3AD_SUB_DIR")]
    pub sub_dir: String,

    /// Máximo de bytes leídos por request
    #[arg(long = "request-buffer-size", default_value = "4096", env = "D3AD_REQUEST_BUFFER_SIZE")]
    pub request_buffer_size: usize,

    /// Máximo de caracteres de un post
    #[arg(long = "input-max-len", default_value = "512", env = "D3AD_INPUT_MAX_LEN")]
    pub input_max_len: usize,

    /// Máximo de tags registrados por post
    #[arg(long = "max-tags", default_value = "4", env = "D3AD_MAX_TAGS")]
    pub max_tags: usize,

    // === Autenticación ===

    /// Retardo artificial antes de cada login/registro en milisegundos
    #[arg(long = "auth-delay-ms", default_value = "100", env = "D3AD_AUTH_DELAY_MS")]
    pub auth_delay_ms: u64,

    /// Vida de un token de sesión en minutos
    #[arg(long = "token-ttl-mins", default_value = "1440", env = "D3AD_TOKEN_TTL_MINS")]
    pub token_ttl_mins: u64,

    /// Salt global que se mezcla con el salt de cada usuario
    #[arg(long = "site-salt", default_value = "", env = "D3AD_SITE_SALT", hide_env_values = true)]
    pub site_salt: String,

    // === Storage ===

    /// Directorio de posts
    #[arg(long = "post-dir", default_value = "dat/pst", env = "D3AD_POST_DIR")]
    pub post_dir: PathBuf,

    /// Directorio de usuarios
    #[arg(long = "user-dir", default_value = "dat/usr", env = "D3AD_USER_DIR")]
    pub user_dir: PathBuf,

    /// Directorio de índices de tags
    #[arg(long = "tag-dir", default_value = "dat/tag", env = "D3AD_TAG_DIR")]
    pub tag_dir: PathBuf,

    // === Cache ===

    /// Máximo de posts en la cache por id
    #[arg(long = "cache-max", default_value = "4096", env = "D3AD_CACHE_MAX")]
    pub cache_max: usize,

    /// Fracción de la cache que se desaloja al llegar al máximo
    #[arg(long = "cache-evict-fraction", default_value = "0.25", env = "D3AD_CACHE_EVICT_FRACTION")]
    pub cache_evict_fraction: f64,

    /// Capacidad del anillo de posts recientes
    #[arg(long = "recent-len", default_value = "16", env = "D3AD_RECENT_LEN")]
    pub recent_len: usize,

    // === Páginas ===

    /// Posts por página (usuario y búsqueda de tags)
    #[arg(long = "page-len", default_value = "16", env = "D3AD_PAGE_LEN")]
    pub page_len: usize,

    /// Items por feed RSS
    #[arg(long = "rss-len", default_value = "8", env = "D3AD_RSS_LEN")]
    pub rss_len: usize,

    /// TTL anunciado en el feed RSS (minutos)
    #[arg(long = "rss-ttl-mins", default_value = "30", env = "D3AD_RSS_TTL_MINS")]
    pub rss_ttl_mins: u64,

    /// Nombre del sitio
    #[arg(long, default_value = "d3ad", env = "D3AD_TITLE")]
    pub title: String,

    /// URL pública del sitio (para RSS)
    #[arg(long, default_value = "http://127.0.0.1:8080", env = "D3AD_URL")]
    pub url: String,

    // === Logging ===

    /// Formato de logs
    #[arg(long = "log-format", value_enum, default_value = "human", env = "D3AD_LOG_FORMAT")]
    pub log_format: LogFormat,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn accept_timeout(&self) -> Duration {
        Duration::from_millis(self.accept_timeout_ms)
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_millis(self.socket_timeout_ms)
    }

    pub fn auth_delay(&self) -> Duration {
        Duration::from_millis(self.auth_delay_ms)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_mins * 60)
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError("workers must be >= 1".to_string()));
        }
        if self.request_buffer_size < 16 {
            return Err(ConfigError("request buffer size must be >= 16".to_string()));
        }
        if self.input_max_len == 0 {
            return Err(ConfigError("input max length must be >= 1".to_string()));
        }
        if self.accept_timeout_ms == 0 {
            return Err(ConfigError("accept timeout must be > 0".to_string()));
        }
        if self.socket_timeout_ms == 0 {
            return Err(ConfigError("socket timeout must be > 0".to_string()));
        }
        if self.page_len == 0 || self.rss_len == 0 {
            return Err(ConfigError("page and rss lengths must be >= 1".to_string()));
        }
        if self.cache_max == 0 {
            return Err(ConfigError("cache max must be >= 1".to_string()));
        }
        if !(self.cache_evict_fraction > 0.0 && self.cache_evict_fraction <= 1.0) {
            return Err(ConfigError("cache evict fraction must be in (0, 1]".to_string()));
        }
        if self.recent_len == 0 {
            return Err(ConfigError("recent length must be >= 1".to_string()));
        }
        if !self.sub_dir.starts_with('/') || !self.sub_dir.ends_with('/') {
            return Err(ConfigError("sub dir must start and end with '/'".to_string()));
        }

        Ok(())
    }

    /// Registra un resumen de la configuración
    pub fn print_summary(&self) {
        info!(address = %self.address(), workers = self.workers, sub_dir = %self.sub_dir, "red");
        info!(
            rec_buff_size = self.rec_buff_size,
            reuse_addr = self.reuse_addr,
            accept_timeout_ms = self.accept_timeout_ms,
            socket_timeout_ms = self.socket_timeout_ms,
            "socket"
        );
        info!(
            request_buffer_size = self.request_buffer_size,
            input_max_len = self.input_max_len,
            max_tags = self.max_tags,
            auth_delay_ms = self.auth_delay_ms,
            token_ttl_mins = self.token_ttl_mins,
            "requests"
        );
        info!(
            post_dir = %self.post_dir.display(),
            user_dir = %self.user_dir.display(),
            tag_dir = %self.tag_dir.display(),
            "storage"
        );
        info!(
            cache_max = self.cache_max,
            cache_evict_fraction = self.cache_evict_fraction,
            recent_len = self.recent_len,
            "cache"
        );
    }
}

impl Default for Config {
    /// Configuración por defecto (igual a los defaults del CLI)
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            workers: 8,
            rec_buff_size: 2048,
            reuse_addr: false,
            accept_timeout_ms: 10_000,
            socket_timeout_ms: 10_000,
            sub_dir: "/".to_string(),
            request_buffer_size: 4096,
            input_max_len: 512,
            max_tags: 4,
            auth_delay_ms: 100,
            token_ttl_mins: 1440,
            site_salt: String::new(),
            post_dir: PathBuf::from("dat/pst"),
            user_dir: PathBuf::from("dat/usr"),
            tag_dir: PathBuf::from("dat/tag"),
            cache_max: 4096,
            cache_evict_fraction: 0.25,
            recent_len: 16,
            page_len: 16,
            rss_len: 8,
            rss_ttl_mins: 30,
            title: "d3ad".to_string(),
            url: "http://127.0.0.1:8080".to_string(),
            log_format: LogFormat::Human,
        }
    }
}
