//! # Estado Compartido
//! src/server/state.rs
//!
//! Todo lo que los workers comparten, construido una vez al arrancar a
//! partir de la configuración.

use crate::auth::IdentityManager;
use crate::config::Config;
use crate::content::ContentCache;
use crate::error::ServerError;
use crate::metrics::MetricsCollector;
use crate::store::ResourceStore;
use crate::tags::TagIndex;
use std::fs;
use std::sync::Arc;
use tracing::info;

pub struct AppState {
    pub config: Config,
    pub store: Arc<ResourceStore>,
    pub identity: Arc<IdentityManager>,
    pub content: ContentCache,
    pub tags: TagIndex,
    pub metrics: MetricsCollector,
}

impl AppState {
    /// Crea los directorios de datos y carga los usuarios existentes
    pub fn new(config: Config) -> Result<Self, ServerError> {
        for dir in [&config.post_dir, &config.user_dir, &config.tag_dir] {
            fs::create_dir_all(dir).map_err(|source| ServerError::DataDir {
                path: dir.clone(),
                source,
            })?;
        }

        let store = Arc::new(ResourceStore::new());
        let identity = Arc::new(IdentityManager::load(
            Arc::clone(&store),
            &config.user_dir,
            &config.site_salt,
            config.token_ttl(),
        )?);
        let content = ContentCache::new(Arc::clone(&store), Arc::clone(&identity), &config);
        let tags = TagIndex::new(Arc::clone(&store), &config.tag_dir);

        info!(users = identity.user_count(), "estado inicial listo");
        Ok(Self {
            config,
            store,
            identity,
            content,
            tags,
            metrics: MetricsCollector::new(),
        })
    }
}
