//! # Content Cache
//! src/content/cache.rs
//!
//! Vista en memoria de los posts. El disco es la fuente de verdad: una
//! entrada solo entra a la cache después de que su escritura terminó bien, y
//! cualquier miss se reconstruye desde el Resource Store.
//!
//! ## Evicción
//!
//! Cuando el mapa por id llega a `cache_max` se elimina, en una sola pasada,
//! una ventana contigua de `ceil(len * fraction)` claves que empieza en una
//! posición aleatoria de una copia de las claves (dando la vuelta al final).
//! No hay contabilidad por acceso: leer un post cacheado no escribe nada.

use super::post::{Post, PostRecord, Visibility};
use crate::auth::{AuthError, IdentityManager, User};
use crate::auth::manager::now_ms;
use crate::config::Config;
use crate::id::I512;
use crate::store::{ResourceStore, StoreError};
use rand::Rng;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Intentos máximos para encontrar un id libre
const MINT_ATTEMPTS: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("mensaje vacío")]
    EmptyMessage,

    #[error("mensaje demasiado largo (máximo {0} caracteres)")]
    MessageTooLong(usize),

    #[error("el post citado no existe")]
    UnknownQuote,

    #[error("post no encontrado")]
    NotFound,

    #[error("registro de post corrupto: {0}")]
    Corrupt(String),

    #[error("no se encontró un id libre después de {MINT_ATTEMPTS} intentos")]
    IdExhausted,

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("error serializando post: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("no se pudo actualizar el autor: {0}")]
    Author(#[from] AuthError),
}

pub struct ContentCache {
    store: Arc<ResourceStore>,
    identity: Arc<IdentityManager>,
    post_dir: PathBuf,
    input_max_len: usize,
    cache_max: usize,
    evict_fraction: f64,
    recent_len: usize,
    posts: RwLock<HashMap<I512, Arc<Post>>>,
    /// Más nuevo al frente
    recent: Mutex<VecDeque<Arc<Post>>>,
    /// Serializa los toggles de visibilidad (leer, invertir, escribir)
    toggle: Mutex<()>,
}

impl ContentCache {
    pub fn new(store: Arc<ResourceStore>, identity: Arc<IdentityManager>, config: &Config) -> Self {
        Self {
            store,
            identity,
            post_dir: config.post_dir.clone(),
            input_max_len: config.input_max_len,
            cache_max: config.cache_max,
            evict_fraction: config.cache_evict_fraction,
            recent_len: config.recent_len,
            posts: RwLock::new(HashMap::new()),
            recent: Mutex::new(VecDeque::with_capacity(config.recent_len)),
            toggle: Mutex::new(()),
        }
    }

    fn path_for(&self, id: &I512) -> PathBuf {
        self.post_dir.join(id.to_hex())
    }

    fn read_posts(&self) -> RwLockReadGuard<'_, HashMap<I512, Arc<Post>>> {
        self.posts.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_posts(&self) -> RwLockWriteGuard<'_, HashMap<I512, Arc<Post>>> {
        self.posts.write().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_recent(&self) -> MutexGuard<'_, VecDeque<Arc<Post>>> {
        self.recent.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Obtiene un post por id, desde la cache o desde disco
    pub fn read_content(&self, id: &I512) -> Option<Arc<Post>> {
        if let Some(post) = self.read_posts().get(id) {
            if post.id == *id {
                return Some(Arc::clone(post));
            }
        }

        match self.load(id) {
            Ok(post) => Some(self.cache_if_absent(Arc::new(post))),
            Err(ContentError::Storage(StoreError::NotFound(_))) => None,
            Err(e) => {
                warn!(id = ?id, error = %e, "no se pudo cargar el post");
                None
            }
        }
    }

    /// Lee y valida un post desde disco, sin tocar la cache
    fn load(&self, id: &I512) -> Result<Post, ContentError> {
        let bytes = self.store.read(&self.path_for(id))?;
        let record: PostRecord =
            serde_json::from_slice(&bytes).map_err(|e| ContentError::Corrupt(e.to_string()))?;

        if record.id != *id {
            return Err(ContentError::Corrupt("el id no coincide con el archivo".to_string()));
        }
        if record.creation < 0 {
            return Err(ContentError::Corrupt("fecha de creación negativa".to_string()));
        }
        let author = self
            .identity
            .resolve_by_id(&record.author)
            .ok_or_else(|| ContentError::Corrupt("autor desconocido".to_string()))?;

        Ok(Post::from_record(record, author))
    }

    /// Escribe el post a disco y, solo si eso funcionó, actualiza las caches
    pub fn write_content(&self, post: Post) -> Result<Arc<Post>, ContentError> {
        let bytes = serde_json::to_vec_pretty(&post.to_record())?;
        self.store.write(&self.path_for(&post.id), &bytes)?;

        let post = Arc::new(post);
        self.remember(Arc::clone(&post));
        Ok(post)
    }

    /// Crea un post nuevo al frente de la cadena del autor
    ///
    /// `message` llega sin escapar. El lock de la cadena del autor se mantiene
    /// hasta que su registro quedó persistido con el nuevo `latest`.
    pub fn create_content(
        &self,
        author: &Arc<User>,
        message: &str,
        quote: Option<I512>,
    ) -> Result<Arc<Post>, ContentError> {
        if message.trim().is_empty() {
            return Err(ContentError::EmptyMessage);
        }
        if message.chars().count() > self.input_max_len {
            return Err(ContentError::MessageTooLong(self.input_max_len));
        }
        if let Some(quoted) = quote {
            if self.read_content(&quoted).is_none() {
                return Err(ContentError::UnknownQuote);
            }
        }

        let mut latest = author.lock_latest();
        let previous = *latest;

        let mut post = Post {
            id: I512::random(),
            author: Arc::clone(author),
            creation: now_ms(),
            previous,
            quote,
            quote_previous: quote.and(previous),
            message: html_escape::encode_text(message).into_owned(),
            visibility: Visibility::Visible,
        };
        self.mint(&mut post)?;

        if let Err(e) = self.identity.save_record(&author.record_with(Some(post.id))) {
            warn!(id = ?post.id, error = %e, "post escrito pero el autor no se pudo actualizar");
            return Err(e.into());
        }
        *latest = Some(post.id);
        drop(latest);

        let post = Arc::new(post);
        self.remember(Arc::clone(&post));
        info!(id = ?post.id, author = ?post.author.username, "post creado");
        Ok(post)
    }

    /// Busca un id libre y crea el archivo de forma exclusiva
    fn mint(&self, post: &mut Post) -> Result<(), ContentError> {
        for _ in 0..MINT_ATTEMPTS {
            if self.read_posts().contains_key(&post.id) {
                post.id = I512::random();
                continue;
            }

            let bytes = serde_json::to_vec_pretty(&post.to_record())?;
            if self.store.create(&self.path_for(&post.id), &bytes)? {
                return Ok(());
            }
            debug!(id = ?post.id, "colisión de id en disco");
            post.id = I512::random();
        }
        Err(ContentError::IdExhausted)
    }

    /// Invierte la visibilidad de un post
    pub fn toggle_visibility(&self, id: &I512) -> Result<Arc<Post>, ContentError> {
        let _toggle = self.toggle.lock().unwrap_or_else(|e| e.into_inner());

        let current = self.read_content(id).ok_or(ContentError::NotFound)?;
        let post = self.write_content(current.toggled())?;
        info!(id = ?id, visibility = ?post.visibility, "visibilidad cambiada");
        Ok(post)
    }

    /// Posts recientes, del más nuevo al más viejo
    pub fn recent(&self) -> Vec<Arc<Post>> {
        self.lock_recent().iter().cloned().collect()
    }

    pub fn cached_count(&self) -> usize {
        self.read_posts().len()
    }

    /// Recorre la cadena de un usuario desde `start`
    pub fn timeline(&self, owner: I512, start: Option<I512>) -> Timeline<'_> {
        Timeline::new(self, owner, start)
    }

    /// Actualiza el anillo de recientes y el mapa por id
    fn remember(&self, post: Arc<Post>) {
        {
            let mut recent = self.lock_recent();
            match recent.iter_mut().find(|p| p.id == post.id) {
                Some(slot) => *slot = Arc::clone(&post),
                None => {
                    recent.push_front(Arc::clone(&post));
                    recent.truncate(self.recent_len);
                }
            }
        }
        self.cache(post);
    }

    /// Inserta en el mapa por id, desalojando si hace falta
    ///
    /// Solo para versiones recién escritas a disco: reemplaza la entrada.
    fn cache(&self, post: Arc<Post>) {
        let mut posts = self.write_posts();
        self.make_room(&mut posts, &post.id);
        posts.insert(post.id, post);
    }

    /// Inserta una copia leída de disco solo si el id sigue ausente
    ///
    /// Una escritura concurrente pudo cachear una versión más nueva entre la
    /// lectura y este punto; en ese caso gana la entrada del mapa.
    fn cache_if_absent(&self, post: Arc<Post>) -> Arc<Post> {
        let mut posts = self.write_posts();
        if let Some(current) = posts.get(&post.id) {
            return Arc::clone(current);
        }
        self.make_room(&mut posts, &post.id);
        Arc::clone(posts.entry(post.id).or_insert(post))
    }

    fn make_room(&self, posts: &mut HashMap<I512, Arc<Post>>, id: &I512) {
        if !posts.contains_key(id) && posts.len() >= self.cache_max {
            let removed = evict_window(posts, self.evict_fraction);
            debug!(removed, remaining = posts.len(), "evicción de cache");
        }
    }
}

/// Elimina una ventana contigua de claves desde una posición aleatoria
fn evict_window<V>(map: &mut HashMap<I512, V>, fraction: f64) -> usize {
    let keys: Vec<I512> = map.keys().copied().collect();
    if keys.is_empty() {
        return 0;
    }

    let window = ((keys.len() as f64 * fraction).ceil() as usize).clamp(1, keys.len());
    let start = rand::thread_rng().gen_range(0..keys.len());
    for key in keys.iter().cycle().skip(start).take(window) {
        map.remove(key);
    }
    window
}

/// Un elemento de la línea de tiempo
#[derive(Debug, Clone)]
pub struct TimelineItem {
    pub post: Arc<Post>,
    /// `true` si es un post citado insertado en la cadena del dueño
    pub quoted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Siguiente post de la cadena propia
    Chain(I512),
    /// Post citado pendiente y dónde sigue la cadena después
    Insert { quoted: I512, resume: Option<I512> },
    Done,
}

/// Iterador de la cadena de un usuario, de más nuevo a más viejo
///
/// Cuando un post del dueño cita otro, el citado se entrega justo después
/// como inserto y la cadena sigue en `quote_previous`. Un post de otro autor
/// en la cadena propia corta el recorrido.
pub struct Timeline<'a> {
    cache: &'a ContentCache,
    owner: I512,
    step: Step,
}

impl<'a> Timeline<'a> {
    fn new(cache: &'a ContentCache, owner: I512, start: Option<I512>) -> Self {
        Self {
            cache,
            owner,
            step: start.map_or(Step::Done, Step::Chain),
        }
    }

    /// Próximo post de la cadena propia, si el recorrido no está a mitad de
    /// un inserto
    pub fn next_chain_id(&self) -> Option<I512> {
        match self.step {
            Step::Chain(id) => Some(id),
            _ => None,
        }
    }

    /// `true` si el próximo elemento es un post citado
    pub fn in_insert(&self) -> bool {
        matches!(self.step, Step::Insert { .. })
    }
}

impl Iterator for Timeline<'_> {
    type Item = TimelineItem;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step {
            Step::Done => None,
            Step::Chain(id) => {
                let post = self.cache.read_content(&id).filter(|p| p.author.id == self.owner);
                let Some(post) = post else {
                    self.step = Step::Done;
                    return None;
                };

                self.step = match post.quote {
                    Some(quoted) => Step::Insert {
                        quoted,
                        resume: post.quote_previous.or(post.previous),
                    },
                    None => post.previous.map_or(Step::Done, Step::Chain),
                };
                Some(TimelineItem { post, quoted: false })
            }
            Step::Insert { quoted, resume } => {
                self.step = resume.map_or(Step::Done, Step::Chain);
                match self.cache.read_content(&quoted) {
                    Some(post) => Some(TimelineItem { post, quoted: true }),
                    // El citado desapareció: seguir con la cadena
                    None => self.next(),
                }
            }
        }
    }
}
