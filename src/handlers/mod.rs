//! # Handlers del Sitio
//! src/handlers/mod.rs
//!
//! Cada página es una función `fn(&RequestContext) -> Response` registrada
//! en el router con el primer segmento de su path.
//!
//! | Ruta | Handler |
//! |---|---|
//! | `/`, `/index`, `/index.htm`, `/index.html` | [`home::home_handler`] |
//! | `/login`, `/register` | [`account`] |
//! | `/user/<id>[/<post>]` | [`user::user_handler`] |
//! | `/reply/<post>`, `/embed/<post>`, `/hide/<post>` | [`post`] |
//! | `/rss/<user>` | [`rss::rss_handler`] |
//! | `/tag/<tag>[/<offset>]` o campo `search` | [`tag::tag_handler`] |
//! | `/about` | [`about::about_handler`] |

pub mod about;
pub mod account;
pub mod home;
pub mod post;
pub mod render;
pub mod rss;
pub mod tag;
pub mod user;

use crate::router::Router;

/// Router con todas las páginas del sitio
pub fn site_router() -> Router {
    let mut router = Router::new();

    for name in ["", "index", "index.htm", "index.html"] {
        router.register(name, home::home_handler);
    }
    router.register("login", account::login_handler);
    router.register("register", account::register_handler);
    router.register("user", user::user_handler);
    router.register("reply", post::reply_handler);
    router.register("embed", post::embed_handler);
    router.register("hide", post::hide_handler);
    router.register("rss", rss::rss_handler);
    router.register("tag", tag::tag_handler);
    router.register("about", about::about_handler);

    router
}

#[cfg(test)]
pub(crate) mod testing {
    //! Estado y contexto de prueba compartidos por los tests de handlers

    use crate::auth::User;
    use crate::config::Config;
    use crate::http::Request;
    use crate::router::RequestContext;
    use crate::server::AppState;
    use std::sync::Arc;
    use tempfile::TempDir;

    pub fn state() -> (TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.post_dir = dir.path().join("pst");
        config.user_dir = dir.path().join("usr");
        config.tag_dir = dir.path().join("tag");
        config.page_len = 3;
        let state = AppState::new(config).unwrap();
        (dir, state)
    }

    pub fn ctx<'a>(
        state: &'a AppState,
        request: &'a Request,
        viewer: Option<Arc<User>>,
        args: &[&str],
    ) -> RequestContext<'a> {
        RequestContext {
            state,
            request,
            viewer,
            notice: None,
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn get() -> Request {
        Request::parse(b"GET / HTTP/1.1\r\n\r\n").unwrap()
    }

    pub fn body(response: &crate::http::Response) -> String {
        String::from_utf8(response.body().to_vec()).unwrap()
    }
}
