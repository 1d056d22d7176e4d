//! # Páginas de un Post
//! src/handlers/post.rs
//!
//! `reply/<post>`, `embed/<post>` y `hide/<post>`. Un id ausente o
//! desconocido produce la respuesta genérica de error.

use super::render;
use crate::content::Post;
use crate::http::Response;
use crate::id::I512;
use crate::router::RequestContext;
use std::sync::Arc;
use tracing::warn;

fn target_post(ctx: &RequestContext<'_>) -> Option<Arc<Post>> {
    let id: I512 = ctx.arg(0)?.parse().ok()?;
    ctx.state.content.read_content(&id)
}

/// Muestra un post con el formulario para citarlo
pub fn reply_handler(ctx: &RequestContext<'_>) -> Response {
    if ctx.viewer.is_none() {
        return Response::error();
    }
    let Some(post) = target_post(ctx) else {
        return Response::error();
    };

    let mut body = String::from("<h2>reply</h2>");
    body.push_str(&render::post_entry(ctx, &post, false));
    body.push_str(&render::post_form(ctx, Some(&post.id)));
    Response::html(render::page(ctx, &body))
}

/// Un único post, sin el marco del sitio
pub fn embed_handler(ctx: &RequestContext<'_>) -> Response {
    match target_post(ctx) {
        Some(post) => Response::html(render::bare_page(ctx, &render::post_entry(ctx, &post, false))),
        None => Response::error(),
    }
}

/// Oculta o vuelve a mostrar un post; solo su autor puede hacerlo
pub fn hide_handler(ctx: &RequestContext<'_>) -> Response {
    let Some(viewer) = &ctx.viewer else {
        return Response::error();
    };
    let Some(post) = target_post(ctx) else {
        return Response::error();
    };
    if post.author.id != viewer.id {
        return Response::error();
    }

    match ctx.state.content.toggle_visibility(&post.id) {
        Ok(post) => {
            let state = if post.is_hidden() { "hidden" } else { "visible" };
            let mut body = format!("<h2>post is now {state}</h2>");
            body.push_str(&render::post_entry(ctx, &post, false));
            Response::html(render::page(ctx, &body))
        }
        Err(e) => {
            warn!(id = ?post.id, error = %e, "no se pudo cambiar la visibilidad");
            Response::error()
        }
    }
}
