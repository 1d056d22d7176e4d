//! # Búsqueda por Tag
//! src/handlers/tag.rs
//!
//! `tag/<tag>[/<offset>]`, o el campo `search` del formulario de búsqueda.
//! Muestra los `page_len` posts más nuevos del tag a partir de `offset`.

use super::render;
use crate::http::Response;
use crate::router::RequestContext;
use crate::tags;
use tracing::warn;

pub fn tag_handler(ctx: &RequestContext<'_>) -> Response {
    let raw = ctx
        .arg(0)
        .or_else(|| ctx.request.form("search"))
        .map(|text| text.trim().trim_start_matches('#'));
    let Some(tag) = raw.and_then(tags::sanitize) else {
        return Response::error();
    };
    let offset = ctx.arg(1).and_then(|text| text.parse::<usize>().ok()).unwrap_or(0);

    let config = &ctx.state.config;
    let ids = match ctx.state.tags.read_tag(&tag, offset, config.page_len) {
        Ok(ids) => ids,
        Err(e) => {
            warn!(tag = ?tag, error = %e, "no se pudo leer el tag");
            return Response::error();
        }
    };

    let mut body = format!("<h2>#{tag}</h2>");
    for id in &ids {
        if let Some(post) = ctx.state.content.read_content(id) {
            body.push_str(&render::post_entry(ctx, &post, false));
        }
    }
    if ids.is_empty() {
        body.push_str("<p>no posts</p>");
    }
    if ids.len() == config.page_len {
        body.push_str(&format!(
            "<a href=\"{}tag/{tag}/{}\">more</a>",
            config.sub_dir,
            offset + config.page_len
        ));
    }

    Response::html(render::page(ctx, &body))
}
