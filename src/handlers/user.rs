//! # Página de Usuario
//! src/handlers/user.rs
//!
//! `user/<id>[/<post>]` recorre la cadena del usuario desde `<post>` (o
//! desde su último post) mostrando `page_len` posts propios. Los posts
//! citados se muestran insertados y no cuentan para la página.

use super::render;
use crate::http::Response;
use crate::id::I512;
use crate::router::RequestContext;

pub fn user_handler(ctx: &RequestContext<'_>) -> Response {
    let Some(owner) = ctx
        .arg(0)
        .and_then(|text| text.parse::<I512>().ok())
        .and_then(|id| ctx.state.identity.resolve_by_id(&id))
    else {
        return Response::error();
    };

    let start = match ctx.arg(1) {
        Some(text) => {
            let Ok(id) = text.parse::<I512>() else {
                return Response::error();
            };
            // Solo se puede empezar en un post propio
            match ctx.state.content.read_content(&id) {
                Some(post) if post.author.id == owner.id => Some(id),
                _ => return Response::error(),
            }
        }
        None => owner.latest(),
    };

    let config = &ctx.state.config;
    let sub = &config.sub_dir;
    let mut body = format!(
        "<h2>@{}'s posts <a href=\"{sub}rss/{}\">rss</a></h2>",
        owner.username, owner.id
    );
    if ctx.viewer.as_ref().is_some_and(|viewer| viewer.id == owner.id) {
        body.push_str(&render::post_form(ctx, None));
    }

    let mut timeline = ctx.state.content.timeline(owner.id, start);
    let mut shown = 0;
    while shown < config.page_len || timeline.in_insert() {
        let Some(item) = timeline.next() else {
            break;
        };
        if !item.quoted {
            shown += 1;
        }
        body.push_str(&render::post_entry(ctx, &item.post, item.quoted));
    }

    if let Some(next) = timeline.next_chain_id() {
        body.push_str(&format!("<a href=\"{sub}user/{}/{next}\">more</a>", owner.id));
    }

    Response::html(render::page(ctx, &body))
}
