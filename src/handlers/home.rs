//! # Home
//! src/handlers/home.rs

use super::render;
use crate::http::Response;
use crate::router::RequestContext;

/// Posts recientes, del más nuevo al más viejo, con el formulario para publicar
pub fn home_handler(ctx: &RequestContext<'_>) -> Response {
    let mut body = String::from("<h2>latest posts</h2>");
    body.push_str(&render::post_form(ctx, None));

    for post in ctx.state.content.recent() {
        body.push_str(&render::post_entry(ctx, &post, false));
    }

    Response::html(render::page(ctx, &body))
}
