//! # Feed RSS
//! src/handlers/rss.rs
//!
//! `rss/<user>` entrega los últimos `rss_len` posts propios del usuario
//! como RSS 2.0. Sin usuario, o con uno desconocido, el feed sale vacío
//! pero bien formado.

use super::render;
use crate::http::Response;
use crate::id::I512;
use crate::router::RequestContext;

pub fn rss_handler(ctx: &RequestContext<'_>) -> Response {
    let config = &ctx.state.config;
    let title = html_escape::encode_text(&config.title);

    let mut res = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" ?><rss version=\"2.0\"><channel>\
<title>[{title}]</title><link>{}{}</link><description>{title} social</description><ttl>{}</ttl>",
        config.url, config.sub_dir, config.rss_ttl_mins
    );

    let subject = ctx
        .arg(0)
        .and_then(|text| text.parse::<I512>().ok())
        .and_then(|id| ctx.state.identity.resolve_by_id(&id));

    if let Some(user) = subject {
        let items = ctx
            .state
            .content
            .timeline(user.id, user.latest())
            .filter(|item| !item.quoted)
            .take(config.rss_len);

        for item in items {
            let post = item.post;
            let description = if post.is_hidden() {
                render::HIDDEN_MESSAGE
            } else {
                post.message.as_str()
            };
            res.push_str(&format!(
                "<item><title>{}</title><link>{}{}embed/{}</link><description>{}</description>\
<pubDate>{}</pubDate><guid>{}</guid></item>",
                post.author.username,
                config.url,
                config.sub_dir,
                post.id,
                description,
                render::format_rfc2822(post.creation),
                post.id
            ));
        }
    }

    res.push_str("</channel></rss>");
    Response::xml(res)
}
