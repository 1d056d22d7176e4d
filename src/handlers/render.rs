//! # Render de Páginas
//! src/handlers/render.rs
//!
//! Piezas HTML compartidas por los handlers: el marco del sitio, la entrada
//! de un post, el formulario para publicar y el post-procesado de mensajes.

use crate::content::Post;
use crate::id::I512;
use crate::router::RequestContext;
use crate::tags;
use chrono::DateTime;

/// Texto que reemplaza a un mensaje oculto
pub const HIDDEN_MESSAGE: &str = "Message hidden";

/// Largo máximo del texto visible de un link
const MAX_LINK_TEXT: usize = 32;

const STYLE: &str = "body{background-color:#111;color:#EEE;font-family:monospace;}\
a{color:#FFF;}a:before{content:\"[\"}a:after{content:\"]\"}\
p{background-color:#222;padding:8px;}\
quote{display:block;background-color:#EEE;color:#222;padding:4px;}\
.insert{margin-left:32px;}";

/// Marco completo del sitio alrededor de `body`
pub fn page(ctx: &RequestContext<'_>, body: &str) -> String {
    let config = &ctx.state.config;
    let sub = &config.sub_dir;
    let title = html_escape::encode_text(&config.title);

    let account = match &ctx.viewer {
        Some(user) => format!("<a href=\"{}user/{}\">@{}</a>", sub, user.id, user.username),
        None => format!("<a href=\"{}login\">login</a>", sub),
    };

    format!(
        "<html><head><title>[{title}]</title><style>{STYLE}</style></head><body>\
<h1><a href=\"{sub}\">{title}</a> social {account}</h1>\
<form action=\"{sub}tag\" method=\"post\"><input type=\"text\" name=\"search\" placeholder=\"#tag\">\
<input type=\"submit\" value=\"search\"></form>\
{body}</body></html>"
    )
}

/// Página mínima, sin navegación (para embeber)
pub fn bare_page(ctx: &RequestContext<'_>, body: &str) -> String {
    let title = html_escape::encode_text(&ctx.state.config.title);
    format!("<html><head><title>[{title}]</title><style>{STYLE}</style></head><body>{body}</body></html>")
}

/// Fecha legible de un timestamp en milisegundos
pub fn format_date(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|date| date.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "unknown date".to_string())
}

/// Fecha RFC 2822 para RSS
pub fn format_rfc2822(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|date| date.to_rfc2822())
        .unwrap_or_default()
}

/// Mensaje listo para mostrar, o el texto de reemplazo si está oculto
pub fn visible_message(ctx: &RequestContext<'_>, post: &Post) -> String {
    if post.is_hidden() {
        HIDDEN_MESSAGE.to_string()
    } else {
        process_message(ctx, &post.message)
    }
}

/// Una entrada de post con sus acciones
///
/// `quoted` marca un post citado dentro de la cadena de otro usuario.
pub fn post_entry(ctx: &RequestContext<'_>, post: &Post, quoted: bool) -> String {
    let sub = &ctx.state.config.sub_dir;
    let mut res = String::with_capacity(256 + post.message.len());

    res.push_str(if quoted { "<p class=\"insert\">" } else { "<p>" });
    res.push_str(&format!(
        "<b><a href=\"{sub}user/{}\">@{}</a></b> on {} said:<br>",
        post.author.id,
        post.author.username,
        format_date(post.creation)
    ));
    res.push_str(&format!("<quote>{}</quote>", visible_message(ctx, post)));

    res.push_str(&format!("<a href=\"{sub}user/{}/{}\">link</a> ", post.author.id, post.id));
    if ctx.viewer.is_some() {
        res.push_str(&format!("<a href=\"{sub}reply/{}\">reply</a> ", post.id));
    }
    res.push_str(&format!("<a href=\"{sub}embed/{}\">embed</a>", post.id));

    let is_author = ctx.viewer.as_ref().is_some_and(|viewer| viewer.id == post.author.id);
    if is_author {
        let action = if post.is_hidden() { "unhide" } else { "hide" };
        res.push_str(&format!(" <a href=\"{sub}hide/{}\">{action}</a>", post.id));
    }

    res.push_str("</p>");
    res
}

/// Formulario para publicar, solo si hay un usuario autenticado
///
/// Con `quote` el formulario lleva el id citado en un campo oculto.
pub fn post_form(ctx: &RequestContext<'_>, quote: Option<&I512>) -> String {
    let Some(viewer) = &ctx.viewer else {
        return String::new();
    };
    let config = &ctx.state.config;

    let quote_field = quote
        .map(|id| format!("<input type=\"hidden\" name=\"quote\" value=\"{}\">", id))
        .unwrap_or_default();

    format!(
        "<form action=\"{}user/{}\" method=\"post\">\
<textarea name=\"post\" rows=\"4\" cols=\"64\" maxlength=\"{}\"></textarea>{}<br>\
<input type=\"submit\" value=\"submit\"></form>",
        config.sub_dir, viewer.id, config.input_max_len, quote_field
    )
}

/// Agrega elementos sociales a un mensaje ya escapado
///
/// - `@nombre` enlaza al usuario si existe
/// - `#tag` enlaza a la búsqueda del tag
/// - `*texto*` se muestra en negrita
/// - `[http://...]` se convierte en link
pub fn process_message(ctx: &RequestContext<'_>, message: &str) -> String {
    let sub = &ctx.state.config.sub_dir;
    let mut res = String::with_capacity(message.len() * 2);
    let mut bold = false;

    for word in message.split_whitespace() {
        if !res.is_empty() {
            res.push(' ');
        }

        let opens_bold = word.len() > 1 && word.starts_with('*') && !bold;
        if opens_bold {
            res.push_str("<b>");
            bold = true;
        }

        let bare = word.trim_matches('*');
        if let Some(name) = bare.strip_prefix('@') {
            match ctx.state.identity.resolve_by_name(name) {
                Some(user) => res.push_str(&format!("<a href=\"{sub}user/{}\">@{}</a>", user.id, user.username)),
                None => res.push_str(bare),
            }
        } else if let Some(tag) = bare.strip_prefix('#').and_then(tags::sanitize) {
            res.push_str(&format!("<a href=\"{sub}tag/{tag}\">{bare}</a>"));
        } else if let Some(link) = url_link(bare) {
            res.push_str(&link);
        } else {
            res.push_str(bare);
        }

        if word.len() > 1 && word.ends_with('*') && bold {
            res.push_str("</b>");
            bold = false;
        }
    }

    if bold {
        res.push_str("</b>");
    }
    res
}

/// Convierte `[http://...]` (texto escapado) en un link seguro
fn url_link(word: &str) -> Option<String> {
    let inner = word.strip_prefix('[')?.strip_suffix(']')?;
    let url = html_escape::decode_html_entities(inner);
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return None;
    }
    if url.chars().any(|c| c.is_whitespace() || matches!(c, '"' | '<' | '>')) {
        return None;
    }

    let mut text: String = url.chars().take(MAX_LINK_TEXT).collect();
    if url.chars().count() > MAX_LINK_TEXT {
        text.push_str("..");
    }
    Some(format!(
        "<a href=\"{}\">{}</a>",
        html_escape::encode_double_quoted_attribute(&url),
        html_escape::encode_text(&text)
    ))
}
