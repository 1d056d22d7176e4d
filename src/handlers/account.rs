//! # Login y Registro
//! src/handlers/account.rs
//!
//! Las credenciales se procesan antes de rutear; estos handlers solo
//! muestran los formularios. Un usuario ya autenticado ve la home.

use super::{home, render};
use crate::http::Response;
use crate::router::RequestContext;

pub fn login_handler(ctx: &RequestContext<'_>) -> Response {
    if ctx.viewer.is_some() {
        return home::home_handler(ctx);
    }

    let sub = &ctx.state.config.sub_dir;
    let form = format!(
        "<form action=\"{sub}login\" method=\"post\">\
<label for=\"username\">username:</label><br>\
<input type=\"text\" id=\"username\" name=\"username\"><br>\
<label for=\"password\">password:</label><br>\
<input type=\"password\" id=\"password\" name=\"password\"><br>\
<input type=\"submit\" value=\"submit\"><br>\
<a href=\"{sub}register\">register</a></form>"
    );

    Response::html(render::page(ctx, &form))
}

pub fn register_handler(ctx: &RequestContext<'_>) -> Response {
    if ctx.viewer.is_some() {
        return home::home_handler(ctx);
    }

    let sub = &ctx.state.config.sub_dir;
    let notice = ctx
        .notice
        .as_deref()
        .map(|reason| format!("<p><b>Rejected:</b> {}</p>", html_escape::encode_text(reason)))
        .unwrap_or_default();

    let form = format!(
        "{notice}<form action=\"{sub}register\" method=\"post\">\
<label for=\"username\">username:</label><br>\
<input type=\"text\" id=\"username\" name=\"username\"><br>\
<label for=\"passworda\">password:</label><br>\
<input type=\"password\" id=\"passworda\" name=\"passworda\"><br>\
<label for=\"passwordb\">password (repeat):</label><br>\
<input type=\"password\" id=\"passwordb\" name=\"passwordb\"><br>\
<input type=\"submit\" value=\"submit\"></form>"
    );

    Response::html(render::page(ctx, &form))
}
