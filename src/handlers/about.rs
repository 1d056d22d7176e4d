//! # About
//! src/handlers/about.rs
//!
//! Estado del servidor: versión, usuarios, cache y métricas de requests.

use super::render;
use crate::http::Response;
use crate::router::RequestContext;

pub fn about_handler(ctx: &RequestContext<'_>) -> Response {
    let state = ctx.state;
    let metrics = state.metrics.snapshot();

    let mut body = String::from("<h2>about</h2><p>");
    let rows = [
        ("version", env!("CARGO_PKG_VERSION").to_string()),
        ("users registered", state.identity.user_count().to_string()),
        ("users active", state.identity.active_sessions().to_string()),
        ("posts cached", state.content.cached_count().to_string()),
        ("resource locks", state.store.lock_count().to_string()),
        ("uptime (s)", metrics.uptime_secs.to_string()),
        ("requests", metrics.total_requests.to_string()),
        ("error responses", metrics.error_responses.to_string()),
        ("active workers", metrics.active_workers.to_string()),
        ("posts created", metrics.posts_created.to_string()),
        ("logins", metrics.logins.to_string()),
        ("registrations", metrics.registrations.to_string()),
        (
            "latency p50/p95/p99 (us)",
            format!(
                "{}/{}/{}",
                metrics.latency_p50_us, metrics.latency_p95_us, metrics.latency_p99_us
            ),
        ),
    ];
    for (label, value) in rows {
        body.push_str(&format!("<b>{label}:</b> {value}<br>"));
    }
    body.push_str("</p>");

    if !metrics.handlers.is_empty() {
        body.push_str("<p>");
        for (handler, count) in &metrics.handlers {
            let name = if handler.is_empty() { "home" } else { handler.as_str() };
            body.push_str(&format!("<b>/{}</b> {count}<br>", html_escape::encode_text(name)));
        }
        body.push_str("</p>");
    }

    Response::html(render::page(ctx, &body))
}
