//! Tests de integración del servidor
//! tests/integration_test.rs
//!
//! Cada test levanta su propio servidor en un puerto libre y con datos en
//! un directorio temporal, y le habla por TCP como lo haría un navegador.

use d3ad::config::Config;
use d3ad::id::I512;
use d3ad::server::{AppState, Server};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn config_for(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.port = 0;
    config.workers = 4;
    config.accept_timeout_ms = 100;
    config.auth_delay_ms = 0;
    config.post_dir = dir.path().join("pst");
    config.user_dir = dir.path().join("usr");
    config.tag_dir = dir.path().join("tag");
    config
}

/// Levanta un servidor en background y retorna su dirección
fn start_server(dir: &TempDir) -> (SocketAddr, Arc<AppState>) {
    let state = Arc::new(AppState::new(config_for(dir)).unwrap());
    let server = Server::bind(Arc::clone(&state)).unwrap();
    let addr = server.local_addr().unwrap();
    thread::spawn(move || server.run());
    (addr, state)
}

/// Envía un request crudo y retorna la respuesta completa
fn send(addr: SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    stream.write_all(raw.as_bytes()).unwrap();
    stream.flush().unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    response
}

fn get(addr: SocketAddr, path: &str, token: Option<&str>) -> String {
    let cookie = token.map(|t| format!("Cookie: token={t}\r\n")).unwrap_or_default();
    send(addr, &format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n{cookie}\r\n"))
}

fn post(addr: SocketAddr, path: &str, body: &str, token: Option<&str>) -> String {
    let cookie = token.map(|t| format!("Cookie: token={t}\r\n")).unwrap_or_default();
    send(
        addr,
        &format!(
            "POST {path} HTTP/1.1\r\nHost: localhost\r\n{cookie}Content-Length: {}\r\n\r\n{body}",
            body.len()
        ),
    )
}

fn body(response: &str) -> &str {
    response.split_once("\r\n\r\n").map(|(_, body)| body).unwrap_or("")
}

fn cookie(response: &str) -> Option<String> {
    response
        .lines()
        .find_map(|line| line.strip_prefix("Set-Cookie: token="))
        .map(|token| token.trim().to_string())
}

#[test]
fn test_alice_posts_tags_and_hides() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, state) = start_server(&dir);

    // Registro
    let response = post(addr, "/", "username=alice&passworda=swordfish1&passwordb=swordfish1", None);
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    let token = cookie(&response).expect("registro sin cookie");
    assert_eq!(token.len(), 128);

    // Post con tag
    let alice = state.identity.resolve_by_name("alice").unwrap();
    let response = post(addr, &format!("/user/{}", alice.id), "post=hello+%23world", Some(&token));
    assert!(body(&response).contains("hello"));

    let latest = alice.latest().expect("latest no actualizado");
    let tag_file = std::fs::read_to_string(dir.path().join("tag").join("world")).unwrap();
    assert_eq!(tag_file, format!("{latest}\n"));

    let search = get(addr, "/tag/world", None);
    assert!(body(&search).contains("hello"));

    // Ocultar
    let response = get(addr, &format!("/hide/{latest}"), Some(&token));
    assert!(body(&response).contains("Message hidden"));

    let page = get(addr, &format!("/user/{}", alice.id), None);
    assert!(body(&page).contains("Message hidden"));
    assert!(!body(&page).contains("hello"));

    // El registro en disco conserva el mensaje original
    let raw = std::fs::read(dir.path().join("pst").join(latest.to_hex())).unwrap();
    let record: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(record["message"], "hello #world");
    assert_eq!(record["visibility"], "hidden");
}

#[test]
fn test_concurrent_registration_single_winner() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, state) = start_server(&dir);
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let response = post(addr, "/", "username=bob&passworda=swordfish1&passwordb=swordfish1", None);
                cookie(&response).is_some()
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|won| *won)
        .count();

    assert_eq!(winners, 1);
    assert_eq!(state.identity.user_count(), 1);
}

#[test]
fn test_login_and_cookie_session() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, _state) = start_server(&dir);

    post(addr, "/", "username=carol&passworda=swordfish1&passwordb=swordfish1", None);

    let bad = post(addr, "/login", "username=carol&password=wrongpass1", None);
    assert!(cookie(&bad).is_none());
    assert!(body(&bad).contains("name=\"password\""));

    let good = post(addr, "/login", "username=carol&password=swordfish1", None);
    let token = cookie(&good).expect("login sin cookie");
    // Ya autenticado, /login muestra la home
    assert!(body(&good).contains("latest posts"));

    let home = get(addr, "/", Some(&token));
    assert!(body(&home).contains("@carol"));
    assert_eq!(cookie(&home), Some(token));
}

#[test]
fn test_errors_and_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, _state) = start_server(&dir);

    let unknown = get(addr, "/nowhere", None);
    assert!(unknown.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(body(&unknown), "<b>Error</b>");

    let feed = get(addr, "/rss", None);
    assert!(feed.contains("Content-Type: application/xml"));
    assert!(body(&feed).ends_with("</channel></rss>"));

    let missing = get(addr, &format!("/embed/{}", I512::random()), None);
    assert_eq!(body(&missing), "<b>Error</b>");
}

#[test]
fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let post_id = {
        let (addr, state) = start_server(&dir);
        let response = post(addr, "/", "username=dave&passworda=swordfish1&passwordb=swordfish1", None);
        let token = cookie(&response).unwrap();
        post(addr, "/", "post=still+here", Some(&token));
        state.identity.resolve_by_name("dave").unwrap().latest().unwrap()
    };

    let reloaded = AppState::new(config_for(&dir)).unwrap();
    let dave = reloaded.identity.resolve_by_name("dave").unwrap();
    assert_eq!(dave.latest(), Some(post_id));
    assert_eq!(reloaded.content.read_content(&post_id).unwrap().message, "still here");
}
