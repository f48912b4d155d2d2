//! Social networking backend: accounts, friend requests, posts, likes and
//! comments, stored as JSON documents.
//!
//! The same router serves two hosts: a Spin HTTP component backed by the
//! Spin key-value store (wasm32), and a native actix-web server.

pub mod auth;
pub mod config;
pub mod core;
pub mod friends;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod posts;
pub mod users;

#[cfg(not(target_arch = "wasm32"))]
pub mod native;

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber (`RUST_LOG`, default `info`). Later calls
/// are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(cfg!(not(target_arch = "wasm32")))
        .try_init();
}

// === Component entrypoint ===
#[cfg(target_arch = "wasm32")]
#[spin_sdk::http_component]
fn handle(req: spin_sdk::http::Request) -> anyhow::Result<spin_sdk::http::Response> {
    init_tracing();
    let config = config::Config::from_spin_variables()?;
    let state = handlers::AppState::new(config, Box::new(core::db::KvStore::default()))?;
    Ok(handlers::handle(&state, req))
}
