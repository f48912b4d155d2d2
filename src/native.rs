//! Native host: an actix-web server that adapts each request into a Spin
//! `Request` and runs it through the shared router.

use std::net::TcpListener;

use actix_web::dev::Server;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};

use crate::config::Config;
use crate::core::db::{seed_demo_data, MemoryStore};
use crate::handlers::{self, AppState};

mod adapter {
    use actix_web::HttpRequest;
    use spin_sdk::http::{Method, Request, Response};

    pub fn actix_to_spin_request(req: &HttpRequest, body: actix_web::web::Bytes) -> Request {
        let method = match req.method().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            "PATCH" => Method::Patch,
            other => Method::Other(other.to_string()),
        };

        let mut builder = Request::builder();
        builder.method(method).uri(req.uri().to_string());
        for (name, value) in req.headers() {
            if let Ok(val_str) = value.to_str() {
                builder.header(name.as_str(), val_str);
            }
        }
        builder.body(body.to_vec()).build()
    }

    pub fn spin_to_actix_response(spin_resp: Response) -> actix_web::HttpResponse {
        let status = *spin_resp.status();
        let content_type = spin_resp
            .header("content-type")
            .and_then(|v| v.as_str())
            .unwrap_or("application/octet-stream")
            .to_string();

        actix_web::HttpResponse::build(
            actix_web::http::StatusCode::from_u16(status)
                .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR),
        )
        .insert_header(("Content-Type", content_type))
        .body(spin_resp.body().to_vec())
    }
}

async fn handle_all(state: web::Data<AppState>, req: HttpRequest, body: web::Bytes) -> HttpResponse {
    let spin_req = adapter::actix_to_spin_request(&req, body);
    adapter::spin_to_actix_response(handlers::handle(&state, spin_req))
}

/// Builds the server on an already bound listener. Port 0 works, which is
/// how the tests get a free port.
pub fn server(state: AppState, listener: TcpListener) -> std::io::Result<Server> {
    let state = web::Data::new(state);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .default_service(web::route().to(handle_all))
    })
    .listen(listener)?
    .run();
    Ok(server)
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(config, Box::new(MemoryStore::new()))?;
    if state.config.seed_demo_data {
        seed_demo_data(&state)?;
    }

    let listener = TcpListener::bind(&addr)?;
    tracing::info!(%addr, "server listening");
    server(state, listener)?.await?;
    Ok(())
}
