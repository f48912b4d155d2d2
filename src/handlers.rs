//! Request routing and the state shared by every handler.

use spin_sdk::http::{Method, Request, Response};

use crate::auth::{self, Credentials};
use crate::config::Config;
use crate::core::db::DocumentStore;
use crate::core::errors::ApiResult;
use crate::core::helpers::message_response;
use crate::{friends, posts, users};

/// Everything a handler needs, built once from explicit configuration.
pub struct AppState {
    pub store: Box<dyn DocumentStore>,
    pub credentials: Credentials,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, store: Box<dyn DocumentStore>) -> anyhow::Result<Self> {
        Ok(Self {
            store,
            credentials: Credentials::new(&config)?,
            config,
        })
    }
}

fn method_name(method: &Method) -> &'static str {
    match method {
        Method::Get => "GET",
        Method::Post => "POST",
        Method::Put => "PUT",
        Method::Patch => "PATCH",
        Method::Delete => "DELETE",
        Method::Head => "HEAD",
        Method::Options => "OPTIONS",
        _ => "OTHER",
    }
}

fn homepage() -> ApiResult<Response> {
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body("Homepage")
        .build())
}

fn no_route() -> ApiResult<Response> {
    message_response(404, "No route found", serde_json::json!({}))
}

/// Dispatches one request. Handler errors become JSON error responses here.
pub fn handle(state: &AppState, req: Request) -> Response {
    let method = method_name(req.method());
    let path = req.path().to_string();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let result = match (method, segments.as_slice()) {
        ("GET", []) => homepage(),
        ("POST", ["api", "register"]) => auth::register_user(state, &req),
        ("POST", ["api", "login"]) => auth::login_user(state, &req),
        ("GET", ["api", "users"]) => users::get_users_list(state),
        ("GET", ["api", "users", id, "friends"]) => friends::get_friends_list(state, id),
        ("POST", ["api", "users", id, "friends"]) => {
            friends::handle_friend_request(state, &req, id)
        }
        ("PUT", ["api", "users", id, "friends", friend_id]) => {
            friends::handle_resolve_request(state, &req, id, friend_id)
        }
        ("GET", ["api", "posts"]) => posts::get_posts_list(state),
        ("POST", ["api", "posts"]) => posts::handle_create_post(state, &req),
        ("GET", ["api", "posts", id]) => posts::get_post(state, id),
        ("PATCH", ["api", "posts", id]) => posts::handle_update_post(state, &req, id),
        ("DELETE", ["api", "posts", id]) => posts::handle_delete_post(state, &req, id),
        ("POST", ["api", "posts", id, "like"]) => posts::handle_like_post(state, &req, id),
        ("POST", ["api", "posts", id, "comment"]) => posts::handle_comment(state, &req, id),
        _ => no_route(),
    };

    let response = result.unwrap_or_else(Response::from);
    tracing::debug!(method, path = %path, status = *response.status(), "handled request");
    response
}
