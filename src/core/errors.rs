use spin_sdk::http::Response;
use thiserror::Error;

/// Identity and ownership failures.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("Wrong Credentials")]
    WrongCredentials,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Unauthenticated")]
    Unauthenticated,
    #[error("Access Denied")]
    AccessDenied,
    #[error("You have already liked this post")]
    AlreadyLiked,
}

impl AuthError {
    pub fn status(&self) -> u16 {
        match self {
            AuthError::AccessDenied | AuthError::AlreadyLiked => 400,
            AuthError::WrongCredentials | AuthError::InvalidToken | AuthError::Unauthenticated => {
                401
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    /// Carries the kind of resource that was missing ("User", "Post", ...).
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Conflict(String),

    #[error("store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Validation(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::Auth(err) => err.status(),
            ApiError::Conflict(_) => 409,
            ApiError::Store(_) => 500,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

fn json_error(status: u16, body: serde_json::Value) -> Response {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(body.to_string().into_bytes())
        .build()
}

impl From<ApiError> for Response {
    fn from(err: ApiError) -> Self {
        let status = err.status();
        match err {
            ApiError::Store(detail) => {
                tracing::error!(error = %format!("{detail:#}"), "request failed in the store");
                json_error(
                    status,
                    serde_json::json!({
                        "message": "Something went wrong",
                        "error": format!("{detail:#}"),
                    }),
                )
            }
            other => json_error(status, serde_json::json!({ "message": other.to_string() })),
        }
    }
}
