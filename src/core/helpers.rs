use ammonia::Builder;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use html_escape::decode_html_entities;
use rand::rngs::OsRng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use spin_sdk::http::{Request, Response};
use uuid::Uuid;

use crate::core::errors::{ApiError, ApiResult};

pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub fn hash_password(argon2: &Argon2<'_>, password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
}

/// Constant-time check of `password` against a stored PHC string. The
/// hash carries its own parameters, so any argon2 instance can verify it.
pub fn verify_password(argon2: &Argon2<'_>, password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

pub fn validate_uuid(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

/// Strips every HTML tag, keeping the text content as plain text.
///
/// ammonia escapes whatever text it keeps, so the entities it emits are
/// decoded again before the value is stored.
pub fn sanitize_text(text: &str) -> String {
    let cleaned = Builder::default()
        .tags(std::collections::HashSet::new())
        .clean(text)
        .to_string();
    decode_html_entities(&cleaned).into_owned()
}

/// Decodes a JSON request body. An empty body reads as `T::default()`.
pub fn parse_body<T: DeserializeOwned + Default>(req: &Request) -> ApiResult<T> {
    let body = req.body();
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::Validation(format!("Invalid JSON body: {e}")))
}

pub fn json_response<T: Serialize>(status: u16, body: &T) -> ApiResult<Response> {
    let bytes = serde_json::to_vec(body).map_err(anyhow::Error::from)?;
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(bytes)
        .build())
}

/// `{"message": ...}` plus any extra fields from `extra` (an object).
pub fn message_response(status: u16, message: &str, extra: serde_json::Value) -> ApiResult<Response> {
    let mut body = serde_json::json!({ "message": message });
    if let (Some(target), serde_json::Value::Object(fields)) = (body.as_object_mut(), extra) {
        target.extend(fields);
    }
    json_response(status, &body)
}
