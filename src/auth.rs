//! Credential service: password hashing, registration, login and session
//! tokens.

use anyhow::anyhow;
use argon2::{Algorithm, Argon2, Params, Version};
use chrono::{Duration, NaiveDate, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use spin_sdk::http::{Request, Response};
use uuid::Uuid;

use crate::config::{Config, MAX_BIO_LENGTH, MAX_NAME_LENGTH};
use crate::core::db::{email_key, user_key, DocumentStoreExt, USERS_LIST_KEY};
use crate::core::errors::{ApiError, ApiResult, AuthError};
use crate::core::helpers::{
    hash_password, message_response, parse_body, sanitize_text, verify_password,
};
use crate::handlers::AppState;
use crate::models::{Claims, LoginRequest, RegisterRequest, User};

pub struct Credentials {
    argon2: Argon2<'static>,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    token_ttl: Option<Duration>,
}

impl Credentials {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let params = Params::new(
            config.password_memory_kib,
            config.password_iterations,
            Params::DEFAULT_P_COST,
            None,
        )
        .map_err(|e| anyhow!("invalid password hashing parameters: {}", e))?;

        // Expiry is optional and checked by `verify`.
        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            encoding: EncodingKey::from_secret(config.secret_key.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret_key.as_bytes()),
            validation,
            token_ttl: config.token_expiration_hours.map(Duration::hours),
        })
    }

    pub fn hash_password(&self, password: &str) -> anyhow::Result<String> {
        hash_password(&self.argon2, password)
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        verify_password(&self.argon2, password, hash)
    }

    pub fn issue_token(&self, user_id: &str) -> anyhow::Result<String> {
        let now = Utc::now();
        let claims = Claims {
            user_id: user_id.to_string(),
            iat: now.timestamp(),
            exp: self.token_ttl.map(|ttl| (now + ttl).timestamp()),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> anyhow::Result<String> {
        encode(&Header::default(), claims, &self.encoding)
            .map_err(|e| anyhow!("signing session token: {}", e))
    }

    /// Resolves a session token to the user id it was issued for.
    pub fn verify(&self, token: &str) -> Result<String, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "rejected session token");
            AuthError::InvalidToken
        })?;
        if let Some(exp) = data.claims.exp {
            if exp <= Utc::now().timestamp() {
                return Err(AuthError::InvalidToken);
            }
        }
        Ok(data.claims.user_id)
    }
}

fn required(field: Option<String>, name: &str) -> ApiResult<String> {
    field
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation(format!("{} is required", name)))
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
fn parse_dob(raw: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| chrono::DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| ApiError::Validation("dob must be a date (YYYY-MM-DD)".to_string()))
}

pub fn register(state: &AppState, req: RegisterRequest) -> ApiResult<User> {
    let name = sanitize_text(&required(req.name, "name")?);
    let email = required(req.email, "email")?;
    let password = req
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::Validation("password is required".to_string()))?;

    if name.is_empty() || name.chars().count() > MAX_NAME_LENGTH {
        return Err(ApiError::Validation(format!(
            "name must be 1-{} characters",
            MAX_NAME_LENGTH
        )));
    }
    let dob = match req.dob.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(raw) => Some(parse_dob(raw)?),
        None => None,
    };
    let bio = match req.bio.map(|bio| sanitize_text(&bio)) {
        Some(bio) if bio.chars().count() > MAX_BIO_LENGTH => {
            return Err(ApiError::Validation(format!(
                "bio too long (max {} chars)",
                MAX_BIO_LENGTH
            )))
        }
        Some(bio) => Some(bio).filter(|b| !b.is_empty()),
        None => None,
    };

    let store = &state.store;
    if store.exists(&email_key(&email))? {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        name,
        email,
        password: state.credentials.hash_password(&password)?,
        dob,
        bio,
        posts: Vec::new(),
        friends: Vec::new(),
        friend_requests: Vec::new(),
    };

    store.set_json(&user_key(&user.id), &user)?;
    store.set_json(&email_key(&user.email), &user.id)?;

    let mut users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    users.push(user.id.clone());
    store.set_json(USERS_LIST_KEY, &users)?;

    tracing::info!(user_id = %user.id, "registered user");
    Ok(user)
}

/// Returns a fresh session token and the id it is bound to.
pub fn login(state: &AppState, req: LoginRequest) -> ApiResult<(String, String)> {
    let (email, password) = match (req.email, req.password) {
        (Some(email), Some(password)) => (email, password),
        _ => return Err(AuthError::WrongCredentials.into()),
    };

    let store = &state.store;
    let user = match store.get_json::<String>(&email_key(email.trim()))? {
        Some(id) => store.get_json::<User>(&user_key(&id))?,
        None => None,
    };
    let user = match user {
        Some(user) if state.credentials.verify_password(&password, &user.password) => user,
        _ => {
            tracing::warn!("login rejected");
            return Err(AuthError::WrongCredentials.into());
        }
    };

    let token = state.credentials.issue_token(&user.id)?;
    tracing::info!(user_id = %user.id, "user logged in");
    Ok((token, user.id))
}

// === HTTP Handlers ===

pub fn register_user(state: &AppState, req: &Request) -> ApiResult<Response> {
    let user = register(state, parse_body(req)?)?;
    message_response(
        201,
        "User Registered Successfully",
        serde_json::json!({ "id": user.id }),
    )
}

pub fn login_user(state: &AppState, req: &Request) -> ApiResult<Response> {
    let (token, user_id) = login(state, parse_body(req)?)?;
    message_response(
        201,
        "Login Successful",
        serde_json::json!({ "token": token, "user_id": user_id }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::tests::test_state;

    fn alice() -> RegisterRequest {
        RegisterRequest {
            name: Some("Alice".to_string()),
            email: Some("alice@example.com".to_string()),
            password: Some("wonderland".to_string()),
            dob: Some("1990-04-01".to_string()),
            bio: Some("curious".to_string()),
        }
    }

    fn login_req(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[test]
    fn register_then_login_yields_verifiable_token() {
        let state = test_state();
        let user = register(&state, alice()).unwrap();
        assert_eq!(user.dob, NaiveDate::from_ymd_opt(1990, 4, 1));
        assert!(user.friends.is_empty() && user.friend_requests.is_empty());
        assert_ne!(user.password, "wonderland");

        let (token, user_id) = login(&state, login_req("alice@example.com", "wonderland")).unwrap();
        assert_eq!(user_id, user.id);
        assert_eq!(state.credentials.verify(&token).unwrap(), user.id);
    }

    #[test]
    fn wrong_password_and_unknown_email_are_rejected() {
        let state = test_state();
        register(&state, alice()).unwrap();

        for req in [
            login_req("alice@example.com", "looking-glass"),
            login_req("nobody@example.com", "wonderland"),
            login_req("ALICE@example.com", "wonderland"),
            LoginRequest::default(),
        ] {
            let err = login(&state, req).unwrap_err();
            assert!(matches!(err, ApiError::Auth(AuthError::WrongCredentials)));
        }
    }

    #[test]
    fn duplicate_email_conflicts() {
        let state = test_state();
        register(&state, alice()).unwrap();
        let err = register(&state, alice()).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn missing_fields_fail_validation() {
        let state = test_state();
        for req in [
            RegisterRequest { name: None, ..alice() },
            RegisterRequest { email: Some("  ".to_string()), ..alice() },
            RegisterRequest { password: Some(String::new()), ..alice() },
            RegisterRequest { dob: Some("yesterday".to_string()), ..alice() },
        ] {
            let err = register(&state, req).unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)), "got {err:?}");
        }
    }

    #[test]
    fn profile_text_is_stored_unescaped() {
        let state = test_state();
        let user = register(
            &state,
            RegisterRequest {
                name: Some("<b>Tom & Jerry</b>".to_string()),
                bio: Some("cats < mice, née 1940".to_string()),
                ..alice()
            },
        )
        .unwrap();
        assert_eq!(user.name, "Tom & Jerry");
        assert_eq!(user.bio.as_deref(), Some("cats < mice, née 1940"));

        let err = register(
            &state,
            RegisterRequest {
                email: Some("bob@example.com".to_string()),
                bio: Some("&".repeat(MAX_BIO_LENGTH + 1)),
                ..alice()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn dob_accepts_timestamps() {
        assert_eq!(
            parse_dob("2001-02-03T10:00:00Z").unwrap(),
            NaiveDate::from_ymd_opt(2001, 2, 3).unwrap()
        );
    }

    #[test]
    fn tampered_and_foreign_tokens_are_invalid() {
        let state = test_state();
        let token = state.credentials.issue_token("some-user").unwrap();
        assert_eq!(state.credentials.verify(&token).unwrap(), "some-user");

        assert_eq!(
            state.credentials.verify(&format!("{token}x")),
            Err(AuthError::InvalidToken)
        );
        assert_eq!(state.credentials.verify(""), Err(AuthError::InvalidToken));

        let other = Credentials::new(&Config {
            secret_key: "another-secret".to_string(),
            ..state.config.clone()
        })
        .unwrap();
        assert_eq!(other.verify(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn tokens_without_ttl_carry_no_expiry() {
        let state = test_state();
        let token = state.credentials.issue_token("u").unwrap();
        let data = decode::<Claims>(&token, &state.credentials.decoding, &state.credentials.validation)
            .unwrap();
        assert!(data.claims.exp.is_none());
    }

    #[test]
    fn expired_tokens_are_invalid() {
        let state = test_state();
        let expired = state
            .credentials
            .sign(&Claims {
                user_id: "u".to_string(),
                iat: Utc::now().timestamp() - 7200,
                exp: Some(Utc::now().timestamp() - 3600),
            })
            .unwrap();
        assert_eq!(state.credentials.verify(&expired), Err(AuthError::InvalidToken));

        let with_ttl = Credentials::new(&Config {
            token_expiration_hours: Some(1),
            ..state.config.clone()
        })
        .unwrap();
        let fresh = with_ttl.issue_token("u").unwrap();
        assert_eq!(with_ttl.verify(&fresh).unwrap(), "u");
    }
}
