use spin_sdk::http::Response;

use crate::core::db::{user_key, DocumentStore, DocumentStoreExt, USERS_LIST_KEY};
use crate::core::errors::{ApiError, ApiResult};
use crate::core::helpers::{json_response, validate_uuid};
use crate::handlers::AppState;
use crate::models::{User, UserView};

/// Loads a user, treating malformed ids the same as unknown ones.
pub fn load_user(store: &dyn DocumentStore, user_id: &str) -> ApiResult<User> {
    if !validate_uuid(user_id) {
        return Err(ApiError::NotFound("User"));
    }
    store
        .get_json::<User>(&user_key(user_id))?
        .ok_or(ApiError::NotFound("User"))
}

pub fn save_user(store: &dyn DocumentStore, user: &User) -> ApiResult<()> {
    store.set_json(&user_key(&user.id), user)?;
    Ok(())
}

/// Every registered user, in registration order, without password hashes.
pub fn list_users(store: &dyn DocumentStore) -> ApiResult<Vec<UserView>> {
    let ids: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    let mut users = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(user) = store.get_json::<User>(&user_key(&id))? {
            users.push(UserView::from(user));
        }
    }
    Ok(users)
}

// === HTTP Handlers ===

pub fn get_users_list(state: &AppState) -> ApiResult<Response> {
    json_response(200, &list_users(state.store.as_ref())?)
}
