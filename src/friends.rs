//! Friend requests and friendships.
//!
//! A pending request is the sender's id in the recipient's
//! `friend_requests`. Accepting moves it into `friends` on both sides, so
//! friendship is always symmetric.

use spin_sdk::http::{Request, Response};

use crate::core::db::DocumentStore;
use crate::core::errors::{ApiError, ApiResult, AuthError};
use crate::core::helpers::{json_response, message_response, parse_body};
use crate::guard::authenticate;
use crate::handlers::AppState;
use crate::models::ResolveFriendRequest;
use crate::users::{load_user, save_user};

pub fn list_friends(store: &dyn DocumentStore, user_id: &str) -> ApiResult<Vec<String>> {
    Ok(load_user(store, user_id)?.friends)
}

/// Records `requester_id` as a pending request on `target_id`.
pub fn request_friend(
    store: &dyn DocumentStore,
    requester_id: &str,
    target_id: &str,
) -> ApiResult<()> {
    if requester_id == target_id {
        return Err(ApiError::Validation(
            "Cannot send a friend request to yourself".to_string(),
        ));
    }

    let mut target = load_user(store, target_id)?;
    if target.friends.iter().any(|id| id == requester_id) {
        return Err(ApiError::Conflict("Already friends".to_string()));
    }
    if target.friend_requests.iter().any(|id| id == requester_id) {
        return Err(ApiError::Conflict("Friend request already pending".to_string()));
    }

    target.friend_requests.push(requester_id.to_string());
    save_user(store, &target)?;

    tracing::info!(from = %requester_id, to = %target_id, "friend request sent");
    Ok(())
}

/// Accepts or rejects the pending request from `sender_id` on `user_id`.
/// Only the recipient may resolve its own requests.
pub fn resolve_friend_request(
    store: &dyn DocumentStore,
    actor_id: &str,
    user_id: &str,
    sender_id: &str,
    accept: bool,
) -> ApiResult<()> {
    let mut user = load_user(store, user_id)?;
    if actor_id != user.id {
        return Err(AuthError::AccessDenied.into());
    }

    let index = user
        .friend_requests
        .iter()
        .position(|id| id == sender_id)
        .ok_or(ApiError::NotFound("Friend request"))?;

    if !accept {
        user.friend_requests.remove(index);
        save_user(store, &user)?;
        tracing::info!(user_id = %user_id, from = %sender_id, "friend request rejected");
        return Ok(());
    }

    let mut sender = load_user(store, sender_id)?;
    let before = user.clone();

    user.friend_requests.remove(index);
    if !user.friends.iter().any(|id| id == sender_id) {
        user.friends.push(sender_id.to_string());
    }
    // A crossed request from the other side is settled by the same accept.
    sender.friend_requests.retain(|id| id != user_id);
    if !sender.friends.iter().any(|id| id == user_id) {
        sender.friends.push(user_id.to_string());
    }

    save_user(store, &user)?;
    if let Err(err) = save_user(store, &sender) {
        if let Err(restore_err) = save_user(store, &before) {
            tracing::error!(
                user_id = %user_id,
                error = %restore_err,
                "could not restore user after failed friendship write"
            );
        }
        return Err(err);
    }

    tracing::info!(user_id = %user_id, friend_id = %sender_id, "friend request accepted");
    Ok(())
}

// === HTTP Handlers ===

pub fn get_friends_list(state: &AppState, user_id: &str) -> ApiResult<Response> {
    json_response(200, &list_friends(state.store.as_ref(), user_id)?)
}

pub fn handle_friend_request(state: &AppState, req: &Request, target_id: &str) -> ApiResult<Response> {
    let requester_id = authenticate(state, req)?;
    request_friend(state.store.as_ref(), &requester_id, target_id)?;
    message_response(201, "Friend request sent successfully", serde_json::json!({}))
}

pub fn handle_resolve_request(
    state: &AppState,
    req: &Request,
    user_id: &str,
    sender_id: &str,
) -> ApiResult<Response> {
    let actor_id = authenticate(state, req)?;
    let body: ResolveFriendRequest = parse_body(req)?;
    resolve_friend_request(state.store.as_ref(), &actor_id, user_id, sender_id, body.accept)?;
    message_response(200, "Friend request updated successfully", serde_json::json!({}))
}
