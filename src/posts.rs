use spin_sdk::http::{Request, Response};
use uuid::Uuid;

use crate::config::{MAX_COMMENT_LENGTH, MAX_POST_LENGTH};
use crate::core::db::{post_key, DocumentStore, DocumentStoreExt, FEED_KEY};
use crate::core::errors::{ApiError, ApiResult, AuthError};
use crate::core::helpers::{
    json_response, message_response, now_iso, parse_body, sanitize_text, validate_uuid,
};
use crate::guard::authenticate;
use crate::handlers::AppState;
use crate::models::{Comment, CommentRequest, Post, PostRequest};
use crate::users::{load_user, save_user};

fn check_length(text: &str, max: usize, what: &str) -> ApiResult<()> {
    if text.chars().count() > max {
        return Err(ApiError::Validation(format!(
            "{} too long (max {} chars)",
            what, max
        )));
    }
    Ok(())
}

/// Empty strings count as "not supplied".
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn load_post(store: &dyn DocumentStore, post_id: &str) -> ApiResult<Post> {
    if !validate_uuid(post_id) {
        return Err(ApiError::NotFound("Post"));
    }
    store
        .get_json::<Post>(&post_key(post_id))?
        .ok_or(ApiError::NotFound("Post"))
}

fn save_post(store: &dyn DocumentStore, post: &Post) -> ApiResult<()> {
    store.set_json(&post_key(&post.id), post)?;
    Ok(())
}

pub fn create_post(state: &AppState, author_id: &str, req: PostRequest) -> ApiResult<Post> {
    let store = state.store.as_ref();
    let text = sanitize_text(&req.text.unwrap_or_default());
    check_length(&text, MAX_POST_LENGTH, "text")?;
    let mut author = load_user(store, author_id)?;

    let post = Post {
        id: Uuid::new_v4().to_string(),
        user_id: author_id.to_string(),
        text,
        image: non_empty(req.image),
        created_at: now_iso(),
        updated_at: None,
        likes: Vec::new(),
        comments: Vec::new(),
    };
    save_post(store, &post)?;

    let mut feed: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();
    feed.insert(0, post.id.clone()); // newest first
    store.set_json(FEED_KEY, &feed)?;

    author.posts.push(post.id.clone());
    save_user(store, &author)?;

    tracing::info!(post_id = %post.id, user_id = %author_id, "post created");
    Ok(post)
}

pub fn list_posts(store: &dyn DocumentStore) -> ApiResult<Vec<Post>> {
    let feed: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();
    let mut posts = Vec::with_capacity(feed.len());
    for id in feed {
        if let Some(post) = store.get_json::<Post>(&post_key(&id))? {
            posts.push(post);
        }
    }
    Ok(posts)
}

/// Owner-only edit. Fields that are absent or empty keep their value.
pub fn update_post(
    store: &dyn DocumentStore,
    requester_id: &str,
    post_id: &str,
    req: PostRequest,
) -> ApiResult<Post> {
    let mut post = load_post(store, post_id)?;
    if post.user_id != requester_id {
        return Err(AuthError::AccessDenied.into());
    }

    let mut changed = false;
    if let Some(text) = non_empty(req.text) {
        let text = sanitize_text(&text);
        check_length(&text, MAX_POST_LENGTH, "text")?;
        if text != post.text {
            post.text = text;
            changed = true;
        }
    }
    if let Some(image) = non_empty(req.image) {
        if post.image.as_deref() != Some(image.as_str()) {
            post.image = Some(image);
            changed = true;
        }
    }

    // Skip the write when nothing changed
    if changed {
        post.updated_at = Some(now_iso());
        save_post(store, &post)?;
        tracing::info!(post_id = %post.id, "post updated");
    }
    Ok(post)
}

pub fn delete_post(store: &dyn DocumentStore, requester_id: &str, post_id: &str) -> ApiResult<()> {
    let post = load_post(store, post_id)?;
    if post.user_id != requester_id {
        return Err(AuthError::AccessDenied.into());
    }

    store.delete(&post_key(&post.id))?;

    let mut feed: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();
    feed.retain(|id| id != &post.id);
    store.set_json(FEED_KEY, &feed)?;

    match load_user(store, &post.user_id) {
        Ok(mut owner) => {
            owner.posts.retain(|id| id != &post.id);
            save_user(store, &owner)?;
        }
        Err(ApiError::NotFound(_)) => {}
        Err(err) => return Err(err),
    }

    tracing::info!(post_id = %post.id, "post deleted");
    Ok(())
}

pub fn like_post(store: &dyn DocumentStore, requester_id: &str, post_id: &str) -> ApiResult<Post> {
    let mut post = load_post(store, post_id)?;
    if post.likes.iter().any(|id| id == requester_id) {
        return Err(AuthError::AlreadyLiked.into());
    }
    post.likes.push(requester_id.to_string());
    save_post(store, &post)?;
    tracing::debug!(post_id = %post.id, user_id = %requester_id, "post liked");
    Ok(post)
}

pub fn comment_on_post(
    store: &dyn DocumentStore,
    requester_id: &str,
    post_id: &str,
    text: Option<String>,
) -> ApiResult<Post> {
    let mut post = load_post(store, post_id)?;
    let text = non_empty(text.map(|t| sanitize_text(&t)))
        .ok_or_else(|| ApiError::Validation("Comment text is required".to_string()))?;
    check_length(&text, MAX_COMMENT_LENGTH, "comment")?;

    post.comments.push(Comment {
        user_id: requester_id.to_string(),
        text,
        created_at: now_iso(),
    });
    save_post(store, &post)?;
    tracing::debug!(post_id = %post.id, user_id = %requester_id, "comment added");
    Ok(post)
}

// === HTTP Handlers ===

fn with_post(status: u16, message: &str, post: &Post) -> ApiResult<Response> {
    message_response(status, message, serde_json::json!({ "post": post }))
}

pub fn get_posts_list(state: &AppState) -> ApiResult<Response> {
    json_response(200, &list_posts(state.store.as_ref())?)
}

pub fn get_post(state: &AppState, post_id: &str) -> ApiResult<Response> {
    json_response(200, &load_post(state.store.as_ref(), post_id)?)
}

pub fn handle_create_post(state: &AppState, req: &Request) -> ApiResult<Response> {
    let user_id = authenticate(state, req)?;
    let post = create_post(state, &user_id, parse_body(req)?)?;
    with_post(200, "Post created successfully", &post)
}

pub fn handle_update_post(state: &AppState, req: &Request, post_id: &str) -> ApiResult<Response> {
    let user_id = authenticate(state, req)?;
    let post = update_post(state.store.as_ref(), &user_id, post_id, parse_body(req)?)?;
    with_post(200, "Post updated successfully", &post)
}

pub fn handle_delete_post(state: &AppState, req: &Request, post_id: &str) -> ApiResult<Response> {
    let user_id = authenticate(state, req)?;
    delete_post(state.store.as_ref(), &user_id, post_id)?;
    message_response(200, "Post deleted successfully", serde_json::json!({}))
}

pub fn handle_like_post(state: &AppState, req: &Request, post_id: &str) -> ApiResult<Response> {
    let user_id = authenticate(state, req)?;
    let post = like_post(state.store.as_ref(), &user_id, post_id)?;
    with_post(200, "Post liked successfully", &post)
}

pub fn handle_comment(state: &AppState, req: &Request, post_id: &str) -> ApiResult<Response> {
    let user_id = authenticate(state, req)?;
    let body: CommentRequest = parse_body(req)?;
    let post = comment_on_post(state.store.as_ref(), &user_id, post_id, body.text)?;
    with_post(200, "Comment added successfully", &post)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::tests::{register_and_login, test_state};

    fn text(value: &str) -> PostRequest {
        PostRequest {
            text: Some(value.to_string()),
            image: None,
        }
    }

    #[test]
    fn create_links_post_to_feed_and_author() {
        let state = test_state();
        let (alice, _) = register_and_login(&state, "alice");
        let first = create_post(&state, &alice, text("first")).unwrap();
        let second = create_post(&state, &alice, text("second")).unwrap();

        let listed: Vec<String> = list_posts(state.store.as_ref())
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(listed, vec![second.id.clone(), first.id.clone()]);

        let author = load_user(state.store.as_ref(), &alice).unwrap();
        assert_eq!(author.posts, vec![first.id, second.id]);
    }

    #[test]
    fn empty_posts_are_accepted_but_long_ones_are_not() {
        let state = test_state();
        let (alice, _) = register_and_login(&state, "alice");
        let post = create_post(&state, &alice, PostRequest::default()).unwrap();
        assert_eq!(post.text, "");
        assert!(post.image.is_none());

        let err = create_post(&state, &alice, text(&"a".repeat(MAX_POST_LENGTH + 1))).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn text_is_stored_as_plain_text() {
        let state = test_state();
        let (alice, _) = register_and_login(&state, "alice");
        let (bob, _) = register_and_login(&state, "bob");
        let store = state.store.as_ref();

        let post = create_post(&state, &alice, text("Tom & Jerry say 1 < 2 <b>ok</b>")).unwrap();
        assert_eq!(post.text, "Tom & Jerry say 1 < 2 ok");
        assert_eq!(load_post(store, &post.id).unwrap().text, "Tom & Jerry say 1 < 2 ok");

        let edited = update_post(store, &alice, &post.id, text("café ☕ & more")).unwrap();
        assert_eq!(edited.text, "café ☕ & more");

        let commented =
            comment_on_post(store, &bob, &post.id, Some("fish & chips".to_string())).unwrap();
        assert_eq!(commented.comments[0].text, "fish & chips");

        // Markup-only comments have no text left.
        let err = comment_on_post(store, &bob, &post.id, Some("<img src=x>".to_string())).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn length_limits_apply_to_the_stored_text() {
        let state = test_state();
        let (alice, _) = register_and_login(&state, "alice");
        let store = state.store.as_ref();

        let post = create_post(&state, &alice, text(&"&".repeat(MAX_POST_LENGTH))).unwrap();
        assert_eq!(post.text.chars().count(), MAX_POST_LENGTH);

        let commented =
            comment_on_post(store, &alice, &post.id, Some("<".repeat(MAX_COMMENT_LENGTH))).unwrap();
        assert_eq!(commented.comments[0].text.chars().count(), MAX_COMMENT_LENGTH);

        let err = comment_on_post(store, &alice, &post.id, Some("é".repeat(MAX_COMMENT_LENGTH + 1)))
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn unknown_author_writes_nothing() {
        let state = test_state();
        let ghost = Uuid::new_v4().to_string();

        let err = create_post(&state, &ghost, text("orphan")).unwrap_err();
        assert!(matches!(err, ApiError::NotFound("User")));
        assert!(list_posts(state.store.as_ref()).unwrap().is_empty());
        assert!(state.store.get_json::<Vec<String>>(FEED_KEY).unwrap().is_none());
    }

    #[test]
    fn only_the_owner_may_edit() {
        let state = test_state();
        let (alice, _) = register_and_login(&state, "alice");
        let (bob, _) = register_and_login(&state, "bob");
        let post = create_post(&state, &alice, text("original")).unwrap();
        let store = state.store.as_ref();

        let err = update_post(store, &bob, &post.id, text("hijacked")).unwrap_err();
        assert!(matches!(err, ApiError::Auth(AuthError::AccessDenied)));

        let updated = update_post(store, &alice, &post.id, text("edited")).unwrap();
        assert_eq!(updated.text, "edited");
        assert!(updated.updated_at.is_some());
        assert_eq!(load_post(store, &post.id).unwrap().text, "edited");
    }

    #[test]
    fn empty_fields_leave_values_unchanged() {
        let state = test_state();
        let (alice, _) = register_and_login(&state, "alice");
        let post = create_post(
            &state,
            &alice,
            PostRequest {
                text: Some("keep me".to_string()),
                image: Some("https://img.example/1.png".to_string()),
            },
        )
        .unwrap();
        let store = state.store.as_ref();

        let same = update_post(
            store,
            &alice,
            &post.id,
            PostRequest {
                text: Some(String::new()),
                image: None,
            },
        )
        .unwrap();
        assert_eq!(same.text, "keep me");
        assert_eq!(same.image.as_deref(), Some("https://img.example/1.png"));
        assert!(same.updated_at.is_none());

        let new_image = update_post(
            store,
            &alice,
            &post.id,
            PostRequest {
                text: None,
                image: Some("https://img.example/2.png".to_string()),
            },
        )
        .unwrap();
        assert_eq!(new_image.text, "keep me");
        assert_eq!(new_image.image.as_deref(), Some("https://img.example/2.png"));
    }

    #[test]
    fn likes_are_unique_per_user() {
        let state = test_state();
        let (alice, _) = register_and_login(&state, "alice");
        let (bob, _) = register_and_login(&state, "bob");
        let post = create_post(&state, &alice, text("like me")).unwrap();
        let store = state.store.as_ref();

        like_post(store, &alice, &post.id).unwrap();
        let err = like_post(store, &alice, &post.id).unwrap_err();
        assert!(matches!(err, ApiError::Auth(AuthError::AlreadyLiked)));

        let liked = like_post(store, &bob, &post.id).unwrap();
        assert_eq!(liked.likes, vec![alice, bob]);
    }

    #[test]
    fn comments_record_the_commenter() {
        let state = test_state();
        let (alice, _) = register_and_login(&state, "alice");
        let (bob, _) = register_and_login(&state, "bob");
        let post = create_post(&state, &alice, text("discuss")).unwrap();
        let store = state.store.as_ref();

        let commented = comment_on_post(store, &bob, &post.id, Some("nice".to_string())).unwrap();
        assert_eq!(commented.comments.len(), 1);
        assert_eq!(commented.comments[0].user_id, bob.as_str());
        assert_eq!(commented.comments[0].text, "nice");

        let err = comment_on_post(store, &bob, &post.id, Some("  ".to_string())).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn delete_is_owner_only_and_unlinks() {
        let state = test_state();
        let (alice, _) = register_and_login(&state, "alice");
        let (bob, _) = register_and_login(&state, "bob");
        let post = create_post(&state, &alice, text("short lived")).unwrap();
        let store = state.store.as_ref();

        let err = delete_post(store, &bob, &post.id).unwrap_err();
        assert!(matches!(err, ApiError::Auth(AuthError::AccessDenied)));

        delete_post(store, &alice, &post.id).unwrap();
        assert!(matches!(load_post(store, &post.id).unwrap_err(), ApiError::NotFound("Post")));
        assert!(list_posts(store).unwrap().is_empty());
        assert!(load_user(store, &alice).unwrap().posts.is_empty());

        let err = delete_post(store, &alice, &post.id).unwrap_err();
        assert!(matches!(err, ApiError::NotFound("Post")));
    }

    #[test]
    fn unknown_and_malformed_post_ids_are_not_found() {
        let state = test_state();
        let (alice, _) = register_and_login(&state, "alice");
        let store = state.store.as_ref();
        for id in ["nope", "00000000-0000-0000-0000-000000000000"] {
            assert!(matches!(load_post(store, id).unwrap_err(), ApiError::NotFound("Post")));
            assert!(matches!(like_post(store, &alice, id).unwrap_err(), ApiError::NotFound("Post")));
            assert!(matches!(
                comment_on_post(store, &alice, id, Some("hi".to_string())).unwrap_err(),
                ApiError::NotFound("Post")
            ));
        }
    }
}
