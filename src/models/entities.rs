use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string, never the raw password.
    pub password: String,
    pub dob: Option<NaiveDate>,
    pub bio: Option<String>,
    #[serde(default)]
    pub posts: Vec<String>,
    #[serde(default)]
    pub friends: Vec<String>,
    /// Ids of users with a pending request to this user.
    #[serde(default)]
    pub friend_requests: Vec<String>,
}

/// Public projection of a [`User`], without the password hash.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub dob: Option<NaiveDate>,
    pub bio: Option<String>,
    pub posts: Vec<String>,
    pub friends: Vec<String>,
    pub friend_requests: Vec<String>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            dob: user.dob,
            bio: user.bio,
            posts: user.posts,
            friends: user.friends,
            friend_requests: user.friend_requests,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub text: String,
    pub image: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Comment {
    pub user_id: String,
    pub text: String,
    pub created_at: String,
}

/// JWT claims carried by a session token.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Claims {
    pub user_id: String,
    pub iat: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}
