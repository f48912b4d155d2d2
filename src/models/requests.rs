use serde::Deserialize;

// Every field is optional on the wire; presence is checked by the handlers
// so a missing field becomes a 400 with a readable message.

#[derive(Deserialize, Default, Debug)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub dob: Option<String>,
    pub bio: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
pub struct ResolveFriendRequest {
    #[serde(default)]
    pub accept: bool,
}

#[derive(Deserialize, Default, Debug)]
pub struct PostRequest {
    pub text: Option<String>,
    pub image: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
pub struct CommentRequest {
    pub text: Option<String>,
}
