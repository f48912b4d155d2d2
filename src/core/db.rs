//! Document storage port and its two adapters.
//!
//! Users and posts live as JSON documents under string keys. The Spin
//! component persists them in the host key-value store; the native server
//! and the tests keep them in memory.

use anyhow::{anyhow, Context};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use spin_sdk::key_value::Store;

use crate::core::errors::ApiResult;
use crate::handlers::AppState;
use crate::models::{PostRequest, RegisterRequest};

pub const USERS_LIST_KEY: &str = "users_list";
pub const FEED_KEY: &str = "feed";

pub fn user_key(id: &str) -> String {
    format!("user:{}", id)
}

pub fn post_key(id: &str) -> String {
    format!("post:{}", id)
}

pub fn email_key(email: &str) -> String {
    format!("email:{}", email)
}

/// Raw byte-level access to a document store. Each call is atomic for its
/// key; nothing spans keys.
pub trait DocumentStore: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()>;
    fn delete(&self, key: &str) -> anyhow::Result<()>;
    fn exists(&self, key: &str) -> anyhow::Result<bool>;
}

pub trait DocumentStoreExt: DocumentStore {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.get(key)? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .with_context(|| format!("decoding document {key}"))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let bytes =
            serde_json::to_vec(value).with_context(|| format!("encoding document {key}"))?;
        self.set(key, &bytes)
    }
}

impl<S: DocumentStore + ?Sized> DocumentStoreExt for S {}

/// Spin key-value store. The store is opened per call, so the adapter is
/// just a label.
#[derive(Debug, Clone)]
pub struct KvStore {
    label: String,
}

impl Default for KvStore {
    fn default() -> Self {
        Self {
            label: "default".to_string(),
        }
    }
}

impl KvStore {
    fn open(&self) -> anyhow::Result<Store> {
        Store::open(&self.label).map_err(|e| anyhow!("opening key-value store {}: {}", self.label, e))
    }
}

impl DocumentStore for KvStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        self.open()?
            .get(key)
            .map_err(|e| anyhow!("reading {}: {}", key, e))
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        self.open()?
            .set(key, value)
            .map_err(|e| anyhow!("writing {}: {}", key, e))
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.open()?
            .delete(key)
            .map_err(|e| anyhow!("deleting {}: {}", key, e))
    }

    fn exists(&self, key: &str) -> anyhow::Result<bool> {
        self.open()?
            .exists(key)
            .map_err(|e| anyhow!("probing {}: {}", key, e))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: DashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.documents.get(key).map(|entry| entry.value().clone()))
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        self.documents.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.documents.remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.documents.contains_key(key))
    }
}

const DEMO_USERS: &[(&str, &str, &str, &str, &str)] = &[
    (
        "alice",
        "alice@example.com",
        "alice",
        "Hello, I'm Alice!",
        "Welcome to my corner! Excited to share thoughts here.",
    ),
    (
        "bob",
        "bob@example.com",
        "bob",
        "Bob's corner of the internet",
        "Hey everyone! Just joined, looking forward to connecting with you all.",
    ),
];

/// Registers the demo accounts with one post each. Accounts whose email is
/// already taken are left alone, so this is safe to run on every start.
pub fn seed_demo_data(state: &AppState) -> ApiResult<()> {
    for (name, email, password, bio, text) in DEMO_USERS {
        if state.store.exists(&email_key(email))? {
            continue;
        }
        let user = crate::auth::register(
            state,
            RegisterRequest {
                name: Some(name.to_string()),
                email: Some(email.to_string()),
                password: Some(password.to_string()),
                dob: None,
                bio: Some(bio.to_string()),
            },
        )?;
        crate::posts::create_post(
            state,
            &user.id,
            PostRequest {
                text: Some(text.to_string()),
                image: None,
            },
        )?;
        tracing::info!(user_id = %user.id, email = %email, "seeded demo user");
    }
    Ok(())
}
