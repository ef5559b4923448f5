//! Shared test harness: in-memory collaborators and a spawned server.

#![allow(dead_code)]

use async_trait::async_trait;
use dashmap::DashMap;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use tokenward::auth::{hash_password_with_cost, TokenCodec, TokenEngine, TokenTtls};
use tokenward::session_cache::InMemorySessionCache;
use tokenward::startup::run;
use tokenward::user_store::{Identity, NewUser, UserStore, UserStoreError};

pub const SECRET: &[u8] = b"integration-test-secret-32-bytes!!";
pub const ISSUER: &str = "tokenward-test";

pub const TTLS: TokenTtls = TokenTtls {
    access: Duration::from_secs(900),
    refresh: Duration::from_secs(604800),
};

/// User store keyed by username, with unique usernames and emails
#[derive(Default, Clone)]
pub struct InMemoryUserStore {
    users: Arc<DashMap<String, Identity>>,
    emails: Arc<DashMap<String, String>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user directly, hashing with a cheap cost factor
    pub fn insert_user(&self, username: &str, password: &str) -> Identity {
        let identity = Identity {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            password_hash: hash_password_with_cost(password, 4).expect("Failed to hash password"),
            role: "user".to_string(),
        };
        self.users.insert(username.to_string(), identity.clone());
        identity
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Identity, UserStoreError> {
        self.users
            .get(username)
            .map(|u| u.value().clone())
            .ok_or(UserStoreError::NotFound)
    }

    async fn create(&self, user: NewUser) -> Result<String, UserStoreError> {
        if self.users.contains_key(&user.username) {
            return Err(UserStoreError::AlreadyExists("username"));
        }
        if self.emails.contains_key(&user.email) {
            return Err(UserStoreError::AlreadyExists("email"));
        }
        let id = uuid::Uuid::new_v4().to_string();
        self.emails.insert(user.email, id.clone());
        self.users.insert(
            user.username.clone(),
            Identity {
                id: id.clone(),
                username: user.username,
                password_hash: user.password_hash,
                role: user.role,
            },
        );
        Ok(id)
    }
}

pub fn codec() -> TokenCodec {
    TokenCodec::hmac(SECRET, ISSUER)
}

pub fn build_engine(users: InMemoryUserStore, sessions: InMemorySessionCache) -> TokenEngine {
    TokenEngine::new(codec(), Arc::new(users), Arc::new(sessions), TTLS)
}

pub struct TestApp {
    pub address: String,
    pub users: InMemoryUserStore,
    pub sessions: InMemorySessionCache,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}/api/v1/auth/login", &self.address))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn refresh(&self, refresh_token: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}/api/v1/auth/refresh", &self.address))
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn revoke(&self, refresh_token: &str) -> reqwest::Response {
        self.client
            .delete(&format!(
                "{}/api/v1/auth/revoke-token?refresh_token={}",
                &self.address,
                urlencoding::encode(refresh_token)
            ))
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

pub async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let users = InMemoryUserStore::new();
    let sessions = InMemorySessionCache::new();
    let engine = build_engine(users.clone(), sessions.clone());

    let server = run(listener, engine).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        users,
        sessions,
        client: reqwest::Client::new(),
    }
}
