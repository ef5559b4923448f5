//! Engine-level lifecycle tests against the in-memory collaborators

mod common;

use std::sync::Arc;

use tokenward::auth::TokenType;
use tokenward::error::AuthError;
use tokenward::session_cache::InMemorySessionCache;

use common::{build_engine, codec, InMemoryUserStore};

#[tokio::test]
async fn issue_refresh_revoke_walkthrough() {
    let users = InMemoryUserStore::new();
    let identity = users.insert_user("alice", "wonderland1");
    let sessions = InMemorySessionCache::new();
    let engine = build_engine(users, sessions.clone());

    let first = engine.issue("alice", "wonderland1").await.unwrap();
    let access = codec().decode(&first.access_token).unwrap();
    assert_eq!(access.token_type, TokenType::Access);
    assert_eq!(access.username, "alice");
    assert_eq!(access.sub, identity.id);

    let second = engine.refresh(&first.refresh_token).await.unwrap();
    assert_ne!(second.access_token, first.access_token);
    assert_ne!(second.refresh_token, first.refresh_token);
    assert!(matches!(
        engine.refresh(&first.refresh_token).await,
        Err(AuthError::TokenNotRecognized)
    ));

    engine.revoke(&second.refresh_token).await.unwrap();
    assert!(matches!(
        engine.refresh(&second.refresh_token).await,
        Err(AuthError::TokenNotRecognized)
    ));
    assert!(matches!(
        engine.revoke(&second.refresh_token).await,
        Err(AuthError::TokenNotFound)
    ));
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn concurrent_refreshes_have_exactly_one_winner() {
    let users = InMemoryUserStore::new();
    users.insert_user("alice", "wonderland1");
    let sessions = InMemorySessionCache::new();
    let engine = Arc::new(build_engine(users, sessions.clone()));

    let pair = engine.issue("alice", "wonderland1").await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let token = pair.refresh_token.clone();
            tokio::spawn(async move { engine.refresh(&token).await })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(e) => assert!(matches!(e, AuthError::TokenNotRecognized), "unexpected {:?}", e),
        }
    }

    assert_eq!(1, winners);
    assert_eq!(1, sessions.len());
}

#[tokio::test]
async fn sessions_are_independent_per_login() {
    let users = InMemoryUserStore::new();
    users.insert_user("alice", "wonderland1");
    let sessions = InMemorySessionCache::new();
    let engine = build_engine(users, sessions.clone());

    let laptop = engine.issue("alice", "wonderland1").await.unwrap();
    let phone = engine.issue("alice", "wonderland1").await.unwrap();
    assert_eq!(2, sessions.len());

    engine.revoke(&laptop.refresh_token).await.unwrap();

    assert!(engine.refresh(&phone.refresh_token).await.is_ok());
}
