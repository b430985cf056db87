//! Token caching and refresh behavior of `Account`

use async_trait::async_trait;
use gdmdrive::{Account, DriveError, RefreshTokenSource, Token, TokenProvider, TokenSource};
use mockito::{Matcher, Server};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

/// Issues `token-1`, `token-2`... and counts requests
#[derive(Default)]
struct CountingSource {
    requests: AtomicUsize,
}

#[async_trait]
impl TokenSource for CountingSource {
    async fn request_token(&self, scope: &str) -> gdmdrive::Result<Token> {
        let n = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Token::new(format!("token-{n}"), "Bearer", 3600, scope))
    }
}

/// Issues `first` once, then refuses every request
#[derive(Default)]
struct OneShotSource {
    requests: AtomicUsize,
}

#[async_trait]
impl TokenSource for OneShotSource {
    async fn request_token(&self, scope: &str) -> gdmdrive::Result<Token> {
        if self.requests.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(Token::new("first", "Bearer", 3600, scope))
        } else {
            Err(DriveError::TokenDenied("invalid_grant".into()))
        }
    }
}

#[tokio::test]
async fn test_token_is_cached() {
    let source = Arc::new(CountingSource::default());
    let account = Account::new(source.clone());

    let first = account.acquire_token(SCOPE).await.unwrap();
    let second = account.acquire_token(SCOPE).await.unwrap();

    assert_eq!(first.access_token, "token-1");
    assert_eq!(second.access_token, "token-1");
    assert_eq!(source.requests.load(Ordering::SeqCst), 1);
    assert!(account.is_refreshing());
}

#[tokio::test]
async fn test_concurrent_acquisitions_share_one_request() {
    let source = Arc::new(CountingSource::default());
    let account = Arc::new(Account::new(source.clone()));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let account = account.clone();
            tokio::spawn(async move { account.acquire_token(SCOPE).await.unwrap() })
        })
        .collect();
    for task in tasks {
        assert_eq!(task.await.unwrap().access_token, "token-1");
    }

    assert_eq!(source.requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_periodic_refresh_replaces_token() {
    let source = Arc::new(CountingSource::default());
    let account = Account::with_refresh_interval(source.clone(), Duration::from_millis(50));

    assert_eq!(account.acquire_token(SCOPE).await.unwrap().access_token, "token-1");
    tokio::time::sleep(Duration::from_millis(180)).await;

    assert!(source.requests.load(Ordering::SeqCst) >= 3);
    let current = account.current_token().await.unwrap();
    assert_ne!(current.access_token, "token-1");
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_token() {
    let source = Arc::new(OneShotSource::default());
    let account = Account::with_refresh_interval(source.clone(), Duration::from_millis(30));

    assert_eq!(account.acquire_token(SCOPE).await.unwrap().access_token, "first");
    tokio::time::sleep(Duration::from_millis(110)).await;

    assert!(source.requests.load(Ordering::SeqCst) >= 3);
    assert!(account.is_refreshing());
    let current = account.current_token().await.unwrap();
    assert_eq!(current.access_token, "first");
    assert_eq!(account.acquire_token(SCOPE).await.unwrap().access_token, "first");
}

#[tokio::test]
async fn test_release_stops_refresh() {
    let source = Arc::new(CountingSource::default());
    let account = Account::with_refresh_interval(source.clone(), Duration::from_millis(30));

    account.acquire_token(SCOPE).await.unwrap();
    assert!(account.release_token().await);
    assert!(!account.is_refreshing());
    assert!(account.current_token().await.is_none());

    let after_release = source.requests.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(source.requests.load(Ordering::SeqCst), after_release);

    // A second release has nothing to drop
    assert!(!account.release_token().await);
}

#[tokio::test]
async fn test_account_as_token_provider() {
    let account: Arc<dyn TokenProvider> =
        Arc::new(Account::new(Arc::new(CountingSource::default())));
    let token = account.acquire_token(SCOPE).await.unwrap();
    assert_eq!(token.scope, SCOPE);
}

#[tokio::test]
async fn test_refresh_token_grant() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", "/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            Matcher::UrlEncoded("client_id".into(), "client".into()),
            Matcher::UrlEncoded("refresh_token".into(), "1//refresh".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"access_token":"ya29.fresh","expires_in":3599,"token_type":"Bearer","scope":"https://www.googleapis.com/auth/drive.readonly"}"#,
        )
        .expect(1)
        .create_async()
        .await;

    let source = RefreshTokenSource::new("client", "secret", "1//refresh")
        .unwrap()
        .with_endpoint(format!("{}/token", server.url()));
    let account = Account::new(Arc::new(source));

    let token = account.acquire_token(SCOPE).await.unwrap();
    assert_eq!(token.authorization(), "Bearer ya29.fresh");
    account.acquire_token(SCOPE).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_revoked_refresh_token() {
    let mut server = Server::new_async().await;

    server
        .mock("POST", "/token")
        .with_status(400)
        .with_body(r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#)
        .create_async()
        .await;

    let source = RefreshTokenSource::new("client", "secret", "1//revoked")
        .unwrap()
        .with_endpoint(format!("{}/token", server.url()));
    let account = Account::new(Arc::new(source));

    let err = account.acquire_token(SCOPE).await.unwrap_err();
    match &err {
        DriveError::TokenDenied(reason) => assert!(reason.starts_with("invalid_grant")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_auth_error());
    assert!(!account.is_refreshing());
}
