//! Google account session: token cache and periodic refresh

use crate::auth::{RefreshTokenSource, StaticTokenSource, TokenSource};
use crate::config_ext::DriveConfigExt;
use crate::error::{DriveError, Result};
use crate::models::Token;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Google refreshes are scheduled before the one hour token lifetime ends
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(50 * 60);

struct AccountInner {
    source: Arc<dyn TokenSource>,
    token: RwLock<Option<Token>>,
    refresh_interval: Duration,
}

/// Owner of the access token used for Drive requests
///
/// - [`Account::acquire_token`] returns the cached token while it is valid,
///   otherwise asks the [`TokenSource`] for a new one.
/// - The first successful acquisition starts a background task refreshing
///   the token every `refresh_interval`. Refresh failures are logged and the
///   previous token is kept.
/// - [`Account::release_token`] stops the task and forgets the token.
///
/// Must be used inside a tokio runtime.
pub struct Account {
    inner: Arc<AccountInner>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl Account {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self::with_refresh_interval(source, DEFAULT_REFRESH_INTERVAL)
    }

    pub fn with_refresh_interval(source: Arc<dyn TokenSource>, refresh_interval: Duration) -> Self {
        Self {
            inner: Arc::new(AccountInner {
                source,
                token: RwLock::new(None),
                refresh_interval,
            }),
            refresh_task: Mutex::new(None),
        }
    }

    /// Builds the account from the `accounts.google` configuration
    ///
    /// A refresh token (with client id and secret) takes precedence over a
    /// pre-issued access token.
    pub fn from_config(config: &gdmconfig::Config) -> Result<Self> {
        let interval = config.get_token_refresh_interval();

        if let (Some(client_id), Some(client_secret), Some(refresh_token)) = (
            config.get_google_client_id(),
            config.get_google_client_secret()?,
            config.get_google_refresh_token()?,
        ) {
            info!("Using OAuth refresh token credentials");
            let source = RefreshTokenSource::new(client_id, client_secret, refresh_token)?
                .with_endpoint(config.get_google_token_endpoint());
            return Ok(Self::with_refresh_interval(Arc::new(source), interval));
        }

        if let Some(access_token) = config.get_google_access_token()? {
            info!("Using pre-issued access token");
            let source = StaticTokenSource::bearer(access_token);
            return Ok(Self::with_refresh_interval(Arc::new(source), interval));
        }

        Err(DriveError::MissingCredentials(
            "configure accounts.google.refresh_token (with client_id/client_secret) or accounts.google.access_token".into(),
        ))
    }

    /// Returns a valid token for `scope`, requesting one if needed
    ///
    /// A cached, unexpired token is returned whatever scope it was issued
    /// for.
    pub async fn acquire_token(&self, scope: &str) -> Result<Token> {
        if let Some(token) = self.current_token().await {
            return Ok(token);
        }

        let mut guard = self.inner.token.write().await;
        // Another caller may have refreshed while we waited for the lock
        if let Some(token) = guard.as_ref().filter(|t| !t.is_expired()) {
            return Ok(token.clone());
        }

        let token = self.inner.source.request_token(scope).await?;
        info!("Acquired access token");
        *guard = Some(token.clone());
        drop(guard);

        self.ensure_refresh_task(scope);
        Ok(token)
    }

    /// Cached token, if any and unexpired
    pub async fn current_token(&self) -> Option<Token> {
        self.inner
            .token
            .read()
            .await
            .as_ref()
            .filter(|t| !t.is_expired())
            .cloned()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh_task
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Ends the session: stops the refresh task and drops the token
    ///
    /// Returns `false` if there was no token.
    pub async fn release_token(&self) -> bool {
        if let Some(task) = self.refresh_task.lock().unwrap().take() {
            task.abort();
        }
        let had_token = self.inner.token.write().await.take().is_some();
        if had_token {
            info!("Released access token");
        }
        had_token
    }

    fn ensure_refresh_task(&self, scope: &str) {
        let mut slot = self.refresh_task.lock().unwrap();
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }

        let weak = Arc::downgrade(&self.inner);
        let scope = scope.to_string();
        let period = self.inner.refresh_interval;
        debug!(period_secs = period.as_secs(), "Starting token refresh task");
        *slot = Some(tokio::spawn(refresh_loop(weak, scope, period)));
    }
}

async fn refresh_loop(inner: Weak<AccountInner>, scope: String, period: Duration) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    loop {
        interval.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };

        match inner.source.request_token(&scope).await {
            Ok(token) => {
                debug!("Refreshed access token");
                *inner.token.write().await = Some(token);
            }
            Err(e) => warn!("Failed to refresh access token: {}", e),
        }
    }
}

impl Drop for Account {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.refresh_task.lock() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
    }
}
