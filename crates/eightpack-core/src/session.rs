// Session state: the access token, the identity it resolves to, and the
// login/register/refresh flows that move between them.
//
// Every public method is infallible from the caller's point of view.
// Application errors log the user out and raise an alert; transport failures
// are logged and otherwise ignored so the caller can simply try again later.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::alert::AlertChannel;
use crate::auth::{decode, screen_response, AuthProvider};
use crate::error::ClientError;
use crate::http::{HttpClient, Method};
use crate::protocol::{paths, Credentials, TokenResponse, UserIdentity};
use crate::store::TokenStore;

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Where the session sits in the login lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    /// No token.
    Anonymous,
    /// Token present, identity not resolved yet.
    Authenticating,
    /// Token and identity both present.
    Authenticated,
}

/// Observable session snapshot. An empty `token` means "no token".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub token: String,
    pub user: Option<UserIdentity>,
}

impl SessionState {
    pub fn logged_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn phase(&self) -> AuthPhase {
        match (&self.user, self.token.is_empty()) {
            (Some(_), _) => AuthPhase::Authenticated,
            (None, false) => AuthPhase::Authenticating,
            (None, true) => AuthPhase::Anonymous,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Handle to the session of one client. Clones share state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    http: Arc<dyn HttpClient>,
    store: Arc<dyn TokenStore>,
    token_key: String,
    alert: AlertChannel,
    state: watch::Sender<SessionState>,
}

impl Session {
    /// Create a session, seeding the token from `store[token_key]`.
    pub fn new(
        http: Arc<dyn HttpClient>,
        store: Arc<dyn TokenStore>,
        alert: AlertChannel,
        token_key: &str,
    ) -> Self {
        let token = match store.get(token_key) {
            Ok(token) => token.unwrap_or_default(),
            Err(e) => {
                warn!("Failed to read persisted token, starting logged out: {:#}", e);
                String::new()
            }
        };
        debug!(has_token = !token.is_empty(), "session created");

        let (state, _rx) = watch::channel(SessionState { token, user: None });
        Session {
            inner: Arc::new(SessionInner {
                http,
                store,
                token_key: token_key.to_string(),
                alert,
                state,
            }),
        }
    }

    // -- accessors ----------------------------------------------------------

    pub fn token(&self) -> String {
        self.inner.state.borrow().token.clone()
    }

    pub fn user(&self) -> Option<UserIdentity> {
        self.inner.state.borrow().user.clone()
    }

    pub fn logged_in(&self) -> bool {
        self.inner.state.borrow().logged_in()
    }

    pub fn user_login(&self) -> Option<String> {
        self.inner.state.borrow().user.as_ref().map(|u| u.login.clone())
    }

    pub fn phase(&self) -> AuthPhase {
        self.inner.state.borrow().phase()
    }

    pub fn snapshot(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn alert(&self) -> &AlertChannel {
        &self.inner.alert
    }

    // -- flows --------------------------------------------------------------

    /// Resolve the identity behind the current token.
    ///
    /// No-op without a token or when an identity is already known.
    pub async fn load(&self) {
        let token = {
            let state = self.inner.state.borrow();
            if state.token.is_empty() || state.user.is_some() {
                return;
            }
            state.token.clone()
        };

        let response = match self
            .inner
            .http
            .request(
                Method::Post,
                paths::RESOLVE_IDENTITY,
                Some(&json!({})),
                Some(&token),
            )
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Identity refresh failed, keeping current state: {}", e);
                return;
            }
        };

        match self.process_response(response.body).and_then(decode::<UserIdentity>) {
            Ok(user) => {
                info!("Session authenticated as {}", user.login);
                self.inner.state.send_modify(|s| s.user = Some(user));
            }
            Err(e) if e.is_application() => {}
            Err(e) => warn!("Identity refresh answered unexpectedly: {}", e),
        }
    }

    /// Log in with existing credentials. Empty arguments are ignored.
    pub async fn try_login(&self, login: &str, password: &str) {
        self.exchange_credentials(paths::LOGIN, login, password).await;
    }

    /// Create an account and log into it. Empty arguments are ignored.
    pub async fn register(&self, login: &str, password: &str) {
        self.exchange_credentials(paths::REGISTER, login, password).await;
    }

    /// Drop identity and token. Never fails and raises no alert.
    pub fn logout(&self) {
        self.drop_credentials();
        info!("Logged out");
    }

    /// Apply the shared error contract to a response body: application
    /// errors clear the token and raise an alert, anything else clears the
    /// alert and is returned unchanged.
    pub fn process_response(&self, body: Value) -> Result<Value, ClientError> {
        screen_response(self, body)
    }

    async fn exchange_credentials(&self, path: &str, login: &str, password: &str) {
        if login.is_empty() || password.is_empty() {
            debug!(path, "ignoring credential exchange with empty input");
            return;
        }

        let body = match serde_json::to_value(Credentials { login, password }) {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to encode credentials: {}", e);
                return;
            }
        };

        let response = match self
            .inner
            .http
            .request(Method::Post, path, Some(&body), None)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Credential exchange with {} failed: {}", path, e);
                return;
            }
        };

        let Ok(body) = self.process_response(response.body) else {
            return;
        };

        let token = match decode::<TokenResponse>(body) {
            Ok(response) => response.token.unwrap_or_default(),
            Err(e) => {
                warn!("Credential exchange with {} returned no token: {}", path, e);
                String::new()
            }
        };
        info!("Credentials accepted by {}", path);
        self.set_token(&token);

        self.load().await;
    }

    /// Clear identity and token in one update and persist the empty token.
    fn drop_credentials(&self) {
        self.inner.state.send_if_modified(|s| {
            let changed = s.user.is_some() || !s.token.is_empty();
            s.user = None;
            s.token.clear();
            changed
        });
        self.persist_token("");
    }

    fn set_token(&self, token: &str) {
        self.inner.state.send_if_modified(|s| {
            if s.token == token {
                return false;
            }
            s.token = token.to_string();
            true
        });
        self.persist_token(token);
    }

    fn persist_token(&self, token: &str) {
        if let Err(e) = self.inner.store.set(&self.inner.token_key, token) {
            warn!("Failed to persist access token: {:#}", e);
        }
    }
}

impl AuthProvider for Session {
    fn current_token(&self) -> String {
        self.token()
    }

    fn on_application_error(&self, detail: &str) {
        warn!("Server rejected request, logging out: {}", detail);
        self.drop_credentials();
        self.inner.alert.set_error(detail);
    }

    fn on_success(&self) {
        self.inner.alert.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
