// Explicitly constructed client state: one alert slot, one session and one
// draft per running client, wired together here instead of living in
// globals.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::alert::AlertChannel;
use crate::config::Config;
use crate::draft::Draft;
use crate::http::{HttpClient, ReqwestClient};
use crate::session::Session;
use crate::store::{SqliteTokenStore, TokenStore};

pub struct ClientContext {
    pub alert: AlertChannel,
    pub session: Session,
    pub draft: Draft,
}

impl ClientContext {
    /// Wire the components over the given transport and token store. The
    /// draft authenticates through (and reports errors to) the session.
    pub fn new(http: Arc<dyn HttpClient>, store: Arc<dyn TokenStore>, token_key: &str) -> Self {
        let alert = AlertChannel::new();
        let session = Session::new(Arc::clone(&http), store, alert.clone(), token_key);
        let draft = Draft::new(http, Arc::new(session.clone()));
        ClientContext {
            alert,
            session,
            draft,
        }
    }

    /// Build the production context: reqwest transport and SQLite token
    /// store, both from `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = ReqwestClient::from_config(config).context("failed to build HTTP client")?;
        let store_path = config.store_path();
        let store = SqliteTokenStore::open(&store_path)
            .with_context(|| format!("failed to open token store {}", store_path.display()))?;
        info!(
            "Client context ready (backend: {}, store: {})",
            config.backend.url,
            store_path.display()
        );
        Ok(Self::new(
            Arc::new(http),
            Arc::new(store),
            &config.storage.token_key,
        ))
    }

    /// Refresh the session identity before showing a new view.
    pub async fn before_navigation(&self) {
        self.session.load().await;
    }
}
