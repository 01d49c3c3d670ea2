// Single-slot user notification shared by every component of a client.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    #[default]
    Error,
    Warning,
    Info,
    Success,
}

impl AlertKind {
    /// Class name the UI uses to style the alert banner.
    pub fn css_class(self) -> &'static str {
        match self {
            AlertKind::Error => "alert-error",
            AlertKind::Warning => "alert-warning",
            AlertKind::Info => "alert-info",
            AlertKind::Success => "alert-success",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertKind::Error => "error",
            AlertKind::Warning => "warning",
            AlertKind::Info => "info",
            AlertKind::Success => "success",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub text: String,
    pub kind: AlertKind,
}

/// Holds at most one alert. Setting overwrites, clearing empties the slot.
/// Clones share the same slot.
#[derive(Debug, Clone)]
pub struct AlertChannel {
    slot: Arc<watch::Sender<Option<Alert>>>,
}

impl Default for AlertChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertChannel {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { slot: Arc::new(tx) }
    }

    /// Replace the current alert. An empty `text` clears the slot instead.
    pub fn set(&self, text: impl Into<String>, kind: AlertKind) {
        let text = text.into();
        if text.is_empty() {
            self.clear();
            return;
        }
        self.slot.send_replace(Some(Alert { text, kind }));
    }

    pub fn set_error(&self, text: impl Into<String>) {
        self.set(text, AlertKind::Error);
    }

    pub fn clear(&self) {
        self.slot.send_if_modified(|alert| alert.take().is_some());
    }

    pub fn current(&self) -> Option<Alert> {
        self.slot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Alert>> {
        self.slot.subscribe()
    }
}
