// Scripted transport double shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::auth::application_error_detail;
use crate::error::TransportError;
use crate::http::{HttpClient, HttpResponse, Method};

enum Reply {
    Json(Value),
    Fail,
    Gate(oneshot::Receiver<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub token: Option<String>,
}

/// Answers each path from a queue of scripted replies. Unscripted paths fail
/// as if the backend were down.
#[derive(Default)]
pub(crate) struct ScriptedHttp {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedHttp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, path: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn reply(&self, path: &str, body: Value) {
        self.push(path, Reply::Json(body));
    }

    pub fn fail(&self, path: &str) {
        self.push(path, Reply::Fail);
    }

    /// The next request to `path` waits until the returned sender fires.
    /// Dropping the sender turns the request into a transport failure.
    pub fn gate(&self, path: &str) -> oneshot::Sender<Value> {
        let (tx, rx) = oneshot::channel();
        self.push(path, Reply::Gate(rx));
        tx
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.path == path)
            .count()
    }
}

fn respond(body: Value) -> HttpResponse {
    let status = if application_error_detail(&body).is_some() {
        401
    } else {
        200
    };
    HttpResponse { status, body }
}

#[async_trait]
impl HttpClient for ScriptedHttp {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<HttpResponse, TransportError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            path: path.to_string(),
            body: body.cloned(),
            token: token.map(str::to_string),
        });

        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(path)
            .and_then(VecDeque::pop_front);

        match reply {
            Some(Reply::Json(body)) => Ok(respond(body)),
            Some(Reply::Gate(rx)) => rx
                .await
                .map(respond)
                .map_err(|_| TransportError::Unreachable(path.to_string())),
            Some(Reply::Fail) | None => Err(TransportError::Unreachable(path.to_string())),
        }
    }
}
