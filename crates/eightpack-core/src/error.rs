// Error types for the transport and component layers.

use thiserror::Error;

/// The backend could not be asked, or did not answer with JSON.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to `{path}` failed: {source}")]
    Request {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("response from `{path}` is not valid JSON: {source}")]
    Decode {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("backend unreachable for `{0}`")]
    Unreachable(String),
}

/// Why an authenticated call produced no usable success value.
///
/// Components never return this from their public methods; it only travels
/// between the transport helpers and the component that swallows it.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("application error: {detail}")]
    Application { detail: String },

    #[error("unexpected payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl ClientError {
    /// True for errors the server reported explicitly (as opposed to
    /// connectivity or decoding trouble).
    pub fn is_application(&self) -> bool {
        matches!(self, ClientError::Application { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_error_displays_server_detail() {
        let err = ClientError::Application {
            detail: "token expired".into(),
        };
        assert_eq!(err.to_string(), "application error: token expired");
        assert!(err.is_application());
    }

    #[test]
    fn transport_error_is_not_application() {
        let err: ClientError = TransportError::Unreachable("users/token".into()).into();
        assert!(!err.is_application());
        assert_eq!(err.to_string(), "backend unreachable for `users/token`");
    }
}
