use thiserror::Error;

/// Error kinds surfaced by the provider / orchestration core.
///
/// `Parse` is recovered inside the adapters (a malformed stream event is
/// logged and skipped); the other three cross module boundaries and end
/// up either in a response slot's `error` field or as a napi error.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        CoreError::Transport(e.to_string())
    }
}

impl From<CoreError> for napi::Error {
    fn from(e: CoreError) -> Self {
        napi::Error::from_reason(e.to_string())
    }
}
