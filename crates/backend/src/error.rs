use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("{service} returned status {status}: {body}")]
    Status {
        service: String,
        status: u16,
        body: String,
    },

    #[error("{0} timed out")]
    Timeout(String),

    #[error("Conversion process failed: {0}")]
    Process(String),

    #[error("HTTP request to {service} failed: {source}")]
    Request {
        service: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to encode request data: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackendError {
    pub(crate) fn request(service: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            BackendError::Timeout(service.to_string())
        } else {
            BackendError::Request {
                service: service.to_string(),
                source,
            }
        }
    }
}
