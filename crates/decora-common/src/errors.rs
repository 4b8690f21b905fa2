#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("api error: {0}")]
    Api(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,

    #[error("timeout")]
    Timeout,
}

#[derive(Debug, thiserror::Error)]
pub enum DecoraError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
