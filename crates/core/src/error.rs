use thiserror::Error;

#[derive(Debug, Error)]
pub enum VmwatchError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("auth error: {0}")]
    Auth(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("arm request failed: {status} {body}")]
    ArmRequest { status: u16, body: String },

    #[error("unexpected response shape: {0}")]
    Schema(String),

    #[error("pagination limit exceeded after {pages} pages")]
    PaginationLimit { pages: usize },
}

pub type Result<T> = std::result::Result<T, VmwatchError>;
