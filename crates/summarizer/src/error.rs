use thiserror::Error;

#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Empty completion")]
    EmptyCompletion,
}

pub type SummaryResult<T> = Result<T, SummaryError>;
