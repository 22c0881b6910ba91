use thiserror::Error;

// Unified error type for krongrid

#[derive(Error, Debug)]
pub enum KError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("numerical breakdown: {0}")]
    Breakdown(String),
}
