use thiserror::Error;

use crate::session::{Failure, Operation};

#[derive(Debug, Error)]
pub enum SwitchError {
    #[error("{0} failed.")]
    Allocation(&'static str),

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("connection failure: {0}")]
    Connection(String),

    /// The server refused to create the request.
    #[error("{} failed: {reason}", .operation.name())]
    Rejected { operation: Operation, reason: String },

    /// The server ran the request and reported failure. Prints the bare reason.
    #[error("{reason}")]
    Completed { operation: Operation, reason: String },

    #[error("mainloop failed: {0}")]
    Mainloop(String),

    /// The transport has no sources left, so waiting would never return.
    #[error("event loop went idle before the connection terminated")]
    Idle,
}

impl SwitchError {
    pub fn from_failure(failure: Failure, reason: String) -> Self {
        match failure {
            Failure::Connection => SwitchError::Connection(reason),
            Failure::Rejected(operation) => SwitchError::Rejected { operation, reason },
            Failure::Completed(operation) => SwitchError::Completed { operation, reason },
        }
    }
}

pub type Result<T> = std::result::Result<T, SwitchError>;
