use thiserror::Error;

use crate::remote::Status;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    /// The management service answered with a status that is neither success nor a
    /// benign end-of-data marker.
    #[error("{operation} failed with status {code}")]
    RemoteCall {
        operation: &'static str,
        code: Status,
    },

    /// The call succeeded but a required element was absent.
    #[error("{0} not found")]
    NotFound(String),

    /// A record did not carry the element kind it was requested as. Not retryable.
    #[error("Malformed record: expected {expected}, found {found}")]
    MalformedRecord {
        expected: &'static str,
        found: &'static str,
    },
}

impl ScopeError {
    pub(crate) fn remote(operation: &'static str, code: Status) -> Self {
        ScopeError::RemoteCall { operation, code }
    }
}

pub type Result<T> = std::result::Result<T, ScopeError>;
