/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Client error types.

use ironkit_core::error::SessionError;
use thiserror::Error;

/// Errors returned by [`Client`](crate::Client) operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The session closed before the operation completed.
    #[error("session closed")]
    Closed,

    /// The session rejected the operation.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The message body could not be serialized.
    #[error("body serialization failed: {0}")]
    Body(String),
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Body(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_display() {
        assert_eq!(ClientError::Closed.to_string(), "session closed");

        let err: ClientError = SessionError::InvalidRoute(String::new()).into();
        assert_eq!(err.to_string(), "invalid route: \"\"");
    }
}
