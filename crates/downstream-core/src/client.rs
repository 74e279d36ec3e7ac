//! Client interface to the remote build server.
//!
//! The waiter and the trigger only see the build server through
//! [`BuildClient`]. [`crate::DroneClient`] is the HTTP implementation;
//! [`crate::fakes::ScriptedClient`] is the in-memory one used by tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::build::Build;
use crate::repo::RepoRef;

/// Extra parameters passed along when forking a build.
pub type ForkParams = BTreeMap<String, String>;

/// Errors returned by a [`BuildClient`].
///
/// `AlreadyStarted` is a classification, not a message: implementations map
/// whatever their server says for "build is not in a startable state" onto it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The build cannot be restarted because it is already started
    #[error("build already started")]
    AlreadyStarted,

    /// Repository, branch or build does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The access token was rejected
    #[error("access token rejected by build server")]
    Unauthorized,

    /// Any other non-success response
    #[error("client error {status}: {message}")]
    Status { status: u16, message: String },

    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response body could not be decoded
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn is_already_started(&self) -> bool {
        matches!(self, ClientError::AlreadyStarted)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

/// Result type for client operations
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// The three build-server operations the plugin needs.
#[async_trait]
pub trait BuildClient: Send + Sync {
    /// Fetch build `number` of `repo` with its processes.
    async fn fetch_build(&self, repo: &RepoRef, number: u64) -> ClientResult<Build>;

    /// Fetch the most recent build of `repo` on `branch`.
    async fn fetch_latest_build(&self, repo: &RepoRef, branch: &str) -> ClientResult<Build>;

    /// Start a new build forked from build `number`.
    ///
    /// Must return [`ClientError::AlreadyStarted`] when the server refuses
    /// because the build is not in a startable state.
    async fn start_forked_build(
        &self,
        repo: &RepoRef,
        number: u64,
        params: &ForkParams,
    ) -> ClientResult<Build>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_already_started_is_classified_as_race() {
        assert!(ClientError::AlreadyStarted.is_already_started());
        assert!(!ClientError::Unauthorized.is_already_started());
        assert!(!ClientError::Status {
            status: 500,
            message: "boom".to_string()
        }
        .is_already_started());
    }

    #[test]
    fn test_status_error_display() {
        let err = ClientError::Status {
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "client error 502: bad gateway");
    }
}
