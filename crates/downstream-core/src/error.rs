//! Error types for downstream-core

use thiserror::Error;

use crate::client::ClientError;

/// Errors that abort a plugin run.
///
/// Every variant is fatal: the orchestrator returns it verbatim and the
/// binary exits non-zero. The only recoverable trigger failure (a start race)
/// never becomes a `PluginError`, see [`crate::TriggerOutcome`].
#[derive(Error, Debug)]
pub enum PluginError {
    /// A required setting is missing or malformed
    #[error("{0}")]
    Config(String),

    /// A repository reference is not of the form `owner/name`
    #[error("invalid or missing repository: {input:?}")]
    RepoFormat { input: String },

    /// The build server client could not be constructed
    #[error("failed to create build server client: {0}")]
    Connect(#[source] ClientError),

    /// Fetching the upstream build snapshot failed
    #[error("failed to fetch build {build_number} of {repo}: {source}")]
    Fetch {
        repo: String,
        build_number: u64,
        #[source]
        source: ClientError,
    },

    /// A sibling job of the upstream build failed
    #[error("do not deploy, job failure: {pid}")]
    SiblingFailure { pid: u64 },

    /// Looking up the latest downstream build failed
    #[error("failed to find latest build of {repo} on branch {branch}: {source}")]
    LatestBuild {
        repo: String,
        branch: String,
        #[source]
        source: ClientError,
    },

    /// Starting the downstream build failed for a reason other than a start race
    #[error("failed to start build {build_number} of {repo}: {source}")]
    Trigger {
        repo: String,
        build_number: u64,
        #[source]
        source: ClientError,
    },
}

impl PluginError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        PluginError::Config(msg.into())
    }
}

/// Convenience result alias.
pub type PluginResult<T> = std::result::Result<T, PluginError>;
