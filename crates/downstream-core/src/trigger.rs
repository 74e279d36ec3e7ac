//! Restart the latest build of a downstream repository.

use serde::{Deserialize, Serialize};

use crate::client::{BuildClient, ForkParams};
use crate::error::{PluginError, PluginResult};
use crate::obs;
use crate::repo::RepoRef;

/// How the downstream trigger ended. Both variants are successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerOutcome {
    /// A new build was started.
    Started { number: u64 },
    /// Another invocation already restarted build `forked_from`.
    AlreadyStarted { forked_from: u64 },
}

impl TriggerOutcome {
    /// Number of the build this run started, if it started one.
    pub fn started_number(&self) -> Option<u64> {
        match self {
            TriggerOutcome::Started { number } => Some(*number),
            TriggerOutcome::AlreadyStarted { .. } => None,
        }
    }
}

/// Forks the latest build of a repository/branch.
pub struct DownstreamTrigger<'a> {
    client: &'a dyn BuildClient,
}

impl<'a> DownstreamTrigger<'a> {
    pub fn new(client: &'a dyn BuildClient) -> Self {
        Self { client }
    }

    /// Fork the latest build of `repo` on `branch`.
    ///
    /// Losing the start race to a concurrent trigger is not an error; see
    /// [`TriggerOutcome::AlreadyStarted`].
    pub async fn fire(
        &self,
        repo: &RepoRef,
        branch: &str,
        params: &ForkParams,
    ) -> PluginResult<TriggerOutcome> {
        let latest = self
            .client
            .fetch_latest_build(repo, branch)
            .await
            .map_err(|source| PluginError::LatestBuild {
                repo: repo.to_string(),
                branch: branch.to_string(),
                source,
            })?;

        match self.client.start_forked_build(repo, latest.number, params).await {
            Ok(build) => {
                obs::emit_build_started(repo, build.number);
                Ok(TriggerOutcome::Started {
                    number: build.number,
                })
            }
            Err(err) if err.is_already_started() => {
                obs::emit_start_race_accepted(repo, latest.number);
                Ok(TriggerOutcome::AlreadyStarted {
                    forked_from: latest.number,
                })
            }
            Err(source) => Err(PluginError::Trigger {
                repo: repo.to_string(),
                build_number: latest.number,
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_started_number() {
        assert_eq!(TriggerOutcome::Started { number: 8 }.started_number(), Some(8));
        assert_eq!(
            TriggerOutcome::AlreadyStarted { forked_from: 7 }.started_number(),
            None
        );
    }

    #[test]
    fn test_outcome_serializes_snake_case() {
        let json = serde_json::to_value(TriggerOutcome::AlreadyStarted { forked_from: 7 }).unwrap();
        assert_eq!(json["already_started"]["forked_from"], 7);
    }
}
