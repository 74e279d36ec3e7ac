//! Blocking wait on the sibling jobs of an upstream build.
//!
//! Each round fetches a fresh snapshot of the build and reduces it to a
//! [`RoundOutcome`]. Rounds repeat every [`WAIT_STEP`] until the siblings all
//! succeed or one of them fails. There is no timeout: an upstream build that
//! never settles keeps the step waiting.

use std::time::Duration;

use async_trait::async_trait;
use tracing::Instrument;

use crate::build::{Build, ProcessState};
use crate::client::BuildClient;
use crate::error::{PluginError, PluginResult};
use crate::obs;
use crate::repo::RepoRef;

/// Delay between two polls of the upstream build.
pub const WAIT_STEP: Duration = Duration::from_secs(5);

/// Source of delay between poll rounds.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// What to wait on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitConfig {
    pub repo: RepoRef,
    pub build_number: u64,
    /// Process id of the step running this plugin; `0` skips nothing.
    pub self_pid: u64,
}

/// Decision for one snapshot of the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Every sibling succeeded (or there are none).
    Complete,
    /// The first sibling that has not succeeded is still going.
    Incomplete { pid: u64, state: ProcessState },
    /// A sibling failed.
    Failed { pid: u64 },
}

/// Polls a build until its siblings settle.
pub struct BuildWaiter<'a> {
    client: &'a dyn BuildClient,
    sleeper: &'a dyn Sleeper,
    interval: Duration,
}

impl<'a> BuildWaiter<'a> {
    pub fn new(client: &'a dyn BuildClient, sleeper: &'a dyn Sleeper) -> Self {
        Self {
            client,
            sleeper,
            interval: WAIT_STEP,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Reduce a snapshot to a decision.
    ///
    /// Processes are scanned in order, skipping `self_pid`. The scan stops at
    /// the first sibling that is not `Success`: a `Failure` fails the round,
    /// anything else leaves it incomplete. A failure further down the list is
    /// therefore only seen once the earlier siblings have succeeded.
    pub fn evaluate(build: &Build, self_pid: u64) -> RoundOutcome {
        for process in &build.processes {
            if self_pid != 0 && process.pid == self_pid {
                continue;
            }
            match &process.state {
                ProcessState::Success => continue,
                ProcessState::Failure => return RoundOutcome::Failed { pid: process.pid },
                ProcessState::Pending | ProcessState::Running | ProcessState::Other(_) => {
                    return RoundOutcome::Incomplete {
                        pid: process.pid,
                        state: process.state.clone(),
                    }
                }
            }
        }
        RoundOutcome::Complete
    }

    /// Block until every sibling of `config.build_number` succeeded.
    ///
    /// Fetch errors are returned on the spot, without retry.
    pub async fn await_siblings(&self, config: &WaitConfig) -> PluginResult<()> {
        let span = obs::wait_span(&config.repo, config.build_number);
        self.poll_until_settled(config).instrument(span).await
    }

    async fn poll_until_settled(&self, config: &WaitConfig) -> PluginResult<()> {
        obs::emit_wait_started(&config.repo, config.build_number, config.self_pid);

        let mut round: u64 = 0;
        loop {
            round += 1;
            let build = self
                .client
                .fetch_build(&config.repo, config.build_number)
                .await
                .map_err(|source| PluginError::Fetch {
                    repo: config.repo.to_string(),
                    build_number: config.build_number,
                    source,
                })?;

            match Self::evaluate(&build, config.self_pid) {
                RoundOutcome::Complete => {
                    obs::emit_wait_completed(round);
                    return Ok(());
                }
                RoundOutcome::Failed { pid } => {
                    obs::emit_job_failed(pid);
                    return Err(PluginError::SiblingFailure { pid });
                }
                RoundOutcome::Incomplete { pid, state } => {
                    obs::emit_job_incomplete(pid, &state, round);
                }
            }

            self.sleeper.sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildProcess;

    fn build(processes: Vec<(u64, &str)>) -> Build {
        Build::new(
            42,
            processes
                .into_iter()
                .map(|(pid, state)| BuildProcess::new(pid, state))
                .collect(),
        )
    }

    #[test]
    fn test_all_siblings_succeeded() {
        let b = build(vec![(1, "success"), (2, "success"), (3, "running")]);
        assert_eq!(BuildWaiter::evaluate(&b, 3), RoundOutcome::Complete);
    }

    #[test]
    fn test_only_self_is_complete() {
        let b = build(vec![(1, "running")]);
        assert_eq!(BuildWaiter::evaluate(&b, 1), RoundOutcome::Complete);
    }

    #[test]
    fn test_empty_build_is_complete() {
        assert_eq!(BuildWaiter::evaluate(&build(vec![]), 1), RoundOutcome::Complete);
    }

    #[test]
    fn test_failure_is_reported_with_pid() {
        let b = build(vec![(1, "success"), (2, "failure")]);
        assert_eq!(BuildWaiter::evaluate(&b, 1), RoundOutcome::Failed { pid: 2 });
    }

    #[test]
    fn test_self_failure_is_ignored() {
        let b = build(vec![(1, "failure"), (2, "success")]);
        assert_eq!(BuildWaiter::evaluate(&b, 1), RoundOutcome::Complete);
    }

    #[test]
    fn test_first_incomplete_sibling_wins_the_round() {
        let b = build(vec![(1, "pending"), (2, "failure")]);
        assert_eq!(
            BuildWaiter::evaluate(&b, 3),
            RoundOutcome::Incomplete {
                pid: 1,
                state: ProcessState::Pending
            }
        );
    }

    #[test]
    fn test_unknown_state_is_incomplete() {
        let b = build(vec![(1, "success"), (2, "killed")]);
        assert_eq!(
            BuildWaiter::evaluate(&b, 0),
            RoundOutcome::Incomplete {
                pid: 2,
                state: ProcessState::Other("killed".to_string())
            }
        );
    }

    #[test]
    fn test_zero_self_pid_skips_nothing() {
        let b = build(vec![(1, "running")]);
        assert!(matches!(
            BuildWaiter::evaluate(&b, 0),
            RoundOutcome::Incomplete { pid: 1, .. }
        ));
    }
}
