//! In-memory fakes for the client and sleeper traits (testing only)
//!
//! Provides `ScriptedClient` and `RecordingSleeper`, which let tests drive
//! many poll rounds without a network or real delays.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::build::Build;
use crate::client::{BuildClient, ClientError, ClientResult, ForkParams};
use crate::repo::RepoRef;
use crate::waiter::Sleeper;

// ---------------------------------------------------------------------------
// ScriptedClient
// ---------------------------------------------------------------------------

/// Build client that replays scripted responses and records every request.
///
/// `fetch_build` consumes the scripted snapshots in order; the last one is
/// repeated for any further poll. Latest-build and fork responses are fixed.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    builds: Mutex<VecDeque<ClientResult<Build>>>,
    latest: Mutex<Option<ClientResult<Build>>>,
    fork: Mutex<Option<ClientResult<Build>>>,
    fetches: Mutex<Vec<(RepoRef, u64)>>,
    latest_calls: Mutex<Vec<(RepoRef, String)>>,
    forks: Mutex<Vec<(RepoRef, u64, ForkParams)>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a snapshot returned by the next `fetch_build`.
    pub fn with_build(self, build: Build) -> Self {
        self.builds.lock().unwrap().push_back(Ok(build));
        self
    }

    /// Queue an error returned by the next `fetch_build`.
    pub fn with_fetch_error(self, err: ClientError) -> Self {
        self.builds.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn with_latest(self, build: Build) -> Self {
        *self.latest.lock().unwrap() = Some(Ok(build));
        self
    }

    pub fn with_latest_error(self, err: ClientError) -> Self {
        *self.latest.lock().unwrap() = Some(Err(err));
        self
    }

    pub fn with_fork_result(self, result: ClientResult<Build>) -> Self {
        *self.fork.lock().unwrap() = Some(result);
        self
    }

    pub fn fetch_requests(&self) -> Vec<(RepoRef, u64)> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn latest_requests(&self) -> Vec<(RepoRef, String)> {
        self.latest_calls.lock().unwrap().clone()
    }

    pub fn fork_requests(&self) -> Vec<(RepoRef, u64, ForkParams)> {
        self.forks.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildClient for ScriptedClient {
    async fn fetch_build(&self, repo: &RepoRef, number: u64) -> ClientResult<Build> {
        self.fetches.lock().unwrap().push((repo.clone(), number));
        let mut builds = self.builds.lock().unwrap();
        let next = if builds.len() > 1 {
            builds.pop_front()
        } else {
            builds.front().cloned()
        };
        next.unwrap_or_else(|| Err(ClientError::NotFound(format!("{repo} build {number}"))))
    }

    async fn fetch_latest_build(&self, repo: &RepoRef, branch: &str) -> ClientResult<Build> {
        self.latest_calls
            .lock()
            .unwrap()
            .push((repo.clone(), branch.to_string()));
        self.latest
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(ClientError::NotFound(format!("{repo} branch {branch}"))))
    }

    async fn start_forked_build(
        &self,
        repo: &RepoRef,
        number: u64,
        params: &ForkParams,
    ) -> ClientResult<Build> {
        self.forks
            .lock()
            .unwrap()
            .push((repo.clone(), number, params.clone()));
        self.fork.lock().unwrap().clone().unwrap_or_else(|| {
            Err(ClientError::Status {
                status: 500,
                message: "no fork response scripted".to_string(),
            })
        })
    }
}

// ---------------------------------------------------------------------------
// RecordingSleeper
// ---------------------------------------------------------------------------

/// Sleeper that returns immediately and remembers each requested delay.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.sleeps.lock().unwrap().len()
    }

    pub fn durations(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}
