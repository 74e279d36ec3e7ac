//! Build snapshots as reported by the build server.
//!
//! Snapshots are fetched fresh on every poll and dropped after the round's
//! decision, so nothing here is cached or mutated.

use std::fmt;

use serde::{Deserialize, Serialize};

/// State of a single build process.
///
/// The server reports states as lowercase strings. Anything outside the four
/// states the plugin acts on is kept verbatim in `Other` and counts as
/// "not yet done".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProcessState {
    Pending,
    Running,
    Success,
    Failure,
    Other(String),
}

impl ProcessState {
    pub fn as_str(&self) -> &str {
        match self {
            ProcessState::Pending => "pending",
            ProcessState::Running => "running",
            ProcessState::Success => "success",
            ProcessState::Failure => "failure",
            ProcessState::Other(state) => state,
        }
    }
}

impl From<String> for ProcessState {
    fn from(state: String) -> Self {
        match state.as_str() {
            "pending" => ProcessState::Pending,
            "running" => ProcessState::Running,
            "success" => ProcessState::Success,
            "failure" => ProcessState::Failure,
            _ => ProcessState::Other(state),
        }
    }
}

impl From<&str> for ProcessState {
    fn from(state: &str) -> Self {
        ProcessState::from(state.to_string())
    }
}

impl From<ProcessState> for String {
    fn from(state: ProcessState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One job of a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildProcess {
    pub pid: u64,
    pub state: ProcessState,
    #[serde(default)]
    pub name: String,
}

impl BuildProcess {
    pub fn new(pid: u64, state: impl Into<ProcessState>) -> Self {
        Self {
            pid,
            state: state.into(),
            name: String::new(),
        }
    }
}

/// A build and its processes, in server order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub number: u64,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "procs", default)]
    pub processes: Vec<BuildProcess>,
}

impl Build {
    pub fn new(number: u64, processes: Vec<BuildProcess>) -> Self {
        Self {
            number,
            status: String::new(),
            processes,
        }
    }
}
