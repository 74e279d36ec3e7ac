//! Structured log events for the wait and trigger stages.
//!
//! This module provides:
//! - A wait-scoped tracing span via `wait_span`
//! - Emission functions for poll rounds, wait completion and trigger outcomes
//!
//! Events are emitted at `info!` level unless noted (filter with `RUST_LOG`).
//! For JSON output pass `--json` to the binary.

use tracing::info;

use crate::build::ProcessState;
use crate::repo::RepoRef;

/// Span tagged with the upstream build being waited on.
///
/// # Example
///
/// ```ignore
/// waiter.await_siblings(&config).instrument(wait_span(&repo, 42)).await
/// // every event inside carries repo = "acme/widgets", build = 42
/// ```
pub fn wait_span(repo: &RepoRef, build_number: u64) -> tracing::Span {
    tracing::info_span!("downstream.wait", repo = %repo, build = build_number)
}

/// Emit event: waiting started.
pub fn emit_wait_started(repo: &RepoRef, build_number: u64, self_pid: u64) {
    info!(
        event = "wait.started",
        repo = %repo,
        build = build_number,
        self_pid = self_pid,
    );
}

/// Emit event: a round found a sibling that has not finished yet.
///
/// # Example
///
/// ```ignore
/// emit_job_incomplete(3, &ProcessState::Running, 1);
/// // logs: event=wait.job_incomplete pid=3 state=running round=1
/// ```
pub fn emit_job_incomplete(pid: u64, state: &ProcessState, round: u64) {
    info!(
        event = "wait.job_incomplete",
        pid = pid,
        state = %state,
        round = round,
        "job {} is not completed, state: {}",
        pid,
        state
    );
}

/// Emit event: every sibling succeeded.
pub fn emit_wait_completed(rounds: u64) {
    info!(event = "wait.completed", rounds = rounds);
}

/// Emit event: a sibling failed (warning level).
pub fn emit_job_failed(pid: u64) {
    tracing::warn!(event = "wait.job_failed", pid = pid);
}

/// Emit event: downstream build started.
pub fn emit_build_started(repo: &RepoRef, number: u64) {
    info!(
        event = "trigger.started",
        repo = %repo,
        number = number,
        "starting build: {} for {}",
        number,
        repo
    );
}

/// Emit event: downstream build was already started by a concurrent trigger.
pub fn emit_start_race_accepted(repo: &RepoRef, forked_from: u64) {
    info!(
        event = "trigger.already_started",
        repo = %repo,
        forked_from = forked_from,
        "build {} of {} already started, nothing to do",
        forked_from,
        repo
    );
}

/// Emit event: branch was not configured, default substituted.
pub fn emit_default_branch(branch: &str) {
    info!(event = "config.default_branch", branch = %branch, "using default downstream branch: {:?}", branch);
}
