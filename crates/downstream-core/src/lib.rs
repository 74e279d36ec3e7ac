//! downstream-core - chain Drone builds
//!
//! Blocks until every sibling job of an upstream build succeeded, then
//! restarts the latest build of a downstream repository/branch:
//! - [`BuildWaiter`] polls the upstream build and decides each round
//! - [`DownstreamTrigger`] forks the latest downstream build, accepting a
//!   lost start race as success
//! - [`Plugin`] validates settings and runs the two in sequence

pub mod build;
pub mod client;
pub mod config;
pub mod drone;
pub mod error;
pub mod fakes;
pub mod obs;
pub mod plugin;
pub mod repo;
pub mod telemetry;
pub mod trigger;
pub mod waiter;

// Re-export key types
pub use build::{Build, BuildProcess, ProcessState};
pub use client::{BuildClient, ClientError, ClientResult, ForkParams};
pub use config::{current_job_pid, PluginConfig, Settings, DEFAULT_DOWNSTREAM_BRANCH};
pub use drone::DroneClient;
pub use error::{PluginError, PluginResult};
pub use plugin::Plugin;
pub use repo::RepoRef;
pub use telemetry::init_tracing;
pub use trigger::{DownstreamTrigger, TriggerOutcome};
pub use waiter::{BuildWaiter, RoundOutcome, Sleeper, TokioSleeper, WaitConfig, WAIT_STEP};
