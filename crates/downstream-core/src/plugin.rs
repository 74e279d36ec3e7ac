//! Wait-then-trigger orchestration.
//!
//! Validates settings, connects to the build server, waits for the upstream
//! siblings and finally triggers the downstream build. The first error from
//! any stage ends the run.

use tracing::info;

use crate::client::{BuildClient, ClientResult};
use crate::config::{PluginConfig, Settings};
use crate::drone::DroneClient;
use crate::error::{PluginError, PluginResult};
use crate::trigger::{DownstreamTrigger, TriggerOutcome};
use crate::waiter::{BuildWaiter, Sleeper, TokioSleeper};

/// Entry points for a plugin run.
pub struct Plugin;

impl Plugin {
    /// Run against the Drone server named in `settings`.
    ///
    /// `self_pid` is the job id of the step running the plugin (see
    /// [`crate::config::current_job_pid`]).
    pub async fn exec(settings: Settings, self_pid: u64) -> PluginResult<TriggerOutcome> {
        Self::exec_with(
            settings,
            self_pid,
            |config| DroneClient::new(&config.server_url, &config.token),
            &TokioSleeper,
        )
        .await
    }

    /// Like [`Plugin::exec`] with an injected client factory and sleeper.
    ///
    /// `connect` is only called once `settings` validated.
    pub async fn exec_with<C, F>(
        settings: Settings,
        self_pid: u64,
        connect: F,
        sleeper: &dyn Sleeper,
    ) -> PluginResult<TriggerOutcome>
    where
        C: BuildClient,
        F: FnOnce(&PluginConfig) -> ClientResult<C>,
    {
        let config = settings.validate()?;
        let client = connect(&config).map_err(PluginError::Connect)?;
        Self::run(&config, self_pid, &client, sleeper).await
    }

    /// Wait on the upstream build, then trigger the downstream one.
    pub async fn run(
        config: &PluginConfig,
        self_pid: u64,
        client: &dyn BuildClient,
        sleeper: &dyn Sleeper,
    ) -> PluginResult<TriggerOutcome> {
        info!(
            wait_repo = %config.wait_repo,
            build = config.build_number,
            downstream_repo = %config.downstream_repo,
            branch = %config.downstream_branch,
            "waiting for sibling jobs before triggering downstream"
        );

        BuildWaiter::new(client, sleeper)
            .await_siblings(&config.wait_config(self_pid))
            .await?;

        DownstreamTrigger::new(client)
            .fire(
                &config.downstream_repo,
                &config.downstream_branch,
                &config.params,
            )
            .await
    }
}
