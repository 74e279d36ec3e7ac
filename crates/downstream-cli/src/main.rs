//! wait-downstream - Drone plugin binary
//!
//! Waits until all other jobs of a build finished with success state, then
//! triggers the latest build of a downstream repository.
//!
//! Every flag can also come from the plugin environment (`PLUGIN_*`,
//! `DEPLOY_*` and the `DRONE_*` variables of the running step); flags win.

use std::fmt;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};

use downstream_core::{current_job_pid, init_tracing, Plugin, Settings, TriggerOutcome};

#[derive(Parser)]
#[command(name = "wait-downstream")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Wait until all other jobs finished with success state and trigger downstream repository build",
    long_about = None
)]
struct Cli {
    /// Drone server to talk to
    #[arg(long, alias = "server_url")]
    server: Option<String>,

    /// Drone API token from your user settings
    #[arg(long)]
    token: Option<String>,

    /// Repository (owner/name) to wait on before triggering downstream
    #[arg(long, alias = "wait_repository")]
    wait_repository: Option<String>,

    /// Build number to wait on
    #[arg(long)]
    build: Option<u64>,

    /// Repository (owner/name) to trigger
    #[arg(long, alias = "downstream_repository")]
    downstream_repository: Option<String>,

    /// Branch of the downstream repository [default: master]
    #[arg(long, alias = "downstream_branch")]
    downstream_branch: Option<String>,

    /// Parameter passed to the downstream build (KEY=VALUE, repeatable)
    #[arg(long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Job number of this step, excluded from the wait
    #[arg(long, env = "DRONE_JOB_NUMBER", hide_env_values = true)]
    job_number: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// Settings given explicitly on the command line.
    fn settings(&self) -> Settings {
        Settings {
            server: self.server.clone(),
            token: self.token.clone(),
            wait_repository: self.wait_repository.clone(),
            build_number: self.build,
            downstream_repository: self.downstream_repository.clone(),
            downstream_branch: self.downstream_branch.clone(),
            params: self.params.clone(),
        }
    }
}

impl fmt::Debug for Cli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cli")
            .field("settings", &self.settings())
            .field("job_number", &self.job_number)
            .field("verbose", &self.verbose)
            .field("json", &self.json)
            .finish()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    let settings = Settings::from_env()
        .context("Failed to read plugin settings from environment")?
        .merge(cli.settings());
    let self_pid = current_job_pid(cli.job_number.as_deref());

    match Plugin::exec(settings, self_pid).await? {
        TriggerOutcome::Started { number } => {
            info!(number, "downstream build started");
        }
        TriggerOutcome::AlreadyStarted { forked_from } => {
            info!(forked_from, "downstream build was already started");
        }
    }
    Ok(())
}
