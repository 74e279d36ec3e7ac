//! Drone REST API client
//!
//! Implements [`BuildClient`] against a Drone server using a personal access
//! token. Only the three endpoints the plugin needs are covered.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::build::Build;
use crate::client::{BuildClient, ClientError, ClientResult, ForkParams};
use crate::repo::RepoRef;

/// HTTP client for a single Drone server
pub struct DroneClient {
    server_url: String,
    token: String,
    http_client: reqwest::Client,
}

impl DroneClient {
    /// Create a client for `server_url` authenticating with `token`.
    pub fn new(server_url: &str, token: &str) -> ClientResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("wait-downstream/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(DroneClient {
            server_url: server_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            http_client,
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// `{server}/api/repos/{owner}/{name}/builds/{build}`
    fn build_url(&self, repo: &RepoRef, build: &str) -> String {
        format!(
            "{}/api/repos/{}/{}/builds/{}",
            self.server_url, repo.owner, repo.name, build
        )
    }

    /// `GET .../builds/{number}`
    fn build_request(&self, repo: &RepoRef, number: u64) -> reqwest::RequestBuilder {
        self.http_client
            .get(self.build_url(repo, &number.to_string()))
            .bearer_auth(&self.token)
    }

    /// `GET .../builds/latest?branch={branch}`
    fn latest_request(&self, repo: &RepoRef, branch: &str) -> reqwest::RequestBuilder {
        self.http_client
            .get(self.build_url(repo, "latest"))
            .query(&[("branch", branch)])
            .bearer_auth(&self.token)
    }

    /// `POST .../builds/{number}?fork=true&{params}`
    ///
    /// Without `fork=true` Drone restarts the old build in place instead of
    /// starting a new one from it.
    fn fork_request(
        &self,
        repo: &RepoRef,
        number: u64,
        params: &ForkParams,
    ) -> reqwest::RequestBuilder {
        self.http_client
            .post(self.build_url(repo, &number.to_string()))
            .query(&[("fork", "true")])
            .query(params)
            .bearer_auth(&self.token)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> ClientResult<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(classify_status(status, &body));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Map a non-success response onto a [`ClientError`].
///
/// Drone answers 409 when asked to fork a build that is still running.
fn classify_status(status: StatusCode, body: &str) -> ClientError {
    let message = body.trim().to_string();
    match status {
        StatusCode::CONFLICT => ClientError::AlreadyStarted,
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Unauthorized,
        _ => ClientError::Status {
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl BuildClient for DroneClient {
    async fn fetch_build(&self, repo: &RepoRef, number: u64) -> ClientResult<Build> {
        debug!(repo = %repo, number, "fetching build");
        self.send(self.build_request(repo, number)).await
    }

    async fn fetch_latest_build(&self, repo: &RepoRef, branch: &str) -> ClientResult<Build> {
        debug!(repo = %repo, branch, "fetching latest build");
        self.send(self.latest_request(repo, branch)).await
    }

    async fn start_forked_build(
        &self,
        repo: &RepoRef,
        number: u64,
        params: &ForkParams,
    ) -> ClientResult<Build> {
        debug!(repo = %repo, number, params = params.len(), "forking build");
        self.send(self.fork_request(repo, number, params)).await
    }
}
