//! Plugin settings and their validation.
//!
//! Raw inputs arrive as [`Settings`] (every field optional), gathered from
//! command-line flags and from the environment variables Drone sets for a
//! plugin step. [`Settings::validate`] turns them into a [`PluginConfig`]
//! before any network call is made.

use std::fmt;

use crate::client::ForkParams;
use crate::error::{PluginError, PluginResult};
use crate::obs;
use crate::repo::RepoRef;
use crate::waiter::WaitConfig;

/// Branch triggered when none is configured.
pub const DEFAULT_DOWNSTREAM_BRANCH: &str = "master";

/// Environment variables read for each setting, in priority order.
pub const SERVER_VARS: &[&str] = &["DEPLOY_SERVER", "PLUGIN_SERVER", "CI_SYSTEM_LINK"];
pub const TOKEN_VARS: &[&str] = &["DEPLOY_TOKEN", "PLUGIN_TOKEN"];
pub const WAIT_REPOSITORY_VARS: &[&str] = &[
    "DEPLOY_WAIT_REPOSITORY",
    "PLUGIN_WAIT_REPOSITORY",
    "DRONE_REPO",
];
pub const BUILD_NUMBER_VARS: &[&str] = &[
    "DEPLOY_BUILD_NUMBER",
    "PLUGIN_BUILD_NUMBER",
    "DRONE_BUILD_NUMBER",
];
pub const DOWNSTREAM_REPOSITORY_VARS: &[&str] = &[
    "DEPLOYMENT_DOWNSTREAM_REPOSITORY",
    "PLUGIN_DOWNSTREAM_REPOSITORY",
];
pub const DOWNSTREAM_BRANCH_VARS: &[&str] = &[
    "DEPLOYMENT_DOWNSTREAM_BRANCH",
    "PLUGIN_DOWNSTREAM_BRANCH",
];
pub const PARAMS_VARS: &[&str] = &["PLUGIN_PARAMS"];

/// Unvalidated plugin inputs.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub server: Option<String>,
    pub token: Option<String>,
    pub wait_repository: Option<String>,
    pub build_number: Option<u64>,
    pub downstream_repository: Option<String>,
    pub downstream_branch: Option<String>,
    /// `KEY=VALUE` pairs forwarded to the fork call.
    pub params: Vec<String>,
}

impl Settings {
    /// Read settings through `lookup`, taking the first non-empty variable
    /// of each alias list.
    pub fn from_lookup<F>(lookup: F) -> PluginResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |vars: &[&str]| {
            vars.iter()
                .filter_map(|var| lookup(*var))
                .find(|value| !value.is_empty())
        };

        let build_number = first(BUILD_NUMBER_VARS)
            .map(|raw| parse_build_number(&raw))
            .transpose()?;

        let params: Vec<String> = first(PARAMS_VARS)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|pair| !pair.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Settings {
            server: first(SERVER_VARS),
            token: first(TOKEN_VARS),
            wait_repository: first(WAIT_REPOSITORY_VARS),
            build_number,
            downstream_repository: first(DOWNSTREAM_REPOSITORY_VARS),
            downstream_branch: first(DOWNSTREAM_BRANCH_VARS),
            params,
        })
    }

    /// Read settings from the process environment.
    pub fn from_env() -> PluginResult<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Overlay `overrides` on `self`; any value set in `overrides` wins.
    pub fn merge(self, overrides: Settings) -> Settings {
        Settings {
            server: overrides.server.or(self.server),
            token: overrides.token.or(self.token),
            wait_repository: overrides.wait_repository.or(self.wait_repository),
            build_number: overrides.build_number.or(self.build_number),
            downstream_repository: overrides
                .downstream_repository
                .or(self.downstream_repository),
            downstream_branch: overrides.downstream_branch.or(self.downstream_branch),
            params: if overrides.params.is_empty() {
                self.params
            } else {
                overrides.params
            },
        }
    }

    /// Check required fields and build the immutable run configuration.
    ///
    /// Presence checks run first, in field order, then repository parsing.
    /// An empty downstream branch becomes [`DEFAULT_DOWNSTREAM_BRANCH`].
    pub fn validate(self) -> PluginResult<PluginConfig> {
        let server_url = required(self.server, "missing Drone server uri")?;
        let token = required(self.token, "missing Drone access token")?;
        let wait_repository = required(self.wait_repository, "missing wait repository")?;
        let build_number = match self.build_number {
            Some(n) if n != 0 => n,
            _ => return Err(PluginError::config("missing build number")),
        };
        let downstream_repository =
            required(self.downstream_repository, "missing downstream repository")?;

        let downstream_branch = match self.downstream_branch {
            Some(branch) if !branch.is_empty() => branch,
            _ => {
                obs::emit_default_branch(DEFAULT_DOWNSTREAM_BRANCH);
                DEFAULT_DOWNSTREAM_BRANCH.to_string()
            }
        };

        Ok(PluginConfig {
            server_url,
            token,
            wait_repo: RepoRef::parse(&wait_repository)?,
            build_number,
            downstream_repo: RepoRef::parse(&downstream_repository)?,
            downstream_branch,
            params: parse_params(&self.params)?,
        })
    }
}

fn required(value: Option<String>, msg: &str) -> PluginResult<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PluginError::config(msg))
}

fn parse_build_number(raw: &str) -> PluginResult<u64> {
    raw.trim()
        .parse()
        .map_err(|_| PluginError::config(format!("invalid build number: {raw:?}")))
}

/// Parse `KEY=VALUE` pairs into fork parameters.
pub fn parse_params(pairs: &[String]) -> PluginResult<ForkParams> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => Err(PluginError::config(format!(
                "invalid param {pair:?}, expected KEY=VALUE"
            ))),
        })
        .collect()
}

/// Job id of the step running this plugin, from `DRONE_JOB_NUMBER`.
///
/// Returns 0 when not running inside a build step, or when the value is not
/// a number (logged). With 0 the waiter does not exclude any process.
pub fn current_job_pid(raw: Option<&str>) -> u64 {
    match raw.map(str::trim) {
        None | Some("") => 0,
        Some(value) => value.parse().unwrap_or_else(|err| {
            tracing::warn!(value, error = %err, "ignoring unparsable job number");
            0
        }),
    }
}

/// Validated configuration for one run.
#[derive(Clone, PartialEq, Eq)]
pub struct PluginConfig {
    pub server_url: String,
    pub token: String,
    pub wait_repo: RepoRef,
    pub build_number: u64,
    pub downstream_repo: RepoRef,
    pub downstream_branch: String,
    pub params: ForkParams,
}

impl PluginConfig {
    pub fn wait_config(&self, self_pid: u64) -> WaitConfig {
        WaitConfig {
            repo: self.wait_repo.clone(),
            build_number: self.build_number,
            self_pid,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("server", &self.server)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("wait_repository", &self.wait_repository)
            .field("build_number", &self.build_number)
            .field("downstream_repository", &self.downstream_repository)
            .field("downstream_branch", &self.downstream_branch)
            .field("params", &self.params)
            .finish()
    }
}

impl fmt::Debug for PluginConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginConfig")
            .field("server_url", &self.server_url)
            .field("token", &"<redacted>")
            .field("wait_repo", &self.wait_repo)
            .field("build_number", &self.build_number)
            .field("downstream_repo", &self.downstream_repo)
            .field("downstream_branch", &self.downstream_branch)
            .field("params", &self.params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn complete() -> Settings {
        Settings {
            server: Some("https://drone.example.com".to_string()),
            token: Some("secret".to_string()),
            wait_repository: Some("acme/widgets".to_string()),
            build_number: Some(42),
            downstream_repository: Some("acme/deploy".to_string()),
            downstream_branch: Some("production".to_string()),
            params: vec![],
        }
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn config_error(settings: Settings) -> String {
        match settings.validate() {
            Err(PluginError::Config(msg)) => msg,
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_complete_settings() {
        let config = complete().validate().unwrap();
        assert_eq!(config.wait_repo, RepoRef::new("acme", "widgets"));
        assert_eq!(config.downstream_repo, RepoRef::new("acme", "deploy"));
        assert_eq!(config.downstream_branch, "production");
        assert_eq!(config.build_number, 42);
    }

    #[test]
    fn test_empty_branch_defaults_to_master() {
        let settings = Settings {
            downstream_branch: Some(String::new()),
            ..complete()
        };
        assert_eq!(settings.validate().unwrap().downstream_branch, "master");

        let settings = Settings {
            downstream_branch: None,
            ..complete()
        };
        assert_eq!(settings.validate().unwrap().downstream_branch, "master");
    }

    #[test]
    fn test_missing_fields_are_reported_in_order() {
        assert_eq!(config_error(Settings::default()), "missing Drone server uri");
        assert_eq!(
            config_error(Settings {
                token: None,
                ..complete()
            }),
            "missing Drone access token"
        );
        assert_eq!(
            config_error(Settings {
                wait_repository: Some(String::new()),
                ..complete()
            }),
            "missing wait repository"
        );
        assert_eq!(
            config_error(Settings {
                build_number: Some(0),
                ..complete()
            }),
            "missing build number"
        );
        assert_eq!(
            config_error(Settings {
                downstream_repository: None,
                ..complete()
            }),
            "missing downstream repository"
        );
    }

    #[test]
    fn test_malformed_repository_fails_validation() {
        let err = Settings {
            downstream_repository: Some("acme".to_string()),
            ..complete()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, PluginError::RepoFormat { ref input } if input == "acme"));
    }

    #[test]
    fn test_first_non_empty_alias_wins() {
        let settings = Settings::from_lookup(lookup(&[
            ("DEPLOY_SERVER", ""),
            ("PLUGIN_SERVER", "https://plugin.example.com"),
            ("CI_SYSTEM_LINK", "https://link.example.com"),
            ("DRONE_REPO", "acme/widgets"),
            ("PLUGIN_WAIT_REPOSITORY", "acme/other"),
            ("DRONE_BUILD_NUMBER", "42"),
            ("DEPLOYMENT_DOWNSTREAM_BRANCH", "release"),
        ]))
        .unwrap();

        assert_eq!(settings.server.as_deref(), Some("https://plugin.example.com"));
        assert_eq!(settings.wait_repository.as_deref(), Some("acme/other"));
        assert_eq!(settings.build_number, Some(42));
        assert_eq!(settings.downstream_branch.as_deref(), Some("release"));
        assert!(settings.token.is_none());
    }

    #[test]
    fn test_unparsable_build_number_is_config_error() {
        let err = Settings::from_lookup(lookup(&[("PLUGIN_BUILD_NUMBER", "forty-two")]))
            .unwrap_err();
        assert!(matches!(err, PluginError::Config(ref m) if m.contains("forty-two")));
    }

    #[test]
    fn test_params_from_env() {
        let settings =
            Settings::from_lookup(lookup(&[("PLUGIN_PARAMS", "DEPLOY_TO=prod, TAG=v1.2,")]))
                .unwrap();
        assert_eq!(settings.params, vec!["DEPLOY_TO=prod", "TAG=v1.2"]);
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let env = complete();
        let flags = Settings {
            downstream_branch: Some("staging".to_string()),
            params: vec!["A=1".to_string()],
            ..Settings::default()
        };
        let merged = env.merge(flags);
        assert_eq!(merged.downstream_branch.as_deref(), Some("staging"));
        assert_eq!(merged.server.as_deref(), Some("https://drone.example.com"));
        assert_eq!(merged.params, vec!["A=1"]);
    }

    #[test]
    fn test_parse_params() {
        let params = parse_params(&["A=1".to_string(), "B=x=y".to_string()]).unwrap();
        assert_eq!(params.get("A").map(String::as_str), Some("1"));
        assert_eq!(params.get("B").map(String::as_str), Some("x=y"));

        assert!(parse_params(&["novalue".to_string()]).is_err());
        assert!(parse_params(&["=1".to_string()]).is_err());
    }

    #[test]
    fn test_current_job_pid() {
        assert_eq!(current_job_pid(None), 0);
        assert_eq!(current_job_pid(Some("")), 0);
        assert_eq!(current_job_pid(Some("3")), 3);
        assert_eq!(current_job_pid(Some("three")), 0);
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = complete().validate().unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_settings_debug_redacts_token() {
        let debug = format!("{:?}", complete());
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));

        let empty = format!("{:?}", Settings::default());
        assert!(empty.contains("token: None"));
    }
}
