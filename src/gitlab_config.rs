use crate::error::{Error, Result};
use git2::Repository;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR: &str = "glab-cli";
const CONFIG_FILE: &str = "gitlab.toml";
const DEFAULT_HOST: &str = "gitlab.com";
const DEFAULT_REFRESH_SECS: u64 = 5;

const TOKEN_VARS: [&str; 2] = ["GITLAB_TOKEN", "GITLAB_ACCESS_TOKEN"];
const HOST_VARS: [&str; 2] = ["GITLAB_HOST", "GL_HOST"];

/// GitLab instance and project a git remote points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteInfo {
    pub host: String,
    pub base_url: String,
    pub project: String,
}

impl RemoteInfo {
    /// Looks at the `gitlab` remote first, then `origin`.
    pub fn from_repository(repo: &Repository) -> Option<Self> {
        ["gitlab", "origin"].iter().find_map(|name| {
            let remote = repo.find_remote(name).ok()?;
            Self::parse_remote_url(remote.url()?)
        })
    }

    pub fn parse_remote_url(url: &str) -> Option<Self> {
        if let Some(rest) = url.strip_prefix("git@") {
            let (host, path) = rest.split_once(':')?;
            return Self::from_parts("https", host, path);
        }

        let parsed = url::Url::parse(url).ok()?;
        let scheme = match parsed.scheme() {
            "http" => "http",
            "https" | "ssh" => "https",
            _ => return None,
        };
        Self::from_parts(scheme, parsed.host_str()?, parsed.path())
    }

    fn from_parts(scheme: &str, host: &str, path: &str) -> Option<Self> {
        let project = path.trim_matches('/').trim_end_matches(".git");
        if host.is_empty() || project.is_empty() {
            return None;
        }
        Some(Self {
            host: host.to_string(),
            base_url: format!("{}://{}", scheme, host),
            project: project.to_string(),
        })
    }
}

/// Branch checked out in `repo`, or the commit SHA on a detached HEAD.
pub fn current_ref(repo: &Repository) -> Result<String> {
    let head = repo.head()?;
    if head.is_branch() {
        if let Some(name) = head.shorthand() {
            return Ok(name.to_string());
        }
    }
    let commit = head.peel_to_commit()?;
    Ok(commit.id().to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GitLabConfig {
    /// Host used when no remote or environment variable names one.
    pub host: Option<String>,
    #[serde(default)]
    pub tokens: HashMap<String, String>,
    pub refresh_secs: Option<u64>,
}

impl GitLabConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Reads the config at `path`; a missing file is an empty config.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
        Ok(config_dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn get_token(&self, host: &str) -> Option<&str> {
        self.tokens.get(host).map(|s| s.as_str())
    }

    /// Poll interval for the job list.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs.unwrap_or(DEFAULT_REFRESH_SECS).max(1))
    }
}

fn first_var(vars: &[&str], env: &dyn Fn(&str) -> Option<String>) -> Option<String> {
    vars.iter()
        .find_map(|var| env(var))
        .filter(|value| !value.trim().is_empty())
}

/// Where to talk to and with which token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub host: String,
    pub base_url: String,
    pub token: String,
}

impl Connection {
    /// Host from the environment, then the git remote, then the config
    /// file. The token comes from the environment or the config entry for
    /// that host.
    pub fn resolve(
        config: &GitLabConfig,
        remote: Option<&RemoteInfo>,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let (host, base_url) = match first_var(&HOST_VARS, env) {
            Some(value) => split_host(&value),
            None => match remote {
                Some(remote) => (remote.host.clone(), remote.base_url.clone()),
                None => split_host(config.host.as_deref().unwrap_or(DEFAULT_HOST)),
            },
        };

        let token = first_var(&TOKEN_VARS, env)
            .or_else(|| config.get_token(&host).map(String::from))
            .ok_or_else(|| {
                Error::Config(format!(
                    "No GitLab token for {}: set {} or add it to the [tokens] table of {}",
                    host,
                    TOKEN_VARS[0],
                    CONFIG_FILE
                ))
            })?;

        Ok(Self {
            host,
            base_url,
            token,
        })
    }
}

/// Accepts `gitlab.example.com` as well as `https://gitlab.example.com/`.
fn split_host(value: &str) -> (String, String) {
    let value = value.trim().trim_end_matches('/');
    if let Ok(url) = url::Url::parse(value) {
        if let Some(host) = url.host_str() {
            let base = match url.port() {
                Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
                None => format!("{}://{}", url.scheme(), host),
            };
            return (host.to_string(), base);
        }
    }
    (value.to_string(), format!("https://{}", value))
}
