use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::Error;
use crate::helper::get_file_path;

pub static CONFIG_FILE: &str = "config.toml";

/// Where to connect by default. The password is never read from disk.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TargetConfig {
    pub host: String,
    pub user: String,
    pub port: u16,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            user: String::new(),
            port: 22,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RemoteConfig {
    /// Searched two levels deep for `<package>/<executable>`.
    pub workspace_root: String,
    /// Program that runs a discovered executable as `<runner> <package> <executable>`.
    pub script_runner: String,
    pub connect_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            workspace_root: "~/catkin_ws/devel/lib".to_string(),
            script_runner: "rosrun".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

impl RemoteConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// A long-running process started inside a detached `screen` session.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Service {
    /// Also the `screen` session name, so `screen -r <name>` works on the target.
    pub name: String,
    /// Command line started inside the session, passed to the remote shell as is.
    pub command: String,
}

impl Service {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
        }
    }

    pub fn launch_command(&self) -> String {
        format!("screen -dmS {} {}", shell_words::quote(&self.name), self.command)
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub target: TargetConfig,
    pub remote: RemoteConfig,
    pub services: Vec<Service>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target: TargetConfig::default(),
            remote: RemoteConfig::default(),
            services: vec![Service::new("roscore", "roscore")],
        }
    }
}

impl Config {
    pub fn from_toml(config_str: &str) -> Result<Self, Error> {
        // Check if the config file content is empty
        if config_str.trim().is_empty() {
            return Ok(Config::default());
        }
        let config: Config =
            toml::from_str(config_str).map_err(|e| Error::Config(e.message().to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.remote.workspace_root.trim().is_empty() {
            return Err(Error::Config("remote.workspace_root is empty".into()));
        }
        if self.remote.script_runner.trim().is_empty() {
            return Err(Error::Config("remote.script_runner is empty".into()));
        }
        if self.remote.connect_timeout_secs == 0 {
            return Err(Error::Config("remote.connect_timeout_secs must be positive".into()));
        }
        for service in &self.services {
            if service.name.trim().is_empty() || service.command.trim().is_empty() {
                return Err(Error::Config(format!(
                    "service {:?} needs both a name and a command",
                    service.name
                )));
            }
        }
        Ok(())
    }
}

/// Default location, "~/.config/auv-console/config.toml".
pub fn default_config_path() -> Result<PathBuf> {
    get_file_path(CONFIG_FILE)
}

/**
    read toml format config from `path`,
    falling back to defaults when the file does not exist
*/
pub fn read_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Unable to read auv-console's config file at {:?}", path))?;

    let config = Config::from_toml(&config_str)
        .with_context(|| format!("Failed to parse auv-console's config file at {:?}", path))?;

    Ok(config)
}
