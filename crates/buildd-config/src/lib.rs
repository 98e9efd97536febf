//! Configuration management for the buildd build daemon
//!
//! This crate handles YAML configuration parsing, validation,
//! and environment variable substitution.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use buildd_core::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::debug;

/// Locations read when no configuration file is given. Every existing file is
/// loaded; keys in later files override earlier ones.
pub const DEFAULT_CONFIG_PATHS: &[&str] = &["/etc/buildd.yaml", "~/.buildd.yaml"];

/// Default maintainer template for uploads signed by the daemon.
pub const DEFAULT_MAINTAINER_TEMPLATE: &str =
    "{architecture} Build Daemon ({short_hostname}) <{email}>";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Architectures to build for, in polling order
    pub architectures: Vec<String>,

    /// Distributions to poll, in order
    #[serde(default = "default_distributions")]
    pub distributions: Vec<String>,

    /// Seconds to sleep when the queue has nothing to build
    #[serde(default = "default_idle_sleep_time")]
    pub idle_sleep_time: u64,

    /// Template for the maintainer field of built packages
    #[serde(default = "default_maintainer_template")]
    pub maintainer_email_template: String,

    /// Parent directory of the per-job working directories
    #[serde(default = "default_build_root")]
    pub build_root: PathBuf,

    /// Fully qualified host name; resolved at startup when unset
    #[serde(default)]
    pub hostname: Option<String>,

    /// wanna-build connection settings
    #[serde(default)]
    pub queue: QueueConfig,

    /// Upload settings
    #[serde(default)]
    pub upload: UploadConfig,

    /// External programs
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// wanna-build is reached over an existing SSH control socket
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub ssh_user: String,
    pub ssh_socket: String,
    pub ssh_host: String,
    /// Remote command, invoked with `--api=2`
    pub command: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            ssh_user: "wb-buildd".to_string(),
            ssh_socket: "buildd.debian.org.ssh".to_string(),
            ssh_host: "buildd.debian.org".to_string(),
            command: "wanna-build".to_string(),
        }
    }
}

/// Upload targets and retry behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Archive name to dupload target
    pub targets: BTreeMap<String, String>,
    /// Attempts before the job is given back
    pub max_attempts: u32,
    /// Seconds between attempts
    pub retry_delay: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        let targets = [
            ("debian", "rsync-ftp-master"),
            ("debian-security", "rsync-security"),
            ("debian-ports", "rsync-ports"),
        ]
        .into_iter()
        .map(|(archive, target)| (archive.to_string(), target.to_string()))
        .collect();

        Self { targets, max_attempts: 3, retry_delay: 2 * 60 }
    }
}

/// Programs invoked by the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub build: String,
    pub upload: String,
    pub gpg: String,
    pub ssh: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            build: "sbuild".to_string(),
            upload: "dupload".to_string(),
            gpg: "gpg".to_string(),
            ssh: "ssh".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_files(&[path.as_ref().to_path_buf()])
    }

    /// Load several YAML files, merging them key by key in order
    pub fn from_files(paths: &[PathBuf]) -> Result<Self> {
        let mut merged = Value::Null;
        for path in paths {
            let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigError {
                message: format!("Failed to read config file {path:?}: {e}"),
            })?;
            merge_yaml(&mut merged, parse_yaml(&content)?);
            debug!("Loaded configuration from {}", path.display());
        }

        Self::from_value(merged)
    }

    /// Parse, expand and validate configuration text
    pub fn from_yaml(content: &str) -> Result<Self> {
        Self::from_value(parse_yaml(content)?)
    }

    fn from_value(value: Value) -> Result<Self> {
        let mut config: Config = serde_yaml::from_value(value)
            .map_err(|e| Error::ConfigError { message: format!("Invalid configuration: {e}") })?;

        // Expand environment variables
        config.expand_env_vars()?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Load every existing file of [`DEFAULT_CONFIG_PATHS`]
    pub fn discover() -> Result<Self> {
        let mut found = Vec::new();
        for candidate in DEFAULT_CONFIG_PATHS {
            let path = expand_path(Path::new(candidate))?;
            if path.exists() {
                found.push(path);
            }
        }

        if found.is_empty() {
            return Err(Error::config(format!(
                "No configuration file found (searched {})",
                DEFAULT_CONFIG_PATHS.join(", ")
            )));
        }
        Self::from_files(&found)
    }

    /// Expand environment variables in paths
    fn expand_env_vars(&mut self) -> Result<()> {
        self.build_root = expand_path(&self.build_root)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.architectures.is_empty() {
            return Err(Error::config("At least one architecture must be configured"));
        }
        if self.architectures.iter().any(|arch| arch.trim().is_empty()) {
            return Err(Error::config("Architectures must not contain empty entries"));
        }

        if self.distributions.is_empty() {
            return Err(Error::config("At least one distribution must be configured"));
        }
        if self.distributions.iter().any(|dist| dist.trim().is_empty()) {
            return Err(Error::config("Distributions must not contain empty entries"));
        }

        if !self.maintainer_email_template.contains("{email}") {
            return Err(Error::config(
                "maintainer_email_template must contain the {email} placeholder",
            ));
        }

        if self.upload.max_attempts == 0 {
            return Err(Error::config("upload.max_attempts must be at least 1"));
        }

        if let Some(archive) = self
            .upload
            .targets
            .iter()
            .find(|(_, target)| target.trim().is_empty())
            .map(|(archive, _)| archive)
        {
            return Err(Error::config(format!("Empty upload target for archive {archive}")));
        }

        Ok(())
    }

    /// Idle sleep between empty polls
    pub fn idle_interval(&self) -> Duration {
        Duration::from_secs(self.idle_sleep_time)
    }

    /// Delay between upload attempts
    pub fn upload_retry_delay(&self) -> Duration {
        Duration::from_secs(self.upload.retry_delay)
    }
}

/// Expand `~` and environment variables in a path
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path.to_string_lossy();
    let env_var_re =
        Regex::new(r"\$\{([^}]+)\}|\$([A-Za-z_][A-Za-z0-9_]*)").expect("Invalid regex");

    let mut result = path_str.to_string();
    if result == "~" || result.starts_with("~/") {
        let home = std::env::var("HOME").map_err(|_| Error::ConfigError {
            message: "Environment variable not found: HOME".to_string(),
        })?;
        result = format!("{home}{}", &result[1..]);
    }

    for cap in env_var_re.captures_iter(&path_str) {
        let Some(var_name) = cap.get(1).or_else(|| cap.get(2)).map(|m| m.as_str()) else {
            continue;
        };
        let var_value = std::env::var(var_name).map_err(|_| Error::ConfigError {
            message: format!("Environment variable not found: {var_name}"),
        })?;

        result = result.replace(&cap[0], &var_value);
    }

    Ok(PathBuf::from(result))
}

fn parse_yaml(content: &str) -> Result<Value> {
    serde_yaml::from_str(content)
        .map_err(|e| Error::ConfigError { message: format!("Failed to parse YAML: {e}") })
}

/// Overlay `overlay` onto `base`. Mappings merge recursively; any other value
/// replaces what was there. An empty document changes nothing.
fn merge_yaml(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                if let Some(existing) = base.get_mut(&key) {
                    merge_yaml(existing, value);
                } else {
                    base.insert(key, value);
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn default_distributions() -> Vec<String> {
    vec!["any".to_string()]
}

fn default_idle_sleep_time() -> u64 {
    60
}

fn default_maintainer_template() -> String {
    DEFAULT_MAINTAINER_TEMPLATE.to_string()
}

fn default_build_root() -> PathBuf {
    PathBuf::from("~/build")
}

#[cfg(test)]
mod tests {
    use std::env;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_expand_path() {
        env::set_var("BUILDD_TEST_VAR", "/test/path");

        let path = PathBuf::from("${BUILDD_TEST_VAR}/sub");
        let expanded = expand_path(&path).unwrap();
        assert_eq!(expanded, PathBuf::from("/test/path/sub"));

        let path = PathBuf::from("$BUILDD_TEST_VAR/sub");
        let expanded = expand_path(&path).unwrap();
        assert_eq!(expanded, PathBuf::from("/test/path/sub"));
    }

    #[test]
    fn test_expand_home() {
        let home = env::var("HOME").unwrap();
        let expanded = expand_path(Path::new("~/build")).unwrap();
        assert_eq!(expanded, PathBuf::from(format!("{home}/build")));
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = Config::from_yaml("architectures: [amd64, i386]\n").unwrap();

        assert_eq!(config.architectures, vec!["amd64", "i386"]);
        assert_eq!(config.distributions, vec!["any"]);
        assert_eq!(config.idle_interval(), Duration::from_secs(60));
        assert_eq!(config.maintainer_email_template, DEFAULT_MAINTAINER_TEMPLATE);
        assert_eq!(config.queue.ssh_user, "wb-buildd");
        assert_eq!(config.queue.ssh_host, "buildd.debian.org");
        assert_eq!(config.upload.max_attempts, 3);
        assert_eq!(config.upload_retry_delay(), Duration::from_secs(120));
        assert_eq!(
            config.upload.targets.get("debian-security").map(String::as_str),
            Some("rsync-security")
        );
        assert_eq!(config.tools.build, "sbuild");
        assert!(!config.build_root.starts_with("~"));
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
architectures: [arm64]
distributions: [sid, experimental]
idle_sleep_time: 5
build_root: /srv/buildd
hostname: arm-01.example.org
queue:
  ssh_host: wb.example.org
upload:
  targets:
    custom: rsync-custom
  max_attempts: 5
"#;
        let config = Config::from_yaml(yaml).unwrap();

        assert_eq!(config.distributions, vec!["sid", "experimental"]);
        assert_eq!(config.build_root, PathBuf::from("/srv/buildd"));
        assert_eq!(config.hostname.as_deref(), Some("arm-01.example.org"));
        assert_eq!(config.queue.ssh_host, "wb.example.org");
        assert_eq!(config.queue.ssh_user, "wb-buildd");
        assert_eq!(config.upload.targets.len(), 1);
        assert_eq!(config.upload.max_attempts, 5);
        assert_eq!(config.upload.retry_delay, 120);
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::from_yaml("architectures: []\n").is_err());
        assert!(Config::from_yaml("architectures: [amd64]\ndistributions: []\n").is_err());
        assert!(Config::from_yaml(
            "architectures: [amd64]\nmaintainer_email_template: \"nobody\"\n"
        )
        .is_err());
        assert!(Config::from_yaml("architectures: [amd64]\nupload:\n  max_attempts: 0\n").is_err());
        assert!(Config::from_yaml("distributions: [sid]\n").is_err());
    }

    #[test]
    fn test_later_files_override_earlier_keys() {
        let temp_dir = TempDir::new().unwrap();
        let system = temp_dir.path().join("etc-buildd.yaml");
        let user = temp_dir.path().join("user-buildd.yaml");
        let empty = temp_dir.path().join("empty.yaml");
        std::fs::write(
            &system,
            "architectures: [amd64]\nidle_sleep_time: 30\nbuild_root: /srv/build\n\
             upload:\n  max_attempts: 5\n  targets:\n    debian: ftp-master\n",
        )
        .unwrap();
        std::fs::write(
            &user,
            "distributions: [sid]\nidle_sleep_time: 10\n\
             upload:\n  targets:\n    debian-ports: ports-master\n",
        )
        .unwrap();
        std::fs::write(&empty, "").unwrap();

        let config = Config::from_files(&[system, empty, user]).unwrap();
        assert_eq!(config.architectures, vec!["amd64"]);
        assert_eq!(config.distributions, vec!["sid"]);
        assert_eq!(config.idle_sleep_time, 10);
        assert_eq!(config.build_root, PathBuf::from("/srv/build"));
        assert_eq!(config.upload.max_attempts, 5);
        assert_eq!(config.upload.targets.len(), 2);
        assert_eq!(config.upload.targets["debian"], "ftp-master");
        assert_eq!(config.upload.targets["debian-ports"], "ports-master");
    }

    #[test]
    fn test_blank_list_entries_are_rejected() {
        let err = Config::from_yaml("architectures: [amd64, \"\"]\n").unwrap_err();
        assert!(err.to_string().contains("Architectures must not contain empty entries"));

        let err =
            Config::from_yaml("architectures: [amd64]\ndistributions: [sid, \" \"]\n").unwrap_err();
        assert!(err.to_string().contains("Distributions must not contain empty entries"));
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("buildd.yaml");
        std::fs::write(&path, "architectures: [amd64]\nbuild_root: /tmp/b\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.build_root, PathBuf::from("/tmp/b"));

        assert!(Config::from_file(temp_dir.path().join("missing.yaml")).is_err());
    }
}
