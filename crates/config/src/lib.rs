//! Configuration loading and validation.
//!
//! The config is a JSON file in the per-user config directory (or the path
//! given with `--config`). Any field can be overridden from the environment
//! with a `FERRY_` prefix; nested fields use `__`, eg. `FERRY_CDN__TOKEN`.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::{BaseDirs, ProjectDirs};
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "FERRY_";
const CONFIG_FILE_NAME: &str = "config.json";

/// Bucket credentials and publishing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// S3-compatible endpoint; `None` means AWS itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Public base URL that serves the bucket, eg. `https://cdn.example.com`.
    pub url_prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdn: Option<CdnConfig>,
    /// Extensions picked up by the HTML catch-all reference scan. Defaults to
    /// the built-in list when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,
}

/// CDN purge API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdnConfig {
    pub endpoint: String,
    pub token: String,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

/// `<user config dir>/ferry/config.json`.
pub fn default_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "ferry").ok_or_raise(|| ErrorKind::NoConfigDir)?;
    Ok(dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Identifies the current user for cache separation.
pub fn user_identity() -> String {
    BaseDirs::new().map(|dirs| dirs.home_dir().to_string_lossy().into_owned()).unwrap_or_default()
}

impl Config {
    /// Load and validate the config at `path` (or the default location),
    /// with `FERRY_*` environment overrides applied on top.
    #[tracing::instrument]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => default_path()?,
        };
        if !path.is_file() {
            exn::bail!(ErrorKind::NotFound(path));
        }
        let config: Config = Figment::new()
            .merge(Json::file(&path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .or_raise(|| ErrorKind::Parse(path.clone()))?;
        config.validate()?;
        tracing::debug!(path = %path.display(), bucket = %config.bucket, "config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("access_key_id", &self.access_key_id),
            ("secret_access_key", &self.secret_access_key),
            ("bucket", &self.bucket),
            ("url_prefix", &self.url_prefix),
        ] {
            if value.trim().is_empty() {
                exn::bail!(ErrorKind::Invalid(format!("`{name}` must not be empty")));
            }
        }
        if !self.url_prefix.starts_with("http://") && !self.url_prefix.starts_with("https://") {
            exn::bail!(ErrorKind::Invalid(format!("`url_prefix` must be an http(s) URL, got `{}`", self.url_prefix)));
        }
        if let Some(cdn) = &self.cdn
            && (cdn.endpoint.trim().is_empty() || cdn.token.trim().is_empty())
        {
            exn::bail!(ErrorKind::Invalid("`cdn` needs both `endpoint` and `token`".to_string()));
        }
        Ok(())
    }

    /// Stable identifier of the account and destination this config points
    /// at. Secrets are hashed, never exposed.
    pub fn identity(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for part in [
            self.access_key_id.as_str(),
            self.bucket.as_str(),
            self.endpoint.as_deref().unwrap_or(""),
            self.url_prefix.as_str(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update(b"\0");
        }
        hasher.finalize().to_hex()[..16].to_string()
    }

    /// Placeholder values written by `ferry init`.
    pub fn template() -> Self {
        Self {
            access_key_id: String::new(),
            secret_access_key: String::new(),
            bucket: String::new(),
            region: default_region(),
            endpoint: Some("https://s3.example.com".to_string()),
            url_prefix: "https://cdn.example.com".to_string(),
            cdn: None,
            extensions: None,
        }
    }
}

/// Write the template config to `path`, readable only by the current user.
pub fn write_template(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        exn::bail!(ErrorKind::AlreadyExists(path.to_path_buf()));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Io(parent.to_path_buf()))?;
    }
    let mut json = serde_json::to_string_pretty(&Config::template()).or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
    json.push('\n');
    write_private(path, json.as_bytes()).or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
    tracing::info!(path = %path.display(), "wrote config template");
    Ok(())
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
    let mut file = std::fs::OpenOptions::new().write(true).create(true).truncate(true).mode(0o600).open(path)?;
    // `mode` only applies on creation; tighten existing files too.
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, contents)
}
