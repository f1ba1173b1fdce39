use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use serde::Deserialize;
use spaces_engine::{DownloaderConfig, ProxyConfig, ProxyType};
use spaces_platform::Credentials;
use tracing::debug;

use crate::cli::Args;
use crate::error::{AppError, Result};
use crate::output::output_path;

/// Optional settings file. Every field can be overridden from the command line.
/// Polling and retry timings are fixed and cannot be set here.
///
/// ```toml
/// output_dir = "/data/spaces"
/// timeout_secs = 60
/// proxy = "socks5://127.0.0.1:1080"
/// proxy_type = "socks5"
///
/// [credentials]
/// auth_token = "..."
/// ct0 = "..."
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub output_dir: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub proxy: Option<String>,
    pub proxy_type: Option<String>,
    pub proxy_username: Option<String>,
    pub proxy_password: Option<String>,
    pub insecure: bool,
    pub credentials: CredentialsSection,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CredentialsSection {
    pub auth_token: Option<String>,
    pub ct0: Option<String>,
    pub bearer_token: Option<String>,
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("spaces-dl").join("config.toml"))
    }

    /// Loads `path`, or the default location if none is given.
    ///
    /// A missing file is only an error when the path was given explicitly.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::default_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        if !explicit && !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| AppError::ConfigRead {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Self::from_toml(&content).map_err(|source| AppError::ConfigParse { path, source })
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Everything a recording needs, after merging flags over the config file.
#[derive(Debug)]
pub struct Settings {
    pub downloader: DownloaderConfig,
    pub credentials: Credentials,
    pub output: PathBuf,
}

impl Settings {
    pub fn resolve(args: &Args, config: AppConfig) -> Result<Self> {
        let mut builder = DownloaderConfig::builder()
            .with_danger_accept_invalid_certs(args.insecure || config.insecure);
        if let Some(secs) = args.timeout.or(config.timeout_secs) {
            builder = builder.with_timeout(Duration::from_secs(secs));
        }
        if let Some(proxy) = proxy_config(args, &config)? {
            builder = builder.with_proxy(proxy);
        }

        let section = config.credentials;
        let mut credentials = Credentials::new(
            args.auth_token.clone().or(section.auth_token).unwrap_or_default(),
            args.ct0.clone().or(section.ct0).unwrap_or_default(),
        );
        if let Some(token) = args.bearer_token.clone().or(section.bearer_token) {
            credentials = credentials.with_bearer_token(token);
        }

        let output_dir = args.output_dir.as_deref().or(config.output_dir.as_deref());
        let output = output_path(args.output.as_deref(), output_dir, &args.url);

        Ok(Self {
            downloader: builder.build(),
            credentials,
            output,
        })
    }
}

fn proxy_config(args: &Args, config: &AppConfig) -> Result<Option<ProxyConfig>> {
    let Some(url) = args.proxy.as_ref().or(config.proxy.as_ref()) else {
        return Ok(None);
    };

    let proxy_type = match (args.proxy_type, config.proxy_type.as_deref()) {
        (Some(proxy_type), _) => proxy_type,
        (None, Some(name)) => ProxyType::from_str(name, true)
            .map_err(|e| AppError::InvalidInput(format!("proxy_type `{name}`: {e}")))?,
        (None, None) => ProxyType::default(),
    };

    let mut proxy = ProxyConfig::new(url.as_str(), proxy_type);
    let username = args.proxy_username.as_ref().or(config.proxy_username.as_ref());
    if let Some(username) = username {
        let password = args
            .proxy_password
            .as_ref()
            .or(config.proxy_password.as_ref())
            .map(String::as_str)
            .unwrap_or_default();
        proxy = proxy.with_auth(username.as_str(), password);
    }
    Ok(Some(proxy))
}
