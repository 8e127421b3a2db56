use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "portal.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read config file '{path}': {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Endpoint paths, relative to `base_url`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub login: String,
    pub signup: String,
    pub logout: String,
    pub user_profile: String,
    pub events: String,
    pub finances: String,
    pub documents: String,
    pub uptime: String,
    pub load: String,
    pub mem: String,
    pub cpu: String,
    pub disk: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: "/login".into(),
            signup: "/signup".into(),
            logout: "/logout".into(),
            user_profile: "/user-profile".into(),
            events: "/events".into(),
            finances: "/finances-for-current-user".into(),
            documents: "/documents".into(),
            uptime: "/uptime".into(),
            load: "/load".into(),
            mem: "/mem".into(),
            cpu: "/cpu".into(),
            disk: "/disk".into(),
        }
    }
}

impl Endpoints {
    pub fn events_preview(&self, limit: u32) -> String {
        format!("{}?limit={limit}", self.events)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub base_url: String,
    pub poll_interval_ms: u64,
    pub events_preview_limit: u32,
    pub request_timeout_ms: Option<u64>,
    pub endpoints: Endpoints,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/api".into(),
            poll_interval_ms: 5000,
            events_preview_limit: 1,
            request_timeout_ms: None,
            endpoints: Endpoints::default(),
        }
    }
}

impl ClientSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Absolute URL documents are downloaded from, without a trailing slash.
    pub fn document_link_base(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.endpoints.documents
        )
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let url = Url::parse(&self.base_url).map_err(|error| SettingsError::Invalid {
            key: "base_url",
            reason: error.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SettingsError::Invalid {
                key: "base_url",
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(SettingsError::Invalid {
                key: "poll_interval_ms",
                reason: "must be greater than zero".into(),
            });
        }
        if self.events_preview_limit == 0 {
            return Err(SettingsError::Invalid {
                key: "events_preview_limit",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    base_url: Option<String>,
    poll_interval_ms: Option<u64>,
    events_preview_limit: Option<u32>,
    request_timeout_ms: Option<u64>,
    endpoints: Option<Endpoints>,
}

/// Defaults, then the config file (if present), then environment overrides.
pub fn load_settings(path: Option<&Path>) -> Result<ClientSettings, SettingsError> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(|| {
        std::env::var("PORTAL_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE))
    });

    let mut settings = ClientSettings::default();
    match fs::read_to_string(&path) {
        Ok(raw) => apply_file(&mut settings, &path, &raw)?,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(source) => return Err(SettingsError::Read { path, source }),
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok())?;
    settings.validate()?;
    Ok(settings)
}

fn apply_file(settings: &mut ClientSettings, path: &Path, raw: &str) -> Result<(), SettingsError> {
    let file: SettingsFile = toml::from_str(raw).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(v) = file.base_url {
        settings.base_url = v;
    }
    if let Some(v) = file.poll_interval_ms {
        settings.poll_interval_ms = v;
    }
    if let Some(v) = file.events_preview_limit {
        settings.events_preview_limit = v;
    }
    if file.request_timeout_ms.is_some() {
        settings.request_timeout_ms = file.request_timeout_ms;
    }
    if let Some(v) = file.endpoints {
        settings.endpoints = v;
    }
    Ok(())
}

pub(crate) fn apply_env_overrides(
    settings: &mut ClientSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), SettingsError> {
    if let Some(v) = lookup("PORTAL_BASE_URL") {
        settings.base_url = v;
    }
    if let Some(v) = lookup("APP__BASE_URL") {
        settings.base_url = v;
    }

    if let Some(v) = lookup("APP__POLL_INTERVAL_MS") {
        settings.poll_interval_ms = parse_number("APP__POLL_INTERVAL_MS", &v)?;
    }
    if let Some(v) = lookup("APP__EVENTS_PREVIEW_LIMIT") {
        settings.events_preview_limit = parse_number("APP__EVENTS_PREVIEW_LIMIT", &v)?;
    }
    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_MS") {
        settings.request_timeout_ms = Some(parse_number("APP__REQUEST_TIMEOUT_MS", &v)?);
    }
    Ok(())
}

fn parse_number<T>(key: &'static str, raw: &str) -> Result<T, SettingsError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|error| SettingsError::Invalid {
        key,
        reason: format!("'{raw}': {error}"),
    })
}
