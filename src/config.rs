use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "meeting_map.toml";
const ENV_PREFIX: &str = "MEETMAP";

/// Configuration problems found before any fetch starts. Always fatal.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("geocoder.provider = \"google\" needs geocoder.api_key (or GOOGLE_API_KEY)")]
    MissingGeocoderKey,
    #[error("geocoder.user_agent must not be empty for Nominatim")]
    MissingUserAgent,
    #[error("no channel id: set video.channel_id or pass --channel")]
    MissingChannel,
    #[error("video.auth = \"{0}\" needs video.{1}")]
    MissingCredential(&'static str, &'static str),
    #[error("chrome binary not found at {0:?}")]
    MissingChrome(PathBuf),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub agenda: AgendaSettings,
    pub video: VideoSettings,
    pub geocoder: GeocoderSettings,
    pub map: MapSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgendaSettings {
    pub listing_url: String,
    pub link_selector: String,
    pub chrome_path: Option<PathBuf>,
    pub wait_timeout_secs: u64,
    pub download_timeout_secs: u64,
}

impl Default for AgendaSettings {
    fn default() -> Self {
        AgendaSettings {
            listing_url: "https://www.fortville.in.gov/meetings".into(),
            link_selector: ".agenda-column a[aria-label*='Download PDF Agenda']".into(),
            chrome_path: None,
            wait_timeout_secs: 20,
            download_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Channel feed, no credentials.
    #[default]
    Public,
    /// Channel feed with a browser cookie header.
    Cookie,
    /// Data API with `key=`.
    ApiKey,
    /// Data API with an OAuth access token.
    Bearer,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    pub channel_id: Option<String>,
    pub auth: AuthMode,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub cookie: Option<String>,
    /// Keep only the newest N videos.
    pub max_videos: Option<usize>,
    pub timeout_secs: u64,
}

impl Default for VideoSettings {
    fn default() -> Self {
        VideoSettings {
            channel_id: None,
            auth: AuthMode::Public,
            api_key: None,
            access_token: None,
            cookie: None,
            max_videos: Some(200),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Nominatim,
    Google,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeocoderSettings {
    pub provider: Provider,
    pub api_key: Option<String>,
    pub nominatim_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Lookups in flight at once. Nominatim's usage policy asks for one.
    pub concurrency: usize,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        GeocoderSettings {
            provider: Provider::Nominatim,
            api_key: None,
            nominatim_url: "https://nominatim.openstreetmap.org".into(),
            user_agent: "town-meetings-map".into(),
            timeout_secs: 20,
            concurrency: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    /// Appended to addresses that carry no ", City" part. Empty disables it.
    pub default_locality: String,
    /// `[lat, lon]` used when no address could be placed.
    pub default_center: [f64; 2],
    pub zoom: u8,
    pub output: PathBuf,
    /// Where record text bodies are written as `<id>.txt`.
    pub description_dir: PathBuf,
    /// Public prefix for description links in popups. No links when unset.
    pub description_base_url: Option<String>,
}

impl Default for MapSettings {
    fn default() -> Self {
        MapSettings {
            default_locality: "Fortville, IN".into(),
            default_center: [39.7684, -86.1581],
            zoom: 12,
            output: PathBuf::from("static/meeting_map.html"),
            description_dir: PathBuf::from("descriptions"),
            description_base_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind: "127.0.0.1:5000".into(),
        }
    }
}

/// What a command is about to fetch; decides which settings must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workload {
    Agendas,
    Videos,
    /// Video records supplied locally; no channel access needed.
    LocalVideos,
}

impl Settings {
    /// Read `path` (or `meeting_map.toml` when present), then `MEETMAP_*` variables,
    /// e.g. `MEETMAP_GEOCODER__API_KEY`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let mut settings: Settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        settings.apply_legacy_env(|name| std::env::var(name).ok());
        Ok(settings)
    }

    /// Older deployments configure the Google key and the browser binary directly.
    fn apply_legacy_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if self.geocoder.api_key.is_none() {
            self.geocoder.api_key = var("GOOGLE_API_KEY").filter(|k| !k.is_empty());
        }
        if self.agenda.chrome_path.is_none() {
            self.agenda.chrome_path = var("GOOGLE_CHROME_BIN").map(PathBuf::from);
        }
    }

    pub fn validate(&self, workload: Workload) -> Result<(), ConfigError> {
        match self.geocoder.provider {
            Provider::Google if blank(&self.geocoder.api_key) => {
                return Err(ConfigError::MissingGeocoderKey)
            }
            Provider::Nominatim if self.geocoder.user_agent.trim().is_empty() => {
                return Err(ConfigError::MissingUserAgent)
            }
            _ => {}
        }
        if self.geocoder.concurrency == 0 {
            return Err(ConfigError::Zero("geocoder.concurrency"));
        }
        if self.geocoder.timeout_secs == 0 {
            return Err(ConfigError::Zero("geocoder.timeout_secs"));
        }

        match workload {
            Workload::Agendas => {
                if let Some(path) = &self.agenda.chrome_path {
                    if !path.exists() {
                        return Err(ConfigError::MissingChrome(path.clone()));
                    }
                }
            }
            Workload::Videos => {
                if blank(&self.video.channel_id) {
                    return Err(ConfigError::MissingChannel);
                }
                let v = &self.video;
                match v.auth {
                    AuthMode::Cookie if blank(&v.cookie) => {
                        return Err(ConfigError::MissingCredential("cookie", "cookie"))
                    }
                    AuthMode::ApiKey if blank(&v.api_key) => {
                        return Err(ConfigError::MissingCredential("apikey", "api_key"))
                    }
                    AuthMode::Bearer if blank(&v.access_token) => {
                        return Err(ConfigError::MissingCredential("bearer", "access_token"))
                    }
                    _ => {}
                }
                if v.max_videos == Some(0) {
                    return Err(ConfigError::Zero("video.max_videos"));
                }
            }
            Workload::LocalVideos => {}
        }
        Ok(())
    }
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_for_agendas() {
        assert_eq!(Settings::default().validate(Workload::Agendas), Ok(()));
    }

    #[test]
    fn google_needs_key() {
        let mut s = Settings::default();
        s.geocoder.provider = Provider::Google;
        assert_eq!(
            s.validate(Workload::Agendas),
            Err(ConfigError::MissingGeocoderKey)
        );
        s.geocoder.api_key = Some("  ".into());
        assert_eq!(
            s.validate(Workload::Agendas),
            Err(ConfigError::MissingGeocoderKey)
        );
        s.geocoder.api_key = Some("k".into());
        assert_eq!(s.validate(Workload::Agendas), Ok(()));
    }

    #[test]
    fn videos_need_channel_and_credentials() {
        let mut s = Settings::default();
        assert_eq!(s.validate(Workload::Videos), Err(ConfigError::MissingChannel));
        assert_eq!(s.validate(Workload::LocalVideos), Ok(()));

        s.video.channel_id = Some("UCfortville".into());
        assert_eq!(s.validate(Workload::Videos), Ok(()));

        s.video.auth = AuthMode::ApiKey;
        assert_eq!(
            s.validate(Workload::Videos),
            Err(ConfigError::MissingCredential("apikey", "api_key"))
        );
        s.video.api_key = Some("key".into());
        assert_eq!(s.validate(Workload::Videos), Ok(()));
    }

    #[test]
    fn zero_concurrency_rejected() {
        let mut s = Settings::default();
        s.geocoder.concurrency = 0;
        assert_eq!(
            s.validate(Workload::Agendas),
            Err(ConfigError::Zero("geocoder.concurrency"))
        );
    }

    #[test]
    fn missing_chrome_binary_rejected() {
        let mut s = Settings::default();
        s.agenda.chrome_path = Some(PathBuf::from("/nonexistent/chrome-binary"));
        assert!(matches!(
            s.validate(Workload::Agendas),
            Err(ConfigError::MissingChrome(_))
        ));
        assert_eq!(s.validate(Workload::LocalVideos), Ok(()));
    }

    #[test]
    fn legacy_env_fills_gaps_only() {
        let mut s = Settings::default();
        s.apply_legacy_env(|name| match name {
            "GOOGLE_API_KEY" => Some("legacy-key".into()),
            "GOOGLE_CHROME_BIN" => Some("/usr/bin/chromium".into()),
            _ => None,
        });
        assert_eq!(s.geocoder.api_key.as_deref(), Some("legacy-key"));
        assert_eq!(s.agenda.chrome_path, Some(PathBuf::from("/usr/bin/chromium")));

        let mut s = Settings::default();
        s.geocoder.api_key = Some("configured".into());
        s.apply_legacy_env(|_| Some("legacy".into()));
        assert_eq!(s.geocoder.api_key.as_deref(), Some("configured"));
    }

    #[test]
    fn reads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meeting_map.toml");
        std::fs::write(
            &path,
            "[map]\ndefault_locality = \"Greenfield, IN\"\nzoom = 14\n\n[geocoder]\nprovider = \"google\"\napi_key = \"abc\"\n",
        )
        .unwrap();
        let s = Settings::load(Some(&path)).unwrap();
        assert_eq!(s.map.default_locality, "Greenfield, IN");
        assert_eq!(s.map.zoom, 14);
        assert_eq!(s.geocoder.provider, Provider::Google);
        assert_eq!(s.map.default_center, [39.7684, -86.1581]);
    }
}
