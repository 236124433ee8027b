use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::platform;
use super::station::Station;
use super::theme::Theme;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub visualizer: VisualizerConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub stations: StationsConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Where the initial station list comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// radio-browser search endpoint; `country` is appended as a query param.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_country")]
    pub country: String,
    /// Local JSON fallback (`[{name, url, logo?}]`), relative to the cwd.
    #[serde(default = "default_local_path")]
    pub local_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Initial volume of the output before persisted settings are applied.
    #[serde(default = "default_volume")]
    pub default_volume: f32,
    #[serde(default = "default_fade_ms")]
    pub fade_ms: u64,
    #[serde(default = "default_metadata_poll_secs")]
    pub metadata_poll_secs: u64,
    /// Fade-in target used when the pre-switch volume was 0.
    #[serde(default = "default_fallback_fade_target")]
    pub fallback_fade_target: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_start_delay_ms")]
    pub start_delay_ms: u64,
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
}

/// Stations shown before the directory has resolved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StationsConfig {
    #[serde(default)]
    pub initial: Vec<Station>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Key/value file holding `radio-volume` and `radio-muted`.
    #[serde(default = "default_settings_file")]
    pub settings_file: PathBuf,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            country: default_country(),
            local_path: default_local_path(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_volume: default_volume(),
            fade_ms: default_fade_ms(),
            metadata_poll_secs: default_metadata_poll_secs(),
            fallback_fade_target: default_fallback_fade_target(),
        }
    }
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            start_delay_ms: default_start_delay_ms(),
            fft_size: default_fft_size(),
            smoothing: default_smoothing(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            settings_file: default_settings_file(),
        }
    }
}

fn default_api_url() -> String {
    "https://de1.api.radio-browser.info/json/stations/search".to_string()
}

fn default_country() -> String {
    "Romania".to_string()
}

fn default_local_path() -> PathBuf {
    PathBuf::from("utils").join("stations.json")
}

fn default_volume() -> f32 {
    1.0
}

fn default_fade_ms() -> u64 {
    300
}

fn default_metadata_poll_secs() -> u64 {
    5
}

fn default_fallback_fade_target() -> f32 {
    0.8
}

fn default_true() -> bool {
    true
}

fn default_start_delay_ms() -> u64 {
    1000
}

fn default_fft_size() -> usize {
    64
}

fn default_smoothing() -> f32 {
    0.7
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8990
}

fn default_settings_file() -> PathBuf {
    platform::data_dir().join("settings.json")
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Reads `path`, writing a default config there first if it is missing.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.http.enabled);
        assert_eq!(config.http.port, 8990);
        assert_eq!(config.http.bind_address, "127.0.0.1");
        assert!(config.directory.api_url.starts_with("https://"));
        assert_eq!(config.directory.country, "Romania");
        assert_eq!(config.player.fade_ms, 300);
        assert_eq!(config.player.metadata_poll_secs, 5);
        assert_eq!(config.visualizer.fft_size, 64);
        assert!(config.paths.settings_file.ends_with("settings.json"));
        assert!(config.ui.theme.is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [ui]
            theme = "neon"

            [[stations.initial]]
            name = "Kiss FM"
            url = "https://kiss/live"
            "#,
        )
        .unwrap();
        assert_eq!(config.ui.theme, Some(Theme::Neon));
        assert_eq!(config.stations.initial.len(), 1);
        assert_eq!(config.player.fallback_fade_target, 0.8);
        assert!(config.visualizer.enabled);
    }

    #[test]
    fn test_load_from_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("radio").join("config.toml");

        let created = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created.player.default_volume, 1.0);

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.directory.api_url, created.directory.api_url);
        assert_eq!(reloaded.http.port, created.http.port);
    }
}
