//! Station directory: resolves the initial station list from three tiers:
//! the remote radio-browser API, a local JSON file, then a built-in list.
//!
//! Each tier is tried once, in order.  A tier succeeds only when it yields a
//! non-empty list; any failure is logged and the next tier is tried.  The
//! built-in tier cannot fail, so `resolve()` always returns stations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::DirectoryConfig;
use crate::station::Station;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectorySource {
    Remote,
    Local,
    BuiltIn,
}

impl DirectorySource {
    pub fn label(self) -> &'static str {
        match self {
            Self::Remote => "directory",
            Self::Local => "local",
            Self::BuiltIn => "built-in",
        }
    }
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("bad directory url: {0}")]
    Url(String),
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a station array: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no stations returned")]
    Empty,
}

/// Outcome of `StationDirectory::resolve`.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub stations: Vec<Station>,
    pub source: DirectorySource,
}

/// One record of the radio-browser `stations/search` response.  Only the
/// fields we map are declared; everything else is ignored.  Missing or
/// `null` fields map to empty strings.
#[derive(Debug, Deserialize)]
struct ApiStation {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    url_resolved: Option<String>,
    #[serde(default)]
    favicon: Option<String>,
}

impl From<ApiStation> for Station {
    fn from(s: ApiStation) -> Self {
        Station {
            name: s.name.unwrap_or_default(),
            url: s.url_resolved.unwrap_or_default(),
            logo: s.favicon.filter(|f| !f.is_empty()),
        }
    }
}

pub fn parse_api_response(body: &str) -> Result<Vec<Station>, DirectoryError> {
    let records: Vec<ApiStation> = serde_json::from_str(body)?;
    if records.is_empty() {
        return Err(DirectoryError::Empty);
    }
    Ok(records.into_iter().map(Station::from).collect())
}

pub fn parse_local_stations(body: &str) -> Result<Vec<Station>, DirectoryError> {
    let stations: Vec<Station> = serde_json::from_str(body)?;
    if stations.is_empty() {
        return Err(DirectoryError::Empty);
    }
    Ok(stations)
}

/// Last-resort list used when both the API and the local file fail.
pub fn built_in_stations() -> Vec<Station> {
    vec![
        Station::new("DIGI FM", "https://edge126.rcs-rds.ro/digifm/digifm.mp3"),
        Station::new("Europa FM", "https://astreaming.edi.ro:8443/EuropaFM_aac"),
        Station::new("Radio ZU", "https://live.romaniaradio.ro/zu-bucuresti"),
    ]
}

pub struct StationDirectory {
    client: reqwest::Client,
    api_url: String,
    country: String,
    local_path: PathBuf,
}

impl StationDirectory {
    pub fn new(config: &DirectoryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            country: config.country.clone(),
            local_path: config.local_path.clone(),
        }
    }

    pub async fn fetch_remote(&self) -> Result<Vec<Station>, DirectoryError> {
        let url = reqwest::Url::parse_with_params(&self.api_url, &[("country", &self.country)])
            .map_err(|e| DirectoryError::Url(e.to_string()))?;
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_api_response(&body)
    }

    pub async fn read_local(&self) -> Result<Vec<Station>, DirectoryError> {
        let body = tokio::fs::read_to_string(&self.local_path).await?;
        parse_local_stations(&body)
    }

    pub async fn resolve(&self) -> Resolved {
        match self.fetch_remote().await {
            Ok(stations) => {
                info!("Loaded {} stations from API", stations.len());
                return Resolved {
                    stations,
                    source: DirectorySource::Remote,
                };
            }
            Err(e) => warn!("Station API failed, trying local fallback: {}", e),
        }

        match self.read_local().await {
            Ok(stations) => {
                info!(
                    "Loaded {} stations from local fallback {}",
                    stations.len(),
                    self.local_path.display()
                );
                return Resolved {
                    stations,
                    source: DirectorySource::Local,
                };
            }
            Err(e) => error!(
                "Local fallback {} failed, using built-in stations: {}",
                self.local_path.display(),
                e
            ),
        }

        Resolved {
            stations: built_in_stations(),
            source: DirectorySource::BuiltIn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_records_map_to_stations() {
        let body = r#"[
            {"name":"Kiss FM","url_resolved":"https://kiss/live","favicon":"https://kiss/icon.png","votes":12},
            {"name":"Magic FM","url_resolved":"https://magic/live","favicon":""}
        ]"#;
        let stations = parse_api_response(body).unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].url, "https://kiss/live");
        assert_eq!(stations[0].logo.as_deref(), Some("https://kiss/icon.png"));
        assert_eq!(stations[1].logo, None);
    }

    #[test]
    fn test_null_fields_do_not_fail_the_response() {
        let body = r#"[
            {"name":null,"url_resolved":"https://anon/live","favicon":null},
            {"name":"Kiss FM","url_resolved":null}
        ]"#;
        let stations = parse_api_response(body).unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0], Station::new("", "https://anon/live"));
        assert_eq!(stations[1], Station::new("Kiss FM", ""));
    }

    #[test]
    fn test_empty_or_non_array_is_failure() {
        assert!(matches!(parse_api_response("[]"), Err(DirectoryError::Empty)));
        assert!(matches!(
            parse_api_response(r#"{"error":"rate limited"}"#),
            Err(DirectoryError::Parse(_))
        ));
        assert!(matches!(
            parse_local_stations("[]"),
            Err(DirectoryError::Empty)
        ));
    }

    #[test]
    fn test_built_in_order() {
        let names: Vec<String> = built_in_stations().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["DIGI FM", "Europa FM", "Radio ZU"]);
    }
}
