use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named, playable stream entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Station {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

impl Station {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            logo: None,
        }
    }

    pub fn with_logo(mut self, logo: impl Into<String>) -> Self {
        self.logo = Some(logo.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddStationError {
    #[error("Name and URL are required!")]
    MissingField,
}

/// Raw input from the add-station form (or the HTTP API), validated before
/// it becomes a [`Station`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub logo: String,
}

impl NewStation {
    pub fn validate(self) -> Result<Station, AddStationError> {
        if self.name.is_empty() || self.url.is_empty() {
            return Err(AddStationError::MissingField);
        }
        let logo = if self.logo.is_empty() {
            None
        } else {
            Some(self.logo)
        };
        Ok(Station {
            name: self.name,
            url: self.url,
            logo,
        })
    }
}

/// Indices of stations whose name contains `query`, case-insensitively.
/// An empty query keeps every station.
pub fn filter_stations(stations: &[Station], query: &str) -> Vec<usize> {
    let needle = query.to_lowercase();
    stations
        .iter()
        .enumerate()
        .filter(|(_, s)| needle.is_empty() || s.name.to_lowercase().contains(&needle))
        .map(|(i, _)| i)
        .collect()
}
