use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Site language of the event map selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Lv,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Language::En => "en",
            Language::Lv => "lv",
        })
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Language::En),
            "lv" => Ok(Language::Lv),
            other => Err(format!("unknown language {other:?}")),
        }
    }
}

/// Race distance whose course document should be shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
pub enum RouteDistance {
    #[default]
    #[serde(rename = "42km")]
    Marathon,
    #[serde(rename = "21km")]
    HalfMarathon,
    #[serde(rename = "10km")]
    TenKm,
    #[serde(rename = "6km")]
    SixKm,
    #[serde(rename = "mile")]
    Mile,
}

impl RouteDistance {
    pub const ALL: [RouteDistance; 5] = [
        RouteDistance::Marathon,
        RouteDistance::HalfMarathon,
        RouteDistance::TenKm,
        RouteDistance::SixKm,
        RouteDistance::Mile,
    ];
}

impl fmt::Display for RouteDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RouteDistance::Marathon => "42km",
            RouteDistance::HalfMarathon => "21km",
            RouteDistance::TenKm => "10km",
            RouteDistance::SixKm => "6km",
            RouteDistance::Mile => "mile",
        })
    }
}

impl FromStr for RouteDistance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "42km" => Ok(RouteDistance::Marathon),
            "21km" => Ok(RouteDistance::HalfMarathon),
            "10km" => Ok(RouteDistance::TenKm),
            "6km" => Ok(RouteDistance::SixKm),
            "mile" => Ok(RouteDistance::Mile),
            other => Err(format!("unknown route distance {other:?}")),
        }
    }
}

fn default_fetch_timeout() -> u64 {
    30
}

/// Deserialized from the JSON config file given on the command line.
#[derive(Debug, Clone, Deserialize)]
pub struct MapConfig {
    /// Document URL per language and route distance.
    pub sources: HashMap<Language, HashMap<RouteDistance, String>>,
    /// Fallback for selections the sources table does not cover.
    #[serde(default)]
    pub default_url: Option<String>,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

impl MapConfig {
    /// The document URL for one selection. Selections without a table
    /// entry fall back to `default_url`.
    pub fn url_for(&self, language: Language, distance: RouteDistance) -> Option<&str> {
        self.sources
            .get(&language)
            .and_then(|by_distance| by_distance.get(&distance))
            .or(self.default_url.as_ref())
            .map(String::as_str)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
