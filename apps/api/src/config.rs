use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::models::candidate::Thresholds;
use crate::tracker::TrackerSettings;

/// Application configuration loaded from environment variables.
/// Every variable has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Folder holding one `<Position>_Candidates` directory per job position.
    pub base_folder: PathBuf,
    pub port: u16,
    pub rust_log: String,
    pub strict_load: bool,
    pub name_vendor_fallback: bool,
    pub similarity_threshold: f64,
    pub average_threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        Config {
            base_folder: PathBuf::from("./candidates"),
            port: 8080,
            rust_log: "info".to_string(),
            strict_load: false,
            name_vendor_fallback: true,
            similarity_threshold: thresholds.similarity,
            average_threshold: thresholds.average,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Config::default();
        Ok(Config {
            base_folder: std::env::var("TRACKER_BASE_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(defaults.base_folder),
            port: parse_env("PORT", defaults.port)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or(defaults.rust_log),
            strict_load: parse_env("TRACKER_STRICT_LOAD", defaults.strict_load)?,
            name_vendor_fallback: parse_env(
                "TRACKER_NAME_VENDOR_FALLBACK",
                defaults.name_vendor_fallback,
            )?,
            similarity_threshold: parse_threshold(
                "SHORTLIST_SIMILARITY_THRESHOLD",
                defaults.similarity_threshold,
            )?,
            average_threshold: parse_threshold(
                "SHORTLIST_AVERAGE_THRESHOLD",
                defaults.average_threshold,
            )?,
        })
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            similarity: self.similarity_threshold,
            average: self.average_threshold,
        }
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            strict_load: self.strict_load,
            name_vendor_fallback: self.name_vendor_fallback,
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn parse_threshold(key: &str, default: f64) -> Result<f64> {
    let value = parse_env(key, default)?;
    anyhow::ensure!(
        (0.0..=1.0).contains(&value),
        "Environment variable '{key}' must be between 0 and 1, got {value}"
    );
    Ok(value)
}
