use crate::types::{CaptureMode, ImageOptions};
use std::env;
use std::path::{Path, PathBuf};

pub const API_KEY_VAR: &str = "MAPS_API_KEY";

const DEFAULT_SAMPLES_PER_COUNTRY: usize = 400;
const DEFAULT_WORKERS: usize = 5;
const DEFAULT_SEARCH_RADIUS: u32 = 50;
const DEFAULT_MAX_ROUNDS: usize = 5;

/// Filesystem locations used by a scrape.
#[derive(Debug, Clone, PartialEq)]
pub struct Paths {
    /// Root of the per-country download directories
    pub download_dir: PathBuf,
    /// Directory holding the GRIP4 region shapefiles
    pub grip4_dir: PathBuf,
    /// Region to countries JSON index
    pub regions_file: PathBuf,
    /// One country name per line, for mass scrapes
    pub country_list: PathBuf,
}

impl Paths {
    /// Default layout relative to `root`.
    pub fn rooted(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            download_dir: root.join("Downloads"),
            grip4_dir: root.join("GRIP4"),
            regions_file: root.join("regions_to_countries.json"),
            country_list: root.join("countries_to_scrape.txt"),
        }
    }

    /// Default layout in the working directory, with `SCRAPER_*` overrides.
    pub fn from_env() -> Self {
        let defaults = Self::rooted(".");
        Self {
            download_dir: env_path("SCRAPER_DOWNLOAD_DIR").unwrap_or(defaults.download_dir),
            grip4_dir: env_path("SCRAPER_GRIP4_DIR").unwrap_or(defaults.grip4_dir),
            regions_file: env_path("SCRAPER_REGIONS_FILE").unwrap_or(defaults.regions_file),
            country_list: env_path("SCRAPER_COUNTRY_LIST").unwrap_or(defaults.country_list),
        }
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::rooted(".")
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Whether a scrape covers one country or every country in the list file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeTarget {
    SingleCountry,
    CountryList,
}

/// User-adjustable scrape settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_key: Option<String>,
    pub target: ScrapeTarget,
    pub capture: CaptureMode,
    /// Locations to collect per country
    pub samples_per_country: usize,
    /// Candidates processed concurrently
    pub workers: usize,
    pub image: ImageOptions,
    /// Metadata search radius in metres
    pub search_radius: u32,
    /// Sampling rounds per country before giving up on the target
    pub max_rounds: usize,
    /// Fixed sampler seed for reproducible runs
    pub seed: Option<u64>,
}

impl Settings {
    pub fn new() -> Self {
        Self {
            api_key: None,
            target: ScrapeTarget::SingleCountry,
            capture: CaptureMode::Panorama,
            samples_per_country: DEFAULT_SAMPLES_PER_COUNTRY,
            workers: DEFAULT_WORKERS,
            image: ImageOptions::new(),
            search_radius: DEFAULT_SEARCH_RADIUS,
            max_rounds: DEFAULT_MAX_ROUNDS,
            seed: None,
        }
    }

    /// Defaults plus the API key and seed from the environment.
    ///
    /// Call `dotenv::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Self {
        let api_key = env::var(API_KEY_VAR)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        let seed = env::var("SCRAPER_SEED").ok().and_then(|s| s.trim().parse().ok());

        Self {
            api_key,
            seed,
            ..Self::new()
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::new();
        assert_eq!(settings.samples_per_country, 400);
        assert_eq!(settings.workers, 5);
        assert_eq!(settings.capture, CaptureMode::Panorama);
        assert_eq!(settings.target, ScrapeTarget::SingleCountry);
        assert!(!settings.has_api_key());
    }

    #[test]
    fn test_rooted_paths() {
        let paths = Paths::rooted("/data");
        assert_eq!(paths.download_dir, Path::new("/data/Downloads"));
        assert_eq!(paths.grip4_dir, Path::new("/data/GRIP4"));
        assert_eq!(paths.country_list, Path::new("/data/countries_to_scrape.txt"));
    }

    #[test]
    fn test_empty_key_is_missing() {
        let settings = Settings {
            api_key: Some(String::new()),
            ..Settings::new()
        };
        assert!(!settings.has_api_key());
    }
}
