use crate::config::Paths;
use crate::error::{Result, ScraperError};
use crate::types::{sanitize_file_component, Country};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A country listed under a region, optionally with its GRIP4 `GP_RCY` code.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CountryEntry {
    Name(String),
    Coded { name: String, code: u16 },
}

impl CountryEntry {
    pub fn name(&self) -> &str {
        match self {
            CountryEntry::Name(name) => name,
            CountryEntry::Coded { name, .. } => name,
        }
    }

    pub fn code(&self) -> Option<u16> {
        match self {
            CountryEntry::Name(_) => None,
            CountryEntry::Coded { code, .. } => Some(*code),
        }
    }
}

/// Mapping of GRIP4 regions to the countries they contain.
///
/// Read from `regions_to_countries.json`:
///
/// ```json
/// { "Region 1": ["Canada", { "name": "United States", "code": 840 }] }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct RegionIndex {
    regions: BTreeMap<String, Vec<CountryEntry>>,
}

impl RegionIndex {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ScraperError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
            .map_err(|e| ScraperError::ParseError(format!("{}: {e}", path.display())))
    }

    pub fn from_json(text: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Find the region and entry for a country name (case-insensitive).
    pub fn lookup(&self, country: &str) -> Option<(&str, &CountryEntry)> {
        let wanted = country.trim();
        self.regions.iter().find_map(|(region, entries)| {
            entries
                .iter()
                .find(|entry| entry.name().eq_ignore_ascii_case(wanted))
                .map(|entry| (region.as_str(), entry))
        })
    }

    /// Resolve a country name into a `Country` with its shapefile and output directory.
    ///
    /// Fails if the country is not indexed or its region shapefile is not on disk.
    pub fn resolve(&self, country: &str, paths: &Paths) -> Result<Country> {
        let (region, entry) = self
            .lookup(country)
            .ok_or_else(|| ScraperError::CountryNotFound(country.trim().to_string()))?;

        let shapefile = region_shapefile_path(&paths.grip4_dir, region).ok_or_else(|| {
            ScraperError::ParseError(format!("region name {region:?}, expected \"Region <N>\""))
        })?;

        if !shapefile.is_file() {
            return Err(ScraperError::ShapefileMissing {
                region: region.to_string(),
                path: shapefile,
            });
        }

        let name = entry.name().to_string();
        Ok(Country {
            output_dir: paths.download_dir.join(sanitize_file_component(&name)),
            name,
            region: region.to_string(),
            shapefile,
            code: entry.code(),
        })
    }
}

/// Path of a region's shapefile in the GRIP4 distribution layout.
///
/// `"Region 3"` maps to `<grip4>/GRIP4_Region3_vector_shp/GRIP4_region3.shp`.
pub fn region_shapefile_path(grip4_dir: &Path, region: &str) -> Option<PathBuf> {
    let number: u8 = region.trim().strip_prefix("Region")?.trim().parse().ok()?;
    Some(
        grip4_dir
            .join(format!("GRIP4_Region{number}_vector_shp"))
            .join(format!("GRIP4_region{number}.shp")),
    )
}
