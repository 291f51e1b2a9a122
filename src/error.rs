use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for scraper operations.
pub type Result<T> = std::result::Result<T, ScraperError>;

/// Errors that can occur while scraping Street View imagery.
#[derive(Error, Debug)]
pub enum ScraperError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Failed to parse a file or response
    #[error("Failed to parse {0}")]
    ParseError(String),

    /// Invalid response from Google
    #[error("Invalid response from Google: {0}")]
    InvalidResponse(String),

    /// Google answered with an unexpected HTTP status
    #[error("Unexpected HTTP status {0}")]
    HttpStatus(u16),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// An input file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Shapefile could not be read
    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    /// Missing API key
    #[error("API key required. Set MAPS_API_KEY in .env or use Settings > Set API key.")]
    MissingApiKey,

    /// The Street View quota for this key is exhausted
    #[error("Street View quota exceeded")]
    QuotaExceeded,

    /// Google refused the request, usually because of the key
    #[error("Request denied by Google: {0}")]
    RequestDenied(String),

    /// No imagery exists for the requested view
    #[error("No imagery available for this request")]
    NoImagery,

    /// Country is not listed in the region index
    #[error("{0} not found in any region")]
    CountryNotFound(String),

    /// Region shapefile is not on disk
    #[error("Shapefile for {region} not found at {path}")]
    ShapefileMissing { region: String, path: PathBuf },

    /// The country filter left no roads in the region shapefile
    #[error("No roads for {0} in its region shapefile")]
    NoRoadsForCountry(String),
}

impl ScraperError {
    /// Whether the error only affects a single candidate or file.
    ///
    /// Everything else is a configuration or data error that should abort
    /// the run before scraping continues.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ScraperError::HttpError(_)
                | ScraperError::InvalidResponse(_)
                | ScraperError::HttpStatus(_)
                | ScraperError::IoError(_)
                | ScraperError::QuotaExceeded
                | ScraperError::RequestDenied(_)
                | ScraperError::NoImagery
        )
    }
}
