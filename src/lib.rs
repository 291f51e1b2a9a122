//! # streetview-scraper
//!
//! Downloads Google Street View images at points sampled along the GRIP4
//! road network, organized by country.
//!
//! This library provides:
//! - Loading a country's roads from its GRIP4 region shapefile
//! - Sampling candidate points evenly along those roads
//! - Checking Street View availability through the metadata endpoint
//! - Downloading single images or multi-heading panoramas to disk
//! - An orchestrator and interactive console menu driving the whole scrape
//!
//! ## Example
//!
//! ```no_run
//! use streetview_scraper::{Coordinate, StreetView, Availability};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = StreetView::with_api_key("YOUR_API_KEY");
//!
//!     match client.check_availability(Coordinate::new(41.8982208, 12.4764804), 50).await? {
//!         Availability::Available(location) => println!("panorama {:?}", location.pano_id),
//!         Availability::Unavailable => println!("no imagery here"),
//!     }
//!
//!     Ok(())
//! }
//! ```

mod error;
mod metadata;
mod types;
pub mod config;
pub mod download;
pub mod menu;
pub mod regions;
pub mod roads;
pub mod sampler;
pub mod scrape;

pub use config::{Paths, ScrapeTarget, Settings};
pub use error::{Result, ScraperError};
pub use types::{
    AcceptedLocation, Availability, CaptureMode, Coordinate, Country, ImageOptions, ImageRecord,
    ImageRequest, RoadGeometry,
};

use reqwest::Client;
use std::future::Future;

/// The Street View operations the scraper depends on.
///
/// `StreetView` implements it against Google; tests substitute their own.
pub trait ImageryProvider {
    /// Look for imagery within `radius` metres of `point`.
    fn check_availability(
        &self,
        point: Coordinate,
        radius: u32,
    ) -> impl Future<Output = Result<Availability>>;

    /// Fetch the JPEG bytes for one image request.
    fn fetch_image(&self, request: &ImageRequest) -> impl Future<Output = Result<Vec<u8>>>;
}

/// Main client for interacting with the Street View Static API.
///
/// This client maintains a reusable HTTP client for efficient connection pooling.
#[derive(Clone)]
pub struct StreetView {
    client: Client,
    api_key: Option<String>,
}

impl StreetView {
    /// Creates a new StreetView client without an API key.
    ///
    /// Every request fails with `ScraperError::MissingApiKey` until a key is
    /// supplied through `with_api_key`.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            api_key: None,
        }
    }

    /// Creates a new StreetView client with a Google Maps API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: Some(api_key.into()),
        }
    }

    /// Creates a new StreetView client with a custom reqwest Client.
    ///
    /// This allows you to configure the HTTP client with custom settings
    /// such as proxies, timeouts, or custom headers.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use streetview_scraper::StreetView;
    /// # use reqwest::Client;
    /// # use std::time::Duration;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let custom_client = Client::builder()
    ///     .timeout(Duration::from_secs(60))
    ///     .build()?;
    /// let client = StreetView::with_client(custom_client, "YOUR_API_KEY");
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_client(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: Some(api_key.into()),
        }
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(ScraperError::MissingApiKey)
    }

    /// Check whether imagery exists near a coordinate.
    ///
    /// # Arguments
    ///
    /// * `point` - Coordinate to search around
    /// * `radius` - Search radius in metres (the API default is 50)
    pub async fn check_availability(&self, point: Coordinate, radius: u32) -> Result<Availability> {
        let api_key = self.api_key()?;
        metadata::check_availability(&self.client, point, radius, api_key).await
    }

    /// Fetch the JPEG bytes for one image request.
    ///
    /// Requests the panorama by id when known, otherwise by location.
    pub async fn fetch_image(&self, request: &ImageRequest) -> Result<Vec<u8>> {
        let api_key = self.api_key()?;
        metadata::fetch_image(&self.client, request, api_key).await
    }
}

impl Default for StreetView {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageryProvider for StreetView {
    async fn check_availability(&self, point: Coordinate, radius: u32) -> Result<Availability> {
        StreetView::check_availability(self, point, radius).await
    }

    async fn fetch_image(&self, request: &ImageRequest) -> Result<Vec<u8>> {
        StreetView::fetch_image(self, request).await
    }
}
