use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const EARTH_RADIUS_METERS: f64 = 6_371_008.8;
const MAX_IMAGE_SIDE: u32 = 640;

/// GPS location with latitude and longitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude coordinate
    pub lat: f64,
    /// Longitude coordinate
    #[serde(rename = "lng")]
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to `other` in metres.
    pub fn haversine_distance(&self, other: &Coordinate) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();

        let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
    }

    /// Linear interpolation towards `other`, `t` in `[0, 1]`.
    pub fn lerp(&self, other: &Coordinate, t: f64) -> Coordinate {
        Coordinate {
            lat: self.lat + (other.lat - self.lat) * t,
            lon: self.lon + (other.lon - self.lon) * t,
        }
    }
}

/// A country to scrape, resolved against the region index.
#[derive(Debug, Clone, PartialEq)]
pub struct Country {
    /// Country name as given by the user or the country list
    pub name: String,
    /// GRIP4 region containing the country
    pub region: String,
    /// Path of the region shapefile
    pub shapefile: PathBuf,
    /// GRIP4 `GP_RCY` country code used to filter the region's roads
    pub code: Option<u16>,
    /// Directory images for this country are written to
    pub output_dir: PathBuf,
}

/// A road made of one or more polyline parts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoadGeometry {
    pub parts: Vec<Vec<Coordinate>>,
}

impl RoadGeometry {
    pub fn new(parts: Vec<Vec<Coordinate>>) -> Self {
        Self { parts }
    }

    /// A single-part road.
    pub fn line(vertices: Vec<Coordinate>) -> Self {
        Self {
            parts: vec![vertices],
        }
    }

    /// Consecutive vertex pairs of every part.
    pub fn segments(&self) -> impl Iterator<Item = (Coordinate, Coordinate)> + '_ {
        self.parts
            .iter()
            .flat_map(|part| part.windows(2).map(|pair| (pair[0], pair[1])))
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Coordinate> {
        self.parts.iter().flatten()
    }
}

/// A candidate confirmed to have Street View imagery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedLocation {
    /// Panorama identifier, when the provider reports one
    pub pano_id: Option<String>,
    /// True coordinate of the panorama
    pub location: Coordinate,
    /// Capture date in YYYY-MM format (optional)
    pub date: Option<String>,
}

impl AcceptedLocation {
    /// File name stem for this location's images.
    ///
    /// The panorama id is preferred so two candidates that snap to the same
    /// panorama share file names.
    pub fn identifier(&self) -> String {
        match &self.pano_id {
            Some(id) => sanitize_file_component(id),
            None => format!("{}_{}", self.location.lat, self.location.lon),
        }
    }
}

/// Result of an availability check.
#[derive(Debug, Clone, PartialEq)]
pub enum Availability {
    Available(AcceptedLocation),
    Unavailable,
}

/// Whether each location yields one image or a set around the panorama.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// One image per heading in `ImageOptions::headings`
    Panorama,
    /// A single image at the heading offset
    Single,
}

/// Options for the requested Street View images.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageOptions {
    /// Image width (max 640)
    pub width: u32,
    /// Image height (max 640)
    pub height: u32,
    /// Field of view in degrees (10-120, default 120)
    pub fov: u16,
    /// Camera pitch in degrees (-90 to 90)
    pub pitch: i16,
    /// Heading of the first image in degrees
    pub heading_offset: u16,
    /// Number of evenly spaced headings in panorama mode
    pub heading_count: u16,
}

impl ImageOptions {
    /// Create default image options: 640x640, fov 120, four headings from north.
    pub fn new() -> Self {
        Self {
            width: MAX_IMAGE_SIDE,
            height: MAX_IMAGE_SIDE,
            fov: 120,
            pitch: 0,
            heading_offset: 0,
            heading_count: 4,
        }
    }

    /// Set the image size, clamped to the API maximum.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width.clamp(1, MAX_IMAGE_SIDE);
        self.height = height.clamp(1, MAX_IMAGE_SIDE);
        self
    }

    /// Set the field of view (10-120).
    pub fn fov(mut self, fov: u16) -> Self {
        self.fov = fov.clamp(10, 120);
        self
    }

    /// Set the pitch (-90 to 90).
    pub fn pitch(mut self, pitch: i16) -> Self {
        self.pitch = pitch.clamp(-90, 90);
        self
    }

    /// Set the heading of the first image.
    pub fn heading_offset(mut self, heading: u16) -> Self {
        self.heading_offset = heading % 360;
        self
    }

    /// Set how many headings a panorama is made of (1-360).
    pub fn heading_count(mut self, count: u16) -> Self {
        self.heading_count = count.clamp(1, 360);
        self
    }

    /// Headings requested for one location in the given mode.
    pub fn headings(&self, mode: CaptureMode) -> Vec<u16> {
        match mode {
            CaptureMode::Single => vec![self.heading_offset],
            CaptureMode::Panorama => {
                let count = u32::from(self.heading_count.max(1));
                (0..count)
                    .map(|i| ((u32::from(self.heading_offset) + i * 360 / count) % 360) as u16)
                    .collect()
            }
        }
    }
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// A single image to fetch and where to save it.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub location: AcceptedLocation,
    /// Camera heading in degrees (0-359)
    pub heading: u16,
    pub fov: u16,
    pub pitch: i16,
    pub width: u32,
    pub height: u32,
    pub output_path: PathBuf,
}

/// A written image, kept for the end-of-run report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub date: Option<String>,
    pub pano_id: Option<String>,
    pub location: Coordinate,
    pub heading: u16,
    pub file_name: String,
}

/// Replace characters that are not safe in a single path component.
pub fn sanitize_file_component(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}
