use crate::error::{Result, ScraperError};
use crate::types::{Coordinate, Country, RoadGeometry};
use shapefile::dbase::{FieldValue, Record};
use shapefile::{Reader, Shape};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// GRIP4 attribute holding the numeric country code of a road.
pub const COUNTRY_FIELD: &str = "GP_RCY";

/// A road read from a region shapefile, with its country code.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadRecord {
    pub country_code: Option<u16>,
    pub geometry: RoadGeometry,
}

/// Loads road geometries for countries, caching each region shapefile after
/// its first read.
#[derive(Debug, Default)]
pub struct RoadLoader {
    cache: HashMap<PathBuf, Arc<Vec<RoadRecord>>>,
}

impl RoadLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Roads belonging to `country`.
    ///
    /// Countries without a code get every road of their region.
    pub fn load(&mut self, country: &Country) -> Result<Vec<RoadGeometry>> {
        let region = self.region(country)?;

        let roads: Vec<RoadGeometry> = region
            .iter()
            .filter(|road| country.code.is_none() || road.country_code == country.code)
            .map(|road| road.geometry.clone())
            .collect();

        if roads.is_empty() {
            return Err(ScraperError::NoRoadsForCountry(country.name.clone()));
        }

        info!(country = %country.name, roads = roads.len(), "loaded roads");
        Ok(roads)
    }

    fn region(&mut self, country: &Country) -> Result<Arc<Vec<RoadRecord>>> {
        if let Some(cached) = self.cache.get(&country.shapefile) {
            debug!(region = %country.region, "using cached roads");
            return Ok(Arc::clone(cached));
        }

        if !country.shapefile.is_file() {
            return Err(ScraperError::ShapefileMissing {
                region: country.region.clone(),
                path: country.shapefile.clone(),
            });
        }

        let records = Arc::new(read_region(&country.shapefile)?);
        self.cache
            .insert(country.shapefile.clone(), Arc::clone(&records));
        Ok(records)
    }
}

/// Read every line road of a region shapefile.
#[instrument]
pub fn read_region(path: &Path) -> Result<Vec<RoadRecord>> {
    info!("loading region shapefile");
    let mut reader = Reader::from_path(path)?;

    let mut roads = Vec::new();
    let mut skipped = 0usize;
    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;
        match road_from_shape(&shape) {
            Some(geometry) => roads.push(RoadRecord {
                country_code: country_code(&record),
                geometry,
            }),
            None => skipped += 1,
        }
    }

    info!(roads = roads.len(), skipped, "read region shapefile");
    Ok(roads)
}

/// Convert a line shape into a road; other shape kinds yield `None`.
pub fn road_from_shape(shape: &Shape) -> Option<RoadGeometry> {
    let parts: Vec<Vec<Coordinate>> = match shape {
        Shape::Polyline(line) => convert_parts(line.parts(), |p| (p.x, p.y)),
        Shape::PolylineM(line) => convert_parts(line.parts(), |p| (p.x, p.y)),
        Shape::PolylineZ(line) => convert_parts(line.parts(), |p| (p.x, p.y)),
        _ => return None,
    };

    if parts.is_empty() {
        None
    } else {
        Some(RoadGeometry::new(parts))
    }
}

fn convert_parts<P>(parts: &[Vec<P>], xy: impl Fn(&P) -> (f64, f64)) -> Vec<Vec<Coordinate>> {
    parts
        .iter()
        .map(|part| {
            part.iter()
                .map(|point| {
                    let (x, y) = xy(point);
                    Coordinate::new(y, x)
                })
                .collect::<Vec<_>>()
        })
        .filter(|part| !part.is_empty())
        .collect()
}

/// The record's `GP_RCY` value, whatever numeric type the DBF stores it as.
pub fn country_code(record: &Record) -> Option<u16> {
    let value = match record.get(COUNTRY_FIELD)? {
        FieldValue::Numeric(Some(v)) => *v,
        FieldValue::Double(v) => *v,
        FieldValue::Float(Some(v)) => f64::from(*v),
        FieldValue::Integer(v) => f64::from(*v),
        FieldValue::Character(Some(s)) => s.trim().parse().ok()?,
        _ => return None,
    };

    if value.is_finite() && (0.0..=f64::from(u16::MAX)).contains(&value) {
        Some(value.round() as u16)
    } else {
        None
    }
}
