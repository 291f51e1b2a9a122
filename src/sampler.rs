use crate::types::{Coordinate, RoadGeometry};
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Failed draws tolerated per requested point before the sampler gives up.
const MAX_DRAWS_PER_POINT: usize = 16;

/// Lazily samples candidate points along road geometries.
///
/// Segments are chosen with probability proportional to their length, so the
/// points are spread evenly over the network. The sampler never yields more
/// than `count` points and never yields the same point twice; when the roads
/// cannot provide that many distinct points it ends early.
pub struct PointSampler<R> {
    mode: Mode,
    rng: R,
    remaining: usize,
    draws_left: usize,
    seen: HashSet<(u64, u64)>,
}

enum Mode {
    Segments {
        segments: Vec<(Coordinate, Coordinate)>,
        weights: WeightedIndex<f64>,
    },
    /// Every segment has zero length, so only the vertices are candidates.
    Vertices(Vec<Coordinate>),
}

impl<R: Rng> PointSampler<R> {
    pub fn new(roads: &[RoadGeometry], count: usize, mut rng: R) -> Self {
        let segments: Vec<(Coordinate, Coordinate)> = roads
            .iter()
            .flat_map(|road| road.segments())
            .filter(|(a, b)| a.haversine_distance(b) > 0.0)
            .collect();
        let lengths: Vec<f64> = segments
            .iter()
            .map(|(a, b)| a.haversine_distance(b))
            .collect();

        let mode = match WeightedIndex::new(&lengths) {
            Ok(weights) if !segments.is_empty() => Mode::Segments { segments, weights },
            _ => {
                let mut vertices = distinct(roads.iter().flat_map(|road| road.vertices()).copied());
                vertices.shuffle(&mut rng);
                Mode::Vertices(vertices)
            }
        };

        Self {
            mode,
            rng,
            remaining: count,
            draws_left: count.saturating_mul(MAX_DRAWS_PER_POINT),
            seen: HashSet::new(),
        }
    }

    fn draw(&mut self) -> Option<Coordinate> {
        match &mut self.mode {
            Mode::Segments { segments, weights } => {
                let (a, b) = segments[weights.sample(&mut self.rng)];
                let t: f64 = self.rng.gen();
                Some(a.lerp(&b, t))
            }
            Mode::Vertices(vertices) => vertices.pop(),
        }
    }
}

impl<R: Rng> Iterator for PointSampler<R> {
    type Item = Coordinate;

    fn next(&mut self) -> Option<Coordinate> {
        while self.remaining > 0 && self.draws_left > 0 {
            self.draws_left -= 1;
            let point = self.draw()?;
            if self.seen.insert(key(&point)) {
                self.remaining -= 1;
                return Some(point);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

fn key(point: &Coordinate) -> (u64, u64) {
    (point.lat.to_bits(), point.lon.to_bits())
}

fn distinct(points: impl Iterator<Item = Coordinate>) -> Vec<Coordinate> {
    let mut seen = HashSet::new();
    points.filter(|p| seen.insert(key(p))).collect()
}
