use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, Polyline, Writer};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use streetview_scraper::regions::{region_shapefile_path, RegionIndex};
use streetview_scraper::roads::RoadLoader;
use streetview_scraper::scrape::{read_country_list, Scraper};
use streetview_scraper::{
    AcceptedLocation, Availability, CaptureMode, Coordinate, ImageRequest, ImageryProvider, Paths,
    Result, ScraperError, Settings,
};

const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

const REGIONS: &str = r#"{
    "Region 1": [
        {"name": "Alpha", "code": 1},
        {"name": "Beta", "code": 2},
        {"name": "Delta", "code": 3},
        {"name": "Ocean", "code": 4}
    ],
    "Region 2": ["Gamma"]
}"#;

/// Imagery everywhere north of the equator, one panorama per point.
#[derive(Clone, Default)]
struct FakeProvider {
    fetches: Arc<AtomicUsize>,
}

impl ImageryProvider for FakeProvider {
    async fn check_availability(&self, point: Coordinate, _radius: u32) -> Result<Availability> {
        if point.lat < 0.0 {
            return Ok(Availability::Unavailable);
        }
        Ok(Availability::Available(AcceptedLocation {
            pano_id: Some(format!("{:x}-{:x}", point.lat.to_bits(), point.lon.to_bits())),
            location: point,
            date: Some("2020-01".to_string()),
        }))
    }

    async fn fetch_image(&self, _request: &ImageRequest) -> Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(JPEG.to_vec())
    }
}

fn write_region(path: &Path, roads: &[(u16, Vec<(f64, f64)>)]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let table = TableWriterBuilder::new()
        .add_numeric_field(FieldName::try_from("GP_RCY").unwrap(), 10, 0);
    let mut writer = Writer::from_path(path, table).unwrap();

    for (code, vertices) in roads {
        let line = Polyline::new(
            vertices
                .iter()
                .map(|&(lat, lon)| Point::new(lon, lat))
                .collect(),
        );
        let mut record = Record::default();
        record.insert("GP_RCY".to_string(), FieldValue::Numeric(Some(f64::from(*code))));
        writer.write_shape_and_record(&line, &record).unwrap();
    }
    drop(writer);
}

fn setup(root: &Path) -> Paths {
    let paths = Paths::rooted(root);
    std::fs::write(&paths.regions_file, REGIONS).unwrap();
    std::fs::write(&paths.country_list, "Alpha\n\nBeta\n").unwrap();

    let region1 = region_shapefile_path(&paths.grip4_dir, "Region 1").unwrap();
    write_region(
        &region1,
        &[
            (1, vec![(10.0, 10.0), (10.1, 10.1)]),
            (1, vec![(10.2, 10.0), (10.25, 10.05), (10.3, 10.0)]),
            (2, vec![(20.0, 20.0), (20.1, 20.05)]),
            (4, vec![(-30.0, -20.0), (-30.1, -20.1)]),
        ],
    );
    paths
}

fn settings(samples: usize, max_rounds: usize) -> Settings {
    Settings {
        api_key: Some("test".to_string()),
        capture: CaptureMode::Panorama,
        samples_per_country: samples,
        workers: 2,
        max_rounds,
        seed: Some(42),
        ..Settings::new()
    }
}

fn jpg_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter(|entry| {
            entry
                .as_ref()
                .unwrap()
                .path()
                .extension()
                .is_some_and(|ext| ext == "jpg")
        })
        .count()
}

#[test]
fn test_loader_filters_by_country() {
    let root = tempfile::tempdir().unwrap();
    let paths = setup(root.path());
    let index = RegionIndex::from_path(&paths.regions_file).unwrap();
    let mut loader = RoadLoader::new();

    let alpha = loader.load(&index.resolve("Alpha", &paths).unwrap()).unwrap();
    assert_eq!(alpha.len(), 2);
    assert!(alpha.iter().flat_map(|r| r.vertices()).all(|v| v.lat >= 10.0 && v.lat <= 10.3));

    let beta = loader.load(&index.resolve("Beta", &paths).unwrap()).unwrap();
    assert_eq!(beta.len(), 1);

    let err = loader.load(&index.resolve("Delta", &paths).unwrap()).unwrap_err();
    assert!(matches!(err, ScraperError::NoRoadsForCountry(name) if name == "Delta"));
}

#[tokio::test]
async fn test_mass_scrape_creates_country_directories() {
    let root = tempfile::tempdir().unwrap();
    let paths = setup(root.path());
    let index = RegionIndex::from_path(&paths.regions_file).unwrap();
    let names = read_country_list(&paths.country_list).unwrap();

    let provider = FakeProvider::default();
    let mut scraper = Scraper::new(provider.clone(), index, paths.clone(), settings(3, 5));
    let summary = scraper.run(&names).await.unwrap();

    let order: Vec<&str> = summary.countries.iter().map(|c| c.country.as_str()).collect();
    assert_eq!(order, vec!["Alpha", "Beta"]);
    for report in &summary.countries {
        assert_eq!(report.locations, 3);
        assert_eq!(report.written, 12);
        assert_eq!(report.records.len(), 12);
    }
    assert_eq!(provider.fetches.load(Ordering::SeqCst), 24);

    let dirs: Vec<_> = std::fs::read_dir(&paths.download_dir).unwrap().collect();
    assert_eq!(dirs.len(), 2);
    assert_eq!(jpg_count(&paths.download_dir.join("Alpha")), 12);
    assert_eq!(jpg_count(&paths.download_dir.join("Beta")), 12);
}

#[tokio::test]
async fn test_rerun_skips_existing_files() {
    let root = tempfile::tempdir().unwrap();
    let paths = setup(root.path());
    let names = vec!["Alpha".to_string()];

    let first = FakeProvider::default();
    let index = RegionIndex::from_path(&paths.regions_file).unwrap();
    Scraper::new(first, index, paths.clone(), settings(2, 1))
        .run(&names)
        .await
        .unwrap();
    let alpha = paths.download_dir.join("Alpha");
    assert_eq!(jpg_count(&alpha), 8);

    // Same seed, same points: every file is already on disk
    let second = FakeProvider::default();
    let index = RegionIndex::from_path(&paths.regions_file).unwrap();
    let summary = Scraper::new(second.clone(), index, paths.clone(), settings(2, 1))
        .run(&names)
        .await
        .unwrap();

    let report = &summary.countries[0];
    assert_eq!(report.written, 0);
    assert_eq!(report.skipped, 8);
    assert_eq!(second.fetches.load(Ordering::SeqCst), 0);
    assert_eq!(jpg_count(&alpha), 8);
}

#[tokio::test]
async fn test_unavailable_candidates_are_skipped() {
    let root = tempfile::tempdir().unwrap();
    let paths = setup(root.path());
    let index = RegionIndex::from_path(&paths.regions_file).unwrap();

    let provider = FakeProvider::default();
    let summary = Scraper::new(provider.clone(), index, paths.clone(), settings(3, 2))
        .run(&["Ocean".to_string()])
        .await
        .unwrap();

    let report = &summary.countries[0];
    assert_eq!(report.candidates, 6);
    assert_eq!(report.unavailable, 6);
    assert_eq!(report.written, 0);
    assert_eq!(provider.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_configuration_errors_abort_before_scraping() {
    let root = tempfile::tempdir().unwrap();
    let paths = setup(root.path());

    let index = RegionIndex::from_path(&paths.regions_file).unwrap();
    let mut scraper = Scraper::new(FakeProvider::default(), index, paths.clone(), settings(1, 1));

    let err = scraper
        .run(&["Alpha".to_string(), "Atlantis".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, ScraperError::CountryNotFound(_)));

    let err = scraper
        .run(&["Alpha".to_string(), "Gamma".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, ScraperError::ShapefileMissing { .. }));

    assert!(!paths.download_dir.join("Alpha").exists());
}

#[tokio::test]
async fn test_country_without_roads_aborts_before_downloads() {
    let root = tempfile::tempdir().unwrap();
    let paths = setup(root.path());
    let index = RegionIndex::from_path(&paths.regions_file).unwrap();

    let provider = FakeProvider::default();
    let mut scraper = Scraper::new(provider.clone(), index, paths.clone(), settings(1, 1));
    let names: Vec<String> = ["Alpha", "Delta", "Beta"].iter().map(|s| s.to_string()).collect();

    let err = scraper.run(&names).await.unwrap_err();
    assert!(matches!(err, ScraperError::NoRoadsForCountry(name) if name == "Delta"));
    assert_eq!(provider.fetches.load(Ordering::SeqCst), 0);
    assert!(!paths.download_dir.join("Alpha").exists());
    assert!(!paths.download_dir.join("Beta").exists());
}
