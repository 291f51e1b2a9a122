use crate::config::{Paths, Settings};
use crate::download::{download_location, ImageOutcome, ImageStatus};
use crate::error::{Result, ScraperError};
use crate::menu::Launcher;
use crate::regions::RegionIndex;
use crate::roads::RoadLoader;
use crate::sampler::PointSampler;
use crate::types::{Availability, Coordinate, Country, ImageRecord};
use crate::{ImageryProvider, StreetView};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// What the user asked to scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeJob {
    /// One named country
    Country(String),
    /// Every country in the country list file
    CountryList,
}

/// Counts and records for one scraped country.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountryReport {
    pub country: String,
    /// Candidate points checked
    pub candidates: usize,
    /// Candidates without imagery
    pub unavailable: usize,
    /// Candidates whose availability check failed
    pub check_failures: usize,
    /// Locations that produced at least one new image
    pub locations: usize,
    /// Images written
    pub written: usize,
    /// Images already on disk
    pub skipped: usize,
    /// Image requests that failed
    pub failed: usize,
    /// Checks or image requests refused for exceeding the quota
    pub quota_exceeded: usize,
    pub records: Vec<ImageRecord>,
}

impl CountryReport {
    fn new(country: &str) -> Self {
        Self {
            country: country.to_string(),
            ..Self::default()
        }
    }

    fn absorb(&mut self, outcome: CandidateOutcome) {
        self.candidates += 1;
        match outcome {
            CandidateOutcome::Unavailable => self.unavailable += 1,
            CandidateOutcome::CheckFailed(e) => {
                self.check_failures += 1;
                if matches!(e, ScraperError::QuotaExceeded) {
                    self.quota_exceeded += 1;
                }
            }
            CandidateOutcome::Downloaded(images) => {
                let mut any_written = false;
                for image in &images {
                    match image.status {
                        ImageStatus::Written => {
                            any_written = true;
                            self.written += 1;
                        }
                        ImageStatus::Existing => self.skipped += 1,
                        ImageStatus::Failed(ScraperError::QuotaExceeded) => {
                            self.failed += 1;
                            self.quota_exceeded += 1;
                        }
                        ImageStatus::Failed(_) => self.failed += 1,
                    }
                }
                if any_written {
                    self.locations += 1;
                }
                self.records.extend(images.iter().filter_map(ImageOutcome::record));
            }
        }
    }
}

impl fmt::Display for CountryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} images from {} locations ({} candidates, {} without imagery, {} check failures, {} existing, {} failed, {} over quota)",
            self.country,
            self.written,
            self.locations,
            self.candidates,
            self.unavailable,
            self.check_failures,
            self.skipped,
            self.failed,
            self.quota_exceeded
        )
    }
}

/// Reports for every country of a run, in scrape order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapeSummary {
    pub countries: Vec<CountryReport>,
}

impl ScrapeSummary {
    pub fn images_written(&self) -> usize {
        self.countries.iter().map(|c| c.written).sum()
    }
}

enum CandidateOutcome {
    Unavailable,
    CheckFailed(ScraperError),
    Downloaded(Vec<ImageOutcome>),
}

/// Read a country list: one name per line, blank lines ignored.
pub fn read_country_list(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|source| ScraperError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Runs the sample → check → download pipeline for one or more countries.
pub struct Scraper<P> {
    provider: P,
    index: RegionIndex,
    paths: Paths,
    settings: Settings,
    loader: RoadLoader,
    rng: StdRng,
}

impl<P: ImageryProvider> Scraper<P> {
    pub fn new(provider: P, index: RegionIndex, paths: Paths, settings: Settings) -> Self {
        let rng = settings
            .seed
            .map(StdRng::seed_from_u64)
            .unwrap_or_else(StdRng::from_entropy);
        Self {
            provider,
            index,
            paths,
            settings,
            loader: RoadLoader::new(),
            rng,
        }
    }

    /// Resolve every country up front so configuration errors surface before
    /// any download starts.
    pub fn resolve_all(&self, names: &[String]) -> Result<Vec<Country>> {
        names
            .iter()
            .map(|name| self.index.resolve(name, &self.paths))
            .collect()
    }

    /// Resolve every country and load its roads before any download, so a
    /// country with no roads aborts the run before earlier countries are scraped.
    ///
    /// Regions stay cached, so the loads done here are reused while scraping.
    pub fn prepare(&mut self, names: &[String]) -> Result<Vec<Country>> {
        let countries = self.resolve_all(names)?;
        for country in &countries {
            self.loader.load(country)?;
        }
        Ok(countries)
    }

    /// Scrape the named countries one after another.
    pub async fn run(&mut self, names: &[String]) -> Result<ScrapeSummary> {
        let countries = self.prepare(names)?;
        let mut summary = ScrapeSummary::default();

        for country in &countries {
            info!(country = %country.name, "starting scrape");
            match self.scrape_country(country).await {
                Ok(report) => {
                    info!("{report}");
                    summary.countries.push(report);
                }
                Err(e) if e.is_recoverable() => {
                    warn!(country = %country.name, error = %e, "error scraping images, moving on");
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            countries = summary.countries.len(),
            images = summary.images_written(),
            "scrape finished"
        );
        Ok(summary)
    }

    /// Collect up to `samples_per_country` new locations for one country.
    ///
    /// Each round samples the locations still missing; rounds stop at the
    /// target, when sampling yields nothing, or after `max_rounds`.
    pub async fn scrape_country(&mut self, country: &Country) -> Result<CountryReport> {
        if !country.output_dir.is_dir() {
            std::fs::create_dir_all(&country.output_dir)?;
            info!(dir = %country.output_dir.display(), "created directory");
        }

        let roads = self.loader.load(country)?;
        let mut report = CountryReport::new(&country.name);
        let target = self.settings.samples_per_country;

        for round in 1..=self.settings.max_rounds.max(1) {
            let needed = target.saturating_sub(report.locations);
            if needed == 0 {
                break;
            }

            let candidates: Vec<Coordinate> =
                PointSampler::new(&roads, needed, &mut self.rng).collect();
            if candidates.is_empty() {
                warn!(country = %country.name, "no points generated");
                break;
            }
            info!(country = %country.name, round, candidates = candidates.len(), "sampled candidates");

            let pb = progress_bar(candidates.len() as u64, &country.name);
            let provider = &self.provider;
            let settings = &self.settings;
            let dir = country.output_dir.as_path();

            let mut outcomes = stream::iter(candidates)
                .map(|point| process_candidate(provider, settings, dir, point))
                .buffer_unordered(settings.workers.max(1));

            while let Some(outcome) = outcomes.next().await {
                for message in failure_messages(&outcome) {
                    pb.suspend(|| warn!(country = %country.name, "{message}"));
                }
                report.absorb(outcome);
                pb.inc(1);
            }
            pb.finish_and_clear();
        }

        if report.locations < target {
            warn!(
                country = %country.name,
                locations = report.locations,
                target,
                "fewer locations than requested"
            );
        }
        Ok(report)
    }
}

async fn process_candidate<P: ImageryProvider>(
    provider: &P,
    settings: &Settings,
    dir: &Path,
    point: Coordinate,
) -> CandidateOutcome {
    match provider.check_availability(point, settings.search_radius).await {
        Ok(Availability::Available(location)) => CandidateOutcome::Downloaded(
            download_location(provider, &location, settings.capture, &settings.image, dir).await,
        ),
        Ok(Availability::Unavailable) => CandidateOutcome::Unavailable,
        Err(e) => {
            debug!(lat = point.lat, lon = point.lon, error = %e, "availability check failed");
            CandidateOutcome::CheckFailed(e)
        }
    }
}

/// Warnings for the skipped parts of a candidate, logged by the collector so
/// they can be printed around the progress bar.
fn failure_messages(outcome: &CandidateOutcome) -> Vec<String> {
    match outcome {
        CandidateOutcome::Unavailable => Vec::new(),
        CandidateOutcome::CheckFailed(e) => {
            vec![format!("availability check failed, skipping: {e}")]
        }
        CandidateOutcome::Downloaded(images) => images
            .iter()
            .filter_map(|image| match &image.status {
                ImageStatus::Failed(e) => Some(format!(
                    "image download failed, skipping {}: {e}",
                    image.request.output_path.display()
                )),
                _ => None,
            })
            .collect(),
    }
}

fn progress_bar(len: u64, country: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:60.cyan/blue} {pos:>7}/{len:7} ETA: {eta} {msg}",
    ) {
        pb.set_style(style.progress_chars("##-"));
    }
    pb.set_message(format!("Downloading images from {country}"));
    pb
}

/// Runs scrapes against Google on a tokio runtime.
pub struct TokioLauncher {
    runtime: tokio::runtime::Runtime,
    paths: Paths,
}

impl TokioLauncher {
    pub fn new(paths: Paths) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        Ok(Self { runtime, paths })
    }
}

impl Launcher for TokioLauncher {
    fn launch(&mut self, settings: &Settings, job: ScrapeJob) -> Result<ScrapeSummary> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or(ScraperError::MissingApiKey)?;
        let index = RegionIndex::from_path(&self.paths.regions_file)?;

        let names = match job {
            ScrapeJob::Country(name) => vec![name],
            ScrapeJob::CountryList => read_country_list(&self.paths.country_list)?,
        };

        let mut scraper = Scraper::new(
            StreetView::with_api_key(api_key),
            index,
            self.paths.clone(),
            settings.clone(),
        );
        self.runtime.block_on(scraper.run(&names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AcceptedLocation, ImageRequest};

    fn outcome(status: ImageStatus) -> ImageOutcome {
        ImageOutcome {
            request: ImageRequest {
                location: AcceptedLocation {
                    pano_id: Some("p".into()),
                    location: Coordinate::new(0.0, 0.0),
                    date: None,
                },
                heading: 0,
                fov: 120,
                pitch: 0,
                width: 640,
                height: 640,
                output_path: "Downloads/X/p_0.jpg".into(),
            },
            status,
        }
    }

    #[test]
    fn test_report_counts() {
        let mut report = CountryReport::new("X");
        report.absorb(CandidateOutcome::Unavailable);
        report.absorb(CandidateOutcome::CheckFailed(ScraperError::QuotaExceeded));
        report.absorb(CandidateOutcome::Downloaded(vec![
            outcome(ImageStatus::Written),
            outcome(ImageStatus::Existing),
            outcome(ImageStatus::Failed(ScraperError::NoImagery)),
        ]));
        report.absorb(CandidateOutcome::Downloaded(vec![outcome(ImageStatus::Existing)]));
        report.absorb(CandidateOutcome::Downloaded(vec![outcome(ImageStatus::Failed(
            ScraperError::QuotaExceeded,
        ))]));

        assert_eq!(report.candidates, 5);
        assert_eq!(report.unavailable, 1);
        assert_eq!(report.check_failures, 1);
        assert_eq!(report.locations, 1);
        assert_eq!((report.written, report.skipped, report.failed), (1, 2, 2));
        assert_eq!(report.quota_exceeded, 2);
        assert!(report.to_string().ends_with("2 failed, 2 over quota)"));
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].file_name, "p_0.jpg");
    }

    #[test]
    fn test_read_country_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("countries_to_scrape.txt");
        std::fs::write(&path, "France\n\n  Germany  \r\n").unwrap();

        assert_eq!(read_country_list(&path).unwrap(), vec!["France", "Germany"]);
        let err = read_country_list(&dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, ScraperError::FileRead { .. }));
        assert!(err.to_string().contains("missing.txt"));
    }

    #[test]
    fn test_failure_messages() {
        assert!(failure_messages(&CandidateOutcome::Unavailable).is_empty());

        let messages = failure_messages(&CandidateOutcome::CheckFailed(ScraperError::QuotaExceeded));
        assert_eq!(messages, vec!["availability check failed, skipping: Street View quota exceeded"]);

        let messages = failure_messages(&CandidateOutcome::Downloaded(vec![
            outcome(ImageStatus::Written),
            outcome(ImageStatus::Failed(ScraperError::NoImagery)),
        ]));
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("p_0.jpg"));
        assert!(messages[0].ends_with("No imagery available for this request"));
    }
}
