use crate::error::{Result, ScraperError};
use crate::types::{AcceptedLocation, CaptureMode, ImageOptions, ImageRecord, ImageRequest};
use crate::ImageryProvider;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// What happened to a single image request.
#[derive(Debug)]
pub enum ImageStatus {
    /// Fetched and written to disk
    Written,
    /// A file already existed at the output path; nothing was fetched or overwritten
    Existing,
    /// The request failed and was skipped
    Failed(ScraperError),
}

#[derive(Debug)]
pub struct ImageOutcome {
    pub request: ImageRequest,
    pub status: ImageStatus,
}

impl ImageOutcome {
    /// Record of the written file, if one was written.
    pub fn record(&self) -> Option<ImageRecord> {
        if !matches!(self.status, ImageStatus::Written) {
            return None;
        }
        let location = &self.request.location;
        Some(ImageRecord {
            date: location.date.clone(),
            pano_id: location.pano_id.clone(),
            location: location.location,
            heading: self.request.heading,
            file_name: self
                .request
                .output_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        })
    }
}

/// Build the image requests for one location.
///
/// Files are named `<identifier>_<heading>.jpg` inside `country_dir`.
pub fn image_requests(
    location: &AcceptedLocation,
    mode: CaptureMode,
    options: &ImageOptions,
    country_dir: &Path,
) -> Vec<ImageRequest> {
    let identifier = location.identifier();
    options
        .headings(mode)
        .into_iter()
        .map(|heading| ImageRequest {
            location: location.clone(),
            heading,
            fov: options.fov,
            pitch: options.pitch,
            width: options.width,
            height: options.height,
            output_path: country_dir.join(format!("{identifier}_{heading}.jpg")),
        })
        .collect()
}

/// Write `bytes` to a new file at `path`.
///
/// Returns `false` without touching the file if it already exists. A failed
/// write removes the partial file so a later run can retry it.
pub async fn save_image(bytes: &[u8], path: &Path) -> Result<bool> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let mut file = match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    let written = async {
        file.write_all(bytes).await?;
        file.flush().await
    }
    .await;

    if let Err(e) = written {
        drop(file);
        fs::remove_file(path).await.ok();
        return Err(e.into());
    }
    Ok(true)
}

/// Fetch and save one request, skipping it if its file already exists.
pub async fn download_image<P: ImageryProvider>(provider: &P, request: ImageRequest) -> ImageOutcome {
    let status = match fs::try_exists(&request.output_path).await {
        Ok(true) => ImageStatus::Existing,
        _ => match fetch_and_save(provider, &request).await {
            Ok(true) => ImageStatus::Written,
            Ok(false) => ImageStatus::Existing,
            Err(e) => ImageStatus::Failed(e),
        },
    };

    match &status {
        ImageStatus::Written => debug!(path = %request.output_path.display(), "saved image"),
        ImageStatus::Existing => debug!(path = %request.output_path.display(), "image exists, skipping"),
        ImageStatus::Failed(e) => debug!(
            path = %request.output_path.display(),
            error = %e,
            "image download failed"
        ),
    }

    ImageOutcome { request, status }
}

async fn fetch_and_save<P: ImageryProvider>(provider: &P, request: &ImageRequest) -> Result<bool> {
    let bytes = provider.fetch_image(request).await?;
    save_image(&bytes, &request.output_path).await
}

/// Download every image for an accepted location, one heading after another.
///
/// A failed heading never stops the others.
pub async fn download_location<P: ImageryProvider>(
    provider: &P,
    location: &AcceptedLocation,
    mode: CaptureMode,
    options: &ImageOptions,
    country_dir: &Path,
) -> Vec<ImageOutcome> {
    let mut outcomes = Vec::new();
    for request in image_requests(location, mode, options, country_dir) {
        outcomes.push(download_image(provider, request).await);
    }
    outcomes
}
