use crate::error::{Result, ScraperError};
use crate::types::{AcceptedLocation, Availability, Coordinate, ImageRequest};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, instrument};

const METADATA_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/streetview/metadata";
const STREETVIEW_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/streetview";

/// Status values of the metadata endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum MetadataStatus {
    Ok,
    ZeroResults,
    NotFound,
    OverQueryLimit,
    RequestDenied,
    InvalidRequest,
    #[serde(other)]
    UnknownError,
}

/// Internal structure for parsing metadata response
#[derive(Debug, Deserialize)]
struct MetadataResponse {
    status: MetadataStatus,
    pano_id: Option<String>,
    location: Option<Coordinate>,
    date: Option<String>,
    error_message: Option<String>,
}

fn metadata_url(point: Coordinate, radius: u32, api_key: &str) -> Result<Url> {
    Url::parse_with_params(
        METADATA_ENDPOINT,
        &[
            ("location", format!("{},{}", point.lat, point.lon)),
            ("radius", radius.to_string()),
            ("source", "outdoor".to_string()),
            ("key", api_key.to_string()),
        ],
    )
    .map_err(|e| ScraperError::ParseError(format!("metadata URL: {e}")))
}

fn image_url(request: &ImageRequest, api_key: &str) -> Result<Url> {
    let target = match &request.location.pano_id {
        Some(pano_id) => ("pano", pano_id.clone()),
        None => (
            "location",
            format!("{},{}", request.location.location.lat, request.location.location.lon),
        ),
    };

    Url::parse_with_params(
        STREETVIEW_ENDPOINT,
        &[
            ("size", format!("{}x{}", request.width, request.height)),
            ("fov", request.fov.to_string()),
            ("pitch", request.pitch.to_string()),
            ("heading", request.heading.to_string()),
            (target.0, target.1),
            ("return_error_code", "true".to_string()),
            ("key", api_key.to_string()),
        ],
    )
    .map_err(|e| ScraperError::ParseError(format!("image URL: {e}")))
}

/// Interpret a metadata response body.
fn parse_metadata(body: &str) -> Result<Availability> {
    let data: MetadataResponse = serde_json::from_str(body)
        .map_err(|e| ScraperError::InvalidResponse(format!("metadata JSON: {e}")))?;

    match data.status {
        MetadataStatus::Ok => {
            let location = data.location.ok_or_else(|| {
                ScraperError::InvalidResponse("metadata OK without a location".to_string())
            })?;
            Ok(Availability::Available(AcceptedLocation {
                pano_id: data.pano_id,
                location,
                date: data.date,
            }))
        }
        MetadataStatus::ZeroResults | MetadataStatus::NotFound => Ok(Availability::Unavailable),
        MetadataStatus::OverQueryLimit => Err(ScraperError::QuotaExceeded),
        MetadataStatus::RequestDenied => Err(ScraperError::RequestDenied(
            data.error_message.unwrap_or_else(|| "no message".to_string()),
        )),
        MetadataStatus::InvalidRequest | MetadataStatus::UnknownError => {
            Err(ScraperError::InvalidResponse(format!(
                "metadata status {:?}: {}",
                data.status,
                data.error_message.unwrap_or_default()
            )))
        }
    }
}

/// Check whether Street View imagery exists within `radius` metres of `point`.
///
/// Metadata requests are free of quota charges, so every candidate is checked
/// before any image is requested.
#[instrument(skip(client, api_key))]
pub async fn check_availability(
    client: &Client,
    point: Coordinate,
    radius: u32,
    api_key: &str,
) -> Result<Availability> {
    let url = metadata_url(point, radius, api_key)?;

    let response = client.get(url).send().await?.error_for_status()?;
    let body = response.text().await?;

    let availability = parse_metadata(&body)?;
    debug!(available = matches!(availability, Availability::Available(_)), "checked metadata");
    Ok(availability)
}

/// Fetch one Street View image and return its JPEG bytes.
#[instrument(skip(client, api_key, request), fields(heading = request.heading, pano = ?request.location.pano_id))]
pub async fn fetch_image(client: &Client, request: &ImageRequest, api_key: &str) -> Result<Vec<u8>> {
    let url = image_url(request, api_key)?;

    let response = client.get(url).send().await?;
    let status = response.status();
    let body = response.bytes().await?;
    image_response(status, &body)
}

/// Map an image endpoint response to the JPEG bytes or the error it signals.
fn image_response(status: StatusCode, body: &[u8]) -> Result<Vec<u8>> {
    match status {
        StatusCode::FORBIDDEN => Err(ScraperError::RequestDenied(
            String::from_utf8_lossy(body).trim().to_string(),
        )),
        StatusCode::TOO_MANY_REQUESTS => Err(ScraperError::QuotaExceeded),
        StatusCode::NOT_FOUND => Err(ScraperError::NoImagery),
        status if !status.is_success() => Err(ScraperError::HttpStatus(status.as_u16())),
        _ => {
            check_jpeg(body)?;
            Ok(body.to_vec())
        }
    }
}

fn check_jpeg(bytes: &[u8]) -> Result<()> {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Jpeg) => Ok(()),
        Ok(other) => Err(ScraperError::InvalidResponse(format!(
            "expected a JPEG image, got {other:?}"
        ))),
        Err(_) => Err(ScraperError::InvalidResponse(format!(
            "expected a JPEG image, got {} bytes of unknown data",
            bytes.len()
        ))),
    }
}
