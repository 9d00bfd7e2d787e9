//! Image retrieval and normalization for the grading call.

use std::io::Cursor;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use tracing::debug;

use crate::error::GradingError;

pub const JPEG_MEDIA_TYPE: &str = "image/jpeg";

/// An image rescaled and re-encoded for transport. Owned by one grading call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
    pub media_type: &'static str,
}

#[derive(Debug, Clone)]
pub enum ImageSource {
    Url(String),
    Bytes(Vec<u8>),
}

/// Retrieves raw image bytes by URL.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<Vec<u8>, GradingError>;
}

pub struct HttpImageLoader {
    client: reqwest::Client,
}

impl HttpImageLoader {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build image HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageLoader for HttpImageLoader {
    async fn load(&self, url: &str) -> Result<Vec<u8>, GradingError> {
        if url.is_empty() {
            return Err(GradingError::Fetch("record has no image URL".to_string()));
        }

        let resp = self
            .client
            .get(url)
            .header("User-Agent", "spirit-grader/0.1")
            .send()
            .await
            .map_err(|e| GradingError::Fetch(format!("{url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GradingError::Fetch(format!("{url}: HTTP {status}")));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| GradingError::Fetch(format!("{url}: {e}")))?;

        debug!(url, bytes = bytes.len(), "image: fetched");
        Ok(bytes.to_vec())
    }
}

/// Fetch (when given a URL), decode, rescale so the long edge equals
/// `target_long_edge`, and re-encode as JPEG at `encode_quality`.
pub async fn normalize(
    loader: &dyn ImageLoader,
    source: ImageSource,
    target_long_edge: u32,
    encode_quality: u8,
) -> Result<NormalizedImage, GradingError> {
    let bytes = match source {
        ImageSource::Url(url) => loader.load(&url).await?,
        ImageSource::Bytes(bytes) => bytes,
    };

    tokio::task::spawn_blocking(move || normalize_bytes(&bytes, target_long_edge, encode_quality))
        .await
        .map_err(|e| GradingError::Encode(format!("normalization task failed: {e}")))?
}

pub fn normalize_bytes(
    bytes: &[u8],
    target_long_edge: u32,
    encode_quality: u8,
) -> Result<NormalizedImage, GradingError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| GradingError::Fetch(format!("undecodable image: {e}")))?;
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(GradingError::Fetch("image has no pixels".to_string()));
    }

    let (width, height) = scaled_dimensions(decoded.width(), decoded.height(), target_long_edge);
    // JPEG has no alpha channel
    let resized = decoded
        .resize_exact(width, height, FilterType::Lanczos3)
        .to_rgb8();

    let mut encoded = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut encoded, encode_quality)
        .encode_image(&resized)
        .map_err(|e| GradingError::Encode(e.to_string()))?;

    Ok(NormalizedImage {
        width,
        height,
        bytes: encoded.into_inner(),
        media_type: JPEG_MEDIA_TYPE,
    })
}

/// Output size for a `width`×`height` image whose long edge becomes
/// `target_long_edge`. The short edge is rounded and never below 1.
pub fn scaled_dimensions(width: u32, height: u32, target_long_edge: u32) -> (u32, u32) {
    let target = f64::from(target_long_edge);
    if width >= height {
        let aspect = f64::from(width) / f64::from(height);
        (target_long_edge, ((target / aspect).round() as u32).max(1))
    } else {
        let aspect = f64::from(height) / f64::from(width);
        (((target / aspect).round() as u32).max(1), target_long_edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{png_bytes, MockImageLoader};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn two_to_one_landscape() {
        assert_eq!(scaled_dimensions(2000, 1000, 1000), (1000, 500));
    }

    #[test]
    fn portrait_keeps_height_as_long_edge() {
        assert_eq!(scaled_dimensions(1000, 2000, 1000), (500, 1000));
        assert_eq!(scaled_dimensions(3024, 4032, 1000), (750, 1000));
    }

    #[test]
    fn square_and_small_images() {
        assert_eq!(scaled_dimensions(640, 640, 1000), (1000, 1000));
        assert_eq!(scaled_dimensions(10, 20, 1000), (500, 1000));
    }

    #[test]
    fn extreme_aspect_keeps_one_pixel() {
        assert_eq!(scaled_dimensions(100_000, 1, 1000), (1000, 1));
    }

    #[test]
    fn normalizes_png_to_jpeg() {
        let png = png_bytes(200, 100);
        let image = normalize_bytes(&png, 100, 85).unwrap();

        assert_eq!((image.width, image.height), (100, 50));
        assert_eq!(image.media_type, "image/jpeg");

        let decoded = image::load_from_memory(&image.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (100, 50));
        assert_eq!(
            image::guess_format(&image.bytes).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[test]
    fn garbage_is_fetch_error() {
        let err = normalize_bytes(b"definitely not an image", 100, 85).unwrap_err();
        assert_eq!(err.kind(), "FetchError");
    }

    #[tokio::test]
    async fn normalize_resolves_urls_through_loader() {
        let loader = MockImageLoader::new().on_image("https://img.test/a.png", png_bytes(40, 80));

        let image = normalize(
            &loader,
            ImageSource::Url("https://img.test/a.png".to_string()),
            20,
            80,
        )
        .await
        .unwrap();
        assert_eq!((image.width, image.height), (10, 20));

        let err = normalize(
            &loader,
            ImageSource::Url("https://img.test/missing.png".to_string()),
            20,
            80,
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "FetchError");
    }

    #[tokio::test]
    async fn normalize_accepts_raw_bytes() {
        let loader = MockImageLoader::new();
        let image = normalize(&loader, ImageSource::Bytes(png_bytes(30, 30)), 15, 90)
            .await
            .unwrap();
        assert_eq!((image.width, image.height), (15, 15));
    }

    #[tokio::test]
    async fn http_loader_fetches_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/camera.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(8, 8)))
            .mount(&server)
            .await;

        let loader = HttpImageLoader::new(Duration::from_secs(5)).unwrap();
        let bytes = loader
            .load(&format!("{}/camera.png", server.uri()))
            .await
            .unwrap();
        assert_eq!(bytes, png_bytes(8, 8));
    }

    #[tokio::test]
    async fn http_loader_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let loader = HttpImageLoader::new(Duration::from_secs(5)).unwrap();
        let err = loader
            .load(&format!("{}/gone.webp", server.uri()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "FetchError");
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn http_loader_timeout_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(png_bytes(8, 8))
                    .set_delay(Duration::from_millis(800)),
            )
            .mount(&server)
            .await;

        let loader = HttpImageLoader::new(Duration::from_millis(50)).unwrap();
        let err = loader
            .load(&format!("{}/slow.png", server.uri()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "FetchError");
        assert!(err.to_string().contains("slow.png"));
    }

    #[tokio::test]
    async fn http_loader_rejects_empty_url() {
        let loader = HttpImageLoader::new(Duration::from_secs(5)).unwrap();
        let err = loader.load("").await.unwrap_err();
        assert_eq!(err.kind(), "FetchError");
    }
}
