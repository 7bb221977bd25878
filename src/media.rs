//! Image loading for the backends: remote fetches, `data:` URIs, format sniffing and
//! decoding. Every failure here is per-image; callers log it and render without the image.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::{debug, info, warn};
use reqwest::StatusCode;
use std::collections::HashMap;
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;

use crate::config::RenderConfig;
use crate::engine::prepare::PreparedDeck;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Network error fetching image: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Image request to {url} failed with status {status}")]
    Status { url: String, status: StatusCode },

    #[error("Image {url} is {size} bytes, over the {limit} byte limit")]
    TooLarge {
        url: String,
        size: usize,
        limit: usize,
    },

    #[error("Malformed data URI: {0}")]
    InvalidDataUri(String),

    #[error("Base64 decoding failed: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Unsupported image format: {0}")]
    Unsupported(String),

    #[error("Image decoding failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Remote image fetching is disabled")]
    FetchDisabled,
}

/// Raster formats every backend can embed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
}

impl ImageKind {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Gif => "image/gif",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpeg",
            ImageKind::Gif => "gif",
        }
    }

    fn to_image_format(self) -> image::ImageFormat {
        match self {
            ImageKind::Png => image::ImageFormat::Png,
            ImageKind::Jpeg => image::ImageFormat::Jpeg,
            ImageKind::Gif => image::ImageFormat::Gif,
        }
    }
}

/// An image whose bytes were sniffed and whose dimensions are known.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAsset {
    pub bytes: Vec<u8>,
    pub kind: ImageKind,
    pub width: u32,
    pub height: u32,
}

/// Decoded pixels flattened onto white, ready for a PDF `DeviceRGB` XObject.
#[derive(Debug, Clone)]
pub struct RgbPixels {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl ImageAsset {
    /// Sniffs the format from the bytes and reads the dimensions without decoding.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, MediaError> {
        let kind = match image::guess_format(&bytes)? {
            image::ImageFormat::Png => ImageKind::Png,
            image::ImageFormat::Jpeg => ImageKind::Jpeg,
            image::ImageFormat::Gif => ImageKind::Gif,
            other => return Err(MediaError::Unsupported(format!("{:?}", other))),
        };
        let (width, height) =
            image::ImageReader::with_format(Cursor::new(&bytes), kind.to_image_format())
                .into_dimensions()?;
        Ok(ImageAsset {
            bytes,
            kind,
            width,
            height,
        })
    }

    /// `data:` URI with the image inlined as base64.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.kind.mime_type(), BASE64.encode(&self.bytes))
    }

    /// Width over height, or 1.0 for degenerate images.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f64 / self.height as f64
        }
    }

    /// Decodes to 8-bit RGB, compositing any transparency over white.
    pub fn decode_rgb(&self) -> Result<RgbPixels, MediaError> {
        let decoded = image::load_from_memory_with_format(&self.bytes, self.kind.to_image_format())?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut data = Vec::with_capacity(width as usize * height as usize * 3);
        for pixel in rgba.pixels() {
            let [r, g, b, a] = pixel.0;
            let alpha = a as u32;
            for channel in [r, g, b] {
                data.push(((channel as u32 * alpha + 255 * (255 - alpha)) / 255) as u8);
            }
        }
        Ok(RgbPixels {
            width,
            height,
            data,
        })
    }
}

/// Decodes a `data:<mime>;base64,<payload>` URI.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, MediaError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| MediaError::InvalidDataUri("missing data: prefix".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| MediaError::InvalidDataUri("missing payload separator".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(MediaError::InvalidDataUri(format!(
            "only base64 payloads are supported, got '{}'",
            header
        )));
    }
    Ok(BASE64.decode(payload.trim())?)
}

/// Fetches images over HTTP(S) or from `data:` URIs, enforcing a size limit.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: usize,
    allow_remote: bool,
}

impl ImageFetcher {
    pub fn new(client: reqwest::Client, config: &RenderConfig) -> Self {
        ImageFetcher {
            client,
            timeout: config.image_timeout(),
            max_bytes: config.max_image_bytes,
            allow_remote: config.fetch_images,
        }
    }

    /// Loads one image.
    ///
    /// # Arguments
    ///
    /// * `url` - An `http(s)` URL or a base64 `data:` URI.
    ///
    /// # Returns
    ///
    /// The sniffed [`ImageAsset`], or the reason it could not be loaded.
    pub async fn fetch(&self, url: &str) -> Result<ImageAsset, MediaError> {
        let bytes = if url.starts_with("data:") {
            decode_data_uri(url)?
        } else {
            if !self.allow_remote {
                return Err(MediaError::FetchDisabled);
            }
            self.download(url).await?
        };
        if bytes.len() > self.max_bytes {
            return Err(MediaError::TooLarge {
                url: shorten(url),
                size: bytes.len(),
                limit: self.max_bytes,
            });
        }
        ImageAsset::from_bytes(bytes)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, MediaError> {
        debug!("Fetching image {}", url);
        let response = self.client.get(url).timeout(self.timeout).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::Status {
                url: url.to_string(),
                status,
            });
        }
        if let Some(length) = response.content_length() {
            if length as usize > self.max_bytes {
                return Err(MediaError::TooLarge {
                    url: shorten(url),
                    size: length as usize,
                    limit: self.max_bytes,
                });
            }
        }

        // The header may be absent or wrong, so the limit is also enforced while reading.
        let mut response = response;
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            bytes.extend_from_slice(&chunk);
            if bytes.len() > self.max_bytes {
                return Err(MediaError::TooLarge {
                    url: shorten(url),
                    size: bytes.len(),
                    limit: self.max_bytes,
                });
            }
        }
        Ok(bytes)
    }
}

fn shorten(url: &str) -> String {
    url.chars().take(64).collect()
}

/// Images loaded for a deck, keyed by the URL the slide referenced.
pub type ImageCache = HashMap<String, ImageAsset>;

/// Loads every slide image and icon, slide by slide.
///
/// A failed image is logged and left out of the cache, so the slide renders without it.
pub async fn collect_images(deck: &PreparedDeck, fetcher: &ImageFetcher) -> ImageCache {
    let mut cache = ImageCache::new();
    for slide in &deck.slides {
        let urls = slide.image_url.iter().chain(slide.icons.iter());
        for url in urls {
            if cache.contains_key(url) {
                continue;
            }
            match fetcher.fetch(url).await {
                Ok(asset) => {
                    cache.insert(url.clone(), asset);
                }
                Err(e) => warn!(
                    "Slide {}: skipping image {}: {}",
                    slide.index + 1,
                    shorten(url),
                    e
                ),
            }
        }
    }
    info!("Loaded {} image(s) for '{}'", cache.len(), deck.topic);
    cache
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A valid 2x1 RGBA PNG: one opaque red pixel, one transparent pixel.
    pub(crate) fn tiny_png() -> Vec<u8> {
        let mut img = image::RgbaImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, image::Rgba([0, 0, 0, 0]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn sniffs_png_dimensions() {
        let asset = ImageAsset::from_bytes(tiny_png()).unwrap();
        assert_eq!(asset.kind, ImageKind::Png);
        assert_eq!((asset.width, asset.height), (2, 1));
        assert_eq!(asset.aspect_ratio(), 2.0);
    }

    #[test]
    fn rejects_non_images() {
        assert!(ImageAsset::from_bytes(b"<svg></svg>".to_vec()).is_err());
    }

    #[test]
    fn data_uris_round_trip() {
        let asset = ImageAsset::from_bytes(tiny_png()).unwrap();
        let uri = asset.to_data_uri();
        assert!(uri.starts_with("data:image/png;base64,"));
        assert_eq!(decode_data_uri(&uri).unwrap(), asset.bytes);
        assert!(matches!(
            decode_data_uri("data:image/png,raw"),
            Err(MediaError::InvalidDataUri(_))
        ));
    }

    #[test]
    fn transparency_flattens_to_white() {
        let pixels = ImageAsset::from_bytes(tiny_png())
            .unwrap()
            .decode_rgb()
            .unwrap();
        assert_eq!(pixels.data, vec![255, 0, 0, 255, 255, 255]);
    }

    #[tokio::test]
    async fn fetcher_reads_data_uris_without_network() {
        let config = RenderConfig {
            fetch_images: false,
            ..RenderConfig::default()
        };
        let fetcher = ImageFetcher::new(reqwest::Client::new(), &config);
        let uri = ImageAsset::from_bytes(tiny_png()).unwrap().to_data_uri();
        assert!(fetcher.fetch(&uri).await.is_ok());
        assert!(matches!(
            fetcher.fetch("https://example.invalid/a.png").await,
            Err(MediaError::FetchDisabled)
        ));
    }

    /// Serves one response whose body length is only known once the connection closes.
    async fn serve_unsized_body(body: Vec<u8>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let head = "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nConnection: close\r\n\r\n";
            let _ = socket.write_all(head.as_bytes()).await;
            for chunk in body.chunks(256) {
                if socket.write_all(chunk).await.is_err() {
                    break;
                }
            }
            let _ = socket.shutdown().await;
        });
        format!("http://{}/image.png", addr)
    }

    fn local_client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    #[tokio::test]
    async fn size_limit_applies_without_content_length() {
        let url = serve_unsized_body(vec![0u8; 4096]).await;
        let config = RenderConfig {
            fetch_images: true,
            max_image_bytes: 1000,
            ..RenderConfig::default()
        };
        let fetcher = ImageFetcher::new(local_client(), &config);
        match fetcher.fetch(&url).await {
            Err(MediaError::TooLarge { size, limit, .. }) => {
                assert_eq!(limit, 1000);
                assert!(size > 1000);
            }
            other => panic!("expected TooLarge, got {:?}", other.map(|a| a.kind)),
        }
    }

    #[tokio::test]
    async fn unsized_bodies_under_the_limit_are_read_whole() {
        let url = serve_unsized_body(tiny_png()).await;
        let config = RenderConfig {
            fetch_images: true,
            ..RenderConfig::default()
        };
        let fetcher = ImageFetcher::new(local_client(), &config);
        let asset = fetcher.fetch(&url).await.unwrap();
        assert_eq!((asset.width, asset.height), (2, 1));
    }
}
