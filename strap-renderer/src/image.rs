//! Background image loading.
//!
//! Remote backgrounds are inlined as base64 data URIs before rasterizing, so
//! the rendered scene is self-contained. When inlining fails the raw reference
//! is kept and the background degrades to its solid fill.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use strap_core::layout::fit_rect;
use strap_core::{Background, BackgroundFit, Color, Rect};
use tiny_skia::{IntSize, Pixmap};

use crate::error::{RenderError, RenderResult};

/// Largest background accepted for inlining.
pub const MAX_IMAGE_BYTES: usize = 16 * 1024 * 1024;

/// Default limit on a whole background fetch, body included.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Redirects followed before a fetch gives up.
const MAX_REDIRECTS: usize = 5;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG with alpha support.
    Png,
    /// JPEG (no alpha).
    Jpeg,
    /// WebP (alpha support).
    WebP,
    /// GIF (first frame only).
    Gif,
    /// Unknown/other format.
    Unknown,
}

impl ImageFormat {
    /// Detect format from magic bytes.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.len() < 4 {
            return Self::Unknown;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Self::Png;
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Self::Jpeg;
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Self::WebP;
        }

        if data.starts_with(b"GIF8") {
            return Self::Gif;
        }

        Self::Unknown
    }

    /// MIME type for data URIs.
    #[must_use]
    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
            Self::Unknown => "application/octet-stream",
        }
    }
}

/// A decoded image as a premultiplied pixmap.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied RGBA pixels.
    pub pixmap: Arc<Pixmap>,
}

/// Decode image bytes.
///
/// # Errors
///
/// Returns an error if the image cannot be decoded.
#[allow(clippy::cast_possible_truncation)]
pub fn decode_image(data: &[u8]) -> RenderResult<DecodedImage> {
    let img = image::load_from_memory(data)
        .map_err(|e| RenderError::Resource(format!("Failed to decode image: {e}")))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut pixels = rgba.into_raw();
    for px in pixels.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * a + 127) / 255) as u8;
        }
    }

    let size = IntSize::from_wh(width, height)
        .ok_or_else(|| RenderError::Resource("Image has zero size".to_string()))?;
    let pixmap = Pixmap::from_vec(pixels, size)
        .ok_or_else(|| RenderError::Resource("Invalid image buffer".to_string()))?;

    Ok(DecodedImage {
        width,
        height,
        pixmap: Arc::new(pixmap),
    })
}

/// Split a data URI into its MIME type and decoded bytes.
///
/// Supports formats like: `data:image/png;base64,iVBORw0KGgo...`
///
/// # Errors
///
/// Returns an error if the data URI is malformed.
pub fn parse_data_uri(uri: &str) -> RenderResult<(String, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| RenderError::Resource("Not a data URI".to_string()))?;

    let (metadata, encoded) = rest
        .split_once(',')
        .ok_or_else(|| RenderError::Resource("Invalid data URI: missing comma".to_string()))?;

    let mime = metadata.split(';').next().unwrap_or_default().to_string();
    let bytes = if metadata.contains(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| RenderError::Resource(format!("Failed to decode base64: {e}")))?
    } else {
        percent_decode(encoded)?
    };
    Ok((mime, bytes))
}

/// Encode bytes as a base64 data URI, sniffing the MIME type.
#[must_use]
pub fn to_data_uri(bytes: &[u8]) -> String {
    let mime = ImageFormat::from_magic_bytes(bytes).mime();
    format!(
        "data:{mime};base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

fn percent_decode(input: &str) -> RenderResult<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input
                .get(i + 1..i + 3)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| RenderError::Resource("Invalid URL encoding".to_string()))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

/// A background image reference and, when available, its pixels.
#[derive(Debug, Clone)]
pub struct BackgroundImage {
    /// Data URI when inlined, otherwise the raw reference.
    pub href: String,
    /// Decoded pixels; `None` when the reference could not be loaded.
    pub decoded: Option<DecodedImage>,
}

impl BackgroundImage {
    /// Whether the image is self-contained.
    #[must_use]
    pub fn is_inlined(&self) -> bool {
        self.href.starts_with("data:") && self.decoded.is_some()
    }
}

/// A background ready to draw.
#[derive(Debug, Clone)]
pub struct ResolvedBackground {
    /// Solid fill painted first.
    pub fill: Color,
    /// Image drawn over the fill.
    pub image: Option<BackgroundImage>,
    /// Fit mode for the image.
    pub fit: BackgroundFit,
}

impl ResolvedBackground {
    /// A plain color background.
    #[must_use]
    pub fn solid(fill: Color) -> Self {
        Self {
            fill,
            image: None,
            fit: BackgroundFit::Cover,
        }
    }

    /// Placement of the decoded image on a canvas, if there is one.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn placement(&self, canvas_w: f32, canvas_h: f32) -> Option<Rect> {
        let decoded = self.image.as_ref()?.decoded.as_ref()?;
        Some(fit_rect(
            decoded.width as f32,
            decoded.height as f32,
            canvas_w,
            canvas_h,
            self.fit,
        ))
    }
}

/// Fetches remote image bytes.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch the bytes behind `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource cannot be fetched.
    async fn fetch(&self, url: &str) -> RenderResult<Vec<u8>>;
}

/// Limits applied to remote background fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Limit on the whole request, body included.
    pub timeout: Duration,
    /// Largest body accepted.
    pub max_bytes: usize,
    /// Allow loopback, private and link-local targets.
    pub allow_private_hosts: bool,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
            max_bytes: MAX_IMAGE_BYTES,
            allow_private_hosts: false,
        }
    }
}

/// HTTP(S) fetcher backed by reqwest.
///
/// Hostnames resolving only to non-public addresses are refused, as are
/// IP-literal URLs and redirects pointing at them, unless the policy allows
/// private hosts. Bodies are read chunk by chunk and abandoned at the limit.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    policy: FetchPolicy,
}

impl HttpFetcher {
    /// Create a fetcher.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(policy: FetchPolicy) -> RenderResult<Self> {
        let allow_private = policy.allow_private_hosts;
        let redirects = reqwest::redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                attempt.error("too many redirects")
            } else if let Err(reason) = check_target(attempt.url(), allow_private) {
                attempt.error(reason)
            } else {
                attempt.follow()
            }
        });

        let mut builder = reqwest::Client::builder()
            .timeout(policy.timeout)
            .connect_timeout(policy.timeout)
            .redirect(redirects);
        if !allow_private {
            builder = builder.dns_resolver(Arc::new(PublicResolver));
        }
        let client = builder
            .build()
            .map_err(|e| RenderError::Resource(format!("HTTP client: {e}")))?;
        Ok(Self { client, policy })
    }

    /// The limits this fetcher applies.
    #[must_use]
    pub fn policy(&self) -> FetchPolicy {
        self.policy
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> RenderResult<Vec<u8>> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| RenderError::Resource(format!("Invalid URL {url}: {e}")))?;
        check_target(&parsed, self.policy.allow_private_hosts)
            .map_err(|reason| RenderError::Resource(format!("Refusing {url}: {reason}")))?;

        let mut response = self
            .client
            .get(parsed)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| RenderError::Resource(format!("Fetching {url}: {e}")))?;

        let limit = self.policy.max_bytes;
        let too_large = || RenderError::Resource(format!("{url} exceeds the {limit} byte limit"));
        if response
            .content_length()
            .is_some_and(|len| len > limit as u64)
        {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| RenderError::Resource(format!("Reading {url}: {e}")))?
        {
            if body.len() + chunk.len() > limit {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

/// Scheme and IP-literal checks for a fetch target.
fn check_target(url: &reqwest::Url, allow_private: bool) -> Result<(), String> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    let host = url.host_str().ok_or_else(|| "missing host".to_string())?;
    if allow_private {
        return Ok(());
    }
    let literal = host.trim_start_matches('[').trim_end_matches(']');
    match literal.parse::<IpAddr>() {
        Ok(ip) if !is_public(ip) => Err(format!("{ip} is not a public address")),
        _ => Ok(()),
    }
}

/// Whether `ip` is routable on the public internet.
#[must_use]
pub fn is_public(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, ..] = v4.octets();
            !(v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation()
                || v4.is_multicast()
                || a == 0
                || (a == 100 && (b & 0xC0) == 64))
        }
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_public(IpAddr::V4(v4));
            }
            let head = v6.segments()[0];
            !(v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_multicast()
                || (head & 0xFE00) == 0xFC00
                || (head & 0xFFC0) == 0xFE80)
        }
    }
}

/// DNS resolver that drops non-public addresses.
#[derive(Debug)]
struct PublicResolver;

impl reqwest::dns::Resolve for PublicResolver {
    fn resolve(&self, name: reqwest::dns::Name) -> reqwest::dns::Resolving {
        Box::pin(lookup_public(name.as_str().to_string()))
    }
}

async fn lookup_public(
    host: String,
) -> Result<reqwest::dns::Addrs, Box<dyn std::error::Error + Send + Sync>> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), 0))
        .await?
        .filter(|addr| is_public(addr.ip()))
        .collect();
    if addrs.is_empty() {
        return Err(format!("{host} has no public address").into());
    }
    Ok(Box::new(addrs.into_iter()))
}

/// Turns a draft background into a [`ResolvedBackground`].
#[derive(Clone)]
pub struct BackgroundResolver {
    fetcher: Arc<dyn ImageFetcher>,
}

impl std::fmt::Debug for BackgroundResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundResolver").finish_non_exhaustive()
    }
}

impl BackgroundResolver {
    /// Create a resolver with a custom fetcher.
    #[must_use]
    pub fn new(fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self { fetcher }
    }

    /// Create a resolver fetching over HTTP(S) under `policy`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn http(policy: FetchPolicy) -> RenderResult<Self> {
        Ok(Self::new(Arc::new(HttpFetcher::new(policy)?)))
    }

    /// Resolve without touching the network.
    ///
    /// Colors and data URIs resolve fully; other references are kept raw.
    #[must_use]
    pub fn resolve_local(background: &Background, fit: BackgroundFit) -> ResolvedBackground {
        let fill = background.fill();
        let image = background.image_href().map(|href| {
            if href.starts_with("data:") {
                match parse_data_uri(href).and_then(|(_, bytes)| decode_image(&bytes)) {
                    Ok(decoded) => BackgroundImage {
                        href: href.to_string(),
                        decoded: Some(decoded),
                    },
                    Err(e) => {
                        tracing::warn!("Background data URI unusable, using solid fill: {}", e);
                        raw(href)
                    }
                }
            } else {
                raw(href)
            }
        });
        ResolvedBackground { fill, image, fit }
    }

    /// Resolve, inlining remote images.
    ///
    /// Never fails: an image that cannot be fetched or decoded keeps its raw
    /// reference and the solid fill shows through.
    pub async fn resolve(&self, background: &Background, fit: BackgroundFit) -> ResolvedBackground {
        let Some(href) = background.image_href() else {
            return ResolvedBackground::solid(background.fill()).with_fit(fit);
        };
        if !(href.starts_with("http://") || href.starts_with("https://")) {
            return Self::resolve_local(background, fit);
        }

        let inlined = match self.fetcher.fetch(href).await {
            Ok(bytes) => decode_image(&bytes).map(|decoded| BackgroundImage {
                href: to_data_uri(&bytes),
                decoded: Some(decoded),
            }),
            Err(e) => Err(e),
        };
        let image = inlined.unwrap_or_else(|e| {
            tracing::warn!("Could not inline background {}: {}", href, e);
            raw(href)
        });
        ResolvedBackground {
            fill: background.fill(),
            image: Some(image),
            fit,
        }
    }
}

impl ResolvedBackground {
    /// Replace the fit mode.
    #[must_use]
    pub fn with_fit(mut self, fit: BackgroundFit) -> Self {
        self.fit = fit;
        self
    }
}

fn raw(href: &str) -> BackgroundImage {
    BackgroundImage {
        href: href.to_string(),
        decoded: None,
    }
}
