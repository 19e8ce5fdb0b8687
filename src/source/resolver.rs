//! Source resolution for PDF data

use crate::error::{Error, Result};
use crate::source::{OutputCache, SelectedFile};
use base64::Engine;
use futures_util::StreamExt;
use std::future::Future;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_REDIRECTS: usize = 10;

/// Read a file from disk into a selected file.
pub fn resolve_path<P: AsRef<Path>>(path: P) -> Result<SelectedFile> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(Error::PdfNotFound {
            path: path.display().to_string(),
        });
    }

    let data = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    Ok(SelectedFile::new(name, None, data))
}

/// Decode an uploaded (base64) file, the equivalent of a picked or dropped file.
pub fn resolve_base64(
    base64_data: &str,
    file_name: Option<&str>,
    mime_type: Option<&str>,
) -> Result<SelectedFile> {
    let engine = base64::engine::general_purpose::STANDARD;
    let data = engine.decode(base64_data.trim())?;
    let name = file_name.unwrap_or("<base64>");
    Ok(SelectedFile::new(name, mime_type, data))
}

/// Check if an IP address is private/reserved (loopback, link-local, private ranges, etc.)
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local() // 169.254/16, cloud metadata
                || v4.is_broadcast()
                || v4.is_unspecified()
                || v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64 // CGNAT 100.64/10
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xFE00) == 0xFC00 // fc00::/7
                || (first & 0xFFC0) == 0xFE80 // fe80::/10
        }
    }
}

/// Resolve the URL host and refuse private or reserved addresses
async fn check_ssrf(url: &url::Url) -> Result<()> {
    let host = url.host_str().ok_or_else(|| Error::SourceResolution {
        reason: "URL has no host".to_string(),
    })?;
    let port = url.port_or_known_default().unwrap_or(443);

    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| Error::SourceResolution {
            reason: format!("DNS resolution failed for {}: {}", host, e),
        })?;

    for addr in addrs {
        if is_private_ip(&addr.ip()) {
            return Err(Error::SsrfBlocked {
                url: url.to_string(),
            });
        }
    }

    Ok(())
}

/// Parse and validate a download URL (http/https only)
pub fn parse_download_url(url_str: &str) -> Result<url::Url> {
    let trimmed = url_str.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyInput {
            field: "url".to_string(),
        });
    }

    let parsed = url::Url::parse(trimmed).map_err(|e| Error::InvalidArgument {
        name: "url".to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(Error::InvalidArgument {
            name: "url".to_string(),
            reason: format!("unsupported scheme {}", other),
        }),
    }
}

/// Follow a redirect `Location` relative to the current URL
fn redirect_target(current: &url::Url, location: &str) -> Result<url::Url> {
    let next = current
        .join(location.trim())
        .map_err(|e| Error::SourceResolution {
            reason: format!("Invalid redirect location {}: {}", location, e),
        })?;
    parse_download_url(next.as_str())
}

/// GET `url`, following up to [`MAX_REDIRECTS`] redirects. `guard` runs
/// before every request, so each hop is checked on its own.
async fn fetch_following_redirects<F, Fut>(
    client: &reqwest::Client,
    mut url: url::Url,
    guard: F,
) -> Result<(url::Url, reqwest::Response)>
where
    F: Fn(url::Url) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut redirects = 0;
    loop {
        guard(url.clone()).await?;

        let response = client.get(url.clone()).send().await?;
        if !response.status().is_redirection() {
            return Ok((url, response));
        }

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::SourceResolution {
                reason: format!("Redirect ({}) without a Location header", response.status()),
            })?;
        redirects += 1;
        if redirects > MAX_REDIRECTS {
            return Err(Error::SourceResolution {
                reason: format!("Too many redirects (more than {})", MAX_REDIRECTS),
            });
        }
        let next = redirect_target(&url, location)?;
        tracing::debug!(from = %url, to = %next, "following redirect");
        url = next;
    }
}

/// Read the file name from a `Content-Disposition` header value.
///
/// Accepts `filename="name.pdf"` and the unquoted `filename=name.pdf` form.
pub fn content_disposition_file_name(header: &str) -> Option<String> {
    header.split(';').find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("filename") {
            return None;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        Some(value.to_string()).filter(|v| !v.is_empty())
    })
}

/// Fetch a URL with SSRF protection and a download size cap.
///
/// Redirects are followed by hand so every hop passes the SSRF check. The
/// response `Content-Type` becomes the declared MIME type of the file, and
/// the `Content-Disposition` file name, when present, its name.
pub async fn resolve_url(
    url_str: &str,
    allow_private_urls: bool,
    max_download_bytes: u64,
) -> Result<SelectedFile> {
    let url = parse_download_url(url_str)?;

    let client = reqwest::Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    let (url, response) = fetch_following_redirects(&client, url, move |hop| async move {
        if allow_private_urls {
            Ok(())
        } else {
            check_ssrf(&hop).await
        }
    })
    .await?;

    if !response.status().is_success() {
        return Err(Error::SourceResolution {
            reason: format!("HTTP request failed with status: {}", response.status()),
        });
    }

    if let Some(content_length) = response.content_length() {
        if content_length > max_download_bytes {
            return Err(Error::DownloadTooLarge {
                size: content_length,
                max_size: max_download_bytes,
            });
        }
    }

    let header = |name: reqwest::header::HeaderName| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let content_type = header(reqwest::header::CONTENT_TYPE);
    let name = header(reqwest::header::CONTENT_DISPOSITION)
        .as_deref()
        .and_then(content_disposition_file_name)
        .unwrap_or_else(|| url.to_string());

    let mut data = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        data.extend_from_slice(&chunk);
        if data.len() as u64 > max_download_bytes {
            return Err(Error::DownloadTooLarge {
                size: data.len() as u64,
                max_size: max_download_bytes,
            });
        }
    }

    tracing::debug!(url = %url, name = %name, bytes = data.len(), content_type = ?content_type, "downloaded source");

    Ok(SelectedFile::new(name, content_type.as_deref(), data))
}

/// Look up a previously produced or uploaded document by cache key
pub fn resolve_cache(cache_key: &str, cache: &OutputCache) -> Result<SelectedFile> {
    let data = cache.get(cache_key).ok_or_else(|| Error::CacheKeyNotFound {
        key: cache_key.to_string(),
    })?;

    // Only documents produced by this server are cached, so the content decides
    Ok(SelectedFile::new(format!("<cache:{}>", cache_key), None, data))
}
