//! Download links for generated documents
//!
//! Every tool that produces a file hands it to [`DownloadLink`]: the bytes go
//! into the output cache, optionally onto disk, and the caller receives the
//! cache key (absent when the document is larger than the cache budget), a
//! file name, and a human-readable size.

use schemars::JsonSchema;
use serde::Serialize;

const SIZE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Format a byte count with binary units, e.g. `1536` -> `"1.5 KB"`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, SIZE_UNITS[unit])
}

/// Turn an arbitrary candidate (file name, URL path segment, title) into a
/// safe `.pdf` file name, falling back to `fallback` when nothing usable remains.
pub fn suggest_file_name(candidate: Option<&str>, fallback: &str) -> String {
    let base = candidate
        .map(|c| c.rsplit(['/', '\\']).next().unwrap_or(c))
        .map(|c| c.split(['?', '#']).next().unwrap_or(c))
        .map(sanitize)
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| sanitize(fallback));

    let lower = base.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        base
    } else {
        let stem = base.trim_end_matches('.');
        format!("{}.pdf", stem)
    }
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim().trim_start_matches('.').to_string()
}

/// A generated document made available to the caller
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DownloadLink {
    /// Cache key for chaining with other tools; absent when the document
    /// exceeds the cache budget
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,
    /// Suggested file name
    pub file_name: String,
    /// Size in bytes
    pub size: u64,
    /// Human-readable size (e.g. "1.5 KB")
    pub size_label: String,
    /// Path where the file was written (if an output path was requested)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl DownloadLink {
    pub fn new(
        cache_key: Option<String>,
        file_name: String,
        size: u64,
        path: Option<String>,
    ) -> Self {
        Self {
            cache_key,
            file_name,
            size,
            size_label: format_file_size(size),
            path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0, "0 Bytes")]
    #[case(1, "1 Bytes")]
    #[case(1000, "1000 Bytes")]
    #[case(1024, "1 KB")]
    #[case(1536, "1.5 KB")]
    #[case(1_048_576, "1 MB")]
    #[case(1_500_000, "1.43 MB")]
    #[case(5 * 1024 * 1024 * 1024, "5 GB")]
    fn test_format_file_size(#[case] bytes: u64, #[case] expected: &str) {
        assert_eq!(format_file_size(bytes), expected);
    }

    #[rstest]
    #[case(Some("report.pdf"), "report.pdf")]
    #[case(Some("Report.PDF"), "Report.PDF")]
    #[case(Some("/files/2024/invoice"), "invoice.pdf")]
    #[case(Some("https://example.com/docs/paper.pdf?dl=1"), "paper.pdf")]
    #[case(Some("a:b*c.pdf"), "a_b_c.pdf")]
    #[case(Some("https://example.com/"), "download.pdf")]
    #[case(None, "download.pdf")]
    fn test_suggest_file_name(#[case] candidate: Option<&str>, #[case] expected: &str) {
        assert_eq!(suggest_file_name(candidate, "download"), expected);
    }

    #[test]
    fn test_download_link_label() {
        let link = DownloadLink::new(Some("k".to_string()), "a.pdf".to_string(), 1536, None);
        assert_eq!(link.size_label, "1.5 KB");

        let uncached = DownloadLink::new(None, "a.pdf".to_string(), 10, None);
        let json = serde_json::to_value(&uncached).unwrap();
        assert!(json.get("cache_key").is_none());
    }
}
