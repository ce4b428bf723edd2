//! Upstream scraper result format.
//!
//! One JSON file per notable person. Every result carries Wikipedia data and
//! tags; results the scraper finished also carry the editorial summary as a
//! flat piece list plus its metadata.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use editorial_core::error::ReconstructError;
use editorial_core::models::Piece;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScraperResult {
    #[serde(default)]
    pub wikipedia_data: Option<WikipediaData>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub last_updated_on: Option<String>,
    #[serde(default)]
    pub content: Option<Vec<Piece>>,
    #[serde(default)]
    pub religion: Option<String>,
    #[serde(default)]
    pub political_views: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WikipediaData {
    pub url: String,
    pub title: String,
}

/// Borrowed view of a result that has editorial content.
#[derive(Debug, Clone, Copy)]
pub struct ContentView<'a> {
    pub author: &'a str,
    pub last_updated_on: Option<&'a str>,
    pub pieces: &'a [Piece],
}

impl ScraperResult {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn wikipedia(&self) -> Result<&WikipediaData, ReconstructError> {
        self.wikipedia_data
            .as_ref()
            .ok_or_else(|| ReconstructError::MissingExpectedData("wikipediaData".to_string()))
    }

    /// The editorial content, if the scrape produced any.
    pub fn content(&self) -> Result<Option<ContentView<'_>>, ReconstructError> {
        let Some(pieces) = self.content.as_deref() else {
            return Ok(None);
        };
        let author = self
            .author
            .as_deref()
            .ok_or_else(|| ReconstructError::MissingExpectedData("author".to_string()))?;
        Ok(Some(ContentView {
            author,
            last_updated_on: self.last_updated_on.as_deref(),
            pieces,
        }))
    }

    /// Religion and political views, one per line.
    pub fn summary(&self) -> Option<String> {
        let parts: Vec<&str> = [self.religion.as_deref(), self.political_views.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }

    /// SHA-256 over everything an import record is derived from.
    pub fn content_hash(&self) -> Result<String> {
        let canonical = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// Characters whose escapes URI decoding leaves in place.
const RESERVED: &[u8] = b";/?:@&=+$,#";

/// Slug from a Wikipedia URL: URI-decoded, with `prefix` removed.
///
/// Escapes of reserved characters are kept verbatim, everything else is
/// decoded.
pub fn slug_from_url(url: &str, prefix: &str) -> Result<String> {
    let protected = protect_reserved(url);
    let decoded = urlencoding::decode(&protected)
        .with_context(|| format!("Wikipedia URL is not valid UTF-8 once decoded: {}", url))?;
    Ok(decoded.replacen(prefix, "", 1))
}

/// Re-escape the `%` of every reserved escape so decoding restores it as is.
fn protect_reserved(url: &str) -> String {
    let bytes = url.as_bytes();
    let mut out = String::with_capacity(url.len());
    let mut start = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        if byte != b'%' || i + 2 >= bytes.len() {
            continue;
        }
        let escaped = std::str::from_utf8(&bytes[i + 1..i + 3])
            .ok()
            .and_then(|hex| u8::from_str_radix(hex, 16).ok());
        if escaped.is_some_and(|b| RESERVED.contains(&b)) {
            out.push_str(&url[start..i]);
            out.push_str("%25");
            start = i + 1;
        }
    }
    out.push_str(&url[start..]);
    out
}

/// Parse `lastUpdatedOn`: RFC 3339, a naive date-time, or a bare date (UTC).
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt.and_utc());
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Unrecognised timestamp: '{}'", value))?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .with_context(|| format!("Unrecognised timestamp: '{}'", value))
}
