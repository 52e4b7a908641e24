use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Shown instead of a publication date when the API gives none or an
/// unparseable one.
pub const UNKNOWN_DATE_PLACEHOLDER: &str = "Cultural Discovery";

/// An article as it appears in a digest. It is never stored on its own, only as
/// part of the snapshot kept with each sent newsletter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub description: String,
    pub url: String,
    pub source: String,
    pub published_date: String,
    pub art_form: String,
    pub image_url: Option<String>,
}

/// Formats an ISO-8601 timestamp as `January 05, 2024`.
pub fn format_published_date(published_at: Option<&str>) -> String {
    published_at
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|date| date.format("%B %d, %Y").to_string())
        .unwrap_or_else(|| String::from(UNKNOWN_DATE_PLACEHOLDER))
}
