use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use std::time;

use crate::domain::article::{format_published_date, Article};
use crate::utils::error_chain_fmt;

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);
const MIN_DESCRIPTION_LENGTH: usize = 50;
/// Placeholder the news API puts in place of articles that were taken down.
pub const REMOVED_CONTENT_MARKER: &str = "[Removed]";

/// Client for the news search API (`/everything` endpoint).
#[derive(Clone)]
pub struct NewsClient {
    http_client: Client,
    base_url: String,
    api_key: Secret<String>,
}

#[derive(serde::Deserialize)]
struct SearchResponse {
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(serde::Deserialize, Default, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RawArticle {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub source: Option<RawSource>,
    pub published_at: Option<String>,
    pub url_to_image: Option<String>,
}

#[derive(serde::Deserialize, Default, Debug)]
pub struct RawSource {
    pub name: Option<String>,
}

#[derive(thiserror::Error)]
pub enum FetchError {
    #[error("Failed to reach the news API.")]
    Transport(#[source] reqwest::Error),
    #[error("The news API answered with status {0}.")]
    Status(StatusCode),
    #[error("Failed to decode the news API response.")]
    Decode(#[source] reqwest::Error),
}

impl std::fmt::Debug for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl NewsClient {
    pub fn new(
        base_url: String,
        api_key: Secret<String>,
        timeout: Option<time::Duration>,
    ) -> Result<NewsClient, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()?;

        Ok(NewsClient {
            http_client,
            base_url,
            api_key,
        })
    }

    /// Returns at most `limit` articles about `topic` that pass the quality
    /// filter. Failures are logged and reported as no articles.
    #[tracing::instrument(name = "Fetch articles for a topic", skip(self, keywords))]
    pub async fn fetch_for_topic(&self, topic: &str, keywords: &[String], limit: usize) -> Vec<Article> {
        if limit == 0 {
            return Vec::new();
        }

        match self.search(topic, keywords, limit).await {
            Ok(articles) => articles,
            Err(err) => {
                tracing::error!(error = ?err, "Error fetching articles for {}", topic);
                Vec::new()
            }
        }
    }

    async fn search(
        &self,
        topic: &str,
        keywords: &[String],
        limit: usize,
    ) -> Result<Vec<Article>, FetchError> {
        let url = format!("{}/everything", self.base_url);
        // Ask for more than needed, the quality filter drops a good share.
        let page_size = (limit * 2).to_string();
        let query = build_query(topic, keywords);

        let response = self
            .http_client
            .get(&url)
            .header("X-Api-Key", self.api_key.expose_secret())
            .query(&[
                ("q", query.as_str()),
                ("language", "en"),
                ("sortBy", "relevancy"),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await
            .map_err(FetchError::Transport)?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let body: SearchResponse = response.json().await.map_err(FetchError::Decode)?;

        Ok(body
            .articles
            .into_iter()
            .filter(is_quality_article)
            .map(|raw| into_article(raw, topic))
            .take(limit)
            .collect())
    }
}

/// Keywords joined with `OR`, or the bare topic name when there are none.
pub fn build_query(topic: &str, keywords: &[String]) -> String {
    if keywords.is_empty() {
        topic.to_string()
    } else {
        keywords.join(" OR ")
    }
}

pub fn is_quality_article(article: &RawArticle) -> bool {
    let title = article.title.as_deref().unwrap_or_default();
    let description = article.description.as_deref().unwrap_or_default();

    if title.trim().is_empty() || description.trim().is_empty() {
        return false;
    }

    if description.chars().count() < MIN_DESCRIPTION_LENGTH {
        return false;
    }

    !title.contains(REMOVED_CONTENT_MARKER) && !description.contains(REMOVED_CONTENT_MARKER)
}

fn into_article(raw: RawArticle, topic: &str) -> Article {
    Article {
        title: raw.title.unwrap_or_else(|| String::from("No title")),
        description: raw
            .description
            .unwrap_or_else(|| String::from("No description available")),
        url: raw.url.unwrap_or_else(|| String::from("#")),
        source: raw
            .source
            .and_then(|source| source.name)
            .unwrap_or_else(|| String::from("Cultural Source")),
        published_date: format_published_date(raw.published_at.as_deref()),
        art_form: topic.to_string(),
        image_url: raw.url_to_image.filter(|url| !url.is_empty()),
    }
}
