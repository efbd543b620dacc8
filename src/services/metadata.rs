//! External ISBN metadata lookups.
//!
//! Lookups are best-effort: providers never return errors, any failure is
//! logged and reported as "no data".

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    config::MetadataConfig,
    error::{AppError, AppResult},
    models::book::BookMetadata,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Look up bibliographic data for a normalized ISBN
    async fn fetch_by_isbn(&self, isbn: &str) -> Option<BookMetadata>;
}

/// Build the provider selected by configuration
pub fn provider_from_config(config: &MetadataConfig) -> AppResult<Arc<dyn MetadataProvider>> {
    if !config.enabled {
        tracing::info!("ISBN metadata lookups disabled");
        return Ok(Arc::new(DisabledMetadata));
    }
    Ok(Arc::new(GoogleBooksClient::new(config)?))
}

/// Provider used when lookups are turned off
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledMetadata;

#[async_trait]
impl MetadataProvider for DisabledMetadata {
    async fn fetch_by_isbn(&self, _isbn: &str) -> Option<BookMetadata> {
        None
    }
}

/// Google Books volumes API client
#[derive(Clone)]
pub struct GoogleBooksClient {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleBooksClient {
    pub fn new(config: &MetadataConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout())
            .timeout(config.timeout())
            .user_agent(concat!("library-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn request(&self, isbn: &str) -> Result<VolumesResponse, reqwest::Error> {
        self.client
            .get(format!("{}/volumes", self.base_url))
            .query(&[("q", format!("isbn:{}", isbn))])
            .send()
            .await?
            .error_for_status()?
            .json::<VolumesResponse>()
            .await
    }
}

#[async_trait]
impl MetadataProvider for GoogleBooksClient {
    async fn fetch_by_isbn(&self, isbn: &str) -> Option<BookMetadata> {
        match self.request(isbn).await {
            Ok(response) => response.into_metadata(),
            Err(e) => {
                tracing::warn!("ISBN lookup failed for {}: {}", isbn, e);
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    volume_info: VolumeInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    published_date: Option<String>,
    description: Option<String>,
    page_count: Option<i32>,
    image_links: Option<ImageLinks>,
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageLinks {
    thumbnail: Option<String>,
    small_thumbnail: Option<String>,
}

impl VolumesResponse {
    fn into_metadata(self) -> Option<BookMetadata> {
        let info = self.items.into_iter().next()?.volume_info;

        let metadata = BookMetadata {
            title: info.title,
            author: info.authors.into_iter().next(),
            year: info.published_date.as_deref().and_then(parse_year),
            description: info.description,
            cover_url: info
                .image_links
                .and_then(|links| links.thumbnail.or(links.small_thumbnail)),
            page_count: info.page_count,
            language: info.language,
        };

        (!metadata.is_empty()).then_some(metadata)
    }
}

/// Leading year of a `YYYY`, `YYYY-MM` or `YYYY-MM-DD` date
fn parse_year(date: &str) -> Option<i32> {
    date.get(..4)?.parse().ok()
}
