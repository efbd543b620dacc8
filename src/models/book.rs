//! Book model and related request/query types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Default page size when `limit` is not given
pub const DEFAULT_LIMIT: i64 = 100;

/// Circulation status of a book. Stored as lowercase text.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum BookStatus {
    #[default]
    Available,
    Borrowed,
    Reserved,
    Maintenance,
}

/// Full book record (DB + API)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub year: Option<i32>,
    /// Normalized ISBN (no spaces or hyphens, upper-case)
    pub isbn: Option<String>,
    pub cover_url: Option<String>,
    pub language: Option<String>,
    pub page_count: Option<i32>,
    pub status: BookStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 100, message = "Author must be 1-100 characters"))]
    pub author: String,
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,
    #[validate(range(min = 1000, max = 2100, message = "Year must be between 1000 and 2100"))]
    pub year: Option<i32>,
    /// ISBN as typed; hyphens and spaces are allowed
    #[validate(length(max = 20, message = "ISBN must be at most 20 characters"))]
    pub isbn: Option<String>,
    #[validate(length(max = 500, message = "Cover URL must be at most 500 characters"))]
    pub cover_url: Option<String>,
    #[validate(length(max = 20, message = "Language must be at most 20 characters"))]
    pub language: Option<String>,
    #[validate(range(min = 1, message = "Page count must be at least 1"))]
    pub page_count: Option<i32>,
    #[serde(default)]
    pub status: BookStatus,
}

impl CreateBook {
    /// Whether an external lookup could fill something the caller left out
    pub fn needs_enrichment(&self) -> bool {
        is_blank(&self.description) || is_blank(&self.cover_url)
    }

    /// Fill blank fields from external metadata. Supplied fields always win.
    pub fn fill_from(&mut self, metadata: BookMetadata) {
        fill_blank(&mut self.description, metadata.description);
        fill_blank(&mut self.cover_url, metadata.cover_url);
        fill_blank(&mut self.language, metadata.language);
        if self.year.is_none() {
            self.year = metadata.year;
        }
        if self.page_count.is_none() {
            self.page_count = metadata.page_count;
        }
    }
}

/// Partial update request.
///
/// Absent fields are left untouched. For nullable columns an explicit `null`
/// clears the stored value.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct BookPatch {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Author must be 1-100 characters"))]
    pub author: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i32>)]
    #[validate(range(min = 1000, max = 2100, message = "Year must be between 1000 and 2100"))]
    pub year: Option<Option<i32>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    #[validate(length(max = 20, message = "ISBN must be at most 20 characters"))]
    pub isbn: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    #[validate(length(max = 500, message = "Cover URL must be at most 500 characters"))]
    pub cover_url: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    #[validate(length(max = 20, message = "Language must be at most 20 characters"))]
    pub language: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i32>)]
    #[validate(range(min = 1, message = "Page count must be at least 1"))]
    pub page_count: Option<Option<i32>>,
    pub status: Option<BookStatus>,
}

impl BookPatch {
    /// Merge the supplied fields into `book`
    pub fn apply(&self, book: &mut Book) {
        if let Some(ref title) = self.title {
            book.title = title.clone();
        }
        if let Some(ref author) = self.author {
            book.author = author.clone();
        }
        if let Some(ref description) = self.description {
            book.description = description.clone();
        }
        if let Some(year) = self.year {
            book.year = year;
        }
        if let Some(ref isbn) = self.isbn {
            book.isbn = isbn.clone();
        }
        if let Some(ref cover_url) = self.cover_url {
            book.cover_url = cover_url.clone();
        }
        if let Some(ref language) = self.language {
            book.language = language.clone();
        }
        if let Some(page_count) = self.page_count {
            book.page_count = page_count;
        }
        if let Some(status) = self.status {
            book.status = status;
        }
    }
}

/// Sortable columns. Unknown keys sort by creation date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    Title,
    Author,
    Year,
    #[default]
    CreatedAt,
}

impl SortField {
    /// Column to order by. Text columns sort on their case-folded key.
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Title => "title_key",
            SortField::Author => "author_key",
            SortField::Year => "year",
            SortField::CreatedAt => "created_at",
        }
    }
}

impl From<&str> for SortField {
    fn from(s: &str) -> Self {
        match s {
            "title" => SortField::Title,
            "author" => SortField::Author,
            "year" => SortField::Year,
            _ => SortField::CreatedAt,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl From<&str> for SortOrder {
    fn from(s: &str) -> Self {
        match s {
            "asc" => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }
}

/// Book list query parameters (API)
#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Number of matching books to skip (default: 0)
    #[validate(range(min = 0, message = "skip must not be negative"))]
    pub skip: Option<i64>,
    /// Page size, 1-100 (default: 100)
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<i64>,
    /// Case-insensitive search in title or author
    pub q: Option<String>,
    /// Case-insensitive search in author
    pub author: Option<String>,
    /// Exact publication year
    #[validate(range(min = 1000, max = 2100, message = "year must be between 1000 and 2100"))]
    pub year: Option<i32>,
    /// Minimum publication year (inclusive)
    #[validate(range(min = 1000, max = 2100, message = "year_min must be between 1000 and 2100"))]
    pub year_min: Option<i32>,
    /// Maximum publication year (inclusive)
    #[validate(range(min = 1000, max = 2100, message = "year_max must be between 1000 and 2100"))]
    pub year_max: Option<i32>,
    /// One of `title`, `author`, `year`, `created_at` (default)
    pub sort: Option<String>,
    /// `asc` or `desc` (default)
    pub order: Option<String>,
}

/// Row filters for a book search. All supplied filters must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    pub q: Option<String>,
    pub author: Option<String>,
    pub year: Option<i32>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
}

/// Fully resolved search request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookSearch {
    pub filter: BookFilter,
    pub sort: SortField,
    pub order: SortOrder,
    pub skip: i64,
    pub limit: i64,
}

impl Default for BookSearch {
    fn default() -> Self {
        Self {
            filter: BookFilter::default(),
            sort: SortField::default(),
            order: SortOrder::default(),
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl BookQuery {
    /// Resolve defaults and check the year range.
    pub fn into_search(self) -> AppResult<BookSearch> {
        if let (Some(min), Some(max)) = (self.year_min, self.year_max) {
            if min > max {
                return Err(AppError::Validation(
                    "year_min must be less than or equal to year_max".to_string(),
                ));
            }
        }

        Ok(BookSearch {
            filter: BookFilter {
                q: non_blank(self.q),
                author: non_blank(self.author),
                year: self.year,
                year_min: self.year_min,
                year_max: self.year_max,
            },
            sort: self.sort.as_deref().map(SortField::from).unwrap_or_default(),
            order: self.order.as_deref().map(SortOrder::from).unwrap_or_default(),
            skip: self.skip.unwrap_or(0),
            limit: self.limit.unwrap_or(DEFAULT_LIMIT),
        })
    }
}

/// Bibliographic data returned by an external ISBN registry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct BookMetadata {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub author: Option<String>,
    #[validate(range(min = 1000, max = 2100))]
    pub year: Option<i32>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 500))]
    pub cover_url: Option<String>,
    #[validate(range(min = 1))]
    pub page_count: Option<i32>,
    #[validate(length(max = 20))]
    pub language: Option<String>,
}

impl BookMetadata {
    pub fn is_empty(&self) -> bool {
        self == &BookMetadata::default()
    }

    /// Drop blank values and every field that would be rejected as user input.
    pub fn sanitized(mut self) -> Self {
        self.title = non_blank(self.title);
        self.author = non_blank(self.author);
        self.description = non_blank(self.description);
        self.cover_url = non_blank(self.cover_url);
        self.language = non_blank(self.language);

        if let Err(errors) = self.validate() {
            for field in errors.field_errors().keys() {
                match &**field {
                    "title" => self.title = None,
                    "author" => self.author = None,
                    "year" => self.year = None,
                    "description" => self.description = None,
                    "cover_url" => self.cover_url = None,
                    "page_count" => self.page_count = None,
                    "language" => self.language = None,
                    _ => {}
                }
            }
        }
        self
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}

fn fill_blank(target: &mut Option<String>, value: Option<String>) {
    if is_blank(target) && value.is_some() {
        *target = value;
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
