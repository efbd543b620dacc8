//! Book catalog service

use std::{sync::Arc, time::Duration};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookMetadata, BookPatch, BookSearch, CreateBook},
    repository::Repository,
};

use super::metadata::MetadataProvider;

/// Strip whitespace and hyphens and upper-case ASCII letters. The result is
/// never longer than the input.
/// Returns `None` when nothing is left.
pub fn normalize_isbn(raw: &str) -> Option<String> {
    let normalized: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    (!normalized.is_empty()).then_some(normalized)
}

fn duplicate_isbn(isbn: &str) -> AppError {
    AppError::Conflict(format!("A book with ISBN {} already exists", isbn))
}

fn book_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Book {} not found", id))
}

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
    metadata: Arc<dyn MetadataProvider>,
    lookup_timeout: Duration,
}

impl BooksService {
    pub fn new(
        repository: Repository,
        metadata: Arc<dyn MetadataProvider>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            metadata,
            lookup_timeout,
        }
    }

    /// Create a book.
    ///
    /// The ISBN is normalized and must be unused. When an ISBN is given and
    /// the description or cover is blank, the external registry is asked to
    /// fill the blanks before the insert.
    pub async fn create_book(&self, mut book: CreateBook) -> AppResult<Book> {
        book.isbn = book.isbn.as_deref().and_then(normalize_isbn);

        if let Some(isbn) = book.isbn.clone() {
            {
                let mut conn = self.repository.books.acquire().await?;
                if self
                    .repository
                    .books
                    .get_by_isbn(&mut conn, &isbn)
                    .await?
                    .is_some()
                {
                    return Err(duplicate_isbn(&isbn));
                }
            }

            if book.needs_enrichment() {
                if let Some(metadata) = self.fetch_metadata(&isbn).await {
                    book.fill_from(metadata);
                }
            }
        }

        // The unique index still catches a concurrent insert of the same ISBN
        let mut tx = self.repository.books.begin().await?;
        let created = self.repository.books.create(&mut tx, &book).await?;
        tx.commit().await?;

        tracing::info!("Created book id={} isbn={:?}", created.id, created.isbn);
        Ok(created)
    }

    pub async fn get_book(&self, id: i64) -> AppResult<Book> {
        let mut conn = self.repository.books.acquire().await?;
        self.repository
            .books
            .get(&mut conn, id)
            .await?
            .ok_or_else(|| book_not_found(id))
    }

    /// Page of matching books and the total number of matches
    pub async fn list_books(&self, search: &BookSearch) -> AppResult<(Vec<Book>, i64)> {
        let mut conn = self.repository.books.acquire().await?;
        self.repository.books.search(&mut conn, search).await
    }

    pub async fn count_books(&self) -> AppResult<i64> {
        let mut conn = self.repository.books.acquire().await?;
        self.repository.books.count(&mut conn).await
    }

    /// Apply a partial update. A new ISBN is normalized and must not belong
    /// to another book.
    pub async fn update_book(&self, id: i64, mut patch: BookPatch) -> AppResult<Book> {
        let mut tx = self.repository.books.begin().await?;

        let book = self
            .repository
            .books
            .get(&mut tx, id)
            .await?
            .ok_or_else(|| book_not_found(id))?;

        if let Some(isbn) = patch.isbn.take() {
            let isbn = isbn.as_deref().and_then(normalize_isbn);
            if let Some(ref value) = isbn {
                if let Some(other) = self.repository.books.get_by_isbn(&mut tx, value).await? {
                    if other.id != id {
                        return Err(duplicate_isbn(value));
                    }
                }
            }
            patch.isbn = Some(isbn);
        }

        let updated = self.repository.books.update(&mut tx, &book, &patch).await?;
        tx.commit().await?;

        tracing::info!("Updated book id={}", id);
        Ok(updated)
    }

    pub async fn delete_book(&self, id: i64) -> AppResult<()> {
        let mut tx = self.repository.books.begin().await?;
        if !self.repository.books.delete(&mut tx, id).await? {
            return Err(book_not_found(id));
        }
        tx.commit().await?;

        tracing::info!("Deleted book id={}", id);
        Ok(())
    }

    /// Look up external metadata for an ISBN. Never fails: a blank ISBN or
    /// any lookup problem yields `None`.
    pub async fn lookup_isbn(&self, isbn: &str) -> Option<BookMetadata> {
        let isbn = normalize_isbn(isbn)?;
        self.fetch_metadata(&isbn).await
    }

    async fn fetch_metadata(&self, isbn: &str) -> Option<BookMetadata> {
        match tokio::time::timeout(self.lookup_timeout, self.metadata.fetch_by_isbn(isbn)).await {
            Ok(Some(metadata)) => {
                // External data obeys the same constraints as user input
                let metadata = metadata.sanitized();
                (!metadata.is_empty()).then_some(metadata)
            }
            Ok(None) => {
                tracing::debug!("No metadata found for ISBN {}", isbn);
                None
            }
            Err(_) => {
                tracing::warn!(
                    "Metadata lookup for ISBN {} timed out after {:?}",
                    isbn,
                    self.lookup_timeout
                );
                None
            }
        }
    }
}
