//! Books repository.
//!
//! Every query runs on a borrowed connection so the service decides whether it
//! belongs to a transaction or to a plain pooled connection.

use chrono::Utc;
use sqlx::{pool::PoolConnection, Pool, QueryBuilder, Sqlite, SqliteConnection, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookFilter, BookPatch, BookSearch, CreateBook},
};

const DUPLICATE_ISBN: &str = "ISBN already exists";

/// Case-folded form of a title or author, stored in the `*_key` columns
fn search_key(text: &str) -> String {
    text.to_lowercase()
}

/// Turn free text into a LIKE pattern matching it literally as a substring
fn like_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Start a query with `head` followed by the WHERE clause for `filter`
fn filtered_query(head: &str, filter: &BookFilter) -> QueryBuilder<'static, Sqlite> {
    let mut builder = QueryBuilder::new(head);
    builder.push(" WHERE 1=1");

    if let Some(ref q) = filter.q {
        let pattern = like_pattern(&search_key(q));
        builder
            .push(" AND (title_key LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR author_key LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }

    if let Some(ref author) = filter.author {
        builder
            .push(" AND author_key LIKE ")
            .push_bind(like_pattern(&search_key(author)))
            .push(" ESCAPE '\\'");
    }

    if let Some(year) = filter.year {
        builder.push(" AND year = ").push_bind(year);
    }

    if let Some(year_min) = filter.year_min {
        builder.push(" AND year >= ").push_bind(year_min);
    }

    if let Some(year_max) = filter.year_max {
        builder.push(" AND year <= ").push_bind(year_max);
    }

    builder
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Sqlite>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Borrow a pooled connection; it returns to the pool when dropped
    pub async fn acquire(&self) -> AppResult<PoolConnection<Sqlite>> {
        Ok(self.pool.acquire().await?)
    }

    /// Begin a transaction; it rolls back unless committed
    pub async fn begin(&self) -> AppResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    // =========================================================================
    // READ
    // =========================================================================

    pub async fn get(&self, conn: &mut SqliteConnection, id: i64) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(book)
    }

    /// Find the book holding a normalized ISBN
    pub async fn get_by_isbn(
        &self,
        conn: &mut SqliteConnection,
        isbn: &str,
    ) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE isbn = ?")
            .bind(isbn)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(book)
    }

    pub async fn count(&self, conn: &mut SqliteConnection) -> AppResult<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&mut *conn)
            .await?;
        Ok(total)
    }

    // =========================================================================
    // SEARCH
    // =========================================================================

    /// Filtered, sorted page of books plus the number of matches before paging
    pub async fn search(
        &self,
        conn: &mut SqliteConnection,
        search: &BookSearch,
    ) -> AppResult<(Vec<Book>, i64)> {
        let total: i64 = filtered_query("SELECT COUNT(*) FROM books", &search.filter)
            .build_query_scalar()
            .fetch_one(&mut *conn)
            .await?;

        let direction = search.order.as_sql();
        let mut builder = filtered_query("SELECT * FROM books", &search.filter);
        builder
            .push(format!(
                " ORDER BY {} {}, id {}",
                search.sort.column(),
                direction,
                direction
            ))
            .push(" LIMIT ")
            .push_bind(search.limit)
            .push(" OFFSET ")
            .push_bind(search.skip);

        let books = builder
            .build_query_as::<Book>()
            .fetch_all(&mut *conn)
            .await?;

        Ok((books, total))
    }

    // =========================================================================
    // CREATE
    // =========================================================================

    /// Insert a book. The ISBN must already be normalized.
    pub async fn create(&self, conn: &mut SqliteConnection, book: &CreateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (
                title, author, title_key, author_key, description, year, isbn,
                cover_url, language, page_count, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(search_key(&book.title))
        .bind(search_key(&book.author))
        .bind(&book.description)
        .bind(book.year)
        .bind(&book.isbn)
        .bind(&book.cover_url)
        .bind(&book.language)
        .bind(book.page_count)
        .bind(book.status)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, DUPLICATE_ISBN))
    }

    // =========================================================================
    // UPDATE
    // =========================================================================

    /// Merge the supplied patch fields into `book` and persist the result
    pub async fn update(
        &self,
        conn: &mut SqliteConnection,
        book: &Book,
        patch: &BookPatch,
    ) -> AppResult<Book> {
        let mut merged = book.clone();
        patch.apply(&mut merged);

        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = ?,
                author = ?,
                title_key = ?,
                author_key = ?,
                description = ?,
                year = ?,
                isbn = ?,
                cover_url = ?,
                language = ?,
                page_count = ?,
                status = ?,
                updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&merged.title)
        .bind(&merged.author)
        .bind(search_key(&merged.title))
        .bind(search_key(&merged.author))
        .bind(&merged.description)
        .bind(merged.year)
        .bind(&merged.isbn)
        .bind(&merged.cover_url)
        .bind(&merged.language)
        .bind(merged.page_count)
        .bind(merged.status)
        .bind(Utc::now())
        .bind(book.id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, DUPLICATE_ISBN))?
        .ok_or_else(|| AppError::NotFound(format!("Book {} not found", book.id)))
    }

    // =========================================================================
    // DELETE
    // =========================================================================

    /// Returns false when no book had this id
    pub async fn delete(&self, conn: &mut SqliteConnection, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
