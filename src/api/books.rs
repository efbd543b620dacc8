//! Book endpoints

use axum::{
    extract::State,
    http::{HeaderName, StatusCode},
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookMetadata, BookPatch, BookQuery, CreateBook},
    AppState,
};

use super::{ValidatedJson, ValidatedPath, ValidatedQuery};

/// Response header carrying the number of matches before pagination
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Create a new book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input or duplicate ISBN", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    ValidatedJson(book): ValidatedJson<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let created = state.services.books.create_book(book).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// List books with search, sorting and pagination
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "Page of books", body = Vec<Book>,
            headers(("x-total-count" = i64, description = "Number of matching books before pagination"))),
        (status = 400, description = "Invalid query parameters", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<BookQuery>,
) -> AppResult<([(HeaderName, String); 1], Json<Vec<Book>>)> {
    let search = query.into_search()?;
    let (books, total) = state.services.books.list_books(&search).await?;

    Ok((
        [(HeaderName::from_static(TOTAL_COUNT_HEADER), total.to_string())],
        Json(books),
    ))
}

/// Get a book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<i64>,
) -> AppResult<Json<Book>> {
    let book = state.services.books.get_book(id).await?;
    Ok(Json(book))
}

/// Update a book. Only the supplied fields change.
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    request_body = BookPatch,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Invalid input or duplicate ISBN", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<i64>,
    ValidatedJson(patch): ValidatedJson<BookPatch>,
) -> AppResult<Json<Book>> {
    let updated = state.services.books.update_book(id, patch).await?;
    Ok(Json(updated))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<i64>,
) -> AppResult<StatusCode> {
    state.services.books.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Look up bibliographic data for an ISBN in the external registry
#[utoipa::path(
    get,
    path = "/books/lookup/{isbn}",
    tag = "books",
    params(
        ("isbn" = String, Path, description = "ISBN, hyphens and spaces allowed")
    ),
    responses(
        (status = 200, description = "Metadata found", body = BookMetadata),
        (status = 404, description = "No metadata available", body = crate::error::ErrorResponse)
    )
)]
pub async fn lookup_isbn(
    State(state): State<AppState>,
    ValidatedPath(isbn): ValidatedPath<String>,
) -> AppResult<Json<BookMetadata>> {
    state
        .services
        .books
        .lookup_isbn(&isbn)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No metadata found for ISBN {}", isbn)))
}
