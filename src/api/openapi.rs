//! OpenAPI documentation

use axum::Router;
use utoipa::{openapi::Server, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    api::{books, health},
    config::AppConfig,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library API",
        description = "Book catalog REST API"
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::create_book,
        books::list_books,
        books::get_book,
        books::update_book,
        books::delete_book,
        books::lookup_isbn,
    ),
    components(
        schemas(
            crate::models::book::Book,
            crate::models::book::BookStatus,
            crate::models::book::CreateBook,
            crate::models::book::BookPatch,
            crate::models::book::BookMetadata,
            health::HealthResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Book catalog management")
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI document for the configured project and prefix
pub fn openapi_document(config: &AppConfig) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = config.project.name.clone();
    doc.info.version = config.project.version.clone();
    let prefix = config.api.prefix.trim_end_matches('/');
    doc.servers = Some(vec![Server::new(if prefix.is_empty() { "/" } else { prefix })]);
    doc
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router(config: &AppConfig) -> Router {
    let prefix = config.api.prefix.trim_end_matches('/');
    Router::new().merge(
        SwaggerUi::new("/swagger-ui")
            .url(format!("{}/openapi.json", prefix), openapi_document(config)),
    )
}
