//! Business logic services

pub mod books;
pub mod metadata;

use std::sync::Arc;

use crate::{config::MetadataConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub books: books::BooksService,
    pub repository: Repository,
}

impl Services {
    /// Create all services with the given repository and metadata provider
    pub fn new(
        repository: Repository,
        metadata: Arc<dyn metadata::MetadataProvider>,
        metadata_config: &MetadataConfig,
    ) -> Self {
        Self {
            books: books::BooksService::new(repository.clone(), metadata, metadata_config.timeout()),
            repository,
        }
    }
}
