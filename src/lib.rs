//! Library API
//!
//! A REST JSON service for a book catalog: CRUD, search with sorting and
//! pagination, and best-effort ISBN enrichment from an external registry.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
    pub landing: Arc<api::home::LandingPage>,
}

impl AppState {
    pub fn new(config: AppConfig, services: services::Services) -> AppResult<Self> {
        Ok(Self {
            config: Arc::new(config),
            services: Arc::new(services),
            landing: Arc::new(api::home::LandingPage::new()?),
        })
    }
}
