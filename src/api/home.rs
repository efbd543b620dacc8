//! HTML landing page hosting the browser catalog UI

use axum::{extract::State, response::Html};
use upon::{Engine, Template};

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    AppState,
};

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");

/// The compiled landing page template, built once at startup
pub struct LandingPage {
    engine: Engine<'static>,
    template: Template<'static>,
}

impl LandingPage {
    pub fn new() -> AppResult<Self> {
        let engine = Engine::new();
        let template = engine
            .compile(INDEX_TEMPLATE)
            .map_err(|e| AppError::Internal(format!("Invalid landing page template: {}", e)))?;
        Ok(Self { engine, template })
    }

    pub fn render(&self, config: &AppConfig, total: i64) -> AppResult<String> {
        let project = &config.project;
        self.template
            .render(
                &self.engine,
                upon::value! {
                    name: &project.name,
                    description: &project.description,
                    version: &project.version,
                    api_base: config.api.prefix.trim_end_matches('/'),
                    total: total,
                },
            )
            .to_string()
            .map_err(|e| AppError::Internal(format!("Failed to render landing page: {}", e)))
    }
}

/// Landing page: the catalog UI, wired to the configured API prefix
pub async fn index(State(state): State<AppState>) -> AppResult<Html<String>> {
    let total = state.services.books.count_books().await?;
    let page = state.landing.render(&state.config, total)?;
    Ok(Html(page))
}
