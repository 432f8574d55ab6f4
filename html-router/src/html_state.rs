use std::sync::Arc;

use common::utils::config::AppConfig;
use session::Session;
use tracing::debug;

use crate::templates::{PageTemplates, ProvidesTemplates};

#[derive(Clone)]
pub struct HtmlState {
    pub session: Arc<Session>,
    pub templates: Arc<PageTemplates>,
    pub config: AppConfig,
}

impl HtmlState {
    /// Uses `templates` when given, otherwise loads this crate's `templates/` folder.
    pub fn new_with_resources(
        session: Arc<Session>,
        config: AppConfig,
        templates: Option<Arc<PageTemplates>>,
    ) -> Self {
        let templates = templates.unwrap_or_else(|| Arc::new(PageTemplates::load()));
        debug!("Page templates configured for html_router.");

        Self {
            session,
            templates,
            config,
        }
    }
}

impl ProvidesTemplates for HtmlState {
    fn templates(&self) -> &Arc<PageTemplates> {
        &self.templates
    }
}
