use std::sync::Arc;

use common::utils::config::AppConfig;
use session::Session;

#[derive(Clone)]
pub struct ApiState {
    pub session: Arc<Session>,
    pub config: AppConfig,
}

impl ApiState {
    pub fn new(session: Arc<Session>, config: &AppConfig) -> Self {
        Self {
            session,
            config: config.clone(),
        }
    }
}
