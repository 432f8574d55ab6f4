use axum::{extract::FromRef, middleware::from_fn_with_state, Router};
use tower_http::compression::CompressionLayer;

use crate::{html_state::HtmlState, middlewares::response_middleware::with_template_response};

/// Serves `$relative_path` from disk in debug builds and from an embedded copy
/// of `assets/` in release builds.
#[macro_export]
macro_rules! create_asset_service {
    ($relative_path:expr) => {{
        #[cfg(debug_assertions)]
        {
            let crate_dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
            let assets_path = crate_dir.join($relative_path);
            tracing::debug!(path = ?assets_path, "Serving assets from filesystem");
            tower_http::services::ServeDir::new(assets_path)
        }
        #[cfg(not(debug_assertions))]
        {
            tracing::debug!("Serving embedded assets");
            static ASSETS_DIR: include_dir::Dir<'static> =
                include_dir::include_dir!("$CARGO_MANIFEST_DIR/assets");
            tower_serve_static::ServeDir::new(&ASSETS_DIR)
        }
    }};
}

pub struct RouterFactory<S> {
    app_state: HtmlState,
    page_routers: Vec<Router<S>>,
    assets: Option<AssetsConfig>,
    compression_enabled: bool,
}

struct AssetsConfig {
    url_path: String,
    directory: String,
}

impl<S> RouterFactory<S>
where
    S: Clone + Send + Sync + 'static,
    HtmlState: FromRef<S>,
{
    pub fn new(app_state: &HtmlState) -> Self {
        Self {
            app_state: app_state.to_owned(),
            page_routers: Vec::new(),
            assets: None,
            compression_enabled: false,
        }
    }

    pub fn with_assets(mut self, url_path: &str, directory: &str) -> Self {
        self.assets = Some(AssetsConfig {
            url_path: url_path.to_string(),
            directory: directory.to_string(),
        });
        self
    }

    pub fn add_routes(mut self, routes: Router<S>) -> Self {
        self.page_routers.push(routes);
        self
    }

    pub const fn with_compression(mut self) -> Self {
        self.compression_enabled = true;
        self
    }

    pub fn build(self) -> Router<S> {
        let mut app_router = Router::new();
        for router in self.page_routers {
            app_router = app_router.merge(router);
        }

        // Handlers return TemplateResponse markers; this layer renders them.
        app_router = app_router.layer(from_fn_with_state(
            self.app_state.clone(),
            with_template_response::<HtmlState>,
        ));

        // Assets bypass template rendering.
        let mut final_router = Router::new();
        if let Some(assets) = self.assets {
            let asset_service = create_asset_service!(&assets.directory);
            final_router = final_router.nest_service(&assets.url_path, asset_service);
        }
        final_router = final_router.merge(app_router);

        if self.compression_enabled {
            final_router = final_router.layer(CompressionLayer::new());
        }

        final_router
    }
}
