use std::sync::Arc;

use minijinja::{Environment, Value};

/// Gives the template middleware access to the page renderer.
pub trait ProvidesTemplates {
    fn templates(&self) -> &Arc<PageTemplates>;
}

/// Renders the pages under this crate's `templates/` folder.
///
/// Debug builds read the folder from disk and reload on change. Release
/// builds render the copies embedded by `build.rs`.
pub struct PageTemplates {
    #[cfg(debug_assertions)]
    reloader: minijinja_autoreload::AutoReloader,
    #[cfg(not(debug_assertions))]
    env: Environment<'static>,
}

impl PageTemplates {
    #[cfg(debug_assertions)]
    pub fn load() -> Self {
        let folder = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("templates");
        let reloader = minijinja_autoreload::AutoReloader::new(move |notifier| {
            notifier.set_fast_reload(true);
            notifier.watch_path(&folder, true);
            let mut env = Environment::new();
            env.set_loader(minijinja::path_loader(&folder));
            minijinja_contrib::add_to_environment(&mut env);
            Ok(env)
        });
        Self { reloader }
    }

    #[cfg(not(debug_assertions))]
    pub fn load() -> Self {
        let mut env = Environment::new();
        minijinja_embed::load_templates!(&mut env);
        minijinja_contrib::add_to_environment(&mut env);
        Self { env }
    }

    pub fn render(&self, page: &str, context: &Value) -> Result<String, minijinja::Error> {
        self.with_env(|env| env.get_template(page)?.render(context))
    }

    /// Renders one `{% block %}` of `page`; htmx swaps use this.
    pub fn render_block(
        &self,
        page: &str,
        block: &str,
        context: &Value,
    ) -> Result<String, minijinja::Error> {
        self.with_env(|env| {
            env.get_template(page)?
                .eval_to_state(context)?
                .render_block(block)
        })
    }

    #[cfg(debug_assertions)]
    fn with_env<T>(
        &self,
        render: impl FnOnce(&Environment<'static>) -> Result<T, minijinja::Error>,
    ) -> Result<T, minijinja::Error> {
        let env = self.reloader.acquire_env()?;
        render(&env)
    }

    #[cfg(not(debug_assertions))]
    fn with_env<T>(
        &self,
        render: impl FnOnce(&Environment<'static>) -> Result<T, minijinja::Error>,
    ) -> Result<T, minijinja::Error> {
        render(&self.env)
    }
}
