//! Template Engines
//!
//! The compile step the cache sits in front of. [`HandlebarsEngine`] is the
//! default engine: it compiles sources into standalone [`handlebars::Template`]s
//! and renders them against a registry shared by every template it produced,
//! so helpers and partials registered on the engine apply to all of them.

use std::fmt;
use std::sync::Arc;

use handlebars::{
    Context, Handlebars, HelperDef, RenderContext, Renderable, StringOutput, Template,
};
use parking_lot::RwLock;
use serde::Serialize;

use crate::error::{CacheError, Result};

// == Template Engine Trait ==
/// Compiles template sources into reusable artifacts.
pub trait TemplateEngine: Send + Sync + 'static {
    /// The compiled artifact handed out by the cache.
    type Template: Send + Sync + 'static;

    /// Compiles `source`. `name` is only used for diagnostics.
    fn compile(&self, name: &str, source: &str) -> Result<Self::Template>;
}

// == Handlebars Engine ==
/// Handlebars engine holding the registry its templates render against.
///
/// Cloning the engine shares the registry; two engines built with
/// [`HandlebarsEngine::new`] are fully independent.
#[derive(Clone)]
pub struct HandlebarsEngine {
    registry: Arc<RwLock<Handlebars<'static>>>,
}

impl HandlebarsEngine {
    /// Creates an engine with the built-in Handlebars helpers.
    pub fn new() -> Self {
        Self::with_registry(Handlebars::new())
    }

    /// Wraps a preconfigured registry.
    pub fn with_registry(registry: Handlebars<'static>) -> Self {
        Self {
            registry: Arc::new(RwLock::new(registry)),
        }
    }

    /// Registers a helper available to every template of this engine.
    pub fn register_helper(&self, name: &str, helper: Box<dyn HelperDef + Send + Sync>) {
        self.registry.write().register_helper(name, helper);
    }

    /// Registers a partial usable as `{{> name}}`.
    pub fn register_partial(&self, name: &str, source: &str) -> Result<()> {
        self.registry
            .write()
            .register_partial(name, source)
            .map_err(|e| CacheError::Compile {
                name: name.to_string(),
                message: e.to_string(),
            })
    }

    /// Makes missing fields a render error instead of an empty string.
    pub fn set_strict_mode(&self, enabled: bool) {
        self.registry.write().set_strict_mode(enabled);
    }
}

impl Default for HandlebarsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HandlebarsEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlebarsEngine").finish_non_exhaustive()
    }
}

impl TemplateEngine for HandlebarsEngine {
    type Template = HandlebarsTemplate;

    fn compile(&self, name: &str, source: &str) -> Result<HandlebarsTemplate> {
        let template = Template::compile(source).map_err(|e| CacheError::Compile {
            name: name.to_string(),
            message: e.to_string(),
        })?;

        Ok(HandlebarsTemplate {
            name: name.to_string(),
            template,
            registry: Arc::clone(&self.registry),
        })
    }
}

// == Handlebars Template ==
/// A compiled Handlebars template.
pub struct HandlebarsTemplate {
    name: String,
    template: Template,
    registry: Arc<RwLock<Handlebars<'static>>>,
}

impl HandlebarsTemplate {
    /// Name the template was compiled under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders the template with `data` as the root context.
    pub fn render<T: Serialize>(&self, data: &T) -> Result<String> {
        let registry = self.registry.read();
        let context = Context::wraps(data).map_err(|e| self.render_error(e))?;

        let mut output = StringOutput::new();
        let mut render_context = RenderContext::new(None);
        self.template
            .render(&*registry, &context, &mut render_context, &mut output)
            .map_err(|e| self.render_error(e))?;

        output.into_string().map_err(|e| self.render_error(e))
    }

    fn render_error(&self, error: impl fmt::Display) -> CacheError {
        CacheError::Render {
            name: self.name.clone(),
            message: error.to_string(),
        }
    }
}

impl fmt::Debug for HandlebarsTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlebarsTemplate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
