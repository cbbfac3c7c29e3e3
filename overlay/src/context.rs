//! Shared render context
//!
//! A [`RenderContext`] owns the font system and shaping cache. Backends only
//! hold a [`ContextHandle`], so dropping the context (host surface torn down)
//! turns every later upload or measurement into [`BackendError::ContextLost`]
//! instead of touching freed state.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use cosmic_text::{FontSystem, fontdb};
use danmaku_core::BackendError;

use crate::renderer::Renderer;

/// Locale used when the system does not report one
const FALLBACK_LOCALE: &str = "en-US";

pub struct RenderContext {
    renderer: Arc<Mutex<Renderer>>,
}

impl RenderContext {
    /// Build a context over the system fonts
    pub fn new(font_family: impl Into<String>) -> Self {
        let locale = sys_locale::get_locale().unwrap_or_else(|| FALLBACK_LOCALE.to_string());
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        tracing::debug!(locale = %locale, faces = db.len(), "Loaded system fonts");

        Self::with_font_system(FontSystem::new_with_locale_and_db(locale, db), font_family)
    }

    pub fn with_font_system(font_system: FontSystem, font_family: impl Into<String>) -> Self {
        Self {
            renderer: Arc::new(Mutex::new(Renderer::new(font_system, font_family))),
        }
    }

    pub fn handle(&self) -> ContextHandle {
        ContextHandle {
            renderer: Arc::downgrade(&self.renderer),
        }
    }
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("handles", &Arc::weak_count(&self.renderer))
            .finish()
    }
}

/// Non-owning reference to a [`RenderContext`]
#[derive(Debug, Clone)]
pub struct ContextHandle {
    renderer: Weak<Mutex<Renderer>>,
}

impl ContextHandle {
    /// A handle that was never attached to a context
    pub fn detached() -> Self {
        Self {
            renderer: Weak::new(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.renderer.strong_count() > 0
    }

    /// Run `f` against the shared renderer, or fail if the context is gone
    pub fn with_renderer<R>(&self, f: impl FnOnce(&mut Renderer) -> R) -> Result<R, BackendError> {
        let renderer = self.renderer.upgrade().ok_or(BackendError::ContextLost)?;
        let mut guard = renderer.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&mut guard))
    }
}
