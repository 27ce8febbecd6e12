//! Template registry with a single activation slot.
//!
//! Activation is stored as one `Option<version>` rather than a flag on each
//! entry, so at most one template is active by construction. The store is
//! explicit state owned by whoever constructs it and shared via `Arc`, never
//! a process-wide singleton.

use std::collections::HashMap;
use std::sync::RwLock;

use super::{PromptTemplate, default_template};
use crate::version;

#[derive(Debug, Default)]
struct Inner {
    templates: HashMap<String, PromptTemplate>,
    active: Option<String>,
}

/// Holds versioned prompt templates and which one is active.
#[derive(Debug)]
pub struct TemplateStore {
    inner: RwLock<Inner>,
}

impl TemplateStore {
    /// Create a store seeded with the built-in default template, active.
    pub fn new() -> Self {
        let store = Self::empty();
        store.register(default_template());
        store
    }

    /// Create a store with no templates; `active()` falls back to the
    /// built-in default.
    pub fn empty() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Snapshot of the active template; the built-in default if none is
    /// active. Callers hold onto the snapshot for the duration of one
    /// request so a concurrent activation change never splits a request
    /// across two templates.
    pub fn active(&self) -> PromptTemplate {
        let inner = self.inner.read().expect("template store lock");
        inner
            .active
            .as_ref()
            .and_then(|v| inner.templates.get(v))
            .map(|t| with_active_flag(t, true))
            .unwrap_or_else(default_template)
    }

    /// Register a template. If it claims to be active, activation moves to
    /// it in the same write, deactivating whatever held the slot.
    pub fn register(&self, template: PromptTemplate) {
        let mut inner = self.inner.write().expect("template store lock");
        let version = template.version.clone();
        let activate = template.is_active;
        inner.templates.insert(version.clone(), with_active_flag(&template, false));
        if activate {
            inner.active = Some(version);
        }
    }

    /// Activate a registered version. Returns false if the version is
    /// unknown, leaving the current activation untouched.
    pub fn set_active(&self, version: &str) -> bool {
        let mut inner = self.inner.write().expect("template store lock");
        if !inner.templates.contains_key(version) {
            return false;
        }
        inner.active = Some(version.to_string());
        true
    }

    /// Look up a template by version.
    pub fn get(&self, version: &str) -> Option<PromptTemplate> {
        let inner = self.inner.read().expect("template store lock");
        let active = inner.active.as_deref() == Some(version);
        inner.templates.get(version).map(|t| with_active_flag(t, active))
    }

    /// All registered versions in numeric version order.
    pub fn versions(&self) -> Vec<String> {
        let inner = self.inner.read().expect("template store lock");
        let mut versions: Vec<String> = inner.templates.keys().cloned().collect();
        versions.sort_by(|a, b| version::compare(a, b));
        versions
    }

    /// The currently active version, if any template holds the slot.
    pub fn active_version(&self) -> Option<String> {
        self.inner.read().expect("template store lock").active.clone()
    }
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new()
    }
}

fn with_active_flag(template: &PromptTemplate, active: bool) -> PromptTemplate {
    let mut t = template.clone();
    t.is_active = active;
    t
}
