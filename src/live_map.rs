//! Runtime-introspection plugin channel
//!
//! A LiveMap aggregates providers that can answer symbol queries from a
//! running process (an attached console, a debug bridge). Providers are
//! strictly opportunistic: results are appended to index-backed answers and
//! an empty provider set is the normal case.

use std::sync::Arc;

use tracing::debug;

use crate::pin::Scope;
use crate::suggestion::Suggestion;

/// One runtime-sourced symbol provider.
pub trait LiveProvider: Send + Sync {
    /// Resolves a possibly-relative namespace name, when the runtime knows it.
    fn get_fqns(&self, name: &str, root: &str) -> Option<String>;

    /// Methods of a namespace as seen by the runtime.
    fn get_methods(
        &self,
        fqns: &str,
        root: &str,
        scope: Scope,
        include_private: bool,
    ) -> Vec<Suggestion>;

    /// Called on every index rebuild so the provider can resynchronize.
    fn refresh(&self) {}
}

#[derive(Default, Clone)]
pub struct LiveMap {
    providers: Vec<Arc<dyn LiveProvider>>,
}

impl LiveMap {
    pub fn new() -> Self {
        LiveMap::default()
    }

    pub fn register(&mut self, provider: Arc<dyn LiveProvider>) {
        self.providers.push(provider);
    }

    pub fn get_fqns(&self, name: &str, root: &str) -> Option<String> {
        self.providers.iter().find_map(|p| p.get_fqns(name, root))
    }

    pub fn get_methods(
        &self,
        fqns: &str,
        root: &str,
        scope: Scope,
        include_private: bool,
    ) -> Vec<Suggestion> {
        let mut out = Vec::new();
        for provider in &self.providers {
            out.extend(provider.get_methods(fqns, root, scope, include_private));
        }
        out
    }

    pub fn refresh(&self) {
        if !self.providers.is_empty() {
            debug!("refreshing {} live providers", self.providers.len());
        }
        for provider in &self.providers {
            provider.refresh();
        }
    }
}
