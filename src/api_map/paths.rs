//! Path-based queries: lookup, search, and documentation
//!
//! Paths use the conventional notation: `A::B` names a namespace or
//! constant, `A::B#m` an instance method, `A::B.m` a class method. The
//! search index (workspace pin paths plus docset object paths) is
//! assembled lazily once per stale cycle.

use rustc_hash::FxHashSet;

use crate::pin::Pin;
use crate::suggestion::Suggestion;

use super::ApiMap;

impl ApiMap {
    /// Suggestions for an exact path: `A#m` resolves instance methods,
    /// `A.m` class methods, anything else a namespace path.
    pub fn get_path_suggestions(&mut self, path: &str) -> Vec<Suggestion> {
        self.refresh(false);
        if path.is_empty() {
            return Vec::new();
        }
        let mut result = if let Some(idx) = path.find('#') {
            let (namespace, method) = (&path[..idx], &path[idx + 1..]);
            let method = method.to_string();
            match self.find_fully_qualified_namespace(namespace, "") {
                Some(fqns) => self
                    .get_all_instance_methods(&fqns, "")
                    .into_iter()
                    .filter(|s| s.label == method)
                    .collect(),
                None => Vec::new(),
            }
        } else if let Some(idx) = path.rfind('.') {
            let (namespace, method) = (&path[..idx], &path[idx + 1..]);
            let method = method.to_string();
            match self.find_fully_qualified_namespace(namespace, "") {
                Some(fqns) => self
                    .get_all_methods(&fqns, "")
                    .into_iter()
                    .filter(|s| s.label == method)
                    .collect(),
                None => Vec::new(),
            }
        } else {
            self.namespace_path_suggestions(path)
        };

        for object in self.yard_map.objects(path) {
            let suggestion = object.to_suggestion();
            if !result
                .iter()
                .any(|s| s.label == suggestion.label && s.path == suggestion.path)
            {
                result.push(suggestion);
            }
        }
        result
    }

    fn namespace_path_suggestions(&mut self, path: &str) -> Vec<Suggestion> {
        let (parent, name) = match path.rfind("::") {
            Some(idx) => (&path[..idx], &path[idx + 2..]),
            None => ("", path),
        };
        let Some(parent_fq) = self.find_fully_qualified_namespace(parent, "") else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for table in [&self.namespace_pins, &self.constant_pins] {
            if let Some(pins) = table.get(&parent_fq) {
                for pin in pins {
                    if pin.name == name {
                        out.push(pin.to_suggestion(None));
                    }
                }
            }
        }
        out
    }

    /// Case-insensitive substring search over all known code-object paths.
    pub fn search(&mut self, query: &str) -> Vec<String> {
        self.refresh(false);
        self.assemble_code_object_paths();
        let needle = query.to_lowercase();
        self.code_object_paths
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter(|path| path.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Everything known at an exact path: workspace declarations first,
    /// then docset objects.
    pub fn document(&mut self, path: &str) -> Vec<Suggestion> {
        self.refresh(false);
        self.assemble_code_object_paths();
        let mut result: Vec<Suggestion> = self
            .workspace_pins()
            .into_iter()
            .filter(|pin| pin.path() == path)
            .map(|pin| pin.to_suggestion(None))
            .collect();
        result.extend(self.yard_map.document(path).iter().map(|o| o.to_suggestion()));
        result
    }

    /// Rebuilds the lazily assembled path index once per stale cycle.
    fn assemble_code_object_paths(&mut self) {
        if !self.yard_stale && self.code_object_paths.is_some() {
            return;
        }
        let mut paths: FxHashSet<String> = FxHashSet::default();
        for pin in self.workspace_pins() {
            paths.insert(pin.path());
        }
        paths.extend(self.yard_map.all_paths());
        let mut paths: Vec<String> = paths.into_iter().collect();
        paths.sort();
        self.code_object_paths = Some(paths);
        self.yard_stale = false;
    }

    /// Every addressable workspace pin (namespaces, methods, attributes,
    /// constants).
    fn workspace_pins(&self) -> Vec<std::sync::Arc<Pin>> {
        let mut out = Vec::new();
        for table in [
            &self.namespace_pins,
            &self.method_pins,
            &self.attribute_pins,
            &self.constant_pins,
        ] {
            for pins in table.values() {
                out.extend(pins.iter().cloned());
            }
        }
        out
    }
}
