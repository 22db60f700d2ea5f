//! External documentation lookup
//!
//! The YardMap answers queries about symbols the workspace itself does not
//! declare: the standard library and required gems, consumed as pre-indexed
//! documentation archives ("docsets"). A docset is a JSON file of flat code
//! objects keyed by fully qualified path; the archive generator is a
//! separate tool and its output format is the only contract here.
//!
//! Archives are resolved per required library from the configured doc
//! directories; a `core` archive is always attempted first. Unknown
//! libraries are logged and skipped so resolution proceeds without them.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::pin::{NamespaceKind, Scope, Visibility};
use crate::suggestion::{Suggestion, SuggestionKind};

/// The archive name always loaded, covering the language core.
const CORE_DOCSET: &str = "core";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocObjectKind {
    Class,
    Module,
    Method,
    Constant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocScope {
    #[default]
    Instance,
    Class,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocVisibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl From<DocScope> for Scope {
    fn from(scope: DocScope) -> Scope {
        match scope {
            DocScope::Instance => Scope::Instance,
            DocScope::Class => Scope::Class,
        }
    }
}

impl From<DocVisibility> for Visibility {
    fn from(visibility: DocVisibility) -> Visibility {
        match visibility {
            DocVisibility::Public => Visibility::Public,
            DocVisibility::Protected => Visibility::Protected,
            DocVisibility::Private => Visibility::Private,
        }
    }
}

/// One entry of a documentation archive.
#[derive(Debug, Clone, Deserialize)]
pub struct DocObject {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: DocObjectKind,
    #[serde(default)]
    pub scope: DocScope,
    #[serde(default)]
    pub visibility: DocVisibility,
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub docstring: Option<String>,
    #[serde(default)]
    pub superclass: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Docset {
    objects: Vec<DocObject>,
}

impl DocObject {
    /// Local name: the method name after `#`/`.`, or the last `::` segment.
    pub fn name(&self) -> &str {
        if let Some((_, name, _)) = split_method_path(&self.path) {
            return name;
        }
        match self.path.rfind("::") {
            Some(idx) => &self.path[idx + 2..],
            None => &self.path,
        }
    }

    /// The namespace this object belongs under.
    pub fn parent(&self) -> &str {
        if let Some((ns, _, _)) = split_method_path(&self.path) {
            return ns;
        }
        match self.path.rfind("::") {
            Some(idx) => &self.path[..idx],
            None => "",
        }
    }

    pub fn to_suggestion(&self) -> Suggestion {
        let kind = match self.kind {
            DocObjectKind::Class => SuggestionKind::Class,
            DocObjectKind::Module => SuggestionKind::Module,
            DocObjectKind::Method => SuggestionKind::Method,
            DocObjectKind::Constant => SuggestionKind::Constant,
        };
        let detail = if self.parameters.is_empty() {
            None
        } else {
            Some(format!("({})", self.parameters.join(", ")))
        };
        Suggestion {
            label: self.name().to_string(),
            kind,
            detail,
            docstring: self.docstring.clone(),
            return_type: self.return_type.clone(),
            parameters: self.parameters.clone(),
            path: Some(self.path.clone()),
            location: None,
        }
    }
}

fn split_method_path(path: &str) -> Option<(&str, &str, Scope)> {
    if let Some(idx) = path.find('#') {
        return Some((&path[..idx], &path[idx + 1..], Scope::Instance));
    }
    if let Some(idx) = path.rfind('.') {
        return Some((&path[..idx], &path[idx + 1..], Scope::Class));
    }
    None
}

#[derive(Debug, Default)]
pub struct YardMap {
    required: Vec<String>,
    objects: FxHashMap<String, Vec<Arc<DocObject>>>,
    children: FxHashMap<String, Vec<Arc<DocObject>>>,
    namespaces: FxHashMap<String, NamespaceKind>,
    superclasses: FxHashMap<String, String>,
}

impl YardMap {
    /// Builds a map for the given required libraries, searching `doc_dirs`
    /// for `<name>.json` archives. The core archive is always attempted.
    pub fn new(required: &[String], doc_dirs: &[PathBuf]) -> YardMap {
        let mut map = YardMap {
            required: required.to_vec(),
            ..YardMap::default()
        };
        let mut names: Vec<&str> = vec![CORE_DOCSET];
        names.extend(required.iter().map(String::as_str));
        for name in names {
            match map.load_docset(name, doc_dirs) {
                Ok(true) => debug!("loaded docset {}", name),
                Ok(false) => {
                    if name != CORE_DOCSET {
                        warn!("no documentation archive for required library {:?}", name);
                    }
                }
                Err(err) => warn!("failed to load docset {}: {:#}", name, err),
            }
        }
        map
    }

    fn load_docset(&mut self, name: &str, doc_dirs: &[PathBuf]) -> Result<bool> {
        for dir in doc_dirs {
            let path = dir.join(format!("{}.json", name));
            if !path.is_file() {
                continue;
            }
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let docset: Docset = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", path.display()))?;
            for object in docset.objects {
                self.add_object(object);
            }
            return Ok(true);
        }
        Ok(false)
    }

    fn add_object(&mut self, object: DocObject) {
        let object = Arc::new(object);
        match object.kind {
            DocObjectKind::Class => {
                self.namespaces
                    .insert(object.path.clone(), NamespaceKind::Class);
                if let Some(sup) = &object.superclass {
                    self.superclasses.insert(object.path.clone(), sup.clone());
                }
            }
            DocObjectKind::Module => {
                self.namespaces
                    .insert(object.path.clone(), NamespaceKind::Module);
            }
            DocObjectKind::Method | DocObjectKind::Constant => {}
        }
        self.children
            .entry(object.parent().to_string())
            .or_default()
            .push(object.clone());
        self.objects
            .entry(object.path.clone())
            .or_default()
            .push(object);
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Constants and namespaces directly under a namespace.
    pub fn get_constants(&self, fqns: &str) -> Vec<Suggestion> {
        self.children
            .get(fqns)
            .map(|members| {
                members
                    .iter()
                    .filter(|m| m.kind != DocObjectKind::Method)
                    .map(|m| m.to_suggestion())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Class-side methods of a namespace, following the documented
    /// superclass chain. Protected methods cross a hop only when the query
    /// root is the namespace itself; private never do.
    pub fn get_methods(&self, fqns: &str, root: &str, visibility: &[Visibility]) -> Vec<Suggestion> {
        self.collect_methods(fqns, root, visibility, Scope::Class)
    }

    pub fn get_instance_methods(
        &self,
        fqns: &str,
        root: &str,
        visibility: &[Visibility],
    ) -> Vec<Suggestion> {
        self.collect_methods(fqns, root, visibility, Scope::Instance)
    }

    fn collect_methods(
        &self,
        fqns: &str,
        root: &str,
        visibility: &[Visibility],
        scope: Scope,
    ) -> Vec<Suggestion> {
        let mut out = Vec::new();
        let mut visited: Vec<String> = Vec::new();
        let mut cursor = fqns.to_string();
        let mut first = true;
        loop {
            if visited.contains(&cursor) {
                break;
            }
            visited.push(cursor.clone());
            // beyond the declaring namespace, public always crosses a hop;
            // protected only when the caller is that class; private never
            let allowed: Vec<Visibility> = if first {
                visibility.to_vec()
            } else {
                let mut hop = vec![Visibility::Public];
                if visibility.contains(&Visibility::Protected) && root == cursor {
                    hop.push(Visibility::Protected);
                }
                hop
            };
            if let Some(members) = self.children.get(&cursor) {
                for member in members {
                    if member.kind != DocObjectKind::Method {
                        continue;
                    }
                    if Scope::from(member.scope) != scope {
                        continue;
                    }
                    if !allowed.contains(&Visibility::from(member.visibility)) {
                        continue;
                    }
                    out.push(member.to_suggestion());
                }
            }
            if !visibility.contains(&Visibility::Public) && !visibility.contains(&Visibility::Protected)
            {
                break;
            }
            let Some(sup) = self.superclasses.get(&cursor) else {
                break;
            };
            cursor = sup.clone();
            first = false;
        }
        out
    }

    pub fn get_namespace_type(&self, fqns: &str) -> Option<NamespaceKind> {
        self.namespaces.get(fqns).copied()
    }

    /// Resolves a possibly-relative namespace name by walking the root
    /// outward, the same way the workspace resolver does.
    pub fn find_fully_qualified_namespace(&self, name: &str, root: &str) -> Option<String> {
        if name.is_empty() {
            return None;
        }
        let parts: Vec<&str> = if root.is_empty() {
            Vec::new()
        } else {
            root.split("::").collect()
        };
        for cut in (0..=parts.len()).rev() {
            let candidate = if cut == 0 {
                name.to_string()
            } else {
                format!("{}::{}", parts[..cut].join("::"), name)
            };
            if self.namespaces.contains_key(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    pub fn objects(&self, path: &str) -> Vec<Arc<DocObject>> {
        self.objects.get(path).cloned().unwrap_or_default()
    }

    pub fn search(&self, query: &str) -> Vec<String> {
        let needle = query.to_lowercase();
        let mut paths: Vec<String> = self
            .objects
            .keys()
            .filter(|path| path.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        paths.sort();
        paths
    }

    pub fn document(&self, path: &str) -> Vec<Arc<DocObject>> {
        self.objects(path)
    }

    /// Every known code-object path, for the search index.
    pub fn all_paths(&self) -> Vec<String> {
        self.objects.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn docset_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("core.json"),
            r#"{"objects": [
                {"path": "Object", "type": "class"},
                {"path": "Object#freeze", "type": "method", "return_type": "Object"},
                {"path": "String", "type": "class", "superclass": "Object"},
                {"path": "String#upcase", "type": "method", "return_type": "String"},
                {"path": "String::BLANK", "type": "constant"},
                {"path": "String.try_convert", "type": "method", "scope": "class"}
            ]}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("json.json"),
            r#"{"objects": [
                {"path": "JSON", "type": "module"},
                {"path": "JSON.parse", "type": "method", "scope": "class", "return_type": "Hash"}
            ]}"#,
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_instance_methods_follow_superclass() {
        let dir = docset_dir();
        let map = YardMap::new(&[], &[dir.path().to_path_buf()]);
        let labels: Vec<String> = map
            .get_instance_methods("String", "", &[Visibility::Public])
            .into_iter()
            .map(|s| s.label)
            .collect();
        assert!(labels.contains(&"upcase".to_string()));
        assert!(labels.contains(&"freeze".to_string()));
    }

    #[test]
    fn test_required_library_loads() {
        let dir = docset_dir();
        let map = YardMap::new(&["json".to_string()], &[dir.path().to_path_buf()]);
        assert_eq!(map.get_namespace_type("JSON"), Some(NamespaceKind::Module));
        let methods = map.get_methods("JSON", "", &[Visibility::Public]);
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].label, "parse");
    }

    #[test]
    fn test_unknown_library_is_skipped() {
        let dir = docset_dir();
        let map = YardMap::new(&["no_such_gem".to_string()], &[dir.path().to_path_buf()]);
        // still answers from what did load
        assert!(map.get_namespace_type("String").is_some());
    }

    #[test]
    fn test_constants_include_nested_namespaces() {
        let dir = docset_dir();
        let map = YardMap::new(&[], &[dir.path().to_path_buf()]);
        let labels: Vec<String> = map
            .get_constants("String")
            .into_iter()
            .map(|s| s.label)
            .collect();
        assert_eq!(labels, vec!["BLANK".to_string()]);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let dir = docset_dir();
        let map = YardMap::new(&[], &[dir.path().to_path_buf()]);
        let hits = map.search("upca");
        assert_eq!(hits, vec!["String#upcase".to_string()]);
    }
}
