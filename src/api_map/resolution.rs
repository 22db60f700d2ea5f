//! Name resolution and member enumeration
//!
//! Namespace resolution walks the enclosing scope outward (innermost wins),
//! falls back through file-root mixin targets, and finally consults the
//! external maps. Method enumeration recurses through superclasses and
//! mixins with an explicit visited set, so diamond-shaped include graphs
//! terminate; visibility narrows at each superclass hop.

use rustc_hash::FxHashSet;

use crate::pin::{NamespaceKind, Scope, Visibility};
use crate::suggestion::Suggestion;

use super::ApiMap;

const ALL_VISIBILITIES: [Visibility; 3] = [
    Visibility::Public,
    Visibility::Protected,
    Visibility::Private,
];

impl ApiMap {
    /// Resolves a possibly-relative namespace name to its fully qualified
    /// form. Returns `None` when nothing by that name is known anywhere.
    pub fn find_fully_qualified_namespace(&mut self, name: &str, root: &str) -> Option<String> {
        self.refresh(false);
        let mut visited = FxHashSet::default();
        self.resolve_namespace(name, root, &mut visited)
    }

    pub(crate) fn resolve_namespace(
        &self,
        name: &str,
        root: &str,
        visited: &mut FxHashSet<String>,
    ) -> Option<String> {
        if !visited.insert(root.to_string()) {
            return None;
        }
        if name.is_empty() && root.is_empty() {
            return Some(String::new());
        }
        if name.is_empty() {
            // resolve the root itself
            return self.resolve_namespace(root, "", visited);
        }

        if root.is_empty() {
            if self.namespace_map.contains_key(name) {
                return Some(name.to_string());
            }
        } else {
            // innermost enclosing scope wins
            let parts: Vec<&str> = root.split("::").collect();
            for cut in (0..=parts.len()).rev() {
                let candidate = if cut == 0 {
                    name.to_string()
                } else {
                    format!("{}::{}", parts[..cut].join("::"), name)
                };
                if self.namespace_map.contains_key(&candidate) {
                    return Some(candidate);
                }
            }
        }

        // mixin targets visible at the file root, in lexical order
        if let Some(includes) = self.namespace_includes.get("") {
            for target in includes.clone() {
                if let Some(found) = self.resolve_namespace(name, &target, visited) {
                    return Some(found);
                }
            }
        }

        if let Some(found) = self.yard_map.find_fully_qualified_namespace(name, root) {
            return Some(found);
        }
        self.live_map.get_fqns(name, root)
    }

    /// Constants and namespaces visible from a scope: the resolved
    /// namespace itself plus each enclosing scope outward. Private
    /// constants are included only when the query root sits inside the
    /// declaring namespace.
    pub fn get_constants(&mut self, namespace: &str, root: &str) -> Vec<Suggestion> {
        self.refresh(false);
        let mut visited = FxHashSet::default();
        let Some(fqns) = self.resolve_namespace(namespace, root, &mut visited) else {
            return Vec::new();
        };

        let mut result: Vec<Suggestion> = Vec::new();
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut emit = |suggestions: Vec<Suggestion>, result: &mut Vec<Suggestion>| {
            for s in suggestions {
                let key = s.path.clone().unwrap_or_else(|| s.label.clone());
                if seen.insert(key) {
                    result.push(s);
                }
            }
        };

        if fqns.is_empty() {
            emit(self.constants_declared_in("", root), &mut result);
        } else {
            let mut cursor = fqns.clone();
            loop {
                emit(self.constants_declared_in(&cursor, root), &mut result);
                match cursor.rfind("::") {
                    Some(idx) => cursor.truncate(idx),
                    None => break,
                }
            }
            emit(self.constants_declared_in("", root), &mut result);
        }

        emit(self.yard_map.get_constants(&fqns), &mut result);
        result
    }

    fn constants_declared_in(&self, fqns: &str, root: &str) -> Vec<Suggestion> {
        let inside = root == fqns || root.starts_with(&format!("{}::", fqns)) || fqns.is_empty();
        let mut out = Vec::new();
        for table in [&self.constant_pins, &self.namespace_pins] {
            if let Some(pins) = table.get(fqns) {
                for pin in pins {
                    if pin.visibility == Visibility::Private && !inside {
                        continue;
                    }
                    out.push(pin.to_suggestion(None));
                }
            }
        }
        out
    }

    /// Singleton (class-side) methods of a namespace.
    pub fn get_methods(&mut self, fqns: &str, root: &str, visibility: &[Visibility]) -> Vec<Suggestion> {
        self.refresh(false);
        let mut skip = FxHashSet::default();
        let mut result = self.inner_get_methods(fqns, root, visibility, &mut skip);

        // a listed `new` borrows its signature from `initialize`
        if let Some(pos) = result.iter().position(|s| s.label == "new") {
            let init = self.method_pins.get(fqns).and_then(|pins| {
                pins.iter()
                    .find(|p| p.name == "initialize" && p.scope == Scope::Instance)
            });
            if let Some(init) = init {
                let mut synthesized = init.to_suggestion(Some(fqns.to_string()));
                synthesized.label = "new".to_string();
                synthesized.path = Some(format!("{}.new", fqns));
                result[pos] = synthesized;
            }
        }

        // configured domains expose their instance methods at top level
        if fqns.is_empty() && root.is_empty() {
            for domain in self.config.domains().to_vec() {
                let mut visited = FxHashSet::default();
                if let Some(domain_fq) = self.resolve_namespace(&domain, "", &mut visited) {
                    let mut domain_skip = FxHashSet::default();
                    result.extend(self.inner_get_instance_methods(
                        &domain_fq,
                        "",
                        &[Visibility::Public],
                        &mut domain_skip,
                    ));
                }
            }
        }

        self.finish_methods(result, fqns, root, Scope::Class, visibility)
    }

    /// Instance methods of a namespace, mixins and superclasses included.
    pub fn get_instance_methods(
        &mut self,
        fqns: &str,
        root: &str,
        visibility: &[Visibility],
    ) -> Vec<Suggestion> {
        self.refresh(false);
        let mut skip = FxHashSet::default();
        let result = self.inner_get_instance_methods(fqns, root, visibility, &mut skip);
        self.finish_methods(result, fqns, root, Scope::Instance, visibility)
    }

    /// Instance methods with every visibility, for path queries.
    pub(crate) fn get_all_instance_methods(&mut self, fqns: &str, root: &str) -> Vec<Suggestion> {
        self.get_instance_methods(fqns, root, &ALL_VISIBILITIES)
    }

    pub(crate) fn get_all_methods(&mut self, fqns: &str, root: &str) -> Vec<Suggestion> {
        self.get_methods(fqns, root, &ALL_VISIBILITIES)
    }

    /// Dedups by label (first match wins, so nearer declarations shadow
    /// inherited ones) and appends unseen LiveMap results.
    fn finish_methods(
        &mut self,
        result: Vec<Suggestion>,
        fqns: &str,
        root: &str,
        scope: Scope,
        visibility: &[Visibility],
    ) -> Vec<Suggestion> {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut out = Vec::new();
        for suggestion in result {
            if seen.insert(suggestion.label.clone()) {
                out.push(suggestion);
            }
        }
        let include_private = visibility.contains(&Visibility::Private);
        for live in self.live_map.get_methods(fqns, root, scope, include_private) {
            if seen.insert(live.label.clone()) {
                out.push(live);
            }
        }
        out
    }

    fn inner_get_methods(
        &self,
        fqns: &str,
        root: &str,
        visibility: &[Visibility],
        skip: &mut FxHashSet<String>,
    ) -> Vec<Suggestion> {
        let key = format!("{}|class", fqns);
        if !skip.insert(key) {
            return Vec::new();
        }
        let mut result = Vec::new();

        for table in [&self.method_pins, &self.attribute_pins] {
            if let Some(pins) = table.get(fqns) {
                for pin in pins {
                    // top-level defs answer top-level queries regardless of side
                    let side_matches = pin.scope == Scope::Class || fqns.is_empty();
                    if side_matches && visibility.contains(&pin.visibility) {
                        result.push(pin.to_suggestion(None));
                    }
                }
            }
        }

        let follow = visibility.contains(&Visibility::Public)
            || visibility.contains(&Visibility::Protected);
        if follow {
            if let Some(sup_written) = self.superclasses.get(fqns).cloned() {
                let mut visited = FxHashSet::default();
                if let Some(sup_fq) = self.resolve_namespace(&sup_written, fqns, &mut visited) {
                    let hop = self.hop_visibility(root, &sup_fq, visibility);
                    result.extend(self.inner_get_methods(&sup_fq, root, &hop, skip));
                }
            }
        }

        // `extend` targets contribute their instance methods to the class side
        if let Some(targets) = self.namespace_extends.get(fqns).cloned() {
            for target in targets {
                let mut visited = FxHashSet::default();
                if let Some(target_fq) = self.resolve_namespace(&target, fqns, &mut visited) {
                    let hop = self.hop_visibility(root, fqns, visibility);
                    result.extend(self.inner_get_instance_methods(&target_fq, root, &hop, skip));
                }
            }
        }

        result.extend(self.yard_map.get_methods(fqns, root, visibility));

        if !fqns.is_empty() && self.yard_map.get_namespace_type(fqns).is_none() {
            // nothing documented for this namespace: it behaves like an
            // instance of the universal Class/Module object
            let universal = match self.namespace_kind(fqns) {
                Some(NamespaceKind::Module) => "Module",
                _ => "Class",
            };
            result.extend(self.yard_map.get_instance_methods(
                universal,
                root,
                &[Visibility::Public],
            ));
        }

        result
    }

    fn inner_get_instance_methods(
        &self,
        fqns: &str,
        root: &str,
        visibility: &[Visibility],
        skip: &mut FxHashSet<String>,
    ) -> Vec<Suggestion> {
        let key = format!("{}|instance", fqns);
        if !skip.insert(key) {
            return Vec::new();
        }
        let mut result = Vec::new();

        for table in [&self.method_pins, &self.attribute_pins] {
            if let Some(pins) = table.get(fqns) {
                for pin in pins {
                    if pin.scope == Scope::Instance && visibility.contains(&pin.visibility) {
                        result.push(pin.to_suggestion(None));
                    }
                }
            }
        }

        let follow = visibility.contains(&Visibility::Public)
            || visibility.contains(&Visibility::Protected);
        if follow {
            if let Some(sup_written) = self.superclasses.get(fqns).cloned() {
                let mut visited = FxHashSet::default();
                if let Some(sup_fq) = self.resolve_namespace(&sup_written, fqns, &mut visited) {
                    let hop = self.hop_visibility(root, &sup_fq, visibility);
                    result.extend(self.inner_get_instance_methods(&sup_fq, root, &hop, skip));
                }
            }
        }

        // `include` targets contribute their instance methods
        if let Some(targets) = self.namespace_includes.get(fqns).cloned() {
            for target in targets {
                let mut visited = FxHashSet::default();
                if let Some(target_fq) = self.resolve_namespace(&target, fqns, &mut visited) {
                    let hop = self.hop_visibility(root, fqns, visibility);
                    result.extend(self.inner_get_instance_methods(&target_fq, root, &hop, skip));
                }
            }
        }

        result.extend(self.yard_map.get_instance_methods(fqns, root, visibility));

        // root classes inherit from the universal parent implicitly
        if !fqns.is_empty()
            && fqns != "Object"
            && self.superclasses.get(fqns).is_none()
            && self.namespace_kind(fqns) != Some(NamespaceKind::Module)
        {
            result.extend(self.yard_map.get_instance_methods(
                "Object",
                root,
                &[Visibility::Public],
            ));
        }

        result
    }

    /// Visibility set that survives a hop to `target`: public always,
    /// protected only when the caller is that namespace itself.
    fn hop_visibility(&self, root: &str, target: &str, requested: &[Visibility]) -> Vec<Visibility> {
        let mut hop = vec![Visibility::Public];
        if requested.contains(&Visibility::Protected) && root == target {
            hop.push(Visibility::Protected);
        }
        hop
    }
}
