//! Inference memoization
//!
//! Signature inference re-walks the pin tables for every segment of a
//! chain, so results are memoized per `(signature, namespace, scope)` and
//! per `(assignment node, namespace)`. Entries memoize misses as well as
//! hits. There is no per-entry invalidation: the cache is cleared wholesale
//! on every index rebuild, whose cost dominates anyway.

use rustc_hash::FxHashMap;

use crate::pin::Scope;

#[derive(Debug, Default)]
pub(crate) struct Cache {
    signature_types: FxHashMap<(String, String, Scope), Option<String>>,
    assignment_types: FxHashMap<(usize, String), Option<String>>,
}

impl Cache {
    pub fn new() -> Self {
        Cache::default()
    }

    pub fn get_signature_type(
        &self,
        signature: &str,
        namespace: &str,
        scope: Scope,
    ) -> Option<&Option<String>> {
        self.signature_types
            .get(&(signature.to_string(), namespace.to_string(), scope))
    }

    pub fn set_signature_type(
        &mut self,
        signature: &str,
        namespace: &str,
        scope: Scope,
        value: Option<String>,
    ) {
        self.signature_types
            .insert((signature.to_string(), namespace.to_string(), scope), value);
    }

    pub fn get_assignment_type(&self, node_key: usize, namespace: &str) -> Option<&Option<String>> {
        self.assignment_types
            .get(&(node_key, namespace.to_string()))
    }

    pub fn set_assignment_type(&mut self, node_key: usize, namespace: &str, value: Option<String>) {
        self.assignment_types
            .insert((node_key, namespace.to_string()), value);
    }

    pub fn clear(&mut self) {
        self.signature_types.clear();
        self.assignment_types.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.signature_types.len() + self.assignment_types.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memoizes_hits_and_misses() {
        let mut cache = Cache::new();
        cache.set_signature_type("x.y", "Foo", Scope::Instance, Some("String".to_string()));
        cache.set_signature_type("x.z", "Foo", Scope::Instance, None);

        assert_eq!(
            cache.get_signature_type("x.y", "Foo", Scope::Instance),
            Some(&Some("String".to_string()))
        );
        // a memoized miss is distinct from an absent entry
        assert_eq!(
            cache.get_signature_type("x.z", "Foo", Scope::Instance),
            Some(&None)
        );
        assert_eq!(cache.get_signature_type("x.y", "Bar", Scope::Instance), None);
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut cache = Cache::new();
        cache.set_signature_type("a", "", Scope::Class, None);
        cache.set_assignment_type(1, "Foo", Some("Integer".to_string()));
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
