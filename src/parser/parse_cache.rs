//! Parse tree caching
//!
//! Reindexing re-parses every workspace file even when most are unchanged,
//! and overlay updates frequently resubmit identical buffers. Caching parse
//! trees by content turns those cases into map lookups.
//!
//! Entries are keyed by `(fx hash, byte length)` with a content equality
//! check on hit, so a hash collision can only cost a re-parse, never a
//! wrong tree. When the cache reaches capacity it is flushed whole: the
//! next refresh refills it with one parse per live buffer, which is the
//! same work a cold start does, and the bookkeeping stays trivial.

use std::hash::{Hash, Hasher};

use dashmap::DashMap;
use rustc_hash::{FxBuildHasher, FxHasher};
use tree_sitter::Tree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ParseKey {
    hash: u64,
    len: usize,
}

impl ParseKey {
    fn of(content: &str) -> ParseKey {
        let mut hasher = FxHasher::default();
        content.hash(&mut hasher);
        ParseKey {
            hash: hasher.finish(),
            len: content.len(),
        }
    }
}

/// Content-keyed cache of Ruby parse trees, shared across ApiMap
/// instances.
pub struct ParseCache {
    entries: DashMap<ParseKey, (String, Tree), FxBuildHasher>,
    max_entries: usize,
}

impl ParseCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::with_hasher(FxBuildHasher::default()),
            max_entries,
        }
    }

    /// Returns the cached tree for a buffer, when the stored content is
    /// byte-identical. A key collision reads as a miss.
    pub fn get(&self, content: &str) -> Option<Tree> {
        let entry = self.entries.get(&ParseKey::of(content))?;
        let (cached, tree) = entry.value();
        (cached == content).then(|| tree.clone())
    }

    /// Stores a parse tree, flushing the whole cache first when it is at
    /// capacity.
    pub fn insert(&self, content: String, tree: Tree) {
        if self.entries.len() >= self.max_entries {
            self.entries.clear();
        }
        self.entries.insert(ParseKey::of(&content), (content, tree));
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ParseCache {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(code: &str) -> Tree {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_ruby::LANGUAGE.into())
            .expect("failed to set language");
        parser.parse(code, None).expect("failed to parse")
    }

    #[test]
    fn test_cache_basic() {
        let cache = ParseCache::new(10);
        let content = "class Foo; end";

        assert!(cache.get(content).is_none());

        cache.insert(content.to_string(), parse(content));
        assert!(cache.get(content).is_some());
    }

    #[test]
    fn test_cache_content_mismatch_is_miss() {
        let cache = ParseCache::new(10);
        cache.insert("class Foo; end".to_string(), parse("class Foo; end"));
        assert!(cache.get("class Bar; end").is_none());
    }

    #[test]
    fn test_cache_flushes_at_capacity() {
        let cache = ParseCache::new(3);
        for i in 0..3 {
            let content = format!("class C{}; end", i);
            let tree = parse(&content);
            cache.insert(content, tree);
        }
        assert_eq!(cache.len(), 3);

        // the insert that would overflow flushes everything first
        cache.insert("class Next; end".to_string(), parse("class Next; end"));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("class Next; end").is_some());
        assert!(cache.get("class C0; end").is_none());
    }
}
