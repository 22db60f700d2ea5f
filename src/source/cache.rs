//! Process-wide Source cache
//!
//! Parsed Sources are memoized by filename so that multiple ApiMap
//! instances (and repeated refreshes) share one parse per on-disk file.
//! The cache is cleared whenever a new ApiMap initializes; `update`
//! invalidates single entries.

use std::io;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use super::Source;

static SOURCE_CACHE: Lazy<SourceCache> = Lazy::new(SourceCache::new);

pub(crate) fn source_cache() -> &'static SourceCache {
    &SOURCE_CACHE
}

pub(crate) struct SourceCache {
    cache: DashMap<String, Arc<Source>>,
}

impl SourceCache {
    fn new() -> Self {
        SourceCache {
            cache: DashMap::new(),
        }
    }

    /// Returns the memoized Source for a file, loading it on first access.
    /// I/O failures propagate (missing files are dropped by the caller);
    /// parse failures come back as empty Sources, never as errors.
    pub fn load(&self, filename: &str) -> io::Result<Arc<Source>> {
        if let Some(entry) = self.cache.get(filename) {
            return Ok(entry.value().clone());
        }
        let source = Arc::new(Source::load(filename)?);
        self.cache.insert(filename.to_string(), source.clone());
        Ok(source)
    }

    pub fn invalidate(&self, filename: &str) {
        self.cache.remove(filename);
    }

    pub fn clear(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_memoizes_and_invalidates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cached.rb");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "class Cached; end").unwrap();
        let filename = path.to_string_lossy().to_string();

        let cache = SourceCache::new();
        let first = cache.load(&filename).unwrap();
        let second = cache.load(&filename).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        cache.invalidate(&filename);
        let third = cache.load(&filename).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }
}
