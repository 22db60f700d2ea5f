//! The ApiMap: workspace-wide symbol graph and query engine
//!
//! This module owns the cross-file indices and their lifecycle. Editor
//! events (`virtualize`, `update`, config changes) mark the map stale;
//! every query begins with `refresh`, which rebuilds the indices before any
//! result is produced, so readers never observe intermediate states.
//!
//! Index tables are rebuilt atomically in `process_maps` from the current
//! Source set: per-kind pin tables keyed by enclosing namespace, the
//! namespace multiset (`namespace_map`), and the structural maps (mixin
//! targets kept unresolved, superclass edges, required libraries). A single
//! overlay Source shadows or extends the workspace without touching disk.
//!
//! Queries live in the sibling modules: name resolution and method/constant
//! enumeration in `resolution`, signature type inference in `inference`,
//! and path/search/document queries in `paths`.

mod inference;
mod paths;
mod resolution;

use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::cache::Cache;
use crate::config::Config;
use crate::live_map::{LiveMap, LiveProvider};
use crate::node::{Node, Position};
use crate::pin::{NamespaceKind, Pin};
use crate::source::cache::source_cache;
use crate::source::Source;
use crate::suggestion::Suggestion;
use crate::yard_map::YardMap;

/// Filename used for an overlay buffer that names no file.
const UNTITLED: &str = "(untitled)";

/// Overlay-eligible source suffix.
const SOURCE_SUFFIX: &str = ".rb";

pub struct ApiMap {
    config: Config,
    /// Authoritative workspace file set, sorted.
    workspace_files: Vec<String>,
    /// Current Sources by filename; the overlay shadows its entry here.
    sources: FxHashMap<String, Arc<Source>>,
    virtual_filename: Option<String>,
    virtual_source: Option<Arc<Source>>,

    namespace_map: FxHashMap<String, Vec<Arc<Node>>>,
    namespace_pins: FxHashMap<String, Vec<Arc<Pin>>>,
    method_pins: FxHashMap<String, Vec<Arc<Pin>>>,
    attribute_pins: FxHashMap<String, Vec<Arc<Pin>>>,
    instance_variable_pins: FxHashMap<String, Vec<Arc<Pin>>>,
    class_variable_pins: FxHashMap<String, Vec<Arc<Pin>>>,
    constant_pins: FxHashMap<String, Vec<Arc<Pin>>>,
    global_variable_pins: Vec<Arc<Pin>>,
    symbol_pins: Vec<Arc<Pin>>,
    namespace_includes: FxHashMap<String, Vec<String>>,
    namespace_extends: FxHashMap<String, Vec<String>>,
    superclasses: FxHashMap<String, String>,
    path_macros: FxHashMap<String, String>,
    required: Vec<String>,

    stale: bool,
    yard_stale: bool,
    /// Lazily assembled path index for search/document, reset per cycle.
    code_object_paths: Option<Vec<String>>,

    cache: Cache,
    yard_map: YardMap,
    live_map: LiveMap,
}

impl ApiMap {
    /// Creates a map for a workspace directory (or none), loads every
    /// workspace file, and runs a full refresh. Files that fail to parse
    /// become empty Sources; files that fail to read are dropped.
    pub fn new(workspace: Option<&Path>) -> ApiMap {
        source_cache().clear();
        let config = Config::load(workspace);
        let workspace_files = config.calculated();
        let doc_dirs = config.doc_dirs();
        let yard_map = YardMap::new(config.required(), &doc_dirs);

        let mut map = ApiMap {
            config,
            workspace_files,
            sources: FxHashMap::default(),
            virtual_filename: None,
            virtual_source: None,
            namespace_map: FxHashMap::default(),
            namespace_pins: FxHashMap::default(),
            method_pins: FxHashMap::default(),
            attribute_pins: FxHashMap::default(),
            instance_variable_pins: FxHashMap::default(),
            class_variable_pins: FxHashMap::default(),
            constant_pins: FxHashMap::default(),
            global_variable_pins: Vec::new(),
            symbol_pins: Vec::new(),
            namespace_includes: FxHashMap::default(),
            namespace_extends: FxHashMap::default(),
            superclasses: FxHashMap::default(),
            path_macros: FxHashMap::default(),
            required: Vec::new(),
            stale: true,
            yard_stale: true,
            code_object_paths: None,
            cache: Cache::new(),
            yard_map,
            live_map: LiveMap::new(),
        };

        // parse the initial set in parallel; queries stay single-threaded
        let loaded: Vec<(String, Option<Arc<Source>>)> = map
            .workspace_files
            .par_iter()
            .map(|filename| {
                let source = source_cache().load(filename).ok();
                (filename.clone(), source)
            })
            .collect();
        for (filename, source) in loaded {
            match source {
                Some(source) => {
                    map.sources.insert(filename, source);
                }
                None => {
                    map.workspace_files.retain(|f| f != &filename);
                }
            }
        }
        info!("initialized with {} workspace files", map.workspace_files.len());

        map.refresh(true);
        map
    }

    /// Registers a runtime-introspection provider.
    pub fn register_live_provider(&mut self, provider: Arc<dyn LiveProvider>) {
        self.live_map.register(provider);
        self.stale = true;
    }

    pub fn workspace_files(&self) -> &[String] {
        &self.workspace_files
    }

    pub fn required(&mut self) -> Vec<String> {
        self.refresh(false);
        self.required.clone()
    }

    /// Rebuilds the indices when they are stale (or unconditionally).
    pub fn refresh(&mut self, force: bool) {
        if force || self.stale {
            self.process_maps();
        }
    }

    /// True when the index no longer reflects the filesystem: the computed
    /// workspace set disagrees, a file's mtime moved, or a file vanished.
    pub fn changed(&self) -> bool {
        if self.config.calculated() != self.workspace_files {
            return true;
        }
        for filename in &self.workspace_files {
            let Some(source) = self.sources.get(filename) else {
                return true;
            };
            if self.virtual_filename.as_deref() == Some(filename.as_str()) {
                continue;
            }
            match std::fs::metadata(filename).and_then(|m| m.modified()) {
                Ok(mtime) => {
                    if source.mtime() != Some(mtime) {
                        return true;
                    }
                }
                Err(_) => return true,
            }
        }
        false
    }

    /// Replaces the overlay buffer. Returns false when the filename is not
    /// overlay-eligible (present but not a source file), in which case the
    /// current overlay is left in place.
    pub fn virtualize(&mut self, code: &str, filename: Option<&str>, cursor: Option<Position>) -> bool {
        // drop workspace files that no longer exist on disk
        for filename in self.workspace_files.clone() {
            if !Path::new(&filename).exists() {
                debug!("dropping deleted workspace file {}", filename);
                self.eliminate(&filename);
                self.sources.remove(&filename);
                source_cache().invalidate(&filename);
                self.workspace_files.retain(|f| f != &filename);
            }
        }

        if let Some(name) = filename {
            if !name.ends_with(SOURCE_SUFFIX) {
                warn!("refusing to virtualize non-source filename {:?}", name);
                return false;
            }
        }
        let overlay_name = filename.unwrap_or(UNTITLED).to_string();

        // evict the previous overlay when it named a different file
        if let Some(prev) = self.virtual_filename.take() {
            if prev != overlay_name {
                self.eliminate(&prev);
                self.sources.remove(&prev);
                if self.workspace_files.contains(&prev) {
                    // the disk version comes back on the next rebuild
                    self.stale = true;
                }
            }
        }

        self.virtual_source = Some(Arc::new(Source::fix(code, &overlay_name, cursor)));
        self.virtual_filename = Some(overlay_name.clone());

        // an overlay naming a new file may change the workspace set
        if filename.is_some() && !self.workspace_files.contains(&overlay_name) {
            let computed = self.config.calculated();
            if computed != self.workspace_files {
                self.apply_workspace_set(computed);
                self.stale = true;
            }
        }

        self.process_virtual();
        true
    }

    /// Reloads one file from disk. A change to the config file (or a file
    /// not yet in the workspace) recomputes the workspace set first.
    pub fn update(&mut self, filename: &str) {
        let config_file = self
            .config
            .config_file()
            .map(|p| p.to_string_lossy().to_string());
        if config_file.as_deref() == Some(filename) {
            debug!("config file changed, recomputing workspace");
            self.config = Config::load(self.config.workspace());
            let computed = self.config.calculated();
            self.apply_workspace_set(computed);
            self.stale = true;
            return;
        }

        if self.workspace_files.iter().any(|f| f == filename) {
            source_cache().invalidate(filename);
            match source_cache().load(filename) {
                Ok(source) => {
                    self.sources.insert(filename.to_string(), source);
                }
                Err(err) => {
                    debug!("dropping unreadable workspace file {}: {}", filename, err);
                    self.eliminate(filename);
                    self.sources.remove(filename);
                    self.workspace_files.retain(|f| f != filename);
                }
            }
            self.stale = true;
            return;
        }

        // possibly a newly created file
        let computed = self.config.calculated();
        self.apply_workspace_set(computed);
        if self.workspace_files.iter().any(|f| f == filename) {
            if let Ok(source) = source_cache().load(filename) {
                self.sources.insert(filename.to_string(), source);
            }
        }
        self.stale = true;
    }

    /// Every fully qualified namespace currently known from the workspace.
    pub fn namespaces(&mut self) -> Vec<String> {
        self.refresh(false);
        let mut names: Vec<String> = self.namespace_map.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn namespace_exists(&mut self, name: &str, root: &str) -> bool {
        self.find_fully_qualified_namespace(name, root).is_some()
    }

    /// Symbol literals seen across the workspace, deduplicated by label.
    pub fn get_symbols(&mut self) -> Vec<Suggestion> {
        self.refresh(false);
        let mut seen: rustc_hash::FxHashSet<String> = rustc_hash::FxHashSet::default();
        self.symbol_pins
            .iter()
            .filter(|pin| seen.insert(pin.name.clone()))
            .map(|pin| pin.to_suggestion(None))
            .collect()
    }

    /// Swaps in a freshly computed workspace set, evicting dropped files.
    fn apply_workspace_set(&mut self, computed: Vec<String>) {
        for filename in self.workspace_files.clone() {
            if !computed.contains(&filename) {
                self.eliminate(&filename);
                self.sources.remove(&filename);
                source_cache().invalidate(&filename);
            }
        }
        self.workspace_files = computed;
    }

    /// Full atomic index rebuild.
    fn process_maps(&mut self) {
        self.cache.clear();
        self.clear_pin_tables();
        self.clear_structure_maps();

        // reload any missing sources; unreadable files drop out silently
        let mut dead: Vec<String> = Vec::new();
        for filename in &self.workspace_files {
            if self.sources.contains_key(filename) {
                continue;
            }
            match source_cache().load(filename) {
                Ok(source) => {
                    self.sources.insert(filename.clone(), source);
                }
                Err(_) => dead.push(filename.clone()),
            }
        }
        for filename in dead {
            self.workspace_files.retain(|f| f != &filename);
            self.sources.remove(&filename);
        }

        // reinstall the overlay
        if let (Some(vf), Some(vs)) = (&self.virtual_filename, &self.virtual_source) {
            self.sources.insert(vf.clone(), vs.clone());
        }
        let keep: Vec<String> = self.iteration_order();
        self.sources.retain(|f, _| keep.contains(f));

        for filename in &keep {
            if let Some(source) = self.sources.get(filename).cloned() {
                self.merge_structure(&source);
                self.map_source(&source);
            }
        }

        self.rebuild_required();
        self.refresh_yard_map();
        self.live_map.refresh();
        self.stale = false;
        self.yard_stale = true;
        self.code_object_paths = None;
        debug!(
            "processed {} sources into {} namespaces",
            keep.len(),
            self.namespace_map.len()
        );
    }

    /// Incremental overlay update: falls back to a full rebuild when the
    /// map is stale anyway, otherwise re-maps only the overlay file.
    fn process_virtual(&mut self) {
        if self.stale {
            self.process_maps();
            return;
        }
        let (Some(vf), Some(vs)) = (self.virtual_filename.clone(), self.virtual_source.clone())
        else {
            return;
        };
        self.cache.clear();
        self.eliminate(&vf);
        self.sources.insert(vf, vs.clone());

        self.clear_structure_maps();
        let order = self.iteration_order();
        for filename in &order {
            if let Some(source) = self.sources.get(filename).cloned() {
                self.merge_structure(&source);
            }
        }
        self.map_source(&vs);

        self.rebuild_required();
        self.refresh_yard_map();
        self.yard_stale = true;
        self.code_object_paths = None;
    }

    /// Stable Source iteration order: sorted workspace files, overlay last
    /// when it names a file outside the workspace.
    fn iteration_order(&self) -> Vec<String> {
        let mut order = self.workspace_files.clone();
        if let Some(vf) = &self.virtual_filename {
            if !order.contains(vf) {
                order.push(vf.clone());
            }
        }
        order
    }

    fn clear_pin_tables(&mut self) {
        self.namespace_pins.clear();
        self.method_pins.clear();
        self.attribute_pins.clear();
        self.instance_variable_pins.clear();
        self.class_variable_pins.clear();
        self.constant_pins.clear();
        self.global_variable_pins.clear();
        self.symbol_pins.clear();
    }

    fn clear_structure_maps(&mut self) {
        self.namespace_map.clear();
        self.namespace_includes.clear();
        self.namespace_extends.clear();
        self.superclasses.clear();
        self.path_macros.clear();
        self.required.clear();
    }

    /// Merges one Source's structural maps (namespace openings, mixin
    /// targets, superclass edges, macros).
    fn merge_structure(&mut self, source: &Arc<Source>) {
        for (fqn, nodes) in source.namespace_nodes() {
            if fqn.is_empty() {
                continue;
            }
            self.namespace_map
                .entry(fqn.clone())
                .or_default()
                .extend(nodes.iter().cloned());
        }
        for (fqn, targets) in source.namespace_includes() {
            self.namespace_includes
                .entry(fqn.clone())
                .or_default()
                .extend(targets.iter().cloned());
        }
        for (fqn, targets) in source.namespace_extends() {
            self.namespace_extends
                .entry(fqn.clone())
                .or_default()
                .extend(targets.iter().cloned());
        }
        for (fqn, sup) in source.superclasses() {
            self.superclasses.insert(fqn.clone(), sup.clone());
        }
        for (path, template) in source.path_macros() {
            self.path_macros.insert(path.clone(), template.clone());
        }
    }

    /// Fans one Source's pin lists into the per-kind tables.
    fn map_source(&mut self, source: &Arc<Source>) {
        fn fan_out(table: &mut FxHashMap<String, Vec<Arc<Pin>>>, pins: &[Arc<Pin>]) {
            for pin in pins {
                table
                    .entry(pin.namespace.clone())
                    .or_default()
                    .push(pin.clone());
            }
        }
        fan_out(&mut self.namespace_pins, source.namespace_pins());
        fan_out(&mut self.method_pins, source.method_pins());
        fan_out(&mut self.attribute_pins, source.attribute_pins());
        fan_out(
            &mut self.instance_variable_pins,
            source.instance_variable_pins(),
        );
        fan_out(&mut self.class_variable_pins, source.class_variable_pins());
        fan_out(&mut self.constant_pins, source.constant_pins());
        self.global_variable_pins
            .extend(source.global_variable_pins().iter().cloned());
        self.symbol_pins.extend(source.symbol_pins().iter().cloned());
    }

    fn rebuild_required(&mut self) {
        let mut required: Vec<String> = self.config.required().to_vec();
        for filename in self.iteration_order() {
            if let Some(source) = self.sources.get(&filename) {
                required.extend(source.required().iter().cloned());
            }
        }
        required.sort();
        required.dedup();
        self.required = required;
    }

    fn refresh_yard_map(&mut self) {
        if self.yard_map.required() != self.required.as_slice() {
            let doc_dirs = self.config.doc_dirs();
            self.yard_map = YardMap::new(&self.required, &doc_dirs);
        }
    }

    /// Drops every pin whose filename matches. Symbol pins are retained;
    /// see the eviction test for the pinned-down behavior.
    pub(crate) fn eliminate(&mut self, filename: &str) {
        fn prune(table: &mut FxHashMap<String, Vec<Arc<Pin>>>, filename: &str) {
            table.retain(|_, pins| {
                pins.retain(|p| p.filename != filename);
                !pins.is_empty()
            });
        }
        prune(&mut self.namespace_pins, filename);
        prune(&mut self.method_pins, filename);
        prune(&mut self.attribute_pins, filename);
        prune(&mut self.instance_variable_pins, filename);
        prune(&mut self.class_variable_pins, filename);
        prune(&mut self.constant_pins, filename);
        self.global_variable_pins.retain(|p| p.filename != filename);
    }

    /// Class or module kind of an FQN, preferring workspace declarations.
    pub(crate) fn namespace_kind(&self, fqns: &str) -> Option<NamespaceKind> {
        let (parent, local) = match fqns.rfind("::") {
            Some(idx) => (&fqns[..idx], &fqns[idx + 2..]),
            None => ("", fqns),
        };
        if let Some(pins) = self.namespace_pins.get(parent) {
            for pin in pins {
                if pin.name == local {
                    if let crate::pin::PinDetails::Namespace { kind } = pin.details {
                        return Some(kind);
                    }
                }
            }
        }
        self.yard_map.get_namespace_type(fqns)
    }
}
