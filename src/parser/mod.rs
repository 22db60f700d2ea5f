//! Tree-Sitter parsing interface for Ruby sources
//!
//! This module provides the entry points for parsing Ruby code with
//! Tree-Sitter and converting the concrete syntax tree to the owned `Node`
//! IR. Parse trees are cached process-wide by content so that reindexing a
//! mostly-unchanged workspace and repeated overlay updates skip the parser.

mod conversion;
mod parse_cache;

use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::trace;
use tree_sitter::{Parser, Tree};

use crate::node::Node;
pub use parse_cache::ParseCache;

/// Global parse tree cache shared across all parse operations.
static PARSE_CACHE: Lazy<ParseCache> = Lazy::new(ParseCache::default);

/// One comment line, kept aside from the IR for docstring attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub row: usize,
    /// Text with the leading `#` and one following space stripped.
    pub text: String,
}

/// Result of parsing one buffer into the owned IR.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub root: Arc<Node>,
    pub comments: Vec<Comment>,
    /// True when the grammar flagged any ERROR/MISSING region.
    pub has_errors: bool,
}

/// Parse Ruby code into a Tree-Sitter syntax tree, consulting the cache
/// first. Returns `None` only when the parser itself gives up (which
/// callers treat as a parse failure, never an error).
pub fn parse_code(code: &str) -> Option<Tree> {
    if let Some(cached) = PARSE_CACHE.get(code) {
        trace!("parse cache hit for {} byte buffer", code.len());
        return Some(cached);
    }

    trace!("parse cache miss for {} byte buffer", code.len());
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_ruby::LANGUAGE.into())
        .expect("failed to set Tree-Sitter language");

    let tree = parser.parse(code, None)?;
    PARSE_CACHE.insert(code.to_string(), tree.clone());
    Some(tree)
}

/// Parse a buffer and convert it to the owned IR.
pub fn parse_to_ir(code: &str) -> Option<ParsedFile> {
    let tree = parse_code(code)?;
    let (root, comments, has_errors) = conversion::convert_tree(&tree, code);
    Some(ParsedFile {
        root,
        comments,
        has_errors,
    })
}
