//! Read-only view of one parsed file
//!
//! A `Source` bundles the parse result of a single buffer: its root node,
//! its pins grouped by kind, and the derived maps the ApiMap merges during
//! index builds. Sources are immutable once constructed; editor changes
//! produce replacement Sources.
//!
//! Parse failures never escape this module: a buffer the parser gives up on
//! becomes an empty Source with the original filename, so references to
//! that file keep resolving to "nothing" instead of dangling.

pub(crate) mod cache;
pub(crate) mod mapper;

use std::fs;
use std::io;
use std::sync::Arc;
use std::time::SystemTime;

use ropey::Rope;
use rustc_hash::FxHashMap;
use tracing::warn;

use crate::node::{Node, Position, Range};
use crate::parser::{self, ParsedFile};
use crate::pin::Pin;
use mapper::Mapped;

#[derive(Debug, Clone)]
pub struct Source {
    filename: String,
    text: Rope,
    mtime: Option<SystemTime>,
    node: Arc<Node>,
    mapped: Mapped,
    parse_errors: bool,
}

impl Source {
    /// Loads and parses a file from disk. Only I/O failures surface as
    /// errors; parse failures produce an empty Source.
    pub fn load(filename: &str) -> io::Result<Source> {
        let code = fs::read_to_string(filename)?;
        let mtime = fs::metadata(filename).and_then(|m| m.modified()).ok();
        Ok(Self::build(&code, filename, mtime))
    }

    /// Parses an in-memory buffer (the overlay form).
    pub fn from_code(code: &str, filename: &str) -> Source {
        Self::build(code, filename, None)
    }

    /// Parses a possibly mid-edit buffer. When the parse has errors and a
    /// cursor is supplied, a harmless identifier is spliced in at the cursor
    /// and the buffer is re-parsed; the fixed parse is used if it is clean.
    pub fn fix(code: &str, filename: &str, cursor: Option<Position>) -> Source {
        let source = Self::build(code, filename, None);
        if !source.parse_errors {
            return source;
        }
        let Some(cursor) = cursor else {
            return source;
        };
        if cursor.byte > code.len() || !code.is_char_boundary(cursor.byte) {
            return source;
        }
        let mut patched = String::with_capacity(code.len() + 8);
        patched.push_str(&code[..cursor.byte]);
        patched.push_str("__fix__");
        patched.push_str(&code[cursor.byte..]);
        let fixed = Self::build(&patched, filename, None);
        if fixed.parse_errors {
            source
        } else {
            fixed
        }
    }

    /// An empty Source standing in for a file that could not be parsed.
    pub fn empty(filename: &str) -> Source {
        Source {
            filename: filename.to_string(),
            text: Rope::new(),
            mtime: None,
            node: Arc::new(Node::Program {
                body: Vec::new(),
                range: Range::default(),
            }),
            mapped: Mapped::default(),
            parse_errors: true,
        }
    }

    fn build(code: &str, filename: &str, mtime: Option<SystemTime>) -> Source {
        match parser::parse_to_ir(code) {
            Some(ParsedFile {
                root,
                comments,
                has_errors,
            }) => {
                let parsed = ParsedFile {
                    root: root.clone(),
                    comments,
                    has_errors,
                };
                let mapped = mapper::map_parsed(filename, &parsed);
                Source {
                    filename: filename.to_string(),
                    text: Rope::from_str(code),
                    mtime,
                    node: root,
                    mapped,
                    parse_errors: has_errors,
                }
            }
            None => {
                warn!("parser gave up on {}, mapping as empty source", filename);
                let mut empty = Self::empty(filename);
                empty.mtime = mtime;
                empty
            }
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn mtime(&self) -> Option<SystemTime> {
        self.mtime
    }

    /// Root AST node.
    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }

    pub fn parse_errors(&self) -> bool {
        self.parse_errors
    }

    pub fn namespace_pins(&self) -> &[Arc<Pin>] {
        &self.mapped.namespace_pins
    }

    pub fn method_pins(&self) -> &[Arc<Pin>] {
        &self.mapped.method_pins
    }

    pub fn attribute_pins(&self) -> &[Arc<Pin>] {
        &self.mapped.attribute_pins
    }

    pub fn instance_variable_pins(&self) -> &[Arc<Pin>] {
        &self.mapped.instance_variable_pins
    }

    pub fn class_variable_pins(&self) -> &[Arc<Pin>] {
        &self.mapped.class_variable_pins
    }

    pub fn constant_pins(&self) -> &[Arc<Pin>] {
        &self.mapped.constant_pins
    }

    pub fn global_variable_pins(&self) -> &[Arc<Pin>] {
        &self.mapped.global_variable_pins
    }

    pub fn symbol_pins(&self) -> &[Arc<Pin>] {
        &self.mapped.symbol_pins
    }

    /// FQN to the AST nodes that open that namespace in this file.
    pub fn namespace_nodes(&self) -> &FxHashMap<String, Vec<Arc<Node>>> {
        &self.mapped.namespace_nodes
    }

    /// FQN to mixin targets as written, in lexical order.
    pub fn namespace_includes(&self) -> &FxHashMap<String, Vec<String>> {
        &self.mapped.namespace_includes
    }

    pub fn namespace_extends(&self) -> &FxHashMap<String, Vec<String>> {
        &self.mapped.namespace_extends
    }

    /// FQN to parent class name as written.
    pub fn superclasses(&self) -> &FxHashMap<String, String> {
        &self.mapped.superclasses
    }

    pub fn required(&self) -> &[String] {
        &self.mapped.required
    }

    pub fn path_macros(&self) -> &FxHashMap<String, String> {
        &self.mapped.path_macros
    }

    /// True if `node` belongs to this Source's tree.
    pub fn include(&self, node: &Arc<Node>) -> bool {
        self.node.contains(node)
    }

    /// Source text covered by a node.
    pub fn code_for(&self, node: &Arc<Node>) -> String {
        let range = node.range();
        let len = self.text.len_bytes();
        if range.start.byte >= len || range.end.byte > len || range.start.byte > range.end.byte {
            return String::new();
        }
        let start = self.text.byte_to_char(range.start.byte);
        let end = self.text.byte_to_char(range.end.byte);
        self.text.slice(start..end).to_string()
    }

    /// The comment block attached to a declaration node, when one exists.
    pub fn docstring_for(&self, node: &Arc<Node>) -> Option<String> {
        self.mapped.docstrings.get(&Node::key(node)).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_is_io_error() {
        assert!(Source::load("/nonexistent/missing.rb").is_err());
    }

    #[test]
    fn test_from_code_maps_pins() {
        let source = Source::from_code("class Foo\n  def bar; end\nend\n", "foo.rb");
        assert_eq!(source.namespace_pins().len(), 1);
        assert_eq!(source.method_pins().len(), 1);
        assert!(!source.parse_errors());
    }

    #[test]
    fn test_fix_recovers_trailing_dot() {
        let code = "class Foo\n  def bar\n    self.\n  end\nend\n";
        let cursor_byte = code.find("self.").unwrap() + 5;
        let cursor = Position {
            row: 2,
            column: 9,
            byte: cursor_byte,
        };
        let source = Source::fix(code, "foo.rb", Some(cursor));
        assert!(!source.parse_errors());
        assert_eq!(source.method_pins().len(), 1);
    }

    #[test]
    fn test_code_for_reads_node_span() {
        let source = Source::from_code("class Foo\nend\n", "foo.rb");
        let root = source.node().clone();
        let class_node = match &*root {
            Node::Program { body, .. } => body[0].clone(),
            _ => unreachable!(),
        };
        assert_eq!(source.code_for(&class_node), "class Foo\nend");
    }

    #[test]
    fn test_empty_source_keeps_filename() {
        let source = Source::empty("broken.rb");
        assert_eq!(source.filename(), "broken.rb");
        assert!(source.method_pins().is_empty());
    }
}
