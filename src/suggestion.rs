//! Presentation records returned by ApiMap queries
//!
//! A `Suggestion` is the public result shape for completion-style queries:
//! a label plus whatever metadata the indexer could attach. Consumers render
//! these directly; nothing in here refers back into the index.

use crate::node::Range;

/// Completion-item category for a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuggestionKind {
    Keyword,
    Constant,
    Class,
    Module,
    Method,
    Field,
    Variable,
}

/// Where a suggestion's declaration lives, when it came from the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub filename: String,
    pub range: Range,
}

/// A single query result.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub label: String,
    pub kind: SuggestionKind,
    /// Short human-readable annotation, e.g. a parameter list.
    pub detail: Option<String>,
    pub docstring: Option<String>,
    pub return_type: Option<String>,
    pub parameters: Vec<String>,
    /// Fully qualified path (`A::B#m`) when one exists.
    pub path: Option<String>,
    pub location: Option<Location>,
}

impl Suggestion {
    pub fn new(label: impl Into<String>, kind: SuggestionKind) -> Self {
        Suggestion {
            label: label.into(),
            kind,
            detail: None,
            docstring: None,
            return_type: None,
            parameters: Vec::new(),
            path: None,
            location: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_return_type(mut self, return_type: Option<String>) -> Self {
        self.return_type = return_type;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}
