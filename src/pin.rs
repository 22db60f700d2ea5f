//! Symbol descriptors produced by Source mapping
//!
//! A `Pin` is an immutable record of one declaration: enough metadata to
//! answer intelligence queries without revisiting the AST. Pins are created
//! at parse time, enter the ApiMap indices during map processing, and leave
//! only when their file is evicted.
//!
//! Identity for deduplication is the `(kind, namespace, name, scope)` tuple;
//! the manual `PartialEq`/`Hash` implementations below encode exactly that,
//! so equal tuples collapse when results are collected through a set.

use std::fmt;
use std::sync::Arc;

use crate::node::{Node, Range};
use crate::suggestion::{Location, Suggestion, SuggestionKind};

/// Whether a symbol lives on the class side or the instance side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Class,
    Instance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

/// Class vs module, for namespace pins and type-string construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamespaceKind {
    Class,
    Module,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeAccess {
    Reader,
    Writer,
}

/// Formal parameter descriptor for method and attribute pins.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Parameter {
    pub name: String,
    pub kind: ParameterKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    Required,
    Optional,
    Rest,
    Keyword,
    Block,
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ParameterKind::Required => write!(f, "{}", self.name),
            ParameterKind::Optional => write!(f, "{} = ?", self.name),
            ParameterKind::Rest => write!(f, "*{}", self.name),
            ParameterKind::Keyword => write!(f, "{}:", self.name),
            ParameterKind::Block => write!(f, "&{}", self.name),
        }
    }
}

/// Kind-specific payload. The common header lives on `Pin` itself.
#[derive(Debug, Clone, PartialEq)]
pub enum PinDetails {
    Namespace { kind: NamespaceKind },
    Method,
    Attribute { access: AttributeAccess },
    InstanceVariable,
    ClassVariable,
    Constant,
    GlobalVariable,
    Symbol,
}

/// Discriminant of `PinDetails`, used as part of the identity tuple and for
/// routing pins into the per-kind index tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinKind {
    Namespace,
    Method,
    Attribute,
    InstanceVariable,
    ClassVariable,
    Constant,
    GlobalVariable,
    Symbol,
}

#[derive(Debug, Clone)]
pub struct Pin {
    /// Source file this pin came from; the eviction key.
    pub filename: String,
    /// Fully qualified enclosing namespace (`""` at top level).
    pub namespace: String,
    /// Local identifier.
    pub name: String,
    pub scope: Scope,
    pub visibility: Visibility,
    /// Declared type, from a documentation tag or a literal assignment.
    pub return_type: Option<String>,
    pub parameters: Vec<Parameter>,
    pub docstring: Option<String>,
    pub location: Range,
    /// Opaque AST handle, used to read source text and assignment values.
    pub node: Arc<Node>,
    pub details: PinDetails,
}

impl Pin {
    pub fn kind(&self) -> PinKind {
        match self.details {
            PinDetails::Namespace { .. } => PinKind::Namespace,
            PinDetails::Method => PinKind::Method,
            PinDetails::Attribute { .. } => PinKind::Attribute,
            PinDetails::InstanceVariable => PinKind::InstanceVariable,
            PinDetails::ClassVariable => PinKind::ClassVariable,
            PinDetails::Constant => PinKind::Constant,
            PinDetails::GlobalVariable => PinKind::GlobalVariable,
            PinDetails::Symbol => PinKind::Symbol,
        }
    }

    /// Fully qualified path: `A::B` for namespaces and constants, `A::B#m`
    /// for instance methods, `A::B.m` for class methods, the bare name for
    /// variables and symbols.
    pub fn path(&self) -> String {
        match self.kind() {
            PinKind::Namespace | PinKind::Constant => {
                if self.namespace.is_empty() {
                    self.name.clone()
                } else {
                    format!("{}::{}", self.namespace, self.name)
                }
            }
            PinKind::Method | PinKind::Attribute => {
                let sep = match self.scope {
                    Scope::Instance => "#",
                    Scope::Class => ".",
                };
                format!("{}{}{}", self.namespace, sep, self.name)
            }
            _ => self.name.clone(),
        }
    }

    /// Stringified signature used as the dedup key for method listings.
    pub fn method_label(&self) -> String {
        if self.parameters.is_empty() {
            self.name.clone()
        } else {
            let params: Vec<String> = self.parameters.iter().map(|p| p.to_string()).collect();
            format!("{}({})", self.name, params.join(", "))
        }
    }

    /// The FQN this pin declares, for namespace pins.
    pub fn fqn(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}::{}", self.namespace, self.name)
        }
    }

    pub fn to_suggestion(&self, return_type: Option<String>) -> Suggestion {
        let kind = match self.details {
            PinDetails::Namespace {
                kind: NamespaceKind::Class,
            } => SuggestionKind::Class,
            PinDetails::Namespace {
                kind: NamespaceKind::Module,
            } => SuggestionKind::Module,
            PinDetails::Method | PinDetails::Attribute { .. } => SuggestionKind::Method,
            PinDetails::Constant => SuggestionKind::Constant,
            PinDetails::InstanceVariable | PinDetails::ClassVariable => SuggestionKind::Field,
            PinDetails::GlobalVariable | PinDetails::Symbol => SuggestionKind::Variable,
        };
        let params: Vec<String> = self.parameters.iter().map(|p| p.to_string()).collect();
        let detail = if params.is_empty() {
            None
        } else {
            Some(format!("({})", params.join(", ")))
        };
        Suggestion {
            label: self.name.clone(),
            kind,
            detail,
            docstring: self.docstring.clone(),
            return_type: return_type.or_else(|| self.return_type.clone()),
            parameters: params,
            path: Some(self.path()),
            location: Some(Location {
                filename: self.filename.clone(),
                range: self.location,
            }),
        }
    }
}

impl PartialEq for Pin {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind()
            && self.namespace == other.namespace
            && self.name == other.name
            && self.scope == other.scope
    }
}

impl Eq for Pin {}

impl std::hash::Hash for Pin {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        self.namespace.hash(state);
        self.name.hash(state);
        self.scope.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Range;

    fn pin(kind: PinDetails, namespace: &str, name: &str, scope: Scope) -> Pin {
        Pin {
            filename: "test.rb".to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            scope,
            visibility: Visibility::Public,
            return_type: None,
            parameters: Vec::new(),
            docstring: None,
            location: Range::default(),
            node: Arc::new(Node::Unknown {
                children: vec![],
                range: Range::default(),
            }),
            details: kind,
        }
    }

    #[test]
    fn test_method_paths_use_scope_separator() {
        let inst = pin(PinDetails::Method, "Foo", "bar", Scope::Instance);
        let cls = pin(PinDetails::Method, "Foo", "bar", Scope::Class);
        assert_eq!(inst.path(), "Foo#bar");
        assert_eq!(cls.path(), "Foo.bar");
    }

    #[test]
    fn test_identity_collapses_same_tuple() {
        let a = pin(PinDetails::Method, "Foo", "bar", Scope::Instance);
        let mut b = pin(PinDetails::Method, "Foo", "bar", Scope::Instance);
        b.filename = "other.rb".to_string();
        assert_eq!(a, b);

        let c = pin(PinDetails::Method, "Foo", "bar", Scope::Class);
        assert_ne!(a, c);
    }

    #[test]
    fn test_parameter_display_forms() {
        let forms = [
            (ParameterKind::Required, "x"),
            (ParameterKind::Optional, "x = ?"),
            (ParameterKind::Rest, "*x"),
            (ParameterKind::Keyword, "x:"),
            (ParameterKind::Block, "&x"),
        ];
        for (kind, expected) in forms {
            let p = Parameter {
                name: "x".to_string(),
                kind,
            };
            assert_eq!(p.to_string(), expected);
        }
    }
}
