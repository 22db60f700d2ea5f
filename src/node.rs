//! Owned AST representation for parsed Ruby sources
//!
//! Tree-Sitter trees borrow from their parser, so the conversion layer turns
//! the CST into this owned IR once per parse. Pins hold `Arc<Node>` handles
//! into it; node identity (for memoization keys) is the `Arc` pointer value.

use std::sync::Arc;

/// A position in a source file (zero-based row/column plus byte offset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Position {
    pub row: usize,
    pub column: usize,
    pub byte: usize,
}

/// A half-open span in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

/// Ruby AST node, reduced to the shapes the symbol mapper and the type
/// inferrer consume. Anything else parses to `Unknown` with its children
/// preserved so traversal still reaches nested declarations.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Program {
        body: Vec<Arc<Node>>,
        range: Range,
    },
    /// `class Name < Super ... end`
    Class {
        name: Arc<Node>,
        superclass: Option<Arc<Node>>,
        body: Vec<Arc<Node>>,
        range: Range,
    },
    /// `class << self ... end`
    SingletonClass {
        body: Vec<Arc<Node>>,
        range: Range,
    },
    Module {
        name: Arc<Node>,
        body: Vec<Arc<Node>>,
        range: Range,
    },
    /// `def name(params) ... end`
    Method {
        name: String,
        parameters: Vec<Arc<Node>>,
        body: Vec<Arc<Node>>,
        range: Range,
    },
    /// `def self.name(params) ... end` (or another explicit receiver)
    SingletonMethod {
        receiver: Arc<Node>,
        name: String,
        parameters: Vec<Arc<Node>>,
        body: Vec<Arc<Node>>,
        range: Range,
    },
    RequiredParameter {
        name: String,
        range: Range,
    },
    OptionalParameter {
        name: String,
        range: Range,
    },
    RestParameter {
        name: String,
        range: Range,
    },
    KeywordParameter {
        name: String,
        range: Range,
    },
    BlockParameter {
        name: String,
        range: Range,
    },
    /// `target = value`
    Assignment {
        target: Arc<Node>,
        value: Arc<Node>,
        range: Range,
    },
    /// Method call, with `a.b(c)` and `b(c)` both normalized here.
    Call {
        receiver: Option<Arc<Node>>,
        method: String,
        arguments: Vec<Arc<Node>>,
        range: Range,
    },
    Constant {
        name: String,
        range: Range,
    },
    /// `Scope::Name`; `scope` is `None` for the `::Name` root form.
    ScopeResolution {
        scope: Option<Arc<Node>>,
        name: String,
        range: Range,
    },
    Identifier {
        name: String,
        range: Range,
    },
    SelfRef {
        range: Range,
    },
    InstanceVariable {
        name: String,
        range: Range,
    },
    ClassVariable {
        name: String,
        range: Range,
    },
    GlobalVariable {
        name: String,
        range: Range,
    },
    SymbolLiteral {
        name: String,
        range: Range,
    },
    IntegerLiteral {
        range: Range,
    },
    FloatLiteral {
        range: Range,
    },
    StringLiteral {
        value: String,
        range: Range,
    },
    ArrayLiteral {
        elements: Vec<Arc<Node>>,
        range: Range,
    },
    HashLiteral {
        elements: Vec<Arc<Node>>,
        range: Range,
    },
    RangeLiteral {
        range: Range,
    },
    RegexLiteral {
        range: Range,
    },
    TrueLiteral {
        range: Range,
    },
    FalseLiteral {
        range: Range,
    },
    NilLiteral {
        range: Range,
    },
    Unknown {
        children: Vec<Arc<Node>>,
        range: Range,
    },
}

impl Node {
    pub fn range(&self) -> Range {
        match self {
            Node::Program { range, .. }
            | Node::Class { range, .. }
            | Node::SingletonClass { range, .. }
            | Node::Module { range, .. }
            | Node::Method { range, .. }
            | Node::SingletonMethod { range, .. }
            | Node::RequiredParameter { range, .. }
            | Node::OptionalParameter { range, .. }
            | Node::RestParameter { range, .. }
            | Node::KeywordParameter { range, .. }
            | Node::BlockParameter { range, .. }
            | Node::Assignment { range, .. }
            | Node::Call { range, .. }
            | Node::Constant { range, .. }
            | Node::ScopeResolution { range, .. }
            | Node::Identifier { range, .. }
            | Node::SelfRef { range }
            | Node::InstanceVariable { range, .. }
            | Node::ClassVariable { range, .. }
            | Node::GlobalVariable { range, .. }
            | Node::SymbolLiteral { range, .. }
            | Node::IntegerLiteral { range }
            | Node::FloatLiteral { range }
            | Node::StringLiteral { range, .. }
            | Node::ArrayLiteral { range, .. }
            | Node::HashLiteral { range, .. }
            | Node::RangeLiteral { range }
            | Node::RegexLiteral { range }
            | Node::TrueLiteral { range }
            | Node::FalseLiteral { range }
            | Node::NilLiteral { range }
            | Node::Unknown { range, .. } => *range,
        }
    }

    /// Child nodes in source order, for generic traversal.
    pub fn children(&self) -> Vec<Arc<Node>> {
        match self {
            Node::Program { body, .. } | Node::SingletonClass { body, .. } => body.clone(),
            Node::Class {
                name,
                superclass,
                body,
                ..
            } => {
                let mut out = vec![name.clone()];
                out.extend(superclass.iter().cloned());
                out.extend(body.iter().cloned());
                out
            }
            Node::Module { name, body, .. } => {
                let mut out = vec![name.clone()];
                out.extend(body.iter().cloned());
                out
            }
            Node::Method {
                parameters, body, ..
            } => {
                let mut out = parameters.clone();
                out.extend(body.iter().cloned());
                out
            }
            Node::SingletonMethod {
                receiver,
                parameters,
                body,
                ..
            } => {
                let mut out = vec![receiver.clone()];
                out.extend(parameters.iter().cloned());
                out.extend(body.iter().cloned());
                out
            }
            Node::Assignment { target, value, .. } => vec![target.clone(), value.clone()],
            Node::Call {
                receiver,
                arguments,
                ..
            } => {
                let mut out: Vec<Arc<Node>> = receiver.iter().cloned().collect();
                out.extend(arguments.iter().cloned());
                out
            }
            Node::ScopeResolution { scope, .. } => scope.iter().cloned().collect(),
            Node::ArrayLiteral { elements, .. } | Node::HashLiteral { elements, .. } => {
                elements.clone()
            }
            Node::Unknown { children, .. } => children.clone(),
            _ => Vec::new(),
        }
    }

    /// The class name a pure literal evaluates to, when this node is one.
    pub fn literal_type(&self) -> Option<&'static str> {
        match self {
            Node::IntegerLiteral { .. } => Some("Integer"),
            Node::FloatLiteral { .. } => Some("Float"),
            Node::StringLiteral { .. } => Some("String"),
            Node::ArrayLiteral { .. } => Some("Array"),
            Node::HashLiteral { .. } => Some("Hash"),
            Node::RangeLiteral { .. } => Some("Range"),
            Node::RegexLiteral { .. } => Some("Regexp"),
            Node::SymbolLiteral { .. } => Some("Symbol"),
            Node::TrueLiteral { .. } => Some("TrueClass"),
            Node::FalseLiteral { .. } => Some("FalseClass"),
            Node::NilLiteral { .. } => Some("NilClass"),
            _ => None,
        }
    }

    /// The `::`-joined written form of a constant path (`A::B`), when this
    /// node is a constant or scope-resolution chain.
    pub fn constant_path(&self) -> Option<String> {
        match self {
            Node::Constant { name, .. } => Some(name.clone()),
            Node::ScopeResolution { scope, name, .. } => match scope {
                Some(scope) => {
                    let prefix = scope.constant_path()?;
                    Some(format!("{}::{}", prefix, name))
                }
                None => Some(name.clone()),
            },
            _ => None,
        }
    }

    /// Flattens a receiver chain into the dot-separated signature form the
    /// inferrer consumes: `Foo.new.bar`, `@x.to_s`, `self.value`.
    /// Returns `None` for shapes that have no signature (literals, operators).
    pub fn chained_signature(&self) -> Option<String> {
        match self {
            Node::Identifier { name, .. }
            | Node::InstanceVariable { name, .. }
            | Node::ClassVariable { name, .. }
            | Node::GlobalVariable { name, .. } => Some(name.clone()),
            Node::SelfRef { .. } => Some("self".to_string()),
            Node::Constant { .. } | Node::ScopeResolution { .. } => self.constant_path(),
            Node::Call {
                receiver, method, ..
            } => match receiver {
                Some(receiver) => {
                    let prefix = receiver.chained_signature()?;
                    Some(format!("{}.{}", prefix, method))
                }
                None => Some(method.clone()),
            },
            _ => None,
        }
    }

    /// Stable identity for memoization keys: the address of the shared node.
    pub fn key(node: &Arc<Node>) -> usize {
        Arc::as_ptr(node) as usize
    }

    /// True if `other` is this node or a descendant of it.
    pub fn contains(self: &Arc<Node>, other: &Arc<Node>) -> bool {
        if Arc::ptr_eq(self, other) {
            return true;
        }
        self.children().iter().any(|c| c.contains(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Arc<Node> {
        Arc::new(Node::Identifier {
            name: name.to_string(),
            range: Range::default(),
        })
    }

    #[test]
    fn test_constant_path_nested() {
        let scope = Arc::new(Node::Constant {
            name: "A".to_string(),
            range: Range::default(),
        });
        let node = Node::ScopeResolution {
            scope: Some(scope),
            name: "B".to_string(),
            range: Range::default(),
        };
        assert_eq!(node.constant_path(), Some("A::B".to_string()));
    }

    #[test]
    fn test_chained_signature_flattens_calls() {
        let root = Arc::new(Node::Constant {
            name: "Foo".to_string(),
            range: Range::default(),
        });
        let new_call = Arc::new(Node::Call {
            receiver: Some(root),
            method: "new".to_string(),
            arguments: vec![],
            range: Range::default(),
        });
        let bar_call = Node::Call {
            receiver: Some(new_call),
            method: "bar".to_string(),
            arguments: vec![],
            range: Range::default(),
        };
        assert_eq!(bar_call.chained_signature(), Some("Foo.new.bar".to_string()));
    }

    #[test]
    fn test_chained_signature_rejects_literals() {
        let lit = Node::IntegerLiteral {
            range: Range::default(),
        };
        assert_eq!(lit.chained_signature(), None);
        assert_eq!(lit.literal_type(), Some("Integer"));
    }

    #[test]
    fn test_contains_descendant() {
        let inner = ident("x");
        let outer = Arc::new(Node::Assignment {
            target: inner.clone(),
            value: ident("y"),
            range: Range::default(),
        });
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
    }
}
