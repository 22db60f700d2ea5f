//! CST to IR conversion
//!
//! Walks a Tree-Sitter tree and produces the owned `Node` IR. Only the
//! shapes the symbol mapper and inferrer care about get dedicated variants;
//! everything else becomes `Unknown` with converted children so declarations
//! nested under control flow are still reached. Comments are diverted into a
//! side list for docstring attachment.

use std::sync::Arc;

use tree_sitter::{Node as TsNode, Tree};

use super::Comment;
use crate::node::{Node, Position, Range};

pub(super) fn convert_tree(tree: &Tree, code: &str) -> (Arc<Node>, Vec<Comment>, bool) {
    let mut converter = Converter {
        code,
        comments: Vec::new(),
    };
    let root = tree.root_node();
    let body = converter.convert_children(root);
    let program = Arc::new(Node::Program {
        body,
        range: range_of(root),
    });
    let has_errors = root.has_error();
    (program, converter.comments, has_errors)
}

fn position_of(node: TsNode, end: bool) -> Position {
    let point = if end {
        node.end_position()
    } else {
        node.start_position()
    };
    Position {
        row: point.row,
        column: point.column,
        byte: if end { node.end_byte() } else { node.start_byte() },
    }
}

fn range_of(node: TsNode) -> Range {
    Range {
        start: position_of(node, false),
        end: position_of(node, true),
    }
}

struct Converter<'a> {
    code: &'a str,
    comments: Vec<Comment>,
}

impl<'a> Converter<'a> {
    fn text(&self, node: TsNode) -> String {
        node.utf8_text(self.code.as_bytes())
            .unwrap_or_default()
            .to_string()
    }

    /// Converts the named children of `node`, flattening `body_statement`
    /// wrappers and dropping comments into the side list.
    fn convert_children(&mut self, node: TsNode) -> Vec<Arc<Node>> {
        let mut out = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "body_statement" {
                out.extend(self.convert_children(child));
            } else if let Some(converted) = self.convert(child) {
                out.push(converted);
            }
        }
        out
    }

    /// Like `convert_children` but skips children bound to structural
    /// fields (name, superclass, parameters, receiver).
    fn convert_body(&mut self, node: TsNode, skip: &[TsNode]) -> Vec<Arc<Node>> {
        let mut out = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if skip.iter().any(|s| s.id() == child.id()) {
                continue;
            }
            if child.kind() == "body_statement" {
                out.extend(self.convert_children(child));
            } else if let Some(converted) = self.convert(child) {
                out.push(converted);
            }
        }
        out
    }

    fn convert_parameters(&mut self, method: TsNode) -> Vec<Arc<Node>> {
        let Some(params) = method.child_by_field_name("parameters") else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut cursor = params.walk();
        for child in params.named_children(&mut cursor) {
            out.push(self.convert_parameter(child));
        }
        out
    }

    fn convert_parameter(&mut self, node: TsNode) -> Arc<Node> {
        let range = range_of(node);
        let named = |this: &Self| {
            node.child_by_field_name("name")
                .map(|n| this.text(n))
                .unwrap_or_else(|| this.text(node))
        };
        let converted = match node.kind() {
            "identifier" => Node::RequiredParameter {
                name: self.text(node),
                range,
            },
            "optional_parameter" => Node::OptionalParameter {
                name: named(self),
                range,
            },
            "splat_parameter" | "hash_splat_parameter" => Node::RestParameter {
                name: named(self),
                range,
            },
            "keyword_parameter" => Node::KeywordParameter {
                name: named(self),
                range,
            },
            "block_parameter" => Node::BlockParameter {
                name: named(self),
                range,
            },
            _ => Node::RequiredParameter {
                name: self.text(node),
                range,
            },
        };
        Arc::new(converted)
    }

    fn convert(&mut self, node: TsNode) -> Option<Arc<Node>> {
        let range = range_of(node);
        let converted = match node.kind() {
            "comment" => {
                let raw = self.text(node);
                let text = raw
                    .trim_start_matches('#')
                    .strip_prefix(' ')
                    .map(str::to_string)
                    .unwrap_or_else(|| raw.trim_start_matches('#').to_string());
                self.comments.push(Comment {
                    row: node.start_position().row,
                    text,
                });
                return None;
            }
            "class" => {
                let name_node = node.child_by_field_name("name")?;
                // the superclass node wraps the `<` token and the expression
                let superclass_node = node.child_by_field_name("superclass");
                let superclass_expr = if let Some(s) = superclass_node.as_ref() {
                    let mut cursor = s.walk();
                    let mut iter = s.named_children(&mut cursor);
                    let first = iter.next();
                    drop(iter);
                    first
                } else {
                    None
                };
                let superclass = superclass_expr.and_then(|expr| self.convert(expr));
                let name = self.convert(name_node)?;
                let mut skip = vec![name_node];
                if let Some(s) = node.child_by_field_name("superclass") {
                    skip.push(s);
                }
                Node::Class {
                    name,
                    superclass,
                    body: self.convert_body(node, &skip),
                    range,
                }
            }
            "singleton_class" => {
                let skip: Vec<TsNode> = node.child_by_field_name("value").into_iter().collect();
                Node::SingletonClass {
                    body: self.convert_body(node, &skip),
                    range,
                }
            }
            "module" => {
                let name_node = node.child_by_field_name("name")?;
                let name = self.convert(name_node)?;
                Node::Module {
                    name,
                    body: self.convert_body(node, &[name_node]),
                    range,
                }
            }
            "method" => {
                let name_node = node.child_by_field_name("name")?;
                let parameters = self.convert_parameters(node);
                let mut skip = vec![name_node];
                if let Some(p) = node.child_by_field_name("parameters") {
                    skip.push(p);
                }
                Node::Method {
                    name: self.text(name_node),
                    parameters,
                    body: self.convert_body(node, &skip),
                    range,
                }
            }
            "singleton_method" => {
                let name_node = node.child_by_field_name("name")?;
                let object_node = node.child_by_field_name("object")?;
                let receiver = self
                    .convert(object_node)
                    .unwrap_or_else(|| Arc::new(Node::SelfRef { range }));
                let parameters = self.convert_parameters(node);
                let mut skip = vec![name_node, object_node];
                if let Some(p) = node.child_by_field_name("parameters") {
                    skip.push(p);
                }
                Node::SingletonMethod {
                    receiver,
                    name: self.text(name_node),
                    parameters,
                    body: self.convert_body(node, &skip),
                    range,
                }
            }
            "assignment" | "operator_assignment" => {
                let target = self.convert(node.child_by_field_name("left")?)?;
                let value = self.convert(node.child_by_field_name("right")?)?;
                Node::Assignment {
                    target,
                    value,
                    range,
                }
            }
            "call" => {
                let receiver = node
                    .child_by_field_name("receiver")
                    .and_then(|r| self.convert(r));
                let method = node
                    .child_by_field_name("method")
                    .map(|m| self.text(m))
                    .unwrap_or_default();
                let arguments = match node.child_by_field_name("arguments") {
                    Some(args) => {
                        let mut cursor = args.walk();
                        args.named_children(&mut cursor)
                            .filter_map(|a| self.convert(a))
                            .collect()
                    }
                    None => Vec::new(),
                };
                Node::Call {
                    receiver,
                    method,
                    arguments,
                    range,
                }
            }
            "identifier" => Node::Identifier {
                name: self.text(node),
                range,
            },
            "constant" => Node::Constant {
                name: self.text(node),
                range,
            },
            "scope_resolution" => {
                let scope = node
                    .child_by_field_name("scope")
                    .and_then(|s| self.convert(s));
                let name = node
                    .child_by_field_name("name")
                    .map(|n| self.text(n))
                    .unwrap_or_default();
                Node::ScopeResolution { scope, name, range }
            }
            "self" => Node::SelfRef { range },
            "instance_variable" => Node::InstanceVariable {
                name: self.text(node),
                range,
            },
            "class_variable" => Node::ClassVariable {
                name: self.text(node),
                range,
            },
            "global_variable" => Node::GlobalVariable {
                name: self.text(node),
                range,
            },
            "simple_symbol" | "hash_key_symbol" => Node::SymbolLiteral {
                name: self.text(node).trim_start_matches(':').to_string(),
                range,
            },
            "string" => {
                let raw = self.text(node);
                let value = raw
                    .trim_start_matches(['"', '\''])
                    .trim_end_matches(['"', '\''])
                    .to_string();
                Node::StringLiteral { value, range }
            }
            "integer" => Node::IntegerLiteral { range },
            "float" => Node::FloatLiteral { range },
            "array" => Node::ArrayLiteral {
                elements: self.convert_children(node),
                range,
            },
            "hash" => Node::HashLiteral {
                elements: self.convert_children(node),
                range,
            },
            "range" => Node::RangeLiteral { range },
            "regex" => Node::RegexLiteral { range },
            "true" => Node::TrueLiteral { range },
            "false" => Node::FalseLiteral { range },
            "nil" => Node::NilLiteral { range },
            _ => Node::Unknown {
                children: self.convert_children(node),
                range,
            },
        };
        Some(Arc::new(converted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_to_ir;

    fn first_child(code: &str) -> Arc<Node> {
        let parsed = parse_to_ir(code).unwrap();
        match &*parsed.root {
            Node::Program { body, .. } => body.first().cloned().expect("empty program"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_class_with_superclass() {
        let node = first_child("class Foo < Bar\nend\n");
        match &*node {
            Node::Class {
                name, superclass, ..
            } => {
                assert_eq!(name.constant_path(), Some("Foo".to_string()));
                let sup = superclass.as_ref().expect("missing superclass");
                assert_eq!(sup.constant_path(), Some("Bar".to_string()));
            }
            other => panic!("expected Class, got {:?}", other),
        }
    }

    #[test]
    fn test_method_parameters() {
        let node = first_child("def foo(a, b = 1, *rest, c:, &blk)\nend\n");
        match &*node {
            Node::Method {
                name, parameters, ..
            } => {
                assert_eq!(name, "foo");
                assert_eq!(parameters.len(), 5);
            }
            other => panic!("expected Method, got {:?}", other),
        }
    }

    #[test]
    fn test_bare_call_has_no_receiver() {
        let node = first_child("include Comparable\n");
        match &*node {
            Node::Call {
                receiver,
                method,
                arguments,
                ..
            } => {
                assert!(receiver.is_none());
                assert_eq!(method, "include");
                assert_eq!(arguments.len(), 1);
            }
            other => panic!("expected Call, got {:?}", other),
        }
    }

    #[test]
    fn test_singleton_method_receiver() {
        let node = first_child("def self.build\nend\n");
        match &*node {
            Node::SingletonMethod { receiver, name, .. } => {
                assert_eq!(name, "build");
                assert!(matches!(&**receiver, Node::SelfRef { .. }));
            }
            other => panic!("expected SingletonMethod, got {:?}", other),
        }
    }

    #[test]
    fn test_operator_assignment_maps_to_assignment() {
        let node = first_child("@x ||= []\n");
        match &*node {
            Node::Assignment { target, value, .. } => {
                assert!(matches!(&**target, Node::InstanceVariable { .. }));
                assert!(matches!(&**value, Node::ArrayLiteral { .. }));
            }
            other => panic!("expected Assignment, got {:?}", other),
        }
    }
}
