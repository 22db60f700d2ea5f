//! Declaration mapping
//!
//! Walks the owned IR of one parsed file and produces its pins and derived
//! maps: namespace openings, include/extend targets (kept unresolved),
//! superclass edges, required libraries, and docstring attachments.
//!
//! The walk tracks the enclosing namespace path, the active visibility mode
//! (`private`/`public`/`protected` statements switch it for subsequent
//! definitions), and whether the cursor is inside a `class << self` body or
//! a method body, which decides the scope of method and variable pins.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::node::Node;
use crate::parser::{Comment, ParsedFile};
use crate::pin::{
    AttributeAccess, NamespaceKind, Parameter, ParameterKind, Pin, PinDetails, Scope, Visibility,
};

/// Everything a Source derives from one parse.
#[derive(Debug, Default, Clone)]
pub(crate) struct Mapped {
    pub namespace_pins: Vec<Arc<Pin>>,
    pub method_pins: Vec<Arc<Pin>>,
    pub attribute_pins: Vec<Arc<Pin>>,
    pub instance_variable_pins: Vec<Arc<Pin>>,
    pub class_variable_pins: Vec<Arc<Pin>>,
    pub constant_pins: Vec<Arc<Pin>>,
    pub global_variable_pins: Vec<Arc<Pin>>,
    pub symbol_pins: Vec<Arc<Pin>>,
    pub namespace_nodes: FxHashMap<String, Vec<Arc<Node>>>,
    pub namespace_includes: FxHashMap<String, Vec<String>>,
    pub namespace_extends: FxHashMap<String, Vec<String>>,
    pub superclasses: FxHashMap<String, String>,
    pub required: Vec<String>,
    /// Method path to a `@return` template containing `$n` placeholders.
    pub path_macros: FxHashMap<String, String>,
    /// Node key to attached docstring.
    pub docstrings: FxHashMap<usize, String>,
}

pub(crate) fn map_parsed(filename: &str, parsed: &ParsedFile) -> Mapped {
    let mut mapper = Mapper {
        filename: filename.to_string(),
        comments: comment_rows(&parsed.comments),
        out: RawMapped::default(),
    };
    if let Node::Program { body, .. } = &*parsed.root {
        mapper.walk_body(body, &Ctx::top_level());
    }
    mapper.finish()
}

/// Pins are kept unshared during the walk so a trailing `private :name`
/// style call can still adjust visibility; `finish` freezes them.
#[derive(Debug, Default)]
struct RawMapped {
    namespace_pins: Vec<Pin>,
    method_pins: Vec<Pin>,
    attribute_pins: Vec<Pin>,
    instance_variable_pins: Vec<Pin>,
    class_variable_pins: Vec<Pin>,
    constant_pins: Vec<Pin>,
    global_variable_pins: Vec<Pin>,
    symbol_pins: Vec<Pin>,
    namespace_nodes: FxHashMap<String, Vec<Arc<Node>>>,
    namespace_includes: FxHashMap<String, Vec<String>>,
    namespace_extends: FxHashMap<String, Vec<String>>,
    superclasses: FxHashMap<String, String>,
    required: Vec<String>,
    path_macros: FxHashMap<String, String>,
    docstrings: FxHashMap<usize, String>,
}

#[derive(Debug, Clone)]
struct Ctx {
    namespace: String,
    visibility: Visibility,
    /// Scope new method definitions get (Class inside `class << self`).
    definition_scope: Scope,
    /// Scope of the enclosing method body, when inside one.
    method_scope: Option<Scope>,
}

impl Ctx {
    fn top_level() -> Self {
        Ctx {
            namespace: String::new(),
            visibility: Visibility::Public,
            definition_scope: Scope::Instance,
            method_scope: None,
        }
    }
}

fn comment_rows(comments: &[Comment]) -> FxHashMap<usize, String> {
    comments
        .iter()
        .map(|c| (c.row, c.text.clone()))
        .collect()
}

fn join_namespace(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}::{}", base, name)
    }
}

/// Splits a written constant path into (namespace suffix, local name), so
/// `class A::B` nests pin `B` under `A`.
fn split_constant_path(path: &str) -> (Option<&str>, &str) {
    match path.rfind("::") {
        Some(idx) => (Some(&path[..idx]), &path[idx + 2..]),
        None => (None, path),
    }
}

/// Extracts the bracketed type from a `@return [T]` or `@type [T]` tag.
fn tag_type(docstring: &str, tag: &str) -> Option<String> {
    for line in docstring.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix(tag) {
            let rest = rest.trim_start();
            if let Some(inner) = rest.strip_prefix('[') {
                if let Some(end) = inner.find(']') {
                    return Some(inner[..end].to_string());
                }
            }
        }
    }
    None
}

struct Mapper {
    filename: String,
    comments: FxHashMap<usize, String>,
    out: RawMapped,
}

impl Mapper {
    fn finish(self) -> Mapped {
        let freeze = |pins: Vec<Pin>| pins.into_iter().map(Arc::new).collect();
        let mut required = self.out.required;
        required.dedup();
        Mapped {
            namespace_pins: freeze(self.out.namespace_pins),
            method_pins: freeze(self.out.method_pins),
            attribute_pins: freeze(self.out.attribute_pins),
            instance_variable_pins: freeze(self.out.instance_variable_pins),
            class_variable_pins: freeze(self.out.class_variable_pins),
            constant_pins: freeze(self.out.constant_pins),
            global_variable_pins: freeze(self.out.global_variable_pins),
            symbol_pins: freeze(self.out.symbol_pins),
            namespace_nodes: self.out.namespace_nodes,
            namespace_includes: self.out.namespace_includes,
            namespace_extends: self.out.namespace_extends,
            superclasses: self.out.superclasses,
            required,
            path_macros: self.out.path_macros,
            docstrings: self.out.docstrings,
        }
    }

    /// The contiguous comment block ending on the line above `row`.
    fn docstring_above(&self, row: usize) -> Option<String> {
        let mut lines = Vec::new();
        let mut cursor = row;
        while cursor > 0 {
            match self.comments.get(&(cursor - 1)) {
                Some(text) => {
                    lines.push(text.clone());
                    cursor -= 1;
                }
                None => break,
            }
        }
        if lines.is_empty() {
            return None;
        }
        lines.reverse();
        Some(lines.join("\n"))
    }

    fn attach_docstring(&mut self, node: &Arc<Node>) -> Option<String> {
        let docstring = self.docstring_above(node.range().start.row)?;
        self.out.docstrings.insert(Node::key(node), docstring.clone());
        Some(docstring)
    }

    fn walk_body(&mut self, body: &[Arc<Node>], ctx: &Ctx) {
        let mut ctx = ctx.clone();
        for node in body {
            match &**node {
                // a bare `private` / `public` / `protected` statement
                Node::Identifier { name, .. } => {
                    if let Some(vis) = visibility_for(name) {
                        ctx.visibility = vis;
                    }
                }
                _ => self.walk(node, &mut ctx),
            }
        }
    }

    fn walk(&mut self, node: &Arc<Node>, ctx: &mut Ctx) {
        match &**node {
            Node::Class {
                name,
                superclass,
                body,
                ..
            } => {
                self.map_namespace(node, name, NamespaceKind::Class, superclass.as_deref(), body, ctx)
            }
            Node::Module { name, body, .. } => {
                self.map_namespace(node, name, NamespaceKind::Module, None, body, ctx)
            }
            Node::SingletonClass { body, .. } => {
                let inner = Ctx {
                    definition_scope: Scope::Class,
                    visibility: Visibility::Public,
                    ..ctx.clone()
                };
                self.walk_body(body, &inner);
            }
            Node::Method { .. } => self.map_method(node, ctx.definition_scope, ctx),
            Node::SingletonMethod { receiver, .. } => {
                // `def self.x` defines on the class side of the current
                // namespace; `def Foo.x` on the named constant's class side
                let namespace = match &**receiver {
                    Node::Constant { .. } | Node::ScopeResolution { .. } => receiver
                        .constant_path()
                        .map(|p| join_namespace(&ctx.namespace, &p))
                        .unwrap_or_else(|| ctx.namespace.clone()),
                    _ => ctx.namespace.clone(),
                };
                let mut inner = Ctx {
                    namespace,
                    ..ctx.clone()
                };
                self.map_method(node, Scope::Class, &mut inner);
            }
            Node::Assignment { target, value, .. } => {
                self.map_assignment(node, target, value, ctx);
                self.walk(value, ctx);
            }
            Node::Call {
                receiver,
                method,
                arguments,
                ..
            } => self.map_call(node, receiver.as_deref(), method, arguments, ctx),
            Node::SymbolLiteral { name, range } => {
                self.out.symbol_pins.push(Pin {
                    filename: self.filename.clone(),
                    namespace: ctx.namespace.clone(),
                    name: format!(":{}", name),
                    scope: Scope::Instance,
                    visibility: Visibility::Public,
                    return_type: Some("Symbol".to_string()),
                    parameters: Vec::new(),
                    docstring: None,
                    location: *range,
                    node: node.clone(),
                    details: PinDetails::Symbol,
                });
            }
            _ => {
                for child in node.children() {
                    self.walk(&child, ctx);
                }
            }
        }
    }

    fn map_namespace(
        &mut self,
        node: &Arc<Node>,
        name: &Arc<Node>,
        kind: NamespaceKind,
        superclass: Option<&Node>,
        body: &[Arc<Node>],
        ctx: &Ctx,
    ) {
        let Some(written) = name.constant_path() else {
            return;
        };
        let (prefix, local) = split_constant_path(&written);
        let pin_namespace = match prefix {
            Some(prefix) => join_namespace(&ctx.namespace, prefix),
            None => ctx.namespace.clone(),
        };
        let fqn = join_namespace(&pin_namespace, local);

        let docstring = self.attach_docstring(node);
        self.out.namespace_pins.push(Pin {
            filename: self.filename.clone(),
            namespace: pin_namespace,
            name: local.to_string(),
            scope: Scope::Class,
            visibility: Visibility::Public,
            return_type: None,
            parameters: Vec::new(),
            docstring,
            location: node.range(),
            node: node.clone(),
            details: PinDetails::Namespace { kind },
        });
        self.out
            .namespace_nodes
            .entry(fqn.clone())
            .or_default()
            .push(node.clone());

        if let Some(sup) = superclass {
            if let Some(path) = sup.constant_path() {
                self.out.superclasses.insert(fqn.clone(), path);
            }
        }

        let inner = Ctx {
            namespace: fqn,
            visibility: Visibility::Public,
            definition_scope: Scope::Instance,
            method_scope: None,
        };
        self.walk_body(body, &inner);
    }

    fn map_method(&mut self, node: &Arc<Node>, scope: Scope, ctx: &mut Ctx) {
        let (name, parameters, body) = match &**node {
            Node::Method {
                name,
                parameters,
                body,
                ..
            }
            | Node::SingletonMethod {
                name,
                parameters,
                body,
                ..
            } => (name.clone(), parameters, body),
            _ => return,
        };

        let docstring = self.attach_docstring(node);
        let declared = docstring.as_deref().and_then(|d| tag_type(d, "@return"));
        let pin = Pin {
            filename: self.filename.clone(),
            namespace: ctx.namespace.clone(),
            name,
            scope,
            visibility: ctx.visibility,
            return_type: declared.as_ref().filter(|t| !t.contains('$')).cloned(),
            parameters: parameters.iter().filter_map(convert_parameter).collect(),
            docstring,
            location: node.range(),
            node: node.clone(),
            details: PinDetails::Method,
        };
        if let Some(template) = declared.filter(|t| t.contains('$')) {
            self.out.path_macros.insert(pin.path(), template);
        }
        self.out.method_pins.push(pin);

        let mut inner = Ctx {
            method_scope: Some(scope),
            ..ctx.clone()
        };
        for child in body {
            self.walk(child, &mut inner);
        }
    }

    fn map_assignment(&mut self, node: &Arc<Node>, target: &Arc<Node>, value: &Arc<Node>, ctx: &Ctx) {
        let docstring = self.docstring_above(node.range().start.row);
        let tagged = docstring.as_deref().and_then(|d| tag_type(d, "@type"));
        let inferred = tagged.or_else(|| value.literal_type().map(str::to_string));

        match &**target {
            Node::Constant { .. } | Node::ScopeResolution { .. } => {
                let Some(written) = target.constant_path() else {
                    return;
                };
                let (prefix, local) = split_constant_path(&written);
                let namespace = match prefix {
                    Some(prefix) => join_namespace(&ctx.namespace, prefix),
                    None => ctx.namespace.clone(),
                };
                self.out.constant_pins.push(Pin {
                    filename: self.filename.clone(),
                    namespace,
                    name: local.to_string(),
                    scope: Scope::Class,
                    visibility: ctx.visibility,
                    return_type: inferred,
                    parameters: Vec::new(),
                    docstring,
                    location: node.range(),
                    node: node.clone(),
                    details: PinDetails::Constant,
                });
            }
            Node::InstanceVariable { name, .. } => {
                // class-level `@x = 1` belongs to the class side
                let scope = match ctx.method_scope {
                    Some(Scope::Instance) => Scope::Instance,
                    _ => Scope::Class,
                };
                self.out.instance_variable_pins.push(Pin {
                    filename: self.filename.clone(),
                    namespace: ctx.namespace.clone(),
                    name: name.clone(),
                    scope,
                    visibility: Visibility::Public,
                    return_type: inferred,
                    parameters: Vec::new(),
                    docstring,
                    location: node.range(),
                    node: node.clone(),
                    details: PinDetails::InstanceVariable,
                });
            }
            Node::ClassVariable { name, .. } => {
                self.out.class_variable_pins.push(Pin {
                    filename: self.filename.clone(),
                    namespace: ctx.namespace.clone(),
                    name: name.clone(),
                    scope: Scope::Class,
                    visibility: Visibility::Public,
                    return_type: inferred,
                    parameters: Vec::new(),
                    docstring,
                    location: node.range(),
                    node: node.clone(),
                    details: PinDetails::ClassVariable,
                });
            }
            Node::GlobalVariable { name, .. } => {
                self.out.global_variable_pins.push(Pin {
                    filename: self.filename.clone(),
                    namespace: String::new(),
                    name: name.clone(),
                    scope: Scope::Class,
                    visibility: Visibility::Public,
                    return_type: inferred,
                    parameters: Vec::new(),
                    docstring,
                    location: node.range(),
                    node: node.clone(),
                    details: PinDetails::GlobalVariable,
                });
            }
            _ => {}
        }
    }

    fn map_call(
        &mut self,
        node: &Arc<Node>,
        receiver: Option<&Node>,
        method: &str,
        arguments: &[Arc<Node>],
        ctx: &mut Ctx,
    ) {
        if receiver.is_none() {
            match method {
                "include" | "extend" => {
                    let table = if method == "include" {
                        &mut self.out.namespace_includes
                    } else {
                        &mut self.out.namespace_extends
                    };
                    let entry = table.entry(ctx.namespace.clone()).or_default();
                    for arg in arguments {
                        if let Some(path) = arg.constant_path() {
                            entry.push(path);
                        }
                    }
                    return;
                }
                "require" => {
                    if let Some(Node::StringLiteral { value, .. }) =
                        arguments.first().map(|a| &**a)
                    {
                        self.out.required.push(value.clone());
                    }
                    return;
                }
                "attr_reader" | "attr_writer" | "attr_accessor" => {
                    self.map_attributes(node, method, arguments, ctx);
                    return;
                }
                "private" | "public" | "protected" => {
                    let vis = visibility_for(method).unwrap_or(Visibility::Public);
                    for arg in arguments {
                        match &**arg {
                            // `private def foo ... end`
                            Node::Method { .. } => {
                                let saved = ctx.visibility;
                                ctx.visibility = vis;
                                self.map_method(arg, ctx.definition_scope, ctx);
                                ctx.visibility = saved;
                            }
                            // `private :foo`
                            Node::SymbolLiteral { name, .. } => {
                                let namespace = ctx.namespace.clone();
                                for pin in self.out.method_pins.iter_mut() {
                                    if pin.namespace == namespace && pin.name == *name {
                                        pin.visibility = vis;
                                    }
                                }
                            }
                            _ => {}
                        }
                    }
                    return;
                }
                _ => {}
            }
        }
        for child in node.children() {
            self.walk(&child, ctx);
        }
    }

    fn map_attributes(&mut self, node: &Arc<Node>, method: &str, arguments: &[Arc<Node>], ctx: &Ctx) {
        let docstring = self.docstring_above(node.range().start.row);
        let declared = docstring.as_deref().and_then(|d| tag_type(d, "@return"));
        for arg in arguments {
            let Node::SymbolLiteral { name, range } = &**arg else {
                continue;
            };
            if method == "attr_reader" || method == "attr_accessor" {
                self.out.attribute_pins.push(Pin {
                    filename: self.filename.clone(),
                    namespace: ctx.namespace.clone(),
                    name: name.clone(),
                    scope: ctx.definition_scope,
                    visibility: ctx.visibility,
                    return_type: declared.clone(),
                    parameters: Vec::new(),
                    docstring: docstring.clone(),
                    location: *range,
                    node: node.clone(),
                    details: PinDetails::Attribute {
                        access: AttributeAccess::Reader,
                    },
                });
            }
            if method == "attr_writer" || method == "attr_accessor" {
                self.out.attribute_pins.push(Pin {
                    filename: self.filename.clone(),
                    namespace: ctx.namespace.clone(),
                    name: format!("{}=", name),
                    scope: ctx.definition_scope,
                    visibility: ctx.visibility,
                    return_type: declared.clone(),
                    parameters: vec![Parameter {
                        name: "value".to_string(),
                        kind: ParameterKind::Required,
                    }],
                    docstring: docstring.clone(),
                    location: *range,
                    node: node.clone(),
                    details: PinDetails::Attribute {
                        access: AttributeAccess::Writer,
                    },
                });
            }
        }
    }
}

fn visibility_for(name: &str) -> Option<Visibility> {
    match name {
        "public" => Some(Visibility::Public),
        "protected" => Some(Visibility::Protected),
        "private" => Some(Visibility::Private),
        _ => None,
    }
}

fn convert_parameter(node: &Arc<Node>) -> Option<Parameter> {
    let (name, kind) = match &**node {
        Node::RequiredParameter { name, .. } => (name, ParameterKind::Required),
        Node::OptionalParameter { name, .. } => (name, ParameterKind::Optional),
        Node::RestParameter { name, .. } => (name, ParameterKind::Rest),
        Node::KeywordParameter { name, .. } => (name, ParameterKind::Keyword),
        Node::BlockParameter { name, .. } => (name, ParameterKind::Block),
        _ => return None,
    };
    Some(Parameter {
        name: name.clone(),
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_to_ir;

    fn map(code: &str) -> Mapped {
        let parsed = parse_to_ir(code).expect("parse failed");
        map_parsed("test.rb", &parsed)
    }

    #[test]
    fn test_nested_namespace_pins() {
        let mapped = map("module A\n  class B\n  end\nend\n");
        assert_eq!(mapped.namespace_pins.len(), 2);
        let b = &mapped.namespace_pins[1];
        assert_eq!(b.namespace, "A");
        assert_eq!(b.name, "B");
        assert!(mapped.namespace_nodes.contains_key("A::B"));
    }

    #[test]
    fn test_compact_namespace_nesting() {
        let mapped = map("class A::B\nend\n");
        let pin = &mapped.namespace_pins[0];
        assert_eq!(pin.namespace, "A");
        assert_eq!(pin.name, "B");
        assert!(mapped.namespace_nodes.contains_key("A::B"));
    }

    #[test]
    fn test_visibility_mode_switch() {
        let mapped = map("class C\n  def a; end\n  private\n  def b; end\nend\n");
        let a = mapped.method_pins.iter().find(|p| p.name == "a").unwrap();
        let b = mapped.method_pins.iter().find(|p| p.name == "b").unwrap();
        assert_eq!(a.visibility, Visibility::Public);
        assert_eq!(b.visibility, Visibility::Private);
    }

    #[test]
    fn test_private_symbol_argument() {
        let mapped = map("class C\n  def a; end\n  private :a\nend\n");
        let a = mapped.method_pins.iter().find(|p| p.name == "a").unwrap();
        assert_eq!(a.visibility, Visibility::Private);
    }

    #[test]
    fn test_singleton_method_scope() {
        let mapped = map("class C\n  def self.build; end\nend\n");
        let pin = mapped.method_pins.iter().find(|p| p.name == "build").unwrap();
        assert_eq!(pin.scope, Scope::Class);
        assert_eq!(pin.namespace, "C");
    }

    #[test]
    fn test_singleton_class_scope() {
        let mapped = map("class C\n  class << self\n    def build; end\n  end\nend\n");
        let pin = mapped.method_pins.iter().find(|p| p.name == "build").unwrap();
        assert_eq!(pin.scope, Scope::Class);
    }

    #[test]
    fn test_includes_and_extends_unresolved() {
        let mapped = map("class C\n  include M\n  extend H\nend\n");
        assert_eq!(mapped.namespace_includes["C"], vec!["M".to_string()]);
        assert_eq!(mapped.namespace_extends["C"], vec!["H".to_string()]);
    }

    #[test]
    fn test_superclass_recorded_as_written() {
        let mapped = map("class D < Base::C\nend\n");
        assert_eq!(mapped.superclasses["D"], "Base::C");
    }

    #[test]
    fn test_requires_collected() {
        let mapped = map("require 'json'\nrequire 'set'\n");
        assert_eq!(mapped.required, vec!["json".to_string(), "set".to_string()]);
    }

    #[test]
    fn test_attr_accessor_pins() {
        let mapped = map("class C\n  attr_accessor :name\nend\n");
        let names: Vec<&str> = mapped.attribute_pins.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["name", "name="]);
    }

    #[test]
    fn test_ivar_scope_follows_method_scope() {
        let mapped = map(
            "class C\n  @class_side = 1\n  def set\n    @inst = 2\n  end\n  def self.mark\n    @also_class = 3\n  end\nend\n",
        );
        let scope_of = |name: &str| {
            mapped
                .instance_variable_pins
                .iter()
                .find(|p| p.name == name)
                .map(|p| p.scope)
                .unwrap()
        };
        assert_eq!(scope_of("@class_side"), Scope::Class);
        assert_eq!(scope_of("@inst"), Scope::Instance);
        assert_eq!(scope_of("@also_class"), Scope::Class);
    }

    #[test]
    fn test_docstring_and_return_tag() {
        let mapped = map("class C\n  # Adds one.\n  # @return [Integer]\n  def bump; end\nend\n");
        let pin = mapped.method_pins.iter().find(|p| p.name == "bump").unwrap();
        assert_eq!(pin.return_type.as_deref(), Some("Integer"));
        assert!(pin.docstring.as_deref().unwrap().contains("Adds one."));
    }

    #[test]
    fn test_macro_return_template() {
        let mapped = map("class C\n  # @return [$1]\n  def cast(type); end\nend\n");
        let pin = mapped.method_pins.iter().find(|p| p.name == "cast").unwrap();
        assert!(pin.return_type.is_none());
        assert_eq!(mapped.path_macros.get("C#cast").map(String::as_str), Some("$1"));
    }

    #[test]
    fn test_constant_with_literal_type() {
        let mapped = map("class C\n  LIMIT = 10\nend\n");
        let pin = mapped.constant_pins.iter().find(|p| p.name == "LIMIT").unwrap();
        assert_eq!(pin.return_type.as_deref(), Some("Integer"));
        assert_eq!(pin.namespace, "C");
    }
}
