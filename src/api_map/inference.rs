//! Signature type inference
//!
//! Converts a dot-separated chain (`Foo.new.bar`, `@x.to_s`) into a type
//! string in the mini-grammar `"" | FQN | Class<FQN> | Module<FQN> |
//! FQN<Element, ...>`. Inference is best-effort: unresolved steps produce
//! `None`, never errors, and results (including misses) are memoized until
//! the next index rebuild.

use std::sync::Arc;

use tracing::trace;

use crate::node::Node;
use crate::pin::{NamespaceKind, Scope, Visibility};

use super::ApiMap;

/// Pseudo-suffix denoting "the class side of X" in a namespace string.
const CLASS_SUFFIX: &str = "#class";

/// Methods that return their receiver unchanged.
const SELF_RETURNING: [&str; 5] = ["clone", "dup", "freeze", "itself", "tap"];

/// Methods that return an element of their receiver's container subtype.
const SUBTYPE_RETURNING: [&str; 7] = ["first", "last", "min", "max", "pop", "shift", "sample"];

/// `Class<X>` or `Module<X>` to `X`.
fn class_inner(type_string: &str) -> Option<&str> {
    type_string
        .strip_prefix("Class<")
        .or_else(|| type_string.strip_prefix("Module<"))
        .and_then(|rest| rest.strip_suffix('>'))
}

/// `Array<String>` to `Array`; plain names pass through.
fn container_base(type_string: &str) -> &str {
    match type_string.find('<') {
        Some(idx) => &type_string[..idx],
        None => type_string,
    }
}

/// First element type of a container string: `Hash<Symbol, String>` to
/// `Symbol`.
fn container_subtype(type_string: &str) -> Option<String> {
    let start = type_string.find('<')?;
    let inner = type_string[start + 1..].strip_suffix('>')?;
    let first = inner.split(',').next()?.trim();
    if first.is_empty() {
        None
    } else {
        Some(first.to_string())
    }
}

/// Types of literal atoms that survive signature normalization.
fn literal_head_type(head: &str) -> Option<&'static str> {
    let mut chars = head.chars();
    let first = chars.next()?;
    match first {
        '"' | '\'' => return Some("String"),
        ':' => return Some("Symbol"),
        '[' => return Some("Array"),
        '{' => return Some("Hash"),
        '/' => return Some("Regexp"),
        _ => {}
    }
    match head {
        "true" => return Some("TrueClass"),
        "false" => return Some("FalseClass"),
        "nil" => return Some("NilClass"),
        _ => {}
    }
    if head.chars().all(|c| c.is_ascii_digit()) {
        return Some("Integer");
    }
    if head.chars().all(|c| c.is_ascii_digit() || c == '.')
        && head.chars().filter(|c| *c == '.').count() == 1
    {
        return Some("Float");
    }
    None
}

/// Plain source representation of a call argument, for macro substitution.
fn argument_text(node: &Node) -> Option<String> {
    match node {
        Node::Constant { .. } | Node::ScopeResolution { .. } => node.constant_path(),
        Node::Identifier { name, .. } => Some(name.clone()),
        Node::StringLiteral { value, .. } => Some(value.clone()),
        Node::SymbolLiteral { name, .. } => Some(name.clone()),
        _ => None,
    }
}

impl ApiMap {
    /// Infers the type of a dotted signature chain evaluated in
    /// `namespace` at `scope`. `call_node` carries the argument list of the
    /// originating call, when the caller has one, for macro substitution.
    pub fn infer_signature_type(
        &mut self,
        signature: &str,
        namespace: &str,
        scope: Scope,
        call_node: Option<&Arc<Node>>,
    ) -> Option<String> {
        self.refresh(false);

        // "the class side of X": strip the suffix and flip scope
        if let Some(stripped) = namespace.strip_suffix(CLASS_SUFFIX) {
            let stripped = stripped.to_string();
            return self.infer_signature_type(signature, &stripped, Scope::Class, call_node);
        }

        if signature.is_empty() {
            return match scope {
                Scope::Instance => Some(namespace.to_string()),
                Scope::Class => None,
            };
        }

        if let Some(cached) = self.cache.get_signature_type(signature, namespace, scope) {
            trace!("signature cache hit for {:?} in {:?}", signature, namespace);
            return cached.clone();
        }

        let result = self.compute_signature_type(signature, namespace, scope, call_node);
        self.cache
            .set_signature_type(signature, namespace, scope, result.clone());
        result
    }

    fn compute_signature_type(
        &mut self,
        signature: &str,
        namespace: &str,
        scope: Scope,
        call_node: Option<&Arc<Node>>,
    ) -> Option<String> {
        let (head, tail) = match signature.find('.') {
            Some(idx) => (&signature[..idx], &signature[idx + 1..]),
            None => (signature, ""),
        };
        let parts: Vec<&str> = if tail.is_empty() {
            Vec::new()
        } else {
            tail.split('.').collect()
        };

        if head == "self" {
            return self.infer_signature_type(tail, namespace, scope, call_node);
        }

        if head.starts_with("@@") {
            let base = self.infer_class_variable(head, namespace)?;
            return self.walk_signature(&parts, base, Scope::Instance, call_node, namespace);
        }

        if head.starts_with('@') {
            let base = self.infer_instance_variable(head, namespace, scope)?;
            return self.walk_signature(&parts, base, Scope::Instance, call_node, namespace);
        }

        if let Some(literal) = literal_head_type(head) {
            return self.walk_signature(
                &parts,
                literal.to_string(),
                Scope::Instance,
                call_node,
                namespace,
            );
        }

        // a resolvable namespace makes the initial type its class side
        let mut visited = rustc_hash::FxHashSet::default();
        if let Some(fqns) = self.resolve_namespace(head, namespace, &mut visited) {
            if !fqns.is_empty() {
                let wrapped = match self.namespace_kind(&fqns) {
                    Some(NamespaceKind::Module) => format!("Module<{}>", fqns),
                    _ => format!("Class<{}>", fqns),
                };
                return self.walk_signature(&parts, wrapped, Scope::Class, call_node, namespace);
            }
        }

        // otherwise the head is a method call in the current context
        let base = self.method_return_type(namespace, scope, head, namespace, call_node)?;
        self.walk_signature(&parts, base, Scope::Instance, call_node, namespace)
    }

    /// Walks the remaining segments of a chain from a starting type.
    fn walk_signature(
        &mut self,
        parts: &[&str],
        start_type: String,
        start_scope: Scope,
        call_node: Option<&Arc<Node>>,
        namespace: &str,
    ) -> Option<String> {
        let mut current = start_type;
        let mut scope = start_scope;
        if let Some(inner) = class_inner(&current) {
            current = inner.to_string();
            scope = Scope::Class;
        }

        for (index, part) in parts.iter().copied().enumerate() {
            if part == "self" && index == 0 {
                continue;
            }
            if part == "new" && scope == Scope::Class {
                scope = Scope::Instance;
                continue;
            }
            current = self.method_return_type(&current, scope, part, namespace, call_node)?;
            scope = Scope::Instance;
            if let Some(inner) = class_inner(&current) {
                current = inner.to_string();
                scope = Scope::Class;
            }
        }

        if current.is_empty() {
            return None;
        }
        if scope == Scope::Class {
            let wrapped = match self.namespace_kind(&current) {
                Some(NamespaceKind::Module) => format!("Module<{}>", current),
                _ => format!("Class<{}>", current),
            };
            return Some(wrapped);
        }
        Some(current)
    }

    /// Return type of one resolved call: macro mapping first (when the call
    /// has arguments), then the self-returning and subtype-returning
    /// intrinsics, then the method's declared return type.
    fn method_return_type(
        &mut self,
        current_type: &str,
        scope: Scope,
        method: &str,
        namespace: &str,
        call_node: Option<&Arc<Node>>,
    ) -> Option<String> {
        let base = container_base(current_type).to_string();
        let mut visited = rustc_hash::FxHashSet::default();
        let fqns = self
            .resolve_namespace(&base, "", &mut visited)
            .unwrap_or(base);

        let separator = match scope {
            Scope::Class => ".",
            Scope::Instance => "#",
        };
        let path = format!("{}{}{}", fqns, separator, method);
        if let Some(macro_type) = self.macro_return_type(&path, call_node) {
            return Some(macro_type);
        }

        if SELF_RETURNING.contains(&method) {
            return Some(current_type.to_string());
        }
        if SUBTYPE_RETURNING.contains(&method) {
            if let Some(subtype) = container_subtype(current_type) {
                return Some(subtype);
            }
        }

        // private members are visible when inferring inside the namespace
        let visibility: &[Visibility] = if fqns == namespace {
            &[Visibility::Public, Visibility::Protected, Visibility::Private]
        } else {
            &[Visibility::Public]
        };
        let methods = match scope {
            Scope::Class => self.get_methods(&fqns, namespace, visibility),
            Scope::Instance => self.get_instance_methods(&fqns, namespace, visibility),
        };
        methods
            .iter()
            .find(|s| s.label == method)
            .and_then(|s| s.return_type.clone())
    }

    fn macro_return_type(&self, path: &str, call_node: Option<&Arc<Node>>) -> Option<String> {
        let template = self.path_macros.get(path)?;
        let call_node = call_node?;
        let Node::Call { arguments, .. } = &**call_node else {
            return None;
        };
        if arguments.is_empty() {
            return None;
        }
        let mut resolved = template.clone();
        for (index, argument) in arguments.iter().enumerate() {
            let placeholder = format!("${}", index + 1);
            if !resolved.contains(&placeholder) {
                continue;
            }
            let text = argument_text(argument)?;
            resolved = resolved.replace(&placeholder, &text);
        }
        if resolved.contains('$') {
            return None;
        }
        Some(resolved)
    }

    /// Type of an instance variable declared in a namespace at a scope,
    /// from its documented type or its assignment.
    pub fn infer_instance_variable(
        &mut self,
        name: &str,
        namespace: &str,
        scope: Scope,
    ) -> Option<String> {
        self.refresh(false);
        let pin = self
            .instance_variable_pins
            .get(namespace)?
            .iter()
            .find(|p| p.name == name && p.scope == scope)?
            .clone();
        if let Some(declared) = &pin.return_type {
            return Some(declared.clone());
        }
        self.infer_assignment_node_type(&pin.node, namespace, scope)
    }

    pub fn infer_class_variable(&mut self, name: &str, namespace: &str) -> Option<String> {
        self.refresh(false);
        let pin = self
            .class_variable_pins
            .get(namespace)?
            .iter()
            .find(|p| p.name == name)?
            .clone();
        if let Some(declared) = &pin.return_type {
            return Some(declared.clone());
        }
        self.infer_assignment_node_type(&pin.node, namespace, Scope::Instance)
    }

    /// Type of an assignment's right-hand side. Pure literals map straight
    /// to their class; anything else goes through the chain walker, with a
    /// guard against right-hand sides that reference their own target.
    pub fn infer_assignment_node_type(
        &mut self,
        node: &Arc<Node>,
        namespace: &str,
        scope: Scope,
    ) -> Option<String> {
        self.refresh(false);
        let key = Node::key(node);
        if let Some(cached) = self.cache.get_assignment_type(key, namespace) {
            return cached.clone();
        }
        let result = self.compute_assignment_type(node, namespace, scope);
        self.cache.set_assignment_type(key, namespace, result.clone());
        result
    }

    fn compute_assignment_type(
        &mut self,
        node: &Arc<Node>,
        namespace: &str,
        scope: Scope,
    ) -> Option<String> {
        let Node::Assignment { target, value, .. } = &**node else {
            return None;
        };
        if let Some(literal) = value.literal_type() {
            return Some(literal.to_string());
        }
        let signature = value.chained_signature()?;
        // break self-referential assignments like `@x = @x.next`
        let target_name = match &**target {
            Node::InstanceVariable { name, .. }
            | Node::ClassVariable { name, .. }
            | Node::GlobalVariable { name, .. }
            | Node::Identifier { name, .. } => Some(name.clone()),
            Node::Constant { .. } | Node::ScopeResolution { .. } => target.constant_path(),
            _ => None,
        };
        if let Some(target_name) = target_name {
            let first = signature.split('.').next().unwrap_or("");
            if first == target_name {
                return None;
            }
        }
        let call_node = matches!(&**value, Node::Call { .. }).then(|| value.clone());
        self.infer_signature_type(&signature, namespace, scope, call_node.as_ref())
    }
}
