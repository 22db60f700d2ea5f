//! Integration tests for signature type inference
//!
//! Exercises the chain walker end to end: literal shortcuts, declared
//! return types, intrinsic self/subtype returns, macro substitution,
//! variable inference, and the self-reference guard.

use std::fs;

use garnet::{ApiMap, Scope};
use tempfile::TempDir;

fn workspace(files: &[(&str, &str)]) -> (TempDir, ApiMap) {
    let dir = tempfile::tempdir().unwrap();
    for (name, contents) in files {
        fs::write(dir.path().join(name), contents).unwrap();
    }
    let map = ApiMap::new(Some(dir.path()));
    (dir, map)
}

#[test]
fn test_chain_with_declared_return_type() {
    let (_dir, mut map) = workspace(&[(
        "foo.rb",
        "class Foo\n  # @return [String]\n  def bar; end\nend\n",
    )]);
    assert_eq!(
        map.infer_signature_type("Foo.new.bar", "", Scope::Class, None),
        Some("String".to_string())
    );
}

#[test]
fn test_chain_without_declared_return_type_is_empty() {
    let (_dir, mut map) = workspace(&[("foo.rb", "class Foo\n  def bar; end\nend\n")]);
    assert_eq!(
        map.infer_signature_type("Foo.new.bar", "", Scope::Class, None),
        None
    );
}

#[test]
fn test_bare_namespace_wraps_as_class_or_module() {
    let (_dir, mut map) = workspace(&[("a.rb", "class Foo\nend\nmodule Bar\nend\n")]);
    assert_eq!(
        map.infer_signature_type("Foo", "", Scope::Class, None),
        Some("Class<Foo>".to_string())
    );
    assert_eq!(
        map.infer_signature_type("Bar", "", Scope::Class, None),
        Some("Module<Bar>".to_string())
    );
}

#[test]
fn test_empty_signature_at_instance_scope_is_the_namespace() {
    let (_dir, mut map) = workspace(&[("a.rb", "class Foo\nend\n")]);
    assert_eq!(
        map.infer_signature_type("", "Foo", Scope::Instance, None),
        Some("Foo".to_string())
    );
    assert_eq!(map.infer_signature_type("", "Foo", Scope::Class, None), None);
}

#[test]
fn test_self_head_is_a_no_op() {
    let (_dir, mut map) = workspace(&[(
        "foo.rb",
        "class Foo\n  # @return [Integer]\n  def count; end\nend\n",
    )]);
    assert_eq!(
        map.infer_signature_type("self.count", "Foo", Scope::Instance, None),
        Some("Integer".to_string())
    );
}

#[test]
fn test_class_pseudo_suffix_flips_scope() {
    let (_dir, mut map) = workspace(&[(
        "foo.rb",
        "class Foo\n  # @return [String]\n  def self.banner; end\nend\n",
    )]);
    assert_eq!(
        map.infer_signature_type("banner", "Foo#class", Scope::Instance, None),
        Some("String".to_string())
    );
}

#[test]
fn test_instance_variable_literal_assignment() {
    let (_dir, mut map) = workspace(&[(
        "foo.rb",
        "class Foo\n  def initialize\n    @x = 5\n  end\nend\n",
    )]);
    assert_eq!(
        map.infer_instance_variable("@x", "Foo", Scope::Instance),
        Some("Integer".to_string())
    );
}

#[test]
fn test_instance_variable_chain_assignment() {
    let (_dir, mut map) = workspace(&[(
        "foo.rb",
        "class Bar\n  # @return [String]\n  def name; end\nend\nclass Foo\n  def initialize\n    @bar = Bar.new\n  end\n  def check\n    @bar.name\n  end\nend\n",
    )]);
    assert_eq!(
        map.infer_instance_variable("@bar", "Foo", Scope::Instance),
        Some("Bar".to_string())
    );
    assert_eq!(
        map.infer_signature_type("@bar.name", "Foo", Scope::Instance, None),
        Some("String".to_string())
    );
}

#[test]
fn test_class_variable_inference() {
    let (_dir, mut map) = workspace(&[("foo.rb", "class Foo\n  @@count = 0\nend\n")]);
    assert_eq!(
        map.infer_class_variable("@@count", "Foo"),
        Some("Integer".to_string())
    );
    assert_eq!(
        map.infer_signature_type("@@count", "Foo", Scope::Instance, None),
        Some("Integer".to_string())
    );
}

#[test]
fn test_class_side_instance_variable_is_separate() {
    let (_dir, mut map) = workspace(&[(
        "foo.rb",
        "class Foo\n  @registry = {}\n  def initialize\n    @registry = []\n  end\nend\n",
    )]);
    assert_eq!(
        map.infer_instance_variable("@registry", "Foo", Scope::Class),
        Some("Hash".to_string())
    );
    assert_eq!(
        map.infer_instance_variable("@registry", "Foo", Scope::Instance),
        Some("Array".to_string())
    );
}

#[test]
fn test_self_reference_guard_breaks_recursion() {
    let (_dir, mut map) = workspace(&[(
        "foo.rb",
        "class Foo\n  def step\n    @x = @x.next\n  end\nend\n",
    )]);
    assert_eq!(map.infer_instance_variable("@x", "Foo", Scope::Instance), None);
}

#[test]
fn test_self_returning_intrinsics_keep_the_type() {
    let (_dir, mut map) = workspace(&[("foo.rb", "class Foo\nend\n")]);
    assert_eq!(
        map.infer_signature_type("Foo.new.freeze", "", Scope::Class, None),
        Some("Foo".to_string())
    );
    assert_eq!(
        map.infer_signature_type("Foo.new.dup.tap", "", Scope::Class, None),
        Some("Foo".to_string())
    );
}

#[test]
fn test_subtype_returning_intrinsics_unwrap_containers() {
    let (_dir, mut map) = workspace(&[(
        "foo.rb",
        "class Foo\n  # @return [Array<String>]\n  def names; end\nend\n",
    )]);
    assert_eq!(
        map.infer_signature_type("Foo.new.names", "", Scope::Class, None),
        Some("Array<String>".to_string())
    );
    assert_eq!(
        map.infer_signature_type("Foo.new.names.first", "", Scope::Class, None),
        Some("String".to_string())
    );
}

#[test]
fn test_macro_return_type_substitutes_arguments() {
    let (_dir, mut map) = workspace(&[(
        "foo.rb",
        "class Foo\n  # @return [$1]\n  def cast(type); end\n  def run\n    @made = cast(Widget)\n  end\nend\nclass Widget\nend\n",
    )]);
    assert_eq!(
        map.infer_instance_variable("@made", "Foo", Scope::Instance),
        Some("Widget".to_string())
    );
}

#[test]
fn test_inference_is_deterministic_and_cached() {
    let (_dir, mut map) = workspace(&[(
        "foo.rb",
        "class Foo\n  # @return [String]\n  def bar; end\nend\n",
    )]);
    let first = map.infer_signature_type("Foo.new.bar", "", Scope::Class, None);
    let second = map.infer_signature_type("Foo.new.bar", "", Scope::Class, None);
    assert_eq!(first, second);
    assert_eq!(first, Some("String".to_string()));
}

#[test]
fn test_subclass_infers_through_superclass() {
    let (_dir, mut map) = workspace(&[(
        "inherit.rb",
        "class C\n  # @return [Integer]\n  def foo; end\nend\nclass D < C\nend\n",
    )]);
    let via_c = map.infer_signature_type("C.new.foo", "", Scope::Class, None);
    let via_d = map.infer_signature_type("D.new.foo", "", Scope::Class, None);
    assert_eq!(via_c, via_d);
    assert_eq!(via_c, Some("Integer".to_string()));
}

#[test]
fn test_docset_backed_chain() {
    let dir = tempfile::tempdir().unwrap();
    let docs = dir.path().join(".garnet").join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(
        docs.join("core.json"),
        r#"{"objects": [
            {"path": "String", "type": "class"},
            {"path": "String#upcase", "type": "method", "return_type": "String"}
        ]}"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("foo.rb"),
        "class Foo\n  # @return [String]\n  def name; end\nend\n",
    )
    .unwrap();
    let mut map = ApiMap::new(Some(dir.path()));
    assert_eq!(
        map.infer_signature_type("Foo.new.name.upcase", "", Scope::Class, None),
        Some("String".to_string())
    );
}

#[test]
fn test_private_methods_visible_inside_own_namespace() {
    let (_dir, mut map) = workspace(&[(
        "foo.rb",
        "class Foo\n  def run\n    helper\n  end\n  private\n  # @return [Symbol]\n  def helper; end\nend\n",
    )]);
    assert_eq!(
        map.infer_signature_type("helper", "Foo", Scope::Instance, None),
        Some("Symbol".to_string())
    );
}
