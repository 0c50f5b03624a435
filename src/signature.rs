//! Top-level function signatures extracted from the prefab entry point.
//!
//! The entry point is parsed with tree-sitter's Python grammar and walked
//! once with an explicit stack of enclosing scopes. Only definitions with an
//! empty stack (module level, including module-level `if`/`try`/`with`
//! blocks and decorated definitions) are reported; anything inside a class or
//! another function is skipped. Nothing is imported or executed.

use crate::error::CheckError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, trace};
use tree_sitter::{Node, Parser, Tree};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedParameter {
    pub name: String,
    /// True when the parameter has no default value.
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedFunction {
    pub name: String,
    pub parameters: Vec<ExtractedParameter>,
    /// 1-based line of the `def`.
    pub line: usize,
}

impl ExtractedFunction {
    pub fn parameter(&self, name: &str) -> Option<&ExtractedParameter> {
        self.parameters.iter().find(|param| param.name == name)
    }

    pub fn is_public(&self) -> bool {
        !self.name.starts_with('_')
    }
}

/// Extracted functions in source order, indexed by name.
#[derive(Debug, Clone, Default)]
pub struct SignatureSet {
    functions: Vec<ExtractedFunction>,
    by_name: BTreeMap<String, usize>,
}

impl SignatureSet {
    pub fn get(&self, name: &str) -> Option<&ExtractedFunction> {
        self.by_name.get(name).map(|idx| &self.functions[*idx])
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtractedFunction> {
        self.functions.iter()
    }

    pub fn functions(&self) -> &[ExtractedFunction] {
        &self.functions
    }

    // A rebound name keeps its first position but takes the latest signature,
    // which is what the module namespace holds after import.
    fn insert(&mut self, function: ExtractedFunction) {
        match self.by_name.get(&function.name) {
            Some(idx) => self.functions[*idx] = function,
            None => {
                self.by_name
                    .insert(function.name.clone(), self.functions.len());
                self.functions.push(function);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxDiagnostic {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

#[derive(Debug)]
pub enum SourceError {
    Grammar(String),
    Syntax(SyntaxDiagnostic),
}

/// Read `path` and extract its top-level function signatures.
pub fn extract_signatures(path: &Path) -> Result<SignatureSet, CheckError> {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(CheckError::EntryPointNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(err) => return Err(CheckError::io(path, err)),
    };

    let signatures = parse_signatures(&source).map_err(|err| match err {
        SourceError::Grammar(message) => CheckError::Parser(message),
        SourceError::Syntax(diag) => CheckError::EntryPointSyntax {
            path: path.to_path_buf(),
            line: diag.line,
            column: diag.column,
            message: diag.message,
        },
    })?;
    debug!(
        path = %path.display(),
        functions = signatures.len(),
        "extracted signatures"
    );
    Ok(signatures)
}

/// Extract top-level function signatures from Python source text.
pub fn parse_signatures(source: &str) -> Result<SignatureSet, SourceError> {
    let tree = parse_python(source)?;
    let root = tree.root_node();
    if let Some(node) = first_error(root) {
        return Err(SourceError::Syntax(describe_error(node, source)));
    }

    let mut walker = ScopeWalker {
        source: source.as_bytes(),
        stack: Vec::new(),
        out: SignatureSet::default(),
    };
    walker.visit(root).map_err(SourceError::Syntax)?;
    Ok(walker.out)
}

fn parse_python(source: &str) -> Result<Tree, SourceError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|err| SourceError::Grammar(format!("failed to set language: {err}")))?;
    parser
        .parse(source, None)
        .ok_or_else(|| SourceError::Grammar("parsing was cancelled".to_string()))
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error(child) {
            return Some(found);
        }
    }
    None
}

fn describe_error(node: Node<'_>, source: &str) -> SyntaxDiagnostic {
    let message = if node.is_missing() {
        format!("expected '{}'", node.kind())
    } else {
        let text = node.utf8_text(source.as_bytes()).unwrap_or_default();
        let snippet = text.lines().next().unwrap_or_default().trim();
        if snippet.is_empty() {
            "invalid syntax".to_string()
        } else {
            format!("invalid syntax near '{snippet}'")
        }
    };
    diagnostic_at(node, message)
}

fn diagnostic_at(node: Node<'_>, message: String) -> SyntaxDiagnostic {
    let position = node.start_position();
    SyntaxDiagnostic {
        line: position.row + 1,
        column: position.column + 1,
        message,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scope {
    Class,
    Function,
}

struct ScopeWalker<'s> {
    source: &'s [u8],
    stack: Vec<Scope>,
    out: SignatureSet,
}

impl ScopeWalker<'_> {
    fn visit(&mut self, node: Node<'_>) -> Result<(), SyntaxDiagnostic> {
        match node.kind() {
            "function_definition" => {
                if self.stack.is_empty() {
                    if let Some(function) = self.function(node)? {
                        trace!(name = %function.name, line = function.line, "top-level function");
                        self.out.insert(function);
                    }
                }
                self.enter(Scope::Function, node)
            }
            "class_definition" => self.enter(Scope::Class, node),
            "print_statement" | "exec_statement" => Err(diagnostic_at(
                node,
                format!(
                    "Python 2 '{}' statement is not valid Python 3",
                    node.kind().trim_end_matches("_statement")
                ),
            )),
            _ => self.visit_children(node),
        }
    }

    fn enter(&mut self, scope: Scope, node: Node<'_>) -> Result<(), SyntaxDiagnostic> {
        self.stack.push(scope);
        let result = self.visit_children(node);
        self.stack.pop();
        result
    }

    fn visit_children(&mut self, node: Node<'_>) -> Result<(), SyntaxDiagnostic> {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.visit(child)?;
        }
        Ok(())
    }

    fn text(&self, node: Node<'_>) -> String {
        node.utf8_text(self.source).unwrap_or_default().to_string()
    }

    fn function(&self, node: Node<'_>) -> Result<Option<ExtractedFunction>, SyntaxDiagnostic> {
        let Some(name) = node.child_by_field_name("name") else {
            return Ok(None);
        };
        let parameters = match node.child_by_field_name("parameters") {
            Some(params) => self.parameters(params)?,
            None => Vec::new(),
        };
        Ok(Some(ExtractedFunction {
            name: self.text(name),
            parameters,
            line: node.start_position().row + 1,
        }))
    }

    fn parameters(&self, node: Node<'_>) -> Result<Vec<ExtractedParameter>, SyntaxDiagnostic> {
        let mut params = Vec::new();
        let mut keyword_only = false;
        let mut seen_default = false;
        let mut seen_kwargs = false;

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "comment" {
                continue;
            }
            if seen_kwargs {
                return Err(diagnostic_at(
                    child,
                    "parameter follows '**' parameter".to_string(),
                ));
            }
            let (name, has_default) = match child.kind() {
                "identifier" => (child, false),
                "typed_parameter" => match child.named_child(0) {
                    Some(inner) if inner.kind() == "identifier" => (inner, false),
                    Some(inner) => {
                        match inner.kind() {
                            "list_splat_pattern" => keyword_only = true,
                            "dictionary_splat_pattern" => seen_kwargs = true,
                            _ => {}
                        }
                        continue;
                    }
                    None => continue,
                },
                "default_parameter" | "typed_default_parameter" => {
                    match child.child_by_field_name("name") {
                        Some(name) if name.kind() == "identifier" => (name, true),
                        _ => continue,
                    }
                }
                "list_splat_pattern" | "keyword_separator" => {
                    keyword_only = true;
                    continue;
                }
                "dictionary_splat_pattern" => {
                    seen_kwargs = true;
                    continue;
                }
                _ => continue,
            };

            if !keyword_only {
                if has_default {
                    seen_default = true;
                } else if seen_default {
                    return Err(diagnostic_at(
                        child,
                        "parameter without a default follows parameter with default".to_string(),
                    ));
                }
            }

            params.push(ExtractedParameter {
                name: self.text(name),
                required: !has_default,
            });
        }
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(set: &SignatureSet, name: &str) -> Vec<(String, bool)> {
        set.get(name)
            .unwrap_or_else(|| panic!("{name} not extracted"))
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.required))
            .collect()
    }

    fn owned(pairs: &[(&str, bool)]) -> Vec<(String, bool)> {
        pairs.iter().map(|(n, r)| (n.to_string(), *r)).collect()
    }

    #[test]
    fn required_is_positional() {
        let set = parse_signatures("def add(a, b=1):\n    return a + b\n").unwrap();
        assert_eq!(params(&set, "add"), owned(&[("a", true), ("b", false)]));
    }

    #[test]
    fn every_split_point_is_respected() {
        let names = ["a", "b", "c", "d"];
        for required in 0..=names.len() {
            let rendered: Vec<String> = names
                .iter()
                .enumerate()
                .map(|(idx, name)| {
                    if idx < required {
                        name.to_string()
                    } else {
                        format!("{name}={idx}")
                    }
                })
                .collect();
            let source = format!("def f({}):\n    pass\n", rendered.join(", "));
            let set = parse_signatures(&source).unwrap();
            let flags: Vec<bool> = set
                .get("f")
                .unwrap()
                .parameters
                .iter()
                .map(|p| p.required)
                .collect();
            let expected: Vec<bool> = (0..names.len()).map(|idx| idx < required).collect();
            assert_eq!(flags, expected, "source: {source}");
        }
    }

    #[test]
    fn annotations_do_not_change_required_ness() {
        let source = "def analyze(data: list, operation: str = \"statistics\") -> dict:\n    return {}\n";
        let set = parse_signatures(source).unwrap();
        assert_eq!(
            params(&set, "analyze"),
            owned(&[("data", true), ("operation", false)])
        );
    }

    #[test]
    fn splats_are_skipped_and_keyword_only_kept() {
        let source = "def f(a, *args, key, flag=False, **kwargs):\n    pass\n\ndef g(a, *, b):\n    pass\n";
        let set = parse_signatures(source).unwrap();
        assert_eq!(
            params(&set, "f"),
            owned(&[("a", true), ("key", true), ("flag", false)])
        );
        assert_eq!(params(&set, "g"), owned(&[("a", true), ("b", true)]));
    }

    #[test]
    fn class_and_nested_functions_are_excluded() {
        let source = r#"
class Greeter:
    def greet(self, name):
        def inner():
            pass
        return name

    class Nested:
        def deep(self):
            pass

def outer(x):
    def helper(y):
        pass
    return x
"#;
        let set = parse_signatures(source).unwrap();
        let names: Vec<&str> = set.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["outer"]);
    }

    #[test]
    fn module_level_blocks_decorators_and_async_are_included() {
        let source = r#"
import functools

@functools.lru_cache
def cached(n):
    return n

async def fetch(url, timeout=5):
    return url

if True:
    def conditional():
        pass

try:
    def guarded(value):
        return value
except ImportError:
    pass
"#;
        let set = parse_signatures(source).unwrap();
        let names: Vec<&str> = set.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["cached", "fetch", "conditional", "guarded"]);
        assert_eq!(params(&set, "fetch"), owned(&[("url", true), ("timeout", false)]));
    }

    #[test]
    fn redefinition_keeps_position_and_latest_signature() {
        let source = "def a(x):\n    pass\n\ndef b():\n    pass\n\ndef a(x, y=2):\n    pass\n";
        let set = parse_signatures(source).unwrap();
        let names: Vec<&str> = set.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(params(&set, "a"), owned(&[("x", true), ("y", false)]));
        assert_eq!(set.get("a").unwrap().line, 7);
    }

    #[test]
    fn syntax_errors_are_reported() {
        let err = parse_signatures("def broken(:\n    pass\n").unwrap_err();
        match err {
            SourceError::Syntax(diag) => assert!(diag.line >= 1),
            SourceError::Grammar(message) => panic!("unexpected grammar failure: {message}"),
        }
    }

    #[test]
    fn default_before_required_is_a_syntax_error() {
        let err = parse_signatures("\n\ndef f(a=1, b):\n    pass\n").unwrap_err();
        match err {
            SourceError::Syntax(diag) => {
                assert_eq!(diag.line, 3);
                assert!(diag.message.contains("default"));
            }
            SourceError::Grammar(message) => panic!("unexpected grammar failure: {message}"),
        }
    }

    fn syntax_line(source: &str) -> usize {
        match parse_signatures(source).unwrap_err() {
            SourceError::Syntax(diag) => diag.line,
            SourceError::Grammar(message) => panic!("unexpected grammar failure: {message}"),
        }
    }

    #[test]
    fn parameters_after_kwargs_are_syntax_errors() {
        assert_eq!(syntax_line("def f(**kw, a):\n    pass\n"), 1);
        assert_eq!(syntax_line("\ndef g(a, **kw: dict, b=1):\n    pass\n"), 2);
        let set = parse_signatures("def h(a, **kw):\n    pass\n").unwrap();
        assert_eq!(params(&set, "h"), owned(&[("a", true)]));
    }

    #[test]
    fn python2_print_and_exec_statements_are_syntax_errors() {
        assert_eq!(syntax_line("print \"hello\"\n\ndef f(a):\n    pass\n"), 1);
        assert_eq!(syntax_line("def g():\n    pass\n\nexec \"x = 1\"\n"), 4);
        assert_eq!(syntax_line("def h():\n    print \"nested\"\n"), 2);
    }

    #[test]
    fn python3_print_and_exec_calls_are_accepted() {
        let set = parse_signatures("print(\"hello\")\nexec(\"x = 1\")\n\ndef f(a):\n    pass\n")
            .unwrap();
        assert_eq!(params(&set, "f"), owned(&[("a", true)]));
    }

    #[test]
    fn missing_entry_point_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_signatures(&dir.path().join("main.py")).unwrap_err();
        assert!(matches!(err, CheckError::EntryPointNotFound { .. }));
    }

    #[test]
    fn private_functions_are_flagged_non_public() {
        let set = parse_signatures("def _helper():\n    pass\n\ndef tool():\n    pass\n").unwrap();
        assert!(!set.get("_helper").unwrap().is_public());
        assert!(set.get("tool").unwrap().is_public());
    }
}
