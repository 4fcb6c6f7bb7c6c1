//! Rust source generation: a `token_hierarchy!` invocation.

use std::fmt::Write;

use crate::lock::LockFile;
use crate::toml_parser::{RootEntry, TokensConfig};

const DEPRECATED_NOTE: &str = "removed from tokens.toml";

struct TokenNode {
    name: String,
    int: Option<i64>,
    float: Option<f64>,
    deprecated: bool,
}

struct ClassNode {
    name: String,
    root: Option<RootEntry>,
    tokens: Vec<TokenNode>,
    children: Vec<ClassNode>,
}

impl ClassNode {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            root: None,
            tokens: Vec::new(),
            children: Vec::new(),
        }
    }
}

/// Find or create the node for `path` below `roots`.
fn node_mut<'a>(roots: &'a mut Vec<ClassNode>, path: &str) -> &'a mut ClassNode {
    let mut level = roots;
    let mut segments = path.split('.').peekable();
    loop {
        let segment = segments.next().unwrap_or_default();
        let index = match level.iter().position(|n| n.name == segment) {
            Some(index) => index,
            None => {
                level.push(ClassNode::new(segment));
                level.len() - 1
            }
        };
        if segments.peek().is_none() {
            return &mut level[index];
        }
        level = &mut level[index].children;
    }
}

fn build_tree(config: &TokensConfig, lock: Option<&LockFile>) -> Vec<ClassNode> {
    let mut roots = Vec::new();

    for class in config.classes() {
        let node = node_mut(&mut roots, &class.path);
        node.root = class.root;
        node.tokens.extend(class.tokens.iter().map(|t| TokenNode {
            name: t.name.clone(),
            int: t.int,
            float: t.float,
            deprecated: false,
        }));
    }

    // Removed tokens stay generated, after the active ones.
    for entry in lock.into_iter().flat_map(LockFile::deprecated_entries) {
        node_mut(&mut roots, &entry.class).tokens.push(TokenNode {
            name: entry.name.clone(),
            int: entry.int,
            float: None,
            deprecated: true,
        });
    }

    roots
}

fn float_literal(value: f64) -> String {
    if value.is_nan() {
        "f64::NAN".to_string()
    } else if value == f64::INFINITY {
        "f64::INFINITY".to_string()
    } else if value == f64::NEG_INFINITY {
        "f64::NEG_INFINITY".to_string()
    } else {
        // Debug always keeps a decimal point or exponent.
        format!("{value:?}")
    }
}

fn write_class(out: &mut String, node: &ClassNode, indent: usize) {
    let pad = "    ".repeat(indent);

    if let Some(root) = node.root {
        let _ = writeln!(
            out,
            "{pad}#[root(string_index = {}, int_index = {})]",
            root.string_index, root.int_index
        );
    }

    if node.tokens.is_empty() && node.children.is_empty() {
        let _ = writeln!(out, "{pad}{} {{}}", node.name);
        return;
    }

    let _ = writeln!(out, "{pad}{} {{", node.name);
    let inner = "    ".repeat(indent + 1);

    for token in &node.tokens {
        if token.deprecated {
            let _ = writeln!(out, "{inner}#[deprecated(note = \"{DEPRECATED_NOTE}\")]");
        }
        if let Some(float) = token.float {
            let _ = writeln!(out, "{inner}#[float = {}]", float_literal(float));
        }
        match token.int {
            Some(int) => {
                let _ = writeln!(out, "{inner}{} = {int};", token.name);
            }
            None => {
                let _ = writeln!(out, "{inner}{};", token.name);
            }
        }
    }

    for child in &node.children {
        write_class(out, child, indent + 1);
    }

    let _ = writeln!(out, "{pad}}}");
}

/// Generate code from config alone.
pub fn generate_token_code(config: &TokensConfig) -> String {
    render(config, None)
}

/// Generate code from config plus the deprecated tokens kept in `lock`.
pub fn generate_token_code_from_lock(config: &TokensConfig, lock: &LockFile) -> String {
    render(config, Some(lock))
}

fn render(config: &TokensConfig, lock: Option<&LockFile>) -> String {
    let tree = build_tree(config, lock);

    let mut out = String::new();
    out.push_str("// @generated by bevy-token-build from tokens.toml. Do not edit.\n\n");
    out.push_str("::bevy_token::token_hierarchy! {\n");
    let _ = writeln!(out, "    pub mod {} {{", config.module_name);
    for node in &tree {
        write_class(&mut out, node, 2);
    }
    out.push_str("    }\n}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::LockEntry;

    const CONFIG: &str = r#"
module_name = "StatusTokens"

[[class]]
path = "Status"
root = { int_index = true }

[[class]]
path = "Status.Success"
tokens = [{ name = "COMPLETED", int = 0 }, { name = "PAUSED", int = 1 }]

[[class]]
path = "Status.Error"
tokens = [{ name = "MECHANICAL_ERROR", int = 10, float = 0.5 }, "USER_ERROR"]
"#;

    #[test]
    fn renders_nested_hierarchy() {
        let config = TokensConfig::from_str(CONFIG).unwrap();
        let code = generate_token_code(&config);

        assert!(code.contains("token_hierarchy!"));
        assert!(code.contains("pub mod StatusTokens {"));
        assert!(code.contains("#[root(string_index = true, int_index = true)]\n        Status {"));
        assert!(code.contains("            Success {\n                COMPLETED = 0;\n                PAUSED = 1;\n"));
        assert!(code.contains("#[float = 0.5]\n                MECHANICAL_ERROR = 10;"));
        assert!(code.contains("                USER_ERROR;\n"));
    }

    #[test]
    fn empty_class_renders_braces() {
        let config = TokensConfig::from_str("[[class]]\npath = \"Empty\"\n").unwrap();
        assert!(generate_token_code(&config).contains("        Empty {}\n"));
    }

    #[test]
    fn deprecated_tokens_are_appended() {
        let config = TokensConfig::from_str(CONFIG).unwrap();
        let mut lock = LockFile::from_config(&config);
        lock.add_entry(LockEntry {
            class: "Status.Retired".into(),
            name: "HALTED".into(),
            int: Some(7),
            deprecated: true,
        });

        let code = generate_token_code_from_lock(&config, &lock);
        assert!(code.contains("Retired {"));
        assert!(code.contains(&format!(
            "#[deprecated(note = \"{DEPRECATED_NOTE}\")]\n                HALTED = 7;"
        )));
    }

    #[test]
    fn float_literals_stay_floats() {
        assert_eq!(float_literal(1.0), "1.0");
        assert_eq!(float_literal(-0.25), "-0.25");
        assert_eq!(float_literal(f64::INFINITY), "f64::INFINITY");
    }
}
