//! TOML configuration parser for tokens.toml.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Maximum class path length, mirrors `bevy_token::MAX_DEPTH`.
const MAX_DEPTH: usize = 8;

/// Token names taken by the items every generated class module defines.
const RESERVED: &[&str] = &["Class", "ID", "PATH", "NAME"];

/// Behavior when a token is removed from config but exists in lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnRemove {
    /// Fail generation (default, safest)
    #[default]
    Error,
    /// Keep generating the token as `#[deprecated]`
    Warn,
}

/// Parsed tokens configuration.
#[derive(Debug, Clone)]
pub struct TokensConfig {
    /// Module name for the generated hierarchy
    pub module_name: String,
    /// Behavior when tokens are removed
    pub on_remove: OnRemove,
    /// All classes, ancestors before descendants
    classes: Vec<ClassEntry>,
}

/// Global indexes of a root class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RootEntry {
    #[serde(default = "default_true")]
    pub string_index: bool,
    #[serde(default)]
    pub int_index: bool,
}

fn default_true() -> bool {
    true
}

/// A token as written in tokens.toml.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenEntry {
    pub name: String,
    pub int: Option<i64>,
    pub float: Option<f64>,
}

/// A class with its own tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassEntry {
    /// Full dot-separated path (e.g., "Status.Error")
    pub path: String,
    /// Number of segments (1 for top-level classes)
    pub depth: usize,
    pub root: Option<RootEntry>,
    pub tokens: Vec<TokenEntry>,
}

impl ClassEntry {
    /// Parent path (None for top-level classes)
    pub fn parent(&self) -> Option<&str> {
        self.path.rsplit_once('.').map(|(parent, _)| parent)
    }

    /// Last path segment.
    pub fn name(&self) -> &str {
        self.path.rsplit_once('.').map_or(self.path.as_str(), |(_, name)| name)
    }
}

/// Raw TOML structure.
#[derive(Debug, Deserialize)]
struct RawTokensConfig {
    /// Optional module name (defaults to "Tokens")
    module_name: Option<String>,
    /// Behavior when tokens are removed: "error" (default) or "warn"
    on_remove: Option<String>,
    #[serde(default, rename = "class")]
    classes: Vec<RawClass>,
}

#[derive(Debug, Deserialize)]
struct RawClass {
    path: String,
    root: Option<RootEntry>,
    #[serde(default)]
    tokens: Vec<RawToken>,
}

/// `"NAME"` or `{ name = "NAME", int = 1, float = 0.5 }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawToken {
    Name(String),
    Full {
        name: String,
        int: Option<i64>,
        float: Option<f64>,
    },
}

impl From<RawToken> for TokenEntry {
    fn from(raw: RawToken) -> Self {
        match raw {
            RawToken::Name(name) => Self {
                name,
                int: None,
                float: None,
            },
            RawToken::Full { name, int, float } => Self { name, int, float },
        }
    }
}

impl TokensConfig {
    /// Parse from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TokensConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            TokensConfigError::Io(format!("failed to read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_str(&content)
    }

    /// Parse from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, TokensConfigError> {
        let raw: RawTokensConfig =
            toml::from_str(content).map_err(|e| TokensConfigError::Parse(e.to_string()))?;

        let module_name = raw.module_name.unwrap_or_else(|| "Tokens".to_string());
        check_identifier(&module_name, "module_name")?;

        let on_remove = match raw.on_remove.as_deref() {
            None | Some("error") => OnRemove::Error,
            Some("warn") => OnRemove::Warn,
            Some(other) => {
                return Err(TokensConfigError::Validation(format!(
                    "invalid on_remove value '{other}': expected 'error' or 'warn'"
                )));
            }
        };

        let classes = Self::expand_classes(raw.classes)?;

        Ok(Self {
            module_name,
            on_remove,
            classes,
        })
    }

    /// All classes, ancestors before descendants.
    pub fn classes(&self) -> impl Iterator<Item = &ClassEntry> {
        self.classes.iter()
    }

    pub fn class(&self, path: &str) -> Option<&ClassEntry> {
        self.classes.iter().find(|c| c.path == path)
    }

    /// Every `(class, token)` pair in declaration order.
    pub fn tokens(&self) -> impl Iterator<Item = (&ClassEntry, &TokenEntry)> {
        self.classes
            .iter()
            .flat_map(|class| class.tokens.iter().map(move |token| (class, token)))
    }

    /// Number of classes, auto-created ancestors included.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Validate classes and insert missing ancestors.
    ///
    /// e.g., "A.B.C" alone expands to ["A", "A.B", "A.B.C"]
    fn expand_classes(raw: Vec<RawClass>) -> Result<Vec<ClassEntry>, TokensConfigError> {
        let mut explicit: HashSet<String> = HashSet::new();
        let mut classes: Vec<ClassEntry> = Vec::new();

        for raw_class in raw {
            let path = raw_class.path;
            let segments = validate_path(&path)?;

            if !explicit.insert(path.clone()) {
                return Err(TokensConfigError::Validation(format!(
                    "class '{path}' is declared twice"
                )));
            }

            let tokens: Vec<TokenEntry> = raw_class.tokens.into_iter().map(TokenEntry::from).collect();
            validate_tokens(&path, &tokens)?;

            // Ancestors first, created empty unless declared on their own.
            for depth in 1..segments.len() {
                let ancestor = segments[..depth].join(".");
                if !classes.iter().any(|c| c.path == ancestor) {
                    classes.push(ClassEntry {
                        path: ancestor,
                        depth,
                        root: None,
                        tokens: Vec::new(),
                    });
                }
            }
            let depth = segments.len();

            // An explicit entry fills in a previously auto-created ancestor.
            if let Some(existing) = classes.iter_mut().find(|c| c.path == path) {
                existing.root = raw_class.root;
                existing.tokens = tokens;
            } else {
                classes.push(ClassEntry {
                    path,
                    depth,
                    root: raw_class.root,
                    tokens,
                });
            }
        }

        Ok(classes)
    }
}

fn validate_path(path: &str) -> Result<Vec<&str>, TokensConfigError> {
    if path.is_empty() {
        return Err(TokensConfigError::Validation("empty class path not allowed".into()));
    }
    let segments: Vec<&str> = path.split('.').collect();
    if segments.len() > MAX_DEPTH {
        return Err(TokensConfigError::Validation(format!(
            "class '{path}' is deeper than {MAX_DEPTH} levels"
        )));
    }
    for seg in &segments {
        check_identifier(seg, path)?;
    }
    Ok(segments)
}

fn validate_tokens(class: &str, tokens: &[TokenEntry]) -> Result<(), TokensConfigError> {
    let mut seen: HashSet<&str> = HashSet::new();
    for token in tokens {
        check_identifier(&token.name, class)?;
        if RESERVED.contains(&token.name.as_str()) {
            return Err(TokensConfigError::Validation(format!(
                "token name '{}' in class '{class}' is reserved",
                token.name
            )));
        }
        if !seen.insert(&token.name) {
            return Err(TokensConfigError::Validation(format!(
                "duplicate token '{}' in class '{class}'",
                token.name
            )));
        }
    }
    Ok(())
}

/// Starts with a letter or underscore, continues with alphanumerics or underscores.
fn check_identifier(ident: &str, context: &str) -> Result<(), TokensConfigError> {
    let mut chars = ident.chars();
    match chars.next() {
        None => {
            return Err(TokensConfigError::Validation(format!(
                "invalid '{context}': empty segment"
            )));
        }
        Some(first) if !first.is_alphabetic() && first != '_' => {
            return Err(TokensConfigError::Validation(format!(
                "invalid '{context}': '{ident}' must start with letter or underscore"
            )));
        }
        Some(_) => {}
    }
    if let Some(c) = chars.find(|c| !c.is_alphanumeric() && *c != '_') {
        return Err(TokensConfigError::Validation(format!(
            "invalid '{context}': '{ident}' contains invalid character '{c}'"
        )));
    }
    Ok(())
}

/// Errors during config parsing.
#[derive(Debug, thiserror::Error)]
pub enum TokensConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_config() {
        let toml = r#"
[[class]]
path = "Status"
root = { int_index = true }

[[class]]
path = "Status.Success"
tokens = [{ name = "COMPLETED", int = 0 }, { name = "PAUSED", int = 1 }]

[[class]]
path = "Status.Error"
tokens = ["USER_ERROR", { name = "MECHANICAL_ERROR", float = 0.5 }]
"#;
        let config = TokensConfig::from_str(toml).unwrap();

        assert_eq!(config.module_name, "Tokens");
        assert_eq!(config.len(), 3);

        let status = config.class("Status").unwrap();
        assert_eq!(
            status.root,
            Some(RootEntry {
                string_index: true,
                int_index: true
            })
        );

        let names: Vec<_> = config.tokens().map(|(_, t)| t.name.as_str()).collect();
        assert_eq!(names, vec!["COMPLETED", "PAUSED", "USER_ERROR", "MECHANICAL_ERROR"]);

        let error = config.class("Status.Error").unwrap();
        assert_eq!(error.tokens[0].int, None);
        assert_eq!(error.tokens[1].float, Some(0.5));
        assert_eq!(error.parent(), Some("Status"));
        assert_eq!(error.name(), "Error");
    }

    #[test]
    fn parse_with_module_name() {
        let toml = r#"
module_name = "GameTokens"

[[class]]
path = "A.B"
"#;
        let config = TokensConfig::from_str(toml).unwrap();
        assert_eq!(config.module_name, "GameTokens");
    }

    #[test]
    fn expand_creates_parents() {
        let toml = r#"
[[class]]
path = "A.B.C.D"
tokens = ["X"]
"#;
        let config = TokensConfig::from_str(toml).unwrap();

        let classes: Vec<_> = config.classes().collect();
        assert_eq!(classes.len(), 4);

        assert_eq!(classes[0].path, "A");
        assert_eq!(classes[0].depth, 1);
        assert_eq!(classes[0].parent(), None);

        assert_eq!(classes[1].path, "A.B");
        assert_eq!(classes[2].path, "A.B.C");

        assert_eq!(classes[3].path, "A.B.C.D");
        assert_eq!(classes[3].depth, 4);
        assert_eq!(classes[3].parent(), Some("A.B.C"));
        assert_eq!(classes[3].tokens.len(), 1);
    }

    #[test]
    fn explicit_class_fills_auto_created_ancestor() {
        let toml = r#"
[[class]]
path = "Status.Success"
tokens = ["COMPLETED"]

[[class]]
path = "Status"
root = {}
"#;
        let config = TokensConfig::from_str(toml).unwrap();
        assert_eq!(config.len(), 2);
        assert_eq!(config.classes().next().unwrap().path, "Status");
        assert_eq!(config.class("Status").unwrap().root, Some(RootEntry {
            string_index: true,
            int_index: false
        }));
    }

    #[test]
    fn rejects_duplicate_class() {
        let toml = r#"
[[class]]
path = "A"

[[class]]
path = "A"
"#;
        let err = TokensConfig::from_str(toml).unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn rejects_duplicate_token() {
        let toml = r#"
[[class]]
path = "A"
tokens = ["X", { name = "X", int = 1 }]
"#;
        let err = TokensConfig::from_str(toml).unwrap_err();
        assert!(err.to_string().contains("duplicate token 'X'"));
    }

    #[test]
    fn same_token_name_in_different_classes_is_fine() {
        let toml = r#"
[[class]]
path = "Comparison"
tokens = ["EQ"]

[[class]]
path = "LogEvent"
tokens = ["EQ"]
"#;
        assert!(TokensConfig::from_str(toml).is_ok());
    }

    #[test]
    fn rejects_invalid_path() {
        let cases = [
            "",      // empty
            ".A",    // starts with dot
            "A.",    // ends with dot
            "A..B",  // double dot
            "A.1B",  // segment starts with number
            "A.B-C", // contains hyphen
            "A.B C", // contains space
            "A.B.C.D.E.F.G.H.I",
        ];

        for case in cases {
            let toml = format!(
                r#"
[[class]]
path = "{case}"
"#
            );
            assert!(TokensConfig::from_str(&toml).is_err(), "Should reject: {case}");
        }
    }

    #[test]
    fn rejects_reserved_token_name() {
        let toml = r#"
[[class]]
path = "A"
tokens = ["PATH"]
"#;
        assert!(TokensConfig::from_str(toml).is_err());
    }

    #[test]
    fn on_remove_values() {
        let config = TokensConfig::from_str("").unwrap();
        assert_eq!(config.on_remove, OnRemove::Error);
        assert!(config.is_empty());

        let config = TokensConfig::from_str(r#"on_remove = "warn""#).unwrap();
        assert_eq!(config.on_remove, OnRemove::Warn);

        let err = TokensConfig::from_str(r#"on_remove = "invalid""#).unwrap_err();
        assert!(err.to_string().contains("invalid"));
    }
}
