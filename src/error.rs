use std::fmt;

/// A key used to find a token in a register or global index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupKey {
    Str(String),
    Int(i64),
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Int(i) => write!(f, "#{i}"),
        }
    }
}

/// Kind of global index a root may own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexKind {
    String,
    Int,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Int => write!(f, "int"),
        }
    }
}

/// Where a duplicate token was detected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DuplicateScope {
    /// The local register of the exact class.
    Class,
    /// A root's global index.
    Index(IndexKind),
}

impl fmt::Display for DuplicateScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class => write!(f, "class register"),
            Self::Index(kind) => write!(f, "global {kind} index"),
        }
    }
}

/// Errors raised while defining or querying token hierarchies.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TokenError {
    /// A token was constructed without a string value.
    #[error("token of class `{class}` must have a string value")]
    MissingKey { class: String },

    /// The name (or int value) is already taken in scope.
    #[error("duplicate token {key} for `{class}` in the {scope}")]
    DuplicateToken {
        class: String,
        key: LookupKey,
        scope: DuplicateScope,
    },

    /// A global index has no entry for the key.
    #[error("no token with key {key} under `{class}`")]
    KeyNotFound { class: String, key: LookupKey },

    /// No global index of this kind is reachable from the class.
    #[error("`{class}` has no global {index} index (enable it with make_root)")]
    Configuration { class: String, index: IndexKind },

    #[error("invalid class path `{path}`: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// `make_root` was called after tokens were registered under the class.
    #[error("cannot make `{class}` a root: {count} token(s) already registered under it")]
    RootAfterTokens { class: String, count: usize },
}
