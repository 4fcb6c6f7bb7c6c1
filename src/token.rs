//! Tokens: immutable, classified named constants.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::class::{ClassRef, TokenClass};
use crate::error::TokenError;
use crate::traits::AsClassRef;
use crate::value::{Value, ValueBundle};

/// An immutable token: a class plus a shared value bundle.
///
/// Equality and hashing use the `(class path, name, int)` triple, never the
/// address of the bundle, so a token rebuilt from external storage compares
/// equal to the registered original.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "TokenRepr", into = "TokenRepr")]
pub struct Token {
    class: TokenClass,
    value: Arc<ValueBundle>,
}

impl Token {
    /// Rebuild a token outside of any registry.
    ///
    /// Nothing is registered; use [`Registry::canonical`](crate::Registry::canonical)
    /// to find the registered instance it stands for.
    pub fn rehydrate(class: TokenClass, value: ValueBundle) -> Result<Self, TokenError> {
        if value.string_value().is_none() {
            return Err(TokenError::MissingKey {
                class: class.to_string(),
            });
        }
        Ok(Self {
            class,
            value: Arc::new(value),
        })
    }

    #[inline]
    pub fn class(&self) -> &TokenClass {
        &self.class
    }

    /// The class name (last path segment).
    #[inline]
    pub fn type_name(&self) -> &str {
        self.class.name()
    }

    /// The token's name, its string value.
    #[inline]
    pub fn name(&self) -> &str {
        self.value.string_value().unwrap_or_default()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.name().as_bytes()
    }

    #[inline]
    pub fn int(&self) -> Option<i64> {
        self.value.int_value()
    }

    #[inline]
    pub fn float(&self) -> Option<f64> {
        self.value.float_value()
    }

    #[inline]
    pub fn map(&self) -> Option<&IndexMap<String, Value>> {
        self.value.map_value()
    }

    #[inline]
    pub fn list(&self) -> Option<&[Value]> {
        self.value.list_value()
    }

    /// The whole value bundle.
    #[inline]
    pub fn value(&self) -> &ValueBundle {
        &self.value
    }

    /// Whether this token belongs to `class` or one of its subclasses.
    #[inline]
    pub fn isof(&self, class: impl AsClassRef) -> bool {
        self.class.class_ref().is_a(class.as_class_ref())
    }

    /// The key triple of this token.
    fn key(&self) -> (ClassRef<'_>, &str, Option<i64>) {
        (self.class.class_ref(), self.name(), self.int())
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialEq<TokenKey> for Token {
    fn eq(&self, other: &TokenKey) -> bool {
        self.key() == (other.class, other.name, other.int)
    }
}

impl PartialEq<Token> for TokenKey {
    fn eq(&self, other: &Token) -> bool {
        other == self
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(val={:?})", self.type_name(), self.value)
    }
}

#[derive(Serialize, Deserialize)]
struct TokenRepr {
    class: TokenClass,
    #[serde(flatten)]
    value: ValueBundle,
}

impl TryFrom<TokenRepr> for Token {
    type Error = TokenError;

    fn try_from(repr: TokenRepr) -> Result<Self, Self::Error> {
        Token::rehydrate(repr.class, repr.value)
    }
}

impl From<Token> for TokenRepr {
    fn from(token: Token) -> Self {
        Self {
            class: token.class,
            value: Arc::unwrap_or_clone(token.value),
        }
    }
}

/// A compile-time handle that compares equal to the token it names.
///
/// Generated hierarchies expose one `TokenKey` per token, so call sites can
/// write `status == Status::Error::USER_ERROR` without touching a registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TokenKey {
    class: ClassRef<'static>,
    name: &'static str,
    int: Option<i64>,
}

impl TokenKey {
    pub const fn new(class: ClassRef<'static>, name: &'static str, int: Option<i64>) -> Self {
        Self { class, name, int }
    }

    #[inline]
    pub const fn class(&self) -> ClassRef<'static> {
        self.class
    }

    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub const fn int(&self) -> Option<i64> {
        self.int
    }

    #[inline]
    pub fn isof(&self, class: impl AsClassRef) -> bool {
        self.class.is_a(class.as_class_ref())
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
