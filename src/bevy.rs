//! Bevy integration for token hierarchies.
//!
//! Provides:
//! - `TokenPlugin`: installs a [`TokenRegistry`] resource built from a definition table
//! - `TokenSet`: per-entity set of tokens with hierarchy-aware queries
//!
//! # Example
//!
//! ```ignore
//! use bevy::prelude::*;
//! use bevy_token::bevy::*;
//! use bevy_token::token_hierarchy;
//!
//! token_hierarchy! {
//!     pub mod StatusTokens {
//!         #[root]
//!         Status {
//!             Success { COMPLETED; }
//!             Error { USER_ERROR; }
//!         }
//!     }
//! }
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(TokenPlugin::from_definitions(StatusTokens::DEFINITIONS))
//!         .add_systems(Startup, spawn_jobs)
//!         .run();
//! }
//!
//! fn spawn_jobs(mut commands: Commands, registry: Res<TokenRegistry>) {
//!     let completed = registry.get(&StatusTokens::Status::Success::COMPLETED).cloned();
//!     commands.spawn(TokenSet::from_iter(completed));
//! }
//! ```

use bevy::prelude::*;
use std::collections::HashSet;
use std::ops::{Deref, DerefMut};

use crate::registry::{Definition, Registry};
use crate::token::{Token, TokenKey};
use crate::traits::AsClassRef;

// =============================================================================
// Plugin
// =============================================================================

/// Bevy plugin that inserts a [`TokenRegistry`] resource.
///
/// ```ignore
/// App::new().add_plugins(TokenPlugin::from_definitions(StatusTokens::DEFINITIONS))
/// ```
#[derive(Default)]
pub struct TokenPlugin {
    definitions: Option<&'static [Definition]>,
}

impl TokenPlugin {
    /// A plugin with an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a plugin from a static definition table (from `token_hierarchy!` macro).
    pub fn from_definitions(definitions: &'static [Definition]) -> Self {
        Self {
            definitions: Some(definitions),
        }
    }
}

impl Plugin for TokenPlugin {
    fn build(&self, app: &mut App) {
        // A broken hierarchy is a programming error: fail at startup.
        let registry = match self.definitions {
            Some(defs) => Registry::from_definitions(defs)
                .unwrap_or_else(|err| panic!("failed to build token registry: {err}")),
            None => Registry::new(),
        };

        app.insert_resource(TokenRegistry(registry));
    }
}

/// The token [`Registry`] as an ECS resource.
///
/// Mutation goes through `ResMut<TokenRegistry>`, so the scheduler provides
/// the exclusive access the registry needs.
#[derive(Resource, Clone, Debug, Default)]
pub struct TokenRegistry(pub Registry);

impl Deref for TokenRegistry {
    type Target = Registry;

    fn deref(&self) -> &Registry {
        &self.0
    }
}

impl DerefMut for TokenRegistry {
    fn deref_mut(&mut self) -> &mut Registry {
        &mut self.0
    }
}

// =============================================================================
// TokenSet Component
// =============================================================================

/// A set of tokens attached to an entity.
///
/// # Example
///
/// ```ignore
/// fn system(query: Query<&TokenSet>) {
///     for set in query.iter() {
///         if set.has_key(&StatusTokens::Status::Error::USER_ERROR) {
///             // entity failed on user input
///         }
///         if set.has_member_of(StatusTokens::Status::Error::Class) {
///             // entity failed somehow
///         }
///     }
/// }
/// ```
#[derive(Component, Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenSet {
    tokens: HashSet<Token>,
}

impl TokenSet {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: add a token and return self.
    #[inline]
    pub fn with(mut self, token: Token) -> Self {
        self.tokens.insert(token);
        self
    }

    /// Returns `true` if the token was newly inserted.
    #[inline]
    pub fn insert(&mut self, token: Token) -> bool {
        self.tokens.insert(token)
    }

    /// Returns `true` if the token was present.
    #[inline]
    pub fn remove(&mut self, token: &Token) -> bool {
        self.tokens.remove(token)
    }

    #[inline]
    pub fn has(&self, token: &Token) -> bool {
        self.tokens.contains(token)
    }

    /// Check against a compile-time key (O(n)).
    pub fn has_key(&self, key: &TokenKey) -> bool {
        self.tokens.iter().any(|token| token == key)
    }

    /// Whether any token belongs to `class` or one of its subclasses (O(n)).
    pub fn has_member_of(&self, class: impl AsClassRef) -> bool {
        let class = class.as_class_ref();
        self.tokens.iter().any(|token| token.isof(class))
    }

    /// Tokens that belong to `class` or one of its subclasses.
    pub fn members_of(&self, class: impl AsClassRef) -> impl Iterator<Item = &Token> + '_ {
        let class = class.as_class_ref().to_class();
        self.tokens.iter().filter(move |token| token.isof(&class))
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Token> + '_ {
        self.tokens.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.tokens.clear();
    }
}

impl FromIterator<Token> for TokenSet {
    fn from_iter<T: IntoIterator<Item = Token>>(iter: T) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}

impl Extend<Token> for TokenSet {
    fn extend<T: IntoIterator<Item = Token>>(&mut self, iter: T) {
        self.tokens.extend(iter);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{ClassRef, TokenClass};
    use crate::registry::{RootOptions, TokenDef};

    fn token(class: &str, name: &str) -> Token {
        Token::rehydrate(TokenClass::new(class).unwrap(), name.into()).unwrap()
    }

    #[test]
    fn token_set_builder() {
        let set = TokenSet::new()
            .with(token("Status.Success", "COMPLETED"))
            .with(token("Status.Error", "USER_ERROR"));

        assert_eq!(set.len(), 2);
        assert!(set.has(&token("Status.Success", "COMPLETED")));
        assert!(!set.has(&token("Status.Error", "COMPLETED")));
    }

    #[test]
    fn token_set_insert_remove() {
        let mut set = TokenSet::new();
        let completed = token("Status.Success", "COMPLETED");

        assert!(set.insert(completed.clone()));
        assert!(!set.insert(completed.clone())); // duplicate
        assert!(set.remove(&completed));
        assert!(!set.remove(&completed)); // already removed
        assert!(set.is_empty());
    }

    #[test]
    fn token_set_hierarchy_queries() {
        let status = TokenClass::new("Status").unwrap();
        let error = TokenClass::new("Status.Error").unwrap();
        let set: TokenSet = [
            token("Status.Success", "COMPLETED"),
            token("Status.Error", "USER_ERROR"),
            token("Queue", "EMPTY"),
        ]
        .into_iter()
        .collect();

        assert!(set.has_member_of(&error));
        assert_eq!(set.members_of(&status).count(), 2);
        assert_eq!(set.members_of(&error).count(), 1);
        assert!(!set.has_member_of(&TokenClass::new("LogEvent").unwrap()));

        let key = TokenKey::new(ClassRef::from_parts(error.id(), "Status.Error"), "USER_ERROR", None);
        assert!(set.has_key(&key));
    }

    #[test]
    fn token_set_extend_and_clear() {
        let mut set = TokenSet::new().with(token("A", "X"));
        set.extend([token("A", "Y"), token("A", "Z")]);
        assert_eq!(set.len(), 3);
        set.clear();
        assert!(set.is_empty());
    }

    #[test]
    fn plugin_inserts_registry() {
        const DEFS: &[Definition] = &[
            Definition::Class {
                path: "Status",
                root: Some(RootOptions::DEFAULT),
            },
            Definition::Token(TokenDef::new("Status", "OK")),
        ];

        let mut app = App::new();
        app.add_plugins(TokenPlugin::from_definitions(DEFS));

        let registry = app.world().resource::<TokenRegistry>();
        let status = TokenClass::new("Status").unwrap();
        assert_eq!(registry.lookup_by_string(&status, "OK").unwrap().name(), "OK");
    }

    #[test]
    #[should_panic(expected = "failed to build token registry")]
    fn plugin_panics_on_broken_definitions() {
        const DEFS: &[Definition] = &[
            Definition::Token(TokenDef::new("Status", "OK")),
            Definition::Token(TokenDef::new("Status", "OK")),
        ];

        App::new().add_plugins(TokenPlugin::from_definitions(DEFS));
    }
}
