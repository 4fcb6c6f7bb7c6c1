//! Token registry: scoped local registers and global indexes.
//!
//! A [`Registry`] owns everything a hierarchy of tokens needs at runtime:
//!
//! - the declared classes, keyed by path
//! - one **local register** per scope: class → (name → token), in insertion order
//! - optional **global string / int indexes** per root, shared by every
//!   descendant class
//!
//! Scopes are resolved by walking up the class path. The universal base
//! always owns a local register; [`Registry::make_root`] gives a class its own
//! register and, per [`RootOptions`], its own global indexes. Each of the
//! three is resolved independently to the nearest ancestor that owns one.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::class::{ClassRef, TokenClass};
use crate::error::{DuplicateScope, IndexKind, LookupKey, TokenError};
use crate::token::{Token, TokenKey};
use crate::traits::AsClassRef;
use crate::value::ValueBundle;

/// Which global indexes a root owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RootOptions {
    /// Names must be unique across the whole hierarchy and are looked up by string.
    pub string_index: bool,
    /// Int values must be unique across the whole hierarchy and are looked up by int.
    pub int_index: bool,
}

impl RootOptions {
    /// String index on, int index off.
    pub const DEFAULT: Self = Self::new(true, false);

    pub const fn new(string_index: bool, int_index: bool) -> Self {
        Self {
            string_index,
            int_index,
        }
    }
}

impl Default for RootOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Definition of one token (used for registry building from macro).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TokenDef {
    pub class: &'static str,
    pub name: &'static str,
    pub int: Option<i64>,
    pub float: Option<f64>,
}

impl TokenDef {
    pub const fn new(class: &'static str, name: &'static str) -> Self {
        Self {
            class,
            name,
            int: None,
            float: None,
        }
    }

    pub const fn with_int(mut self, int: i64) -> Self {
        self.int = Some(int);
        self
    }

    pub const fn with_float(mut self, float: f64) -> Self {
        self.float = Some(float);
        self
    }

    fn bundle(&self) -> ValueBundle {
        ValueBundle::new(Some(self.name.to_string()), self.int, self.float, None, None)
    }
}

/// One step of a hierarchy definition table, applied in order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Definition {
    /// Declare a class; `root` makes it a namespace root.
    Class {
        path: &'static str,
        root: Option<RootOptions>,
    },
    /// Construct and register a token.
    Token(TokenDef),
}

/// Tokens of one exact class, in insertion order.
#[derive(Clone, Debug)]
struct ClassRegister {
    class: TokenClass,
    tokens: IndexMap<String, Token>,
}

/// Class registers of one scope keyed by class path, in order of each
/// class's first token.
type LocalRegister = IndexMap<String, ClassRegister>;

/// Owned registry of token classes, tokens and their indexes.
///
/// Every map is keyed by class path.
#[derive(Clone, Debug)]
pub struct Registry {
    classes: IndexMap<String, TokenClass>,
    registers: HashMap<String, LocalRegister>,
    string_indexes: HashMap<String, IndexMap<String, Token>>,
    int_indexes: HashMap<String, IndexMap<i64, Token>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        let mut classes = IndexMap::new();
        classes.insert(String::new(), TokenClass::base());

        let mut registers = HashMap::new();
        registers.insert(String::new(), LocalRegister::new());

        Self {
            classes,
            registers,
            string_indexes: HashMap::new(),
            int_indexes: HashMap::new(),
        }
    }

    /// Build a registry from a definition table (from macro).
    pub fn from_definitions(defs: &[Definition]) -> Result<Self, TokenError> {
        let mut registry = Self::new();
        registry.install(defs)?;
        Ok(registry)
    }

    /// Apply a definition table in order, stopping at the first error.
    pub fn install(&mut self, defs: &[Definition]) -> Result<(), TokenError> {
        for def in defs {
            match def {
                Definition::Class { path, root } => {
                    let class = self.declare(path)?;
                    if let Some(options) = root {
                        self.make_root(&class, *options)?;
                    }
                }
                Definition::Token(token) => {
                    let class = self.declare(token.class)?;
                    self.construct(&class, token.bundle())?;
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Classes
    // =========================================================================

    /// Declare a class by path. Missing ancestors are declared too.
    ///
    /// Declaring an existing class is a no-op that returns it again.
    pub fn declare(&mut self, path: &str) -> Result<TokenClass, TokenError> {
        let class = TokenClass::new(path)?;
        self.declare_class(&class);
        Ok(class)
    }

    fn declare_class(&mut self, class: &TokenClass) {
        let missing: Vec<ClassRef<'_>> = class
            .class_ref()
            .ancestors()
            .take_while(|candidate| !self.classes.contains_key(candidate.path()))
            .collect();

        // Root-most first, the class itself last.
        for candidate in missing.into_iter().rev() {
            debug!(class = %candidate, "declared token class");
            self.classes.insert(candidate.path().to_string(), candidate.to_class());
        }
    }

    /// A declared class by path.
    pub fn class(&self, path: &str) -> Option<&TokenClass> {
        self.classes.get(path)
    }

    /// All declared classes (the base first), in declaration order.
    pub fn classes(&self) -> impl Iterator<Item = &TokenClass> {
        self.classes.values()
    }

    /// Whether `class` owns its own local register.
    pub fn is_root(&self, class: impl AsClassRef) -> bool {
        self.registers.contains_key(class.as_class_ref().path())
    }

    /// Make `class` a namespace root.
    ///
    /// The class gets a fresh local register (isolating per-hierarchy
    /// enumeration) and, per `options`, fresh global indexes shared by all of
    /// its descendants.
    ///
    /// Must happen before any token of the class or its descendants is
    /// constructed, in any scope (nested roots included); a late call fails
    /// with [`TokenError::RootAfterTokens`] instead of silently orphaning
    /// those tokens from the indexes it would replace.
    ///
    /// The universal base may be made a root too, giving unrooted
    /// hierarchies shared indexes.
    pub fn make_root(&mut self, class: &TokenClass, options: RootOptions) -> Result<(), TokenError> {
        let count: usize = self
            .registers
            .values()
            .flat_map(|scope| scope.values())
            .filter(|register| register.class.class_ref().is_a(class.class_ref()))
            .map(|register| register.tokens.len())
            .sum();
        if count > 0 {
            return Err(TokenError::RootAfterTokens {
                class: class.to_string(),
                count,
            });
        }

        self.declare_class(class);
        let path = class.path();

        self.registers.insert(path.to_string(), LocalRegister::new());
        if options.string_index {
            self.string_indexes.insert(path.to_string(), IndexMap::new());
        } else {
            self.string_indexes.remove(path);
        }
        if options.int_index {
            self.int_indexes.insert(path.to_string(), IndexMap::new());
        } else {
            self.int_indexes.remove(path);
        }

        debug!(
            class = %class,
            string_index = options.string_index,
            int_index = options.int_index,
            "made token root"
        );
        Ok(())
    }

    // =========================================================================
    // Construction
    // =========================================================================

    /// Construct and register a token of `class`.
    ///
    /// `value` is either an explicit [`ValueBundle`] or anything convertible
    /// into one (`"NAME"`, `("NAME", 3)`). Every uniqueness constraint (the
    /// exact class's register, then the reachable global indexes) is checked
    /// before anything is inserted, so a failed construction leaves the
    /// registry unchanged.
    pub fn construct(
        &mut self,
        class: &TokenClass,
        value: impl Into<ValueBundle>,
    ) -> Result<Token, TokenError> {
        let token = Token::rehydrate(class.clone(), value.into())?;
        let class_ref = class.class_ref();
        let name = token.name();

        let register_owner = owner(&self.registers, class_ref).unwrap_or(ClassRef::BASE);
        let taken = self
            .registers
            .get(register_owner.path())
            .and_then(|scope| scope.get(class.path()))
            .is_some_and(|register| register.tokens.contains_key(name));
        if taken {
            return Err(duplicate(class_ref, LookupKey::Str(name.to_string()), DuplicateScope::Class));
        }

        let string_owner = owner(&self.string_indexes, class_ref);
        if let Some(index_owner) = string_owner
            && self.string_indexes[index_owner.path()].contains_key(name)
        {
            return Err(duplicate(
                class_ref,
                LookupKey::Str(name.to_string()),
                DuplicateScope::Index(IndexKind::String),
            ));
        }

        let int_owner = token
            .int()
            .and_then(|int| owner(&self.int_indexes, class_ref).map(|index_owner| (index_owner, int)));
        if let Some((index_owner, int)) = int_owner
            && self.int_indexes[index_owner.path()].contains_key(&int)
        {
            return Err(duplicate(class_ref, LookupKey::Int(int), DuplicateScope::Index(IndexKind::Int)));
        }

        // All checks passed; commit.
        self.declare_class(class);
        self.registers
            .entry(register_owner.path().to_string())
            .or_default()
            .entry(class.path().to_string())
            .or_insert_with(|| ClassRegister {
                class: class.clone(),
                tokens: IndexMap::new(),
            })
            .tokens
            .insert(name.to_string(), token.clone());

        if let Some(index_owner) = string_owner
            && let Some(index) = self.string_indexes.get_mut(index_owner.path())
        {
            index.insert(name.to_string(), token.clone());
        }
        if let Some((index_owner, int)) = int_owner
            && let Some(index) = self.int_indexes.get_mut(index_owner.path())
        {
            index.insert(int, token.clone());
        }

        debug!(class = %class, token = %token, int = ?token.int(), "registered token");
        Ok(token)
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Token with name `key` in the global string index reachable from `class`.
    pub fn lookup_by_string(&self, class: impl AsClassRef, key: &str) -> Result<&Token, TokenError> {
        let class = class.as_class_ref();
        self.try_lookup_by_string(class, key)?
            .ok_or_else(|| TokenError::KeyNotFound {
                class: class.to_string(),
                key: LookupKey::Str(key.to_string()),
            })
    }

    /// Like [`lookup_by_string`](Self::lookup_by_string), but a missing key is `Ok(None)`.
    ///
    /// A class without a reachable string index is still an error.
    pub fn try_lookup_by_string(
        &self,
        class: impl AsClassRef,
        key: &str,
    ) -> Result<Option<&Token>, TokenError> {
        let class = class.as_class_ref();
        let index = owner(&self.string_indexes, class)
            .and_then(|index_owner| self.string_indexes.get(index_owner.path()))
            .ok_or_else(|| TokenError::Configuration {
                class: class.to_string(),
                index: IndexKind::String,
            })?;

        let found = index.get(key);
        if found.is_none() {
            trace!(class = %class, key, "string lookup missed");
        }
        Ok(found)
    }

    /// Token with int value `key` in the global int index reachable from `class`.
    pub fn lookup_by_int(&self, class: impl AsClassRef, key: i64) -> Result<&Token, TokenError> {
        let class = class.as_class_ref();
        self.try_lookup_by_int(class, key)?
            .ok_or_else(|| TokenError::KeyNotFound {
                class: class.to_string(),
                key: LookupKey::Int(key),
            })
    }

    /// Like [`lookup_by_int`](Self::lookup_by_int), but a missing key is `Ok(None)`.
    pub fn try_lookup_by_int(
        &self,
        class: impl AsClassRef,
        key: i64,
    ) -> Result<Option<&Token>, TokenError> {
        let class = class.as_class_ref();
        let index = owner(&self.int_indexes, class)
            .and_then(|index_owner| self.int_indexes.get(index_owner.path()))
            .ok_or_else(|| TokenError::Configuration {
                class: class.to_string(),
                index: IndexKind::Int,
            })?;

        let found = index.get(&key);
        if found.is_none() {
            trace!(class = %class, key, "int lookup missed");
        }
        Ok(found)
    }

    /// The registered token a compile-time key refers to.
    pub fn get(&self, key: &TokenKey) -> Option<&Token> {
        self.registered(key.class(), key.name())
            .filter(|token| **token == *key)
    }

    /// The registered instance equal to `token`, e.g. one rebuilt from storage.
    pub fn canonical(&self, token: &Token) -> Option<&Token> {
        self.registered(token.class().class_ref(), token.name())
            .filter(|registered| *registered == token)
    }

    fn registered(&self, class: ClassRef<'_>, name: &str) -> Option<&Token> {
        let register_owner = owner(&self.registers, class)?;
        self.registers
            .get(register_owner.path())?
            .get(class.path())?
            .tokens
            .get(name)
    }

    // =========================================================================
    // Enumeration
    // =========================================================================

    /// Registers of `class` and its descendants within the scope `class` resolves to.
    fn scoped_registers(&self, class: ClassRef<'_>) -> impl Iterator<Item = &ClassRegister> {
        owner(&self.registers, class)
            .and_then(|register_owner| self.registers.get(register_owner.path()))
            .into_iter()
            .flat_map(|scope| scope.values())
            .filter(move |register| register.class.class_ref().is_a(class))
    }

    /// `class` and its subclasses that have at least one token, in order of
    /// each class's first token.
    ///
    /// Classes without tokens never appear, even when declared.
    pub fn subclasses(&self, class: impl AsClassRef) -> Vec<&TokenClass> {
        self.scoped_registers(class.as_class_ref())
            .map(|register| &register.class)
            .collect()
    }

    /// Names of [`subclasses`](Self::subclasses).
    pub fn subclass_names(&self, class: impl AsClassRef) -> Vec<&str> {
        self.scoped_registers(class.as_class_ref())
            .map(|register| register.class.name())
            .collect()
    }

    /// All tokens of `class` and its subclasses, grouped by class in order of
    /// each class's first token, each group in construction order.
    ///
    /// Names are only unique per exact class, so the same name may appear twice.
    pub fn tokens(&self, class: impl AsClassRef) -> Vec<&Token> {
        self.scoped_registers(class.as_class_ref())
            .flat_map(|register| register.tokens.values())
            .collect()
    }

    /// Names of [`tokens`](Self::tokens).
    pub fn token_names(&self, class: impl AsClassRef) -> Vec<&str> {
        self.scoped_registers(class.as_class_ref())
            .flat_map(|register| register.tokens.values())
            .map(Token::name)
            .collect()
    }

    /// Total number of registered tokens.
    pub fn len(&self) -> usize {
        self.registers
            .values()
            .flat_map(|scope| scope.values())
            .map(|register| register.tokens.len())
            .sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn duplicate(class: ClassRef<'_>, key: LookupKey, scope: DuplicateScope) -> TokenError {
    TokenError::DuplicateToken {
        class: class.to_string(),
        key,
        scope,
    }
}

/// Nearest class in `class`'s ancestry (itself included) that owns an entry.
fn owner<'c, T>(map: &HashMap<String, T>, class: ClassRef<'c>) -> Option<ClassRef<'c>> {
    class.ancestors().find(|candidate| map.contains_key(candidate.path()))
}

// =============================================================================
// Tests
// =============================================================================
