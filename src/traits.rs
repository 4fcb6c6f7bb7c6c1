//! Typed class markers.

use crate::class::{ClassId, ClassRef, TokenClass};

/// A token class known at compile time.
///
/// Implemented by the `Class` marker that `token_hierarchy!` generates for
/// every class module.
pub trait TokenClassDef {
    /// Full dot-separated path.
    const PATH: &'static str;
    /// Id derived from `PATH`.
    const ID: ClassId;

    fn token_class() -> TokenClass {
        ClassRef::from_parts(Self::ID, Self::PATH).to_class()
    }
}

/// Anything that names a class: `TokenClass` values, borrowed `ClassRef`s,
/// or typed markers.
pub trait AsClassRef {
    fn as_class_ref(&self) -> ClassRef<'_>;
}

impl AsClassRef for ClassRef<'_> {
    #[inline]
    fn as_class_ref(&self) -> ClassRef<'_> {
        *self
    }
}

impl AsClassRef for TokenClass {
    #[inline]
    fn as_class_ref(&self) -> ClassRef<'_> {
        self.class_ref()
    }
}

impl AsClassRef for &TokenClass {
    #[inline]
    fn as_class_ref(&self) -> ClassRef<'_> {
        self.class_ref()
    }
}

impl<T: TokenClassDef> AsClassRef for T {
    #[inline]
    fn as_class_ref(&self) -> ClassRef<'_> {
        ClassRef::from_parts(T::ID, T::PATH)
    }
}
