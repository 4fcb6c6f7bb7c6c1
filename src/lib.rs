//! # Typed Singleton Tokens (bevy-token)
//!
//! Closed, hierarchical sets of named constants. Each token belongs to a
//! class in a tree of token classes, carries up to five values (name, int,
//! float, map, list) and is registered exactly once.
//!
//! ## Design
//!
//! A class is addressed by its path from the universal base (`Status.Error`).
//! Identity is the path itself; its [`ClassId`] is a hash of the path that
//! rejects most `is-a` checks with one masked comparison. Tokens rebuilt from
//! storage still classify correctly:
//!
//! ```ignore
//! use bevy_token::{Registry, RootOptions};
//!
//! let mut reg = Registry::new();
//! let status = reg.declare("Status")?;
//! reg.make_root(&status, RootOptions::DEFAULT)?;
//!
//! let error = reg.declare("Status.Error")?;
//! let user_error = reg.construct(&error, "USER_ERROR")?;
//!
//! assert!(status.includes(&user_error));
//! assert_eq!(reg.lookup_by_string(&status, "USER_ERROR")?, &user_error);
//! ```
//!
//! ## Scopes
//!
//! - **Local register** (class → name → token): names are unique per exact
//!   class; drives [`Registry::tokens`] and [`Registry::subclasses`].
//! - **Global string / int index**: owned by a root, shared by all of its
//!   descendants; drives [`Registry::lookup_by_string`] and
//!   [`Registry::lookup_by_int`].
//!
//! Each is resolved independently to the nearest ancestor that owns one.
//!
//! ## Compile-time hierarchies
//!
//! ```ignore
//! use bevy_token::{token_hierarchy, Registry};
//!
//! token_hierarchy! {
//!     pub mod StatusTokens {
//!         #[root]
//!         Status {
//!             Success { COMPLETED; PAUSED; }
//!             Error { MECHANICAL_ERROR; USER_ERROR; }
//!         }
//!     }
//! }
//!
//! let reg = Registry::from_definitions(StatusTokens::DEFINITIONS)?;
//! let token = reg.lookup_by_string(StatusTokens::Status::Class, "USER_ERROR")?;
//! assert_eq!(*token, StatusTokens::Status::Error::USER_ERROR);
//! ```

pub mod class;
pub mod error;
pub mod registry;
pub mod token;
pub mod traits;
pub mod value;

#[cfg(feature = "bevy")]
pub mod bevy;

pub use class::{includes, is_parent_token_class, is_subtoken_class, ClassId, ClassRef, TokenClass, MAX_DEPTH};
pub use error::{DuplicateScope, IndexKind, LookupKey, TokenError};
pub use registry::{Definition, Registry, RootOptions, TokenDef};
pub use token::{Token, TokenKey};
pub use traits::{AsClassRef, TokenClassDef};
pub use value::{Value, ValueBundle};

pub use bevy_token_macro::token_hierarchy;
