//! Class tags: path-derived identifiers with an intrinsic parent relation.
//!
//! Every token class is addressed by a dot-separated path from the universal
//! base (`Status.Error`). The [`ClassId`] packs the depth and one hashed lane
//! per path segment, so most `is-a` checks are rejected by a single masked
//! comparison without touching a registry.
//!
//! Lanes are lossy: two different paths can share an id. Identity is
//! therefore always the path; [`ClassRef::is_a`] and class equality use the
//! id as a pre-filter and confirm on the path.
//!
//! ## ClassId Layout (u128)
//!
//! ```text
//! ┌─────────┬─────────┬─────────┬─────────┬─────┬─────────┬────────┐
//! │ Depth   │ Lane 0  │ Lane 1  │ Lane 2  │ ... │ Lane 7  │ unused │
//! │ 4 bits  │ 15 bits │ 15 bits │ 15 bits │     │ 15 bits │ 4 bits │
//! │[127:124]│[123:109]│[108:94] │ [93:79] │     │ [18:4]  │ [3:0]  │
//! └─────────┴─────────┴─────────┴─────────┴─────┴─────────┴────────┘
//! ```
//!
//! Depth 0 is the universal base; declared classes have depth 1..=8.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::TokenError;
use crate::token::Token;
use crate::traits::AsClassRef;

/// Maximum class path length (segments below the universal base).
pub const MAX_DEPTH: usize = 8;

/// Bit position where the depth is stored (bits 127:124).
pub const DEPTH_SHIFT: u32 = 124;

/// Mask to extract the depth from a raw id.
pub const DEPTH_MASK: u128 = 0xF << DEPTH_SHIFT;

/// Width of one segment lane.
pub const LANE_BITS: u32 = 15;

const LANE_MASK: u128 = (1 << LANE_BITS) - 1;

/// Display name of the universal base class.
pub const BASE_NAME: &str = "Token";

/// FNV-1a 64-bit hash, usable in const context.
pub const fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(0x100000001b3);
        i += 1;
    }
    hash
}

/// Fold a segment hash into one lane. Never zero: an empty lane means
/// "no segment at this level".
const fn lane_hash(segment: &[u8]) -> u128 {
    let full = fnv1a_64(segment);
    let folded = full ^ (full >> 15) ^ (full >> 30) ^ (full >> 45);
    let lane = (folded as u128) & LANE_MASK;
    if lane == 0 { 1 } else { lane }
}

const fn lane_offset(level: usize) -> u32 {
    DEPTH_SHIFT - LANE_BITS * (level as u32 + 1)
}

/// Mask covering the lanes of the first `depth` levels.
const fn prefix_mask(depth: usize) -> u128 {
    if depth == 0 {
        return 0;
    }
    let width = LANE_BITS * depth as u32;
    ((1u128 << width) - 1) << (DEPTH_SHIFT - width)
}

/// Stable identifier of a token class, computed from its path alone.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u128);

impl ClassId {
    /// The universal base every class descends from.
    pub const BASE: ClassId = ClassId(0);

    /// Compute the id of the class at `segments` below the base.
    ///
    /// # Panics
    ///
    /// Panics (at compile time in const context) if `segments.len() > MAX_DEPTH`.
    pub const fn from_segments(segments: &[&[u8]]) -> ClassId {
        assert!(segments.len() <= MAX_DEPTH, "class path exceeds MAX_DEPTH (8)");

        let mut raw = (segments.len() as u128) << DEPTH_SHIFT;
        let mut i = 0;
        while i < segments.len() {
            raw |= lane_hash(segments[i]) << lane_offset(i);
            i += 1;
        }
        ClassId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u128 {
        self.0
    }

    /// Number of segments in the class path (0 for the base).
    #[inline]
    pub const fn depth(self) -> usize {
        ((self.0 & DEPTH_MASK) >> DEPTH_SHIFT) as usize
    }

    #[inline]
    pub const fn is_base(self) -> bool {
        self.0 == 0
    }

    /// The direct parent class, `None` for the base.
    pub const fn parent(self) -> Option<ClassId> {
        let depth = self.depth();
        if depth == 0 {
            return None;
        }
        let parent_depth = depth - 1;
        Some(ClassId(
            ((parent_depth as u128) << DEPTH_SHIFT) | (self.0 & prefix_mask(parent_depth)),
        ))
    }

    /// Lane-prefix test: whether `self` may equal `ancestor` or descend from it.
    ///
    /// Lanes collide, so `true` is only a candidate. [`ClassRef::is_a`]
    /// confirms on the path.
    #[inline]
    pub const fn is_a(self, ancestor: ClassId) -> bool {
        let depth = ancestor.depth();
        if depth > self.depth() {
            return false;
        }
        let mask = prefix_mask(depth);
        (self.0 & mask) == (ancestor.0 & mask)
    }

    /// This class followed by each ancestor, ending with the base.
    pub fn ancestors(self) -> impl Iterator<Item = ClassId> {
        std::iter::successors(Some(self), |id| id.parent())
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId(depth={}, {:#034x})", self.depth(), self.0)
    }
}

impl fmt::LowerHex for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// A borrowed class: its id plus its path.
///
/// This is what every class-taking query works with. Typed markers produce
/// one without allocating.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassRef<'a> {
    id: ClassId,
    path: &'a str,
}

impl<'a> ClassRef<'a> {
    /// The universal base.
    pub const BASE: ClassRef<'static> = ClassRef {
        id: ClassId::BASE,
        path: "",
    };

    /// Pair a path with its precomputed id. `id` must be the id of `path`.
    #[inline]
    pub const fn from_parts(id: ClassId, path: &'a str) -> Self {
        Self { id, path }
    }

    #[inline]
    pub const fn id(self) -> ClassId {
        self.id
    }

    #[inline]
    pub const fn path(self) -> &'a str {
        self.path
    }

    /// Last path segment, or `Token` for the base.
    pub fn name(self) -> &'a str {
        match self.path.rsplit('.').next() {
            Some(name) if !name.is_empty() => name,
            _ => BASE_NAME,
        }
    }

    #[inline]
    pub fn is_base(self) -> bool {
        self.path.is_empty()
    }

    pub fn parent(self) -> Option<ClassRef<'a>> {
        let id = self.id.parent()?;
        let path = match self.path.rfind('.') {
            Some(pos) => &self.path[..pos],
            None => "",
        };
        Some(Self { id, path })
    }

    /// This class followed by each ancestor, ending with the base.
    pub fn ancestors(self) -> impl Iterator<Item = ClassRef<'a>> {
        std::iter::successors(Some(self), |class| class.parent())
    }

    /// Whether `self` equals `ancestor` or descends from it.
    pub fn is_a(self, ancestor: ClassRef<'_>) -> bool {
        self.id.is_a(ancestor.id) && path_is_a(self.path, ancestor.path)
    }

    /// An owned copy.
    pub fn to_class(self) -> TokenClass {
        TokenClass {
            id: self.id,
            path: Arc::from(self.path),
        }
    }
}

fn path_is_a(path: &str, ancestor: &str) -> bool {
    ancestor.is_empty()
        || path
            .strip_prefix(ancestor)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

impl fmt::Display for ClassRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_base() {
            f.write_str(BASE_NAME)
        } else {
            f.write_str(self.path)
        }
    }
}

impl fmt::Debug for ClassRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassRef({self})")
    }
}

/// A token class: its id plus the path it was derived from.
///
/// Two `TokenClass` values built from the same path are equal, whether or
/// not they came from the same registry. Different paths never are, even
/// when their ids collide.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenClass {
    id: ClassId,
    path: Arc<str>,
}

impl TokenClass {
    /// Parse a dot-separated class path. The empty path is the base.
    pub fn new(path: impl AsRef<str>) -> Result<Self, TokenError> {
        let path = path.as_ref();
        let id = parse_path(path)?;
        Ok(Self {
            id,
            path: Arc::from(path),
        })
    }

    /// The universal base class.
    pub fn base() -> Self {
        Self {
            id: ClassId::BASE,
            path: Arc::from(""),
        }
    }

    #[inline]
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Full dot-separated path (empty for the base).
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn class_ref(&self) -> ClassRef<'_> {
        ClassRef::from_parts(self.id, &self.path)
    }

    /// Last path segment, or `Token` for the base.
    pub fn name(&self) -> &str {
        self.class_ref().name()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.id.depth()
    }

    #[inline]
    pub fn is_base(&self) -> bool {
        self.id.is_base()
    }

    /// The direct parent class, `None` for the base.
    pub fn parent(&self) -> Option<TokenClass> {
        self.class_ref().parent().map(ClassRef::to_class)
    }

    /// A direct subclass named `name`.
    pub fn child(&self, name: &str) -> Result<TokenClass, TokenError> {
        if self.is_base() {
            Self::new(name)
        } else {
            Self::new(format!("{}.{}", self.path, name))
        }
    }

    /// Whether `token` belongs to this class or one of its subclasses.
    #[inline]
    pub fn includes(&self, token: &Token) -> bool {
        includes(self, token)
    }

    /// Whether `other` is this class or one of its subclasses.
    #[inline]
    pub fn is_subtoken_class(&self, other: impl AsClassRef) -> bool {
        is_subtoken_class(self, other)
    }

    /// Whether `other` is this class or one of its ancestors.
    #[inline]
    pub fn is_parent_token_class(&self, other: impl AsClassRef) -> bool {
        is_parent_token_class(self, other)
    }
}

impl fmt::Display for TokenClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.class_ref(), f)
    }
}

impl fmt::Debug for TokenClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenClass({self})")
    }
}

impl TryFrom<String> for TokenClass {
    type Error = TokenError;

    fn try_from(path: String) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

impl From<TokenClass> for String {
    fn from(class: TokenClass) -> Self {
        class.path.to_string()
    }
}

fn parse_path(path: &str) -> Result<ClassId, TokenError> {
    if path.is_empty() {
        return Ok(ClassId::BASE);
    }

    let segments: Vec<&[u8]> = path.split('.').map(str::as_bytes).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(TokenError::InvalidPath {
            path: path.to_string(),
            reason: "empty segment",
        });
    }
    if segments.len() > MAX_DEPTH {
        return Err(TokenError::InvalidPath {
            path: path.to_string(),
            reason: "more than 8 segments",
        });
    }

    Ok(ClassId::from_segments(&segments))
}

/// Whether `token`'s class is `class` or descends from it.
#[inline]
pub fn includes(class: impl AsClassRef, token: &Token) -> bool {
    token.isof(class)
}

/// Whether `other` is `class` or one of its subclasses.
#[inline]
pub fn is_subtoken_class(class: impl AsClassRef, other: impl AsClassRef) -> bool {
    other.as_class_ref().is_a(class.as_class_ref())
}

/// Whether `other` is `class` or one of its ancestors.
#[inline]
pub fn is_parent_token_class(class: impl AsClassRef, other: impl AsClassRef) -> bool {
    class.as_class_ref().is_a(other.as_class_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(path: &str) -> ClassId {
        TokenClass::new(path).unwrap().id()
    }

    #[test]
    fn fnv_basic_sanity() {
        assert_ne!(fnv1a_64(b"Status"), fnv1a_64(b"Error"));
        assert_eq!(fnv1a_64(b"Status"), fnv1a_64(b"Status"));
    }

    #[test]
    fn lane_hash_never_zero() {
        for input in [b"a" as &[u8], b"b", b"EQ", b"Status", b"Comparison", b""] {
            assert_ne!(lane_hash(input), 0, "got 0 for {:?}", input);
        }
    }

    #[test]
    fn depth_is_embedded() {
        assert_eq!(ClassId::BASE.depth(), 0);
        assert_eq!(id("Status").depth(), 1);
        assert_eq!(id("Status.Error").depth(), 2);
        assert_eq!(id("A.B.C.D.E.F.G.H").depth(), 8);
    }

    #[test]
    fn parent_clears_deepest_lane() {
        assert_eq!(id("Status.Error").parent(), Some(id("Status")));
        assert_eq!(id("Status").parent(), Some(ClassId::BASE));
        assert_eq!(ClassId::BASE.parent(), None);
    }

    #[test]
    fn ancestors_walk_to_base() {
        let chain: Vec<ClassId> = id("A.B.C").ancestors().collect();
        assert_eq!(chain, vec![id("A.B.C"), id("A.B"), id("A"), ClassId::BASE]);
    }

    #[test]
    fn is_a_follows_paths() {
        let status = id("Status");
        let success = id("Status.Success");
        let error = id("Status.Error");

        assert!(success.is_a(status));
        assert!(error.is_a(status));
        assert!(status.is_a(status));
        assert!(!status.is_a(success));
        assert!(!success.is_a(error));

        // Everything is a base token.
        assert!(status.is_a(ClassId::BASE));
        assert!(ClassId::BASE.is_a(ClassId::BASE));
        assert!(!ClassId::BASE.is_a(status));
    }

    #[test]
    fn same_name_under_different_parents_differs() {
        assert_ne!(id("Http.Error"), id("Io.Error"));
        assert!(!id("Http.Error").is_a(id("Io")));
    }

    #[test]
    fn const_and_runtime_ids_agree() {
        const SEGS: [&[u8]; 2] = [b"Status", b"Error"];
        const STATUS_ERROR: ClassId = ClassId::from_segments(&SEGS);
        assert_eq!(STATUS_ERROR, id("Status.Error"));
    }

    #[test]
    fn token_class_names_and_parents() {
        let class = TokenClass::new("Comparison.Existence").unwrap();
        assert_eq!(class.name(), "Existence");
        assert_eq!(class.path(), "Comparison.Existence");
        assert_eq!(class.parent().unwrap().path(), "Comparison");
        assert!(class.parent().unwrap().parent().unwrap().is_base());

        assert_eq!(TokenClass::base().name(), "Token");
        assert_eq!(TokenClass::base().to_string(), "Token");
        assert!(TokenClass::new("").unwrap().is_base());
    }

    #[test]
    fn child_extends_path() {
        let status = TokenClass::new("Status").unwrap();
        assert_eq!(status.child("Error").unwrap(), TokenClass::new("Status.Error").unwrap());
        assert_eq!(TokenClass::base().child("Status").unwrap(), status);
    }

    #[test]
    fn structural_relations() {
        let status = TokenClass::new("Status").unwrap();
        let error = TokenClass::new("Status.Error").unwrap();

        assert!(status.is_subtoken_class(&error));
        assert!(!error.is_subtoken_class(&status));
        assert!(error.is_parent_token_class(&status));
        assert!(!status.is_parent_token_class(&error));

        // Reflexive, like class inheritance.
        assert!(status.is_subtoken_class(&status));
        assert!(status.is_parent_token_class(&status));
    }

    // "C55" and "C84" fold into the same 15-bit lane.
    #[test]
    fn colliding_ids_stay_distinct_classes() {
        let c55 = TokenClass::new("C55").unwrap();
        let c84 = TokenClass::new("C84").unwrap();
        assert_eq!(c55.id(), c84.id());

        assert_ne!(c55, c84);
        assert!(!c55.is_subtoken_class(&c84));
        assert!(!c84.is_parent_token_class(&c55));
        assert!(c55.is_subtoken_class(&c55));

        let nested = TokenClass::new("C55.Inner").unwrap();
        assert!(c55.is_subtoken_class(&nested));
        assert!(!c84.is_subtoken_class(&nested));
    }

    #[test]
    fn path_prefix_needs_a_segment_boundary() {
        let status = TokenClass::new("Status").unwrap();
        let statuses = TokenClass::new("Statuses.Error").unwrap();
        assert!(!status.is_subtoken_class(&statuses));
        assert!(TokenClass::base().is_subtoken_class(&statuses));
    }

    #[test]
    fn class_ref_walks_ancestors() {
        let class = TokenClass::new("A.B.C").unwrap();
        let paths: Vec<&str> = class.class_ref().ancestors().map(ClassRef::path).collect();
        assert_eq!(paths, vec!["A.B.C", "A.B", "A", ""]);
        assert_eq!(ClassRef::BASE.to_string(), "Token");
        assert_eq!(class.class_ref().to_class(), class);
    }

    #[test]
    fn rejects_invalid_paths() {
        for path in [".A", "A.", "A..B", "A.B.C.D.E.F.G.H.I"] {
            assert!(
                matches!(TokenClass::new(path), Err(TokenError::InvalidPath { .. })),
                "should reject {path}"
            );
        }
    }
}
