#![forbid(unsafe_code)]

//! Stable identities and content equality for list models.
//!
//! Every model that can populate a row or a section declares an [`Identity`]:
//! a string that stays the same for the same logical entity across refreshes
//! and differs between any two entities displayed at the same time. Two
//! entries with the same identity are "the same item" even when their other
//! fields differ; that difference is a content update, not a delete + insert.
//!
//! Content equality is supplied separately per model type through
//! [`Equality`], so identity and equality stay independent.
//!
//! # Invariants
//!
//! 1. `Identifiable::identity` is pure: repeated calls return equal identities.
//! 2. Section identities are unique across a snapshot; row identities are
//!    unique across all rows of a snapshot.
//! 3. [`Equality::Unknown`] reports every pair as changed.
//!
//! # Failure Modes
//!
//! - Duplicate identities are a caller error. Snapshots resolve them with
//!   last-write-wins (see [`crate::snapshot`]) instead of failing.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Stable identity of a row or section.
///
/// Cloning is a reference-count bump; the string itself is immutable.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(Arc<str>);

impl Identity {
    /// Create an identity from any string-like value.
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// Borrow the identity string.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl From<&String> for Identity {
    fn from(value: &String) -> Self {
        Self::new(value)
    }
}

impl Borrow<str> for Identity {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A model that can back a row or a section.
///
/// # Example
///
/// ```
/// use rowkit_core::identity::{Identifiable, Identity};
///
/// struct Article {
///     slug: String,
///     title: String,
/// }
///
/// impl Identifiable for Article {
///     fn identity(&self) -> Identity {
///         Identity::from(&self.slug)
///     }
/// }
///
/// let a = Article { slug: "rust-2024".into(), title: "Old".into() };
/// let b = Article { slug: "rust-2024".into(), title: "New".into() };
/// assert_eq!(a.identity(), b.identity());
/// ```
pub trait Identifiable {
    /// The stable identity of this model.
    ///
    /// Must be side-effect free and return equal values for the same logical
    /// entity across calls and across refreshes.
    fn identity(&self) -> Identity;
}

impl Identifiable for Identity {
    fn identity(&self) -> Identity {
        self.clone()
    }
}

impl Identifiable for String {
    fn identity(&self) -> Identity {
        Identity::new(self)
    }
}

impl Identifiable for &str {
    fn identity(&self) -> Identity {
        Identity::new(self)
    }
}

/// Content-equality provider for a model type.
///
/// Decides whether two entries that share an identity still display the same
/// content. When it says "not equal" the diff engine reports an update.
pub enum Equality<M> {
    /// Field-by-field equality taken from `PartialEq`.
    Structural(fn(&M, &M) -> bool),
    /// Caller-supplied comparison.
    Custom(Arc<dyn Fn(&M, &M) -> bool + Send + Sync>),
    /// No equality is derivable; every surviving entry counts as changed.
    Unknown,
}

impl<M: PartialEq> Equality<M> {
    /// Equality derived from the model's `PartialEq` implementation.
    #[must_use]
    pub fn structural() -> Self {
        Self::Structural(<M as PartialEq>::eq)
    }
}

impl<M> Equality<M> {
    /// Equality decided by `f`.
    #[must_use]
    pub fn custom(f: impl Fn(&M, &M) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    /// Equality that compares a projection of the model.
    ///
    /// Useful when only some fields affect what a row displays.
    #[must_use]
    pub fn by_key<K: PartialEq>(key: impl Fn(&M) -> K + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(move |a, b| key(a) == key(b)))
    }

    /// Whether `a` and `b` display the same content.
    #[inline]
    pub fn is_equal(&self, a: &M, b: &M) -> bool {
        match self {
            Self::Structural(eq) => eq(a, b),
            Self::Custom(eq) => eq(a, b),
            Self::Unknown => false,
        }
    }

    /// Whether this provider can ever report two entries as equal.
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl<M> Clone for Equality<M> {
    fn clone(&self) -> Self {
        match self {
            Self::Structural(eq) => Self::Structural(*eq),
            Self::Custom(eq) => Self::Custom(Arc::clone(eq)),
            Self::Unknown => Self::Unknown,
        }
    }
}

impl<M> Default for Equality<M> {
    fn default() -> Self {
        Self::Unknown
    }
}

impl<M> fmt::Debug for Equality<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structural(_) => f.write_str("Equality::Structural"),
            Self::Custom(_) => f.write_str("Equality::Custom"),
            Self::Unknown => f.write_str("Equality::Unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Contact {
        id: u32,
        name: String,
        online: bool,
    }

    impl Identifiable for Contact {
        fn identity(&self) -> Identity {
            Identity::new(format!("contact-{}", self.id))
        }
    }

    fn contact(id: u32, name: &str, online: bool) -> Contact {
        Contact {
            id,
            name: name.to_string(),
            online,
        }
    }

    #[test]
    fn identity_ignores_other_fields() {
        let a = contact(7, "Ada", true);
        let b = contact(7, "Ada L.", false);
        assert_eq!(a.identity(), b.identity());
        assert_ne!(a.identity(), contact(8, "Ada", true).identity());
    }

    #[test]
    fn identity_conversions_agree() {
        let owned = String::from("row-1");
        assert_eq!(Identity::from("row-1"), Identity::from(owned.clone()));
        assert_eq!(Identity::from(&owned), owned.identity());
        assert_eq!(Identity::new("row-1").as_str(), "row-1");
        assert_eq!(format!("{}", Identity::new("row-1")), "row-1");
        assert_eq!(format!("{:?}", Identity::new("row-1")), "#row-1");
    }

    #[test]
    fn identity_borrows_as_str_for_lookups() {
        let mut map = ahash::AHashMap::new();
        map.insert(Identity::new("k"), 1);
        assert_eq!(map.get("k"), Some(&1));
    }

    #[test]
    fn structural_equality_uses_partial_eq() {
        let eq = Equality::<Contact>::structural();
        assert!(eq.is_equal(&contact(1, "A", true), &contact(1, "A", true)));
        assert!(!eq.is_equal(&contact(1, "A", true), &contact(1, "A", false)));
        assert!(eq.is_known());
    }

    #[test]
    fn key_equality_ignores_unprojected_fields() {
        let eq = Equality::<Contact>::by_key(|c| c.name.clone());
        assert!(eq.is_equal(&contact(1, "A", true), &contact(1, "A", false)));
        assert!(!eq.is_equal(&contact(1, "A", true), &contact(1, "B", true)));
    }

    #[test]
    fn unknown_equality_always_reports_change() {
        let eq = Equality::<Contact>::default();
        let c = contact(1, "A", true);
        assert!(!eq.is_equal(&c, &c));
        assert!(!eq.is_known());
    }

    #[test]
    fn custom_equality_clones_share_closure() {
        let eq = Equality::<u32>::custom(|a, b| a % 10 == b % 10);
        let copy = eq.clone();
        assert!(copy.is_equal(&3, &13));
        assert!(!copy.is_equal(&3, &4));
        assert_eq!(format!("{copy:?}"), "Equality::Custom");
    }
}
