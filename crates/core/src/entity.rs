//! Entity traits: identity + continuity across state changes, and ownership.

use crate::id::UserId;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// An entity that declares a single owning user.
///
/// Only the owner may mutate (edit/delete) an owned entity.
pub trait Owned: Entity {
    fn owner(&self) -> UserId;
}
