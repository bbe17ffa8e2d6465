//! Entity and value-object markers.

/// Entity marker + minimal interface: identity + continuity across state changes.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by value; identity does not exist
/// for them. `Quantity` and `Money` are the canonical examples here.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
