//! Identifier type shared by all simulation entities.

/// Unique identifier of a simulation component (entity).
pub type Id = u32;
