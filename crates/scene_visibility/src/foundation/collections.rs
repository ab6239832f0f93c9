//! Handle types for slab-allocated scene data
//!
//! Entities and components live in `slotmap` slabs. Cross references between
//! them are stored as these handles instead of pointers, so a destroyed entity
//! can never be reached through a stale back-reference.

pub use slotmap::{SlotMap, SecondaryMap};

slotmap::new_key_type! {
    /// Stable handle of a scene entity (node)
    pub struct Entity;

    /// Stable handle of a scene component instance
    pub struct ComponentHandle;
}
