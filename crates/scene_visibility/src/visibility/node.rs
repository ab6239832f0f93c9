//! Visible-node records
//!
//! Records are stored by value in the result groups, so they stay small:
//! the sub-shape indices live inline instead of in a separate allocation.

use crate::collision::MAX_SUB_SHAPES;
use crate::foundation::collections::Entity;

/// Fixed-capacity inline set of sub-shape indices
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct SubShapeSet {
    len: u8,
    indices: [u8; MAX_SUB_SHAPES],
}

impl SubShapeSet {
    /// Empty set
    pub const fn new() -> Self {
        Self {
            len: 0,
            indices: [0; MAX_SUB_SHAPES],
        }
    }
    
    /// Append an index.
    ///
    /// # Panics
    /// When the set already holds [`MAX_SUB_SHAPES`] indices.
    pub fn push(&mut self, index: u8) {
        let len = usize::from(self.len);
        assert!(len < MAX_SUB_SHAPES, "sub-shape set is full ({MAX_SUB_SHAPES} entries)");
        self.indices[len] = index;
        self.len += 1;
    }
    
    /// Stored indices in insertion order
    pub fn as_slice(&self) -> &[u8] {
        &self.indices[..usize::from(self.len)]
    }
    
    /// Iterate the stored indices
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.as_slice().iter().copied()
    }
    
    /// Number of stored indices
    pub fn len(&self) -> usize {
        usize::from(self.len)
    }
    
    /// No index stored
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    
    /// Whether `index` is stored
    pub fn contains(&self, index: u8) -> bool {
        self.as_slice().contains(&index)
    }
}

impl std::fmt::Debug for SubShapeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.as_slice()).finish()
    }
}

/// An entity that passed a visibility test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleNode {
    /// The visible entity
    pub entity: Entity,
    /// Sub-shapes that passed, never empty
    pub sub_shapes: SubShapeSet,
    /// Squared distance from the test origin
    pub distance_squared: f32,
}
