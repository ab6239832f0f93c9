//! Scene component registry
//!
//! One intrusive doubly linked list per [`ComponentKind`], threaded through
//! component handles. Links live in a [`SecondaryMap`] keyed by the same
//! handles as the component slab, so insert and remove are O(1) and the
//! registry never owns a component.

use crate::foundation::collections::{ComponentHandle, SecondaryMap};
use super::components::ComponentKind;

#[derive(Debug, Clone, Copy, Default)]
struct ListHead {
    first: Option<ComponentHandle>,
    last: Option<ComponentHandle>,
    len: usize,
}

#[derive(Debug, Clone, Copy)]
struct Link {
    kind: ComponentKind,
    prev: Option<ComponentHandle>,
    next: Option<ComponentHandle>,
}

/// Per-kind lists of live components
#[derive(Debug, Default)]
pub struct SceneComponentLists {
    heads: [ListHead; ComponentKind::COUNT],
    links: SecondaryMap<ComponentHandle, Link>,
}

impl SceneComponentLists {
    /// Create empty lists
    pub fn new() -> Self {
        Self::default()
    }
    
    /// Append `handle` to the list of `kind`.
    ///
    /// # Panics
    /// If the handle is already registered.
    pub fn insert(&mut self, handle: ComponentHandle, kind: ComponentKind) {
        assert!(
            !self.links.contains_key(handle),
            "component {handle:?} is already registered"
        );
        
        let head = &mut self.heads[kind.index()];
        let prev = head.last;
        head.last = Some(handle);
        if head.first.is_none() {
            head.first = Some(handle);
        }
        head.len += 1;
        
        if let Some(prev) = prev {
            if let Some(link) = self.links.get_mut(prev) {
                link.next = Some(handle);
            }
        }
        self.links.insert(handle, Link { kind, prev, next: None });
    }
    
    /// Unlink `handle` from its list.
    ///
    /// # Panics
    /// If the handle is not registered.
    pub fn remove(&mut self, handle: ComponentHandle) {
        let Some(link) = self.links.remove(handle) else {
            panic!("component {handle:?} is not registered");
        };
        
        let head = &mut self.heads[link.kind.index()];
        match link.prev {
            Some(prev) => {
                if let Some(prev_link) = self.links.get_mut(prev) {
                    prev_link.next = link.next;
                }
            }
            None => head.first = link.next,
        }
        match link.next {
            Some(next) => {
                if let Some(next_link) = self.links.get_mut(next) {
                    next_link.prev = link.prev;
                }
            }
            None => head.last = link.prev,
        }
        head.len -= 1;
    }
    
    /// Handles of `kind` in insertion order
    pub fn iter(&self, kind: ComponentKind) -> ComponentListIter<'_> {
        ComponentListIter {
            links: &self.links,
            cursor: self.heads[kind.index()].first,
            remaining: self.heads[kind.index()].len,
        }
    }
    
    /// Number of live components of `kind`
    pub fn len(&self, kind: ComponentKind) -> usize {
        self.heads[kind.index()].len
    }
    
    /// No live component of `kind`
    pub fn is_empty(&self, kind: ComponentKind) -> bool {
        self.len(kind) == 0
    }
    
    /// Whether `handle` is registered
    pub fn contains(&self, handle: ComponentHandle) -> bool {
        self.links.contains_key(handle)
    }
    
    /// Kind under which `handle` was registered
    pub fn kind_of(&self, handle: ComponentHandle) -> Option<ComponentKind> {
        self.links.get(handle).map(|link| link.kind)
    }
}

/// Lazy iterator over one component list
#[derive(Debug, Clone)]
pub struct ComponentListIter<'a> {
    links: &'a SecondaryMap<ComponentHandle, Link>,
    cursor: Option<ComponentHandle>,
    remaining: usize,
}

impl Iterator for ComponentListIter<'_> {
    type Item = ComponentHandle;
    
    fn next(&mut self) -> Option<Self::Item> {
        let current = self.cursor?;
        self.cursor = self.links.get(current).and_then(|link| link.next);
        self.remaining = self.remaining.saturating_sub(1);
        Some(current)
    }
    
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for ComponentListIter<'_> {}
