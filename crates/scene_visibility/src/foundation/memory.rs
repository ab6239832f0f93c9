//! Memory management utilities
//!
//! [`FrameArena`] is the frame-scoped allocator behind the visibility result
//! containers. It hands out `Vec` buffers, takes them back at the end of the
//! frame and reuses their capacity on the next one, so steady-state frames do
//! not touch the general-purpose heap.
//!
//! Every buffer handed out during a frame must be recycled before the next
//! [`FrameArena::begin_frame`]. Worker threads never share an arena: the
//! owner [`partition`](FrameArena::partition)s it into disjoint slices before
//! a parallel pass and [`absorb`](FrameArena::absorb)s them after the join.

use super::time::Timestamp;

/// Smallest capacity a growing buffer jumps to
const MIN_GROWTH: usize = 16;

/// Allocation counters of a [`FrameArena`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArenaStats {
    /// Buffers created from scratch
    pub allocations: u64,
    /// Buffers served from the free list
    pub reuses: u64,
    /// Growth reallocations of handed-out buffers
    pub growths: u64,
}

impl ArenaStats {
    fn accumulate(&mut self, other: &ArenaStats) {
        self.allocations += other.allocations;
        self.reuses += other.reuses;
        self.growths += other.growths;
    }
}

/// Recycling buffer pool reset at frame boundaries
#[derive(Debug)]
pub struct FrameArena<T> {
    frame: Timestamp,
    free: Vec<Vec<T>>,
    outstanding: usize,
    stats: ArenaStats,
}

impl<T> Default for FrameArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FrameArena<T> {
    /// Create an empty arena
    pub fn new() -> Self {
        Self {
            frame: 0,
            free: Vec::new(),
            outstanding: 0,
            stats: ArenaStats::default(),
        }
    }
    
    /// Create an arena whose free list already holds `buffers` buffers of `capacity` elements
    pub fn with_prewarm(buffers: usize, capacity: usize) -> Self {
        let mut arena = Self::new();
        arena.free = (0..buffers).map(|_| Vec::with_capacity(capacity)).collect();
        arena
    }
    
    /// Start a new frame. Panics if a buffer from an earlier frame was never recycled.
    pub fn begin_frame(&mut self, frame: Timestamp) {
        assert_eq!(
            self.outstanding, 0,
            "{} frame arena buffer(s) still in use when starting frame {}",
            self.outstanding, frame
        );
        self.frame = frame;
    }
    
    /// Frame this arena currently serves
    pub fn frame(&self) -> Timestamp {
        self.frame
    }
    
    /// Buffers handed out and not yet recycled
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }
    
    /// Buffers waiting in the free list
    pub fn free_buffers(&self) -> usize {
        self.free.len()
    }
    
    /// Allocation counters since creation
    pub fn stats(&self) -> ArenaStats {
        self.stats
    }
    
    /// Hand out an empty buffer able to hold at least `capacity` elements
    pub fn allocate(&mut self, capacity: usize) -> Vec<T> {
        self.outstanding += 1;
        match self.free.pop() {
            Some(mut buffer) => {
                self.stats.reuses += 1;
                if buffer.capacity() < capacity {
                    buffer.reserve_exact(capacity);
                }
                buffer
            }
            None => {
                self.stats.allocations += 1;
                Vec::with_capacity(capacity)
            }
        }
    }
    
    /// Grow a handed-out buffer so it can take `additional` more elements.
    /// Capacity at least doubles so repeated appends stay amortized O(1).
    pub fn grow(&mut self, buffer: &mut Vec<T>, additional: usize) {
        let required = buffer.len() + additional;
        if required <= buffer.capacity() {
            return;
        }
        let target = required.max(buffer.capacity() * 2).max(MIN_GROWTH);
        buffer.reserve_exact(target - buffer.len());
        self.stats.growths += 1;
    }
    
    /// Return a buffer to the free list. Its contents are dropped, its capacity kept.
    pub fn recycle(&mut self, mut buffer: Vec<T>) {
        assert!(
            self.outstanding > 0,
            "recycled a buffer that this frame arena never handed out"
        );
        buffer.clear();
        self.outstanding -= 1;
        self.free.push(buffer);
    }
    
    /// Split the free list into `parts` disjoint slices, one per worker
    pub fn partition(&mut self, parts: usize) -> Vec<FrameArena<T>> {
        assert!(parts > 0, "cannot partition a frame arena into zero slices");
        let mut slices: Vec<FrameArena<T>> = (0..parts)
            .map(|_| FrameArena {
                frame: self.frame,
                free: Vec::new(),
                outstanding: 0,
                stats: ArenaStats::default(),
            })
            .collect();
        for (index, buffer) in self.free.drain(..).enumerate() {
            slices[index % parts].free.push(buffer);
        }
        slices
    }
    
    /// Merge slices produced by [`partition`](Self::partition) back into this arena.
    /// Buffers still held by the slices' users become this arena's responsibility.
    pub fn absorb(&mut self, slices: impl IntoIterator<Item = FrameArena<T>>) {
        for slice in slices {
            assert_eq!(
                slice.frame, self.frame,
                "absorbed an arena slice from a different frame"
            );
            self.free.extend(slice.free);
            self.outstanding += slice.outstanding;
            self.stats.accumulate(&slice.stats);
        }
    }
}
