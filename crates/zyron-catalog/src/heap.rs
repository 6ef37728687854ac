//! Arena owning the objects an index handle is built from.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

static NEXT_HEAP_ID: AtomicU64 = AtomicU64::new(1);

/// Typed reference to an object stored in a [`MemHeap`].
///
/// Handles are plain indices tagged with the id of the heap that issued them.
/// Looking a handle up in any other heap finds nothing.
pub struct HeapHandle<T> {
    heap_id: u64,
    slot: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> HeapHandle<T> {
    /// Id of the heap that issued this handle.
    pub fn heap_id(&self) -> u64 {
        self.heap_id
    }
}

impl<T> Clone for HeapHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for HeapHandle<T> {}

impl<T> PartialEq for HeapHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.heap_id == other.heap_id && self.slot == other.slot
    }
}

impl<T> Eq for HeapHandle<T> {}

impl<T> fmt::Debug for HeapHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HeapHandle({}:{})", self.heap_id, self.slot)
    }
}

/// Bump-style arena of heterogeneous objects.
///
/// Objects are never freed one by one. Dropping the heap drops everything it
/// holds at once.
pub struct MemHeap {
    id: u64,
    slots: Vec<Box<dyn Any + Send + Sync>>,
    allocated_bytes: usize,
}

impl MemHeap {
    /// Creates an empty heap with a fresh id.
    pub fn new() -> Self {
        Self {
            id: NEXT_HEAP_ID.fetch_add(1, Ordering::Relaxed),
            slots: Vec::new(),
            allocated_bytes: 0,
        }
    }

    /// Process-unique id of this heap.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Moves `value` into the heap.
    pub fn alloc<T: Any + Send + Sync>(&mut self, value: T) -> HeapHandle<T> {
        let slot = self.slots.len() as u32;
        self.slots.push(Box::new(value));
        self.allocated_bytes += std::mem::size_of::<T>();
        HeapHandle {
            heap_id: self.id,
            slot,
            _marker: PhantomData,
        }
    }

    /// Allocates `size` zeroed bytes.
    pub fn allocate(&mut self, size: usize) -> HeapHandle<Box<[u8]>> {
        self.allocated_bytes += size;
        self.alloc(vec![0u8; size].into_boxed_slice())
    }

    /// Returns the object behind `handle`, or None if another heap issued it.
    pub fn get<T: Any>(&self, handle: HeapHandle<T>) -> Option<&T> {
        if handle.heap_id != self.id {
            return None;
        }
        self.slots.get(handle.slot as usize)?.downcast_ref()
    }

    /// Mutable variant of [`MemHeap::get`].
    pub fn get_mut<T: Any>(&mut self, handle: HeapHandle<T>) -> Option<&mut T> {
        if handle.heap_id != self.id {
            return None;
        }
        self.slots.get_mut(handle.slot as usize)?.downcast_mut()
    }

    /// Returns true if `handle` was issued by this heap.
    pub fn owns<T>(&self, handle: HeapHandle<T>) -> bool {
        handle.heap_id == self.id && (handle.slot as usize) < self.slots.len()
    }

    /// Number of objects held.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if nothing was allocated yet.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Bytes handed out so far: the inline size of every object plus the
    /// length of every raw buffer.
    pub fn allocated_bytes(&self) -> usize {
        self.allocated_bytes
    }
}

impl Default for MemHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemHeap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemHeap")
            .field("id", &self.id)
            .field("objects", &self.slots.len())
            .field("allocated_bytes", &self.allocated_bytes)
            .finish()
    }
}

impl Drop for MemHeap {
    fn drop(&mut self) {
        trace!(
            heap_id = self.id,
            objects = self.slots.len(),
            bytes = self.allocated_bytes,
            "releasing heap"
        );
    }
}

impl<T: Any> Index<HeapHandle<T>> for MemHeap {
    type Output = T;

    /// Panics if the handle was issued by another heap.
    fn index(&self, handle: HeapHandle<T>) -> &T {
        match self.get(handle) {
            Some(value) => value,
            None => panic!("{:?} does not belong to heap {}", handle, self.id),
        }
    }
}

impl<T: Any> IndexMut<HeapHandle<T>> for MemHeap {
    fn index_mut(&mut self, handle: HeapHandle<T>) -> &mut T {
        let id = self.id;
        match self.get_mut(handle) {
            Some(value) => value,
            None => panic!("{:?} does not belong to heap {}", handle, id),
        }
    }
}
