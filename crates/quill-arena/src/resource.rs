//! Untyped allocation resource for allocator-aware containers.
//!
//! [`ArenaResource`] presents an [`Arena`] through the
//! [`allocator_api2::alloc::Allocator`] protocol: `allocate` forwards to
//! the arena's aligned bump path and `deallocate` is a no-op, since memory
//! is reclaimed in bulk at reset. Containers that capture a resource
//! borrow the arena and therefore cannot outlive it.

use std::alloc::Layout;
use std::ptr::NonNull;

use allocator_api2::alloc::{AllocError, Allocator};

use crate::arena::Arena;
use crate::managed::ArenaManaged;

/// An untyped allocation resource backed by an [`Arena`].
///
/// Obtained from [`Arena::resource`]. Copies of a resource are
/// interchangeable; equality is arena identity.
///
/// # Example
///
/// ```rust
/// use quill_arena::{Arena, ArenaVec};
///
/// let arena = Arena::new();
/// let mut values = ArenaVec::new_in(arena.resource());
/// for i in 0..100 {
///     values.push(i);
/// }
/// assert_eq!(values.iter().sum::<i32>(), 4950);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct ArenaResource<'a> {
    arena: &'a Arena,
}

impl<'a> ArenaResource<'a> {
    pub(crate) fn new(arena: &'a Arena) -> Self {
        Self { arena }
    }

    /// The arena backing this resource.
    #[inline]
    #[must_use]
    pub fn arena(&self) -> &'a Arena {
        self.arena
    }
}

// SAFETY: allocations are live and unmoved until the arena is reset or
// dropped, and the borrow prevents both while the resource (or anything
// allocated through it) exists.
unsafe impl Allocator for ArenaResource<'_> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        let ptr = self.arena.alloc_layout(layout).map_err(|_| AllocError)?;
        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {
        // Bulk reclamation only.
    }
}

impl PartialEq for ArenaResource<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.arena, other.arena)
    }
}

impl Eq for ArenaResource<'_> {}

/// A growable array whose storage comes from an arena.
///
/// The counterpart of a polymorphic-allocator vector: element memory is
/// bump-allocated and freed in bulk, so dropping the vector itself frees
/// nothing.
pub type ArenaVec<'a, T> = allocator_api2::vec::Vec<T, ArenaResource<'a>>;

// SAFETY: dropping an ArenaVec only destroys its elements (deallocation is
// a no-op on the arena), so the destructor may be skipped exactly when the
// element type needs no destruction.
unsafe impl<T> ArenaManaged for ArenaVec<'_, T> {
    const SKIP_DROP: bool = !std::mem::needs_drop::<T>();
}
