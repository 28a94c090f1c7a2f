//! Arena core: the block chain, growth policy, typed construction facade,
//! and bulk reclamation.

use std::alloc::Layout;
use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::slice;

use tracing::debug;

use crate::align::align_up_checked;
use crate::block::{BlockHeader, CleanupFn, RECORD_SIZE};
use crate::constants::{BLOCK_ALIGN, DEFAULT_ALIGNMENT};
use crate::error::{ArenaError, ArenaResult};
use crate::managed::{drop_thunk, needs_cleanup, ArenaManaged, FromArena};
use crate::metrics;
use crate::options::ArenaOptions;
use crate::resource::ArenaResource;

/// A region-based allocator with bump-pointer allocation and bulk
/// reclamation.
///
/// The arena owns a singly-linked chain of blocks, newest first. Raw and
/// typed allocations advance the newest block's bump pointer; when a
/// request does not fit, the arena grows by doubling (bounded by
/// `huge_block_size`) or by a dedicated oversized block. Destructors are
/// recorded next to their objects and run in reverse registration order on
/// [`reset`](Self::reset) or drop.
///
/// # Thread Safety
///
/// The arena is single-owner: it is neither `Send` nor `Sync`. Arenas are
/// per-request scratch spaces; contention would defeat the bump-allocator
/// advantage.
///
/// # Example
///
/// ```rust
/// use quill_arena::{Arena, ArenaOptions};
///
/// let mut arena = Arena::with_options(
///     ArenaOptions::new().with_normal_block_size(8192),
/// );
///
/// let nums = arena.create_array::<u32>(16).unwrap();
/// nums[0] = 7;
/// assert_eq!(nums.len(), 16);
///
/// let reclaimed = arena.reset();
/// assert!(reclaimed >= 64);
/// ```
pub struct Arena {
    options: ArenaOptions,
    /// Most recently allocated block; earlier blocks hang off `prev`.
    head: Cell<Option<NonNull<BlockHeader>>>,
    /// Sum of the sizes of currently owned blocks.
    space_allocated: Cell<usize>,
    /// Bytes handed out to callers since the last reset.
    space_used: Cell<usize>,
    /// Alignment padding plus cleanup-record bytes since the last reset.
    space_wasted: Cell<usize>,
    /// Basis for the doubling growth policy.
    last_block_size: Cell<usize>,
    /// The arena hands out raw pointers into memory it owns: keep it
    /// pinned to one thread.
    _single_owner: PhantomData<*mut u8>,
}

impl Arena {
    /// Creates an arena with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(ArenaOptions::default())
    }

    /// Creates an arena with the given options.
    ///
    /// # Panics
    ///
    /// Panics if the options fail [`ArenaOptions::validate`].
    #[must_use]
    pub fn with_options(options: ArenaOptions) -> Self {
        options.validate().expect("invalid arena options");

        let arena = Self {
            last_block_size: Cell::new(options.normal_block_size),
            options,
            head: Cell::new(None),
            space_allocated: Cell::new(0),
            space_used: Cell::new(0),
            space_wasted: Cell::new(0),
            _single_owner: PhantomData,
        };

        metrics::with_local(|m| m.record_arena());
        if let Some(hook) = arena.options.on_init {
            hook(0);
        }
        arena
    }

    /// Allocates `size` bytes at word alignment.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::AllocationFailed`] if the page source cannot
    /// provide a block; the arena remains usable.
    #[inline]
    pub fn allocate_aligned(&self, size: usize) -> ArenaResult<NonNull<u8>> {
        self.allocate_aligned_to(size, DEFAULT_ALIGNMENT)
    }

    /// Allocates `size` bytes at the given alignment.
    ///
    /// A zero-size request returns a stable non-null address inside the
    /// current block without consuming space.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::AllocationFailed`] if the page source cannot
    /// provide a block; the arena remains usable.
    ///
    /// # Panics
    ///
    /// Panics if `align` is zero or not a power of two, or if `size` plus
    /// block overhead overflows.
    pub fn allocate_aligned_to(&self, size: usize, align: usize) -> ArenaResult<NonNull<u8>> {
        assert!(
            align != 0 && align.is_power_of_two(),
            "alignment must be a non-zero power of two"
        );

        if let Some(head) = self.head.get() {
            // SAFETY: head is a live block owned by this arena.
            let block = unsafe { head.as_ref() };
            if let Some((ptr, padding)) = block.allocate(size, align) {
                self.note_allocation(size, padding);
                return Ok(ptr);
            }
        }
        self.allocate_slow(size, align)
    }

    /// Allocates raw bytes for `layout`.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::AllocationFailed`] on page-source exhaustion.
    #[inline]
    pub fn alloc_layout(&self, layout: Layout) -> ArenaResult<NonNull<u8>> {
        self.allocate_aligned_to(layout.size(), layout.align())
    }

    #[cold]
    fn allocate_slow(&self, size: usize, align: usize) -> ArenaResult<NonNull<u8>> {
        let block = self.grow(size, align, false)?;
        // SAFETY: freshly linked block owned by this arena.
        let block = unsafe { block.as_ref() };
        let (ptr, padding) = block
            .allocate(size, align)
            .expect("allocation failed after growing arena");
        self.note_allocation(size, padding);
        Ok(ptr)
    }

    /// Reserves object bytes and a cleanup record in one block, so both
    /// land together or the pair spills together to a fresh block.
    pub(crate) fn allocate_with_cleanup(
        &self,
        size: usize,
        align: usize,
        thunk: CleanupFn,
    ) -> ArenaResult<NonNull<u8>> {
        assert!(
            align != 0 && align.is_power_of_two(),
            "alignment must be a non-zero power of two"
        );
        debug_assert!(size > 0);

        if let Some(head) = self.head.get() {
            // SAFETY: head is a live block owned by this arena.
            let block = unsafe { head.as_ref() };
            if let Some((ptr, padding)) = block.allocate_with_cleanup(size, align, thunk) {
                self.note_allocation(size, padding);
                self.note_cleanup_slot();
                return Ok(ptr);
            }
        }

        let block = self.grow(size, align, true)?;
        // SAFETY: freshly linked block owned by this arena.
        let block = unsafe { block.as_ref() };
        let (ptr, padding) = block
            .allocate_with_cleanup(size, align, thunk)
            .expect("allocation failed after growing arena");
        self.note_allocation(size, padding);
        self.note_cleanup_slot();
        Ok(ptr)
    }

    /// Registers `(object, thunk)` to run at the next reset or teardown.
    ///
    /// A null `object` is a no-op. If the current block's cleanup area is
    /// full, the record spills to a fresh block by itself.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::AllocationFailed`] if a spill block cannot be
    /// obtained; no record is registered in that case.
    ///
    /// # Safety
    ///
    /// `object` must remain valid for `thunk` until the arena's next reset
    /// or destruction, and `thunk` must be sound to call exactly once with
    /// `object`.
    pub unsafe fn register_cleanup(&self, object: *mut u8, thunk: CleanupFn) -> ArenaResult<()> {
        if object.is_null() {
            return Ok(());
        }

        if let Some(head) = self.head.get() {
            // SAFETY: head is a live block owned by this arena.
            let block = unsafe { head.as_ref() };
            if block.register_cleanup(object, thunk) {
                self.note_cleanup_slot();
                return Ok(());
            }
        }

        // Spill: a fresh block holding exactly this cleanup record.
        let block = self.grow(0, 1, true)?;
        // SAFETY: freshly linked block owned by this arena.
        let registered = unsafe { block.as_ref() }.register_cleanup(object, thunk);
        debug_assert!(registered, "fresh block must hold one cleanup record");
        self.note_cleanup_slot();
        Ok(())
    }

    /// Moves `value` into arena storage.
    ///
    /// A destructor thunk is registered, co-located with the object, iff
    /// [`needs_cleanup::<T>()`](crate::needs_cleanup): skipped when `T` is
    /// trivially destructible or declares
    /// [`SKIP_DROP`](ArenaManaged::SKIP_DROP). On failure nothing is
    /// constructed and nothing is registered.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::AllocationFailed`] on page-source exhaustion.
    ///
    /// # Example
    ///
    /// ```rust
    /// use quill_arena::Arena;
    ///
    /// let arena = Arena::new();
    /// let value = arena.create(7u32).unwrap();
    /// *value += 1;
    /// assert_eq!(*value, 8);
    /// ```
    pub fn create<T: ArenaManaged>(&self, value: T) -> ArenaResult<&mut T> {
        let layout = Layout::new::<T>();
        let ptr = if needs_cleanup::<T>() {
            // A zero-sized object with a destructor still gets one byte so
            // its cleanup record points at storage owned by it alone.
            self.allocate_with_cleanup(layout.size().max(1), layout.align(), drop_thunk::<T>)?
        } else {
            self.allocate_aligned_to(layout.size(), layout.align())?
        };

        let ptr = ptr.cast::<T>();
        // SAFETY: ptr is aligned, unaliased arena storage for a T.
        unsafe {
            ptr.as_ptr().write(value);
            Ok(&mut *ptr.as_ptr())
        }
    }

    /// Constructs `T` with the arena injected as the first argument.
    ///
    /// This is the facade for types whose constructors allocate their own
    /// members from the same arena; see [`FromArena`].
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::AllocationFailed`] on page-source exhaustion.
    pub fn create_from<'a, Args, T>(&'a self, args: Args) -> ArenaResult<&'a mut T>
    where
        T: ArenaManaged + FromArena<'a, Args>,
    {
        let value = T::from_arena(self, args);
        self.create(value)
    }

    /// Allocates a value-initialized array of `len` elements.
    ///
    /// Available only for trivially constructible and destructible element
    /// types; no per-element cleanup is ever registered.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::AllocationFailed`] on page-source exhaustion.
    ///
    /// # Panics
    ///
    /// Panics if the array layout overflows `isize`.
    pub fn create_array<T: Default + Copy>(&self, len: usize) -> ArenaResult<&mut [T]> {
        if len == 0 {
            return Ok(&mut []);
        }

        let layout = Layout::array::<T>(len).expect("array layout overflow");
        let ptr = self.alloc_layout(layout)?.cast::<T>();

        // SAFETY: freshly reserved storage for len elements of T.
        unsafe {
            for i in 0..len {
                ptr.as_ptr().add(i).write(T::default());
            }
            Ok(slice::from_raw_parts_mut(ptr.as_ptr(), len))
        }
    }

    /// Copies `src` into arena storage.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::AllocationFailed`] on page-source exhaustion.
    pub fn alloc_slice_copy<T: Copy>(&self, src: &[T]) -> ArenaResult<&mut [T]> {
        if src.is_empty() {
            return Ok(&mut []);
        }

        let layout = Layout::for_value(src);
        let ptr = self.alloc_layout(layout)?.cast::<T>();

        // SAFETY: src and the fresh arena storage cannot overlap.
        unsafe {
            std::ptr::copy_nonoverlapping(src.as_ptr(), ptr.as_ptr(), src.len());
            Ok(slice::from_raw_parts_mut(ptr.as_ptr(), src.len()))
        }
    }

    /// Copies a string into arena storage.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::AllocationFailed`] on page-source exhaustion.
    pub fn alloc_str(&self, src: &str) -> ArenaResult<&str> {
        let bytes = self.alloc_slice_copy(src.as_bytes())?;
        // SAFETY: the bytes were copied from valid UTF-8.
        Ok(unsafe { std::str::from_utf8_unchecked(bytes) })
    }

    /// Runs every registered cleanup in reverse registration order,
    /// releases all blocks except the largest (kept for reuse), and leaves
    /// the arena empty and usable.
    ///
    /// Returns the number of payload bytes reclaimed. Invalidates every
    /// pointer previously handed out, which is why this takes `&mut self`.
    pub fn reset(&mut self) -> usize {
        let reclaimed = self.space_used.get();

        if let Some(hook) = self.options.on_reset {
            hook(self.space_allocated.get());
        }

        let cleanups = self.run_all_cleanups();

        // Retain the largest block; release the rest.
        let mut keep: Option<NonNull<BlockHeader>> = None;
        let mut cursor = self.head.get();
        while let Some(block) = cursor {
            // SAFETY: chain blocks are live until released right here, and
            // all cleanups already ran.
            unsafe {
                cursor = block.as_ref().prev();
                let keep_size = match keep {
                    Some(k) => k.as_ref().size(),
                    None => 0,
                };
                if block.as_ref().size() > keep_size {
                    if let Some(old) = keep.replace(block) {
                        BlockHeader::deallocate_block(old);
                    }
                } else {
                    BlockHeader::deallocate_block(block);
                }
            }
        }

        if let Some(mut kept) = keep {
            // SAFETY: kept is live and no other link references it.
            unsafe {
                kept.as_mut().detach();
                kept.as_ref().rewind();
                let size = kept.as_ref().size();
                self.space_allocated.set(size);
                self.last_block_size.set(size);
            }
        } else {
            self.space_allocated.set(0);
        }
        self.head.set(keep);
        self.space_used.set(0);
        self.space_wasted.set(0);

        metrics::with_local(|m| {
            m.record_reset();
            m.record_cleanups(cleanups);
        });
        debug!(reclaimed, cleanups, "arena reset");
        reclaimed
    }

    /// Total bytes currently obtained from the page source.
    #[inline]
    #[must_use]
    pub fn space_allocated(&self) -> usize {
        self.space_allocated.get()
    }

    /// Bytes handed out to callers since the last reset, padding excluded.
    #[inline]
    #[must_use]
    pub fn space_used(&self) -> usize {
        self.space_used.get()
    }

    /// Alignment padding plus cleanup-record bytes since the last reset.
    #[inline]
    #[must_use]
    pub fn space_wasted(&self) -> usize {
        self.space_wasted.get()
    }

    /// Number of blocks currently in the chain.
    #[must_use]
    pub fn block_count(&self) -> usize {
        let mut count = 0;
        let mut cursor = self.head.get();
        while let Some(block) = cursor {
            // SAFETY: chain blocks are live while the arena lives.
            cursor = unsafe { block.as_ref() }.prev();
            count += 1;
        }
        count
    }

    /// The options this arena was constructed with.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ArenaOptions {
        &self.options
    }

    /// Returns an untyped allocation resource backed by this arena, for
    /// allocator-aware containers.
    #[inline]
    #[must_use]
    pub fn resource(&self) -> ArenaResource<'_> {
        ArenaResource::new(self)
    }

    /// Obtains a new block sized by the growth policy and links it at the
    /// head of the chain.
    fn grow(
        &self,
        size: usize,
        align: usize,
        with_cleanup: bool,
    ) -> ArenaResult<NonNull<BlockHeader>> {
        let overhead =
            BlockHeader::header_end() + (align - 1) + if with_cleanup { RECORD_SIZE } else { 0 };
        let required = size
            .checked_add(overhead)
            .and_then(|n| align_up_checked(n, BLOCK_ALIGN))
            .expect("allocation size overflow");

        let huge = self.options.huge_block_size;
        let dedicated = required > huge;
        let next_size = if dedicated {
            debug!(size, required, "allocating dedicated oversized block");
            required
        } else {
            let suggested = match self.options.block_size_suggestor {
                Some(suggest) => suggest(self.space_allocated.get()),
                None if self.head.get().is_none() => self.options.normal_block_size,
                None => self.last_block_size.get().saturating_mul(2),
            };
            align_up_checked(
                suggested
                    .min(huge)
                    .max(self.options.normal_block_size)
                    .max(required),
                BLOCK_ALIGN,
            )
            .expect("allocation size overflow")
        };

        let block = BlockHeader::allocate_block(next_size, self.head.get())
            .ok_or(ArenaError::AllocationFailed { size, align })?;

        self.head.set(Some(block));
        self.space_allocated
            .set(self.space_allocated.get() + next_size);
        if !dedicated {
            self.last_block_size.set(next_size);
        }

        metrics::with_local(|m| m.record_block(next_size));
        debug!(
            block_size = next_size,
            total_allocated = self.space_allocated.get(),
            "arena grew"
        );
        Ok(block)
    }

    #[inline]
    fn note_allocation(&self, size: usize, padding: usize) {
        self.space_used.set(self.space_used.get() + size);
        self.space_wasted.set(self.space_wasted.get() + padding);
        metrics::with_local(|m| m.record_allocation(size, padding));
    }

    #[inline]
    fn note_cleanup_slot(&self) {
        self.space_wasted.set(self.space_wasted.get() + RECORD_SIZE);
        metrics::with_local(|m| m.record_cleanup_slot(RECORD_SIZE));
    }

    /// Runs all cleanup records, newest block first, newest record first
    /// within each block. Blocks are not freed here: a destructor may read
    /// older allocations, which must stay mapped until every thunk ran.
    fn run_all_cleanups(&self) -> usize {
        let mut count = 0;
        let mut cursor = self.head.get();
        while let Some(block) = cursor {
            // SAFETY: chain blocks are live for the whole walk.
            let block = unsafe { block.as_ref() };
            count += block.run_cleanups();
            cursor = block.prev();
        }
        count
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        if let Some(hook) = self.options.on_destruction {
            hook(self.space_allocated.get());
        }

        let cleanups = self.run_all_cleanups();
        metrics::with_local(|m| m.record_cleanups(cleanups));

        let mut cursor = self.head.take();
        while let Some(block) = cursor {
            // SAFETY: all cleanups ran; the block is not touched again.
            unsafe {
                cursor = block.as_ref().prev();
                BlockHeader::deallocate_block(block);
            }
        }
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("block_count", &self.block_count())
            .field("space_allocated", &self.space_allocated.get())
            .field("space_used", &self.space_used.get())
            .field("space_wasted", &self.space_wasted.get())
            .finish()
    }
}
