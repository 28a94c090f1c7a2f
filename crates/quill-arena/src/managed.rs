//! Compile-time capability markers for typed arena construction.
//!
//! [`Arena::create`](crate::Arena::create) is gated on [`ArenaManaged`], an
//! opt-in marker that declares a type safe to leave in arena storage. The
//! destructor decision is resolved at compile time: a cleanup thunk is
//! registered only when [`needs_cleanup`] is true, which combines
//! `std::mem::needs_drop` with the type's [`SKIP_DROP`] declaration.
//!
//! [`SKIP_DROP`]: ArenaManaged::SKIP_DROP

use crate::arena::Arena;

/// Marker for types that may be constructed in arena storage.
///
/// The crate implements this for primitive scalars, byte buffers, and
/// arrays of managed types. User types opt in explicitly, which is what
/// makes [`create`](crate::Arena::create) reject arbitrary types at
/// compile time.
///
/// # Safety
///
/// Implementors assert that a value of the type may be dropped by the
/// arena at an arbitrary later point (reset or teardown), after every
/// allocation made after it. If [`SKIP_DROP`](Self::SKIP_DROP) is `true`,
/// they further assert that never running the destructor leaks nothing:
/// either the type holds no owned resources, or those resources live in
/// the same arena and are reclaimed with it.
pub unsafe trait ArenaManaged {
    /// When true, the arena never registers a destructor for this type,
    /// even if `std::mem::needs_drop` reports one.
    const SKIP_DROP: bool = false;
}

/// Returns whether the arena must register a destructor for `T`.
///
/// False when `T` is trivially destructible or declares
/// [`SKIP_DROP`](ArenaManaged::SKIP_DROP).
#[inline]
#[must_use]
pub const fn needs_cleanup<T: ArenaManaged>() -> bool {
    std::mem::needs_drop::<T>() && !T::SKIP_DROP
}

macro_rules! trivially_managed {
    ($($ty:ty),* $(,)?) => {
        $(
            // SAFETY: trivially destructible, owns nothing.
            unsafe impl ArenaManaged for $ty {}
        )*
    };
}

trivially_managed!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, bool, char, ()
);

// SAFETY: an array is droppable/skippable exactly when its elements are.
unsafe impl<T: ArenaManaged, const N: usize> ArenaManaged for [T; N] {
    const SKIP_DROP: bool = T::SKIP_DROP;
}

/// Construction with the arena injected as the first argument.
///
/// The typed facade prepends the arena for types that want to allocate
/// their own members from it:
///
/// ```rust
/// use quill_arena::{Arena, ArenaManaged, ArenaVec, FromArena};
///
/// struct Scratch<'a> {
///     buf: ArenaVec<'a, u8>,
/// }
///
/// impl<'a> FromArena<'a, usize> for Scratch<'a> {
///     fn from_arena(arena: &'a Arena, capacity: usize) -> Self {
///         let mut buf = ArenaVec::with_capacity_in(capacity, arena.resource());
///         buf.resize(capacity, 0);
///         Scratch { buf }
///     }
/// }
///
/// // SAFETY: the buffer's bytes need no destruction and its backing
/// // memory is reclaimed with the arena.
/// unsafe impl ArenaManaged for Scratch<'_> {
///     const SKIP_DROP: bool = true;
/// }
///
/// let arena = Arena::new();
/// let scratch: &mut Scratch<'_> = arena.create_from(64).unwrap();
/// assert_eq!(scratch.buf.len(), 64);
/// ```
pub trait FromArena<'a, Args = ()>: Sized {
    /// Constructs `Self`, borrowing the arena for member allocations.
    fn from_arena(arena: &'a Arena, args: Args) -> Self;
}

/// Thunk that invokes `T`'s destructor at `object`.
///
/// # Safety
///
/// `object` must point to a properly initialized `T` that is not used
/// again afterwards.
pub(crate) unsafe fn drop_thunk<T>(object: *mut u8) {
    // SAFETY: per the function contract.
    unsafe { std::ptr::drop_in_place(object.cast::<T>()) }
}
