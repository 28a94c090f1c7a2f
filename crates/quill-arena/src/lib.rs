//! # quill-arena
//!
//! Region-based arena allocator for the QuillDB runtime.
//!
//! An arena services many short- to medium-lived allocations from a chain of
//! large contiguous blocks and reclaims them all together. It provides:
//!
//! - **Bump allocation**: O(1) aligned allocation by pointer advance
//! - **Typed construction**: [`Arena::create`] places a value in arena
//!   storage and registers its destructor only when one is needed
//! - **Bulk reclamation**: [`Arena::reset`] runs every registered destructor
//!   in reverse registration order and rewinds the arena for reuse
//! - **Allocator integration**: [`ArenaResource`] plugs the arena into
//!   allocator-aware containers such as [`ArenaVec`]
//! - **Metrics**: per-thread counters merged into a process-wide sink
//!
//! # Thread Safety
//!
//! An arena is single-owner and neither `Send` nor `Sync`. Use one arena per
//! worker; only the global metrics sink is shared, via relaxed atomics.
//!
//! # Example
//!
//! ```rust
//! use quill_arena::Arena;
//!
//! let mut arena = Arena::new();
//!
//! // Raw aligned bytes
//! let ptr = arena.allocate_aligned(128).unwrap();
//! assert_eq!(ptr.as_ptr() as usize % 8, 0);
//!
//! // Typed construction
//! let value = arena.create(42u64).unwrap();
//! assert_eq!(*value, 42);
//!
//! // Everything is reclaimed together
//! arena.reset();
//! assert_eq!(arena.space_used(), 0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod align;
pub mod constants;
pub mod error;
pub mod metrics;

mod arena;
mod block;
mod managed;
mod options;
mod resource;

pub use arena::Arena;
pub use block::CleanupFn;
pub use error::{ArenaError, ArenaResult};
pub use managed::{needs_cleanup, ArenaManaged, FromArena};
pub use metrics::{flush_local_metrics, global_metrics, local_metrics, MetricsSnapshot};
pub use options::{ArenaHook, ArenaOptions, BlockSizeSuggestor};
pub use resource::{ArenaResource, ArenaVec};
