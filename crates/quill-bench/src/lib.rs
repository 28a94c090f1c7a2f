//! QuillDB arena benchmarks.
//!
//! Compares arena allocation against the global allocator for:
//! - Single allocations of various sizes
//! - Batch allocate + reset cycles
//! - Typed construction with and without destructor registration
//! - Arena-backed vector growth
//! - Mixed-size allocation patterns
//!
//! Run with:
//! ```bash
//! cargo bench -p quill-bench
//! ```

pub mod utils;
