//! Sizing constants for the arena allocator.
//!
//! These values are chosen so that a freshly grown block holds a useful
//! number of small allocations while oversized requests still get dedicated
//! blocks instead of inflating the growth policy.

/// Default size for newly requested blocks (4 KiB).
///
/// Matches the OS page size so the first block of a scratch arena costs a
/// single page.
pub const DEFAULT_NORMAL_BLOCK_SIZE: usize = 4 * 1024;

/// Default upper bound on policy-sized blocks (2 MiB).
///
/// Growth by doubling stops here; larger single allocations are served by
/// dedicated blocks sized exactly for the request.
pub const DEFAULT_HUGE_BLOCK_SIZE: usize = 2 * 1024 * 1024;

/// Minimum permitted `normal_block_size` (256 bytes).
///
/// A block must hold its header, at least one cleanup record, and a little
/// payload to be worth linking into the chain.
pub const MIN_BLOCK_SIZE: usize = 256;

/// Alignment of every block buffer and of the payload area after the header.
///
/// Requests with stricter alignment are satisfied by padding inside the
/// block rather than by over-aligning the buffer itself.
pub const BLOCK_ALIGN: usize = 16;

/// Default allocation alignment (one machine word).
pub const DEFAULT_ALIGNMENT: usize = std::mem::size_of::<usize>();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_size_constants() {
        assert!(DEFAULT_NORMAL_BLOCK_SIZE.is_power_of_two());
        assert!(DEFAULT_HUGE_BLOCK_SIZE.is_power_of_two());
        assert!(MIN_BLOCK_SIZE.is_power_of_two());
        assert!(MIN_BLOCK_SIZE <= DEFAULT_NORMAL_BLOCK_SIZE);
        assert!(DEFAULT_NORMAL_BLOCK_SIZE <= DEFAULT_HUGE_BLOCK_SIZE);
    }

    #[test]
    fn test_alignment_constants() {
        assert!(BLOCK_ALIGN.is_power_of_two());
        assert!(DEFAULT_ALIGNMENT.is_power_of_two());
        assert!(DEFAULT_ALIGNMENT <= BLOCK_ALIGN);
    }
}
