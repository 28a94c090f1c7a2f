//! Benchmark utilities and helpers.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Allocation sizes typical of query-execution scratch data.
pub const MIXED_SIZES: [usize; 8] = [8, 16, 32, 64, 128, 256, 512, 1024];

/// Generates a deterministic mixed-size allocation pattern.
pub fn mixed_allocation_pattern(count: usize) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count)
        .map(|_| MIXED_SIZES[rng.gen_range(0..MIXED_SIZES.len())])
        .collect()
}

/// A short fixed pattern simulating a parse loop's allocations.
pub fn parse_pattern() -> Vec<usize> {
    vec![16, 32, 8, 64, 16, 128, 32, 16, 8, 256]
}
