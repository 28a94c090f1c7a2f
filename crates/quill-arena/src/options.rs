//! Arena configuration.

use crate::constants::{DEFAULT_HUGE_BLOCK_SIZE, DEFAULT_NORMAL_BLOCK_SIZE, MIN_BLOCK_SIZE};
use crate::error::{ArenaError, ArenaResult};

/// Computes the next block size from the arena's cumulative allocated bytes.
///
/// When absent, the arena doubles the previous block size up to
/// `huge_block_size`.
pub type BlockSizeSuggestor = fn(allocated: usize) -> usize;

/// Lifecycle hook invoked with the arena's total allocated space.
pub type ArenaHook = fn(allocated: usize);

/// Configuration for an [`Arena`](crate::Arena).
#[derive(Debug, Clone, Copy)]
pub struct ArenaOptions {
    /// Default size for newly requested blocks. Must be a power of two and
    /// at least [`MIN_BLOCK_SIZE`].
    pub normal_block_size: usize,
    /// Upper bound on policy-sized blocks. Single allocations larger than
    /// this (minus overhead) get a dedicated block instead.
    pub huge_block_size: usize,
    /// Optional override of the doubling growth policy.
    pub block_size_suggestor: Option<BlockSizeSuggestor>,
    /// Invoked once when the arena is constructed.
    pub on_init: Option<ArenaHook>,
    /// Invoked on every [`reset`](crate::Arena::reset), before blocks are
    /// released.
    pub on_reset: Option<ArenaHook>,
    /// Invoked when the arena is dropped, before blocks are released.
    pub on_destruction: Option<ArenaHook>,
}

impl ArenaOptions {
    /// Creates options with the default block sizes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            normal_block_size: DEFAULT_NORMAL_BLOCK_SIZE,
            huge_block_size: DEFAULT_HUGE_BLOCK_SIZE,
            block_size_suggestor: None,
            on_init: None,
            on_reset: None,
            on_destruction: None,
        }
    }

    /// Sets the default size for newly requested blocks.
    #[must_use]
    pub fn with_normal_block_size(mut self, size: usize) -> Self {
        self.normal_block_size = size;
        self
    }

    /// Sets the upper bound on policy-sized blocks.
    #[must_use]
    pub fn with_huge_block_size(mut self, size: usize) -> Self {
        self.huge_block_size = size;
        self
    }

    /// Installs a custom block-size suggestor.
    #[must_use]
    pub fn with_block_size_suggestor(mut self, suggestor: BlockSizeSuggestor) -> Self {
        self.block_size_suggestor = Some(suggestor);
        self
    }

    /// Installs the initialization hook.
    #[must_use]
    pub fn with_on_init(mut self, hook: ArenaHook) -> Self {
        self.on_init = Some(hook);
        self
    }

    /// Installs the reset hook.
    #[must_use]
    pub fn with_on_reset(mut self, hook: ArenaHook) -> Self {
        self.on_reset = Some(hook);
        self
    }

    /// Installs the destruction hook.
    #[must_use]
    pub fn with_on_destruction(mut self, hook: ArenaHook) -> Self {
        self.on_destruction = Some(hook);
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::InvalidConfig`] if a block size is not a power
    /// of two, `normal_block_size` is below the floor, or the bounds are
    /// inverted.
    pub fn validate(&self) -> ArenaResult<()> {
        if !self.normal_block_size.is_power_of_two() {
            return Err(ArenaError::invalid_config(
                "normal_block_size must be a power of two",
            ));
        }
        if self.normal_block_size < MIN_BLOCK_SIZE {
            return Err(ArenaError::invalid_config(format!(
                "normal_block_size must be at least {MIN_BLOCK_SIZE} bytes"
            )));
        }
        if !self.huge_block_size.is_power_of_two() {
            return Err(ArenaError::invalid_config(
                "huge_block_size must be a power of two",
            ));
        }
        if self.huge_block_size < self.normal_block_size {
            return Err(ArenaError::invalid_config(
                "huge_block_size must be at least normal_block_size",
            ));
        }
        Ok(())
    }
}

impl Default for ArenaOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_valid() {
        assert!(ArenaOptions::new().validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let options = ArenaOptions::new()
            .with_normal_block_size(8192)
            .with_huge_block_size(65536);

        assert_eq!(options.normal_block_size, 8192);
        assert_eq!(options.huge_block_size, 65536);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_non_power_of_two_rejected() {
        let options = ArenaOptions::new().with_normal_block_size(3000);
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_too_small_block_rejected() {
        let options = ArenaOptions::new().with_normal_block_size(64);
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let options = ArenaOptions::new()
            .with_normal_block_size(65536)
            .with_huge_block_size(4096);
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_suggestor_is_recorded() {
        fn fixed(_allocated: usize) -> usize {
            8192
        }

        let options = ArenaOptions::new().with_block_size_suggestor(fixed);
        assert!(options.block_size_suggestor.is_some());
    }
}
