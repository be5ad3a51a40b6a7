//! Limits applied while encoding and decoding.

/// Limits applied to a single encode or decode call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum nesting of embedded messages below the top-level message.
    pub max_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self { max_depth: 100 }
    }
}

impl Limits {
    /// Creates limits with the given nesting depth.
    #[must_use]
    pub const fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Creates limits with no restrictions.
    ///
    /// Deeply nested input can then exhaust the stack.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self { max_depth: usize::MAX }
    }
}
