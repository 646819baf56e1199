//! Time provider trait for abstracting time operations

/// Trait for providing time information
///
/// Used for trace start times and UUT reply polling without depending on
/// `std::time` in the core.
pub trait TimeProvider {
    /// Get current time in milliseconds since some epoch
    fn now_ms(&self) -> u64;

    /// Calculate elapsed milliseconds since a given start time
    fn elapsed_ms(&self, start_ms: u64) -> u64 {
        self.now_ms().saturating_sub(start_ms)
    }
}
