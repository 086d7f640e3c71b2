//! Data filtering, averaging and smoothing.

pub mod ema;
pub mod mode;

pub use ema::Ema;
pub use mode::ModeFilter;

/// A filter for values of type `V`.
pub trait Filter<V> {
    /// Adds a new value to the filter, returning the filtered value.
    fn push(&mut self, value: V) -> V;

    /// Resets the accumulated history and state of the filter to be identical to the state just
    /// after construction.
    fn reset(&mut self);
}
