//! Testing utilities for flipkit
//!
//! Provides an in-memory [`FakeElement`] implementing the engine's element
//! seam and a deterministic [`FlipTestRule`] driving frames and timers over
//! virtual time.

pub mod element;
pub mod rule;

pub use element::FakeElement;
pub use rule::{FlipTestRule, TestClock, TestScheduler};

pub mod prelude {
    pub use crate::element::FakeElement;
    pub use crate::rule::FlipTestRule;
}
