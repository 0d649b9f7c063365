//! Scheduling services for flipkit.
//!
//! Everything the engine suspends on lives here: per-frame callbacks, wall
//! clock timers, the shared-`dt` frame batcher used by springs, and the
//! debounced removal batcher for leaving items. All state is owned by an
//! explicit [`Runtime`] instance the host constructs and drives; there are
//! no process-wide queues.

mod batch;
mod frame_clock;
mod platform;
mod removal;
mod runtime;
mod std_runtime;

pub use batch::{BatchRegistration, FrameBatcher};
pub use frame_clock::{FrameCallbackRegistration, FrameClock};
pub use platform::{Clock, FrameScheduler};
pub use removal::{RemovalBatcher, DEFAULT_REMOVAL_WINDOW_MILLIS};
pub use runtime::{FrameCallbackId, Runtime, RuntimeHandle, TimerId};
pub use std_runtime::{StdClock, StdRuntime, StdScheduler};
