//! Platform abstraction traits for the flipkit runtime.
//!
//! These traits let the engine delegate frame scheduling and timing to the
//! host environment, so the same runtime drives a windowing event loop in
//! production and a hand-cranked clock in tests.

/// Requests frame processing from the host.
///
/// Implementations must be safe to call from any thread; a typical host
/// wakes its event loop and later drives
/// [`RuntimeHandle::drain_frame_callbacks`](crate::RuntimeHandle::drain_frame_callbacks).
pub trait FrameScheduler: Send + Sync {
    /// Request that the host schedule a new frame.
    fn schedule_frame(&self);
}

/// Provides timing information for the runtime.
pub trait Clock: Send + Sync {
    /// Milliseconds elapsed since an arbitrary fixed origin.
    fn now_millis(&self) -> f64;
}
