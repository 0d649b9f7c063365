//! Physically-based interpolation for flipkit.
//!
//! A [`Spring`] is a single-axis damped oscillator stepped from the shared
//! [`FrameBatcher`](flipkit_runtime::FrameBatcher); a [`PositionSpring`]
//! pairs two of them to drive an element's translate transform back to
//! identity; [`Presence`] runs the scalar enter/leave channel on the same
//! integrator.

mod position;
mod presence;
mod spring;

pub use position::PositionSpring;
pub use presence::Presence;
pub use spring::{Spring, SpringConfig};
