//! FLIP transition engine for flipkit
//!
//! This crate drives smooth visual transitions for a set of keyed, positioned
//! elements whenever their layout changes: keyed diffing of the rendered item
//! set, before/after geometry capture, inverse-transform computation with
//! parent-relative correction, spring or timed playback, and the enter/leave
//! lifecycle state machine. The host view layer supplies elements through the
//! [`VisualElement`] seam and signals changes with a [`ChangeKey`].

pub mod collections;
mod diff;
mod element;
mod error;
mod flip;
mod group;
mod handle;
mod key;
mod registry;
mod style;
mod styler;

pub use diff::{merge_diff, LeaveVerdict};
pub use element::VisualElement;
pub use error::FlipError;
pub use group::{FlipGroup, GroupOptions};
pub use handle::{HandleOptions, NodeHandle, Phase, PositionMode, ScaleMode};
pub use key::{change_key, ChangeKey, Key, KeyedItem};
pub use registry::{HandleRegistry, RefCallback};
pub use style::{
    is_position_prop, is_unitless_prop, kebab_case, Style, StyleValue, TransitionTiming,
};
pub use styler::{AddStyleOpts, Styler};

// The companion crates, re-exported so hosts depend on one entry point.
pub use flipkit_animation as animation;
pub use flipkit_geometry as geometry;
pub use flipkit_runtime as runtime;

pub use flipkit_animation::{PositionSpring, Presence, Spring, SpringConfig};
pub use flipkit_geometry::{EdgeInsets, Matrix2d, Point, Rect, Size};

pub mod prelude {
    pub use crate::{
        change_key, ChangeKey, FlipError, FlipGroup, GroupOptions, HandleOptions, Key, KeyedItem,
        PositionMode, ScaleMode, SpringConfig, Style, StyleValue, VisualElement,
    };
    pub use flipkit_runtime::{Runtime, StdRuntime};
}
