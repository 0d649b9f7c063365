use std::cell::{RefCell, RefMut};
use std::rc::Rc;

use flipkit_animation::{PositionSpring, Presence, SpringConfig};
use flipkit_geometry::Rect;
use flipkit_runtime::RuntimeHandle;

use crate::element::VisualElement;
use crate::error::FlipError;
use crate::key::Key;
use crate::style::{Style, TransitionTiming};
use crate::styler::Styler;

/// Whether layout moves are animated as a translate transform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PositionMode {
    None,
    #[default]
    Transform,
}

/// How size changes are animated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScaleMode {
    /// Size changes are ignored.
    None,
    /// Scale transform, with children counter-scaled to cancel distortion.
    #[default]
    Transform,
    /// Scale transform without touching children.
    TransformNoChildren,
    /// Width and height are replayed as transitioned style properties
    /// instead of a transform.
    NonTransform,
    /// Snap to the new size at commit, clearing any in-flight scale.
    Immediate,
}

/// Lifecycle of one keyed item across change sessions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Entering,
    Staying,
    Leaving,
}

/// Per-handle configuration. Unset timing fields fall back to the group
/// defaults.
#[derive(Clone, Default)]
pub struct HandleOptions {
    pub position_mode: PositionMode,
    pub scale_mode: ScaleMode,
    pub transition_props: Vec<Rc<str>>,
    pub delay_millis: f64,
    pub duration_millis: Option<f64>,
    pub timing_function: Option<Rc<str>>,
    pub parent_flip_key: Option<Key>,
    pub position_spring: Option<SpringConfig>,
    pub on_presence: Option<Rc<dyn Fn(f32) -> Style>>,
}

impl HandleOptions {
    pub(crate) fn timing(&self, defaults: &TransitionTiming) -> TransitionTiming {
        TransitionTiming {
            duration_millis: self.duration_millis.unwrap_or(defaults.duration_millis),
            delay_millis: self.delay_millis,
            timing_function: self
                .timing_function
                .clone()
                .unwrap_or_else(|| defaults.timing_function.clone()),
        }
    }
}

/// One child element carrying a counter-scale during a scaled flip, with the
/// inline values it had before the flip touched it.
pub(crate) struct ChildFlip {
    pub(crate) element: Rc<dyn VisualElement>,
    pub(crate) saved_transform: Option<String>,
    pub(crate) saved_origin: Option<String>,
}

pub(crate) struct HandleState {
    pub(crate) element: Option<Rc<dyn VisualElement>>,
    pub(crate) opts: HandleOptions,
    pub(crate) phase: Phase,
    pub(crate) styler: Option<Styler>,
    pub(crate) position_spring: Option<PositionSpring>,
    pub(crate) presence: Option<Presence>,
    pub(crate) child_flips: Vec<ChildFlip>,
}

/// Per-key record binding an element reference, configuration and lifecycle
/// state. Owned by the registry; the host only ever sees the registration
/// callback.
pub struct NodeHandle {
    key: Key,
    state: RefCell<HandleState>,
}

impl NodeHandle {
    pub(crate) fn new(key: Key, opts: HandleOptions) -> Rc<Self> {
        Rc::new(Self {
            key,
            state: RefCell::new(HandleState {
                element: None,
                opts,
                phase: Phase::Idle,
                styler: None,
                position_spring: None,
                presence: None,
                child_flips: Vec::new(),
            }),
        })
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase
    }

    pub fn is_mounted(&self) -> bool {
        self.state.borrow().element.is_some()
    }

    /// The element's live bounding box, or `None` while unmounted.
    pub fn measure(&self) -> Option<Rect> {
        self.state
            .borrow()
            .element
            .as_ref()
            .map(|el| el.bounding_rect())
    }

    /// Binds or unbinds the element reference. Binding a second distinct
    /// element while one is mounted is a registration error.
    ///
    /// Unbinding cancels the position spring, the presence channel and any
    /// armed transition timer, then drops all per-mount state.
    pub fn bind(
        &self,
        element: Option<Rc<dyn VisualElement>>,
        runtime: &RuntimeHandle,
    ) -> Result<(), FlipError> {
        let mut state = self.state.borrow_mut();
        match element {
            Some(el) => {
                if let Some(current) = &state.element {
                    if !Rc::ptr_eq(current, &el) {
                        return Err(FlipError::DuplicateRegistration {
                            key: self.key.clone(),
                        });
                    }
                    return Ok(());
                }
                state.styler = Some(Styler::new(el.clone(), runtime.clone()));
                state.element = Some(el);
                Ok(())
            }
            None => {
                if let Some(spring) = state.position_spring.take() {
                    spring.cancel();
                }
                if let Some(presence) = state.presence.take() {
                    presence.cancel();
                }
                // Dropping the styler orphans its transition timer.
                state.styler = None;
                state.element = None;
                state.child_flips.clear();
                state.phase = Phase::Idle;
                Ok(())
            }
        }
    }

    pub(crate) fn set_opts(&self, opts: HandleOptions) {
        self.state.borrow_mut().opts = opts;
    }

    pub(crate) fn state(&self) -> RefMut<'_, HandleState> {
        self.state.borrow_mut()
    }

    pub(crate) fn element(&self) -> Option<Rc<dyn VisualElement>> {
        self.state.borrow().element.clone()
    }

    pub(crate) fn styler(&self) -> Option<Styler> {
        self.state.borrow().styler.clone()
    }

    pub(crate) fn timing(&self, defaults: &TransitionTiming) -> TransitionTiming {
        self.state.borrow().opts.timing(defaults)
    }
}
