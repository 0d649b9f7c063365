use std::cell::RefCell;
use std::rc::{Rc, Weak};

use flipkit_runtime::FrameBatcher;

use crate::spring::{Spring, SpringConfig};

/// Scalar presence channel: 0 is fully absent, 1 fully present.
///
/// Entering items ramp 0 → 1, leaving items 1 → 0; every interpolated value
/// is handed to the host-provided apply callback, which typically maps it to
/// an opacity/offset style fragment. The spring is created lazily and
/// discarded on settle, like any other spring in the engine.
pub struct Presence {
    inner: Rc<RefCell<PresenceInner>>,
}

struct PresenceInner {
    batcher: FrameBatcher,
    config: SpringConfig,
    value: f32,
    spring: Option<Spring>,
    apply: Rc<dyn Fn(f32)>,
    on_settle: Option<Box<dyn FnOnce(f32)>>,
}

impl Presence {
    pub fn new(
        batcher: FrameBatcher,
        config: SpringConfig,
        start: f32,
        apply: impl Fn(f32) + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(PresenceInner {
                batcher,
                config,
                value: start,
                spring: None,
                apply: Rc::new(apply),
                on_settle: None,
            })),
        }
    }

    pub fn value(&self) -> f32 {
        self.inner.borrow().value
    }

    pub fn is_active(&self) -> bool {
        self.inner.borrow().spring.is_some()
    }

    /// Animates toward `target`, replacing any previous settle callback. The
    /// callback fires once, with the settled value.
    pub fn animate_to(&self, target: f32, on_settle: impl FnOnce(f32) + 'static) {
        let spring = {
            let mut inner = self.inner.borrow_mut();
            inner.on_settle = Some(Box::new(on_settle));
            inner.spring.clone()
        };
        if let Some(spring) = spring {
            spring.animate_to(target);
            return;
        }
        let weak = Rc::downgrade(&self.inner);
        let weak_finish = Weak::clone(&weak);
        let spring = {
            let inner = self.inner.borrow();
            Spring::new(
                inner.batcher.clone(),
                inner.value,
                inner.config,
                move |value| {
                    if let Some(strong) = weak.upgrade() {
                        let apply = {
                            let mut inner = strong.borrow_mut();
                            inner.value = value;
                            Rc::clone(&inner.apply)
                        };
                        apply(value);
                    }
                },
                move || {
                    if let Some(strong) = weak_finish.upgrade() {
                        let settle = {
                            let mut inner = strong.borrow_mut();
                            inner.spring = None;
                            inner.on_settle.take().map(|cb| (cb, inner.value))
                        };
                        if let Some((cb, value)) = settle {
                            cb(value);
                        }
                    }
                },
            )
        };
        spring.animate_to(target);
        self.inner.borrow_mut().spring = Some(spring);
    }

    pub fn cancel(&self) {
        let spring = {
            let mut inner = self.inner.borrow_mut();
            inner.on_settle = None;
            inner.spring.take()
        };
        if let Some(spring) = spring {
            spring.cancel();
        }
    }
}

impl Clone for Presence {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}
