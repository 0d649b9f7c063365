use std::cell::RefCell;
use std::rc::{Rc, Weak};

use flipkit_geometry::Rect;
use flipkit_runtime::FrameBatcher;

use crate::spring::{Spring, SpringConfig};

/// Paired x/y springs animating one element's translate transform from an
/// inverse FLIP delta back to identity.
///
/// Axis springs are created lazily, only for axes whose delta is non-zero,
/// and discarded on settle; when neither axis has a live spring the transform
/// is cleared entirely. Re-animating while in flight overwrites the live
/// spring's value with the newly measured inverse delta — velocities carry
/// over, so motion stays continuous.
pub struct PositionSpring {
    inner: Rc<RefCell<PositionInner>>,
}

struct PositionInner {
    batcher: FrameBatcher,
    config: SpringConfig,
    x_spring: Option<Spring>,
    y_spring: Option<Spring>,
    x_val: Option<f32>,
    y_val: Option<f32>,
    apply: Rc<dyn Fn(Option<(f32, f32)>)>,
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

impl PositionSpring {
    /// `apply` writes the transform: `Some((tx, ty))` sets a translate in
    /// pixels, `None` removes the transform style entirely.
    pub fn new(
        batcher: FrameBatcher,
        config: SpringConfig,
        apply: impl Fn(Option<(f32, f32)>) + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(PositionInner {
                batcher,
                config,
                x_spring: None,
                y_spring: None,
                x_val: None,
                y_val: None,
                apply: Rc::new(apply),
            })),
        }
    }

    /// Clears the transform without touching spring state.
    pub fn reset(&self) {
        let apply = Rc::clone(&self.inner.borrow().apply);
        apply(None);
    }

    pub fn is_active(&self) -> bool {
        let inner = self.inner.borrow();
        inner.x_spring.is_some() || inner.y_spring.is_some()
    }

    pub fn cancel(&self) {
        let (x_spring, y_spring) = {
            let mut inner = self.inner.borrow_mut();
            (inner.x_spring.take(), inner.y_spring.take())
        };
        if let Some(spring) = x_spring {
            spring.cancel();
        }
        if let Some(spring) = y_spring {
            spring.cancel();
        }
    }

    /// Starts (or re-targets) the inverse-transform animation moving the
    /// element from `before` toward `target`.
    pub fn animate(&self, before: Rect, target: Rect) {
        let (x_diff, y_diff) = target.delta_to(&before);
        {
            let inner = self.inner.borrow();
            if inner.x_spring.is_none()
                && inner.y_spring.is_none()
                && x_diff == 0.0
                && y_diff == 0.0
            {
                return;
            }
        }
        // Invert synchronously so the element visually stays put until the
        // springs play it back to identity.
        let apply = Rc::clone(&self.inner.borrow().apply);
        apply(Some((-x_diff, -y_diff)));

        self.animate_axis(Axis::X, -x_diff);
        self.animate_axis(Axis::Y, -y_diff);
    }

    fn animate_axis(&self, axis: Axis, start: f32) {
        let existing = {
            let inner = self.inner.borrow();
            match axis {
                Axis::X => inner.x_spring.clone(),
                Axis::Y => inner.y_spring.clone(),
            }
        };
        if let Some(spring) = existing {
            spring.set_value(start);
            return;
        }
        if start == 0.0 {
            return;
        }
        let weak = Rc::downgrade(&self.inner);
        let weak_finish = Weak::clone(&weak);
        let spring = {
            let inner = self.inner.borrow();
            Spring::new(
                inner.batcher.clone(),
                start,
                inner.config,
                move |value| {
                    if let Some(strong) = weak.upgrade() {
                        PositionInner::on_axis_update(&strong, axis, value);
                    }
                },
                move || {
                    if let Some(strong) = weak_finish.upgrade() {
                        PositionInner::on_axis_finish(&strong, axis);
                    }
                },
            )
        };
        spring.animate_to(0.0);
        let mut inner = self.inner.borrow_mut();
        match axis {
            Axis::X => inner.x_spring = Some(spring),
            Axis::Y => inner.y_spring = Some(spring),
        }
    }
}

impl PositionInner {
    fn on_axis_update(this: &Rc<RefCell<PositionInner>>, axis: Axis, value: f32) {
        let apply_args = {
            let mut inner = this.borrow_mut();
            match axis {
                Axis::X => inner.x_val = Some(value),
                Axis::Y => inner.y_val = Some(value),
            }
            inner.style_if_done()
        };
        if let Some((apply, tx, ty)) = apply_args {
            apply(Some((tx, ty)));
        }
    }

    fn on_axis_finish(this: &Rc<RefCell<PositionInner>>, axis: Axis) {
        let apply = {
            let mut inner = this.borrow_mut();
            match axis {
                Axis::X => inner.x_spring = None,
                Axis::Y => inner.y_spring = None,
            }
            if inner.x_spring.is_none() && inner.y_spring.is_none() {
                Some(Rc::clone(&inner.apply))
            } else {
                None
            }
        };
        if let Some(apply) = apply {
            apply(None);
        }
    }

    /// Both live axes must have reported a value for this frame before the
    /// transform is written once, with the combined offsets.
    fn style_if_done(&mut self) -> Option<(Rc<dyn Fn(Option<(f32, f32)>)>, f32, f32)> {
        let x_ready = self.x_spring.is_none() || self.x_val.is_some();
        let y_ready = self.y_spring.is_none() || self.y_val.is_some();
        if !x_ready || !y_ready {
            return None;
        }
        let tx = self.x_val.take().unwrap_or(0.0);
        let ty = self.y_val.take().unwrap_or(0.0);
        Some((Rc::clone(&self.apply), tx, ty))
    }
}

impl Clone for PositionSpring {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}
