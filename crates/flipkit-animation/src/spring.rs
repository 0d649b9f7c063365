use std::cell::RefCell;
use std::rc::Rc;

use flipkit_runtime::{BatchRegistration, FrameBatcher};

/// Frame gaps beyond this are not worth integrating: a backgrounded host can
/// report multi-second deltas, and stepping through them is numerically
/// useless. The spring finishes in place instead.
const MAX_FRAME_GAP_MILLIS: f64 = 2_000.0;

/// Spring physics configuration. Tension and friction use the familiar
/// react-spring-style magnitudes; internally they are scaled to pt/ms².
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringConfig {
    pub mass: f32,
    pub tension: f32,
    pub friction: f32,
    /// Distance from target below which the spring may come to rest.
    pub precision: f32,
    /// Velocity below which the spring counts as no longer moving.
    /// `None` defaults to `precision / 10`.
    pub rest_velocity: Option<f32>,
}

impl SpringConfig {
    pub fn new(mass: f32, tension: f32, friction: f32, precision: f32) -> Self {
        Self {
            mass,
            tension,
            friction,
            precision,
            rest_velocity: None,
        }
    }

    pub fn with_rest_velocity(mut self, rest_velocity: f32) -> Self {
        self.rest_velocity = Some(rest_velocity);
        self
    }

    pub fn rest_velocity(&self) -> f32 {
        self.rest_velocity.unwrap_or(self.precision / 10.0)
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            mass: 1.0,
            tension: 170.0,
            friction: 26.0,
            precision: 0.1,
            rest_velocity: None,
        }
    }
}

/// A single-axis spring stepped by semi-implicit Euler integration from the
/// shared frame batcher.
///
/// The spring runs while a target is set and a batch registration is live;
/// on settling it snaps exactly to the target, fires its completion callback
/// and deactivates.
pub struct Spring {
    inner: Rc<RefCell<SpringInner>>,
}

struct SpringInner {
    batcher: FrameBatcher,
    config: SpringConfig,
    value: f32,
    velocity: f32,
    target: f32,
    registration: Option<BatchRegistration>,
    on_update: Rc<dyn Fn(f32)>,
    on_finish: Rc<dyn Fn()>,
}

impl Spring {
    pub fn new(
        batcher: FrameBatcher,
        start_value: f32,
        config: SpringConfig,
        on_update: impl Fn(f32) + 'static,
        on_finish: impl Fn() + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SpringInner {
                batcher,
                config,
                value: start_value,
                velocity: 0.0,
                target: start_value,
                registration: None,
                on_update: Rc::new(on_update),
                on_finish: Rc::new(on_finish),
            })),
        }
    }

    pub fn value(&self) -> f32 {
        self.inner.borrow().value
    }

    pub fn velocity(&self) -> f32 {
        self.inner.borrow().velocity
    }

    /// Overwrites the current value without touching velocity. Used when a
    /// new session re-targets an in-flight spring from a freshly measured
    /// inverse delta.
    pub fn set_value(&self, value: f32) {
        self.inner.borrow_mut().value = value;
    }

    pub fn animate_to(&self, target: f32) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.target = target;
            if inner.registration.is_some() {
                return;
            }
        }
        Self::schedule(&self.inner);
    }

    pub fn cancel(&self) {
        let registration = self.inner.borrow_mut().registration.take();
        if let Some(registration) = registration {
            registration.cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.borrow().registration.is_some()
    }

    fn schedule(this: &Rc<RefCell<SpringInner>>) {
        let batcher = this.borrow().batcher.clone();
        let weak = Rc::downgrade(this);
        let registration = batcher.on_next_frame(move |dt| {
            if let Some(strong) = weak.upgrade() {
                Self::step(&strong, dt);
            }
        });
        this.borrow_mut().registration = Some(registration);
    }

    fn step(this: &Rc<RefCell<SpringInner>>, dt_millis: f64) {
        let (outcome, on_update, on_finish) = {
            let mut inner = this.borrow_mut();
            inner.registration = None;

            let outcome = if dt_millis > MAX_FRAME_GAP_MILLIS {
                inner.value = inner.target;
                inner.velocity = 0.0;
                Outcome::Finished {
                    target: inner.target,
                }
            } else {
                inner.integrate(dt_millis)
            };
            (
                outcome,
                Rc::clone(&inner.on_update),
                Rc::clone(&inner.on_finish),
            )
        };

        match outcome {
            Outcome::Finished { target } => {
                on_update(target);
                on_finish();
            }
            Outcome::Running { value } => {
                Self::schedule(this);
                on_update(value);
            }
        }
    }
}

enum Outcome {
    Finished { target: f32 },
    Running { value: f32 },
}

impl SpringInner {
    fn integrate(&mut self, dt_millis: f64) -> Outcome {
        let rest_velocity = self.config.rest_velocity();
        // Integer-millisecond steps, at most 250 per frame: large deltas
        // coarsen the step instead of exploding the loop.
        let step = (dt_millis / 250.0).round().max(1.0) as f32;
        let num_steps = (dt_millis / step as f64).ceil() as u32;
        let mut finished = false;

        for _ in 0..num_steps {
            let is_moving = self.velocity.abs() > rest_velocity;
            if !is_moving {
                finished = (self.target - self.value).abs() <= self.config.precision;
                if finished {
                    break;
                }
            }
            let spring_force = -self.config.tension * 0.000_001 * (self.value - self.target);
            let damping_force = -self.config.friction * 0.001 * self.velocity;
            let acceleration = (spring_force + damping_force) / self.config.mass;
            self.velocity += acceleration * step;
            self.value += self.velocity * step;
        }

        if finished {
            self.value = self.target;
            self.velocity = 0.0;
            Outcome::Finished {
                target: self.target,
            }
        } else {
            Outcome::Running { value: self.value }
        }
    }
}

impl Clone for Spring {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}
