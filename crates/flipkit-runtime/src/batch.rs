use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::frame_clock::FrameCallbackRegistration;
use crate::runtime::RuntimeHandle;

/// Coalesces per-frame callbacks behind a single runtime frame callback.
///
/// All callbacks registered before the next drain fire together with one
/// shared `dt`, measured from the first registration of the batch. Springs
/// use this so N active springs never mean N frame registrations.
#[derive(Clone)]
pub struct FrameBatcher {
    inner: Rc<RefCell<BatcherInner>>,
}

struct BatcherInner {
    runtime: RuntimeHandle,
    callbacks: Vec<(u64, Box<dyn FnOnce(f64) + 'static>)>,
    next_key: u64,
    batch_started_at: Option<f64>,
    registration: Option<FrameCallbackRegistration>,
}

impl FrameBatcher {
    pub fn new(runtime: RuntimeHandle) -> Self {
        Self {
            inner: Rc::new(RefCell::new(BatcherInner {
                runtime,
                callbacks: Vec::new(),
                next_key: 1,
                batch_started_at: None,
                registration: None,
            })),
        }
    }

    pub fn on_next_frame(&self, callback: impl FnOnce(f64) + 'static) -> BatchRegistration {
        let key = {
            let mut inner = self.inner.borrow_mut();
            let key = inner.next_key;
            inner.next_key += 1;
            inner.callbacks.push((key, Box::new(callback)));
            if inner.batch_started_at.is_none() {
                inner.batch_started_at = Some(inner.runtime.now_millis());
            }
            key
        };
        self.ensure_scheduled();
        BatchRegistration {
            inner: Rc::downgrade(&self.inner),
            key,
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.inner.borrow().callbacks.is_empty()
    }

    fn ensure_scheduled(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.registration.is_some() {
            return;
        }
        let weak = Rc::downgrade(&self.inner);
        let registration = inner
            .runtime
            .frame_clock()
            .with_frame_millis(move |now_millis| {
                if let Some(strong) = weak.upgrade() {
                    Self::on_frame(&strong, now_millis);
                }
            });
        inner.registration = Some(registration);
    }

    fn on_frame(inner: &Rc<RefCell<BatcherInner>>, now_millis: f64) {
        let (callbacks, dt) = {
            let mut inner = inner.borrow_mut();
            let started = inner.batch_started_at.take().unwrap_or(now_millis);
            inner.registration = None;
            let callbacks = std::mem::take(&mut inner.callbacks);
            (callbacks, (now_millis - started).max(0.0))
        };
        for (_, callback) in callbacks {
            callback(dt);
        }
    }
}

/// Cancels one batched callback when dropped unused.
pub struct BatchRegistration {
    inner: Weak<RefCell<BatcherInner>>,
    key: u64,
}

impl BatchRegistration {
    pub fn cancel(self) {
        if let Some(inner) = self.inner.upgrade() {
            inner
                .borrow_mut()
                .callbacks
                .retain(|(key, _)| *key != self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Clock, FrameScheduler};
    use crate::runtime::Runtime;
    use std::cell::Cell;
    use std::sync::{Arc, Mutex};

    struct NoopScheduler;

    impl FrameScheduler for NoopScheduler {
        fn schedule_frame(&self) {}
    }

    struct FixedClock(Mutex<f64>);

    impl Clock for FixedClock {
        fn now_millis(&self) -> f64 {
            *self.0.lock().unwrap()
        }
    }

    fn runtime_with_clock() -> (Runtime, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock(Mutex::new(0.0)));
        (Runtime::new(Arc::new(NoopScheduler), clock.clone()), clock)
    }

    #[test]
    fn batch_shares_one_dt_across_callbacks() {
        let (runtime, clock) = runtime_with_clock();
        let batcher = FrameBatcher::new(runtime.handle());
        let seen = Rc::new(RefCell::new(Vec::new()));
        for _ in 0..3 {
            let seen = Rc::clone(&seen);
            // Registrations are intentionally leaked by dropping; cancel is
            // keyed, not drop-based.
            let _ = batcher.on_next_frame(move |dt| seen.borrow_mut().push(dt));
        }
        *clock.0.lock().unwrap() = 16.0;
        runtime.handle().drain_frame_callbacks(16.0);
        assert_eq!(&*seen.borrow(), &[16.0, 16.0, 16.0]);
    }

    #[test]
    fn callbacks_reregistered_from_a_drain_run_next_frame() {
        let (runtime, clock) = runtime_with_clock();
        let batcher = FrameBatcher::new(runtime.handle());
        let dts = Rc::new(RefCell::new(Vec::new()));
        {
            let batcher = batcher.clone();
            let dts = Rc::clone(&dts);
            let _ = batcher.clone().on_next_frame(move |dt| {
                dts.borrow_mut().push(dt);
                let dts = Rc::clone(&dts);
                let _ = batcher.on_next_frame(move |dt| dts.borrow_mut().push(dt));
            });
        }
        *clock.0.lock().unwrap() = 10.0;
        runtime.handle().drain_frame_callbacks(10.0);
        *clock.0.lock().unwrap() = 26.0;
        runtime.handle().drain_frame_callbacks(26.0);
        assert_eq!(&*dts.borrow(), &[10.0, 16.0]);
    }

    #[test]
    fn cancelled_batch_callback_is_skipped() {
        let (runtime, _clock) = runtime_with_clock();
        let batcher = FrameBatcher::new(runtime.handle());
        let fired = Rc::new(Cell::new(false));
        let fired_in_cb = Rc::clone(&fired);
        let registration = batcher.on_next_frame(move |_| fired_in_cb.set(true));
        registration.cancel();
        runtime.handle().drain_frame_callbacks(16.0);
        assert!(!fired.get());
    }
}
