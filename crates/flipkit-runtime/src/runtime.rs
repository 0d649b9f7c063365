use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::frame_clock::FrameClock;
use crate::platform::{Clock, FrameScheduler};

pub type FrameCallbackId = u64;
pub type TimerId = u64;

struct FrameCallbackEntry {
    id: FrameCallbackId,
    callback: Option<Box<dyn FnOnce(f64) + 'static>>,
}

struct TimerEntry {
    id: TimerId,
    deadline_millis: f64,
    callback: Option<Box<dyn FnOnce() + 'static>>,
}

struct RuntimeInner {
    scheduler: Arc<dyn FrameScheduler>,
    clock: Arc<dyn Clock>,
    needs_frame: Cell<bool>,
    frame_callbacks: RefCell<VecDeque<FrameCallbackEntry>>,
    next_frame_callback_id: Cell<u64>,
    timers: RefCell<Vec<TimerEntry>>,
    next_timer_id: Cell<u64>,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn FrameScheduler>, clock: Arc<dyn Clock>) -> Self {
        Self {
            scheduler,
            clock,
            needs_frame: Cell::new(false),
            frame_callbacks: RefCell::new(VecDeque::new()),
            next_frame_callback_id: Cell::new(1),
            timers: RefCell::new(Vec::new()),
            next_timer_id: Cell::new(1),
        }
    }

    fn schedule(&self) {
        self.needs_frame.set(true);
        self.scheduler.schedule_frame();
    }

    fn register_frame_callback(&self, callback: Box<dyn FnOnce(f64) + 'static>) -> FrameCallbackId {
        let id = self.next_frame_callback_id.get();
        self.next_frame_callback_id.set(id + 1);
        self.frame_callbacks
            .borrow_mut()
            .push_back(FrameCallbackEntry {
                id,
                callback: Some(callback),
            });
        self.schedule();
        id
    }

    fn cancel_frame_callback(&self, id: FrameCallbackId) {
        let mut callbacks = self.frame_callbacks.borrow_mut();
        if let Some(index) = callbacks.iter().position(|entry| entry.id == id) {
            callbacks.remove(index);
        }
        let callbacks_empty = callbacks.is_empty();
        drop(callbacks);
        if callbacks_empty && self.timers.borrow().is_empty() {
            self.needs_frame.set(false);
        }
    }

    fn drain_frame_callbacks(&self, now_millis: f64) {
        // Take the current batch first: callbacks registered while draining
        // belong to the next frame.
        let mut callbacks = self.frame_callbacks.borrow_mut();
        let mut pending: Vec<Box<dyn FnOnce(f64) + 'static>> = Vec::with_capacity(callbacks.len());
        while let Some(mut entry) = callbacks.pop_front() {
            if let Some(callback) = entry.callback.take() {
                pending.push(callback);
            }
        }
        drop(callbacks);
        for callback in pending {
            callback(now_millis);
        }
        if self.frame_callbacks.borrow().is_empty() && self.timers.borrow().is_empty() {
            self.needs_frame.set(false);
        }
    }

    fn set_timeout(&self, delay_millis: f64, callback: Box<dyn FnOnce() + 'static>) -> TimerId {
        let id = self.next_timer_id.get();
        self.next_timer_id.set(id + 1);
        self.timers.borrow_mut().push(TimerEntry {
            id,
            deadline_millis: self.clock.now_millis() + delay_millis.max(0.0),
            callback: Some(callback),
        });
        self.schedule();
        id
    }

    fn cancel_timer(&self, id: TimerId) {
        self.timers.borrow_mut().retain(|entry| entry.id != id);
    }

    fn fire_due_timers(&self, now_millis: f64) {
        // Collect due entries before running any of them; timer callbacks may
        // register or cancel other timers.
        let mut due: Vec<TimerEntry> = Vec::new();
        {
            let mut timers = self.timers.borrow_mut();
            let mut index = 0;
            while index < timers.len() {
                if timers[index].deadline_millis <= now_millis {
                    due.push(timers.remove(index));
                } else {
                    index += 1;
                }
            }
        }
        due.sort_by(|a, b| a.deadline_millis.total_cmp(&b.deadline_millis));
        for mut entry in due {
            if let Some(callback) = entry.callback.take() {
                callback();
            }
        }
    }

    fn next_timer_deadline(&self) -> Option<f64> {
        self.timers
            .borrow()
            .iter()
            .map(|entry| entry.deadline_millis)
            .min_by(|a, b| a.total_cmp(b))
    }

    fn has_pending_work(&self) -> bool {
        !self.frame_callbacks.borrow().is_empty() || !self.timers.borrow().is_empty()
    }
}

/// Owns all frame-callback and timer state for one engine instance.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn FrameScheduler>, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler, clock)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn needs_frame(&self) -> bool {
        self.inner.needs_frame.get()
    }

    pub fn frame_clock(&self) -> FrameClock {
        FrameClock::new(self.handle())
    }
}

/// Weak handle to a [`Runtime`]. All operations no-op once the runtime is
/// dropped, so callbacks held by the host can never outlive the engine.
#[derive(Clone)]
pub struct RuntimeHandle {
    inner: Weak<RuntimeInner>,
}

impl RuntimeHandle {
    pub fn schedule(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.schedule();
        }
    }

    pub fn now_millis(&self) -> f64 {
        self.inner
            .upgrade()
            .map(|inner| inner.clock.now_millis())
            .unwrap_or(0.0)
    }

    pub fn register_frame_callback(
        &self,
        callback: impl FnOnce(f64) + 'static,
    ) -> Option<FrameCallbackId> {
        self.inner
            .upgrade()
            .map(|inner| inner.register_frame_callback(Box::new(callback)))
    }

    pub fn cancel_frame_callback(&self, id: FrameCallbackId) {
        if let Some(inner) = self.inner.upgrade() {
            inner.cancel_frame_callback(id);
        }
    }

    /// Fires every frame callback registered before this call, passing the
    /// shared frame timestamp. Host loops call this once per frame.
    pub fn drain_frame_callbacks(&self, now_millis: f64) {
        if let Some(inner) = self.inner.upgrade() {
            inner.drain_frame_callbacks(now_millis);
        }
    }

    pub fn set_timeout(
        &self,
        delay_millis: f64,
        callback: impl FnOnce() + 'static,
    ) -> Option<TimerId> {
        self.inner
            .upgrade()
            .map(|inner| inner.set_timeout(delay_millis, Box::new(callback)))
    }

    pub fn cancel_timer(&self, id: TimerId) {
        if let Some(inner) = self.inner.upgrade() {
            inner.cancel_timer(id);
        }
    }

    /// Fires every timer whose deadline is at or before `now_millis`, in
    /// deadline order.
    pub fn fire_due_timers(&self, now_millis: f64) {
        if let Some(inner) = self.inner.upgrade() {
            inner.fire_due_timers(now_millis);
        }
    }

    pub fn next_timer_deadline(&self) -> Option<f64> {
        self.inner
            .upgrade()
            .and_then(|inner| inner.next_timer_deadline())
    }

    pub fn has_pending_work(&self) -> bool {
        self.inner
            .upgrade()
            .map(|inner| inner.has_pending_work())
            .unwrap_or(false)
    }

    pub fn frame_clock(&self) -> FrameClock {
        FrameClock::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct NoopScheduler;

    impl FrameScheduler for NoopScheduler {
        fn schedule_frame(&self) {}
    }

    struct FixedClock(std::sync::Mutex<f64>);

    impl FixedClock {
        fn set(&self, now: f64) {
            *self.0.lock().unwrap() = now;
        }
    }

    impl Clock for FixedClock {
        fn now_millis(&self) -> f64 {
            *self.0.lock().unwrap()
        }
    }

    fn runtime() -> (Runtime, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock(std::sync::Mutex::new(0.0)));
        (Runtime::new(Arc::new(NoopScheduler), clock.clone()), clock)
    }

    #[test]
    fn frame_callbacks_fire_once_with_shared_timestamp() {
        let (runtime, _clock) = runtime();
        let handle = runtime.handle();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for _ in 0..3 {
            let seen = Rc::clone(&seen);
            handle.register_frame_callback(move |now| seen.borrow_mut().push(now));
        }
        handle.drain_frame_callbacks(16.0);
        handle.drain_frame_callbacks(32.0);
        assert_eq!(&*seen.borrow(), &[16.0, 16.0, 16.0]);
    }

    #[test]
    fn cancelled_frame_callback_never_fires() {
        let (runtime, _clock) = runtime();
        let handle = runtime.handle();
        let fired = Rc::new(Cell::new(false));
        let fired_in_cb = Rc::clone(&fired);
        let id = handle
            .register_frame_callback(move |_| fired_in_cb.set(true))
            .expect("runtime alive");
        handle.cancel_frame_callback(id);
        handle.drain_frame_callbacks(16.0);
        assert!(!fired.get());
    }

    #[test]
    fn callbacks_registered_while_draining_wait_for_next_frame() {
        let (runtime, _clock) = runtime();
        let handle = runtime.handle();
        let count = Rc::new(Cell::new(0u32));
        {
            let handle = handle.clone();
            let count = Rc::clone(&count);
            runtime.handle().register_frame_callback(move |_| {
                let count = Rc::clone(&count);
                handle.register_frame_callback(move |_| count.set(count.get() + 1));
            });
        }
        handle.drain_frame_callbacks(16.0);
        assert_eq!(count.get(), 0);
        handle.drain_frame_callbacks(32.0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn timers_fire_in_deadline_order() {
        let (runtime, clock) = runtime();
        let handle = runtime.handle();
        let order = Rc::new(RefCell::new(Vec::new()));
        for (label, delay) in [("b", 30.0), ("a", 10.0)] {
            let order = Rc::clone(&order);
            handle.set_timeout(delay, move || order.borrow_mut().push(label));
        }
        clock.set(50.0);
        handle.fire_due_timers(50.0);
        assert_eq!(&*order.borrow(), &["a", "b"]);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let (runtime, _clock) = runtime();
        let handle = runtime.handle();
        let fired = Rc::new(Cell::new(false));
        let fired_in_cb = Rc::clone(&fired);
        let id = handle
            .set_timeout(10.0, move || fired_in_cb.set(true))
            .expect("runtime alive");
        handle.cancel_timer(id);
        handle.fire_due_timers(100.0);
        assert!(!fired.get());
    }

    #[test]
    fn dropped_runtime_ignores_handle_calls() {
        let (runtime, _clock) = runtime();
        let handle = runtime.handle();
        drop(runtime);
        assert!(handle.register_frame_callback(|_| {}).is_none());
        assert!(handle.set_timeout(1.0, || {}).is_none());
        assert!(!handle.has_pending_work());
    }
}
