use std::cell::Cell;
use std::rc::Rc;

use crate::runtime::{FrameCallbackId, RuntimeHandle};

/// Hands out one-shot frame callbacks with cancel-on-drop registrations.
#[derive(Clone)]
pub struct FrameClock {
    runtime: RuntimeHandle,
}

impl FrameClock {
    pub fn new(runtime: RuntimeHandle) -> Self {
        Self { runtime }
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.clone()
    }

    pub fn with_frame_millis(
        &self,
        callback: impl FnOnce(f64) + 'static,
    ) -> FrameCallbackRegistration {
        let runtime = self.runtime.clone();
        let id = runtime.register_frame_callback(callback);
        FrameCallbackRegistration::new(runtime, id)
    }

    /// Runs `callback` after two full frames have elapsed.
    ///
    /// One frame is sometimes not enough to guarantee that a synchronously
    /// applied inverse transform was committed to the screen before the play
    /// phase replaces it, so transition starts always wait out two. The
    /// returned registration cancels whichever stage is still pending.
    pub fn after_two_frames(
        &self,
        callback: impl FnOnce(f64) + 'static,
    ) -> FrameCallbackRegistration {
        let runtime = self.runtime.clone();
        let slot = Rc::new(Cell::new(None));
        let inner_runtime = runtime.clone();
        let inner_slot = Rc::clone(&slot);
        let first = runtime.register_frame_callback(move |_| {
            inner_slot.set(inner_runtime.register_frame_callback(callback));
        });
        slot.set(first);
        FrameCallbackRegistration {
            runtime,
            id: Some(slot),
        }
    }
}

pub struct FrameCallbackRegistration {
    runtime: RuntimeHandle,
    id: Option<Rc<Cell<Option<FrameCallbackId>>>>,
}

impl FrameCallbackRegistration {
    fn new(runtime: RuntimeHandle, id: Option<FrameCallbackId>) -> Self {
        Self {
            runtime,
            id: id.map(|id| Rc::new(Cell::new(Some(id)))),
        }
    }

    pub fn cancel(mut self) {
        self.cancel_pending();
    }

    /// Keeps the callback alive without holding the registration.
    pub fn leak(mut self) {
        self.id.take();
    }

    fn cancel_pending(&mut self) {
        if let Some(slot) = self.id.take() {
            if let Some(id) = slot.take() {
                self.runtime.cancel_frame_callback(id);
            }
        }
    }
}

impl Drop for FrameCallbackRegistration {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
