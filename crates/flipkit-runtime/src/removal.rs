use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::runtime::{RuntimeHandle, TimerId};

pub const DEFAULT_REMOVAL_WINDOW_MILLIS: f64 = 50.0;

/// Debounces "ready for removal" keys over a short timer window and flushes
/// them in one batch, so several items finishing their leave animations in
/// quick succession cause a single rendered-set update instead of one each.
pub struct RemovalBatcher<K> {
    inner: Rc<RefCell<RemovalInner<K>>>,
}

struct RemovalInner<K> {
    runtime: RuntimeHandle,
    window_millis: f64,
    pending: Vec<K>,
    timer: Option<TimerId>,
    on_flush: Rc<dyn Fn(Vec<K>)>,
}

impl<K: PartialEq + Clone + 'static> RemovalBatcher<K> {
    pub fn new(runtime: RuntimeHandle, window_millis: f64, on_flush: impl Fn(Vec<K>) + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(RemovalInner {
                runtime,
                window_millis,
                pending: Vec::new(),
                timer: None,
                on_flush: Rc::new(on_flush),
            })),
        }
    }

    pub fn push(&self, key: K) {
        let mut inner = self.inner.borrow_mut();
        if inner.pending.contains(&key) {
            return;
        }
        inner.pending.push(key);
        if inner.timer.is_some() {
            return;
        }
        let weak = Rc::downgrade(&self.inner);
        let window = inner.window_millis;
        inner.timer = inner.runtime.set_timeout(window, move || {
            Self::flush(&weak);
        });
    }

    /// Withdraws a key that was queued but whose leave got aborted.
    pub fn cancel(&self, key: &K) {
        self.inner.borrow_mut().pending.retain(|k| k != key);
    }

    pub fn has_pending(&self) -> bool {
        !self.inner.borrow().pending.is_empty()
    }

    fn flush(weak: &Weak<RefCell<RemovalInner<K>>>) {
        let Some(strong) = weak.upgrade() else {
            return;
        };
        // The borrow is dropped before the flush callback runs; it may push
        // new keys or touch the batcher again.
        let (keys, on_flush) = {
            let mut inner = strong.borrow_mut();
            inner.timer = None;
            (std::mem::take(&mut inner.pending), Rc::clone(&inner.on_flush))
        };
        if keys.is_empty() {
            return;
        }
        on_flush(keys);
    }
}

impl<K> Clone for RemovalBatcher<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}
