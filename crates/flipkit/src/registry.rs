use std::cell::RefCell;
use std::rc::Rc;

use flipkit_runtime::RuntimeHandle;

use crate::collections::map::HashMap;
use crate::element::VisualElement;
use crate::handle::{HandleOptions, NodeHandle};
use crate::key::Key;

/// Stable registration callback handed to the host. Calling it with `Some`
/// binds the element for the handle's key, `None` unbinds it.
pub type RefCallback = Rc<dyn Fn(Option<Rc<dyn VisualElement>>)>;

/// Owns the per-key handles. The host holds only [`RefCallback`]s, so the
/// registry is the single writer of handle state outside the orchestrator.
pub struct HandleRegistry {
    inner: Rc<RefCell<RegistryInner>>,
}

struct RegistryInner {
    runtime: RuntimeHandle,
    entries: HashMap<Key, Entry>,
}

struct Entry {
    handle: Rc<NodeHandle>,
    callback: RefCallback,
}

impl HandleRegistry {
    pub(crate) fn new(runtime: RuntimeHandle) -> Self {
        Self {
            inner: Rc::new(RefCell::new(RegistryInner {
                runtime,
                entries: HashMap::default(),
            })),
        }
    }

    /// Returns the stable callback for `key`, creating the handle on first
    /// use. Re-registering updates the options in place and returns the same
    /// callback, so host re-renders never re-trigger binding.
    ///
    /// A bind of a second live element for one key is reported through the
    /// callback as an error log and ignored; the first element stays bound.
    pub fn register_or_update(&self, key: Key, opts: HandleOptions) -> RefCallback {
        let mut inner = self.inner.borrow_mut();
        if let Some(entry) = inner.entries.get(&key) {
            entry.handle.set_opts(opts);
            return entry.callback.clone();
        }

        let handle = NodeHandle::new(key.clone(), opts);
        let weak = Rc::downgrade(&self.inner);
        let cb_handle = handle.clone();
        let callback: RefCallback = Rc::new(move |element| {
            let Some(inner) = weak.upgrade() else { return };
            let runtime = inner.borrow().runtime.clone();
            let unbinding = element.is_none();
            if let Err(err) = cb_handle.bind(element, &runtime) {
                log::error!("flip registration failed: {err}");
                return;
            }
            if unbinding {
                inner.borrow_mut().entries.remove(cb_handle.key());
            }
        });
        inner.entries.insert(
            key,
            Entry {
                handle,
                callback: callback.clone(),
            },
        );
        callback
    }

    pub fn get(&self, key: &Key) -> Option<Rc<NodeHandle>> {
        self.inner.borrow().entries.get(key).map(|e| e.handle.clone())
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.inner.borrow().entries.contains_key(key)
    }

    /// Snapshot of all current handles, safe to iterate while callbacks run.
    pub fn handles(&self) -> Vec<Rc<NodeHandle>> {
        self.inner
            .borrow()
            .entries
            .values()
            .map(|e| e.handle.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flipkit_geometry::{EdgeInsets, Point, Rect};
    use flipkit_runtime::{Clock, FrameScheduler, Runtime};
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

    struct Dot;
    impl VisualElement for Dot {
        fn bounding_rect(&self) -> Rect {
            Rect::ZERO
        }
        fn offset_position(&self) -> Point {
            Point::ZERO
        }
        fn margins(&self) -> EdgeInsets {
            EdgeInsets::ZERO
        }
        fn style(&self, _prop: &str) -> Option<String> {
            None
        }
        fn set_style(&self, _prop: &str, _value: &str) {}
        fn remove_style(&self, _prop: &str) {}
        fn children(&self) -> Vec<Rc<dyn VisualElement>> {
            Vec::new()
        }
    }

    fn registry() -> (Runtime, HandleRegistry) {
        let rt = Runtime::new(Arc::new(NoopScheduler), Arc::new(FixedClock(Mutex::new(0.0))));
        let registry = HandleRegistry::new(rt.handle());
        (rt, registry)
    }

    #[test]
    fn re_registration_returns_the_same_callback() {
        let (_rt, registry) = registry();
        let a = registry.register_or_update("a".into(), HandleOptions::default());
        let b = registry.register_or_update("a".into(), HandleOptions::default());
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unbind_removes_the_entry() {
        let (_rt, registry) = registry();
        let cb = registry.register_or_update("a".into(), HandleOptions::default());
        cb(Some(Rc::new(Dot)));
        assert!(registry.get(&Key::from("a")).unwrap().is_mounted());

        cb(None);
        assert!(registry.get(&Key::from("a")).is_none());
    }

    #[test]
    fn duplicate_live_bind_keeps_the_first_element() {
        let (_rt, registry) = registry();
        let cb = registry.register_or_update("a".into(), HandleOptions::default());
        let first: Rc<dyn VisualElement> = Rc::new(Dot);
        cb(Some(first));
        cb(Some(Rc::new(Dot)));
        // Second bind is rejected; the handle stays mounted and registered.
        assert!(registry.get(&Key::from("a")).unwrap().is_mounted());
        assert_eq!(registry.len(), 1);
    }
}
