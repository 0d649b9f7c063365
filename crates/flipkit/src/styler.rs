use std::cell::RefCell;
use std::rc::Rc;

use flipkit_runtime::{RuntimeHandle, TimerId};

use crate::collections::map::HashSet;
use crate::element::VisualElement;
use crate::style::{Style, TransitionTiming};

/// Layered inline-style writer for one element.
///
/// Every write captures the property's previous value the first time it is
/// touched, so [`Styler::clear_styles`] restores the element exactly as it
/// was before the first layer went on. Arming a transition restores all
/// non-sticky properties, publishes a transition string covering them, and
/// fires the accumulated done callbacks once the transition window elapses.
#[derive(Clone)]
pub struct Styler {
    inner: Rc<RefCell<StylerInner>>,
}

struct StylerInner {
    element: Rc<dyn VisualElement>,
    runtime: RuntimeHandle,
    original: Vec<(Rc<str>, Option<String>)>,
    dont_reset: HashSet<Rc<str>>,
    active_names: HashSet<Rc<str>>,
    on_dones: Vec<Box<dyn FnOnce()>>,
    transition_timer: Option<TimerId>,
}

#[derive(Default)]
pub struct AddStyleOpts {
    pub dont_reset: bool,
    pub on_done: Option<Box<dyn FnOnce()>>,
}

impl Styler {
    pub fn new(element: Rc<dyn VisualElement>, runtime: RuntimeHandle) -> Self {
        Self {
            inner: Rc::new(RefCell::new(StylerInner {
                element,
                runtime,
                original: Vec::new(),
                dont_reset: HashSet::default(),
                active_names: HashSet::default(),
                on_dones: Vec::new(),
                transition_timer: None,
            })),
        }
    }

    /// Applies a named style layer. The first write to each property saves
    /// its prior value for restoration.
    pub fn add_style(&self, name: &str, style: &Style, opts: AddStyleOpts) {
        let mut inner = self.inner.borrow_mut();
        for (prop, val) in style {
            if !inner.original.iter().any(|(p, _)| p == prop) {
                let prior = inner.element.style(prop);
                inner.original.push((prop.clone(), prior));
            }
            if opts.dont_reset {
                inner.dont_reset.insert(prop.clone());
            }
            let rendered = val.render(prop);
            inner.element.set_style(prop, &rendered);
        }
        inner.active_names.insert(name.into());
        if let Some(on_done) = opts.on_done {
            inner.on_dones.push(on_done);
        }
    }

    /// Restores every captured property and drops all layer state. Pending
    /// done callbacks never fire.
    pub fn clear_styles(&self) {
        let mut inner = self.inner.borrow_mut();
        let original = std::mem::take(&mut inner.original);
        for (prop, val) in &original {
            match val {
                Some(v) => inner.element.set_style(prop, v),
                None => inner.element.remove_style(prop),
            }
        }
        inner.active_names.clear();
        inner.on_dones.clear();
        inner.dont_reset.clear();
        if let Some(timer) = inner.transition_timer.take() {
            inner.runtime.cancel_timer(timer);
        }
    }

    pub fn has_style(&self, name: &str) -> bool {
        self.inner.borrow().active_names.contains(name)
    }

    pub fn has_active_styles(&self) -> bool {
        !self.inner.borrow().active_names.is_empty()
    }

    /// Queues a callback for the next transition completion.
    pub fn push_on_done(&self, on_done: impl FnOnce() + 'static) {
        self.inner.borrow_mut().on_dones.push(Box::new(on_done));
    }

    /// Restores all non-sticky properties, publishes a transition string
    /// covering them plus `extra_props`, and arms a timer for
    /// `timing.total_millis()` after which the done callbacks run and
    /// remaining styles clear.
    ///
    /// `transformOrigin` and properties applied with `dont_reset` keep
    /// their overridden values until [`Styler::clear_styles`].
    pub fn arm_transition(&self, timing: &TransitionTiming, extra_props: &[Rc<str>]) {
        let weak = Rc::downgrade(&self.inner);
        let mut inner = self.inner.borrow_mut();
        if inner.active_names.is_empty() {
            return;
        }

        let mut restored: Vec<Rc<str>> = Vec::new();
        let mut kept: Vec<(Rc<str>, Option<String>)> = Vec::new();
        for (prop, val) in std::mem::take(&mut inner.original) {
            if prop.as_ref() == "transformOrigin" || inner.dont_reset.contains(&prop) {
                kept.push((prop, val));
                continue;
            }
            match &val {
                Some(v) => inner.element.set_style(&prop, v),
                None => inner.element.remove_style(&prop),
            }
            restored.push(prop);
        }
        inner.original = kept;
        // Layer names stay active until clear, so a session opening while
        // the transition runs still sees which layers are applied.
        inner.active_names.insert("transition".into());
        let prior_transition = inner.element.style("transition");
        let mut clauses: Vec<String> = Vec::with_capacity(restored.len() + 1);
        if let Some(prior) = &prior_transition {
            if !prior.is_empty() {
                clauses.push(prior.clone());
            }
        }
        for prop in &restored {
            clauses.push(timing.clause(prop));
        }
        for prop in extra_props {
            if !restored.contains(prop) {
                clauses.push(timing.clause(prop));
            }
        }
        if !inner.original.iter().any(|(p, _)| p.as_ref() == "transition") {
            inner
                .original
                .push(("transition".into(), prior_transition));
        }
        let joined = clauses.join(", ");
        inner.element.set_style("transition", &joined);

        inner.transition_timer = inner.runtime.set_timeout(timing.total_millis(), move || {
            if let Some(styler) = weak.upgrade().map(|inner| Styler { inner }) {
                styler.finish_transition();
            }
        });
    }

    fn finish_transition(&self) {
        let on_dones = {
            let mut inner = self.inner.borrow_mut();
            inner.transition_timer = None;
            std::mem::take(&mut inner.on_dones)
        };
        for on_done in on_dones {
            on_done();
        }
        self.clear_styles();
    }
}
