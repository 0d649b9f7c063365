use std::cell::RefCell;
use std::rc::{Rc, Weak};

use flipkit_animation::{PositionSpring, Presence};
use flipkit_geometry::Rect;
use flipkit_runtime::{
    FrameBatcher, FrameCallbackRegistration, FrameClock, RemovalBatcher, RuntimeHandle,
    DEFAULT_REMOVAL_WINDOW_MILLIS,
};

use crate::collections::map::{HashMap, HashSet};
use crate::diff::{merge_diff, LeaveVerdict};
use crate::element::VisualElement;
use crate::error::FlipError;
use crate::flip::{self, FlipEntry};
use crate::handle::{HandleOptions, NodeHandle, Phase, PositionMode};
use crate::key::{ChangeKey, Key, KeyedItem};
use crate::registry::{HandleRegistry, RefCallback};
use crate::style::{Style, TransitionTiming};
use crate::styler::AddStyleOpts;

/// Group-level defaults and enter/leave style policy.
#[derive(Clone)]
pub struct GroupOptions {
    pub duration_millis: f64,
    pub timing_function: Rc<str>,
    /// Layout fragment applied while measuring an entering element's start
    /// geometry, e.g. an off-screen margin.
    pub enter_position_style: Option<Style>,
    /// Non-layout fragment applied to entering elements for the first two
    /// frames, then released into the transition.
    pub enter_decoration_style: Option<Style>,
    /// Final style leaving elements transition toward. When unset, removed
    /// keys drop from the rendered set immediately with no leave animation.
    pub leave_style: Option<Style>,
    pub removal_window_millis: f64,
}

impl Default for GroupOptions {
    fn default() -> Self {
        Self {
            duration_millis: 200.0,
            timing_function: "ease-in-out".into(),
            enter_position_style: None,
            enter_decoration_style: None,
            leave_style: None,
            removal_window_millis: DEFAULT_REMOVAL_WINDOW_MILLIS,
        }
    }
}

impl GroupOptions {
    fn timing_defaults(&self) -> TransitionTiming {
        TransitionTiming {
            duration_millis: self.duration_millis,
            delay_millis: 0.0,
            timing_function: self.timing_function.clone(),
        }
    }
}

/// The transition orchestrator for one set of keyed elements.
///
/// Host protocol per change: [`FlipGroup::prepare`] with the new change key
/// and requested items (geometry is measured while the old layout is still
/// up), then the host re-renders from [`FlipGroup::rendered_items`],
/// re-binding elements through the registration callbacks, then
/// [`FlipGroup::commit`] classifies every handle, applies inverse transforms
/// and schedules the play phase.
pub struct FlipGroup {
    registry: HandleRegistry,
    inner: Rc<RefCell<GroupInner>>,
}

struct GroupInner {
    frame_clock: FrameClock,
    batcher: FrameBatcher,
    options: GroupOptions,
    rendered: Vec<KeyedItem>,
    entering: HashSet<Key>,
    leaving: HashSet<Key>,
    last_change_key: Option<ChangeKey>,
    session: Option<HashMap<Key, Rect>>,
    pending_play: Option<FrameCallbackRegistration>,
    removal: Option<RemovalBatcher<Key>>,
    on_items_changed: Option<Rc<dyn Fn()>>,
}

impl FlipGroup {
    pub fn new(runtime: RuntimeHandle, options: GroupOptions) -> Self {
        let registry = HandleRegistry::new(runtime.clone());
        let window = options.removal_window_millis;
        let inner = Rc::new(RefCell::new(GroupInner {
            frame_clock: runtime.frame_clock(),
            batcher: FrameBatcher::new(runtime.clone()),
            options,
            rendered: Vec::new(),
            entering: HashSet::default(),
            leaving: HashSet::default(),
            last_change_key: None,
            session: None,
            pending_play: None,
            removal: None,
            on_items_changed: None,
        }));
        let weak = Rc::downgrade(&inner);
        let removal = RemovalBatcher::new(runtime, window, move |keys: Vec<Key>| {
            Self::finish_removals(&weak, keys);
        });
        inner.borrow_mut().removal = Some(removal);
        Self { registry, inner }
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    /// Registration entry point handed through to the host view layer.
    pub fn register_node(&self, key: impl Into<Key>, opts: HandleOptions) -> RefCallback {
        self.registry.register_or_update(key.into(), opts)
    }

    /// The sequence the host should currently render: requested items plus
    /// any still animating out.
    pub fn rendered_items(&self) -> Vec<KeyedItem> {
        self.inner.borrow().rendered.clone()
    }

    /// Called whenever batched leave completions shrink the rendered set;
    /// the host re-renders in response.
    pub fn set_on_items_changed(&self, callback: impl Fn() + 'static) {
        self.inner.borrow_mut().on_items_changed = Some(Rc::new(callback));
    }

    /// Diffs `requested` into the rendered set and, when `change_key`
    /// differs from the previous one, opens a transition session by
    /// measuring every mounted element's live geometry.
    ///
    /// Calling with an unchanged key updates the rendered set but starts no
    /// session, so repeated host renders are idempotent. A key that was
    /// leaving and reappears has its leave aborted and its pre-leave styling
    /// restored.
    pub fn prepare(
        &self,
        change_key: ChangeKey,
        requested: &[KeyedItem],
    ) -> Result<(), FlipError> {
        let (prev, keep_leavers) = {
            let inner = self.inner.borrow();
            (inner.rendered.clone(), inner.options.leave_style.is_some())
        };

        let mut entering: HashSet<Key> = HashSet::default();
        let mut leaving: HashSet<Key> = HashSet::default();
        let merged = merge_diff(
            &prev,
            requested,
            |item| {
                let presence_leave = self
                    .registry
                    .get(&item.key)
                    .map(|h| h.state().opts.on_presence.is_some())
                    .unwrap_or(false);
                if keep_leavers || presence_leave {
                    leaving.insert(item.key.clone());
                    LeaveVerdict::Keep
                } else {
                    LeaveVerdict::Drop
                }
            },
            |item| {
                entering.insert(item.key.clone());
            },
        )?;

        self.abort_reentries(requested);

        let mut inner = self.inner.borrow_mut();
        inner.rendered = merged;
        inner.entering = entering;
        inner.leaving = leaving;

        let first = inner.last_change_key.is_none();
        let changed = inner.last_change_key != Some(change_key);
        inner.last_change_key = Some(change_key);
        if first || !changed {
            return Ok(());
        }

        // New session: whatever the previous one still had queued is stale.
        inner.pending_play = None;
        let retained_leaving = inner.leaving.clone();
        drop(inner);

        // Measure live geometry first, then strip in-flight styling so the
        // re-rendered layout settles naturally. Handles mid-leave keep their
        // styling; aborted leaves were already restored above.
        let mut before: HashMap<Key, Rect> = HashMap::default();
        let handles = self.registry.handles();
        for handle in &handles {
            if let Some(rect) = handle.measure() {
                before.insert(handle.key().clone(), rect);
            }
        }
        for handle in &handles {
            let mid_leave = retained_leaving.contains(handle.key())
                && handle
                    .styler()
                    .map(|s| s.has_style("leaving"))
                    .unwrap_or(false);
            if !mid_leave {
                if let Some(styler) = handle.styler() {
                    styler.clear_styles();
                }
            }
        }

        self.inner.borrow_mut().session = Some(before);
        Ok(())
    }

    /// Runs the open session: classifies handles, styles entering and
    /// leaving elements, computes parent-corrected deltas, applies inverse
    /// transforms and schedules the play phase two frames out. No-op when
    /// [`FlipGroup::prepare`] opened no session.
    pub fn commit(&self) {
        let Some(mut before) = self.inner.borrow_mut().session.take() else {
            return;
        };
        let (entering, leaving, options, batcher, frame_clock) = {
            let mut inner = self.inner.borrow_mut();
            (
                std::mem::take(&mut inner.entering),
                std::mem::take(&mut inner.leaving),
                inner.options.clone(),
                inner.batcher.clone(),
                inner.frame_clock.clone(),
            )
        };
        let defaults = options.timing_defaults();
        let handles = self.registry.handles();

        let mut entering_handles: Vec<Rc<NodeHandle>> = Vec::new();
        for key in &entering {
            if before.contains_key(key) {
                log::warn!("`{key}` is marked entering but was already measured, treating as staying");
                if let Some(handle) = self.registry.get(key) {
                    handle.state().phase = Phase::Staying;
                }
                continue;
            }
            if let Some(handle) = self.registry.get(key) {
                if handle.is_mounted() {
                    entering_handles.push(handle);
                }
            }
        }
        self.style_entering(&mut before, &entering_handles, &options, &batcher);

        for key in &leaving {
            let Some(handle) = self.registry.get(key) else {
                continue;
            };
            if !handle.is_mounted() {
                continue;
            }
            let already = handle
                .styler()
                .map(|s| s.has_style("leaving"))
                .unwrap_or(false);
            if !already {
                self.style_leaving(&handle, &before, &options, &defaults, &batcher);
            }
            handle.state().phase = Phase::Leaving;
        }

        for handle in &handles {
            if handle.is_mounted()
                && handle.phase() == Phase::Idle
                && !entering.contains(handle.key())
                && !leaving.contains(handle.key())
            {
                handle.state().phase = Phase::Staying;
            }
        }

        // After-geometry for everyone that had a before. Spring transforms
        // are cleared first so layout is measured at rest.
        let mut entries: Vec<FlipEntry> = Vec::new();
        for handle in &handles {
            let Some(before_rect) = before.get(handle.key()).copied() else {
                continue;
            };
            let Some(element) = handle.element() else {
                continue;
            };
            let (spring_configured, spring) = {
                let state = handle.state();
                (state.opts.position_spring.is_some(), state.position_spring.clone())
            };
            if spring_configured {
                if let Some(spring) = &spring {
                    spring.reset();
                }
            }
            entries.push(FlipEntry {
                handle: handle.clone(),
                before: before_rect,
                after: element.bounding_rect(),
            });
        }

        let known: HashSet<Key> = handles.iter().map(|h| h.key().clone()).collect();
        let plans = flip::plan_flips(entries, &known);
        for plan in &plans {
            let (spring_config, position_mode) = {
                let state = plan.handle.state();
                (state.opts.position_spring, state.opts.position_mode)
            };
            // Springs only ever carry translation, so they are subject to
            // the position mode just like the timed transform path.
            if position_mode == PositionMode::Transform {
                if let Some(config) = spring_config {
                    let Some(spring) =
                        Self::ensure_position_spring(&plan.handle, &batcher, config)
                    else {
                        continue;
                    };
                    // Fold the parent correction into the start rect so the
                    // spring plays back exactly the corrected delta.
                    let corrected = plan.after.translate(plan.delta.0, plan.delta.1);
                    spring.animate(corrected, plan.after);
                    continue;
                }
            }
            flip::apply_inverse(plan);
        }

        let play_handles = handles;
        let weak = Rc::downgrade(&self.inner);
        let registration = frame_clock.after_two_frames(move |_| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let defaults = inner.borrow().options.timing_defaults();
            for handle in &play_handles {
                Self::play_handle(handle, &defaults);
            }
            inner.borrow_mut().pending_play = None;
        });
        self.inner.borrow_mut().pending_play = Some(registration);
    }

    /// Restores a leaving handle that reappeared in the requested set back
    /// to its exact pre-leave styling.
    fn abort_reentries(&self, requested: &[KeyedItem]) {
        for item in requested {
            let Some(handle) = self.registry.get(&item.key) else {
                continue;
            };
            if handle.phase() != Phase::Leaving {
                continue;
            }
            if let Some(styler) = handle.styler() {
                styler.clear_styles();
            }
            let presence = handle.state().presence.clone();
            if let Some(presence) = presence {
                if presence.is_active() || presence.value() < 1.0 {
                    presence.animate_to(1.0, |_| {});
                }
            }
            handle.state().phase = Phase::Staying;
            let removal = self.inner.borrow().removal.clone();
            if let Some(removal) = removal {
                removal.cancel(&item.key);
            }
        }
    }

    fn style_entering(
        &self,
        before: &mut HashMap<Key, Rect>,
        entering: &[Rc<NodeHandle>],
        options: &GroupOptions,
        batcher: &FrameBatcher,
    ) {
        if entering.is_empty() {
            return;
        }

        // Measure the start geometry under the enter-position fragment. The
        // element is pinned absolute at its margin-corrected offset so
        // changing its size cannot reflow the rest of the group mid-measure.
        if let Some(position_style) = &options.enter_position_style {
            let mut applied: Vec<(Rc<dyn VisualElement>, Vec<(Rc<str>, Option<String>)>)> =
                Vec::new();
            for handle in entering {
                let Some(element) = handle.element() else {
                    continue;
                };
                let rect = element.bounding_rect();
                let pin = element.margins().pin_position(element.offset_position());
                let mut style = Style::new()
                    .num("width", rect.width)
                    .num("height", rect.height);
                for (prop, val) in position_style {
                    style = style.set(prop.clone(), val.clone());
                }
                style = style
                    .num("top", pin.y)
                    .num("left", pin.x)
                    .text("position", "absolute");

                let mut saved: Vec<(Rc<str>, Option<String>)> = Vec::new();
                for (prop, val) in &style {
                    saved.push((prop.clone(), element.style(prop)));
                    element.set_style(prop, &val.render(prop));
                }
                applied.push((element, saved));
            }
            for handle in entering {
                if let Some(rect) = handle.measure() {
                    before.insert(handle.key().clone(), rect);
                }
            }
            for (element, saved) in applied {
                for (prop, val) in saved {
                    match val {
                        Some(v) => element.set_style(&prop, &v),
                        None => element.remove_style(&prop),
                    }
                }
            }
        }

        let has_enter_style =
            options.enter_position_style.is_some() || options.enter_decoration_style.is_some();
        for handle in entering {
            let has_presence = handle.state().opts.on_presence.is_some();
            if has_presence {
                if let Some(channel) = Self::ensure_presence(handle, batcher, 0.0) {
                    handle.state().phase = Phase::Entering;
                    let weak = Rc::downgrade(handle);
                    channel.animate_to(1.0, move |_| {
                        if let Some(handle) = weak.upgrade() {
                            handle.state().phase = Phase::Staying;
                        }
                    });
                }
                continue;
            }
            if let Some(decoration) = &options.enter_decoration_style {
                if let Some(styler) = handle.styler() {
                    styler.add_style("enter", decoration, AddStyleOpts::default());
                }
            }
            handle.state().phase = if has_enter_style {
                Phase::Entering
            } else {
                Phase::Staying
            };
        }
    }

    fn style_leaving(
        &self,
        handle: &Rc<NodeHandle>,
        before: &HashMap<Key, Rect>,
        options: &GroupOptions,
        defaults: &TransitionTiming,
        batcher: &FrameBatcher,
    ) {
        let has_presence = handle.state().opts.on_presence.is_some();
        if has_presence {
            if let Some(channel) = Self::ensure_presence(handle, batcher, 1.0) {
                let weak = Rc::downgrade(&self.inner);
                let key = handle.key().clone();
                channel.animate_to(0.0, move |_| {
                    Self::queue_removal(&weak, key);
                });
            }
            return;
        }

        let Some(leave_style) = &options.leave_style else {
            return;
        };
        let Some(element) = handle.element() else {
            return;
        };
        let Some(styler) = handle.styler() else {
            return;
        };
        let Some(rect) = before.get(handle.key()).copied() else {
            return;
        };

        let timing = handle.timing(defaults);
        let pin = element.margins().pin_position(element.offset_position());
        let mut style = Style::new()
            .num("width", rect.width)
            .num("height", rect.height);
        for (prop, val) in leave_style {
            style = style.set(prop.clone(), val.clone());
        }
        style = style
            .num("top", pin.y)
            .num("left", pin.x)
            .text("position", "absolute");

        // Only non-layout properties transition; position props are the pin.
        let (_, transitioned) = leave_style.partition_position();
        let mut props: Vec<Rc<str>> = (&transitioned)
            .into_iter()
            .map(|(prop, _)| prop.clone())
            .collect();
        for prop in &handle.state().opts.transition_props {
            if !props.contains(prop) {
                props.push(prop.clone());
            }
        }
        let clauses: Vec<String> = props.iter().map(|p| timing.clause(p)).collect();
        style = style.text("transition", clauses.join(", "));

        let weak = Rc::downgrade(&self.inner);
        let key = handle.key().clone();
        styler.add_style(
            "leaving",
            &style,
            AddStyleOpts {
                dont_reset: true,
                on_done: Some(Box::new(move || Self::queue_removal(&weak, key))),
            },
        );
    }

    fn play_handle(handle: &Rc<NodeHandle>, defaults: &TransitionTiming) {
        let Some(styler) = handle.styler() else {
            return;
        };
        let timing = handle.timing(defaults);
        if !styler.has_active_styles() {
            if handle.phase() == Phase::Entering {
                handle.state().phase = Phase::Staying;
            }
            return;
        }
        if let Some(cleanup) = flip::release_children(handle, &timing) {
            styler.push_on_done(cleanup);
        }
        if handle.phase() == Phase::Entering {
            let weak = Rc::downgrade(handle);
            styler.push_on_done(move || {
                if let Some(handle) = weak.upgrade() {
                    handle.state().phase = Phase::Staying;
                }
            });
        }
        let extra = handle.state().opts.transition_props.clone();
        styler.arm_transition(&timing, &extra);
    }

    fn ensure_presence(
        handle: &Rc<NodeHandle>,
        batcher: &FrameBatcher,
        start: f32,
    ) -> Option<Presence> {
        let mut state = handle.state();
        if let Some(presence) = &state.presence {
            return Some(presence.clone());
        }
        let element = state.element.clone()?;
        let fragment = state.opts.on_presence.clone()?;
        let config = state.opts.position_spring.unwrap_or_default();
        let presence = Presence::new(batcher.clone(), config, start, move |value| {
            let style = fragment(value);
            for (prop, val) in &style {
                element.set_style(prop, &val.render(prop));
            }
        });
        state.presence = Some(presence.clone());
        Some(presence)
    }

    fn ensure_position_spring(
        handle: &Rc<NodeHandle>,
        batcher: &FrameBatcher,
        config: flipkit_animation::SpringConfig,
    ) -> Option<PositionSpring> {
        let mut state = handle.state();
        if let Some(spring) = &state.position_spring {
            return Some(spring.clone());
        }
        let element = state.element.clone()?;
        let spring = PositionSpring::new(batcher.clone(), config, move |translate| match translate {
            Some((tx, ty)) => {
                // -0.0 would render as "-0px"; adding positive zero folds
                // it back to plain zero.
                let (tx, ty) = (tx + 0.0, ty + 0.0);
                element.set_style("transform", &format!("translate({tx}px, {ty}px)"));
            }
            None => element.remove_style("transform"),
        });
        state.position_spring = Some(spring.clone());
        Some(spring)
    }

    fn queue_removal(weak: &Weak<RefCell<GroupInner>>, key: Key) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let removal = inner.borrow().removal.clone();
        if let Some(removal) = removal {
            removal.push(key);
        }
    }

    fn finish_removals(weak: &Weak<RefCell<GroupInner>>, keys: Vec<Key>) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let callback = {
            let mut inner = inner.borrow_mut();
            inner.rendered.retain(|item| !keys.contains(&item.key));
            inner.on_items_changed.clone()
        };
        // Borrow dropped first: the host callback will re-render and call
        // back into the group.
        if let Some(callback) = callback {
            callback();
        }
    }
}
