use std::rc::Rc;

use flipkit_geometry::{Matrix2d, Rect};
use smallvec::SmallVec;

use crate::collections::map::{HashMap, HashSet};
use crate::error::FlipError;
use crate::handle::{ChildFlip, NodeHandle, PositionMode, ScaleMode};
use crate::key::Key;
use crate::style::{Style, TransitionTiming};
use crate::styler::AddStyleOpts;

/// One measured handle entering delta planning: its key, geometry pair and
/// parent reference.
pub(crate) struct FlipEntry {
    pub(crate) handle: Rc<NodeHandle>,
    pub(crate) before: Rect,
    pub(crate) after: Rect,
}

/// A planned move: parent-corrected translation plus per-axis size ratios,
/// ordered so parents precede their dependents.
pub(crate) struct PlannedFlip {
    pub(crate) handle: Rc<NodeHandle>,
    pub(crate) before: Rect,
    pub(crate) after: Rect,
    pub(crate) delta: (f32, f32),
    pub(crate) scale: (f32, f32),
    pub(crate) width_changed: bool,
    pub(crate) height_changed: bool,
}

/// Computes parent-corrected deltas for all measured handles.
///
/// Handles naming a `parent_flip_key` subtract the parent's raw delta, so
/// motion the parent already accounts for is not animated twice. Parents are
/// ordered before dependents; a dependency cycle or a parent key absent from
/// `known_keys` degrades to a zero correction with a warning.
pub(crate) fn plan_flips(entries: Vec<FlipEntry>, known_keys: &HashSet<Key>) -> Vec<PlannedFlip> {
    let mut raw: HashMap<Key, (f32, f32)> = HashMap::default();
    for entry in &entries {
        raw.insert(entry.handle.key().clone(), entry.before.delta_to(&entry.after));
    }

    let in_set: HashSet<Key> = entries.iter().map(|e| e.handle.key().clone()).collect();
    let parent_of = |entry: &FlipEntry| -> Option<Key> {
        entry.handle.state().opts.parent_flip_key.clone()
    };

    // Kahn ordering over parent→child edges within the measured set.
    let mut in_degree: HashMap<Key, usize> = HashMap::default();
    let mut children: HashMap<Key, Vec<usize>> = HashMap::default();
    for (idx, entry) in entries.iter().enumerate() {
        let key = entry.handle.key().clone();
        in_degree.entry(key.clone()).or_insert(0);
        if let Some(parent) = parent_of(entry) {
            if in_set.contains(&parent) {
                *in_degree.entry(key).or_insert(0) += 1;
                children.entry(parent).or_default().push(idx);
            } else if !known_keys.contains(&parent) {
                let err = FlipError::MissingParentReference {
                    key: entry.handle.key().clone(),
                    parent,
                };
                log::warn!("{err}");
            }
        }
    }

    let mut order: Vec<usize> = Vec::with_capacity(entries.len());
    let mut queue: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| in_degree[e.handle.key()] == 0)
        .map(|(i, _)| i)
        .collect();
    let mut cursor = 0;
    while cursor < queue.len() {
        let idx = queue[cursor];
        cursor += 1;
        order.push(idx);
        if let Some(dependents) = children.get(entries[idx].handle.key()) {
            for &dep in dependents {
                let degree = in_degree.get_mut(entries[dep].handle.key());
                if let Some(degree) = degree {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push(dep);
                    }
                }
            }
        }
    }

    // Whatever Kahn left behind sits on a cycle: process it anyway, but
    // without any parent correction.
    let mut cyclic: HashSet<Key> = HashSet::default();
    if order.len() < entries.len() {
        let placed: HashSet<usize> = order.iter().copied().collect();
        for (idx, entry) in entries.iter().enumerate() {
            if !placed.contains(&idx) {
                log::warn!(
                    "parent flip cycle involving `{}`, skipping parent correction",
                    entry.handle.key()
                );
                cyclic.insert(entry.handle.key().clone());
                order.push(idx);
            }
        }
    }

    order
        .into_iter()
        .map(|idx| {
            let entry = &entries[idx];
            let key = entry.handle.key();
            let (mut dx, mut dy) = raw[key];
            if !cyclic.contains(key) {
                if let Some(parent) = parent_of(entry) {
                    if let Some((px, py)) = raw.get(&parent) {
                        dx -= px;
                        dy -= py;
                    }
                }
            }
            let (sx, sy) = entry.before.scale_ratios(&entry.after);
            PlannedFlip {
                handle: entry.handle.clone(),
                before: entry.before,
                after: entry.after,
                delta: (dx, dy),
                scale: (sx, sy),
                width_changed: entry.before.width != entry.after.width,
                height_changed: entry.before.height != entry.after.height,
            }
        })
        .collect()
}

/// Applies the inverse transform for one planned move, synchronously, so the
/// element appears not to have moved yet. The transform goes through the
/// styler so a later clear restores everything in one place.
pub(crate) fn apply_inverse(planned: &PlannedFlip) {
    let (position_mode, scale_mode) = {
        let state = planned.handle.state();
        (state.opts.position_mode, state.opts.scale_mode)
    };
    let Some(styler) = planned.handle.styler() else {
        return;
    };

    let mut transforms: SmallVec<[Matrix2d; 4]> = SmallVec::new();
    let (dx, dy) = planned.delta;
    if position_mode == PositionMode::Transform && (dx != 0.0 || dy != 0.0) {
        transforms.push(Matrix2d::translate(dx, dy));
    }

    let (sx, sy) = planned.scale;
    let scaling = matches!(scale_mode, ScaleMode::Transform | ScaleMode::TransformNoChildren);
    if scaling && planned.width_changed {
        transforms.push(Matrix2d::scale_x(sx));
    }
    if scaling && planned.height_changed {
        transforms.push(Matrix2d::scale_y(sy));
    }

    if scale_mode == ScaleMode::NonTransform && (planned.width_changed || planned.height_changed) {
        // Replay the size change as transitioned width/height properties.
        let mut size_style = Style::new();
        if planned.width_changed {
            size_style = size_style.num("width", planned.before.width);
        }
        if planned.height_changed {
            size_style = size_style.num("height", planned.before.height);
        }
        styler.add_style("flip-size", &size_style, AddStyleOpts::default());
    }

    if transforms.is_empty() {
        return;
    }
    let matrix = Matrix2d::compose(transforms.iter());
    styler.add_style(
        "flip",
        &Style::new()
            .text("transform", matrix.to_css())
            .text("transformOrigin", "0px 0px 0px"),
        AddStyleOpts::default(),
    );

    if scale_mode == ScaleMode::Transform && (planned.width_changed || planned.height_changed) {
        counter_scale_children(planned, sx, sy);
    }
}

/// Children distort under a parent scale transform; write the reciprocal
/// scale on each child so they keep their rendered aspect, saving their
/// inline values for the play step.
fn counter_scale_children(planned: &PlannedFlip, sx: f32, sy: f32) {
    let Some(element) = planned.handle.element() else {
        return;
    };
    let mut counter: SmallVec<[Matrix2d; 2]> = SmallVec::new();
    if planned.width_changed {
        counter.push(Matrix2d::scale_x(1.0 / sx));
    }
    if planned.height_changed {
        counter.push(Matrix2d::scale_y(1.0 / sy));
    }
    let matrix = Matrix2d::compose(counter.iter());
    let mut state = planned.handle.state();
    for child in element.children() {
        let saved_transform = child.style("transform");
        let saved_origin = child.style("transformOrigin");
        child.set_style("transform", &matrix.to_css());
        child.set_style("transformOrigin", "0px 0px 0px");
        state.child_flips.push(ChildFlip {
            element: child,
            saved_transform,
            saved_origin,
        });
    }
}

/// Play step for counter-scaled children: restore each child's transform
/// under a transition covering it. Returns the cleanup that drops the child
/// transition strings once the animation window closes.
pub(crate) fn release_children(
    handle: &Rc<NodeHandle>,
    timing: &TransitionTiming,
) -> Option<Box<dyn FnOnce()>> {
    let child_flips = std::mem::take(&mut handle.state().child_flips);
    if child_flips.is_empty() {
        return None;
    }
    let clause = timing.clause("transform");
    let mut restores: Vec<(Rc<dyn crate::element::VisualElement>, Option<String>, Option<String>)> =
        Vec::with_capacity(child_flips.len());
    for flip in child_flips {
        let saved_transition = flip.element.style("transition");
        let joined = match &saved_transition {
            Some(prior) if !prior.is_empty() => format!("{prior}, {clause}"),
            _ => clause.clone(),
        };
        match &flip.saved_transform {
            Some(v) => flip.element.set_style("transform", v),
            None => flip.element.remove_style("transform"),
        }
        flip.element.set_style("transition", &joined);
        restores.push((flip.element, saved_transition, flip.saved_origin));
    }
    Some(Box::new(move || {
        for (element, saved_transition, saved_origin) in restores {
            match saved_transition {
                Some(v) => element.set_style("transition", &v),
                None => element.remove_style("transition"),
            }
            match saved_origin {
                Some(v) => element.set_style("transformOrigin", &v),
                None => element.remove_style("transformOrigin"),
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::HandleOptions;

    fn entry(key: &str, before: Rect, after: Rect, parent: Option<&str>) -> FlipEntry {
        let handle = NodeHandle::new(
            key.into(),
            HandleOptions {
                parent_flip_key: parent.map(Key::from),
                ..Default::default()
            },
        );
        FlipEntry {
            handle,
            before,
            after,
        }
    }

    fn known(keys: &[&str]) -> HashSet<Key> {
        keys.iter().map(|k| Key::from(*k)).collect()
    }

    #[test]
    fn plain_move_yields_its_raw_delta() {
        let plans = plan_flips(
            vec![entry(
                "a",
                Rect::new(0.0, 0.0, 10.0, 10.0),
                Rect::new(50.0, 0.0, 10.0, 10.0),
                None,
            )],
            &known(&["a"]),
        );
        assert_eq!(plans[0].delta, (-50.0, 0.0));
        assert_eq!(plans[0].scale, (1.0, 1.0));
    }

    #[test]
    fn purely_parent_driven_motion_corrects_to_zero() {
        let parent = entry(
            "p",
            Rect::new(0.0, 0.0, 100.0, 100.0),
            Rect::new(20.0, 0.0, 100.0, 100.0),
            None,
        );
        let child = entry(
            "b",
            Rect::new(10.0, 10.0, 10.0, 10.0),
            Rect::new(30.0, 10.0, 10.0, 10.0),
            Some("p"),
        );
        let plans = plan_flips(vec![child, parent], &known(&["p", "b"]));
        // Parent ordered first.
        assert_eq!(plans[0].handle.key().as_ref(), "p");
        assert_eq!(plans[0].delta, (-20.0, 0.0));
        assert_eq!(plans[1].handle.key().as_ref(), "b");
        assert_eq!(plans[1].delta, (0.0, 0.0));
    }

    #[test]
    fn missing_parent_degrades_to_zero_correction() {
        let plans = plan_flips(
            vec![entry(
                "b",
                Rect::new(0.0, 0.0, 10.0, 10.0),
                Rect::new(5.0, 0.0, 10.0, 10.0),
                Some("ghost"),
            )],
            &known(&["b"]),
        );
        assert_eq!(plans[0].delta, (-5.0, 0.0));
    }

    #[test]
    fn parent_cycle_degrades_to_zero_correction() {
        let a = entry(
            "a",
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(10.0, 0.0, 10.0, 10.0),
            Some("b"),
        );
        let b = entry(
            "b",
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(20.0, 0.0, 10.0, 10.0),
            Some("a"),
        );
        let plans = plan_flips(vec![a, b], &known(&["a", "b"]));
        assert_eq!(plans.len(), 2);
        // No correction applied on either side of the cycle.
        let by_key = |k: &str| plans.iter().find(|p| p.handle.key().as_ref() == k).unwrap();
        assert_eq!(by_key("a").delta, (-10.0, 0.0));
        assert_eq!(by_key("b").delta, (-20.0, 0.0));
    }

    #[test]
    fn scale_ratios_track_dimension_changes() {
        let plans = plan_flips(
            vec![entry(
                "a",
                Rect::new(0.0, 0.0, 100.0, 40.0),
                Rect::new(0.0, 0.0, 50.0, 40.0),
                None,
            )],
            &known(&["a"]),
        );
        assert_eq!(plans[0].scale, (2.0, 1.0));
        assert!(plans[0].width_changed);
        assert!(!plans[0].height_changed);
    }
}
