use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use flipkit::VisualElement;
use flipkit_geometry::{EdgeInsets, Point, Rect};

/// In-memory stand-in for a host element.
///
/// Styles are stored verbatim; `bounding_rect` interprets the subset the
/// engine writes — absolute pinning (`position`/`top`/`left`), inline
/// `width`/`height`, inline `marginLeft`/`marginTop`, and `transform`
/// values of the `matrix(...)` or
/// `translate(...)` form — so measurements behave like a real layout engine
/// for the styles flipkit produces.
pub struct FakeElement {
    layout: RefCell<Rect>,
    margins: RefCell<EdgeInsets>,
    styles: RefCell<BTreeMap<String, String>>,
    children: RefCell<Vec<Rc<FakeElement>>>,
}

impl FakeElement {
    pub fn new(layout: Rect) -> Rc<Self> {
        Rc::new(Self {
            layout: RefCell::new(layout),
            margins: RefCell::new(EdgeInsets::default()),
            styles: RefCell::new(BTreeMap::new()),
            children: RefCell::new(Vec::new()),
        })
    }

    pub fn with_margins(layout: Rect, margins: EdgeInsets) -> Rc<Self> {
        let element = Self::new(layout);
        *element.margins.borrow_mut() = margins;
        element
    }

    /// Simulates a layout change: the position the element would occupy
    /// with no inline overrides.
    pub fn set_layout(&self, layout: Rect) {
        *self.layout.borrow_mut() = layout;
    }

    pub fn layout(&self) -> Rect {
        *self.layout.borrow()
    }

    pub fn add_child(&self, child: Rc<FakeElement>) {
        self.children.borrow_mut().push(child);
    }

    pub fn has_style(&self, prop: &str) -> bool {
        self.styles.borrow().contains_key(prop)
    }

    /// Snapshot of all inline styles, ordered by property name.
    pub fn styles(&self) -> Vec<(String, String)> {
        self.styles
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

fn parse_px(value: &str) -> Option<f32> {
    value.trim().trim_end_matches("px").trim().parse().ok()
}

/// Parses the transform forms flipkit writes. Unknown forms are ignored.
fn parse_transform(value: &str) -> Option<(f32, f32, f32, f32)> {
    let value = value.trim();
    let (kind, args) = value.split_once('(')?;
    let args = args.strip_suffix(')')?;
    let nums: Vec<f32> = args
        .split(',')
        .filter_map(|part| parse_px(part))
        .collect();
    match (kind.trim(), nums.as_slice()) {
        ("matrix", [a, _b, _c, d, tx, ty]) => Some((*tx, *ty, *a, *d)),
        ("translate", [tx, ty]) => Some((*tx, *ty, 1.0, 1.0)),
        ("translate", [tx]) => Some((*tx, 0.0, 1.0, 1.0)),
        _ => None,
    }
}

impl VisualElement for FakeElement {
    fn bounding_rect(&self) -> Rect {
        let margins = *self.margins.borrow();
        let styles = self.styles.borrow();
        let mut rect = *self.layout.borrow();

        let margin_left = styles
            .get("marginLeft")
            .and_then(|v| parse_px(v))
            .unwrap_or(margins.left);
        let margin_top = styles
            .get("marginTop")
            .and_then(|v| parse_px(v))
            .unwrap_or(margins.top);
        if styles.get("position").map(String::as_str) == Some("absolute") {
            if let Some(left) = styles.get("left").and_then(|v| parse_px(v)) {
                rect.left = left + margin_left;
            }
            if let Some(top) = styles.get("top").and_then(|v| parse_px(v)) {
                rect.top = top + margin_top;
            }
        } else {
            rect.left += margin_left - margins.left;
            rect.top += margin_top - margins.top;
        }
        if let Some(width) = styles.get("width").and_then(|v| parse_px(v)) {
            rect.width = width;
        }
        if let Some(height) = styles.get("height").and_then(|v| parse_px(v)) {
            rect.height = height;
        }
        if let Some((tx, ty, sx, sy)) = styles.get("transform").and_then(|v| parse_transform(v)) {
            rect.left += tx;
            rect.top += ty;
            rect.width *= sx;
            rect.height *= sy;
        }
        rect
    }

    fn offset_position(&self) -> Point {
        self.layout.borrow().origin()
    }

    fn margins(&self) -> EdgeInsets {
        *self.margins.borrow()
    }

    fn style(&self, prop: &str) -> Option<String> {
        self.styles.borrow().get(prop).cloned()
    }

    fn set_style(&self, prop: &str, value: &str) {
        self.styles
            .borrow_mut()
            .insert(prop.to_string(), value.to_string());
    }

    fn remove_style(&self, prop: &str) {
        self.styles.borrow_mut().remove(prop);
    }

    fn children(&self) -> Vec<Rc<dyn VisualElement>> {
        self.children
            .borrow()
            .iter()
            .map(|c| c.clone() as Rc<dyn VisualElement>)
            .collect()
    }
}
