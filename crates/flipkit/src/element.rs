use std::rc::Rc;

use flipkit_geometry::{EdgeInsets, Point, Rect};

/// Host-side view of one animatable element. The engine drives geometry
/// capture and inline-style writes exclusively through this seam, so any
/// host with measurable boxes and writable styles can plug in.
pub trait VisualElement {
    /// The element's current bounding box in group coordinates, with any
    /// active transform applied. Measured live on every call.
    fn bounding_rect(&self) -> Rect;

    /// Layout position relative to the offset parent, ignoring transforms.
    fn offset_position(&self) -> Point;

    /// The element's resolved margins.
    fn margins(&self) -> EdgeInsets;

    /// Current inline style value for a camelCase property, if set.
    fn style(&self, prop: &str) -> Option<String>;

    /// Writes one inline style property. An already-rendered value string.
    fn set_style(&self, prop: &str, value: &str);

    /// Clears one inline style property.
    fn remove_style(&self, prop: &str);

    /// Direct children, for counter-scaling during scaled flips.
    fn children(&self) -> Vec<Rc<dyn VisualElement>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Probe {
        rect: Rect,
        writes: RefCell<Vec<(String, String)>>,
    }

    impl VisualElement for Probe {
        fn bounding_rect(&self) -> Rect {
            self.rect
        }
        fn offset_position(&self) -> Point {
            Point::new(self.rect.left, self.rect.top)
        }
        fn margins(&self) -> EdgeInsets {
            EdgeInsets::ZERO
        }
        fn style(&self, _prop: &str) -> Option<String> {
            None
        }
        fn set_style(&self, prop: &str, value: &str) {
            self.writes
                .borrow_mut()
                .push((prop.to_string(), value.to_string()));
        }
        fn remove_style(&self, _prop: &str) {}
        fn children(&self) -> Vec<Rc<dyn VisualElement>> {
            Vec::new()
        }
    }

    #[test]
    fn trait_objects_are_usable_behind_rc() {
        let probe: Rc<dyn VisualElement> = Rc::new(Probe {
            rect: Rect::new(10.0, 20.0, 100.0, 50.0),
            writes: RefCell::new(Vec::new()),
        });
        assert_eq!(probe.bounding_rect().left, 10.0);
        probe.set_style("opacity", "0");
    }
}
