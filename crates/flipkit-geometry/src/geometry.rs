#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };
}

/// A measured layout snapshot. Immutable once captured; two snapshots
/// (before and after a layout change) define one FLIP delta.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub const ZERO: Rect = Rect {
        left: 0.0,
        top: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self {
            left: origin.x,
            top: origin.y,
            width: size.width,
            height: size.height,
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.left, self.top)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self {
            left: self.left + dx,
            top: self.top + dy,
            width: self.width,
            height: self.height,
        }
    }

    /// Translation that moves `current` back onto `self` per axis: the
    /// inverse-transform offset of a FLIP move.
    pub fn delta_to(&self, current: &Rect) -> (f32, f32) {
        (self.left - current.left, self.top - current.top)
    }

    /// Per-axis size ratio of `self` over `current`. Dimensions are clamped
    /// to at least one pixel so collapsed elements never divide by zero.
    pub fn scale_ratios(&self, current: &Rect) -> (f32, f32) {
        (
            self.width.max(1.0) / current.width.max(1.0),
            self.height.max(1.0) / current.height.max(1.0),
        )
    }
}

/// Margins around an element's border box.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EdgeInsets {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl EdgeInsets {
    pub const ZERO: EdgeInsets = EdgeInsets {
        left: 0.0,
        top: 0.0,
        right: 0.0,
        bottom: 0.0,
    };

    pub fn uniform(all: f32) -> Self {
        Self {
            left: all,
            top: all,
            right: all,
            bottom: all,
        }
    }

    /// Position at which an element must be pinned (`position: absolute`)
    /// to keep its visual spot: the layout offset with margins backed out.
    pub fn pin_position(&self, offset: Point) -> Point {
        Point::new(offset.x - self.left, offset.y - self.top)
    }
}
