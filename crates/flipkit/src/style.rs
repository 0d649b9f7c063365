use std::fmt;
use std::rc::Rc;

/// One inline style value. Numbers get a `px` suffix on formatting unless
/// the property is unitless.
#[derive(Clone, Debug, PartialEq)]
pub enum StyleValue {
    Num(f32),
    Text(Rc<str>),
}

impl StyleValue {
    pub fn text(value: impl Into<Rc<str>>) -> Self {
        StyleValue::Text(value.into())
    }

    /// Renders the value the way it is written into the element's inline
    /// style for `prop`.
    pub fn render(&self, prop: &str) -> String {
        match self {
            StyleValue::Num(n) => {
                if is_unitless_prop(prop) {
                    format_number(*n)
                } else {
                    format!("{}px", format_number(*n))
                }
            }
            StyleValue::Text(s) => s.to_string(),
        }
    }
}

fn format_number(n: f32) -> String {
    if n == n.trunc() && n.abs() < 1e7 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// An ordered set of camelCase property/value pairs. Order matters because
/// later writes win when the same property appears twice.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Style {
    entries: Vec<(Rc<str>, StyleValue)>,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, prop: impl Into<Rc<str>>, value: StyleValue) -> Self {
        self.entries.push((prop.into(), value));
        self
    }

    pub fn num(self, prop: impl Into<Rc<str>>, value: f32) -> Self {
        self.set(prop, StyleValue::Num(value))
    }

    pub fn text(self, prop: impl Into<Rc<str>>, value: impl Into<Rc<str>>) -> Self {
        self.set(prop, StyleValue::text(value))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StyleValue)> {
        self.entries.iter().map(|(p, v)| (p.as_ref(), v))
    }

    /// Splits into (position properties, other properties). Position
    /// properties affect layout geometry and are applied through the flip
    /// machinery rather than transitioned directly.
    pub fn partition_position(&self) -> (Style, Style) {
        let mut position = Style::new();
        let mut other = Style::new();
        for (prop, val) in &self.entries {
            let target = if is_position_prop(prop) {
                &mut position
            } else {
                &mut other
            };
            target.entries.push((prop.clone(), val.clone()));
        }
        (position, other)
    }
}

impl<'a> IntoIterator for &'a Style {
    type Item = (&'a Rc<str>, &'a StyleValue);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (Rc<str>, StyleValue)>,
        fn(&'a (Rc<str>, StyleValue)) -> (&'a Rc<str>, &'a StyleValue),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter().map(|(p, v)| (p, v))
    }
}

/// Properties whose animation changes layout geometry.
pub fn is_position_prop(prop: &str) -> bool {
    matches!(
        prop,
        "margin"
            | "marginTop"
            | "marginBottom"
            | "marginLeft"
            | "marginRight"
            | "padding"
            | "paddingTop"
            | "paddingBottom"
            | "paddingLeft"
            | "paddingRight"
            | "width"
            | "height"
            | "transform"
    )
}

/// Properties whose numeric values carry no unit.
pub fn is_unitless_prop(prop: &str) -> bool {
    matches!(
        prop,
        "opacity"
            | "zIndex"
            | "flex"
            | "flexGrow"
            | "flexShrink"
            | "flexOrder"
            | "order"
            | "lineHeight"
            | "fontWeight"
            | "zoom"
            | "scale"
    )
}

/// Converts a camelCase property name to its kebab-case CSS spelling.
pub fn kebab_case(prop: &str) -> String {
    let mut out = String::with_capacity(prop.len() + 2);
    for ch in prop.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Timing parameters for CSS-style transitions.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionTiming {
    pub duration_millis: f64,
    pub delay_millis: f64,
    pub timing_function: Rc<str>,
}

impl Default for TransitionTiming {
    fn default() -> Self {
        Self {
            duration_millis: 200.0,
            delay_millis: 0.0,
            timing_function: "ease-in-out".into(),
        }
    }
}

impl TransitionTiming {
    pub fn total_millis(&self) -> f64 {
        self.duration_millis + self.delay_millis
    }

    /// Renders the transition clause for one property, e.g.
    /// `margin-left 200ms ease-in-out 0ms`.
    pub fn clause(&self, prop: &str) -> String {
        format!(
            "{} {}ms {} {}ms",
            kebab_case(prop),
            format_millis(self.duration_millis),
            self.timing_function,
            format_millis(self.delay_millis),
        )
    }
}

fn format_millis(ms: f64) -> impl fmt::Display {
    struct Millis(f64);
    impl fmt::Display for Millis {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            if self.0 == self.0.trunc() {
                write!(f, "{}", self.0 as i64)
            } else {
                write!(f, "{}", self.0)
            }
        }
    }
    Millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_render_with_px_unless_unitless() {
        assert_eq!(StyleValue::Num(10.0).render("marginLeft"), "10px");
        assert_eq!(StyleValue::Num(0.5).render("opacity"), "0.5");
        assert_eq!(StyleValue::Num(-4.0).render("top"), "-4px");
    }

    #[test]
    fn text_values_pass_through() {
        assert_eq!(StyleValue::text("absolute").render("position"), "absolute");
    }

    #[test]
    fn kebab_case_splits_camel_humps() {
        assert_eq!(kebab_case("marginLeft"), "margin-left");
        assert_eq!(kebab_case("transform"), "transform");
        assert_eq!(kebab_case("transformOrigin"), "transform-origin");
    }

    #[test]
    fn partition_separates_layout_properties() {
        let style = Style::new()
            .num("marginLeft", -10.0)
            .num("opacity", 0.0)
            .text("transform", "scale(0.5)");
        let (position, other) = style.partition_position();
        let pos_props: Vec<_> = position.iter().map(|(p, _)| p.to_string()).collect();
        let other_props: Vec<_> = other.iter().map(|(p, _)| p.to_string()).collect();
        assert_eq!(pos_props, ["marginLeft", "transform"]);
        assert_eq!(other_props, ["opacity"]);
    }

    #[test]
    fn transition_clause_formats_like_css() {
        let timing = TransitionTiming::default();
        assert_eq!(timing.clause("marginLeft"), "margin-left 200ms ease-in-out 0ms");
        let timing = TransitionTiming {
            duration_millis: 350.0,
            delay_millis: 50.0,
            timing_function: "linear".into(),
        };
        assert_eq!(timing.clause("opacity"), "opacity 350ms linear 50ms");
    }
}
