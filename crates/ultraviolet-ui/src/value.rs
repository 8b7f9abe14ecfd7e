//! Property values, their types, and culture-aware resolution from text.

use std::fmt;
use std::rc::Rc;

use ultraviolet_engine::paint::Color;
use ultraviolet_engine::text::tokenize;

use crate::culture::Culture;
use crate::element::ElementId;
use crate::uvml::reader::XmlElement;

// ── Thickness ─────────────────────────────────────────────────────────────

/// Edge sizes, written as `all`, `horizontal vertical`, or
/// `left top right bottom`.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Thickness {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Thickness {
    pub const fn uniform(v: f64) -> Self {
        Self { left: v, top: v, right: v, bottom: v }
    }

    pub fn parse(text: &str, culture: &Culture) -> Option<Self> {
        let parts: Option<Vec<f64>> = tokenize(text).into_iter().map(|t| culture.parse_f64(t)).collect();
        match parts?.as_slice() {
            [all] => Some(Self::uniform(*all)),
            [h, v] => Some(Self { left: *h, top: *v, right: *h, bottom: *v }),
            [l, t, r, b] => Some(Self { left: *l, top: *t, right: *r, bottom: *b }),
            _ => None,
        }
    }

    fn lerp(self, to: Thickness, t: f64) -> Thickness {
        let f = |a: f64, b: f64| a + (b - a) * t;
        Thickness {
            left: f(self.left, to.left),
            top: f(self.top, to.top),
            right: f(self.right, to.right),
            bottom: f(self.bottom, to.bottom),
        }
    }
}

impl fmt::Display for Thickness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.left, self.top, self.right, self.bottom)
    }
}

// ── ValueType ─────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ValueType {
    Bool,
    Int,
    Double,
    String,
    Color,
    Thickness,
    /// One of a fixed set of names, matched case-insensitively.
    Enum(&'static [&'static str]),
    /// A reference to another element in the same tree.
    Element,
    DataTemplate,
    /// Anything; text resolves to a string.
    Object,
}

impl ValueType {
    /// The value a property of this type holds when nothing sets it.
    pub fn default_value(self) -> Value {
        match self {
            ValueType::Bool => Value::Bool(false),
            ValueType::Int => Value::Int(0),
            ValueType::Double => Value::Double(0.0),
            ValueType::String => Value::String(String::new()),
            ValueType::Color => Value::Color(Color::transparent()),
            ValueType::Thickness => Value::Thickness(Thickness::default()),
            ValueType::Enum(names) => names.first().map_or(Value::Null, |n| Value::Enum(*n)),
            ValueType::Element | ValueType::DataTemplate | ValueType::Object => Value::Null,
        }
    }

    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) | (ValueType::Object, _) => true,
            (ValueType::Bool, Value::Bool(_))
            | (ValueType::Int, Value::Int(_))
            | (ValueType::Double, Value::Double(_))
            | (ValueType::String, Value::String(_))
            | (ValueType::Color, Value::Color(_))
            | (ValueType::Thickness, Value::Thickness(_))
            | (ValueType::Element, Value::Element(_))
            | (ValueType::DataTemplate, Value::DataTemplate(_)) => true,
            (ValueType::Enum(names), Value::Enum(n)) => names.contains(n),
            _ => false,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool => f.write_str("Boolean"),
            ValueType::Int => f.write_str("Int32"),
            ValueType::Double => f.write_str("Double"),
            ValueType::String => f.write_str("String"),
            ValueType::Color => f.write_str("Color"),
            ValueType::Thickness => f.write_str("Thickness"),
            ValueType::Enum(names) => write!(f, "one of [{}]", names.join(", ")),
            ValueType::Element => f.write_str("element reference"),
            ValueType::DataTemplate => f.write_str("DataTemplate"),
            ValueType::Object => f.write_str("Object"),
        }
    }
}

// ── Value ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Color(Color),
    Thickness(Thickness),
    Enum(&'static str),
    Element(ElementId),
    /// Uninstantiated markup, passed through as-is.
    DataTemplate(Rc<XmlElement>),
}

impl Value {
    /// Resolves `text` as a value of type `ty`, reading numbers in `culture`.
    pub fn resolve(text: &str, ty: ValueType, culture: &Culture) -> Option<Value> {
        let text = text.trim();
        match ty {
            ValueType::Bool => match text.to_ascii_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            ValueType::Int => culture.parse_i64(text).map(Value::Int),
            ValueType::Double => culture.parse_f64(text).map(Value::Double),
            ValueType::String | ValueType::Object => Some(Value::String(unquote(text).to_string())),
            ValueType::Color => text.parse::<Color>().ok().map(Value::Color),
            ValueType::Thickness => Thickness::parse(text, culture).map(Value::Thickness),
            ValueType::Enum(names) => {
                names.iter().find(|n| n.eq_ignore_ascii_case(text)).map(|n| Value::Enum(*n))
            }
            ValueType::Element | ValueType::DataTemplate => None,
        }
    }

    /// Converts a value produced elsewhere (a data source, a templated
    /// parent) to `ty`. Strings are re-resolved under `culture`.
    pub fn coerce(self, ty: ValueType, culture: &Culture) -> Option<Value> {
        if ty.accepts(&self) {
            return Some(self);
        }
        match (self, ty) {
            (Value::Int(i), ValueType::Double) => Some(Value::Double(i as f64)),
            (Value::Double(d), ValueType::Int) => Some(Value::Int(d.round() as i64)),
            (Value::Double(d), ValueType::Thickness) => Some(Value::Thickness(Thickness::uniform(d))),
            (Value::String(s), ty) => Value::resolve(&s, ty, culture),
            (v, ValueType::String) => Some(Value::String(v.to_string())),
            _ => None,
        }
    }

    /// Value between `self` (at `t = 0`) and `to` (at `t = 1`). Types that
    /// cannot be blended hold `self` until `t` reaches 1.
    pub fn interpolate(&self, to: &Value, t: f64) -> Value {
        match (self, to) {
            (Value::Double(a), Value::Double(b)) => Value::Double(a + (b - a) * t),
            (Value::Int(a), Value::Int(b)) => Value::Int((*a as f64 + (*b - *a) as f64 * t).round() as i64),
            (Value::Color(a), Value::Color(b)) => Value::Color(a.lerp(*b, t as f32)),
            (Value::Thickness(a), Value::Thickness(b)) => Value::Thickness(a.lerp(*b, t)),
            _ if t >= 1.0 => to.clone(),
            _ => self.clone(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<ElementId> {
        match self {
            Value::Element(id) => Some(*id),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "Boolean",
            Value::Int(_) => "Int32",
            Value::Double(_) => "Double",
            Value::String(_) => "String",
            Value::Color(_) => "Color",
            Value::Thickness(_) => "Thickness",
            Value::Enum(_) => "enum",
            Value::Element(_) => "element reference",
            Value::DataTemplate(_) => "DataTemplate",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Double(d) => write!(f, "{d}"),
            Value::String(s) => f.write_str(s),
            Value::Color(c) => write!(f, "{c}"),
            Value::Thickness(t) => write!(f, "{t}"),
            Value::Enum(name) => f.write_str(name),
            Value::Element(id) => write!(f, "{id}"),
            Value::DataTemplate(xml) => write!(f, "<{}>", xml.name),
        }
    }
}

fn unquote(text: &str) -> &str {
    text.strip_prefix('"').and_then(|t| t.strip_suffix('"')).unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VISIBILITY: &[&str] = &["Visible", "Hidden", "Collapsed"];

    fn ru() -> Culture {
        Culture::new("ru-RU").unwrap()
    }

    #[test]
    fn resolves_by_type() {
        let inv = Culture::invariant();
        assert_eq!(Value::resolve("True", ValueType::Bool, &inv), Some(Value::Bool(true)));
        assert_eq!(Value::resolve("42", ValueType::Int, &inv), Some(Value::Int(42)));
        assert_eq!(Value::resolve("\"hi there\"", ValueType::String, &inv), Some(Value::String("hi there".into())));
        assert_eq!(Value::resolve("collapsed", ValueType::Enum(VISIBILITY), &inv), Some(Value::Enum("Collapsed")));
        assert_eq!(Value::resolve("Red", ValueType::Color, &inv), Some(Value::Color(Color::from_srgb_u8(255, 0, 0, 255))));
        assert_eq!(Value::resolve("nope", ValueType::Enum(VISIBILITY), &inv), None);
    }

    #[test]
    fn doubles_and_thickness_honour_culture() {
        assert_eq!(Value::resolve("0,5", ValueType::Double, &ru()), Some(Value::Double(0.5)));
        assert_eq!(Value::resolve("0.5", ValueType::Double, &ru()), None);
        assert_eq!(
            Value::resolve("1,5 2", ValueType::Thickness, &ru()),
            Some(Value::Thickness(Thickness { left: 1.5, top: 2.0, right: 1.5, bottom: 2.0 }))
        );
        assert_eq!(Value::resolve("1 2 3", ValueType::Thickness, &Culture::invariant()), None);
    }

    #[test]
    fn interpolation() {
        assert_eq!(Value::Double(0.0).interpolate(&Value::Double(10.0), 0.25), Value::Double(2.5));
        assert_eq!(Value::Int(0).interpolate(&Value::Int(10), 0.26), Value::Int(3));
        let a = Value::Thickness(Thickness::uniform(0.0));
        let b = Value::Thickness(Thickness::uniform(8.0));
        assert_eq!(a.interpolate(&b, 0.5), Value::Thickness(Thickness::uniform(4.0)));
    }

    #[test]
    fn discrete_values_switch_at_the_boundary() {
        let a = Value::String("a".into());
        let b = Value::String("b".into());
        assert_eq!(a.interpolate(&b, 0.99), a);
        assert_eq!(a.interpolate(&b, 1.0), b);
    }

    #[test]
    fn coercion() {
        let inv = Culture::invariant();
        assert_eq!(Value::Int(2).coerce(ValueType::Double, &inv), Some(Value::Double(2.0)));
        assert_eq!(Value::Double(2.5).coerce(ValueType::String, &inv), Some(Value::String("2.5".into())));
        assert_eq!(Value::String("3,5".into()).coerce(ValueType::Double, &ru()), Some(Value::Double(3.5)));
        assert_eq!(Value::Bool(true).coerce(ValueType::Color, &inv), None);
    }
}
