//! Compiled storyboards: per-target, per-property keyframe animations.

use std::time::Duration;

use ultraviolet_engine::time::LoopBehavior;
use ultraviolet_uvss::ast::QualifiedName;

use crate::culture::Culture;
use crate::element::{ElementId, ElementTree};
use crate::style::easing::Easing;
use crate::style::selector::{CompiledSelector, NavigationExpression};
use crate::value::{Value, ValueType};

#[derive(Debug, Clone, PartialEq)]
pub struct Keyframe {
    /// Offset from the start of the storyboard, in milliseconds.
    pub time: f64,
    /// Easing of the segment that ends at this keyframe.
    pub easing: Easing,
    /// Raw value text, resolved against the animated property's type.
    pub value: String,
    /// Culture the value is read in: the last `$culture` directive before
    /// the keyframe, or the invariant culture.
    pub culture: Culture,
}

impl Keyframe {
    pub fn culture(&self) -> &Culture {
        &self.culture
    }

    pub fn resolve(&self, ty: ValueType) -> Option<Value> {
        Value::resolve(&self.value, ty, &self.culture)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledAnimation {
    pub property: QualifiedName,
    pub navigation: Option<NavigationExpression>,
    /// Sorted by time; keyframes sharing a time keep source order.
    pub keyframes: Vec<Keyframe>,
}

impl CompiledAnimation {
    pub fn end_time(&self) -> f64 {
        self.keyframes.last().map_or(0.0, |k| k.time)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoryboardTarget {
    /// Elements must be of this type; `None` accepts any.
    pub type_name: Option<String>,
    /// Picks target elements beneath the element the storyboard plays on;
    /// without one the storyboard animates that element itself.
    pub selector: Option<CompiledSelector>,
    pub animations: Vec<CompiledAnimation>,
}

impl StoryboardTarget {
    pub fn elements(&self, tree: &ElementTree, scope: ElementId) -> Vec<ElementId> {
        let candidates = match &self.selector {
            Some(selector) => selector.select(tree, scope),
            None => vec![scope],
        };
        candidates
            .into_iter()
            .filter(|id| self.type_name.as_deref().is_none_or(|ty| tree.is_a(*id, ty)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStoryboard {
    pub name: String,
    pub loop_behavior: LoopBehavior,
    pub targets: Vec<StoryboardTarget>,
}

impl CompiledStoryboard {
    /// Time of the latest keyframe across every animation.
    pub fn duration(&self) -> Duration {
        let end = self
            .targets
            .iter()
            .flat_map(|t| &t.animations)
            .map(CompiledAnimation::end_time)
            .fold(0.0, f64::max);
        Duration::from_micros((end * 1000.0).round() as u64)
    }

    pub fn keyframes(&self) -> impl Iterator<Item = &Keyframe> {
        self.targets.iter().flat_map(|t| &t.animations).flat_map(|a| &a.keyframes)
    }
}

// ── Evaluation ────────────────────────────────────────────────────────────

/// Keyframes with their values resolved for one property type.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedKeyframes {
    frames: Vec<(f64, Easing, Value)>,
}

impl ResolvedKeyframes {
    /// Keyframes whose value cannot be read as `ty` are dropped.
    pub fn new(animation: &CompiledAnimation, ty: ValueType) -> Self {
        let frames = animation
            .keyframes
            .iter()
            .filter_map(|k| match k.resolve(ty) {
                Some(value) => Some((k.time, k.easing, value)),
                None => {
                    log::warn!("keyframe value '{}' is not a valid {} under culture {}", k.value, ty, k.culture);
                    None
                }
            })
            .collect();
        Self { frames }
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Value at `elapsed` ms. Before the first keyframe the value eases
    /// from `base`; after the last it holds the last value.
    pub fn evaluate(&self, elapsed: f64, base: &Value) -> Option<Value> {
        let first = self.frames.first()?;
        if elapsed < first.0 {
            let t = if first.0 <= 0.0 { 1.0 } else { elapsed / first.0 };
            return Some(base.interpolate(&first.2, first.1.apply(t)));
        }
        let next = self.frames.iter().position(|(time, ..)| *time > elapsed);
        match next {
            None => self.frames.last().map(|(.., v)| v.clone()),
            Some(i) => {
                let (t0, _, from) = &self.frames[i - 1];
                let (t1, easing, to) = &self.frames[i];
                let t = (elapsed - t0) / (t1 - t0);
                Some(from.interpolate(to, easing.apply(t)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::easing::Curve;

    fn frame(time: f64, easing: Easing, value: &str) -> Keyframe {
        Keyframe { time, easing, value: value.into(), culture: Culture::invariant() }
    }

    fn animation(frames: Vec<Keyframe>) -> CompiledAnimation {
        CompiledAnimation { property: QualifiedName { owner: None, name: "Width".into() }, navigation: None, keyframes: frames }
    }

    #[test]
    fn interpolates_between_keyframes() {
        let a = animation(vec![frame(0.0, Easing::Linear, "0"), frame(100.0, Easing::Linear, "10")]);
        let k = ResolvedKeyframes::new(&a, ValueType::Double);
        let base = Value::Double(-1.0);
        assert_eq!(k.evaluate(0.0, &base), Some(Value::Double(0.0)));
        assert_eq!(k.evaluate(50.0, &base), Some(Value::Double(5.0)));
        assert_eq!(k.evaluate(250.0, &base), Some(Value::Double(10.0)));
    }

    #[test]
    fn eases_from_base_value_before_first_keyframe() {
        let a = animation(vec![frame(100.0, Easing::In(Curve::Quadratic), "10")]);
        let k = ResolvedKeyframes::new(&a, ValueType::Double);
        assert_eq!(k.evaluate(50.0, &Value::Double(2.0)), Some(Value::Double(4.0)));
    }

    #[test]
    fn segment_uses_destination_easing() {
        let a = animation(vec![frame(0.0, Easing::Linear, "0"), frame(100.0, Easing::Out(Curve::Quadratic), "100")]);
        let k = ResolvedKeyframes::new(&a, ValueType::Double);
        assert_eq!(k.evaluate(50.0, &Value::Null), Some(Value::Double(75.0)));
    }

    #[test]
    fn unparseable_frames_are_dropped() {
        let a = animation(vec![frame(0.0, Easing::Linear, "wide"), frame(10.0, Easing::Linear, "3")]);
        let k = ResolvedKeyframes::new(&a, ValueType::Double);
        assert_eq!(k.evaluate(10.0, &Value::Double(0.0)), Some(Value::Double(3.0)));
        assert!(ResolvedKeyframes::new(&animation(Vec::new()), ValueType::Double).is_empty());
    }

    #[test]
    fn duration_is_latest_keyframe() {
        let sb = CompiledStoryboard {
            name: "grow".into(),
            loop_behavior: LoopBehavior::None,
            targets: vec![StoryboardTarget {
                type_name: None,
                selector: None,
                animations: vec![
                    animation(vec![frame(0.0, Easing::Linear, "0"), frame(250.0, Easing::Linear, "1")]),
                    animation(vec![frame(400.0, Easing::Linear, "1")]),
                ],
            }],
        };
        assert_eq!(sb.duration(), Duration::from_millis(400));
        assert_eq!(sb.keyframes().count(), 3);
    }
}
