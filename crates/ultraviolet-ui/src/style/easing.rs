use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Shape of an easing curve, defined by its ease-in form.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Curve {
    Quadratic,
    Cubic,
    Quartic,
    Quintic,
    Sin,
    Exponential,
    Circular,
    Back,
    Bounce,
    Elastic,
}

const CURVES: &[(&str, Curve)] = &[
    ("quadratic", Curve::Quadratic),
    ("cubic", Curve::Cubic),
    ("quartic", Curve::Quartic),
    ("quintic", Curve::Quintic),
    ("sin", Curve::Sin),
    ("exponential", Curve::Exponential),
    ("circular", Curve::Circular),
    ("back", Curve::Back),
    ("bounce", Curve::Bounce),
    ("elastic", Curve::Elastic),
];

impl Curve {
    fn name(self) -> &'static str {
        CURVES.iter().find(|(_, c)| *c == self).map_or("", |(n, _)| n)
    }

    fn ease_in(self, t: f64) -> f64 {
        match self {
            Curve::Quadratic => t * t,
            Curve::Cubic => t * t * t,
            Curve::Quartic => t.powi(4),
            Curve::Quintic => t.powi(5),
            Curve::Sin => 1.0 - (t * PI / 2.0).cos(),
            Curve::Exponential if t <= 0.0 => 0.0,
            Curve::Exponential => 2f64.powf(10.0 * (t - 1.0)),
            Curve::Circular => 1.0 - (1.0 - t * t).max(0.0).sqrt(),
            Curve::Back => {
                const C1: f64 = 1.70158;
                (C1 + 1.0) * t * t * t - C1 * t * t
            }
            Curve::Bounce => 1.0 - bounce_out(1.0 - t),
            Curve::Elastic if t <= 0.0 || t >= 1.0 => t,
            Curve::Elastic => -(2f64.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * (2.0 * PI / 3.0)).sin(),
        }
    }
}

fn bounce_out(t: f64) -> f64 {
    const N: f64 = 7.5625;
    const D: f64 = 2.75;
    if t < 1.0 / D {
        N * t * t
    } else if t < 2.0 / D {
        let t = t - 1.5 / D;
        N * t * t + 0.75
    } else if t < 2.5 / D {
        let t = t - 2.25 / D;
        N * t * t + 0.9375
    } else {
        let t = t - 2.625 / D;
        N * t * t + 0.984375
    }
}

/// A named easing function applied to the progress between two keyframes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Easing {
    #[default]
    Linear,
    In(Curve),
    Out(Curve),
    InOut(Curve),
}

impl Easing {
    /// Eased progress for `t` in `[0, 1]`. `0` and `1` map to themselves.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::In(c) => c.ease_in(t),
            Easing::Out(c) => 1.0 - c.ease_in(1.0 - t),
            Easing::InOut(c) if t < 0.5 => c.ease_in(2.0 * t) / 2.0,
            Easing::InOut(c) => 1.0 - c.ease_in(2.0 * (1.0 - t)) / 2.0,
        }
    }

    /// Every easing a stylesheet can name, linear first.
    pub fn all() -> impl Iterator<Item = Easing> {
        let curves = CURVES.iter().map(|(_, c)| *c);
        std::iter::once(Easing::Linear).chain(curves.flat_map(|c| [Easing::In(c), Easing::Out(c), Easing::InOut(c)]))
    }
}

impl FromStr for Easing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        if lower == "ease-in-linear" {
            return Ok(Easing::Linear);
        }
        let unknown = || format!("unknown easing function '{}'", s);
        let rest = lower.strip_prefix("ease-").ok_or_else(unknown)?;
        let (wrap, curve): (fn(Curve) -> Easing, &str) = if let Some(c) = rest.strip_prefix("in-out-") {
            (Easing::InOut, c)
        } else if let Some(c) = rest.strip_prefix("in-") {
            (Easing::In, c)
        } else if let Some(c) = rest.strip_prefix("out-") {
            (Easing::Out, c)
        } else {
            return Err(unknown());
        };
        CURVES.iter().find(|(n, _)| *n == curve).map(|(_, c)| wrap(*c)).ok_or_else(unknown)
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Easing::Linear => f.write_str("ease-in-linear"),
            Easing::In(c) => write!(f, "ease-in-{}", c.name()),
            Easing::Out(c) => write!(f, "ease-out-{}", c.name()),
            Easing::InOut(c) => write!(f, "ease-in-out-{}", c.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[Curve] = &[
        Curve::Quadratic,
        Curve::Cubic,
        Curve::Quartic,
        Curve::Quintic,
        Curve::Sin,
        Curve::Exponential,
        Curve::Circular,
        Curve::Back,
        Curve::Bounce,
        Curve::Elastic,
    ];

    #[test]
    fn names_round_trip() {
        assert_eq!("ease-in-linear".parse(), Ok(Easing::Linear));
        assert_eq!("EASE-OUT-BOUNCE".parse(), Ok(Easing::Out(Curve::Bounce)));
        for &c in ALL {
            for e in [Easing::In(c), Easing::Out(c), Easing::InOut(c)] {
                assert_eq!(e.to_string().parse::<Easing>(), Ok(e));
            }
        }
        assert!("ease-sideways-cubic".parse::<Easing>().is_err());
        assert!("ease-in-wobbly".parse::<Easing>().is_err());
        assert!("linear".parse::<Easing>().is_err());
    }

    #[test]
    fn all_lists_every_name_once() {
        let names: Vec<String> = Easing::all().map(|e| e.to_string()).collect();
        assert_eq!(names.len(), 1 + 3 * ALL.len());
        assert_eq!(names[0], "ease-in-linear");
        assert!(names.contains(&"ease-in-out-elastic".to_string()));
    }

    #[test]
    fn endpoints_are_fixed() {
        for &c in ALL {
            for e in [Easing::In(c), Easing::Out(c), Easing::InOut(c)] {
                assert!(e.apply(0.0).abs() < 1e-9, "{e} at 0");
                assert!((e.apply(1.0) - 1.0).abs() < 1e-9, "{e} at 1");
            }
        }
    }

    #[test]
    fn shapes() {
        assert_eq!(Easing::Linear.apply(0.3), 0.3);
        assert_eq!(Easing::In(Curve::Quadratic).apply(0.5), 0.25);
        assert_eq!(Easing::Out(Curve::Quadratic).apply(0.5), 0.75);
        assert_eq!(Easing::InOut(Curve::Cubic).apply(0.5), 0.5);
        assert!(Easing::In(Curve::Back).apply(0.2) < 0.0);
    }
}
