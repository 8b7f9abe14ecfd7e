//! Cultures and the scoped "current culture" used while resolving literals.
//!
//! There is no process-wide culture. Code that needs one either receives a
//! [`Culture`] explicitly or enters it on a [`CultureScope`], whose guard
//! restores the previous culture on every exit path.

use std::cell::RefCell;
use std::fmt;

/// Languages that write numbers with a decimal comma.
const DECIMAL_COMMA: &[&str] = &[
    "be", "bg", "cs", "da", "de", "el", "es", "et", "fi", "fr", "hr", "hu", "id", "it", "lt", "lv", "nb",
    "nl", "no", "pl", "pt", "ro", "ru", "sk", "sl", "sr", "sv", "tr", "uk", "vi",
];

/// A BCP-47 culture name. The empty name is the invariant culture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Culture {
    name: String,
}

impl Culture {
    pub fn invariant() -> Self {
        Self::default()
    }

    /// Accepts any name shaped like a BCP-47 tag (`xx`, `xx-YY`,
    /// `xxx-Latn-YY`, ...). Whether the culture is actually known only
    /// affects number formatting.
    pub fn new(name: &str) -> Result<Self, String> {
        let name = name.trim();
        if is_bcp47_shape(name) {
            Ok(Self { name: name.to_string() })
        } else {
            Err(name.to_string())
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_invariant(&self) -> bool {
        self.name.is_empty()
    }

    /// Primary language subtag, lowercased; empty for the invariant culture.
    pub fn language(&self) -> String {
        self.name.split('-').next().unwrap_or_default().to_ascii_lowercase()
    }

    pub fn decimal_separator(&self) -> char {
        if DECIMAL_COMMA.contains(&self.language().as_str()) { ',' } else { '.' }
    }

    /// Parses a floating-point number written in this culture. The other
    /// culture's separator is rejected rather than guessed at.
    pub fn parse_f64(&self, text: &str) -> Option<f64> {
        let text = text.trim();
        let sep = self.decimal_separator();
        let foreign = if sep == ',' { '.' } else { ',' };
        if text.is_empty() || text.contains(foreign) {
            return None;
        }
        let normalized: String = text.chars().map(|c| if c == sep { '.' } else { c }).collect();
        if !normalized.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')) {
            return None;
        }
        normalized.parse::<f64>().ok().filter(|v| v.is_finite())
    }

    pub fn parse_i64(&self, text: &str) -> Option<i64> {
        text.trim().parse().ok()
    }

    /// Formats `value` with this culture's decimal separator, using
    /// `decimals` fixed digits when given.
    pub fn format_f64(&self, value: f64, decimals: Option<usize>) -> String {
        let text = match decimals {
            Some(n) => format!("{value:.n$}"),
            None => value.to_string(),
        };
        match self.decimal_separator() {
            '.' => text,
            sep => text.replace('.', &sep.to_string()),
        }
    }
}

impl fmt::Display for Culture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invariant() { f.write_str("(invariant)") } else { f.write_str(&self.name) }
    }
}

fn is_bcp47_shape(name: &str) -> bool {
    let mut parts = name.split('-');
    let Some(language) = parts.next() else { return false };
    (2..=8).contains(&language.len())
        && language.chars().all(|c| c.is_ascii_alphabetic())
        && parts.all(|p| (1..=8).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphanumeric()))
}

// ── CultureScope ──────────────────────────────────────────────────────────

/// Holder of the current culture for one UI context.
#[derive(Debug, Default)]
pub struct CultureScope {
    current: RefCell<Culture>,
}

impl CultureScope {
    pub fn new(culture: Culture) -> Self {
        Self { current: RefCell::new(culture) }
    }

    pub fn current(&self) -> Culture {
        self.current.borrow().clone()
    }

    /// Makes `culture` current until the returned guard is dropped.
    pub fn enter(&self, culture: Culture) -> CultureGuard<'_> {
        let previous = self.current.replace(culture);
        CultureGuard { scope: self, previous: Some(previous) }
    }
}

#[must_use = "the previous culture is restored when the guard is dropped"]
pub struct CultureGuard<'a> {
    scope: &'a CultureScope,
    previous: Option<Culture>,
}

impl Drop for CultureGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.scope.current.replace(previous);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn culture(name: &str) -> Culture {
        Culture::new(name).unwrap()
    }

    #[test]
    fn accepts_bcp47_shapes() {
        assert!(Culture::new("ru-RU").is_ok());
        assert!(Culture::new("sr-Latn-RS").is_ok());
        assert!(Culture::new("en").is_ok());
        assert!(Culture::new("").is_err());
        assert!(Culture::new("ru RU").is_err());
        assert!(Culture::new("1x-YY").is_err());
    }

    #[test]
    fn numbers_follow_the_decimal_separator() {
        assert_eq!(Culture::invariant().parse_f64("100.5"), Some(100.5));
        assert_eq!(culture("ru-RU").parse_f64("100,5"), Some(100.5));
        assert_eq!(culture("ru-RU").parse_f64("100.5"), None);
        assert_eq!(culture("en-US").parse_f64("1,5"), None);
        assert_eq!(culture("fr-FR").parse_f64("-2"), Some(-2.0));
        assert_eq!(Culture::invariant().parse_f64("inf"), None);
    }

    #[test]
    fn formatting_uses_the_decimal_separator() {
        assert_eq!(culture("de-DE").format_f64(1.5, Some(1)), "1,5");
        assert_eq!(Culture::invariant().format_f64(3.0, Some(2)), "3.00");
    }

    #[test]
    fn scope_restores_on_drop() {
        let scope = CultureScope::new(culture("en-US"));
        {
            let _guard = scope.enter(culture("ru-RU"));
            assert_eq!(scope.current().name(), "ru-RU");
            {
                let _inner = scope.enter(Culture::invariant());
                assert!(scope.current().is_invariant());
            }
            assert_eq!(scope.current().name(), "ru-RU");
        }
        assert_eq!(scope.current().name(), "en-US");
    }

    #[test]
    fn scope_restores_when_unwinding_through_an_error() {
        let scope = CultureScope::new(Culture::invariant());
        let run = || -> Result<(), String> {
            let _guard = scope.enter(culture("fr-FR"));
            Err("boom".into())
        };
        assert!(run().is_err());
        assert!(scope.current().is_invariant());
    }
}
