//! Data binding: data sources, `{{path}}` expressions, and the compiled
//! expression wrappers that bindings are resolved through.
//!
//! Markup binds with `{{Path}}` or `{{Path:Format}}`. Compiling a template
//! registers every expression it uses on a [`DataSourceWrapper`] for the
//! template's data-source type, giving each a compiled member name. At
//! instantiation a binding is re-expressed as `{{CompiledName}}`, optionally
//! followed by `:Format`, and handed to the element tree, which accepts
//! nothing but compiled names.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::culture::Culture;
use crate::error::UvmlError;
use crate::value::Value;

// ── Data sources ──────────────────────────────────────────────────────────

/// An object that bindings read from.
pub trait DataSource {
    fn type_name(&self) -> &str;
    fn get(&self, path: &str) -> Option<Value>;
}

/// A mutable bag of named values; the simplest [`DataSource`].
#[derive(Debug, Default)]
pub struct PropertyBag {
    type_name: String,
    values: RefCell<HashMap<String, Value>>,
}

impl PropertyBag {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), values: RefCell::new(HashMap::new()) }
    }

    pub fn with(self, path: impl Into<String>, value: Value) -> Self {
        self.set(path, value);
        self
    }

    pub fn set(&self, path: impl Into<String>, value: Value) {
        self.values.borrow_mut().insert(path.into(), value);
    }
}

impl DataSource for PropertyBag {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn get(&self, path: &str) -> Option<Value> {
        self.values.borrow().get(path).cloned()
    }
}

// ── Expressions ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingExpression {
    pub path: String,
    pub format: Option<String>,
}

impl BindingExpression {
    /// `true` for text shaped like `{{...}}` other than the `{{null}}`
    /// literal.
    pub fn is_binding(text: &str) -> bool {
        let text = text.trim();
        text.starts_with("{{") && text.ends_with("}}") && text != "{{null}}"
    }

    pub fn parse(text: &str) -> Result<Self, UvmlError> {
        let invalid = || UvmlError::InvalidBindingExpression(text.to_string());
        let inner = text
            .trim()
            .strip_prefix("{{")
            .and_then(|t| t.strip_suffix("}}"))
            .ok_or_else(invalid)?;
        let (path, format) = match inner.split_once(':') {
            Some((path, format)) => (path.trim(), Some(format.trim())),
            None => (inner.trim(), None),
        };
        let valid_path = !path.is_empty()
            && path.split('.').all(|seg| {
                let mut chars = seg.chars();
                chars.next().is_some_and(|c| c.is_alphabetic() || c == '_')
                    && chars.all(|c| c.is_alphanumeric() || c == '_')
            });
        if !valid_path || format.is_some_and(str::is_empty) {
            return Err(invalid());
        }
        Ok(Self { path: path.to_string(), format: format.map(str::to_string) })
    }
}

impl fmt::Display for BindingExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.format {
            Some(format) => write!(f, "{{{{{}:{}}}}}", self.path, format),
            None => write!(f, "{{{{{}}}}}", self.path),
        }
    }
}

/// A binding expression registered on a wrapper under a generated member
/// name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledExpression {
    pub compiled_name: String,
    pub path: String,
}

/// The compiled binding surface of one data-source type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSourceWrapper {
    data_source_type: String,
    members: Vec<Rc<CompiledExpression>>,
}

impl DataSourceWrapper {
    pub fn new(data_source_type: impl Into<String>) -> Self {
        Self { data_source_type: data_source_type.into(), members: Vec::new() }
    }

    pub fn name(&self) -> String {
        format!("__Wrapper_{}", self.data_source_type)
    }

    pub fn data_source_type(&self) -> &str {
        &self.data_source_type
    }

    pub fn member(&self, compiled_name: &str) -> Option<&Rc<CompiledExpression>> {
        self.members.iter().find(|m| m.compiled_name == compiled_name)
    }

    pub fn compiled_name_for(&self, path: &str) -> Option<&str> {
        self.members.iter().find(|m| m.path == path).map(|m| m.compiled_name.as_str())
    }

    fn register(&mut self, path: &str) -> String {
        if let Some(existing) = self.compiled_name_for(path) {
            return existing.to_string();
        }
        let compiled_name = format!("__Expression{}", self.members.len());
        self.members.push(Rc::new(CompiledExpression { compiled_name: compiled_name.clone(), path: path.to_string() }));
        compiled_name
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Splits `{{CompiledName}}[:Format]` into the member it names and the
    /// optional format.
    pub fn resolve(&self, expression: &str) -> Result<(Rc<CompiledExpression>, Option<String>), UvmlError> {
        let (binding, format) = match expression.split_once("}}:") {
            Some((head, format)) => (format!("{head}}}}}"), Some(format.to_string())),
            None => (expression.to_string(), None),
        };
        let parsed = BindingExpression::parse(&binding)?;
        if parsed.format.is_some() {
            return Err(UvmlError::InvalidBindingExpression(expression.to_string()));
        }
        let member = self.member(&parsed.path).ok_or_else(|| UvmlError::MissingCompiledExpression {
            wrapper: self.name(),
            expression: expression.to_string(),
        })?;
        Ok((member.clone(), format))
    }
}

/// Per-compilation-context caches of wrappers keyed by data-source type.
#[derive(Debug, Default)]
pub struct ExpressionCache {
    wrappers: HashMap<String, DataSourceWrapper>,
}

impl ExpressionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `expression` for `data_source_type`, returning its compiled
    /// member name. Registering the same path twice yields the same name.
    pub fn register(&mut self, data_source_type: &str, expression: &BindingExpression) -> String {
        self.wrappers
            .entry(data_source_type.to_string())
            .or_insert_with(|| DataSourceWrapper::new(data_source_type))
            .register(&expression.path)
    }

    /// Snapshot of the wrapper for `data_source_type` as compiled so far.
    pub fn wrapper(&self, data_source_type: &str) -> Option<Rc<DataSourceWrapper>> {
        self.wrappers.get(data_source_type).cloned().map(Rc::new)
    }
}

// ── Formatting ────────────────────────────────────────────────────────────

/// Applies a numeric format (`F2`, `N0`, `D3`, `P1`) to `value`. Other
/// values, and unknown formats, pass through unchanged.
pub fn format_value(value: Value, format: Option<&str>, culture: &Culture) -> Value {
    let Some(format) = format else { return value };
    let Some(number) = value.as_f64() else { return value };
    let mut chars = format.chars();
    let spec = chars.next().map(|c| c.to_ascii_uppercase());
    let digits: Option<usize> = chars.as_str().parse().ok();
    let text = match spec {
        Some('F' | 'N') => culture.format_f64(number, Some(digits.unwrap_or(2))),
        Some('D') => format!("{:0width$}", number.round() as i64, width = digits.unwrap_or(0)),
        Some('P') => format!("{} %", culture.format_f64(number * 100.0, Some(digits.unwrap_or(2)))),
        _ => return value,
    };
    Value::String(text)
}
