//! UVSS compilation and style application.
//!
//! [`compile`] walks a parsed stylesheet and produces a [`CompiledDocument`]:
//! flattened rule sets with specificity-sorted selectors, triggers,
//! transitions, and storyboards, plus every diagnostic found along the way.
//! [`apply_styles`] matches the compiled rule sets against an element tree.
//!
//! # Culture
//!
//! `$culture { name }` directives are read in a single pass in document
//! order. Every literal after a directive (rule values, trigger values, and
//! keyframe values) is read in that culture until the next directive; with
//! no preceding directive the invariant culture applies. The execution
//! culture in [`CompilerOptions`] never leaks into literals.

mod apply;
mod compile;
pub mod easing;
pub mod selector;
pub mod storyboard;
pub mod trigger;

use std::collections::HashMap;
use std::rc::Rc;

use ultraviolet_uvss::ast::QualifiedName;

use crate::culture::Culture;
use crate::error::CompilationError;
use crate::registry::TypeRegistry;

pub use apply::{apply_styles, StyleMatch};
pub use compile::{compile, compile_str};
pub use easing::{Curve, Easing};
pub use selector::{Combinator, CompiledSelector, NavigationExpression, SelectorPart, Specificity};
pub use storyboard::{CompiledAnimation, CompiledStoryboard, Keyframe, ResolvedKeyframes, StoryboardTarget};
pub use trigger::{
    ComparisonOp, EventTrigger, PropertyTrigger, Transition, Trigger, TriggerAction, TriggerCondition, TriggerId,
};

// ── Context ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Culture of the process doing the compiling. Used for nothing but
    /// log output; literals follow `$culture` directives only.
    pub execution_culture: Culture,
    /// Report selector, target, and navigation types that are not
    /// registered. Off for stylesheets shared between tools that register
    /// different control sets.
    pub report_unknown_types: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self { execution_culture: Culture::invariant(), report_unknown_types: true }
    }
}

/// What a compilation resolves names against.
#[derive(Debug, Clone)]
pub struct CompilationContext {
    pub registry: Rc<TypeRegistry>,
    pub options: CompilerOptions,
}

impl CompilationContext {
    pub fn new(registry: Rc<TypeRegistry>) -> Self {
        Self { registry, options: CompilerOptions::default() }
    }

    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }
}

// ── CompiledDocument ──────────────────────────────────────────────────────

/// `name: value [!important];`
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    pub property: QualifiedName,
    pub value: String,
    pub culture: Culture,
    pub important: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRuleSet {
    /// Document order; breaks specificity ties, later wins.
    pub index: usize,
    /// Comma-separated alternatives.
    pub selectors: Vec<CompiledSelector>,
    pub rules: Vec<CompiledRule>,
    pub triggers: Vec<Trigger>,
    pub transitions: Vec<Transition>,
}

#[derive(Debug, Clone, Default)]
pub struct CompiledDocument {
    pub rule_sets: Vec<CompiledRuleSet>,
    pub storyboards: HashMap<String, Rc<CompiledStoryboard>>,
    pub diagnostics: Vec<CompilationError>,
}

impl CompiledDocument {
    /// A document with compilation errors still exists for tooling but
    /// must not be applied.
    pub fn is_usable(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn storyboard(&self, name: &str) -> Option<&Rc<CompiledStoryboard>> {
        self.storyboards.get(name)
    }

    pub fn rule_set(&self, index: usize) -> Option<&CompiledRuleSet> {
        self.rule_sets.iter().find(|rs| rs.index == index)
    }
}
