//! Programmatic construction of syntax trees.
//!
//! Factory output carries no trivia; run it through
//! [`normalize_whitespace`](crate::normalize::normalize_whitespace) to get
//! printable text.

use std::rc::Rc;

use crate::kind::SyntaxKind::{self, *};
use crate::lexer::lex;
use crate::syntax::{SyntaxElement, SyntaxNode, SyntaxToken};

// ── Tokens ────────────────────────────────────────────────────────────────

pub fn token(kind: SyntaxKind, text: impl Into<String>) -> SyntaxElement {
    SyntaxToken::new(kind, text).into()
}

/// Punctuation or keyword token with its fixed text.
pub fn punctuation(kind: SyntaxKind) -> SyntaxElement {
    token(kind, kind.fixed_text().unwrap_or_default())
}

pub fn identifier(text: impl Into<String>) -> SyntaxElement {
    token(IdentifierToken, text)
}

pub fn number(value: impl ToString) -> SyntaxElement {
    token(NumberToken, value.to_string())
}

pub fn end_of_file() -> SyntaxElement {
    token(EndOfFileToken, "")
}

fn node(kind: SyntaxKind, children: Vec<SyntaxElement>) -> SyntaxElement {
    SyntaxNode::new(kind, children).into()
}

// ── Selectors ─────────────────────────────────────────────────────────────

pub fn id_sub_part(name: &str) -> SyntaxElement {
    node(SelectorSubPart, vec![punctuation(HashToken), identifier(name)])
}

pub fn class_sub_part(name: &str) -> SyntaxElement {
    node(SelectorSubPart, vec![punctuation(PeriodToken), identifier(name)])
}

pub fn type_sub_part(name: &str) -> SyntaxElement {
    node(SelectorSubPart, vec![identifier(name)])
}

pub fn universal_sub_part() -> SyntaxElement {
    node(SelectorSubPart, vec![punctuation(AsteriskToken)])
}

pub fn pseudo_class(name: &str) -> SyntaxElement {
    node(PseudoClass, vec![punctuation(ColonToken), identifier(name)])
}

/// A compound selector part, e.g. `#foo:hover` or `.bar.baz`.
pub fn selector_part(sub_parts: Vec<SyntaxElement>, pseudo: Option<&str>) -> SyntaxElement {
    let mut children = sub_parts;
    if let Some(name) = pseudo {
        children.push(pseudo_class(name));
    }
    node(SelectorPart, children)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace: any visual ancestor.
    Descendant,
    /// `>`: the direct visual parent.
    VisualChild,
}

pub fn selector(first: SyntaxElement, rest: Vec<(Combinator, SyntaxElement)>) -> SyntaxElement {
    let mut children = vec![first];
    for (combinator, part) in rest {
        if combinator == Combinator::VisualChild {
            children.push(punctuation(GreaterThanToken));
        }
        children.push(part);
    }
    node(Selector, children)
}

pub fn navigation_expression(property: &str, as_type: Option<&str>) -> SyntaxElement {
    let mut children = vec![punctuation(PipeToken), property_name(property)];
    if let Some(ty) = as_type {
        children.push(punctuation(AsKeyword));
        children.push(identifier(ty));
    }
    node(NavigationExpression, children)
}

pub fn selector_with_navigation_expression(
    selector: SyntaxElement,
    navigation: Option<SyntaxElement>,
) -> SyntaxElement {
    let mut children = vec![selector];
    children.extend(navigation);
    node(SelectorWithNavigationExpression, children)
}

// ── Rules and blocks ──────────────────────────────────────────────────────

/// `Name` or `Owner.Name`.
pub fn property_name(name: &str) -> SyntaxElement {
    let children = match name.split_once('.') {
        Some((owner, prop)) => vec![identifier(owner), punctuation(PeriodToken), identifier(prop)],
        None => vec![identifier(name)],
    };
    node(PropertyName, children)
}

/// Tokens of `text` as the lexer would produce them, without the outer
/// trivia or the end-of-file token.
fn value_tokens(text: &str) -> Vec<SyntaxElement> {
    let mut tokens = lex(text.trim()).tokens;
    tokens.pop();
    let last = tokens.len().saturating_sub(1);
    tokens
        .into_iter()
        .enumerate()
        .map(|(i, t)| {
            let mut t = Rc::unwrap_or_clone(t);
            if i == 0 {
                t = t.with_leading(Vec::new());
            }
            if i == last {
                t = t.with_trailing(Vec::new());
            }
            t.into()
        })
        .collect()
}

pub fn property_value(text: &str) -> SyntaxElement {
    node(PropertyValue, value_tokens(text))
}

pub fn property_value_with_braces(text: &str) -> SyntaxElement {
    let mut children = vec![punctuation(OpenCurlyBraceToken)];
    children.extend(value_tokens(text));
    children.push(punctuation(CloseCurlyBraceToken));
    node(PropertyValueWithBraces, children)
}

pub fn rule(name: &str, value: &str, important: bool) -> SyntaxElement {
    let mut children = vec![property_name(name), punctuation(ColonToken), property_value(value)];
    if important {
        children.push(punctuation(ExclamationMarkToken));
        children.push(punctuation(ImportantKeyword));
    }
    children.push(punctuation(SemiColonToken));
    node(Rule, children)
}

pub fn block(items: Vec<SyntaxElement>) -> SyntaxElement {
    let mut children = vec![punctuation(OpenCurlyBraceToken)];
    children.extend(items);
    children.push(punctuation(CloseCurlyBraceToken));
    node(Block, children)
}

/// A rule set with one or more comma-separated selectors.
pub fn rule_set(selectors: Vec<SyntaxElement>, body: SyntaxElement) -> SyntaxElement {
    let mut children = Vec::new();
    for (i, sel) in selectors.into_iter().enumerate() {
        if i > 0 {
            children.push(punctuation(CommaToken));
        }
        children.push(sel);
    }
    children.push(body);
    node(RuleSet, children)
}

/// Shorthand for a rule set whose only selector is a single type name.
pub fn simple_rule_set(type_name: &str, items: Vec<SyntaxElement>) -> SyntaxElement {
    let sel = selector(selector_part(vec![type_sub_part(type_name)], None), Vec::new());
    rule_set(vec![selector_with_navigation_expression(sel, None)], block(items))
}

pub fn culture_directive(culture: &str) -> SyntaxElement {
    node(
        CultureDirective,
        vec![token(DirectiveToken, "$culture"), property_value_with_braces(culture)],
    )
}

pub fn document(items: Vec<SyntaxElement>) -> Rc<SyntaxNode> {
    let mut children = items;
    children.push(end_of_file());
    Rc::new(SyntaxNode::new(Document, children))
}
