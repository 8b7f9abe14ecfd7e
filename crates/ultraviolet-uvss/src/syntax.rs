//! Immutable, trivia-preserving syntax tree.
//!
//! Nodes and tokens are reference counted so unchanged subtrees can be shared
//! between trees (rewrites such as whitespace normalization and factory-built
//! fragments reuse whatever they do not touch). Nodes store no absolute
//! positions; offsets are recovered by walking from a root.

use std::fmt;
use std::rc::Rc;

use crate::kind::SyntaxKind;

// ── SyntaxTrivia ──────────────────────────────────────────────────────────

/// A whitespace, line break, or comment span attached to a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTrivia {
    kind: SyntaxKind,
    text: String,
}

impl SyntaxTrivia {
    pub fn new(kind: SyntaxKind, text: impl Into<String>) -> Self {
        debug_assert!(kind.is_trivia());
        Self { kind, text: text.into() }
    }

    pub fn whitespace(text: impl Into<String>) -> Self {
        Self::new(SyntaxKind::WhitespaceTrivia, text)
    }

    pub fn end_of_line() -> Self {
        Self::new(SyntaxKind::EndOfLineTrivia, "\n")
    }

    pub fn kind(&self) -> SyntaxKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_comment(&self) -> bool {
        matches!(
            self.kind,
            SyntaxKind::SingleLineCommentTrivia | SyntaxKind::MultiLineCommentTrivia
        )
    }
}

// ── SyntaxToken ───────────────────────────────────────────────────────────

/// A single lexical token together with the trivia surrounding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxToken {
    kind: SyntaxKind,
    text: String,
    leading: Vec<SyntaxTrivia>,
    trailing: Vec<SyntaxTrivia>,
    missing: bool,
}

impl SyntaxToken {
    pub fn new(kind: SyntaxKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            leading: Vec::new(),
            trailing: Vec::new(),
            missing: false,
        }
    }

    /// A zero-width placeholder synthesized by the parser for an expected
    /// token that was not present in the source.
    pub fn missing(kind: SyntaxKind) -> Self {
        Self { missing: true, ..Self::new(kind, "") }
    }

    pub fn with_leading(mut self, leading: Vec<SyntaxTrivia>) -> Self {
        self.leading = leading;
        self
    }

    pub fn with_trailing(mut self, trailing: Vec<SyntaxTrivia>) -> Self {
        self.trailing = trailing;
        self
    }

    /// Copy of this token with the given kind; used when a keyword is
    /// accepted in identifier position.
    pub fn with_kind(&self, kind: SyntaxKind) -> Self {
        Self { kind, ..self.clone() }
    }

    pub fn kind(&self) -> SyntaxKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn leading_trivia(&self) -> &[SyntaxTrivia] {
        &self.leading
    }

    pub fn trailing_trivia(&self) -> &[SyntaxTrivia] {
        &self.trailing
    }

    pub fn is_missing(&self) -> bool {
        self.missing
    }

    pub fn leading_width(&self) -> usize {
        self.leading.iter().map(|t| t.text.len()).sum()
    }

    pub fn trailing_width(&self) -> usize {
        self.trailing.iter().map(|t| t.text.len()).sum()
    }

    /// Width of the token text alone.
    pub fn width(&self) -> usize {
        self.text.len()
    }

    /// Width including leading and trailing trivia.
    pub fn full_width(&self) -> usize {
        self.leading_width() + self.width() + self.trailing_width()
    }

    pub fn write_full(&self, out: &mut String) {
        for t in &self.leading {
            out.push_str(&t.text);
        }
        out.push_str(&self.text);
        for t in &self.trailing {
            out.push_str(&t.text);
        }
    }

    pub fn to_full_string(&self) -> String {
        let mut out = String::with_capacity(self.full_width());
        self.write_full(&mut out);
        out
    }
}

// ── SyntaxElement ─────────────────────────────────────────────────────────

/// A child slot: either a nested node or a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxElement {
    Node(Rc<SyntaxNode>),
    Token(Rc<SyntaxToken>),
}

impl SyntaxElement {
    pub fn kind(&self) -> SyntaxKind {
        match self {
            SyntaxElement::Node(n) => n.kind(),
            SyntaxElement::Token(t) => t.kind(),
        }
    }

    pub fn full_width(&self) -> usize {
        match self {
            SyntaxElement::Node(n) => n.full_width(),
            SyntaxElement::Token(t) => t.full_width(),
        }
    }

    pub fn as_node(&self) -> Option<&Rc<SyntaxNode>> {
        match self {
            SyntaxElement::Node(n) => Some(n),
            SyntaxElement::Token(_) => None,
        }
    }

    pub fn as_token(&self) -> Option<&Rc<SyntaxToken>> {
        match self {
            SyntaxElement::Token(t) => Some(t),
            SyntaxElement::Node(_) => None,
        }
    }

    pub fn first_token(&self) -> Option<&Rc<SyntaxToken>> {
        match self {
            SyntaxElement::Token(t) => Some(t),
            SyntaxElement::Node(n) => n.first_token(),
        }
    }

    pub fn last_token(&self) -> Option<&Rc<SyntaxToken>> {
        match self {
            SyntaxElement::Token(t) => Some(t),
            SyntaxElement::Node(n) => n.last_token(),
        }
    }

    pub fn write_full(&self, out: &mut String) {
        match self {
            SyntaxElement::Node(n) => n.write_full(out),
            SyntaxElement::Token(t) => t.write_full(out),
        }
    }
}

impl From<SyntaxToken> for SyntaxElement {
    fn from(t: SyntaxToken) -> Self {
        SyntaxElement::Token(Rc::new(t))
    }
}

impl From<Rc<SyntaxToken>> for SyntaxElement {
    fn from(t: Rc<SyntaxToken>) -> Self {
        SyntaxElement::Token(t)
    }
}

impl From<SyntaxNode> for SyntaxElement {
    fn from(n: SyntaxNode) -> Self {
        SyntaxElement::Node(Rc::new(n))
    }
}

impl From<Rc<SyntaxNode>> for SyntaxElement {
    fn from(n: Rc<SyntaxNode>) -> Self {
        SyntaxElement::Node(n)
    }
}

// ── SyntaxNode ────────────────────────────────────────────────────────────

/// A composite node. Children are ordered slots; optional grammar parts that
/// are absent simply do not occupy a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    kind: SyntaxKind,
    children: Vec<SyntaxElement>,
    full_width: usize,
}

impl SyntaxNode {
    pub fn new(kind: SyntaxKind, children: Vec<SyntaxElement>) -> Self {
        debug_assert!(kind.is_node());
        let full_width = children.iter().map(SyntaxElement::full_width).sum();
        Self { kind, children, full_width }
    }

    pub fn kind(&self) -> SyntaxKind {
        self.kind
    }

    pub fn slot_count(&self) -> usize {
        self.children.len()
    }

    pub fn slot(&self, index: usize) -> Option<&SyntaxElement> {
        self.children.get(index)
    }

    pub fn children(&self) -> &[SyntaxElement] {
        &self.children
    }

    pub fn child_nodes(&self) -> impl Iterator<Item = &Rc<SyntaxNode>> {
        self.children.iter().filter_map(SyntaxElement::as_node)
    }

    pub fn child_tokens(&self) -> impl Iterator<Item = &Rc<SyntaxToken>> {
        self.children.iter().filter_map(SyntaxElement::as_token)
    }

    pub fn child_node(&self, kind: SyntaxKind) -> Option<&Rc<SyntaxNode>> {
        self.child_nodes().find(|n| n.kind == kind)
    }

    pub fn child_token(&self, kind: SyntaxKind) -> Option<&Rc<SyntaxToken>> {
        self.child_tokens().find(|t| t.kind() == kind)
    }

    /// Width including the leading trivia of the first token and the trailing
    /// trivia of the last.
    pub fn full_width(&self) -> usize {
        self.full_width
    }

    /// Width of the node text without its outermost trivia.
    pub fn width(&self) -> usize {
        let leading = self.first_token().map_or(0, |t| t.leading_width());
        let trailing = self.last_token().map_or(0, |t| t.trailing_width());
        self.full_width.saturating_sub(leading + trailing)
    }

    /// `true` when every token beneath this node was synthesized by error
    /// recovery (or the node has no tokens at all).
    pub fn is_missing(&self) -> bool {
        self.tokens().all(|t| t.is_missing())
    }

    pub fn first_token(&self) -> Option<&Rc<SyntaxToken>> {
        self.children.iter().find_map(SyntaxElement::first_token)
    }

    pub fn last_token(&self) -> Option<&Rc<SyntaxToken>> {
        self.children.iter().rev().find_map(SyntaxElement::last_token)
    }

    /// All tokens beneath this node in source order.
    pub fn tokens(&self) -> Tokens<'_> {
        Tokens { stack: vec![(self, 0)] }
    }

    /// Returns a copy of this node with slot `index` replaced. Every other
    /// child is shared with `self`.
    pub fn with_slot(&self, index: usize, element: SyntaxElement) -> SyntaxNode {
        let mut children = self.children.clone();
        children[index] = element;
        SyntaxNode::new(self.kind, children)
    }

    pub fn write_full(&self, out: &mut String) {
        for child in &self.children {
            child.write_full(out);
        }
    }

    /// Exact source text, trivia included.
    pub fn to_full_string(&self) -> String {
        let mut out = String::with_capacity(self.full_width);
        self.write_full(&mut out);
        out
    }

    /// Token text with interior trivia collapsed: a single space wherever the
    /// source had any whitespace or comment between two tokens.
    pub fn collapsed_text(&self) -> String {
        let mut out = String::new();
        let mut prev: Option<&Rc<SyntaxToken>> = None;
        for token in self.tokens().filter(|t| !t.is_missing()) {
            if let Some(p) = prev {
                if has_trivia_between(p, token) {
                    out.push(' ');
                }
            }
            out.push_str(token.text());
            prev = Some(token);
        }
        out
    }

    /// Absolute offset of the start of `target` (including its leading
    /// trivia) when this node is treated as the root at offset zero.
    pub fn offset_of(&self, target: &SyntaxNode) -> Option<usize> {
        self.offset_of_from(target, 0)
    }

    fn offset_of_from(&self, target: &SyntaxNode, base: usize) -> Option<usize> {
        if std::ptr::eq(self, target) {
            return Some(base);
        }
        let mut offset = base;
        for child in &self.children {
            if let SyntaxElement::Node(n) = child {
                if let Some(found) = n.offset_of_from(target, offset) {
                    return Some(found);
                }
            }
            offset += child.full_width();
        }
        None
    }

    /// Every descendant node (self included) paired with its absolute offset.
    pub fn descendants_with_offsets(&self) -> Vec<(usize, &SyntaxNode)> {
        let mut out = Vec::new();
        self.collect_descendants(0, &mut out);
        out
    }

    fn collect_descendants<'a>(&'a self, base: usize, out: &mut Vec<(usize, &'a SyntaxNode)>) {
        out.push((base, self));
        let mut offset = base;
        for child in &self.children {
            if let SyntaxElement::Node(n) = child {
                n.collect_descendants(offset, out);
            }
            offset += child.full_width();
        }
    }

    /// The token whose text span contains `offset`, paired with the offset
    /// at which its text starts.
    pub fn token_at_offset(&self, offset: usize) -> Option<(usize, &Rc<SyntaxToken>)> {
        let mut pos = 0;
        for token in self.tokens() {
            let start = pos + token.leading_width();
            let end = start + token.width();
            if offset >= start && offset < end {
                return Some((start, token));
            }
            pos += token.full_width();
        }
        None
    }
}

impl fmt::Display for SyntaxNode {
    /// Node text without the outermost leading/trailing trivia.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full = self.to_full_string();
        let leading = self.first_token().map_or(0, |t| t.leading_width());
        let trailing = self.last_token().map_or(0, |t| t.trailing_width());
        f.write_str(&full[leading..full.len() - trailing])
    }
}

/// `true` when any trivia separates two adjacent tokens.
pub fn has_trivia_between(prev: &SyntaxToken, next: &SyntaxToken) -> bool {
    !prev.trailing_trivia().is_empty() || !next.leading_trivia().is_empty()
}

// ── Tokens iterator ───────────────────────────────────────────────────────

/// Depth-first iterator over the tokens beneath a node.
pub struct Tokens<'a> {
    stack: Vec<(&'a SyntaxNode, usize)>,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a Rc<SyntaxToken>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (node, index) = self.stack.last_mut()?;
            let node: &'a SyntaxNode = *node;
            match node.children.get(*index) {
                None => {
                    self.stack.pop();
                }
                Some(child) => {
                    *index += 1;
                    match child {
                        SyntaxElement::Token(t) => return Some(t),
                        SyntaxElement::Node(n) => self.stack.push((n, 0)),
                    }
                }
            }
        }
    }
}

// ── LineIndex ─────────────────────────────────────────────────────────────

/// Maps byte offsets to 1-based line/column pairs.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(src: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in src.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// 1-based `(line, col)`; the column counts bytes.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        (line + 1, offset - self.line_starts[line] + 1)
    }

    /// Inverse of [`line_col`](Self::line_col) with 0-based inputs, clamped
    /// to the last line.
    pub fn offset(&self, line0: usize, col0: usize) -> usize {
        let line = line0.min(self.line_starts.len() - 1);
        self.line_starts[line] + col0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SyntaxKind::*;

    fn tok(kind: SyntaxKind, text: &str) -> SyntaxElement {
        SyntaxToken::new(kind, text).into()
    }

    #[test]
    fn full_width_counts_trivia() {
        let t = SyntaxToken::new(IdentifierToken, "foo")
            .with_leading(vec![SyntaxTrivia::whitespace("  ")])
            .with_trailing(vec![SyntaxTrivia::end_of_line()]);
        assert_eq!(t.width(), 3);
        assert_eq!(t.full_width(), 6);
        assert_eq!(t.to_full_string(), "  foo\n");
    }

    #[test]
    fn node_display_strips_outer_trivia() {
        let a = SyntaxToken::new(IdentifierToken, "a")
            .with_leading(vec![SyntaxTrivia::whitespace(" ")])
            .with_trailing(vec![SyntaxTrivia::whitespace(" ")]);
        let node = SyntaxNode::new(
            SelectorPart,
            vec![a.into(), tok(PeriodToken, "."), tok(IdentifierToken, "b")],
        );
        assert_eq!(node.to_full_string(), " a .b");
        assert_eq!(node.to_string(), "a .b");
        assert_eq!(node.width(), 4);
        assert_eq!(node.collapsed_text(), "a .b");
    }

    #[test]
    fn offsets_walk_from_root() {
        let inner = Rc::new(SyntaxNode::new(PseudoClass, vec![tok(ColonToken, ":"), tok(IdentifierToken, "hover")]));
        let root = SyntaxNode::new(
            SelectorPart,
            vec![tok(IdentifierToken, "button"), SyntaxElement::Node(inner.clone())],
        );
        assert_eq!(root.offset_of(&inner), Some(6));
        let (start, token) = root.token_at_offset(8).unwrap();
        assert_eq!(start, 7);
        assert_eq!(token.text(), "hover");
    }

    #[test]
    fn with_slot_shares_untouched_children() {
        let shared = Rc::new(SyntaxNode::new(PropertyName, vec![tok(IdentifierToken, "Width")]));
        let node = SyntaxNode::new(Rule, vec![SyntaxElement::Node(shared.clone()), tok(ColonToken, ":")]);
        let replaced = node.with_slot(1, tok(ColonToken, ":"));
        match replaced.slot(0) {
            Some(SyntaxElement::Node(n)) => assert!(Rc::ptr_eq(n, &shared)),
            other => panic!("unexpected slot {other:?}"),
        }
    }

    #[test]
    fn missing_nodes() {
        let node = SyntaxNode::new(PropertyName, vec![SyntaxToken::missing(IdentifierToken).into()]);
        assert!(node.is_missing());
        assert_eq!(node.full_width(), 0);
    }

    #[test]
    fn line_index_round_trip() {
        let idx = LineIndex::new("ab\ncd\n\nef");
        assert_eq!(idx.line_col(0), (1, 1));
        assert_eq!(idx.line_col(4), (2, 2));
        assert_eq!(idx.line_col(7), (4, 1));
        assert_eq!(idx.offset(1, 1), 4);
    }
}
