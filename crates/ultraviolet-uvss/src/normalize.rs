//! Canonical whitespace layout.
//!
//! Every token is assigned fresh trivia from a small set of layout rules:
//! blocks open on their own line and indent their contents by one tab,
//! statements inside a block end with a line break, and top-level items are
//! separated by a blank line. Comments survive normalization; a comment that
//! trailed a token stays on that token's line and forces the next token onto
//! a new line.

use std::rc::Rc;

use crate::kind::SyntaxKind::{self, *};
use crate::syntax::{has_trivia_between, SyntaxElement, SyntaxNode, SyntaxToken, SyntaxTrivia};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Sep {
    None,
    Space,
    Line,
    BlankLine,
}

type TokenTrivia = (Vec<SyntaxTrivia>, Vec<SyntaxTrivia>);

struct Normalizer {
    depth: usize,
    pending: Sep,
    /// Set after a token that carries trailing comments.
    force_line: bool,
    prev: Option<usize>,
    out: Vec<TokenTrivia>,
}

impl Normalizer {
    fn new() -> Self {
        Self { depth: 0, pending: Sep::None, force_line: false, prev: None, out: Vec::new() }
    }

    // ── Traversal ─────────────────────────────────────────────────────────

    fn visit_element(&mut self, element: &SyntaxElement) {
        match element {
            SyntaxElement::Token(t) => self.emit(t),
            SyntaxElement::Node(n) => self.visit_node(n),
        }
    }

    fn visit_node(&mut self, node: &SyntaxNode) {
        if node.kind() == Block {
            self.visit_block(node);
            return;
        }
        let children = node.children();
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                self.pending = separator(node.kind(), &children[i - 1], child, i, children.len());
            }
            self.visit_element(child);
        }
    }

    fn visit_block(&mut self, node: &SyntaxNode) {
        let children = node.children();
        let Some((open, rest)) = children.split_first() else { return };
        self.visit_element(open);
        self.depth += 1;
        let mut prev_item: Option<SyntaxKind> = None;
        for child in rest {
            if child.kind() == CloseCurlyBraceToken {
                self.depth -= 1;
                self.pending = Sep::Line;
                self.visit_element(child);
                return;
            }
            self.pending = match prev_item {
                Some(prev) if !(is_simple_statement(prev) && is_simple_statement(child.kind())) => {
                    Sep::BlankLine
                }
                _ => Sep::Line,
            };
            prev_item = Some(child.kind());
            self.visit_element(child);
        }
        self.depth -= 1;
    }

    // ── Emission ──────────────────────────────────────────────────────────

    fn emit(&mut self, token: &SyntaxToken) {
        if token.is_missing() {
            self.out.push((Vec::new(), Vec::new()));
            return;
        }
        if token.kind() == EndOfFileToken {
            self.emit_end_of_file(token);
            return;
        }

        let comments: Vec<&SyntaxTrivia> =
            token.leading_trivia().iter().filter(|t| t.is_comment()).collect();
        let mut sep = std::mem::replace(&mut self.pending, Sep::None);
        if self.force_line || !comments.is_empty() {
            sep = sep.max(Sep::Line);
        }

        let mut leading = Vec::new();
        self.apply_separator(sep, &mut leading);

        let mut fresh_line = self.prev.is_some() && sep >= Sep::Line;
        for comment in comments {
            if fresh_line {
                self.indent(&mut leading);
            }
            leading.push(comment.clone());
            leading.push(SyntaxTrivia::end_of_line());
            fresh_line = true;
        }
        if fresh_line {
            self.indent(&mut leading);
        }

        let mut trailing = Vec::new();
        for comment in token.trailing_trivia().iter().filter(|t| t.is_comment()) {
            trailing.push(SyntaxTrivia::whitespace(" "));
            trailing.push(comment.clone());
        }
        self.force_line = !trailing.is_empty();

        self.prev = Some(self.out.len());
        self.out.push((leading, trailing));
    }

    /// Comments at the very end of the document hang off the end-of-file
    /// token; without them it carries no trivia at all.
    fn emit_end_of_file(&mut self, token: &SyntaxToken) {
        let comments: Vec<&SyntaxTrivia> =
            token.leading_trivia().iter().filter(|t| t.is_comment()).collect();
        let mut leading = Vec::new();
        if !comments.is_empty() {
            let sep = std::mem::replace(&mut self.pending, Sep::None).max(Sep::Line);
            self.apply_separator(sep, &mut leading);
            for (i, comment) in comments.into_iter().enumerate() {
                if i > 0 {
                    leading.push(SyntaxTrivia::end_of_line());
                }
                leading.push(comment.clone());
            }
        }
        self.out.push((leading, Vec::new()));
    }

    fn apply_separator(&mut self, sep: Sep, leading: &mut Vec<SyntaxTrivia>) {
        let Some(prev) = self.prev else { return };
        let trailing = &mut self.out[prev].1;
        match sep {
            Sep::None => {}
            Sep::Space => trailing.push(SyntaxTrivia::whitespace(" ")),
            Sep::Line => trailing.push(SyntaxTrivia::end_of_line()),
            Sep::BlankLine => {
                trailing.push(SyntaxTrivia::end_of_line());
                leading.push(SyntaxTrivia::end_of_line());
            }
        }
    }

    fn indent(&self, leading: &mut Vec<SyntaxTrivia>) {
        if self.depth > 0 {
            leading.push(SyntaxTrivia::whitespace("\t".repeat(self.depth)));
        }
    }
}

// ── Layout rules ──────────────────────────────────────────────────────────

/// Block items that sit on consecutive lines; anything else (nested rule
/// sets, triggers, storyboard targets) is set off by a blank line.
fn is_simple_statement(kind: SyntaxKind) -> bool {
    matches!(
        kind,
        Rule | Transition
            | SetTriggerAction
            | PlayStoryboardTriggerAction
            | PlaySfxTriggerAction
            | AnimationKeyframe
            | SkippedTokens
    )
}

/// Separator placed before child `index` of `parent`, which follows `prev`.
fn separator(parent: SyntaxKind, prev: &SyntaxElement, next: &SyntaxElement, index: usize, len: usize) -> Sep {
    match parent {
        Document => Sep::BlankLine,
        SelectorPart | SelectorSubPart | PseudoClass | PropertyName | EventName => Sep::None,
        PropertyValue => source_gap(prev, next),
        PropertyValueWithBraces if index == 1 || index + 1 == len => Sep::Space,
        PropertyValueWithBraces => source_gap(prev, next),
        _ => spaced(prev.kind(), next.kind()),
    }
}

fn spaced(prev: SyntaxKind, next: SyntaxKind) -> Sep {
    match (prev, next) {
        (_, Block) => Sep::Line,
        (_, CommaToken | SemiColonToken | CloseParenthesesToken | ColonToken) => Sep::None,
        (OpenParenthesesToken | ExclamationMarkToken | AtSignToken, _) => Sep::None,
        _ => Sep::Space,
    }
}

/// Keeps a single space wherever the source had any trivia between the two
/// elements, and nothing otherwise.
fn source_gap(prev: &SyntaxElement, next: &SyntaxElement) -> Sep {
    match (prev.last_token(), next.first_token()) {
        (Some(a), Some(b)) if has_trivia_between(a, b) => Sep::Space,
        _ => Sep::None,
    }
}

// ── Rebuild ───────────────────────────────────────────────────────────────

fn rebuild_node(node: &Rc<SyntaxNode>, trivia: &mut std::vec::IntoIter<TokenTrivia>) -> Rc<SyntaxNode> {
    let mut changed = false;
    let children: Vec<SyntaxElement> = node
        .children()
        .iter()
        .map(|child| {
            let rebuilt = rebuild_element(child, trivia);
            changed |= !same_element(&rebuilt, child);
            rebuilt
        })
        .collect();
    if changed {
        Rc::new(SyntaxNode::new(node.kind(), children))
    } else {
        node.clone()
    }
}

fn same_element(a: &SyntaxElement, b: &SyntaxElement) -> bool {
    match (a, b) {
        (SyntaxElement::Node(x), SyntaxElement::Node(y)) => Rc::ptr_eq(x, y),
        (SyntaxElement::Token(x), SyntaxElement::Token(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

fn rebuild_element(element: &SyntaxElement, trivia: &mut std::vec::IntoIter<TokenTrivia>) -> SyntaxElement {
    match element {
        SyntaxElement::Node(n) => SyntaxElement::Node(rebuild_node(n, trivia)),
        SyntaxElement::Token(t) => {
            let (leading, trailing) = trivia.next().unwrap_or_default();
            if t.is_missing() || (t.leading_trivia() == leading.as_slice() && t.trailing_trivia() == trailing.as_slice()) {
                SyntaxElement::Token(t.clone())
            } else {
                SyntaxToken::new(t.kind(), t.text()).with_leading(leading).with_trailing(trailing).into()
            }
        }
    }
}

/// Rewrites `node` with canonical whitespace. Subtrees whose trivia is
/// already canonical are shared with the input.
pub fn normalize_whitespace(node: &Rc<SyntaxNode>) -> Rc<SyntaxNode> {
    let mut normalizer = Normalizer::new();
    normalizer.visit_node(node);
    let mut trivia = normalizer.out.into_iter();
    rebuild_node(node, &mut trivia)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;

    fn normalized(src: &str) -> String {
        let parse = parse_str(src);
        normalize_whitespace(&parse.root).to_full_string()
    }

    #[test]
    fn rule_set_layout() {
        assert_eq!(
            normalized("Button{Width:100;Height : 20 !important;}"),
            "Button\n{\n\tWidth: 100;\n\tHeight: 20 !important;\n}"
        );
    }

    #[test]
    fn items_separated_by_blank_line() {
        assert_eq!(
            normalized("$culture{ru-RU} a{} b{}"),
            "$culture { ru-RU }\n\na\n{\n}\n\nb\n{\n}"
        );
    }

    #[test]
    fn value_spacing_follows_source() {
        assert_eq!(
            normalized("a { Margin:   1  2 3    4; Background: #ff00ff; }"),
            "a\n{\n\tMargin: 1 2 3 4;\n\tBackground: #ff00ff;\n}"
        );
    }

    #[test]
    fn storyboard_layout() {
        assert_eq!(
            normalized("@pulse loop{target Button(#ok){animation Opacity{keyframe 0{0.0}keyframe 500 ease-out-cubic{1.0}}}}"),
            "@pulse loop\n{\n\ttarget Button (#ok)\n\t{\n\t\tanimation Opacity\n\t\t{\n\t\t\tkeyframe 0 { 0.0 }\n\t\t\tkeyframe 500 ease-out-cubic { 1.0 }\n\t\t}\n\t}\n}"
        );
    }

    #[test]
    fn triggers_layout() {
        assert_eq!(
            normalized("a{trigger event Click(handled,set-handled){play-sfx{Click}} Width:1;}"),
            "a\n{\n\ttrigger event Click (handled, set-handled)\n\t{\n\t\tplay-sfx { Click }\n\t}\n\n\tWidth: 1;\n}"
        );
    }

    #[test]
    fn comments_survive() {
        let out = normalized("// header\na { Width: 1; /* w */\n  // h\n  Height: 2; }\n// end");
        assert_eq!(
            out,
            "// header\na\n{\n\tWidth: 1; /* w */\n\t// h\n\tHeight: 2;\n}\n\n// end"
        );
        assert_eq!(normalized(&out), out);
    }

    #[test]
    fn normalization_is_idempotent() {
        let src = "#foo:hover .bar>Button, * | Content as TextBlock { trigger property IsPressed = {true} { set Foreground (.label) { Red } } transition (CommonStates, Pressed): press; Grid.Row: 1; }";
        let once = normalized(src);
        assert_eq!(normalized(&once), once);
    }

    #[test]
    fn canonical_input_is_shared() {
        let parse = parse_str("a\n{\n\tWidth: 1;\n}");
        let out = normalize_whitespace(&parse.root);
        assert!(Rc::ptr_eq(&out, &parse.root));
    }
}
