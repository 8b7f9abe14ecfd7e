use std::rc::Rc;

use crate::error::{Diagnostic, DiagnosticKind};
use crate::kind::SyntaxKind::{self, *};
use crate::lexer::Lexer;
use crate::syntax::{has_trivia_between, LineIndex, SyntaxElement, SyntaxNode, SyntaxToken};

// ── Parse ─────────────────────────────────────────────────────────────────

/// Result of parsing a UVSS document. A tree is always produced; lex and
/// parse errors are recovered and reported in `diagnostics`.
#[derive(Debug, Clone)]
pub struct Parse {
    pub root: Rc<SyntaxNode>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Parse {
    pub fn syntax(&self) -> &Rc<SyntaxNode> {
        &self.root
    }

    /// `true` when neither the lexer nor the parser reported anything.
    pub fn ok(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn to_full_string(&self) -> String {
        self.root.to_full_string()
    }
}

// ── Parser ────────────────────────────────────────────────────────────────

/// Recursive-descent parser, one method per node kind.
///
/// On an unexpected token the parser synthesizes a zero-width missing token
/// of the expected kind and keeps going; tokens that fit no production are
/// wrapped in a `SkippedTokens` node so the tree still reproduces the input.
pub struct Parser {
    tokens: Vec<Rc<SyntaxToken>>,
    /// Offset of each token's text (after its leading trivia).
    starts: Vec<usize>,
    pos: usize,
    lines: LineIndex,
    diagnostics: Vec<Diagnostic>,
}

type ItemParser = fn(&mut Parser) -> Option<SyntaxElement>;

impl Parser {
    pub fn new(tokens: Vec<Rc<SyntaxToken>>, lines: LineIndex) -> Self {
        let mut starts = Vec::with_capacity(tokens.len());
        let mut offset = 0;
        for t in &tokens {
            starts.push(offset + t.leading_width());
            offset += t.full_width();
        }
        Self { tokens, starts, pos: 0, lines, diagnostics: Vec::new() }
    }

    fn peek(&self) -> SyntaxKind {
        self.peek_at(0)
    }

    /// Look at the token `offset` positions ahead of current without consuming.
    fn peek_at(&self, offset: usize) -> SyntaxKind {
        self.tokens.get(self.pos + offset).map(|t| t.kind()).unwrap_or(EndOfFileToken)
    }

    fn current(&self) -> &Rc<SyntaxToken> {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn at_eof(&self) -> bool {
        self.peek() == EndOfFileToken
    }

    /// Whether trivia separates the previous token from the current one.
    fn trivia_before_current(&self) -> bool {
        match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(prev) => has_trivia_between(prev, self.current()),
            None => !self.current().leading_trivia().is_empty(),
        }
    }

    fn bump(&mut self) -> SyntaxElement {
        let tok = self.current().clone();
        if !self.at_eof() {
            self.pos += 1;
        }
        SyntaxElement::Token(tok)
    }

    /// Consume the current token, retagging it as `kind`.
    fn bump_as(&mut self, kind: SyntaxKind) -> SyntaxElement {
        let tok = self.current().clone();
        self.pos += 1;
        if tok.kind() == kind {
            SyntaxElement::Token(tok)
        } else {
            SyntaxToken::with_kind(&tok, kind).into()
        }
    }

    fn eat(&mut self, kind: SyntaxKind) -> Option<SyntaxElement> {
        (self.peek() == kind).then(|| self.bump())
    }

    fn error(&mut self, msg: impl Into<String>) {
        let start = self.starts[self.pos.min(self.starts.len() - 1)];
        let end = start + self.current().width();
        let at = self.lines.line_col(start);
        self.diagnostics.push(Diagnostic::new(DiagnosticKind::Parse, msg, start..end, at));
    }

    fn missing(&mut self, kind: SyntaxKind) -> SyntaxElement {
        let found = self.peek();
        self.error(format!("expected {}, found {}", kind, found));
        SyntaxToken::missing(kind).into()
    }

    fn expect(&mut self, kind: SyntaxKind) -> SyntaxElement {
        if self.peek() == kind {
            self.bump()
        } else {
            self.missing(kind)
        }
    }

    fn at_identifier_like(&self) -> bool {
        let k = self.peek();
        k == IdentifierToken || k.is_keyword()
    }

    /// Identifiers in name position may spell a keyword (`.target`, `set`
    /// as a property name); those are retagged as identifiers.
    fn expect_identifier(&mut self) -> SyntaxElement {
        if self.at_identifier_like() {
            self.bump_as(IdentifierToken)
        } else {
            self.missing(IdentifierToken)
        }
    }

    fn node(kind: SyntaxKind, children: Vec<SyntaxElement>) -> SyntaxElement {
        SyntaxNode::new(kind, children).into()
    }

    // ── Recovery ──────────────────────────────────────────────────────────

    /// Wrap at least one unexpected token in a `SkippedTokens` node. Stops
    /// after a `;`, after a balanced `{ ... }` group, or before a `}` that
    /// closes the enclosing block. Never called at end of file.
    fn skip_tokens(&mut self, inside_block: bool) -> SyntaxElement {
        let found = self.peek();
        self.error(format!("unexpected {}", found));
        let mut children = vec![];
        loop {
            match self.peek() {
                EndOfFileToken => break,
                CloseCurlyBraceToken if inside_block => break,
                SemiColonToken => {
                    children.push(self.bump());
                    break;
                }
                OpenCurlyBraceToken => {
                    self.skip_balanced(&mut children);
                    break;
                }
                _ => children.push(self.bump()),
            }
            if !inside_block && self.starts_document_item() {
                break;
            }
        }
        Self::node(SkippedTokens, children)
    }

    fn skip_balanced(&mut self, children: &mut Vec<SyntaxElement>) {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                EndOfFileToken => return,
                OpenCurlyBraceToken => depth += 1,
                CloseCurlyBraceToken => {
                    depth -= 1;
                    if depth == 0 {
                        children.push(self.bump());
                        return;
                    }
                }
                _ => {}
            }
            children.push(self.bump());
        }
    }

    fn starts_document_item(&self) -> bool {
        matches!(self.peek(), AtSignToken | DirectiveToken) || self.starts_selector()
    }

    fn starts_selector(&self) -> bool {
        matches!(self.peek(), IdentifierToken | AsteriskToken | HashToken | PeriodToken | ColonToken)
    }

    // ── Document ──────────────────────────────────────────────────────────

    pub fn parse_document(&mut self) -> Rc<SyntaxNode> {
        let mut children = Vec::new();
        while !self.at_eof() {
            let before = self.pos;
            let item = match self.peek() {
                AtSignToken => self.parse_storyboard(),
                DirectiveToken => self.parse_directive(),
                _ if self.starts_selector() => self.parse_rule_set(),
                _ => self.skip_tokens(false),
            };
            children.push(item);
            if self.pos == before && !self.at_eof() {
                children.push(self.skip_tokens(false));
            }
        }
        children.push(self.bump());
        Rc::new(SyntaxNode::new(Document, children))
    }

    // ── Directives ────────────────────────────────────────────────────────

    fn parse_directive(&mut self) -> SyntaxElement {
        let is_culture = self.current().text() == "$culture";
        let mut children = vec![self.bump()];
        if is_culture {
            children.push(self.parse_property_value_with_braces());
            Self::node(CultureDirective, children)
        } else {
            if self.peek() == OpenCurlyBraceToken {
                children.push(self.parse_property_value_with_braces());
            }
            Self::node(UnknownDirective, children)
        }
    }

    // ── Rule sets and selectors ───────────────────────────────────────────

    fn parse_rule_set(&mut self) -> SyntaxElement {
        let mut children = vec![self.parse_selector_with_navigation_expression()];
        while self.peek() == CommaToken {
            children.push(self.bump());
            children.push(self.parse_selector_with_navigation_expression());
        }
        children.push(self.parse_block(Self::parse_rule_set_item));
        Self::node(RuleSet, children)
    }

    fn parse_selector_with_navigation_expression(&mut self) -> SyntaxElement {
        let mut children = vec![self.parse_selector()];
        if self.peek() == PipeToken {
            children.push(self.parse_navigation_expression());
        }
        Self::node(SelectorWithNavigationExpression, children)
    }

    fn starts_selector_part(&self) -> bool {
        self.starts_selector() || self.peek().is_keyword()
    }

    fn parse_selector(&mut self) -> SyntaxElement {
        let mut children = vec![self.parse_selector_part()];
        loop {
            if self.peek() == GreaterThanToken {
                children.push(self.bump());
                if self.starts_selector_part() {
                    children.push(self.parse_selector_part());
                } else {
                    children.push(self.missing_selector_part());
                }
            } else if self.starts_selector() && self.trivia_before_current() {
                // Whitespace between parts is the visual-descendant combinator.
                children.push(self.parse_selector_part());
            } else {
                break;
            }
        }
        Self::node(Selector, children)
    }

    fn missing_selector_part(&mut self) -> SyntaxElement {
        let name = self.missing(IdentifierToken);
        Self::node(SelectorPart, vec![Self::node(SelectorSubPart, vec![name])])
    }

    fn parse_selector_part(&mut self) -> SyntaxElement {
        let mut children = Vec::new();
        loop {
            let adjacent = children.is_empty() || !self.trivia_before_current();
            if !adjacent {
                break;
            }
            match self.peek() {
                HashToken | PeriodToken => {
                    let prefix = self.bump();
                    let name = self.expect_identifier();
                    children.push(Self::node(SelectorSubPart, vec![prefix, name]));
                }
                AsteriskToken => children.push(Self::node(SelectorSubPart, vec![self.bump()])),
                IdentifierToken => children.push(Self::node(SelectorSubPart, vec![self.bump()])),
                k if k.is_keyword() && children.is_empty() => {
                    children.push(Self::node(SelectorSubPart, vec![self.bump_as(IdentifierToken)]));
                }
                _ => break,
            }
        }
        if self.peek() == ColonToken && (children.is_empty() || !self.trivia_before_current()) {
            let colon = self.bump();
            let name = self.expect_identifier();
            children.push(Self::node(PseudoClass, vec![colon, name]));
        }
        if children.is_empty() {
            return self.missing_selector_part();
        }
        Self::node(SelectorPart, children)
    }

    fn parse_selector_with_parentheses(&mut self) -> SyntaxElement {
        let open = self.bump();
        let selector = if self.starts_selector_part() {
            self.parse_selector()
        } else {
            Self::node(Selector, vec![self.missing_selector_part()])
        };
        let close = self.expect(CloseParenthesesToken);
        Self::node(SelectorWithParentheses, vec![open, selector, close])
    }

    fn parse_navigation_expression(&mut self) -> SyntaxElement {
        let mut children = vec![self.bump(), self.parse_property_name(PropertyName)];
        if self.peek() == AsKeyword {
            children.push(self.bump());
            children.push(self.expect_identifier());
        }
        Self::node(NavigationExpression, children)
    }

    // ── Blocks ────────────────────────────────────────────────────────────

    fn parse_block(&mut self, item: ItemParser) -> SyntaxElement {
        let mut children = vec![self.expect(OpenCurlyBraceToken)];
        loop {
            match self.peek() {
                CloseCurlyBraceToken | EndOfFileToken => break,
                _ => {}
            }
            let before = self.pos;
            if let Some(el) = item(self) {
                children.push(el);
            }
            if self.pos == before {
                if matches!(self.peek(), CloseCurlyBraceToken | EndOfFileToken) {
                    break;
                }
                children.push(self.skip_tokens(true));
            }
        }
        children.push(self.expect(CloseCurlyBraceToken));
        Self::node(Block, children)
    }

    /// Rules, triggers, transitions, and nested rule sets.
    fn parse_rule_set_item(&mut self) -> Option<SyntaxElement> {
        match self.peek() {
            TriggerKeyword => Some(self.parse_trigger()),
            TransitionKeyword => Some(self.parse_transition()),
            _ if self.starts_selector_part() => {
                if self.rule_ahead() {
                    Some(self.parse_rule())
                } else {
                    Some(self.parse_rule_set())
                }
            }
            _ => None,
        }
    }

    /// A rule ends at `;` or `}` before any `{` opens a block.
    fn rule_ahead(&self) -> bool {
        let mut i = 0;
        loop {
            match self.peek_at(i) {
                OpenCurlyBraceToken => return false,
                SemiColonToken | CloseCurlyBraceToken | EndOfFileToken => return true,
                _ => i += 1,
            }
        }
    }

    // ── Rules ─────────────────────────────────────────────────────────────

    fn parse_property_name(&mut self, kind: SyntaxKind) -> SyntaxElement {
        let mut children = vec![self.expect_identifier()];
        if self.peek() == PeriodToken {
            children.push(self.bump());
            children.push(self.expect_identifier());
        }
        Self::node(kind, children)
    }

    fn at_important(&self) -> bool {
        self.peek() == ExclamationMarkToken && self.peek_at(1) == ImportantKeyword
    }

    fn parse_important(&mut self, children: &mut Vec<SyntaxElement>) {
        if self.at_important() {
            children.push(self.bump());
            children.push(self.bump());
        }
    }

    fn parse_rule(&mut self) -> SyntaxElement {
        let mut children = vec![self.parse_property_name(PropertyName), self.expect(ColonToken)];
        children.push(self.parse_property_value());
        self.parse_important(&mut children);
        children.push(self.expect(SemiColonToken));
        Self::node(Rule, children)
    }

    /// Raw value tokens up to `;`, `}`, `{`, or `!important`.
    fn parse_property_value(&mut self) -> SyntaxElement {
        let mut children = Vec::new();
        loop {
            match self.peek() {
                SemiColonToken | CloseCurlyBraceToken | OpenCurlyBraceToken | EndOfFileToken => break,
                _ if self.at_important() => break,
                _ => children.push(self.bump()),
            }
        }
        if children.is_empty() {
            children.push(self.missing(IdentifierToken));
        }
        Self::node(PropertyValue, children)
    }

    /// `{ raw tokens }` with nested braces balanced.
    fn parse_property_value_with_braces(&mut self) -> SyntaxElement {
        let mut children = vec![self.expect(OpenCurlyBraceToken)];
        let mut depth = 0usize;
        loop {
            match self.peek() {
                EndOfFileToken => break,
                CloseCurlyBraceToken if depth == 0 => break,
                CloseCurlyBraceToken => depth -= 1,
                OpenCurlyBraceToken => depth += 1,
                _ => {}
            }
            children.push(self.bump());
        }
        children.push(self.expect(CloseCurlyBraceToken));
        Self::node(PropertyValueWithBraces, children)
    }

    // ── Triggers ──────────────────────────────────────────────────────────

    fn parse_trigger(&mut self) -> SyntaxElement {
        let trigger = self.bump();
        match self.peek() {
            EventKeyword => self.parse_event_trigger(trigger),
            PropertyKeyword => self.parse_property_trigger(trigger, None),
            _ => {
                let keyword = self.missing(PropertyKeyword);
                self.parse_property_trigger(trigger, Some(keyword))
            }
        }
    }

    fn parse_property_trigger(
        &mut self,
        trigger: SyntaxElement,
        missing_keyword: Option<SyntaxElement>,
    ) -> SyntaxElement {
        let keyword = missing_keyword.unwrap_or_else(|| self.bump());
        let mut children = vec![trigger, keyword, self.parse_property_trigger_condition()];
        while self.peek() == CommaToken {
            children.push(self.bump());
            children.push(self.parse_property_trigger_condition());
        }
        self.parse_important(&mut children);
        children.push(self.parse_block(Self::parse_trigger_action));
        Self::node(PropertyTrigger, children)
    }

    fn parse_property_trigger_condition(&mut self) -> SyntaxElement {
        let name = self.parse_property_name(PropertyName);
        let op = if self.peek().is_comparison_operator() {
            self.bump()
        } else {
            self.missing(EqualsToken)
        };
        let value = self.parse_property_value_with_braces();
        Self::node(PropertyTriggerCondition, vec![name, op, value])
    }

    fn parse_event_trigger(&mut self, trigger: SyntaxElement) -> SyntaxElement {
        let mut children = vec![trigger, self.bump(), self.parse_property_name(EventName)];
        if self.peek() == OpenParenthesesToken {
            children.push(self.parse_event_trigger_argument_list());
        }
        self.parse_important(&mut children);
        children.push(self.parse_block(Self::parse_trigger_action));
        Self::node(EventTrigger, children)
    }

    fn parse_event_trigger_argument_list(&mut self) -> SyntaxElement {
        let mut children = vec![self.bump()];
        loop {
            match self.peek() {
                HandledKeyword | SetHandledKeyword => children.push(self.bump()),
                _ => children.push(self.missing(HandledKeyword)),
            }
            if self.peek() == CommaToken {
                children.push(self.bump());
            } else {
                break;
            }
        }
        children.push(self.expect(CloseParenthesesToken));
        Self::node(EventTriggerArgumentList, children)
    }

    fn parse_trigger_action(&mut self) -> Option<SyntaxElement> {
        let action = match self.peek() {
            PlayStoryboardKeyword => {
                let mut children = vec![self.bump()];
                if self.peek() == OpenParenthesesToken {
                    children.push(self.parse_selector_with_parentheses());
                }
                children.push(self.parse_property_value_with_braces());
                Self::node(PlayStoryboardTriggerAction, children)
            }
            PlaySfxKeyword => {
                let keyword = self.bump();
                let value = self.parse_property_value_with_braces();
                Self::node(PlaySfxTriggerAction, vec![keyword, value])
            }
            SetKeyword => {
                let mut children = vec![self.bump(), self.parse_property_name(PropertyName)];
                if self.peek() == OpenParenthesesToken {
                    children.push(self.parse_selector_with_parentheses());
                }
                children.push(self.parse_property_value_with_braces());
                Self::node(SetTriggerAction, children)
            }
            _ => return None,
        };
        Some(action)
    }

    // ── Transitions ───────────────────────────────────────────────────────

    fn parse_transition(&mut self) -> SyntaxElement {
        let mut children = vec![self.bump(), self.parse_transition_argument_list()];
        self.parse_important(&mut children);
        children.push(self.expect(ColonToken));
        children.push(self.parse_property_value());
        children.push(self.expect(SemiColonToken));
        Self::node(Transition, children)
    }

    fn parse_transition_argument_list(&mut self) -> SyntaxElement {
        let mut children = vec![self.expect(OpenParenthesesToken), self.expect_identifier()];
        for _ in 0..2 {
            if self.peek() != CommaToken {
                break;
            }
            children.push(self.bump());
            children.push(self.expect_identifier());
        }
        if children.len() < 4 {
            children.push(self.missing(CommaToken));
            children.push(SyntaxToken::missing(IdentifierToken).into());
        }
        children.push(self.expect(CloseParenthesesToken));
        Self::node(TransitionArgumentList, children)
    }

    // ── Storyboards ───────────────────────────────────────────────────────

    fn parse_storyboard(&mut self) -> SyntaxElement {
        let mut children = vec![self.bump(), self.expect_identifier()];
        if self.peek() == IdentifierToken {
            children.push(self.bump());
        }
        children.push(self.parse_block(Self::parse_storyboard_target));
        Self::node(Storyboard, children)
    }

    fn parse_storyboard_target(&mut self) -> Option<SyntaxElement> {
        if self.peek() != TargetKeyword {
            return None;
        }
        let mut children = vec![self.bump()];
        if self.peek() == IdentifierToken {
            children.push(self.bump());
        }
        if self.peek() == OpenParenthesesToken {
            children.push(self.parse_selector_with_parentheses());
        }
        children.push(self.parse_block(Self::parse_animation));
        Some(Self::node(StoryboardTarget, children))
    }

    fn parse_animation(&mut self) -> Option<SyntaxElement> {
        if self.peek() != AnimationKeyword {
            return None;
        }
        let mut children = vec![self.bump(), self.parse_property_name(PropertyName)];
        if self.peek() == PipeToken {
            children.push(self.parse_navigation_expression());
        }
        children.push(self.parse_block(Self::parse_animation_keyframe));
        Some(Self::node(Animation, children))
    }

    fn parse_animation_keyframe(&mut self) -> Option<SyntaxElement> {
        if self.peek() != KeyframeKeyword {
            return None;
        }
        let mut children = vec![self.bump(), self.expect(NumberToken)];
        if self.peek() == IdentifierToken {
            children.push(self.bump());
        }
        children.push(self.parse_property_value_with_braces());
        Some(Self::node(AnimationKeyframe, children))
    }
}

// ── Public parse entry point ──────────────────────────────────────────────

/// Parse a `.uvss` source string. Never fails: the returned tree always
/// reproduces `src` exactly through [`SyntaxNode::to_full_string`].
pub fn parse_str(src: &str) -> Parse {
    let lexed = Lexer::new(src).tokenize();
    let mut parser = Parser::new(lexed.tokens, LineIndex::new(src));
    let root = parser.parse_document();
    let mut diagnostics = lexed.diagnostics;
    diagnostics.extend(parser.diagnostics);
    diagnostics.sort_by_key(|d| d.span.start);
    Parse { root, diagnostics }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_of(node: &SyntaxNode) -> Vec<SyntaxKind> {
        node.children().iter().map(|c| c.kind()).collect()
    }

    fn first_item(src: &str) -> Rc<SyntaxNode> {
        let parse = parse_str(src);
        assert!(parse.ok(), "unexpected diagnostics: {:?}", parse.diagnostics);
        parse.root.child_nodes().next().cloned().unwrap()
    }

    #[test]
    fn rule_set_shape() {
        let rs = first_item("#foo:hover .bar > Button, * { Width: 100 !important; }");
        assert_eq!(
            kinds_of(&rs),
            vec![SelectorWithNavigationExpression, CommaToken, SelectorWithNavigationExpression, Block]
        );
        let sel = rs.child_node(SelectorWithNavigationExpression).unwrap().child_node(Selector).unwrap();
        assert_eq!(kinds_of(sel), vec![SelectorPart, SelectorPart, GreaterThanToken, SelectorPart]);
        let block = rs.child_node(Block).unwrap();
        let rule = block.child_node(Rule).unwrap();
        assert_eq!(
            kinds_of(rule),
            vec![PropertyName, ColonToken, PropertyValue, ExclamationMarkToken, ImportantKeyword, SemiColonToken]
        );
    }

    #[test]
    fn compound_selector_part() {
        let rs = first_item(".bar.baz:pressed { }");
        let part = rs.child_node(SelectorWithNavigationExpression).unwrap()
            .child_node(Selector).unwrap()
            .child_node(SelectorPart).unwrap();
        assert_eq!(kinds_of(part), vec![SelectorSubPart, SelectorSubPart, PseudoClass]);
    }

    #[test]
    fn navigation_expression() {
        let rs = first_item("ListBox | ItemContainer.Content as Button { }");
        let nav = rs.child_node(SelectorWithNavigationExpression).unwrap()
            .child_node(NavigationExpression).unwrap();
        assert_eq!(kinds_of(nav), vec![PipeToken, PropertyName, AsKeyword, IdentifierToken]);
    }

    #[test]
    fn nested_rule_set_vs_rule() {
        let rs = first_item("Grid { Button { Width: 1; } Grid.Row: 2; }");
        let block = rs.child_node(Block).unwrap();
        let items: Vec<SyntaxKind> = block.child_nodes().map(|n| n.kind()).collect();
        assert_eq!(items, vec![RuleSet, Rule]);
    }

    #[test]
    fn triggers_and_actions() {
        let rs = first_item(
            "Button {\n\
               trigger property IsMouseOver = { true }, Width >= { 10 } !important {\n\
                 set Background (#inner) { #ff0000ff }\n\
               }\n\
               trigger event Click (handled, set-handled) {\n\
                 play-storyboard (.x) { Pulse }\n\
                 play-sfx { Click }\n\
               }\n\
             }",
        );
        let block = rs.child_node(Block).unwrap();
        let triggers: Vec<&Rc<SyntaxNode>> = block.child_nodes().collect();
        assert_eq!(triggers[0].kind(), PropertyTrigger);
        assert_eq!(
            kinds_of(triggers[0]),
            vec![
                TriggerKeyword, PropertyKeyword, PropertyTriggerCondition, CommaToken,
                PropertyTriggerCondition, ExclamationMarkToken, ImportantKeyword, Block,
            ]
        );
        assert_eq!(triggers[1].kind(), EventTrigger);
        let args = triggers[1].child_node(EventTriggerArgumentList).unwrap();
        assert_eq!(
            kinds_of(args),
            vec![OpenParenthesesToken, HandledKeyword, CommaToken, SetHandledKeyword, CloseParenthesesToken]
        );
        let actions: Vec<SyntaxKind> = triggers[1].child_node(Block).unwrap().child_nodes().map(|n| n.kind()).collect();
        assert_eq!(actions, vec![PlayStoryboardTriggerAction, PlaySfxTriggerAction]);
    }

    #[test]
    fn transition() {
        let rs = first_item("Button { transition (CommonStates, Pressed, Normal): PressAnim; }");
        let t = rs.child_node(Block).unwrap().child_node(Transition).unwrap();
        let args = t.child_node(TransitionArgumentList).unwrap();
        assert_eq!(args.child_tokens().filter(|t| t.kind() == IdentifierToken).count(), 3);
    }

    #[test]
    fn storyboard_shape() {
        let sb = first_item("@pulse loop { target Button (#ok) { animation Opacity { keyframe 0 ease-in-linear { 0.0 } keyframe 500 { 1.0 } } } }");
        assert_eq!(kinds_of(&sb), vec![AtSignToken, IdentifierToken, IdentifierToken, Block]);
        let target = sb.child_node(Block).unwrap().child_node(StoryboardTarget).unwrap();
        assert_eq!(kinds_of(target), vec![TargetKeyword, IdentifierToken, SelectorWithParentheses, Block]);
        let anim = target.child_node(Block).unwrap().child_node(Animation).unwrap();
        let frames: Vec<&Rc<SyntaxNode>> = anim.child_node(Block).unwrap().child_nodes().collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(kinds_of(frames[0]), vec![KeyframeKeyword, NumberToken, IdentifierToken, PropertyValueWithBraces]);
    }

    #[test]
    fn culture_directive() {
        let parse = parse_str("$culture { ru-RU }\r\n@foo { target { animation Width { keyframe 0 { 100.0 } } } }");
        assert!(parse.ok());
        let items: Vec<SyntaxKind> = parse.root.child_nodes().map(|n| n.kind()).collect();
        assert_eq!(items, vec![CultureDirective, Storyboard]);
    }

    #[test]
    fn missing_tokens_are_synthesized() {
        let parse = parse_str("Button { Width: 100 }");
        assert_eq!(parse.diagnostics.len(), 1);
        assert!(parse.diagnostics[0].message.contains("expected ;"));
        let rule = parse.root.child_nodes().next().unwrap().child_node(Block).unwrap().child_node(Rule).unwrap();
        assert!(rule.child_token(SemiColonToken).unwrap().is_missing());
        assert_eq!(parse.to_full_string(), "Button { Width: 100 }");
    }

    #[test]
    fn unclosed_block_recovers() {
        let src = "Button { Width: 1;";
        let parse = parse_str(src);
        assert!(!parse.ok());
        assert_eq!(parse.to_full_string(), src);
    }

    #[test]
    fn garbage_is_skipped_not_dropped() {
        let src = "} ) ; Button { ^^ ; Width: 1; } 42";
        let parse = parse_str(src);
        assert!(!parse.ok());
        assert_eq!(parse.to_full_string(), src);
        assert!(parse.root.child_nodes().any(|n| n.kind() == RuleSet));
    }

    #[test]
    fn keyword_in_class_position() {
        let rs = first_item(".target { }");
        let sub = rs.child_node(SelectorWithNavigationExpression).unwrap()
            .child_node(Selector).unwrap()
            .child_node(SelectorPart).unwrap()
            .child_node(SelectorSubPart).unwrap();
        assert_eq!(kinds_of(sub), vec![PeriodToken, IdentifierToken]);
    }
}
