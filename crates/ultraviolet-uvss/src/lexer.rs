use std::rc::Rc;

use crate::error::{Diagnostic, DiagnosticKind};
use crate::kind::SyntaxKind;
use crate::syntax::{LineIndex, SyntaxToken, SyntaxTrivia};

// ── Lexed ─────────────────────────────────────────────────────────────────

/// Output of [`Lexer::tokenize`]: every token (the last one is always
/// `EndOfFileToken`) plus any recovered lex errors.
#[derive(Debug, Clone)]
pub struct Lexed {
    pub tokens: Vec<Rc<SyntaxToken>>,
    pub diagnostics: Vec<Diagnostic>,
}

// ── Lexer ─────────────────────────────────────────────────────────────────

/// Classifies every character span of a UVSS source as exactly one token or
/// trivia. Trivia on the same line after a token (up to and including the
/// first line break) is that token's trailing trivia; everything else is the
/// next token's leading trivia.
pub struct Lexer<'s> {
    src: &'s str,
    pos: usize,
    lines: LineIndex,
    diagnostics: Vec<Diagnostic>,
}

impl<'s> Lexer<'s> {
    pub fn new(src: &'s str) -> Self {
        Self { src, pos: 0, lines: LineIndex::new(src), diagnostics: Vec::new() }
    }

    pub fn tokenize(mut self) -> Lexed {
        let mut tokens = Vec::new();
        loop {
            let leading = self.lex_trivia(false);
            let (kind, text) = self.next_token();
            let eof = kind == SyntaxKind::EndOfFileToken;
            let trailing = if eof { Vec::new() } else { self.lex_trivia(true) };
            tokens.push(Rc::new(
                SyntaxToken::new(kind, text).with_leading(leading).with_trailing(trailing),
            ));
            if eof {
                break;
            }
        }
        Lexed { tokens, diagnostics: self.diagnostics }
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn error(&mut self, msg: impl Into<String>, start: usize) {
        let at = self.lines.line_col(start);
        self.diagnostics.push(Diagnostic::new(DiagnosticKind::Lex, msg, start..self.pos, at));
    }

    // ── Trivia ────────────────────────────────────────────────────────────

    fn lex_trivia(&mut self, trailing: bool) -> Vec<SyntaxTrivia> {
        let mut trivia = Vec::new();
        loop {
            let start = self.pos;
            match self.peek() {
                Some('\r') | Some('\n') => {
                    if self.advance() == Some('\r') && self.peek() == Some('\n') {
                        self.advance();
                    }
                    trivia.push(SyntaxTrivia::new(
                        SyntaxKind::EndOfLineTrivia,
                        &self.src[start..self.pos],
                    ));
                    if trailing {
                        break;
                    }
                }
                Some(c) if c.is_whitespace() => {
                    while matches!(self.peek(), Some(c) if c.is_whitespace() && c != '\r' && c != '\n') {
                        self.advance();
                    }
                    trivia.push(SyntaxTrivia::whitespace(&self.src[start..self.pos]));
                }
                Some('/') if self.peek_nth(1) == Some('/') => {
                    while !matches!(self.peek(), None | Some('\r') | Some('\n')) {
                        self.advance();
                    }
                    trivia.push(SyntaxTrivia::new(
                        SyntaxKind::SingleLineCommentTrivia,
                        &self.src[start..self.pos],
                    ));
                }
                Some('/') if self.peek_nth(1) == Some('*') => {
                    self.advance();
                    self.advance();
                    let mut terminated = false;
                    while self.pos < self.src.len() {
                        if self.rest().starts_with("*/") {
                            self.advance();
                            self.advance();
                            terminated = true;
                            break;
                        }
                        self.advance();
                    }
                    if !terminated {
                        self.error("unterminated block comment", start);
                    }
                    trivia.push(SyntaxTrivia::new(
                        SyntaxKind::MultiLineCommentTrivia,
                        &self.src[start..self.pos],
                    ));
                }
                _ => break,
            }
        }
        trivia
    }

    // ── Tokens ────────────────────────────────────────────────────────────

    fn next_token(&mut self) -> (SyntaxKind, &'s str) {
        use SyntaxKind::*;

        let start = self.pos;
        let ch = match self.advance() {
            None => return (EndOfFileToken, ""),
            Some(c) => c,
        };

        let kind = match ch {
            '#' => HashToken,
            '.' => PeriodToken,
            ':' => ColonToken,
            ';' => SemiColonToken,
            ',' => CommaToken,
            '{' => OpenCurlyBraceToken,
            '}' => CloseCurlyBraceToken,
            '(' => OpenParenthesesToken,
            ')' => CloseParenthesesToken,
            '|' => PipeToken,
            '*' => AsteriskToken,
            '@' => AtSignToken,
            '!' => ExclamationMarkToken,
            '=' => EqualsToken,
            '<' => match self.peek() {
                Some('>') => { self.advance(); NotEqualsToken }
                Some('=') => { self.advance(); LessThanEqualsToken }
                _ => LessThanToken,
            },
            '>' => match self.peek() {
                Some('=') => { self.advance(); GreaterThanEqualsToken }
                _ => GreaterThanToken,
            },
            '"' | '\'' => self.lex_string(ch, start),
            '$' => self.lex_directive(start),
            c if c.is_ascii_digit() => self.lex_number(),
            '-' if matches!(self.peek(), Some(c) if c.is_ascii_digit()) => self.lex_number(),
            c if c.is_alphabetic() || c == '_' => self.lex_ident_or_keyword(start),
            other => {
                self.error(format!("unexpected character {:?}", other), start);
                ErrorToken
            }
        };
        (kind, &self.src[start..self.pos])
    }

    fn lex_string(&mut self, quote: char, start: usize) -> SyntaxKind {
        loop {
            match self.peek() {
                None | Some('\r') | Some('\n') => {
                    self.error("unterminated string literal", start);
                    break;
                }
                Some('\\') => {
                    self.advance();
                    if !matches!(self.peek(), None | Some('\r') | Some('\n')) {
                        self.advance();
                    }
                }
                Some(c) => {
                    self.advance();
                    if c == quote {
                        break;
                    }
                }
            }
        }
        SyntaxKind::StringToken
    }

    fn lex_directive(&mut self, start: usize) -> SyntaxKind {
        let name_start = self.pos;
        self.eat_identifier_chars();
        if self.pos == name_start {
            self.error("expected a directive name after '$'", start);
            return SyntaxKind::ErrorToken;
        }
        SyntaxKind::DirectiveToken
    }

    fn lex_number(&mut self) -> SyntaxKind {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') && matches!(self.peek_nth(1), Some(c) if c.is_ascii_digit()) {
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        SyntaxKind::NumberToken
    }

    fn eat_identifier_chars(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_' || c == '-') {
            self.advance();
        }
    }

    fn lex_ident_or_keyword(&mut self, start: usize) -> SyntaxKind {
        self.eat_identifier_chars();
        let word = &self.src[start..self.pos];
        SyntaxKind::keyword(word).unwrap_or(SyntaxKind::IdentifierToken)
    }
}

/// Convenience wrapper around [`Lexer::tokenize`].
pub fn lex(src: &str) -> Lexed {
    Lexer::new(src).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use SyntaxKind::*;

    fn kinds(src: &str) -> Vec<SyntaxKind> {
        lex(src).tokens.iter().map(|t| t.kind()).collect()
    }

    fn rejoin(lexed: &Lexed) -> String {
        lexed.tokens.iter().map(|t| t.to_full_string()).collect()
    }

    #[test]
    fn punctuation_and_operators() {
        assert_eq!(
            kinds("< <> <= > >= = | * @ !"),
            vec![
                LessThanToken, NotEqualsToken, LessThanEqualsToken, GreaterThanToken,
                GreaterThanEqualsToken, EqualsToken, PipeToken, AsteriskToken, AtSignToken,
                ExclamationMarkToken, EndOfFileToken,
            ]
        );
    }

    #[test]
    fn keywords_are_looked_up_after_identifier_scan() {
        assert_eq!(
            kinds("play-storyboard play-sfx set-handled set targets"),
            vec![PlayStoryboardKeyword, PlaySfxKeyword, SetHandledKeyword, SetKeyword, IdentifierToken, EndOfFileToken]
        );
    }

    #[test]
    fn numbers_and_culture_names() {
        let lexed = lex("100.0 -5 ru-RU 1.");
        let texts: Vec<&str> = lexed.tokens.iter().map(|t| t.text()).collect();
        assert_eq!(texts, vec!["100.0", "-5", "ru-RU", "1", ".", ""]);
        assert_eq!(lexed.tokens[2].kind(), IdentifierToken);
    }

    #[test]
    fn directive_token() {
        let lexed = lex("$culture { ru-RU }");
        assert_eq!(lexed.tokens[0].kind(), DirectiveToken);
        assert_eq!(lexed.tokens[0].text(), "$culture");
    }

    #[test]
    fn trailing_trivia_stops_after_line_break() {
        let lexed = lex("a /* c */ // tail\n  b");
        let a = &lexed.tokens[0];
        let trailing: Vec<SyntaxKind> = a.trailing_trivia().iter().map(|t| t.kind()).collect();
        assert_eq!(
            trailing,
            vec![WhitespaceTrivia, MultiLineCommentTrivia, WhitespaceTrivia, SingleLineCommentTrivia, EndOfLineTrivia]
        );
        let b = &lexed.tokens[1];
        assert_eq!(b.leading_trivia().len(), 1);
        assert_eq!(b.leading_trivia()[0].text(), "  ");
    }

    #[test]
    fn crlf_is_a_single_trivia() {
        let lexed = lex("a\r\nb");
        assert_eq!(lexed.tokens[0].trailing_trivia()[0].text(), "\r\n");
    }

    #[test]
    fn unknown_characters_become_error_tokens() {
        let lexed = lex("a ^ b");
        assert_eq!(lexed.tokens[1].kind(), ErrorToken);
        assert_eq!(lexed.diagnostics.len(), 1);
        assert_eq!(lexed.diagnostics[0].kind, DiagnosticKind::Lex);
        assert_eq!(rejoin(&lexed), "a ^ b");
    }

    #[test]
    fn unterminated_literals_are_recovered() {
        let lexed = lex("\"oops\nnext /* open");
        assert_eq!(lexed.tokens[0].kind(), StringToken);
        assert_eq!(lexed.tokens[0].text(), "\"oops");
        assert_eq!(lexed.diagnostics.len(), 2);
        assert_eq!(rejoin(&lexed), "\"oops\nnext /* open");
    }

    #[test]
    fn string_escapes() {
        let lexed = lex(r#""say \"hi\"" 'x'"#);
        assert_eq!(lexed.tokens[0].text(), r#""say \"hi\"""#);
        assert_eq!(lexed.tokens[1].text(), "'x'");
        assert!(lexed.diagnostics.is_empty());
    }
}
