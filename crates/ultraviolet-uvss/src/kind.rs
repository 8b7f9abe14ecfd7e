use std::fmt;

// ── SyntaxKind ────────────────────────────────────────────────────────────

/// Tag carried by every trivia span, token, and composite node in a UVSS tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SyntaxKind {
    // Trivia
    WhitespaceTrivia,
    EndOfLineTrivia,
    SingleLineCommentTrivia,
    MultiLineCommentTrivia,

    // Literal tokens
    IdentifierToken,
    NumberToken,
    StringToken,
    /// `$name`, e.g. `$culture`.
    DirectiveToken,
    /// A character the lexer could not classify.
    ErrorToken,
    EndOfFileToken,

    // Punctuation
    HashToken,
    PeriodToken,
    ColonToken,
    SemiColonToken,
    CommaToken,
    OpenCurlyBraceToken,
    CloseCurlyBraceToken,
    OpenParenthesesToken,
    CloseParenthesesToken,
    PipeToken,
    AsteriskToken,
    AtSignToken,
    ExclamationMarkToken,
    GreaterThanToken,
    LessThanToken,
    EqualsToken,
    NotEqualsToken,
    GreaterThanEqualsToken,
    LessThanEqualsToken,

    // Keywords
    AnimationKeyword,
    AsKeyword,
    EventKeyword,
    HandledKeyword,
    ImportantKeyword,
    KeyframeKeyword,
    PlaySfxKeyword,
    PlayStoryboardKeyword,
    PropertyKeyword,
    SetHandledKeyword,
    SetKeyword,
    TargetKeyword,
    TransitionKeyword,
    TriggerKeyword,

    // Nodes
    Document,
    RuleSet,
    SelectorWithNavigationExpression,
    Selector,
    SelectorPart,
    SelectorSubPart,
    PseudoClass,
    SelectorWithParentheses,
    NavigationExpression,
    Block,
    Rule,
    PropertyName,
    EventName,
    PropertyValue,
    PropertyValueWithBraces,
    PropertyTrigger,
    PropertyTriggerCondition,
    EventTrigger,
    EventTriggerArgumentList,
    PlayStoryboardTriggerAction,
    PlaySfxTriggerAction,
    SetTriggerAction,
    Transition,
    TransitionArgumentList,
    Storyboard,
    StoryboardTarget,
    Animation,
    AnimationKeyframe,
    CultureDirective,
    UnknownDirective,
    /// Tokens the parser could not fit into any production.
    SkippedTokens,
}

use SyntaxKind::*;

const KEYWORDS: &[(&str, SyntaxKind)] = &[
    ("animation", AnimationKeyword),
    ("as", AsKeyword),
    ("event", EventKeyword),
    ("handled", HandledKeyword),
    ("important", ImportantKeyword),
    ("keyframe", KeyframeKeyword),
    ("play-sfx", PlaySfxKeyword),
    ("play-storyboard", PlayStoryboardKeyword),
    ("property", PropertyKeyword),
    ("set-handled", SetHandledKeyword),
    ("set", SetKeyword),
    ("target", TargetKeyword),
    ("transition", TransitionKeyword),
    ("trigger", TriggerKeyword),
];

impl SyntaxKind {
    /// Keyword lookup performed after an identifier has been scanned.
    pub fn keyword(text: &str) -> Option<SyntaxKind> {
        KEYWORDS.iter().find(|(k, _)| *k == text).map(|(_, kind)| *kind)
    }

    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            WhitespaceTrivia | EndOfLineTrivia | SingleLineCommentTrivia | MultiLineCommentTrivia
        )
    }

    pub fn is_keyword(self) -> bool {
        (AnimationKeyword as u16..=TriggerKeyword as u16).contains(&(self as u16))
    }

    pub fn is_token(self) -> bool {
        (IdentifierToken as u16..=TriggerKeyword as u16).contains(&(self as u16))
    }

    pub fn is_node(self) -> bool {
        self as u16 >= Document as u16
    }

    pub fn is_comparison_operator(self) -> bool {
        matches!(
            self,
            EqualsToken
                | NotEqualsToken
                | LessThanToken
                | GreaterThanToken
                | LessThanEqualsToken
                | GreaterThanEqualsToken
        )
    }

    /// The fixed source text of punctuation and keyword tokens.
    pub fn fixed_text(self) -> Option<&'static str> {
        let text = match self {
            HashToken => "#",
            PeriodToken => ".",
            ColonToken => ":",
            SemiColonToken => ";",
            CommaToken => ",",
            OpenCurlyBraceToken => "{",
            CloseCurlyBraceToken => "}",
            OpenParenthesesToken => "(",
            CloseParenthesesToken => ")",
            PipeToken => "|",
            AsteriskToken => "*",
            AtSignToken => "@",
            ExclamationMarkToken => "!",
            GreaterThanToken => ">",
            LessThanToken => "<",
            EqualsToken => "=",
            NotEqualsToken => "<>",
            GreaterThanEqualsToken => ">=",
            LessThanEqualsToken => "<=",
            kw if kw.is_keyword() => {
                return KEYWORDS.iter().find(|(_, k)| *k == kw).map(|(t, _)| *t);
            }
            _ => return None,
        };
        Some(text)
    }

    /// Human-readable name used in diagnostics.
    pub fn display_name(self) -> &'static str {
        if let Some(text) = self.fixed_text() {
            return text;
        }
        match self {
            IdentifierToken => "identifier",
            NumberToken => "number",
            StringToken => "string",
            DirectiveToken => "directive",
            ErrorToken => "unrecognized character",
            EndOfFileToken => "end of file",
            WhitespaceTrivia | EndOfLineTrivia => "whitespace",
            SingleLineCommentTrivia | MultiLineCommentTrivia => "comment",
            _ => "node",
        }
    }
}

impl fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup_requires_exact_match() {
        assert_eq!(SyntaxKind::keyword("play-storyboard"), Some(PlayStoryboardKeyword));
        assert_eq!(SyntaxKind::keyword("set"), Some(SetKeyword));
        assert_eq!(SyntaxKind::keyword("set-handled"), Some(SetHandledKeyword));
        assert_eq!(SyntaxKind::keyword("Set"), None);
        assert_eq!(SyntaxKind::keyword("targets"), None);
    }

    #[test]
    fn classification_ranges() {
        assert!(WhitespaceTrivia.is_trivia());
        assert!(!WhitespaceTrivia.is_token());
        assert!(IdentifierToken.is_token());
        assert!(TriggerKeyword.is_token());
        assert!(TriggerKeyword.is_keyword());
        assert!(!IdentifierToken.is_keyword());
        assert!(Document.is_node());
        assert!(SkippedTokens.is_node());
        assert!(!EndOfFileToken.is_node());
    }

    #[test]
    fn fixed_text_covers_keywords_and_punctuation() {
        assert_eq!(NotEqualsToken.fixed_text(), Some("<>"));
        assert_eq!(AnimationKeyword.fixed_text(), Some("animation"));
        assert_eq!(IdentifierToken.fixed_text(), None);
    }
}
