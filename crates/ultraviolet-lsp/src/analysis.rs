//! Heuristic source analysis for completion and hover.
//!
//! The parser is not consulted here: the document is usually incomplete at
//! the cursor. Brace counting over the text before the cursor is enough to
//! tell which rule set (and so which element type) a position belongs to.

use tower_lsp::lsp_types::Position;

// ── Context kind ──────────────────────────────────────────────────────────────

/// What the cursor is positioned inside, used to drive completions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Context {
    /// Document scope: a selector, storyboard, or directive is expected.
    Selector,
    /// Start of a statement inside a rule set styling `ty`.
    Property { ty: Option<String> },
    /// After the `:` of a `Property: value;` rule.
    Value { ty: Option<String>, prop: String },
    /// After a keyframe's time: `keyframe 100 |`.
    Easing,
    Unknown,
}

/// The rule set enclosing a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSetScope {
    /// Element type named by the selector's last compound, when it names one.
    pub ty: Option<String>,
}

// ── word_at ───────────────────────────────────────────────────────────────────

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '$')
}

/// The identifier (keywords such as `play-sfx` and `$culture` included) that
/// contains or immediately precedes the cursor column.
pub fn word_at<'t>(text: &'t str, pos: &Position) -> Option<&'t str> {
    let line = text.lines().nth(pos.line as usize)?;
    let col = floor_boundary(line, pos.character as usize);

    let start = line[..col].rfind(|c: char| !is_word_char(c)).map(|i| i + 1).unwrap_or(0);
    let end = col + line[col..].find(|c: char| !is_word_char(c)).unwrap_or(line.len() - col);

    (start < end).then(|| &line[start..end])
}

// ── enclosing_rule_set ────────────────────────────────────────────────────────

/// Walks outward from the end of `before` (text up to the cursor) through
/// unclosed blocks until one is opened by a selector. Trigger, action, and
/// value blocks are passed through; a storyboard block ends the search.
pub fn enclosing_rule_set(before: &str) -> Option<RuleSetScope> {
    let text = strip_line_comments(before);
    let mut depth = 0usize;
    for (i, b) in text.bytes().enumerate().rev() {
        match b {
            b'}' => depth += 1,
            b'{' if depth > 0 => depth -= 1,
            b'{' => {
                let header = block_header(&text[..i]);
                if header.starts_with('@') || header.starts_with('$') {
                    return None;
                }
                if is_selector(header) {
                    return Some(RuleSetScope { ty: selector_type(header) });
                }
            }
            _ => {}
        }
    }
    None
}

fn block_header(text: &str) -> &str {
    let start = text.rfind(['{', '}', ';']).map_or(0, |i| i + 1);
    text[start..].trim()
}

fn is_selector(header: &str) -> bool {
    header.chars().next().is_some_and(|c| c.is_ascii_uppercase() || matches!(c, '#' | '.' | '*' | ':'))
}

/// `Grid > Button.primary:hover` → `Button`; `ListBox | SelectedItem as Border` → `Border`.
fn selector_type(header: &str) -> Option<String> {
    let last = header.rsplit(',').next()?.trim();
    let last = match last.rsplit_once(" as ") {
        Some((_, ty)) => ty,
        None => last.split('|').next()?,
    };
    let compound = last.split(|c: char| c.is_whitespace() || c == '>').filter(|s| !s.is_empty()).last()?;
    let name: String = compound.chars().take_while(|c| c.is_alphanumeric() || *c == '_').collect();
    (!name.is_empty()).then_some(name)
}

// ── completion_context ────────────────────────────────────────────────────────

/// Classify the cursor position for completion.
pub fn completion_context(text: &str, pos: &Position) -> Context {
    let before = text_before(text, pos);
    let current_line = before.rsplit('\n').next().unwrap_or("");
    let effective = strip_comment(current_line);
    let statement = effective.rsplit(['{', '}', ';']).next().unwrap_or("").trim_start();

    let words: Vec<&str> = statement.split_whitespace().collect();
    if words.first() == Some(&"keyframe") {
        let typing_easing = words.len() == 3 || (words.len() == 2 && statement.ends_with(char::is_whitespace));
        return if typing_easing { Context::Easing } else { Context::Unknown };
    }

    if brace_depth(&before) == 0 {
        return Context::Selector;
    }

    let Some(scope) = enclosing_rule_set(&before) else {
        return Context::Unknown;
    };
    match statement.split_once(':') {
        Some((prop, _)) if !prop.trim().is_empty() => Context::Value { ty: scope.ty, prop: prop.trim().to_string() },
        _ => Context::Property { ty: scope.ty },
    }
}

// ── helpers ───────────────────────────────────────────────────────────────────

fn floor_boundary(s: &str, mut i: usize) -> usize {
    i = i.min(s.len());
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn strip_comment(s: &str) -> &str {
    s.find("//").map(|i| &s[..i]).unwrap_or(s)
}

fn strip_line_comments(text: &str) -> String {
    text.split('\n').map(strip_comment).collect::<Vec<_>>().join("\n")
}

fn brace_depth(text: &str) -> i32 {
    strip_line_comments(text).chars().fold(0i32, |d, c| match c {
        '{' => d + 1,
        '}' => (d - 1).max(0),
        _ => d,
    })
}

/// The source text from the beginning of the file up to `pos`.
pub fn text_before(text: &str, pos: &Position) -> String {
    let line_idx = pos.line as usize;
    let mut out = String::new();
    for (i, line) in text.split('\n').enumerate() {
        if i < line_idx {
            out.push_str(line);
            out.push('\n');
        } else {
            out.push_str(&line[..floor_boundary(line, pos.character as usize)]);
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Context at the `^` marker.
    fn context(marked: &str) -> Context {
        let (text, pos) = at_marker(marked);
        completion_context(&text, &pos)
    }

    fn at_marker(marked: &str) -> (String, Position) {
        let offset = marked.find('^').unwrap();
        let before = &marked[..offset];
        let line = before.matches('\n').count() as u32;
        let col = before.rsplit('\n').next().unwrap().len() as u32;
        (marked.replacen('^', "", 1), Position::new(line, col))
    }

    fn ty(name: &str) -> Option<String> {
        Some(name.to_string())
    }

    #[test]
    fn top_level_expects_selectors() {
        assert_eq!(context("^"), Context::Selector);
        assert_eq!(context("Button { }\nTe^"), Context::Selector);
    }

    #[test]
    fn rule_set_bodies_expect_properties() {
        assert_eq!(context("Button {\n\t^\n}"), Context::Property { ty: ty("Button") });
        assert_eq!(context("Grid > Button.primary:hover { Wi^"), Context::Property { ty: ty("Button") });
        assert_eq!(context("#ok { ^"), Context::Property { ty: None });
        assert_eq!(context("ListBox | SelectedItem as Border { ^"), Context::Property { ty: ty("Border") });
    }

    #[test]
    fn values_follow_the_colon() {
        assert_eq!(
            context("StackPanel { Orientation: Ho^"),
            Context::Value { ty: ty("StackPanel"), prop: "Orientation".into() }
        );
        assert_eq!(context("Button { Width: 1; Height:^"), Context::Value { ty: ty("Button"), prop: "Height".into() });
    }

    #[test]
    fn trigger_blocks_resolve_to_their_rule_set() {
        assert_eq!(
            context("Button { trigger property IsPressed = { true } { set Opacity { 0.5 } ^"),
            Context::Property { ty: ty("Button") }
        );
    }

    #[test]
    fn storyboards_and_keyframes() {
        assert_eq!(context("@a { target { animation Width { keyframe 100 ^"), Context::Easing);
        assert_eq!(context("@a { target { animation Width { keyframe 100 ease-o^"), Context::Easing);
        assert_eq!(context("@a { target { animation Width { keyframe 10^"), Context::Unknown);
        assert_eq!(context("@a { target { ^"), Context::Unknown);
    }

    #[test]
    fn comments_are_ignored() {
        assert_eq!(context("// Button {\n^"), Context::Selector);
        assert_eq!(context("Button { // }\n^"), Context::Property { ty: ty("Button") });
    }

    #[test]
    fn words_include_keyword_punctuation() {
        let (text, pos) = at_marker("Button { trigger event Click { play-s^fx { X } } }");
        assert_eq!(word_at(&text, &pos), Some("play-sfx"));
        let (text, pos) = at_marker("$cul^ture { ru-RU }");
        assert_eq!(word_at(&text, &pos), Some("$culture"));
        let (text, pos) = at_marker("Button {  ^  }");
        assert_eq!(word_at(&text, &pos), None);
    }
}
