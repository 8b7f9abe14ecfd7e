/// Splits text into whitespace-separated tokens. A double-quoted span is a
/// single token with the quotes removed, whatever whitespace it contains.
/// An unterminated quote runs to the end of the input.
#[derive(Debug, Clone)]
pub struct StringTokenizer<'a> {
    rest: &'a str,
}

impl<'a> StringTokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { rest: input }
    }
}

impl<'a> Iterator for StringTokenizer<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        self.rest = self.rest.trim_start();
        if self.rest.is_empty() {
            return None;
        }
        if let Some(quoted) = self.rest.strip_prefix('"') {
            let (token, rest) = match quoted.find('"') {
                Some(end) => (&quoted[..end], &quoted[end + 1..]),
                None => (quoted, ""),
            };
            self.rest = rest;
            return Some(token);
        }
        let end = self.rest.find(|c: char| c.is_whitespace() || c == '"').unwrap_or(self.rest.len());
        let (token, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(token)
    }
}

pub fn tokenize(input: &str) -> Vec<&str> {
    StringTokenizer::new(input).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_spans_are_single_tokens() {
        let tokens = tokenize("Hello, world!  This is a test of the \"Ultraviolet String Tokenizer.\"");
        assert_eq!(
            tokens,
            vec!["Hello,", "world!", "This", "is", "a", "test", "of", "the", "Ultraviolet String Tokenizer."]
        );
    }

    #[test]
    fn blank_input() {
        assert!(tokenize("   \t\n").is_empty());
    }

    #[test]
    fn unterminated_quote_runs_to_end() {
        assert_eq!(tokenize("a \"b c"), vec!["a", "b c"]);
    }

    #[test]
    fn quote_glued_to_word_starts_new_token() {
        assert_eq!(tokenize("x\"y z\"w"), vec!["x", "y z", "w"]);
    }
}
