//! Minimal XML reader for UVML markup.
//!
//! Handles elements, attributes (single or double quoted), self-closing
//! tags, text content with the five predefined entities, comments, and an
//! optional `<?xml ...?>` prolog. Namespaces, DTDs, and CDATA are not
//! supported.

use crate::error::UvmlError;

/// One markup element. Text content of mixed elements is concatenated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: Option<String>,
    /// 1-based line of the opening tag.
    pub line: usize,
}

impl XmlElement {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    /// `Owner.Member` element names denote property elements.
    pub fn property_element(&self) -> Option<(&str, &str)> {
        self.name.split_once('.')
    }
}

/// Reads a document with exactly one root element.
pub fn parse_xml(src: &str) -> Result<XmlElement, UvmlError> {
    let mut reader = Reader { src, pos: 0 };
    reader.skip_misc()?;
    if reader.src[reader.pos..].starts_with("<?") {
        reader.skip_past("?>")?;
        reader.skip_misc()?;
    }
    let root = reader.element()?;
    reader.skip_misc()?;
    if reader.pos < reader.src.len() {
        return Err(reader.error("content after the root element"));
    }
    Ok(root)
}

// ── Reader ────────────────────────────────────────────────────────────────

struct Reader<'s> {
    src: &'s str,
    pos: usize,
}

impl Reader<'_> {
    fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn line_col(&self) -> (usize, usize) {
        let before = &self.src[..self.pos];
        let line = before.matches('\n').count() + 1;
        let col = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
        (line, col)
    }

    fn error(&self, message: impl Into<String>) -> UvmlError {
        let (line, col) = self.line_col();
        UvmlError::Markup { line, col, message: message.into() }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn skip_past(&mut self, terminator: &str) -> Result<(), UvmlError> {
        match self.rest().find(terminator) {
            Some(at) => {
                self.pos += at + terminator.len();
                Ok(())
            }
            None => Err(self.error(format!("expected '{terminator}'"))),
        }
    }

    /// Whitespace and comments between elements.
    fn skip_misc(&mut self) -> Result<(), UvmlError> {
        loop {
            self.skip_whitespace();
            if self.rest().starts_with("<!--") {
                self.skip_past("-->")?;
            } else {
                return Ok(());
            }
        }
    }

    fn expect(&mut self, ch: char) -> Result<(), UvmlError> {
        match self.advance() {
            Some(c) if c == ch => Ok(()),
            Some(c) => Err(self.error(format!("expected '{ch}', found '{c}'"))),
            None => Err(self.error(format!("expected '{ch}', found end of input"))),
        }
    }

    fn name(&mut self) -> Result<String, UvmlError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')) {
            self.advance();
        }
        if start == self.pos {
            return Err(self.error("expected a name"));
        }
        Ok(self.src[start..self.pos].to_string())
    }

    // ── Elements ──────────────────────────────────────────────────────────

    fn element(&mut self) -> Result<XmlElement, UvmlError> {
        let line = self.line_col().0;
        self.expect('<')?;
        let name = self.name()?;
        let mut element = XmlElement { name, attributes: Vec::new(), children: Vec::new(), text: None, line };

        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('/') => {
                    self.advance();
                    self.expect('>')?;
                    return Ok(element);
                }
                Some('>') => {
                    self.advance();
                    break;
                }
                Some(_) => {
                    let attr = self.name()?;
                    if element.attribute(&attr).is_some() {
                        return Err(self.error(format!("duplicate attribute '{attr}'")));
                    }
                    self.skip_whitespace();
                    self.expect('=')?;
                    self.skip_whitespace();
                    let value = self.quoted()?;
                    element.attributes.push((attr, value));
                }
                None => return Err(self.error("unterminated start tag")),
            }
        }

        let mut text = String::new();
        loop {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                self.skip_past("-->")?;
            } else if rest.starts_with("</") {
                self.pos += 2;
                let closing = self.name()?;
                if closing != element.name {
                    return Err(self.error(format!("expected </{}>, found </{}>", element.name, closing)));
                }
                self.skip_whitespace();
                self.expect('>')?;
                break;
            } else if rest.starts_with('<') {
                element.children.push(self.element()?);
            } else if rest.is_empty() {
                return Err(self.error(format!("unclosed element <{}>", element.name)));
            } else {
                text.push_str(&self.text_run()?);
            }
        }
        let text = text.trim();
        if !text.is_empty() {
            element.text = Some(text.to_string());
        }
        Ok(element)
    }

    fn quoted(&mut self) -> Result<String, UvmlError> {
        let quote = match self.advance() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.error("expected a quoted attribute value")),
        };
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated attribute value")),
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(out);
                }
                Some('&') => out.push(self.entity()?),
                Some(c) => {
                    self.advance();
                    out.push(c);
                }
            }
        }
    }

    fn text_run(&mut self) -> Result<String, UvmlError> {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            match c {
                '<' => break,
                '&' => out.push(self.entity()?),
                _ => {
                    self.advance();
                    out.push(c);
                }
            }
        }
        Ok(out)
    }

    fn entity(&mut self) -> Result<char, UvmlError> {
        self.advance(); // consume `&`
        let Some(end) = self.rest().find(';') else {
            return Err(self.error("unterminated entity"));
        };
        let name = &self.rest()[..end];
        let ch = match name {
            "lt" => '<',
            "gt" => '>',
            "amp" => '&',
            "quot" => '"',
            "apos" => '\'',
            _ => return Err(self.error(format!("unknown entity '&{name};'"))),
        };
        self.pos += end + 1;
        Ok(ch)
    }
}
