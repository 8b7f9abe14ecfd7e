//! Lexer, full-fidelity syntax tree, and parser for the **Ultraviolet Style
//! Sheet** language (`.uvss`).
//!
//! This crate is intentionally dependency-free so it can be consumed by
//! language-server tooling, editors, and linters without pulling in the
//! object model or the animation runtime.
//!
//! Parsing never fails: lex and parse errors are recovered (error tokens,
//! synthesized missing tokens, skipped-token nodes) and reported next to the
//! tree. Every byte of the input, whitespace and comments included, is kept
//! as token trivia, so `parse_str(src).to_full_string() == src`.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`kind`] | `SyntaxKind` for trivia, tokens, keywords, and nodes |
//! | [`syntax`] | `SyntaxTrivia`, `SyntaxToken`, `SyntaxNode`, `LineIndex` |
//! | [`lexer`] | `Lexer`, `lex` |
//! | [`parser`] | `Parse`, `parse_str` entry point |
//! | [`ast`] | Typed views (`RuleSet`, `Storyboard`, ...) used by the compiler |
//! | [`normalize`] | `normalize_whitespace` canonical layout |
//! | [`factory`] | Programmatic tree construction |
//! | [`error`] | `Diagnostic` |
//!
//! # Quick start
//!
//! ```rust
//! use ultraviolet_uvss::{normalize_whitespace, parse_str};
//!
//! let src = "Button{Width:100;}";
//! let parse = parse_str(src);
//! assert!(parse.ok());
//! assert_eq!(parse.to_full_string(), src);
//!
//! let pretty = normalize_whitespace(&parse.root).to_full_string();
//! assert_eq!(pretty, "Button\n{\n\tWidth: 100;\n}");
//! ```

pub mod ast;
pub mod error;
pub mod factory;
pub mod kind;
pub mod lexer;
pub mod normalize;
pub mod parser;
pub mod syntax;

pub use error::{Diagnostic, DiagnosticKind};
pub use kind::SyntaxKind;
pub use lexer::{lex, Lexed};
pub use normalize::normalize_whitespace;
pub use parser::{parse_str, Parse};
pub use syntax::{LineIndex, SyntaxElement, SyntaxNode, SyntaxToken, SyntaxTrivia};
