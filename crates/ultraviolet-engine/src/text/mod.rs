//! Text helpers shared by value parsing.

pub mod tokenizer;

pub use tokenizer::{tokenize, StringTokenizer};
