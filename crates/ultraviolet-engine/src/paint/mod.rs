//! Colour model shared between the object model and style values.

pub mod color;

pub use color::{Color, ParseColorError};
