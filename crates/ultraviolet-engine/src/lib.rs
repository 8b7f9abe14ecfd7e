//! Ultraviolet engine crate.
//!
//! This crate owns the runtime primitives used by the UI layer: logger
//! initialization, the per-frame update clock, animation clocks and their
//! generation-checked pools, the colour type, and the general string
//! tokenizer used by value parsing.

pub mod logging;
pub mod paint;
pub mod text;
pub mod time;
