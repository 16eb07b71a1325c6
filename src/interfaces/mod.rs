//! Outer surfaces driving the application layer.

pub mod cli;
