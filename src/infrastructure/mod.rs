//! Adapters implementing the domain ports.

pub mod http;
pub mod in_memory;
