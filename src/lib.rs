//! SHELF application library
//!
//! Feature modules of the book catalogue service. The binary in `main.rs`
//! wires them to the store and the HTTP server.

pub mod modules;

pub use modules::*;
