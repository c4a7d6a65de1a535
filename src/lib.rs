//! Weft - a component-oriented reactive language
//!
//! This is the root workspace crate that provides integration tests.
//! The actual implementation is in the workspace member crates.

// Re-export main crates for convenience
pub use weft_ast as ast;
pub use weft_checker as checker;
pub use weft_runtime as runtime;
