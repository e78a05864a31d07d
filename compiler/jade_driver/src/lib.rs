//! Compilation driver for the Jade dispatch core.
//!
//! The [`Compilation`] context is the process-wide state for one
//! compilation: the type registry, module graph, implementation pool,
//! generated tables, and collected diagnostics all live here and are torn
//! down together. Every core entry point goes through it.

mod compilation;

pub use compilation::{Compilation, CompilationStats, Phase};
