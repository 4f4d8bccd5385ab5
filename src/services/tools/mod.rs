//! Tool registry, per-call executor, and the built-in file tools.

pub mod executor;
pub mod impls;
pub mod trait_def;
