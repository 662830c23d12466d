//! Catalog loading from the line-oriented pack list format.

pub mod load;

pub use load::*;
