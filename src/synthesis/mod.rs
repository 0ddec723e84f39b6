//! CPU-side texture synthesis.

pub mod cover;
pub mod rug;
