//! Render pipelines: the lit scene pipelines, the light uniform and the
//! post-processing chain.

pub mod basic;
pub mod light;
pub mod post;
