//! Procedural builders. Each turns a parameter record into a self-contained
//! sub-graph, registering its materials under named groups so they can be
//! recoloured later.

pub mod book;
pub mod chair;
pub mod fixtures;
pub mod lamp;
pub mod shelf;

/// `value` if it is finite, clamped to at least `min`; `fallback` otherwise.
pub(crate) fn sanitize(value: f32, min: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.max(min)
    } else {
        fallback
    }
}
