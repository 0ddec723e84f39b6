//! Scene data: geometry recipes, materials, lights and the scene graph.
//!
//! - `geometry`, `shape` and `curve` produce CPU meshes
//! - `model` holds the vertex layout and uploaded GPU meshes
//! - `material` and `color` describe surfaces
//! - `scene_graph` organises nodes hierarchically

pub mod color;
pub mod curve;
pub mod geometry;
pub mod light;
pub mod material;
pub mod model;
pub mod scene_graph;
pub mod shape;
pub mod texture;
pub mod transform;
