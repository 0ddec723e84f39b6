//! studio-room
//!
//! A procedurally built studio room rendered with wgpu, natively and in the
//! browser. Furniture is generated from parameter records, textures are
//! partly painted on the CPU, models and images stream in while the room is
//! already on screen, and every frame goes through a bloom, film grain and
//! vignette chain before it is shown.
//!
//! High-level modules
//! - `app`: winit application handler and the `run` / `mount_room` entry points
//! - `builders`: procedural furniture and room fixtures
//! - `camera`: camera, projection and their uniform
//! - `config`: the `RoomLayout` describing what goes where
//! - `context`: GPU device, surface and per-session resources
//! - `data_structures`: geometry, materials, lights and the scene graph
//! - `pipelines`: scene and post-processing pipelines
//! - `render`: batching of scene draws
//! - `resources`: asset loading, model classification and load tasks
//! - `room`: assembles the full scene from a layout
//! - `session`: one mounted room with its render loop and teardown
//! - `synthesis`: CPU texture painting
//!

pub mod app;
pub mod builders;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod room;
pub mod session;
pub mod synthesis;

pub use app::run;
#[cfg(target_arch = "wasm32")]
pub use app::mount_room;
pub use config::RoomLayout;
