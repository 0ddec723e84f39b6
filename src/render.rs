//! Render composition and pipeline batching.
//!
//! Scene nodes describe what they want drawn with a [`Render`] value. A
//! frame flattens the tree into an opaque and a transparent batch, orders
//! both and issues one instanced draw per entry with the pipeline selected by
//! the entry's [`PipelineKey`].

use std::cmp::Ordering;

use cgmath::{MetricSpace, Vector3};

use crate::{
    data_structures::model::{DrawModel, GpuMesh},
    pipelines::basic::{PipelineKey, ScenePipelines},
};

/// One instanced draw: mesh, per-instance transforms and material.
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub mesh: &'a GpuMesh,
    pub material: &'a wgpu::BindGroup,
    pub key: PipelineKey,
    pub render_order: i32,
    /// World position used for distance sorting.
    pub origin: Vector3<f32>,
    pub amount: u32,
}

/// Specifies how a scene object should be rendered.
///
/// - `None` renders nothing
/// - `Default` / `Defaults` render opaque objects
/// - `Transparent` / `Transparents` render alpha-blended objects
/// - `Composed` recursively renders a composition of renders
pub enum Render<'a> {
    None,
    Default(Instanced<'a>),
    Defaults(Vec<Instanced<'a>>),
    Transparent(Instanced<'a>),
    Transparents(Vec<Instanced<'a>>),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    pub fn split(self, opaque: &mut Vec<Instanced<'a>>, transparent: &mut Vec<Instanced<'a>>) {
        match self {
            Render::None => (),
            Render::Default(instanced) => opaque.push(instanced),
            Render::Defaults(mut vec) => opaque.append(&mut vec),
            Render::Transparent(instanced) => transparent.push(instanced),
            Render::Transparents(mut vec) => transparent.append(&mut vec),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.split(opaque, transparent)),
        }
    }

    /// Number of draws this render expands to.
    pub fn count(&self) -> usize {
        match self {
            Render::None => 0,
            Render::Default(_) | Render::Transparent(_) => 1,
            Render::Defaults(vec) | Render::Transparents(vec) => vec.len(),
            Render::Composed(renders) => renders.iter().map(Render::count).sum(),
        }
    }
}

/// Opaque: by render order, then front to back. Transparent: by render
/// order, then back to front.
pub fn sort_batches(opaque: &mut [Instanced<'_>], transparent: &mut [Instanced<'_>], eye: Vector3<f32>) {
    let distance = |i: &Instanced<'_>| i.origin.distance2(eye);
    opaque.sort_by(|a, b| {
        a.render_order
            .cmp(&b.render_order)
            .then_with(|| distance(a).partial_cmp(&distance(b)).unwrap_or(Ordering::Equal))
    });
    transparent.sort_by(|a, b| {
        a.render_order
            .cmp(&b.render_order)
            .then_with(|| distance(b).partial_cmp(&distance(a)).unwrap_or(Ordering::Equal))
    });
}

pub fn draw_batch<'a>(
    render_pass: &mut wgpu::RenderPass<'a>,
    pipelines: &'a ScenePipelines,
    batch: &[Instanced<'a>],
    camera_bind_group: &'a wgpu::BindGroup,
    light_bind_group: &'a wgpu::BindGroup,
) {
    let mut current: Option<PipelineKey> = None;
    for instanced in batch {
        if current != Some(instanced.key) {
            render_pass.set_pipeline(pipelines.get(instanced.key));
            current = Some(instanced.key);
        }
        render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
        render_pass.draw_mesh_instanced(
            instanced.mesh,
            instanced.material,
            0..instanced.amount,
            camera_bind_group,
            light_bind_group,
        );
    }
}
