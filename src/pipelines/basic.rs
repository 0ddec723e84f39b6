use std::collections::HashMap;

use crate::data_structures::{
    model::{ModelVertex, Vertex},
    texture::Texture,
    transform::TransformRaw,
};

/// The fixed-function state a material can ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub blend: bool,
    pub double_sided: bool,
    pub depth_test: bool,
    pub depth_write: bool,
}

impl Default for PipelineKey {
    fn default() -> Self {
        Self {
            blend: false,
            double_sided: false,
            depth_test: true,
            depth_write: true,
        }
    }
}

impl PipelineKey {
    pub fn all() -> impl Iterator<Item = PipelineKey> {
        (0..16u8).map(|bits| PipelineKey {
            blend: bits & 1 != 0,
            double_sided: bits & 2 != 0,
            depth_test: bits & 4 != 0,
            depth_write: bits & 8 != 0,
        })
    }
}

/// One PBR pipeline per [`PipelineKey`], all sharing the scene shader.
#[derive(Debug)]
pub struct ScenePipelines {
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl ScenePipelines {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        material_layout: &wgpu::BindGroupLayout,
        camera_layout: &wgpu::BindGroupLayout,
        light_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[material_layout, camera_layout, light_layout],
            push_constant_ranges: &[],
        });
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("PBR Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("pbr.wgsl").into()),
        });
        let pipelines = PipelineKey::all()
            .map(|key| {
                let pipeline = mk_render_pipeline(
                    device,
                    &layout,
                    color_format,
                    key,
                    Some(Texture::DEPTH_FORMAT),
                    &[ModelVertex::desc(), TransformRaw::desc()],
                    &shader,
                );
                (key, pipeline)
            })
            .collect();
        Self { pipelines }
    }

    pub fn get(&self, key: PipelineKey) -> &wgpu::RenderPipeline {
        // every key is created up front
        &self.pipelines[&key]
    }
}

pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    key: PipelineKey,
    depth_format: Option<wgpu::TextureFormat>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: &wgpu::ShaderModule,
) -> wgpu::RenderPipeline {
    let blend = if key.blend {
        wgpu::BlendState::ALPHA_BLENDING
    } else {
        wgpu::BlendState::REPLACE
    };
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(&format!("Scene Pipeline {key:?}")),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: if key.double_sided {
                None
            } else {
                Some(wgpu::Face::Back)
            },
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: key.depth_write,
            depth_compare: if key.depth_test {
                wgpu::CompareFunction::LessEqual
            } else {
                wgpu::CompareFunction::Always
            },
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}
