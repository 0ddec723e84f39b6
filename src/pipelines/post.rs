//! Post-processing: bright pass, separable bloom blur and the composite
//! pass (ACES tone mapping, film grain, vignette) into the surface.

use serde::Deserialize;
use wgpu::util::DeviceExt;

use crate::data_structures::texture::Texture;

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct BloomSettings {
    pub strength: f32,
    pub radius: f32,
    pub threshold: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct VignetteSettings {
    pub offset: f32,
    pub darkness: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PostSettings {
    pub bloom: BloomSettings,
    pub film_intensity: f32,
    pub vignette: VignetteSettings,
    pub exposure: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            strength: 0.15,
            radius: 0.25,
            threshold: 0.9,
        }
    }
}

impl Default for VignetteSettings {
    fn default() -> Self {
        Self {
            offset: 1.02,
            darkness: 0.75,
        }
    }
}

impl Default for PostSettings {
    fn default() -> Self {
        Self {
            bloom: BloomSettings::default(),
            film_intensity: 0.01,
            vignette: VignetteSettings::default(),
            exposure: 1.75,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PostUniform {
    /// strength, radius, threshold
    pub bloom: [f32; 4],
    /// grain intensity, time in seconds, exposure
    pub film: [f32; 4],
    /// offset, darkness
    pub vignette: [f32; 4],
    /// texel size of the bloom targets
    pub texel: [f32; 4],
}

impl PostUniform {
    pub fn new(settings: &PostSettings, bloom_size: [u32; 2], time: f32) -> Self {
        Self {
            bloom: [
                settings.bloom.strength,
                settings.bloom.radius,
                settings.bloom.threshold,
                0.0,
            ],
            film: [settings.film_intensity, time, settings.exposure, 0.0],
            vignette: [settings.vignette.offset, settings.vignette.darkness, 0.0, 0.0],
            texel: [
                1.0 / bloom_size[0].max(1) as f32,
                1.0 / bloom_size[1].max(1) as f32,
                0.0,
                0.0,
            ],
        }
    }
}

#[derive(Debug)]
struct Targets {
    hdr: Texture,
    bloom_a: Texture,
    bloom_b: Texture,
    bright: wgpu::BindGroup,
    blur_h: wgpu::BindGroup,
    blur_v: wgpu::BindGroup,
    composite: wgpu::BindGroup,
    bloom_size: [u32; 2],
}

#[derive(Debug)]
pub struct PostChain {
    settings: PostSettings,
    uniform: PostUniform,
    buffer: wgpu::Buffer,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    bright: wgpu::RenderPipeline,
    blur_h: wgpu::RenderPipeline,
    blur_v: wgpu::RenderPipeline,
    composite: wgpu::RenderPipeline,
    targets: Targets,
}

impl PostChain {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        size: [u32; 2],
        settings: &PostSettings,
    ) -> Self {
        let layout = mk_bind_group_layout(device);
        let sampler = crate::data_structures::texture::create_sampler(
            device,
            crate::data_structures::material::Wrap::Clamp,
        );
        let bloom_size = half(size);
        let uniform = PostUniform::new(settings, bloom_size, 0.0);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Post Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let source = [include_str!("fullscreen.wgsl"), include_str!("post.wgsl")].join("\n\n");
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("post-shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("post-pipeline-layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let mk = |entry: &str, format| {
            mk_fullscreen_pipeline(device, &pipeline_layout, &shader, entry, format)
        };
        let bright = mk("fs_bright", Texture::HDR_FORMAT);
        let blur_h = mk("fs_blur_h", Texture::HDR_FORMAT);
        let blur_v = mk("fs_blur_v", Texture::HDR_FORMAT);
        let composite = mk("fs_composite", surface_format);

        let targets = Targets::new(device, &layout, &buffer, &sampler, size);
        Self {
            settings: *settings,
            uniform,
            buffer,
            layout,
            sampler,
            bright,
            blur_h,
            blur_v,
            composite,
            targets,
        }
    }

    /// The colour target the scene is rendered into.
    pub fn hdr_view(&self) -> &wgpu::TextureView {
        &self.targets.hdr.view
    }

    pub fn settings(&self) -> &PostSettings {
        &self.settings
    }

    pub fn resize(&mut self, device: &wgpu::Device, size: [u32; 2]) {
        self.targets.release();
        self.targets = Targets::new(device, &self.layout, &self.buffer, &self.sampler, size);
    }

    /// Updates the grain seed; called once per frame.
    pub fn set_time(&mut self, queue: &wgpu::Queue, seconds: f32) {
        self.uniform = PostUniform::new(&self.settings, self.targets.bloom_size, seconds);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }

    /// Records bloom and composite passes; the result lands in `output`.
    pub fn run(&self, encoder: &mut wgpu::CommandEncoder, output: &wgpu::TextureView) {
        let t = &self.targets;
        fullscreen_pass(encoder, "bloom-bright", &t.bloom_a.view, &self.bright, &t.bright);
        fullscreen_pass(encoder, "bloom-blur-h", &t.bloom_b.view, &self.blur_h, &t.blur_h);
        fullscreen_pass(encoder, "bloom-blur-v", &t.bloom_a.view, &self.blur_v, &t.blur_v);
        fullscreen_pass(encoder, "composite", output, &self.composite, &t.composite);
    }

    pub fn release(&mut self) {
        self.targets.release();
        self.buffer.destroy();
    }
}

impl Targets {
    fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        buffer: &wgpu::Buffer,
        sampler: &wgpu::Sampler,
        size: [u32; 2],
    ) -> Self {
        let bloom_size = half(size);
        let hdr = Texture::create_render_target(device, size, Texture::HDR_FORMAT, "hdr-target");
        let bloom_a =
            Texture::create_render_target(device, bloom_size, Texture::HDR_FORMAT, "bloom-a");
        let bloom_b =
            Texture::create_render_target(device, bloom_size, Texture::HDR_FORMAT, "bloom-b");
        let bind = |label, primary: &Texture, secondary: &Texture| {
            mk_bind_group(device, layout, buffer, sampler, &primary.view, &secondary.view, label)
        };
        let bright = bind("post-bright", &hdr, &hdr);
        let blur_h = bind("post-blur-h", &bloom_a, &bloom_a);
        let blur_v = bind("post-blur-v", &bloom_b, &bloom_b);
        let composite = bind("post-composite", &hdr, &bloom_a);
        Self {
            hdr,
            bloom_a,
            bloom_b,
            bright,
            blur_h,
            blur_v,
            composite,
            bloom_size,
        }
    }

    fn release(&self) {
        self.hdr.destroy();
        self.bloom_a.destroy();
        self.bloom_b.destroy();
    }
}

fn half(size: [u32; 2]) -> [u32; 2] {
    [(size[0] / 2).max(1), (size[1] / 2).max(1)]
}

fn fullscreen_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        occlusion_query_set: None,
        timestamp_writes: None,
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.draw(0..3, 0..1);
}

fn mk_fullscreen_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    entry_point: &str,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(entry_point),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_fullscreen"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(entry_point),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let texture = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("post-bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            texture(1),
            texture(2),
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

fn mk_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
    sampler: &wgpu::Sampler,
    primary: &wgpu::TextureView,
    secondary: &wgpu::TextureView,
    label: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(primary),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(secondary),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}
