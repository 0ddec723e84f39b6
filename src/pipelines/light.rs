use wgpu::util::DeviceExt;

use crate::data_structures::{
    light::{Light, LightInstance},
    texture::Texture,
};

/// Upper bound of non-ambient lights the scene shader evaluates.
pub const MAX_LIGHTS: usize = 16;

pub const KIND_DIRECTIONAL: f32 = 1.0;
pub const KIND_POINT: f32 = 2.0;
pub const KIND_RECT_AREA: f32 = 3.0;

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuLight {
    /// xyz position, w kind
    pub position: [f32; 4],
    /// rgb colour times intensity, w range (0 = unlimited)
    pub color: [f32; 4],
    /// xyz direction of travel, w decay
    pub direction: [f32; 4],
    /// rect width and height
    pub extent: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    /// summed ambient rgb, w environment map present
    pub ambient: [f32; 4],
    /// x number of lights in use
    pub counts: [u32; 4],
    pub lights: [GpuLight; MAX_LIGHTS],
}

impl Default for LightUniform {
    fn default() -> Self {
        Self {
            ambient: [0.0; 4],
            counts: [0; 4],
            lights: [GpuLight::default(); MAX_LIGHTS],
        }
    }
}

impl LightUniform {
    /// Packs scene lights. Ambient lights are summed; lights beyond
    /// [`MAX_LIGHTS`] are dropped with a warning.
    pub fn from_lights(lights: &[LightInstance]) -> Self {
        let mut uniform = Self::default();
        let mut count = 0usize;
        let mut dropped = 0usize;
        for instance in lights {
            let light = instance.light;
            let [r, g, b] = light.color().scaled(light.intensity()).to_array();
            if light.is_ambient() {
                uniform.ambient[0] += r;
                uniform.ambient[1] += g;
                uniform.ambient[2] += b;
                continue;
            }
            if count == MAX_LIGHTS {
                dropped += 1;
                continue;
            }
            let p = instance.position();
            let d = instance.direction();
            let (kind, range, decay, extent) = match light {
                Light::Directional { .. } => (KIND_DIRECTIONAL, 0.0, 0.0, [0.0; 2]),
                Light::Point {
                    distance, decay, ..
                } => (KIND_POINT, distance.max(0.0), decay, [0.0; 2]),
                Light::RectArea { width, height, .. } => {
                    (KIND_RECT_AREA, 0.0, 0.0, [width.max(0.0), height.max(0.0)])
                }
                Light::Ambient { .. } => continue,
            };
            uniform.lights[count] = GpuLight {
                position: [p.x, p.y, p.z, kind],
                color: [r, g, b, range],
                direction: [d.x, d.y, d.z, decay],
                extent: [extent[0], extent[1], 0.0, 0.0],
            };
            count += 1;
        }
        if dropped > 0 {
            log::warn!("{dropped} light(s) exceed the limit of {MAX_LIGHTS} and are ignored");
        }
        uniform.counts[0] = count as u32;
        uniform
    }

    pub fn light_count(&self) -> usize {
        self.counts[0] as usize
    }
}

/// Light uniform plus the environment map, bound together as group 2.
#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub environment: Texture,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
    has_environment: bool,
}

impl LightResources {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let uniform = LightUniform::default();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = mk_bind_group_layout(device);
        // black until the HDRI arrives
        let environment = Texture::create_solid(device, queue, [0, 0, 0, 255], false, "empty environment");
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer, &environment);
        Self {
            uniform,
            buffer,
            environment,
            bind_group,
            bind_group_layout,
            has_environment: false,
        }
    }

    pub fn update(&mut self, queue: &wgpu::Queue, lights: &[LightInstance]) {
        self.uniform = LightUniform::from_lights(lights);
        self.uniform.ambient[3] = if self.has_environment { 1.0 } else { 0.0 };
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }

    pub fn set_environment(&mut self, device: &wgpu::Device, environment: Texture) {
        self.environment.destroy();
        self.environment = environment;
        self.bind_group = mk_bind_group(device, &self.bind_group_layout, &self.buffer, &self.environment);
        self.has_environment = true;
    }

    pub fn release(&mut self) {
        self.buffer.destroy();
        self.environment.destroy();
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
    environment: &Texture,
) -> wgpu::BindGroup {
    let fallback;
    let sampler = match &environment.sampler {
        Some(sampler) => sampler,
        None => {
            fallback = crate::data_structures::texture::create_default_sampler(device);
            &fallback
        }
    };
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&environment.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some("light_bind_group"),
    })
}
