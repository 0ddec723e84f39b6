//! GPU context: device, surface, camera, lights, pipelines and the
//! per-session upload cache.

use std::{collections::HashMap, sync::Arc};

use anyhow::Context as _;
use winit::window::Window;

use crate::{
    camera::{Camera, CameraResources, Projection},
    config::{CameraSettings, PostSettings},
    data_structures::{
        geometry::{Geometry, GeometryId},
        material::{Material, TextureId, TextureSource, Wrap},
        model::GpuMesh,
        texture::{self, Texture},
    },
    pipelines::{basic::ScenePipelines, light::LightResources, post::PostChain},
};

/// Uploaded meshes and textures keyed by their CPU ids, plus the neutral
/// textures materials fall back to.
#[derive(Debug)]
pub struct GpuCache {
    meshes: HashMap<GeometryId, GpuMesh>,
    textures: HashMap<TextureId, Texture>,
    pub material_layout: wgpu::BindGroupLayout,
    white: Texture,
    flat_normal: Texture,
    repeat_sampler: wgpu::Sampler,
    clamp_sampler: wgpu::Sampler,
}

impl GpuCache {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self {
            meshes: HashMap::new(),
            textures: HashMap::new(),
            material_layout: material_layout(device),
            white: Texture::create_solid(device, queue, [255, 255, 255, 255], true, "default white"),
            flat_normal: Texture::create_default_normal_map(device, queue),
            repeat_sampler: texture::create_sampler(device, Wrap::Repeat),
            clamp_sampler: texture::create_sampler(device, Wrap::Clamp),
        }
    }

    /// Uploads `geometry` once; later calls return the cached mesh.
    pub fn mesh(&mut self, device: &wgpu::Device, geometry: &Geometry) -> &GpuMesh {
        self.meshes
            .entry(geometry.id())
            .or_insert_with(|| GpuMesh::upload(device, geometry))
    }

    pub fn mesh_for(&self, id: GeometryId) -> Option<&GpuMesh> {
        self.meshes.get(&id)
    }

    pub fn texture(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, source: &TextureSource) -> &Texture {
        self.textures
            .entry(source.id())
            .or_insert_with(|| Texture::from_source(device, queue, source))
    }

    /// Frees an uploaded texture no material refers to any more.
    pub fn evict_texture(&mut self, id: TextureId) -> bool {
        match self.textures.remove(&id) {
            Some(texture) => {
                texture.destroy();
                true
            }
            None => false,
        }
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    fn view_or<'a>(&'a self, source: Option<&TextureSource>, fallback: &'a Texture) -> &'a wgpu::TextureView {
        source
            .and_then(|s| self.textures.get(&s.id()))
            .map(|t| &t.view)
            .unwrap_or(&fallback.view)
    }

    /// Binds uniform and maps of `material`. Maps that are not uploaded yet
    /// bind the neutral defaults.
    pub fn material_bind_group(
        &self,
        device: &wgpu::Device,
        material: &Material,
        uniform: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        let maps = &material.maps;
        let sampler = match maps.color.as_ref().map(|c| c.settings.wrap) {
            Some(Wrap::Clamp) => &self.clamp_sampler,
            _ => &self.repeat_sampler,
        };
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(
                        self.view_or(maps.color.as_ref(), &self.white),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(
                        self.view_or(maps.normal.as_ref(), &self.flat_normal),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(
                        self.view_or(maps.roughness.as_ref(), &self.white),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(
                        self.view_or(maps.occlusion.as_ref(), &self.white),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
            label: Some(&format!("{} bind group", material.name)),
        })
    }

    pub fn release(&mut self) {
        for (_, mesh) in self.meshes.drain() {
            mesh.destroy();
        }
        for (_, texture) in self.textures.drain() {
            texture.destroy();
        }
    }
}

fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
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
            texture_entry(1),
            texture_entry(2),
            texture_entry(3),
            texture_entry(4),
            wgpu::BindGroupLayoutEntry {
                binding: 5,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("material_bind_group_layout"),
    })
}

#[derive(Debug)]
pub struct Context {
    pub window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub depth_texture: Texture,
    pub camera: CameraResources,
    pub light: LightResources,
    pub cache: GpuCache,
    pub pipelines: ScenePipelines,
    pub post: PostChain,
    pub clear_colour: wgpu::Color,
    is_surface_configured: bool,
}

impl Context {
    pub async fn new(
        window: Arc<Window>,
        camera: &CameraSettings,
        post: &PostSettings,
        clear_colour: wgpu::Color,
    ) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no GPU adapter is compatible with the surface")?;

        log::info!("device and queue");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The composite pass writes linear colour and relies on an sRGB
        // surface for encoding.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no texture formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let projection = Projection::new(
            config.width,
            config.height,
            cgmath::Deg(camera.fov_degrees),
            camera.near,
            camera.far,
        );
        let camera = CameraResources::new(
            &device,
            Camera::new(camera.position, camera.target),
            projection,
        );

        let depth_texture =
            Texture::create_depth_texture(&device, [config.width, config.height], "depth_texture");
        let light = LightResources::new(&device, &queue);
        let cache = GpuCache::new(&device, &queue);
        let pipelines = ScenePipelines::new(
            &device,
            Texture::HDR_FORMAT,
            &cache.material_layout,
            &camera.bind_group_layout,
            &light.bind_group_layout,
        );
        let post = PostChain::new(&device, surface_format, [config.width, config.height], post);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            depth_texture,
            camera,
            light,
            cache,
            pipelines,
            post,
            clear_colour,
            is_surface_configured: false,
        })
    }

    pub fn is_surface_configured(&self) -> bool {
        self.is_surface_configured
    }

    /// Applies a new drawable size to the surface, camera aspect, depth
    /// buffer and post-processing targets. Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.is_surface_configured = true;
        self.camera.resize(width, height);
        self.depth_texture =
            Texture::create_depth_texture(&self.device, [width, height], "depth_texture");
        self.post.resize(&self.device, [width, height]);
    }

    pub fn release(&mut self) {
        self.cache.release();
        self.light.release();
        self.post.release();
        self.depth_texture.destroy();
        self.camera.buffer.destroy();
    }
}
