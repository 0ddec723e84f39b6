//! Shading parameters, texture references and the material library.
//!
//! Nodes never own a [`Material`]; they hold a [`MaterialHandle`] into the
//! session's [`MaterialLibrary`]. Sharing a material between meshes is
//! therefore explicit, and recolouring touches exactly the handles registered
//! under a group name.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use image::RgbaImage;
use serde::Deserialize;
use wgpu::util::DeviceExt;

use crate::{context::GpuCache, data_structures::color::Color, pipelines::basic::PipelineKey};

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(u64);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum ColorSpace {
    #[default]
    Srgb,
    Linear,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum Wrap {
    #[default]
    Repeat,
    Clamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TextureSettings {
    pub color_space: ColorSpace,
    pub wrap: Wrap,
    pub repeat: [f32; 2],
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self {
            color_space: ColorSpace::Srgb,
            wrap: Wrap::Repeat,
            repeat: [1.0, 1.0],
        }
    }
}

impl TextureSettings {
    pub fn linear() -> Self {
        Self {
            color_space: ColorSpace::Linear,
            ..Default::default()
        }
    }

    pub fn repeated(mut self, x: f32, y: f32) -> Self {
        self.repeat = [x, y];
        self
    }
}

/// Decoded or synthesized RGBA8 pixels, shared between materials.
#[derive(Clone, Debug)]
pub struct TextureSource {
    id: TextureId,
    pub image: Arc<RgbaImage>,
    pub settings: TextureSettings,
}

impl TextureSource {
    pub fn new(image: RgbaImage, settings: TextureSettings) -> Self {
        Self {
            id: TextureId(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed)),
            image: Arc::new(image),
            settings,
        }
    }

    pub fn id(&self) -> TextureId {
        self.id
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
pub enum TextureSlot {
    Color,
    Normal,
    Roughness,
    Occlusion,
}

#[derive(Clone, Debug, Default)]
pub struct TextureMaps {
    pub color: Option<TextureSource>,
    pub normal: Option<TextureSource>,
    pub roughness: Option<TextureSource>,
    pub occlusion: Option<TextureSource>,
}

impl TextureMaps {
    pub fn get(&self, slot: TextureSlot) -> Option<&TextureSource> {
        match slot {
            TextureSlot::Color => self.color.as_ref(),
            TextureSlot::Normal => self.normal.as_ref(),
            TextureSlot::Roughness => self.roughness.as_ref(),
            TextureSlot::Occlusion => self.occlusion.as_ref(),
        }
    }

    pub fn uses(&self, id: TextureId) -> bool {
        [&self.color, &self.normal, &self.roughness, &self.occlusion]
            .into_iter()
            .flatten()
            .any(|t| t.id() == id)
    }

    fn slot_mut(&mut self, slot: TextureSlot) -> &mut Option<TextureSource> {
        match slot {
            TextureSlot::Color => &mut self.color,
            TextureSlot::Normal => &mut self.normal,
            TextureSlot::Roughness => &mut self.roughness,
            TextureSlot::Occlusion => &mut self.occlusion,
        }
    }

    /// Repeat of the first map present, colour first.
    fn repeat(&self) -> [f32; 2] {
        [
            TextureSlot::Color,
            TextureSlot::Normal,
            TextureSlot::Roughness,
            TextureSlot::Occlusion,
        ]
        .into_iter()
        .find_map(|slot| self.get(slot))
        .map(|t| t.settings.repeat)
        .unwrap_or([1.0, 1.0])
    }
}

#[derive(Clone, Debug)]
pub struct Material {
    pub name: String,
    pub color: Color,
    pub opacity: f32,
    pub roughness: f32,
    pub metalness: f32,
    pub transmission: f32,
    pub thickness: f32,
    pub emissive: Color,
    pub emissive_intensity: f32,
    pub clearcoat: f32,
    pub clearcoat_roughness: f32,
    pub sheen: f32,
    pub env_intensity: f32,
    pub normal_scale: f32,
    pub transparent: bool,
    pub double_sided: bool,
    pub depth_test: bool,
    pub depth_write: bool,
    pub unlit: bool,
    pub maps: TextureMaps,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::from("material"),
            color: Color::WHITE,
            opacity: 1.0,
            roughness: 1.0,
            metalness: 0.0,
            transmission: 0.0,
            thickness: 0.0,
            emissive: Color::BLACK,
            emissive_intensity: 1.0,
            clearcoat: 0.0,
            clearcoat_roughness: 0.0,
            sheen: 0.0,
            env_intensity: 1.0,
            normal_scale: 1.0,
            transparent: false,
            double_sided: false,
            depth_test: true,
            depth_write: true,
            unlit: false,
            maps: TextureMaps::default(),
        }
    }
}

impl Material {
    pub fn standard(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            color,
            ..Default::default()
        }
    }

    /// Ignores lights and environment; outputs colour times texture.
    pub fn unlit(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            color,
            unlit: true,
            ..Default::default()
        }
    }

    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness;
        self
    }

    pub fn with_metalness(mut self, metalness: f32) -> Self {
        self.metalness = metalness;
        self
    }

    pub fn with_env_intensity(mut self, intensity: f32) -> Self {
        self.env_intensity = intensity;
        self
    }

    pub fn with_emissive(mut self, emissive: Color, intensity: f32) -> Self {
        self.emissive = emissive;
        self.emissive_intensity = intensity;
        self
    }

    pub fn with_clearcoat(mut self, clearcoat: f32, roughness: f32) -> Self {
        self.clearcoat = clearcoat;
        self.clearcoat_roughness = roughness;
        self
    }

    pub fn with_sheen(mut self, sheen: f32) -> Self {
        self.sheen = sheen;
        self
    }

    pub fn with_transmission(mut self, transmission: f32, thickness: f32) -> Self {
        self.transmission = transmission;
        self.thickness = thickness;
        self
    }

    /// Marks the material as blended with the given opacity.
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self.transparent = true;
        self
    }

    pub fn double_sided(mut self) -> Self {
        self.double_sided = true;
        self
    }

    pub fn with_depth(mut self, test: bool, write: bool) -> Self {
        self.depth_test = test;
        self.depth_write = write;
        self
    }

    pub fn with_map(mut self, slot: TextureSlot, source: TextureSource) -> Self {
        *self.maps.slot_mut(slot) = Some(source);
        self
    }

    pub fn is_transparent(&self) -> bool {
        self.transparent || self.transmission > 0.0
    }

    pub fn pipeline_key(&self) -> PipelineKey {
        PipelineKey {
            blend: self.is_transparent(),
            double_sided: self.double_sided,
            depth_test: self.depth_test,
            depth_write: self.depth_write,
        }
    }

    pub fn to_uniform(&self) -> MaterialUniform {
        let [r, g, b] = self.color.to_array();
        let emissive = self.emissive.scaled(self.emissive_intensity).to_array();
        let repeat = self.maps.repeat();
        MaterialUniform {
            base_color: [r, g, b, self.opacity.clamp(0.0, 1.0)],
            emissive: [emissive[0], emissive[1], emissive[2], self.env_intensity],
            pbr: [
                self.roughness.clamp(0.04, 1.0),
                self.metalness.clamp(0.0, 1.0),
                self.transmission.clamp(0.0, 1.0),
                self.thickness.max(0.0),
            ],
            coat: [
                self.clearcoat.clamp(0.0, 1.0),
                self.clearcoat_roughness.clamp(0.0, 1.0),
                self.sheen.clamp(0.0, 1.0),
                if self.unlit { 1.0 } else { 0.0 },
            ],
            uv: [repeat[0], repeat[1], self.normal_scale, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    /// rgb + opacity
    pub base_color: [f32; 4],
    /// premultiplied emissive rgb + environment intensity
    pub emissive: [f32; 4],
    /// roughness, metalness, transmission, thickness
    pub pbr: [f32; 4],
    /// clearcoat, clearcoat roughness, sheen, unlit
    pub coat: [f32; 4],
    /// uv repeat, normal scale
    pub uv: [f32; 4],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialHandle(u32);

impl MaterialHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct GpuMaterial {
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

#[derive(Debug)]
struct Entry {
    material: Material,
    dirty: bool,
    gpu: Option<GpuMaterial>,
}

#[derive(Debug, Default)]
pub struct MaterialLibrary {
    entries: Vec<Entry>,
    groups: HashMap<String, Vec<MaterialHandle>>,
    placeholder: Option<MaterialHandle>,
    /// Textures replaced through `set_texture` since the last upload.
    retired: Vec<TextureId>,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, material: Material) -> MaterialHandle {
        let handle = MaterialHandle(self.entries.len() as u32);
        self.entries.push(Entry {
            material,
            dirty: true,
            gpu: None,
        });
        handle
    }

    /// Adds a material and registers it under `group` for recolouring.
    pub fn add_to_group(&mut self, group: &str, material: Material) -> MaterialHandle {
        let handle = self.add(material);
        self.join_group(group, handle);
        handle
    }

    pub fn join_group(&mut self, group: &str, handle: MaterialHandle) {
        let members = self.groups.entry(group.to_string()).or_default();
        if !members.contains(&handle) {
            members.push(handle);
        }
    }

    pub fn group(&self, group: &str) -> &[MaterialHandle] {
        self.groups.get(group).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, handle: MaterialHandle) -> Option<&Material> {
        self.entries.get(handle.index()).map(|e| &e.material)
    }

    /// Mutates a material in place and schedules a GPU refresh.
    pub fn update(&mut self, handle: MaterialHandle, mutation: impl FnOnce(&mut Material)) -> bool {
        match self.entries.get_mut(handle.index()) {
            Some(entry) => {
                mutation(&mut entry.material);
                entry.dirty = true;
                true
            }
            None => false,
        }
    }

    pub fn set_texture(
        &mut self,
        handle: MaterialHandle,
        slot: TextureSlot,
        source: TextureSource,
    ) -> bool {
        let id = source.id();
        let replaced = self
            .get(handle)
            .and_then(|m| m.maps.get(slot))
            .map(TextureSource::id)
            .filter(|&old| old != id);
        let updated = self.update(handle, |m| *m.maps.slot_mut(slot) = Some(source));
        if updated {
            self.retired.extend(replaced);
        }
        updated
    }

    /// Drains the textures replaced through [`set_texture`](Self::set_texture)
    /// that no material maps any more.
    pub fn take_unused_textures(&mut self) -> Vec<TextureId> {
        let mut unused = Vec::new();
        for id in std::mem::take(&mut self.retired) {
            let in_use = self.entries.iter().any(|e| e.material.maps.uses(id));
            if !in_use && !unused.contains(&id) {
                unused.push(id);
            }
        }
        unused
    }

    /// Sets the base colour of every material in `group`. Returns how many
    /// materials changed.
    pub fn recolor_group(&mut self, group: &str, color: Color) -> usize {
        let members = self.group(group).to_vec();
        members
            .into_iter()
            .filter(|&h| self.update(h, |m| m.color = color))
            .count()
    }

    pub fn is_dirty(&self, handle: MaterialHandle) -> bool {
        self.entries.get(handle.index()).is_some_and(|e| e.dirty)
    }

    /// Neutral grey used for pending asset slots.
    pub fn placeholder(&mut self) -> MaterialHandle {
        if let Some(handle) = self.placeholder {
            return handle;
        }
        let handle = self.add(
            Material::standard("placeholder", Color::from_hex(0xb8b8b8))
                .with_roughness(0.9)
                .with_opacity(0.35),
        );
        self.placeholder = Some(handle);
        handle
    }

    pub fn pipeline_key(&self, handle: MaterialHandle) -> PipelineKey {
        self.get(handle)
            .map(Material::pipeline_key)
            .unwrap_or_default()
    }

    pub fn bind_group(&self, handle: MaterialHandle) -> Option<&wgpu::BindGroup> {
        self.entries
            .get(handle.index())
            .and_then(|e| e.gpu.as_ref())
            .map(|gpu| &gpu.bind_group)
    }

    /// Uploads textures and uniforms of every dirty material.
    pub fn write_to_buffers(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, cache: &mut GpuCache) {
        for entry in self.entries.iter_mut().filter(|e| e.dirty) {
            let uniform = entry.material.to_uniform();
            let maps = &entry.material.maps;
            for source in [&maps.color, &maps.normal, &maps.roughness, &maps.occlusion]
                .into_iter()
                .flatten()
            {
                cache.texture(device, queue, source);
            }

            let buffer = match entry.gpu.take() {
                Some(gpu) => {
                    queue.write_buffer(&gpu.uniform, 0, bytemuck::cast_slice(&[uniform]));
                    gpu.uniform
                }
                None => device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} Material Buffer", entry.material.name)),
                    contents: bytemuck::cast_slice(&[uniform]),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                }),
            };
            let bind_group = cache.material_bind_group(device, &entry.material, &buffer);
            entry.gpu = Some(GpuMaterial {
                uniform: buffer,
                bind_group,
            });
            entry.dirty = false;
        }
        for id in self.take_unused_textures() {
            cache.evict_texture(id);
        }
    }

    /// Frees GPU buffers; the CPU description stays and is re-uploaded on
    /// the next write.
    pub fn release(&mut self) {
        for entry in self.entries.iter_mut() {
            if let Some(gpu) = entry.gpu.take() {
                gpu.uniform.destroy();
            }
            entry.dirty = true;
        }
    }
}
