//! Scene graph and hierarchical scene organization.
//!
//! Every node owns its children. World matrices are recomputed top-down once
//! per frame with [`SceneNode::update_world_transforms`]; GPU data is written
//! lazily with [`SceneNode::write_to_buffers`] and freed explicitly with
//! [`SceneNode::release`].

use std::sync::Arc;

use cgmath::{Matrix4, SquareMatrix, Vector3};
use wgpu::util::DeviceExt;

use crate::{
    context::GpuCache,
    data_structures::{
        geometry::{Aabb, Geometry},
        light::{Light, LightInstance},
        material::{MaterialHandle, MaterialLibrary},
        transform::{Transform, TransformRaw},
    },
    render::{Instanced, Render},
};

/// State every node kind shares.
pub struct NodeBase {
    pub name: String,
    pub local: Transform,
    pub world: Matrix4<f32>,
    pub children: Vec<Box<dyn SceneNode>>,
}

impl NodeBase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            local: Transform::new(),
            world: Matrix4::identity(),
            children: Vec::new(),
        }
    }
}

pub trait SceneNode {
    fn base(&self) -> &NodeBase;

    fn base_mut(&mut self) -> &mut NodeBase;

    fn name(&self) -> &str {
        &self.base().name
    }

    fn local_transform(&self) -> &Transform {
        &self.base().local
    }

    fn set_local_transform(&mut self, transform: Transform) {
        self.base_mut().local = transform;
    }

    /// Valid after the last [`update_world_transforms`](Self::update_world_transforms).
    fn world_transform(&self) -> Matrix4<f32> {
        self.base().world
    }

    fn update_world_transforms(&mut self, parent: &Matrix4<f32>) {
        let base = self.base_mut();
        base.world = parent * base.local.to_matrix();
        let world = base.world;
        for child in base.children.iter_mut() {
            child.update_world_transforms(&world);
        }
    }

    fn children(&self) -> &[Box<dyn SceneNode>] {
        &self.base().children
    }

    fn children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.base_mut().children
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.base_mut().children.push(child);
    }

    fn material(&self) -> Option<MaterialHandle> {
        None
    }

    fn set_material(&mut self, _material: MaterialHandle) {}

    fn geometry(&self) -> Option<&Arc<Geometry>> {
        None
    }

    fn light(&self) -> Option<&Light> {
        None
    }

    fn as_slot(&self) -> Option<&AssetSlot> {
        None
    }

    fn as_slot_mut(&mut self) -> Option<&mut AssetSlot> {
        None
    }

    /// Bounds of this node's own drawable in its local space.
    fn local_bounds(&self) -> Option<Aabb> {
        None
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue, device: &wgpu::Device, cache: &mut GpuCache) {
        for child in self.children_mut().iter_mut() {
            child.write_to_buffers(queue, device, cache);
        }
    }

    fn get_render<'a>(&'a self, materials: &'a MaterialLibrary, cache: &'a GpuCache) -> Render<'a> {
        Render::Composed(
            self.children()
                .iter()
                .map(|child| child.get_render(materials, cache))
                .collect(),
        )
    }

    /// Frees GPU buffers owned by this subtree. Shared meshes and textures
    /// live in the [`GpuCache`] and are released with it.
    fn release(&mut self) {
        for child in self.children_mut().iter_mut() {
            child.release();
        }
    }
}

/// Groups children under one transform.
pub struct ContainerNode {
    base: NodeBase,
}

impl ContainerNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: NodeBase::new(name),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.base.local = transform;
        self
    }

    pub fn with_child(mut self, child: impl SceneNode + 'static) -> Self {
        self.base.children.push(Box::new(child));
        self
    }

    pub fn push(&mut self, child: impl SceneNode + 'static) {
        self.base.children.push(Box::new(child));
    }

    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.base.local
    }
}

impl SceneNode for ContainerNode {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }
}

/// A drawable: shared geometry plus a material handle.
pub struct MeshNode {
    base: NodeBase,
    geometry: Arc<Geometry>,
    material: MaterialHandle,
    render_order: i32,
    instance_buffer: Option<wgpu::Buffer>,
}

impl MeshNode {
    pub fn new(name: impl Into<String>, geometry: Arc<Geometry>, material: MaterialHandle) -> Self {
        Self {
            base: NodeBase::new(name),
            geometry,
            material,
            render_order: 0,
            instance_buffer: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.base.local = transform;
        self
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.base.local.position = Vector3::new(x, y, z);
        self
    }

    pub fn with_euler(mut self, x: f32, y: f32, z: f32) -> Self {
        self.base.local = self.base.local.with_euler(x, y, z);
        self
    }

    pub fn with_scale(mut self, x: f32, y: f32, z: f32) -> Self {
        self.base.local = self.base.local.with_scale(x, y, z);
        self
    }

    /// Draw order within its batch; lower draws first.
    pub fn with_render_order(mut self, order: i32) -> Self {
        self.render_order = order;
        self
    }

    pub fn render_order(&self) -> i32 {
        self.render_order
    }
}

impl SceneNode for MeshNode {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn material(&self) -> Option<MaterialHandle> {
        Some(self.material)
    }

    fn set_material(&mut self, material: MaterialHandle) {
        self.material = material;
    }

    fn geometry(&self) -> Option<&Arc<Geometry>> {
        Some(&self.geometry)
    }

    fn local_bounds(&self) -> Option<Aabb> {
        self.geometry.bounds()
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue, device: &wgpu::Device, cache: &mut GpuCache) {
        cache.mesh(device, &self.geometry);
        let raw = [TransformRaw::from_matrix(&self.base.world)];
        match &self.instance_buffer {
            Some(buffer) => queue.write_buffer(buffer, 0, bytemuck::cast_slice(&raw)),
            None => {
                self.instance_buffer =
                    Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&format!("{} Instance Buffer", self.base.name)),
                        contents: bytemuck::cast_slice(&raw),
                        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    }))
            }
        }
        for child in self.base.children.iter_mut() {
            child.write_to_buffers(queue, device, cache);
        }
    }

    fn get_render<'a>(&'a self, materials: &'a MaterialLibrary, cache: &'a GpuCache) -> Render<'a> {
        let own = match (
            cache.mesh_for(self.geometry.id()),
            materials.bind_group(self.material),
            self.instance_buffer.as_ref(),
        ) {
            (Some(mesh), Some(material), Some(instance)) if mesh.num_elements > 0 => {
                let key = materials.pipeline_key(self.material);
                let instanced = Instanced {
                    instance,
                    mesh,
                    material,
                    key,
                    render_order: self.render_order,
                    origin: self.base.world.w.truncate(),
                    amount: 1,
                };
                if key.blend {
                    Render::Transparent(instanced)
                } else {
                    Render::Default(instanced)
                }
            }
            _ => Render::None,
        };
        let mut renders = vec![own];
        renders.extend(
            self.base
                .children
                .iter()
                .map(|child| child.get_render(materials, cache)),
        );
        Render::Composed(renders)
    }

    fn release(&mut self) {
        if let Some(buffer) = self.instance_buffer.take() {
            buffer.destroy();
        }
        for child in self.base.children.iter_mut() {
            child.release();
        }
    }
}

/// Carries a [`Light`] at its world position.
pub struct LightNode {
    base: NodeBase,
    light: Light,
}

impl LightNode {
    pub fn new(name: impl Into<String>, light: Light) -> Self {
        Self {
            base: NodeBase::new(name),
            light,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.base.local = transform;
        self
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.base.local.position = Vector3::new(x, y, z);
        self
    }
}

impl SceneNode for LightNode {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn light(&self) -> Option<&Light> {
        Some(&self.light)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u32);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadState {
    Pending,
    Ready,
    Failed(String),
    Cancelled,
}

/// Stand-in for content that is still loading. Shows an optional
/// placeholder while pending, the loaded subtree once ready and nothing
/// after a failure or cancellation.
pub struct AssetSlot {
    base: NodeBase,
    id: SlotId,
    state: LoadState,
}

impl AssetSlot {
    pub fn new(name: impl Into<String>, id: SlotId, placeholder: Option<Box<dyn SceneNode>>) -> Self {
        let mut base = NodeBase::new(name);
        base.children.extend(placeholder);
        Self {
            base,
            id,
            state: LoadState::Pending,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.base.local = transform;
        self
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    fn clear(&mut self) {
        for mut child in self.base.children.drain(..) {
            child.release();
        }
    }

    /// Swaps the placeholder for `content`. Only a pending slot accepts
    /// content; otherwise it is dropped and `false` returned.
    pub fn fill(&mut self, content: Box<dyn SceneNode>) -> bool {
        if self.state != LoadState::Pending {
            return false;
        }
        self.clear();
        self.base.children.push(content);
        self.state = LoadState::Ready;
        true
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        if self.state == LoadState::Pending {
            self.clear();
            self.state = LoadState::Failed(reason.into());
        }
    }

    pub fn cancel(&mut self) {
        if self.state == LoadState::Pending {
            self.clear();
            self.state = LoadState::Cancelled;
        }
    }
}

impl SceneNode for AssetSlot {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn as_slot(&self) -> Option<&AssetSlot> {
        Some(self)
    }

    fn as_slot_mut(&mut self) -> Option<&mut AssetSlot> {
        Some(self)
    }
}

/// Depth-first pre-order visit of `node` and its descendants.
pub fn walk<'a>(node: &'a dyn SceneNode, visit: &mut dyn FnMut(&'a dyn SceneNode, usize)) {
    fn inner<'a>(node: &'a dyn SceneNode, depth: usize, visit: &mut dyn FnMut(&'a dyn SceneNode, usize)) {
        visit(node, depth);
        for child in node.children() {
            inner(child.as_ref(), depth + 1, visit);
        }
    }
    inner(node, 0, visit);
}

pub fn walk_mut(node: &mut dyn SceneNode, visit: &mut dyn FnMut(&mut dyn SceneNode)) {
    visit(node);
    for child in node.children_mut().iter_mut() {
        walk_mut(child.as_mut(), visit);
    }
}

pub fn find_by_name<'a>(node: &'a dyn SceneNode, name: &str) -> Option<&'a dyn SceneNode> {
    if node.name() == name {
        return Some(node);
    }
    node.children()
        .iter()
        .find_map(|child| find_by_name(child.as_ref(), name))
}

pub fn find_slot_mut(node: &mut dyn SceneNode, id: SlotId) -> Option<&mut AssetSlot> {
    if node.as_slot().is_some_and(|slot| slot.id() == id) {
        return node.as_slot_mut();
    }
    node.children_mut()
        .iter_mut()
        .find_map(|child| find_slot_mut(child.as_mut(), id))
}

/// Every light below `node` with its current world matrix.
pub fn collect_lights(node: &dyn SceneNode) -> Vec<LightInstance> {
    let mut lights = Vec::new();
    walk(node, &mut |n, _| {
        if let Some(light) = n.light() {
            lights.push(LightInstance {
                light: *light,
                world: n.world_transform(),
            });
        }
    });
    lights
}

/// Bounds of the whole subtree in the space of `node`'s parent, computed
/// from local transforms (no prior world update needed).
pub fn bounds(node: &dyn SceneNode) -> Option<Aabb> {
    bounds_in(node, &Matrix4::identity())
}

pub fn bounds_in(node: &dyn SceneNode, parent: &Matrix4<f32>) -> Option<Aabb> {
    let world = parent * node.local_transform().to_matrix();
    let own = node.local_bounds().map(|b| b.transformed(&world));
    node.children()
        .iter()
        .filter_map(|child| bounds_in(child.as_ref(), &world))
        .fold(own, |acc, b| Some(acc.map_or(b, |a| a.union(b))))
}

pub fn count_nodes(node: &dyn SceneNode, predicate: &dyn Fn(&dyn SceneNode) -> bool) -> usize {
    let mut count = 0;
    walk(node, &mut |n, _| {
        if predicate(n) {
            count += 1;
        }
    });
    count
}
