//! glTF decoding into a CPU-side model.
//!
//! Loading happens off the render thread, so the result is plain data:
//! geometry behind `Arc`, materials as descriptions. [`LoadedModel::instantiate`]
//! turns it into scene nodes once it reaches the render thread.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use anyhow::{Context as _, bail};
use cgmath::{Matrix4, Quaternion, SquareMatrix, Vector3};

use crate::{
    data_structures::{
        color::Color,
        geometry::{Aabb, Geometry},
        material::{
            ColorSpace, Material, MaterialHandle, MaterialLibrary, TextureSettings, TextureSlot,
            TextureSource, Wrap,
        },
        model::ModelVertex,
        scene_graph::{ContainerNode, MeshNode, SceneNode},
        transform::Transform,
    },
    resources::{
        AssetSource, asset_dir, decode_texture,
        draco::{self, DecodedPrimitive, DecodedPrimitives},
        is_remote, normalize_asset_path,
    },
};

/// One drawable primitive of a model.
#[derive(Clone, Debug)]
pub struct ModelPart {
    /// Name of the owning node, or of its mesh when the node is unnamed.
    pub name: String,
    pub geometry: Arc<Geometry>,
    /// Index into [`LoadedModel::materials`].
    pub material: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct ModelNode {
    pub name: String,
    pub transform: Transform,
    pub parts: Vec<ModelPart>,
    pub children: Vec<ModelNode>,
}

#[derive(Clone, Debug)]
pub struct ModelMaterial {
    pub material: Material,
    /// Group the material joins in the library when instantiated.
    pub group: Option<String>,
}

#[derive(Clone, Debug)]
pub struct LoadedModel {
    pub name: String,
    pub roots: Vec<ModelNode>,
    pub materials: Vec<ModelMaterial>,
}

impl LoadedModel {
    /// Adds a material and returns its index.
    pub fn add_material(&mut self, material: Material, group: Option<&str>) -> usize {
        self.materials.push(ModelMaterial {
            material,
            group: group.map(str::to_string),
        });
        self.materials.len() - 1
    }

    /// Every part in depth-first order; the position in this list is the
    /// part index.
    pub fn parts(&self) -> Vec<&ModelPart> {
        fn collect<'a>(node: &'a ModelNode, out: &mut Vec<&'a ModelPart>) {
            out.extend(node.parts.iter());
            for child in &node.children {
                collect(child, out);
            }
        }
        let mut out = Vec::new();
        for root in &self.roots {
            collect(root, &mut out);
        }
        out
    }

    /// Visits parts mutably in the same order as [`parts`](Self::parts).
    pub fn for_each_part_mut(&mut self, visit: &mut dyn FnMut(usize, &mut ModelPart)) {
        fn inner(node: &mut ModelNode, index: &mut usize, visit: &mut dyn FnMut(usize, &mut ModelPart)) {
            for part in node.parts.iter_mut() {
                visit(*index, part);
                *index += 1;
            }
            for child in node.children.iter_mut() {
                inner(child, index, visit);
            }
        }
        let mut index = 0;
        for root in self.roots.iter_mut() {
            inner(root, &mut index, visit);
        }
    }

    /// Bounds of all parts in model space.
    pub fn bounds(&self) -> Option<Aabb> {
        fn inner(node: &ModelNode, parent: &Matrix4<f32>) -> Option<Aabb> {
            let world = parent * node.transform.to_matrix();
            let own = node
                .parts
                .iter()
                .filter_map(|p| p.geometry.bounds())
                .map(|b| b.transformed(&world))
                .reduce(Aabb::union);
            node.children
                .iter()
                .filter_map(|c| inner(c, &world))
                .fold(own, |acc, b| Some(acc.map_or(b, |a| a.union(b))))
        }
        self.roots
            .iter()
            .filter_map(|r| inner(r, &Matrix4::identity()))
            .reduce(Aabb::union)
    }

    /// Registers the materials and builds the node tree. Parts without a
    /// material share the library's default.
    pub fn instantiate(self, materials: &mut MaterialLibrary) -> ContainerNode {
        let handles: Vec<_> = self
            .materials
            .into_iter()
            .map(|m| match m.group {
                Some(group) => materials.add_to_group(&group, m.material),
                None => materials.add(m.material),
            })
            .collect();
        let mut fallback = None;
        let mut root = ContainerNode::new(self.name);
        for node in self.roots {
            root.add_child(build_node(node, &handles, &mut fallback, materials));
        }
        root
    }
}

fn build_node(
    node: ModelNode,
    handles: &[MaterialHandle],
    fallback: &mut Option<MaterialHandle>,
    materials: &mut MaterialLibrary,
) -> Box<dyn SceneNode> {
    let mut container = ContainerNode::new(node.name).with_transform(node.transform);
    for part in node.parts {
        let handle = match part.material.and_then(|i| handles.get(i)) {
            Some(&handle) => handle,
            None => *fallback.get_or_insert_with(|| materials.add(Material::standard("gltf default", Color::WHITE))),
        };
        container.push(MeshNode::new(part.name, part.geometry, handle));
    }
    for child in node.children {
        container.add_child(build_node(child, handles, fallback, materials));
    }
    Box::new(container)
}

/// Fetches a `.glb`/`.gltf` file with its external buffers and images and
/// decodes it.
pub async fn load_model(source: &AssetSource, path: &str) -> anyhow::Result<LoadedModel> {
    let path = normalize_asset_path(path);
    log::info!("loading model {path}");
    let bytes = source.load_binary(&path).await?;
    let gltf = ::gltf::Gltf::from_slice_without_validation(&bytes)
        .with_context(|| format!("{path} is not a glTF file"))?;
    let blob = gltf.blob;
    let document = validate(gltf.document).with_context(|| format!("{path} is not a valid glTF file"))?;

    let base = asset_dir(&path);
    let mut buffers = Vec::new();
    for buffer in document.buffers() {
        match buffer.source() {
            ::gltf::buffer::Source::Bin => {
                let blob = blob.as_deref().context("binary chunk missing")?;
                buffers.push(blob.to_vec());
            }
            ::gltf::buffer::Source::Uri(uri) => {
                buffers.push(source.load_binary(&resolve_uri(base, uri)).await?);
            }
        }
    }

    let mut images = Vec::new();
    for image in document.images() {
        let bytes = match image.source() {
            ::gltf::image::Source::View { view, .. } => {
                let data = buffers.get(view.buffer().index()).context("image buffer missing")?;
                let start = view.offset();
                data.get(start..start + view.length())
                    .context("image view out of range")?
                    .to_vec()
            }
            ::gltf::image::Source::Uri { uri, .. } => source.load_binary(&resolve_uri(base, uri)).await?,
        };
        images.push(bytes);
    }

    let compressed = draco::decode_primitives(&document, &buffers).await?;
    let name = path.rsplit('/').next().unwrap_or("model").to_string();
    decode_with(&name, &document, &buffers, &images, &compressed)
}

/// Validates a document that may use Draco compression. Compressed
/// primitives point at accessors without a bufferView, which plain glTF
/// validation rejects.
pub fn validate(document: ::gltf::Document) -> anyhow::Result<::gltf::Document> {
    use ::gltf::json::{
        Path,
        validation::{Error, Validate},
    };

    let mut root = document.into_json();
    root.extensions_required.retain(|e| e != draco::EXTENSION);

    let mut compressed = HashSet::new();
    for primitive in root.meshes.iter().flat_map(|m| &m.primitives) {
        let is_draco = primitive
            .extensions
            .as_ref()
            .is_some_and(|e| e.others.contains_key(draco::EXTENSION));
        if is_draco {
            compressed.extend(primitive.attributes.values().map(|a| a.value()));
            compressed.extend(primitive.indices.map(|a| a.value()));
        }
    }
    let exempt = compressed
        .iter()
        .map(|i| format!("accessors[{i}].bufferView"))
        .collect::<HashSet<_>>();

    let mut errors = Vec::new();
    root.validate(&root, Path::new, &mut |path: &dyn Fn() -> Path, error| {
        let path = path();
        if !(error == Error::Missing && exempt.contains(path.as_str())) {
            errors.push((path, error));
        }
    });
    if !errors.is_empty() {
        return Err(::gltf::Error::Validation(errors).into());
    }
    Ok(::gltf::Document::from_json_without_validation(root))
}

fn resolve_uri(base: &str, uri: &str) -> String {
    if is_remote(uri) || uri.starts_with('/') {
        uri.to_string()
    } else {
        format!("{base}{uri}")
    }
}

/// Decodes an already fetched document. `images` holds the encoded bytes of
/// every image in document order.
pub fn decode(
    name: &str,
    document: &::gltf::Document,
    buffers: &[Vec<u8>],
    images: &[Vec<u8>],
) -> anyhow::Result<LoadedModel> {
    decode_with(name, document, buffers, images, &DecodedPrimitives::new())
}

/// Like [`decode`], reading compressed primitives from `compressed`.
pub fn decode_with(
    name: &str,
    document: &::gltf::Document,
    buffers: &[Vec<u8>],
    images: &[Vec<u8>],
    compressed: &DecodedPrimitives,
) -> anyhow::Result<LoadedModel> {
    let mut textures = TextureCache {
        images,
        decoded: HashMap::new(),
    };
    let materials = document
        .materials()
        .map(|m| {
            Ok(ModelMaterial {
                material: convert_material(&m, &mut textures)?,
                group: None,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .context("model contains no scene")?;
    let roots = scene
        .nodes()
        .map(|node| convert_node(&node, buffers, compressed))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(LoadedModel {
        name: name.to_string(),
        roots,
        materials,
    })
}

fn convert_node(
    node: &::gltf::Node,
    buffers: &[Vec<u8>],
    compressed: &DecodedPrimitives,
) -> anyhow::Result<ModelNode> {
    let (t, r, s) = node.transform().decomposed();
    let transform = Transform {
        position: Vector3::from(t),
        rotation: Quaternion::new(r[3], r[0], r[1], r[2]),
        scale: Vector3::from(s),
    };
    let name = node
        .name()
        .or_else(|| node.mesh().and_then(|m| m.name()))
        .map(str::to_string)
        .unwrap_or_else(|| format!("node_{}", node.index()));

    let mut parts = Vec::new();
    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if primitive.mode() != ::gltf::mesh::Mode::Triangles {
                log::warn!("{name}: skipping primitive with mode {:?}", primitive.mode());
                continue;
            }
            let geometry = match compressed.get(&(mesh.index(), primitive.index())) {
                Some(decoded) => decoded_geometry(&name, decoded)?,
                None => convert_primitive(&name, &primitive, buffers)?,
            };
            parts.push(ModelPart {
                name: name.clone(),
                geometry: Arc::new(geometry),
                material: primitive.material().index(),
            });
        }
    }
    let children = node
        .children()
        .map(|child| convert_node(&child, buffers, compressed))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(ModelNode {
        name,
        transform,
        parts,
        children,
    })
}

fn convert_primitive(
    name: &str,
    primitive: &::gltf::Primitive,
    buffers: &[Vec<u8>],
) -> anyhow::Result<Geometry> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .with_context(|| format!("{name}: primitive has no positions"))?
        .collect();
    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(Iterator::collect);
    let uvs: Option<Vec<[f32; 2]>> = reader.read_tex_coords(0).map(|t| t.into_f32().collect());

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    build_geometry(name, &positions, normals.as_deref(), uvs.as_deref(), indices)
}

fn decoded_geometry(name: &str, decoded: &DecodedPrimitive) -> anyhow::Result<Geometry> {
    build_geometry(
        name,
        &decoded.positions,
        decoded.normals.as_deref(),
        decoded.tex_coords.as_deref(),
        decoded.indices.clone(),
    )
}

fn build_geometry(
    name: &str,
    positions: &[[f32; 3]],
    normals: Option<&[[f32; 3]]>,
    uvs: Option<&[[f32; 2]]>,
    indices: Vec<u32>,
) -> anyhow::Result<Geometry> {
    let vertices = positions
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let uv = uvs.and_then(|u| u.get(i)).copied().unwrap_or([0.0; 2]);
            let n = normals.and_then(|n| n.get(i)).copied().unwrap_or([0.0; 3]);
            ModelVertex::new(p, uv, n)
        })
        .collect::<Vec<_>>();
    if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
        bail!("{name}: index {bad} out of range");
    }

    let mut geometry = Geometry::new(name, vertices, indices);
    if normals.is_none() {
        geometry.compute_vertex_normals();
    }
    geometry.compute_tangents();
    Ok(geometry)
}

struct TextureCache<'a> {
    images: &'a [Vec<u8>],
    decoded: HashMap<(usize, bool), TextureSource>,
}

impl TextureCache<'_> {
    fn get(&mut self, texture: &::gltf::Texture, srgb: bool) -> anyhow::Result<TextureSource> {
        let index = texture.source().index();
        if let Some(source) = self.decoded.get(&(index, srgb)) {
            return Ok(source.clone());
        }
        let bytes = self.images.get(index).context("image missing")?;
        let wrap = match texture.sampler().wrap_s() {
            ::gltf::texture::WrappingMode::ClampToEdge => Wrap::Clamp,
            _ => Wrap::Repeat,
        };
        let settings = TextureSettings {
            color_space: if srgb { ColorSpace::Srgb } else { ColorSpace::Linear },
            wrap,
            repeat: [1.0, 1.0],
        };
        let source = decode_texture(bytes, settings)?;
        self.decoded.insert((index, srgb), source.clone());
        Ok(source)
    }
}

fn convert_material(material: &::gltf::Material, textures: &mut TextureCache) -> anyhow::Result<Material> {
    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, a] = pbr.base_color_factor();
    let [er, eg, eb] = material.emissive_factor();
    let name = material.name().unwrap_or("gltf material");
    let mut out = Material::standard(name, Color::linear(r, g, b))
        .with_roughness(pbr.roughness_factor())
        .with_metalness(pbr.metallic_factor())
        .with_emissive(Color::linear(er, eg, eb), 1.0);
    if material.alpha_mode() == ::gltf::material::AlphaMode::Blend {
        out = out.with_opacity(a);
    }
    if material.double_sided() {
        out = out.double_sided();
    }
    if let Some(info) = pbr.base_color_texture() {
        out = out.with_map(TextureSlot::Color, textures.get(&info.texture(), true)?);
    }
    if let Some(info) = pbr.metallic_roughness_texture() {
        out = out.with_map(TextureSlot::Roughness, textures.get(&info.texture(), false)?);
    }
    if let Some(normal) = material.normal_texture() {
        out.normal_scale = normal.scale();
        out = out.with_map(TextureSlot::Normal, textures.get(&normal.texture(), false)?);
    }
    if let Some(occlusion) = material.occlusion_texture() {
        out = out.with_map(TextureSlot::Occlusion, textures.get(&occlusion.texture(), false)?);
    }
    Ok(out)
}
