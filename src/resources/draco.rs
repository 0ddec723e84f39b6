//! Draco-compressed primitives (`KHR_draco_mesh_compression`).
//!
//! Compressed primitives are decoded before the document is walked, so the
//! rest of the glTF path reads plain attribute arrays. The decoder hands back
//! one buffer: indices first, then every attribute in ascending Draco
//! attribute id.

use std::collections::HashMap;

use anyhow::{Context as _, bail};
use draco_decoder::{AttributeDataType, MeshDecodeConfig};
use gltf::accessor::DataType;

pub const EXTENSION: &str = "KHR_draco_mesh_compression";

/// Decoded primitives keyed by (mesh index, primitive index).
pub type DecodedPrimitives = HashMap<(usize, usize), DecodedPrimitive>;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodedPrimitive {
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub tex_coords: Option<Vec<[f32; 2]>>,
    pub indices: Vec<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DracoAttribute {
    /// Draco attribute id, which fixes the order in the decoded buffer.
    pub id: u32,
    /// glTF semantic name, e.g. `POSITION` or `TEXCOORD_0`.
    pub semantic: String,
    pub components: usize,
    pub data_type: DataType,
}

impl DracoAttribute {
    fn byte_len(&self, vertex_count: usize) -> usize {
        self.components * self.data_type.size() * vertex_count
    }
}

/// Everything needed to decode one compressed primitive.
#[derive(Clone, Debug, PartialEq)]
pub struct DracoPrimitive {
    pub mesh: usize,
    pub primitive: usize,
    pub buffer_view: usize,
    pub vertex_count: u32,
    pub index_count: u32,
    /// Sorted by id.
    pub attributes: Vec<DracoAttribute>,
}

/// Finds every compressed primitive of the document.
pub fn compressed_primitives(document: &gltf::Document) -> anyhow::Result<Vec<DracoPrimitive>> {
    let mut found = Vec::new();
    for mesh in document.meshes() {
        for primitive in mesh.primitives() {
            let Some(extension) = primitive.extension_value(EXTENSION) else {
                continue;
            };
            let what = || format!("mesh {} primitive {}", mesh.index(), primitive.index());
            let buffer_view = extension
                .get("bufferView")
                .and_then(|v| v.as_u64())
                .with_context(|| format!("{}: Draco bufferView missing", what()))?;
            let ids = extension
                .get("attributes")
                .and_then(|v| v.as_object())
                .with_context(|| format!("{}: Draco attributes missing", what()))?;

            let mut attributes = Vec::new();
            for (semantic, accessor) in primitive.attributes() {
                let semantic = semantic.to_string();
                let Some(id) = ids.get(&semantic).and_then(|v| v.as_u64()) else {
                    continue;
                };
                attributes.push(DracoAttribute {
                    id: id as u32,
                    semantic,
                    components: accessor.dimensions().multiplicity(),
                    data_type: accessor.data_type(),
                });
            }
            attributes.sort_by_key(|a| a.id);

            let vertex_count = primitive
                .get(&gltf::Semantic::Positions)
                .with_context(|| format!("{}: POSITION accessor missing", what()))?
                .count();
            found.push(DracoPrimitive {
                mesh: mesh.index(),
                primitive: primitive.index(),
                buffer_view: buffer_view as usize,
                vertex_count: vertex_count as u32,
                index_count: primitive.indices().map_or(0, |a| a.count()) as u32,
                attributes,
            });
        }
    }
    Ok(found)
}

impl DracoPrimitive {
    /// The compressed bytes inside their buffer view.
    pub fn compressed<'a>(&self, document: &gltf::Document, buffers: &'a [Vec<u8>]) -> anyhow::Result<&'a [u8]> {
        let view = document
            .views()
            .nth(self.buffer_view)
            .context("Draco bufferView out of range")?;
        let data = buffers
            .get(view.buffer().index())
            .context("Draco buffer missing")?;
        data.get(view.offset()..view.offset() + view.length())
            .context("Draco bufferView exceeds its buffer")
    }

    pub fn config(&self) -> MeshDecodeConfig {
        let mut config = MeshDecodeConfig::new(self.vertex_count, self.index_count);
        for attribute in &self.attributes {
            config.add_attribute(attribute.components as u32, decoder_type(attribute.data_type));
        }
        config
    }

    fn wide_indices(&self) -> bool {
        self.index_count > u16::MAX as u32
    }

    /// Splits a decoded buffer into indices and the attributes the renderer
    /// uses. Other attributes are skipped.
    pub fn unpack(&self, decoded: &[u8]) -> anyhow::Result<DecodedPrimitive> {
        let vertex_count = self.vertex_count as usize;
        let index_size = if self.wide_indices() { 4 } else { 2 };
        let expected = self.index_count as usize * index_size
            + self
                .attributes
                .iter()
                .map(|a| a.byte_len(vertex_count))
                .sum::<usize>();
        if decoded.len() < expected {
            bail!("decoded Draco mesh has {} bytes, expected {expected}", decoded.len());
        }

        let (index_bytes, mut rest) = decoded.split_at(self.index_count as usize * index_size);
        let indices = if self.wide_indices() {
            index_bytes
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect()
        } else {
            index_bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]) as u32)
                .collect()
        };

        let mut out = DecodedPrimitive {
            indices,
            ..DecodedPrimitive::default()
        };
        for attribute in &self.attributes {
            let (bytes, tail) = rest.split_at(attribute.byte_len(vertex_count));
            rest = tail;
            match attribute.semantic.as_str() {
                "POSITION" => out.positions = read_vec3(attribute, bytes)?,
                "NORMAL" => out.normals = Some(read_vec3(attribute, bytes)?),
                "TEXCOORD_0" => out.tex_coords = Some(read_vec2(attribute, bytes)?),
                _ => {}
            }
        }
        if out.positions.len() != vertex_count {
            bail!("decoded Draco mesh has no positions");
        }
        if out.indices.is_empty() {
            out.indices = (0..self.vertex_count).collect();
        }
        Ok(out)
    }
}

fn decoder_type(data_type: DataType) -> AttributeDataType {
    match data_type {
        DataType::I8 => AttributeDataType::Int8,
        DataType::U8 => AttributeDataType::UInt8,
        DataType::I16 => AttributeDataType::Int16,
        DataType::U16 => AttributeDataType::UInt16,
        DataType::U32 => AttributeDataType::UInt32,
        DataType::F32 => AttributeDataType::Float32,
    }
}

/// Reads one component; integer types are normalised to `[0, 1]` or `[-1, 1]`.
fn component(data_type: DataType, bytes: &[u8]) -> f32 {
    match data_type {
        DataType::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        DataType::U32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32,
        DataType::U16 => u16::from_le_bytes([bytes[0], bytes[1]]) as f32 / u16::MAX as f32,
        DataType::I16 => (i16::from_le_bytes([bytes[0], bytes[1]]) as f32 / i16::MAX as f32).max(-1.0),
        DataType::U8 => bytes[0] as f32 / u8::MAX as f32,
        DataType::I8 => (bytes[0] as i8 as f32 / i8::MAX as f32).max(-1.0),
    }
}

fn read_components<const N: usize>(attribute: &DracoAttribute, bytes: &[u8]) -> anyhow::Result<Vec<[f32; N]>> {
    if attribute.components < N {
        bail!(
            "{} has {} components, expected at least {N}",
            attribute.semantic,
            attribute.components
        );
    }
    let size = attribute.data_type.size();
    Ok(bytes
        .chunks_exact(attribute.components * size)
        .map(|vertex| std::array::from_fn(|i| component(attribute.data_type, &vertex[i * size..])))
        .collect())
}

fn read_vec3(attribute: &DracoAttribute, bytes: &[u8]) -> anyhow::Result<Vec<[f32; 3]>> {
    read_components::<3>(attribute, bytes)
}

fn read_vec2(attribute: &DracoAttribute, bytes: &[u8]) -> anyhow::Result<Vec<[f32; 2]>> {
    read_components::<2>(attribute, bytes)
}

/// Decodes every compressed primitive of the document.
pub async fn decode_primitives(document: &gltf::Document, buffers: &[Vec<u8>]) -> anyhow::Result<DecodedPrimitives> {
    let mut decoded = HashMap::new();
    for primitive in compressed_primitives(document)? {
        let compressed = primitive.compressed(document, buffers)?;
        let config = primitive.config();
        #[cfg(not(target_arch = "wasm32"))]
        let raw = futures::executor::block_on(draco_decoder::decode_mesh(compressed, &config));
        #[cfg(target_arch = "wasm32")]
        let raw = draco_decoder::decode_mesh(compressed, &config).await;
        let raw = raw.with_context(|| {
            format!(
                "cannot decode Draco mesh {} primitive {}",
                primitive.mesh, primitive.primitive
            )
        })?;
        decoded.insert((primitive.mesh, primitive.primitive), primitive.unpack(&raw)?);
    }
    if !decoded.is_empty() {
        log::info!("decoded {} Draco primitive(s)", decoded.len());
    }
    Ok(decoded)
}
