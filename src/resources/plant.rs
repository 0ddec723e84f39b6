//! The potted monstera next to the desk.

use std::f32::consts::PI;

use futures::future::try_join_all;
use serde::Deserialize;

use crate::{
    config::Placement,
    data_structures::{
        color::Color,
        material::{Material, TextureSettings, TextureSlot, TextureSource},
    },
    resources::{
        AssetSource,
        classify::{MaterialRoles, PartMatcher},
        gltf::{LoadedModel, load_model},
    },
};

pub const GROUP_PREFIX: &str = "plant";
pub const LEAF_ROLE: &str = "leaf";
pub const VASE_ROLE: &str = "vase";

const TEXTURE_DIR: &str = "/assets/textures/PlantMonstera/";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlantOptions {
    pub model: String,
    /// Colour, roughness, normal and subsurface maps of the leaves.
    pub leaf_maps: [String; 4],
    /// Colour and normal maps of the pot.
    pub vase_maps: [String; 2],
    pub placement: Placement,
    pub leaf_tint: Color,
    pub vase_color: Color,
}

impl Default for PlantOptions {
    fn default() -> Self {
        let texture = |file: &str| format!("{TEXTURE_DIR}{file}");
        Self {
            model: String::from("/assets/models/PlantMonstera.glb"),
            leaf_maps: [
                texture("PlantMonstera001_COL_4K_METALNESS.jpg"),
                texture("PlantMonstera001_ROUGHNESS_4K_METALNESS.jpg"),
                texture("PlantMonstera001_NRM_4K_METALNESS.jpg"),
                texture("PlantMonstera001_SSS_4K_METALNESS.jpg"),
            ],
            vase_maps: [
                texture("PlantMonsteraVase001_COL_4K_METALNESS.jpg"),
                texture("PlantMonsteraVase001_NRM_4K_METALNESS.png"),
            ],
            placement: Placement {
                position: [-2.2, 0.0, -3.5],
                rotation: [0.0, PI / 8.0, 0.0],
                scale: 0.4,
            },
            leaf_tint: Color::from_hex(0x7a9e72),
            vase_color: Color::from_hex(0xe6e3de),
        }
    }
}

/// Leaf and vase maps in the order the options list them.
pub struct PlantTextures {
    pub leaf: Vec<TextureSource>,
    pub vase: Vec<TextureSource>,
}

pub fn plant_roles() -> MaterialRoles {
    MaterialRoles::new()
        .role(
            LEAF_ROLE,
            vec![
                PartMatcher::Contains(String::from("leaf")),
                PartMatcher::Contains(String::from("plant")),
            ],
            false,
        )
        .role(
            VASE_ROLE,
            vec![
                PartMatcher::Contains(String::from("vase")),
                PartMatcher::Contains(String::from("pot")),
            ],
            false,
        )
}

pub fn leaf_material(options: &PlantOptions, maps: &[TextureSource]) -> Material {
    let mut material = Material::standard("plant leaf", options.leaf_tint)
        .with_roughness(0.85)
        .with_metalness(0.05);
    let slots = [
        TextureSlot::Color,
        TextureSlot::Roughness,
        TextureSlot::Normal,
        TextureSlot::Occlusion,
    ];
    for (slot, map) in slots.into_iter().zip(maps) {
        material = material.with_map(slot, map.clone());
    }
    material
}

pub fn vase_material(options: &PlantOptions, maps: &[TextureSource]) -> Material {
    let mut material = Material::standard("plant vase", options.vase_color)
        .with_roughness(0.6)
        .with_metalness(0.1);
    for (slot, map) in [TextureSlot::Color, TextureSlot::Normal].into_iter().zip(maps) {
        material = material.with_map(slot, map.clone());
    }
    material
}

async fn load_batch(source: &AssetSource, paths: &[String]) -> anyhow::Result<Vec<TextureSource>> {
    try_join_all(paths.iter().enumerate().map(|(i, path)| {
        // the first map of each batch is colour
        let settings = if i == 0 {
            TextureSettings::default()
        } else {
            TextureSettings::linear()
        };
        source.load_texture_source(path, settings)
    }))
    .await
}

/// Leaf maps and vase maps load as two concurrent batches, one after the
/// other, then the model.
pub async fn load_plant(source: &AssetSource, options: &PlantOptions) -> anyhow::Result<LoadedModel> {
    let textures = PlantTextures {
        leaf: load_batch(source, &options.leaf_maps).await?,
        vase: load_batch(source, &options.vase_maps).await?,
    };
    let mut model = load_model(source, &options.model).await?;
    dress_plant(&mut model, options, &textures)?;
    Ok(model)
}

/// Leaves and pot get their materials; parts matching neither keep the
/// file's own material.
pub fn dress_plant(model: &mut LoadedModel, options: &PlantOptions, textures: &PlantTextures) -> anyhow::Result<()> {
    plant_roles().apply(
        model,
        GROUP_PREFIX,
        vec![
            (LEAF_ROLE, leaf_material(options, &textures.leaf)),
            (VASE_ROLE, vase_material(options, &textures.vase)),
        ],
    )?;
    Ok(())
}
