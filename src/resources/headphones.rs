//! The headphones on their aluminium stand.
//!
//! The model comes from a glTF file. The stand and body roles give it its
//! materials: the nodes named in [`HeadphoneOptions::stand_nodes`] become
//! brushed aluminium, everything else dark matte. Body parts whose names
//! mark them as cups, band or cushions take the colour variant's palette.

use std::f32::consts::PI;

use anyhow::Context as _;
use cgmath::Vector3;
use serde::Deserialize;

use crate::{
    config::Placement,
    data_structures::{color::Color, material::Material, transform::Transform},
    resources::{
        AssetSource,
        classify::{MaterialRoles, PartMatcher},
        gltf::{LoadedModel, ModelNode, load_model},
    },
};

pub const GROUP_PREFIX: &str = "headphones";
pub const STAND_ROLE: &str = "stand";
pub const BODY_ROLE: &str = "body";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum Variant {
    Silver,
    #[default]
    SpaceGray,
    Green,
    Pink,
    SkyBlue,
    Starlight,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Palette {
    pub alu: Color,
    pub mesh: Color,
    pub cushion: Color,
}

impl Palette {
    /// Colour for a part, by keywords in its name.
    pub fn for_part(&self, name: &str) -> Option<Color> {
        let name = name.to_lowercase();
        let has = |keys: &[&str]| keys.iter().any(|k| name.contains(k));
        if has(&["cup", "shell"]) {
            Some(self.alu)
        } else if has(&["mesh", "band"]) {
            Some(self.mesh)
        } else if has(&["cushion", "ear", "pad"]) {
            Some(self.cushion)
        } else {
            None
        }
    }
}

impl Variant {
    pub fn palette(self) -> Palette {
        let (alu, mesh, cushion) = match self {
            Variant::Silver => (0xDADDE1, 0xEFEFEF, 0xE5E5E5),
            Variant::SpaceGray => (0x9EA3A8, 0xB8BCC2, 0xC4C7CB),
            Variant::Green => (0xC9D3C9, 0xE3E9E3, 0xDDE4DD),
            Variant::Pink => (0xF0C9CC, 0xF6E4E6, 0xF0D9DC),
            Variant::SkyBlue => (0xC9D7E8, 0xE6EEF8, 0xDEE9F5),
            Variant::Starlight => (0xE6DEC7, 0xF2ECDC, 0xEDE6D5),
        };
        Palette {
            alu: Color::from_hex(alu),
            mesh: Color::from_hex(mesh),
            cushion: Color::from_hex(cushion),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct HeadphoneOptions {
    pub path: String,
    /// Uniform scale applied before re-centring.
    pub scale: f32,
    /// Turn applied before re-centring.
    pub rotation_y: f32,
    pub variant: Variant,
    pub metalness: f32,
    pub roughness: f32,
    pub placement: Placement,
    pub stand_nodes: Vec<String>,
    pub stand_color: Color,
    pub body_color: Color,
}

impl Default for HeadphoneOptions {
    fn default() -> Self {
        Self {
            path: String::from("/assets/models/model.glb"),
            scale: 0.077,
            rotation_y: -PI / 10.0,
            variant: Variant::SpaceGray,
            metalness: 1.0,
            roughness: 0.3,
            placement: Placement::at(-2.0, 1.3, -4.75).turned(-PI / 4.0),
            stand_nodes: (6..=12).map(|i| format!("Node{i}")).collect(),
            stand_color: Color::from_hex(0xd8d8d8),
            body_color: Color::from_hex(0x151515),
        }
    }
}

impl HeadphoneOptions {
    pub fn roles(&self) -> MaterialRoles {
        MaterialRoles::new()
            .role(
                STAND_ROLE,
                self.stand_nodes.iter().cloned().map(PartMatcher::Exact).collect(),
                true,
            )
            .fallback_to(BODY_ROLE)
    }

    pub fn stand_material(&self) -> Material {
        Material::standard("headphone stand", self.stand_color)
            .with_roughness(0.38)
            .with_metalness(0.9)
            .with_env_intensity(0.2)
    }

    pub fn body_material(&self) -> Material {
        Material::standard("headphones", self.body_color)
            .with_roughness(0.6)
            .with_metalness(0.25)
            .with_env_intensity(0.4)
    }
}

/// Loads, classifies and re-centres the model. The result sits with its
/// bounding-box centre on the origin.
pub async fn load_headphones(source: &AssetSource, options: &HeadphoneOptions) -> anyhow::Result<LoadedModel> {
    let mut model = load_model(source, &options.path).await?;
    assign_materials(&mut model, options)?;
    recenter(&mut model, options.scale, options.rotation_y).context("headphone model has no geometry")?;
    Ok(model)
}

/// Replaces every material with the stand or body material. Body parts the
/// palette has a colour for get a body material in that colour with the
/// configured metal finish.
pub fn assign_materials(model: &mut LoadedModel, options: &HeadphoneOptions) -> anyhow::Result<()> {
    options.roles().apply(
        model,
        GROUP_PREFIX,
        vec![
            (STAND_ROLE, options.stand_material()),
            (BODY_ROLE, options.body_material()),
        ],
    )?;

    let palette = options.variant.palette();
    let body_group = format!("{GROUP_PREFIX}.{BODY_ROLE}");
    let painted: Vec<Option<Color>> = model
        .parts()
        .iter()
        .map(|part| {
            let group = part
                .material
                .and_then(|i| model.materials.get(i))
                .and_then(|m| m.group.as_deref());
            if group == Some(body_group.as_str()) {
                palette.for_part(&part.name)
            } else {
                None
            }
        })
        .collect();

    let mut materials: Vec<(Color, usize)> = Vec::new();
    for color in painted.iter().flatten() {
        if materials.iter().all(|(c, _)| c != color) {
            let material = Material {
                color: *color,
                metalness: options.metalness,
                roughness: options.roughness,
                ..options.body_material()
            };
            materials.push((*color, model.add_material(material, Some(&body_group))));
        }
    }
    model.for_each_part_mut(&mut |index, part| {
        let color = painted.get(index).copied().flatten();
        if let Some((_, material)) = materials.iter().find(|(c, _)| Some(*c) == color) {
            part.material = Some(*material);
        }
    });
    Ok(())
}

/// Wraps the roots in one node that scales, turns and shifts the model so
/// the centre of its bounds lands on the origin. Returns the centre that was
/// removed, `None` for empty models.
pub fn recenter(model: &mut LoadedModel, scale: f32, rotation_y: f32) -> Option<Vector3<f32>> {
    let turned = Transform::new()
        .with_euler(0.0, rotation_y, 0.0)
        .with_uniform_scale(scale);
    let bounds = model.bounds()?.transformed(&turned.to_matrix());
    let center: Vector3<f32> = bounds.center();
    let wrapper = ModelNode {
        name: String::from("centred"),
        transform: Transform {
            position: -center,
            ..turned
        },
        parts: Vec::new(),
        children: std::mem::take(&mut model.roots),
    };
    model.roots = vec![wrapper];
    Some(center)
}
