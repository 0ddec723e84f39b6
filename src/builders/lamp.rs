//! A desk lamp with two stacked glossy "pouf" shades on a chrome stem.

use std::sync::Arc;

use serde::Deserialize;

use crate::{
    builders::sanitize,
    data_structures::{
        color::Color,
        geometry::Geometry,
        light::Light,
        material::{Material, MaterialLibrary},
        scene_graph::{ContainerNode, LightNode, MeshNode},
    },
};

pub const CHROME_GROUP: &str = "lamp.chrome";
pub const SHADE_GROUP: &str = "lamp.shade";
pub const INNER_GROUP: &str = "lamp.inner";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PoufLampParams {
    /// Overall height in metres; every dimension scales with it.
    pub height: f32,
    pub color: Color,
    pub intensity: f32,
    pub with_light: bool,
}

impl Default for PoufLampParams {
    fn default() -> Self {
        Self {
            height: 0.65,
            color: Color::from_hex(0xFF7A00),
            intensity: 1.2,
            with_light: true,
        }
    }
}

/// Builds the lamp with its foot on the local origin. The direct children
/// are base, stem, both shades, both inner shells, the spacer and, when
/// enabled, the warm point light.
pub fn build_pouf_lamp(params: &PoufLampParams, materials: &mut MaterialLibrary) -> ContainerNode {
    let height = sanitize(params.height, 0.01, 0.65);
    let k = height / 0.5;

    let base_r = 0.14 * k;
    let base_t = 0.015 * k;
    let stem_r = 0.012 * k;
    let stem_h = 0.30 * k;
    let shade_r = 0.135 * k;
    let shade_y = 0.08 * k;
    let gap = 0.012 * k;
    let shade_t = 0.0028 * k;

    let chrome = materials.add_to_group(
        CHROME_GROUP,
        Material::standard("lamp chrome", Color::WHITE)
            .with_metalness(1.0)
            .with_roughness(0.05)
            .with_clearcoat(1.0, 0.02)
            .with_env_intensity(1.5),
    );
    let shade = materials.add_to_group(
        SHADE_GROUP,
        Material::standard("lamp shade", params.color)
            .with_metalness(0.0)
            .with_roughness(0.22)
            .with_clearcoat(1.0, 0.1)
            .with_sheen(0.5),
    );
    let inner = materials.add_to_group(
        INNER_GROUP,
        Material::standard("lamp inner", Color::WHITE)
            .with_roughness(0.6)
            .with_metalness(0.0)
            .with_transmission(0.55, 0.01 * k)
            .with_emissive(Color::from_hex(0xfff2cc), 0.1),
    );

    let mut lamp = ContainerNode::new("PoufLamp");

    let base = Geometry::cylinder(base_r, base_r, base_t, 64).with_name("lamp base");
    lamp.push(MeshNode::new("base", Arc::new(base), chrome).at(0.0, base_t / 2.0, 0.0));

    let stem = Geometry::cylinder(stem_r, stem_r, stem_h, 48).with_name("lamp stem");
    lamp.push(MeshNode::new("stem", Arc::new(stem), chrome).at(0.0, base_t + stem_h / 2.0, 0.0));

    let shade_bottom_y = base_t + stem_h;
    let bottom_y = shade_bottom_y + shade_y * 0.75;
    let top_y = bottom_y + shade_y + gap;

    let puff = Arc::new(
        Geometry::sphere(shade_r, 96, 64)
            .scaled(1.0, shade_y / shade_r, 1.0)
            .with_name("lamp shade"),
    );
    lamp.push(MeshNode::new("shade_bottom", puff.clone(), shade).at(0.0, bottom_y, 0.0));
    lamp.push(MeshNode::new("shade_top", puff, shade).at(0.0, top_y, 0.0));

    let inner_r = (shade_r - shade_t).max(1e-4);
    let shell = Arc::new(
        Geometry::sphere(inner_r, 72, 48)
            .scaled(1.0, (shade_y - shade_t).max(1e-4) / inner_r, 1.0)
            .with_name("lamp inner shell"),
    );
    lamp.push(MeshNode::new("inner_bottom", shell.clone(), inner).at(0.0, bottom_y, 0.0));
    lamp.push(MeshNode::new("inner_top", shell, inner).at(0.0, top_y, 0.0));

    let spacer_r = stem_r * 1.8;
    let spacer = Geometry::cylinder(spacer_r, spacer_r, gap * 0.8, 48).with_name("lamp spacer");
    lamp.push(MeshNode::new("spacer", Arc::new(spacer), chrome).at(0.0, (bottom_y + top_y) / 2.0, 0.0));

    if params.with_light {
        let warm = Light::point(
            Color::from_hex(0xffe6b0),
            sanitize(params.intensity, 0.0, 1.2),
            shade_r * 3.6,
            2.0,
        );
        lamp.push(LightNode::new("warm_light", warm).at(0.0, bottom_y + (top_y - bottom_y) * 0.5, 0.0));
    }

    lamp
}
