//! Wall shelving: evenly spaced boards carried by L-shaped brackets.

use std::sync::Arc;

use serde::Deserialize;

use crate::{
    builders::sanitize,
    data_structures::{
        color::Color,
        geometry::Geometry,
        material::{Material, MaterialLibrary},
        scene_graph::{ContainerNode, MeshNode},
    },
};

pub const BOARD_GROUP: &str = "shelf.boards";
pub const BRACKET_GROUP: &str = "shelf.brackets";

const MAX_LEVELS: u32 = 8;
const BRACKET_BAR: f32 = 0.02;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShelfParams {
    pub width: f32,
    pub depth: f32,
    pub board_thickness: f32,
    pub levels: u32,
    /// Vertical distance between neighbouring boards.
    pub spacing: f32,
    pub board_color: Color,
    pub bracket_color: Color,
}

impl Default for ShelfParams {
    fn default() -> Self {
        Self {
            width: 1.6,
            depth: 0.28,
            board_thickness: 0.03,
            levels: 3,
            spacing: 0.42,
            board_color: Color::from_hex(0xc9a77c),
            bracket_color: Color::from_hex(0x1e1e1e),
        }
    }
}

/// Builds the shelf with its back edge on the local XY plane (the wall) and
/// the lowest board's top at `y = 0`. Boards extend towards +Z.
pub fn build_shelf(params: &ShelfParams, materials: &mut MaterialLibrary) -> ContainerNode {
    let defaults = ShelfParams::default();
    let width = sanitize(params.width, 0.1, defaults.width);
    let depth = sanitize(params.depth, 0.05, defaults.depth);
    let thickness = sanitize(params.board_thickness, 0.005, defaults.board_thickness);
    let spacing = sanitize(params.spacing, thickness * 2.0, defaults.spacing);
    let levels = params.levels.clamp(1, MAX_LEVELS);

    let wood = materials.add_to_group(
        BOARD_GROUP,
        Material::standard("shelf board", params.board_color)
            .with_roughness(0.7)
            .with_metalness(0.0),
    );
    let steel = materials.add_to_group(
        BRACKET_GROUP,
        Material::standard("shelf bracket", params.bracket_color)
            .with_roughness(0.5)
            .with_metalness(0.6),
    );

    let board = Arc::new(Geometry::cuboid(width, thickness, depth).with_name("shelf board"));
    let drop = (spacing * 0.3).min(0.15);
    let upright = Arc::new(Geometry::cuboid(BRACKET_BAR, drop, BRACKET_BAR).with_name("bracket upright"));
    let arm = Arc::new(Geometry::cuboid(BRACKET_BAR, BRACKET_BAR, depth * 0.8).with_name("bracket arm"));
    let inset = width / 2.0 - width.min(0.6) * 0.25;

    let mut shelf = ContainerNode::new("Shelf");
    for level in 0..levels {
        let top = level as f32 * spacing;
        let under = top - thickness;
        let mut tier = ContainerNode::new(format!("level_{level}"));
        tier.push(MeshNode::new("board", board.clone(), wood).at(0.0, top - thickness / 2.0, depth / 2.0));
        for x in [-inset, inset] {
            tier.push(
                MeshNode::new("bracket_upright", upright.clone(), steel)
                    .at(x, under - drop / 2.0, BRACKET_BAR / 2.0),
            );
            tier.push(
                MeshNode::new("bracket_arm", arm.clone(), steel)
                    .at(x, under - BRACKET_BAR / 2.0, depth * 0.4),
            );
        }
        shelf.push(tier);
    }
    shelf
}
