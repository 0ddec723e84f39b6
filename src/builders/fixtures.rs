//! The room shell and its fixed furniture: floor, walls, window, desk, rug
//! and framed posters.
//!
//! Fixtures that show photographs (floor, desk, posters, window backdrop)
//! are built with plain materials; the textures are requested separately and
//! attached to the material groups named here once they arrive.

use std::{f32::consts::PI, sync::Arc};

use serde::Deserialize;

use crate::{
    builders::sanitize,
    data_structures::{
        color::Color,
        geometry::Geometry,
        material::{Material, MaterialLibrary, TextureSettings, TextureSlot, TextureSource},
        scene_graph::{ContainerNode, MeshNode, SceneNode},
        transform::Transform,
    },
    synthesis::rug::RugTextures,
};

pub const FLOOR_GROUP: &str = "floor";
pub const WALL_GROUP: &str = "walls";
pub const WINDOW_FRAME_GROUP: &str = "window.frame";
pub const WINDOW_GLASS_GROUP: &str = "window.glass";
pub const WINDOW_BACKDROP_GROUP: &str = "window.backdrop";
pub const DESK_TOP_GROUP: &str = "desk.top";
pub const DESK_LEG_GROUP: &str = "desk.legs";
pub const RUG_GROUP: &str = "rug";
pub const POSTER_FRAME_GROUP: &str = "poster.frame";

/// Walls sit this far behind the floor edge so they never z-fight with it.
const WALL_EPS: f32 = 0.0005;

/// Group holding the printed material of poster `index`.
pub fn poster_group(index: usize) -> String {
    format!("poster.{index}")
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RoomDims {
    /// Extent along X.
    pub width: f32,
    /// Extent along Z.
    pub depth: f32,
    pub wall_height: f32,
}

impl Default for RoomDims {
    fn default() -> Self {
        Self {
            width: 15.0,
            depth: 12.0,
            wall_height: 6.0,
        }
    }
}

impl RoomDims {
    fn sanitized(&self) -> Self {
        let d = Self::default();
        Self {
            width: sanitize(self.width, 0.5, d.width),
            depth: sanitize(self.depth, 0.5, d.depth),
            wall_height: sanitize(self.wall_height, 0.5, d.wall_height),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct FloorParams {
    pub segments: u32,
    pub y: f32,
    pub roughness: f32,
    pub metalness: f32,
}

impl Default for FloorParams {
    fn default() -> Self {
        Self {
            segments: 128,
            y: -0.03,
            roughness: 0.6,
            metalness: 0.05,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct WallParams {
    pub color: Color,
    pub roughness: f32,
    pub metalness: f32,
}

impl Default for WallParams {
    fn default() -> Self {
        Self {
            color: Color::from_hex(0x888888),
            roughness: 0.8,
            metalness: 0.05,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowParams {
    pub width: f32,
    pub height: f32,
    /// Thickness of the frame bars.
    pub bar: f32,
    pub center_y: f32,
    /// Position along the left wall.
    pub z: f32,
    pub frame_color: Color,
}

impl Default for WindowParams {
    fn default() -> Self {
        Self {
            width: 5.0,
            height: 3.0,
            bar: 0.1,
            center_y: 3.3,
            z: -2.4,
            frame_color: Color::from_hex(0xf0f0f0),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeskParams {
    pub width: f32,
    pub depth: f32,
    pub thickness: f32,
    /// Centre of the top slab.
    pub position: [f32; 3],
    pub leg_size: f32,
    pub leg_height: f32,
    pub leg_inset: f32,
    /// Tint over the wood texture; components above one brighten it.
    pub tint: Color,
    pub leg_color: Color,
}

impl Default for DeskParams {
    fn default() -> Self {
        Self {
            width: 4.5,
            depth: 2.25,
            thickness: 0.1,
            position: [0.0, 1.25, -4.25],
            leg_size: 0.1,
            leg_height: 1.25,
            leg_inset: 0.1,
            tint: Color::linear(1.25, 1.2, 1.1),
            leg_color: Color::from_hex(0x1e1e1e),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RugParams {
    pub width: f32,
    pub depth: f32,
    pub segments: u32,
    pub position: [f32; 3],
    pub roughness: f32,
}

impl Default for RugParams {
    fn default() -> Self {
        Self {
            width: 6.2,
            depth: 3.5,
            segments: 64,
            position: [0.0, 0.004, -4.4],
            roughness: 0.98,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PosterParams {
    pub url: String,
    pub width: f32,
    pub height: f32,
    pub x: f32,
    pub y: f32,
}

impl PosterParams {
    pub fn new(url: &str, width: f32, height: f32, x: f32, y: f32) -> Self {
        Self {
            url: url.to_string(),
            width,
            height,
            x,
            y,
        }
    }
}

pub fn default_posters() -> Vec<PosterParams> {
    vec![
        PosterParams::new("/assets/751195_poster.jpg", 0.8, 1.0, -2.17, 3.2),
        PosterParams::new("/assets/poster2.jpg", 0.7, 0.9, -1.2, 3.27),
        PosterParams::new("/assets/poster3.jpg", 0.9, 1.2, 0.0, 3.37),
        PosterParams::new("/assets/poster4.jpg", 0.8, 1.0, 1.4, 3.17),
        PosterParams::new("/assets/poster5.jpg", 0.7, 0.9, 2.5, 3.27),
    ]
}

pub fn build_floor(dims: &RoomDims, params: &FloorParams, materials: &mut MaterialLibrary) -> ContainerNode {
    let dims = dims.sanitized();
    let segments = params.segments.clamp(1, 512);
    let material = materials.add_to_group(
        FLOOR_GROUP,
        Material::standard("floor", Color::WHITE)
            .with_roughness(params.roughness)
            .with_metalness(params.metalness),
    );
    let plane = Geometry::plane(dims.width, dims.depth, segments, segments).with_name("floor");
    ContainerNode::new("Floor").with_child(
        MeshNode::new("floor", Arc::new(plane), material)
            .at(0.0, if params.y.is_finite() { params.y } else { 0.0 }, 0.0)
            .with_euler(-PI / 2.0, 0.0, 0.0),
    )
}

/// Back wall along -Z and left wall along -X, both seen from either side.
pub fn build_walls(dims: &RoomDims, params: &WallParams, materials: &mut MaterialLibrary) -> ContainerNode {
    let dims = dims.sanitized();
    let material = materials.add_to_group(
        WALL_GROUP,
        Material::standard("wall", params.color)
            .with_roughness(params.roughness)
            .with_metalness(params.metalness)
            .double_sided(),
    );
    let h = dims.wall_height;
    let back = Geometry::plane(dims.width, h, 1, 1).with_name("back wall");
    let left = Geometry::plane(dims.depth, h, 1, 1).with_name("left wall");
    ContainerNode::new("Walls")
        .with_child(MeshNode::new("back_wall", Arc::new(back), material).at(0.0, h / 2.0, -dims.depth / 2.0 - WALL_EPS))
        .with_child(
            MeshNode::new("left_wall", Arc::new(left), material)
                .at(-dims.width / 2.0 - WALL_EPS, h / 2.0, 0.0)
                .with_euler(0.0, PI / 2.0, 0.0),
        )
}

/// Window in the left wall: an unlit outdoor backdrop, a pane of glass and
/// the frame bars. None of them test depth and they draw after the default
/// render order, so the backdrop paints over the wall behind the frame.
pub fn build_window(dims: &RoomDims, params: &WindowParams, materials: &mut MaterialLibrary) -> ContainerNode {
    let dims = dims.sanitized();
    let d = WindowParams::default();
    let w = sanitize(params.width, 0.3, d.width);
    let h = sanitize(params.height, 0.3, d.height);
    let bar = sanitize(params.bar, 0.01, d.bar).min(w.min(h) / 3.0);

    let frame = materials.add_to_group(
        WINDOW_FRAME_GROUP,
        Material::standard("window frame", params.frame_color)
            .with_roughness(0.4)
            .with_metalness(0.1)
            .with_depth(false, true),
    );
    let glass = materials.add_to_group(
        WINDOW_GLASS_GROUP,
        Material::standard("window glass", Color::WHITE)
            .with_opacity(0.1)
            .with_transmission(1.0, 0.03)
            .with_roughness(0.15)
            .double_sided()
            .with_depth(false, true),
    );
    let backdrop = materials.add_to_group(
        WINDOW_BACKDROP_GROUP,
        Material::unlit("window backdrop", Color::WHITE)
            .double_sided()
            .with_depth(false, true),
    );

    let mut window = ContainerNode::new("Window").with_transform(
        Transform::at(-dims.width / 2.0 + 0.02, params.center_y, params.z).with_euler(0.0, PI / 2.0, 0.0),
    );

    let outside = Geometry::plane(w - 0.02, h - 0.02, 1, 1).with_name("window backdrop");
    window.push(
        MeshNode::new("backdrop", Arc::new(outside), backdrop)
            .at(0.0, 0.0, -0.1)
            .with_render_order(1),
    );

    let pane = Geometry::plane(w - bar * 2.0, h - bar * 2.0, 1, 1).with_name("window glass");
    window.push(
        MeshNode::new("glass", Arc::new(pane), glass)
            .at(0.0, 0.0, -bar / 2.0)
            .with_render_order(2),
    );

    let horizontal = Arc::new(Geometry::cuboid(w, bar, bar).with_name("window bar"));
    let vertical = Arc::new(Geometry::cuboid(bar, h, bar).with_name("window post"));
    let middle = Geometry::cuboid(w - bar * 2.0, bar, bar).with_name("window transom");
    let bars = [
        ("bar_top", horizontal.clone(), [0.0, h / 2.0 - bar / 2.0]),
        ("bar_bottom", horizontal, [0.0, -h / 2.0 + bar / 2.0]),
        ("bar_left", vertical.clone(), [-w / 2.0 + bar / 2.0, 0.0]),
        ("bar_right", vertical, [w / 2.0 - bar / 2.0, 0.0]),
        ("bar_middle", Arc::new(middle), [0.0, 0.0]),
    ];
    for (name, geometry, [x, y]) in bars {
        window.push(MeshNode::new(name, geometry, frame).at(x, y, 0.0).with_render_order(3));
    }
    window
}

pub fn build_desk(params: &DeskParams, materials: &mut MaterialLibrary) -> ContainerNode {
    let d = DeskParams::default();
    let width = sanitize(params.width, 0.2, d.width);
    let depth = sanitize(params.depth, 0.2, d.depth);
    let thickness = sanitize(params.thickness, 0.005, d.thickness);
    let leg = sanitize(params.leg_size, 0.005, d.leg_size);
    let leg_h = sanitize(params.leg_height, 0.01, d.leg_height);
    let inset = sanitize(params.leg_inset, 0.0, d.leg_inset);

    let top_material = materials.add_to_group(
        DESK_TOP_GROUP,
        Material::standard("desk top", params.tint)
            .with_roughness(0.68)
            .with_metalness(0.05),
    );
    let leg_material = materials.add_to_group(
        DESK_LEG_GROUP,
        Material::standard("desk legs", params.leg_color)
            .with_roughness(0.8)
            .with_metalness(0.2),
    );

    let [x, y, z] = params.position;
    let top = Geometry::cuboid(width, thickness, depth).with_name("desk top");
    let mut desk = ContainerNode::new("Desk")
        .with_child(MeshNode::new("top", Arc::new(top), top_material).at(x, y, z));

    let leg_geometry = Arc::new(Geometry::cuboid(leg, leg_h, leg).with_name("desk leg"));
    let off_x = width / 2.0 - inset;
    let off_z = depth / 2.0 - inset;
    let leg_y = y - leg_h / 2.0 - 0.025;
    for (i, (sx, sz)) in [(-1.0, 1.0), (1.0, 1.0), (-1.0, -1.0), (1.0, -1.0)].into_iter().enumerate() {
        desk.push(
            MeshNode::new(format!("leg_{i}"), leg_geometry.clone(), leg_material)
                .at(x + sx * off_x, leg_y, z + sz * off_z),
        );
    }
    desk
}

/// The rug with its synthesized colour and normal maps already attached.
pub fn build_rug(params: &RugParams, textures: RugTextures, materials: &mut MaterialLibrary) -> ContainerNode {
    let d = RugParams::default();
    let width = sanitize(params.width, 0.1, d.width);
    let depth = sanitize(params.depth, 0.1, d.depth);
    let segments = params.segments.clamp(1, 256);

    let material = materials.add_to_group(
        RUG_GROUP,
        Material::standard("rug", Color::WHITE)
            .with_roughness(params.roughness)
            .with_metalness(0.0)
            .with_map(TextureSlot::Color, TextureSource::new(textures.color, TextureSettings::default()))
            .with_map(TextureSlot::Normal, TextureSource::new(textures.normal, TextureSettings::linear())),
    );
    let [x, y, z] = params.position;
    let plane = Geometry::plane(width, depth, segments, segments).with_name("rug");
    ContainerNode::new("Rug").with_child(
        MeshNode::new("rug", Arc::new(plane), material)
            .at(x, y, z)
            .with_euler(-PI / 2.0, 0.0, 0.0),
    )
}

/// Framed posters hung on the back wall. Poster `i` uses the material
/// group [`poster_group`]`(i)`.
pub fn build_posters(dims: &RoomDims, posters: &[PosterParams], materials: &mut MaterialLibrary) -> ContainerNode {
    let dims = dims.sanitized();
    let frame = materials.add_to_group(
        POSTER_FRAME_GROUP,
        Material::standard("poster frame", Color::from_hex(0xe0d8c5)).with_roughness(0.8),
    );
    let mut wall = ContainerNode::new("Posters");
    for (i, poster) in posters.iter().enumerate() {
        let w = sanitize(poster.width, 0.01, 0.5);
        let h = sanitize(poster.height, 0.01, 0.5);
        let print = materials.add_to_group(
            &poster_group(i),
            Material::standard(format!("poster {i}"), Color::WHITE)
                .with_roughness(0.5)
                .with_metalness(0.1),
        );
        let border = Geometry::plane(w + 0.05, h + 0.05, 1, 1).with_name("poster frame");
        let sheet = Geometry::plane(w, h, 1, 1).with_name("poster");
        let framed = MeshNode::new(format!("poster_frame_{i}"), Arc::new(border), frame);
        let mut framed = framed.at(poster.x, poster.y, -dims.depth / 2.0);
        framed.add_child(Box::new(MeshNode::new(format!("poster_{i}"), Arc::new(sheet), print).at(0.0, 0.0, 0.01)));
        wall.push(framed);
    }
    wall
}
