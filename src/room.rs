//! Puts the whole studio together from a [`RoomLayout`].
//!
//! Everything procedural is built right away. Whatever has to be fetched
//! comes back as an [`AssetRequest`]; models get an [`AssetSlot`] in the
//! graph that shows a placeholder box until the session fills it.

use std::sync::Arc;

use crate::{
    builders::{
        book::build_portfolio_book,
        chair::build_chair,
        fixtures::{
            self, DESK_TOP_GROUP, FLOOR_GROUP, WINDOW_BACKDROP_GROUP, build_desk, build_floor, build_posters,
            build_rug, build_walls, build_window,
        },
        lamp::build_pouf_lamp,
        shelf::build_shelf,
    },
    config::{LightPlacement, RecolorRule, RoomLayout},
    data_structures::{
        geometry::Geometry,
        material::{MaterialLibrary, TextureSettings, TextureSlot, Wrap},
        scene_graph::{AssetSlot, ContainerNode, LightNode, MeshNode, SceneNode, SlotId, find_slot_mut},
        transform::Transform,
    },
    resources::{gltf::LoadedModel, headphones::HeadphoneOptions, plant::PlantOptions},
    synthesis::rug::synthesize_rug,
};

pub const HEADPHONES_SLOT: SlotId = SlotId(0);
pub const PLANT_SLOT: SlotId = SlotId(1);

/// Something the room needs that has to be loaded first.
#[derive(Clone, Debug, PartialEq)]
pub enum AssetRequest {
    /// An image for one map slot of every material in `group`.
    Texture {
        path: String,
        group: String,
        slot: TextureSlot,
        settings: TextureSettings,
    },
    Environment { path: String },
    /// Font for the book cover lettering.
    CoverFont { path: String },
    Headphones { slot: SlotId, options: HeadphoneOptions },
    Plant { slot: SlotId, options: PlantOptions },
}

impl AssetRequest {
    pub fn label(&self) -> String {
        match self {
            AssetRequest::Texture { path, group, .. } => format!("{group} texture {path}"),
            AssetRequest::Environment { path } => format!("environment {path}"),
            AssetRequest::CoverFont { path } => format!("cover font {path}"),
            AssetRequest::Headphones { options, .. } => format!("headphones {}", options.path),
            AssetRequest::Plant { options, .. } => format!("plant {}", options.model),
        }
    }
}

pub struct RoomAssembly {
    pub root: ContainerNode,
    pub requests: Vec<AssetRequest>,
}

pub fn assemble_room(layout: &RoomLayout, materials: &mut MaterialLibrary) -> RoomAssembly {
    let mut root = ContainerNode::new("Studio");
    let mut requests = Vec::new();

    root.push(build_floor(&layout.room, &layout.floor, materials));
    root.push(build_walls(&layout.room, &layout.walls, materials));
    root.push(build_window(&layout.room, &layout.window, materials));
    root.push(build_desk(&layout.desk, materials));
    root.push(build_rug(&layout.rug, synthesize_rug(), materials));
    root.push(build_posters(&layout.room, &layout.posters, materials));

    root.push(
        build_chair(&layout.chair, materials).with_transform(layout.chair_placement.to_transform()),
    );
    root.push(
        build_pouf_lamp(&layout.lamp, materials).with_transform(layout.lamp_placement.to_transform()),
    );
    root.push(
        build_portfolio_book(&layout.book, materials).with_transform(layout.book_placement.to_transform()),
    );
    if let Some(shelf) = &layout.shelf {
        root.push(build_shelf(shelf, materials).with_transform(layout.shelf_placement.to_transform()));
    }

    let mut lights = ContainerNode::new("Lights");
    for placement in &layout.lights {
        lights.push(light_node(placement));
    }
    root.push(lights);

    let assets = &layout.assets;
    let group_maps = [(FLOOR_GROUP, &assets.floor_maps), (DESK_TOP_GROUP, &assets.desk_maps)];
    for (group, maps) in group_maps {
        requests.extend(maps.iter().map(|map| AssetRequest::Texture {
            path: map.path.clone(),
            group: group.to_string(),
            slot: map.slot,
            settings: map.settings,
        }));
    }
    for (i, poster) in layout.posters.iter().enumerate() {
        requests.push(AssetRequest::Texture {
            path: poster.url.clone(),
            group: fixtures::poster_group(i),
            slot: TextureSlot::Color,
            settings: clamped(),
        });
    }
    if let Some(path) = &assets.window_backdrop {
        requests.push(AssetRequest::Texture {
            path: path.clone(),
            group: WINDOW_BACKDROP_GROUP.to_string(),
            slot: TextureSlot::Color,
            settings: clamped(),
        });
    }
    if let Some(path) = &assets.environment {
        requests.push(AssetRequest::Environment { path: path.clone() });
    }
    if layout.book.with_text {
        if let Some(path) = &assets.cover_font {
            requests.push(AssetRequest::CoverFont { path: path.clone() });
        }
    }

    if let Some(options) = &layout.headphones {
        let placeholder = placeholder_box(materials, [0.25, 0.3, 0.2], 0.0);
        root.push(
            AssetSlot::new("Headphones", HEADPHONES_SLOT, Some(placeholder))
                .with_transform(options.placement.to_transform()),
        );
        requests.push(AssetRequest::Headphones {
            slot: HEADPHONES_SLOT,
            options: options.clone(),
        });
    }
    if let Some(options) = &layout.plant {
        // the plant model stands on its origin
        let placeholder = placeholder_box(materials, [1.0, 2.5, 1.0], 1.25);
        root.push(
            AssetSlot::new("Plant", PLANT_SLOT, Some(placeholder)).with_transform(options.placement.to_transform()),
        );
        requests.push(AssetRequest::Plant {
            slot: PLANT_SLOT,
            options: options.clone(),
        });
    }

    for rule in apply_recolor(&layout.recolor, materials) {
        // model groups only exist once their load finishes
        log::debug!("recolour rule matches no material group `{}` yet", rule.group);
    }

    log::info!(
        "assembled room with {} materials and {} pending assets",
        materials.len(),
        requests.len()
    );
    RoomAssembly { root, requests }
}

fn light_node(placement: &LightPlacement) -> LightNode {
    let [x, y, z] = placement.position;
    let [rx, ry, rz] = placement.rotation;
    LightNode::new(placement.name.clone(), placement.light)
        .with_transform(Transform::at(x, y, z).with_euler(rx, ry, rz))
}

fn clamped() -> TextureSettings {
    TextureSettings {
        wrap: Wrap::Clamp,
        ..TextureSettings::default()
    }
}

fn placeholder_box(materials: &mut MaterialLibrary, [w, h, d]: [f32; 3], lift: f32) -> Box<dyn SceneNode> {
    let geometry = Geometry::cuboid(w, h, d).with_name("placeholder");
    Box::new(MeshNode::new("placeholder", Arc::new(geometry), materials.placeholder()).at(0.0, lift, 0.0))
}

/// Applies every rule to the materials present now and returns the rules
/// that matched nothing.
pub fn apply_recolor<'a>(rules: &'a [RecolorRule], materials: &mut MaterialLibrary) -> Vec<&'a RecolorRule> {
    rules
        .iter()
        .filter(|rule| materials.recolor_group(&rule.group, rule.color) == 0)
        .collect()
}

/// Instantiates a loaded model into `slot`, then re-applies the recolour
/// rules so groups the model brought pick them up. Returns false when the
/// slot is gone or no longer accepts content.
pub fn place_model(
    root: &mut ContainerNode,
    slot: SlotId,
    model: LoadedModel,
    materials: &mut MaterialLibrary,
    rules: &[RecolorRule],
) -> bool {
    let name = model.name.clone();
    let content = model.instantiate(materials);
    let placed = match find_slot_mut(root, slot) {
        Some(target) => target.fill(Box::new(content)),
        None => {
            log::warn!("no slot {slot:?} for {name}");
            return false;
        }
    };
    if !placed {
        log::warn!("slot for {name} no longer accepts content");
        return false;
    }
    apply_recolor(rules, materials);
    true
}
