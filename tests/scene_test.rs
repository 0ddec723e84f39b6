use std::sync::Arc;

use cgmath::{Matrix4, SquareMatrix, Vector3};
use studio_room::{
    builders::{book, chair, fixtures, lamp},
    config::{RecolorRule, RoomLayout},
    data_structures::{
        color::Color,
        geometry::Geometry,
        material::{Material, MaterialLibrary, TextureSettings, TextureSlot, TextureSource},
        scene_graph::{
            AssetSlot, ContainerNode, LoadState, MeshNode, SceneNode, SlotId, bounds, collect_lights, count_nodes,
            find_by_name, find_slot_mut,
        },
        transform::Transform,
    },
    resources::headphones::{self, HeadphoneOptions, assign_materials},
    room::{AssetRequest, HEADPHONES_SLOT, PLANT_SLOT, assemble_room, place_model},
};

use crate::common::test_utils::{assert_sane_bounds, init_logger, mock_model};

mod common;

fn unit_box(lib: &mut MaterialLibrary, name: &str) -> MeshNode {
    let material = lib.add(Material::standard(name, Color::WHITE));
    MeshNode::new(name, Arc::new(Geometry::cuboid(1.0, 1.0, 1.0)), material)
}

#[test]
fn recolour_touches_only_the_group() {
    let mut lib = MaterialLibrary::new();
    let a = lib.add_to_group("chrome", Material::standard("a", Color::WHITE));
    let b = lib.add_to_group("chrome", Material::standard("b", Color::WHITE));
    let c = lib.add_to_group("leather", Material::standard("c", Color::WHITE));
    let red = Color::from_hex(0xff0000);

    assert_eq!(lib.recolor_group("chrome", red), 2);
    assert_eq!(lib.get(a).unwrap().color, red);
    assert_eq!(lib.get(b).unwrap().color, red);
    assert_eq!(lib.get(c).unwrap().color, Color::WHITE);
    assert_eq!(lib.recolor_group("nothing", red), 0);
}

#[test]
fn shared_handles_change_together() {
    let mut lib = MaterialLibrary::new();
    let shared = lib.add(Material::standard("shared", Color::WHITE));
    let geometry = Arc::new(Geometry::cuboid(1.0, 1.0, 1.0));
    let first = MeshNode::new("first", geometry.clone(), shared);
    let second = MeshNode::new("second", geometry, shared);

    lib.update(shared, |m| m.roughness = 0.1);
    assert_eq!(first.material(), second.material());
    assert_eq!(lib.get(first.material().unwrap()).unwrap().roughness, 0.1);
    assert!(lib.is_dirty(shared));
}

#[test]
fn bounds_follow_nested_transforms() {
    let mut lib = MaterialLibrary::new();
    let inner = ContainerNode::new("inner")
        .with_transform(Transform::at(0.0, 2.0, 0.0))
        .with_child(unit_box(&mut lib, "box"));
    let outer = ContainerNode::new("outer")
        .with_transform(Transform::at(1.0, 0.0, 0.0).with_uniform_scale(2.0))
        .with_child(inner);

    let aabb = bounds(&outer).unwrap();
    let center = aabb.center();
    assert!((center.x - 1.0).abs() < 1e-5);
    assert!((center.y - 4.0).abs() < 1e-5);
    assert!((aabb.size().x - 2.0).abs() < 1e-5);
}

#[test]
fn world_transforms_compose_parent_first() {
    let mut lib = MaterialLibrary::new();
    let mut root = ContainerNode::new("root")
        .with_transform(Transform::at(0.0, 1.0, 0.0))
        .with_child(unit_box(&mut lib, "box").at(2.0, 0.0, 0.0));
    root.update_world_transforms(&Matrix4::identity());

    let child = &root.children()[0];
    let origin = child.world_transform().w.truncate();
    assert_eq!(origin, Vector3::new(2.0, 1.0, 0.0));
}

#[test]
fn slot_swaps_placeholder_for_content_once() {
    let mut lib = MaterialLibrary::new();
    let placeholder: Box<dyn SceneNode> = Box::new(unit_box(&mut lib, "placeholder"));
    let mut slot = AssetSlot::new("slot", SlotId(3), Some(placeholder));
    assert_eq!(slot.state(), &LoadState::Pending);
    assert_eq!(slot.children()[0].name(), "placeholder");

    assert!(slot.fill(Box::new(unit_box(&mut lib, "model"))));
    assert_eq!(slot.state(), &LoadState::Ready);
    assert_eq!(slot.children().len(), 1);
    assert_eq!(slot.children()[0].name(), "model");

    assert!(!slot.fill(Box::new(unit_box(&mut lib, "late"))));
    slot.fail("too late");
    assert_eq!(slot.state(), &LoadState::Ready);
}

#[test]
fn failed_slot_renders_nothing() {
    let mut lib = MaterialLibrary::new();
    let placeholder: Box<dyn SceneNode> = Box::new(unit_box(&mut lib, "placeholder"));
    let mut root = ContainerNode::new("root")
        .with_child(AssetSlot::new("slot", SlotId(1), Some(placeholder)))
        .with_child(unit_box(&mut lib, "neighbour"));

    let slot = find_slot_mut(&mut root, SlotId(1)).unwrap();
    slot.fail("404");
    assert_eq!(slot.state(), &LoadState::Failed(String::from("404")));
    assert!(slot.children().is_empty());
    assert!(!slot.fill(Box::new(unit_box(&mut lib, "model"))));

    assert!(find_by_name(&root, "neighbour").is_some());
    assert!(find_slot_mut(&mut root, SlotId(2)).is_none());
}

#[test]
fn cancelled_slot_stays_cancelled() {
    let mut slot = AssetSlot::new("slot", SlotId(0), None);
    slot.cancel();
    slot.fail("after cancel");
    assert_eq!(slot.state(), &LoadState::Cancelled);
}

#[test]
fn default_room_assembles_with_requests() {
    init_logger();
    let layout = RoomLayout::default();
    let mut lib = MaterialLibrary::new();
    let room = assemble_room(&layout, &mut lib);

    assert_sane_bounds(&room.root);
    assert!(find_by_name(&room.root, "PoufLamp").is_some());
    assert!(find_by_name(&room.root, "Shelf").is_some());

    let slots = count_nodes(&room.root, &|n| n.as_slot().is_some());
    assert_eq!(slots, 2);
    assert!(room.requests.iter().any(|r| matches!(r, AssetRequest::Headphones { slot, .. } if *slot == HEADPHONES_SLOT)));
    assert!(room.requests.iter().any(|r| matches!(r, AssetRequest::Plant { slot, .. } if *slot == PLANT_SLOT)));
    assert!(room.requests.iter().any(|r| matches!(r, AssetRequest::Environment { .. })));
    assert!(room.requests.iter().any(|r| matches!(r, AssetRequest::CoverFont { .. })));

    let poster_textures = room
        .requests
        .iter()
        .filter(|r| matches!(r, AssetRequest::Texture { group, slot: TextureSlot::Color, .. } if group.starts_with("poster.")))
        .count();
    assert_eq!(poster_textures, layout.posters.len());
    for request in &room.requests {
        if let AssetRequest::Texture { group, .. } = request {
            assert!(!lib.group(group).is_empty(), "no material in {group}");
        }
    }
}

#[test]
fn room_lights_come_from_the_layout() {
    let layout = RoomLayout::default();
    let mut lib = MaterialLibrary::new();
    let mut room = assemble_room(&layout, &mut lib);
    room.root.update_world_transforms(&Matrix4::identity());

    let lights = collect_lights(&room.root);
    // layout lights plus the one inside the lamp
    let lamp_light = usize::from(layout.lamp.with_light);
    assert_eq!(lights.len(), layout.lights.len() + lamp_light);
    assert!(lights.iter().all(|l| l.is_finite()));
}

#[test]
fn optional_parts_can_be_left_out() {
    let layout = RoomLayout {
        shelf: None,
        headphones: None,
        plant: None,
        recolor: vec![
            RecolorRule {
                group: String::from(chair::LEATHER_GROUP),
                color: Color::from_hex(0x203040),
            },
            RecolorRule {
                group: String::from("no.such.group"),
                color: Color::BLACK,
            },
        ],
        ..RoomLayout::default()
    };
    let mut lib = MaterialLibrary::new();
    let room = assemble_room(&layout, &mut lib);

    assert!(find_by_name(&room.root, "Shelf").is_none());
    assert_eq!(count_nodes(&room.root, &|n| n.as_slot().is_some()), 0);
    assert!(!room.requests.iter().any(|r| matches!(r, AssetRequest::Headphones { .. } | AssetRequest::Plant { .. })));
    for &handle in lib.group(chair::LEATHER_GROUP) {
        assert_eq!(lib.get(handle).unwrap().color, Color::from_hex(0x203040));
    }
    assert!(!lib.group(lamp::SHADE_GROUP).is_empty());
    assert!(!lib.group(book::COVER_GROUP).is_empty());
    assert!(!lib.group(fixtures::FLOOR_GROUP).is_empty());
}

#[test]
fn recolour_rules_reach_models_loaded_later() {
    init_logger();
    let body_group = format!("{}.{}", headphones::GROUP_PREFIX, headphones::BODY_ROLE);
    let stand_group = format!("{}.{}", headphones::GROUP_PREFIX, headphones::STAND_ROLE);
    let navy = Color::from_hex(0x202840);
    let layout = RoomLayout {
        recolor: vec![RecolorRule {
            group: body_group.clone(),
            color: navy,
        }],
        ..RoomLayout::default()
    };
    let mut lib = MaterialLibrary::new();
    let mut room = assemble_room(&layout, &mut lib);
    assert!(lib.group(&body_group).is_empty());

    let options = HeadphoneOptions::default();
    let mut model = mock_model(&["Node6", "Logo", "Left_Cup"]);
    assign_materials(&mut model, &options).unwrap();
    assert!(place_model(&mut room.root, HEADPHONES_SLOT, model, &mut lib, &layout.recolor));

    assert_eq!(lib.group(&body_group).len(), 2);
    for &handle in lib.group(&body_group) {
        assert_eq!(lib.get(handle).unwrap().color, navy);
    }
    for &handle in lib.group(&stand_group) {
        assert_eq!(lib.get(handle).unwrap().color, options.stand_color);
    }
    let slot = find_slot_mut(&mut room.root, HEADPHONES_SLOT).unwrap();
    assert_eq!(slot.state(), &LoadState::Ready);

    // a filled slot takes nothing more
    let late = mock_model(&["Node6"]);
    assert!(!place_model(&mut room.root, HEADPHONES_SLOT, late, &mut lib, &layout.recolor));
}

fn solid_texture(value: u8) -> TextureSource {
    TextureSource::new(
        image::RgbaImage::from_pixel(2, 2, image::Rgba([value, value, value, 255])),
        TextureSettings::default(),
    )
}

#[test]
fn replaced_textures_are_released_once_unused() {
    let mut lib = MaterialLibrary::new();
    let first = solid_texture(10);
    let a = lib.add_to_group("covers", Material::standard("a", Color::WHITE).with_map(TextureSlot::Color, first.clone()));
    let b = lib.add_to_group("covers", Material::standard("b", Color::WHITE).with_map(TextureSlot::Color, first.clone()));
    assert!(lib.take_unused_textures().is_empty());

    // re-setting the same texture retires nothing
    assert!(lib.set_texture(a, TextureSlot::Color, first.clone()));
    assert!(lib.take_unused_textures().is_empty());

    let second = solid_texture(200);
    assert!(lib.set_texture(a, TextureSlot::Color, second.clone()));
    // still mapped by `b`
    assert!(lib.take_unused_textures().is_empty());

    assert!(lib.set_texture(b, TextureSlot::Color, second.clone()));
    assert_eq!(lib.take_unused_textures(), vec![first.id()]);
    assert!(lib.take_unused_textures().is_empty());
}
