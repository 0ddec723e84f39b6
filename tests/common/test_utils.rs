use std::sync::Arc;

use studio_room::{
    data_structures::{
        geometry::{Aabb, Geometry},
        scene_graph::{SceneNode, bounds},
        transform::Transform,
    },
    resources::gltf::{LoadedModel, ModelNode, ModelPart},
};

/// Routes `log` output through the test harness.
#[allow(dead_code)]
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A model with one unit cube per name, all under a single root node and
/// without materials.
#[allow(dead_code)]
pub fn mock_model(names: &[&str]) -> LoadedModel {
    let parts = names
        .iter()
        .map(|name| ModelPart {
            name: name.to_string(),
            geometry: Arc::new(Geometry::cuboid(1.0, 1.0, 1.0).with_name(*name)),
            material: None,
        })
        .collect();
    LoadedModel {
        name: String::from("mock"),
        roots: vec![ModelNode {
            name: String::from("root"),
            transform: Transform::new(),
            parts,
            children: Vec::new(),
        }],
        materials: Vec::new(),
    }
}

/// Group of the material each part of `model` ended up with.
#[allow(dead_code)]
pub fn part_groups(model: &LoadedModel) -> Vec<Option<String>> {
    model
        .parts()
        .iter()
        .map(|part| {
            part.material
                .and_then(|i| model.materials.get(i))
                .and_then(|m| m.group.clone())
        })
        .collect()
}

#[allow(dead_code)]
pub fn assert_sane_bounds(node: &dyn SceneNode) -> Aabb {
    let aabb = bounds(node).unwrap_or_else(|| panic!("{} has no drawable content", node.name()));
    assert!(aabb.is_finite(), "{} has non-finite bounds {aabb:?}", node.name());
    assert!(!aabb.is_degenerate(), "{} has degenerate bounds {aabb:?}", node.name());
    aabb
}
