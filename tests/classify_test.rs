use studio_room::{
    data_structures::{color::Color, material::Material},
    resources::{
        classify::{ClassifyError, MaterialRoles, PartMatcher},
        headphones::{self, HeadphoneOptions, Variant, assign_materials, recenter},
        plant::{self, PlantOptions, PlantTextures, dress_plant, plant_roles},
    },
};

use crate::common::test_utils::{mock_model, part_groups};

mod common;

fn stand() -> Option<String> {
    Some(format!("{}.{}", headphones::GROUP_PREFIX, headphones::STAND_ROLE))
}

fn body() -> Option<String> {
    Some(format!("{}.{}", headphones::GROUP_PREFIX, headphones::BODY_ROLE))
}

#[test]
fn listed_nodes_become_the_stand() {
    let mut model = mock_model(&["Node6", "Node9", "Node12"]);
    assign_materials(&mut model, &HeadphoneOptions::default()).unwrap();
    assert_eq!(part_groups(&model), vec![stand(), stand(), stand()]);
}

#[test]
fn other_nodes_become_the_body() {
    let mut model = mock_model(&["Node6", "Node5", "Node13", "Cup_L", "node7"]);
    assign_materials(&mut model, &HeadphoneOptions::default()).unwrap();
    // exact names are case-sensitive
    assert_eq!(part_groups(&model), vec![stand(), body(), body(), body(), body()]);
}

#[test]
fn stand_and_body_materials_are_distinct() {
    let options = HeadphoneOptions::default();
    let mut model = mock_model(&["Node6", "Logo"]);
    assign_materials(&mut model, &options).unwrap();
    let parts = model.parts();
    let stand = &model.materials[parts[0].material.unwrap()].material;
    let body = &model.materials[parts[1].material.unwrap()].material;
    assert_eq!(stand.color, options.stand_color);
    assert_eq!(body.color, options.body_color);
    assert!(stand.metalness > body.metalness);
}

#[test]
fn missing_stand_fails_classification() {
    let mut model = mock_model(&["Band", "Cup_L", "Cup_R"]);
    let err = assign_materials(&mut model, &HeadphoneOptions::default()).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ClassifyError>(),
        Some(&ClassifyError::MissingRequired {
            role: String::from(headphones::STAND_ROLE)
        })
    );
    // nothing was assigned
    assert!(model.materials.is_empty());
}

#[test]
fn palette_colours_named_body_parts() {
    let options = HeadphoneOptions {
        variant: Variant::Pink,
        ..HeadphoneOptions::default()
    };
    let mut model = mock_model(&["Node6", "Left_Cup", "Cushion", "Right_Cup", "Logo"]);
    assign_materials(&mut model, &options).unwrap();
    assert_eq!(part_groups(&model), vec![stand(), body(), body(), body(), body()]);

    let palette = Variant::Pink.palette();
    let parts = model.parts();
    let material = |i: usize| &model.materials[parts[i].material.unwrap()].material;
    assert_eq!(material(0).color, options.stand_color);
    assert_eq!(material(1).color, palette.alu);
    assert_eq!(material(2).color, palette.cushion);
    assert_eq!(material(4).color, options.body_color);
    // both cups share one material
    assert_eq!(parts[1].material, parts[3].material);
    for i in [1, 2] {
        assert_eq!(material(i).metalness, options.metalness);
        assert_eq!(material(i).roughness, options.roughness);
    }
}

#[test]
fn palette_matches_part_names_case_insensitively() {
    let palette = Variant::Silver.palette();
    assert_eq!(palette.for_part("EarPad_L"), Some(palette.cushion));
    assert_eq!(palette.for_part("HEADBAND"), Some(palette.mesh));
    assert_eq!(palette.for_part("shell"), Some(palette.alu));
    assert_eq!(palette.for_part("Node3"), None);
}

#[test]
fn recenter_moves_the_bounds_centre_to_the_origin() {
    let mut model = mock_model(&["Node6"]);
    model.roots[0].transform.position = cgmath::Vector3::new(3.0, 1.0, -2.0);

    let removed = recenter(&mut model, 2.0, 0.0).unwrap();
    assert!((removed.x - 6.0).abs() < 1e-4);
    assert!((removed.y - 2.0).abs() < 1e-4);
    assert!((removed.z + 4.0).abs() < 1e-4);

    let center = model.bounds().unwrap().center();
    assert!(center.x.abs() < 1e-4 && center.y.abs() < 1e-4 && center.z.abs() < 1e-4);
    assert_eq!(model.roots.len(), 1);
}

#[test]
fn plant_parts_without_a_role_keep_their_material() {
    let mut model = mock_model(&["Leaf_01", "MonsteraVase", "Stem", "plant_leaves_2"]);
    let original = model.add_material(Material::standard("from file", Color::BLACK), None);
    model.for_each_part_mut(&mut |_, part| part.material = Some(original));

    let textures = PlantTextures {
        leaf: Vec::new(),
        vase: Vec::new(),
    };
    dress_plant(&mut model, &PlantOptions::default(), &textures).unwrap();

    let leaf = Some(format!("{}.{}", plant::GROUP_PREFIX, plant::LEAF_ROLE));
    let vase = Some(format!("{}.{}", plant::GROUP_PREFIX, plant::VASE_ROLE));
    assert_eq!(part_groups(&model), vec![leaf.clone(), vase, None, leaf]);
    assert_eq!(model.parts()[2].material, Some(original));
}

#[test]
fn plant_roles_match_case_insensitively() {
    let roles = plant_roles();
    let assignment = roles.classify(&["LEAF", "Pot", "soil"]).unwrap();
    assert_eq!(assignment, vec![Some(0), Some(1), None]);
}

#[test]
fn first_matching_role_wins() {
    let roles = MaterialRoles::new()
        .role("a", vec![PartMatcher::Contains(String::from("x"))], false)
        .role("b", vec![PartMatcher::Contains(String::from("x")), PartMatcher::Index(2)], false);
    let assignment = roles.classify(&["x1", "y", "x2", "z"]).unwrap();
    assert_eq!(assignment, vec![Some(0), None, Some(0), None]);

    let assignment = roles.classify(&["y", "y", "y"]).unwrap();
    assert_eq!(assignment, vec![None, None, Some(1)]);
}

#[test]
fn missing_material_for_a_used_role_is_reported() {
    let roles = MaterialRoles::new().role("a", vec![PartMatcher::Index(0)], true);
    let mut model = mock_model(&["only"]);
    let err = roles.apply(&mut model, "test", Vec::new()).unwrap_err();
    assert_eq!(err, ClassifyError::MissingMaterial { role: String::from("a") });
}
