use cgmath::InnerSpace;
use studio_room::{
    builders::{
        book::{PortfolioBookParams, build_portfolio_book},
        chair::{ChairParams, armrest_rail_points, build_chair, rounded_pad},
        fixtures::{
            DeskParams, FloorParams, RoomDims, RugParams, WallParams, WindowParams, build_desk, build_floor,
            build_posters, build_rug, build_walls, build_window, default_posters,
        },
        lamp::{PoufLampParams, build_pouf_lamp},
        shelf::{ShelfParams, build_shelf},
    },
    data_structures::{
        color::Color,
        curve::CatmullRomCurve3,
        material::MaterialLibrary,
        scene_graph::{SceneNode, count_nodes},
        shape::clamp_corner_radius,
    },
    synthesis::rug::synthesize_rug,
};

use crate::common::test_utils::assert_sane_bounds;

mod common;

#[test]
fn every_builder_has_finite_bounds() {
    let mut lib = MaterialLibrary::new();
    let dims = RoomDims::default();
    let nodes = vec![
        build_chair(&ChairParams::default(), &mut lib),
        build_pouf_lamp(&PoufLampParams::default(), &mut lib),
        build_portfolio_book(&PortfolioBookParams::default(), &mut lib),
        build_shelf(&ShelfParams::default(), &mut lib),
        build_floor(&dims, &FloorParams::default(), &mut lib),
        build_walls(&dims, &WallParams::default(), &mut lib),
        build_window(&dims, &WindowParams::default(), &mut lib),
        build_desk(&DeskParams::default(), &mut lib),
        build_rug(&RugParams::default(), synthesize_rug(), &mut lib),
        build_posters(&dims, &default_posters(), &mut lib),
    ];
    for node in &nodes {
        assert_sane_bounds(node);
    }
}

#[test]
fn malformed_numbers_still_give_finite_geometry() {
    let mut lib = MaterialLibrary::new();
    let chair = build_chair(
        &ChairParams {
            seat_width: f32::NAN,
            seat_depth: -1.0,
            wheel_radius: f32::INFINITY,
            base_radius: 0.0,
            ..ChairParams::default()
        },
        &mut lib,
    );
    assert_sane_bounds(&chair);

    let lamp = build_pouf_lamp(
        &PoufLampParams {
            height: f32::NEG_INFINITY,
            ..PoufLampParams::default()
        },
        &mut lib,
    );
    assert_sane_bounds(&lamp);

    let shelf = build_shelf(
        &ShelfParams {
            levels: 1000,
            spacing: f32::NAN,
            ..ShelfParams::default()
        },
        &mut lib,
    );
    assert_sane_bounds(&shelf);
}

#[test]
fn corner_radius_never_exceeds_half_the_short_side() {
    let extents = [0.0, 0.1, 0.5, 1.0, 3.0, -2.0, f32::NAN, f32::INFINITY];
    let radii = [0.0, 0.01, 0.25, 0.5, 2.0, 100.0, -1.0, f32::NAN, f32::INFINITY];
    for &w in &extents {
        for &h in &extents {
            for &r in &radii {
                let clamped = clamp_corner_radius(w, h, r);
                let limit = [w, h]
                    .into_iter()
                    .map(|x| if x.is_finite() && x > 0.0 { x } else { 0.0 })
                    .fold(f32::INFINITY, f32::min)
                    / 2.0;
                assert!(clamped >= 0.0, "radius {r} for {w}x{h} became {clamped}");
                assert!(clamped <= limit, "radius {r} for {w}x{h} became {clamped} > {limit}");
            }
        }
    }
}

#[test]
fn rounded_pad_with_oversized_radius_is_finite() {
    let pad = rounded_pad(0.6, 0.4, 0.05, 5.0);
    let aabb = pad.bounds().expect("pad has vertices");
    assert!(aabb.is_finite());
    let size = aabb.size();
    // the bevel grows the outline by at most 0.028 per side
    assert!(size.x > 0.599 && size.x < 0.66, "width {}", size.x);
    assert!(size.z > 0.399 && size.z < 0.46, "depth {}", size.z);
}

#[test]
fn armrest_rail_closes_on_itself() {
    let segments = 140;
    for side in [-1.0, 1.0] {
        let curve = CatmullRomCurve3::centripetal(armrest_rail_points(0.96, 0.82, side), true);
        let gap = (curve.point_at(0.0) - curve.point_at(1.0)).magnitude();
        assert!(gap < 1e-4, "rail opens by {gap}");

        let frames = curve.frames(segments);
        let (first, last) = (&frames[0], &frames[segments as usize]);
        let normal_gap = (first.normal - last.normal).magnitude();
        let binormal_gap = (first.binormal - last.binormal).magnitude();
        assert!(normal_gap < 1e-2, "normals differ by {normal_gap}");
        assert!(binormal_gap < 1e-2, "binormals differ by {binormal_gap}");
    }
}

#[test]
fn lamp_children_without_light() {
    let mut lib = MaterialLibrary::new();
    let params = PoufLampParams {
        height: 0.8,
        color: Color::parse("#FF7A00").unwrap(),
        with_light: false,
        ..PoufLampParams::default()
    };
    let lamp = build_pouf_lamp(&params, &mut lib);
    assert_eq!(lamp.children().len(), 7);
    assert_eq!(count_nodes(&lamp, &|n| n.light().is_some()), 0);
}

#[test]
fn lamp_children_with_light() {
    let mut lib = MaterialLibrary::new();
    let params = PoufLampParams {
        height: 0.8,
        color: Color::parse("#FF7A00").unwrap(),
        with_light: true,
        ..PoufLampParams::default()
    };
    let lamp = build_pouf_lamp(&params, &mut lib);
    assert_eq!(lamp.children().len(), 8);
    let lights = lamp.children().iter().filter(|c| c.light().is_some()).count();
    let meshes = lamp.children().iter().filter(|c| c.material().is_some()).count();
    assert_eq!(lights, 1);
    assert_eq!(meshes, 7);
}

#[test]
fn builders_share_nothing_between_calls() {
    let mut lib = MaterialLibrary::new();
    let before = lib.len();
    build_pouf_lamp(&PoufLampParams::default(), &mut lib);
    let one = lib.len() - before;
    build_pouf_lamp(&PoufLampParams::default(), &mut lib);
    assert_eq!(lib.len() - before, 2 * one);
}
