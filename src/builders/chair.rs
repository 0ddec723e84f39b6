//! An aluminium-group style office chair: five-star chrome base on
//! spherical casters, leather seat and back pads, a chrome sling under the
//! seat and looped chrome armrests.

use std::{f32::consts::PI, sync::Arc};

use cgmath::Vector3;
use serde::Deserialize;

use crate::{
    builders::sanitize,
    data_structures::{
        color::Color,
        curve::CatmullRomCurve3,
        geometry::Geometry,
        material::{Material, MaterialHandle, MaterialLibrary},
        scene_graph::{ContainerNode, MeshNode},
        shape::{ExtrudeOptions, clamp_corner_radius, extrude, rounded_rect},
        transform::Transform,
    },
};

pub const LEATHER_GROUP: &str = "chair.leather";
pub const CHROME_GROUP: &str = "chair.chrome";
pub const BLACK_GROUP: &str = "chair.black";
pub const TIRE_GROUP: &str = "chair.tire";

const LEG_COUNT: usize = 5;
const ARM_LENGTH: f32 = 0.38;
const ARM_THICKNESS: f32 = 0.036;
const RAIL_RADIUS: f32 = 0.016;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChairParams {
    pub leather_color: Color,
    pub chrome_color: Color,
    pub tire_color: Color,
    pub plastic_color: Color,
    pub ground_y: f32,
    pub wheel_radius: f32,
    pub fork_drop: f32,
    pub base_radius: f32,
    pub seat_top_y: f32,
    pub seat_width: f32,
    pub seat_depth: f32,
    pub env_intensity: f32,
}

impl Default for ChairParams {
    fn default() -> Self {
        Self {
            leather_color: Color::from_hex(0xD26A2E),
            chrome_color: Color::from_hex(0xE8E8E8),
            tire_color: Color::from_hex(0x121212),
            plastic_color: Color::from_hex(0x1c1c1c),
            ground_y: 0.004,
            wheel_radius: 0.048,
            fork_drop: 0.060,
            base_radius: 0.40,
            seat_top_y: 0.95,
            seat_width: 0.96,
            seat_depth: 0.82,
            env_intensity: 1.2,
        }
    }
}

impl ChairParams {
    /// Finite, positive copy of the numeric fields.
    fn sanitized(&self) -> Self {
        let d = Self::default();
        Self {
            ground_y: if self.ground_y.is_finite() { self.ground_y } else { d.ground_y },
            wheel_radius: sanitize(self.wheel_radius, 0.005, d.wheel_radius),
            fork_drop: sanitize(self.fork_drop, 0.005, d.fork_drop),
            base_radius: sanitize(self.base_radius, 0.05, d.base_radius),
            seat_top_y: sanitize(self.seat_top_y, 0.0, d.seat_top_y),
            seat_width: sanitize(self.seat_width, 0.1, d.seat_width),
            seat_depth: sanitize(self.seat_depth, 0.1, d.seat_depth),
            env_intensity: sanitize(self.env_intensity, 0.0, d.env_intensity),
            ..self.clone()
        }
    }
}

/// A flat leather pad: rounded rectangle of `width` by `depth`, extruded to
/// `thickness` with a soft bevel, lying in the XZ plane and centred on its
/// thickness.
pub fn rounded_pad(width: f32, depth: f32, thickness: f32, radius: f32) -> Geometry {
    let radius = clamp_corner_radius(width, depth, radius);
    let thickness = sanitize(thickness, 0.0, 0.0);
    let options = ExtrudeOptions {
        depth: thickness,
        bevel_thickness: (thickness * 0.55).min(0.035),
        bevel_size: (radius * 0.55).min(0.028),
        bevel_segments: 4,
        curve_segments: 16,
    };
    extrude(&rounded_rect(width, depth, radius), &options)
        .rotated_x(-PI / 2.0)
        .translated(0.0, -thickness / 2.0, 0.0)
        .with_name("rounded pad")
}

/// Control points of one armrest loop. `side` is `-1` for the left arm and
/// `1` for the right one. Extra points close to the corners keep the
/// spline from overshooting.
pub fn armrest_rail_points(seat_width: f32, seat_depth: f32, side: f32) -> Vec<Vector3<f32>> {
    let s = if side < 0.0 { -1.0 } else { 1.0 };
    let x_inner = s * seat_width * 0.50;
    let x_outer = s * seat_width * 0.62;
    let z_rear = -seat_depth * 0.28;
    let z_front = seat_depth * 0.22;
    let y_top = 0.22;
    let y_bot = 0.02;
    let r_z = 0.04;
    let r_x = 0.02;
    let span = z_front - z_rear;
    let y_mid = (y_top + y_bot) * 0.6;

    vec![
        Vector3::new(x_inner, y_top, z_rear),
        Vector3::new(x_inner + s * r_x, y_top, z_rear),
        Vector3::new(x_outer - s * r_x, y_top, z_rear),
        Vector3::new(x_outer, y_top, z_rear + span * 0.15),
        Vector3::new(x_outer, y_top, -r_z),
        Vector3::new(x_outer, y_top, 0.0),
        Vector3::new(x_outer, y_top, r_z),
        Vector3::new(x_outer, y_top, z_front - span * 0.15),
        Vector3::new(x_outer - s * r_x, y_top, z_front),
        Vector3::new(x_inner + s * r_x, y_top, z_front),
        Vector3::new(x_inner, y_top, z_front),
        Vector3::new(x_inner, y_mid, z_front),
        Vector3::new(x_inner, y_bot, z_front - r_z),
        Vector3::new(x_inner, y_bot, 0.0),
        Vector3::new(x_inner, y_bot, -r_z),
        Vector3::new(x_inner, y_mid, z_rear),
    ]
}

/// The closed chrome loop of one armrest.
pub fn armrest_rail(seat_width: f32, seat_depth: f32, side: f32) -> Geometry {
    CatmullRomCurve3::centripetal(armrest_rail_points(seat_width, seat_depth, side), true)
        .tube(140, RAIL_RADIUS, 24)
        .with_name("armrest rail")
}

struct ChairMaterials {
    leather: MaterialHandle,
    chrome: MaterialHandle,
    black: MaterialHandle,
    tire: MaterialHandle,
}

impl ChairMaterials {
    fn register(params: &ChairParams, materials: &mut MaterialLibrary) -> Self {
        Self {
            leather: materials.add_to_group(
                LEATHER_GROUP,
                Material::standard("chair leather", params.leather_color)
                    .with_roughness(0.55)
                    .with_metalness(0.12),
            ),
            chrome: materials.add_to_group(
                CHROME_GROUP,
                Material::standard("chair chrome", params.chrome_color)
                    .with_metalness(1.0)
                    .with_roughness(0.08)
                    .with_env_intensity(params.env_intensity),
            ),
            black: materials.add_to_group(
                BLACK_GROUP,
                Material::standard("chair plastic", params.plastic_color)
                    .with_roughness(0.45)
                    .with_metalness(0.55),
            ),
            tire: materials.add_to_group(
                TIRE_GROUP,
                Material::standard("chair tire", params.tire_color)
                    .with_roughness(0.5)
                    .with_metalness(0.2),
            ),
        }
    }
}

/// Builds the chair standing on `ground_y` with the seat centred on the Y
/// axis and facing +Z.
pub fn build_chair(params: &ChairParams, materials: &mut MaterialLibrary) -> ContainerNode {
    let p = params.sanitized();
    let mats = ChairMaterials::register(&p, materials);

    let mut chair = ContainerNode::new("Chair");
    let hub_y = p.ground_y + p.fork_drop + p.wheel_radius;

    let lift_h = (p.seat_top_y - hub_y).max(0.12);
    let lift = Geometry::cylinder(0.05, 0.05, lift_h, 28).with_name("gas lift");
    chair.push(MeshNode::new("gas_lift", Arc::new(lift), mats.black).at(0.0, hub_y + lift_h / 2.0, 0.0));

    let collar = Geometry::torus(0.094, 0.012, 16, 42).with_name("collar");
    chair.push(
        MeshNode::new("collar", Arc::new(collar), mats.chrome)
            .at(0.0, hub_y + 0.008, 0.0)
            .with_euler(PI / 2.0, 0.0, 0.0),
    );

    for i in 0..LEG_COUNT {
        let angle = i as f32 / LEG_COUNT as f32 * PI * 2.0;
        chair.push(build_leg(&p, &mats, i, angle, hub_y));
    }

    chair.push(build_upper(&p, &mats));
    chair
}

fn build_leg(p: &ChairParams, mats: &ChairMaterials, index: usize, angle: f32, hub_y: f32) -> ContainerNode {
    let arm = Geometry::cuboid(ARM_LENGTH, ARM_THICKNESS, ARM_THICKNESS).with_name("base arm");
    let fork = Geometry::cylinder(0.013, 0.013, p.fork_drop, 16).with_name("caster fork");
    let yoke = Geometry::cuboid(0.052, 0.014, 0.030).with_name("caster yoke");
    let axle = Geometry::cylinder(0.012, 0.012, 0.04, 16).with_name("caster axle");
    let wheel = Geometry::sphere(p.wheel_radius, 24, 16).with_name("caster wheel");
    let fork_bottom = -p.fork_drop;

    ContainerNode::new(format!("leg_{index}"))
        .with_transform(Transform::at(0.0, hub_y, 0.0).with_euler(0.0, angle, 0.0))
        .with_child(
            MeshNode::new("arm", Arc::new(arm), mats.chrome)
                .at(ARM_LENGTH / 2.0, 0.0, 0.0)
                .with_scale(1.0, 1.0, 0.9),
        )
        .with_child(MeshNode::new("fork", Arc::new(fork), mats.chrome).at(ARM_LENGTH, -p.fork_drop / 2.0, 0.0))
        .with_child(MeshNode::new("yoke", Arc::new(yoke), mats.chrome).at(p.base_radius, fork_bottom - 0.007, 0.0))
        .with_child(
            MeshNode::new("axle", Arc::new(axle), mats.chrome)
                .at(p.base_radius, fork_bottom - 0.014, 0.0)
                .with_euler(PI / 2.0, 0.0, 0.0),
        )
        .with_child(MeshNode::new("wheel", Arc::new(wheel), mats.tire).at(p.base_radius, fork_bottom - 0.014, 0.0))
}

fn build_upper(p: &ChairParams, mats: &ChairMaterials) -> ContainerNode {
    let (sw, sd) = (p.seat_width, p.seat_depth);
    let mut upper = ContainerNode::new("upper").with_transform(Transform::at(0.0, p.seat_top_y, 0.0));

    let sling_y = -0.058;
    let (z_back, z_front) = (-sd * 0.42, sd * 0.46);
    let sling = CatmullRomCurve3::centripetal(
        vec![
            Vector3::new(-sw * 0.45, sling_y, z_back),
            Vector3::new(-sw * 0.40, sling_y - 0.02, 0.0),
            Vector3::new(-sw * 0.45, sling_y, z_front),
            Vector3::new(sw * 0.45, sling_y, z_front),
            Vector3::new(sw * 0.40, sling_y - 0.02, 0.0),
            Vector3::new(sw * 0.45, sling_y, z_back),
        ],
        false,
    )
    .tube(90, 0.016, 18)
    .with_name("sling");
    upper.push(MeshNode::new("sling", Arc::new(sling), mats.chrome));

    let seat = rounded_pad(sw * 0.92, sd * 0.78, 0.095, 0.11);
    upper.push(
        MeshNode::new("seat_pad", Arc::new(seat), mats.leather)
            .at(0.0, -0.004, 0.012)
            .with_euler(PI / 80.0, 0.0, 0.0),
    );

    let back_t = 0.10;
    let back = rounded_pad(sw, 0.7, back_t, 0.12);
    upper.push(
        MeshNode::new("back_pad", Arc::new(back), mats.leather)
            .at(0.0, 0.5, -sd * 0.44 - back_t * 0.5)
            .with_euler(PI / 2.0, 0.0, 0.0),
    );

    for (side, label) in [(-1.0, "left"), (1.0, "right")] {
        upper.push(build_armrest(p, mats, side, label));
    }
    upper
}

fn build_armrest(p: &ChairParams, mats: &ChairMaterials, side: f32, label: &str) -> ContainerNode {
    let (sw, sd) = (p.seat_width, p.seat_depth);
    let x_inner = side * sw * 0.50;
    let x_outer = side * sw * 0.62;
    let z_rear = -sd * 0.28;
    let z_front = sd * 0.22;
    let y_top = 0.22;

    let post_h = 0.06;
    let post = Arc::new(Geometry::cylinder(0.012, 0.012, post_h, 12).with_name("armrest post"));
    let post_y = y_top - post_h / 2.0 + 0.005;

    let pad_t = 0.05;
    let pad = Geometry::cuboid((x_outer - x_inner).abs() - 0.02, pad_t, 0.35).with_name("armrest pad");

    ContainerNode::new(format!("armrest_{label}"))
        .with_child(MeshNode::new("rail", Arc::new(armrest_rail(sw, sd, side)), mats.chrome))
        .with_child(MeshNode::new("post_rear", post.clone(), mats.chrome).at(x_inner, post_y, z_rear * 0.65))
        .with_child(MeshNode::new("post_front", post, mats.chrome).at(x_inner, post_y, z_front * 0.65))
        .with_child(
            MeshNode::new("pad", Arc::new(pad), mats.leather).at(
                (x_inner + x_outer) * 0.5,
                y_top + pad_t * 0.01 + 0.004,
                0.0,
            ),
        )
}
