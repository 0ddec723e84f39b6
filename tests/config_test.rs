use cgmath::{Matrix4, Vector3};
use studio_room::{
    config::{LayoutError, RoomLayout},
    data_structures::{
        color::Color,
        light::{Light, LightInstance},
        material::TextureSlot,
    },
    pipelines::light::{KIND_DIRECTIONAL, KIND_POINT, KIND_RECT_AREA, LightUniform, MAX_LIGHTS},
    resources::{headphones::Variant, normalize_asset_path},
};

#[test]
fn empty_layout_is_the_default_room() {
    let layout = RoomLayout::from_ron_str("()").unwrap();
    assert_eq!(layout, RoomLayout::default());
}

#[test]
fn layout_overrides_only_what_it_names() {
    let layout = RoomLayout::from_ron_str(
        r##"(
            camera: (fov_degrees: 40.0),
            clear_color: "#101010",
            lamp: (height: 0.5, with_light: false),
            shelf: Some((levels: 4)),
            headphones: Some((variant: Pink)),
            plant: None,
            lights: [
                (name: "sun", light: Directional(color: "#ffffff", intensity: 2.0), position: (1.0, 2.0, 3.0)),
            ],
            recolor: [(group: "chair.leather", color: "#0000ff")],
            assets: (
                timeout_secs: 5.0,
                floor_maps: [(path: "/floor.jpg", slot: Color)],
            ),
        )"##,
    )
    .unwrap();

    let defaults = RoomLayout::default();
    assert_eq!(layout.camera.fov_degrees, 40.0);
    assert_eq!(layout.camera.near, defaults.camera.near);
    assert_eq!(layout.clear_color, Color::from_hex(0x101010));
    assert_eq!(layout.lamp.height, 0.5);
    assert!(!layout.lamp.with_light);
    assert_eq!(layout.lamp.color, defaults.lamp.color);
    assert_eq!(layout.shelf.as_ref().map(|s| s.levels), Some(4));
    assert_eq!(layout.headphones.as_ref().map(|h| h.variant), Some(Variant::Pink));
    assert!(layout.plant.is_none());
    assert_eq!(layout.lights.len(), 1);
    assert_eq!(layout.lights[0].position, [1.0, 2.0, 3.0]);
    assert_eq!(layout.recolor[0].color, Color::from_hex(0x0000ff));
    assert_eq!(layout.assets.timeout_secs, 5.0);
    assert_eq!(layout.assets.floor_maps[0].slot, TextureSlot::Color);
    assert_eq!(layout.assets.environment, defaults.assets.environment);
    assert_eq!(layout.chair, defaults.chair);
}

#[test]
fn malformed_layout_is_a_parse_error() {
    let err = RoomLayout::from_ron_str("(clear_color: \"#12\")").unwrap_err();
    assert!(matches!(err, LayoutError::Parse(_)));

    let err = RoomLayout::from_ron_str("(lamp: (height: \"tall\"))").unwrap_err();
    assert!(matches!(err, LayoutError::Parse(_)));
}

#[test]
fn missing_layout_file_is_an_io_error() {
    let err = RoomLayout::load("does/not/exist.ron").unwrap_err();
    assert!(matches!(err, LayoutError::Io { .. }));
}

#[test]
fn colours_parse_short_and_long_hex() {
    assert_eq!(Color::parse("#fff").unwrap(), Color::from_hex(0xffffff));
    assert_eq!(Color::parse("FF7A00").unwrap(), Color::from_hex(0xff7a00));
    assert!(Color::parse("#ggg").is_err());
}

#[test]
fn asset_paths_gain_a_leading_slash() {
    assert_eq!(normalize_asset_path("assets/model.glb"), "/assets/model.glb");
    assert_eq!(normalize_asset_path("/assets/model.glb"), "/assets/model.glb");
    assert_eq!(normalize_asset_path("https://x.y/a.hdr"), "https://x.y/a.hdr");
}

fn at(light: Light, x: f32, y: f32, z: f32) -> LightInstance {
    LightInstance {
        light,
        world: Matrix4::from_translation(Vector3::new(x, y, z)),
    }
}

#[test]
fn light_uniform_sums_ambient_and_packs_the_rest() {
    let white = Color::WHITE;
    let lights = [
        at(Light::Ambient { color: white, intensity: 0.5 }, 0.0, 0.0, 0.0),
        at(Light::Ambient { color: white, intensity: 0.25 }, 0.0, 0.0, 0.0),
        at(Light::Directional { color: white, intensity: 2.0 }, 0.0, 10.0, 0.0),
        at(Light::point(white, 1.0, 4.0, 1.5), 1.0, 2.0, 3.0),
        at(
            Light::RectArea {
                color: white,
                intensity: 3.0,
                width: 2.0,
                height: 1.0,
            },
            0.0,
            3.0,
            0.0,
        ),
    ];
    let uniform = LightUniform::from_lights(&lights);

    assert_eq!(uniform.light_count(), 3);
    assert_eq!(&uniform.ambient[..3], &[0.75, 0.75, 0.75]);

    let sun = uniform.lights[0];
    assert_eq!(sun.position[3], KIND_DIRECTIONAL);
    assert!((sun.direction[1] + 1.0).abs() < 1e-6);
    assert_eq!(sun.color[..3], [2.0, 2.0, 2.0]);

    let bulb = uniform.lights[1];
    assert_eq!(bulb.position, [1.0, 2.0, 3.0, KIND_POINT]);
    assert_eq!(bulb.color[3], 4.0);
    assert_eq!(bulb.direction[3], 1.5);

    let panel = uniform.lights[2];
    assert_eq!(panel.position[3], KIND_RECT_AREA);
    assert_eq!(&panel.extent[..2], &[2.0, 1.0]);
}

#[test]
fn light_uniform_drops_lights_past_the_limit() {
    let lights: Vec<LightInstance> = (0..MAX_LIGHTS + 4)
        .map(|i| at(Light::point(Color::WHITE, 1.0, 0.0, 2.0), i as f32, 0.0, 0.0))
        .collect();
    let uniform = LightUniform::from_lights(&lights);
    assert_eq!(uniform.light_count(), MAX_LIGHTS);
    assert_eq!(uniform.lights[MAX_LIGHTS - 1].position[0], (MAX_LIGHTS - 1) as f32);

    let empty = LightUniform::from_lights(&[]);
    assert_eq!(empty.light_count(), 0);
    assert_eq!(empty.ambient, [0.0; 4]);
}
