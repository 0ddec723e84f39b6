//! Room layout configuration.
//!
//! [`RoomLayout::default`] is the tuned studio scene. Every field can be
//! overridden from a RON document; fields left out keep their defaults.

use std::{
    f32::consts::PI,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{
    builders::{
        book::PortfolioBookParams,
        chair::ChairParams,
        fixtures::{
            DeskParams, FloorParams, PosterParams, RoomDims, RugParams, WallParams, WindowParams,
            default_posters,
        },
        lamp::PoufLampParams,
        shelf::ShelfParams,
    },
    data_structures::{
        color::Color,
        light::Light,
        material::{ColorSpace, TextureSettings, TextureSlot, Wrap},
        transform::Transform,
    },
    resources::{headphones::HeadphoneOptions, plant::PlantOptions},
};

pub use crate::pipelines::post::PostSettings;

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("cannot read layout file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid layout: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Vertical field of view.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_degrees: 50.0,
            near: 0.1,
            far: 1000.0,
            position: [3.0, 4.0, 3.5],
            target: [0.0, 1.0, -4.5],
        }
    }
}

/// Where an object sits in the room. Rotation is XYZ Euler in radians.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Placement {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: f32,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: 1.0,
        }
    }
}

impl Placement {
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: [x, y, z],
            ..Self::default()
        }
    }

    pub fn turned(mut self, y: f32) -> Self {
        self.rotation[1] = y;
        self
    }

    pub fn to_transform(&self) -> Transform {
        let [x, y, z] = self.position;
        let [rx, ry, rz] = self.rotation;
        Transform::at(x, y, z)
            .with_euler(rx, ry, rz)
            .with_uniform_scale(self.scale)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LightPlacement {
    pub name: String,
    pub light: Light,
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default)]
    pub rotation: [f32; 3],
}

impl LightPlacement {
    fn new(name: &str, light: Light, position: [f32; 3]) -> Self {
        Self {
            name: name.to_string(),
            light,
            position,
            rotation: [0.0; 3],
        }
    }
}

/// An image file bound to one map slot of a material group.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MapRef {
    pub path: String,
    pub slot: TextureSlot,
    #[serde(default)]
    pub settings: TextureSettings,
}

impl MapRef {
    pub fn new(path: &str, slot: TextureSlot, color_space: ColorSpace, repeat: f32) -> Self {
        Self {
            path: path.to_string(),
            slot,
            settings: TextureSettings {
                color_space,
                wrap: Wrap::Repeat,
                repeat: [repeat, repeat],
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    /// Directory asset paths resolve under natively. In the browser paths
    /// resolve against the page origin instead.
    pub root: PathBuf,
    /// Per-load limit. Not enforced in the browser.
    pub timeout_secs: f32,
    /// Equirectangular HDR image used for reflections.
    pub environment: Option<String>,
    pub window_backdrop: Option<String>,
    /// TrueType font replacing the built-in cover lettering once loaded.
    pub cover_font: Option<String>,
    pub floor_maps: Vec<MapRef>,
    pub desk_maps: Vec<MapRef>,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            timeout_secs: 30.0,
            environment: Some(String::from(
                "https://dl.polyhaven.org/file/ph-assets/HDRIs/hdr/1k/studio_small_09_1k.hdr",
            )),
            window_backdrop: Some(String::from(
                "https://images.unsplash.com/photo-1600585154340-be6161a56a0c?auto=format&fit=crop&w=1600&q=80",
            )),
            cover_font: Some(String::from("/assets/fonts/cover.ttf")),
            floor_maps: vec![
                MapRef::new(
                    "/assets/textures/sol/oak_veneer_01_diff_4k.jpg",
                    TextureSlot::Color,
                    ColorSpace::Srgb,
                    2.0,
                ),
                MapRef::new(
                    "/assets/textures/sol/oak_veneer_01_ao_4k.jpg",
                    TextureSlot::Occlusion,
                    ColorSpace::Linear,
                    2.0,
                ),
            ],
            desk_maps: vec![
                MapRef::new(
                    "/assets/textures/desk/plywood_diff_4k.jpg",
                    TextureSlot::Color,
                    ColorSpace::Srgb,
                    1.5,
                ),
                MapRef::new(
                    "/assets/textures/desk/plywood_nor_gl_4k.exr",
                    TextureSlot::Normal,
                    ColorSpace::Linear,
                    1.5,
                ),
                MapRef::new(
                    "/assets/textures/desk/plywood_rough_4k.exr",
                    TextureSlot::Roughness,
                    ColorSpace::Linear,
                    1.5,
                ),
            ],
        }
    }
}

/// Sets the base colour of a material group after the room is assembled.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RecolorRule {
    pub group: String,
    pub color: Color,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RoomLayout {
    pub camera: CameraSettings,
    pub clear_color: Color,
    pub post: PostSettings,
    pub assets: AssetSettings,
    pub room: RoomDims,
    pub floor: FloorParams,
    pub walls: WallParams,
    pub window: WindowParams,
    pub desk: DeskParams,
    pub rug: RugParams,
    pub posters: Vec<PosterParams>,
    pub chair: ChairParams,
    pub chair_placement: Placement,
    pub lamp: PoufLampParams,
    pub lamp_placement: Placement,
    pub book: PortfolioBookParams,
    pub book_placement: Placement,
    pub shelf: Option<ShelfParams>,
    pub shelf_placement: Placement,
    pub headphones: Option<HeadphoneOptions>,
    pub plant: Option<PlantOptions>,
    pub lights: Vec<LightPlacement>,
    pub recolor: Vec<RecolorRule>,
}

impl Default for RoomLayout {
    fn default() -> Self {
        Self {
            camera: CameraSettings::default(),
            clear_color: Color::from_hex(0xf2f0ec),
            post: PostSettings::default(),
            assets: AssetSettings::default(),
            room: RoomDims::default(),
            floor: FloorParams::default(),
            walls: WallParams::default(),
            window: WindowParams::default(),
            desk: DeskParams::default(),
            rug: RugParams::default(),
            posters: default_posters(),
            chair: ChairParams {
                chrome_color: Color::from_hex(0xD9D9D9),
                wheel_radius: 0.044,
                ..ChairParams::default()
            },
            chair_placement: Placement::at(-1.35, 0.0, -2.2).turned(PI / 4.0),
            lamp: PoufLampParams {
                height: 0.8,
                ..PoufLampParams::default()
            },
            lamp_placement: Placement::at(1.4, 1.3, -4.9),
            book: PortfolioBookParams::default(),
            book_placement: Placement::at(0.0, 1.315, -4.25),
            shelf: Some(ShelfParams::default()),
            shelf_placement: Placement::at(4.6, 2.1, -6.0),
            headphones: Some(HeadphoneOptions::default()),
            plant: Some(PlantOptions::default()),
            lights: default_lights(),
            recolor: Vec::new(),
        }
    }
}

impl RoomLayout {
    pub fn from_ron_str(text: &str) -> Result<Self, LayoutError> {
        Ok(ron::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LayoutError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| LayoutError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let layout = Self::from_ron_str(&text)?;
        log::info!("loaded room layout from {path:?}");
        Ok(layout)
    }
}

fn default_lights() -> Vec<LightPlacement> {
    let point = |hex, intensity, distance, decay| Light::point(Color::from_hex(hex), intensity, distance, decay);
    vec![
        LightPlacement::new(
            "ambient",
            Light::Ambient {
                color: Color::from_hex(0xfff3e0),
                intensity: 1.1,
            },
            [0.0; 3],
        ),
        LightPlacement::new(
            "sunset",
            Light::Directional {
                color: Color::from_hex(0xffdfb1),
                intensity: 1.4,
            },
            [-6.0, 5.0, -2.0],
        ),
        LightPlacement::new(
            "window_fill",
            Light::Directional {
                color: Color::from_hex(0xe1eeff),
                intensity: 0.65,
            },
            [-8.0, 3.0, 1.0],
        ),
        LightPlacement::new("lamp_light", point(0xff944d, 0.32, 1.9, 2.0), [1.5, 1.45, -4.7]),
        LightPlacement::new("lamp_glow", point(0xffb36b, 0.12, 2.4, 1.5), [1.5, 1.55, -4.7]),
        LightPlacement::new("fill_bounce", point(0xffe9c4, 0.15, 6.0, 2.0), [0.0, 2.5, -4.5]),
        LightPlacement {
            rotation: [-PI / 2.15, 0.0, 0.0],
            ..LightPlacement::new(
                "overhead",
                Light::RectArea {
                    color: Color::from_hex(0xfff6e8),
                    intensity: 3.2,
                    width: 3.5,
                    height: 1.2,
                },
                [0.0, 3.5, -4.25],
            )
        },
        LightPlacement::new("overhead_fill", point(0xffffff, 0.4, 4.5, 2.0), [-1.5, 2.4, -4.3]),
    ]
}
