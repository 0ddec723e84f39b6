//! Light sources as they appear in the scene graph.

use cgmath::{InnerSpace, Matrix4, Vector3, Vector4};
use serde::Deserialize;

use crate::data_structures::{color::Color, geometry::safe_normalize};

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub enum Light {
    Ambient {
        color: Color,
        intensity: f32,
    },
    /// Parallel rays from the node position towards the world origin.
    Directional {
        color: Color,
        intensity: f32,
    },
    /// `distance == 0` means unlimited range.
    Point {
        color: Color,
        intensity: f32,
        #[serde(default)]
        distance: f32,
        #[serde(default = "default_decay")]
        decay: f32,
    },
    /// Rectangular emitter facing the node's local -Z.
    RectArea {
        color: Color,
        intensity: f32,
        width: f32,
        height: f32,
    },
}

fn default_decay() -> f32 {
    2.0
}

impl Light {
    pub fn point(color: Color, intensity: f32, distance: f32, decay: f32) -> Self {
        Light::Point {
            color,
            intensity,
            distance,
            decay,
        }
    }

    pub fn color(&self) -> Color {
        match *self {
            Light::Ambient { color, .. }
            | Light::Directional { color, .. }
            | Light::Point { color, .. }
            | Light::RectArea { color, .. } => color,
        }
    }

    pub fn intensity(&self) -> f32 {
        match *self {
            Light::Ambient { intensity, .. }
            | Light::Directional { intensity, .. }
            | Light::Point { intensity, .. }
            | Light::RectArea { intensity, .. } => intensity,
        }
    }

    pub fn is_ambient(&self) -> bool {
        matches!(self, Light::Ambient { .. })
    }
}

/// A light together with the world matrix of the node carrying it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightInstance {
    pub light: Light,
    pub world: Matrix4<f32>,
}

impl LightInstance {
    pub fn position(&self) -> Vector3<f32> {
        self.world.w.truncate()
    }

    /// Direction the light travels in. Zero for ambient and point lights.
    pub fn direction(&self) -> Vector3<f32> {
        match self.light {
            Light::Directional { .. } => {
                safe_normalize(-self.position(), Vector3::new(0.0, -1.0, 0.0))
            }
            Light::RectArea { .. } => {
                let forward = self.world * Vector4::new(0.0, 0.0, -1.0, 0.0);
                safe_normalize(forward.truncate(), Vector3::new(0.0, -1.0, 0.0))
            }
            Light::Ambient { .. } | Light::Point { .. } => Vector3::new(0.0, 0.0, 0.0),
        }
    }

    pub fn is_finite(&self) -> bool {
        let p = self.position();
        let d = self.direction();
        p.x.is_finite()
            && p.y.is_finite()
            && p.z.is_finite()
            && d.magnitude2().is_finite()
            && self.light.color().is_finite()
            && self.light.intensity().is_finite()
    }
}
