//! Local transforms and the per-mesh GPU transform record.
//!
//! Every node carries a [`Transform`] relative to its parent. World matrices
//! are composed as plain 4x4 matrices so a rotated child under a non-uniformly
//! scaled parent still lands where it should.

use std::ops::Mul;

use cgmath::{
    InnerSpace, Matrix, Matrix3, Matrix4, One, Quaternion, Rad, Rotation3, SquareMatrix, Vector3,
};

use crate::data_structures::model;

/// Position, rotation (as quaternion) and non-uniform scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Transform {
    /// Identity transform (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Vector3::new(x, y, z),
            ..Self::new()
        }
    }

    /// Rotation from Euler angles in radians, applied X then Y then Z in the
    /// object's own frame (the usual `XYZ` order of scene editors).
    pub fn with_euler(mut self, x: f32, y: f32, z: f32) -> Self {
        self.rotation = euler_xyz(x, y, z);
        self
    }

    pub fn with_rotation(mut self, rotation: Quaternion<f32>) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, x: f32, y: f32, z: f32) -> Self {
        self.scale = Vector3::new(x, y, z);
        self
    }

    pub fn with_uniform_scale(self, s: f32) -> Self {
        self.with_scale(s, s, s)
    }

    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn is_finite(&self) -> bool {
        let q = self.rotation;
        [self.position.x, self.position.y, self.position.z]
            .iter()
            .chain([q.s, q.v.x, q.v.y, q.v.z].iter())
            .chain([self.scale.x, self.scale.y, self.scale.z].iter())
            .all(|c| c.is_finite())
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vector3<f32>> for Transform {
    fn from(position: Vector3<f32>) -> Self {
        Transform {
            position,
            ..Default::default()
        }
    }
}

impl From<[f32; 3]> for Transform {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Transform::at(x, y, z)
    }
}

impl<'a, 'b> Mul<&'b Transform> for &'a Transform {
    type Output = Matrix4<f32>;

    fn mul(self, rhs: &'b Transform) -> Self::Output {
        self.to_matrix() * rhs.to_matrix()
    }
}

pub fn euler_xyz(x: f32, y: f32, z: f32) -> Quaternion<f32> {
    (Quaternion::from_angle_x(Rad(x))
        * Quaternion::from_angle_y(Rad(y))
        * Quaternion::from_angle_z(Rad(z)))
    .normalize()
}

/// Transforms a point by a world matrix.
pub fn transform_point(m: &Matrix4<f32>, p: Vector3<f32>) -> Vector3<f32> {
    (m * p.extend(1.0)).truncate()
}

/**
 * The raw transform is the actual data stored on the GPU: model matrix,
 * inverse-transpose normal matrix and the handedness of the basis (negative
 * scales flip the bitangent).
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransformRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
    handedness: f32,
}

impl TransformRaw {
    pub fn from_matrix(world: &Matrix4<f32>) -> Self {
        let upper = Matrix3::from_cols(
            world.x.truncate(),
            world.y.truncate(),
            world.z.truncate(),
        );
        let det = upper.determinant();
        let normal = upper
            .invert()
            .map(|inv| inv.transpose())
            .unwrap_or(Matrix3::identity());
        Self {
            model: (*world).into(),
            normal: normal.into(),
            handedness: if det < 0.0 { -1.0 } else { 1.0 },
        }
    }
}

/**
 * Stride layout: model matrix as four vec4 (locations 5-8), the normal
 * matrix as three vec3 (9-11) and the handedness scalar (12).
 */
impl model::Vertex for TransformRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<TransformRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 9,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 19]>() as wgpu::BufferAddress,
                    shader_location: 10,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 22]>() as wgpu::BufferAddress,
                    shader_location: 11,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 25]>() as wgpu::BufferAddress,
                    shader_location: 12,
                    format: wgpu::VertexFormat::Float32,
                },
            ],
        }
    }
}
