//! CPU-side mesh geometry and the primitive recipes the room is built from.
//!
//! A [`Geometry`] is generated once, optionally reshaped with the `*ed`
//! helpers (`rotated_x`, `translated`, `scaled`) and then frozen behind an
//! `Arc`. Vertex data follows wgpu conventions: counter-clockwise front faces
//! and texture coordinates with the origin in the top-left corner.

use std::{
    f32::consts::PI,
    sync::atomic::{AtomicU64, Ordering},
};

use cgmath::{InnerSpace, Matrix, Matrix3, Matrix4, SquareMatrix, Vector2, Vector3};

use crate::data_structures::model::ModelVertex;

static NEXT_GEOMETRY_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies a geometry for GPU upload caching. Unique per process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeometryId(u64);

#[derive(Clone, Debug)]
pub struct Geometry {
    id: GeometryId,
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn from_points<I: IntoIterator<Item = Vector3<f32>>>(points: I) -> Option<Self> {
        points.into_iter().fold(None, |acc: Option<Aabb>, p| {
            Some(match acc {
                None => Aabb { min: p, max: p },
                Some(b) => Aabb {
                    min: Vector3::new(b.min.x.min(p.x), b.min.y.min(p.y), b.min.z.min(p.z)),
                    max: Vector3::new(b.max.x.max(p.x), b.max.y.max(p.y), b.max.z.max(p.z)),
                },
            })
        })
    }

    pub fn union(self, other: Aabb) -> Aabb {
        Aabb {
            min: Vector3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Vector3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn corners(&self) -> [Vector3<f32>; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vector3::new(a.x, a.y, a.z),
            Vector3::new(b.x, a.y, a.z),
            Vector3::new(a.x, b.y, a.z),
            Vector3::new(b.x, b.y, a.z),
            Vector3::new(a.x, a.y, b.z),
            Vector3::new(b.x, a.y, b.z),
            Vector3::new(a.x, b.y, b.z),
            Vector3::new(b.x, b.y, b.z),
        ]
    }

    /// Bounds of the eight transformed corners.
    pub fn transformed(&self, m: &Matrix4<f32>) -> Aabb {
        let corners = self.corners().map(|c| (m * c.extend(1.0)).truncate());
        // eight corners, never empty
        Aabb::from_points(corners).unwrap_or(*self)
    }

    pub fn is_finite(&self) -> bool {
        [self.min, self.max]
            .iter()
            .all(|v| v.x.is_finite() && v.y.is_finite() && v.z.is_finite())
    }

    /// True when the box has collapsed to (almost) a point.
    pub fn is_degenerate(&self) -> bool {
        let s = self.size();
        s.x.max(s.y).max(s.z) <= f32::EPSILON
    }
}

impl Geometry {
    pub fn new(name: impl Into<String>, vertices: Vec<ModelVertex>, indices: Vec<u32>) -> Self {
        Self {
            id: GeometryId(NEXT_GEOMETRY_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            vertices,
            indices,
        }
    }

    pub fn id(&self) -> GeometryId {
        self.id
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.vertices.iter().map(|v| Vector3::from(v.position)))
    }

    /// Every position, normal and texture coordinate is a finite number.
    pub fn is_finite(&self) -> bool {
        self.vertices.iter().all(|v| {
            v.position
                .iter()
                .chain(v.normal.iter())
                .chain(v.tex_coords.iter())
                .chain(v.tangent.iter())
                .chain(v.bitangent.iter())
                .all(|c| c.is_finite())
        })
    }

    /// Applies an affine matrix to positions, normals and tangents.
    pub fn transformed(mut self, m: Matrix4<f32>) -> Self {
        let upper = Matrix3::from_cols(m.x.truncate(), m.y.truncate(), m.z.truncate());
        let normal_matrix = upper
            .invert()
            .map(|inv| inv.transpose())
            .unwrap_or(Matrix3::identity());
        for v in self.vertices.iter_mut() {
            v.position = (m * Vector3::from(v.position).extend(1.0)).truncate().into();
            v.normal = safe_normalize(normal_matrix * Vector3::from(v.normal), Vector3::unit_y()).into();
            v.tangent = safe_normalize(upper * Vector3::from(v.tangent), Vector3::unit_x()).into();
            v.bitangent = safe_normalize(upper * Vector3::from(v.bitangent), Vector3::unit_z()).into();
        }
        if upper.determinant() < 0.0 {
            for tri in self.indices.chunks_mut(3) {
                tri.swap(1, 2);
            }
        }
        self
    }

    pub fn rotated_x(self, angle: f32) -> Self {
        self.transformed(Matrix4::from_angle_x(cgmath::Rad(angle)))
    }

    pub fn rotated_y(self, angle: f32) -> Self {
        self.transformed(Matrix4::from_angle_y(cgmath::Rad(angle)))
    }

    pub fn translated(self, x: f32, y: f32, z: f32) -> Self {
        self.transformed(Matrix4::from_translation(Vector3::new(x, y, z)))
    }

    pub fn scaled(self, x: f32, y: f32, z: f32) -> Self {
        self.transformed(Matrix4::from_nonuniform_scale(x, y, z))
    }

    /// Smooth normals from area-weighted face normals of shared vertices.
    pub fn compute_vertex_normals(&mut self) {
        let mut sums = vec![Vector3::new(0.0f32, 0.0, 0.0); self.vertices.len()];
        for c in self.indices.chunks_exact(3) {
            let p0 = Vector3::from(self.vertices[c[0] as usize].position);
            let p1 = Vector3::from(self.vertices[c[1] as usize].position);
            let p2 = Vector3::from(self.vertices[c[2] as usize].position);
            let face = (p1 - p0).cross(p2 - p0);
            for &i in c {
                sums[i as usize] += face;
            }
        }
        for (v, n) in self.vertices.iter_mut().zip(sums) {
            v.normal = safe_normalize(n, Vector3::unit_y()).into();
        }
    }

    /// Per-vertex tangents and bitangents averaged over adjacent triangles.
    /// Triangles with collapsed texture coordinates contribute nothing.
    pub fn compute_tangents(&mut self) {
        let vertices = &mut self.vertices;
        let mut triangles_included = vec![0u32; vertices.len()];
        for v in vertices.iter_mut() {
            v.tangent = [0.0; 3];
            v.bitangent = [0.0; 3];
        }

        for c in self.indices.chunks_exact(3) {
            let v0 = vertices[c[0] as usize];
            let v1 = vertices[c[1] as usize];
            let v2 = vertices[c[2] as usize];

            let delta_pos1 = Vector3::from(v1.position) - Vector3::from(v0.position);
            let delta_pos2 = Vector3::from(v2.position) - Vector3::from(v0.position);
            let delta_uv1 = Vector2::from(v1.tex_coords) - Vector2::from(v0.tex_coords);
            let delta_uv2 = Vector2::from(v2.tex_coords) - Vector2::from(v0.tex_coords);

            //     delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
            //     delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
            let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
            if det.abs() < 1e-12 {
                continue;
            }
            let r = 1.0 / det;
            let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
            // flipped for right-handed normal maps in wgpu's texture space
            let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

            for &i in c {
                let v = &mut vertices[i as usize];
                v.tangent = (tangent + Vector3::from(v.tangent)).into();
                v.bitangent = (bitangent + Vector3::from(v.bitangent)).into();
                triangles_included[i as usize] += 1;
            }
        }

        for (v, n) in vertices.iter_mut().zip(triangles_included) {
            let normal = safe_normalize(Vector3::from(v.normal), Vector3::unit_y());
            let fallback = any_perpendicular(normal);
            if n == 0 {
                v.tangent = fallback.into();
                v.bitangent = normal.cross(fallback).into();
                continue;
            }
            v.tangent = safe_normalize(Vector3::from(v.tangent), fallback).into();
            v.bitangent =
                safe_normalize(Vector3::from(v.bitangent), normal.cross(fallback)).into();
        }
    }

    /// Box centred on the origin (24 vertices, one UV square per face).
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let mut b = GridBuilder::default();
        // +x, -x, +y, -y, +z, -z
        b.face([2, 1, 0], -1.0, -1.0, depth, height, width, 1, 1);
        b.face([2, 1, 0], 1.0, -1.0, depth, height, -width, 1, 1);
        b.face([0, 2, 1], 1.0, 1.0, width, depth, height, 1, 1);
        b.face([0, 2, 1], 1.0, -1.0, width, depth, -height, 1, 1);
        b.face([0, 1, 2], 1.0, -1.0, width, height, depth, 1, 1);
        b.face([0, 1, 2], -1.0, -1.0, width, height, -depth, 1, 1);
        b.finish("box")
    }

    /// Plane in XY facing +Z, centred on the origin.
    pub fn plane(width: f32, height: f32, width_segments: u32, height_segments: u32) -> Self {
        let mut b = GridBuilder::default();
        b.face(
            [0, 1, 2],
            1.0,
            -1.0,
            width,
            height,
            0.0,
            width_segments.max(1),
            height_segments.max(1),
        );
        b.finish("plane")
    }

    /// UV sphere around the Y axis.
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let ws = width_segments.max(3);
        let hs = height_segments.max(2);
        let mut vertices = Vec::with_capacity(((ws + 1) * (hs + 1)) as usize);
        for iy in 0..=hs {
            let v = iy as f32 / hs as f32;
            let theta = v * PI;
            for ix in 0..=ws {
                let u = ix as f32 / ws as f32;
                let phi = u * 2.0 * PI;
                let p = Vector3::new(
                    -radius * phi.cos() * theta.sin(),
                    radius * theta.cos(),
                    radius * phi.sin() * theta.sin(),
                );
                let n = safe_normalize(p, Vector3::unit_y());
                vertices.push(ModelVertex::new(p.into(), [u, v], n.into()));
            }
        }
        let row = ws + 1;
        let mut indices = Vec::new();
        for iy in 0..hs {
            for ix in 0..ws {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;
                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != hs - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }
        let mut geometry = Geometry::new("sphere", vertices, indices);
        geometry.compute_tangents();
        geometry
    }

    /// Capped cylinder (or cone frustum) along Y, centred on the origin.
    pub fn cylinder(radius_top: f32, radius_bottom: f32, height: f32, radial_segments: u32) -> Self {
        let rs = radial_segments.max(3);
        let half = height / 2.0;
        let slope = if height.abs() > f32::EPSILON {
            (radius_bottom - radius_top) / height
        } else {
            0.0
        };
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for y in 0..=1u32 {
            let v = y as f32;
            let radius = v * (radius_bottom - radius_top) + radius_top;
            for x in 0..=rs {
                let u = x as f32 / rs as f32;
                let theta = u * 2.0 * PI;
                let (sin, cos) = theta.sin_cos();
                let p = [radius * sin, -v * height + half, radius * cos];
                let n = safe_normalize(Vector3::new(sin, slope, cos), Vector3::unit_x());
                vertices.push(ModelVertex::new(p, [u, v], n.into()));
            }
        }
        let row = rs + 1;
        for x in 0..rs {
            let a = x;
            let b = row + x;
            let c = row + x + 1;
            let d = x + 1;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }

        for top in [true, false] {
            let radius = if top { radius_top } else { radius_bottom };
            let sign = if top { 1.0 } else { -1.0 };
            let center_start = vertices.len() as u32;
            for _ in 0..rs {
                vertices.push(ModelVertex::new([0.0, half * sign, 0.0], [0.5, 0.5], [0.0, sign, 0.0]));
            }
            let ring_start = vertices.len() as u32;
            for x in 0..=rs {
                let theta = x as f32 / rs as f32 * 2.0 * PI;
                let (sin, cos) = theta.sin_cos();
                vertices.push(ModelVertex::new(
                    [radius * sin, half * sign, radius * cos],
                    [cos * 0.5 + 0.5, 0.5 - sin * 0.5 * sign],
                    [0.0, sign, 0.0],
                ));
            }
            for x in 0..rs {
                let c = center_start + x;
                let i = ring_start + x;
                if top {
                    indices.extend_from_slice(&[i, i + 1, c]);
                } else {
                    indices.extend_from_slice(&[i + 1, i, c]);
                }
            }
        }

        let mut geometry = Geometry::new("cylinder", vertices, indices);
        geometry.compute_tangents();
        geometry
    }

    /// Torus in the XY plane around the Z axis.
    pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> Self {
        let radial = radial_segments.max(3);
        let tubular = tubular_segments.max(3);
        let mut vertices = Vec::new();
        for j in 0..=radial {
            for i in 0..=tubular {
                let u = i as f32 / tubular as f32 * 2.0 * PI;
                let v = j as f32 / radial as f32 * 2.0 * PI;
                let p = Vector3::new(
                    (radius + tube * v.cos()) * u.cos(),
                    (radius + tube * v.cos()) * u.sin(),
                    tube * v.sin(),
                );
                let center = Vector3::new(radius * u.cos(), radius * u.sin(), 0.0);
                let n = safe_normalize(p - center, Vector3::unit_z());
                vertices.push(ModelVertex::new(
                    p.into(),
                    [i as f32 / tubular as f32, 1.0 - j as f32 / radial as f32],
                    n.into(),
                ));
            }
        }
        let mut indices = Vec::new();
        let row = tubular + 1;
        for j in 1..=radial {
            for i in 1..=tubular {
                let a = row * j + i - 1;
                let b = row * (j - 1) + i - 1;
                let c = row * (j - 1) + i;
                let d = row * j + i;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
        let mut geometry = Geometry::new("torus", vertices, indices);
        geometry.compute_tangents();
        geometry
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Accumulates axis-aligned grid faces (box sides, planes).
#[derive(Default)]
struct GridBuilder {
    vertices: Vec<ModelVertex>,
    indices: Vec<u32>,
}

impl GridBuilder {
    /// `axes` maps the face's (u, v, w) onto (x, y, z) indices; `depth` is
    /// the signed offset along w and also picks the normal direction.
    #[allow(clippy::too_many_arguments)]
    fn face(
        &mut self,
        axes: [usize; 3],
        udir: f32,
        vdir: f32,
        width: f32,
        height: f32,
        depth: f32,
        grid_x: u32,
        grid_y: u32,
    ) {
        let [u, v, w] = axes;
        let start = self.vertices.len() as u32;
        let seg_w = width / grid_x as f32;
        let seg_h = height / grid_y as f32;
        for iy in 0..=grid_y {
            let y = iy as f32 * seg_h - height / 2.0;
            for ix in 0..=grid_x {
                let x = ix as f32 * seg_w - width / 2.0;
                let mut p = [0.0f32; 3];
                p[u] = x * udir;
                p[v] = y * vdir;
                p[w] = depth / 2.0;
                let mut n = [0.0f32; 3];
                n[w] = if depth >= 0.0 { 1.0 } else { -1.0 };
                self.vertices.push(ModelVertex::new(
                    p,
                    [ix as f32 / grid_x as f32, iy as f32 / grid_y as f32],
                    n,
                ));
            }
        }
        let row = grid_x + 1;
        for iy in 0..grid_y {
            for ix in 0..grid_x {
                let a = start + ix + row * iy;
                let b = start + ix + row * (iy + 1);
                let c = start + ix + 1 + row * (iy + 1);
                let d = start + ix + 1 + row * iy;
                self.indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
    }

    fn finish(self, name: &str) -> Geometry {
        let mut geometry = Geometry::new(name, self.vertices, self.indices);
        geometry.compute_tangents();
        geometry
    }
}

pub(crate) fn safe_normalize(v: Vector3<f32>, fallback: Vector3<f32>) -> Vector3<f32> {
    let len = v.magnitude();
    if len > 1e-12 && len.is_finite() {
        v / len
    } else {
        fallback
    }
}

pub(crate) fn any_perpendicular(n: Vector3<f32>) -> Vector3<f32> {
    let axis = if n.x.abs() < 0.9 {
        Vector3::unit_x()
    } else {
        Vector3::unit_y()
    };
    safe_normalize(axis - n * n.dot(axis), Vector3::unit_z())
}
