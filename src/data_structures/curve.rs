//! Catmull-Rom splines through control points and tubes swept along them.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Quaternion, Rad, Rotation3, Vector3};

use crate::data_structures::{
    geometry::{Geometry, safe_normalize},
    model::ModelVertex,
};

const ARC_LENGTH_DIVISIONS: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CurveKind {
    /// Uniform parameterisation with the given tension.
    CatmullRom { tension: f32 },
    Centripetal,
    Chordal,
}

#[derive(Clone, Copy, Debug, Default)]
struct CubicPoly {
    c0: f32,
    c1: f32,
    c2: f32,
    c3: f32,
}

impl CubicPoly {
    fn hermite(x0: f32, x1: f32, t0: f32, t1: f32) -> Self {
        Self {
            c0: x0,
            c1: t0,
            c2: -3.0 * x0 + 3.0 * x1 - 2.0 * t0 - t1,
            c3: 2.0 * x0 - 2.0 * x1 + t0 + t1,
        }
    }

    fn uniform(x0: f32, x1: f32, x2: f32, x3: f32, tension: f32) -> Self {
        Self::hermite(x1, x2, tension * (x2 - x0), tension * (x3 - x1))
    }

    fn nonuniform(x0: f32, x1: f32, x2: f32, x3: f32, dt0: f32, dt1: f32, dt2: f32) -> Self {
        let t1 = ((x1 - x0) / dt0 - (x2 - x0) / (dt0 + dt1) + (x2 - x1) / dt1) * dt1;
        let t2 = ((x2 - x1) / dt1 - (x3 - x1) / (dt1 + dt2) + (x3 - x2) / dt2) * dt1;
        Self::hermite(x1, x2, t1, t2)
    }

    fn calc(&self, t: f32) -> f32 {
        let t2 = t * t;
        self.c0 + self.c1 * t + self.c2 * t2 + self.c3 * t2 * t
    }
}

/// Interpolating spline through `points`, evaluated like three.js'
/// `CatmullRomCurve3` so authored control lists keep their shape.
#[derive(Clone, Debug)]
pub struct CatmullRomCurve3 {
    points: Vec<Vector3<f32>>,
    closed: bool,
    kind: CurveKind,
    lengths: Vec<f32>,
}

impl CatmullRomCurve3 {
    pub fn new(points: Vec<Vector3<f32>>, closed: bool, kind: CurveKind) -> Self {
        let mut curve = Self {
            points,
            closed,
            kind,
            lengths: Vec::new(),
        };
        curve.lengths = curve.arc_lengths(ARC_LENGTH_DIVISIONS);
        curve
    }

    pub fn centripetal(points: Vec<Vector3<f32>>, closed: bool) -> Self {
        Self::new(points, closed, CurveKind::Centripetal)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn length(&self) -> f32 {
        self.lengths.last().copied().unwrap_or(0.0)
    }

    /// Point at curve parameter `t` in `[0, 1]`.
    pub fn point(&self, t: f32) -> Vector3<f32> {
        let pts = &self.points;
        let l = pts.len();
        match l {
            0 => return Vector3::new(0.0, 0.0, 0.0),
            1 => return pts[0],
            _ => {}
        }
        let p = (l - usize::from(!self.closed)) as f32 * t.clamp(0.0, 1.0);
        let mut int_point = p.floor() as usize;
        let mut weight = p - int_point as f32;
        if !self.closed && weight == 0.0 && int_point == l - 1 {
            int_point = l - 2;
            weight = 1.0;
        }

        let p0 = if self.closed || int_point > 0 {
            pts[(int_point + l - 1) % l]
        } else {
            pts[0] * 2.0 - pts[1]
        };
        let p1 = pts[int_point % l];
        let p2 = pts[(int_point + 1) % l];
        let p3 = if self.closed || int_point + 2 < l {
            pts[(int_point + 2) % l]
        } else {
            pts[l - 1] * 2.0 - pts[l - 2]
        };

        let polys: [CubicPoly; 3] = match self.kind {
            CurveKind::CatmullRom { tension } => [0, 1, 2]
                .map(|axis| CubicPoly::uniform(p0[axis], p1[axis], p2[axis], p3[axis], tension)),
            CurveKind::Centripetal | CurveKind::Chordal => {
                let pow = if self.kind == CurveKind::Chordal { 0.5 } else { 0.25 };
                let mut dt0 = (p1 - p0).magnitude2().powf(pow);
                let mut dt1 = (p2 - p1).magnitude2().powf(pow);
                let mut dt2 = (p3 - p2).magnitude2().powf(pow);
                if dt1 < 1e-4 {
                    dt1 = 1.0;
                }
                if dt0 < 1e-4 {
                    dt0 = dt1;
                }
                if dt2 < 1e-4 {
                    dt2 = dt1;
                }
                [0, 1, 2].map(|axis| {
                    CubicPoly::nonuniform(p0[axis], p1[axis], p2[axis], p3[axis], dt0, dt1, dt2)
                })
            }
        };
        Vector3::new(polys[0].calc(weight), polys[1].calc(weight), polys[2].calc(weight))
    }

    fn arc_lengths(&self, divisions: usize) -> Vec<f32> {
        let mut lengths = Vec::with_capacity(divisions + 1);
        let mut last = self.point(0.0);
        let mut sum = 0.0;
        lengths.push(0.0);
        for p in 1..=divisions {
            let current = self.point(p as f32 / divisions as f32);
            sum += (current - last).magnitude();
            lengths.push(sum);
            last = current;
        }
        lengths
    }

    /// Maps an arc-length fraction `u` to the curve parameter `t`.
    pub fn u_to_t(&self, u: f32) -> f32 {
        let lengths = &self.lengths;
        let il = lengths.len();
        let total = self.length();
        if il < 2 || total <= 0.0 {
            return u.clamp(0.0, 1.0);
        }
        let target = u.clamp(0.0, 1.0) * total;
        // last index whose length is below the target
        let i = lengths.partition_point(|&len| len < target).saturating_sub(1);
        if lengths[i] == target {
            return i as f32 / (il - 1) as f32;
        }
        let before = lengths[i];
        let after = lengths[(i + 1).min(il - 1)];
        let span = after - before;
        let fraction = if span > 0.0 { (target - before) / span } else { 0.0 };
        ((i as f32 + fraction) / (il - 1) as f32).clamp(0.0, 1.0)
    }

    /// Point at arc-length fraction `u`.
    pub fn point_at(&self, u: f32) -> Vector3<f32> {
        self.point(self.u_to_t(u))
    }

    pub fn tangent_at(&self, u: f32) -> Vector3<f32> {
        let t = self.u_to_t(u);
        let delta = 0.0001;
        let t1 = (t - delta).max(0.0);
        let t2 = (t + delta).min(1.0);
        safe_normalize(self.point(t2) - self.point(t1), Vector3::unit_x())
    }

    /// Tangent, normal and binormal per sample. Normals are transported
    /// along the curve; on closed curves the residual twist is spread evenly
    /// so the last frame matches the first.
    pub fn frames(&self, segments: u32) -> Vec<Frame> {
        let segments = segments.max(1) as usize;
        let tangents: Vec<Vector3<f32>> = (0..=segments)
            .map(|i| self.tangent_at(i as f32 / segments as f32))
            .collect();

        let t0 = tangents[0];
        let (tx, ty, tz) = (t0.x.abs(), t0.y.abs(), t0.z.abs());
        let mut min = f32::MAX;
        let mut seed = Vector3::unit_x();
        if tx <= min {
            min = tx;
            seed = Vector3::unit_x();
        }
        if ty <= min {
            min = ty;
            seed = Vector3::unit_y();
        }
        if tz <= min {
            seed = Vector3::unit_z();
        }
        let side = safe_normalize(t0.cross(seed), Vector3::unit_y());
        let mut normals = vec![t0.cross(side)];

        for i in 1..=segments {
            let mut normal = normals[i - 1];
            let axis = tangents[i - 1].cross(tangents[i]);
            if axis.magnitude() > f32::EPSILON {
                let theta = tangents[i - 1].dot(tangents[i]).clamp(-1.0, 1.0).acos();
                normal = Quaternion::from_axis_angle(axis.normalize(), Rad(theta)) * normal;
            }
            normals.push(normal);
        }

        if self.closed {
            let mut theta =
                normals[0].dot(normals[segments]).clamp(-1.0, 1.0).acos() / segments as f32;
            if tangents[0].dot(normals[0].cross(normals[segments])) > 0.0 {
                theta = -theta;
            }
            for (i, normal) in normals.iter_mut().enumerate().skip(1) {
                *normal = Quaternion::from_axis_angle(tangents[i], Rad(theta * i as f32)) * *normal;
            }
        }

        tangents
            .into_iter()
            .zip(normals)
            .map(|(tangent, normal)| Frame {
                tangent,
                normal,
                binormal: tangent.cross(normal),
            })
            .collect()
    }

    /// Circular tube of `radius` swept along the curve. On closed curves the
    /// last ring reuses the first ring's positions exactly.
    pub fn tube(&self, tubular_segments: u32, radius: f32, radial_segments: u32) -> Geometry {
        let tubular = tubular_segments.max(1);
        let radial = radial_segments.max(3);
        let frames = self.frames(tubular);

        let ring = |i: u32| -> Vec<(Vector3<f32>, Vector3<f32>)> {
            let frame = &frames[i as usize];
            let center = self.point_at(i as f32 / tubular as f32);
            (0..=radial)
                .map(|j| {
                    let v = j as f32 / radial as f32 * 2.0 * PI;
                    let normal = safe_normalize(
                        frame.normal * -v.cos() + frame.binormal * v.sin(),
                        frame.normal,
                    );
                    (center + normal * radius, normal)
                })
                .collect()
        };

        let mut vertices = Vec::with_capacity(((tubular + 1) * (radial + 1)) as usize);
        let first = ring(0);
        for i in 0..=tubular {
            let current = if i == 0 || (i == tubular && self.closed) {
                first.clone()
            } else {
                ring(i)
            };
            for (j, (position, normal)) in current.into_iter().enumerate() {
                vertices.push(ModelVertex::new(
                    position.into(),
                    [i as f32 / tubular as f32, j as f32 / radial as f32],
                    normal.into(),
                ));
            }
        }

        let mut indices = Vec::with_capacity((tubular * radial * 6) as usize);
        let row = radial + 1;
        for j in 1..=tubular {
            for i in 1..=radial {
                let a = row * (j - 1) + (i - 1);
                let b = row * j + (i - 1);
                let c = row * j + i;
                let d = row * (j - 1) + i;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        let mut geometry = Geometry::new("tube", vertices, indices);
        geometry.compute_tangents();
        geometry
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    pub tangent: Vector3<f32>,
    pub normal: Vector3<f32>,
    pub binormal: Vector3<f32>,
}
