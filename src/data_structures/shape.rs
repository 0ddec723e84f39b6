//! Flat 2-D outlines and their extrusion into bevelled solids.

use std::f32::consts::{FRAC_PI_2, PI};

use cgmath::{InnerSpace, Vector2, Vector3};

use crate::data_structures::{
    geometry::{Geometry, safe_normalize},
    model::ModelVertex,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Segment {
    Line(Vector2<f32>),
    Quadratic {
        control: Vector2<f32>,
        to: Vector2<f32>,
    },
    /// Counter-clockwise when `end > start`.
    Arc {
        center: Vector2<f32>,
        radius: f32,
        start: f32,
        end: f32,
    },
}

/// A closed outline drawn with a pen: a start point followed by segments.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape2D {
    start: Vector2<f32>,
    segments: Vec<Segment>,
}

impl Shape2D {
    pub fn move_to(x: f32, y: f32) -> Self {
        Self {
            start: Vector2::new(x, y),
            segments: Vec::new(),
        }
    }

    pub fn line_to(mut self, x: f32, y: f32) -> Self {
        self.segments.push(Segment::Line(Vector2::new(x, y)));
        self
    }

    pub fn quadratic_to(mut self, cx: f32, cy: f32, x: f32, y: f32) -> Self {
        self.segments.push(Segment::Quadratic {
            control: Vector2::new(cx, cy),
            to: Vector2::new(x, y),
        });
        self
    }

    pub fn arc(mut self, cx: f32, cy: f32, radius: f32, start: f32, end: f32) -> Self {
        self.segments.push(Segment::Arc {
            center: Vector2::new(cx, cy),
            radius,
            start,
            end,
        });
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Flattens the outline. Curved segments are split into
    /// `curve_segments` pieces; coincident neighbours and a closing point
    /// equal to the first one are dropped.
    pub fn points(&self, curve_segments: u32) -> Vec<Vector2<f32>> {
        let n = curve_segments.max(1);
        let mut pts = vec![self.start];
        let mut pen = self.start;
        for segment in &self.segments {
            match *segment {
                Segment::Line(to) => {
                    pts.push(to);
                    pen = to;
                }
                Segment::Quadratic { control, to } => {
                    for j in 1..=n {
                        let t = j as f32 / n as f32;
                        let s = 1.0 - t;
                        pts.push(pen * (s * s) + control * (2.0 * s * t) + to * (t * t));
                    }
                    pen = to;
                }
                Segment::Arc {
                    center,
                    radius,
                    start,
                    end,
                } => {
                    for j in 1..=n {
                        let a = start + (end - start) * j as f32 / n as f32;
                        pts.push(center + Vector2::new(a.cos(), a.sin()) * radius);
                    }
                    pen = center + Vector2::new(end.cos(), end.sin()) * radius;
                }
            }
        }
        dedupe(pts)
    }
}

fn dedupe(points: Vec<Vector2<f32>>) -> Vec<Vector2<f32>> {
    const EPS: f32 = 1e-6;
    let mut out: Vec<Vector2<f32>> = Vec::with_capacity(points.len());
    for p in points {
        if !(p.x.is_finite() && p.y.is_finite()) {
            continue;
        }
        if out.last().is_some_and(|q| (p - *q).magnitude2() < EPS * EPS) {
            continue;
        }
        out.push(p);
    }
    while out.len() > 1 && (out[0] - out[out.len() - 1]).magnitude2() < EPS * EPS {
        out.pop();
    }
    out
}

fn sanitize_extent(x: f32) -> f32 {
    if x.is_finite() && x > 0.0 { x } else { 0.0 }
}

/// Corner radius limited to `[0, min(width, height) / 2]`. Negative, NaN or
/// otherwise unusable radii become `0`.
pub fn clamp_corner_radius(width: f32, height: f32, radius: f32) -> f32 {
    let limit = sanitize_extent(width).min(sanitize_extent(height)) / 2.0;
    if radius.is_nan() || radius <= 0.0 {
        return 0.0;
    }
    radius.min(limit)
}

/// Rectangle centred on the origin with quarter-circle corners.
pub fn rounded_rect(width: f32, height: f32, radius: f32) -> Shape2D {
    let r = clamp_corner_radius(width, height, radius);
    let hw = sanitize_extent(width) / 2.0;
    let hh = sanitize_extent(height) / 2.0;
    Shape2D::move_to(-hw + r, -hh)
        .line_to(hw - r, -hh)
        .arc(hw - r, -hh + r, r, -FRAC_PI_2, 0.0)
        .line_to(hw, hh - r)
        .arc(hw - r, hh - r, r, 0.0, FRAC_PI_2)
        .line_to(-hw + r, hh)
        .arc(-hw + r, hh - r, r, FRAC_PI_2, PI)
        .line_to(-hw, -hh + r)
        .arc(-hw + r, -hh + r, r, PI, PI + FRAC_PI_2)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtrudeOptions {
    pub depth: f32,
    pub bevel_thickness: f32,
    pub bevel_size: f32,
    pub bevel_segments: u32,
    pub curve_segments: u32,
}

impl Default for ExtrudeOptions {
    fn default() -> Self {
        Self {
            depth: 1.0,
            bevel_thickness: 0.2,
            bevel_size: 0.1,
            bevel_segments: 3,
            curve_segments: 12,
        }
    }
}

/// Extrudes `shape` along +Z from `0` to `depth`. The bevel grows the
/// outline by up to `bevel_size` following a quarter sine, and adds
/// `bevel_thickness` below `0` and above `depth`. Caps are fan-triangulated,
/// so the outline must be convex. Outlines with fewer than three distinct
/// points give an empty geometry.
pub fn extrude(shape: &Shape2D, options: &ExtrudeOptions) -> Geometry {
    let mut contour = shape.points(options.curve_segments);
    if contour.len() < 3 {
        return Geometry::new("extrusion", Vec::new(), Vec::new());
    }
    if signed_area(&contour) < 0.0 {
        contour.reverse();
    }
    let n = contour.len();
    let depth = sanitize_extent(options.depth);
    let thickness = sanitize_extent(options.bevel_thickness);
    let size = sanitize_extent(options.bevel_size);
    let bevel_segments = if thickness > 0.0 || size > 0.0 {
        options.bevel_segments
    } else {
        0
    };
    let moves = miter_vectors(&contour);

    // (z, outward offset) per ring, bottom to top
    let mut rings: Vec<(f32, f32)> = Vec::new();
    for b in 0..bevel_segments {
        let t = b as f32 / bevel_segments as f32;
        rings.push((-thickness * (t * FRAC_PI_2).cos(), size * (t * FRAC_PI_2).sin()));
    }
    rings.push((0.0, size));
    rings.push((depth, size));
    for b in (0..bevel_segments).rev() {
        let t = b as f32 / bevel_segments as f32;
        rings.push((depth + thickness * (t * FRAC_PI_2).cos(), size * (t * FRAC_PI_2).sin()));
    }

    let ring_point = |ring: usize, i: usize| -> Vector3<f32> {
        let (z, offset) = rings[ring];
        let p = contour[i % n] + moves[i % n] * offset;
        Vector3::new(p.x, p.y, z)
    };

    // smooth side normals over the closed ring
    let mut side_normals = vec![Vector3::new(0.0f32, 0.0, 0.0); rings.len() * n];
    for k in 0..rings.len() - 1 {
        for i in 0..n {
            let a = ring_point(k, i);
            let b = ring_point(k, i + 1);
            let c = ring_point(k + 1, i + 1);
            let d = ring_point(k + 1, i);
            let face = (b - a).cross(c - a) + (c - a).cross(d - a);
            for (ring, idx) in [(k, i), (k, i + 1), (k + 1, i + 1), (k + 1, i)] {
                side_normals[ring * n + idx % n] += face;
            }
        }
    }

    let mut perimeter = vec![0.0f32; n + 1];
    for i in 0..n {
        perimeter[i + 1] = perimeter[i] + (contour[(i + 1) % n] - contour[i]).magnitude();
    }
    let total = perimeter[n].max(f32::EPSILON);
    let z_min = rings[0].0;
    let z_span = (rings[rings.len() - 1].0 - z_min).max(f32::EPSILON);

    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    let row = n as u32 + 1;
    for (k, &(z, _)) in rings.iter().enumerate() {
        for i in 0..=n {
            let normal = safe_normalize(side_normals[k * n + i % n], Vector3::unit_z());
            vertices.push(ModelVertex::new(
                ring_point(k, i).into(),
                [perimeter[i] / total, 1.0 - (z - z_min) / z_span],
                normal.into(),
            ));
        }
    }
    for k in 0..rings.len() as u32 - 1 {
        for i in 0..n as u32 {
            let a = k * row + i;
            let b = k * row + i + 1;
            let c = (k + 1) * row + i + 1;
            let d = (k + 1) * row + i;
            indices.extend_from_slice(&[a, b, c, a, c, d]);
        }
    }

    let (min, max) = contour.iter().fold(
        (contour[0], contour[0]),
        |(lo, hi), p| {
            (
                Vector2::new(lo.x.min(p.x), lo.y.min(p.y)),
                Vector2::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        },
    );
    let extent = Vector2::new((max.x - min.x).max(f32::EPSILON), (max.y - min.y).max(f32::EPSILON));
    for (ring, nz) in [(0usize, -1.0f32), (rings.len() - 1, 1.0)] {
        let start = vertices.len() as u32;
        for i in 0..n {
            let p = ring_point(ring, i);
            vertices.push(ModelVertex::new(
                p.into(),
                [(p.x - min.x) / extent.x, 1.0 - (p.y - min.y) / extent.y],
                [0.0, 0.0, nz],
            ));
        }
        for i in 1..n as u32 - 1 {
            if nz > 0.0 {
                indices.extend_from_slice(&[start, start + i, start + i + 1]);
            } else {
                indices.extend_from_slice(&[start, start + i + 1, start + i]);
            }
        }
    }

    let mut geometry = Geometry::new("extrusion", vertices, indices);
    geometry.compute_tangents();
    geometry
}

fn signed_area(points: &[Vector2<f32>]) -> f32 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (p, q) = (points[i], points[(i + 1) % n]);
            p.x * q.y - q.x * p.y
        })
        .sum::<f32>()
        / 2.0
}

/// Outward offset per point of a counter-clockwise contour, scaled so that
/// both adjacent edges move by one unit.
fn miter_vectors(contour: &[Vector2<f32>]) -> Vec<Vector2<f32>> {
    let n = contour.len();
    let edge_normal = |a: Vector2<f32>, b: Vector2<f32>| {
        let d = b - a;
        let len = d.magnitude();
        if len > f32::EPSILON {
            Vector2::new(d.y, -d.x) / len
        } else {
            Vector2::new(0.0, 0.0)
        }
    };
    (0..n)
        .map(|i| {
            let prev = edge_normal(contour[(i + n - 1) % n], contour[i]);
            let next = edge_normal(contour[i], contour[(i + 1) % n]);
            let sum = prev + next;
            let len = sum.magnitude();
            if len < 1e-6 {
                return next;
            }
            let dir = sum / len;
            let cos = dir.dot(next).max(0.25);
            dir / cos
        })
        .collect()
}
