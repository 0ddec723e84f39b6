//! The rug's colour and normal maps, painted on the CPU.

use cgmath::Vector2;
use image::{Rgba, RgbaImage};
use rand::Rng;

pub const RUG_WIDTH: u32 = 1024;
pub const RUG_HEIGHT: u32 = 512;
pub const SPECK_COUNT: usize = 12_000;

const BASE: [u8; 3] = [0xE8, 0xD9, 0xC9];
const SPECK: [u8; 3] = [160, 140, 120];
const BLOB: [u8; 3] = [0xB5, 0x3A, 0x2C];

const BLOB_START: [f32; 2] = [120.0, 300.0];
/// Control points and end point of each cubic piece of the blob outline.
const BLOB_CURVES: [[[f32; 2]; 3]; 4] = [
    [[220.0, 120.0], [420.0, 100.0], [560.0, 240.0]],
    [[700.0, 400.0], [880.0, 360.0], [950.0, 250.0]],
    [[950.0, 400.0], [700.0, 460.0], [520.0, 420.0]],
    [[360.0, 390.0], [200.0, 460.0], [120.0, 300.0]],
];
const CURVE_STEPS: usize = 32;

pub struct RugTextures {
    pub color: RgbaImage,
    pub normal: RgbaImage,
}

/// Paints the rug with thread-local randomness.
pub fn synthesize_rug() -> RugTextures {
    synthesize_rug_with(&mut rand::rng())
}

pub fn synthesize_rug_with<R: Rng + ?Sized>(rng: &mut R) -> RugTextures {
    let mut color = RgbaImage::from_pixel(RUG_WIDTH, RUG_HEIGHT, Rgba([BASE[0], BASE[1], BASE[2], 255]));

    for _ in 0..SPECK_COUNT {
        let x = rng.random_range(0..RUG_WIDTH);
        let y = rng.random_range(0..RUG_HEIGHT);
        let alpha = 0.02 + rng.random::<f32>() * 0.03;
        blend(color.get_pixel_mut(x, y), SPECK, alpha);
    }

    fill_polygon(&mut color, &blob_outline(), BLOB);

    let normal = normal_from_color(&color);
    RugTextures { color, normal }
}

/// Flattens the closed blob outline into a polygon.
pub fn blob_outline() -> Vec<Vector2<f32>> {
    let mut points = vec![Vector2::from(BLOB_START)];
    let mut from = Vector2::from(BLOB_START);
    for [c1, c2, to] in BLOB_CURVES {
        let (c1, c2, to) = (Vector2::from(c1), Vector2::from(c2), Vector2::from(to));
        for step in 1..=CURVE_STEPS {
            let t = step as f32 / CURVE_STEPS as f32;
            points.push(cubic_bezier(from, c1, c2, to, t));
        }
        from = to;
    }
    points
}

fn cubic_bezier(p0: Vector2<f32>, p1: Vector2<f32>, p2: Vector2<f32>, p3: Vector2<f32>, t: f32) -> Vector2<f32> {
    let k = 1.0 - t;
    p0 * (k * k * k) + p1 * (3.0 * k * k * t) + p2 * (3.0 * k * t * t) + p3 * (t * t * t)
}

fn blend(pixel: &mut Rgba<u8>, rgb: [u8; 3], alpha: f32) {
    for (dst, src) in pixel.0.iter_mut().zip(rgb) {
        let mixed = src as f32 * alpha + *dst as f32 * (1.0 - alpha);
        *dst = mixed.round().clamp(0.0, 255.0) as u8;
    }
}

/// Non-zero scanline fill sampled at pixel centres.
fn fill_polygon(image: &mut RgbaImage, polygon: &[Vector2<f32>], rgb: [u8; 3]) {
    let (width, height) = image.dimensions();
    let mut crossings: Vec<(f32, i32)> = Vec::new();
    for y in 0..height {
        let sy = y as f32 + 0.5;
        crossings.clear();
        for (i, a) in polygon.iter().enumerate() {
            let b = polygon[(i + 1) % polygon.len()];
            if (a.y <= sy) == (b.y <= sy) {
                continue;
            }
            let x = a.x + (sy - a.y) / (b.y - a.y) * (b.x - a.x);
            crossings.push((x, if b.y > a.y { 1 } else { -1 }));
        }
        crossings.sort_by(|l, r| l.0.total_cmp(&r.0));

        let mut winding = 0;
        for pair in crossings.windows(2) {
            winding += pair[0].1;
            if winding == 0 {
                continue;
            }
            let start = (pair[0].0 - 0.5).ceil().max(0.0) as u32;
            let end = ((pair[1].0 - 0.5).ceil().max(0.0) as u32).min(width);
            for x in start..end {
                let p = image.get_pixel_mut(x, y);
                *p = Rgba([rgb[0], rgb[1], rgb[2], 255]);
            }
        }
    }
}

/// Height-from-luminance tangent-space normals: brightness tilts x and y
/// equally, z stays straight up.
pub fn normal_from_color(color: &RgbaImage) -> RgbaImage {
    let mut normal = RgbaImage::new(color.width(), color.height());
    for (src, dst) in color.pixels().zip(normal.pixels_mut()) {
        let avg = (src[0] as f32 + src[1] as f32 + src[2] as f32) / 3.0;
        let v = avg / 255.0;
        let tilt = (128.0 + (v - 0.5) * 55.0).round() as u8;
        *dst = Rgba([tilt, tilt, 255, 255]);
    }
    normal
}
