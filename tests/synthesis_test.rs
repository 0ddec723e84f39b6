use ab_glyph::{Font, ScaleFont};
use image::RgbaImage;
use rand::{SeedableRng, rngs::StdRng};
use studio_room::{
    builders::book::{COVER_GROUP, PortfolioBookParams, build_portfolio_book, printed_cover},
    data_structures::{color::Color, material::MaterialLibrary},
    synthesis::{
        cover::{CoverArt, builtin_font, cover_layout, render_cover, scale_for},
        rug::{RUG_HEIGHT, RUG_WIDTH, normal_from_color, synthesize_rug_with},
    },
};

#[test]
fn rug_normal_map_matches_colour_map() {
    let rug = synthesize_rug_with(&mut StdRng::seed_from_u64(7));
    assert_eq!(rug.color.dimensions(), (RUG_WIDTH, RUG_HEIGHT));
    assert_eq!(rug.normal.dimensions(), rug.color.dimensions());
    for pixel in rug.normal.pixels() {
        assert_eq!(pixel[2], 255);
        assert_eq!(pixel[0], pixel[1]);
    }
}

#[test]
fn rug_blob_is_painted_solid() {
    let rug = synthesize_rug_with(&mut StdRng::seed_from_u64(1));
    let inside = rug.color.get_pixel(500, 300);
    assert_eq!(inside.0, [0xB5, 0x3A, 0x2C, 255]);
}

#[test]
fn rug_is_reproducible_from_a_seed() {
    let a = synthesize_rug_with(&mut StdRng::seed_from_u64(42));
    let b = synthesize_rug_with(&mut StdRng::seed_from_u64(42));
    assert_eq!(a.color, b.color);
    assert_eq!(a.normal, b.normal);
}

#[test]
fn normal_tilt_follows_brightness() {
    let mut image = image::RgbaImage::new(2, 1);
    image.put_pixel(0, 0, image::Rgba([0, 0, 0, 255]));
    image.put_pixel(1, 0, image::Rgba([255, 255, 255, 255]));
    let normal = normal_from_color(&image);
    // 128 -/+ 27.5, rounded
    assert_eq!(normal.get_pixel(0, 0).0, [101, 101, 255, 255]);
    assert_eq!(normal.get_pixel(1, 0).0, [156, 156, 255, 255]);
}

#[test]
fn cover_is_deterministic() {
    let art = CoverArt::new(Color::from_hex(0x39E136), "TITLE", "SUBTITLE");
    let a = render_cover(&art, None);
    let b = render_cover(&art, None);
    assert_eq!(a, b);
    assert_eq!(a.dimensions(), (1024, 1024));
    assert_eq!(a.get_pixel(512, 512).0, Color::from_hex(0x39E136).to_rgba8().0);

    let params = PortfolioBookParams::default();
    assert_eq!(*printed_cover(&params, None).image, *printed_cover(&params, None).image);
}

#[test]
fn cover_layout_without_font() {
    let art = CoverArt::new(Color::WHITE, "A", "B");
    let [title, subtitle] = cover_layout(&art, None);
    assert_eq!(title.center_x, 512.0);
    assert!((title.baseline - 0.42 * 1024.0).abs() < 1e-3);
    assert!((subtitle.baseline - 0.53 * 1024.0).abs() < 1e-3);
    assert_eq!(title.px, 90.0);
    assert_eq!(subtitle.px, 80.0);
    assert_eq!(title.width, 0.0);
}

/// Ink bounding box `(left, top, right, bottom)` within rows `rows`.
fn ink_bounds(image: &RgbaImage, background: [u8; 4], rows: std::ops::Range<u32>) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for y in rows {
        for x in 0..image.width() {
            if image.get_pixel(x, y).0 == background {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((l, t, r, b)) => (l.min(x), t.min(y), r.max(x), b.max(y)),
            });
        }
    }
    bounds
}

#[test]
fn text_size_is_the_em_size() {
    let font = builtin_font().unwrap();
    let scaled = font.as_scaled(scale_for(&font, 100.0));
    let em = scaled.scale_factor().vertical * font.units_per_em().unwrap();
    assert!((em - 100.0).abs() < 1e-3, "em is {em}px");
}

#[test]
fn lettering_sits_on_the_baselines() {
    let font = builtin_font().unwrap();
    let art = PortfolioBookParams::default().cover_art();
    let background = art.color.to_rgba8().0;
    let image = render_cover(&art, Some(&font));
    let [title, subtitle] = cover_layout(&art, Some(&font));

    let (_, title_top, _, title_bottom) = ink_bounds(&image, background, 0..470).unwrap();
    let (_, _, _, subtitle_bottom) = ink_bounds(&image, background, 470..1024).unwrap();
    assert!((title_bottom as f32 - title.baseline).abs() <= 3.0, "title ends at {title_bottom}");
    assert!(
        (subtitle_bottom as f32 - subtitle.baseline).abs() <= 3.0,
        "subtitle ends at {subtitle_bottom}"
    );

    // capitals are about 0.73 em tall in the bundled face
    let cap = title.baseline - title_top as f32;
    assert!((cap - 0.73 * title.px).abs() < 6.0, "capitals are {cap}px tall");
}

#[test]
fn lettering_is_centred_and_inside_the_cover() {
    let font = builtin_font().unwrap();
    let art = PortfolioBookParams::default().cover_art();
    let background = art.color.to_rgba8().0;
    let image = render_cover(&art, Some(&font));

    for (line, rows) in cover_layout(&art, Some(&font)).iter().zip([0..470, 470..1024]) {
        assert!(line.width > 0.0 && line.width < art.size as f32, "{} is {}px wide", line.text, line.width);
        let (left, _, right, _) = ink_bounds(&image, background, rows).unwrap();
        assert!(left > 0 && right < art.size - 1, "{} touches the edge", line.text);
        let centre = (left + right) as f32 / 2.0;
        assert!((centre - line.center_x).abs() < 8.0, "{} is centred at {centre}", line.text);
    }
}

#[test]
fn book_cover_is_lettered_without_a_loaded_font() {
    let params = PortfolioBookParams::default();
    let mut materials = MaterialLibrary::new();
    build_portfolio_book(&params, &mut materials);
    let handle = materials.group(COVER_GROUP)[0];
    let cover = materials.get(handle).unwrap().maps.color.clone().unwrap();
    assert_ne!(*cover.image, *printed_cover(&params, None).image);
}
