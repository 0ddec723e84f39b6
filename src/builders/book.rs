//! A closed hardcover book lying flat, with an optional printed cover.

use std::{f32::consts::PI, sync::Arc};

use serde::Deserialize;

use crate::{
    builders::sanitize,
    data_structures::{
        color::Color,
        geometry::Geometry,
        material::{Material, MaterialLibrary, TextureSettings, TextureSlot, TextureSource, Wrap},
        scene_graph::{ContainerNode, MeshNode},
    },
    synthesis::cover::{CoverArt, builtin_font, render_cover},
};

pub const COVER_GROUP: &str = "book.cover";
pub const PAGE_GROUP: &str = "book.pages";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PortfolioBookParams {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
    pub color: Color,
    pub page_color: Color,
    pub with_text: bool,
    pub title: String,
    pub subtitle: String,
}

impl Default for PortfolioBookParams {
    fn default() -> Self {
        Self {
            width: 0.8,
            height: 0.09,
            depth: 1.0,
            color: Color::from_hex(0x39E136),
            page_color: Color::from_hex(0xf8f4e8),
            with_text: true,
            title: String::from("MATTEO LIVROZET \u{2014}"),
            subtitle: String::from("PORTFOLIO VOL.01"),
        }
    }
}

impl PortfolioBookParams {
    pub fn cover_art(&self) -> CoverArt {
        CoverArt::new(self.color, self.title.clone(), self.subtitle.clone())
    }
}

/// Builds the book resting on the local origin. With `with_text` the cover
/// carries a synthesized texture lettered with the built-in font; a
/// configured font replaces it through [`printed_cover`].
pub fn build_portfolio_book(params: &PortfolioBookParams, materials: &mut MaterialLibrary) -> ContainerNode {
    let w = sanitize(params.width, 0.001, 0.8);
    let h = sanitize(params.height, 0.001, 0.09);
    let d = sanitize(params.depth, 0.001, 1.0);

    let cover_material = Material::standard("book cover", params.color)
        .with_roughness(0.7)
        .with_metalness(0.05)
        .with_clearcoat(0.25, 0.4)
        .with_sheen(0.4);
    let cover_material = if params.with_text {
        let font = builtin_font()
            .inspect_err(|e| log::warn!("built-in cover font unusable: {e:#}"))
            .ok();
        // the texture carries the colour
        Material {
            color: Color::WHITE,
            ..cover_material
        }
        .with_map(TextureSlot::Color, printed_cover(params, font.as_ref()))
    } else {
        cover_material
    };
    let cover = materials.add_to_group(COVER_GROUP, cover_material);
    let pages = materials.add_to_group(
        PAGE_GROUP,
        Material::standard("book pages", params.page_color)
            .with_roughness(0.95)
            .with_metalness(0.0),
    );
    let shadow = materials.add(
        Material::unlit("book inner shadow", Color::BLACK)
            .with_opacity(0.05)
            .double_sided()
            .with_depth(true, false),
    );

    let mut book = ContainerNode::new("PortfolioBook");

    let block = Geometry::cuboid(w * 0.9, h * 0.7, d * 0.9).with_name("book pages");
    book.push(MeshNode::new("pages", Arc::new(block), pages).at(w * 0.02, h / 2.0, 0.0));

    let slab = Arc::new(Geometry::cuboid(w, h * 0.12, d).with_name("book cover"));
    book.push(MeshNode::new("cover_top", slab.clone(), cover).at(0.0, h - h * 0.06, 0.0));
    book.push(MeshNode::new("cover_bottom", slab, cover).at(0.0, h * 0.06, 0.0));

    let spine = Geometry::cuboid(w * 0.03, h * 1.02, d).with_name("book spine");
    book.push(MeshNode::new("spine", Arc::new(spine), cover).at(-w * 0.485, h / 2.0, 0.0));

    let plane = Geometry::plane(d * 1.02, h * 1.05, 1, 1).with_name("book inner shadow");
    book.push(
        MeshNode::new("inner_shadow", Arc::new(plane), shadow)
            .at(-w * 0.47, h / 2.0, 0.002)
            .with_euler(0.0, PI / 2.0, PI / 180.0 * 2.0)
            .with_render_order(-1),
    );

    book
}

/// The cover texture for `params`, lettered when a font is available.
pub fn printed_cover(params: &PortfolioBookParams, font: Option<&ab_glyph::FontArc>) -> TextureSource {
    let image = render_cover(&params.cover_art(), font);
    TextureSource::new(
        image,
        TextureSettings {
            wrap: Wrap::Clamp,
            ..TextureSettings::default()
        },
    )
}
