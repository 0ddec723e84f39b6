//! Loading of external files: models, images, the environment map and the
//! cover font.
//!
//! Paths are written the way a web page would reference them
//! (`/assets/models/model.glb`). Natively they resolve under the configured
//! asset root, in the browser against the page origin. `http(s)://` URLs are
//! fetched as they are.

use std::path::PathBuf;

use anyhow::Context as _;

use crate::data_structures::material::{TextureSettings, TextureSource};

pub mod classify;
pub mod draco;
pub mod gltf;
pub mod headphones;
pub mod plant;
pub mod task;

/// Prefixes relative asset paths with `/`; URLs pass through untouched.
pub fn normalize_asset_path(path: &str) -> String {
    let path = path.trim();
    if is_remote(path) || path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

pub fn is_remote(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

/// Parent directory of an asset path, used to resolve URIs inside models.
pub fn asset_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..=i],
        None => "/",
    }
}

#[derive(Clone, Debug)]
pub struct AssetSource {
    root: PathBuf,
}

impl AssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Native file path of a normalised local asset path.
    pub fn local_path(&self, path: &str) -> PathBuf {
        self.root.join(normalize_asset_path(path).trim_start_matches('/'))
    }

    #[cfg(target_arch = "wasm32")]
    fn format_url(&self, path: &str) -> anyhow::Result<reqwest::Url> {
        let path = normalize_asset_path(path);
        if is_remote(&path) {
            return Ok(reqwest::Url::parse(&path)?);
        }
        let window = web_sys::window().context("no browser window")?;
        let origin = window
            .location()
            .origin()
            .map_err(|_| anyhow::anyhow!("page origin is not readable"))?;
        let base = reqwest::Url::parse(&format!("{origin}/"))?;
        Ok(base.join(path.trim_start_matches('/'))?)
    }

    pub async fn load_binary(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        #[cfg(target_arch = "wasm32")]
        let data = {
            let url = self.format_url(path)?;
            reqwest::get(url).await?.error_for_status()?.bytes().await?.to_vec()
        };
        #[cfg(not(target_arch = "wasm32"))]
        let data = if is_remote(path) {
            reqwest::get(path).await?.error_for_status()?.bytes().await?.to_vec()
        } else {
            let file = self.local_path(path);
            tokio::fs::read(&file)
                .await
                .with_context(|| format!("cannot read {}", file.display()))?
        };
        Ok(data)
    }

    pub async fn load_string(&self, path: &str) -> anyhow::Result<String> {
        let data = self.load_binary(path).await?;
        String::from_utf8(data).with_context(|| format!("{path} is not UTF-8"))
    }

    pub async fn load_texture_source(
        &self,
        path: &str,
        settings: TextureSettings,
    ) -> anyhow::Result<TextureSource> {
        let data = self.load_binary(path).await?;
        decode_texture(&data, settings).with_context(|| format!("cannot decode image {path}"))
    }

    /// Radiance HDR image as linear RGB floats.
    pub async fn load_environment(&self, path: &str) -> anyhow::Result<image::Rgb32FImage> {
        let data = self.load_binary(path).await?;
        let image = image::load_from_memory_with_format(&data, image::ImageFormat::Hdr)
            .with_context(|| format!("cannot decode environment map {path}"))?;
        Ok(image.to_rgb32f())
    }

    pub async fn load_font(&self, path: &str) -> anyhow::Result<ab_glyph::FontArc> {
        let data = self.load_binary(path).await?;
        ab_glyph::FontArc::try_from_vec(data).with_context(|| format!("{path} is not a usable font"))
    }
}

/// Decodes any supported image format into RGBA8. Float formats (EXR, HDR)
/// are clamped to `[0, 1]`.
pub fn decode_texture(bytes: &[u8], settings: TextureSettings) -> anyhow::Result<TextureSource> {
    let image = image::load_from_memory(bytes)?;
    Ok(TextureSource::new(image.to_rgba8(), settings))
}
