//! Studio compositing: turn a product photo into a post-ready square image
//! or a label cut-out.
//!
//! Form fields arrive as strings. Numbers that do not parse fall back to
//! their default, then every value is clamped to its allowed range.

pub mod canvas;
pub mod clean;
pub mod generate;
pub mod label;

pub use clean::{compose_clean, BackgroundTone, CleanParams};
pub use generate::compose_generated;
pub use label::{compose_label, LabelBackground, LabelParams};
pub use image::RgbaImage;

use crate::error::Result;
use image::{DynamicImage, ImageFormat};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Side of the square Instagram canvas.
pub const CANVAS_SIZE: u32 = 1080;

/// Multipart text fields of a studio request.
pub type Fields = HashMap<String, String>;

/// The three kinds of studio output, each with its own file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Clean,
    Label,
    Generated,
}

impl OutputKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            OutputKind::Clean => "clean",
            OutputKind::Label => "label",
            OutputKind::Generated => "ai_gen",
        }
    }

    /// `{stem}_{suffix}.png`
    pub fn file_name(&self, stem: &str) -> String {
        format!("{}_{}.png", stem, self.suffix())
    }
}

pub fn decode(bytes: &[u8]) -> Result<RgbaImage> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img.clone()).write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

/// Encode `img` as PNG into `dir`, returning the full path written.
pub fn save_png(dir: &Path, file_name: &str, img: &RgbaImage) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    std::fs::write(&path, encode_png(img)?)?;
    tracing::info!("[studio] Wrote {}", path.display());
    Ok(path)
}

fn field<'a>(fields: &'a Fields, name: &str) -> Option<&'a str> {
    fields
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

pub(crate) fn parse_f32(fields: &Fields, name: &str, default: f32, min: f32, max: f32) -> f32 {
    field(fields, name)
        .and_then(|v| v.parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
        .clamp(min, max)
}

/// Integer field. A decimal value is truncated towards zero.
pub(crate) fn parse_i64(fields: &Fields, name: &str, default: i64, min: i64, max: i64) -> i64 {
    field(fields, name)
        .and_then(|v| {
            v.parse::<i64>()
                .ok()
                .or_else(|| v.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        })
        .unwrap_or(default)
        .clamp(min, max)
}

pub(crate) fn parse_keyword(fields: &Fields, name: &str) -> Option<String> {
    field(fields, name).map(|v| v.to_lowercase())
}
