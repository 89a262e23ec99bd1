use super::canvas::{centered, fit_inside};
use super::{parse_f32, parse_i64, parse_keyword, Fields};
use image::imageops;
use image::{Rgba, RgbaImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelBackground {
    #[default]
    Transparent,
    White,
}

impl LabelBackground {
    pub fn parse(name: Option<&str>) -> Self {
        match name {
            Some(n) if n.eq_ignore_ascii_case("white") => LabelBackground::White,
            _ => LabelBackground::Transparent,
        }
    }

    fn pixel(&self) -> Rgba<u8> {
        match self {
            LabelBackground::Transparent => Rgba([0, 0, 0, 0]),
            LabelBackground::White => Rgba([255, 255, 255, 255]),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelParams {
    pub width: u32,
    pub height: u32,
    /// Fraction of each dimension left empty on both sides, 0..=0.2.
    pub margin: f32,
    pub background: LabelBackground,
}

impl Default for LabelParams {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 1400,
            margin: 0.08,
            background: LabelBackground::Transparent,
        }
    }
}

impl LabelParams {
    pub fn from_fields(fields: &Fields) -> Self {
        Self {
            width: parse_i64(fields, "width", 1000, 512, 2048) as u32,
            height: parse_i64(fields, "height", 1400, 512, 2048) as u32,
            margin: parse_f32(fields, "margin", 0.08, 0.0, 0.2),
            background: LabelBackground::parse(parse_keyword(fields, "background").as_deref()),
        }
    }
}

/// Centre a cut-out on a plain canvas of the requested size, leaving the
/// margin free on every side.
pub fn compose_label(subject: &RgbaImage, params: &LabelParams) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(params.width, params.height, params.background.pixel());

    let inset = 1.0 - params.margin * 2.0;
    let max_w = ((params.width as f32 * inset).round() as u32).max(1);
    let max_h = ((params.height as f32 * inset).round() as u32).max(1);
    let subject = fit_inside(subject, max_w, max_h);

    let (w, h) = subject.dimensions();
    imageops::overlay(
        &mut canvas,
        &subject,
        centered(params.width, w),
        centered(params.height, h),
    );
    canvas
}
