use super::canvas::{
    centered, fit_inside, modulate_brightness, overlay_with_opacity, pad, radial_gradient,
    tint_black,
};
use super::{parse_f32, parse_i64, parse_keyword, Fields, CANVAS_SIZE};
use image::imageops;
use image::RgbaImage;

const SUBJECT_HEIGHT: f32 = 900.0;
const SHADOW_BLUR_SIGMA: f32 = 18.0;
const SHADOW_BRIGHTNESS: f32 = 0.35;
const SHADOW_OFFSET: (i64, i64) = (10, 14);

/// Colour family of the studio backdrop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackgroundTone {
    #[default]
    Warm,
    Neutral,
    Cool,
}

impl BackgroundTone {
    /// Unknown names fall back to warm.
    pub fn parse(name: Option<&str>) -> Self {
        match name.map(|n| n.to_lowercase()).as_deref() {
            Some("neutral") => BackgroundTone::Neutral,
            Some("cool") => BackgroundTone::Cool,
            _ => BackgroundTone::Warm,
        }
    }

    /// (centre colour, edge colour)
    pub fn colors(&self) -> ([u8; 3], [u8; 3]) {
        match self {
            BackgroundTone::Warm => ([0xfb, 0xf7, 0xf0], [0xef, 0xe7, 0xdd]),
            BackgroundTone::Neutral => ([0xf6, 0xf6, 0xf6], [0xe9, 0xe9, 0xe9]),
            BackgroundTone::Cool => ([0xf2, 0xf6, 0xfb], [0xe3, 0xe9, 0xf2]),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanParams {
    pub tone: BackgroundTone,
    /// Backdrop brightness multiplier, 0.85..=1.15.
    pub brightness: f32,
    pub shadow: bool,
    /// Subject height relative to 900px, 0.7..=1.2.
    pub subject_scale: f32,
    pub offset_x: i64,
    pub offset_y: i64,
    /// Shadow opacity, 0.1..=0.8.
    pub shadow_strength: f32,
}

impl Default for CleanParams {
    fn default() -> Self {
        Self {
            tone: BackgroundTone::Warm,
            brightness: 1.0,
            shadow: true,
            subject_scale: 1.0,
            offset_x: 0,
            offset_y: 0,
            shadow_strength: 0.35,
        }
    }
}

impl CleanParams {
    pub fn from_fields(fields: &Fields) -> Self {
        Self {
            tone: BackgroundTone::parse(parse_keyword(fields, "bgTone").as_deref()),
            brightness: parse_f32(fields, "brightness", 1.0, 0.85, 1.15),
            shadow: parse_keyword(fields, "shadow").as_deref() != Some("false"),
            subject_scale: parse_f32(fields, "subjectScale", 1.0, 0.7, 1.2),
            offset_x: parse_i64(fields, "offsetX", 0, -160, 160),
            offset_y: parse_i64(fields, "offsetY", 0, -160, 160),
            shadow_strength: parse_f32(fields, "shadowStrength", 0.35, 0.1, 0.8),
        }
    }
}

/// Place a cut-out subject on a soft studio backdrop with an optional drop
/// shadow. The result is always `CANVAS_SIZE` square.
pub fn compose_clean(subject: &RgbaImage, params: &CleanParams) -> RgbaImage {
    let (inner, outer) = params.tone.colors();
    let mut canvas = radial_gradient(CANVAS_SIZE, inner, outer, 0.5, 0.45, 0.65);
    modulate_brightness(&mut canvas, params.brightness);

    let target_height = (SUBJECT_HEIGHT * params.subject_scale).round() as u32;
    let subject = fit_inside(subject, u32::MAX, target_height);
    let (w, h) = subject.dimensions();
    let left = centered(CANVAS_SIZE, w) + params.offset_x;
    let top = centered(CANVAS_SIZE, h) + params.offset_y;

    if params.shadow {
        // room for the blur to spread past the subject's edges
        let margin = (SHADOW_BLUR_SIGMA * 3.0).ceil() as u32;
        let mut shadow = imageops::blur(&pad(&tint_black(&subject), margin), SHADOW_BLUR_SIGMA);
        modulate_brightness(&mut shadow, SHADOW_BRIGHTNESS);
        overlay_with_opacity(
            &mut canvas,
            &shadow,
            left + SHADOW_OFFSET.0 - margin as i64,
            top + SHADOW_OFFSET.1 - margin as i64,
            params.shadow_strength,
        );
    }

    imageops::overlay(&mut canvas, &subject, left, top);
    canvas
}
