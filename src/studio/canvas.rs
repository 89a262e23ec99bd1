//! Small set of raster primitives the studio composites are built from.
//!
//! Everything works on 8-bit RGBA buffers from the `image` crate.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

/// Square canvas filled with a radial gradient. `cx`, `cy` and `radius` are
/// fractions of the side length; pixels past the radius take `outer`.
pub fn radial_gradient(
    size: u32,
    inner: [u8; 3],
    outer: [u8; 3],
    cx: f32,
    cy: f32,
    radius: f32,
) -> RgbaImage {
    let side = size as f32;
    let (fx, fy, r) = (cx * side, cy * side, (radius * side).max(1.0));

    RgbaImage::from_fn(size, size, |x, y| {
        let dx = x as f32 + 0.5 - fx;
        let dy = y as f32 + 0.5 - fy;
        let t = ((dx * dx + dy * dy).sqrt() / r).min(1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgba([
            mix(inner[0], outer[0]),
            mix(inner[1], outer[1]),
            mix(inner[2], outer[2]),
            255,
        ])
    })
}

/// Multiply the colour channels by `factor`. Alpha is untouched.
pub fn modulate_brightness(img: &mut RgbaImage, factor: f32) {
    for pixel in img.pixels_mut() {
        for c in 0..3 {
            pixel.0[c] = (pixel.0[c] as f32 * factor).round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Remove all colour, keeping luminance and alpha. This is what tinting
/// with black does to an image.
pub fn tint_black(img: &RgbaImage) -> RgbaImage {
    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let luma = (0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32).round() as u8;
        pixel.0 = [luma, luma, luma, a];
    }
    out
}

/// Scale to the largest size that fits inside `max_w` x `max_h` while
/// keeping the aspect ratio. Small images are enlarged.
pub fn fit_inside(img: &RgbaImage, max_w: u32, max_h: u32) -> RgbaImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return img.clone();
    }

    let scale = (max_w as f64 / w as f64).min(max_h as f64 / h as f64);
    let nw = ((w as f64 * scale).round() as u32).max(1);
    let nh = ((h as f64 * scale).round() as u32).max(1);
    if (nw, nh) == (w, h) {
        return img.clone();
    }
    imageops::resize(img, nw, nh, FilterType::Lanczos3)
}

/// Copy of `img` surrounded by `margin` transparent pixels on every side.
pub fn pad(img: &RgbaImage, margin: u32) -> RgbaImage {
    let (w, h) = img.dimensions();
    let mut out = RgbaImage::from_pixel(w + 2 * margin, h + 2 * margin, Rgba([0, 0, 0, 0]));
    imageops::replace(&mut out, img, margin as i64, margin as i64);
    out
}

/// Alpha-composite `top` onto `base` at (`x`, `y`) with its alpha scaled
/// by `opacity`. Parts falling outside `base` are clipped.
pub fn overlay_with_opacity(base: &mut RgbaImage, top: &RgbaImage, x: i64, y: i64, opacity: f32) {
    if opacity >= 1.0 {
        imageops::overlay(base, top, x, y);
        return;
    }

    let mut faded = top.clone();
    let opacity = opacity.max(0.0);
    for pixel in faded.pixels_mut() {
        pixel.0[3] = (pixel.0[3] as f32 * opacity).round() as u8;
    }
    imageops::overlay(base, &faded, x, y);
}

/// Offset that centres a span of `inner` pixels inside `outer`.
pub fn centered(outer: u32, inner: u32) -> i64 {
    ((outer as f64 - inner as f64) / 2.0).round() as i64
}
