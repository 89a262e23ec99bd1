use super::canvas::{centered, fit_inside};
use super::CANVAS_SIZE;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};

const PRODUCT_HEIGHT: u32 = 800;

/// Fill the canvas with `background` (cropped to square if needed) and put
/// the product in the middle, at most 800px tall.
pub fn compose_generated(background: &RgbaImage, product: &RgbaImage) -> RgbaImage {
    let mut canvas = DynamicImage::ImageRgba8(background.clone())
        .resize_to_fill(CANVAS_SIZE, CANVAS_SIZE, FilterType::Lanczos3)
        .to_rgba8();

    let product = fit_inside(product, CANVAS_SIZE, PRODUCT_HEIGHT);
    let (w, h) = product.dimensions();
    imageops::overlay(
        &mut canvas,
        &product,
        centered(CANVAS_SIZE, w),
        centered(CANVAS_SIZE, h),
    );
    canvas
}
