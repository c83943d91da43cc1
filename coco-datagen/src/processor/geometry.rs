//! Aspect-preserving resize math for images, boxes and masks.

use crate::common::*;
use bbox::{Hw, PixelBox};
use image::{imageops, imageops::FilterType, GrayImage, RgbImage};

/// Scale factor mapping the long side of a source onto the target long side.
pub fn compute_scale(long_side: usize, target_long_side: usize) -> f64 {
    target_long_side as f64 / long_side as f64
}

fn scaled_extent(extent: usize, scale: f64) -> usize {
    ((extent as f64 * scale).round() as usize).max(1)
}

/// Bilinear-resize an image by a single scale factor on both axes and place
/// the result at the top-left origin of a zeroed buffer of exactly `target`
/// shape. Rows and columns beyond the resized content stay zero.
pub fn resize_image(
    image: &Array3<i32>,
    scale: f64,
    target: (usize, usize, usize),
) -> Result<Array3<i32>> {
    let (src_h, src_w, src_c) = image.dim();
    let (tgt_h, tgt_w, tgt_c) = target;
    ensure!(
        src_c == 3 && tgt_c == 3,
        "resize_image expects 3-channel images, got {} -> {}",
        src_c,
        tgt_c
    );

    let new_h = scaled_extent(src_h, scale);
    let new_w = scaled_extent(src_w, scale);
    ensure!(
        new_h <= tgt_h && new_w <= tgt_w,
        "scaled size ({}, {}) exceeds target ({}, {})",
        new_h,
        new_w,
        tgt_h,
        tgt_w
    );

    let raw: Vec<u8> = image.iter().map(|&value| value.clamp(0, 255) as u8).collect();
    let buffer = RgbImage::from_raw(src_w as u32, src_h as u32, raw)
        .ok_or_else(|| format_err!("image buffer size mismatch"))?;
    let resized = imageops::resize(&buffer, new_w as u32, new_h as u32, FilterType::Triangle);

    let mut out = Array3::zeros((tgt_h, tgt_w, tgt_c));
    for y in 0..new_h {
        for x in 0..new_w {
            let pixel = resized.get_pixel(x as u32, y as u32);
            for c in 0..3 {
                out[(y, x, c)] = pixel.0[c] as i32;
            }
        }
    }
    Ok(out)
}

/// Promote a single gray plane to a multi-channel image: channel 0 holds the
/// plane, the remaining channels stay zero.
pub fn promote_gray(gray: &Array2<i32>, channels: usize) -> Array3<i32> {
    let (h, w) = gray.dim();
    let mut out = Array3::zeros((h, w, channels));
    for y in 0..h {
        for x in 0..w {
            out[(y, x, 0)] = gray[(y, x)];
        }
    }
    out
}

/// Multiply every box coordinate by the scale factor and truncate to i16.
/// Coordinate order passes through unchecked.
pub fn resize_boxes(boxes: &[PixelBox<f64>], scale: f64) -> Vec<PixelBox<i16>> {
    boxes
        .iter()
        .map(|bbox| bbox.scale(scale).cast())
        .collect()
}

/// Resize a 0/1 mask with the shared scale factor, re-binarize at one half
/// and derive the tight box around the surviving pixels, placed in a zeroed
/// buffer of `target` size.
///
/// An empty resized mask yields the all-zero box rather than an error.
pub fn resize_mask(
    mask: &Array2<u8>,
    scale: f64,
    target: (usize, usize),
) -> Result<(Array2<i8>, PixelBox<i16>)> {
    let (src_h, src_w) = mask.dim();
    let (tgt_h, tgt_w) = target;
    let new_h = scaled_extent(src_h, scale).min(tgt_h);
    let new_w = scaled_extent(src_w, scale).min(tgt_w);

    let raw: Vec<u8> = mask.iter().map(|&v| if v != 0 { 255 } else { 0 }).collect();
    let buffer = GrayImage::from_raw(src_w as u32, src_h as u32, raw)
        .ok_or_else(|| format_err!("mask buffer size mismatch"))?;
    let resized = imageops::resize(&buffer, new_w as u32, new_h as u32, FilterType::Triangle);

    let mut out = Array2::zeros((tgt_h, tgt_w));
    let mut extents: Option<(usize, usize, usize, usize)> = None;
    for y in 0..new_h {
        for x in 0..new_w {
            // 128/255 is the integer form of the >= 0.5 threshold
            if resized.get_pixel(x as u32, y as u32).0[0] >= 128 {
                out[(y, x)] = 1;
                extents = Some(match extents {
                    None => (x, y, x, y),
                    Some((xmin, ymin, xmax, ymax)) => {
                        (xmin.min(x), ymin.min(y), xmax.max(x), ymax.max(y))
                    }
                });
            }
        }
    }

    let derived = match extents {
        Some((xmin, ymin, xmax, ymax)) => {
            PixelBox::from_xyxy([xmin as i64, ymin as i64, xmax as i64, ymax as i64])
                .clamp_to(&Hw::from_hw([new_h as i64, new_w as i64]))
                .cast()
        }
        None => PixelBox::from_xyxy([0, 0, 0, 0]),
    };

    Ok((out, derived))
}
