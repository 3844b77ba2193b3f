//! Image decoding for the dense data layer.
//!
//! These functions open an image file (PNG/JPEG/BMP/GIF), optionally resize
//! it, and lay the pixels out channel-planar (C, H, W) as raw `f64` values.
use std::path::Path;

use image::imageops::FilterType;
use image::DynamicImage;

use crate::error::{LayerError, Result};

/// Decoded pixels in channel-planar order.
#[derive(Debug, Clone, PartialEq)]
pub struct Planes {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
    pub data: Vec<f64>,
}

impl Planes {
    /// Mirrors every channel left to right.
    pub fn flip_horizontal(&mut self) {
        let width = self.width;
        for row in self.data.chunks_exact_mut(width) {
            row.reverse();
        }
    }
}

fn open(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|source| LayerError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Decodes an input image as RGB (`is_color`) or grayscale, resizing with a
/// bilinear filter to `(height, width)` when `resize` is set.
///
/// Values are the raw 0..255 intensities, channels in R, G, B order.
pub fn load_image(path: &Path, is_color: bool, resize: Option<(u32, u32)>) -> Result<Planes> {
    let mut img = open(path)?;
    if let Some((height, width)) = resize {
        img = img.resize_exact(width, height, FilterType::Triangle);
    }
    let (width, height) = (img.width() as usize, img.height() as usize);
    if is_color {
        let rgb = img.to_rgb8();
        let plane = width * height;
        let mut data = vec![0.0; 3 * plane];
        for (i, p) in rgb.pixels().enumerate() {
            for c in 0..3 {
                data[c * plane + i] = p.0[c] as f64;
            }
        }
        Ok(Planes { channels: 3, height, width, data })
    } else {
        let gray = img.to_luma8();
        let data = gray.pixels().map(|p| p.0[0] as f64).collect();
        Ok(Planes { channels: 1, height, width, data })
    }
}

/// Decodes a label image into a single plane of class indices.
///
/// Resizing uses nearest-neighbour sampling so class indices are never
/// blended into values that name a different class. 16-bit grayscale labels
/// keep their full range; every other format is read as 8-bit luma.
pub fn load_label(path: &Path, resize: Option<(u32, u32)>) -> Result<Planes> {
    let mut img = open(path)?;
    if let Some((height, width)) = resize {
        img = img.resize_exact(width, height, FilterType::Nearest);
    }
    let (width, height) = (img.width() as usize, img.height() as usize);
    let data = match img {
        DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA16(_) => {
            img.to_luma16().pixels().map(|p| p.0[0] as f64).collect()
        }
        _ => img.to_luma8().pixels().map(|p| p.0[0] as f64).collect(),
    };
    Ok(Planes { channels: 1, height, width, data })
}
